//! Session-local copy of an entry's editable state.

use crate::entry::{AttachmentSet, AttributeSet, AutoTypeRuleSet, Entry, EntryIcon};
use chrono::{DateTime, Utc};
use zeroize::Zeroize;

/// Editable state of an entry, detached from the record until commit.
///
/// Password material is wiped when the copy is dropped.
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    pub title: String,
    pub username: String,
    pub url: String,
    pub password: String,
    pub password_repeat: String,
    pub notes: String,
    pub expires: bool,
    pub expiry_time: DateTime<Utc>,
    pub icon: EntryIcon,
    pub auto_type_enabled: bool,
    /// Use the parent's sequence instead of `sequence`
    pub inherit_sequence: bool,
    /// Sequence text as shown in the editor
    pub sequence: String,
    pub attributes: AttributeSet,
    pub attachments: AttachmentSet,
    pub associations: AutoTypeRuleSet,
}

impl WorkingCopy {
    /// Deep copy of `entry`. `inherited_sequence` is what an inheriting
    /// entry displays as its sequence.
    pub fn from_entry(entry: &Entry, inherited_sequence: &str) -> Self {
        Self {
            title: entry.title.clone(),
            username: entry.username.clone(),
            url: entry.url.clone(),
            password: entry.password.clone(),
            password_repeat: entry.password.clone(),
            notes: entry.notes.clone(),
            expires: entry.expiry.expires,
            expiry_time: entry.expiry.expiry_time,
            icon: entry.icon,
            auto_type_enabled: entry.auto_type.enabled,
            inherit_sequence: entry.auto_type.default_sequence.is_empty(),
            sequence: entry
                .effective_auto_type_sequence(inherited_sequence)
                .to_string(),
            attributes: entry.attributes.clone(),
            attachments: entry.attachments.clone(),
            associations: entry.associations.clone(),
        }
    }

    /// Write every field and sub-collection into `entry`
    pub fn apply_to(&self, entry: &mut Entry) {
        entry.attributes.copy_from(&self.attributes);
        entry.attachments.copy_from(&self.attachments);

        entry.title.clone_from(&self.title);
        entry.username.clone_from(&self.username);
        entry.url.clone_from(&self.url);
        entry.password.clone_from(&self.password);
        entry.expiry.expires = self.expires;
        entry.expiry.expiry_time = self.expiry_time;
        entry.notes.clone_from(&self.notes);
        entry.icon = self.icon;

        entry.auto_type.enabled = self.auto_type_enabled;
        if self.inherit_sequence {
            entry.auto_type.default_sequence.clear();
        } else {
            entry.auto_type.default_sequence.clone_from(&self.sequence);
        }

        entry.associations.copy_from(&self.associations);
    }

    /// Whether the password and its confirmation agree
    pub fn passwords_match(&self) -> bool {
        self.password == self.password_repeat
    }

    /// Zeroize secrets and empty every field
    pub fn wipe(&mut self) {
        self.password.zeroize();
        self.password_repeat.zeroize();
        self.title.clear();
        self.username.clear();
        self.url.clear();
        self.notes.clear();
        self.sequence.clear();
        self.attributes.clear();
        self.attachments.clear();
        self.associations.clear();
    }
}

impl Drop for WorkingCopy {
    fn drop(&mut self) {
        self.password.zeroize();
        self.password_repeat.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Association;

    #[test]
    fn test_round_trip_leaves_entry_unchanged() {
        let mut entry = Entry::new();
        entry.title = "Bank".to_string();
        entry.password = "pw".to_string();
        entry.attributes.set("pin", "1", true);
        entry.attachments.set("a.bin", vec![1, 2, 3]);
        entry.associations.add(Association::new("Bank*", ""));
        let original = entry.clone();

        let copy = WorkingCopy::from_entry(&entry, "{PASSWORD}");
        copy.apply_to(&mut entry);
        assert!(entry.same_content(&original));
    }

    #[test]
    fn test_inherited_sequence_is_displayed_but_not_stored() {
        let mut entry = Entry::new();
        let copy = WorkingCopy::from_entry(&entry, "{USERNAME}{ENTER}");
        assert!(copy.inherit_sequence);
        assert_eq!(copy.sequence, "{USERNAME}{ENTER}");

        copy.apply_to(&mut entry);
        assert!(entry.auto_type.default_sequence.is_empty());
    }

    #[test]
    fn test_custom_sequence_is_stored() {
        let mut entry = Entry::new();
        let mut copy = WorkingCopy::from_entry(&entry, "{PASSWORD}");
        copy.inherit_sequence = false;
        copy.sequence = "{USERNAME}{TAB}{PASSWORD}".to_string();

        copy.apply_to(&mut entry);
        assert_eq!(entry.auto_type.default_sequence, "{USERNAME}{TAB}{PASSWORD}");
    }

    #[test]
    fn test_wipe_clears_secrets() {
        let mut entry = Entry::new();
        entry.password = "secret".to_string();
        let mut copy = WorkingCopy::from_entry(&entry, "");
        assert!(copy.passwords_match());

        copy.wipe();
        assert!(copy.password.is_empty());
        assert!(copy.password_repeat.is_empty());
    }
}
