//! Credential record model.
//!
//! `Entry` is the record an edit session works against. Besides its fields
//! and sub-collections it carries an update transaction: `begin_update`
//! snapshots the current state and `end_update` pushes that snapshot into
//! the history only when something actually changed.

mod attachments;
mod attributes;
mod autotype;

pub use attachments::AttachmentSet;
pub use attributes::{Attribute, AttributeSet, RESERVED_KEYS};
pub use autotype::{check_sequence, Association, AutoTypeRuleSet, SequenceIssue};

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// Icon number used when no other icon is selected
pub const DEFAULT_ICON_NUMBER: u32 = 0;

/// Icon reference of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryIcon {
    /// One of the built-in icons
    Standard(u32),
    /// A custom icon owned by the database metadata
    Custom(Uuid),
}

impl Default for EntryIcon {
    fn default() -> Self {
        EntryIcon::Standard(DEFAULT_ICON_NUMBER)
    }
}

/// Lookup of custom icons known to the owning database
pub trait CustomIconStore {
    fn contains_custom_icon(&self, uuid: &Uuid) -> bool;
}

impl CustomIconStore for HashSet<Uuid> {
    fn contains_custom_icon(&self, uuid: &Uuid) -> bool {
        self.contains(uuid)
    }
}

impl CustomIconStore for BTreeSet<Uuid> {
    fn contains_custom_icon(&self, uuid: &Uuid) -> bool {
        self.contains(uuid)
    }
}

/// Expiry flag and time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiry {
    pub expires: bool,
    pub expiry_time: DateTime<Utc>,
}

impl Default for Expiry {
    fn default() -> Self {
        Self {
            expires: false,
            expiry_time: Utc::now(),
        }
    }
}

/// Quick expiry choices offered by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryPreset {
    Tomorrow,
    Weeks(u32),
    Months(u32),
    Years(u32),
}

impl ExpiryPreset {
    /// The presets offered by the editor, in menu order
    pub const ALL: [ExpiryPreset; 8] = [
        ExpiryPreset::Tomorrow,
        ExpiryPreset::Weeks(1),
        ExpiryPreset::Weeks(2),
        ExpiryPreset::Weeks(3),
        ExpiryPreset::Months(1),
        ExpiryPreset::Months(3),
        ExpiryPreset::Months(6),
        ExpiryPreset::Years(1),
    ];

    /// Expiry time reached by applying this preset to `now`
    pub fn apply_to(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let shifted = match self {
            ExpiryPreset::Tomorrow => now.checked_add_signed(Duration::days(1)),
            ExpiryPreset::Weeks(weeks) => now.checked_add_signed(Duration::weeks(weeks.into())),
            ExpiryPreset::Months(months) => now.checked_add_months(Months::new(months)),
            ExpiryPreset::Years(years) => {
                now.checked_add_months(Months::new(years.saturating_mul(12)))
            }
        };
        shifted.unwrap_or(now)
    }
}

/// Auto-type settings of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTypeSettings {
    pub enabled: bool,
    /// Empty means the sequence is inherited from the parent group
    #[serde(default)]
    pub default_sequence: String,
}

impl Default for AutoTypeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_sequence: String::new(),
        }
    }
}

/// Creation and modification times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTimes {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Default for EntryTimes {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            modified: now,
        }
    }
}

/// A credential record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub uuid: Uuid,
    pub title: String,
    pub username: String,
    pub url: String,
    pub password: String,
    pub notes: String,
    #[serde(default)]
    pub icon: EntryIcon,
    #[serde(default)]
    pub expiry: Expiry,
    #[serde(default)]
    pub auto_type: AutoTypeSettings,
    #[serde(default)]
    pub attributes: AttributeSet,
    #[serde(default)]
    pub attachments: AttachmentSet,
    #[serde(default)]
    pub associations: AutoTypeRuleSet,
    #[serde(default)]
    pub times: EntryTimes,
    #[serde(default)]
    history: Vec<Entry>,
    #[serde(skip)]
    update_snapshot: Option<Box<Entry>>,
}

impl Default for Entry {
    fn default() -> Self {
        Self::new()
    }
}

impl Entry {
    /// Create a blank entry with a fresh identity
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: String::new(),
            username: String::new(),
            url: String::new(),
            password: String::new(),
            notes: String::new(),
            icon: EntryIcon::default(),
            expiry: Expiry::default(),
            auto_type: AutoTypeSettings::default(),
            attributes: AttributeSet::new(),
            attachments: AttachmentSet::new(),
            associations: AutoTypeRuleSet::new(),
            times: EntryTimes::default(),
            history: Vec::new(),
            update_snapshot: None,
        }
    }

    /// Historical snapshots, oldest first
    pub fn history(&self) -> &[Entry] {
        &self.history
    }

    /// Append a snapshot to the history; nested history is dropped
    pub fn add_history_item(&mut self, mut snapshot: Entry) {
        snapshot.history.clear();
        snapshot.update_snapshot = None;
        self.history.push(snapshot);
    }

    /// Remove history snapshots by index. Order and duplicates do not
    /// matter; out-of-range indexes are ignored.
    pub fn remove_history_items(&mut self, indexes: &[usize]) -> usize {
        let unique: BTreeSet<usize> = indexes
            .iter()
            .copied()
            .filter(|index| *index < self.history.len())
            .collect();
        for index in unique.iter().rev() {
            self.history.remove(*index);
        }
        unique.len()
    }

    /// Drop the oldest snapshots so at most `max_items` remain
    pub fn truncate_history(&mut self, max_items: usize) -> usize {
        let excess = self.history.len().saturating_sub(max_items);
        self.history.drain(..excess);
        excess
    }

    /// Effective auto-type sequence given the sequence inherited from the parent
    pub fn effective_auto_type_sequence<'a>(&'a self, inherited: &'a str) -> &'a str {
        if self.auto_type.default_sequence.is_empty() {
            inherited
        } else {
            &self.auto_type.default_sequence
        }
    }

    /// Whether the entry is expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.expires && self.expiry.expiry_time <= now
    }

    /// Start an update transaction by snapshotting the current state
    pub fn begin_update(&mut self) {
        let mut snapshot = self.clone();
        snapshot.history.clear();
        snapshot.update_snapshot = None;
        self.update_snapshot = Some(Box::new(snapshot));
    }

    /// Finish an update transaction.
    ///
    /// If any field or sub-collection differs from the snapshot taken by
    /// `begin_update`, the snapshot becomes the newest history item, the
    /// modification time is bumped, and `true` is returned. Without a pending
    /// transaction this is a no-op returning `false`.
    pub fn end_update(&mut self) -> bool {
        let Some(snapshot) = self.update_snapshot.take() else {
            return false;
        };

        if self.same_content(&snapshot) {
            return false;
        }

        self.times.modified = Utc::now();
        self.history.push(*snapshot);
        true
    }

    /// Field-by-field comparison of everything a user can edit.
    /// Identity, timestamps and history are not part of the content.
    pub fn same_content(&self, other: &Entry) -> bool {
        self.title == other.title
            && self.username == other.username
            && self.url == other.url
            && self.password == other.password
            && self.notes == other.notes
            && self.icon == other.icon
            && self.expiry == other.expiry
            && self.auto_type == other.auto_type
            && self.attributes == other.attributes
            && self.attachments == other.attachments
            && self.associations == other.associations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_entry() -> Entry {
        let mut entry = Entry::new();
        entry.title = "Mail".to_string();
        entry.username = "alice".to_string();
        entry.password = "hunter2".to_string();
        entry.attributes.set("pin", "0000", true);
        entry
    }

    #[test]
    fn test_update_without_changes_creates_no_history() {
        let mut entry = sample_entry();
        let modified = entry.times.modified;

        entry.begin_update();
        assert!(!entry.end_update());
        assert!(entry.history().is_empty());
        assert_eq!(entry.times.modified, modified);
    }

    #[test]
    fn test_update_with_change_pushes_snapshot() {
        let mut entry = sample_entry();

        entry.begin_update();
        entry.password = "correct horse".to_string();
        assert!(entry.end_update());

        assert_eq!(entry.history().len(), 1);
        let snapshot = &entry.history()[0];
        assert_eq!(snapshot.password, "hunter2");
        assert_eq!(snapshot.uuid, entry.uuid);
        assert!(snapshot.history().is_empty());
    }

    #[test]
    fn test_sub_collection_change_is_detected() {
        let mut entry = sample_entry();

        entry.begin_update();
        entry.attachments.set("key.pem", b"data".to_vec());
        assert!(entry.end_update());

        entry.begin_update();
        entry.associations.add(Association::new("Terminal", ""));
        assert!(entry.end_update());

        assert_eq!(entry.history().len(), 2);
    }

    #[test]
    fn test_end_update_without_begin_is_noop() {
        let mut entry = sample_entry();
        entry.title = "Changed".to_string();
        assert!(!entry.end_update());
    }

    #[test]
    fn test_remove_history_items_any_order() {
        let mut entry = sample_entry();
        for title in ["h0", "h1", "h2", "h3"] {
            let mut snapshot = entry.clone();
            snapshot.title = title.to_string();
            entry.add_history_item(snapshot);
        }

        assert_eq!(entry.remove_history_items(&[2, 0, 2, 9]), 2);
        let titles: Vec<_> = entry.history().iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["h1", "h3"]);
    }

    #[test]
    fn test_truncate_history_drops_oldest() {
        let mut entry = sample_entry();
        for i in 0..5 {
            let mut snapshot = entry.clone();
            snapshot.title = format!("h{}", i);
            entry.add_history_item(snapshot);
        }

        assert_eq!(entry.truncate_history(2), 3);
        let titles: Vec<_> = entry.history().iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["h3", "h4"]);
        assert_eq!(entry.truncate_history(10), 0);
    }

    #[test]
    fn test_effective_sequence() {
        let mut entry = Entry::new();
        assert_eq!(entry.effective_auto_type_sequence("{PASSWORD}"), "{PASSWORD}");
        entry.auto_type.default_sequence = "{USERNAME}".to_string();
        assert_eq!(entry.effective_auto_type_sequence("{PASSWORD}"), "{USERNAME}");
    }

    #[test]
    fn test_expiry_presets() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            ExpiryPreset::Tomorrow.apply_to(now),
            Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            ExpiryPreset::Weeks(2).apply_to(now),
            Utc.with_ymd_and_hms(2024, 2, 14, 12, 0, 0).unwrap()
        );
        assert_eq!(
            ExpiryPreset::Months(1).apply_to(now),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
        );
        assert_eq!(
            ExpiryPreset::Years(1).apply_to(now),
            Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let mut entry = Entry::new();
        entry.expiry.expiry_time = now - Duration::hours(1);
        assert!(!entry.is_expired(now));
        entry.expiry.expires = true;
        assert!(entry.is_expired(now));
    }

    #[test]
    fn test_json_round_trip_keeps_history() {
        let mut entry = sample_entry();
        entry.begin_update();
        entry.title = "Renamed".to_string();
        entry.end_update();

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: Entry = serde_json::from_str(&json).unwrap();
        assert!(parsed.same_content(&entry));
        assert_eq!(parsed.history().len(), 1);
        assert_eq!(parsed.history()[0].title, "Mail");
    }

    #[test]
    fn test_icon_store_lookup() {
        let icon = Uuid::new_v4();
        let store: HashSet<Uuid> = [icon].into_iter().collect();
        assert!(store.contains_custom_icon(&icon));
        assert!(!store.contains_custom_icon(&Uuid::new_v4()));
    }
}
