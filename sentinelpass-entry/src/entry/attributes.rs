//! Custom key/value attributes of an entry.

use crate::{EntryEditError, Result};
use serde::{Deserialize, Serialize};

/// Standard field names that are stored on the entry itself
pub const RESERVED_KEYS: [&str; 5] = ["Title", "UserName", "Password", "URL", "Notes"];

/// A single custom attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub protected: bool,
}

/// Ordered set of custom attributes, unique by case-sensitive name.
///
/// Iteration follows insertion order; updating an existing key keeps its
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet {
    items: Vec<Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` names one of the standard entry fields
    pub fn is_reserved_key(key: &str) -> bool {
        RESERVED_KEYS.contains(&key)
    }

    /// Insert or update an attribute
    pub fn set(&mut self, key: &str, value: &str, protected: bool) {
        match self.position(key) {
            Some(index) => {
                let item = &mut self.items[index];
                item.value = value.to_string();
                item.protected = protected;
            }
            None => self.items.push(Attribute {
                key: key.to_string(),
                value: value.to_string(),
                protected,
            }),
        }
    }

    /// Remove an attribute; absent keys are ignored
    pub fn remove(&mut self, key: &str) {
        self.items.retain(|item| item.key != key);
    }

    /// Rename an attribute in place, keeping its value and protection
    pub fn rename(&mut self, old_key: &str, new_key: &str) -> Result<()> {
        if old_key == new_key {
            return Ok(());
        }
        if new_key.is_empty() || Self::is_reserved_key(new_key) {
            return Err(EntryEditError::InvalidInput(format!(
                "'{}' cannot be used as an attribute name",
                new_key
            )));
        }
        if self.contains(new_key) {
            return Err(EntryEditError::InvalidInput(format!(
                "Attribute '{}' already exists",
                new_key
            )));
        }

        let index = self
            .position(old_key)
            .ok_or_else(|| EntryEditError::NotFound(format!("attribute '{}'", old_key)))?;
        self.items[index].key = new_key.to_string();
        Ok(())
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(|item| item.value.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.items.iter().find(|item| item.key == key)
    }

    /// Protection flag of `key`; false when absent
    pub fn is_protected(&self, key: &str) -> bool {
        self.get(key).map(|item| item.protected).unwrap_or(false)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Attribute names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the whole set with a copy of `other`
    pub fn copy_from(&mut self, other: &AttributeSet) {
        self.items.clone_from(&other.items);
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|item| item.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_upserts_in_place() {
        let mut attributes = AttributeSet::new();
        attributes.set("pin", "1234", false);
        attributes.set("api", "abc", true);
        attributes.set("pin", "9999", true);

        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.keys().collect::<Vec<_>>(), vec!["pin", "api"]);
        assert_eq!(attributes.value("pin"), Some("9999"));
        assert!(attributes.is_protected("pin"));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut attributes = AttributeSet::new();
        attributes.set("Token", "a", false);
        attributes.set("token", "b", false);
        assert_eq!(attributes.len(), 2);
    }

    #[test]
    fn test_remove_absent_is_silent() {
        let mut attributes = AttributeSet::new();
        attributes.set("pin", "1234", false);
        attributes.remove("missing");
        attributes.remove("pin");
        assert!(attributes.is_empty());
        assert!(!attributes.is_protected("pin"));
    }

    #[test]
    fn test_rename_keeps_position_and_protection() {
        let mut attributes = AttributeSet::new();
        attributes.set("a", "1", false);
        attributes.set("b", "2", true);
        attributes.set("c", "3", false);

        attributes.rename("b", "secret").unwrap();
        assert_eq!(
            attributes.keys().collect::<Vec<_>>(),
            vec!["a", "secret", "c"]
        );
        assert!(attributes.is_protected("secret"));
        assert_eq!(attributes.value("secret"), Some("2"));
    }

    #[test]
    fn test_rename_rejects_collisions_and_reserved_names() {
        let mut attributes = AttributeSet::new();
        attributes.set("a", "1", false);
        attributes.set("b", "2", false);

        assert!(attributes.rename("a", "b").is_err());
        assert!(attributes.rename("a", "Password").is_err());
        assert!(attributes.rename("a", "").is_err());
        assert!(matches!(
            attributes.rename("zzz", "y"),
            Err(EntryEditError::NotFound(_))
        ));
    }

    #[test]
    fn test_copy_from_replaces_everything() {
        let mut source = AttributeSet::new();
        source.set("x", "1", true);

        let mut target = AttributeSet::new();
        target.set("old", "gone", false);
        target.copy_from(&source);

        assert_eq!(target, source);
        assert!(!target.contains("old"));
    }
}
