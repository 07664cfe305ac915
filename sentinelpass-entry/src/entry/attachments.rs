//! Binary attachments of an entry.
//!
//! Each payload keeps a SHA-256 digest taken when it is stored. Comparing two
//! sets compares names and digests, which keeps change detection cheap for
//! large files.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::EntryEditError;

#[derive(Debug, Clone)]
struct Attachment {
    data: Vec<u8>,
    digest: [u8; 32],
}

impl Attachment {
    fn new(data: Vec<u8>) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(&data));
        Self { data, digest }
    }
}

/// Attachments keyed by unique filename
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<String, String>",
    try_from = "BTreeMap<String, String>"
)]
pub struct AttachmentSet {
    items: BTreeMap<String, Attachment>,
}

impl AttachmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `name`, replacing any existing payload
    pub fn set(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        self.items.insert(name.to_string(), Attachment::new(data.into()));
    }

    /// Remove one attachment; returns whether it existed
    pub fn remove(&mut self, name: &str) -> bool {
        self.items.remove(name).is_some()
    }

    /// Remove several attachments at once
    pub fn remove_all<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            self.items.remove(name.as_ref());
        }
    }

    /// Payload of `name`, or an empty slice when absent
    pub fn value(&self, name: &str) -> &[u8] {
        self.get(name).unwrap_or(&[])
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.items.get(name).map(|item| item.data.as_slice())
    }

    /// Hex SHA-256 digest of a stored payload
    pub fn digest_hex(&self, name: &str) -> Option<String> {
        self.items.get(name).map(|item| hex::encode(item.digest))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all payload sizes in bytes
    pub fn total_size(&self) -> usize {
        self.items.values().map(|item| item.data.len()).sum()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the whole set with a copy of `other`
    pub fn copy_from(&mut self, other: &AttachmentSet) {
        self.items.clone_from(&other.items);
    }
}

impl PartialEq for AttachmentSet {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(other.items.iter())
                .all(|((name_a, a), (name_b, b))| name_a == name_b && a.digest == b.digest)
    }
}

impl Eq for AttachmentSet {}

impl From<AttachmentSet> for BTreeMap<String, String> {
    fn from(set: AttachmentSet) -> Self {
        set.items
            .into_iter()
            .map(|(name, item)| (name, STANDARD.encode(item.data)))
            .collect()
    }
}

impl TryFrom<BTreeMap<String, String>> for AttachmentSet {
    type Error = EntryEditError;

    fn try_from(encoded: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut set = AttachmentSet::new();
        for (name, body) in encoded {
            let data = STANDARD.decode(body.as_bytes()).map_err(|e| {
                EntryEditError::Serialization(format!("attachment '{}': {}", name, e))
            })?;
            set.set(&name, data);
        }
        Ok(set)
    }
}
