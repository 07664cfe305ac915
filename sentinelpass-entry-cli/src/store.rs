//! JSON record files read and written by the CLI

use anyhow::{Context, Result};
use sentinelpass_entry::Entry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// One entry plus the custom icons of the database it belongs to
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordFile {
    pub entry: Entry,
    #[serde(default)]
    pub custom_icons: HashSet<Uuid>,
}

impl RecordFile {
    pub fn new(entry: Entry) -> Self {
        Self {
            entry,
            custom_icons: HashSet::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read record file {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("Invalid record file {}", path.display()))?;
        Ok(record)
    }

    /// Write the record through a temporary file so a failed write never
    /// truncates the existing one
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}
