//! Session configuration snapshot.
//!
//! A session receives one `SessionConfig` when it opens and never consults
//! global settings again, so `has_been_modified` only depends on the record
//! and the working copy.

use crate::{EntryEditError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sequence used when an entry inherits auto-type from its parent.
pub const DEFAULT_INHERITED_SEQUENCE: &str = "{USERNAME}{TAB}{PASSWORD}{ENTER}";

/// Largest external file accepted as a private key candidate.
pub const DEFAULT_MAX_PRIVATE_KEY_SIZE: u64 = 1024 * 1024;

/// Default number of history snapshots kept per entry.
pub const DEFAULT_HISTORY_MAX_ITEMS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Hide the notes field until the user toggles it visible
    pub hide_notes: bool,
    /// Show passwords in clear text when the session opens
    pub show_passwords_cleartext: bool,
    /// Effective sequence shown for entries that inherit auto-type
    pub inherited_auto_type_sequence: String,
    /// Reject invalid auto-type sequences at commit instead of warning
    pub strict_sequence_validation: bool,
    /// Maximum number of history snapshots kept after a commit
    pub history_max_items: Option<usize>,
    /// Size limit for external private key files
    pub max_private_key_size: u64,
    /// Optional size limit for imported attachments
    pub max_attachment_size: Option<u64>,
    /// Enable the SSH agent page
    pub ssh_agent_enabled: bool,
    /// Directory last used for attachment import/export
    pub last_attachment_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hide_notes: false,
            show_passwords_cleartext: false,
            inherited_auto_type_sequence: DEFAULT_INHERITED_SEQUENCE.to_string(),
            strict_sequence_validation: false,
            history_max_items: Some(DEFAULT_HISTORY_MAX_ITEMS),
            max_private_key_size: DEFAULT_MAX_PRIVATE_KEY_SIZE,
            max_attachment_size: None,
            ssh_agent_enabled: false,
            last_attachment_dir: None,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from TOML text; missing keys take their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EntryEditError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.history_max_items, Some(10));
        assert_eq!(config.max_private_key_size, 1024 * 1024);
        assert!(!config.strict_sequence_validation);
        assert_eq!(
            config.inherited_auto_type_sequence,
            "{USERNAME}{TAB}{PASSWORD}{ENTER}"
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SessionConfig::from_toml(
            "hide_notes = true\nstrict_sequence_validation = true\nhistory_max_items = 3\n",
        )
        .unwrap();

        assert!(config.hide_notes);
        assert!(config.strict_sequence_validation);
        assert_eq!(config.history_max_items, Some(3));
        assert!(!config.ssh_agent_enabled);
        assert_eq!(config.max_private_key_size, DEFAULT_MAX_PRIVATE_KEY_SIZE);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = SessionConfig::from_toml("hide_notes = \"maybe\"").unwrap_err();
        assert!(matches!(err, EntryEditError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "ssh_agent_enabled = true\n").unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert!(config.ssh_agent_enabled);
    }
}
