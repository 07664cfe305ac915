//! SentinelPass entry editing
//!
//! This library models the edit session behind the entry editor: a working
//! copy of a credential record, change detection against the record,
//! atomic commits with history versioning, and clean cancellation.
//! Presentation (forms, dialogs, clipboard) is left to the caller.

pub mod config;
pub mod entry;
pub mod session;
pub mod ssh;

pub use config::SessionConfig;
pub use entry::{
    Association, AttachmentSet, AttributeSet, AutoTypeRuleSet, CustomIconStore, Entry, EntryIcon,
    ExpiryPreset, SequenceIssue,
};
pub use session::{
    AttachmentBatch, CommitOutcome, DisplayState, EditMode, EditSession, HistorySet, MessageLevel,
    OverwriteDecision, SessionEvent, SessionMessage, SessionPhase, WorkingCopy,
};
pub use ssh::{
    AgentSettings, KeyAgent, KeySource, OpenSshKey, SshAgentClient, SshKeyType,
    SETTINGS_ATTACHMENT,
};

use thiserror::Error;

/// Result type for entry editing operations
pub type Result<T> = std::result::Result<T, EntryEditError>;

/// Error type for entry editing operations
#[derive(Error, Debug)]
pub enum EntryEditError {
    #[error("Different passwords supplied.")]
    PasswordMismatch,

    #[error("Entry is read-only in history view")]
    ReadOnly,

    #[error("Edit session is closed")]
    SessionClosed,

    #[error("Unable to read attachment {name}: {reason}")]
    AttachmentRead { name: String, reason: String },

    #[error("Unable to save attachment {name}: {reason}")]
    AttachmentWrite { name: String, reason: String },

    #[error("File too large: {name} ({size} bytes, limit {limit} bytes)")]
    AttachmentTooLarge { name: String, size: u64, limit: u64 },

    #[error("{0}")]
    KeyParse(String),

    #[error("Invalid auto-type sequence: {0}")]
    InvalidSequence(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
