//! Entry edit session
//!
//! An `EditSession` binds to one record for its whole lifetime. Edits go to
//! a session-local working copy; nothing reaches the record until `apply` or
//! `commit`, which write the working copy back inside a single update
//! transaction so that at most one history snapshot is produced per commit.
//! Cancelling leaves the record as it was at open (or at the last apply).

mod attachment_ops;
mod attribute_ops;
mod history;
mod history_ops;
mod ssh_ops;
mod working_copy;


pub use attachment_ops::{AttachmentBatch, OverwriteDecision};
pub use attribute_ops::{AttributeEditor, NEW_ATTRIBUTE_NAME, PROTECTED_PLACEHOLDER};
pub use history::HistorySet;
pub use working_copy::WorkingCopy;

use crate::config::SessionConfig;
use crate::entry::{
    check_sequence, Association, CustomIconStore, Entry, EntryIcon, ExpiryPreset, SequenceIssue,
};
use crate::ssh::AgentSettings;
use crate::{EntryEditError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What the session was opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditMode {
    /// A freshly created record that is not yet in any collection
    Create,
    /// An existing record
    Edit,
    /// A historical snapshot; read-only
    ViewHistory,
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Open,
    Committed,
    Cancelled,
}

/// Notifications for the surrounding application
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session closed. `committed` is true when the record was written
    /// at least once during the session.
    EditFinished { committed: bool },
    /// The caller asked to open a history snapshot in its own session
    HistoryEntryActivated(Box<Entry>),
}

/// Severity of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageLevel {
    Error,
    Warning,
    Information,
}

/// Message published by the session for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMessage {
    pub level: MessageLevel,
    pub text: String,
}

/// Result of a successful apply or commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Whether the record changed. Always true when a new record is created.
    pub modified: bool,
    /// History snapshots removed from the record
    pub removed_history: usize,
    /// Advisory issues found in the custom auto-type sequence
    pub sequence_issues: Vec<SequenceIssue>,
}

/// Presentation toggles that never touch the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    pub notes_visible: bool,
    pub password_visible: bool,
}

enum Target<'a> {
    Record(&'a mut Entry),
    Snapshot(&'a Entry),
}

impl Target<'_> {
    fn entry(&self) -> &Entry {
        match self {
            Target::Record(entry) => entry,
            Target::Snapshot(entry) => entry,
        }
    }

    fn entry_mut(&mut self) -> Option<&mut Entry> {
        match self {
            Target::Record(entry) => Some(&mut **entry),
            Target::Snapshot(_) => None,
        }
    }
}

/// SSH settings as loaded from the record and as currently edited
#[derive(Debug, Clone)]
struct AgentPanel {
    loaded: AgentSettings,
    current: AgentSettings,
}

/// Edit session over a single entry
pub struct EditSession<'a> {
    target: Target<'a>,
    icons: &'a dyn CustomIconStore,
    mode: EditMode,
    phase: SessionPhase,
    config: SessionConfig,
    headline: String,
    working: WorkingCopy,
    attribute_editor: AttributeEditor,
    history: HistorySet,
    agent: Option<AgentPanel>,
    display: DisplayState,
    saved: bool,
    message: Option<SessionMessage>,
    events: Vec<SessionEvent>,
    last_attachment_dir: Option<PathBuf>,
}

impl<'a> EditSession<'a> {
    /// Open a session on `entry`. `parent_name` is the name of the group the
    /// record lives in (or will live in) and only feeds the headline.
    pub fn open(
        entry: &'a mut Entry,
        mode: EditMode,
        parent_name: &str,
        config: SessionConfig,
        icons: &'a dyn CustomIconStore,
    ) -> Self {
        Self::open_target(Target::Record(entry), mode, parent_name, config, icons)
    }

    /// Open a session on a freshly created record
    pub fn create(
        entry: &'a mut Entry,
        parent_name: &str,
        config: SessionConfig,
        icons: &'a dyn CustomIconStore,
    ) -> Self {
        Self::open(entry, EditMode::Create, parent_name, config, icons)
    }

    /// Open a session on an existing record
    pub fn edit(
        entry: &'a mut Entry,
        parent_name: &str,
        config: SessionConfig,
        icons: &'a dyn CustomIconStore,
    ) -> Self {
        Self::open(entry, EditMode::Edit, parent_name, config, icons)
    }

    /// Open a read-only session on a history snapshot
    pub fn view_history(
        snapshot: &'a Entry,
        parent_name: &str,
        config: SessionConfig,
        icons: &'a dyn CustomIconStore,
    ) -> Self {
        Self::open_target(
            Target::Snapshot(snapshot),
            EditMode::ViewHistory,
            parent_name,
            config,
            icons,
        )
    }

    fn open_target(
        target: Target<'a>,
        mode: EditMode,
        parent_name: &str,
        config: SessionConfig,
        icons: &'a dyn CustomIconStore,
    ) -> Self {
        let entry = target.entry();
        let working = WorkingCopy::from_entry(entry, &config.inherited_auto_type_sequence);
        let mut history = HistorySet::new();
        if mode != EditMode::ViewHistory {
            history.set_snapshots(entry.history().to_vec());
        }
        let headline = match mode {
            EditMode::Create => format!("{} > Add entry", parent_name),
            EditMode::Edit => format!("{} > {} > Edit entry", parent_name, entry.title),
            EditMode::ViewHistory => format!("{} > Entry history", parent_name),
        };
        let uuid = entry.uuid;
        let display = DisplayState {
            notes_visible: !config.hide_notes,
            password_visible: config.show_passwords_cleartext,
        };
        let last_attachment_dir = config.last_attachment_dir.clone();

        let mut session = Self {
            target,
            icons,
            mode,
            phase: SessionPhase::Open,
            config,
            headline,
            working,
            attribute_editor: AttributeEditor::default(),
            history,
            agent: None,
            display,
            saved: false,
            message: None,
            events: Vec::new(),
            last_attachment_dir,
        };
        session.select_first_attribute();
        session.reload_agent_settings();

        info!("Opened entry {} for {:?}", uuid, mode);
        session
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::Open
    }

    /// Whether edits are rejected
    pub fn is_read_only(&self) -> bool {
        self.mode == EditMode::ViewHistory
    }

    /// Breadcrumb title, e.g. `Root > Mail > Edit entry`
    pub fn headline(&self) -> &str {
        &self.headline
    }

    /// The record as currently stored
    pub fn entry(&self) -> &Entry {
        self.target.entry()
    }

    /// The pending edits
    pub fn working_copy(&self) -> &WorkingCopy {
        &self.working
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn display(&self) -> DisplayState {
        self.display
    }

    /// Whether the record has been written during this session
    pub fn saved(&self) -> bool {
        self.saved
    }

    pub fn message(&self) -> Option<&SessionMessage> {
        self.message.as_ref()
    }

    pub fn hide_message(&mut self) {
        self.message = None;
    }

    /// Drain pending notifications
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Directory last used for attachment import or export
    pub fn last_attachment_dir(&self) -> Option<&PathBuf> {
        self.last_attachment_dir.as_ref()
    }

    fn show_message(&mut self, level: MessageLevel, text: impl Into<String>) {
        self.message = Some(SessionMessage {
            level,
            text: text.into(),
        });
    }

    /// Publish `err` as an error message and return it
    fn fail<T>(&mut self, err: EntryEditError) -> Result<T> {
        self.show_message(MessageLevel::Error, err.to_string());
        Err(err)
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.phase != SessionPhase::Open {
            return self.fail(EntryEditError::SessionClosed);
        }
        Ok(())
    }

    fn ensure_writable(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.mode == EditMode::ViewHistory {
            debug!("Rejected edit of history snapshot");
            return self.fail(EntryEditError::ReadOnly);
        }
        Ok(())
    }

    fn edit_working<F: FnOnce(&mut WorkingCopy)>(&mut self, change: F) -> Result<()> {
        self.ensure_writable()?;
        change(&mut self.working);
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.edit_working(|w| w.title = title.to_string())
    }

    pub fn set_username(&mut self, username: &str) -> Result<()> {
        self.edit_working(|w| w.username = username.to_string())
    }

    pub fn set_url(&mut self, url: &str) -> Result<()> {
        self.edit_working(|w| w.url = url.to_string())
    }

    /// Set the password; the confirmation field is left alone
    pub fn set_password(&mut self, password: &str) -> Result<()> {
        self.edit_working(|w| w.password = password.to_string())
    }

    pub fn set_password_repeat(&mut self, password: &str) -> Result<()> {
        self.edit_working(|w| w.password_repeat = password.to_string())
    }

    /// Set password and confirmation together, as a generator would
    pub fn set_generated_password(&mut self, password: &str) -> Result<()> {
        self.edit_working(|w| {
            w.password = password.to_string();
            w.password_repeat = password.to_string();
        })
    }

    pub fn set_notes(&mut self, notes: &str) -> Result<()> {
        self.edit_working(|w| w.notes = notes.to_string())
    }

    pub fn set_expires(&mut self, expires: bool) -> Result<()> {
        self.edit_working(|w| w.expires = expires)
    }

    pub fn set_expiry_time(&mut self, time: DateTime<Utc>) -> Result<()> {
        self.edit_working(|w| w.expiry_time = time)
    }

    /// Enable expiry at the time `preset` reaches from now
    pub fn apply_expiry_preset(&mut self, preset: ExpiryPreset) -> Result<()> {
        let time = preset.apply_to(Utc::now());
        self.edit_working(|w| {
            w.expires = true;
            w.expiry_time = time;
        })
    }

    pub fn set_icon(&mut self, icon: EntryIcon) -> Result<()> {
        self.edit_working(|w| w.icon = icon)
    }

    pub fn set_auto_type_enabled(&mut self, enabled: bool) -> Result<()> {
        self.edit_working(|w| w.auto_type_enabled = enabled)
    }

    /// Switch between the inherited and a custom sequence
    pub fn set_inherit_sequence(&mut self, inherit: bool) -> Result<()> {
        let inherited = self.config.inherited_auto_type_sequence.clone();
        self.edit_working(|w| {
            w.inherit_sequence = inherit;
            if inherit {
                w.sequence = inherited;
            }
        })
    }

    /// Set a custom sequence; this turns inheritance off
    pub fn set_auto_type_sequence(&mut self, sequence: &str) -> Result<()> {
        self.edit_working(|w| {
            w.inherit_sequence = false;
            w.sequence = sequence.to_string();
        })
    }

    /// Append an empty association; returns its index
    pub fn add_association(&mut self) -> Result<usize> {
        self.ensure_writable()?;
        self.working.associations.add(Association::default());
        Ok(self.working.associations.len() - 1)
    }

    pub fn update_association(&mut self, index: usize, association: Association) -> Result<()> {
        self.ensure_writable()?;
        match self.working.associations.update(index, association) {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    pub fn remove_association(&mut self, index: usize) -> Result<()> {
        self.ensure_writable()?;
        match self.working.associations.remove(index) {
            Ok(_) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    pub fn toggle_notes_visible(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.display.notes_visible = !self.display.notes_visible;
        Ok(())
    }

    pub fn toggle_password_visible(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.display.password_visible = !self.display.password_visible;
        Ok(())
    }

    /// Issues in the custom sequence; an inherited sequence is never checked
    pub fn sequence_issues(&self) -> Vec<SequenceIssue> {
        if self.working.inherit_sequence {
            Vec::new()
        } else {
            check_sequence(&self.working.sequence)
        }
    }

    /// Write the working copy to the record and keep the session open.
    ///
    /// Fails without touching the record when the password confirmation
    /// differs, or when strict sequence validation finds an issue.
    pub fn apply(&mut self) -> Result<CommitOutcome> {
        self.ensure_writable()?;

        if !self.working.passwords_match() {
            warn!("Commit rejected: password confirmation differs");
            return self.fail(EntryEditError::PasswordMismatch);
        }

        let sequence_issues = self.sequence_issues();
        if !sequence_issues.is_empty() && self.config.strict_sequence_validation {
            let detail = sequence_issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return self.fail(EntryEditError::InvalidSequence(detail));
        }

        self.attribute_editor.flush_into(&mut self.working.attributes);
        self.working.associations.remove_empty();
        if let Some(panel) = self.agent.as_mut() {
            if let Err(e) = panel.store_into(&mut self.working.attachments) {
                return self.fail(e);
            }
            panel.loaded = panel.current.clone();
        }

        let staged = self.history.staged_for_deletion();
        let creating = self.mode == EditMode::Create;
        let max_history = self.config.history_max_items;
        let Some(entry) = self.target.entry_mut() else {
            return self.fail(EntryEditError::ReadOnly);
        };

        let removed_history = entry.remove_history_items(&staged);
        let modified = if creating {
            self.working.apply_to(entry);
            true
        } else {
            entry.begin_update();
            self.working.apply_to(entry);
            entry.end_update()
        };
        if modified && !creating {
            if let Some(max) = max_history {
                entry.truncate_history(max);
            }
        }
        let snapshots = entry.history().to_vec();
        let uuid = entry.uuid;

        self.history.set_snapshots(snapshots);
        self.saved = true;

        if sequence_issues.is_empty() {
            self.message = None;
        } else {
            let detail = sequence_issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            warn!("Entry {} saved with auto-type issues: {}", uuid, detail);
            self.show_message(MessageLevel::Warning, format!("Auto-type {}", detail));
        }

        info!(
            "Applied changes to entry {} (modified: {}, history removed: {})",
            uuid, modified, removed_history
        );
        Ok(CommitOutcome {
            modified,
            removed_history,
            sequence_issues,
        })
    }

    /// Apply and close the session
    pub fn commit(&mut self) -> Result<CommitOutcome> {
        let outcome = self.apply()?;
        self.close(SessionPhase::Committed);
        Ok(outcome)
    }

    /// Close without writing pending edits.
    ///
    /// A created record that was never saved loses a custom icon the
    /// database does not know, so it cannot reference a dangling icon.
    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_open()?;

        if self.mode == EditMode::Create && !self.saved {
            if let Some(entry) = self.target.entry_mut() {
                if let EntryIcon::Custom(uuid) = entry.icon {
                    if !self.icons.contains_custom_icon(&uuid) {
                        warn!("Resetting unknown custom icon {} on discarded entry", uuid);
                        entry.icon = EntryIcon::default();
                    }
                }
            }
        }

        self.close(SessionPhase::Cancelled);
        Ok(())
    }

    fn close(&mut self, phase: SessionPhase) {
        let committed = self.saved;
        self.working.wipe();
        self.attribute_editor.wipe();
        self.history.clear();
        self.agent = None;
        self.message = None;
        self.phase = phase;
        self.events.push(SessionEvent::EditFinished { committed });
        info!(
            "Closed entry {} ({:?}, committed: {})",
            self.target.entry().uuid,
            phase,
            committed
        );
    }

    /// Whether committing now would change the record
    pub fn has_been_modified(&self) -> bool {
        if self.phase != SessionPhase::Open || self.mode == EditMode::ViewHistory {
            return false;
        }
        if self.history.has_staged() {
            return true;
        }

        let mut pending = self.working.clone();
        self.attribute_editor.flush_into(&mut pending.attributes);
        pending.associations.remove_empty();
        if let Some(panel) = &self.agent {
            if let Err(e) = panel.store_into(&mut pending.attachments) {
                warn!("Ignoring SSH settings during change check: {}", e);
            }
        }

        let mut scratch = self.target.entry().clone();
        scratch.begin_update();
        pending.apply_to(&mut scratch);
        scratch.end_update()
    }
}
