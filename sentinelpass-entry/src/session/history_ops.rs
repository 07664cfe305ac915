use super::{EditMode, EditSession, HistorySet, SessionEvent, WorkingCopy};
use crate::{EntryEditError, Result};
use tracing::{debug, info};

impl EditSession<'_> {
    /// History snapshots still visible in this session
    pub fn history(&self) -> &HistorySet {
        &self.history
    }

    /// Stage a snapshot for removal at the next commit
    pub fn delete_history_entry(&mut self, index: usize) -> Result<()> {
        self.ensure_writable()?;
        if let Err(e) = self.history.delete_index(index) {
            return self.fail(e);
        }
        debug!("Staged history entry {} for deletion", index);
        Ok(())
    }

    /// Stage every snapshot for removal at the next commit
    pub fn delete_all_history(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.history.delete_all();
        Ok(())
    }

    /// Load a snapshot's content into the working copy.
    ///
    /// The record is untouched until the next commit, which then versions
    /// the restored state like any other edit.
    pub fn restore_history_entry(&mut self, index: usize) -> Result<()> {
        self.ensure_writable()?;
        let Some(snapshot) = self.history.get(index) else {
            return self.fail(EntryEditError::NotFound(format!("history entry {}", index)));
        };

        self.working = WorkingCopy::from_entry(snapshot, &self.config.inherited_auto_type_sequence);
        self.select_first_attribute();
        self.reload_agent_settings();
        info!("Restored history entry {} into the editor", index);
        Ok(())
    }

    /// Ask the application to open a snapshot in a read-only session
    pub fn show_history_entry(&mut self, index: usize) -> Result<()> {
        self.ensure_open()?;
        if self.mode == EditMode::ViewHistory {
            return self.fail(EntryEditError::ReadOnly);
        }
        let Some(snapshot) = self.history.get(index).cloned() else {
            return self.fail(EntryEditError::NotFound(format!("history entry {}", index)));
        };
        self.events.push(SessionEvent::HistoryEntryActivated(Box::new(snapshot)));
        Ok(())
    }
}
