//! History list of an edit session with deferred deletion.
//!
//! Deleting a snapshot only stages its index. The record's history is
//! touched exclusively by the commit, which removes the staged snapshots
//! before taking the new pre-commit snapshot.

use crate::entry::Entry;
use crate::{EntryEditError, Result};
use std::collections::BTreeSet;

/// Snapshots shown by the session plus the set staged for removal.
///
/// Indexes passed to `get` and `delete_index` address the visible list,
/// i.e. the snapshots that are not staged.
#[derive(Debug, Clone, Default)]
pub struct HistorySet {
    snapshots: Vec<Entry>,
    staged: BTreeSet<usize>,
}

impl HistorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the backing list and forget staged deletions
    pub fn set_snapshots(&mut self, snapshots: Vec<Entry>) {
        self.snapshots = snapshots;
        self.staged.clear();
    }

    /// Number of visible snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len() - self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.backing_index(index).map(|i| &self.snapshots[i])
    }

    /// Visible snapshots, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.snapshots
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.staged.contains(i))
            .map(|(_, snapshot)| snapshot)
    }

    /// Stage one visible snapshot for removal
    pub fn delete_index(&mut self, index: usize) -> Result<()> {
        let backing = self.backing_index(index).ok_or_else(|| {
            EntryEditError::InvalidInput(format!("No history entry at index {}", index))
        })?;
        self.staged.insert(backing);
        Ok(())
    }

    /// Stage every snapshot for removal
    pub fn delete_all(&mut self) {
        self.staged.extend(0..self.snapshots.len());
    }

    /// Indexes into the record's history list, ascending
    pub fn staged_for_deletion(&self) -> Vec<usize> {
        self.staged.iter().copied().collect()
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn clear_staged(&mut self) {
        self.staged.clear();
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.staged.clear();
    }

    fn backing_index(&self, index: usize) -> Option<usize> {
        (0..self.snapshots.len())
            .filter(|i| !self.staged.contains(i))
            .nth(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(titles: &[&str]) -> HistorySet {
        let snapshots = titles
            .iter()
            .map(|title| {
                let mut entry = Entry::new();
                entry.title = title.to_string();
                entry
            })
            .collect();
        let mut history = HistorySet::new();
        history.set_snapshots(snapshots);
        history
    }

    fn visible_titles(history: &HistorySet) -> Vec<String> {
        history.iter().map(|e| e.title.clone()).collect()
    }

    #[test]
    fn test_delete_index_addresses_visible_rows() {
        let mut history = history_of(&["a", "b", "c", "d"]);

        history.delete_index(1).unwrap();
        assert_eq!(visible_titles(&history), vec!["a", "c", "d"]);

        // "c" is now visible row 1 and backing index 2
        history.delete_index(1).unwrap();
        assert_eq!(visible_titles(&history), vec!["a", "d"]);
        assert_eq!(history.staged_for_deletion(), vec![1, 2]);
        assert_eq!(history.get(1).unwrap().title, "d");
    }

    #[test]
    fn test_delete_out_of_range() {
        let mut history = history_of(&["a"]);
        assert!(history.delete_index(1).is_err());
        history.delete_index(0).unwrap();
        assert!(history.delete_index(0).is_err());
    }

    #[test]
    fn test_delete_all_and_clear_staged() {
        let mut history = history_of(&["a", "b"]);
        history.delete_all();
        assert!(history.is_empty());
        assert!(history.has_staged());
        assert_eq!(history.staged_for_deletion(), vec![0, 1]);

        history.clear_staged();
        assert_eq!(history.len(), 2);
        assert!(!history.has_staged());
    }

    #[test]
    fn test_set_snapshots_resets_staging() {
        let mut history = history_of(&["a", "b"]);
        history.delete_index(0).unwrap();
        history.set_snapshots(vec![Entry::new()]);
        assert!(!history.has_staged());
        assert_eq!(history.len(), 1);
    }
}
