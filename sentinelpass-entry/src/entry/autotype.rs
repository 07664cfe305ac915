//! Auto-type window associations and sequence checks.

use crate::{EntryEditError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SEQUENCE_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\{[A-Z]*(?:\s[0-9]*)?\})*$").expect("static auto-type syntax pattern")
});

static HIGH_REPETITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{3,}").expect("static repetition pattern"));

/// One window-title association. An empty `sequence` falls back to the
/// entry's default sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub window: String,
    #[serde(default)]
    pub sequence: String,
}

impl Association {
    pub fn new(window: &str, sequence: &str) -> Self {
        Self {
            window: window.to_string(),
            sequence: sequence.to_string(),
        }
    }
}

/// Ordered auto-type associations; the first matching window wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AutoTypeRuleSet {
    items: Vec<Association>,
}

impl AutoTypeRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an association
    pub fn add(&mut self, association: Association) {
        self.items.push(association);
    }

    pub fn get(&self, index: usize) -> Option<&Association> {
        self.items.get(index)
    }

    /// Replace the association at `index`
    pub fn update(&mut self, index: usize, association: Association) -> Result<()> {
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| out_of_range(index))?;
        *slot = association;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Association> {
        if index >= self.items.len() {
            return Err(out_of_range(index));
        }
        Ok(self.items.remove(index))
    }

    /// Drop associations without a window pattern; returns how many went
    pub fn remove_empty(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.window.is_empty());
        before - self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Association> {
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

    pub fn copy_from(&mut self, other: &AutoTypeRuleSet) {
        self.items.clone_from(&other.items);
    }
}

fn out_of_range(index: usize) -> EntryEditError {
    EntryEditError::InvalidInput(format!("No auto-type association at index {}", index))
}

/// Problems found in a custom auto-type sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceIssue {
    /// Not a run of `{KEY}` / `{KEY N}` tokens
    InvalidSyntax,
    /// Three or more consecutive digits, usually a mistyped repeat count
    ExcessiveRepetition,
}

impl std::fmt::Display for SequenceIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceIssue::InvalidSyntax => write!(f, "sequence syntax is invalid"),
            SequenceIssue::ExcessiveRepetition => {
                write!(f, "sequence contains a very high repetition count")
            }
        }
    }
}

/// Check a custom auto-type sequence. An empty result means no issues.
pub fn check_sequence(sequence: &str) -> Vec<SequenceIssue> {
    let mut issues = Vec::new();
    if !SEQUENCE_SYNTAX.is_match(sequence) {
        issues.push(SequenceIssue::InvalidSyntax);
    }
    if HIGH_REPETITION.is_match(sequence) {
        issues.push(SequenceIssue::ExcessiveRepetition);
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_empty_keeps_order() {
        let mut rules = AutoTypeRuleSet::new();
        rules.add(Association::new("Login - Firefox", ""));
        rules.add(Association::default());
        rules.add(Association::new("*Bank*", "{PASSWORD}{ENTER}"));

        assert_eq!(rules.remove_empty(), 1);
        let windows: Vec<_> = rules.iter().map(|a| a.window.as_str()).collect();
        assert_eq!(windows, vec!["Login - Firefox", "*Bank*"]);
    }

    #[test]
    fn test_update_and_remove_by_index() {
        let mut rules = AutoTypeRuleSet::new();
        rules.add(Association::default());
        rules
            .update(0, Association::new("Terminal", "{USERNAME}"))
            .unwrap();
        assert_eq!(rules.get(0).unwrap().window, "Terminal");

        assert!(rules.update(3, Association::default()).is_err());
        assert!(rules.remove(1).is_err());
        assert_eq!(rules.remove(0).unwrap().sequence, "{USERNAME}");
        assert!(rules.is_empty());
    }

    #[test]
    fn test_valid_sequences() {
        assert!(check_sequence("").is_empty());
        assert!(check_sequence("{USERNAME}{TAB}{PASSWORD}{ENTER}").is_empty());
        assert!(check_sequence("{tab 5}{Enter}").is_empty());
        assert!(check_sequence("{DELAY 10}").is_empty());
    }

    #[test]
    fn test_invalid_syntax() {
        assert_eq!(
            check_sequence("{USERNAME}{TAB"),
            vec![SequenceIssue::InvalidSyntax]
        );
        assert_eq!(check_sequence("{F1}"), vec![SequenceIssue::InvalidSyntax]);
        assert_eq!(
            check_sequence("plain text"),
            vec![SequenceIssue::InvalidSyntax]
        );
    }

    #[test]
    fn test_excessive_repetition() {
        assert_eq!(
            check_sequence("{TAB 100}"),
            vec![SequenceIssue::ExcessiveRepetition]
        );
        assert_eq!(check_sequence("{TAB 99}"), Vec::<SequenceIssue>::new());
        assert_eq!(
            check_sequence("x1234"),
            vec![
                SequenceIssue::InvalidSyntax,
                SequenceIssue::ExcessiveRepetition
            ]
        );
    }
}
