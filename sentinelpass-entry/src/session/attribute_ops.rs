use super::{EditMode, EditSession};
use crate::entry::AttributeSet;
use crate::{EntryEditError, Result};
use tracing::debug;
use zeroize::Zeroize;

/// Text shown in place of a protected value until it is revealed
pub const PROTECTED_PLACEHOLDER: &str = "[PROTECTED] Press reveal to view or edit";

/// Base name for inserted attributes
pub const NEW_ATTRIBUTE_NAME: &str = "New attribute";

/// Value editor for the selected custom attribute.
///
/// The buffer is flushed back into the attribute set when the selection
/// moves away and when the session applies.
#[derive(Debug, Clone, Default)]
pub struct AttributeEditor {
    selected: Option<String>,
    text: String,
    editable: bool,
}

impl AttributeEditor {
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Buffer content, or the protected placeholder
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    fn show(&mut self, key: Option<&str>, attributes: &AttributeSet) {
        self.text.zeroize();
        self.selected = key.map(str::to_string);
        match key {
            Some(key) if attributes.is_protected(key) => {
                self.text = PROTECTED_PLACEHOLDER.to_string();
                self.editable = false;
            }
            Some(key) => {
                self.text = attributes.value(key).unwrap_or_default().to_string();
                self.editable = true;
            }
            None => self.editable = false,
        }
    }

    fn reveal(&mut self, attributes: &AttributeSet) {
        if let Some(key) = &self.selected {
            self.text = attributes.value(key).unwrap_or_default().to_string();
            self.editable = true;
        }
    }

    /// Write the buffer to the selected attribute, keeping its protection
    pub(super) fn flush_into(&self, attributes: &mut AttributeSet) {
        if let Some(key) = &self.selected {
            if self.editable && attributes.contains(key) {
                let protected = attributes.is_protected(key);
                attributes.set(key, &self.text, protected);
            }
        }
    }

    pub(super) fn wipe(&mut self) {
        self.text.zeroize();
        self.selected = None;
        self.editable = false;
    }
}

impl EditSession<'_> {
    /// Editor state of the selected attribute
    pub fn attribute_editor(&self) -> &AttributeEditor {
        &self.attribute_editor
    }

    pub(super) fn select_first_attribute(&mut self) {
        let first = self.working.attributes.keys().next().map(str::to_string);
        self.attribute_editor.show(first.as_deref(), &self.working.attributes);
    }

    /// Move the editor to `key`, flushing the buffer of the previous one
    pub fn select_attribute(&mut self, key: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        if let Some(key) = key {
            if !self.working.attributes.contains(key) {
                return self.fail(EntryEditError::NotFound(format!("attribute '{}'", key)));
            }
        }
        if self.attribute_editor.selected() == key {
            return Ok(());
        }

        if self.mode != EditMode::ViewHistory {
            self.attribute_editor.flush_into(&mut self.working.attributes);
        }
        self.attribute_editor.show(key, &self.working.attributes);
        Ok(())
    }

    /// Replace the editor buffer of the selected attribute
    pub fn edit_attribute_text(&mut self, text: &str) -> Result<()> {
        self.ensure_writable()?;
        if self.attribute_editor.selected.is_none() {
            return self.fail(EntryEditError::InvalidInput(
                "No attribute selected".to_string(),
            ));
        }
        if !self.attribute_editor.editable {
            return self.fail(EntryEditError::InvalidInput(
                "Protected attribute must be revealed before editing".to_string(),
            ));
        }
        self.attribute_editor.text = text.to_string();
        Ok(())
    }

    /// Add an attribute with a free placeholder name and select it
    pub fn insert_attribute(&mut self) -> Result<String> {
        self.ensure_writable()?;
        let name = (0..)
            .map(|n| {
                if n == 0 {
                    NEW_ATTRIBUTE_NAME.to_string()
                } else {
                    format!("{} {}", NEW_ATTRIBUTE_NAME, n)
                }
            })
            .find(|candidate| !self.working.attributes.contains(candidate))
            .unwrap_or_else(|| NEW_ATTRIBUTE_NAME.to_string());

        self.working.attributes.set(&name, "", false);
        self.attribute_editor.flush_into(&mut self.working.attributes);
        self.attribute_editor.show(Some(&name), &self.working.attributes);
        debug!("Inserted attribute '{}'", name);
        Ok(name)
    }

    /// Set an attribute directly. Reserved names are rejected.
    pub fn set_attribute(&mut self, key: &str, value: &str, protected: bool) -> Result<()> {
        self.ensure_writable()?;
        if key.is_empty() || AttributeSet::is_reserved_key(key) {
            return self.fail(EntryEditError::InvalidInput(format!(
                "'{}' is not a valid attribute name",
                key
            )));
        }
        self.working.attributes.set(key, value, protected);
        if self.attribute_editor.selected() == Some(key) {
            self.attribute_editor.show(Some(key), &self.working.attributes);
        }
        Ok(())
    }

    pub fn rename_attribute(&mut self, old: &str, new: &str) -> Result<()> {
        self.ensure_writable()?;
        let selected = self.attribute_editor.selected() == Some(old);
        if selected {
            self.attribute_editor.flush_into(&mut self.working.attributes);
        }
        if let Err(e) = self.working.attributes.rename(old, new) {
            return self.fail(e);
        }
        if selected {
            self.attribute_editor.show(Some(new), &self.working.attributes);
        }
        Ok(())
    }

    /// Remove an attribute; the selection is cleared when it was selected
    pub fn remove_attribute(&mut self, key: &str) -> Result<()> {
        self.ensure_writable()?;
        if !self.working.attributes.contains(key) {
            return self.fail(EntryEditError::NotFound(format!("attribute '{}'", key)));
        }
        self.working.attributes.remove(key);
        if self.attribute_editor.selected() == Some(key) {
            self.attribute_editor.show(None, &self.working.attributes);
        }
        Ok(())
    }

    /// Toggle protection of the selected attribute.
    ///
    /// Protecting stores the visible value and hides it behind the
    /// placeholder. A hidden value is kept as stored.
    pub fn protect_selected_attribute(&mut self, protect: bool) -> Result<()> {
        self.ensure_writable()?;
        let Some(key) = self.attribute_editor.selected.clone() else {
            return self.fail(EntryEditError::InvalidInput(
                "No attribute selected".to_string(),
            ));
        };
        if self.working.attributes.is_protected(&key) == protect {
            return Ok(());
        }

        let value = if self.attribute_editor.editable {
            self.attribute_editor.text.clone()
        } else {
            self.working
                .attributes
                .value(&key)
                .unwrap_or_default()
                .to_string()
        };
        self.working.attributes.set(&key, &value, protect);
        self.attribute_editor.show(Some(&key), &self.working.attributes);
        Ok(())
    }

    /// Show the value of a protected attribute. Allowed in history view.
    pub fn reveal_selected_attribute(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.attribute_editor.selected.is_none() {
            return self.fail(EntryEditError::InvalidInput(
                "No attribute selected".to_string(),
            ));
        }
        self.attribute_editor.reveal(&self.working.attributes);
        Ok(())
    }
}
