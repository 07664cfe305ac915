use super::{AgentPanel, EditSession};
use crate::entry::AttachmentSet;
use crate::ssh::{AgentSettings, KeyAgent, KeySource, OpenSshKey, SETTINGS_ATTACHMENT};
use crate::{EntryEditError, Result};
use std::fs;
use tracing::{debug, info, warn};

impl AgentPanel {
    /// `settings` as they would be stored: the allow flag follows the
    /// add/remove flags and the temp-file flag is kept from the record
    fn normalised(&self, settings: &AgentSettings) -> AgentSettings {
        let mut settings = settings.clone();
        settings.allow_use_of_ssh_key =
            settings.add_at_database_open || settings.remove_at_database_close;
        settings.save_attachment_to_temp_file = self.loaded.save_attachment_to_temp_file;
        settings
    }

    /// Write the edited settings into `attachments`.
    ///
    /// Untouched settings leave the attachment byte-for-byte alone, even
    /// when the stored document disagrees with the derived allow flag.
    /// Default settings remove the settings attachment.
    pub(super) fn store_into(&self, attachments: &mut AttachmentSet) -> Result<()> {
        if self.current == self.loaded {
            return Ok(());
        }

        let settings = self.normalised(&self.current);
        if settings.is_default() {
            attachments.remove(SETTINGS_ATTACHMENT);
        } else if settings != self.normalised(&self.loaded) {
            attachments.set(SETTINGS_ATTACHMENT, settings.to_xml()?);
        }
        Ok(())
    }
}

impl EditSession<'_> {
    /// Reload agent settings from the working copy's attachments
    pub(super) fn reload_agent_settings(&mut self) {
        if !self.config.ssh_agent_enabled {
            self.agent = None;
            return;
        }

        let settings = match self.working.attachments.get(SETTINGS_ATTACHMENT) {
            Some(data) => AgentSettings::from_xml(data).unwrap_or_else(|e| {
                warn!("Ignoring unreadable SSH agent settings: {}", e);
                AgentSettings::default()
            }),
            None => AgentSettings::default(),
        };
        self.agent = Some(AgentPanel {
            loaded: settings.clone(),
            current: settings,
        });
    }

    /// Agent settings as currently edited; `None` when agent support is off
    pub fn agent_settings(&self) -> Option<&AgentSettings> {
        self.agent.as_ref().map(|panel| &panel.current)
    }

    pub fn set_agent_settings(&mut self, settings: AgentSettings) -> Result<()> {
        self.ensure_writable()?;
        match self.agent.as_mut() {
            Some(panel) => {
                panel.current = settings;
                Ok(())
            }
            None => self.fail(EntryEditError::InvalidInput(
                "SSH agent support is disabled".to_string(),
            )),
        }
    }

    /// Attachments that could hold a private key
    pub fn key_attachment_candidates(&self) -> Vec<String> {
        self.working
            .attachments
            .keys()
            .filter(|name| *name != SETTINGS_ATTACHMENT)
            .map(str::to_string)
            .collect()
    }

    fn private_key_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(panel) = &self.agent else {
            return Ok(None);
        };
        let settings = panel.current.clone();

        match settings.selected_type {
            KeySource::Attachment => Ok(self
                .working
                .attachments
                .get(&settings.attachment_name)
                .filter(|data| !data.is_empty())
                .map(<[u8]>::to_vec)),
            KeySource::File => {
                if settings.file_name.is_empty() {
                    return Ok(None);
                }
                let limit = self.config.max_private_key_size;
                let read_error = |e: std::io::Error| EntryEditError::AttachmentRead {
                    name: settings.file_name.clone(),
                    reason: e.to_string(),
                };
                let size = match fs::metadata(&settings.file_name) {
                    Ok(meta) => meta.len(),
                    Err(e) => return self.fail(read_error(e)),
                };
                if size > limit {
                    return self.fail(EntryEditError::AttachmentTooLarge {
                        name: settings.file_name.clone(),
                        size,
                        limit,
                    });
                }
                match fs::read(&settings.file_name) {
                    Ok(data) if data.is_empty() => Ok(None),
                    Ok(data) => Ok(Some(data)),
                    Err(e) => self.fail(read_error(e)),
                }
            }
        }
    }

    /// Parse the configured private key without decrypting it.
    ///
    /// Returns `Ok(None)` when no key source is configured or it is empty.
    pub fn load_private_key(&mut self) -> Result<Option<OpenSshKey>> {
        self.ensure_open()?;
        let Some(data) = self.private_key_bytes()? else {
            return Ok(None);
        };
        match OpenSshKey::parse(&data) {
            Ok(key) => {
                debug!("Loaded {} key {}", key.key_type(), key.fingerprint());
                Ok(Some(key))
            }
            Err(e) => self.fail(e),
        }
    }

    /// Load the private key and open it with the entry's password
    pub fn decrypt_private_key(&mut self) -> Result<OpenSshKey> {
        let Some(mut key) = self.load_private_key()? else {
            return self.fail(EntryEditError::NotFound("private key".to_string()));
        };
        let passphrase = self.working.password.clone();
        match key.open(&passphrase) {
            Ok(()) => Ok(key),
            Err(e) => self.fail(e),
        }
    }

    /// `authorized_keys` line of the configured key, if any
    pub fn public_key_text(&mut self) -> Result<Option<String>> {
        Ok(self.load_private_key()?.map(|key| key.public_key()))
    }

    /// Add the configured key to `agent` using the edited constraints
    pub fn add_key_to_agent(&mut self, agent: &mut dyn KeyAgent) -> Result<()> {
        let key = self.decrypt_private_key()?;
        let Some(settings) = self.agent_settings().cloned() else {
            return self.fail(EntryEditError::InvalidInput(
                "SSH agent support is disabled".to_string(),
            ));
        };

        let lifetime = settings
            .use_lifetime_constraint_when_adding
            .then_some(settings.lifetime_constraint_duration);
        if let Err(e) =
            agent.add_identity(&key, lifetime, settings.use_confirm_constraint_when_adding)
        {
            return self.fail(e);
        }
        if settings.remove_at_database_close {
            agent.remove_identity_at_lock(&key, self.target.entry().uuid);
        }
        info!("Added entry key {} to agent", key.fingerprint());
        Ok(())
    }

    /// Remove the configured key from `agent`
    pub fn remove_key_from_agent(&mut self, agent: &mut dyn KeyAgent) -> Result<()> {
        let Some(key) = self.load_private_key()? else {
            return self.fail(EntryEditError::NotFound("private key".to_string()));
        };
        if let Err(e) = agent.remove_identity(&key) {
            return self.fail(e);
        }
        Ok(())
    }
}
