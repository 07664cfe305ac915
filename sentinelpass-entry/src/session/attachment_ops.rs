use super::{EditSession, MessageLevel};
use crate::{EntryEditError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of a batch attachment operation.
///
/// Items are processed independently; failures are collected instead of
/// aborting the batch.
#[derive(Debug, Default)]
pub struct AttachmentBatch {
    /// Attachment names imported or exported
    pub applied: Vec<String>,
    /// Items skipped because the destination existed
    pub skipped: Vec<String>,
    pub errors: Vec<EntryEditError>,
    /// The caller stopped the batch before all items were processed
    pub aborted: bool,
}

impl AttachmentBatch {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && !self.aborted
    }
}

/// Answer to "the destination file exists, overwrite it?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteDecision {
    Overwrite,
    Skip,
    Abort,
}

fn describe(err: &EntryEditError) -> String {
    match err {
        EntryEditError::AttachmentRead { name, reason }
        | EntryEditError::AttachmentWrite { name, reason } => format!("{} - {}", name, reason),
        other => other.to_string(),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Destination path for `name` inside `dir`; directory parts of the name
/// are dropped so an attachment can never escape `dir`.
fn export_path(dir: &Path, name: &str) -> Option<PathBuf> {
    Path::new(name).file_name().map(|file| dir.join(file))
}

impl EditSession<'_> {
    /// Add or replace an attachment from memory
    pub fn add_attachment(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        self.ensure_writable()?;
        if name.is_empty() {
            return self.fail(EntryEditError::InvalidInput(
                "Attachment name cannot be empty".to_string(),
            ));
        }
        self.working.attachments.set(name, data);
        Ok(())
    }

    /// Remove attachments by name; unknown names are ignored
    pub fn remove_attachments<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        self.ensure_writable()?;
        self.working.attachments.remove_all(names);
        Ok(())
    }

    /// Rename an attachment, replacing any attachment already using `new`
    pub fn rename_attachment(&mut self, old: &str, new: &str) -> Result<()> {
        self.ensure_writable()?;
        if new.is_empty() {
            return self.fail(EntryEditError::InvalidInput(
                "Attachment name cannot be empty".to_string(),
            ));
        }
        let Some(data) = self.working.attachments.get(old).map(<[u8]>::to_vec) else {
            return self.fail(EntryEditError::NotFound(format!("attachment '{}'", old)));
        };
        if old != new {
            self.working.attachments.remove(old);
            self.working.attachments.set(new, data);
        }
        Ok(())
    }

    /// Import files as attachments named after the file.
    ///
    /// Every readable file is added; unreadable or oversized files are
    /// reported together in one error message.
    pub fn import_attachments<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<AttachmentBatch> {
        self.ensure_writable()?;
        let limit = self.config.max_attachment_size;
        let mut batch = AttachmentBatch::default();

        for path in paths {
            let path = path.as_ref();
            let name = file_label(path);
            match read_attachment(path, &name, limit) {
                Ok(data) => {
                    debug!("Imported attachment '{}' ({} bytes)", name, data.len());
                    self.working.attachments.set(&name, data);
                    batch.applied.push(name);
                }
                Err(e) => batch.errors.push(e),
            }
        }

        if let Some(dir) = paths.first().and_then(|p| p.as_ref().parent()) {
            self.last_attachment_dir = Some(dir.to_path_buf());
        }

        if !batch.errors.is_empty() {
            let lines: Vec<String> = batch.errors.iter().map(describe).collect();
            warn!("Failed to import {} attachment(s)", lines.len());
            self.show_message(
                MessageLevel::Error,
                format!("Unable to open files:\n{}", lines.join("\n")),
            );
        }
        Ok(batch)
    }

    /// Save one attachment to `dest`. Allowed in history view.
    pub fn export_attachment(&mut self, name: &str, dest: &Path) -> Result<()> {
        self.ensure_open()?;
        let Some(data) = self.working.attachments.get(name) else {
            return self.fail(EntryEditError::NotFound(format!("attachment '{}'", name)));
        };
        if let Err(e) = fs::write(dest, data) {
            return self.fail(EntryEditError::AttachmentWrite {
                name: name.to_string(),
                reason: e.to_string(),
            });
        }
        if let Some(dir) = dest.parent() {
            self.last_attachment_dir = Some(dir.to_path_buf());
        }
        info!("Saved attachment '{}' to {}", name, dest.display());
        Ok(())
    }

    /// Save several attachments into `dir`, creating it when needed.
    ///
    /// `decide` is asked for every destination that already exists.
    pub fn export_attachments<S, F>(
        &mut self,
        names: &[S],
        dir: &Path,
        mut decide: F,
    ) -> Result<AttachmentBatch>
    where
        S: AsRef<str>,
        F: FnMut(&str) -> OverwriteDecision,
    {
        self.ensure_open()?;
        if let Err(e) = fs::create_dir_all(dir) {
            return self.fail(EntryEditError::AttachmentWrite {
                name: dir.display().to_string(),
                reason: e.to_string(),
            });
        }
        self.last_attachment_dir = Some(dir.to_path_buf());

        let mut batch = AttachmentBatch::default();
        for name in names {
            let name = name.as_ref();
            let Some(data) = self.working.attachments.get(name) else {
                batch
                    .errors
                    .push(EntryEditError::NotFound(format!("attachment '{}'", name)));
                continue;
            };
            let Some(path) = export_path(dir, name) else {
                batch.errors.push(EntryEditError::AttachmentWrite {
                    name: name.to_string(),
                    reason: "invalid file name".to_string(),
                });
                continue;
            };

            if path.exists() {
                match decide(name) {
                    OverwriteDecision::Overwrite => {}
                    OverwriteDecision::Skip => {
                        batch.skipped.push(name.to_string());
                        continue;
                    }
                    OverwriteDecision::Abort => {
                        batch.aborted = true;
                        break;
                    }
                }
            }

            match fs::write(&path, data) {
                Ok(()) => batch.applied.push(name.to_string()),
                Err(e) => batch.errors.push(EntryEditError::AttachmentWrite {
                    name: name.to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        if !batch.errors.is_empty() {
            let lines: Vec<String> = batch.errors.iter().map(describe).collect();
            warn!("Failed to save {} attachment(s)", lines.len());
            self.show_message(
                MessageLevel::Error,
                format!("Unable to save the attachments:\n{}", lines.join("\n")),
            );
        }
        Ok(batch)
    }

    /// Payload of an attachment, for handing to a viewer
    pub fn open_attachment(&mut self, name: &str) -> Result<Vec<u8>> {
        self.ensure_open()?;
        match self.working.attachments.get(name) {
            Some(data) => Ok(data.to_vec()),
            None => self.fail(EntryEditError::NotFound(format!("attachment '{}'", name))),
        }
    }
}

fn read_attachment(path: &Path, name: &str, limit: Option<u64>) -> Result<Vec<u8>> {
    let read_error = |e: std::io::Error| EntryEditError::AttachmentRead {
        name: name.to_string(),
        reason: e.to_string(),
    };

    if let Some(limit) = limit {
        let size = fs::metadata(path).map_err(read_error)?.len();
        if size > limit {
            return Err(EntryEditError::AttachmentTooLarge {
                name: name.to_string(),
                size,
                limit,
            });
        }
    }
    fs::read(path).map_err(read_error)
}
