//! Subcommand implementations

use crate::store::RecordFile;
use crate::EditArgs;
use anyhow::{bail, Result};
use chrono::Utc;
use sentinelpass_entry::{
    Association, EditSession, Entry, EntryIcon, OverwriteDecision, SessionConfig,
};
use std::path::Path;
use tracing::{info, warn};

const MASK: &str = "********";

/// Push `edits` through the session intents
pub fn apply_edits(session: &mut EditSession<'_>, edits: &EditArgs) -> Result<()> {
    if let Some(title) = &edits.title {
        session.set_title(title)?;
    }
    if let Some(username) = &edits.username {
        session.set_username(username)?;
    }
    if let Some(url) = &edits.url {
        session.set_url(url)?;
    }
    if let Some(password) = &edits.password {
        session.set_generated_password(password)?;
    }
    if let Some(notes) = &edits.notes {
        session.set_notes(notes)?;
    }

    if edits.no_expiry {
        session.set_expires(false)?;
    }
    if let Some(preset) = edits.expires_in {
        session.apply_expiry_preset(preset)?;
    }

    for (key, value) in &edits.attributes {
        session.set_attribute(key, value, false)?;
    }
    for (key, value) in &edits.protected_attributes {
        session.set_attribute(key, value, true)?;
    }
    for key in &edits.remove_attributes {
        session.remove_attribute(key)?;
    }

    if !edits.attach.is_empty() {
        let batch = session.import_attachments(&edits.attach)?;
        for err in &batch.errors {
            warn!("{}", err);
        }
        if !batch.is_complete() {
            bail!("{} attachment(s) could not be imported", batch.errors.len());
        }
    }
    if !edits.detach.is_empty() {
        session.remove_attachments(&edits.detach)?;
    }

    for rule in &edits.windows {
        let (window, sequence) = rule.split_once('=').unwrap_or((rule.as_str(), ""));
        let index = session.add_association()?;
        session.update_association(index, Association::new(window, sequence))?;
    }
    if edits.inherit_sequence {
        session.set_inherit_sequence(true)?;
    }
    if let Some(sequence) = &edits.sequence {
        session.set_auto_type_sequence(sequence)?;
    }
    Ok(())
}

fn print_entry(entry: &Entry, show_secrets: bool) {
    let secret = |value: &str| {
        if show_secrets {
            value.to_string()
        } else {
            MASK.to_string()
        }
    };

    println!("UUID:      {}", entry.uuid);
    println!("Title:     {}", entry.title);
    println!("Username:  {}", entry.username);
    println!("Password:  {}", secret(&entry.password));
    println!("URL:       {}", entry.url);
    match entry.icon {
        EntryIcon::Standard(number) => println!("Icon:      #{}", number),
        EntryIcon::Custom(uuid) => println!("Icon:      custom {}", uuid),
    }
    if entry.expiry.expires {
        let state = if entry.is_expired(Utc::now()) {
            " (expired)"
        } else {
            ""
        };
        println!("Expires:   {}{}", entry.expiry.expiry_time.to_rfc3339(), state);
    } else {
        println!("Expires:   never");
    }
    println!("Modified:  {}", entry.times.modified.to_rfc3339());
    if !entry.notes.is_empty() {
        println!("Notes:\n{}", entry.notes);
    }

    if !entry.attributes.is_empty() {
        println!("Attributes:");
        for attribute in entry.attributes.iter() {
            let value = if attribute.protected {
                secret(&attribute.value)
            } else {
                attribute.value.clone()
            };
            println!("  {} = {}", attribute.key, value);
        }
    }

    if !entry.attachments.is_empty() {
        println!("Attachments:");
        for name in entry.attachments.keys() {
            println!(
                "  {} ({} bytes, sha256 {})",
                name,
                entry.attachments.value(name).len(),
                entry.attachments.digest_hex(name).unwrap_or_default()
            );
        }
    }

    let sequence = if entry.auto_type.default_sequence.is_empty() {
        "inherited"
    } else {
        entry.auto_type.default_sequence.as_str()
    };
    println!(
        "Auto-type: {} ({})",
        if entry.auto_type.enabled { "enabled" } else { "disabled" },
        sequence
    );
    for association in entry.associations.iter() {
        println!("  {} -> {}", association.window, association.sequence);
    }
    println!("History:   {} snapshot(s)", entry.history().len());
}

pub fn show(file: &Path, show_secrets: bool) -> Result<()> {
    let record = RecordFile::load(file)?;
    print_entry(&record.entry, show_secrets);
    Ok(())
}

pub fn create(
    config: SessionConfig,
    file: &Path,
    group: &str,
    force: bool,
    edits: &EditArgs,
) -> Result<()> {
    if file.exists() && !force {
        bail!("{} already exists; use --force to replace it", file.display());
    }

    let mut record = RecordFile::new(Entry::new());
    let mut session = EditSession::create(&mut record.entry, group, config, &record.custom_icons);
    info!("{}", session.headline());
    apply_edits(&mut session, edits)?;
    let outcome = session.commit()?;
    for issue in &outcome.sequence_issues {
        warn!("Auto-type {}", issue);
    }
    drop(session);

    record.save(file)?;
    println!("Created entry {} in {}", record.entry.uuid, file.display());
    Ok(())
}

pub fn edit(
    config: SessionConfig,
    file: &Path,
    group: &str,
    delete_history: &[usize],
    dry_run: bool,
    edits: &EditArgs,
) -> Result<()> {
    let mut record = RecordFile::load(file)?;
    let mut session = EditSession::edit(&mut record.entry, group, config, &record.custom_icons);
    info!("{}", session.headline());
    apply_edits(&mut session, edits)?;

    // Highest first so the remaining indexes still address the same snapshots
    let mut indexes = delete_history.to_vec();
    indexes.sort_unstable();
    indexes.dedup();
    for index in indexes.into_iter().rev() {
        session.delete_history_entry(index)?;
    }

    if dry_run {
        let modified = session.has_been_modified();
        session.cancel()?;
        println!(
            "{}",
            if modified {
                "Entry would be modified"
            } else {
                "No changes"
            }
        );
        return Ok(());
    }

    let outcome = session.commit()?;
    drop(session);

    if outcome.modified || outcome.removed_history > 0 {
        record.save(file)?;
        println!(
            "Saved {} ({} history snapshot(s))",
            file.display(),
            record.entry.history().len()
        );
    } else {
        println!("No changes");
    }
    Ok(())
}

pub fn history(file: &Path) -> Result<()> {
    let record = RecordFile::load(file)?;
    if record.entry.history().is_empty() {
        println!("No history");
        return Ok(());
    }
    for (index, snapshot) in record.entry.history().iter().enumerate() {
        println!(
            "{:>3}  {}  {}",
            index,
            snapshot.times.modified.to_rfc3339(),
            snapshot.title
        );
    }
    Ok(())
}

pub fn restore(config: SessionConfig, file: &Path, index: usize) -> Result<()> {
    let mut record = RecordFile::load(file)?;
    let mut session = EditSession::edit(&mut record.entry, "Root", config, &record.custom_icons);
    session.restore_history_entry(index)?;
    let outcome = session.commit()?;
    drop(session);

    if outcome.modified {
        record.save(file)?;
        println!("Restored snapshot {} into {}", index, file.display());
    } else {
        println!("Snapshot {} matches the current entry", index);
    }
    Ok(())
}

pub fn export_attachments(
    config: SessionConfig,
    file: &Path,
    dir: &Path,
    names: &[String],
    overwrite: bool,
) -> Result<()> {
    let mut record = RecordFile::load(file)?;
    let names: Vec<String> = if names.is_empty() {
        record.entry.attachments.keys().map(str::to_string).collect()
    } else {
        names.to_vec()
    };

    let mut session = EditSession::edit(&mut record.entry, "Root", config, &record.custom_icons);
    let batch = session.export_attachments(&names, dir, |name| {
        if overwrite {
            OverwriteDecision::Overwrite
        } else {
            warn!("Skipping existing file {}", name);
            OverwriteDecision::Skip
        }
    })?;
    session.cancel()?;

    for name in &batch.applied {
        println!("Saved {}", dir.join(name).display());
    }
    for err in &batch.errors {
        eprintln!("{}", err);
    }
    if !batch.errors.is_empty() {
        bail!("{} attachment(s) could not be saved", batch.errors.len());
    }
    Ok(())
}

pub fn key_info(config: SessionConfig, file: &Path) -> Result<()> {
    let mut record = RecordFile::load(file)?;
    let config = SessionConfig {
        ssh_agent_enabled: true,
        ..config
    };

    let mut session = EditSession::edit(&mut record.entry, "Root", config, &record.custom_icons);
    let Some(key) = session.load_private_key()? else {
        println!("No SSH key configured");
        return Ok(());
    };

    println!("Type:        {}", key.key_type());
    println!("Fingerprint: {}", key.fingerprint());
    println!("Encrypted:   {}", key.encrypted());
    if key.is_open() {
        println!("Comment:     {}", key.comment());
        println!("Public key:  {}", key.public_key());
    }
    if let Some(settings) = session.agent_settings() {
        println!("Add on open: {}", settings.add_at_database_open);
        println!("Remove on close: {}", settings.remove_at_database_close);
    }
    session.cancel()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_record(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("entry.json");
        let edits = EditArgs {
            title: Some("Router".to_string()),
            username: Some("admin".to_string()),
            password: Some("s3cret".to_string()),
            attributes: vec![("serial".to_string(), "X1".to_string())],
            windows: vec!["Router Admin*".to_string()],
            ..EditArgs::default()
        };
        create(SessionConfig::default(), &path, "Network", false, &edits).unwrap();
        path
    }

    #[test]
    fn test_create_writes_record() {
        let dir = TempDir::new().unwrap();
        let path = new_record(&dir);

        let record = RecordFile::load(&path).unwrap();
        assert_eq!(record.entry.title, "Router");
        assert_eq!(record.entry.password, "s3cret");
        assert_eq!(record.entry.attributes.value("serial"), Some("X1"));
        assert_eq!(record.entry.associations.len(), 1);
        assert!(record.entry.history().is_empty());

        let again = create(SessionConfig::default(), &path, "Network", false, &EditArgs::default());
        assert!(again.is_err());
    }

    #[test]
    fn test_edit_and_restore() {
        let dir = TempDir::new().unwrap();
        let path = new_record(&dir);

        let edits = EditArgs {
            title: Some("Gateway".to_string()),
            ..EditArgs::default()
        };
        edit(SessionConfig::default(), &path, "Network", &[], false, &edits).unwrap();
        let record = RecordFile::load(&path).unwrap();
        assert_eq!(record.entry.title, "Gateway");
        assert_eq!(record.entry.history().len(), 1);

        restore(SessionConfig::default(), &path, 0).unwrap();
        let record = RecordFile::load(&path).unwrap();
        assert_eq!(record.entry.title, "Router");
        assert_eq!(record.entry.history().len(), 2);
    }

    #[test]
    fn test_dry_run_does_not_save() {
        let dir = TempDir::new().unwrap();
        let path = new_record(&dir);
        let before = std::fs::read_to_string(&path).unwrap();

        let edits = EditArgs {
            notes: Some("changed".to_string()),
            ..EditArgs::default()
        };
        edit(SessionConfig::default(), &path, "Network", &[], true, &edits).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_delete_history_through_edit() {
        let dir = TempDir::new().unwrap();
        let path = new_record(&dir);
        for title in ["A", "B", "C"] {
            let edits = EditArgs {
                title: Some(title.to_string()),
                ..EditArgs::default()
            };
            edit(SessionConfig::default(), &path, "Network", &[], false, &edits).unwrap();
        }

        edit(SessionConfig::default(), &path, "Network", &[0, 2, 0], false, &EditArgs::default())
            .unwrap();
        let record = RecordFile::load(&path).unwrap();
        let titles: Vec<_> = record.entry.history().iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["A"]);
    }

    #[test]
    fn test_export_attachments_to_directory() {
        let dir = TempDir::new().unwrap();
        let path = new_record(&dir);
        let source = dir.path().join("firmware.bin");
        std::fs::write(&source, b"fw").unwrap();
        let edits = EditArgs {
            attach: vec![source],
            ..EditArgs::default()
        };
        edit(SessionConfig::default(), &path, "Network", &[], false, &edits).unwrap();

        let out = dir.path().join("out");
        export_attachments(SessionConfig::default(), &path, &out, &[], false).unwrap();
        assert_eq!(std::fs::read(out.join("firmware.bin")).unwrap(), b"fw");
    }
}
