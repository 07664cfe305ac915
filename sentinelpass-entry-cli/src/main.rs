//! sp-entry: edit SentinelPass entry records from the command line

mod commands;
mod store;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sentinelpass_entry::{ExpiryPreset, SessionConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Entry editor for SentinelPass record files
#[derive(Parser)]
#[command(name = "sp-entry")]
#[command(about = "Edit SentinelPass entry records", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sp-entry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an entry
    Show {
        /// Record file
        file: PathBuf,

        /// Show passwords and protected attributes in plain text
        #[arg(long)]
        show_secrets: bool,
    },

    /// Create a new record file
    New {
        /// Record file to create
        file: PathBuf,

        /// Group name used in the headline
        #[arg(long, default_value = "Root")]
        group: String,

        /// Replace an existing file
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        edits: EditArgs,
    },

    /// Edit an existing record
    Edit {
        /// Record file
        file: PathBuf,

        /// Group name used in the headline
        #[arg(long, default_value = "Root")]
        group: String,

        /// Delete a history snapshot by index (repeatable)
        #[arg(long = "delete-history", value_name = "INDEX")]
        delete_history: Vec<usize>,

        /// Report whether the edits would change the record, without saving
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        edits: EditArgs,
    },

    /// List history snapshots
    History {
        /// Record file
        file: PathBuf,
    },

    /// Restore a history snapshot into the entry
    Restore {
        /// Record file
        file: PathBuf,

        /// Snapshot index as printed by `history`
        index: usize,
    },

    /// Save attachments into a directory
    ExportAttachments {
        /// Record file
        file: PathBuf,

        /// Destination directory
        dir: PathBuf,

        /// Attachment to export (repeatable, default all)
        #[arg(long = "name")]
        names: Vec<String>,

        /// Overwrite existing files instead of skipping them
        #[arg(long)]
        overwrite: bool,
    },

    /// Show the SSH key configured for an entry
    KeyInfo {
        /// Record file
        file: PathBuf,
    },
}

/// Field edits shared by `new` and `edit`
#[derive(Args, Debug, Default)]
pub struct EditArgs {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    /// Password; sets the confirmation too
    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Expire after tomorrow, 1w-3w, 1m, 3m, 6m or 1y
    #[arg(long, value_parser = parse_preset)]
    pub expires_in: Option<ExpiryPreset>,

    /// Disable expiry
    #[arg(long, conflicts_with = "expires_in")]
    pub no_expiry: bool,

    /// Set a custom attribute (repeatable)
    #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub attributes: Vec<(String, String)>,

    /// Set a protected custom attribute (repeatable)
    #[arg(long = "protected-attr", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub protected_attributes: Vec<(String, String)>,

    /// Remove a custom attribute (repeatable)
    #[arg(long = "remove-attr", value_name = "KEY")]
    pub remove_attributes: Vec<String>,

    /// Import a file as attachment (repeatable)
    #[arg(long = "attach", value_name = "PATH")]
    pub attach: Vec<PathBuf>,

    /// Remove an attachment (repeatable)
    #[arg(long = "detach", value_name = "NAME")]
    pub detach: Vec<String>,

    /// Add an auto-type window rule (repeatable)
    #[arg(long = "window", value_name = "PATTERN[=SEQUENCE]")]
    pub windows: Vec<String>,

    /// Custom auto-type sequence
    #[arg(long, conflicts_with = "inherit_sequence")]
    pub sequence: Option<String>,

    /// Inherit the auto-type sequence from the group
    #[arg(long)]
    pub inherit_sequence: bool,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn parse_preset(raw: &str) -> std::result::Result<ExpiryPreset, String> {
    let raw = raw.trim().to_ascii_lowercase();
    if raw == "tomorrow" {
        return Ok(ExpiryPreset::Tomorrow);
    }
    let invalid = || format!("unknown expiry preset '{}'", raw);
    let Some(unit) = raw.chars().last() else {
        return Err(invalid());
    };
    let count: u32 = raw[..raw.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    match unit {
        'w' => Ok(ExpiryPreset::Weeks(count)),
        'm' => Ok(ExpiryPreset::Months(count)),
        'y' => Ok(ExpiryPreset::Years(count)),
        _ => Err(invalid()),
    }
}

fn load_config(path: &Path) -> Result<SessionConfig> {
    if path.exists() {
        Ok(SessionConfig::load(path)?)
    } else {
        tracing::info!("No config file found, using defaults");
        Ok(SessionConfig::default())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Show { file, show_secrets } => commands::show(&file, show_secrets),
        Commands::New {
            file,
            group,
            force,
            edits,
        } => commands::create(config, &file, &group, force, &edits),
        Commands::Edit {
            file,
            group,
            delete_history,
            dry_run,
            edits,
        } => commands::edit(config, &file, &group, &delete_history, dry_run, &edits),
        Commands::History { file } => commands::history(&file),
        Commands::Restore { file, index } => commands::restore(config, &file, index),
        Commands::ExportAttachments {
            file,
            dir,
            names,
            overwrite,
        } => commands::export_attachments(config, &file, &dir, &names, overwrite),
        Commands::KeyInfo { file } => commands::key_info(config, &file),
    }
}
