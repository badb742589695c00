mod help_text;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Tiered video-asset manager: locate, archive, back up and stage projects
#[derive(Parser, Debug)]
#[command(name = "dam", version, about, long_about = help_text::ROOT_LONG_ABOUT)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). Takes precedence over RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Set the log level. Takes precedence over RUST_LOG.
    #[arg(long, value_name = "LEVEL", global = true, conflicts_with = "verbose")]
    pub log_level: Option<LogLevel>,

    /// Brand configuration file (default: $DAM_CONFIG, then <config dir>/dam/brands.json)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List configured brands
    Brands,

    /// Print the archive bucket for project identifiers
    Bucket {
        #[arg(value_name = "PROJECT", required = true)]
        ids: Vec<String>,
    },

    /// List a brand's projects, optionally filtered by a hint or glob pattern
    List {
        /// Brand key, shortcut or folder name
        brand: String,

        /// Short code (b65), full name, or glob pattern (b6*)
        #[arg(value_name = "PROJECT")]
        pattern: Option<String>,
    },

    /// Rebuild the brand's projects.json from a full scan of every tier
    #[command(long_about = help_text::MANIFEST_LONG_ABOUT)]
    Manifest {
        brand: String,

        /// Scan and report without writing projects.json
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy a project to the backup drive, optionally deleting the local copy
    #[command(long_about = help_text::ARCHIVE_LONG_ABOUT)]
    Archive {
        brand: String,

        /// Short code, full name, or glob pattern
        project: String,

        /// Delete the local copy once the backup is confirmed
        #[arg(long)]
        force: bool,

        /// Show what would happen without copying or deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy light files of backed-up projects into the local archive
    #[command(name = "sync-ssd", long_about = help_text::SYNC_SSD_LONG_ABOUT)]
    SyncSsd {
        brand: String,

        /// Show what would be copied without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Upload a project's s3-staging folder to the object store
    #[command(name = "s3-up", long_about = help_text::S3_TRANSFER_LONG_ABOUT)]
    S3Up {
        brand: String,
        project: String,

        /// Compare and report without uploading
        #[arg(long)]
        dry_run: bool,
    },

    /// Download a project's staged objects into its s3-staging folder
    #[command(name = "s3-down", long_about = help_text::S3_TRANSFER_LONG_ABOUT)]
    S3Down {
        brand: String,
        project: String,

        /// Compare and report without downloading
        #[arg(long)]
        dry_run: bool,
    },

    /// Compare a project's s3-staging folder with the object store
    #[command(name = "s3-status")]
    S3Status { brand: String, project: String },

    /// Delete a project's staged objects from the object store
    #[command(name = "s3-cleanup-remote", long_about = help_text::S3_CLEANUP_LONG_ABOUT)]
    S3CleanupRemote {
        brand: String,
        project: String,

        /// Required to actually delete
        #[arg(long)]
        force: bool,

        /// List what would be deleted
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a project's local s3-staging folder
    #[command(name = "s3-cleanup-local", long_about = help_text::S3_CLEANUP_LONG_ABOUT)]
    S3CleanupLocal {
        brand: String,
        project: String,

        /// Required to actually delete
        #[arg(long)]
        force: bool,

        /// List what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["dam", "manifest", "ad", "-vv", "--dry-run"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Manifest { ref brand, dry_run: true } if brand == "ad"
        ));
    }

    #[test]
    fn log_level_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["dam", "-v", "--log-level", "info", "brands"]).is_err());
    }

    #[test]
    fn s3_command_names() {
        for name in [
            "s3-up",
            "s3-down",
            "s3-status",
            "s3-cleanup-remote",
            "s3-cleanup-local",
        ] {
            assert!(
                Cli::try_parse_from(["dam", name, "ad", "b65"]).is_ok(),
                "{name}"
            );
        }
    }
}
