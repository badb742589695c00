mod archive;
mod brand;
mod bucket;
mod checksum;
mod cli;
mod config;
mod dir_list;
mod exclude;
mod fuzzy;
mod locator;
mod manifest;
mod manifest_file;
mod restore;
mod store;
mod sync;
mod util;

use archive::{ArchiveOptions, ArchiveStatus, archive_project};
use brand::BrandResolver;
use cli::{Cli, Command, LogLevel};
use config::{BrandProfile, Config};
use exclude::ExclusionPolicy;
use locator::Resolution;
use manifest_file::{Manifest, Structure};
use std::fmt as stdfmt;
use std::io::{IsTerminal, Write, stderr};
use std::path::Path;
use std::process::ExitCode;
use sync::SyncReport;
use sync::remote::{FileState, RemoteSync, cleanup_local, staging_dir};
use tracing::{Event, Level, Subscriber, debug, error, info, warn};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use util::size::format_size;

struct DamExitCode;

impl DamExitCode {
    /// The command ran to completion but some files failed to transfer.
    fn completed_with_failures() -> ExitCode {
        ExitCode::from(1)
    }

    /// Exit code used for other errors (configuration, missing brand, unmounted drive, etc.).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level);

    let result: anyhow::Result<ExitCode> = match cli.command {
        Command::Bucket { ids } => handle_bucket(&ids),
        command => load_config(cli.config.as_deref()).and_then(|config| run(&config, command)),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err}");
            DamExitCode::any_error()
        }
    }
}

fn run(config: &Config, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Brands => handle_brands(config),
        Command::Bucket { ids } => handle_bucket(&ids),
        Command::List { brand, pattern } => handle_list(config, &brand, pattern.as_deref()),
        Command::Manifest { brand, dry_run } => handle_manifest(config, &brand, dry_run),
        Command::Archive {
            brand,
            project,
            force,
            dry_run,
        } => handle_archive(config, &brand, &project, ArchiveOptions { force, dry_run }),
        Command::SyncSsd { brand, dry_run } => handle_sync_ssd(config, &brand, dry_run),
        Command::S3Up {
            brand,
            project,
            dry_run,
        } => handle_remote(config, &brand, &project, RemoteAction::Upload { dry_run }),
        Command::S3Down {
            brand,
            project,
            dry_run,
        } => handle_remote(config, &brand, &project, RemoteAction::Download { dry_run }),
        Command::S3Status { brand, project } => {
            handle_remote(config, &brand, &project, RemoteAction::Status)
        }
        Command::S3CleanupRemote {
            brand,
            project,
            force,
            dry_run,
        } => handle_remote(
            config,
            &brand,
            &project,
            RemoteAction::CleanupRemote { force, dry_run },
        ),
        Command::S3CleanupLocal {
            brand,
            project,
            force,
            dry_run,
        } => handle_cleanup_local(config, &brand, &project, force, dry_run),
    }
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path = Config::locate(explicit)?;
    debug!("Loading configuration from {}", path.display());
    Ok(Config::load(&path)?)
}

fn exclusion_policy(config: &Config) -> anyhow::Result<ExclusionPolicy> {
    ExclusionPolicy::with_extra(&config.extra_exclusions)
        .map_err(|e| anyhow::anyhow!("Invalid pattern in transfer.exclude: {e}"))
}

/// Expands a project hint, asking on stdin when a short code is ambiguous.
fn resolve_projects(profile: &BrandProfile, hint: &str) -> anyhow::Result<Vec<String>> {
    match locator::resolve(profile, hint)? {
        Resolution::Single(id) => Ok(vec![id]),
        Resolution::Many(ids) => Ok(ids),
        Resolution::Ambiguous(candidates) => Ok(vec![prompt_selection(hint, &candidates)?]),
    }
}

fn prompt_selection(hint: &str, candidates: &[String]) -> anyhow::Result<String> {
    let mut err = stderr();
    writeln!(err, "Several projects match '{hint}':")?;
    for (i, candidate) in candidates.iter().enumerate() {
        writeln!(err, "  {}. {}", i + 1, candidate)?;
    }
    write!(err, "Select a project [1-{}]: ", candidates.len())?;
    err.flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(locator::select(candidates, &answer)?)
}

fn handle_brands(config: &Config) -> anyhow::Result<ExitCode> {
    let resolver = BrandResolver::new(config);
    for profile in config.brands() {
        let missing = if resolver.exists(&profile.key) {
            ""
        } else {
            " (missing)"
        };
        println!(
            "{:<20} {:<12} {:<24} {}{}",
            profile.key,
            profile.shortcuts.join(","),
            resolver.expand(&profile.key),
            profile.video_projects.display(),
            missing
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_bucket(ids: &[String]) -> anyhow::Result<ExitCode> {
    for id in ids {
        if let Some(warning) = bucket::format_warning(id) {
            warn!("{}", warning);
        }
        println!("{}\t{}", id, bucket::bucket_for(id));
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_list(config: &Config, brand: &str, pattern: Option<&str>) -> anyhow::Result<ExitCode> {
    let profile = BrandResolver::new(config).validate(brand)?;

    let projects = match pattern {
        None => locator::list_projects(profile)?,
        Some(hint) => match locator::resolve(profile, hint)? {
            Resolution::Single(id) => vec![id],
            Resolution::Many(ids) | Resolution::Ambiguous(ids) => ids,
        },
    };

    if projects.is_empty() {
        info!("No projects in {}", profile.project_dir().display());
    }
    for id in projects {
        println!("{id}");
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_manifest(config: &Config, brand: &str, dry_run: bool) -> anyhow::Result<ExitCode> {
    let profile = BrandResolver::new(config).validate(brand)?;
    let reconciliation = manifest::regenerate(profile, dry_run)?;
    let manifest = &reconciliation.manifest;

    let count = |pred: &dyn Fn(&manifest_file::ManifestEntry) -> bool| {
        manifest.projects.iter().filter(|e| pred(e)).count()
    };
    let usage = &manifest.config.disk_usage;

    println!("Brand:      {}", manifest.config.brand);
    println!("Projects:   {}", manifest.projects.len());
    println!(
        "  local:    {}",
        count(&|e| e.storage.local.structure == Some(Structure::Flat))
    );
    println!(
        "  archived: {}",
        count(&|e| e.storage.local.structure == Some(Structure::Archived))
    );
    println!("  backup:   {}", count(&|e| e.storage.ssd.exists));
    println!("  staging:  {}", count(&|e| e.storage.staging.exists));
    println!("Local size: {}", format_size(usage.local.total_bytes));
    println!("SSD size:   {}", format_size(usage.ssd.total_bytes));
    println!("Warnings:   {}", reconciliation.warnings.len());
    println!("Fingerprint: {}", manifest.fingerprint());

    Ok(ExitCode::SUCCESS)
}

fn handle_archive(
    config: &Config,
    brand: &str,
    hint: &str,
    options: ArchiveOptions,
) -> anyhow::Result<ExitCode> {
    let profile = BrandResolver::new(config).validate(brand)?;
    let policy = exclusion_policy(config)?;
    let projects = resolve_projects(profile, hint)?;

    let mut errors = 0usize;
    for id in &projects {
        let result = match archive_project(profile, &policy, id, options) {
            Ok(result) => result,
            Err(err) if projects.len() > 1 => {
                error!("{}: {}", id, err);
                errors += 1;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let action = match result.status {
            ArchiveStatus::Planned => "would archive to",
            ArchiveStatus::AlreadyArchived => "already archived at",
            ArchiveStatus::Copied => "archived to",
        };
        if let Some(report) = &result.copy {
            info!("{}: {}", result.project_id, report.summary("copied"));
        }
        println!(
            "{}: {} {} ({})",
            result.project_id,
            action,
            result.destination.display(),
            format_size(result.bytes)
        );
        if result.source_removed {
            println!("{}: removed local copy", result.project_id);
        }
    }

    if options.dry_run {
        info!("DRY RUN - nothing was copied or deleted");
    }
    if errors > 0 {
        return Ok(DamExitCode::any_error());
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_sync_ssd(config: &Config, brand: &str, dry_run: bool) -> anyhow::Result<ExitCode> {
    let profile = BrandResolver::new(config).validate(brand)?;
    let policy = exclusion_policy(config)?;
    let manifest = Manifest::load(&profile.manifest_path())?;

    let summary = restore::restore_from_backup(profile, &manifest, &policy, dry_run)?;

    for project in &summary.restored {
        print_report(&project.id, &project.report, "copied");
    }
    for (id, reason) in &summary.skipped {
        println!("{id}: skipped ({reason})");
    }
    info!(
        "{} light files copied across {} projects",
        summary.files_copied(),
        summary.restored.len()
    );

    if summary.files_failed() > 0 {
        return Ok(DamExitCode::completed_with_failures());
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Clone, Copy)]
enum RemoteAction {
    Upload { dry_run: bool },
    Download { dry_run: bool },
    Status,
    CleanupRemote { force: bool, dry_run: bool },
}

fn handle_remote(
    config: &Config,
    brand: &str,
    hint: &str,
    action: RemoteAction,
) -> anyhow::Result<ExitCode> {
    let profile = BrandResolver::new(config).validate(brand)?;
    let policy = exclusion_policy(config)?;
    let store = store::open(profile)?;
    let key_prefix = profile
        .object_store
        .as_ref()
        .map(|target| target.key_prefix.as_str())
        .unwrap_or_default();

    let remote = RemoteSync {
        store: store.as_ref(),
        key_prefix,
        transfer: config.transfer,
        policy: &policy,
    };

    let mut failed = false;
    for id in resolve_projects(profile, hint)? {
        let staging = staging_dir(profile, &id);
        let report = match action {
            RemoteAction::Upload { dry_run } => remote.upload(&id, &staging, dry_run)?,
            RemoteAction::Download { dry_run } => remote.download(&id, &staging, dry_run)?,
            RemoteAction::CleanupRemote { force, dry_run } => {
                remote.cleanup_remote(&id, force, dry_run)?
            }
            RemoteAction::Status => {
                print_status(&id, &remote.status(&id, &staging)?);
                continue;
            }
        };

        let verb = match action {
            RemoteAction::Upload { .. } => "uploaded",
            RemoteAction::Download { .. } => "downloaded",
            _ => "deleted",
        };
        print_report(&id, &report, verb);
        failed |= report.has_failures();
    }

    if failed {
        return Ok(DamExitCode::completed_with_failures());
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_cleanup_local(
    config: &Config,
    brand: &str,
    hint: &str,
    force: bool,
    dry_run: bool,
) -> anyhow::Result<ExitCode> {
    let profile = BrandResolver::new(config).validate(brand)?;
    for id in resolve_projects(profile, hint)? {
        let report = cleanup_local(&staging_dir(profile, &id), force, dry_run)?;
        print_report(&id, &report, "deleted");
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(id: &str, report: &SyncReport, verb: &str) {
    for failure in report.failures() {
        if let sync::Outcome::Failed(reason) = &failure.outcome {
            error!("{}/{}: {}", id, failure.path, reason);
        }
    }
    println!("{}: {}", id, report.summary(verb));
}

fn print_status(id: &str, entries: &[sync::remote::StatusEntry]) {
    if entries.is_empty() {
        println!("{id}: nothing staged");
        return;
    }
    for entry in entries {
        let state = match entry.state {
            FileState::LocalOnly => "local only",
            FileState::RemoteOnly => "remote only",
            FileState::Synced => "synced",
            FileState::Modified => "modified",
        };
        let size = entry.local_size.or(entry.remote_size).unwrap_or(0);
        println!(
            "{:<12} {:>10}  {}/{}",
            state,
            format_size(size),
            id,
            entry.path
        );
    }
}

fn init_tracing(verbose: u8, log_level: Option<LogLevel>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = EmojiFormatter { stderr_is_terminal };

    let explicit_level = log_level.map(|level| level.as_filter()).or(match verbose {
        0 => None,
        1 => Some("info"),
        _ => Some("debug"),
    });

    let filter = match explicit_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

struct EmojiFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for EmojiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            match *event.metadata().level() {
                Level::DEBUG => write!(writer, "ðŸ” ")?,
                Level::INFO => write!(writer, "â„¹ï¸ ")?,
                Level::WARN => write!(writer, "âš ï¸  ")?,
                Level::ERROR => write!(writer, "âŒï¸ ")?,
                _ => {}
            }
        } else {
            match *event.metadata().level() {
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => {}
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
