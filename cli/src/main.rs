//! Ferry CLI - applies a TOML changelog to a database.
//!
//! ```text
//! main() -> Cli::parse() -> init_tracing() -> resolve_config()
//!                                                  |
//!                                                  v
//!              ferry_descriptor::load() -> Executor::run() -> summary
//! ```
//!
//! Exit status is non-zero whenever the run stops with an error; suppressed
//! changeset failures are reported but do not fail the process.

mod logging;

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;

use ferry_config::{FerryConfig, Overrides};
use ferry_descriptor::LoadOptions;
use ferry_engine::{ChangeSetOutcome, Executor, ExecutorOptions, LEDGER_COLLECTION, RunReport};
use ferry_store::{Database, Filter, MemoryDatabase, SqliteDatabase};
use ferry_types::ChangeLog;

#[derive(Debug, Parser)]
#[command(name = "ferry", version)]
#[command(about = "Apply changelog changesets to a database exactly once")]
struct Cli {
    /// Config file (default: ./ferry.toml, then ~/.ferry/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Master changelog file
    #[arg(long, value_name = "PATH")]
    changelog: Option<PathBuf>,

    /// Run context; tagged changesets run only when it matches one of their tags
    #[arg(long, value_name = "NAME")]
    context: Option<String>,

    /// Treat changesets without an explicit fail_on_error as recoverable
    #[arg(long)]
    continue_on_error: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Run against an in-memory copy of the ledger and report what would apply
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            database: self.database.clone(),
            changelog: self.changelog.clone(),
            context: self.context.clone(),
            fail_on_error: self.continue_on_error.then_some(false),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_file.as_deref());

    match run(&cli) {
        Ok(report) => {
            print_report(&report, cli.dry_run);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunReport> {
    let config = resolve_config(cli, |name| env::var(name).ok())?;

    let changelog_path = config.changelog_path()?;
    let changelog = ferry_descriptor::load(
        changelog_path,
        &LoadOptions {
            default_fail_on_error: config.run.fail_on_error,
        },
    )
    .with_context(|| format!("Failed to load changelog {}", changelog_path.display()))?;

    let options = ExecutorOptions::with_context(config.run_context());

    if cli.dry_run {
        let mut db = dry_run_database(config.database.path.as_deref())?;
        return execute(&mut db, &changelog, options);
    }

    let database_path = config.database_path()?;
    let mut db = SqliteDatabase::open(database_path)
        .with_context(|| format!("Failed to open database {}", database_path.display()))?;
    if let Some(name) = &config.database.name {
        db = db.with_name(name.clone());
    }
    execute(&mut db, &changelog, options)
}

/// Config file, then environment, then flags.
fn resolve_config(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<FerryConfig> {
    let config = FerryConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(Overrides::from_env(env))
        .with_overrides(cli.overrides());
    Ok(config)
}

/// In-memory database holding a copy of the target's ledger, so a dry run
/// skips what is already applied. The target file is never created here.
fn dry_run_database(target: Option<&Path>) -> Result<MemoryDatabase> {
    let mut dry = MemoryDatabase::new("dry-run");
    let Some(path) = target.filter(|path| path.exists()) else {
        return Ok(dry);
    };

    let db = SqliteDatabase::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    let ledger = db
        .find(LEDGER_COLLECTION, &Filter::all())
        .with_context(|| format!("Failed to read the ledger of {}", path.display()))?;
    tracing::debug!(documents = ledger.len(), "Seeding dry run from ledger");
    for document in ledger {
        dry.insert(LEDGER_COLLECTION, document)?;
    }
    Ok(dry)
}

fn execute<D: Database + ?Sized>(
    db: &mut D,
    changelog: &ChangeLog,
    options: ExecutorOptions,
) -> Result<RunReport> {
    let report = Executor::new(db, options).run(changelog)?;
    Ok(report)
}

fn print_report(report: &RunReport, dry_run: bool) {
    for result in report.results() {
        match &result.outcome {
            ChangeSetOutcome::Applied if dry_run => println!("would apply {}", result.id),
            ChangeSetOutcome::Failed { error } => eprintln!("failed {}: {error}", result.id),
            _ => {}
        }
    }
    println!("{}", summary_line(report));
}

fn summary_line(report: &RunReport) -> String {
    format!(
        "applied={} skipped={} failed={}",
        report.applied(),
        report.skipped(),
        report.failed()
    )
}
