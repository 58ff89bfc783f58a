//! `litevault` command-line entry point.
//!
//! Loads configuration, resolves the per-process context, then runs a single
//! full backup, incremental backup or manifest verification.

use clap::{Args, Parser, Subcommand};
use litevault_compress::cli::Preference;
use litevault_config::Config;
use litevault_engine::{Context, FullParams, IncrementalParams, TracingLogger};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Full and page-level incremental backups of live SQLite databases.
#[derive(Parser, Debug)]
#[command(name = "litevault", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the configuration file (TOML, YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy the whole database, optionally compressed.
    Full(FullArgs),
    /// Store the database's pages in the deduplicating page store.
    Incremental(IncrementalArgs),
    /// Check that every page a manifest lists is present and intact.
    Verify {
        /// The `.snapshot` manifest to check.
        manifest: PathBuf,
    },
}

#[derive(Args, Debug)]
struct FullArgs {
    /// Compress the backup, with the configured format unless one is given.
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, require_equals = true)]
    compress: Option<Option<String>>,
}

#[derive(Args, Debug)]
struct IncrementalArgs {
    /// Name the manifest `snap_…` (scheduled) instead of `manual_…`.
    #[arg(long)]
    scheduled: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        },
    }
}

/// `Ok(false)` means the command ran but its result was a failure (already
/// reported); `Err` carries a setup problem to report.
fn run(cli: Cli) -> Result<bool, String> {
    match cli.command {
        Command::Full(args) => {
            let ctx = context(cli.config.as_deref())?;
            let preference = Preference::try_from(args.compress).map_err(|e| format!("{e:?}"))?;
            let params = FullParams {
                compress: Some(preference.resolve(ctx.config.full.compression)),
            };
            block_on(async { Ok(litevault_engine::full_backup(&ctx, params, &TracingLogger).await.is_ok()) })
        },
        Command::Incremental(args) => {
            let ctx = context(cli.config.as_deref())?;
            let params = IncrementalParams {
                is_scheduled_run: args.scheduled,
            };
            block_on(async { Ok(litevault_engine::incremental_backup(&ctx, params, &TracingLogger).await.is_ok()) })
        },
        Command::Verify { manifest } => block_on(verify(&manifest)),
    }
}

/// Load configuration and resolve the context. Must run before the runtime
/// starts its worker threads.
fn context(path: Option<&Path>) -> Result<Context, String> {
    let config = Config::load(path).map_err(|e| format!("{e:?}"))?;
    let ctx = Context::new(config);
    tracing::debug!(host_name = %ctx.host_name, offset = %ctx.offset, "context resolved");
    Ok(ctx)
}

async fn verify(manifest: &Path) -> Result<bool, String> {
    let report = litevault_engine::verify_manifest(manifest).await.map_err(|e| format!("{e:?}"))?;
    tracing::info!(
        pages = report.pages,
        objects = report.objects,
        missing = report.missing.len(),
        corrupt = report.corrupt.len(),
        "verified {}",
        manifest.display()
    );
    for id in &report.missing {
        tracing::warn!(%id, "missing page object");
    }
    for id in &report.corrupt {
        tracing::warn!(%id, "corrupt page object");
    }
    Ok(report.is_intact())
}

fn block_on<F: std::future::Future<Output = Result<bool, String>>>(future: F) -> Result<bool, String> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("could not start async runtime: {e}"))?
        .block_on(future)
}
