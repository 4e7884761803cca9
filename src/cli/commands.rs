//! CLI subcommands: `run` (daemon), `scan` (one-shot backlog), and
//! `check-tools` (environment diagnostics).

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::{self, Config};
use crate::enrichment::fingerprint;
use crate::library::LibraryServices;
use crate::scanner;
use crate::scanner::watcher::{FileQueues, FileWatcher};

#[derive(Parser, Debug)]
#[command(name = "music-curator", version, about = "Unattended music library identification and tagging daemon")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the monitor directory and process files as they arrive (default).
    Run,
    /// Process the existing backlog under the monitor directory once, then exit.
    Scan,
    /// Check that fpcalc is on PATH and the configuration is valid.
    CheckTools,
}

/// Dispatch a parsed [`Cli`] to its subcommand. Always runs a command: with
/// none given, defaults to [`Commands::Run`] so the daemon is the plain
/// no-argument behavior.
pub async fn run_command(args: &Cli) -> anyhow::Result<()> {
    let config = Arc::new(config::load());
    config.validate()?;

    match args.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Run => run_daemon(config).await,
        Commands::Scan => run_scan(config).await,
        Commands::CheckTools => check_tools(&config),
    }
}

async fn run_daemon(config: Arc<Config>) -> anyhow::Result<()> {
    let monitor_root = config
        .monitor
        .directory
        .clone()
        .ok_or_else(|| anyhow::anyhow!("monitor.directory is required"))?;

    let services = LibraryServices::build(config.clone()).await?;

    tracing::info!(root = %monitor_root.display(), "scanning backlog");
    let backlog = scanner::backlog(&monitor_root, services.processor.store().as_ref()).await;
    tracing::info!(count = backlog.len(), "backlog scan complete");

    let (queues, main_rx) = FileQueues::new();
    for path in backlog {
        queues.enqueue_main(path);
    }

    let (watcher, rx) = FileWatcher::new(vec![monitor_root])?;

    let pump_handle = tokio::spawn(scanner::watcher::pump_events(watcher, rx, queues.clone()));
    let dispatcher_handle = tokio::spawn(scanner::watcher::run_dispatcher(services.processor.clone(), queues.clone(), main_rx));
    let retry_handle = tokio::spawn(scanner::watcher::run_retry_worker(
        services.processor.clone(),
        queues.clone(),
        config.max_retries_or_default(),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested, draining pending folders");

    pump_handle.abort();
    dispatcher_handle.abort();
    retry_handle.abort();

    let pending_folders = services.album_cache.folders_with_pending();
    services.batch_writer.process_all_pending_before_shutdown(&pending_folders).await;

    Ok(())
}

async fn run_scan(config: Arc<Config>) -> anyhow::Result<()> {
    let monitor_root = config
        .monitor
        .directory
        .clone()
        .ok_or_else(|| anyhow::anyhow!("monitor.directory is required"))?;

    let services = LibraryServices::build(config.clone()).await?;

    let backlog = scanner::backlog(&monitor_root, services.processor.store().as_ref()).await;
    tracing::info!(count = backlog.len(), "processing backlog");

    for path in &backlog {
        let result = services.processor.process(path).await;
        tracing::info!(path = %path.display(), ?result, "processed");
    }

    let pending_folders = services.album_cache.folders_with_pending();
    services.batch_writer.process_all_pending_before_shutdown(&pending_folders).await;

    Ok(())
}

fn check_tools(config: &Config) -> anyhow::Result<()> {
    if fingerprint::is_available() {
        let version = fingerprint::version().unwrap_or_else(|| "unknown version".to_string());
        println!("fpcalc: found ({version})");
    } else {
        println!("fpcalc: NOT FOUND on PATH");
    }

    match config.validate() {
        Ok(()) => println!("config: valid"),
        Err(e) => println!("config: invalid ({e})"),
    }

    Ok(())
}
