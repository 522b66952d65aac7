mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use tlsreact_actions::PluginRegistry;
use tlsreact_engine::{
    watch_directory, ProcessorOptions, ResultProcessor, ResultWatcher, WatcherOptions, WorkerPool,
};
use tlsreact_rules::{ConfigLoader, ConfigRegistry};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tlsreact_core::config::load_dotenv();
    let settings = Cli::parse().into_settings();

    logging::init(&settings)?;
    settings.validate().context("invalid settings")?;
    settings.log_summary();

    // Rule configurations. Startup files go through the watcher's worker,
    // which is the only registry writer.
    let registry = ConfigRegistry::new();
    let loader = ConfigLoader::new(settings.config_dir.clone(), registry.clone());
    let config_watcher = loader
        .watch()
        .context("failed to watch config directory")?;
    let queued = config_watcher.queue_existing();
    info!(queued, "queued existing result handler configs");

    // Result files.
    std::fs::create_dir_all(&settings.input_dir).with_context(|| {
        format!("failed to create input directory {}", settings.input_dir.display())
    })?;
    let processor = ResultProcessor::new(
        registry,
        PluginRegistry::builtin(),
        ProcessorOptions::from_settings(&settings),
    );
    let pool = WorkerPool::spawn(settings.watchdog_threads, processor);
    let submit = pool.sender().context("worker pool already closed")?;
    let watcher = ResultWatcher::new(&WatcherOptions::from_settings(&settings), submit)
        .context("failed to build result watcher")?;
    let (fs_watcher, events) =
        watch_directory(&settings.input_dir).context("failed to watch input directory")?;
    let watcher_task = tokio::spawn(watcher.run(events));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown signal received");

    drop(fs_watcher);
    if let Err(e) = watcher_task.await {
        error!(error = %e, "result watcher task failed");
    }
    pool.join().await;
    if let Err(e) = tokio::task::spawn_blocking(move || config_watcher.stop()).await {
        error!(error = %e, "config watcher shutdown failed");
    }

    info!("shutdown complete");
    Ok(())
}
