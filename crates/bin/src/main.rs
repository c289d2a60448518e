//! launchdeck
//!
//! Headless launcher daemon: starts apps flagged "launch with Elite Dangerous"
//! whenever the game launcher comes up.

use anyhow::{Context, Result};
use launchdeck_core::registry;
use launchdeck_core::{
    CollectionKind, HotReload, JsonFileStore, Registry, SysinfoProcessQuery, SystemLauncher,
    TriggerWatcher,
};
use std::path::PathBuf;

/// Overrides the document location
const CONFIG_ENV: &str = "LAUNCHDECK_CONFIG";

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_secs()
    .init();

    log::info!("Starting launchdeck");

    let store = match std::env::var_os(CONFIG_ENV) {
        Some(path) => JsonFileStore::new(PathBuf::from(path)),
        None => JsonFileStore::at_default_location()
            .context("Failed to locate launcher document")?,
    };
    let path = store.path().to_path_buf();
    log::info!("Using launcher document {:?}", path);

    let shared = Registry::open(store).into_shared();

    let watcher_config = {
        let registry = registry::read(&shared);
        log::info!(
            "{} apps ({} auto-launch), {} websites",
            registry.len(CollectionKind::Apps),
            registry.auto_launch_targets().len(),
            registry.len(CollectionKind::Websites)
        );
        registry.watcher_config().clone()
    };

    // Edits made by the UI (or by hand) take effect without a restart
    let _hot_reload = match HotReload::watch(&path, shared.clone()) {
        Ok(reload) => Some(reload),
        Err(e) => {
            log::warn!("Hot reload disabled: {:#}", e);
            None
        }
    };

    let (watcher, report_rx) = TriggerWatcher::new(
        &watcher_config,
        shared,
        Box::new(SysinfoProcessQuery::new()),
        SystemLauncher::new(),
    )
    .context("Failed to set up trigger watcher")?;
    let _watcher_handle = watcher.start().context("Failed to start trigger watcher")?;

    log::info!("Press Ctrl+C to exit");

    // Main loop - summarize each auto-launch batch
    loop {
        match report_rx.recv() {
            Ok(report) => {
                log::info!(
                    "Auto-launch: {} started, {} failed",
                    report.launched.len(),
                    report.failed.len()
                );
                for (target, error) in &report.failed {
                    log::error!("  {}: {}", target, error);
                }
            }
            Err(e) => {
                log::error!("Trigger watcher stopped: {}", e);
                break;
            }
        }
    }

    Ok(())
}
