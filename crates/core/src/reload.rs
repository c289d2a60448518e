//! Hot-reload of the launcher document when it changes on disk

use crate::registry::{self, SharedRegistry};
use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Keeps a file watcher alive and reloads the registry on outside edits
pub struct HotReload {
    _watcher: RecommendedWatcher,
    reloaded: Arc<AtomicBool>,
}

impl HotReload {
    /// Watch `path` and call [`Registry::reload`](crate::Registry::reload) when it changes.
    ///
    /// Our own saves also produce events; they read back identical and are ignored.
    pub fn watch(path: &Path, registry: SharedRegistry) -> Result<Self> {
        let reloaded = Arc::new(AtomicBool::new(false));
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .with_context(|| format!("{:?} does not name a file", path))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let watcher_reloaded = reloaded.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            if !(event.kind.is_modify() || event.kind.is_create()) {
                return;
            }
            if !event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()))
            {
                return;
            }

            if registry::write(&registry).reload() {
                watcher_reloaded.store(true, Ordering::SeqCst);
                log::info!("Launcher document hot-reloaded");
            }
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", dir))?;

        Ok(Self {
            _watcher: watcher,
            reloaded,
        })
    }

    /// True once after each reload that changed the registry
    pub fn check_reload(&self) -> bool {
        self.reloaded.swap(false, Ordering::SeqCst)
    }
}
