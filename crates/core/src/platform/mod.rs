//! Platform-specific launching of applications and websites

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub mod windows;

use crate::error::LaunchError;
use crate::item::{Item, ItemKind};
use std::process::{Child, Command, Stdio};
use std::thread;

/// Starts shortcut targets. Implementations must not wait for the started program.
pub trait LaunchExecutor {
    /// Start a local executable or script
    fn launch_application(&self, path: &str) -> Result<(), LaunchError>;

    /// Open a URL in the default browser
    fn open_website(&self, url: &str) -> Result<(), LaunchError>;

    /// Launch an item according to its kind
    fn launch(&self, item: &Item) -> Result<(), LaunchError> {
        match item.kind {
            ItemKind::Application => self.launch_application(&item.target),
            ItemKind::Website => self.open_website(&item.target),
        }
    }
}

impl<L: LaunchExecutor + ?Sized> LaunchExecutor for std::sync::Arc<L> {
    fn launch_application(&self, path: &str) -> Result<(), LaunchError> {
        (**self).launch_application(path)
    }

    fn open_website(&self, url: &str) -> Result<(), LaunchError> {
        (**self).open_website(url)
    }
}

/// Launches through the operating system: detached child processes for
/// applications, the default browser for websites
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl LaunchExecutor for SystemLauncher {
    fn launch_application(&self, path: &str) -> Result<(), LaunchError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(LaunchError::EmptyTarget);
        }

        let mut command = application_command(path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = command.spawn().map_err(|source| LaunchError::Spawn {
            path: path.to_string(),
            source,
        })?;
        reap_in_background(child, path);

        log::info!("Launched {}", path);
        Ok(())
    }

    fn open_website(&self, url: &str) -> Result<(), LaunchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(LaunchError::EmptyTarget);
        }

        open::that_detached(url).map_err(|source| LaunchError::Open {
            url: url.to_string(),
            source,
        })?;

        log::info!("Opened {}", url);
        Ok(())
    }
}

/// Wait for `child` on its own thread so an exited program does not linger
/// as a zombie while the daemon keeps running
fn reap_in_background(mut child: Child, path: &str) {
    let label = path.to_string();
    let spawned = thread::Builder::new()
        .name("launch-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => log::debug!("{} exited with {}", label, status),
            Err(e) => log::warn!("Failed to wait for {}: {}", label, e),
        });

    if let Err(e) = spawned {
        log::warn!("Failed to start reaper thread for {}: {}", path, e);
    }
}

#[cfg(unix)]
fn application_command(path: &str) -> Command {
    unix::application_command(path)
}

#[cfg(windows)]
fn application_command(path: &str) -> Command {
    windows::application_command(path)
}

/// True when `path` ends in one of `extensions` (case-insensitive)
fn has_extension(path: &str, extensions: &[&str]) -> bool {
    std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
