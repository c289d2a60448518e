//! Auto-launch on the rising edge of the trigger process.
//!
//! The watcher polls the process list on a fixed interval. When the trigger
//! process goes from absent to present it launches every application flagged
//! for auto-launch, once. It fires again only after the process has been seen
//! gone.

use crate::config::WatcherConfig;
use crate::item::is_trigger_executable;
use crate::platform::LaunchExecutor;
use crate::process::{ProcessQuery, TimeoutQuery};
use crate::registry::{self, SharedRegistry};
use anyhow::Result;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Duration;

/// Presence memory of the trigger process
#[derive(Debug, Clone)]
pub struct TriggerState {
    last_seen: bool,
    absent_ticks: u32,
    rearm_after: u32,
}

impl TriggerState {
    /// `rearm_after` consecutive absent observations clear `last_seen`.
    /// Zero is treated as one.
    pub fn new(rearm_after: u32) -> Self {
        Self {
            last_seen: false,
            absent_ticks: 0,
            rearm_after: rearm_after.max(1),
        }
    }

    pub fn last_seen(&self) -> bool {
        self.last_seen
    }

    pub fn set_rearm_after(&mut self, rearm_after: u32) {
        self.rearm_after = rearm_after.max(1);
    }

    /// Record one observation. Returns true on a rising edge.
    pub fn observe(&mut self, found_now: bool) -> bool {
        if found_now {
            self.absent_ticks = 0;
            let rising = !self.last_seen;
            self.last_seen = true;
            rising
        } else {
            self.absent_ticks = self.absent_ticks.saturating_add(1);
            if self.absent_ticks >= self.rearm_after {
                self.last_seen = false;
            }
            false
        }
    }
}

/// What one rising edge launched
#[derive(Debug, Default)]
pub struct LaunchReport {
    /// Targets started, in collection order
    pub launched: Vec<String>,
    /// Targets that failed, with the error message
    pub failed: Vec<(String, String)>,
}

/// Result of a single poll
#[derive(Debug)]
pub enum Tick {
    /// Process list unavailable; state untouched
    Skipped,
    Absent,
    /// Present, and was already present before
    Steady,
    Fired(LaunchReport),
}

pub struct TriggerWatcher<L> {
    /// Watcher settings of the registry as last applied
    synced: WatcherConfig,
    process_name: String,
    poll_interval: Duration,
    state: TriggerState,
    query: Box<dyn ProcessQuery>,
    registry: SharedRegistry,
    launcher: L,
    report_tx: Sender<LaunchReport>,
}

impl<L: LaunchExecutor + Send + 'static> TriggerWatcher<L> {
    /// Create a watcher over `registry`.
    ///
    /// Returns the watcher and a receiver that gets a [`LaunchReport`] for
    /// every rising edge. When `config` sets a query timeout, `query` is moved
    /// onto its own thread.
    ///
    /// Later changes to the registry's watcher settings (a hot reload) are
    /// applied on the next tick, except the query timeout.
    pub fn new(
        config: &WatcherConfig,
        registry: SharedRegistry,
        query: Box<dyn ProcessQuery>,
        launcher: L,
    ) -> Result<(Self, Receiver<LaunchReport>)> {
        let query: Box<dyn ProcessQuery> = match config.query_timeout() {
            Some(timeout) => Box::new(TimeoutQuery::spawn(query, timeout)?),
            None => query,
        };
        let (report_tx, report_rx) = channel();
        let synced = registry::read(&registry).watcher_config().clone();

        let watcher = Self {
            synced,
            process_name: config.process_name.clone(),
            poll_interval: config.poll_interval(),
            state: TriggerState::new(config.rearm_after_absent_ticks),
            query,
            registry,
            launcher,
            report_tx,
        };

        Ok((watcher, report_rx))
    }

    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    /// Pick up watcher settings changed in the registry since the last tick
    fn sync_settings(&mut self) {
        let current = registry::read(&self.registry).watcher_config().clone();
        if current == self.synced {
            return;
        }

        if current.process_name != self.synced.process_name {
            log::info!(
                "Trigger process changed from {} to {}",
                self.process_name,
                current.process_name
            );
            self.process_name = current.process_name.clone();
            // Presence of the old process says nothing about the new one
            self.state = TriggerState::new(current.rearm_after_absent_ticks);
        } else if current.rearm_after_absent_ticks != self.synced.rearm_after_absent_ticks {
            self.state.set_rearm_after(current.rearm_after_absent_ticks);
        }

        if current.poll_interval_ms != self.synced.poll_interval_ms {
            self.poll_interval = current.poll_interval();
            log::info!("Polling every {:?}", self.poll_interval);
        }
        if current.query_timeout_ms != self.synced.query_timeout_ms {
            log::warn!("Process query timeout change takes effect after a restart");
        }

        self.synced = current;
    }

    /// Poll once and act on the result
    pub fn tick(&mut self) -> Tick {
        self.sync_settings();

        let names = match self.query.process_names() {
            Ok(names) => names,
            Err(e) => {
                log::warn!("Skipping process check: {:#}", e);
                return Tick::Skipped;
            }
        };

        let found_now = names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&self.process_name));
        let was_seen = self.state.last_seen();

        if self.state.observe(found_now) {
            log::info!("{} started, launching flagged apps", self.process_name);
            Tick::Fired(self.launch_flagged())
        } else if found_now {
            Tick::Steady
        } else {
            if was_seen && !self.state.last_seen() {
                log::info!("{} exited, trigger re-armed", self.process_name);
            }
            Tick::Absent
        }
    }

    fn launch_flagged(&self) -> LaunchReport {
        // Copy under the lock, launch outside it
        let targets = registry::read(&self.registry).auto_launch_targets();

        let mut report = LaunchReport::default();
        for target in targets {
            if is_trigger_executable(&target, &self.process_name) {
                continue;
            }
            match self.launcher.launch_application(&target) {
                Ok(()) => report.launched.push(target),
                Err(e) => {
                    log::error!("Auto-launch failed: {}", e);
                    report.failed.push((target, e.to_string()));
                }
            }
        }
        report
    }

    /// Poll forever on the configured interval
    pub fn run(mut self) {
        log::info!(
            "Watching for {} every {:?}",
            self.process_name,
            self.poll_interval
        );

        loop {
            if let Tick::Fired(report) = self.tick() {
                // Nobody listening is fine; the launches already happened
                let _ = self.report_tx.send(report);
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Run the poll loop on a background thread for the rest of the process
    pub fn start(self) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("trigger-watcher".into())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppEntry, Document};
    use crate::error::LaunchError;
    use crate::registry::Registry;
    use crate::store::{ConfigStore, MemoryStore};
    use anyhow::bail;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingLauncher {
        launched: Mutex<Vec<String>>,
        failing: Vec<String>,
    }

    impl RecordingLauncher {
        fn launched(&self) -> Vec<String> {
            self.launched.lock().unwrap().clone()
        }
    }

    impl LaunchExecutor for RecordingLauncher {
        fn launch_application(&self, path: &str) -> Result<(), LaunchError> {
            if self.failing.iter().any(|f| f == path) {
                return Err(LaunchError::Spawn {
                    path: path.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                });
            }
            self.launched.lock().unwrap().push(path.to_string());
            Ok(())
        }

        fn open_website(&self, _url: &str) -> Result<(), LaunchError> {
            unreachable!("the watcher only launches applications")
        }
    }

    /// Replays a fixed presence sequence; `None` simulates a failed query
    fn scripted(sequence: &[Option<bool>]) -> Box<dyn ProcessQuery> {
        let mut ticks: VecDeque<Option<bool>> = sequence.iter().copied().collect();
        Box::new(move || -> Result<Vec<String>> {
            match ticks.pop_front().flatten() {
                Some(true) => Ok(vec!["explorer.exe".into(), "EDLaunch.exe".into()]),
                Some(false) => Ok(vec!["explorer.exe".into()]),
                None => bail!("process list unavailable"),
            }
        })
    }

    fn registry_with(apps: &[(&str, bool)]) -> SharedRegistry {
        let document = Document {
            apps: apps
                .iter()
                .map(|(path, flag)| AppEntry {
                    path: path.to_string(),
                    launch_with_ed: *flag,
                    custom_name: None,
                })
                .collect(),
            ..Document::default()
        };
        Registry::open(MemoryStore::with_document(document)).into_shared()
    }

    fn watcher(
        sequence: &[Option<bool>],
        registry: SharedRegistry,
        launcher: Arc<RecordingLauncher>,
        rearm_after: u32,
    ) -> TriggerWatcher<Arc<RecordingLauncher>> {
        let config = WatcherConfig {
            rearm_after_absent_ticks: rearm_after,
            query_timeout_ms: None,
            ..WatcherConfig::default()
        };
        let (watcher, _rx) =
            TriggerWatcher::new(&config, registry, scripted(sequence), launcher).unwrap();
        watcher
    }

    #[test]
    fn test_state_fires_once_per_rising_edge() {
        let mut state = TriggerState::new(1);
        let fired: Vec<usize> = [false, false, true, true, false, true]
            .into_iter()
            .enumerate()
            .filter(|&(_, present)| state.observe(present))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(fired, [2, 5]);
    }

    #[test]
    fn test_state_rearm_debounce() {
        let mut state = TriggerState::new(2);
        assert!(state.observe(true));
        // One missed tick does not re-arm
        assert!(!state.observe(false));
        assert!(!state.observe(true));
        // Two in a row do
        assert!(!state.observe(false));
        assert!(!state.observe(false));
        assert!(state.observe(true));
    }

    #[test]
    fn test_watcher_edge_sequence() {
        let launcher = Arc::new(RecordingLauncher::default());
        let registry = registry_with(&[("b.exe", true)]);
        let sequence = [false, false, true, true, false, true].map(Some);
        let mut watcher = watcher(&sequence, registry, launcher.clone(), 1);

        let fired: Vec<usize> = (0..sequence.len())
            .filter(|_| matches!(watcher.tick(), Tick::Fired(_)))
            .collect();

        assert_eq!(fired, [2, 5]);
        assert_eq!(launcher.launched(), ["b.exe", "b.exe"]);
    }

    #[test]
    fn test_only_flagged_app_launches() {
        let launcher = Arc::new(RecordingLauncher::default());
        let registry = registry_with(&[("a.exe", false), ("b.exe", true), ("EDLaunch.exe", false)]);
        let mut watcher = watcher(&[Some(false), Some(true)], registry, launcher.clone(), 1);

        assert!(matches!(watcher.tick(), Tick::Absent));
        match watcher.tick() {
            Tick::Fired(report) => {
                assert_eq!(report.launched, ["b.exe"]);
                assert!(report.failed.is_empty());
            }
            other => panic!("expected a rising edge, got {:?}", other),
        }
        assert_eq!(launcher.launched(), ["b.exe"]);
    }

    #[test]
    fn test_failure_does_not_stop_siblings() {
        let launcher = Arc::new(RecordingLauncher {
            failing: vec!["b.exe".into()],
            ..Default::default()
        });
        let registry = registry_with(&[("a.exe", true), ("b.exe", true), ("c.exe", true)]);
        let mut watcher = watcher(&[Some(true)], registry, launcher.clone(), 1);

        let Tick::Fired(report) = watcher.tick() else {
            panic!("expected a rising edge");
        };
        assert_eq!(report.launched, ["a.exe", "c.exe"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "b.exe");
        assert_eq!(launcher.launched(), ["a.exe", "c.exe"]);
    }

    #[test]
    fn test_failed_query_skips_tick() {
        let launcher = Arc::new(RecordingLauncher::default());
        let registry = registry_with(&[("a.exe", true)]);
        let mut watcher = watcher(&[Some(true), None, Some(true)], registry, launcher.clone(), 1);

        assert!(matches!(watcher.tick(), Tick::Fired(_)));
        assert!(matches!(watcher.tick(), Tick::Skipped));
        assert!(watcher.state().last_seen());
        // A flaky query must not look like an exit followed by a restart
        assert!(matches!(watcher.tick(), Tick::Steady));
        assert_eq!(launcher.launched(), ["a.exe"]);
    }

    #[test]
    fn test_flags_changed_between_edges_are_honoured() {
        let launcher = Arc::new(RecordingLauncher::default());
        let registry = registry_with(&[("a.exe", true), ("b.exe", false)]);
        let sequence = [true, false, true].map(Some);
        let mut watcher = watcher(&sequence, registry.clone(), launcher.clone(), 1);

        watcher.tick();
        watcher.tick();
        {
            let mut registry = registry::write(&registry);
            registry.set_auto_launch(0, false).unwrap();
            registry.set_auto_launch(1, true).unwrap();
        }
        watcher.tick();

        assert_eq!(launcher.launched(), ["a.exe", "b.exe"]);
    }

    #[test]
    fn test_process_name_match_is_case_insensitive() {
        let launcher = Arc::new(RecordingLauncher::default());
        let registry = registry_with(&[("a.exe", true)]);
        let config = WatcherConfig {
            query_timeout_ms: None,
            ..WatcherConfig::default()
        };
        let query: Box<dyn ProcessQuery> =
            Box::new(|| -> Result<Vec<String>> { Ok(vec!["edlaunch.EXE".into()]) });
        let (mut watcher, _rx) =
            TriggerWatcher::new(&config, registry, query, launcher.clone()).unwrap();

        assert!(matches!(watcher.tick(), Tick::Fired(_)));
    }

    #[test]
    fn test_reloaded_settings_apply_without_restart() {
        let mut initial = Document::default();
        initial.apps.push(AppEntry {
            path: "a.exe".into(),
            launch_with_ed: true,
            custom_name: None,
        });
        let store = Arc::new(MemoryStore::with_document(initial));
        let registry = Registry::open(store.clone()).into_shared();
        let config = WatcherConfig {
            query_timeout_ms: None,
            ..registry::read(&registry).watcher_config().clone()
        };

        let mut polls: VecDeque<Vec<String>> = VecDeque::from([
            vec!["EDLaunch.exe".to_string()],
            vec!["EDLaunch.exe".to_string(), "Game.exe".to_string()],
        ]);
        let query: Box<dyn ProcessQuery> =
            Box::new(move || -> Result<Vec<String>> { Ok(polls.pop_front().unwrap_or_default()) });
        let launcher = Arc::new(RecordingLauncher::default());
        let (mut watcher, _rx) =
            TriggerWatcher::new(&config, registry.clone(), query, launcher.clone()).unwrap();

        assert!(matches!(watcher.tick(), Tick::Fired(_)));

        let mut edited = store.snapshot().unwrap();
        edited.watcher.process_name = "Game.exe".into();
        edited.watcher.poll_interval_ms = 250;
        store.write(&edited).unwrap();
        assert!(registry::write(&registry).reload());

        assert!(matches!(watcher.tick(), Tick::Fired(_)));
        assert_eq!(watcher.poll_interval, Duration::from_millis(250));
        assert_eq!(launcher.launched(), ["a.exe", "a.exe"]);
    }

    #[test]
    fn test_reports_reach_receiver() {
        let launcher = Arc::new(RecordingLauncher::default());
        let registry = registry_with(&[("a.exe", true)]);
        let config = WatcherConfig {
            poll_interval_ms: 10,
            query_timeout_ms: Some(1000),
            ..WatcherConfig::default()
        };
        let (watcher, rx) =
            TriggerWatcher::new(&config, registry, scripted(&[Some(true)]), launcher).unwrap();
        watcher.start().unwrap();

        let report = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(report.launched, ["a.exe"]);
    }
}
