//! Persisted launcher document and watcher settings

use crate::item::{is_trigger_executable, Item, ItemKind};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// File name of the launcher document inside the config directory
pub const DOCUMENT_FILE: &str = "data.edl";

/// Grid width used when the document does not carry one
pub const DEFAULT_GRID_COLUMNS: u32 = 5;

/// An entry of the `apps` collection as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppEntry {
    pub path: String,
    /// Start together with the game launcher
    #[serde(default)]
    pub launch_with_ed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
}

/// An entry of the `websites` collection as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebsiteEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
}

/// The whole persisted document.
///
/// UI settings the core does not interpret (`grid_columns`, `window_position`,
/// and any key this version does not know about) are carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Document {
    #[serde(default)]
    pub apps: Vec<AppEntry>,

    #[serde(default)]
    pub websites: Vec<WebsiteEntry>,

    /// Icons per grid row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_columns: Option<u32>,

    /// Opaque window geometry owned by the UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_position: Option<Value>,

    /// Trigger watcher settings
    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatcherConfig {
    /// Executable name whose appearance triggers auto-launch
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Delay between two process-list polls (ms)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Consecutive absent polls needed before the trigger re-arms
    #[serde(default = "default_rearm_after")]
    pub rearm_after_absent_ticks: u32,

    /// Give up on a process-list query after this long (ms); `null` waits forever
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: Option<u64>,
}

fn default_process_name() -> String {
    "EDLaunch.exe".to_string()
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_rearm_after() -> u32 {
    1
}

fn default_query_timeout() -> Option<u64> {
    Some(10_000)
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            poll_interval_ms: default_poll_interval(),
            rearm_after_absent_ticks: default_rearm_after(),
            query_timeout_ms: default_query_timeout(),
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

impl Document {
    /// Default document location inside the platform config directory
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "rmanov", "launchdeck")
            .context("Failed to determine config directory")?;
        let config_dir = dirs.config_dir();
        fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        Ok(config_dir.join(DOCUMENT_FILE))
    }

    pub fn grid_columns(&self) -> u32 {
        self.grid_columns.unwrap_or(DEFAULT_GRID_COLUMNS).max(1)
    }

    /// Application items in stored order.
    ///
    /// A flag on the trigger executable itself is dropped here so it can
    /// never reach the watcher, whatever was written to disk.
    pub fn app_items(&self) -> Vec<Item> {
        let process_name = &self.watcher.process_name;
        self.apps
            .iter()
            .map(|entry| {
                let mut item = Item::application(entry.path.clone());
                item.display_name = non_blank(entry.custom_name.as_deref());
                item.auto_launch =
                    entry.launch_with_ed && !is_trigger_executable(&entry.path, process_name);
                item
            })
            .collect()
    }

    pub fn website_items(&self) -> Vec<Item> {
        self.websites
            .iter()
            .map(|entry| {
                let mut item = Item::website(entry.url.clone());
                item.display_name = non_blank(entry.custom_name.as_deref());
                item
            })
            .collect()
    }

    /// The document as the registry would write it back: blank names
    /// dropped, the trigger executable unflagged
    pub fn normalized(&self) -> Document {
        let mut document = self.clone();
        document.set_items(&self.app_items(), &self.website_items());
        document
    }

    /// Replace both collections, keeping every other setting
    pub fn set_items(&mut self, apps: &[Item], websites: &[Item]) {
        self.apps = apps
            .iter()
            .filter(|item| item.kind == ItemKind::Application)
            .map(|item| AppEntry {
                path: item.target.clone(),
                launch_with_ed: item.auto_launch,
                custom_name: item.display_name.clone(),
            })
            .collect();
        self.websites = websites
            .iter()
            .filter(|item| item.kind == ItemKind::Website)
            .map(|item| WebsiteEntry {
                url: item.target.clone(),
                custom_name: item.display_name.clone(),
            })
            .collect();
    }
}

fn non_blank(name: Option<&str>) -> Option<String> {
    name.filter(|n| !n.trim().is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_document() {
        let doc = Document::default();
        assert!(doc.apps.is_empty());
        assert!(doc.websites.is_empty());
        assert_eq!(doc.grid_columns(), 5);
        assert_eq!(doc.watcher.process_name, "EDLaunch.exe");
        assert_eq!(doc.watcher.poll_interval(), Duration::from_secs(5));
        assert_eq!(doc.watcher.rearm_after_absent_ticks, 1);
    }

    #[test]
    fn test_parses_legacy_document() {
        let json = r#"{
            "apps": [
                {"path": "C:/Tools/EDMC.exe", "launch_with_ed": true},
                {"path": "C:/Tools/notes.bat", "launch_with_ed": false, "custom_name": "Notes"}
            ],
            "websites": [{"url": "https://inara.cz"}],
            "grid_columns": 4,
            "window_position": {"x": 10, "y": 20, "width": 500, "height": 400},
            "slogans": ["o7"]
        }"#;

        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.apps.len(), 2);
        assert!(doc.apps[0].launch_with_ed);
        assert_eq!(doc.apps[1].custom_name.as_deref(), Some("Notes"));
        assert_eq!(doc.grid_columns(), 4);
        assert_eq!(doc.watcher, WatcherConfig::default());
        assert_eq!(doc.extra.get("slogans"), Some(&serde_json::json!(["o7"])));
    }

    #[test]
    fn test_passthrough_survives_serialization() {
        let json = r#"{
            "apps": [],
            "window_position": {"x": 1, "y": 2, "width": 3, "height": 4},
            "theme": "orange"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let out: Value = serde_json::to_value(&doc).unwrap();

        assert_eq!(out["window_position"]["height"], 4);
        assert_eq!(out["theme"], "orange");
        assert!(out.get("grid_columns").is_none());
    }

    #[test]
    fn test_trigger_executable_flag_dropped_on_load() {
        let json = r#"{"apps": [
            {"path": "D:/Frontier/EDLaunch.exe", "launch_with_ed": true},
            {"path": "D:/Tools/EDDiscovery.exe", "launch_with_ed": true}
        ]}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let items = doc.app_items();

        assert!(!items[0].auto_launch);
        assert!(items[1].auto_launch);
    }

    #[test]
    fn test_blank_custom_name_is_absent() {
        let json = r#"{"websites": [{"url": "https://edsm.net", "custom_name": ""}]}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.website_items()[0].display_name, None);
    }
}
