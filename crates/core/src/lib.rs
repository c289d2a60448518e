//! Core library for launchdeck
//!
//! Keeps the ordered app and website shortcut collections, the drag-to-reorder
//! protocol over them, and the watcher that starts flagged apps when the game
//! launcher appears.

pub mod config;
pub mod error;
pub mod item;
pub mod platform;
pub mod process;
pub mod registry;
pub mod reload;
pub mod reorder;
pub mod store;
pub mod trigger;

pub use config::{AppEntry, Document, WatcherConfig, WebsiteEntry};
pub use error::{LaunchError, RegistryError};
pub use item::{CollectionKind, GridPosition, Item, ItemKind};
pub use platform::{LaunchExecutor, SystemLauncher};
pub use process::{ProcessQuery, SysinfoProcessQuery, TimeoutQuery};
pub use registry::{Registry, SharedRegistry};
pub use reload::HotReload;
pub use reorder::ReorderSession;
pub use store::{ConfigStore, JsonFileStore, MemoryStore};
pub use trigger::{LaunchReport, Tick, TriggerState, TriggerWatcher};
