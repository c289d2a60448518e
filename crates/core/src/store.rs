//! Storage backends for the launcher document

use crate::config::Document;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::process;
use std::thread;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Where the registry reads and writes its document.
///
/// The registry does not know the storage format; it only hands whole
/// documents back and forth.
pub trait ConfigStore: Send + Sync {
    /// Read the stored document. `Ok(None)` means nothing has been stored yet.
    fn read(&self) -> Result<Option<Document>>;

    /// Replace the stored document
    fn write(&self, document: &Document) -> Result<()>;
}

/// Pretty-printed JSON file on disk
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform config directory
    pub fn at_default_location() -> Result<Self> {
        Ok(Self::new(Document::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    /// Per process and thread, so concurrent saves never share a temp file
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}.{}.tmp", process::id(), thread_id()));
        PathBuf::from(name)
    }
}

fn thread_id() -> u64 {
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish()
}

impl ConfigStore for JsonFileStore {
    fn read(&self) -> Result<Option<Document>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read launcher document from {:?}", self.path))?;

        match serde_json::from_str(&content) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                // Keep the unreadable copy; the next persist overwrites the original.
                let backup = self.corrupt_path();
                if let Err(copy_err) = fs::copy(&self.path, &backup) {
                    log::warn!("Could not back up corrupt document to {:?}: {}", backup, copy_err);
                } else {
                    log::warn!("Corrupt document backed up to {:?}", backup);
                }
                Err(e).with_context(|| format!("Failed to parse launcher document from {:?}", self.path))
            }
        }
    }

    fn write(&self, document: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(document)?;
        let temp_path = self.temp_path();

        let result = (|| -> Result<()> {
            let mut file = fs::File::create(&temp_path)
                .with_context(|| format!("Failed to create {:?}", temp_path))?;
            file.write_all(content.as_bytes())
                .with_context(|| format!("Failed to write {:?}", temp_path))?;
            file.sync_all()
                .with_context(|| format!("Failed to sync {:?}", temp_path))?;
            fs::rename(&temp_path, &self.path)
                .with_context(|| format!("Failed to write launcher document to {:?}", self.path))
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }
}

/// Document held in memory. Counts writes so callers can tell when a
/// mutation persisted.
#[derive(Default)]
pub struct MemoryStore {
    document: Mutex<Option<Document>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            writes: AtomicUsize::new(0),
        }
    }

    /// Last written (or seeded) document
    pub fn snapshot(&self) -> Option<Document> {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self) -> Result<Option<Document>> {
        Ok(self.snapshot())
    }

    fn write(&self, document: &Document) -> Result<()> {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<S: ConfigStore + ?Sized> ConfigStore for std::sync::Arc<S> {
    fn read(&self) -> Result<Option<Document>> {
        (**self).read()
    }

    fn write(&self, document: &Document) -> Result<()> {
        (**self).write(document)
    }
}
