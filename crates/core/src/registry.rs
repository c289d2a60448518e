//! The launch registry: both shortcut collections, their mutations, and
//! persistence through a [`ConfigStore`].

use crate::config::{Document, WatcherConfig};
use crate::error::RegistryError;
use crate::item::{is_trigger_executable, CollectionKind, GridPosition, Item, ItemKind};
use crate::reorder::{self, ReorderSession};
use crate::store::ConfigStore;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry shared between the UI and the trigger watcher
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// Read access that survives a panicked writer
pub fn read(registry: &SharedRegistry) -> RwLockReadGuard<'_, Registry> {
    registry.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write access that survives a panicked writer
pub fn write(registry: &SharedRegistry) -> RwLockWriteGuard<'_, Registry> {
    registry.write().unwrap_or_else(PoisonError::into_inner)
}

pub struct Registry {
    store: Box<dyn ConfigStore>,
    /// Everything in the document except the two collections
    settings: Document,
    apps: Vec<Item>,
    websites: Vec<Item>,
    apps_session: Option<ReorderSession>,
    websites_session: Option<ReorderSession>,
    /// An outside change arrived mid-reorder and has not been merged yet
    reload_pending: bool,
}

impl Registry {
    /// Empty registry backed by `store`. Call [`Registry::load`] to populate it.
    pub fn new(store: impl ConfigStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            settings: Document::default(),
            apps: Vec::new(),
            websites: Vec::new(),
            apps_session: None,
            websites_session: None,
            reload_pending: false,
        }
    }

    /// Registry populated from `store`
    pub fn open(store: impl ConfigStore + 'static) -> Self {
        let mut registry = Self::new(store);
        registry.load();
        registry
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Populate both collections from the store.
    ///
    /// A missing or unreadable document leaves both collections empty.
    pub fn load(&mut self) {
        self.apps_session = None;
        self.websites_session = None;
        self.reload_pending = false;

        match self.store.read() {
            Ok(Some(document)) => {
                self.install(document);
                log::info!(
                    "Loaded {} apps and {} websites",
                    self.apps.len(),
                    self.websites.len()
                );
            }
            Ok(None) => {
                log::info!("No launcher document yet, starting empty");
                self.install(Document::default());
            }
            Err(e) => {
                log::warn!("Failed to load launcher document, starting empty: {:#}", e);
                self.install(Document::default());
            }
        }
    }

    /// Re-read the store after an outside change.
    ///
    /// While a reorder session is open the change is only recorded; it is
    /// merged by the next mutation, commit or cancel. Returns true when the
    /// in-memory collections or settings changed.
    pub fn reload(&mut self) -> bool {
        if self.apps_session.is_some() || self.websites_session.is_some() {
            log::debug!("Reorder in progress, deferring document change");
            self.reload_pending = true;
            return false;
        }

        match self.store.read() {
            Ok(Some(document)) => {
                if document.normalized() == self.document() {
                    return false;
                }
                self.install(document);
                true
            }
            Ok(None) => false,
            Err(e) => {
                log::warn!("Failed to reload launcher document: {:#}", e);
                false
            }
        }
    }

    /// Merge a change deferred by [`Registry::reload`].
    ///
    /// Collections in `keep` hold changes about to be saved and stay as they
    /// are. A collection still being reordered gets the stored order as its
    /// new snapshot; every other collection and all settings are replaced.
    fn absorb_pending(&mut self, keep: &[CollectionKind]) {
        if !self.reload_pending {
            return;
        }
        self.reload_pending = false;

        let document = match self.store.read() {
            Ok(Some(document)) => document,
            Ok(None) => return,
            Err(e) => {
                log::warn!("Failed to merge launcher document change: {:#}", e);
                return;
            }
        };

        for kind in CollectionKind::ALL {
            if keep.contains(&kind) {
                continue;
            }
            let stored = match kind {
                CollectionKind::Apps => document.app_items(),
                CollectionKind::Websites => document.website_items(),
            };
            match self.session_slot(kind) {
                Some(session) => session.rebase(stored),
                None => *self.collection_mut(kind) = stored,
            }
        }

        self.settings = document;
        self.settings.apps.clear();
        self.settings.websites.clear();
        log::info!("Merged outside change to launcher document");
    }

    fn install(&mut self, document: Document) {
        self.apps = document.app_items();
        self.websites = document.website_items();
        self.settings = document;
        self.settings.apps.clear();
        self.settings.websites.clear();
    }

    /// Document as it would be persisted right now.
    ///
    /// A collection that is mid-reorder contributes its snapshot, not its
    /// speculative order.
    pub fn document(&self) -> Document {
        let mut document = self.settings.clone();
        document.set_items(
            self.committed(CollectionKind::Apps),
            self.committed(CollectionKind::Websites),
        );
        document
    }

    /// Write the current state through the store. Failures are logged; the
    /// in-memory state stays authoritative.
    pub fn persist(&self) {
        match self.store.write(&self.document()) {
            Ok(()) => log::debug!("Launcher document saved"),
            Err(e) => log::error!("Failed to save launcher document: {:#}", e),
        }
    }

    fn committed(&self, kind: CollectionKind) -> &[Item] {
        match self.session(kind) {
            Some(session) => session.snapshot(),
            None => self.items(kind),
        }
    }

    pub fn items(&self, kind: CollectionKind) -> &[Item] {
        match kind {
            CollectionKind::Apps => &self.apps,
            CollectionKind::Websites => &self.websites,
        }
    }

    pub fn get(&self, kind: CollectionKind, index: usize) -> Option<&Item> {
        self.items(kind).get(index)
    }

    pub fn len(&self, kind: CollectionKind) -> usize {
        self.items(kind).len()
    }

    pub fn is_empty(&self, kind: CollectionKind) -> bool {
        self.items(kind).is_empty()
    }

    pub fn watcher_config(&self) -> &WatcherConfig {
        &self.settings.watcher
    }

    /// Name of the process whose appearance triggers auto-launch
    pub fn process_name(&self) -> &str {
        &self.settings.watcher.process_name
    }

    pub fn grid_columns(&self) -> u32 {
        self.settings.grid_columns()
    }

    pub fn grid_position(&self, index: usize) -> GridPosition {
        GridPosition::for_index(index, self.grid_columns() as usize)
    }

    /// Targets of applications flagged for auto-launch, in collection order.
    /// Copied so the caller can launch without holding the registry lock.
    pub fn auto_launch_targets(&self) -> Vec<String> {
        self.apps
            .iter()
            .filter(|item| item.auto_launch && !is_trigger_executable(&item.target, self.process_name()))
            .map(|item| item.target.clone())
            .collect()
    }

    fn collection_mut(&mut self, kind: CollectionKind) -> &mut Vec<Item> {
        match kind {
            CollectionKind::Apps => &mut self.apps,
            CollectionKind::Websites => &mut self.websites,
        }
    }

    fn session(&self, kind: CollectionKind) -> Option<&ReorderSession> {
        match kind {
            CollectionKind::Apps => self.apps_session.as_ref(),
            CollectionKind::Websites => self.websites_session.as_ref(),
        }
    }

    fn session_slot(&mut self, kind: CollectionKind) -> &mut Option<ReorderSession> {
        match kind {
            CollectionKind::Apps => &mut self.apps_session,
            CollectionKind::Websites => &mut self.websites_session,
        }
    }

    fn ensure_idle(&self, kind: CollectionKind) -> Result<(), RegistryError> {
        if self.is_reordering(kind) {
            return Err(RegistryError::ReorderInProgress(kind));
        }
        Ok(())
    }

    fn check_index(&self, kind: CollectionKind, index: usize) -> Result<(), RegistryError> {
        let len = self.len(kind);
        if index >= len {
            return Err(RegistryError::IndexOutOfRange {
                collection: kind,
                index,
                len,
            });
        }
        Ok(())
    }

    /// Append a new shortcut and persist.
    ///
    /// An empty target (a cancelled picker) adds nothing and returns `Ok(None)`.
    pub fn add(&mut self, kind: ItemKind, target: &str) -> Result<Option<usize>, RegistryError> {
        let collection = CollectionKind::from(kind);
        self.ensure_idle(collection)?;
        self.absorb_pending(&[]);

        let target = target.trim();
        if target.is_empty() {
            return Ok(None);
        }

        let item = match kind {
            ItemKind::Application => Item::application(target),
            ItemKind::Website => Item::website(target),
        };
        let items = self.collection_mut(collection);
        items.push(item);
        let index = items.len() - 1;

        log::info!("Added {} to {}", target, collection);
        self.persist();
        Ok(Some(index))
    }

    /// Set the display override. An empty name is a cancelled rename and changes nothing.
    pub fn rename(
        &mut self,
        kind: CollectionKind,
        index: usize,
        new_name: &str,
    ) -> Result<(), RegistryError> {
        self.ensure_idle(kind)?;
        self.absorb_pending(&[]);
        self.check_index(kind, index)?;

        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Ok(());
        }

        self.collection_mut(kind)[index].display_name = Some(new_name.to_string());
        self.persist();
        Ok(())
    }

    /// Delete the item at `index`; later items shift down by one
    pub fn remove(&mut self, kind: CollectionKind, index: usize) -> Result<Item, RegistryError> {
        self.ensure_idle(kind)?;
        self.absorb_pending(&[]);
        self.check_index(kind, index)?;

        let removed = self.collection_mut(kind).remove(index);
        log::info!("Removed {} from {}", removed.target, kind);
        self.persist();
        Ok(removed)
    }

    /// Flag an application to start with the trigger process.
    ///
    /// Returns false without changing anything when the application is the
    /// trigger process itself.
    pub fn set_auto_launch(&mut self, index: usize, flag: bool) -> Result<bool, RegistryError> {
        let kind = CollectionKind::Apps;
        self.ensure_idle(kind)?;
        self.absorb_pending(&[]);
        self.check_index(kind, index)?;

        if is_trigger_executable(&self.apps[index].target, &self.settings.watcher.process_name) {
            log::warn!(
                "Refusing to auto-launch {} with itself",
                self.settings.watcher.process_name
            );
            self.apps[index].auto_launch = false;
            return Ok(false);
        }

        if self.apps[index].auto_launch != flag {
            self.apps[index].auto_launch = flag;
            self.persist();
        }
        Ok(true)
    }

    pub fn is_reordering(&self, kind: CollectionKind) -> bool {
        self.session(kind).is_some()
    }

    /// Start reordering `kind`. Returns false if a session was already open.
    pub fn enter_reorder(&mut self, kind: CollectionKind) -> bool {
        if self.is_reordering(kind) {
            return false;
        }
        let session = ReorderSession::begin(self.items(kind));
        *self.session_slot(kind) = Some(session);
        log::debug!("Reordering {}", kind);
        true
    }

    /// Move an item inside an open session. Ignored (false) when no session
    /// is open or either index is stale.
    pub fn move_item(&mut self, kind: CollectionKind, from: usize, to: usize) -> bool {
        if !self.is_reordering(kind) {
            return false;
        }
        reorder::move_item(self.collection_mut(kind), from, to)
    }

    /// Keep the current order and persist it. Returns false if no session was open.
    pub fn commit_reorder(&mut self, kind: CollectionKind) -> bool {
        if self.session_slot(kind).take().is_none() {
            return false;
        }
        self.absorb_pending(&[kind]);
        log::info!("Saved new order of {}", kind);
        self.persist();
        true
    }

    /// Commit every open session with a single write
    pub fn commit_all_reorders(&mut self) {
        let committed: Vec<_> = CollectionKind::ALL
            .into_iter()
            .filter(|&kind| self.session_slot(kind).take().is_some())
            .collect();

        if !committed.is_empty() {
            self.absorb_pending(&committed);
            log::info!("Saved new order of {:?}", committed);
            self.persist();
        }
    }

    /// Put back the order from when the session started. Nothing is persisted.
    pub fn cancel_reorder(&mut self, kind: CollectionKind) -> bool {
        match self.session_slot(kind).take() {
            Some(session) => {
                session.restore(self.collection_mut(kind));
                self.absorb_pending(&[]);
                log::debug!("Reorder of {} cancelled", kind);
                true
            }
            None => false,
        }
    }

    /// Cancel the sessions of every collection at once
    pub fn cancel_all_reorders(&mut self) {
        for kind in CollectionKind::ALL {
            self.cancel_reorder(kind);
        }
    }
}
