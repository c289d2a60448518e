//! Launchable shortcut items and the two collections they live in

use std::fmt;

/// What an item points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Local executable or script
    Application,
    /// URL opened in the default browser
    Website,
}

/// One of the two ordered collections owned by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Apps,
    Websites,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 2] = [CollectionKind::Apps, CollectionKind::Websites];

    /// Kind of item stored in this collection
    pub fn item_kind(self) -> ItemKind {
        match self {
            CollectionKind::Apps => ItemKind::Application,
            CollectionKind::Websites => ItemKind::Website,
        }
    }
}

impl From<ItemKind> for CollectionKind {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Application => CollectionKind::Apps,
            ItemKind::Website => CollectionKind::Websites,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::Apps => f.write_str("apps"),
            CollectionKind::Websites => f.write_str("websites"),
        }
    }
}

/// A launchable shortcut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    /// Path (applications) or URL (websites). Never changes after creation.
    pub target: String,
    /// User override for the label shown under the icon
    pub display_name: Option<String>,
    /// Start this application when the trigger process appears
    pub auto_launch: bool,
}

impl Item {
    pub fn application(path: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Application,
            target: path.into(),
            display_name: None,
            auto_launch: false,
        }
    }

    pub fn website(url: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Website,
            target: url.into(),
            display_name: None,
            auto_launch: false,
        }
    }

    /// Label to render: the override if set, otherwise derived from the target
    pub fn label(&self) -> String {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => derived_name(self.kind, &self.target),
        }
    }
}

/// Default label for a target: file stem for applications, host for websites
pub fn derived_name(kind: ItemKind, target: &str) -> String {
    match kind {
        ItemKind::Application => {
            let file = file_name(target);
            match file.rfind('.') {
                Some(dot) if dot > 0 => file[..dot].to_string(),
                _ => file.to_string(),
            }
        }
        ItemKind::Website => {
            let rest = match target.find("//") {
                Some(pos) => &target[pos + 2..],
                None => target,
            };
            rest.split('/').next().unwrap_or(rest).to_string()
        }
    }
}

/// Last path component. Both separators are honoured so Windows paths
/// stored in a shared document resolve the same on every platform.
fn file_name(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

/// True when `target` is the trigger process's own executable
pub fn is_trigger_executable(target: &str, process_name: &str) -> bool {
    let file = file_name(target.trim());
    !file.is_empty() && file.eq_ignore_ascii_case(process_name.trim())
}

/// Cell of an item in the icon grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub row: usize,
    pub column: usize,
}

impl GridPosition {
    pub fn for_index(index: usize, columns: usize) -> Self {
        let columns = columns.max(1);
        Self {
            row: index / columns,
            column: index % columns,
        }
    }
}
