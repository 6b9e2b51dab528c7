//! File-backed library host.
//!
//! `library.json` holds a JSON array of [`LibraryItem`] records. Reads come
//! from memory; artwork writes merge into the item and rewrite the file
//! atomically (temp file, then rename).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use artkeeper_core::{ArtType, HostError, LibraryHost, LibraryItem, MediaKind};

pub struct JsonLibrary {
    path: Option<PathBuf>,
    items: RwLock<Vec<LibraryItem>>,
}

impl JsonLibrary {
    /// Load a library file. A missing file is an empty library.
    pub fn open(path: &Path) -> Result<Self, HostError> {
        let items = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                HostError::unavailable(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(HostError::unavailable(format!("{}: {e}", path.display()))),
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            items: RwLock::new(items),
        })
    }

    /// A library that lives only in memory.
    pub fn in_memory(items: Vec<LibraryItem>) -> Self {
        Self {
            path: None,
            items: RwLock::new(items),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> Vec<LibraryItem> {
        self.items.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn save(&self, items: &[LibraryItem]) -> Result<(), HostError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(items)
            .map_err(|e| HostError::Rejected(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .and_then(|()| std::fs::rename(&tmp, path))
            .map_err(|e| HostError::unavailable(format!("{}: {e}", path.display())))
    }
}

impl LibraryHost for JsonLibrary {
    fn get_item(&self, kind: MediaKind, dbid: i64) -> Result<Option<LibraryItem>, HostError> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.iter().find(|i| i.kind == kind && i.dbid == dbid).cloned())
    }

    fn list_items(&self, kind: MediaKind) -> Result<Vec<LibraryItem>, HostError> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(items.iter().filter(|i| i.kind == kind).cloned().collect())
    }

    fn set_artwork(
        &self,
        kind: MediaKind,
        dbid: i64,
        art: &BTreeMap<ArtType, String>,
    ) -> Result<bool, HostError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let Some(item) = items.iter_mut().find(|i| i.kind == kind && i.dbid == dbid) else {
            return Err(HostError::NotFound { kind, dbid });
        };
        let mut changed = false;
        for (art_type, url) in art {
            if item.art.get(art_type) != Some(url) {
                item.art.insert(*art_type, url.clone());
                changed = true;
            }
        }
        if changed {
            self.save(&items)?;
        }
        Ok(true)
    }
}
