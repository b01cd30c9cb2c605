//! JSON file-based persistence backend.
//!
//! A human-readable implementation of [`PersistencePort`] for hosts that
//! want list state to survive process restarts. Uses atomic file writes
//! (write-to-temp + rename) so a crash never leaves a corrupt file.
//!
//! # Performance Characteristics
//!
//! - **Read**: loads the entire file into memory once, at open
//! - **Write**: serializes and writes the entire snapshot map
//! - **Best for**: a handful of lists, infrequent writes

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::domain::error::PersistenceError;
use crate::ports::persistence::{
    storage_key, storage_prefix, PersistencePort, SavedState,
};
use crate::ports::request::ListContext;

/// On-disk container format.
///
/// Wraps the snapshot map in a versioned object so the format can migrate.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    /// Version of the file format itself, not of any list.
    version: u32,

    /// Snapshots keyed by list storage key (`endpoint[/list_id]@vN`).
    #[serde(default)]
    snapshots: HashMap<String, SavedState>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: 1,
            snapshots: HashMap::new(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    data: StoreFile,
    dirty: bool,
}

/// JSON file persistence backend.
///
/// The entire snapshot map is kept in memory and flushed on every
/// modification. `Send + Sync` via an internal mutex, so a single instance
/// can back every list in a process.
#[derive(Debug)]
pub struct JsonPersistence {
    file_path: PathBuf,
    inner: Mutex<Inner>,
}

impl JsonPersistence {
    /// Creates or opens a JSON persistence file.
    ///
    /// Loads existing data when the file exists, otherwise starts empty.
    /// Parent directories are created automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails, the file cannot be
    /// read, or it contains invalid JSON.
    pub fn open(file_path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let file_path = file_path.into();
        tracing::debug!(path = ?file_path, "opening JSON persistence");

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = if file_path.exists() {
            let contents = std::fs::read_to_string(&file_path)?;
            serde_json::from_str(&contents)
                .map_err(|e| PersistenceError::Codec(format!("failed to parse JSON: {e}")))?
        } else {
            StoreFile::default()
        };

        tracing::debug!(snapshots = data.snapshots.len(), "persistence opened");

        Ok(Self {
            file_path,
            inner: Mutex::new(Inner { data, dirty: false }),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, PersistenceError> {
        self.inner
            .lock()
            .map_err(|_| PersistenceError::Codec("persistence mutex poisoned".into()))
    }

    /// Flushes to disk with an atomic temp-file-then-rename write.
    fn save(&self, inner: &mut Inner) -> Result<(), PersistenceError> {
        if !inner.dirty {
            tracing::trace!("skipping save, no changes");
            return Ok(());
        }

        let json = serde_json::to_string_pretty(&inner.data)
            .map_err(|e| PersistenceError::Codec(format!("failed to serialize JSON: {e}")))?;

        let tmp_path = self.file_path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.file_path)?;

        inner.dirty = false;
        tracing::debug!(path = ?self.file_path, "persistence saved");
        Ok(())
    }
}

impl PersistencePort for JsonPersistence {
    fn init(&self, ctx: &ListContext) -> Result<(), PersistenceError> {
        let prefix = storage_prefix(ctx);
        let current = storage_key(ctx);
        let _span = tracing::debug_span!("json_init", key = %current).entered();
        let mut inner = self.lock()?;

        let before = inner.data.snapshots.len();
        inner.data.snapshots.retain(|key, _| {
            key == &current || key.rsplit_once("@v").map_or(true, |(p, _)| p != prefix)
        });
        let evicted = before - inner.data.snapshots.len();

        if evicted > 0 {
            tracing::debug!(prefix = %prefix, evicted, "evicted stale snapshots");
            inner.dirty = true;
            self.save(&mut inner)?;
        }
        Ok(())
    }

    fn get(&self, ctx: &ListContext) -> Result<Option<SavedState>, PersistenceError> {
        let key = storage_key(ctx);
        let _span = tracing::debug_span!("json_get", key = %key).entered();
        let inner = self.lock()?;
        Ok(inner.data.snapshots.get(&key).cloned())
    }

    fn set(&self, ctx: &ListContext) -> Result<(), PersistenceError> {
        let key = storage_key(ctx);
        let _span = tracing::debug_span!("json_set", key = %key).entered();
        let mut inner = self.lock()?;
        inner
            .data
            .snapshots
            .insert(key, SavedState::from_context(ctx));
        inner.dirty = true;
        self.save(&mut inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::config::SortOrder;
    use serde_json::{json, Map};
    use std::collections::BTreeMap;

    fn context(endpoint: &str, version: u32) -> ListContext {
        ListContext {
            endpoint: endpoint.into(),
            version,
            list_id: Some("main".into()),
            meta: Map::new(),
            page: 2,
            per_page: 10,
            search: "ada".into(),
            sort_by: "name".into(),
            sort_order: SortOrder::Asc,
            filters: BTreeMap::from([("status".to_string(), json!("open"))]),
            attr_settings: BTreeMap::new(),
            is_refresh: false,
            extra: Map::new(),
        }
    }

    #[test]
    fn snapshots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lists.json");

        let store = JsonPersistence::open(&path).unwrap();
        store.set(&context("users", 1)).unwrap();
        drop(store);

        let store = JsonPersistence::open(&path).unwrap();
        let saved = store.get(&context("users", 1)).unwrap().expect("snapshot");
        assert_eq!(saved.page, Some(2));
        assert_eq!(saved.sort_by.as_deref(), Some("name"));
        assert_eq!(
            saved.filters.unwrap().get("status"),
            Some(&json!("open"))
        );
    }

    #[test]
    fn init_evicts_old_version_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lists.json");

        let store = JsonPersistence::open(&path).unwrap();
        store.set(&context("users", 1)).unwrap();
        store.init(&context("users", 2)).unwrap();
        drop(store);

        let store = JsonPersistence::open(&path).unwrap();
        assert!(store.get(&context("users", 1)).unwrap().is_none());
    }

    #[test]
    fn open_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lists.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonPersistence::open(&path),
            Err(PersistenceError::Codec(_))
        ));
    }
}
