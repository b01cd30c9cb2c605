//! Persistence port: optional cross-navigation recall of list state.
//!
//! A [`PersistencePort`] lets a list come back exactly as the user left it:
//! page, page size, sort, search, filters and attribute visibility survive
//! unmount and remount. The port is optional and best-effort — the
//! controller treats a failed read as "no saved state" and logs a failed
//! write, so persistence problems never break a list.
//!
//! # Design
//!
//! The trait is minimal and use-case shaped rather than a generic store:
//! `init` runs once at mount (a chance to evict snapshots saved under prior
//! versions of the endpoint), `get` restores, `set` records the resolved
//! query after every successful fetch. All three receive the same
//! [`ListContext`] the request port sees.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::controller::config::SortOrder;
use crate::controller::state::AttrSetting;
use crate::domain::error::PersistenceError;
use crate::ports::request::ListContext;

/// A restorable snapshot of one list's query state.
///
/// Every field is optional: absent fields leave the configuration default in
/// place when the snapshot is applied at mount.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedState {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub search: Option<String>,
    pub filters: Option<BTreeMap<String, Value>>,
    pub attr_settings: Option<BTreeMap<String, AttrSetting>>,

    /// Unix timestamp of the save, for backends that age out entries.
    #[serde(default)]
    pub saved_at: i64,
}

impl SavedState {
    /// Builds a full snapshot of the context's query fields, stamped with
    /// the current time.
    #[must_use]
    pub fn from_context(ctx: &ListContext) -> Self {
        Self {
            page: Some(ctx.page),
            per_page: Some(ctx.per_page),
            sort_by: Some(ctx.sort_by.clone()),
            sort_order: Some(ctx.sort_order),
            search: Some(ctx.search.clone()),
            filters: Some(ctx.filters.clone()),
            attr_settings: Some(ctx.attr_settings.clone()),
            saved_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Abstraction over snapshot storage backends.
///
/// # Implementations
///
/// - [`MemoryPersistence`]: in-process map, for tests and single-session use
/// - [`JsonPersistence`](crate::ports::JsonPersistence): JSON file with
///   atomic writes
pub trait PersistencePort: Send + Sync {
    /// Called once at mount, before `get`.
    ///
    /// Backends use this to clean up snapshots saved for the same endpoint
    /// under an older version. The default does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup fails; the controller logs and
    /// proceeds.
    fn init(&self, _ctx: &ListContext) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// Returns the saved snapshot for the context's identity, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails; the controller treats it as a
    /// cache miss.
    fn get(&self, ctx: &ListContext) -> Result<Option<SavedState>, PersistenceError>;

    /// Records the context's resolved query. Called after every successful
    /// fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the controller logs it.
    fn set(&self, ctx: &ListContext) -> Result<(), PersistenceError>;
}

/// Storage identity of a list: endpoint plus optional list id, without the
/// version. Two versions of one list share a prefix so `init` can evict the
/// stale one.
pub(crate) fn storage_prefix(ctx: &ListContext) -> String {
    match &ctx.list_id {
        Some(id) => format!("{}/{}", ctx.endpoint, id),
        None => ctx.endpoint.clone(),
    }
}

/// Full storage key including the version.
pub(crate) fn storage_key(ctx: &ListContext) -> String {
    format!("{}@v{}", storage_prefix(ctx), ctx.version)
}

/// In-process persistence backend.
///
/// Keeps snapshots in a mutex-guarded map. Useful for tests and for hosts
/// that only want recall within one process lifetime.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    entries: Mutex<HashMap<String, SavedState>>,
}

impl MemoryPersistence {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// True when no snapshot is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistencePort for MemoryPersistence {
    fn init(&self, ctx: &ListContext) -> Result<(), PersistenceError> {
        let prefix = storage_prefix(ctx);
        let current = storage_key(ctx);
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Codec("persistence map poisoned".into()))?;
        let before = entries.len();
        entries.retain(|key, _| {
            key == &current || key.rsplit_once("@v").map_or(true, |(p, _)| p != prefix)
        });
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(prefix = %prefix, evicted, "evicted stale snapshots");
        }
        Ok(())
    }

    fn get(&self, ctx: &ListContext) -> Result<Option<SavedState>, PersistenceError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Codec("persistence map poisoned".into()))?;
        Ok(entries.get(&storage_key(ctx)).cloned())
    }

    fn set(&self, ctx: &ListContext) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PersistenceError::Codec("persistence map poisoned".into()))?;
        entries.insert(storage_key(ctx), SavedState::from_context(ctx));
        Ok(())
    }
}
