//! Per-list mutable state and its transitions.
//!
//! [`ListState`] is the single source of truth for one mounted list. It is
//! owned exclusively by a [`ListController`](crate::controller::ListController)
//! and mutated only through its handlers, which keeps the published view
//! internally consistent: no stale counts paired with new items, no
//! selection surviving a data change, no duplicated pages in load-more mode.
//!
//! # Phases
//!
//! ```text
//! Initializing ──first fetch resolves──▶ Ready ⇄ Loading
//!        │                                │
//!        └───────────fetch fails──────────┴──▶ Errored (error set, data empty)
//! ```
//!
//! `Errored` behaves like `Ready` with `error` set; the next fetch clears it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::controller::config::{ListConfig, PaginationMode, SortOrder};
use crate::domain::error::RequestFailure;
use crate::domain::record::{self, Record};
use crate::ports::persistence::SavedState;
use crate::ports::request::PageResult;

/// Per-attribute presentation settings.
///
/// Seeded with `visible: true` for every known attribute. Extra keys set
/// through `update_attr` are kept verbatim for host-defined settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrSetting {
    /// Whether the attribute's column is currently shown.
    pub visible: bool,

    /// Host-defined settings beyond visibility.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Default for AttrSetting {
    fn default() -> Self {
        Self {
            visible: true,
            extra: Map::new(),
        }
    }
}

/// Mutable state of one mounted list.
///
/// Field semantics follow the controller contract: `page` is `None` while a
/// numeric page input is cleared mid-edit (no fetch runs in that window),
/// `is_initializing` stays true until the first fetch resolves either way,
/// and `error` being set implies `items` is empty and `count` is zero.
#[derive(Debug, Clone)]
pub struct ListState {
    /// Current page, 1-based; `None` is the transient cleared-input marker.
    pub page: Option<u32>,

    /// Current page size, always greater than zero.
    pub per_page: u32,

    /// Current sort column, empty for endpoint default ordering.
    pub sort_by: String,

    /// Current sort direction.
    pub sort_order: SortOrder,

    /// Current search text.
    pub search: String,

    /// Current filters, replaced wholesale by `set_filters`.
    pub filters: BTreeMap<String, Value>,

    /// Materialized rows: the last page, or the accumulated pages in
    /// load-more mode.
    pub items: Vec<Record>,

    /// Total matching records reported by the last successful fetch.
    pub count: u64,

    /// Selected record identifiers. Set semantics: deduplicated, reset to
    /// empty on every successful fetch.
    pub selection: Vec<Value>,

    /// Per-attribute settings, keyed by attribute name.
    pub attr_settings: BTreeMap<String, AttrSetting>,

    /// Failure from the last fetch, cleared when a new fetch starts.
    pub error: Option<RequestFailure>,

    /// True while a fetch is in flight after initialization completed.
    pub is_loading: bool,

    /// True until the first fetch resolves (successfully or not).
    pub is_initializing: bool,

    /// Last raw fetch result, kept for callers needing passthrough fields.
    pub response: Option<PageResult>,

    /// Monotonic change counter. Bumped on every mutation; the published
    /// view is memoized against it.
    pub version: u64,
}

impl ListState {
    /// Seeds state from a configuration, before any saved snapshot is
    /// applied and before the first fetch.
    #[must_use]
    pub fn from_config(config: &ListConfig) -> Self {
        Self {
            page: Some(config.page),
            per_page: config.per_page,
            sort_by: config.sort_by.clone(),
            sort_order: config.sort_order,
            search: config.search.clone(),
            filters: config.filters.clone(),
            items: Vec::new(),
            count: 0,
            selection: Vec::new(),
            attr_settings: BTreeMap::new(),
            error: None,
            is_loading: false,
            is_initializing: true,
            response: None,
            version: 0,
        }
    }

    /// Overrides configuration defaults with a saved snapshot.
    ///
    /// Only fields present in the snapshot are applied. In load-more mode
    /// the restored page is forced back to 1: accumulation always restarts
    /// from the top.
    pub fn apply_saved(&mut self, saved: SavedState, mode: PaginationMode) {
        if let Some(page) = saved.page {
            self.page = Some(page.max(1));
        }
        if mode == PaginationMode::LoadMore {
            self.page = Some(1);
        }
        if let Some(per_page) = saved.per_page.filter(|p| *p > 0) {
            self.per_page = per_page;
        }
        if let Some(sort_by) = saved.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_order) = saved.sort_order {
            self.sort_order = sort_order;
        }
        if let Some(search) = saved.search {
            self.search = search;
        }
        if let Some(filters) = saved.filters {
            self.filters = filters;
        }
        if let Some(attr_settings) = saved.attr_settings {
            self.attr_settings = attr_settings;
        }
        self.touch();
    }

    /// Re-seeds query state from a changed configuration, resetting to
    /// page 1. Items and counts are left for the follow-up fetch.
    pub fn adopt_config(&mut self, config: &ListConfig) {
        self.page = Some(1);
        self.per_page = config.per_page;
        self.sort_by = config.sort_by.clone();
        self.sort_order = config.sort_order;
        self.search = config.search.clone();
        self.filters = config.filters.clone();
        self.touch();
    }

    /// Marks the start of a fetch: clears any prior error and raises the
    /// loading flag unless the list is still initializing (the first fetch
    /// is reported through `is_initializing` alone).
    pub fn begin_fetch(&mut self) {
        self.error = None;
        if !self.is_initializing {
            self.is_loading = true;
        }
        self.touch();
    }

    /// Reconciles a successful fetch into state.
    ///
    /// `snapshot` is the item sequence captured before the request was
    /// issued; in load-more mode pages after the first append to it rather
    /// than to whatever the state holds at resolution time.
    pub fn reconcile(&mut self, result: PageResult, mode: PaginationMode, snapshot: Vec<Record>) {
        let appending = mode == PaginationMode::LoadMore && self.page.is_some_and(|p| p > 1);
        if appending {
            let mut items = snapshot;
            items.extend(result.items.iter().cloned());
            self.items = items;
        } else {
            self.items = result.items.clone();
        }

        self.count = result.count;
        self.selection.clear();
        self.response = Some(result);
        self.error = None;
        self.is_initializing = false;
        self.is_loading = false;

        self.ensure_attr_settings(&record::attr_names(&self.items));
        self.touch();

        tracing::debug!(
            items = self.items.len(),
            count = self.count,
            appended = appending,
            "fetch reconciled"
        );
    }

    /// Records a failed fetch: the failure is kept for observers and all
    /// previously fetched data is dropped.
    pub fn fail(&mut self, failure: RequestFailure) {
        tracing::debug!(error = %failure, "fetch failed, clearing results");
        self.error = Some(failure);
        self.items.clear();
        self.count = 0;
        self.response = None;
        self.is_initializing = false;
        self.is_loading = false;
        self.touch();
    }

    /// Inserts a default (visible) setting for every named attribute that
    /// does not have one yet. Existing settings are never overridden.
    pub fn ensure_attr_settings<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            self.attr_settings
                .entry(name.as_ref().to_owned())
                .or_default();
        }
    }

    /// Bumps the change counter.
    pub fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}
