//! The list-state controller: fetch lifecycle and interaction handlers.
//!
//! [`ListController`] owns one list's [`ListState`] and is the only thing
//! that mutates it. Handlers that change a query-affecting field (page,
//! page size, search, sort, filters) run the fetch protocol inline: update
//! state, call the request port with the full resolved query, reconcile the
//! result, persist the query on success, and re-raise the failure on error.
//!
//! # Fetch serialization
//!
//! Handlers are `async fn(&mut self)` and the fetch is awaited inline, so
//! two fetches for one controller can never overlap — the exclusive borrow
//! enforces the ordering that the original design left to chance. The
//! load-more append still works from an explicit snapshot of the items
//! taken before the request was issued.
//!
//! # Lifecycle
//!
//! Mount through [`ListRuntime::mount`](crate::ListRuntime::mount) (or
//! [`ListController::mount`] directly), feed configuration changes through
//! [`on_config_change`](ListController::on_config_change), and call
//! [`on_unmount`](ListController::on_unmount) when done; a `Drop` guard
//! deregisters from the registry if `on_unmount` was skipped.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::Instrument;

use crate::controller::config::{ListConfig, PaginationMode, SortOrder};
use crate::controller::state::ListState;
use crate::controller::view::ListView;
use crate::domain::record::{self, Record};
use crate::domain::{ListError, Result};
use crate::ports::persistence::PersistencePort;
use crate::ports::request::{ListContext, RequestPort};
use crate::registry::{ListRegistry, RefreshOptions};

/// Owns and orchestrates the state of one mounted list.
///
/// Constructed by [`ListRuntime::mount`](crate::ListRuntime::mount).
/// Observers read [`view`](Self::view); interactions call the handlers;
/// everything else is internal.
pub struct ListController {
    config: ListConfig,
    state: ListState,
    request: Arc<dyn RequestPort>,
    persistence: Option<Arc<dyn PersistencePort>>,
    registry: ListRegistry,
    refresh_rx: Option<UnboundedReceiver<RefreshOptions>>,
    view_cache: Option<ListView>,
    unmounted: bool,
}

impl ListController {
    /// Mounts a controller: validates configuration, restores any saved
    /// snapshot, seeds attribute settings, registers with the registry and
    /// runs the initial fetch.
    ///
    /// A request failure during the initial fetch is recorded in state and
    /// logged rather than failing the mount; the first observer render
    /// shows the error the same way any later failed fetch would.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Config`] when the configuration is invalid.
    pub async fn mount(
        request: Arc<dyn RequestPort>,
        persistence: Option<Arc<dyn PersistencePort>>,
        registry: ListRegistry,
        config: ListConfig,
    ) -> Result<Self> {
        config.validate()?;
        tracing::debug!(endpoint = %config.endpoint, list_id = ?config.list_id, "mounting list");

        let state = ListState::from_config(&config);
        let mut controller = Self {
            config,
            state,
            request,
            persistence,
            registry,
            refresh_rx: None,
            view_cache: None,
            unmounted: false,
        };

        controller.restore_saved_state();
        controller.seed_attr_settings();
        controller.register();

        let initial_page = controller.state.page.unwrap_or(1);
        if let Err(err) = controller.set_page(initial_page).await {
            tracing::warn!(
                endpoint = %controller.config.endpoint,
                error = %err,
                "initial fetch failed"
            );
        }

        Ok(controller)
    }

    /// The list's current state. Read-only: all mutation goes through the
    /// handlers.
    #[must_use]
    pub fn state(&self) -> &ListState {
        &self.state
    }

    /// The list's configuration as of the last mount or config change.
    #[must_use]
    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    /// The published view, recomputed only when state changed since the
    /// last call. Observers can compare `view().version` to skip work.
    pub fn view(&mut self) -> &ListView {
        let stale = self
            .view_cache
            .as_ref()
            .map_or(true, |view| view.version != self.state.version);
        if stale {
            self.view_cache = None;
        }
        let config = &self.config;
        let state = &self.state;
        self.view_cache
            .get_or_insert_with(|| ListView::compute(config, state))
    }

    // ---- fetch-triggering handlers -------------------------------------

    /// Sets the current page and fetches it.
    ///
    /// `0` marks a cleared numeric page input: the page becomes the
    /// empty-marker and no fetch runs until a real page is set.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Request`] when the fetch fails; the failure is
    /// also recorded in state.
    pub async fn set_page(&mut self, page: u32) -> Result<()> {
        if page == 0 {
            if self.state.page.is_some() {
                tracing::trace!("page input cleared, fetch suppressed");
                self.state.page = None;
                self.state.touch();
            }
            return Ok(());
        }

        self.state.page = Some(page);
        self.fetch(Map::new(), false).await
    }

    /// Sets the page size and fetches page 1.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Config`] for a zero size, or
    /// [`ListError::Request`] when the fetch fails.
    pub async fn set_per_page(&mut self, per_page: u32) -> Result<()> {
        if per_page == 0 {
            return Err(ListError::Config("per_page must be greater than zero".into()));
        }
        self.state.per_page = per_page;
        self.state.page = Some(1);
        self.fetch(Map::new(), false).await
    }

    /// Sets the search text and fetches page 1. A value equal to the
    /// current search is a no-op — repeated debounce settles don't refetch.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Request`] when the fetch fails.
    pub async fn set_search(&mut self, search: impl Into<String>) -> Result<()> {
        let search = search.into();
        if search == self.state.search {
            return Ok(());
        }
        self.state.search = search;
        self.state.page = Some(1);
        self.fetch(Map::new(), false).await
    }

    /// Sets the sort column and direction and fetches page 1.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Request`] when the fetch fails.
    pub async fn set_sort(&mut self, by: impl Into<String>, order: SortOrder) -> Result<()> {
        self.state.sort_by = by.into();
        self.state.sort_order = order;
        self.state.page = Some(1);
        self.fetch(Map::new(), false).await
    }

    /// Replaces the filters wholesale and fetches page 1.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Request`] when the fetch fails.
    pub async fn set_filters(&mut self, filters: BTreeMap<String, Value>) -> Result<()> {
        self.state.filters = filters;
        self.state.page = Some(1);
        self.fetch(Map::new(), false).await
    }

    /// Advances to the next page. Meaningful in load-more mode, where the
    /// fetched page appends to the accumulated items.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Request`] when the fetch fails.
    pub async fn load_more(&mut self) -> Result<()> {
        let next = self.state.page.unwrap_or(0) + 1;
        self.state.page = Some(next);
        self.fetch(Map::new(), false).await
    }

    /// Re-fetches. In load-more mode the accumulation restarts: page resets
    /// to 1 and the items are cleared before the fetch. In page-replace
    /// mode the current page is fetched in place.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Request`] when the fetch fails.
    pub async fn refresh(&mut self, options: RefreshOptions) -> Result<()> {
        if self.config.mode == PaginationMode::LoadMore {
            self.state.page = Some(1);
            self.state.items.clear();
            self.state.touch();
        }
        self.fetch(options.extra, true).await
    }

    // ---- non-fetching handlers -----------------------------------------

    /// Updates one key of one attribute's settings. `"visible"` toggles
    /// visibility; any other key is kept verbatim for the host.
    pub fn update_attr(&mut self, name: &str, key: &str, value: Value) {
        let setting = self
            .state
            .attr_settings
            .entry(name.to_owned())
            .or_default();
        if key == "visible" {
            setting.visible = value.as_bool().unwrap_or(false);
        } else {
            setting.extra.insert(key.to_owned(), value);
        }
        self.state.touch();
    }

    /// Replaces the selection. Duplicate identifiers are dropped, keeping
    /// first occurrence order.
    pub fn set_selection<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = Value>,
    {
        let mut selection: Vec<Value> = Vec::new();
        for id in ids {
            if !selection.contains(&id) {
                selection.push(id);
            }
        }
        self.state.selection = selection;
        self.state.touch();
    }

    /// Shallow-merges `patch` into the materialized item whose `id` field
    /// equals `id`, without refetching. Unknown ids are a no-op that leaves
    /// the view version untouched.
    pub fn update_item_by_id(&mut self, patch: &Record, id: &Value) {
        let mut patched = false;
        for item in &mut self.state.items {
            if record::record_id(item) == Some(id) {
                record::merge_patch(item, patch);
                patched = true;
            }
        }
        if patched {
            self.state.touch();
        }
    }

    // ---- lifecycle -----------------------------------------------------

    /// Applies a replacement configuration, refetching when the diff
    /// touches a query-affecting field.
    ///
    /// Query changes re-seed page/per-page/sort/search/filters from the new
    /// configuration and fetch page 1. Attribute-only changes just seed
    /// settings for newly configured attributes; a changed `list_id`
    /// re-registers with the registry.
    ///
    /// Returns whether a refetch ran.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Request`] when the triggered fetch fails.
    pub async fn on_config_change(&mut self, new_config: ListConfig) -> Result<bool> {
        new_config.validate()?;
        let diff = self.config.diff(&new_config);
        if diff.is_noop() {
            return Ok(false);
        }

        tracing::debug!(endpoint = %new_config.endpoint, ?diff, "configuration changed");

        if diff.list_id {
            self.deregister();
            self.config.list_id.clone_from(&new_config.list_id);
            self.register();
        }

        let refetch = diff.requires_refetch();
        self.config = new_config;

        if diff.attrs {
            self.seed_attr_settings();
        }

        if refetch {
            self.state.adopt_config(&self.config);
            self.fetch(Map::new(), false).await?;
        }

        Ok(refetch)
    }

    /// Unmounts the controller: deregisters from the registry and drops the
    /// refresh queue. Idempotent.
    pub fn on_unmount(&mut self) {
        if self.unmounted {
            return;
        }
        self.unmounted = true;
        self.deregister();
        self.refresh_rx = None;
        tracing::debug!(endpoint = %self.config.endpoint, "list unmounted");
    }

    /// Drains refresh requests queued through the registry and runs one
    /// refresh per request. Requests are taken off the queue one at a time,
    /// so a failure leaves the undelivered ones in place for a later drain.
    ///
    /// Returns the number of refreshes performed.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Request`] from the first failing refresh;
    /// remaining queued requests stay queued.
    pub async fn apply_external_refresh(&mut self) -> Result<usize> {
        let mut applied = 0;
        loop {
            let Some(rx) = self.refresh_rx.as_mut() else {
                break;
            };
            let Ok(options) = rx.try_recv() else {
                break;
            };
            self.refresh(options).await?;
            applied += 1;
        }
        Ok(applied)
    }

    // ---- internals -----------------------------------------------------

    /// Builds the port context from configuration plus current state.
    fn context(&self, extra: Map<String, Value>, is_refresh: bool) -> ListContext {
        ListContext {
            endpoint: self.config.endpoint.clone(),
            version: self.config.version,
            list_id: self.config.list_id.clone(),
            meta: self.config.meta.clone(),
            page: self.state.page.unwrap_or(self.config.page),
            per_page: self.state.per_page,
            search: self.state.search.clone(),
            sort_by: self.state.sort_by.clone(),
            sort_order: self.state.sort_order,
            filters: self.state.filters.clone(),
            attr_settings: self.state.attr_settings.clone(),
            is_refresh,
            extra,
        }
    }

    /// The fetch protocol: clear error, flag loading, call the port with
    /// the resolved query, reconcile or fail, persist on success.
    async fn fetch(&mut self, extra: Map<String, Value>, is_refresh: bool) -> Result<()> {
        self.state.begin_fetch();
        let ctx = self.context(extra, is_refresh);
        let snapshot = self.state.items.clone();

        // The span instruments the port future rather than being entered
        // here: an entered guard must not be held across an await point.
        let span = tracing::debug_span!(
            "fetch_page",
            endpoint = %ctx.endpoint,
            page = ctx.page,
            per_page = ctx.per_page,
            search = %ctx.search,
            is_refresh
        );

        match self.request.fetch_page(&ctx).instrument(span).await {
            Ok(result) => {
                self.persist(&ctx);
                self.state.reconcile(result, self.config.mode, snapshot);
                Ok(())
            }
            Err(failure) => {
                self.state.fail(failure.clone());
                Err(ListError::Request(failure))
            }
        }
    }

    /// Saves the resolved query through the persistence port, best-effort.
    fn persist(&self, ctx: &ListContext) {
        if let Some(persistence) = &self.persistence {
            let _span =
                tracing::debug_span!("persist_state", endpoint = %ctx.endpoint).entered();
            if let Err(err) = persistence.set(ctx) {
                tracing::warn!(endpoint = %ctx.endpoint, error = %err, "failed to persist list state");
            }
        }
    }

    /// Restores saved query state at mount. Read failures are cache misses.
    fn restore_saved_state(&mut self) {
        let Some(persistence) = self.persistence.clone() else {
            return;
        };

        let ctx = self.context(Map::new(), false);
        let _span = tracing::debug_span!("restore_state", endpoint = %ctx.endpoint).entered();
        if let Err(err) = persistence.init(&ctx) {
            tracing::warn!(endpoint = %ctx.endpoint, error = %err, "persistence init failed");
        }

        match persistence.get(&ctx) {
            Ok(Some(saved)) => {
                tracing::debug!(endpoint = %ctx.endpoint, "restoring saved list state");
                self.state.apply_saved(saved, self.config.mode);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    endpoint = %ctx.endpoint,
                    error = %err,
                    "failed to read saved state, using configuration defaults"
                );
            }
        }
    }

    /// Defaults every configured attribute to visible, without overriding
    /// settings restored from a snapshot.
    fn seed_attr_settings(&mut self) {
        let names: Vec<&str> = self.config.attrs.iter().map(|a| a.name.as_str()).collect();
        self.state.ensure_attr_settings(&names);
    }

    fn register(&mut self) {
        if let Some(list_id) = &self.config.list_id {
            self.refresh_rx = Some(self.registry.register(list_id.clone()));
        }
    }

    fn deregister(&mut self) {
        if let Some(list_id) = &self.config.list_id {
            self.registry.deregister(list_id);
        }
        self.refresh_rx = None;
    }
}

impl Drop for ListController {
    fn drop(&mut self) {
        if !self.unmounted {
            self.deregister();
        }
    }
}

impl std::fmt::Debug for ListController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListController")
            .field("endpoint", &self.config.endpoint)
            .field("list_id", &self.config.list_id)
            .field("page", &self.state.page)
            .field("items", &self.state.items.len())
            .field("count", &self.state.count)
            .finish_non_exhaustive()
    }
}
