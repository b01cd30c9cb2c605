//! Listflow: a headless controller for paginated, queryable lists.
//!
//! Listflow turns a declarative [`ListConfig`] into live list state plus a
//! complete interaction surface, without rendering anything:
//! - Page-replace and load-more pagination over an injected data source
//! - Search, sorting, filters and per-attribute visibility settings
//! - Row selection and in-place item patching between fetches
//! - Saved query state restored across mounts via a pluggable store
//! - Cross-list refresh signalling through an explicit registry
//!
//! # Architecture
//!
//! The crate follows a layered architecture pattern:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Host application                                   │  ← Renders views,
//! └─────────────────────────────────────────────────────┘    calls handlers
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Runtime (lib.rs)                                   │  ← Shared ports +
//! │  - ListRuntime: mounts controllers                  │    registry handle
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Controller Layer (controller/)                     │  ← State machine
//! │  - ListConfig diffing                               │  ← Fetch protocol
//! │  - ListController handlers                          │
//! │  - ListView computation                             │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Ports         │   │ Registry      │   │ Debounce      │
//! │ (ports/)      │   │ (registry.rs) │   │ (debounce.rs) │
//! │ - RequestPort │   │ - Refresh     │   │ - Search      │
//! │ - Persistence │   │   channels    │   │   settling    │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain Layer (domain/)                             │
//! │  - Record model and id/patch helpers                │
//! │  - Structural value equality                        │
//! │  - Error taxonomy                                   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controller`]: Configuration, state, handlers and derived views
//! - [`domain`]: Record model, structural equality, error types
//! - [`ports`]: Request and persistence seams plus bundled stores
//! - [`registry`]: Named-list refresh signalling
//! - [`debounce`]: Search input settling
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use listflow::{
//!     ListConfig, ListContext, ListRuntime, PageResult, RequestFailure, RequestPort,
//! };
//!
//! struct UsersEndpoint;
//!
//! #[async_trait::async_trait]
//! impl RequestPort for UsersEndpoint {
//!     async fn fetch_page(&self, ctx: &ListContext) -> Result<PageResult, RequestFailure> {
//!         // Perform transport using ctx.page, ctx.per_page, ctx.search, ...
//!         Ok(PageResult::new(Vec::new(), 0))
//!     }
//! }
//!
//! # async fn run() -> Result<(), listflow::ListError> {
//! let runtime = ListRuntime::new(Arc::new(UsersEndpoint));
//! let mut users = runtime.mount(ListConfig::new("users")).await?;
//!
//! users.set_search("ada").await?;
//! for item in &users.view().items {
//!     println!("{item:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod debounce;
pub mod domain;
pub mod ports;
pub mod registry;

use std::sync::Arc;

pub use controller::{
    AttrDescriptor, AttrSetting, AttrSpec, ConfigDiff, ListConfig, ListController, ListState,
    ListView, PaginationMode, SortOrder, DEFAULT_PER_PAGE,
};
pub use debounce::{SearchDebouncer, DEFAULT_DEBOUNCE};
pub use domain::{deep_equal, ListError, PersistenceError, Record, RequestFailure, Result};
pub use ports::{
    JsonPersistence, ListContext, MemoryPersistence, PageResult, PersistencePort, RequestPort,
    SavedState,
};
pub use registry::{ListRegistry, RefreshOptions};

/// Shared environment for mounting list controllers.
///
/// A runtime bundles the request port, an optional persistence port and a
/// [`ListRegistry`], and hands the same three to every controller it
/// mounts. Hosts typically build one runtime at startup and mount a
/// controller per visible list.
///
/// Cloning is cheap; clones share the ports and the registry.
#[derive(Clone)]
pub struct ListRuntime {
    request: Arc<dyn RequestPort>,
    persistence: Option<Arc<dyn PersistencePort>>,
    registry: ListRegistry,
}

impl ListRuntime {
    /// Creates a runtime around a request port, with no persistence.
    #[must_use]
    pub fn new(request: Arc<dyn RequestPort>) -> Self {
        Self {
            request,
            persistence: None,
            registry: ListRegistry::new(),
        }
    }

    /// Adds a persistence port. Controllers mounted afterwards restore and
    /// save their query state through it.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn PersistencePort>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// The registry shared by all controllers of this runtime. Hand clones
    /// to anything that needs to trigger refreshes by list id.
    #[must_use]
    pub fn registry(&self) -> ListRegistry {
        self.registry.clone()
    }

    /// Mounts a controller for `config`, running restoration and the
    /// initial fetch.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Config`] when the configuration is invalid. A
    /// failing initial fetch does not fail the mount; the failure is
    /// recorded in the controller's state.
    pub async fn mount(&self, config: ListConfig) -> Result<ListController> {
        ListController::mount(
            Arc::clone(&self.request),
            self.persistence.clone(),
            self.registry.clone(),
            config,
        )
        .await
    }
}

impl std::fmt::Debug for ListRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListRuntime")
            .field("has_persistence", &self.persistence.is_some())
            .field("registered_lists", &self.registry.registered_lists())
            .finish_non_exhaustive()
    }
}
