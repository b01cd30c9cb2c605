//! List configuration, state, handlers and derived views.
//!
//! The controller layer is the heart of the crate:
//!
//! - [`config`] — declarative [`ListConfig`](config::ListConfig) and the
//!   diff that decides what a configuration change means.
//! - [`state`] — mutable [`ListState`](state::ListState) and its fetch
//!   reconciliation rules.
//! - [`handler`] — [`ListController`](handler::ListController), the only
//!   mutator of state, owning the fetch protocol and all interaction
//!   handlers.
//! - [`view`] — immutable [`ListView`](view::ListView) snapshots derived
//!   from config plus state, memoized per state version.

pub mod config;
pub mod handler;
pub mod state;
pub mod view;

pub use config::{AttrSpec, ConfigDiff, ListConfig, PaginationMode, SortOrder, DEFAULT_PER_PAGE};
pub use handler::ListController;
pub use state::{AttrSetting, ListState};
pub use view::{AttrDescriptor, ListView};
