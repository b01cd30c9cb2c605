//! Request port: the injected data-fetching seam.
//!
//! The controller never performs transport itself. Every fetch goes through
//! a host-implemented [`RequestPort`], which receives the full resolved
//! query as a [`ListContext`] and returns a normalized [`PageResult`].
//! Failure is an `Err`, never a sentinel value.
//!
//! The same [`ListContext`] is handed to the persistence port, so both
//! collaborators see one consistent description of the list's identity and
//! current query.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::controller::config::SortOrder;
use crate::controller::state::AttrSetting;
use crate::domain::error::RequestFailure;
use crate::domain::record::Record;

/// The full resolved query and list identity for one port call.
///
/// Built by the controller from configuration plus current state. `extra`
/// carries per-call context supplied by the triggering handler, such as the
/// options of an external refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListContext {
    /// Endpoint identity from the configuration.
    pub endpoint: String,

    /// Saved-state schema version from the configuration.
    pub version: u32,

    /// Registry identifier of the list, when one was configured.
    pub list_id: Option<String>,

    /// Opaque configuration metadata, passed through untouched.
    pub meta: Map<String, Value>,

    /// Page to fetch, 1-based.
    pub page: u32,

    /// Page size.
    pub per_page: u32,

    /// Current search text.
    pub search: String,

    /// Current sort column, empty for endpoint default ordering.
    pub sort_by: String,

    /// Current sort direction.
    pub sort_order: SortOrder,

    /// Current filters.
    pub filters: BTreeMap<String, Value>,

    /// Current per-attribute settings, included for the persistence port.
    pub attr_settings: BTreeMap<String, AttrSetting>,

    /// True when the call was triggered by a refresh rather than a query
    /// change.
    pub is_refresh: bool,

    /// Per-call context from the triggering handler.
    pub extra: Map<String, Value>,
}

/// Normalized result of one page fetch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageResult {
    /// Records of the fetched page, in endpoint order.
    pub items: Vec<Record>,

    /// Total number of matching records across all pages.
    pub count: u64,

    /// Opaque passthrough for response fields beyond items and count.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

impl PageResult {
    /// Creates a result from rows and a total count, with no extra payload.
    #[must_use]
    pub fn new(items: Vec<Record>, count: u64) -> Self {
        Self {
            items,
            count,
            meta: Value::Null,
        }
    }
}

/// The injected async data-fetching function the controller depends on.
///
/// Implementations perform the actual transport (HTTP, database, in-memory
/// fixture) and normalize the response. They must reject with a
/// [`RequestFailure`] on any failure; the controller records it in state and
/// re-raises it to the caller of the triggering handler.
#[async_trait]
pub trait RequestPort: Send + Sync {
    /// Fetches one page for the given query.
    ///
    /// # Errors
    ///
    /// Returns a [`RequestFailure`] when the underlying transport or
    /// endpoint rejects the query.
    async fn fetch_page(&self, ctx: &ListContext) -> Result<PageResult, RequestFailure>;
}
