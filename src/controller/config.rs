//! List configuration and configuration diffing.
//!
//! A [`ListConfig`] is the declarative description of one list: where its
//! data comes from, how it is paginated, and the initial query values. The
//! controller treats it as immutable per mount; explicit changes flow
//! through [`ListController::on_config_change`](crate::controller::ListController::on_config_change),
//! which consults a [`ConfigDiff`] to decide whether a refetch is needed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::{ListError, Result};
use crate::domain::filters_equal;

/// Default page size when the caller does not specify one.
pub const DEFAULT_PER_PAGE: u32 = 25;

/// How new pages are reconciled into the materialized item sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationMode {
    /// Each fetch replaces the items wholesale with the new page.
    #[default]
    PageReplace,

    /// Pages accumulate: page 1 replaces, later pages append in fetch order.
    LoadMore,
}

/// Sort direction sent to the request port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Wire representation of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured attribute: a column name plus an optional display label.
///
/// The caller may configure attributes as bare names; the label defaults to
/// the name at presentation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrSpec {
    /// Attribute key as it appears on fetched records.
    pub name: String,

    /// Optional human-readable label for presentation.
    pub label: Option<String>,
}

impl AttrSpec {
    /// Creates an attribute spec without a label.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }

    /// Creates an attribute spec with a display label.
    pub fn labeled(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: Some(label.into()),
        }
    }
}

impl From<&str> for AttrSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Declarative description of one list.
///
/// Construct with [`ListConfig::new`] and adjust fields directly or through
/// the `with_*` helpers. Validated at mount; see [`ListConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Endpoint identity handed to the request port. Must be non-empty.
    pub endpoint: String,

    /// Version of the endpoint's saved-state schema. Bumping it lets the
    /// persistence port evict snapshots saved under prior versions.
    pub version: u32,

    /// Initial page, 1-based.
    pub page: u32,

    /// Initial page size. Must be greater than zero.
    pub per_page: u32,

    /// Initial sort column, empty for endpoint default ordering.
    pub sort_by: String,

    /// Initial sort direction.
    pub sort_order: SortOrder,

    /// Initial search text.
    pub search: String,

    /// Baseline filters. `has_active_filters` on the published view reports
    /// whether the current filters structurally differ from these.
    pub filters: BTreeMap<String, Value>,

    /// Configured attribute list. When empty, attribute names are derived
    /// from the keys of the first fetched record.
    pub attrs: Vec<AttrSpec>,

    /// Pagination discipline for this list.
    pub mode: PaginationMode,

    /// Identifier for out-of-band refresh through the registry.
    pub list_id: Option<String>,

    /// Opaque metadata passed through to the request port on every fetch.
    pub meta: Map<String, Value>,
}

impl ListConfig {
    /// Creates a configuration for `endpoint` with the standard defaults:
    /// page 1, 25 per page, descending sort, no search, no filters,
    /// page-replace pagination.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            version: 1,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort_by: String::new(),
            sort_order: SortOrder::default(),
            search: String::new(),
            filters: BTreeMap::new(),
            attrs: Vec::new(),
            mode: PaginationMode::default(),
            list_id: None,
            meta: Map::new(),
        }
    }

    /// Sets the initial page size.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Sets the pagination mode.
    #[must_use]
    pub fn with_mode(mut self, mode: PaginationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the registry identifier for external refresh.
    #[must_use]
    pub fn with_list_id(mut self, list_id: impl Into<String>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }

    /// Sets the configured attribute list.
    #[must_use]
    pub fn with_attrs<I, A>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AttrSpec>,
    {
        self.attrs = attrs.into_iter().map(Into::into).collect();
        self
    }

    /// Checks the configuration for values the controller cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::Config`] for an empty endpoint, a zero
    /// `per_page` or a zero initial page.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ListError::Config("endpoint must not be empty".into()));
        }
        if self.per_page == 0 {
            return Err(ListError::Config("per_page must be greater than zero".into()));
        }
        if self.page == 0 {
            return Err(ListError::Config("initial page must be 1 or greater".into()));
        }
        Ok(())
    }

    /// Computes the field-level difference between this configuration and a
    /// replacement.
    #[must_use]
    pub fn diff(&self, new: &Self) -> ConfigDiff {
        ConfigDiff {
            endpoint: self.endpoint != new.endpoint,
            version: self.version != new.version,
            page: self.page != new.page,
            per_page: self.per_page != new.per_page,
            sort: self.sort_by != new.sort_by || self.sort_order != new.sort_order,
            search: self.search != new.search,
            filters: !filters_equal(&self.filters, &new.filters),
            attrs: self.attrs != new.attrs,
            mode: self.mode != new.mode,
            list_id: self.list_id != new.list_id,
            meta: self.meta != new.meta,
        }
    }
}

/// Field-level difference between two configurations.
///
/// Produced by [`ListConfig::diff`] and consumed by the controller's
/// `on_config_change` to decide whether the change affects the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigDiff {
    pub endpoint: bool,
    pub version: bool,
    pub page: bool,
    pub per_page: bool,
    pub sort: bool,
    pub search: bool,
    pub filters: bool,
    pub attrs: bool,
    pub mode: bool,
    pub list_id: bool,
    pub meta: bool,
}

impl ConfigDiff {
    /// True when no field changed at all.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }

    /// True when the change affects the fetch query and the controller
    /// should re-seed query state and refetch.
    #[must_use]
    pub fn requires_refetch(&self) -> bool {
        self.endpoint
            || self.version
            || self.page
            || self.per_page
            || self.sort
            || self.search
            || self.filters
            || self.mode
            || self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_contract() {
        let config = ListConfig::new("users");
        assert_eq!(config.page, 1);
        assert_eq!(config.per_page, DEFAULT_PER_PAGE);
        assert_eq!(config.sort_order, SortOrder::Desc);
        assert_eq!(config.mode, PaginationMode::PageReplace);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(ListConfig::new("  ").validate().is_err());

        let mut config = ListConfig::new("users");
        config.per_page = 0;
        assert!(config.validate().is_err());

        let mut config = ListConfig::new("users");
        config.page = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn diff_flags_query_fields() {
        let old = ListConfig::new("users");
        let mut new = old.clone();
        assert!(old.diff(&new).is_noop());

        new.filters.insert("status".into(), json!("open"));
        let diff = old.diff(&new);
        assert!(diff.filters);
        assert!(diff.requires_refetch());
    }

    #[test]
    fn attr_only_change_does_not_refetch() {
        let old = ListConfig::new("users");
        let new = old.clone().with_attrs(["id", "name"]);
        let diff = old.diff(&new);
        assert!(diff.attrs);
        assert!(!diff.requires_refetch());
        assert!(!diff.is_noop());
    }

    #[test]
    fn mode_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(PaginationMode::LoadMore).unwrap(),
            json!("load-more")
        );
        assert_eq!(serde_json::to_value(SortOrder::Desc).unwrap(), json!("desc"));
    }
}
