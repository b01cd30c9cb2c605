//! The published view: a memoized, derived snapshot of list state.
//!
//! Presentation observers never read [`ListState`](crate::controller::ListState)
//! directly; they read a [`ListView`], which pairs the raw state fields with
//! everything derivable from them (display range, pager geometry, active
//! filter detection, serialized attribute descriptors). The controller
//! recomputes the view only when the state's change counter moved, and the
//! `version` field lets observers in any rendering model do a cheap "did
//! anything change" comparison instead of diffing fields.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::controller::config::{ListConfig, SortOrder};
use crate::controller::state::{AttrSetting, ListState};
use crate::domain::record::{self, Record};
use crate::domain::{filters_equal, RequestFailure};
use crate::ports::request::PageResult;

/// A serialized attribute descriptor for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrDescriptor {
    /// Attribute key as it appears on records.
    pub name: String,

    /// Display label; defaults to the name when not configured.
    pub label: String,

    /// Current visibility from the attribute settings.
    pub visible: bool,
}

/// Derived, internally consistent snapshot of one list.
///
/// All fields describe the same instant: `count` always belongs to the same
/// fetch as `items`, `has_more` to both.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    /// Materialized rows.
    pub items: Vec<Record>,

    /// Total matching records.
    pub count: u64,

    /// Last raw fetch result, for passthrough fields.
    pub response: Option<PageResult>,

    /// Failure of the last fetch, if it failed.
    pub error: Option<RequestFailure>,

    /// Selected record identifiers.
    pub selection: Vec<Value>,

    /// Current page; `None` while a numeric page input is cleared.
    pub page: Option<u32>,

    /// Current page size.
    pub per_page: u32,

    /// Current sort column.
    pub sort_by: String,

    /// Current sort direction.
    pub sort_order: SortOrder,

    /// Current search text.
    pub search: String,

    /// Current filters.
    pub filters: BTreeMap<String, Value>,

    /// Attribute descriptors in presentation order.
    pub attrs: Vec<AttrDescriptor>,

    /// Raw per-attribute settings.
    pub attr_settings: BTreeMap<String, AttrSetting>,

    /// True while a fetch is in flight after initialization.
    pub is_loading: bool,

    /// True until the first fetch resolved.
    pub is_initializing: bool,

    /// True when no rows are materialized.
    pub is_empty: bool,

    /// True when more matching records exist beyond the materialized rows.
    pub has_more: bool,

    /// 1-based index of the first displayed record.
    pub from: u64,

    /// 1-based index of the last displayed record.
    pub to: u64,

    /// Total number of pages for the current count and page size.
    pub pages_count: u64,

    /// True when a next page exists.
    pub has_next: bool,

    /// True when a previous page exists.
    pub has_prev: bool,

    /// True when current filters structurally differ from the
    /// configuration baseline.
    pub has_active_filters: bool,

    /// State change counter this view was derived from.
    pub version: u64,
}

impl ListView {
    /// Derives a view from the current state and configuration.
    #[must_use]
    pub fn compute(config: &ListConfig, state: &ListState) -> Self {
        let page = state.page.unwrap_or(1);
        let per_page = u64::from(state.per_page);
        let count = state.count;

        // Display range per the summary contract; meaningless (and hidden
        // by is_empty) when nothing matched.
        let from = u64::from(page - 1) * per_page + 1;
        let to = (u64::from(page) * per_page).min(count);

        Self {
            items: state.items.clone(),
            count,
            response: state.response.clone(),
            error: state.error.clone(),
            selection: state.selection.clone(),
            page: state.page,
            per_page: state.per_page,
            sort_by: state.sort_by.clone(),
            sort_order: state.sort_order,
            search: state.search.clone(),
            filters: state.filters.clone(),
            attrs: serialize_attrs(config, state),
            attr_settings: state.attr_settings.clone(),
            is_loading: state.is_loading,
            is_initializing: state.is_initializing,
            is_empty: state.items.is_empty(),
            has_more: (state.items.len() as u64) < count,
            from,
            to,
            pages_count: count.div_ceil(per_page),
            has_next: u64::from(page) * per_page < count,
            has_prev: page > 1,
            has_active_filters: !filters_equal(&state.filters, &config.filters),
            version: state.version,
        }
    }

    /// Page numbers a pager with `links` slots would display, centered on
    /// the current page and clamped to the first and last page.
    #[must_use]
    pub fn page_window(&self, links: u64) -> Vec<u64> {
        let pages_count = self.pages_count;
        if pages_count == 0 || links == 0 {
            return Vec::new();
        }

        // The current page can exceed the page count when the total shrank
        // after the page was set; clamp before the window math.
        let page = u64::from(self.page.unwrap_or(1)).min(pages_count);
        let shown = links.min(pages_count);
        let half = links / 2;

        let start = if page <= half {
            1
        } else if pages_count - page < half {
            pages_count - shown + 1
        } else {
            page - half
        };

        (start..start + shown).collect()
    }
}

/// Serializes the attribute list for presentation: configured attributes
/// when present, otherwise the keys of the first fetched record.
fn serialize_attrs(config: &ListConfig, state: &ListState) -> Vec<AttrDescriptor> {
    let visible = |name: &str| {
        state
            .attr_settings
            .get(name)
            .map_or(true, |setting| setting.visible)
    };

    if config.attrs.is_empty() {
        record::attr_names(&state.items)
            .into_iter()
            .map(|name| AttrDescriptor {
                label: name.clone(),
                visible: visible(&name),
                name,
            })
            .collect()
    } else {
        config
            .attrs
            .iter()
            .map(|attr| AttrDescriptor {
                name: attr.name.clone(),
                label: attr.label.clone().unwrap_or_else(|| attr.name.clone()),
                visible: visible(&attr.name),
            })
            .collect()
    }
}
