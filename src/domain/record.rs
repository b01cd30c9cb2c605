//! Record row type and in-place patch operations.
//!
//! A list materializes rows as loosely-typed JSON objects so the controller
//! can serve any endpoint shape without a host-defined schema. This module
//! defines the [`Record`] alias plus the helpers the controller uses to
//! identify rows and patch them in place without a refetch.

use serde_json::{Map, Value};

/// A single materialized row: an arbitrary JSON object.
///
/// Keys are the record's attribute names; the optional `"id"` key identifies
/// the row for selection and in-place updates.
pub type Record = Map<String, Value>;

/// Key used to identify a record for selection and in-place patching.
pub const ID_KEY: &str = "id";

/// Returns the record's identifier, if it has one.
#[must_use]
pub fn record_id(record: &Record) -> Option<&Value> {
    record.get(ID_KEY)
}

/// Shallow-merges `patch` into `record`.
///
/// Existing keys are overwritten, new keys are inserted; nested objects are
/// replaced wholesale, not merged.
pub fn merge_patch(record: &mut Record, patch: &Record) {
    for (key, value) in patch {
        record.insert(key.clone(), value.clone());
    }
}

/// Returns the attribute names of the first record, in key order.
///
/// Used to derive the known attribute set when the caller did not configure
/// an explicit attribute list.
#[must_use]
pub fn attr_names(records: &[Record]) -> Vec<String> {
    records
        .first()
        .map(|record| record.keys().cloned().collect())
        .unwrap_or_default()
}
