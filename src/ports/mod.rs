//! Injected collaborator seams of the controller.
//!
//! The controller owns no transport and no storage medium; both are
//! injected behind small, use-case shaped traits.
//!
//! # Modules
//!
//! - [`request`]: the async data-fetching seam ([`RequestPort`])
//! - [`persistence`]: optional saved-state recall ([`PersistencePort`],
//!   [`MemoryPersistence`])
//! - [`json`]: file-backed persistence implementation

pub mod json;
pub mod persistence;
pub mod request;

pub use json::JsonPersistence;
pub use persistence::{MemoryPersistence, PersistencePort, SavedState};
pub use request::{ListContext, PageResult, RequestPort};
