//! Domain layer for the list controller.
//!
//! Core types independent of any transport or persistence concern: the
//! [`Record`] row type, structural equality over JSON values, and the error
//! taxonomy shared by the controller and the ports.
//!
//! # Organization
//!
//! - [`error`]: Error types and result alias
//! - [`record`]: Row type and in-place patch helpers
//! - [`diff`]: Deep structural equality for filters and config diffing

pub mod diff;
pub mod error;
pub mod record;

pub use diff::{deep_equal, filters_equal};
pub use error::{ListError, PersistenceError, RequestFailure, Result};
pub use record::Record;
