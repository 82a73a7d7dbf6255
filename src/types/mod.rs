//! This module defines the core, strongly-typed values that flow through a run.
//!
//! It currently includes the `StatusCode` outcome enum shared by links, chains and
//! the process manager, and the `StoreValue` enum held by the shared data store.

pub mod status_code;
pub mod store_value;

// Re-export the main type(s) for easier access.
pub use status_code::StatusCode;
pub use store_value::StoreValue;
