//! This file is the root of the `chainrun` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`process`, `link`, etc.)
//!     so the Rust compiler knows they exist.
//! 2.  Re-exporting the handful of types most callers need to describe and run
//!     a set of chains.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod config;
pub mod error;
pub mod execution;
pub mod link;
pub mod logging;
pub mod process;
pub mod services;
pub mod setup;
pub mod types;

#[cfg(test)]
mod test_utils;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use config::ConfigObject;
pub use error::ChainrunError;
pub use execution::{reset_run, run_chains};
pub use link::Link;
pub use process::{Chain, ProcessManager};
pub use services::{DataStore, ServiceRegistry};
pub use setup::RunSetup;
pub use types::{StatusCode, StoreValue};
