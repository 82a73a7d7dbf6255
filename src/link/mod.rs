//! This module defines the unit of work of a run: the `Link`.
//!
//! A link is constructed from a strongly-typed configuration struct, then driven
//! through three phases by the process manager:
//!
//! 1.  `initialize` once, to validate configuration and prepare state.
//! 2.  `execute` once per pass of its chain. Inside a repeating chain this happens
//!     many times, and the link must rely on its own internal state (never on
//!     re-derived configuration) to know where it left off.
//! 3.  `finalize` once, unconditionally, to release anything it holds.
//!
//! Links only communicate through the services in the `ServiceRegistry`.

use crate::error::ChainrunError;
use crate::services::ServiceRegistry;
use crate::types::StatusCode;

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod break_link;
pub mod read_to_dataset;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use self::break_link::{Break, BreakConfig};
pub use self::read_to_dataset::{ReadToDataset, ReadToDatasetConfig, ReaderKind};

/// **CONTRACT:** The trait every unit of work implements.
///
/// Errors and statuses mean different things. An `Err` from `initialize` is a
/// configuration error and stops the run before any data is touched. An `Err` from
/// `execute` or `finalize` is a runtime error; the chain logs it and treats it as
/// `StatusCode::Failure`. Planned control flow (`SkipChain`, `Recoverable`) is
/// always reported through `Ok(StatusCode)`.
pub trait Link {
    /// Unique within a chain by convention. Used in logs and in the repeat-flag key.
    fn name(&self) -> &str;

    /// Validates configuration and prepares internal state. Must be idempotent.
    fn initialize(&mut self, _ctx: &mut ServiceRegistry) -> Result<StatusCode, ChainrunError> {
        Ok(StatusCode::Success)
    }

    fn execute(&mut self, ctx: &mut ServiceRegistry) -> Result<StatusCode, ChainrunError>;

    /// Releases held resources. Must be safe even if `execute` never ran.
    fn finalize(&mut self, _ctx: &mut ServiceRegistry) -> Result<StatusCode, ChainrunError> {
        Ok(StatusCode::Success)
    }
}

impl std::fmt::Debug for dyn Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").field("name", &self.name()).finish()
    }
}
