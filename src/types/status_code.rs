//! This module defines the canonical outcome of every lifecycle call in a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome returned by `initialize`, `execute` and `finalize` of links,
/// by a chain pass, and by the process manager phases.
///
/// Runtime outcomes travel as a `StatusCode`. Configuration mistakes never do:
/// they are returned as a `ChainrunError` so the two can't be confused.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    #[default]
    Success,
    /// Unrecoverable for this run. Aborts the owning chain and every chain after it.
    Failure,
    /// Ends the current chain pass early without failing the run.
    SkipChain,
    /// Something went wrong that the run can live with; logged and treated as success.
    Recoverable,
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }

    pub fn is_skip_chain(&self) -> bool {
        matches!(self, Self::SkipChain)
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Folds two outcomes into the more severe one. `Failure` dominates everything,
    /// then `Recoverable`; `SkipChain` only matters inside a chain pass and folds to `Success`.
    pub fn merge(self, other: StatusCode) -> StatusCode {
        match (self, other) {
            (Self::Failure, _) | (_, Self::Failure) => Self::Failure,
            (Self::Recoverable, _) | (_, Self::Recoverable) => Self::Recoverable,
            _ => Self::Success,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
