// In: src/error.rs

//! This module defines the single, unified error type for the entire chainrun library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Two families live side by side. Configuration errors are returned from
//! `initialize` (and from construction of links and chains) and stop a run before
//! any data is touched. Runtime errors come out of a link's `execute` and are turned
//! into `StatusCode::Failure` by the chain that ran it.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainrunError {
    // =========================================================================
    // === Configuration Errors (fatal, raised before execution)
    // =========================================================================
    #[error("Invalid configuration for '{link}': {reason}")]
    InvalidConfig { link: String, reason: String },

    #[error("No files found for path patterns {patterns:?}")]
    NoPathsFound { patterns: Vec<String> },

    #[error("Resolved path is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("No suitable reader found for file {0}")]
    NoReaderFound(PathBuf),

    #[error("Chain '{0}' already exists")]
    DuplicateChain(String),

    #[error("Chain '{0}' not found")]
    UnknownChain(String),

    #[error("Service '{0}' is not registered")]
    NotRegistered(&'static str),

    // =========================================================================
    // === Runtime / Data Errors
    // =========================================================================
    #[error("Column '{column}' not present in {path}")]
    ColumnNotFound { column: String, path: PathBuf },

    #[error("Workbook {0} has no worksheet to read")]
    NoSheetFound(PathBuf),

    #[error("Link '{link}' failed: {source}")]
    LinkExecution {
        link: String,
        #[source]
        source: Box<ChainrunError>,
    },

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An error from the Parquet reader.
    #[error("Parquet operation failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// An error from the spreadsheet reader.
    #[error("Spreadsheet read failed: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a setup or settings file.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl ChainrunError {
    /// Shorthand used by link constructors and `initialize` implementations.
    pub fn invalid_config(link: impl Into<String>, reason: impl Into<String>) -> Self {
        ChainrunError::InvalidConfig {
            link: link.into(),
            reason: reason.into(),
        }
    }

    /// True for the errors that describe a bad setup rather than bad data.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            ChainrunError::InvalidConfig { .. }
            | ChainrunError::NoPathsFound { .. }
            | ChainrunError::NotAFile(_)
            | ChainrunError::InvalidPattern { .. }
            | ChainrunError::NoReaderFound(_)
            | ChainrunError::DuplicateChain(_)
            | ChainrunError::UnknownChain(_)
            | ChainrunError::NotRegistered(_) => true,
            ChainrunError::LinkExecution { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<glob::GlobError> for ChainrunError {
    fn from(err: glob::GlobError) -> Self {
        ChainrunError::Io(err.into())
    }
}
