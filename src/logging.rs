// In: src/logging.rs

//! Process-wide logger setup.
//!
//! Everything in the crate logs through the `log` facade. This module installs the
//! `env_logger` backend exactly once per process, at the level requested by the
//! run's `ConfigObject`, optionally appending to a file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::ChainrunError;

static INIT_LOGGER: Once = Once::new();

/// Installs the global logger. Later calls are no-ops, so tests and repeated runs
/// in one process can call it freely.
///
/// An explicit `level` wins. Without one, `RUST_LOG` decides, falling back to `info`.
/// A `log_file` given after the logger is installed is reported and ignored.
pub fn init_logging(
    level: Option<LevelFilter>,
    log_file: Option<&Path>,
) -> Result<(), ChainrunError> {
    if INIT_LOGGER.is_completed() {
        if let Some(path) = log_file {
            log::warn!(
                "Logger already initialized; not redirecting output to {}",
                path.display()
            );
        }
        return Ok(());
    }

    // Open the file up front so a bad path is reported instead of swallowed by `Once`.
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        match level {
            Some(level) => {
                builder.filter_level(level);
            }
            None => {
                builder.filter_level(LevelFilter::Info);
                builder.parse_env("RUST_LOG");
            }
        }

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });

    Ok(())
}
