// In: src/config.rs

//! The single source of truth for run-level configuration.
//!
//! This module defines the `ConfigObject` struct, which is created once at the
//! application boundary (e.g., from a user's JSON settings file) and registered in
//! the run's `ServiceRegistry`. Links read it during `initialize`/`execute`; the only
//! writes during execution are engine bookkeeping keys such as the chain repeat flags.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChainrunError;

/// Prefix of the configuration key an iterating link writes to ask its chain for
/// another pass. The full key is `chainRepeatRequestBy_<link name>`.
pub const REPEAT_REQUEST_PREFIX: &str = "chainRepeatRequestBy_";

//==================================================================================
// I. Core Configuration Enums
//==================================================================================

/// Verbosity of the run's logger. Mirrors `log::LevelFilter` so it can be
/// read from a settings file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

//==================================================================================
// II. The Unified ConfigObject
//==================================================================================

/// Run settings plus a free-form key/value map shared by all links.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ConfigObject {
    /// Name of the analysis. A run refuses to start without one.
    #[serde(default)]
    pub analysis_name: String,

    #[serde(default)]
    pub version: u32,

    /// Explicit log level. When unset, `RUST_LOG` decides (default `info`).
    #[serde(default)]
    pub log_level: Option<LogLevel>,

    /// When set, log output is appended to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// If true, the process manager logs the wall time of every chain.
    #[serde(default)]
    pub do_code_profiling: bool,

    /// Everything else, including the repeat-request flags.
    #[serde(flatten, default)]
    pub settings: BTreeMap<String, Value>,
}

impl Default for ConfigObject {
    fn default() -> Self {
        Self {
            analysis_name: String::new(),
            version: 0,
            log_level: None,
            log_file: None,
            do_code_profiling: false,
            settings: BTreeMap::new(),
        }
    }
}

impl ConfigObject {
    pub fn new(analysis_name: impl Into<String>) -> Self {
        Self {
            analysis_name: analysis_name.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ChainrunError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ChainrunError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Returns the previous value, like `HashMap::insert`. Last writer wins.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.settings.insert(key.into(), value.into())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.settings.get(key).and_then(Value::as_bool)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.settings.remove(key)
    }

    //==============================================================================
    // Repeat-request bookkeeping
    //==============================================================================

    pub fn repeat_request_key(link_name: &str) -> String {
        format!("{}{}", REPEAT_REQUEST_PREFIX, link_name)
    }

    /// Written by iterating links only, once per `execute`.
    pub fn set_repeat_request(&mut self, link_name: &str, repeat: bool) {
        self.settings
            .insert(Self::repeat_request_key(link_name), Value::Bool(repeat));
    }

    /// A missing flag reads as "no repeat".
    pub fn repeat_requested(&self, link_name: &str) -> bool {
        self.get_bool(&Self::repeat_request_key(link_name))
            .unwrap_or(false)
    }

    /// Drops every repeat flag. Returns how many were set.
    pub fn clear_repeat_requests(&mut self) -> usize {
        let before = self.settings.len();
        self.settings
            .retain(|key, _| !key.starts_with(REPEAT_REQUEST_PREFIX));
        before - self.settings.len()
    }
}
