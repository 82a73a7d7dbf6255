//! A link that halts the run wherever it is placed.

use serde::{Deserialize, Serialize};

use super::Link;
use crate::error::ChainrunError;
use crate::services::ServiceRegistry;
use crate::types::StatusCode;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BreakConfig {
    #[serde(default = "default_break_name")]
    pub name: String,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            name: default_break_name(),
        }
    }
}

fn default_break_name() -> String {
    "Break".to_string()
}

/// Sends a failure signal from `execute`, which aborts its chain and every chain after it.
#[derive(Debug)]
pub struct Break {
    config: BreakConfig,
}

impl Break {
    pub fn new(config: BreakConfig) -> Result<Self, ChainrunError> {
        if config.name.is_empty() {
            return Err(ChainrunError::invalid_config("Break", "link name is empty"));
        }
        Ok(Self { config })
    }
}

impl Link for Break {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn execute(&mut self, _ctx: &mut ServiceRegistry) -> Result<StatusCode, ChainrunError> {
        log::info!("[{}] Now sending break signal to halt execution!", self.config.name);
        Ok(StatusCode::Failure)
    }
}
