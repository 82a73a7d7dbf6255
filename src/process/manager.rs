// In: src/process/manager.rs

use std::any::TypeId;
use std::time::Instant;

use super::Chain;
use crate::config::ConfigObject;
use crate::error::ChainrunError;
use crate::services::ServiceRegistry;
use crate::types::StatusCode;

/// Owns the chains of a run and the services they share.
#[derive(Debug, Default)]
pub struct ProcessManager {
    services: ServiceRegistry,
    chains: Vec<Chain>,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    //==============================================================================
    // Chain Management
    //==============================================================================

    /// Appends a new empty chain. Chain names are unique within a run.
    pub fn add_chain(&mut self, name: impl Into<String>) -> Result<&mut Chain, ChainrunError> {
        let name = name.into();
        if self.chains.iter().any(|chain| chain.name() == name) {
            return Err(ChainrunError::DuplicateChain(name));
        }
        log::debug!("Adding chain \"{}\"", name);
        self.chains.push(Chain::new(name));
        let last = self.chains.len() - 1;
        Ok(&mut self.chains[last])
    }

    pub fn get_chain(&self, name: &str) -> Result<&Chain, ChainrunError> {
        self.chains
            .iter()
            .find(|chain| chain.name() == name)
            .ok_or_else(|| ChainrunError::UnknownChain(name.to_string()))
    }

    pub fn get_chain_mut(&mut self, name: &str) -> Result<&mut Chain, ChainrunError> {
        self.chains
            .iter_mut()
            .find(|chain| chain.name() == name)
            .ok_or_else(|| ChainrunError::UnknownChain(name.to_string()))
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut ServiceRegistry {
        &mut self.services
    }

    //==============================================================================
    // Run Phases
    //==============================================================================

    /// Initializes every link, chain by chain. Configuration errors propagate.
    pub fn initialize_all(&mut self) -> Result<StatusCode, ChainrunError> {
        log::info!("Initializing {} chain(s)", self.chains.len());
        for chain in self.chains.iter_mut() {
            if chain.initialize_links(&mut self.services)?.is_failure() {
                log::error!("Failed to initialize chain \"{}\"", chain.name());
                return Ok(StatusCode::Failure);
            }
        }
        Ok(StatusCode::Success)
    }

    /// Runs every chain in order. A failed chain stops the run; later chains never run.
    pub fn execute_all(&mut self) -> StatusCode {
        let profile = self
            .services
            .config()
            .map_or(false, |config| config.do_code_profiling);

        for chain in self.chains.iter_mut() {
            log::info!("Executing chain \"{}\"", chain.name());
            let start = Instant::now();
            let status = chain.run(&mut self.services);
            if profile {
                log::debug!(
                    "Chain \"{}\" took {:.3}s",
                    chain.name(),
                    start.elapsed().as_secs_f64()
                );
            }
            if status.is_failure() {
                log::error!("Chain \"{}\" failed; stopping the run", chain.name());
                return StatusCode::Failure;
            }
        }
        StatusCode::Success
    }

    /// Finalizes every link of every chain. Failures are collected, never short-circuit.
    pub fn finalize_all(&mut self) -> StatusCode {
        log::info!("Finalizing {} chain(s)", self.chains.len());
        let mut failed = false;
        for chain in self.chains.iter_mut() {
            failed |= chain.finalize_links(&mut self.services).is_failure();
        }
        if failed {
            StatusCode::Failure
        } else {
            StatusCode::Success
        }
    }

    /// Drops every chain and clears the services, optionally keeping the configuration.
    ///
    /// A kept configuration loses its repeat flags; they belong to the chains just dropped.
    pub fn reset(&mut self, preserve_configuration: bool) {
        log::debug!("Resetting process manager");
        self.chains.clear();
        if !preserve_configuration {
            self.services.reset(&[]);
            return;
        }

        self.services.reset(&[TypeId::of::<ConfigObject>()]);
        if self.services.contains::<ConfigObject>() {
            let cleared = self.services.config_mut().clear_repeat_requests();
            if cleared > 0 {
                log::debug!("Cleared {} stale repeat flag(s)", cleared);
            }
        }
    }
}
