// In: src/process/chain.rs

use crate::error::ChainrunError;
use crate::link::Link;
use crate::services::ServiceRegistry;
use crate::types::StatusCode;

/// A named, ordered sequence of links run as one unit.
#[derive(Debug)]
pub struct Chain {
    name: String,
    links: Vec<Box<dyn Link>>,
}

impl Chain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a link. Links run in insertion order.
    pub fn add_link(&mut self, link: Box<dyn Link>) -> &mut Self {
        log::debug!("[{}] Adding link \"{}\"", self.name, link.name());
        self.links.push(link);
        self
    }

    pub fn links(&self) -> &[Box<dyn Link>] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn link_names(&self) -> Vec<&str> {
        self.links.iter().map(|link| link.name()).collect()
    }

    //==============================================================================
    // Lifecycle
    //==============================================================================

    /// Initializes every link in order. Stops at the first `Failure`.
    ///
    /// An `Err` is a configuration error and is returned with the link's name attached.
    pub fn initialize_links(
        &mut self,
        ctx: &mut ServiceRegistry,
    ) -> Result<StatusCode, ChainrunError> {
        for link in self.links.iter_mut() {
            log::debug!("[{}] Initializing link \"{}\"", self.name, link.name());
            let status = link.initialize(ctx).map_err(|err| {
                log::error!("[{}] Link \"{}\" failed to initialize: {}", self.name, link.name(), err);
                ChainrunError::LinkExecution {
                    link: link.name().to_string(),
                    source: Box::new(err),
                }
            })?;
            if status.is_failure() {
                log::error!("[{}] Link \"{}\" returned Failure on initialize", self.name, link.name());
                return Ok(StatusCode::Failure);
            }
        }
        Ok(StatusCode::Success)
    }

    /// One pass over the links.
    ///
    /// Stops at the first `Failure` (an `Err` from `execute` counts as one). A
    /// `SkipChain` ends the pass early without failing it.
    pub fn run_once(&mut self, ctx: &mut ServiceRegistry) -> StatusCode {
        for link in self.links.iter_mut() {
            let status = match link.execute(ctx) {
                Ok(status) => status,
                Err(err) => {
                    log::error!("[{}] Link \"{}\" failed: {}", self.name, link.name(), err);
                    StatusCode::Failure
                }
            };

            match status {
                StatusCode::Success => {}
                StatusCode::Recoverable => {
                    log::warn!("[{}] Link \"{}\" returned Recoverable; continuing", self.name, link.name());
                }
                StatusCode::SkipChain => {
                    log::info!("[{}] Link \"{}\" skipped the rest of the chain", self.name, link.name());
                    return StatusCode::Success;
                }
                StatusCode::Failure => {
                    log::error!("[{}] Link \"{}\" returned Failure", self.name, link.name());
                    return StatusCode::Failure;
                }
            }
        }
        StatusCode::Success
    }

    /// Runs passes until no link asks for a repeat, or a pass fails.
    pub fn run(&mut self, ctx: &mut ServiceRegistry) -> StatusCode {
        let mut passes = 0usize;
        loop {
            passes += 1;
            if self.run_once(ctx).is_failure() {
                log::error!("[{}] Chain failed on pass {}", self.name, passes);
                return StatusCode::Failure;
            }
            if !self.repeat_requested(ctx) {
                break;
            }
            log::debug!("[{}] Repeat requested after pass {}", self.name, passes);
        }
        log::info!("[{}] Chain finished after {} pass(es)", self.name, passes);
        StatusCode::Success
    }

    /// Finalizes every link, even after a failure. Never short-circuits.
    pub fn finalize_links(&mut self, ctx: &mut ServiceRegistry) -> StatusCode {
        let mut overall = StatusCode::Success;
        for link in self.links.iter_mut() {
            let status = match link.finalize(ctx) {
                Ok(status) => status,
                Err(err) => {
                    log::error!("[{}] Link \"{}\" failed to finalize: {}", self.name, link.name(), err);
                    StatusCode::Failure
                }
            };
            if status.is_failure() {
                log::error!("[{}] Link \"{}\" returned Failure on finalize", self.name, link.name());
            }
            overall = overall.merge(status);
        }
        overall
    }

    /// True if any member link has its repeat flag set.
    fn repeat_requested(&self, ctx: &ServiceRegistry) -> bool {
        match ctx.config() {
            Some(config) => self
                .links
                .iter()
                .any(|link| config.repeat_requested(link.name())),
            None => false,
        }
    }
}
