// In: src/execution.rs

//! The run entry point: wires configuration, logging and chains together and drives
//! the three lifecycle phases.

use log::LevelFilter;

use crate::config::ConfigObject;
use crate::error::ChainrunError;
use crate::logging;
use crate::process::ProcessManager;
use crate::setup::RunSetup;
use crate::types::StatusCode;

/// Runs `setup` on `pm`.
///
/// 1.  Registers `settings` as the run's `ConfigObject`, replacing any existing one.
/// 2.  Sets up logging from the configuration.
/// 3.  Builds the chains, then runs `initialize_all`, `execute_all` and `finalize_all`.
///
/// `finalize_all` always runs once chains are built, even when initialization
/// returned an error. The returned status is `Failure` if any phase failed.
pub fn run_chains(
    pm: &mut ProcessManager,
    settings: Option<ConfigObject>,
    setup: &RunSetup,
) -> Result<StatusCode, ChainrunError> {
    // 1. Resolve the configuration.
    if let Some(settings) = settings {
        pm.services_mut().remove::<ConfigObject>(true)?;
        pm.services_mut().register(settings);
    }
    let config = pm.services_mut().config_mut().clone();

    // 2. Logging.
    logging::init_logging(
        config.log_level.map(LevelFilter::from),
        config.log_file.as_deref(),
    )?;

    if config.analysis_name.is_empty() {
        log::error!("Analysis name not set in the configuration");
        return Err(ChainrunError::invalid_config(
            "ConfigObject",
            "analysis_name is not set",
        ));
    }
    log::info!(
        "Starting analysis \"{}\" (version {})",
        config.analysis_name,
        config.version
    );

    // 3. Chains.
    setup.apply(pm)?;

    // 4. Lifecycle.
    let initialized = pm.initialize_all();
    let status = match &initialized {
        Ok(StatusCode::Failure) | Err(_) => StatusCode::Failure,
        Ok(_) => pm.execute_all(),
    };
    let finalized = pm.finalize_all();
    initialized?;

    let status = status.merge(finalized);
    if status.is_failure() {
        log::error!("Analysis \"{}\" failed", config.analysis_name);
        Ok(StatusCode::Failure)
    } else {
        log::info!("Analysis \"{}\" finished successfully", config.analysis_name);
        Ok(StatusCode::Success)
    }
}

/// Clears every chain and service so a new run can start.
///
/// With `skip_config` the current `ConfigObject` survives the reset.
pub fn reset_run(pm: &mut ProcessManager, skip_config: bool) {
    log::info!("Resetting run state");
    pm.reset(skip_config);
}
