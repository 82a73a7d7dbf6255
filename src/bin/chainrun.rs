//! chainrun CLI
//!
//! Runs the chains described by a setup file.
//!
//! Usage:
//!   chainrun <setup.json> [settings.json]
//!
//! Without a settings file the analysis is named after the setup file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use chainrun::config::ConfigObject;
use chainrun::execution::run_chains;
use chainrun::process::ProcessManager;
use chainrun::setup::RunSetup;
use chainrun::types::StatusCode;
use colored::*;

#[derive(Parser)]
#[command(
    name = "chainrun",
    version,
    about = "Runs chains of links described by a JSON setup file"
)]
struct Cli {
    /// Path to the setup JSON file
    setup: PathBuf,
    /// Optional settings JSON file for the run configuration
    settings: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli.setup, cli.settings.as_deref()) {
        Ok(StatusCode::Failure) => {
            println!("{}", "=== chainrun: FAILURE ===".red().bold());
            ExitCode::FAILURE
        }
        Ok(_) => {
            println!("{}", "=== chainrun: SUCCESS ===".green().bold());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(setup_path: &Path, settings_path: Option<&Path>) -> Result<StatusCode, chainrun::ChainrunError> {
    let setup = RunSetup::from_path(setup_path)?;
    let settings = match settings_path {
        Some(path) => ConfigObject::from_path(path)?,
        None => ConfigObject::new(
            setup_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "chainrun".to_string()),
        ),
    };

    println!(
        "{} {} (chainrun {})",
        "=== Running analysis".cyan().bold(),
        settings.analysis_name.bold(),
        chainrun::VERSION
    );

    let mut pm = ProcessManager::new();
    run_chains(&mut pm, Some(settings), &setup)
}
