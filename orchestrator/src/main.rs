mod config;
mod environment;
mod invocation;
mod orchestrator;
mod reservation;

#[cfg(test)]
mod environment_test;
#[cfg(test)]
mod reservation_test;

use crate::config::{RunConfig, RunParameters, SubmissionConfig};
use crate::environment::ToolchainEnvironment;
use crate::invocation::{CalibrationInvocation, ProcessEngine};
use crate::orchestrator::{Orchestrator, EXIT_INVALID_CONFIG};
use clap::Parser;
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Submit a PSO+MCMC calibration run of the SEIRD wave model to the
/// external calibration engine.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// seed dataset/region tag (BE, BXL, FL, WAL)
    #[arg(short = 'i', long)]
    initial_condition: String,

    /// PSO step budget, must be greater than zero
    #[arg(short = 'm', long)]
    pso_iterations: u32,

    /// MCMC draw count, must be greater than zero
    #[arg(short = 'n', long)]
    mcmc_samples: u32,

    /// optional suffix appended to the derived output signature
    #[arg(short = 's', long)]
    signature: Option<String>,

    /// submission policy file, defaults apply when omitted
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// validate and print the submission without running the engine
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let submission = match cli.config {
        Some(ref path) => match SubmissionConfig::load(path) {
            Ok(submission) => submission,
            Err(error) => {
                error!("failed to load submission policy {}: {error}", path.display());
                exit(EXIT_INVALID_CONFIG);
            }
        },
        None => SubmissionConfig::default(),
    };

    if submission.preflight_checks() {
        error!("submission policy failed preflight checks");
        exit(EXIT_INVALID_CONFIG);
    }

    let parameters = RunParameters {
        initial_condition: cli.initial_condition,
        pso_iterations: cli.pso_iterations,
        mcmc_samples: cli.mcmc_samples,
        suffix: cli.signature,
    };

    if cli.dry_run {
        exit(dry_run(&parameters, &submission));
    }

    let context = ToolchainEnvironment::new(&submission.environment);
    let mut orchestrator = Orchestrator::new(
        submission.reservation,
        context,
        ProcessEngine,
        submission.engine.program,
    );

    let outcome = orchestrator.submit(&parameters);
    info!(state = ?outcome.state(), code = outcome.exit_code(), "run finished");

    exit(outcome.exit_code());
}

/// print the batch directives and engine command line for inspection
/// before anything is queued, nothing is acquired or executed
fn dry_run(parameters: &RunParameters, submission: &SubmissionConfig) -> i32 {
    match RunConfig::new(parameters) {
        Ok(config) => {
            for directive in submission.reservation.directives() {
                println!("{directive}");
            }
            println!(
                "{}",
                CalibrationInvocation::build(&config, &submission.engine.program).command_line()
            );

            0
        }
        Err(error) => {
            error!("rejected submission: {error}");

            EXIT_INVALID_CONFIG
        }
    }
}
