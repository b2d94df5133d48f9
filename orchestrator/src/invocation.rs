use crate::config::RunConfig;
use itertools::Itertools;
use std::{
    collections::BTreeMap,
    io::Read,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, trace, warn};
use tracing_unwrap::OptionExt;
use wait_timeout::ChildExt;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to spawn the calibration engine")]
    Spawn(#[source] std::io::Error),
    #[error("failed to wait on the calibration engine")]
    Wait(#[source] std::io::Error),
}

/// Terminal status reported back by the engine hand-off. The exit code
/// is surfaced verbatim, the orchestrator never interprets the engine's
/// numerical results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineStatus {
    Success,
    Failure(i32),
    /// killed after exceeding the reservation's wall clock
    TimedOut,
}

/// Contract handed to the external calibration engine: a program plus
/// a total, order-independent serialization of the RunConfig. Nothing
/// in here may come from ambient run-time state, resubmitting the same
/// config must produce the same invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalibrationInvocation {
    pub program: PathBuf,
    pub arguments: BTreeMap<String, String>,
}

impl CalibrationInvocation {
    pub fn build(config: &RunConfig, program: &Path) -> Self {
        let mut arguments = BTreeMap::new();
        arguments.insert("-i".to_owned(), config.initial_condition.tag().to_owned());
        arguments.insert("-m".to_owned(), config.pso_iterations.to_string());
        arguments.insert("-n".to_owned(), config.mcmc_samples.to_string());
        arguments.insert("-s".to_owned(), config.signature.clone());

        Self {
            program: program.to_path_buf(),
            arguments,
        }
    }

    /// rendered command line for logs and dry runs
    pub fn command_line(&self) -> String {
        let arguments = self
            .arguments
            .iter()
            .map(|(flag, value)| format!("{flag} {value}"))
            .join(" ");

        format!("{} {arguments}", self.program.display())
    }
}

/// Capability the orchestrator hands the invocation off to. The
/// engine's language and runtime are irrelevant to the contract.
pub trait CalibrationEngine {
    fn execute(
        &mut self,
        invocation: &CalibrationInvocation,
        vars: &[(String, String)],
        wall_clock: Duration,
    ) -> Result<EngineStatus, EngineError>;
}

/// Engine hand-off as a child process, bounded by the reservation's
/// wall clock the way the host scheduler would bound the real job.
#[derive(Debug)]
pub struct ProcessEngine;

impl CalibrationEngine for ProcessEngine {
    fn execute(
        &mut self,
        invocation: &CalibrationInvocation,
        vars: &[(String, String)],
        wall_clock: Duration,
    ) -> Result<EngineStatus, EngineError> {
        debug!("handing off: {}", invocation.command_line());

        let mut command = Command::new(&invocation.program);
        for (flag, value) in invocation.arguments.iter() {
            command.arg(flag).arg(value);
        }

        let start = Instant::now();
        let mut child = command
            .envs(vars.iter().map(|(key, value)| (key, value)))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(EngineError::Spawn)?;

        match child.wait_timeout(wall_clock).map_err(EngineError::Wait)? {
            Some(status) => {
                let elapsed = start.elapsed();
                let mut stdout = child.stdout.take().unwrap_or_log();
                let mut output = String::new();

                if let Err(error) = stdout.read_to_string(&mut output) {
                    warn!("failed to read engine output: {error}");
                }

                debug!(
                    "engine finished in {} s | status: {}",
                    elapsed.as_secs(),
                    status.success()
                );
                trace!("engine output: {output}");

                if status.success() {
                    Ok(EngineStatus::Success)
                } else {
                    Ok(EngineStatus::Failure(status.code().unwrap_or(1)))
                }
            }
            None => {
                // the host would kill the job here, do the same locally
                child.kill().map_err(EngineError::Wait)?;
                child.wait().map_err(EngineError::Wait)?;

                Ok(EngineStatus::TimedOut)
            }
        }
    }
}
