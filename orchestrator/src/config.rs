use crate::reservation::ResourceReservation;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("initial condition '{0}' is not a recognized dataset tag")]
    UnknownInitialCondition(String),
    #[error("pso_iterations must be greater than zero")]
    PsoIterationsZero,
    #[error("mcmc_samples must be greater than zero")]
    McmcSamplesZero,
    #[error("failed to read submission policy")]
    ReadPolicy(#[from] std::io::Error),
    #[error("failed to parse submission policy")]
    ParsePolicy(#[from] serde_yaml::Error),
}

/// Observed dataset seeding the model, one tag per region the
/// surveillance data is aggregated over.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialCondition {
    National,
    Brussels,
    Flanders,
    Wallonia,
}

impl InitialCondition {
    /// canonical region code, also the signature prefix
    pub fn tag(&self) -> &'static str {
        match self {
            Self::National => "BE",
            Self::Brussels => "BXL",
            Self::Flanders => "FL",
            Self::Wallonia => "WAL",
        }
    }
}

impl FromStr for InitialCondition {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_uppercase().as_str() {
            "BE" => Ok(Self::National),
            "BXL" => Ok(Self::Brussels),
            "FL" => Ok(Self::Flanders),
            "WAL" => Ok(Self::Wallonia),
            _ => Err(ConfigError::UnknownInitialCondition(input.to_owned())),
        }
    }
}

impl fmt::Display for InitialCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Raw submission parameters as they arrive from the CLI, before any
/// validation happened.
#[derive(Clone, Debug)]
pub struct RunParameters {
    pub initial_condition: String,
    pub pso_iterations: u32,
    pub mcmc_samples: u32,
    pub suffix: Option<String>,
}

/// Validated, immutable record of a calibration run. The signature
/// names the output namespace of every artifact the engine writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub initial_condition: InitialCondition,
    pub pso_iterations: u32,
    pub mcmc_samples: u32,
    pub signature: String,
}

impl RunConfig {
    pub fn new(parameters: &RunParameters) -> Result<Self, ConfigError> {
        let initial_condition = InitialCondition::from_str(&parameters.initial_condition)?;

        if parameters.pso_iterations == 0 {
            return Err(ConfigError::PsoIterationsZero);
        }
        if parameters.mcmc_samples == 0 {
            return Err(ConfigError::McmcSamplesZero);
        }

        Ok(Self {
            initial_condition,
            pso_iterations: parameters.pso_iterations,
            mcmc_samples: parameters.mcmc_samples,
            signature: Self::derive_signature(
                initial_condition,
                parameters.pso_iterations,
                parameters.mcmc_samples,
                parameters.suffix.as_deref(),
            ),
        })
    }

    /// Pure function of the run parameters, identical inputs always
    /// name the same namespace so a resubmission is idempotent.
    // TODO: guard against signature collisions across concurrent
    // submissions, this needs a run registry of some kind
    fn derive_signature(
        initial_condition: InitialCondition,
        pso_iterations: u32,
        mcmc_samples: u32,
        suffix: Option<&str>,
    ) -> String {
        let base = format!("{initial_condition}_{pso_iterations}xPSO_{mcmc_samples}xMCMC");

        match suffix {
            Some(suffix) if !suffix.is_empty() => format!("{base}_{suffix}"),
            _ => base,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct SubmissionConfig {
    // static reservation policy attached to the submission
    #[serde(default)]
    pub reservation: ResourceReservation,
    // named toolchain the engine runs under
    #[serde(default)]
    pub environment: EnvironmentConfig,
    // the external calibration engine
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            reservation: ResourceReservation::default(),
            environment: EnvironmentConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    #[serde(default = "default_environment_name")]
    pub name: String,
    #[serde(default = "default_envs_root")]
    pub envs_root: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: default_environment_name(),
            envs_root: default_envs_root(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_engine_program")]
    pub program: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_engine_program(),
        }
    }
}

impl SubmissionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;

        Ok(serde_yaml::from_reader(file)?)
    }

    /// attempt to catch all policy errors in one pass instead of
    /// piece-by-piece to make debugging easier for users
    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = self.reservation.preflight_checks();

        if self.environment.name.is_empty() {
            error!("environment.name cannot be empty, the engine needs a toolchain to run under");
            contains_error = true;
        }

        if self.engine.program.as_os_str().is_empty() {
            error!("engine.program cannot be empty");
            contains_error = true;
        }

        contains_error
    }
}

fn default_environment_name() -> String {
    String::from("covid19model")
}

fn default_envs_root() -> PathBuf {
    PathBuf::from("/opt/conda/envs")
}

fn default_engine_program() -> PathBuf {
    PathBuf::from("calibrate-seird")
}
