use crate::config::EnvironmentConfig;
use std::{env, path::PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("execution context '{0}' is unavailable, no toolchain found at {1}")]
    Unavailable(String, PathBuf),
}

/// Scoped execution context the calibration engine runs under.
///
/// `acquire` binds the named toolchain before the hand-off; `release`
/// is idempotent so cleanup paths can call it unconditionally.
pub trait ExecutionContext {
    fn acquire(&mut self) -> Result<(), EnvironmentError>;

    fn release(&mut self);

    /// environment variables the activated toolchain contributes to
    /// the engine process, empty while nothing is acquired
    fn vars(&self) -> Vec<(String, String)>;
}

/// Named toolchain environment resolved under a shared envs root,
/// conda-style: `<envs_root>/<name>/bin` must exist to activate.
#[derive(Debug)]
pub struct ToolchainEnvironment {
    name: String,
    envs_root: PathBuf,
    active: Option<PathBuf>,
}

impl ToolchainEnvironment {
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            name: config.name.clone(),
            envs_root: config.envs_root.clone(),
            active: None,
        }
    }
}

impl ExecutionContext for ToolchainEnvironment {
    fn acquire(&mut self) -> Result<(), EnvironmentError> {
        let prefix = self.envs_root.join(&self.name);

        if !prefix.join("bin").is_dir() {
            return Err(EnvironmentError::Unavailable(self.name.clone(), prefix));
        }

        info!("activated execution context '{}' at {}", self.name, prefix.display());
        self.active = Some(prefix);

        Ok(())
    }

    fn release(&mut self) {
        if self.active.take().is_some() {
            debug!("deactivated execution context '{}'", self.name);
        }
    }

    fn vars(&self) -> Vec<(String, String)> {
        match self.active {
            Some(ref prefix) => {
                let bin = prefix.join("bin");
                let path = match env::var("PATH") {
                    Ok(current) => format!("{}:{current}", bin.display()),
                    Err(_) => bin.display().to_string(),
                };

                vec![
                    ("PATH".to_owned(), path),
                    ("CONDA_PREFIX".to_owned(), prefix.display().to_string()),
                    ("CONDA_DEFAULT_ENV".to_owned(), self.name.clone()),
                ]
            }
            None => Vec::new(),
        }
    }
}
