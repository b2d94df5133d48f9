use crate::{
    config::{ConfigError, RunConfig, RunParameters},
    environment::{EnvironmentError, ExecutionContext},
    invocation::{CalibrationEngine, CalibrationInvocation, EngineError, EngineStatus},
    reservation::ResourceReservation,
};
use std::path::PathBuf;
use tracing::{debug, error, info, instrument};

/// Exit codes reserved by the orchestrator itself; everything else is
/// the engine's exit code surfaced unchanged.
pub const EXIT_INVALID_CONFIG: i32 = 64;
pub const EXIT_ENVIRONMENT_UNAVAILABLE: i32 = 69;
pub const EXIT_HOST_TIMEOUT: i32 = 124;
pub const EXIT_ENGINE_UNAVAILABLE: i32 = 127;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    EnvironmentActive,
    Running,
    Completed,
    Failed,
    Rejected,
    EnvironmentFailed,
}

/// Terminal result of a submission. No retries happen at this level,
/// retry policy belongs to the surrounding submission infrastructure.
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        signature: String,
    },
    Failed {
        signature: String,
        status: EngineStatus,
    },
    /// the hand-off itself broke, the engine never reported a status
    HandoffFailed {
        signature: String,
        error: EngineError,
    },
    Rejected(ConfigError),
    EnvironmentFailed(EnvironmentError),
}

impl RunOutcome {
    pub fn state(&self) -> RunState {
        match self {
            Self::Completed { .. } => RunState::Completed,
            Self::Failed { .. } | Self::HandoffFailed { .. } => RunState::Failed,
            Self::Rejected(_) => RunState::Rejected,
            Self::EnvironmentFailed(_) => RunState::EnvironmentFailed,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::Failed { status, .. } => match status {
                EngineStatus::Failure(code) => *code,
                EngineStatus::TimedOut => EXIT_HOST_TIMEOUT,
                // a successful engine never lands in Failed
                EngineStatus::Success => 0,
            },
            Self::HandoffFailed { .. } => EXIT_ENGINE_UNAVAILABLE,
            Self::Rejected(_) => EXIT_INVALID_CONFIG,
            Self::EnvironmentFailed(_) => EXIT_ENVIRONMENT_UNAVAILABLE,
        }
    }
}

/// Composes a submission: validates the RunConfig, binds it to the
/// reservation, runs the engine under a scoped execution context and
/// guarantees the context is released on every path out.
pub struct Orchestrator<C, E> {
    reservation: ResourceReservation,
    context: C,
    engine: E,
    program: PathBuf,
}

impl<C: ExecutionContext, E: CalibrationEngine> Orchestrator<C, E> {
    pub fn new(reservation: ResourceReservation, context: C, engine: E, program: PathBuf) -> Self {
        Self {
            reservation,
            context,
            engine,
            program,
        }
    }

    #[instrument(skip(self, parameters), level = "info")]
    pub fn submit(&mut self, parameters: &RunParameters) -> RunOutcome {
        debug!(from = ?RunState::Idle, to = ?RunState::Validating, "accepted submission");
        let config = match RunConfig::new(parameters) {
            Ok(config) => config,
            Err(error) => {
                error!("rejected submission: {error}");
                return RunOutcome::Rejected(error);
            }
        };

        info!(signature = %config.signature, "validated run configuration");
        for directive in self.reservation.directives() {
            info!("{directive}");
        }

        if let Err(error) = self.context.acquire() {
            error!("failed to activate execution context: {error}");
            return RunOutcome::EnvironmentFailed(error);
        }
        // a leaked activation corrupts the node for every following
        // run, the guard releases on all paths out, panics included
        let guard = ContextGuard(&mut self.context);
        debug!(state = ?RunState::EnvironmentActive);

        let invocation = CalibrationInvocation::build(&config, &self.program);
        let vars = guard.0.vars();

        debug!(state = ?RunState::Running);
        let result = self
            .engine
            .execute(&invocation, &vars, self.reservation.wall_clock());
        drop(guard);

        match result {
            Ok(EngineStatus::Success) => {
                info!(signature = %config.signature, "calibration run completed");

                RunOutcome::Completed {
                    signature: config.signature,
                }
            }
            Ok(status) => {
                error!(signature = %config.signature, "calibration run failed: {status:?}");

                RunOutcome::Failed {
                    signature: config.signature,
                    status,
                }
            }
            Err(error) => {
                error!(signature = %config.signature, "engine hand-off failed: {error}");

                RunOutcome::HandoffFailed {
                    signature: config.signature,
                    error,
                }
            }
        }
    }
}

struct ContextGuard<'a, C: ExecutionContext>(&'a mut C);

impl<C: ExecutionContext> Drop for ContextGuard<'_, C> {
    fn drop(&mut self) {
        self.0.release();
    }
}
