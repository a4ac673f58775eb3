pub mod actions;
pub mod engine;
pub mod executor;
pub mod handlers;

pub use actions::{RecoveryAction, RecoveryActionType};
pub use engine::{
    FailurePattern, PatternKey, RecordOutcome, RecoveryAttempt, RecoveryConfig, RecoveryEngine,
    RecoveryOutcome, RecoveryStatus,
};
pub use executor::{PipelineRecoveryExecutor, RecoveryExecutor};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Recovery for {key} failed after {attempts} attempts: {message}")]
    ActionFailed {
        key: String,
        attempts: u32,
        message: String,
    },

    #[error("Manual intervention required for {0}")]
    ManualIntervention(String),

    #[error("No recoverable dependency named {0}")]
    UnknownService(String),

    #[error("No failure pattern tracked for {0}")]
    UnknownPattern(String),

    #[error("Recovery already in flight for {0}")]
    AlreadyInFlight(String),

    #[error("Recovery action error: {0}")]
    Executor(String),
}
