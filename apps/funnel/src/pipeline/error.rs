use thiserror::Error;
use uuid::Uuid;

use crate::models::ErrorClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    RateLimit,
    Network,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Authentication,
    Authorization,
}

/// Typed failure returned by a stage analyzer. Produced at the collaborator
/// boundary; nothing downstream inspects error text.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transient {kind:?} error: {message}")]
    Transient { kind: TransientKind, message: String },

    #[error("Auth {kind:?} error: {message}")]
    Auth { kind: AuthKind, message: String },

    #[error("Server error (status {status:?}): {message}")]
    Server { status: Option<u16>, message: String },

    #[error("Invalid analyzer response: {0}")]
    InvalidResponse(String),

    #[error("No analyzer configured for this stage")]
    NotConfigured,

    #[error("Stage skipped by recovery policy")]
    Skipped,
}

impl StageError {
    pub fn timeout(message: impl Into<String>) -> Self {
        StageError::Transient {
            kind: TransientKind::Timeout,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        StageError::Transient {
            kind: TransientKind::Network,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        StageError::Transient {
            kind: TransientKind::RateLimit,
            message: message.into(),
        }
    }

    /// Transient and server errors are retried with backoff; everything else
    /// is surfaced on the first occurrence.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StageError::Transient { .. } | StageError::Server { .. })
    }

    /// Whether the failure should feed the failure-pattern table. Local
    /// configuration gaps and policy skips are not provider failures.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, StageError::NotConfigured | StageError::Skipped)
    }

    pub fn classify(&self) -> ErrorClass {
        ErrorClass::from(self)
    }
}

impl From<&StageError> for ErrorClass {
    fn from(err: &StageError) -> Self {
        match err {
            StageError::Transient { kind, .. } => match kind {
                TransientKind::RateLimit => ErrorClass::RateLimitError,
                TransientKind::Network => ErrorClass::NetworkError,
                TransientKind::Timeout => ErrorClass::TimeoutError,
            },
            StageError::Auth { kind, .. } => match kind {
                AuthKind::Authentication => ErrorClass::AuthenticationError,
                AuthKind::Authorization => ErrorClass::AuthorizationError,
            },
            StageError::Server { .. } => ErrorClass::ServerError,
            StageError::Validation(_)
            | StageError::InvalidResponse(_)
            | StageError::NotConfigured
            | StageError::Skipped => ErrorClass::UnknownError,
        }
    }
}

/// Maps an HTTP status to a stage error. Used only by HTTP-backed analyzers.
pub fn stage_error_from_status(status: u16, message: String) -> StageError {
    match status {
        429 => StageError::rate_limited(message),
        401 => StageError::Auth {
            kind: AuthKind::Authentication,
            message,
        },
        403 => StageError::Auth {
            kind: AuthKind::Authorization,
            message,
        },
        408 | 504 => StageError::timeout(message),
        400 | 404 | 409 | 422 => StageError::Validation(message),
        s if s >= 500 => StageError::Server {
            status: Some(s),
            message,
        },
        _ => StageError::InvalidResponse(format!("unexpected status {status}: {message}")),
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Job profile {0} not found")]
    ProfileNotFound(Uuid),

    #[error("Batch {0} not found")]
    BatchNotFound(Uuid),

    #[error("Candidate {0} not found")]
    CandidateNotFound(Uuid),

    #[error("Invalid job profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid candidate upload: {0}")]
    InvalidUpload(String),

    #[error("A batch needs at least one candidate")]
    EmptyBatch,

    #[error("Job profile {0} is already registered")]
    ProfileExists(Uuid),

    #[error("Job queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("Batch {0} is no longer processing")]
    BatchHalted(Uuid),
}
