use serde::{Deserialize, Serialize};

/// Closed classification of stage failures. Also the `errorType` component of
/// failure pattern keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    RateLimitError,
    NetworkError,
    TimeoutError,
    AuthenticationError,
    AuthorizationError,
    ServerError,
    UnknownError,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::RateLimitError => "RateLimitError",
            ErrorClass::NetworkError => "NetworkError",
            ErrorClass::TimeoutError => "TimeoutError",
            ErrorClass::AuthenticationError => "AuthenticationError",
            ErrorClass::AuthorizationError => "AuthorizationError",
            ErrorClass::ServerError => "ServerError",
            ErrorClass::UnknownError => "UnknownError",
        }
    }

    /// User-facing wording. Raw provider messages never leave the logs.
    pub fn summary(&self) -> &'static str {
        match self {
            ErrorClass::RateLimitError => "provider rate limit reached",
            ErrorClass::NetworkError => "provider unreachable",
            ErrorClass::TimeoutError => "provider did not respond in time",
            ErrorClass::AuthenticationError => "provider credentials rejected",
            ErrorClass::AuthorizationError => "provider denied access",
            ErrorClass::ServerError => "provider returned a server error",
            ErrorClass::UnknownError => "stage could not be completed",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage ended up missing, in the form reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailure {
    pub classification: ErrorClass,
    pub attempts: u32,
    pub summary: String,
}

impl StageFailure {
    pub fn new(classification: ErrorClass, attempts: u32) -> Self {
        Self {
            classification,
            attempts,
            summary: classification.summary().to_string(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }
}
