use serde::{Deserialize, Serialize};

use crate::models::ErrorClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryActionType {
    Retry,
    Restart,
    Skip,
    Manual,
}

impl RecoveryActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryActionType::Retry => "retry",
            RecoveryActionType::Restart => "restart",
            RecoveryActionType::Skip => "skip",
            RecoveryActionType::Manual => "manual",
        }
    }
}

impl std::fmt::Display for RecoveryActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryAction {
    #[serde(rename = "type")]
    pub action_type: RecoveryActionType,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RecoveryAction {
    pub const fn new(action_type: RecoveryActionType, max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            action_type,
            max_attempts,
            backoff_ms,
        }
    }
}

/// Services whose repeated failures warrant recovery regardless of action type.
pub const CRITICAL_SERVICES: &[&str] = &["database", "queue", "ai-analysis"];

pub fn is_critical(service: &str) -> bool {
    CRITICAL_SERVICES.contains(&service)
}

// ────────────────────────────────────────────
// Static action table
// ────────────────────────────────────────────

/// Exact `service:operation:errorType` overrides. Anything not listed falls
/// back to the per-class default.
static ACTION_TABLE: &[(&str, RecoveryAction)] = &[
    (
        "database:connect:ConnectionError",
        RecoveryAction::new(RecoveryActionType::Retry, 3, 1_000),
    ),
    (
        "database:query:TimeoutError",
        RecoveryAction::new(RecoveryActionType::Retry, 3, 2_000),
    ),
    (
        "queue:enqueue:ConnectionError",
        RecoveryAction::new(RecoveryActionType::Restart, 2, 5_000),
    ),
    (
        "ai-analysis:analyze:RateLimitError",
        RecoveryAction::new(RecoveryActionType::Retry, 5, 60_000),
    ),
    (
        "linkedin:analyze:AuthorizationError",
        RecoveryAction::new(RecoveryActionType::Skip, 1, 0),
    ),
    (
        "github:analyze:RateLimitError",
        RecoveryAction::new(RecoveryActionType::Retry, 5, 60_000),
    ),
];

pub fn default_action(class: ErrorClass) -> RecoveryAction {
    match class {
        ErrorClass::RateLimitError => RecoveryAction::new(RecoveryActionType::Retry, 5, 60_000),
        ErrorClass::NetworkError => RecoveryAction::new(RecoveryActionType::Retry, 3, 1_000),
        ErrorClass::TimeoutError => RecoveryAction::new(RecoveryActionType::Retry, 3, 2_000),
        ErrorClass::ServerError => RecoveryAction::new(RecoveryActionType::Restart, 2, 5_000),
        ErrorClass::AuthenticationError
        | ErrorClass::AuthorizationError
        | ErrorClass::UnknownError => RecoveryAction::new(RecoveryActionType::Manual, 1, 0),
    }
}

pub fn action_for(
    service: &str,
    operation: &str,
    error_type: &str,
    class: ErrorClass,
) -> RecoveryAction {
    let key = format!("{service}:{operation}:{error_type}");
    ACTION_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, action)| *action)
        .unwrap_or_else(|| default_action(class))
}
