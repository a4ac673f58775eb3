//! Read-only recovery introspection for dashboards.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::recovery::{FailurePattern, RecoveryStatus};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FailurePatternsResponse {
    pub patterns: Vec<FailurePattern>,
}

/// GET /api/v1/recovery/patterns
pub async fn handle_failure_patterns(State(state): State<AppState>) -> Json<FailurePatternsResponse> {
    Json(FailurePatternsResponse {
        patterns: state.recovery.get_failure_patterns(),
    })
}

/// GET /api/v1/recovery/status
pub async fn handle_recovery_status(State(state): State<AppState>) -> Json<RecoveryStatus> {
    Json(state.recovery.get_recovery_status())
}
