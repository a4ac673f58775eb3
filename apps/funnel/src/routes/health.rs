use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and recovery load.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let recovery = state.recovery.get_recovery_status();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "funnel",
        "trackedFailurePatterns": recovery.tracked_patterns,
        "recoveriesInFlight": recovery.in_flight.len()
    }))
}
