pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::recovery::handlers as recovery_handlers;
use crate::scoring::handlers as scoring_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job profiles
        .route(
            "/api/v1/job-profiles",
            post(handlers::handle_create_job_profile),
        )
        .route(
            "/api/v1/job-profiles/:id",
            get(handlers::handle_get_job_profile).delete(handlers::handle_delete_job_profile),
        )
        // Batches
        .route("/api/v1/batches", post(handlers::handle_submit_batch))
        .route(
            "/api/v1/batches/:id/progress",
            get(handlers::handle_batch_progress),
        )
        .route(
            "/api/v1/batches/:id/cancel",
            post(handlers::handle_cancel_batch),
        )
        .route(
            "/api/v1/batches/:id/rankings",
            get(scoring_handlers::handle_batch_rankings),
        )
        // Candidates
        .route(
            "/api/v1/candidates/:id/status",
            get(handlers::handle_candidate_status),
        )
        // Recovery introspection
        .route(
            "/api/v1/recovery/patterns",
            get(recovery_handlers::handle_failure_patterns),
        )
        .route(
            "/api/v1/recovery/status",
            get(recovery_handlers::handle_recovery_status),
        )
        .with_state(state)
}
