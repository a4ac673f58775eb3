//! Axum route handlers for job profiles, batches and candidates.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CandidateUpload, JobProfile, ProcessingBatch, RecommendationThresholds, ScoringWeights,
};
use crate::pipeline::{BatchProgress, CandidateStatus};
use crate::state::AppState;

// ────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobProfileRequest {
    pub title: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub scoring_weights: ScoringWeights,
    pub thresholds: Option<RecommendationThresholds>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteJobProfileResponse {
    pub deleted: Uuid,
    pub failed_batches: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBatchRequest {
    pub job_profile_id: Uuid,
    pub candidates: Vec<CandidateUpload>,
}

// ────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────

/// POST /api/v1/job-profiles
pub async fn handle_create_job_profile(
    State(state): State<AppState>,
    Json(request): Json<CreateJobProfileRequest>,
) -> Result<(StatusCode, Json<JobProfile>), AppError> {
    let mut profile = JobProfile::new(request.title, request.scoring_weights);
    profile.required_skills = request.required_skills;
    profile.thresholds = request.thresholds;

    let profile = state.orchestrator.register_job_profile(profile)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/v1/job-profiles/:id
pub async fn handle_get_job_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobProfile>, AppError> {
    Ok(Json(state.orchestrator.get_job_profile(id)?))
}

/// DELETE /api/v1/job-profiles/:id
///
/// Fails every processing batch that still references the profile.
pub async fn handle_delete_job_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteJobProfileResponse>, AppError> {
    let failed_batches = state.orchestrator.delete_job_profile(id).await?;
    Ok(Json(DeleteJobProfileResponse {
        deleted: id,
        failed_batches,
    }))
}

/// POST /api/v1/batches
pub async fn handle_submit_batch(
    State(state): State<AppState>,
    Json(request): Json<SubmitBatchRequest>,
) -> Result<(StatusCode, Json<ProcessingBatch>), AppError> {
    let batch = state
        .orchestrator
        .submit_batch(request.job_profile_id, request.candidates)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(batch)))
}

/// GET /api/v1/batches/:id/progress
pub async fn handle_batch_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchProgress>, AppError> {
    Ok(Json(state.orchestrator.get_batch_progress(id)?))
}

/// POST /api/v1/batches/:id/cancel
pub async fn handle_cancel_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProcessingBatch>, AppError> {
    Ok(Json(state.orchestrator.cancel_batch(id).await?))
}

/// GET /api/v1/candidates/:id/status
pub async fn handle_candidate_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CandidateStatus>, AppError> {
    Ok(Json(state.orchestrator.get_candidate_status(id)?))
}
