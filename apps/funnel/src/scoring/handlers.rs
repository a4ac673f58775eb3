//! GET /api/v1/batches/:id/rankings

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::scoring::{
    filter_by_threshold, get_candidates_by_recommendation, rank_scores, CandidateScore,
    RankingOptions, Recommendation,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RankingsQuery {
    pub min_score: Option<u32>,
    pub recommendation: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingsResponse {
    pub batch_id: Uuid,
    pub scored_candidates: usize,
    pub rankings: Vec<CandidateScore>,
}

/// Ranks the batch's scored candidates, then applies the optional filters.
/// Ranks are assigned before filtering, so they stay batch-wide.
pub async fn handle_batch_rankings(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Query(query): Query<RankingsQuery>,
) -> Result<Json<RankingsResponse>, AppError> {
    let recommendation = match query.recommendation.as_deref() {
        Some(raw) => Some(Recommendation::parse(raw).ok_or_else(|| {
            AppError::Validation(format!(
                "recommendation must be one of strong-hire, hire, maybe, no-hire (got {raw})"
            ))
        })?),
        None => None,
    };

    let scores = state.orchestrator.batch_scores(batch_id)?;
    let scored_candidates = scores.len();

    let mut rankings = rank_scores(scores, &RankingOptions::default());
    if let Some(min_score) = query.min_score {
        rankings = filter_by_threshold(&rankings, min_score);
    }
    if let Some(recommendation) = recommendation {
        rankings = get_candidates_by_recommendation(&rankings, recommendation);
    }
    if let Some(limit) = query.limit {
        rankings.truncate(limit);
    }

    Ok(Json(RankingsResponse {
        batch_id,
        scored_candidates,
        rankings,
    }))
}
