// Composite Scoring & Ranking Engine
// Turns whatever stage results a candidate has into one reproducible score,
// a recommendation band and a reasoning string. Pure functions only.

pub mod breakdown;
pub mod composite;
pub mod handlers;
pub mod ranking;
pub mod recommendation;

use thiserror::Error;
use uuid::Uuid;

pub use breakdown::{calculate_scoring_breakdown, ScoringBreakdown, StageContribution};
pub use composite::{calculate_candidate_score, CandidateScore};
pub use ranking::{
    filter_by_threshold, get_candidates_by_recommendation, rank_candidates, rank_scores,
    RankingOptions,
};
pub use recommendation::Recommendation;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Invalid scoring weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid recommendation thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Candidate {candidate_id} does not belong to job profile {job_profile_id}")]
    ProfileMismatch {
        candidate_id: Uuid,
        job_profile_id: Uuid,
    },
}
