use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Candidate, JobProfile, RecommendationThresholds, ScoringWeights, WeightedStage};
use crate::scoring::breakdown::{calculate_scoring_breakdown, StageContribution};
use crate::scoring::recommendation::{build_reasoning, recommend, Recommendation};
use crate::scoring::ScoringError;

/// A candidate's composite score. Derived data: it can be recomputed from the
/// candidate's current stage results at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    pub candidate_id: Uuid,
    pub job_profile_id: Uuid,
    pub composite_score: u32,
    pub breakdown: Vec<StageContribution>,
    pub applied_weights: ScoringWeights,
    pub missing_stages: Vec<WeightedStage>,
    pub available_weight: f64,
    /// Only set by a ranking pass.
    pub rank: Option<usize>,
    pub recommendation: Recommendation,
    pub reasoning: String,
}

impl CandidateScore {
    pub fn raw_score(&self, stage: WeightedStage) -> f64 {
        self.breakdown
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.raw_score)
            .unwrap_or(0.0)
    }
}

/// Scores a candidate. `thresholds` overrides the profile's bands, which in
/// turn override the defaults.
pub fn calculate_candidate_score(
    candidate: &Candidate,
    job_profile: &JobProfile,
    thresholds: Option<&RecommendationThresholds>,
) -> Result<CandidateScore, ScoringError> {
    let thresholds = match thresholds {
        Some(t) => *t,
        None => job_profile.effective_thresholds(),
    };
    thresholds.validate().map_err(ScoringError::InvalidThresholds)?;

    let breakdown = calculate_scoring_breakdown(candidate, job_profile)?;
    let recommendation = recommend(breakdown.composite_score, &thresholds);
    let reasoning = build_reasoning(&breakdown, recommendation);

    Ok(CandidateScore {
        candidate_id: candidate.id,
        job_profile_id: job_profile.id,
        composite_score: breakdown.composite_score,
        breakdown: breakdown.stages,
        applied_weights: breakdown.applied_weights,
        missing_stages: breakdown.missing_stages,
        available_weight: breakdown.available_weight,
        rank: None,
        recommendation,
        reasoning,
    })
}
