//! Ranking and filtering over candidate scores.
//!
//! Everything here is side-effect free. `rank_candidates` scores from stage
//! results; the other helpers only read scores that already exist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Candidate, JobProfile, RecommendationThresholds, WeightedStage};
use crate::scoring::composite::{calculate_candidate_score, CandidateScore};
use crate::scoring::recommendation::Recommendation;
use crate::scoring::ScoringError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingOptions {
    pub thresholds: Option<RecommendationThresholds>,
    /// Per-stage floors on the raw score. A missing stage counts as 0.
    #[serde(default)]
    pub min_stage_scores: BTreeMap<WeightedStage, f64>,
    pub limit: Option<usize>,
}

/// Scores, filters and ranks candidates for one job profile.
pub fn rank_candidates(
    candidates: &[Candidate],
    job_profile: &JobProfile,
    options: &RankingOptions,
) -> Result<Vec<CandidateScore>, ScoringError> {
    let scores = candidates
        .iter()
        .map(|c| calculate_candidate_score(c, job_profile, options.thresholds.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rank_scores(scores, options))
}

/// Ranks already-computed scores. Thresholds in `options` are not re-applied.
pub fn rank_scores(scores: Vec<CandidateScore>, options: &RankingOptions) -> Vec<CandidateScore> {
    let mut ranked: Vec<CandidateScore> = scores
        .into_iter()
        .filter(|s| meets_floors(s, &options.min_stage_scores))
        .collect();

    // `sort_by` is stable: equal composites keep their input order.
    ranked.sort_by(|a, b| b.composite_score.cmp(&a.composite_score));

    for (idx, score) in ranked.iter_mut().enumerate() {
        score.rank = Some(idx + 1);
    }

    if let Some(limit) = options.limit {
        ranked.truncate(limit);
    }
    ranked
}

pub fn filter_by_threshold(scores: &[CandidateScore], min_score: u32) -> Vec<CandidateScore> {
    scores
        .iter()
        .filter(|s| s.composite_score >= min_score)
        .cloned()
        .collect()
}

pub fn get_candidates_by_recommendation(
    scores: &[CandidateScore],
    recommendation: Recommendation,
) -> Vec<CandidateScore> {
    scores
        .iter()
        .filter(|s| s.recommendation == recommendation)
        .cloned()
        .collect()
}

fn meets_floors(score: &CandidateScore, floors: &BTreeMap<WeightedStage, f64>) -> bool {
    floors
        .iter()
        .all(|(stage, floor)| score.raw_score(*stage) >= *floor)
}
