//! Weighted breakdown of a candidate's stage results.
//!
//! Missing stages contribute nothing and their weight share is removed from
//! the denominator, so the composite is renormalized over the stages that
//! actually reported:
//!
//! ```text
//! contribution_i  = raw_i * weight_i / 100
//! availableWeight = (100 - Σ weight_missing) / 100
//! composite       = round(Σ contribution_i / availableWeight), clamped to [0, 100]
//! ```

use serde::{Deserialize, Serialize};

use crate::models::{Candidate, JobProfile, ScoringWeights, StageResults, WeightedStage};
use crate::scoring::ScoringError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageContribution {
    pub stage: WeightedStage,
    /// 0 when the stage is missing.
    pub raw_score: f64,
    pub weight: f64,
    pub contribution: f64,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringBreakdown {
    /// One entry per weighted stage, in canonical order.
    pub stages: Vec<StageContribution>,
    pub missing_stages: Vec<WeightedStage>,
    pub applied_weights: ScoringWeights,
    /// Fraction (0.0 – 1.0) of the configured weight held by stages that reported.
    pub available_weight: f64,
    pub composite_score: u32,
}

impl ScoringBreakdown {
    pub fn present(&self) -> impl Iterator<Item = &StageContribution> {
        self.stages.iter().filter(|s| s.present)
    }
}

/// Builds the breakdown for a candidate against its job profile.
pub fn calculate_scoring_breakdown(
    candidate: &Candidate,
    job_profile: &JobProfile,
) -> Result<ScoringBreakdown, ScoringError> {
    if candidate.job_profile_id != job_profile.id {
        return Err(ScoringError::ProfileMismatch {
            candidate_id: candidate.id,
            job_profile_id: job_profile.id,
        });
    }
    breakdown_from_results(&candidate.results, &job_profile.scoring_weights)
}

pub fn breakdown_from_results(
    results: &StageResults,
    weights: &ScoringWeights,
) -> Result<ScoringBreakdown, ScoringError> {
    weights.validate().map_err(ScoringError::InvalidWeights)?;

    let mut stages = Vec::with_capacity(WeightedStage::ALL.len());
    let mut missing_stages = Vec::new();
    let mut missing_weight = 0.0;
    let mut contribution_sum = 0.0;

    for stage in WeightedStage::ALL {
        let weight = stage.weight_in(weights);
        let (raw_score, present) = match results.weighted_score(stage) {
            Some(score) => (score, true),
            None => {
                missing_stages.push(stage);
                missing_weight += weight;
                (0.0, false)
            }
        };
        let contribution = raw_score * weight / 100.0;
        contribution_sum += contribution;
        stages.push(StageContribution {
            stage,
            raw_score,
            weight,
            contribution,
            present,
        });
    }

    let available_weight = ((100.0 - missing_weight) / 100.0).max(0.0);
    let composite_score = if available_weight <= f64::EPSILON {
        0
    } else {
        (contribution_sum / available_weight).round().clamp(0.0, 100.0) as u32
    };

    Ok(ScoringBreakdown {
        stages,
        missing_stages,
        applied_weights: *weights,
        available_weight,
        composite_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::results;

    #[test]
    fn test_missing_linkedin_renormalizes() {
        let b = breakdown_from_results(
            &results(Some(85.0), None, Some(82.0), Some(88.0)),
            &ScoringWeights::default(),
        )
        .unwrap();
        assert_eq!(b.missing_stages, vec![WeightedStage::LinkedInAnalysis]);
        assert!((b.available_weight - 0.8).abs() < 1e-9);
        // (21.25 + 0 + 20.5 + 26.4) / 0.8 = 85.1875
        assert_eq!(b.composite_score, 85);
    }

    #[test]
    fn test_all_missing_scores_zero() {
        let b = breakdown_from_results(&results(None, None, None, None), &ScoringWeights::default())
            .unwrap();
        assert_eq!(b.composite_score, 0);
        assert_eq!(b.missing_stages.len(), 4);
        assert_eq!(b.available_weight, 0.0);
    }

    #[test]
    fn test_all_present_is_plain_weighted_sum() {
        let b = breakdown_from_results(
            &results(Some(80.0), Some(60.0), Some(70.0), Some(90.0)),
            &ScoringWeights::default(),
        )
        .unwrap();
        // 20 + 12 + 17.5 + 27 = 76.5 → 77
        assert_eq!(b.composite_score, 77);
        assert!(b.missing_stages.is_empty());
    }

    #[test]
    fn test_only_zero_weight_stage_present() {
        let weights = ScoringWeights {
            resume_analysis: 0.0,
            linked_in_analysis: 0.0,
            github_analysis: 50.0,
            interview_performance: 50.0,
        };
        let b = breakdown_from_results(&results(Some(90.0), None, None, None), &weights).unwrap();
        assert_eq!(b.composite_score, 0);
    }

    #[test]
    fn test_composite_bounded_for_every_missing_subset() {
        let weight_sets = [
            ScoringWeights::default(),
            ScoringWeights {
                resume_analysis: 100.0,
                linked_in_analysis: 0.0,
                github_analysis: 0.0,
                interview_performance: 0.0,
            },
            ScoringWeights {
                resume_analysis: 10.0,
                linked_in_analysis: 40.0,
                github_analysis: 45.0,
                interview_performance: 5.0,
            },
        ];
        let scores = [100.0, 0.0, 55.5, 100.0];
        for weights in &weight_sets {
            for mask in 0u8..16 {
                let pick = |i: usize| (mask & (1 << i) != 0).then_some(scores[i]);
                let b =
                    breakdown_from_results(&results(pick(0), pick(1), pick(2), pick(3)), weights)
                        .unwrap();
                assert!(b.composite_score <= 100, "mask {mask}: {}", b.composite_score);
            }
        }
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let weights = ScoringWeights {
            resume_analysis: 50.0,
            linked_in_analysis: 50.0,
            github_analysis: 50.0,
            interview_performance: 50.0,
        };
        let err = breakdown_from_results(&StageResults::default(), &weights).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidWeights(_)));
    }
}
