use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tolerance on the weight sum. Weights arrive from UI sliders and JSON, so
/// exact float equality with 100 is not expected.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Percentage weights of the four scored stages. Must be non-negative and sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub resume_analysis: f64,
    pub linked_in_analysis: f64,
    pub github_analysis: f64,
    pub interview_performance: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            resume_analysis: 25.0,
            linked_in_analysis: 20.0,
            github_analysis: 25.0,
            interview_performance: 30.0,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.resume_analysis + self.linked_in_analysis + self.github_analysis + self.interview_performance
    }

    pub fn validate(&self) -> Result<(), String> {
        let all = [
            ("resumeAnalysis", self.resume_analysis),
            ("linkedInAnalysis", self.linked_in_analysis),
            ("githubAnalysis", self.github_analysis),
            ("interviewPerformance", self.interview_performance),
        ];
        for (name, weight) in all {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("weight '{name}' must be a non-negative number, got {weight}"));
            }
        }
        let total = self.total();
        if (total - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format!("scoring weights must sum to 100, got {total}"));
        }
        Ok(())
    }
}

/// Lower bounds of the recommendation bands, checked top-down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationThresholds {
    pub strong_hire: f64,
    pub hire: f64,
    pub maybe: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            strong_hire: 85.0,
            hire: 70.0,
            maybe: 50.0,
        }
    }
}

impl RecommendationThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.strong_hire >= self.hire && self.hire >= self.maybe) {
            return Err(format!(
                "thresholds must satisfy strongHire >= hire >= maybe, got {}/{}/{}",
                self.strong_hire, self.hire, self.maybe
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProfile {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub scoring_weights: ScoringWeights,
    /// Optional override of the default recommendation bands.
    #[serde(default)]
    pub thresholds: Option<RecommendationThresholds>,
}

impl JobProfile {
    pub fn new(title: impl Into<String>, scoring_weights: ScoringWeights) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            required_skills: Vec::new(),
            scoring_weights,
            thresholds: None,
        }
    }

    pub fn effective_thresholds(&self) -> RecommendationThresholds {
        self.thresholds.unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("job profile title cannot be empty".to_string());
        }
        self.scoring_weights.validate()?;
        if let Some(thresholds) = &self.thresholds {
            thresholds.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_are_valid() {
        assert!(ScoringWeights::default().validate().is_ok());
    }

    #[test]
    fn test_weights_within_tolerance_accepted() {
        let w = ScoringWeights {
            resume_analysis: 33.333,
            linked_in_analysis: 33.333,
            github_analysis: 33.333,
            interview_performance: 0.0,
        };
        assert!(w.validate().is_ok(), "sum was {}", w.total());
    }

    #[test]
    fn test_weights_off_by_more_than_tolerance_rejected() {
        let w = ScoringWeights {
            resume_analysis: 25.0,
            linked_in_analysis: 25.0,
            github_analysis: 25.0,
            interview_performance: 24.9,
        };
        let err = w.validate().unwrap_err();
        assert!(err.contains("sum to 100"), "{err}");
    }

    #[test]
    fn test_negative_weight_rejected() {
        let w = ScoringWeights {
            resume_analysis: -10.0,
            linked_in_analysis: 40.0,
            github_analysis: 40.0,
            interview_performance: 30.0,
        };
        assert!(w.validate().unwrap_err().contains("resumeAnalysis"));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut profile = JobProfile::new("Backend Engineer", ScoringWeights::default());
        profile.thresholds = Some(RecommendationThresholds {
            strong_hire: 60.0,
            hire: 70.0,
            maybe: 50.0,
        });
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_blank_title_rejected() {
        let profile = JobProfile::new("   ", ScoringWeights::default());
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_weights_deserialize_camel_case() {
        let w: ScoringWeights = serde_json::from_str(
            r#"{"resumeAnalysis":25,"linkedInAnalysis":20,"githubAnalysis":25,"interviewPerformance":30}"#,
        )
        .unwrap();
        assert_eq!(w, ScoringWeights::default());
    }
}
