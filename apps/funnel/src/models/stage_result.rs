use serde::{Deserialize, Serialize};

use crate::models::candidate::ProcessingStage;
use crate::models::job_profile::ScoringWeights;

// ────────────────────────────────────────────────────────────────────────────
// Per-stage payloads
// ────────────────────────────────────────────────────────────────────────────

/// Output of the resume parsing stage. Carries no scoring weight of its own;
/// it feeds the AI analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResume {
    /// Parse quality, 0 – 100.
    pub quality_score: f64,
    #[serde(default)]
    pub skills: Vec<String>,
    pub years_experience: Option<f64>,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIAnalysisResult {
    /// Relevance of the resume to the job profile, 0 – 100.
    pub overall_score: f64,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    pub summary: Option<String>,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInAnalysis {
    pub profile_score: f64,
    /// False when the provider could only return partial public data.
    pub profile_available: bool,
    pub connections: Option<u32>,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubAnalysis {
    pub overall_score: f64,
    pub profile_available: bool,
    pub public_repos: Option<u32>,
    #[serde(default)]
    pub top_languages: Vec<String>,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewAnalysisResult {
    pub overall_score: f64,
    pub communication_score: Option<f64>,
    pub technical_score: Option<f64>,
    pub provider: String,
}

/// A typed stage result. Presence of a variant on a candidate is the only
/// success signal the scoring engine looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StageResult {
    ResumeParse(ParsedResume),
    AiAnalysis(AIAnalysisResult),
    LinkedIn(LinkedInAnalysis),
    GitHub(GitHubAnalysis),
    Interview(InterviewAnalysisResult),
}

impl StageResult {
    pub fn stage(&self) -> ProcessingStage {
        match self {
            StageResult::ResumeParse(_) => ProcessingStage::Resume,
            StageResult::AiAnalysis(_) => ProcessingStage::AiAnalysis,
            StageResult::LinkedIn(_) => ProcessingStage::LinkedIn,
            StageResult::GitHub(_) => ProcessingStage::Github,
            StageResult::Interview(_) => ProcessingStage::Interview,
        }
    }

    /// The stage's 0 – 100 score, clamped.
    pub fn raw_score(&self) -> f64 {
        let score = match self {
            StageResult::ResumeParse(r) => r.quality_score,
            StageResult::AiAnalysis(r) => r.overall_score,
            StageResult::LinkedIn(r) => r.profile_score,
            StageResult::GitHub(r) => r.overall_score,
            StageResult::Interview(r) => r.overall_score,
        };
        clamp_score(score)
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Zero or one result per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResults {
    pub resume: Option<ParsedResume>,
    pub ai_analysis: Option<AIAnalysisResult>,
    pub linked_in: Option<LinkedInAnalysis>,
    pub github: Option<GitHubAnalysis>,
    pub interview: Option<InterviewAnalysisResult>,
}

impl StageResults {
    /// Stores (or overwrites) the result for its stage.
    pub fn insert(&mut self, result: StageResult) {
        match result {
            StageResult::ResumeParse(r) => self.resume = Some(r),
            StageResult::AiAnalysis(r) => self.ai_analysis = Some(r),
            StageResult::LinkedIn(r) => self.linked_in = Some(r),
            StageResult::GitHub(r) => self.github = Some(r),
            StageResult::Interview(r) => self.interview = Some(r),
        }
    }

    pub fn has(&self, stage: ProcessingStage) -> bool {
        match stage {
            ProcessingStage::Resume => self.resume.is_some(),
            ProcessingStage::AiAnalysis => self.ai_analysis.is_some(),
            ProcessingStage::LinkedIn => self.linked_in.is_some(),
            ProcessingStage::Github => self.github.is_some(),
            ProcessingStage::Interview => self.interview.is_some(),
            ProcessingStage::Scoring | ProcessingStage::Completed => false,
        }
    }

    /// Raw score of a weighted stage, if its result is present.
    pub fn weighted_score(&self, stage: WeightedStage) -> Option<f64> {
        let score = match stage {
            WeightedStage::ResumeAnalysis => self.ai_analysis.as_ref().map(|r| r.overall_score),
            WeightedStage::LinkedInAnalysis => self.linked_in.as_ref().map(|r| r.profile_score),
            WeightedStage::GithubAnalysis => self.github.as_ref().map(|r| r.overall_score),
            WeightedStage::InterviewPerformance => self.interview.as_ref().map(|r| r.overall_score),
        };
        score.map(clamp_score)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Weighted stages
// ────────────────────────────────────────────────────────────────────────────

/// The four stages that carry scoring weight, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeightedStage {
    ResumeAnalysis,
    LinkedInAnalysis,
    GithubAnalysis,
    InterviewPerformance,
}

impl WeightedStage {
    pub const ALL: [WeightedStage; 4] = [
        WeightedStage::ResumeAnalysis,
        WeightedStage::LinkedInAnalysis,
        WeightedStage::GithubAnalysis,
        WeightedStage::InterviewPerformance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightedStage::ResumeAnalysis => "resumeAnalysis",
            WeightedStage::LinkedInAnalysis => "linkedInAnalysis",
            WeightedStage::GithubAnalysis => "githubAnalysis",
            WeightedStage::InterviewPerformance => "interviewPerformance",
        }
    }

    /// The pipeline stage whose result feeds this weight.
    pub fn source_stage(&self) -> ProcessingStage {
        match self {
            WeightedStage::ResumeAnalysis => ProcessingStage::AiAnalysis,
            WeightedStage::LinkedInAnalysis => ProcessingStage::LinkedIn,
            WeightedStage::GithubAnalysis => ProcessingStage::Github,
            WeightedStage::InterviewPerformance => ProcessingStage::Interview,
        }
    }

    pub fn weight_in(&self, weights: &ScoringWeights) -> f64 {
        match self {
            WeightedStage::ResumeAnalysis => weights.resume_analysis,
            WeightedStage::LinkedInAnalysis => weights.linked_in_analysis,
            WeightedStage::GithubAnalysis => weights.github_analysis,
            WeightedStage::InterviewPerformance => weights.interview_performance,
        }
    }
}

impl std::fmt::Display for WeightedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
