use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::failure::StageFailure;
use crate::models::stage_result::{StageResult, StageResults};
use crate::scoring::CandidateScore;

/// Where a candidate is in the funnel. Declaration order is pipeline order;
/// `linkedin` and `github` run concurrently but keep a fixed relative order here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingStage {
    Resume,
    AiAnalysis,
    #[serde(rename = "linkedin")]
    LinkedIn,
    Github,
    Interview,
    Scoring,
    Completed,
}

impl ProcessingStage {
    /// Stages backed by an external analyzer.
    pub const ANALYSIS: [ProcessingStage; 5] = [
        ProcessingStage::Resume,
        ProcessingStage::AiAnalysis,
        ProcessingStage::LinkedIn,
        ProcessingStage::Github,
        ProcessingStage::Interview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Resume => "resume",
            ProcessingStage::AiAnalysis => "ai-analysis",
            ProcessingStage::LinkedIn => "linkedin",
            ProcessingStage::Github => "github",
            ProcessingStage::Interview => "interview",
            ProcessingStage::Scoring => "scoring",
            ProcessingStage::Completed => "completed",
        }
    }

    /// The analysis stage behind a recovery service name.
    pub fn from_service(service: &str) -> Option<Self> {
        Self::ANALYSIS.iter().copied().find(|s| s.as_str() == service)
    }

    pub fn is_analysis(&self) -> bool {
        Self::ANALYSIS.contains(self)
    }

    /// The other half of the linkedin/github fan-out.
    pub fn fan_out_sibling(&self) -> Option<ProcessingStage> {
        match self {
            ProcessingStage::LinkedIn => Some(ProcessingStage::Github),
            ProcessingStage::Github => Some(ProcessingStage::LinkedIn),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Missing,
}

impl StageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Missing)
    }
}

/// Input accepted at upload time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateUpload {
    pub name: String,
    pub email: Option<String>,
    pub resume_text: String,
    pub linkedin_url: Option<String>,
    pub github_username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub job_profile_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub resume_text: String,
    pub linkedin_url: Option<String>,
    pub github_username: Option<String>,
    pub processing_stage: ProcessingStage,
    pub stage_states: BTreeMap<ProcessingStage, StageStatus>,
    pub results: StageResults,
    pub stage_errors: BTreeMap<ProcessingStage, StageFailure>,
    pub score: Option<CandidateScore>,
    /// Set when the candidate could not be scored at all.
    pub failed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    pub fn from_upload(batch_id: Uuid, job_profile_id: Uuid, upload: CandidateUpload) -> Self {
        let now = Utc::now();
        let stage_states = ProcessingStage::ANALYSIS
            .iter()
            .chain(std::iter::once(&ProcessingStage::Scoring))
            .map(|stage| (*stage, StageStatus::Pending))
            .collect();
        Self {
            id: Uuid::new_v4(),
            batch_id,
            job_profile_id,
            name: upload.name,
            email: upload.email,
            resume_text: upload.resume_text,
            linkedin_url: upload.linkedin_url,
            github_username: upload.github_username,
            processing_stage: ProcessingStage::Resume,
            stage_states,
            results: StageResults::default(),
            stage_errors: BTreeMap::new(),
            score: None,
            failed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage_status(&self, stage: ProcessingStage) -> StageStatus {
        self.stage_states
            .get(&stage)
            .copied()
            .unwrap_or(StageStatus::Pending)
    }

    pub fn set_stage_status(&mut self, stage: ProcessingStage, status: StageStatus) {
        self.stage_states.insert(stage, status);
        self.updated_at = Utc::now();
    }

    /// Moves `processing_stage` forward. Never regresses; returns whether it moved.
    pub fn advance_to(&mut self, stage: ProcessingStage) -> bool {
        if stage > self.processing_stage {
            self.processing_stage = stage;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }

    pub fn record_success(&mut self, result: StageResult) {
        let stage = result.stage();
        self.results.insert(result);
        self.stage_errors.remove(&stage);
        self.set_stage_status(stage, StageStatus::Completed);
    }

    pub fn record_missing(&mut self, stage: ProcessingStage, failure: StageFailure) {
        self.stage_errors.insert(stage, failure);
        self.set_stage_status(stage, StageStatus::Missing);
    }

    pub fn missing_stages(&self) -> Vec<ProcessingStage> {
        self.stage_states
            .iter()
            .filter(|(_, status)| **status == StageStatus::Missing)
            .map(|(stage, _)| *stage)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::failure::ErrorClass;

    fn candidate() -> Candidate {
        Candidate::from_upload(
            Uuid::new_v4(),
            Uuid::new_v4(),
            CandidateUpload {
                name: "Ada".to_string(),
                email: None,
                resume_text: "Rust, distributed systems".to_string(),
                linkedin_url: None,
                github_username: Some("ada".to_string()),
            },
        )
    }

    #[test]
    fn test_new_candidate_starts_at_resume_with_pending_stages() {
        let c = candidate();
        assert_eq!(c.processing_stage, ProcessingStage::Resume);
        assert_eq!(c.stage_status(ProcessingStage::Github), StageStatus::Pending);
        assert_eq!(c.stage_status(ProcessingStage::Scoring), StageStatus::Pending);
    }

    #[test]
    fn test_advance_never_regresses() {
        let mut c = candidate();
        assert!(c.advance_to(ProcessingStage::Interview));
        assert!(!c.advance_to(ProcessingStage::AiAnalysis));
        assert_eq!(c.processing_stage, ProcessingStage::Interview);
    }

    #[test]
    fn test_record_missing_lists_stage() {
        let mut c = candidate();
        c.record_missing(
            ProcessingStage::LinkedIn,
            StageFailure::new(ErrorClass::TimeoutError, 2),
        );
        assert_eq!(c.missing_stages(), vec![ProcessingStage::LinkedIn]);
        assert!(c.stage_status(ProcessingStage::LinkedIn).is_terminal());
    }

    #[test]
    fn test_stage_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(ProcessingStage::AiAnalysis).unwrap(),
            "ai-analysis"
        );
        assert_eq!(serde_json::to_value(ProcessingStage::LinkedIn).unwrap(), "linkedin");
    }

    #[test]
    fn test_fan_out_siblings() {
        assert_eq!(
            ProcessingStage::LinkedIn.fan_out_sibling(),
            Some(ProcessingStage::Github)
        );
        assert_eq!(ProcessingStage::Interview.fan_out_sibling(), None);
    }

    #[test]
    fn test_from_service_only_names_analysis_stages() {
        assert_eq!(
            ProcessingStage::from_service("ai-analysis"),
            Some(ProcessingStage::AiAnalysis)
        );
        assert_eq!(ProcessingStage::from_service("scoring"), None);
        assert_eq!(ProcessingStage::from_service("database"), None);
    }
}
