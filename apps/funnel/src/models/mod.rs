pub mod batch;
pub mod candidate;
pub mod failure;
pub mod job_profile;
pub mod stage_result;

pub use batch::{BatchFailure, BatchStatus, ProcessingBatch};
pub use candidate::{Candidate, CandidateUpload, ProcessingStage, StageStatus};
pub use failure::{ErrorClass, StageFailure};
pub use job_profile::{JobProfile, RecommendationThresholds, ScoringWeights};
pub use stage_result::{
    AIAnalysisResult, GitHubAnalysis, InterviewAnalysisResult, LinkedInAnalysis, ParsedResume,
    StageResult, StageResults, WeightedStage,
};
