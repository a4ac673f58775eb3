//! Shared fixtures for unit tests.

use uuid::Uuid;

use crate::models::{
    AIAnalysisResult, Candidate, CandidateUpload, GitHubAnalysis, InterviewAnalysisResult,
    JobProfile, LinkedInAnalysis, ParsedResume, ProcessingStage, ScoringWeights, StageResult,
    StageResults,
};

pub fn results(
    ai: Option<f64>,
    linkedin: Option<f64>,
    github: Option<f64>,
    interview: Option<f64>,
) -> StageResults {
    let mut r = StageResults::default();
    if let Some(s) = ai {
        r.insert(ai_result(s));
    }
    if let Some(s) = linkedin {
        r.insert(linkedin_result(s));
    }
    if let Some(s) = github {
        r.insert(github_result(s));
    }
    if let Some(s) = interview {
        r.insert(interview_result(s));
    }
    r
}

pub fn stage_result(stage: ProcessingStage, score: f64) -> StageResult {
    match stage {
        ProcessingStage::Resume => StageResult::ResumeParse(ParsedResume {
            quality_score: score,
            skills: vec!["rust".to_string()],
            years_experience: Some(5.0),
            provider: "test".to_string(),
        }),
        ProcessingStage::AiAnalysis => ai_result(score),
        ProcessingStage::LinkedIn => linkedin_result(score),
        ProcessingStage::Github => github_result(score),
        ProcessingStage::Interview => interview_result(score),
        other => panic!("{other} has no analyzer result"),
    }
}

pub fn ai_result(score: f64) -> StageResult {
    StageResult::AiAnalysis(AIAnalysisResult {
        overall_score: score,
        matched_skills: vec!["rust".to_string()],
        missing_skills: vec![],
        summary: None,
        provider: "test".to_string(),
    })
}

pub fn linkedin_result(score: f64) -> StageResult {
    StageResult::LinkedIn(LinkedInAnalysis {
        profile_score: score,
        profile_available: true,
        connections: Some(250),
        provider: "test".to_string(),
    })
}

pub fn github_result(score: f64) -> StageResult {
    StageResult::GitHub(GitHubAnalysis {
        overall_score: score,
        profile_available: true,
        public_repos: Some(12),
        top_languages: vec!["Rust".to_string()],
        provider: "test".to_string(),
    })
}

pub fn interview_result(score: f64) -> StageResult {
    StageResult::Interview(InterviewAnalysisResult {
        overall_score: score,
        communication_score: Some(score),
        technical_score: Some(score),
        provider: "test".to_string(),
    })
}

pub fn job_profile(weights: ScoringWeights) -> JobProfile {
    let mut profile = JobProfile::new("Senior Backend Engineer", weights);
    profile.required_skills = vec!["rust".to_string(), "postgres".to_string()];
    profile
}

pub fn upload(name: &str) -> CandidateUpload {
    CandidateUpload {
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        resume_text: "Five years building Rust services.".to_string(),
        linkedin_url: Some(format!("https://linkedin.com/in/{}", name.to_lowercase())),
        github_username: Some(name.to_lowercase()),
    }
}

pub fn candidate_with_scores(
    profile: &JobProfile,
    ai: Option<f64>,
    linkedin: Option<f64>,
    github: Option<f64>,
    interview: Option<f64>,
) -> Candidate {
    let mut candidate = Candidate::from_upload(Uuid::new_v4(), profile.id, upload("Grace"));
    candidate.results = results(ai, linkedin, github, interview);
    candidate
}
