//! Stage analyzers, the collaborator seam of the funnel.
//!
//! Each analysis stage is backed by exactly one `StageAnalyzer`. The
//! orchestrator holds them in an `AnalyzerRegistry`, so swapping a provider
//! never touches orchestration code.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Candidate, JobProfile, ProcessingStage, StageResult};
use crate::pipeline::error::StageError;

#[async_trait]
pub trait StageAnalyzer: Send + Sync {
    fn stage(&self) -> ProcessingStage;

    async fn analyze(
        &self,
        candidate: &Candidate,
        job_profile: &JobProfile,
    ) -> Result<StageResult, StageError>;

    /// Re-establishes the connection to the provider. Invoked by restart-type
    /// recovery actions.
    async fn reconnect(&self) -> Result<(), StageError> {
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct AnalyzerRegistry {
    analyzers: HashMap<ProcessingStage, Arc<dyn StageAnalyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an analyzer for its stage, replacing any previous one.
    pub fn register(&mut self, analyzer: Arc<dyn StageAnalyzer>) -> &mut Self {
        self.analyzers.insert(analyzer.stage(), analyzer);
        self
    }

    pub fn with(mut self, analyzer: Arc<dyn StageAnalyzer>) -> Self {
        self.register(analyzer);
        self
    }

    pub fn get(&self, stage: ProcessingStage) -> Option<Arc<dyn StageAnalyzer>> {
        self.analyzers.get(&stage).cloned()
    }

    /// Looks an analyzer up by its recovery service name (the stage label).
    pub fn by_service(&self, service: &str) -> Option<Arc<dyn StageAnalyzer>> {
        self.analyzers
            .iter()
            .find(|(stage, _)| stage.as_str() == service)
            .map(|(_, analyzer)| analyzer.clone())
    }

    pub fn configured_stages(&self) -> Vec<ProcessingStage> {
        let mut stages: Vec<_> = self.analyzers.keys().copied().collect();
        stages.sort();
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ai_result;

    struct Fixed(ProcessingStage);

    #[async_trait]
    impl StageAnalyzer for Fixed {
        fn stage(&self) -> ProcessingStage {
            self.0
        }

        async fn analyze(&self, _: &Candidate, _: &JobProfile) -> Result<StageResult, StageError> {
            Ok(ai_result(50.0))
        }
    }

    #[test]
    fn test_registry_lookup_by_stage_and_service() {
        let registry = AnalyzerRegistry::new()
            .with(Arc::new(Fixed(ProcessingStage::Github)))
            .with(Arc::new(Fixed(ProcessingStage::AiAnalysis)));

        assert!(registry.get(ProcessingStage::Github).is_some());
        assert!(registry.get(ProcessingStage::Interview).is_none());
        assert!(registry.by_service("ai-analysis").is_some());
        assert!(registry.by_service("database").is_none());
        assert_eq!(
            registry.configured_stages(),
            vec![ProcessingStage::AiAnalysis, ProcessingStage::Github]
        );
    }
}
