use std::sync::{Arc, OnceLock, Weak};

use async_trait::async_trait;
use tracing::info;

use crate::models::ProcessingStage;
use crate::pipeline::{AnalyzerRegistry, Orchestrator};
use crate::recovery::RecoveryError;

/// Side effects a recovery action can take. Implementations must be
/// idempotent: the engine may run an action several times per trigger.
#[async_trait]
pub trait RecoveryExecutor: Send + Sync {
    /// Replays queued work for `service`.
    async fn replay(&self, service: &str) -> Result<(), RecoveryError>;

    /// Re-establishes the connection behind `service`.
    async fn reconnect(&self, service: &str) -> Result<(), RecoveryError>;
}

/// Executor wired to the funnel's orchestrator and analyzers. The
/// orchestrator is attached after construction since it owns the recovery
/// engine that owns this executor.
pub struct PipelineRecoveryExecutor {
    orchestrator: OnceLock<Weak<Orchestrator>>,
    analyzers: Arc<AnalyzerRegistry>,
}

impl PipelineRecoveryExecutor {
    pub fn new(analyzers: Arc<AnalyzerRegistry>) -> Self {
        Self {
            orchestrator: OnceLock::new(),
            analyzers,
        }
    }

    /// Points replay at `orchestrator`. Later calls are ignored.
    pub fn attach(&self, orchestrator: &Arc<Orchestrator>) {
        let _ = self.orchestrator.set(Arc::downgrade(orchestrator));
    }
}

#[async_trait]
impl RecoveryExecutor for PipelineRecoveryExecutor {
    async fn replay(&self, service: &str) -> Result<(), RecoveryError> {
        let stage = ProcessingStage::from_service(service)
            .ok_or_else(|| RecoveryError::UnknownService(service.to_string()))?;
        let orchestrator = self
            .orchestrator
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| RecoveryError::Executor("no orchestrator attached".to_string()))?;
        let offered = orchestrator
            .replay_stage(stage)
            .await
            .map_err(|e| RecoveryError::Executor(e.to_string()))?;
        info!("Replay for {service} offered {offered} jobs");
        Ok(())
    }

    async fn reconnect(&self, service: &str) -> Result<(), RecoveryError> {
        let analyzer = self
            .analyzers
            .by_service(service)
            .ok_or_else(|| RecoveryError::UnknownService(service.to_string()))?;
        analyzer
            .reconnect()
            .await
            .map_err(|e| RecoveryError::Executor(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_without_orchestrator_fails() {
        let executor = PipelineRecoveryExecutor::new(Arc::new(AnalyzerRegistry::new()));
        assert!(matches!(
            executor.replay("github").await,
            Err(RecoveryError::Executor(_))
        ));
    }

    #[tokio::test]
    async fn test_replay_unknown_service() {
        let executor = PipelineRecoveryExecutor::new(Arc::new(AnalyzerRegistry::new()));
        assert!(matches!(
            executor.replay("database").await,
            Err(RecoveryError::UnknownService(_))
        ));
    }

    #[tokio::test]
    async fn test_reconnect_unknown_service() {
        let executor = PipelineRecoveryExecutor::new(Arc::new(AnalyzerRegistry::new()));
        assert!(matches!(
            executor.reconnect("database").await,
            Err(RecoveryError::UnknownService(_))
        ));
    }
}
