use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::pipeline::{
    AnalyzerRegistry, HttpStageAnalyzer, InMemoryGovernor, InMemoryJobQueue, JobQueue,
    Orchestrator, ProgressEvent, ProgressPublisher, ResourceGovernor,
};
use crate::recovery::{PipelineRecoveryExecutor, RecoveryEngine};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub recovery: Arc<RecoveryEngine>,
    pub config: Config,
}

impl AppState {
    /// Wires every component explicitly. The returned receiver carries
    /// progress events and must be drained by an observer.
    pub fn from_config(config: Config) -> Result<(Self, mpsc::Receiver<ProgressEvent>)> {
        let pipeline_config = config.pipeline_config();

        let governor: Arc<dyn ResourceGovernor> =
            Arc::new(InMemoryGovernor::with_system_memory(config.governor_config()));
        let queue: Arc<dyn JobQueue> = Arc::new(InMemoryJobQueue::new());

        let mut registry = AnalyzerRegistry::new();
        for (stage, url) in &config.analyzer_urls {
            let analyzer = HttpStageAnalyzer::new(
                *stage,
                url.clone(),
                config.analyzer_api_key.clone(),
                pipeline_config.policy(*stage).timeout,
            )
            .with_context(|| format!("Failed to build {stage} analyzer"))?;
            info!("{stage} analyzer -> {url}");
            registry.register(Arc::new(analyzer));
        }
        let analyzers = Arc::new(registry);

        let executor = Arc::new(PipelineRecoveryExecutor::new(analyzers.clone()));
        let recovery = Arc::new(RecoveryEngine::new(config.recovery_config(), executor.clone()));

        let (events, rx) = ProgressPublisher::channel(config.progress_channel_capacity);
        let orchestrator = Arc::new(Orchestrator::new(
            pipeline_config,
            analyzers,
            governor,
            queue,
            recovery.clone(),
            events,
        ));
        executor.attach(&orchestrator);

        Ok((
            AppState {
                orchestrator,
                recovery,
                config,
            },
            rx,
        ))
    }
}
