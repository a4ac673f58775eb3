pub mod analyzer;
pub mod error;
pub mod events;
pub mod governor;
pub mod handlers;
pub mod http_analyzer;
pub mod orchestrator;
pub mod queue;
pub mod retry;


pub use analyzer::{AnalyzerRegistry, StageAnalyzer};
pub use error::{AuthKind, PipelineError, StageError, TransientKind};
pub use events::{log_progress, ProgressEvent, ProgressPublisher};
pub use governor::{GovernorConfig, InMemoryGovernor, MemoryProbe, ResourceGovernor, SystemMemoryProbe};
pub use http_analyzer::HttpStageAnalyzer;
pub use orchestrator::{
    BatchProgress, CandidateProgress, CandidateStatus, Orchestrator, PipelineConfig,
    ANALYZE_OPERATION,
};
pub use queue::{InMemoryJobQueue, JobFilter, JobQueue, QueueError, StageJob};
pub use retry::StagePolicy;
