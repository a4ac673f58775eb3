//! Stage orchestrator.
//!
//! Candidates move `resume → ai-analysis → {linkedin, github} → interview →
//! scoring → completed`. A single dispatcher pulls stage jobs off the queue,
//! asks the governor for admission, claims the stage and hands it to a worker
//! task. Stage N+1 is only enqueued from stage N's completion, except for the
//! linkedin/github fan-out where whichever finishes last enqueues the
//! interview.
//!
//! A stage that fails after its retry budget is marked missing and the
//! candidate moves on. Only batch-fatal conditions (profile deleted, queue
//! unavailable) stop a batch.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{
    BatchFailure, BatchStatus, Candidate, CandidateUpload, ErrorClass, JobProfile,
    ProcessingBatch, ProcessingStage, StageFailure, StageStatus,
};
use crate::pipeline::analyzer::AnalyzerRegistry;
use crate::pipeline::error::{PipelineError, StageError};
use crate::pipeline::events::{ProgressEvent, ProgressPublisher};
use crate::pipeline::governor::ResourceGovernor;
use crate::pipeline::queue::{JobQueue, StageJob};
use crate::pipeline::retry::{call_with_timeout, run_with_retry, RetryOutcome, StagePolicy};
use crate::recovery::RecoveryEngine;
use crate::scoring::{calculate_candidate_score, CandidateScore};

/// Operation name under which analyzer failures are recorded.
pub const ANALYZE_OPERATION: &str = "analyze";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Delay before a job refused by the governor is offered again.
    pub admission_retry: Duration,
    /// How long `shutdown` waits for in-flight jobs.
    pub drain_timeout: Duration,
    policies: BTreeMap<ProcessingStage, StagePolicy>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            admission_retry: Duration::from_millis(500),
            drain_timeout: Duration::from_secs(30),
            policies: ProcessingStage::ANALYSIS
                .iter()
                .map(|stage| (*stage, StagePolicy::for_stage(*stage)))
                .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn policy(&self, stage: ProcessingStage) -> StagePolicy {
        self.policies
            .get(&stage)
            .copied()
            .unwrap_or_else(|| StagePolicy::for_stage(stage))
    }

    pub fn with_policy(mut self, stage: ProcessingStage, policy: StagePolicy) -> Self {
        self.policies.insert(stage, policy);
        self
    }

    /// Overrides the timeout of every analysis stage.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        for policy in self.policies.values_mut() {
            policy.timeout = timeout;
        }
        self
    }
}

// ────────────────────────────────────────────
// Read models
// ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProgress {
    pub candidate_id: Uuid,
    pub name: String,
    pub stage: ProcessingStage,
    pub missing_stages: Vec<ProcessingStage>,
    pub failed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub batch_id: Uuid,
    pub job_profile_id: Uuid,
    pub status: BatchStatus,
    pub failure: Option<BatchFailure>,
    pub processed: usize,
    pub failed: usize,
    pub total: usize,
    pub per_candidate_stage: Vec<CandidateProgress>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStatus {
    pub candidate_id: Uuid,
    pub batch_id: Uuid,
    pub stage: ProcessingStage,
    pub per_stage_status: BTreeMap<ProcessingStage, StageStatus>,
    pub per_stage_completed: BTreeMap<ProcessingStage, bool>,
    /// Best-known classification per missing stage. Never raw provider text.
    pub per_stage_error: BTreeMap<ProcessingStage, StageFailure>,
    pub missing_stages: Vec<ProcessingStage>,
    pub failed: bool,
    pub score: Option<CandidateScore>,
}

#[derive(Default)]
struct PipelineStore {
    profiles: HashMap<Uuid, JobProfile>,
    candidates: HashMap<Uuid, Candidate>,
    batches: HashMap<Uuid, ProcessingBatch>,
}

pub struct Orchestrator {
    config: PipelineConfig,
    store: Mutex<PipelineStore>,
    analyzers: Arc<AnalyzerRegistry>,
    governor: Arc<dyn ResourceGovernor>,
    queue: Arc<dyn JobQueue>,
    recovery: Arc<RecoveryEngine>,
    events: ProgressPublisher,
    shutdown_tx: watch::Sender<bool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        analyzers: Arc<AnalyzerRegistry>,
        governor: Arc<dyn ResourceGovernor>,
        queue: Arc<dyn JobQueue>,
        recovery: Arc<RecoveryEngine>,
        events: ProgressPublisher,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            store: Mutex::new(PipelineStore::default()),
            analyzers,
            governor,
            queue,
            recovery,
            events,
            shutdown_tx,
            dispatcher: Mutex::new(None),
        }
    }

    // ────────────────────────────────────────────
    // Job profiles
    // ────────────────────────────────────────────

    pub fn register_job_profile(&self, profile: JobProfile) -> Result<JobProfile, PipelineError> {
        profile.validate().map_err(PipelineError::InvalidProfile)?;
        let mut store = self.store.lock();
        if store.profiles.contains_key(&profile.id) {
            return Err(PipelineError::ProfileExists(profile.id));
        }
        store.profiles.insert(profile.id, profile.clone());
        info!("Registered job profile {} ({})", profile.id, profile.title);
        Ok(profile)
    }

    pub fn get_job_profile(&self, id: Uuid) -> Result<JobProfile, PipelineError> {
        self.store
            .lock()
            .profiles
            .get(&id)
            .cloned()
            .ok_or(PipelineError::ProfileNotFound(id))
    }

    /// Deletes a profile. Every processing batch that references it fails;
    /// returns the ids of those batches.
    pub async fn delete_job_profile(&self, id: Uuid) -> Result<Vec<Uuid>, PipelineError> {
        let halted: Vec<Uuid> = {
            let mut store = self.store.lock();
            if store.profiles.remove(&id).is_none() {
                return Err(PipelineError::ProfileNotFound(id));
            }
            store
                .batches
                .values_mut()
                .filter(|b| b.job_profile_id == id)
                .filter_map(|b| b.fail(BatchFailure::JobProfileDeleted).then_some(b.id))
                .collect()
        };

        info!("Deleted job profile {id}");
        for batch_id in &halted {
            error!("Batch {batch_id} failed: job profile {id} was deleted mid-batch");
            self.events
                .publish(ProgressEvent::BatchFailed {
                    batch_id: *batch_id,
                    reason: BatchFailure::JobProfileDeleted,
                })
                .await;
        }
        Ok(halted)
    }

    // ────────────────────────────────────────────
    // Batches
    // ────────────────────────────────────────────

    pub async fn submit_batch(
        &self,
        job_profile_id: Uuid,
        uploads: Vec<CandidateUpload>,
    ) -> Result<ProcessingBatch, PipelineError> {
        if uploads.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }
        for (i, upload) in uploads.iter().enumerate() {
            if upload.name.trim().is_empty() {
                return Err(PipelineError::InvalidUpload(format!(
                    "candidate {i} has an empty name"
                )));
            }
            if upload.resume_text.trim().is_empty() {
                return Err(PipelineError::InvalidUpload(format!(
                    "candidate {i} has an empty resume"
                )));
            }
        }

        let (batch, jobs) = {
            let mut store = self.store.lock();
            if !store.profiles.contains_key(&job_profile_id) {
                return Err(PipelineError::ProfileNotFound(job_profile_id));
            }

            let batch_id = Uuid::new_v4();
            let mut candidates: Vec<Candidate> = uploads
                .into_iter()
                .map(|upload| Candidate::from_upload(batch_id, job_profile_id, upload))
                .collect();
            for candidate in &mut candidates {
                candidate.set_stage_status(ProcessingStage::Resume, StageStatus::Queued);
            }

            let mut batch =
                ProcessingBatch::new(job_profile_id, candidates.iter().map(|c| c.id).collect());
            batch.id = batch_id;

            let jobs: Vec<StageJob> = candidates
                .iter()
                .map(|c| StageJob::new(batch_id, c.id, ProcessingStage::Resume))
                .collect();
            for candidate in candidates {
                store.candidates.insert(candidate.id, candidate);
            }
            store.batches.insert(batch_id, batch.clone());
            (batch, jobs)
        };

        info!(
            "Submitted batch {} with {} candidates against profile {}",
            batch.id, batch.total_candidates, job_profile_id
        );

        for job in jobs {
            if let Err(e) = self.queue.enqueue(job).await {
                self.fail_batch(batch.id, BatchFailure::QueueUnavailable).await;
                return Err(PipelineError::QueueUnavailable(e.to_string()));
            }
        }
        Ok(batch)
    }

    /// Stops new dispatch for the batch. In-flight jobs finish on their own.
    pub async fn cancel_batch(&self, batch_id: Uuid) -> Result<ProcessingBatch, PipelineError> {
        let (batch, cancelled) = {
            let mut store = self.store.lock();
            let batch = store
                .batches
                .get_mut(&batch_id)
                .ok_or(PipelineError::BatchNotFound(batch_id))?;
            let cancelled = batch.cancel();
            if !cancelled && batch.status != BatchStatus::Cancelled {
                return Err(PipelineError::BatchHalted(batch_id));
            }
            (batch.clone(), cancelled)
        };
        if cancelled {
            info!("Batch {batch_id} cancelled");
            self.events
                .publish(ProgressEvent::BatchCancelled { batch_id })
                .await;
        }
        Ok(batch)
    }

    pub fn get_batch(&self, batch_id: Uuid) -> Result<ProcessingBatch, PipelineError> {
        self.store
            .lock()
            .batches
            .get(&batch_id)
            .cloned()
            .ok_or(PipelineError::BatchNotFound(batch_id))
    }

    pub fn get_batch_progress(&self, batch_id: Uuid) -> Result<BatchProgress, PipelineError> {
        let store = self.store.lock();
        let batch = store
            .batches
            .get(&batch_id)
            .ok_or(PipelineError::BatchNotFound(batch_id))?;
        let per_candidate_stage = batch
            .candidate_ids
            .iter()
            .filter_map(|id| store.candidates.get(id))
            .map(|c| CandidateProgress {
                candidate_id: c.id,
                name: c.name.clone(),
                stage: c.processing_stage,
                missing_stages: c.missing_stages(),
                failed: c.failed,
            })
            .collect();
        Ok(BatchProgress {
            batch_id,
            job_profile_id: batch.job_profile_id,
            status: batch.status,
            failure: batch.failure,
            processed: batch.processed_candidates,
            failed: batch.failed_candidates,
            total: batch.total_candidates,
            per_candidate_stage,
        })
    }

    /// Scores computed so far for the batch, in upload order.
    pub fn batch_scores(&self, batch_id: Uuid) -> Result<Vec<CandidateScore>, PipelineError> {
        let store = self.store.lock();
        let batch = store
            .batches
            .get(&batch_id)
            .ok_or(PipelineError::BatchNotFound(batch_id))?;
        Ok(batch
            .candidate_ids
            .iter()
            .filter_map(|id| store.candidates.get(id))
            .filter_map(|c| c.score.clone())
            .collect())
    }

    // ────────────────────────────────────────────
    // Candidates
    // ────────────────────────────────────────────

    pub fn get_candidate(&self, candidate_id: Uuid) -> Result<Candidate, PipelineError> {
        self.store
            .lock()
            .candidates
            .get(&candidate_id)
            .cloned()
            .ok_or(PipelineError::CandidateNotFound(candidate_id))
    }

    pub fn get_candidate_status(&self, candidate_id: Uuid) -> Result<CandidateStatus, PipelineError> {
        let candidate = self.get_candidate(candidate_id)?;
        let per_stage_completed = candidate
            .stage_states
            .iter()
            .map(|(stage, status)| (*stage, *status == StageStatus::Completed))
            .collect();
        Ok(CandidateStatus {
            candidate_id,
            batch_id: candidate.batch_id,
            stage: candidate.processing_stage,
            missing_stages: candidate.missing_stages(),
            per_stage_status: candidate.stage_states.clone(),
            per_stage_completed,
            per_stage_error: candidate.stage_errors.clone(),
            failed: candidate.failed,
            score: candidate.score,
        })
    }

    // ────────────────────────────────────────────
    // Dispatch
    // ────────────────────────────────────────────

    /// Spawns the dispatcher loop. A second call while it runs is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.dispatcher.lock();
        if slot.is_some() {
            return;
        }
        let this = self.clone();
        let mut shutdown = self.shutdown_tx.subscribe();
        *slot = Some(tokio::spawn(async move {
            info!("Stage dispatcher started");
            loop {
                tokio::select! {
                    job = this.queue.next() => match job {
                        Some(job) => this.dispatch(job).await,
                        None => {
                            warn!("Job queue closed; dispatcher exiting");
                            break;
                        }
                    },
                    _ = shutdown.changed() => break,
                }
            }
            info!("Stage dispatcher stopped");
        }));
    }

    /// Stops dispatch and waits (bounded) for in-flight jobs to drain.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.dispatcher.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let deadline = tokio::time::Instant::now() + self.config.drain_timeout;
        while self.governor.active_jobs() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let remaining = self.governor.active_jobs();
        if remaining > 0 {
            warn!("Shutting down with {remaining} stage jobs still in flight");
        }
    }

    /// Offers waiting `stage` work to the dispatcher again: delivered jobs no
    /// worker holds, plus a fresh job for every candidate whose stage is
    /// still queued in a processing batch. Duplicates are dropped at claim
    /// time. Returns how many jobs were offered.
    pub async fn replay_stage(&self, stage: ProcessingStage) -> Result<usize, PipelineError> {
        let governor = self.governor.clone();
        let idle = move |job: &StageJob| job.stage == stage && !governor.is_active(job.id);
        let redelivered = self
            .queue
            .redeliver_unacked(&idle)
            .await
            .map_err(|e| PipelineError::QueueUnavailable(e.to_string()))?;

        let waiting: Vec<StageJob> = {
            let store = self.store.lock();
            store
                .batches
                .values()
                .filter(|b| b.accepts_work())
                .flat_map(|b| b.candidate_ids.iter())
                .filter_map(|id| store.candidates.get(id))
                .filter(|c| c.stage_status(stage) == StageStatus::Queued)
                .map(|c| StageJob::new(c.batch_id, c.id, stage))
                .collect()
        };
        let offered = redelivered + waiting.len();
        for job in waiting {
            self.queue
                .enqueue(job)
                .await
                .map_err(|e| PipelineError::QueueUnavailable(e.to_string()))?;
        }
        info!("Replayed {offered} waiting {stage} jobs");
        Ok(offered)
    }

    async fn dispatch(self: &Arc<Self>, mut job: StageJob) {
        if !self.is_runnable(&job) {
            // A redelivered copy of a job a worker still holds; that worker acks it.
            if !self.governor.is_active(job.id) {
                self.queue.ack(job.id).await;
            }
            return;
        }

        if !self.governor.can_start_new_job() {
            job.admission_attempts += 1;
            debug!(
                "Admission refused for {} of candidate {} (attempt {}), requeueing",
                job.stage, job.candidate_id, job.admission_attempts
            );
            self.queue.ack(job.id).await;
            let this = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(this.config.admission_retry).await;
                this.enqueue_stage(job).await;
            });
            return;
        }

        let Some((candidate, profile)) = self.claim(&job) else {
            self.queue.ack(job.id).await;
            return;
        };

        self.governor.register_job(job.id);
        let this = self.clone();
        tokio::spawn(async move {
            this.run_job(&job, candidate, profile).await;
            this.governor.unregister_job(job.id);
            this.queue.ack(job.id).await;
        });
    }

    fn is_runnable(&self, job: &StageJob) -> bool {
        let store = self.store.lock();
        let accepts = store
            .batches
            .get(&job.batch_id)
            .map(|b| b.accepts_work())
            .unwrap_or(false);
        if !accepts {
            debug!(
                "Dropping {} job for candidate {}: batch {} is not processing",
                job.stage, job.candidate_id, job.batch_id
            );
            return false;
        }
        let queued = store
            .candidates
            .get(&job.candidate_id)
            .map(|c| c.stage_status(job.stage) == StageStatus::Queued)
            .unwrap_or(false);
        if !queued {
            debug!(
                "Ignoring duplicate delivery of {} for candidate {}",
                job.stage, job.candidate_id
            );
        }
        queued
    }

    /// Moves the stage from queued to running and snapshots its inputs.
    fn claim(&self, job: &StageJob) -> Option<(Candidate, JobProfile)> {
        let mut guard = self.store.lock();
        let store = &mut *guard;
        let batch = store.batches.get(&job.batch_id)?;
        if !batch.accepts_work() {
            return None;
        }
        let profile = store.profiles.get(&batch.job_profile_id)?.clone();
        let candidate = store.candidates.get_mut(&job.candidate_id)?;
        if candidate.stage_status(job.stage) != StageStatus::Queued {
            return None;
        }
        candidate.set_stage_status(job.stage, StageStatus::Running);
        Some((candidate.clone(), profile))
    }

    async fn run_job(self: &Arc<Self>, job: &StageJob, candidate: Candidate, profile: JobProfile) {
        self.events
            .publish(ProgressEvent::StageStarted {
                batch_id: job.batch_id,
                candidate_id: job.candidate_id,
                stage: job.stage,
            })
            .await;

        if job.stage == ProcessingStage::Scoring {
            self.score_candidate(job, &candidate, &profile).await;
        } else {
            let outcome = self.run_stage(job.stage, candidate, profile).await;
            self.complete_stage(job, outcome).await;
        }
    }

    async fn run_stage(
        self: &Arc<Self>,
        stage: ProcessingStage,
        candidate: Candidate,
        profile: JobProfile,
    ) -> RetryOutcome {
        if self.recovery.is_skipped(stage.as_str(), ANALYZE_OPERATION) {
            info!("Skipping {stage} for candidate {}: marked for silent skip", candidate.id);
            return RetryOutcome {
                result: Err(StageError::Skipped),
                attempts: 0,
            };
        }
        let Some(analyzer) = self.analyzers.get(stage) else {
            debug!("No analyzer configured for {stage}");
            return RetryOutcome {
                result: Err(StageError::NotConfigured),
                attempts: 0,
            };
        };

        let policy = self.config.policy(stage);
        run_with_retry(&policy, |attempt| {
            let analyzer = analyzer.clone();
            let candidate = candidate.clone();
            let profile = profile.clone();
            let recovery = self.recovery.clone();
            async move {
                debug!("{stage} attempt {attempt} for candidate {}", candidate.id);
                let result = call_with_timeout(analyzer, candidate, profile, policy.timeout)
                    .await
                    .and_then(|result| {
                        if result.stage() == stage {
                            Ok(result)
                        } else {
                            Err(StageError::InvalidResponse(format!(
                                "{stage} analyzer returned a {} result",
                                result.stage()
                            )))
                        }
                    });
                if let Err(err) = &result {
                    if err.is_reportable() {
                        recovery.record_failure(
                            stage.as_str(),
                            ANALYZE_OPERATION,
                            err.classify().as_str(),
                            err,
                        );
                    }
                }
                result
            }
        })
        .await
    }

    async fn complete_stage(&self, job: &StageJob, outcome: RetryOutcome) {
        let stage = job.stage;
        let (event, next) = {
            let mut guard = self.store.lock();
            let store = &mut *guard;
            let Some(candidate) = store.candidates.get_mut(&job.candidate_id) else {
                return;
            };

            let event = match outcome.result {
                Ok(result) => {
                    info!(
                        "{stage} completed for candidate {} after {} attempt(s)",
                        candidate.id, outcome.attempts
                    );
                    candidate.record_success(result);
                    ProgressEvent::StageCompleted {
                        batch_id: job.batch_id,
                        candidate_id: job.candidate_id,
                        stage,
                        attempts: outcome.attempts,
                    }
                }
                Err(err) => {
                    warn!("{stage} missing for candidate {}: {err}", candidate.id);
                    let failure = stage_failure(&err, outcome.attempts);
                    let classification = failure.classification;
                    candidate.record_missing(stage, failure);
                    ProgressEvent::StageMissing {
                        batch_id: job.batch_id,
                        candidate_id: job.candidate_id,
                        stage,
                        classification,
                    }
                }
            };
            candidate.advance_to(earliest_open_stage(candidate));

            let accepts = store
                .batches
                .get(&job.batch_id)
                .map(|b| b.accepts_work())
                .unwrap_or(false);
            let next = if accepts {
                let next = successors(candidate, stage);
                for s in &next {
                    candidate.set_stage_status(*s, StageStatus::Queued);
                }
                next
            } else {
                debug!(
                    "Batch {} halted; not enqueueing past {stage} for candidate {}",
                    job.batch_id, candidate.id
                );
                Vec::new()
            };
            (event, next)
        };

        self.events.publish(event).await;
        for stage in next {
            self.enqueue_stage(StageJob::new(job.batch_id, job.candidate_id, stage))
                .await;
        }
    }

    async fn score_candidate(&self, job: &StageJob, candidate: &Candidate, profile: &JobProfile) {
        let scored = calculate_candidate_score(candidate, profile, None);

        let events = {
            let mut guard = self.store.lock();
            let store = &mut *guard;
            let Some(candidate) = store.candidates.get_mut(&job.candidate_id) else {
                return;
            };
            let mut events = Vec::new();
            let mut batch = store.batches.get_mut(&job.batch_id);
            let was_processing = batch
                .as_ref()
                .map(|b| b.status == BatchStatus::Processing)
                .unwrap_or(false);

            match scored {
                Ok(score) => {
                    info!(
                        "Candidate {} scored {} ({})",
                        candidate.id, score.composite_score, score.recommendation
                    );
                    events.push(ProgressEvent::CandidateScored {
                        batch_id: job.batch_id,
                        candidate_id: candidate.id,
                        composite_score: score.composite_score,
                        recommendation: score.recommendation,
                    });
                    candidate.score = Some(score);
                    candidate.set_stage_status(ProcessingStage::Scoring, StageStatus::Completed);
                    if let Some(b) = batch.as_deref_mut() {
                        b.record_processed();
                    }
                }
                Err(e) => {
                    error!("Candidate {} could not be scored: {e}", candidate.id);
                    candidate.failed = true;
                    candidate.record_missing(
                        ProcessingStage::Scoring,
                        StageFailure::new(ErrorClass::UnknownError, 1)
                            .with_summary("candidate could not be scored"),
                    );
                    if let Some(b) = batch.as_deref_mut() {
                        b.record_failed();
                    }
                    events.push(ProgressEvent::CandidateFailed {
                        batch_id: job.batch_id,
                        candidate_id: candidate.id,
                    });
                }
            }
            candidate.advance_to(earliest_open_stage(candidate));

            if let Some(b) = batch {
                if was_processing && b.status == BatchStatus::Completed {
                    info!(
                        "Batch {} completed: {} processed, {} failed",
                        b.id, b.processed_candidates, b.failed_candidates
                    );
                    events.push(ProgressEvent::BatchCompleted {
                        batch_id: b.id,
                        processed: b.processed_candidates,
                        failed: b.failed_candidates,
                    });
                }
            }
            events
        };

        for event in events {
            self.events.publish(event).await;
        }
    }

    async fn enqueue_stage(&self, job: StageJob) -> bool {
        let batch_id = job.batch_id;
        let (stage, candidate_id) = (job.stage, job.candidate_id);
        match self.queue.enqueue(job).await {
            Ok(()) => true,
            Err(e) => {
                error!("Could not enqueue {stage} for candidate {candidate_id}: {e}");
                self.fail_batch(batch_id, BatchFailure::QueueUnavailable).await;
                false
            }
        }
    }

    async fn fail_batch(&self, batch_id: Uuid, reason: BatchFailure) {
        let failed = self
            .store
            .lock()
            .batches
            .get_mut(&batch_id)
            .map(|b| b.fail(reason))
            .unwrap_or(false);
        if failed {
            error!("Batch {batch_id} failed ({reason:?}); draining in-flight jobs");
            self.events
                .publish(ProgressEvent::BatchFailed { batch_id, reason })
                .await;
        }
    }
}

/// User-facing failure record; raw error text stays in the logs.
fn stage_failure(err: &StageError, attempts: u32) -> StageFailure {
    let failure = StageFailure::new(err.classify(), attempts);
    match err {
        StageError::NotConfigured => failure.with_summary("no analyzer configured"),
        StageError::Skipped => failure.with_summary("skipped after repeated provider failures"),
        StageError::Validation(_) => failure.with_summary("candidate data rejected by provider"),
        _ => failure,
    }
}

/// The first stage that has not reached a terminal state.
fn earliest_open_stage(candidate: &Candidate) -> ProcessingStage {
    ProcessingStage::ANALYSIS
        .iter()
        .chain(std::iter::once(&ProcessingStage::Scoring))
        .copied()
        .find(|stage| !candidate.stage_status(*stage).is_terminal())
        .unwrap_or(ProcessingStage::Completed)
}

/// Stages to enqueue once `finished` is terminal.
fn successors(candidate: &Candidate, finished: ProcessingStage) -> Vec<ProcessingStage> {
    match finished {
        ProcessingStage::Resume => vec![ProcessingStage::AiAnalysis],
        ProcessingStage::AiAnalysis => vec![ProcessingStage::LinkedIn, ProcessingStage::Github],
        ProcessingStage::LinkedIn | ProcessingStage::Github => {
            let sibling_done = finished
                .fan_out_sibling()
                .map(|s| candidate.stage_status(s).is_terminal())
                .unwrap_or(true);
            if sibling_done
                && candidate.stage_status(ProcessingStage::Interview) == StageStatus::Pending
            {
                vec![ProcessingStage::Interview]
            } else {
                Vec::new()
            }
        }
        ProcessingStage::Interview => vec![ProcessingStage::Scoring],
        ProcessingStage::Scoring | ProcessingStage::Completed => Vec::new(),
    }
}
