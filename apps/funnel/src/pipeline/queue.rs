//! Stage job queue.
//!
//! Delivery is at-least-once: a job stays in the unacked set from delivery
//! until the worker acks it, and `redeliver_unacked` pushes the selected
//! jobs back onto the queue. Consumers must therefore tolerate duplicates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::ProcessingStage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageJob {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub candidate_id: Uuid,
    pub stage: ProcessingStage,
    /// Times the governor has refused this job so far.
    pub admission_attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl StageJob {
    pub fn new(batch_id: Uuid, candidate_id: Uuid, stage: ProcessingStage) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            candidate_id,
            stage,
            admission_attempts: 0,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue unavailable")]
    Unavailable,

    #[error("Queue closed")]
    Closed,
}

pub type JobFilter = dyn Fn(&StageJob) -> bool + Send + Sync;

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: StageJob) -> Result<(), QueueError>;

    /// Waits for the next job. `None` means the queue has shut down for good.
    async fn next(&self) -> Option<StageJob>;

    async fn ack(&self, job_id: Uuid);

    /// Re-enqueues the delivered-but-unacked jobs that `filter` selects.
    /// Returns how many were replayed.
    async fn redeliver_unacked(&self, filter: &JobFilter) -> Result<usize, QueueError>;
}

pub struct InMemoryJobQueue {
    tx: mpsc::UnboundedSender<StageJob>,
    rx: AsyncMutex<mpsc::UnboundedReceiver<StageJob>>,
    unacked: Mutex<HashMap<Uuid, StageJob>>,
    available: AtomicBool,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: AsyncMutex::new(rx),
            unacked: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates an outage: further enqueues fail until `restore` is called.
    pub fn mark_unavailable(&self) {
        warn!("Job queue marked unavailable");
        self.available.store(false, Ordering::SeqCst);
    }

    pub fn restore(&self) {
        info!("Job queue restored");
        self.available.store(true, Ordering::SeqCst);
    }

    pub fn unacked_len(&self) -> usize {
        self.unacked.lock().len()
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: StageJob) -> Result<(), QueueError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable);
        }
        self.tx.send(job).map_err(|_| QueueError::Closed)
    }

    async fn next(&self) -> Option<StageJob> {
        let job = self.rx.lock().await.recv().await?;
        self.unacked.lock().insert(job.id, job.clone());
        Some(job)
    }

    async fn ack(&self, job_id: Uuid) {
        self.unacked.lock().remove(&job_id);
    }

    async fn redeliver_unacked(&self, filter: &JobFilter) -> Result<usize, QueueError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable);
        }
        let jobs: Vec<StageJob> = self
            .unacked
            .lock()
            .values()
            .filter(|job| filter(job))
            .cloned()
            .collect();
        for job in &jobs {
            self.tx.send(job.clone()).map_err(|_| QueueError::Closed)?;
        }
        if !jobs.is_empty() {
            info!("Redelivered {} unacked stage jobs", jobs.len());
        }
        Ok(jobs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(stage: ProcessingStage) -> StageJob {
        StageJob::new(Uuid::new_v4(), Uuid::new_v4(), stage)
    }

    #[tokio::test]
    async fn test_jobs_delivered_in_fifo_order() {
        let q = InMemoryJobQueue::new();
        let a = job(ProcessingStage::Resume);
        let b = job(ProcessingStage::AiAnalysis);
        q.enqueue(a.clone()).await.unwrap();
        q.enqueue(b.clone()).await.unwrap();
        assert_eq!(q.next().await.unwrap().id, a.id);
        assert_eq!(q.next().await.unwrap().id, b.id);
    }

    #[tokio::test]
    async fn test_unacked_jobs_are_redelivered() {
        let q = InMemoryJobQueue::new();
        let a = job(ProcessingStage::Github);
        q.enqueue(a.clone()).await.unwrap();
        let delivered = q.next().await.unwrap();
        assert_eq!(q.unacked_len(), 1);

        assert_eq!(q.redeliver_unacked(&|_: &StageJob| true).await.unwrap(), 1);
        assert_eq!(q.next().await.unwrap().id, delivered.id);

        q.ack(a.id).await;
        assert_eq!(q.unacked_len(), 0);
        assert_eq!(q.redeliver_unacked(&|_: &StageJob| true).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_redelivery_honours_filter() {
        let q = InMemoryJobQueue::new();
        let github = job(ProcessingStage::Github);
        q.enqueue(github.clone()).await.unwrap();
        q.enqueue(job(ProcessingStage::LinkedIn)).await.unwrap();
        q.next().await.unwrap();
        q.next().await.unwrap();
        assert_eq!(q.unacked_len(), 2);

        let replayed = q
            .redeliver_unacked(&|j: &StageJob| j.stage == ProcessingStage::Github)
            .await
            .unwrap();
        assert_eq!(replayed, 1);
        assert_eq!(q.next().await.unwrap().id, github.id);
    }

    #[tokio::test]
    async fn test_outage_rejects_enqueue_until_restored() {
        let q = InMemoryJobQueue::new();
        q.mark_unavailable();
        assert!(matches!(
            q.enqueue(job(ProcessingStage::Resume)).await,
            Err(QueueError::Unavailable)
        ));
        q.restore();
        assert!(q.enqueue(job(ProcessingStage::Resume)).await.is_ok());
    }
}
