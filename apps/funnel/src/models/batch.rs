use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Cancelled => "cancelled",
        }
    }
}

/// Batch-fatal conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchFailure {
    JobProfileDeleted,
    QueueUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingBatch {
    pub id: Uuid,
    pub job_profile_id: Uuid,
    pub total_candidates: usize,
    pub processed_candidates: usize,
    pub failed_candidates: usize,
    pub status: BatchStatus,
    pub failure: Option<BatchFailure>,
    pub candidate_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingBatch {
    pub fn new(job_profile_id: Uuid, candidate_ids: Vec<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_profile_id,
            total_candidates: candidate_ids.len(),
            processed_candidates: 0,
            failed_candidates: 0,
            status: BatchStatus::Processing,
            failure: None,
            candidate_ids,
            created_at: now,
            updated_at: now,
        }
    }

    /// New stage jobs are only dispatched while the batch is processing.
    pub fn accepts_work(&self) -> bool {
        self.status == BatchStatus::Processing
    }

    pub fn record_processed(&mut self) {
        self.processed_candidates += 1;
        self.settle();
    }

    pub fn record_failed(&mut self) {
        self.failed_candidates += 1;
        self.settle();
    }

    /// Halts the batch. Only a processing batch can fail; returns whether it did.
    pub fn fail(&mut self, reason: BatchFailure) -> bool {
        if self.status != BatchStatus::Processing {
            return false;
        }
        self.status = BatchStatus::Failed;
        self.failure = Some(reason);
        self.updated_at = Utc::now();
        true
    }

    pub fn cancel(&mut self) -> bool {
        if self.status != BatchStatus::Processing {
            return false;
        }
        self.status = BatchStatus::Cancelled;
        self.updated_at = Utc::now();
        true
    }

    pub fn is_settled(&self) -> bool {
        self.processed_candidates + self.failed_candidates >= self.total_candidates
    }

    fn settle(&mut self) {
        debug_assert!(self.processed_candidates + self.failed_candidates <= self.total_candidates);
        self.updated_at = Utc::now();
        if self.status == BatchStatus::Processing && self.is_settled() {
            self.status = BatchStatus::Completed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(n: usize) -> ProcessingBatch {
        ProcessingBatch::new(Uuid::new_v4(), (0..n).map(|_| Uuid::new_v4()).collect())
    }

    #[test]
    fn test_batch_completes_when_all_candidates_settle() {
        let mut b = batch(2);
        b.record_processed();
        assert_eq!(b.status, BatchStatus::Processing);
        b.record_failed();
        assert_eq!(b.status, BatchStatus::Completed);
    }

    #[test]
    fn test_failed_batch_does_not_flip_to_completed() {
        let mut b = batch(1);
        assert!(b.fail(BatchFailure::QueueUnavailable));
        b.record_processed();
        assert_eq!(b.status, BatchStatus::Failed);
        assert_eq!(b.failure, Some(BatchFailure::QueueUnavailable));
    }

    #[test]
    fn test_cancel_only_from_processing() {
        let mut b = batch(1);
        b.record_processed();
        assert!(!b.cancel());
        let mut b = batch(1);
        assert!(b.cancel());
        assert!(!b.accepts_work());
    }
}
