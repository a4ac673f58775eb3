//! Progress events for observers.
//!
//! Events go to an optional bounded channel. `publish` awaits capacity, so a
//! slow observer slows the workers down instead of losing events.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{BatchFailure, ErrorClass, ProcessingStage};
use crate::scoring::Recommendation;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    StageStarted {
        batch_id: Uuid,
        candidate_id: Uuid,
        stage: ProcessingStage,
    },
    StageCompleted {
        batch_id: Uuid,
        candidate_id: Uuid,
        stage: ProcessingStage,
        attempts: u32,
    },
    StageMissing {
        batch_id: Uuid,
        candidate_id: Uuid,
        stage: ProcessingStage,
        classification: ErrorClass,
    },
    CandidateScored {
        batch_id: Uuid,
        candidate_id: Uuid,
        composite_score: u32,
        recommendation: Recommendation,
    },
    CandidateFailed {
        batch_id: Uuid,
        candidate_id: Uuid,
    },
    BatchCompleted {
        batch_id: Uuid,
        processed: usize,
        failed: usize,
    },
    BatchFailed {
        batch_id: Uuid,
        reason: BatchFailure,
    },
    BatchCancelled {
        batch_id: Uuid,
    },
}

#[derive(Clone, Default)]
pub struct ProgressPublisher {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressPublisher {
    /// A publisher that only traces.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    pub async fn publish(&self, event: ProgressEvent) {
        debug!(?event, "progress");
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                warn!("Progress observer dropped; event discarded");
            }
        }
    }
}

/// Default observer: logs every event until the channel closes.
pub async fn log_progress(mut rx: mpsc::Receiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        match &event {
            ProgressEvent::BatchCompleted {
                batch_id,
                processed,
                failed,
            } => info!("Batch {batch_id} completed: {processed} processed, {failed} failed"),
            ProgressEvent::BatchFailed { batch_id, reason } => {
                warn!("Batch {batch_id} failed: {reason:?}")
            }
            other => debug!(event = ?other, "observer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_delivered_in_order() {
        let (publisher, mut rx) = ProgressPublisher::channel(4);
        let batch_id = Uuid::new_v4();
        publisher
            .publish(ProgressEvent::BatchCancelled { batch_id })
            .await;
        publisher
            .publish(ProgressEvent::BatchCompleted {
                batch_id,
                processed: 1,
                failed: 0,
            })
            .await;
        assert_eq!(rx.recv().await, Some(ProgressEvent::BatchCancelled { batch_id }));
        assert!(matches!(
            rx.recv().await,
            Some(ProgressEvent::BatchCompleted { processed: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_disabled_publisher_never_blocks() {
        let publisher = ProgressPublisher::disabled();
        publisher
            .publish(ProgressEvent::BatchCancelled {
                batch_id: Uuid::new_v4(),
            })
            .await;
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(ProgressEvent::CandidateFailed {
            batch_id: Uuid::nil(),
            candidate_id: Uuid::nil(),
        })
        .unwrap();
        assert_eq!(json["event"], "candidate_failed");
    }
}
