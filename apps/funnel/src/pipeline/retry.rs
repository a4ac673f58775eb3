//! Per-stage retry policy, bounded timeouts and exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::models::{Candidate, JobProfile, ProcessingStage, StageResult};
use crate::pipeline::analyzer::StageAnalyzer;
use crate::pipeline::error::StageError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagePolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl StagePolicy {
    pub fn for_stage(stage: ProcessingStage) -> Self {
        let (max_attempts, base_ms, timeout_secs) = match stage {
            ProcessingStage::Resume => (2, 500, 30),
            ProcessingStage::AiAnalysis => (3, 1_000, 60),
            ProcessingStage::LinkedIn => (2, 2_000, 30),
            ProcessingStage::Github => (3, 1_000, 30),
            ProcessingStage::Interview => (1, 0, 120),
            ProcessingStage::Scoring | ProcessingStage::Completed => (1, 0, 5),
        };
        Self {
            max_attempts,
            base_delay: Duration::from_millis(base_ms),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// `base * 2^(attempt-1)` for 1-based attempts.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent)
}

#[derive(Debug)]
pub struct RetryOutcome {
    pub result: Result<StageResult, StageError>,
    pub attempts: u32,
}

/// Runs `attempt_fn` until it succeeds, fails with a non-retryable error, or
/// the policy's attempt budget is spent.
pub async fn run_with_retry<F, Fut>(policy: &StagePolicy, mut attempt_fn: F) -> RetryOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<StageResult, StageError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match attempt_fn(attempt).await {
            Ok(result) => {
                return RetryOutcome {
                    result: Ok(result),
                    attempts: attempt,
                }
            }
            Err(err) if !err.is_retryable() || attempt >= max_attempts => {
                return RetryOutcome {
                    result: Err(err),
                    attempts: attempt,
                }
            }
            Err(err) => {
                let delay = backoff_delay(policy.base_delay, attempt);
                warn!(
                    "Attempt {attempt}/{max_attempts} failed ({err}), retrying after {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Calls the analyzer under `timeout`. The call runs on its own task and is
/// not cancelled on timeout; whatever it returns afterwards is dropped.
pub async fn call_with_timeout(
    analyzer: Arc<dyn StageAnalyzer>,
    candidate: Candidate,
    job_profile: JobProfile,
    timeout: Duration,
) -> Result<StageResult, StageError> {
    let stage = analyzer.stage();
    let candidate_id = candidate.id;
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let outcome = analyzer.analyze(&candidate, &job_profile).await;
        if tx.send(outcome).is_err() {
            debug!("Discarding late {stage} response for candidate {candidate_id}");
        }
    });

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => Err(StageError::InvalidResponse(format!(
            "{stage} analyzer task ended without a result"
        ))),
        Err(_) => Err(StageError::timeout(format!(
            "{stage} analyzer exceeded {}ms",
            timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::models::ScoringWeights;
    use crate::test_support::{candidate_with_scores, github_result, job_profile};

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let base = Duration::from_millis(1_000);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(4_000));
    }

    #[test]
    fn test_backoff_saturates() {
        let delay = backoff_delay(Duration::from_secs(u64::MAX / 2), 40);
        assert_eq!(delay, Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_budget_spent() {
        let calls = AtomicU32::new(0);
        let policy = StagePolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        };
        let outcome = run_with_retry(&policy, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StageError::network("reset")) }
        })
        .await;
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(outcome.result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_error_is_not_retried() {
        let policy = StagePolicy::for_stage(ProcessingStage::AiAnalysis);
        let outcome = run_with_retry(&policy, |_| async {
            Err(StageError::Validation("empty resume".into()))
        })
        .await;
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failure() {
        let policy = StagePolicy::for_stage(ProcessingStage::Github);
        let outcome = run_with_retry(&policy, |attempt| async move {
            if attempt < 2 {
                Err(StageError::rate_limited("429"))
            } else {
                Ok(github_result(70.0))
            }
        })
        .await;
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.result.is_ok());
    }

    struct Slow {
        delay: Duration,
        finished: Arc<AtomicU32>,
    }

    #[async_trait]
    impl StageAnalyzer for Slow {
        fn stage(&self) -> ProcessingStage {
            ProcessingStage::Github
        }

        async fn analyze(&self, _: &Candidate, _: &JobProfile) -> Result<StageResult, StageError> {
            tokio::time::sleep(self.delay).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(github_result(99.0))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_without_cancelling_the_call() {
        let finished = Arc::new(AtomicU32::new(0));
        let analyzer = Arc::new(Slow {
            delay: Duration::from_secs(10),
            finished: finished.clone(),
        });
        let profile = job_profile(ScoringWeights::default());
        let candidate = candidate_with_scores(&profile, None, None, None, None);

        let err = call_with_timeout(analyzer, candidate, profile, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StageError::Transient {
                kind: crate::pipeline::error::TransientKind::Timeout,
                ..
            }
        ));
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        // The underlying call still runs to completion; its result goes nowhere.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_call_returns_result() {
        let analyzer = Arc::new(Slow {
            delay: Duration::from_millis(10),
            finished: Arc::new(AtomicU32::new(0)),
        });
        let profile = job_profile(ScoringWeights::default());
        let candidate = candidate_with_scores(&profile, None, None, None, None);
        let result = call_with_timeout(analyzer, candidate, profile, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(result.raw_score(), 99.0);
    }
}
