//! Failure pattern table and recovery triggering.
//!
//! Every failure bumps the pattern for its `(service, operation, errorType)`
//! key. Once a pattern crosses its threshold the mapped action runs on a
//! spawned task. At most one recovery per key is in flight at any time: the
//! threshold check and the in-flight mark happen under the same lock as the
//! increment.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::ErrorClass;
use crate::pipeline::StageError;
use crate::recovery::actions::{action_for, is_critical, RecoveryAction, RecoveryActionType};
use crate::recovery::executor::RecoveryExecutor;
use crate::recovery::RecoveryError;

#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    pub retry_threshold: u32,
    pub restart_threshold: u32,
    pub critical_threshold: u32,
    pub pattern_ttl: Duration,
    pub sweep_interval: Duration,
    pub history_limit: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            retry_threshold: 3,
            restart_threshold: 2,
            critical_threshold: 2,
            pattern_ttl: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            history_limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternKey {
    pub service: String,
    pub operation: String,
    pub error_type: String,
}

impl PatternKey {
    pub fn new(
        service: impl Into<String>,
        operation: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            error_type: error_type.into(),
        }
    }
}

impl std::fmt::Display for PatternKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.service, self.operation, self.error_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailurePattern {
    pub service: String,
    pub operation: String,
    pub error_type: String,
    pub classification: ErrorClass,
    pub count: u32,
    pub first_occurrence: DateTime<Utc>,
    pub last_occurrence: DateTime<Utc>,
    pub action: RecoveryAction,
    /// Set once a manual-action pattern has been escalated.
    pub escalated: bool,
}

impl FailurePattern {
    pub fn key(&self) -> PatternKey {
        PatternKey::new(&self.service, &self.operation, &self.error_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    Succeeded,
    Failed,
    ManualRequired,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryAttempt {
    pub key: String,
    pub action: RecoveryActionType,
    pub outcome: RecoveryOutcome,
    pub executions: u32,
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub pattern: FailurePattern,
    pub recovery_triggered: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryStatus {
    pub tracked_patterns: usize,
    pub in_flight: Vec<String>,
    pub skipped: Vec<String>,
    pub recent_attempts: Vec<RecoveryAttempt>,
}

#[derive(Default)]
struct RecoveryState {
    patterns: HashMap<PatternKey, FailurePattern>,
    in_flight: HashSet<PatternKey>,
    skipped: HashSet<PatternKey>,
    history: VecDeque<RecoveryAttempt>,
}

pub struct RecoveryEngine {
    config: RecoveryConfig,
    executor: Arc<dyn RecoveryExecutor>,
    state: Mutex<RecoveryState>,
    shutdown_tx: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// Clears the in-flight mark when dropped, including on panic.
struct InFlightGuard {
    engine: Arc<RecoveryEngine>,
    key: PatternKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.engine.state.lock().in_flight.remove(&self.key);
    }
}

impl RecoveryEngine {
    pub fn new(config: RecoveryConfig, executor: Arc<dyn RecoveryExecutor>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            executor,
            state: Mutex::new(RecoveryState::default()),
            shutdown_tx,
            sweeper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    // ────────────────────────────────────────────
    // Recording
    // ────────────────────────────────────────────

    pub fn record_failure(
        self: &Arc<Self>,
        service: &str,
        operation: &str,
        error_type: &str,
        err: &StageError,
    ) -> RecordOutcome {
        self.record_failure_at(service, operation, error_type, err, Utc::now())
    }

    pub fn record_failure_at(
        self: &Arc<Self>,
        service: &str,
        operation: &str,
        error_type: &str,
        err: &StageError,
        now: DateTime<Utc>,
    ) -> RecordOutcome {
        let key = PatternKey::new(service, operation, error_type);
        let classification = err.classify();

        let (pattern, trigger) = {
            let mut state = self.state.lock();
            let pattern = state
                .patterns
                .entry(key.clone())
                .or_insert_with(|| FailurePattern {
                    service: service.to_string(),
                    operation: operation.to_string(),
                    error_type: error_type.to_string(),
                    classification,
                    count: 0,
                    first_occurrence: now,
                    last_occurrence: now,
                    action: action_for(service, operation, error_type, classification),
                    escalated: false,
                });
            pattern.count += 1;
            pattern.last_occurrence = now;
            pattern.classification = classification;
            let snapshot = pattern.clone();

            let trigger =
                !state.in_flight.contains(&key) && meets_threshold(&self.config, &snapshot);
            if trigger {
                state.in_flight.insert(key.clone());
            }
            (snapshot, trigger)
        };

        warn!(
            "Failure recorded for {key} ({classification}): {err} [count {}]",
            pattern.count
        );

        if trigger {
            info!(
                "Triggering {} recovery for {key} after {} failures",
                pattern.action.action_type, pattern.count
            );
            let guard = InFlightGuard {
                engine: self.clone(),
                key,
            };
            let engine = self.clone();
            let action = pattern.action;
            tokio::spawn(async move {
                let _ = engine.run_marked(guard, action).await;
            });
        }

        RecordOutcome {
            pattern,
            recovery_triggered: trigger,
        }
    }

    /// Whether this pattern would trigger recovery now. Always false while a
    /// recovery for the same key is in flight.
    pub fn should_trigger_recovery(&self, pattern: &FailurePattern) -> bool {
        let state = self.state.lock();
        !state.in_flight.contains(&pattern.key()) && meets_threshold(&self.config, pattern)
    }

    /// Runs the mapped action for a tracked pattern immediately.
    pub async fn trigger_recovery(
        self: &Arc<Self>,
        key: &PatternKey,
    ) -> Result<RecoveryOutcome, RecoveryError> {
        let action = {
            let mut state = self.state.lock();
            let action = match state.patterns.get(key) {
                Some(pattern) => pattern.action,
                None => return Err(RecoveryError::UnknownPattern(key.to_string())),
            };
            if !state.in_flight.insert(key.clone()) {
                return Err(RecoveryError::AlreadyInFlight(key.to_string()));
            }
            action
        };
        let guard = InFlightGuard {
            engine: self.clone(),
            key: key.clone(),
        };
        self.clone().run_marked(guard, action).await
    }

    /// Skip-marked `(service, operation)` pairs are not attempted until the
    /// pattern that marked them is purged.
    pub fn is_skipped(&self, service: &str, operation: &str) -> bool {
        self.state
            .lock()
            .skipped
            .iter()
            .any(|k| k.service == service && k.operation == operation)
    }

    // ────────────────────────────────────────────
    // Execution
    // ────────────────────────────────────────────

    async fn run_marked(
        self: Arc<Self>,
        guard: InFlightGuard,
        action: RecoveryAction,
    ) -> Result<RecoveryOutcome, RecoveryError> {
        let key = guard.key.clone();
        let result = self.execute(&key, action).await;

        let (outcome, executions, message) = match &result {
            Ok(executions) => (RecoveryOutcome::Succeeded, *executions, None),
            Err(RecoveryError::ManualIntervention(_)) => {
                (RecoveryOutcome::ManualRequired, 0, None)
            }
            Err(RecoveryError::ActionFailed { attempts, message, .. }) => {
                (RecoveryOutcome::Failed, *attempts, Some(message.clone()))
            }
            Err(other) => (RecoveryOutcome::Failed, 0, Some(other.to_string())),
        };

        {
            let mut state = self.state.lock();
            if let Some(pattern) = state.patterns.get_mut(&key) {
                match outcome {
                    RecoveryOutcome::Succeeded => pattern.count = 0,
                    RecoveryOutcome::ManualRequired => pattern.escalated = true,
                    RecoveryOutcome::Failed => {}
                }
            }
            state.history.push_back(RecoveryAttempt {
                key: key.to_string(),
                action: action.action_type,
                outcome,
                executions,
                message,
                at: Utc::now(),
            });
            while state.history.len() > self.config.history_limit {
                state.history.pop_front();
            }
        }
        drop(guard);

        match &result {
            Ok(_) => info!("Recovery for {key} succeeded"),
            Err(RecoveryError::ManualIntervention(_)) => {}
            Err(e) => error!("Recovery for {key} failed: {e}"),
        }
        result.map(|_| outcome).or_else(|e| match e {
            RecoveryError::ManualIntervention(_) => Ok(RecoveryOutcome::ManualRequired),
            other => Err(other),
        })
    }

    /// Returns how many executions it took.
    async fn execute(&self, key: &PatternKey, action: RecoveryAction) -> Result<u32, RecoveryError> {
        match action.action_type {
            RecoveryActionType::Manual => {
                error!("Manual intervention required for {key}");
                Err(RecoveryError::ManualIntervention(key.to_string()))
            }
            RecoveryActionType::Skip => {
                self.state.lock().skipped.insert(key.clone());
                warn!(
                    "Marked {}:{} for silent skip",
                    key.service, key.operation
                );
                Ok(1)
            }
            RecoveryActionType::Retry | RecoveryActionType::Restart => {
                let max_attempts = action.max_attempts.max(1);
                let mut last_error = String::new();
                for attempt in 1..=max_attempts {
                    let outcome = if action.action_type == RecoveryActionType::Retry {
                        self.executor.replay(&key.service).await
                    } else {
                        self.executor.reconnect(&key.service).await
                    };
                    match outcome {
                        Ok(()) => return Ok(attempt),
                        Err(e) => {
                            warn!(
                                "{} for {key} failed (attempt {attempt}/{max_attempts}): {e}",
                                action.action_type
                            );
                            last_error = e.to_string();
                        }
                    }
                    if attempt < max_attempts {
                        tokio::time::sleep(Duration::from_millis(action.backoff_ms)).await;
                    }
                }
                Err(RecoveryError::ActionFailed {
                    key: key.to_string(),
                    attempts: max_attempts,
                    message: last_error,
                })
            }
        }
    }

    // ────────────────────────────────────────────
    // Cleanup
    // ────────────────────────────────────────────

    /// Purges patterns idle for longer than the configured TTL, along with any
    /// skip marks they set. Returns how many were removed.
    pub fn cleanup_stale_patterns_at(&self, now: DateTime<Utc>) -> usize {
        let ttl = chrono::Duration::from_std(self.config.pattern_ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let cutoff = now - ttl;

        let mut state = self.state.lock();
        let stale: Vec<PatternKey> = state
            .patterns
            .iter()
            .filter(|(_, p)| p.last_occurrence < cutoff)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            state.patterns.remove(key);
            state.skipped.remove(key);
        }
        if !stale.is_empty() {
            info!("Purged {} stale failure patterns", stale.len());
        }
        stale.len()
    }

    pub fn cleanup_stale_patterns(&self) -> usize {
        self.cleanup_stale_patterns_at(Utc::now())
    }

    /// Spawns the periodic sweep. Calling it again while a sweep task is
    /// running is a no-op.
    pub fn start_cleanup(self: &Arc<Self>) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return;
        }
        let engine = self.clone();
        let mut shutdown = self.shutdown_tx.subscribe();
        let period = self.config.sweep_interval;
        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.cleanup_stale_patterns();
                    }
                    _ = shutdown.changed() => break,
                }
            }
            info!("Failure pattern sweep stopped");
        }));
    }

    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    // ────────────────────────────────────────────
    // Introspection
    // ────────────────────────────────────────────

    pub fn get_failure_patterns(&self) -> Vec<FailurePattern> {
        let state = self.state.lock();
        let mut patterns: Vec<FailurePattern> = state.patterns.values().cloned().collect();
        patterns.sort_by(|a, b| a.key().cmp(&b.key()));
        patterns
    }

    pub fn get_recovery_status(&self) -> RecoveryStatus {
        let state = self.state.lock();
        let mut in_flight: Vec<String> = state.in_flight.iter().map(|k| k.to_string()).collect();
        in_flight.sort();
        let mut skipped: Vec<String> = state.skipped.iter().map(|k| k.to_string()).collect();
        skipped.sort();
        RecoveryStatus {
            tracked_patterns: state.patterns.len(),
            in_flight,
            skipped,
            recent_attempts: state.history.iter().cloned().collect(),
        }
    }
}

fn meets_threshold(config: &RecoveryConfig, pattern: &FailurePattern) -> bool {
    let by_action = match pattern.action.action_type {
        RecoveryActionType::Retry | RecoveryActionType::Skip => {
            pattern.count >= config.retry_threshold
        }
        RecoveryActionType::Restart => pattern.count >= config.restart_threshold,
        RecoveryActionType::Manual => {
            !pattern.escalated && pattern.count >= config.retry_threshold
        }
    };
    let by_criticality = is_critical(&pattern.service)
        && pattern.count >= config.critical_threshold
        && !(pattern.action.action_type == RecoveryActionType::Manual && pattern.escalated);
    by_action || by_criticality
}
