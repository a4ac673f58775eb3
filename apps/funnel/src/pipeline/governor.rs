//! Resource governor: admission control for stage jobs.

use std::collections::HashSet;

use parking_lot::Mutex;
use sysinfo::System;
use tracing::debug;
use uuid::Uuid;

pub trait ResourceGovernor: Send + Sync {
    fn can_start_new_job(&self) -> bool;
    fn register_job(&self, job_id: Uuid);
    fn unregister_job(&self, job_id: Uuid);
    fn active_jobs(&self) -> usize;
    /// Whether a worker currently holds `job_id`.
    fn is_active(&self, job_id: Uuid) -> bool;
}

/// Fraction (0.0 – 1.0) of system memory in use.
pub trait MemoryProbe: Send + Sync {
    fn used_ratio(&self) -> f64;
}

pub struct SystemMemoryProbe {
    system: Mutex<System>,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn used_ratio(&self) -> f64 {
        let mut system = self.system.lock();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return 0.0;
        }
        system.used_memory() as f64 / total as f64
    }
}

#[derive(Debug, Clone)]
pub struct GovernorConfig {
    pub max_concurrent_jobs: usize,
    /// Refuse admissions above this memory ratio. `None` disables the check.
    pub max_memory_ratio: Option<f64>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 8,
            max_memory_ratio: None,
        }
    }
}

/// In-process governor. The active set is a `HashSet`, so registering the
/// same job twice never double counts.
pub struct InMemoryGovernor {
    config: GovernorConfig,
    probe: Box<dyn MemoryProbe>,
    active: Mutex<HashSet<Uuid>>,
}

impl InMemoryGovernor {
    pub fn new(config: GovernorConfig, probe: Box<dyn MemoryProbe>) -> Self {
        Self {
            config,
            probe,
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_system_memory(config: GovernorConfig) -> Self {
        Self::new(config, Box::new(SystemMemoryProbe::new()))
    }
}

impl ResourceGovernor for InMemoryGovernor {
    fn can_start_new_job(&self) -> bool {
        let active = self.active.lock().len();
        if active >= self.config.max_concurrent_jobs {
            debug!(
                "Admission refused: {active}/{} jobs active",
                self.config.max_concurrent_jobs
            );
            return false;
        }
        if let Some(limit) = self.config.max_memory_ratio {
            let used = self.probe.used_ratio();
            if used > limit {
                debug!("Admission refused: memory at {:.0}%", used * 100.0);
                return false;
            }
        }
        true
    }

    fn register_job(&self, job_id: Uuid) {
        self.active.lock().insert(job_id);
    }

    fn unregister_job(&self, job_id: Uuid) {
        self.active.lock().remove(&job_id);
    }

    fn active_jobs(&self) -> usize {
        self.active.lock().len()
    }

    fn is_active(&self, job_id: Uuid) -> bool {
        self.active.lock().contains(&job_id)
    }
}

#[cfg(test)]
pub(crate) struct FixedMemory(pub f64);

#[cfg(test)]
impl MemoryProbe for FixedMemory {
    fn used_ratio(&self) -> f64 {
        self.0
    }
}
