//! Load Guard: samples process-host resource usage and sheds generation work
//! when memory or CPU is past its threshold.
//!
//! The sampler sits behind `ResourceProbe` so tests can inject fixed readings.
//! `run_scoped` wraps an admitted unit of work and runs the registered
//! reclamation hooks once it finishes, whatever its outcome.

use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use sysinfo::System;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MEMORY_THRESHOLD: f64 = 0.8;
pub const DEFAULT_CPU_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadSnapshot {
    /// 0.0 to 1.0
    pub cpu_fraction: f64,
    /// 0.0 to 1.0
    pub memory_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadThresholds {
    pub memory: f64,
    pub cpu: f64,
}

impl Default for LoadThresholds {
    fn default() -> Self {
        Self {
            memory: DEFAULT_MEMORY_THRESHOLD,
            cpu: DEFAULT_CPU_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error(
    "server is under heavy load (memory {:.0}%, cpu {:.0}%)",
    .snapshot.memory_fraction * 100.0,
    .snapshot.cpu_fraction * 100.0
)]
pub struct OverloadError {
    pub snapshot: LoadSnapshot,
}

pub trait ResourceProbe: Send + Sync {
    fn sample(&self) -> LoadSnapshot;
}

/// Best-effort cleanup run after each guarded unit of work.
pub trait Reclaim: Send + Sync {
    fn reclaim(&self);
}

/// Host readings via `sysinfo`. CPU usage is measured between consecutive
/// samples, so the very first reading reports 0.
pub struct SysinfoProbe {
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SysinfoProbe {
    fn sample(&self) -> LoadSnapshot {
        let mut system = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        system.refresh_memory();
        system.refresh_cpu();

        let total = system.total_memory();
        let memory_fraction = if total == 0 {
            0.0
        } else {
            system.used_memory() as f64 / total as f64
        };
        let cpu_fraction = f64::from(system.global_cpu_info().cpu_usage()) / 100.0;

        LoadSnapshot {
            cpu_fraction: cpu_fraction.clamp(0.0, 1.0),
            memory_fraction: memory_fraction.clamp(0.0, 1.0),
        }
    }
}

#[derive(Clone)]
pub struct LoadGuard {
    probe: Arc<dyn ResourceProbe>,
    thresholds: LoadThresholds,
    reclaimers: Vec<Arc<dyn Reclaim>>,
}

impl LoadGuard {
    pub fn new(probe: Arc<dyn ResourceProbe>, thresholds: LoadThresholds) -> Self {
        Self {
            probe,
            thresholds,
            reclaimers: Vec::new(),
        }
    }

    pub fn with_reclaimer(mut self, reclaimer: Arc<dyn Reclaim>) -> Self {
        self.reclaimers.push(reclaimer);
        self
    }

    pub fn snapshot(&self) -> LoadSnapshot {
        self.probe.sample()
    }

    pub fn is_overloaded(&self) -> bool {
        self.exceeds(&self.snapshot())
    }

    fn exceeds(&self, snapshot: &LoadSnapshot) -> bool {
        snapshot.memory_fraction > self.thresholds.memory || snapshot.cpu_fraction > self.thresholds.cpu
    }

    /// Rejects new work while the host is past either threshold.
    pub fn admit(&self) -> Result<(), OverloadError> {
        let snapshot = self.snapshot();
        if self.exceeds(&snapshot) {
            warn!(
                memory = snapshot.memory_fraction,
                cpu = snapshot.cpu_fraction,
                "Rejecting generation work: host overloaded"
            );
            return Err(OverloadError { snapshot });
        }
        Ok(())
    }

    /// Runs `work`, then the reclamation hooks, then yields to the scheduler.
    pub async fn run_scoped<F, T>(&self, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let output = work.await;

        for reclaimer in &self.reclaimers {
            reclaimer.reclaim();
        }
        debug!(hooks = self.reclaimers.len(), "Scoped work finished, resources reclaimed");

        tokio::task::yield_now().await;
        output
    }
}
