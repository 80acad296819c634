//! # Resource Probe
//!
//! Best-effort host CPU and memory sampling. Probing never fails a benchmark:
//! when the platform cannot be queried every field reads as zero.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sysinfo::System;
use tracing::debug;

/// Host utilization at one point in time, both in `[0, 100]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl ResourceSample {
    pub fn new(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            cpu_percent: clamp_percent(cpu_percent),
            memory_percent: clamp_percent(memory_percent),
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Source of host resource readings
#[async_trait]
pub trait ResourceProbe: Send + Sync {
    /// Instantaneous reading; CPU is relative to the previous sample.
    async fn sample(&self) -> ResourceSample;

    /// Reading whose CPU figure is averaged over `interval`.
    async fn sample_over(&self, interval: Duration) -> ResourceSample;

    /// Total physical memory in bytes, 0 when unknown
    fn total_memory_bytes(&self) -> u64 {
        0
    }
}

/// Probe backed by the `sysinfo` crate
pub struct SystemProbe {
    system: Mutex<System>,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        if sysinfo::IS_SUPPORTED_SYSTEM {
            system.refresh_cpu_usage();
            system.refresh_memory();
        }
        Self {
            system: Mutex::new(system),
        }
    }

    fn read(&self) -> ResourceSample {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            debug!("Resource probing is not supported on this platform");
            return ResourceSample::default();
        }

        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.refresh_memory();

        let cpu_percent = system.global_cpu_usage() as f64;
        let total = system.total_memory();
        let memory_percent = if total > 0 {
            system.used_memory() as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        ResourceSample::new(cpu_percent, memory_percent)
    }

    fn prime_cpu(&self) {
        if sysinfo::IS_SUPPORTED_SYSTEM {
            self.system.lock().refresh_cpu_usage();
        }
    }
}

#[async_trait]
impl ResourceProbe for SystemProbe {
    async fn sample(&self) -> ResourceSample {
        self.read()
    }

    async fn sample_over(&self, interval: Duration) -> ResourceSample {
        // The lock is never held across the sleep.
        self.prime_cpu();
        tokio::time::sleep(interval.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
        self.read()
    }

    fn total_memory_bytes(&self) -> u64 {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return 0;
        }
        let mut system = self.system.lock();
        system.refresh_memory();
        system.total_memory()
    }
}
