//! # Measurement Phases
//!
//! Each measurer issues requests through a [`TargetClient`] and returns a
//! typed output that knows which report fields it owns. Measurers never
//! fail: an unreachable endpoint, a non-200 status or a body without the
//! expected field all degrade to zero-valued output, so one dead endpoint
//! does not abort the remaining phases.
//!
//! ## Report Keys
//!
//! Every phase owns a disjoint set of keys (see [`Phase::report_keys`]).
//! All time values are reported as seconds.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::client::{TargetClient, TargetResponse};
use crate::driver::LoadDriver;
use crate::metrics::ThroughputStats;
use crate::probe::ResourceProbe;
use crate::utils::{format_duration, format_request_rate};

/// The measurement phases, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Startup,
    IdleMemory,
    CpuLoad,
    Throughput,
    ParallelTask,
    MemoryTask,
}

impl Phase {
    /// All phases in the order the orchestrator runs them
    pub const ALL: [Phase; 6] = [
        Phase::Startup,
        Phase::IdleMemory,
        Phase::CpuLoad,
        Phase::Throughput,
        Phase::ParallelTask,
        Phase::MemoryTask,
    ];

    /// Report keys owned by this phase, in report order
    pub fn report_keys(self) -> &'static [&'static str] {
        match self {
            Phase::Startup => &["startup_time"],
            Phase::IdleMemory => &["memory_usage_idle", "cpu_usage_idle"],
            Phase::CpuLoad => &["cpu_execution_time", "cpu_usage_under_load", "total_cpu_time"],
            Phase::Throughput => &[
                "throughput_rps",
                "avg_response_time",
                "min_response_time",
                "max_response_time",
                "success_rate",
                "total_requests",
                "successful_requests",
            ],
            Phase::ParallelTask => &[
                "parallel_execution_time",
                "parallel_cpu_usage",
                "parallel_results",
            ],
            Phase::MemoryTask => &[
                "memory_execution_time",
                "memory_usage_peak",
                "memory_items_created",
            ],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Startup => write!(f, "Startup"),
            Phase::IdleMemory => write!(f, "Idle Memory"),
            Phase::CpuLoad => write!(f, "CPU Load"),
            Phase::Throughput => write!(f, "Throughput"),
            Phase::ParallelTask => write!(f, "Parallel Task"),
            Phase::MemoryTask => write!(f, "Memory Task"),
        }
    }
}

/// Output of one phase, convertible into report fields
pub trait PhaseOutput {
    fn phase(&self) -> Phase;

    /// Report fields in [`Phase::report_keys`] order
    fn fields(&self) -> Vec<(&'static str, Value)>;
}

fn number_field(body: Option<&Value>, key: &str) -> f64 {
    body.and_then(|b| b.get(key))
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn count_field(body: Option<&Value>, key: &str) -> u64 {
    match body.and_then(|b| b.get(key)) {
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64))
            .unwrap_or(0),
        None => 0,
    }
}

fn array_field(body: Option<&Value>, key: &str) -> Vec<Value> {
    body.and_then(|b| b.get(key))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn log_degraded(phase: Phase, path: &str, response: &TargetResponse) {
    match &response.outcome.error {
        Some(error) => warn!("{} phase degraded, GET {} failed: {}", phase, path, error),
        None => warn!(
            "{} phase degraded, GET {} returned status {}",
            phase, path, response.outcome.status_code
        ),
    }
}

/// Parameters of the startup wait
#[derive(Debug, Clone)]
pub struct StartupSettings {
    pub path: String,
    pub max_attempts: u32,
    pub interval: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartupOutput {
    /// Time until healthy, or until the attempt budget ran out
    pub startup_time: Duration,
    pub attempts: u32,
    pub healthy: bool,
}

impl PhaseOutput for StartupOutput {
    fn phase(&self) -> Phase {
        Phase::Startup
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![("startup_time", json!(self.startup_time.as_secs_f64()))]
    }
}

/// Poll the health endpoint until it answers 200 or `max_attempts` polls
/// have failed, sleeping `interval` between failed polls.
///
/// The elapsed time is reported either way.
pub async fn measure_startup(client: &TargetClient, settings: &StartupSettings) -> StartupOutput {
    info!("Measuring startup time...");

    let started = Instant::now();
    let mut attempts = 0;
    let mut healthy = false;

    while attempts < settings.max_attempts {
        attempts += 1;
        let response = client.get(&settings.path, settings.request_timeout).await;
        if response.is_success() {
            healthy = true;
            break;
        }
        debug!(
            "Health poll {}/{} not ready (status {})",
            attempts, settings.max_attempts, response.outcome.status_code
        );
        if attempts < settings.max_attempts {
            tokio::time::sleep(settings.interval).await;
        }
    }

    let startup_time = started.elapsed();
    if healthy {
        info!(
            "Startup time: {} ({} attempt(s))",
            format_duration(startup_time),
            attempts
        );
    } else {
        warn!(
            "Service not healthy after {} attempts, gave up after {}",
            attempts,
            format_duration(startup_time)
        );
    }

    StartupOutput {
        startup_time,
        attempts,
        healthy,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdleMemoryOutput {
    pub memory_usage: f64,
    pub cpu_usage: f64,
}

impl PhaseOutput for IdleMemoryOutput {
    fn phase(&self) -> Phase {
        Phase::IdleMemory
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("memory_usage_idle", json!(self.memory_usage)),
            ("cpu_usage_idle", json!(self.cpu_usage)),
        ]
    }
}

/// Read the service-reported memory usage from one health call
pub async fn measure_idle_memory(
    client: &TargetClient,
    path: &str,
    timeout: Duration,
) -> IdleMemoryOutput {
    info!("Measuring memory usage...");

    let response = client.get(path, timeout).await;
    if !response.is_success() {
        log_degraded(Phase::IdleMemory, path, &response);
    }
    let body = response.json();

    if let Some(status) = body.as_ref().and_then(|b| b.get("status")).and_then(Value::as_str) {
        debug!("Service reports status '{}'", status);
    }

    let output = IdleMemoryOutput {
        memory_usage: number_field(body.as_ref(), "memory_usage"),
        cpu_usage: number_field(body.as_ref(), "cpu_usage"),
    };
    info!("Memory usage (idle): {}%", output.memory_usage);
    output
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuLoadOutput {
    /// Server-side execution time, seconds
    pub execution_time: f64,
    pub cpu_usage: f64,
    /// Client-side wall time of the request
    pub total_time: Duration,
    /// Host CPU before the request; logged, not reported
    pub baseline_cpu: f64,
}

impl PhaseOutput for CpuLoadOutput {
    fn phase(&self) -> Phase {
        Phase::CpuLoad
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("cpu_execution_time", json!(self.execution_time)),
            ("cpu_usage_under_load", json!(self.cpu_usage)),
            ("total_cpu_time", json!(self.total_time.as_secs_f64())),
        ]
    }
}

/// Sample a host CPU baseline, then trigger the CPU-bound endpoint
pub async fn measure_cpu_load(
    client: &TargetClient,
    probe: &dyn ResourceProbe,
    path: &str,
    timeout: Duration,
    baseline_interval: Duration,
) -> CpuLoadOutput {
    info!("Measuring CPU utilization...");

    let baseline = probe.sample_over(baseline_interval).await;
    debug!("Baseline host CPU: {:.1}%", baseline.cpu_percent);

    let started = Instant::now();
    let response = client.get(path, timeout).await;
    let total_time = started.elapsed();

    if !response.is_success() {
        log_degraded(Phase::CpuLoad, path, &response);
    }
    let body = response.json();

    let output = CpuLoadOutput {
        execution_time: number_field(body.as_ref(), "execution_time"),
        cpu_usage: number_field(body.as_ref(), "cpu_usage"),
        total_time,
        baseline_cpu: baseline.cpu_percent,
    };
    info!("CPU execution time: {:.2} seconds", output.execution_time);
    info!("CPU usage under load: {}%", output.cpu_usage);
    output
}

/// Parameters of the throughput burst
#[derive(Debug, Clone)]
pub struct ThroughputSettings {
    pub path: String,
    pub total_requests: usize,
    pub concurrency: usize,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThroughputOutput {
    pub stats: ThroughputStats,
}

impl PhaseOutput for ThroughputOutput {
    fn phase(&self) -> Phase {
        Phase::Throughput
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        let stats = &self.stats;
        vec![
            ("throughput_rps", json!(stats.throughput_rps)),
            ("avg_response_time", json!(stats.avg_response_time.as_secs_f64())),
            ("min_response_time", json!(stats.min_response_time.as_secs_f64())),
            ("max_response_time", json!(stats.max_response_time.as_secs_f64())),
            ("success_rate", json!(stats.success_rate)),
            ("total_requests", json!(stats.total_requests)),
            ("successful_requests", json!(stats.successful_requests)),
        ]
    }
}

/// Drive a concurrent burst and report its statistics
pub async fn measure_throughput(
    driver: &LoadDriver,
    settings: &ThroughputSettings,
) -> ThroughputOutput {
    info!(
        "Measuring throughput with {} requests, concurrency {}...",
        settings.total_requests, settings.concurrency
    );

    let stats = driver
        .run(
            &settings.path,
            settings.total_requests,
            settings.concurrency,
            settings.request_timeout,
        )
        .await;

    info!("Throughput: {}", format_request_rate(stats.throughput_rps));
    info!(
        "Average response time: {:.3} seconds",
        stats.avg_response_time.as_secs_f64()
    );
    info!("Success rate: {:.1}%", stats.success_rate);
    if stats.failed_requests() > 0 {
        warn!(
            "{} of {} throughput requests failed",
            stats.failed_requests(),
            stats.total_requests
        );
    }

    ThroughputOutput { stats }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParallelTaskOutput {
    pub execution_time: f64,
    pub cpu_usage: f64,
    /// Per-worker results returned by the endpoint
    pub results: Vec<Value>,
}

impl PhaseOutput for ParallelTaskOutput {
    fn phase(&self) -> Phase {
        Phase::ParallelTask
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("parallel_execution_time", json!(self.execution_time)),
            ("parallel_cpu_usage", json!(self.cpu_usage)),
            ("parallel_results", Value::Array(self.results.clone())),
        ]
    }
}

pub async fn measure_parallel_task(
    client: &TargetClient,
    path: &str,
    timeout: Duration,
) -> ParallelTaskOutput {
    info!("Measuring parallel processing performance...");

    let response = client.get(path, timeout).await;
    if !response.is_success() {
        log_degraded(Phase::ParallelTask, path, &response);
    }
    let body = response.json();

    let output = ParallelTaskOutput {
        execution_time: number_field(body.as_ref(), "execution_time"),
        cpu_usage: number_field(body.as_ref(), "cpu_usage"),
        results: array_field(body.as_ref(), "results"),
    };
    info!("Parallel execution time: {:.2} seconds", output.execution_time);
    info!("Parallel CPU usage: {}%", output.cpu_usage);
    output
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTaskOutput {
    pub execution_time: f64,
    pub memory_usage: f64,
    pub items_created: u64,
}

impl PhaseOutput for MemoryTaskOutput {
    fn phase(&self) -> Phase {
        Phase::MemoryTask
    }

    fn fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("memory_execution_time", json!(self.execution_time)),
            ("memory_usage_peak", json!(self.memory_usage)),
            ("memory_items_created", json!(self.items_created)),
        ]
    }
}

pub async fn measure_memory_task(
    client: &TargetClient,
    path: &str,
    timeout: Duration,
) -> MemoryTaskOutput {
    info!("Measuring memory intensive task...");

    let response = client.get(path, timeout).await;
    if !response.is_success() {
        log_degraded(Phase::MemoryTask, path, &response);
    }
    let body = response.json();

    let output = MemoryTaskOutput {
        execution_time: number_field(body.as_ref(), "execution_time"),
        memory_usage: number_field(body.as_ref(), "memory_usage"),
        items_created: count_field(body.as_ref(), "items_created"),
    };
    info!("Memory execution time: {:.2} seconds", output.execution_time);
    info!("Peak memory usage: {}%", output.memory_usage);
    info!("Items created: {}", output.items_created);
    output
}
