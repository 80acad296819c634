//! # Benchmark Engine Module
//!
//! Configuration and orchestration of a complete benchmark run.
//!
//! ## Key Components
//!
//! - **BenchmarkConfig**: every parameter of a run, built from CLI arguments
//! - **BenchmarkRunner**: runs the six phases strictly one after another and
//!   merges their output into a single [`BenchmarkReport`]
//!
//! ## Test Execution Lifecycle
//!
//! 1. **Startup**: wait for the health endpoint, recording how long it took
//! 2. **Idle memory**: one health call while the service is idle
//! 3. **CPU load**: host CPU baseline, then the CPU-bound endpoint
//! 4. **Throughput**: bounded concurrent burst against the throughput endpoint
//! 5. **Parallel task**: the parallel endpoint
//! 6. **Memory task**: the memory-bound endpoint
//!
//! Phases degrade instead of failing, so `run` only returns an error for
//! conditions that make the report itself invalid.

use crate::{
    cli::Args,
    client::{Target, TargetClient},
    defaults,
    driver::LoadDriver,
    phases::{self, StartupSettings, ThroughputSettings},
    probe::{ResourceProbe, SystemProbe},
    results::{BenchmarkReport, RunMetadata, SystemInfo},
    utils::{format_duration, generate_run_id, validate_concurrency, validate_endpoint_path},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Endpoint paths of the service under test
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointPaths {
    pub health: String,
    pub cpu: String,
    pub parallel: String,
    pub memory: String,
    pub throughput: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            health: defaults::HEALTH_PATH.to_string(),
            cpu: defaults::CPU_PATH.to_string(),
            parallel: defaults::PARALLEL_PATH.to_string(),
            memory: defaults::MEMORY_PATH.to_string(),
            throughput: defaults::THROUGHPUT_PATH.to_string(),
        }
    }
}

impl EndpointPaths {
    fn validate(&self) -> Result<()> {
        for path in [
            &self.health,
            &self.cpu,
            &self.parallel,
            &self.memory,
            &self.throughput,
        ] {
            validate_endpoint_path(path)?;
        }
        Ok(())
    }
}

/// Configuration for a benchmark run
///
/// Constructed once at startup and immutable for the life of the run.
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Base URL of the service under test
    pub target_url: String,

    /// Number of requests issued by the throughput phase
    pub total_requests: usize,

    /// Maximum in-flight requests during the throughput phase
    pub concurrency: usize,

    /// Per-request timeout in the throughput phase
    pub request_timeout: Duration,

    /// Timeout of the idle health request
    pub health_timeout: Duration,

    /// Timeout of the CPU, parallel and memory task requests
    pub task_timeout: Duration,

    /// Health polls before startup gives up
    pub startup_attempts: u32,

    /// Pause between failed health polls
    pub startup_interval: Duration,

    /// Timeout of a single health poll
    pub startup_timeout: Duration,

    /// Window for the host CPU baseline sample
    pub baseline_interval: Duration,

    pub paths: EndpointPaths,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            target_url: defaults::TARGET_URL.to_string(),
            total_requests: defaults::REQUESTS,
            concurrency: defaults::CONCURRENCY,
            request_timeout: defaults::REQUEST_TIMEOUT,
            health_timeout: defaults::HEALTH_TIMEOUT,
            task_timeout: defaults::TASK_TIMEOUT,
            startup_attempts: defaults::STARTUP_ATTEMPTS,
            startup_interval: defaults::STARTUP_INTERVAL,
            startup_timeout: defaults::STARTUP_TIMEOUT,
            baseline_interval: defaults::BASELINE_INTERVAL,
            paths: EndpointPaths::default(),
        }
    }
}

impl BenchmarkConfig {
    /// Create benchmark configuration from CLI arguments
    ///
    /// ## Validation
    /// - The target URL must be an absolute http(s) URL
    /// - Concurrency must be within 1..=1024
    /// - Endpoint paths must be non-empty and relative
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Self {
            target_url: args.url.clone(),
            total_requests: args.requests,
            concurrency: args.concurrency,
            request_timeout: args.request_timeout,
            health_timeout: args.health_timeout,
            task_timeout: args.task_timeout,
            startup_attempts: args.startup_attempts,
            startup_interval: args.startup_interval,
            startup_timeout: args.startup_timeout,
            baseline_interval: args.baseline_interval,
            paths: EndpointPaths {
                health: args.health_path.clone(),
                cpu: args.cpu_path.clone(),
                parallel: args.parallel_path.clone(),
                memory: args.memory_path.clone(),
                throughput: args.throughput_path.clone(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Target::parse(&self.target_url).context("Invalid target URL")?;
        validate_concurrency(self.concurrency)?;
        self.paths.validate()?;
        Ok(())
    }

    fn startup_settings(&self) -> StartupSettings {
        StartupSettings {
            path: self.paths.health.clone(),
            max_attempts: self.startup_attempts,
            interval: self.startup_interval,
            request_timeout: self.startup_timeout,
        }
    }

    fn throughput_settings(&self) -> ThroughputSettings {
        ThroughputSettings {
            path: self.paths.throughput.clone(),
            total_requests: self.total_requests,
            concurrency: self.concurrency,
            request_timeout: self.request_timeout,
        }
    }
}

/// A helper struct to display the run configuration in one log entry
struct BenchmarkConfigDisplay<'a> {
    config: &'a BenchmarkConfig,
    target: &'a Target,
}

impl<'a> std::fmt::Display for BenchmarkConfigDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "-----------------------------------------------------------------"
        )?;
        writeln!(f, "Starting full benchmark for: {}", self.target)?;
        writeln!(
            f,
            "  Throughput:         {} requests, concurrency {}",
            self.config.total_requests, self.config.concurrency
        )?;
        writeln!(
            f,
            "  Request Timeout:    {}",
            format_duration(self.config.request_timeout)
        )?;
        writeln!(
            f,
            "  Task Timeout:       {}",
            format_duration(self.config.task_timeout)
        )?;
        writeln!(
            f,
            "  Startup Polling:    {} attempts, {} apart",
            self.config.startup_attempts,
            format_duration(self.config.startup_interval)
        )?;
        write!(
            f,
            "-----------------------------------------------------------------"
        )
    }
}

/// Runs the measurement phases against one target
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    client: TargetClient,
    probe: Arc<dyn ResourceProbe>,
}

impl BenchmarkRunner {
    /// Create a runner that samples the local host with [`SystemProbe`]
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        Self::with_probe(config, Arc::new(SystemProbe::new()))
    }

    /// Create a runner with a custom resource probe
    pub fn with_probe(config: BenchmarkConfig, probe: Arc<dyn ResourceProbe>) -> Result<Self> {
        config.validate()?;
        let target = Target::parse(&config.target_url).context("Invalid target URL")?;
        let client = TargetClient::new(target).context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            client,
            probe,
        })
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn target(&self) -> &Target {
        self.client.target()
    }

    /// Run all phases in order and return the populated report.
    ///
    /// Individual phase failures degrade to zero-valued fields; an error here
    /// means the report could not be assembled.
    pub async fn run(&self) -> Result<BenchmarkReport> {
        info!(
            "{}",
            BenchmarkConfigDisplay {
                config: &self.config,
                target: self.client.target(),
            }
        );

        let started = Instant::now();
        let mut report = BenchmarkReport::new();
        let paths = &self.config.paths;

        let startup = phases::measure_startup(&self.client, &self.config.startup_settings()).await;
        report.merge(&startup)?;

        let idle = phases::measure_idle_memory(&self.client, &paths.health, self.config.health_timeout)
            .await;
        report.merge(&idle)?;

        let cpu = phases::measure_cpu_load(
            &self.client,
            self.probe.as_ref(),
            &paths.cpu,
            self.config.task_timeout,
            self.config.baseline_interval,
        )
        .await;
        report.merge(&cpu)?;

        let driver = LoadDriver::new(self.client.clone());
        let throughput =
            phases::measure_throughput(&driver, &self.config.throughput_settings()).await;
        report.merge(&throughput)?;

        let parallel =
            phases::measure_parallel_task(&self.client, &paths.parallel, self.config.task_timeout)
                .await;
        report.merge(&parallel)?;

        let memory =
            phases::measure_memory_task(&self.client, &paths.memory, self.config.task_timeout)
                .await;
        report.merge(&memory)?;

        info!(
            "Benchmark completed in {}",
            format_duration(started.elapsed())
        );
        Ok(report)
    }

    /// Describe this run for the optional report metadata
    pub fn run_metadata(&self) -> RunMetadata {
        RunMetadata {
            version: crate::VERSION.to_string(),
            run_id: generate_run_id(),
            timestamp: chrono::Utc::now(),
            target: self.client.target().to_string(),
            total_requests: self.config.total_requests,
            concurrency: self.config.concurrency,
            system_info: SystemInfo::collect(self.probe.total_memory_bytes()),
        }
    }
}
