//! # Workload Benchmark Library
//!
//! A benchmarking client for HTTP services that expose synthetic workload
//! endpoints (CPU-bound, memory-bound and parallel tasks) next to a health
//! check. The harness measures how quickly a deployment becomes healthy,
//! what the service reports while idle and under each workload, and how many
//! requests per second it sustains under bounded concurrency.
//!
//! ## Measurement Phases
//!
//! Phases always run one after another, in this order:
//!
//! 1. **Startup**: poll the health endpoint until it answers 200 or the attempt budget runs out
//! 2. **Idle memory**: read the service-reported memory usage from one health call
//! 3. **CPU load**: trigger the CPU-bound endpoint and record its reported timings
//! 4. **Throughput**: fan out N requests over C concurrent workers and reduce the outcomes
//! 5. **Parallel task**: trigger the parallel endpoint
//! 6. **Memory task**: trigger the memory-bound endpoint
//!
//! Every phase degrades to zero-valued fields instead of failing, so a
//! partially dead target still yields a complete report. Only failing to
//! persist the report is fatal.
//!
//! ## Architecture Overview
//!
//! - `benchmark`: configuration and the phase orchestrator
//! - `cli`: command-line parsing
//! - `client`: timed HTTP GETs against the target
//! - `driver`: the bounded concurrent load driver
//! - `metrics`: throughput/latency reduction
//! - `phases`: the individual measurers
//! - `probe`: host CPU and memory sampling
//! - `results`: the ordered report and its persistence
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use workload_bench::{BenchmarkConfig, BenchmarkRunner, ResultsManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BenchmarkConfig::default();
//!     let runner = BenchmarkRunner::new(config)?;
//!     let report = runner.run().await?;
//!
//!     ResultsManager::new("benchmark_results.json").finalize(&report)?;
//!     Ok(())
//! }
//! ```

/// Benchmark configuration and orchestration
///
/// Holds `BenchmarkConfig`, built from CLI arguments, and `BenchmarkRunner`,
/// which runs the six phases in order and merges their output into one report.
pub mod benchmark;

/// Command-line interface
pub mod cli;

/// HTTP access to the service under test
///
/// `TargetClient` issues a single timed GET and never returns an error:
/// transport failures become failed `RequestOutcome`s.
pub mod client;

/// Bounded concurrent request fan-out used by the throughput phase
pub mod driver;

pub mod logging;

/// Throughput and response-time statistics
pub mod metrics;

/// The individual measurement phases
pub mod phases;

/// Best-effort host resource sampling
pub mod probe;

/// Report accumulation, persistence and console summary
pub mod results;

pub mod utils;

pub use benchmark::{BenchmarkConfig, BenchmarkRunner};
pub use cli::Args;
pub use client::{RequestOutcome, Target, TargetClient, TargetResponse};
pub use driver::LoadDriver;
pub use metrics::ThroughputStats;
pub use phases::Phase;
pub use probe::{ResourceProbe, ResourceSample, SystemProbe};
pub use results::{BenchmarkReport, ResultsManager};

/// The current version of the workload benchmark
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// These mirror the behavior of the reference harness so that reports stay
/// comparable across runs and deployments.
pub mod defaults {
    use std::time::Duration;

    /// Default base URL of the service under test
    pub const TARGET_URL: &str = "http://localhost:5000";

    /// Default number of requests for the throughput phase
    pub const REQUESTS: usize = 100;

    /// Default number of in-flight throughput requests
    pub const CONCURRENCY: usize = 10;

    /// Default output file name
    pub const OUTPUT_FILE: &str = "benchmark_results.json";

    /// Maximum number of health polls while waiting for the service
    pub const STARTUP_ATTEMPTS: u32 = 30;

    /// Pause between failed health polls
    pub const STARTUP_INTERVAL: Duration = Duration::from_secs(1);

    /// Timeout of a single health poll during startup
    pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(1);

    /// Timeout of the idle health request
    pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

    /// Timeout of the CPU, parallel and memory task requests
    ///
    /// These endpoints do real work server-side, so they get a generous budget.
    pub const TASK_TIMEOUT: Duration = Duration::from_secs(30);

    /// Per-request timeout in the throughput phase
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Window over which the host CPU baseline is sampled
    pub const BASELINE_INTERVAL: Duration = Duration::from_secs(1);

    pub const HEALTH_PATH: &str = "/health";
    pub const CPU_PATH: &str = "/cpu-intensive";
    pub const PARALLEL_PATH: &str = "/parallel-task";
    pub const MEMORY_PATH: &str = "/memory-test";
    pub const THROUGHPUT_PATH: &str = "/";
}
