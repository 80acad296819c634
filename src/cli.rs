use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults;

/// Workload Benchmark - drives CPU, memory, parallel and throughput
/// measurements against a running workload service
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Base URL of the service under test
    #[clap(short = 'u', long, default_value = defaults::TARGET_URL, help_heading = "Core Options")]
    pub url: String,

    /// Number of requests issued by the throughput phase
    #[clap(short = 'n', long, default_value_t = defaults::REQUESTS, help_heading = "Core Options")]
    pub requests: usize,

    /// Maximum number of in-flight requests during the throughput phase
    #[clap(short = 'c', long, default_value_t = defaults::CONCURRENCY, help_heading = "Core Options")]
    pub concurrency: usize,

    /// Output file for the benchmark report (JSON format)
    #[clap(short = 'o', long, default_value = defaults::OUTPUT_FILE, help_heading = "Core Options")]
    pub output: PathBuf,

    /// Per-request timeout for the throughput phase
    #[clap(long, default_value = "10s", value_parser = parse_duration, help_heading = "Timing")]
    pub request_timeout: Duration,

    /// Timeout for the idle health request
    #[clap(long, default_value = "5s", value_parser = parse_duration, help_heading = "Timing")]
    pub health_timeout: Duration,

    /// Timeout for the cpu, parallel and memory task requests
    #[clap(long, default_value = "30s", value_parser = parse_duration, help_heading = "Timing")]
    pub task_timeout: Duration,

    /// Maximum number of health polls while waiting for startup
    #[clap(long, default_value_t = defaults::STARTUP_ATTEMPTS, help_heading = "Timing")]
    pub startup_attempts: u32,

    /// Pause between failed startup polls
    #[clap(long, default_value = "1s", value_parser = parse_duration, help_heading = "Timing")]
    pub startup_interval: Duration,

    /// Timeout of a single startup poll
    #[clap(long, default_value = "1s", value_parser = parse_duration, help_heading = "Timing")]
    pub startup_timeout: Duration,

    /// Window over which the host CPU baseline is sampled
    #[clap(long, default_value = "1s", value_parser = parse_duration, help_heading = "Timing")]
    pub baseline_interval: Duration,

    /// Health check endpoint
    #[clap(long, default_value = "/health", help_heading = "Endpoints")]
    pub health_path: String,

    /// CPU-bound workload endpoint
    #[clap(long, default_value = "/cpu-intensive", help_heading = "Endpoints")]
    pub cpu_path: String,

    /// Parallel workload endpoint
    #[clap(long, default_value = "/parallel-task", help_heading = "Endpoints")]
    pub parallel_path: String,

    /// Memory-bound workload endpoint
    #[clap(long, default_value = "/memory-test", help_heading = "Endpoints")]
    pub memory_path: String,

    /// Endpoint hammered by the throughput phase
    #[clap(long, default_value = "/", help_heading = "Endpoints")]
    pub throughput_path: String,

    /// Include run metadata (version, timestamp, host info) in the report
    #[clap(long, default_value_t = false)]
    pub with_metadata: bool,

    /// Only log warnings and errors
    #[clap(short = 'q', long, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write logs to this file
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Log level derived from the quiet/verbose flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::WARN;
        }
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

/// Parse duration from string (e.g., "500ms", "10s", "5m", "1h")
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Duration must be a non-negative number: {}", s));
    }

    let secs = match unit {
        "ms" => num / 1000.0,
        "s" => num,
        "m" => num * 60.0,
        "h" => num * 3600.0,
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Duration::try_from_secs_f64(secs)
        .map_err(|e| format!("Duration {} is out of range: {}", s, e))
}
