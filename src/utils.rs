//! # Utility Functions and Helper Module
//!
//! Helpers shared across the workload benchmark: human-readable formatting,
//! parameter validation, system information and console table output.
//!
//! ## Key Functionality Categories
//!
//! - **Formatting**: Human-readable display of durations, rates and report values
//! - **Validation**: Input parameter validation with clear error messages
//! - **System Information**: CPU core detection and run identifiers
//! - **Display Helpers**: Table formatting for the end-of-run summary
//!
//! ## Usage Examples
//!
//! ```rust
//! use workload_bench::utils::*;
//! use std::time::Duration;
//!
//! let duration_str = format_duration(Duration::from_micros(1500));
//! assert_eq!(duration_str, "1.50ms");
//!
//! # fn main() -> anyhow::Result<()> {
//! validate_concurrency(10)?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Upper bound on throughput-phase concurrency
pub const MAX_CONCURRENCY: usize = 1024;

/// Generate a unique identifier for a benchmark run
///
/// Creates a UUID v4 string used to tell apart reports produced by
/// repeated runs against the same deployment.
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Format a duration in a human-readable way
///
/// Converts a Duration to a human-readable string, automatically selecting
/// the most appropriate unit based on the magnitude.
///
/// ## Unit Selection Logic
///
/// - **Nanoseconds**: < 1,000 ns (e.g., "500ns")
/// - **Microseconds**: < 1,000,000 ns (e.g., "1.50μs")
/// - **Milliseconds**: < 1,000,000,000 ns (e.g., "25.75ms")
/// - **Seconds**: < 60 seconds (e.g., "5.25s")
/// - **Minutes and Hours**: For longer durations (e.g., "5m 30s", "2h 15m 30s")
///
/// ## Examples
///
/// ```rust
/// # use workload_bench::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_nanos(750)), "750ns");
/// assert_eq!(format_duration(Duration::from_nanos(1250)), "1.25μs");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ns = duration.as_nanos();

    if total_ns < 1_000 {
        format!("{}ns", total_ns)
    } else if total_ns < 1_000_000 {
        format!("{:.2}μs", total_ns as f64 / 1_000.0)
    } else if total_ns < 1_000_000_000 {
        format!("{:.2}ms", total_ns as f64 / 1_000_000.0)
    } else if total_ns < 60_000_000_000 {
        format!("{:.2}s", total_ns as f64 / 1_000_000_000.0)
    } else {
        // For longer durations, use compound format (hours, minutes, seconds)
        let seconds = duration.as_secs();
        let minutes = seconds / 60;
        let remaining_seconds = seconds % 60;

        if minutes < 60 {
            format!("{}m {}s", minutes, remaining_seconds)
        } else {
            let hours = minutes / 60;
            let remaining_minutes = minutes % 60;
            format!("{}h {}m {}s", hours, remaining_minutes, remaining_seconds)
        }
    }
}

/// Format a request rate for display
///
/// ```rust
/// # use workload_bench::utils::format_request_rate;
/// assert_eq!(format_request_rate(512.0), "512.00 req/s");
/// assert_eq!(format_request_rate(1500.0), "1.50K req/s");
/// ```
pub fn format_request_rate(requests_per_second: f64) -> String {
    if requests_per_second < 1_000.0 {
        format!("{:.2} req/s", requests_per_second)
    } else if requests_per_second < 1_000_000.0 {
        format!("{:.2}K req/s", requests_per_second / 1_000.0)
    } else {
        format!("{:.2}M req/s", requests_per_second / 1_000_000.0)
    }
}

/// Render a report value for a console table cell
///
/// Floats get four decimal places, arrays are summarized by length.
pub fn format_report_value(value: &Value) -> String {
    match value {
        Value::Number(n) if n.is_f64() => format!("{:.4}", n.as_f64().unwrap_or_default()),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => format!("[{} item(s)]", items.len()),
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Validate the throughput-phase concurrency level
///
/// ## Validation Rules
///
/// - **Minimum**: 1 worker (prevent zero concurrency)
/// - **Maximum**: 1024 workers (prevent resource exhaustion)
pub fn validate_concurrency(concurrency: usize) -> Result<()> {
    if concurrency == 0 {
        anyhow::bail!("Concurrency cannot be zero");
    }
    if concurrency > MAX_CONCURRENCY {
        anyhow::bail!(
            "Concurrency {} is too high (maximum {})",
            concurrency,
            MAX_CONCURRENCY
        );
    }
    Ok(())
}

/// Validate an endpoint path
///
/// Paths are joined onto the target base URL, so they must be non-empty and
/// must not carry their own scheme or host.
pub fn validate_endpoint_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        anyhow::bail!("Endpoint path cannot be empty");
    }
    if path.contains("://") {
        anyhow::bail!(
            "Endpoint path '{}' must be relative to the target URL",
            path
        );
    }
    Ok(())
}

/// Get the number of CPU cores available
///
/// Uses the `num_cpus` crate, which accounts for container limits and
/// process affinity.
pub fn get_cpu_cores() -> usize {
    num_cpus::get()
}

/// Print a table row with proper column alignment
///
/// ## Examples
///
/// ```rust
/// # use workload_bench::utils::{print_table_row, print_table_separator};
/// let widths = [24, 16];
/// print_table_separator(&widths);
/// print_table_row(&["Metric", "Value"], &widths);
/// print_table_separator(&widths);
/// print_table_row(&["throughput_rps", "812.5000"], &widths);
/// print_table_separator(&widths);
/// ```
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    print!("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        print!(" {:width$} |", column, width = width);
    }
    println!();
}

/// Print a table separator
///
/// ```text
/// +--------------------------+------------------+
/// | Metric                   | Value            |
/// +--------------------------+------------------+
/// ```
pub fn print_table_separator(widths: &[usize]) {
    print!("+");
    for &width in widths {
        print!("{}", "-".repeat(width + 2));
        print!("+");
    }
    println!();
}
