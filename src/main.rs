//! # Workload Benchmark - Main Entry Point
//!
//! Runs the full benchmark suite against one workload service and writes a
//! single JSON report.
//!
//! ## Architecture Overview
//!
//! 1. **Initialize logging**: colored console output, optional log file
//! 2. **Parse arguments**: command-line configuration
//! 3. **Create benchmark config**: validate and convert CLI args
//! 4. **Run phases**: startup, idle memory, CPU load, throughput, parallel, memory
//! 5. **Persist results**: write the report once and print a summary
//!
//! ## Exit Status
//!
//! Phases degrade to zero-valued fields instead of failing, so the process
//! exits 0 whenever a report was written, however much of the target was
//! unreachable. A non-zero exit means invalid configuration or an
//! unwritable report.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use workload_bench::{
    benchmark::{BenchmarkConfig, BenchmarkRunner},
    cli::Args,
    logging,
    results::{print_summary, ResultsManager},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Held until exit so the file writer flushes.
    let _log_guard = logging::init(args.log_level(), args.log_file.as_deref())?;

    info!("Starting Workload Benchmark v{}", workload_bench::VERSION);
    tracing::debug!("Configuration: {:?}", args);

    let config = BenchmarkConfig::from_args(&args)?;
    let runner = BenchmarkRunner::new(config)?;

    let report = runner.run().await?;

    let mut results_manager = ResultsManager::new(&args.output);
    if args.with_metadata {
        results_manager = results_manager.with_metadata(runner.run_metadata());
    }

    match results_manager.finalize(&report) {
        Ok(_) => {
            if !args.quiet {
                print_summary(&report);
            }
            info!("Benchmark completed!");
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}
