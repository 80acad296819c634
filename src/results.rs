use crate::phases::{Phase, PhaseOutput};
use crate::utils::{format_report_value, get_cpu_cores, print_table_row, print_table_separator};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Key conflicts between phases
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("report key '{key}' is owned by the {owner} phase and cannot be written by the {phase} phase")]
    KeyConflict {
        key: String,
        owner: Phase,
        phase: Phase,
    },
}

/// Ordered mapping from metric name to value, filled phase by phase
///
/// Keys keep insertion order. Each key belongs to the phase that first wrote
/// it; a different phase writing the same key is rejected.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkReport {
    fields: Map<String, Value>,
    owners: HashMap<String, Phase>,
}

impl BenchmarkReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, phase: Phase, key: &str, value: Value) -> Result<(), ReportError> {
        self.check_owner(phase, key)?;
        self.owners.insert(key.to_string(), phase);
        self.fields.insert(key.to_string(), value);
        Ok(())
    }

    /// Merge every field of a phase output.
    ///
    /// Either all fields are written or, on a conflict, none are.
    pub fn merge(&mut self, output: &dyn PhaseOutput) -> Result<(), ReportError> {
        let phase = output.phase();
        let fields = output.fields();

        for (key, _) in &fields {
            self.check_owner(phase, key)?;
        }
        for (key, value) in fields {
            self.record(phase, key, value)?;
        }

        debug!("Merged {} phase into report", phase);
        Ok(())
    }

    fn check_owner(&self, phase: Phase, key: &str) -> Result<(), ReportError> {
        match self.owners.get(key) {
            Some(&owner) if owner != phase => Err(ReportError::KeyConflict {
                key: key.to_string(),
                owner,
                phase,
            }),
            _ => Ok(()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn owner_of(&self, key: &str) -> Option<Phase> {
        self.owners.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Serialize for BenchmarkReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Host information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub memory_gb: f64,
    pub benchmark_version: String,
}

impl SystemInfo {
    /// Collect information about the host running the benchmark client
    pub fn collect(total_memory_bytes: u64) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: get_cpu_cores(),
            memory_gb: total_memory_bytes as f64 / (1024.0 * 1024.0 * 1024.0),
            benchmark_version: crate::VERSION.to_string(),
        }
    }
}

/// Optional run description written next to the phase fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub version: String,
    pub run_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub target: String,
    pub total_requests: usize,
    pub concurrency: usize,
    pub system_info: SystemInfo,
}

/// Key under which [`RunMetadata`] is written
pub const METADATA_KEY: &str = "metadata";

/// Writes the final report exactly once
///
/// `finalize` consumes the manager, so a report can never be appended to or
/// rewritten through the same manager.
pub struct ResultsManager {
    output_file: PathBuf,
    metadata: Option<RunMetadata>,
}

impl ResultsManager {
    pub fn new<P: AsRef<Path>>(output_file: P) -> Self {
        Self {
            output_file: output_file.as_ref().to_path_buf(),
            metadata: None,
        }
    }

    /// Attach run metadata to the persisted document
    pub fn with_metadata(mut self, metadata: RunMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Render the document that `finalize` would write
    pub fn render(&self, report: &BenchmarkReport) -> Result<String> {
        let json = match &self.metadata {
            Some(metadata) => {
                let mut document = report.as_map().clone();
                document.insert(
                    METADATA_KEY.to_string(),
                    serde_json::to_value(metadata).context("Failed to serialize run metadata")?,
                );
                serde_json::to_string_pretty(&document)
            }
            None => serde_json::to_string_pretty(report),
        }
        .context("Failed to serialize benchmark report")?;

        Ok(json)
    }

    /// Write the report to the output file
    pub fn finalize(self, report: &BenchmarkReport) -> Result<PathBuf> {
        info!("Finalizing benchmark results");

        let json = self.render(report)?;
        std::fs::write(&self.output_file, json).with_context(|| {
            format!(
                "Failed to write benchmark report to {}",
                self.output_file.display()
            )
        })?;

        info!("Results saved to {}", self.output_file.display());
        Ok(self.output_file)
    }
}

/// Print the report as a two-column console table, grouped by phase
pub fn print_summary(report: &BenchmarkReport) {
    let key_width = report
        .keys()
        .map(str::len)
        .chain(std::iter::once("Metric".len()))
        .max()
        .unwrap_or(6);
    let widths = [14, key_width, 18];

    print_table_separator(&widths);
    print_table_row(&["Phase", "Metric", "Value"], &widths);
    print_table_separator(&widths);
    for (key, value) in report.iter() {
        let phase = report
            .owner_of(key)
            .map(|p| p.to_string())
            .unwrap_or_default();
        let value = format_report_value(value);
        print_table_row(&[phase.as_str(), key, value.as_str()], &widths);
    }
    print_table_separator(&widths);
}
