//! The JSON report written once at the end of every run.
//!
//! The report is the contract for tooling that inspects the outcome of an upload after the fact,
//! so field names are stable. It is composed in memory and persisted atomically: readers never see
//! a partially written file.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::Config;
use crate::transfer::{SourceTotals, UploadOutcome};
use crate::types::{
    ChecksumAlgorithm, DATASYNC_REPORT_BASE_NAME_PREFIX, ProgressSnapshot, StorageClass,
    TransferTool, UploadStatus,
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const LOG_FILE_EXTENSION: &str = "log";
const REPORT_FILE_EXTENSION: &str = "json";
const MAX_UNIQUE_BASE_NAME_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReport {
    pub timestamp: String,
    pub status: UploadStatus,
    pub exit_code: i32,
    pub error: Option<String>,
    pub dry_run: bool,
    pub duration_seconds: f64,
    pub files_synced: u64,
    pub failed_files: u64,
    pub total_files: u64,
    pub total_bytes: u64,
    pub actual_bytes_transferred: u64,
    pub throughput_mbps: f64,
    /// bytes counted from completion lines against the bytes measured by the directory scan
    pub progress_accuracy_percent: Option<f64>,
    pub source: String,
    pub destination: String,
    pub checksum_verified: bool,
    pub configuration: ReportConfiguration,
    pub progress_history: Vec<ProgressSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportConfiguration {
    pub tool: TransferTool,
    pub concurrency: u16,
    pub part_size: u64,
    pub worker_size: u16,
    pub retry_count: u32,
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    pub storage_class: Option<StorageClass>,
}

impl ReportConfiguration {
    fn from_config(config: &Config) -> Self {
        let transfer_config = &config.transfer_config;
        Self {
            tool: config.transfer_tool,
            concurrency: transfer_config.concurrency,
            part_size: transfer_config.part_size,
            worker_size: transfer_config.worker_size,
            retry_count: transfer_config.retry_count,
            checksum_algorithm: transfer_config.checksum_algorithm,
            storage_class: transfer_config.storage_class,
        }
    }
}

impl TransferReport {
    /// Report of a run in which the transfer tool was started.
    pub fn from_outcome(
        config: &Config,
        totals: SourceTotals,
        outcome: &UploadOutcome,
        exit_code: i32,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let mut report = Self::base(config, totals, outcome.status, exit_code, finished_at);
        report.error = outcome.error.clone();
        report.duration_seconds = outcome.duration.as_secs_f64();
        report.throughput_mbps = overall_throughput_mbps(totals.total_bytes, outcome.duration);
        report.files_synced = outcome.files_synced;
        report.failed_files = outcome.failed_files;
        report.actual_bytes_transferred = outcome.actual_bytes_transferred;
        report.progress_accuracy_percent =
            progress_accuracy_percent(outcome.actual_bytes_transferred, totals.total_bytes);
        report.progress_history = outcome.progress_history.clone();

        report
    }

    /// Report of a run that stopped before the transfer tool was started.
    pub fn from_error(
        config: &Config,
        totals: SourceTotals,
        error: &anyhow::Error,
        exit_code: i32,
        duration: Duration,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let mut report = Self::base(config, totals, UploadStatus::Failed, exit_code, finished_at);
        report.error = Some(format!("{error:#}"));
        report.duration_seconds = duration.as_secs_f64();
        report.progress_accuracy_percent = progress_accuracy_percent(0, totals.total_bytes);

        report
    }

    fn base(
        config: &Config,
        totals: SourceTotals,
        status: UploadStatus,
        exit_code: i32,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let checksum_verified = config.transfer_config.checksum_algorithm.is_some()
            && status.is_success()
            && !config.dry_run;

        Self {
            timestamp: finished_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            status,
            exit_code,
            error: None,
            dry_run: config.dry_run,
            duration_seconds: 0.0,
            files_synced: 0,
            failed_files: 0,
            total_files: totals.total_files,
            total_bytes: totals.total_bytes,
            actual_bytes_transferred: 0,
            throughput_mbps: 0.0,
            progress_accuracy_percent: None,
            source: config.target.source.to_string_lossy().to_string(),
            destination: config.target.destination_uri(),
            checksum_verified,
            configuration: ReportConfiguration::from_config(config),
            progress_history: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize the transfer report.")
    }

    /// Writes the report to a temporary file in the same directory and renames it into place.
    pub fn write_atomically(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;

        let mut temp_file = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create a temporary file in {}", dir.display()))?;
        temp_file
            .write_all(json.as_bytes())
            .and_then(|_| temp_file.write_all(b"\n"))
            .and_then(|_| temp_file.as_file().sync_all())
            .context("failed to write the transfer report.")?;
        temp_file
            .persist(path)
            .with_context(|| format!("failed to persist the transfer report: {}", path.display()))?;

        debug!(path = path.to_string_lossy().to_string(), "transfer report written.");
        Ok(())
    }
}

/// Log file and report of one run share `datasync-YYYYMMDD-HHMMSS` as their base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub log_file: PathBuf,
    pub report_file: PathBuf,
}

impl ReportPaths {
    pub fn new(log_dir: &Path, started_at: DateTime<Local>) -> Self {
        Self::with_base_name(log_dir, &report_base_name(started_at))
    }

    fn with_base_name(log_dir: &Path, base_name: &str) -> Self {
        Self {
            log_file: log_dir.join(format!("{base_name}.{LOG_FILE_EXTENSION}")),
            report_file: log_dir.join(format!("{base_name}.{REPORT_FILE_EXTENSION}")),
        }
    }

    /// Claims the paths of a new run by creating its log file.
    ///
    /// Runs started in the same second get `-1`, `-2`, ... appended to the base name, so two runs
    /// never write to the same log or report.
    pub fn create_unique(log_dir: &Path, started_at: DateTime<Local>) -> Result<(Self, File)> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

        let base_name = report_base_name(started_at);
        for attempt in 0..MAX_UNIQUE_BASE_NAME_ATTEMPTS {
            let paths = if attempt == 0 {
                Self::with_base_name(log_dir, &base_name)
            } else {
                Self::with_base_name(log_dir, &format!("{base_name}-{attempt}"))
            };
            if paths.report_file.exists() {
                continue;
            }

            match OpenOptions::new()
                .append(true)
                .create_new(true)
                .open(&paths.log_file)
            {
                Ok(file) => return Ok((paths, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("failed to open log file: {}", paths.log_file.display())
                    });
                }
            }
        }

        Err(anyhow!(
            "no free log file name for {base_name} in {}",
            log_dir.display()
        ))
    }
}

pub fn report_base_name(started_at: DateTime<Local>) -> String {
    format!(
        "{DATASYNC_REPORT_BASE_NAME_PREFIX}-{}",
        started_at.format("%Y%m%d-%H%M%S")
    )
}

pub fn overall_throughput_mbps(total_bytes: u64, duration: Duration) -> f64 {
    let duration_secs = duration.as_secs_f64();
    if duration_secs == 0.0 {
        return 0.0;
    }

    total_bytes as f64 / duration_secs / BYTES_PER_MB
}

/// Not clamped: drift in either direction is what this figure exists to show.
pub fn progress_accuracy_percent(actual_bytes: u64, total_bytes: u64) -> Option<f64> {
    if total_bytes == 0 {
        return None;
    }

    Some(actual_bytes as f64 * 100.0 / total_bytes as f64)
}
