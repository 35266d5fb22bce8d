//! Running progress of one upload.
//!
//! The tracker only accumulates: completion events may arrive in any order
//! because the transfer tool uploads many files in parallel. Wall-clock time is
//! passed in by the caller (`elapsed` since the start of the upload), which keeps
//! every computation here deterministic.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::ProgressSnapshot;

pub mod format;

const EMIT_INTERVAL: Duration = Duration::from_secs(5);
const EMIT_PERCENT_STEP: f64 = 2.0;
const SNAPSHOT_PERCENT_STEP: f64 = 5.0;
const MIN_ELAPSED_SECS: f64 = 1.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Result of recording one completed file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub files_completed: u64,
    pub bytes_completed: u64,
    pub percent_by_count: Option<f64>,
    pub percent_by_size: Option<f64>,
    pub throughput_mbps: f64,
    pub eta: Option<Duration>,
    /// whether a human-readable progress line should be written for this update
    pub should_emit: bool,
}

#[derive(Debug, Clone, Copy)]
struct EmitMark {
    elapsed: Duration,
    bytes_completed: u64,
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_files: u64,
    total_bytes: u64,
    files_completed: u64,
    bytes_completed: u64,
    started_at: DateTime<Utc>,
    last_emit: Option<EmitMark>,
    last_snapshot_bucket: u64,
    history: Vec<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new(total_files: u64, total_bytes: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            total_files,
            total_bytes,
            files_completed: 0,
            bytes_completed: 0,
            started_at,
            last_emit: None,
            last_snapshot_bucket: 0,
            history: Vec::new(),
        }
    }

    pub fn record_completion(&mut self, size: u64, elapsed: Duration) -> ProgressUpdate {
        self.files_completed += 1;
        self.bytes_completed = self.bytes_completed.saturating_add(size);

        let percent_by_count = percentage(self.files_completed, self.total_files);
        let percent_by_size = percentage(self.bytes_completed, self.total_bytes);

        let should_emit = self.decide_emit(elapsed);
        if should_emit {
            self.last_emit = Some(EmitMark {
                elapsed,
                bytes_completed: self.bytes_completed,
            });
        }

        if let Some(percent) = percent_by_size {
            self.record_snapshot_if_new_bucket(percent, elapsed);
        }

        ProgressUpdate {
            files_completed: self.files_completed,
            bytes_completed: self.bytes_completed,
            percent_by_count,
            percent_by_size,
            throughput_mbps: throughput_mbps(self.bytes_completed, elapsed),
            eta: estimate_eta(self.total_bytes, self.bytes_completed, elapsed),
            should_emit,
        }
    }

    fn decide_emit(&self, elapsed: Duration) -> bool {
        if self.files_completed == 1 || self.files_completed >= self.total_files {
            return true;
        }

        let Some(last_emit) = self.last_emit else {
            return true;
        };

        if elapsed.saturating_sub(last_emit.elapsed) >= EMIT_INTERVAL {
            return true;
        }

        let gained_bytes = self.bytes_completed.saturating_sub(last_emit.bytes_completed);
        percentage(gained_bytes, self.total_bytes)
            .is_some_and(|gained_percent| gained_percent >= EMIT_PERCENT_STEP)
    }

    fn record_snapshot_if_new_bucket(&mut self, percent: f64, elapsed: Duration) {
        let bucket = (percent / SNAPSHOT_PERCENT_STEP).floor() as u64;
        if bucket <= self.last_snapshot_bucket {
            return;
        }
        self.last_snapshot_bucket = bucket;

        let timestamp = chrono::Duration::from_std(elapsed)
            .ok()
            .and_then(|elapsed| self.started_at.checked_add_signed(elapsed))
            .unwrap_or(self.started_at);
        self.history.push(ProgressSnapshot {
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            elapsed_seconds: elapsed.as_secs_f64(),
            bytes: self.bytes_completed,
            files: self.files_completed,
            percent,
        });
    }

    pub fn total_files(&self) -> u64 {
        self.total_files
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn files_completed(&self) -> u64 {
        self.files_completed
    }

    pub fn bytes_completed(&self) -> u64 {
        self.bytes_completed
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn history(&self) -> &[ProgressSnapshot] {
        &self.history
    }

    pub fn into_history(self) -> Vec<ProgressSnapshot> {
        self.history
    }
}

/// `None` when there is nothing to measure against. Clamped to [0, 100].
pub fn percentage(completed: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }

    Some((completed as f64 * 100.0 / total as f64).clamp(0.0, 100.0))
}

/// MB/s with elapsed time floored to one second.
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> f64 {
    let elapsed_secs = elapsed.as_secs_f64().max(MIN_ELAPSED_SECS);
    bytes as f64 / elapsed_secs / BYTES_PER_MB
}

pub fn estimate_eta(total_bytes: u64, bytes_completed: u64, elapsed: Duration) -> Option<Duration> {
    if total_bytes == 0 || bytes_completed == 0 {
        return None;
    }

    let elapsed_secs = elapsed.as_secs_f64().max(MIN_ELAPSED_SECS);
    let bytes_per_sec = bytes_completed as f64 / elapsed_secs;
    let remaining = total_bytes.saturating_sub(bytes_completed) as f64;

    // too far out to represent when the rate is tiny
    Duration::try_from_secs_f64(remaining / bytes_per_sec).ok()
}
