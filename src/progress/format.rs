use std::time::Duration;

use indicatif::HumanBytes;

use crate::progress::ProgressUpdate;

const UNKNOWN: &str = "unknown";

pub fn format_eta(eta: Option<Duration>) -> String {
    let Some(eta) = eta else {
        return UNKNOWN.to_string();
    };

    let secs = eta.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

pub fn format_percent(percent: Option<f64>) -> String {
    percent.map_or_else(|| "n/a".to_string(), |percent| format!("{percent:.1}%"))
}

/// One human-readable progress line, e.g.
/// `3/10 files (30.0%), 3.00 MiB/10.00 MiB (30.0%), 1.00 MB/s, ETA 7s`.
pub fn format_progress_line(update: &ProgressUpdate, total_files: u64, total_bytes: u64) -> String {
    format!(
        "{}/{} files ({}), {}/{} ({}), {:.2} MB/s, ETA {}",
        update.files_completed,
        total_files,
        format_percent(update.percent_by_count),
        HumanBytes(update.bytes_completed),
        HumanBytes(total_bytes),
        format_percent(update.percent_by_size),
        update.throughput_mbps,
        format_eta(update.eta),
    )
}
