use std::io;
use std::io::Write;

use async_channel::Receiver;
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use datasync::transfer::SourceTotals;
use datasync::types::UploadStatistics;

const REFRESH_INTERVAL: f32 = 1.0;

/// Draws a one-line summary of the upload on stderr until the statistics channel is closed.
pub fn show_indicator(
    stats_receiver: Receiver<UploadStatistics>,
    totals: SourceTotals,
    show_progress: bool,
    show_result: bool,
    dry_run: bool,
) -> JoinHandle<()> {
    let progress_style = ProgressStyle::with_template("{wide_msg}").unwrap();
    let progress_text = ProgressBar::new(0);
    progress_text.set_style(progress_style);

    tokio::spawn(async move {
        let start_time = Instant::now();

        let mut total_upload_count: u64 = 0;
        let mut total_upload_bytes: u64 = 0;
        let mut total_error_count: u64 = 0;
        let mut total_warning_count: u64 = 0;

        loop {
            let mut upload_bytes: u64 = 0;

            let period = Instant::now();
            loop {
                while let Ok(upload_stats) = stats_receiver.try_recv() {
                    match upload_stats {
                        UploadStatistics::UploadComplete { .. } => {
                            total_upload_count += 1;
                        }
                        UploadStatistics::UploadBytes(size) => {
                            upload_bytes += size;
                            total_upload_bytes += size;
                        }
                        UploadStatistics::UploadError { .. } => {
                            total_error_count += 1;
                        }
                        UploadStatistics::UploadWarning { .. } => {
                            total_warning_count += 1;
                        }
                    }
                }

                if REFRESH_INTERVAL < period.elapsed().as_secs_f32() {
                    break;
                }

                if stats_receiver.is_closed() {
                    let elapsed = start_time.elapsed();
                    let elapsed_secs_f64 = elapsed.as_secs_f64();

                    let mut upload_bytes_per_sec =
                        (total_upload_bytes as f64 / elapsed_secs_f64) as u64;
                    if elapsed_secs_f64 < REFRESH_INTERVAL as f64 {
                        upload_bytes_per_sec = total_upload_bytes;
                    }
                    if dry_run {
                        upload_bytes_per_sec = 0;
                    }

                    if show_result {
                        progress_text.set_style(ProgressStyle::with_template("{msg}").unwrap());

                        progress_text.finish_with_message(format!(
                            "{:>3}/{} | {:>3}/sec,  uploaded {}/{} files,  failed {} files,  warning {} files,  duration {}",
                            HumanBytes(total_upload_bytes),
                            HumanBytes(totals.total_bytes),
                            HumanBytes(upload_bytes_per_sec),
                            total_upload_count,
                            totals.total_files,
                            total_error_count,
                            total_warning_count,
                            HumanDuration(elapsed),
                        ));

                        println!();
                        let _ = io::stdout().flush();
                    }

                    return;
                }

                tokio::time::sleep(std::time::Duration::from_secs_f32(0.05)).await;
            }

            let upload_bytes_per_sec = if dry_run {
                0
            } else {
                (upload_bytes as f64 / period.elapsed().as_secs_f64()) as u64
            };

            if show_progress {
                progress_text.set_message(format!(
                    "{:>3}/{} | {:>3}/sec,  uploaded {}/{} files,  failed {} files,  warning {} files",
                    HumanBytes(total_upload_bytes),
                    HumanBytes(totals.total_bytes),
                    HumanBytes(upload_bytes_per_sec),
                    total_upload_count,
                    totals.total_files,
                    total_error_count,
                    total_warning_count,
                ));
            }
        }
    })
}
