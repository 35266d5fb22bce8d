use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_channel::{Receiver, Sender};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::Config;
use crate::progress::ProgressTracker;
use crate::progress::format::format_progress_line;
use crate::transfer::command::TransferCommand;
use crate::transfer::completion::{CompletionLine, parse_completion_line};
use crate::transfer::guard::check_upload_only;
use crate::transfer::heartbeat::{ActivityState, spawn_heartbeat_monitor};
use crate::transfer::scan::SourceTotals;
use crate::types::error::DatasyncError;
use crate::types::token::UploadCancellationToken;
use crate::types::{ProgressSnapshot, UploadStatistics, UploadStatus};

/// What the transfer tool did, as observed from its output and exit status.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub status: UploadStatus,
    pub tool_exit_code: Option<i32>,
    pub error: Option<String>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub files_synced: u64,
    pub failed_files: u64,
    pub actual_bytes_transferred: u64,
    pub progress_history: Vec<ProgressSnapshot>,
}

pub struct Uploader {
    config: Config,
    command: TransferCommand,
    totals: SourceTotals,
    cancellation_token: UploadCancellationToken,
    stats_sender: Sender<UploadStatistics>,
    stats_receiver: Receiver<UploadStatistics>,
    activity_state: Arc<ActivityState>,
}

struct LineCounters {
    tracker: ProgressTracker,
    failed_files: u64,
}

impl Uploader {
    pub fn new(
        config: Config,
        command: TransferCommand,
        totals: SourceTotals,
        cancellation_token: UploadCancellationToken,
    ) -> Self {
        let (stats_sender, stats_receiver) = async_channel::unbounded();

        Self {
            config,
            command,
            totals,
            cancellation_token,
            stats_sender,
            stats_receiver,
            activity_state: Arc::new(ActivityState::new()),
        }
    }

    pub fn get_stats_receiver(&self) -> Receiver<UploadStatistics> {
        self.stats_receiver.clone()
    }

    /// Runs the transfer tool once and follows its output until it exits.
    ///
    /// A destructive flag or a failure to start the tool is returned as an error and nothing is
    /// transferred. Everything after the tool has started, including a non-zero exit status and
    /// cancellation, is reported through the returned [`UploadOutcome`].
    pub async fn run(&self) -> Result<UploadOutcome> {
        let result = self.run_transfer_tool().await;
        self.stats_sender.close();

        result
    }

    async fn run_transfer_tool(&self) -> Result<UploadOutcome> {
        check_upload_only(&self.command.flags())?;

        let started_at = Utc::now();
        let start_instant = Instant::now();

        info!(
            source = self.config.target.source.to_string_lossy().to_string(),
            destination = self.config.target.destination_uri(),
            total_files = self.totals.total_files,
            total_bytes = self.totals.total_bytes,
            dry_run = self.config.dry_run,
            "upload started."
        );
        debug!(command = self.command.display_command_line(), "spawning transfer tool.");

        let heartbeat_token = self.cancellation_token.child_token();
        let _heartbeat_guard = heartbeat_token.clone().drop_guard();
        spawn_heartbeat_monitor(
            self.activity_state.clone(),
            Duration::from_secs(self.config.heartbeat_interval_secs),
            heartbeat_token,
        );

        let mut child = self.command.to_tokio_command().spawn().map_err(|e| {
            DatasyncError::TransferFailed(format!(
                "failed to start {}: {e}",
                self.command.program.to_string_lossy()
            ))
        })?;

        let mut counters = LineCounters {
            tracker: ProgressTracker::new(
                self.totals.total_files,
                self.totals.total_bytes,
                started_at,
            ),
            failed_files: 0,
        };

        let exit_status = self
            .follow_output(&mut child, &mut counters, start_instant)
            .await;
        let duration = start_instant.elapsed();

        let LineCounters {
            tracker,
            failed_files,
        } = counters;
        let files_synced = tracker.files_completed();
        let actual_bytes_transferred = tracker.bytes_completed();

        let (status, tool_exit_code, error, cancelled) = match exit_status {
            None => (
                UploadStatus::Failed,
                None,
                Some(DatasyncError::Cancelled.to_string()),
                true,
            ),
            Some(Err(e)) => (
                UploadStatus::Failed,
                None,
                Some(format!("failed to wait for the transfer tool: {e}")),
                false,
            ),
            Some(Ok(exit_status)) if exit_status.success() => {
                (UploadStatus::Success, exit_status.code(), None, false)
            }
            Some(Ok(exit_status)) => (
                UploadStatus::Failed,
                exit_status.code(),
                Some(format!("transfer tool exited with {exit_status}")),
                false,
            ),
        };

        let duration_sec = format!("{:.3}", duration.as_secs_f64());
        if status.is_success() {
            if failed_files != 0 {
                warn!(
                    failed_files = failed_files,
                    "transfer tool reported failed files but exited successfully."
                );
            }
            info!(
                success = true,
                files_synced = files_synced,
                bytes = actual_bytes_transferred,
                duration_sec = duration_sec,
                "upload completed."
            );
        } else {
            error!(
                files_synced = files_synced,
                failed_files = failed_files,
                bytes = actual_bytes_transferred,
                duration_sec = duration_sec,
                error = error.as_deref().unwrap_or_default(),
                "upload failed."
            );
        }

        Ok(UploadOutcome {
            status,
            tool_exit_code,
            error,
            cancelled,
            started_at,
            duration,
            files_synced,
            failed_files,
            actual_bytes_transferred,
            progress_history: tracker.into_history(),
        })
    }

    /// Returns `None` when cancelled. The child is killed in that case.
    async fn follow_output(
        &self,
        child: &mut Child,
        counters: &mut LineCounters,
        start_instant: Instant,
    ) -> Option<std::io::Result<ExitStatus>> {
        let mut stdout_lines = child.stdout.take().map(OutputLines::new);
        let mut stderr_lines = child.stderr.take().map(OutputLines::new);

        while stdout_lines.is_some() || stderr_lines.is_some() {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    return self.kill_child(child).await;
                }
                line = next_line(&mut stdout_lines), if stdout_lines.is_some() => {
                    match line {
                        Ok(Some(line)) => {
                            self.handle_stdout_line(&line, counters, start_instant).await;
                        }
                        Ok(None) => stdout_lines = None,
                        Err(e) => {
                            warn!(error = e.to_string(), "failed to read stdout of the transfer tool.");
                            stdout_lines = None;
                        }
                    }
                }
                line = next_line(&mut stderr_lines), if stderr_lines.is_some() => {
                    match line {
                        Ok(Some(line)) => {
                            if !line.trim().is_empty() {
                                warn!(tool = self.config.transfer_tool.program_name(), "{}", line.trim());
                            }
                        }
                        Ok(None) => stderr_lines = None,
                        Err(e) => {
                            warn!(error = e.to_string(), "failed to read stderr of the transfer tool.");
                            stderr_lines = None;
                        }
                    }
                }
            }
        }

        tokio::select! {
            biased;

            _ = self.cancellation_token.cancelled() => self.kill_child(child).await,
            exit_status = child.wait() => Some(exit_status),
        }
    }

    async fn kill_child(&self, child: &mut Child) -> Option<std::io::Result<ExitStatus>> {
        warn!("upload cancelled. stopping the transfer tool.");
        if let Err(e) = child.kill().await {
            warn!(error = e.to_string(), "failed to kill the transfer tool.");
        }

        None
    }

    async fn handle_stdout_line(
        &self,
        line: &str,
        counters: &mut LineCounters,
        start_instant: Instant,
    ) {
        match parse_completion_line(self.config.transfer_tool, line) {
            CompletionLine::Completed { path } => {
                let size = self.local_file_size(&path).await;
                let update = counters
                    .tracker
                    .record_completion(size, start_instant.elapsed());
                self.activity_state
                    .record(update.files_completed, update.bytes_completed);

                trace!(path = path, size = size, "file uploaded.");
                self.send_stats(UploadStatistics::UploadBytes(size)).await;
                self.send_stats(UploadStatistics::UploadComplete { path })
                    .await;

                if update.should_emit {
                    info!(
                        "{}",
                        format_progress_line(
                            &update,
                            counters.tracker.total_files(),
                            counters.tracker.total_bytes()
                        )
                    );
                }
            }
            CompletionLine::Failed { message } => {
                counters.failed_files += 1;
                error!(tool = self.config.transfer_tool.program_name(), "{}", message);
                self.send_stats(UploadStatistics::UploadError { message })
                    .await;
            }
            CompletionLine::Other => {
                debug!(tool = self.config.transfer_tool.program_name(), "{}", line);
            }
        }
    }

    /// The size is read from the local file. A file that vanished counts as 0 bytes.
    async fn local_file_size(&self, path: &str) -> u64 {
        match tokio::fs::metadata(Path::new(path)).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!(
                    path = path,
                    error = e.to_string(),
                    "failed to get the size of the uploaded file. counted as 0 bytes."
                );
                self.send_stats(UploadStatistics::UploadWarning {
                    path: path.to_string(),
                })
                .await;

                0
            }
        }
    }

    async fn send_stats(&self, stats: UploadStatistics) {
        let _ = self.stats_sender.send(stats).await;
    }
}

/// Lines of the tool's output as raw bytes, decoded lossily.
///
/// Paths the tool prints are not guaranteed to be UTF-8, so an undecodable line must not end the
/// reading. The partial line is kept in `line` so a read interrupted by `select!` resumes intact.
struct OutputLines<R> {
    reader: BufReader<R>,
    line: Vec<u8>,
}

impl<R: AsyncRead + Unpin> OutputLines<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            line: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.line).await?;
        if read == 0 && self.line.is_empty() {
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.line);
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }

        Ok(Some(decode_output_line(line)))
    }
}

fn decode_output_line(line: Vec<u8>) -> String {
    match String::from_utf8(line) {
        Ok(line) => line,
        Err(e) => {
            let line = String::from_utf8_lossy(e.as_bytes()).into_owned();
            debug!(line = line, "transfer tool printed a line that is not valid UTF-8.");
            line
        }
    }
}

async fn next_line<R>(lines: &mut Option<OutputLines<R>>) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await,
        None => Ok(None),
    }
}
