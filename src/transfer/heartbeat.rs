use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, trace};

use crate::types::token::UploadCancellationToken;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Counters shared between the upload runner (single writer) and the heartbeat monitor.
#[derive(Debug)]
pub struct ActivityState {
    started_at: Instant,
    files: AtomicU64,
    bytes: AtomicU64,
    last_activity_millis: AtomicU64,
}

impl ActivityState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            files: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            last_activity_millis: AtomicU64::new(0),
        }
    }

    pub fn record(&self, files: u64, bytes: u64) {
        self.files.store(files, Ordering::Relaxed);
        self.bytes.store(bytes, Ordering::Relaxed);
        self.last_activity_millis
            .store(self.elapsed_millis(), Ordering::Relaxed);
    }

    pub fn files(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Time since the last completion, or since the start when nothing has completed yet.
    pub fn idle_time(&self) -> Duration {
        let last_activity = self.last_activity_millis.load(Ordering::Relaxed);
        Duration::from_millis(self.elapsed_millis().saturating_sub(last_activity))
    }

    fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for ActivityState {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs a heartbeat whenever nothing has completed for `interval`. Runs until `cancellation_token`
/// is cancelled.
pub fn spawn_heartbeat_monitor(
    activity_state: Arc<ActivityState>,
    interval: Duration,
    cancellation_token: UploadCancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_heartbeat = Instant::now();

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    trace!("heartbeat monitor stopped.");
                    return;
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }

            let idle_time = activity_state.idle_time();
            if idle_time < interval || last_heartbeat.elapsed() < interval {
                continue;
            }

            info!(
                files = activity_state.files(),
                bytes = activity_state.bytes(),
                idle_seconds = idle_time.as_secs(),
                "upload still running. waiting for the transfer tool."
            );
            last_heartbeat = Instant::now();
        }
    })
}
