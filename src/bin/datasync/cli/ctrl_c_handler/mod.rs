use std::io;

use tokio::task::JoinHandle;
use tokio::{select, signal};
use tracing::{debug, error, warn};

use datasync::types::token::UploadCancellationToken;

/// Cancels the upload on ctrl-c, or on SIGTERM from a scheduler on unix.
pub fn spawn_ctrl_c_handler(cancellation_token: UploadCancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        select! {
            _ = cancellation_token.cancelled() => {
                debug!("cancellation_token canceled.")
            }
            result = wait_for_shutdown_signal() => {
                match result {
                    Ok(signal_name) => {
                        warn!(signal = signal_name, "shutdown signal received, stopping the transfer tool.");
                        cancellation_token.cancel();
                    }
                    Err(e) => {
                        error!("failed to listen for shutdown signals: {e}");
                    }
                }
            }
        }
    })
}

#[cfg(target_family = "unix")]
async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    select! {
        result = signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(target_family = "unix"))]
async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    signal::ctrl_c().await.map(|_| "ctrl-c")
}
