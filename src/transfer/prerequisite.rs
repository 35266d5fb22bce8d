use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::Config;
use crate::transfer::command::build_destination_check_command;
use crate::types::error::DatasyncError;

/// Runs every check in order and stops at the first failure.
/// Returns the resolved path of the transfer tool.
pub async fn validate_prerequisites(config: &Config) -> Result<PathBuf> {
    let program = find_transfer_tool(config)?;
    debug!(program = program.to_string_lossy().to_string(), "transfer tool found.");

    check_source(&config.target.source)?;

    if config.check_destination {
        check_destination(config, &program).await?;
        info!(
            destination = config.target.bucket_uri(),
            "destination is reachable."
        );
    } else {
        debug!("destination check skipped.");
    }

    Ok(program)
}

pub fn find_transfer_tool(config: &Config) -> Result<PathBuf, DatasyncError> {
    let tool = config.transfer_tool.program_name();

    if let Some(tool_path) = &config.tool_path {
        if is_executable_file(tool_path) {
            return Ok(tool_path.clone());
        }
        return Err(DatasyncError::ToolNotFound {
            tool: tool_path.to_string_lossy().to_string(),
        });
    }

    std::env::var_os("PATH")
        .and_then(|paths| find_in_paths(tool, &paths))
        .ok_or_else(|| DatasyncError::ToolNotFound {
            tool: tool.to_string(),
        })
}

pub fn find_in_paths(name: &str, paths: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable_file(candidate))
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

pub fn check_source(path: &Path) -> Result<(), DatasyncError> {
    let path_string = path.to_string_lossy().to_string();
    if !path.is_dir() {
        return Err(DatasyncError::SourceNotFound { path: path_string });
    }

    std::fs::read_dir(path).map_err(|e| DatasyncError::SourceNotReadable {
        path: path_string,
        reason: e.to_string(),
    })?;

    Ok(())
}

/// Lists the destination bucket with the transfer tool itself, so credentials and endpoint are
/// exercised exactly as the upload will use them.
pub async fn check_destination(config: &Config, program: &Path) -> Result<(), DatasyncError> {
    let command = build_destination_check_command(config, program);
    let uri = config.target.bucket_uri();
    let timeout = Duration::from_secs(config.destination_check_timeout_secs);
    debug!(command = command.display_command_line(), "checking destination.");

    let output = tokio::time::timeout(timeout, command.to_tokio_command().output())
        .await
        .map_err(|_| DatasyncError::DestinationUnreachable {
            uri: uri.clone(),
            reason: format!("timed out after {} seconds", timeout.as_secs()),
        })?
        .map_err(|e| DatasyncError::DestinationUnreachable {
            uri: uri.clone(),
            reason: e.to_string(),
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let reason = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map_or_else(|| output.status.to_string(), |line| line.trim().to_string());

    Err(DatasyncError::DestinationUnreachable { uri, reason })
}
