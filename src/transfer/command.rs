use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::warn;

use crate::Config;
use crate::types::{S3Credentials, TransferTool};

const ENV_AWS_PROFILE: &str = "AWS_PROFILE";
const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const ENV_AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
const ENV_AWS_REGION: &str = "AWS_REGION";
const ENV_AWS_MAX_ATTEMPTS: &str = "AWS_MAX_ATTEMPTS";

const REDACTED_ENVS: &[&str] = &[ENV_AWS_SECRET_ACCESS_KEY, ENV_AWS_SESSION_TOKEN];

/// A fully assembled invocation of the transfer tool.
#[derive(Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl TransferCommand {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    fn env(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.envs.push((key.to_string(), value.into()));
        self
    }

    /// Arguments that look like flags. This is what the upload-only guard inspects.
    pub fn flags(&self) -> Vec<&str> {
        self.args
            .iter()
            .map(String::as_str)
            .filter(|arg| arg.starts_with('-'))
            .collect()
    }

    /// Command line for logging. Environment values are never included.
    pub fn display_command_line(&self) -> String {
        let mut command_line = self.program.to_string_lossy().to_string();
        for arg in &self.args {
            command_line.push(' ');
            command_line.push_str(arg);
        }
        command_line
    }

    pub fn to_tokio_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl Debug for TransferCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let envs: Vec<(&str, &str)> = self
            .envs
            .iter()
            .map(|(key, value)| {
                if REDACTED_ENVS.contains(&key.as_str()) {
                    (key.as_str(), "** redacted **")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();

        f.debug_struct("TransferCommand")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("envs", &envs)
            .finish()
    }
}

pub fn build_transfer_command(config: &Config, program: &Path) -> TransferCommand {
    let mut command = TransferCommand::new(program);
    match config.transfer_tool {
        TransferTool::S5cmd => build_s5cmd_sync(config, &mut command),
        TransferTool::AwsCli => build_aws_cli_sync(config, &mut command),
    }
    add_credential_envs(config, &mut command);

    command
}

/// Lists the destination bucket. Used to check that it is reachable with the given credentials.
pub fn build_destination_check_command(config: &Config, program: &Path) -> TransferCommand {
    let mut command = TransferCommand::new(program);
    match config.transfer_tool {
        TransferTool::S5cmd => {
            if let Some(endpoint_url) = &config.endpoint_url {
                command.arg("--endpoint-url").arg(endpoint_url);
            }
            command.arg("ls").arg(config.target.bucket_uri());
        }
        TransferTool::AwsCli => {
            command.arg("s3").arg("ls").arg(config.target.bucket_uri());
            if let Some(endpoint_url) = &config.endpoint_url {
                command.arg("--endpoint-url").arg(endpoint_url);
            }
        }
    }
    add_credential_envs(config, &mut command);

    command
}

fn build_s5cmd_sync(config: &Config, command: &mut TransferCommand) {
    let transfer_config = &config.transfer_config;

    if config.json_output {
        command.arg("--json");
    }
    if config.dry_run {
        command.arg("--dry-run");
    }
    if let Some(endpoint_url) = &config.endpoint_url {
        command.arg("--endpoint-url").arg(endpoint_url);
    }
    command
        .arg("--numworkers")
        .arg(transfer_config.worker_size.to_string())
        .arg("--retry-count")
        .arg(transfer_config.retry_count.to_string());

    command
        .arg("sync")
        .arg("--concurrency")
        .arg(transfer_config.concurrency.to_string())
        .arg("--part-size")
        .arg(transfer_config.part_size_mib().to_string());
    if let Some(storage_class) = transfer_config.storage_class {
        command.arg("--storage-class").arg(storage_class.as_str());
    }
    if !config.follow_symlinks {
        command.arg("--no-follow-symlinks");
    }
    if let Some(checksum_algorithm) = transfer_config.checksum_algorithm {
        warn!(
            checksum_algorithm = checksum_algorithm.as_str(),
            "s5cmd does not support additional checksum algorithms. the setting is recorded in the report only."
        );
    }
    for flag in &config.extra_flags {
        command.arg(flag);
    }

    command
        .arg(source_wildcard(&config.target.source))
        .arg(config.target.destination_uri());
}

fn build_aws_cli_sync(config: &Config, command: &mut TransferCommand) {
    let transfer_config = &config.transfer_config;

    command
        .arg("s3")
        .arg("sync")
        .arg(config.target.source.to_string_lossy())
        .arg(config.target.destination_uri())
        .arg("--no-progress");
    if config.dry_run {
        command.arg("--dryrun");
    }
    if let Some(endpoint_url) = &config.endpoint_url {
        command.arg("--endpoint-url").arg(endpoint_url);
    }
    if let Some(storage_class) = transfer_config.storage_class {
        command.arg("--storage-class").arg(storage_class.as_str());
    }
    if let Some(checksum_algorithm) = transfer_config.checksum_algorithm {
        command
            .arg("--checksum-algorithm")
            .arg(checksum_algorithm.as_str());
    }
    if !config.follow_symlinks {
        command.arg("--no-follow-symlinks");
    }
    for flag in &config.extra_flags {
        command.arg(flag);
    }

    // the first attempt counts as one
    command.env(
        ENV_AWS_MAX_ATTEMPTS,
        transfer_config.retry_count.saturating_add(1).to_string(),
    );
}

fn add_credential_envs(config: &Config, command: &mut TransferCommand) {
    match &config.credential {
        S3Credentials::Profile(profile) => {
            command.env(ENV_AWS_PROFILE, profile);
        }
        S3Credentials::Credentials { access_keys } => {
            command
                .env(ENV_AWS_ACCESS_KEY_ID, &access_keys.access_key)
                .env(ENV_AWS_SECRET_ACCESS_KEY, &access_keys.secret_access_key);
            if let Some(session_token) = &access_keys.session_token {
                command.env(ENV_AWS_SESSION_TOKEN, session_token);
            }
        }
        S3Credentials::FromEnvironment => {}
    }

    if let Some(region) = &config.region {
        command.env(ENV_AWS_REGION, region);
    }
}

fn source_wildcard(source: &Path) -> String {
    let source = source.to_string_lossy();
    format!("{}/*", source.trim_end_matches('/'))
}
