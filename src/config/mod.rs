use std::path::PathBuf;

use crate::types::{ChecksumAlgorithm, S3Credentials, StorageClass, TransferTool, UploadTarget};

pub mod args;
pub mod file;

#[derive(Debug, Clone)]
pub struct Config {
    pub target: UploadTarget,
    pub transfer_tool: TransferTool,
    pub tool_path: Option<PathBuf>,
    pub transfer_config: TransferConfig,
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub extra_flags: Vec<String>,
    pub dry_run: bool,
    pub json_output: bool,
    pub follow_symlinks: bool,
    pub log_dir: PathBuf,
    pub heartbeat_interval_secs: u64,
    pub check_destination: bool,
    pub destination_check_timeout_secs: u64,
    pub tracing_config: Option<TracingConfig>,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    pub fn is_checksum_verification_requested(&self) -> bool {
        self.transfer_config.checksum_algorithm.is_some() && !self.dry_run
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferConfig {
    pub concurrency: u16,
    pub part_size: u64,
    pub worker_size: u16,
    pub retry_count: u32,
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    pub storage_class: Option<StorageClass>,
}

impl TransferConfig {
    /// s5cmd takes the part size in MiB.
    pub fn part_size_mib(&self) -> u64 {
        (self.part_size / (1024 * 1024)).max(1)
    }
}
