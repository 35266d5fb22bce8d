use crate::Config;
use crate::config::args::value_parser::{
    bucket, checksum_algorithm, extra_flag, human_bytes, storage_class, transfer_tool, url,
};
use crate::config::file::{self, ConfigFileEntries};
use crate::config::{TracingConfig, TransferConfig};
use crate::types::error::DatasyncError;
use crate::types::{
    AccessKeys, ChecksumAlgorithm, S3Credentials, StorageClass, TransferTool, UploadTarget,
};
use clap::builder::{ArgPredicate, NonEmptyStringValueParser, Resettable};
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
#[cfg(feature = "version")]
use shadow_rs::shadow;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod tests;
mod value_parser;

const DEFAULT_TRANSFER_TOOL: &str = "s5cmd";
const DEFAULT_CONCURRENCY: u16 = 64;
const DEFAULT_PART_SIZE: &str = "64MiB";
const DEFAULT_NUM_WORKERS: u16 = 256;
const DEFAULT_RETRY_COUNT: u32 = 10;
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
const DEFAULT_DESTINATION_CHECK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DRY_RUN: bool = false;
const DEFAULT_JSON_OUTPUT: bool = false;
const DEFAULT_NO_FOLLOW_SYMLINKS: bool = false;
const DEFAULT_SKIP_DESTINATION_CHECK: bool = false;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;

const CONFIG_ARG_ID: &str = "config";

const SOURCE_DIR_REQUIRED: &str = "source directory is required. specify --source-dir, the SOURCE_DIR environment variable or SOURCE_DIR in the config file.\n";
const S3_BUCKET_REQUIRED: &str = "destination bucket is required. specify --s3-bucket, the S3_BUCKET environment variable or S3_BUCKET in the config file.\n";
const JSON_OUTPUT_REQUIRES_S5CMD: &str = "--json-output is only supported with --transfer-tool s5cmd\n";
const CONFIG_FILE_NOT_FOUND: &str = "config file not found.";
const UNKNOWN_CONFIG_FILE_KEYS: &str = "unknown keys in config file";
const INVALID_BOOLEAN_IN_CONFIG_FILE: &str = "must be true or false";

#[cfg(feature = "version")]
shadow!(build);

#[derive(Parser, Clone, Debug)]
#[cfg_attr(feature = "version", command(version=format!("{} ({} {}), {}", build::PKG_VERSION, build::SHORT_COMMIT, build::BUILD_TARGET, build::RUST_VERSION)))]
pub struct CLIArgs {
    /// flat KEY=VALUE file with settings. command line flags take precedence over it, it takes precedence over environment variables
    #[arg(long, env = "DATASYNC_CONFIG", value_name = "FILE", value_parser = check_config_file, help_heading = "General")]
    config: Option<PathBuf>,

    /// local directory to upload
    #[arg(long, env = "SOURCE_DIR", value_parser = NonEmptyStringValueParser::new(), default_value_if("auto_complete_shell", ArgPredicate::IsPresent, "."), help_heading = "General")]
    source_dir: Option<String>,

    /// destination bucket. <BUCKET_NAME> or s3://<BUCKET_NAME>[/prefix]
    #[arg(long, env = "S3_BUCKET", value_parser = bucket::check_bucket, default_value_if("auto_complete_shell", ArgPredicate::IsPresent, "ignored"), help_heading = "General")]
    s3_bucket: Option<String>,

    /// key prefix under the bucket
    #[arg(long, env = "S3_SUBPATH", help_heading = "General")]
    s3_subpath: Option<String>,

    /// a preview mode. the transfer tool runs with its dry-run option and no object is uploaded
    #[arg(long, env = "DRY_RUN", default_value_t = DEFAULT_DRY_RUN, help_heading = "General")]
    dry_run: bool,

    /// external program that performs the upload.
    /// valid choices: s5cmd | aws
    #[arg(long, env = "TRANSFER_TOOL", default_value = DEFAULT_TRANSFER_TOOL, value_parser = transfer_tool::parse_transfer_tool, help_heading = "Transfer Tool")]
    transfer_tool: String,

    /// path of the transfer tool executable. by default it is looked up on PATH
    #[arg(long, env = "TOOL_PATH", value_name = "FILE", help_heading = "Transfer Tool")]
    tool_path: Option<PathBuf>,

    /// let s5cmd print structured JSON lines instead of text
    #[arg(long, env = "JSON_OUTPUT", default_value_t = DEFAULT_JSON_OUTPUT, help_heading = "Transfer Tool")]
    json_output: bool,

    /// additional flag passed to the transfer tool as-is. use --extra-flag=--name=value form. destructive flags such as --delete are refused
    #[arg(long, env = "EXTRA_FLAGS", value_delimiter = ' ', allow_hyphen_values = true, value_parser = extra_flag::check_extra_flag, help_heading = "Transfer Tool")]
    extra_flag: Vec<String>,

    /// AWS CLI profile passed to the transfer tool
    #[arg(long, env = "AWS_PROFILE", help_heading = "AWS Configuration")]
    aws_profile: Option<String>,

    /// access key passed to the transfer tool
    #[arg(long, env = "AWS_ACCESS_KEY_ID", requires = "aws_secret_access_key", help_heading = "AWS Configuration")]
    aws_access_key_id: Option<String>,

    /// secret access key passed to the transfer tool
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", requires = "aws_access_key_id", hide_env_values = true, help_heading = "AWS Configuration")]
    aws_secret_access_key: Option<String>,

    /// session token passed to the transfer tool
    #[arg(long, env = "AWS_SESSION_TOKEN", requires = "aws_access_key_id", hide_env_values = true, help_heading = "AWS Configuration")]
    aws_session_token: Option<String>,

    /// region of the destination bucket
    #[arg(long, env = "AWS_REGION", value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS Configuration")]
    aws_region: Option<String>,

    /// endpoint url of S3-compatible storage
    #[arg(long, env = "S3_ENDPOINT_URL", value_parser = url::check_endpoint_url, help_heading = "AWS Configuration")]
    endpoint_url: Option<String>,

    /// number of parts uploaded in parallel for each file
    #[arg(long, env = "CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY, value_parser = clap::value_parser!(u16).range(1..), help_heading = "Performance")]
    concurrency: u16,

    /// multipart chunk size. Allow suffixes: MB, MiB, GB, GiB
    #[arg(long, env = "PART_SIZE", default_value = DEFAULT_PART_SIZE, value_parser = human_bytes::check_part_size, help_heading = "Performance")]
    part_size: String,

    /// number of files uploaded in parallel
    #[arg(long, env = "NUM_WORKERS", default_value_t = DEFAULT_NUM_WORKERS, value_parser = clap::value_parser!(u16).range(1..), help_heading = "Performance")]
    num_workers: u16,

    /// retry count of the transfer tool. datasync itself never retries
    #[arg(long, env = "RETRY_COUNT", default_value_t = DEFAULT_RETRY_COUNT, help_heading = "Performance")]
    retry_count: u32,

    /// additional checksum algorithm for upload.
    /// valid choices: CRC32 | CRC32C | CRC64NVME | SHA1 | SHA256
    #[arg(long, env = "CHECKSUM_ALGORITHM", value_parser = checksum_algorithm::parse_checksum_algorithm, help_heading = "Verification")]
    checksum_algorithm: Option<String>,

    /// type of storage to use for the uploaded objects.
    /// valid choices: STANDARD | REDUCED_REDUNDANCY | STANDARD_IA | ONEZONE_IA | INTELLIGENT_TIERING | GLACIER | DEEP_ARCHIVE | GLACIER_IR
    #[arg(long, env = "STORAGE_CLASS", value_parser = storage_class::parse_storage_class, help_heading = "Target Options")]
    storage_class: Option<String>,

    /// do not follow symbolic links in the source directory
    #[arg(long, env = "NO_FOLLOW_SYMLINKS", default_value_t = DEFAULT_NO_FOLLOW_SYMLINKS, help_heading = "Advanced")]
    no_follow_symlinks: bool,

    /// do not check that the destination bucket is reachable before uploading
    #[arg(long, env = "SKIP_DESTINATION_CHECK", default_value_t = DEFAULT_SKIP_DESTINATION_CHECK, help_heading = "Advanced")]
    skip_destination_check: bool,

    /// timeout of the destination check (seconds)
    #[arg(long, env = "DESTINATION_CHECK_TIMEOUT", default_value_t = DEFAULT_DESTINATION_CHECK_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..), help_heading = "Advanced")]
    destination_check_timeout: u64,

    /// log a heartbeat when no file has completed for this many seconds
    #[arg(long, env = "HEARTBEAT_INTERVAL", default_value_t = DEFAULT_HEARTBEAT_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..), help_heading = "Logging")]
    heartbeat_interval: u64,

    /// directory of the log file and the JSON report
    #[arg(long, env = "LOG_DIR", default_value = DEFAULT_LOG_DIR, help_heading = "Logging")]
    log_dir: PathBuf,

    /// trace verbosity(-v: show info, -vv: show debug, -vvv show trace)
    #[clap(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// show trace as json format
    #[arg(long, env = "JSON_TRACING", default_value_t = DEFAULT_JSON_TRACING, help_heading = "Logging")]
    json_tracing: bool,

    /// show span event tracing
    #[arg(long, env = "SPAN_EVENTS_TRACING", default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Logging")]
    span_events_tracing: bool,

    /// disable ANSI terminal colors
    #[arg(long, env = "DISABLE_COLOR_TRACING", default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Logging")]
    disable_color_tracing: bool,

    /// generate a auto completions script. Valid values: bash, fish, zsh, powershell, elvish.
    #[arg(long, value_name = "SHELL", value_parser = clap_complete::shells::Shell::from_str, help_heading = "Advanced")]
    auto_complete_shell: Option<clap_complete::shells::Shell>,
}

fn check_config_file(path: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path);
    if !path.is_file() {
        return Err(CONFIG_FILE_NOT_FOUND.to_string());
    }

    Ok(path)
}

/// Parses the command line and, when `--config` is given, merges the config file into it.
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    let matches = CLIArgs::command().try_get_matches_from(args.clone())?;
    let cli_args = CLIArgs::from_arg_matches(&matches)?;

    let Some(config_file) = cli_args.config.as_ref() else {
        return Ok(cli_args);
    };

    let entries = file::read_config_file(config_file)
        .map_err(|e| clap::Error::raw(ErrorKind::Io, format!("{e:#}\n")))?;
    let merged = merge_config_file_entries(args, &matches, &entries)
        .map_err(|e| clap::Error::raw(ErrorKind::ValueValidation, e))?;

    // A flag cleared in the file must not be turned back on by its environment variable.
    let mut command = CLIArgs::command();
    for id in &merged.env_disabled_ids {
        command = command.mut_arg(id, |arg| arg.env(Resettable::Reset));
    }

    let matches = command.try_get_matches_from(merged.args)?;
    CLIArgs::from_arg_matches(&matches)
}

/// Validates parsed arguments into a [`Config`]. Rejections carry the invalid-config exit code.
pub fn validate_cli_args(args: CLIArgs) -> Result<Config, DatasyncError> {
    crate::Config::try_from(args).map_err(DatasyncError::InvalidConfig)
}

pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config_args = parse_from_args(args).map_err(|e| e.to_string())?;
    crate::Config::try_from(config_args)
}

struct MergedArgs {
    args: Vec<OsString>,
    env_disabled_ids: Vec<String>,
}

/// Appends config file entries as flags unless the same setting was given on the command line.
///
/// Flags set to false in the file are returned in `env_disabled_ids`, since a flag has no
/// command-line form that turns it off.
fn merge_config_file_entries(
    mut args: Vec<OsString>,
    matches: &ArgMatches,
    entries: &ConfigFileEntries,
) -> Result<MergedArgs, String> {
    let mut env_disabled_ids = Vec::new();
    let command = CLIArgs::command();
    let mut known_keys = HashSet::new();

    for arg in command.get_arguments() {
        let (Some(env), Some(long)) = (arg.get_env(), arg.get_long()) else {
            continue;
        };
        if arg.get_id().as_str() == CONFIG_ARG_ID {
            continue;
        }

        let key = env.to_string_lossy().to_string();
        let value = entries.get(&key);
        known_keys.insert(key.clone());

        let Some(value) = value else {
            continue;
        };
        if matches.value_source(arg.get_id().as_str()) == Some(ValueSource::CommandLine) {
            continue;
        }

        if arg.get_action().takes_values() {
            if value.is_empty() {
                continue;
            }
            args.push(format!("--{long}={value}").into());
        } else if parse_boolean(value).map_err(|e| format!("{key}: {e}\n"))? {
            args.push(format!("--{long}").into());
        } else {
            env_disabled_ids.push(arg.get_id().to_string());
        }
    }

    let unknown_keys: Vec<&str> = entries
        .keys()
        .filter(|key| !known_keys.contains(*key) && key.as_str() != "DATASYNC_CONFIG")
        .map(String::as_str)
        .collect();
    if !unknown_keys.is_empty() {
        return Err(format!(
            "{UNKNOWN_CONFIG_FILE_KEYS}: {}\n",
            unknown_keys.join(", ")
        ));
    }

    Ok(MergedArgs {
        args,
        env_disabled_ids,
    })
}

fn parse_boolean(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(INVALID_BOOLEAN_IN_CONFIG_FILE.to_string()),
    }
}

impl CLIArgs {
    fn validate_config(&self) -> Result<(), String> {
        self.check_required_settings()?;
        self.check_json_output_conflict()?;

        Ok(())
    }

    fn check_required_settings(&self) -> Result<(), String> {
        if self.source_dir.is_none() {
            return Err(SOURCE_DIR_REQUIRED.to_string());
        }
        if self.s3_bucket.is_none() {
            return Err(S3_BUCKET_REQUIRED.to_string());
        }

        Ok(())
    }

    fn check_json_output_conflict(&self) -> Result<(), String> {
        let tool = TransferTool::from_str(&self.transfer_tool)?;
        if self.json_output && tool != TransferTool::S5cmd {
            return Err(JSON_OUTPUT_REQUIRES_S5CMD.to_string());
        }

        Ok(())
    }

    fn build_upload_target(&self) -> Result<UploadTarget, String> {
        let source = self
            .source_dir
            .as_ref()
            .ok_or_else(|| SOURCE_DIR_REQUIRED.to_string())?;
        let (bucket, embedded_prefix) = bucket::parse_bucket(
            self.s3_bucket
                .as_ref()
                .ok_or_else(|| S3_BUCKET_REQUIRED.to_string())?,
        )?;

        let prefix = [embedded_prefix.as_deref(), self.s3_subpath.as_deref()]
            .into_iter()
            .flatten()
            .map(|part| part.trim_matches('/'))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/");

        Ok(UploadTarget::new(
            Path::new(source).to_path_buf(),
            &bucket,
            &prefix,
        ))
    }

    fn build_credential(&self) -> S3Credentials {
        if let (Some(access_key), Some(secret_access_key)) =
            (&self.aws_access_key_id, &self.aws_secret_access_key)
        {
            return S3Credentials::Credentials {
                access_keys: AccessKeys {
                    access_key: access_key.to_string(),
                    secret_access_key: secret_access_key.to_string(),
                    session_token: self.aws_session_token.clone(),
                },
            };
        }

        if let Some(profile) = &self.aws_profile {
            return S3Credentials::Profile(profile.to_string());
        }

        S3Credentials::FromEnvironment
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let tracing_config = self
            .verbosity
            .log_level()
            .map(|log_level| TracingConfig {
                tracing_level: log_level,
                json_tracing: self.json_tracing,
                span_events_tracing: self.span_events_tracing,
                disable_color_tracing: self.disable_color_tracing,
            });

        if !self.dry_run {
            return tracing_config;
        }

        match tracing_config {
            None => Some(TracingConfig {
                tracing_level: log::Level::Info,
                json_tracing: DEFAULT_JSON_TRACING,
                span_events_tracing: DEFAULT_SPAN_EVENTS_TRACING,
                disable_color_tracing: DEFAULT_DISABLE_COLOR_TRACING,
            }),
            Some(config) if config.tracing_level < log::Level::Info => Some(TracingConfig {
                tracing_level: log::Level::Info,
                ..config
            }),
            config => config,
        }
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(value: CLIArgs) -> Result<Self, Self::Error> {
        value.validate_config()?;

        let target = value.build_upload_target()?;
        let credential = value.build_credential();
        let tracing_config = value.build_tracing_config();

        let transfer_tool = TransferTool::from_str(&value.transfer_tool)?;
        let part_size = human_bytes::parse_part_size(&value.part_size)?;
        let checksum_algorithm = value
            .checksum_algorithm
            .as_deref()
            .map(ChecksumAlgorithm::from_str)
            .transpose()?;
        let storage_class = value
            .storage_class
            .as_deref()
            .map(StorageClass::from_str)
            .transpose()?;

        Ok(Config {
            target,
            transfer_tool,
            tool_path: value.tool_path,
            transfer_config: TransferConfig {
                concurrency: value.concurrency,
                part_size,
                worker_size: value.num_workers,
                retry_count: value.retry_count,
                checksum_algorithm,
                storage_class,
            },
            credential,
            region: value.aws_region,
            endpoint_url: value.endpoint_url,
            extra_flags: value.extra_flag,
            dry_run: value.dry_run,
            json_output: value.json_output,
            follow_symlinks: !value.no_follow_symlinks,
            log_dir: value.log_dir,
            heartbeat_interval_secs: value.heartbeat_interval,
            check_destination: !value.skip_destination_check,
            destination_check_timeout_secs: value.destination_check_timeout,
            tracing_config,
            auto_complete_shell: value.auto_complete_shell,
        })
    }
}
