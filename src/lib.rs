/*!
# Overview
datasync uploads a local directory to an S3 bucket by driving an external transfer tool
([s5cmd](https://github.com/peak/s5cmd) by default, or the AWS CLI).

All network I/O, parallelism and retries happen inside the transfer tool. datasync prepares and
guards the invocation, follows the tool's output to track progress, and leaves a JSON report and a
human-readable log behind for every run.

## Features
- Upload only
  The assembled command line is inspected before the tool is started. Any `--delete` style flag
  is refused, so a run can never remove objects in the destination.

- Progress by count and by size
  The source tree is measured up front. Every completion line of the tool is matched with the size
  of the local file, giving both a file-count and a byte-based percentage, throughput and ETA.

- Report on every exit path
  Success, transfer failure, prerequisite failure, guard violation and cancellation all produce
  exactly one report, written atomically.

## As a library

```no_run
use datasync::config::args::parse_from_args;
use datasync::transfer::command::build_transfer_command;
use datasync::transfer::prerequisite::validate_prerequisites;
use datasync::transfer::scan::scan_source;
use datasync::transfer::Uploader;
use datasync::types::token::create_upload_cancellation_token;
use datasync::Config;

#[tokio::main]
async fn main() {
    let args = vec![
        "program_name",
        "--source-dir",
        "./data",
        "--s3-bucket",
        "s3://example-bucket/backup",
    ];
    let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();

    let program = validate_prerequisites(&config).await.unwrap();
    let totals = scan_source(&config.target.source, config.follow_symlinks);

    let command = build_transfer_command(&config, &program);
    let uploader = Uploader::new(config, command, totals, create_upload_cancellation_token());
    let outcome = uploader.run().await.unwrap();

    println!(
        "{:?}: {} files, {} bytes",
        outcome.status, outcome.files_synced, outcome.actual_bytes_transferred
    );
}
```
*/

pub use config::Config;
pub use config::args::CLIArgs;

pub mod config;
pub mod progress;
pub mod report;
pub mod transfer;
pub mod types;
