use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::types::TransferTool;

static S5CMD_COPY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:DRYRUN\s+)?cp\s+(.+?)\s+(s3://.+)$").unwrap()
});
static AWS_CLI_UPLOAD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\(dryrun\)\s+)?upload:\s+(.+?)\s+to\s+(s3://.+)$").unwrap()
});

const S5CMD_ERROR_PREFIX: &str = "ERROR";
const AWS_CLI_FAILURE_PREFIX: &str = "upload failed:";
const S5CMD_COPY_OPERATION: &str = "cp";
const UNKNOWN_ERROR: &str = "unknown error";

/// Classification of one stdout line of the transfer tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionLine {
    Completed { path: String },
    Failed { message: String },
    Other,
}

#[derive(Debug, Deserialize)]
struct S5cmdJsonLine {
    #[serde(default)]
    operation: String,
    #[serde(default)]
    success: bool,
    source: Option<String>,
    error: Option<String>,
}

pub fn parse_completion_line(tool: TransferTool, line: &str) -> CompletionLine {
    let line = line.trim();
    if line.is_empty() {
        return CompletionLine::Other;
    }

    match tool {
        TransferTool::S5cmd if line.starts_with('{') => parse_s5cmd_json_line(line),
        TransferTool::S5cmd => parse_s5cmd_text_line(line),
        TransferTool::AwsCli => parse_aws_cli_line(line),
    }
}

fn parse_s5cmd_text_line(line: &str) -> CompletionLine {
    if line.starts_with(S5CMD_ERROR_PREFIX) {
        return CompletionLine::Failed {
            message: line.to_string(),
        };
    }

    S5CMD_COPY_LINE
        .captures(line)
        .map_or(CompletionLine::Other, |captures| CompletionLine::Completed {
            path: captures[1].to_string(),
        })
}

fn parse_s5cmd_json_line(line: &str) -> CompletionLine {
    let Ok(parsed) = serde_json::from_str::<S5cmdJsonLine>(line) else {
        return CompletionLine::Other;
    };
    if parsed.operation != S5CMD_COPY_OPERATION {
        return CompletionLine::Other;
    }

    match (parsed.success, parsed.source) {
        (true, Some(source)) => CompletionLine::Completed { path: source },
        _ => CompletionLine::Failed {
            message: parsed.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        },
    }
}

fn parse_aws_cli_line(line: &str) -> CompletionLine {
    if line.starts_with(AWS_CLI_FAILURE_PREFIX) {
        return CompletionLine::Failed {
            message: line.to_string(),
        };
    }

    AWS_CLI_UPLOAD_LINE
        .captures(line)
        .map_or(CompletionLine::Other, |captures| CompletionLine::Completed {
            path: captures[1].to_string(),
        })
}
