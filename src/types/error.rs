use thiserror::Error;

pub const EXIT_CODE_SUCCESS: i32 = 0;
pub const EXIT_CODE_ERROR: i32 = 1;
pub const EXIT_CODE_INVALID_ARGS: i32 = 2;
pub const EXIT_CODE_PREREQUISITE: i32 = 3;
pub const EXIT_CODE_SAFETY_GUARD: i32 = 4;

#[derive(Error, Debug, PartialEq)]
pub enum DatasyncError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{tool} not found. install it or specify --tool-path.")]
    ToolNotFound { tool: String },
    #[error("source directory {path} does not exist or is not a directory.")]
    SourceNotFound { path: String },
    #[error("source directory {path} is not readable: {reason}")]
    SourceNotReadable { path: String, reason: String },
    #[error("destination {uri} is not reachable: {reason}")]
    DestinationUnreachable { uri: String, reason: String },
    #[error(
        "destructive flag {flag} is not allowed. datasync only uploads and never deletes objects in the destination."
    )]
    SafetyGuardViolation { flag: String },
    #[error("transfer process failed: {0}")]
    TransferFailed(String),
    #[error("cancelled")]
    Cancelled,
}

impl DatasyncError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig(_) => EXIT_CODE_INVALID_ARGS,
            Self::ToolNotFound { .. }
            | Self::SourceNotFound { .. }
            | Self::SourceNotReadable { .. }
            | Self::DestinationUnreachable { .. } => EXIT_CODE_PREREQUISITE,
            Self::SafetyGuardViolation { .. } => EXIT_CODE_SAFETY_GUARD,
            Self::TransferFailed(_) | Self::Cancelled => EXIT_CODE_ERROR,
        }
    }
}

pub fn exit_code_from_error(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<DatasyncError>()
        .map_or(EXIT_CODE_ERROR, DatasyncError::exit_code)
}
