use crate::types::error::DatasyncError;

const DESTRUCTIVE_FLAG_NAME: &str = "delete";

/// Refuses any flag set that would let the transfer tool remove objects in the destination.
pub fn check_upload_only<S: AsRef<str>>(flags: &[S]) -> Result<(), DatasyncError> {
    for flag in flags {
        let flag: &str = flag.as_ref();
        if is_destructive_flag(flag) {
            return Err(DatasyncError::SafetyGuardViolation {
                flag: flag.to_string(),
            });
        }
    }

    Ok(())
}

/// `--delete`, `-delete`, `--delete=true`, `--delete-removed` and so on.
pub fn is_destructive_flag(flag: &str) -> bool {
    let trimmed = flag.trim();
    let Some(name) = trimmed
        .strip_prefix("--")
        .or_else(|| trimmed.strip_prefix('-'))
    else {
        return false;
    };
    let name = name.split('=').next().unwrap_or_default().to_ascii_lowercase();

    name == DESTRUCTIVE_FLAG_NAME || name.starts_with("delete-")
}
