use std::str::FromStr;

use crate::types::StorageClass;

const INVALID_STORAGE_CLASS: &str = "invalid storage class. valid choices: STANDARD | REDUCED_REDUNDANCY | STANDARD_IA | ONEZONE_IA | INTELLIGENT_TIERING | GLACIER | DEEP_ARCHIVE | GLACIER_IR .";

pub fn parse_storage_class(class: &str) -> Result<String, String> {
    if StorageClass::from_str(class).is_err() {
        return Err(INVALID_STORAGE_CLASS.to_string());
    }

    Ok(class.to_string())
}
