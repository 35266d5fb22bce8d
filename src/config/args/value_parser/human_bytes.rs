use byte_unit::Byte;
use std::str::FromStr;

const UNDER_MIN_PART_SIZE: &str = "must be greater than or equal to 5MiB";
const OVER_MAX_PART_SIZE: &str = "must be smaller than or equal to 5GiB";

const MIN_PART_SIZE: u128 = 5 * 1024 * 1024;
const MAX_PART_SIZE: u128 = 5 * 1024 * 1024 * 1024;

pub fn check_part_size(value: &str) -> Result<String, String> {
    let result = Byte::from_str(value).map_err(|e| e.to_string())?;

    if result.as_u128() < MIN_PART_SIZE {
        return Err(UNDER_MIN_PART_SIZE.to_string());
    }
    if result.as_u128() > MAX_PART_SIZE {
        return Err(OVER_MAX_PART_SIZE.to_string());
    }

    Ok(value.to_string())
}

pub fn parse_part_size(value: &str) -> Result<u64, String> {
    check_part_size(value)?;

    let result = Byte::from_str(value).map_err(|e| e.to_string())?;
    u64::try_from(result.as_u128()).map_err(|e| e.to_string())
}
