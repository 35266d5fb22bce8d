use std::str::FromStr;

use crate::types::ChecksumAlgorithm;

const INVALID_CHECKSUM_ALGORITHM: &str =
    "invalid checksum_algorithm. valid choices: CRC32 | CRC32C | CRC64NVME | SHA1 | SHA256 .";

pub fn parse_checksum_algorithm(checksum_algorithm: &str) -> Result<String, String> {
    if ChecksumAlgorithm::from_str(checksum_algorithm).is_err() {
        return Err(INVALID_CHECKSUM_ALGORITHM.to_string());
    }

    Ok(checksum_algorithm.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_algorithm() {
        init_dummy_tracing_subscriber();

        parse_checksum_algorithm("CRC32").unwrap();
        parse_checksum_algorithm("CRC32C").unwrap();
        parse_checksum_algorithm("crc64nvme").unwrap();
        parse_checksum_algorithm("SHA1").unwrap();
        parse_checksum_algorithm("SHA256").unwrap();
    }

    #[test]
    fn parse_invalid_algorithm() {
        init_dummy_tracing_subscriber();

        let result = parse_checksum_algorithm("MD5");
        assert_eq!(result.unwrap_err(), INVALID_CHECKSUM_ALGORITHM);
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
