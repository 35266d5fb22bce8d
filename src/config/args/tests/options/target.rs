#[cfg(test)]
mod tests {
    use crate::config::args::*;

    #[test]
    fn with_storage_class() {
        init_dummy_tracing_subscriber();

        for (value, expected) in [
            ("STANDARD", StorageClass::Standard),
            ("reduced_redundancy", StorageClass::ReducedRedundancy),
            ("STANDARD_IA", StorageClass::StandardIa),
            ("ONEZONE_IA", StorageClass::OnezoneIa),
            ("intelligent-tiering", StorageClass::IntelligentTiering),
            ("GLACIER", StorageClass::Glacier),
            ("DEEP_ARCHIVE", StorageClass::DeepArchive),
            ("GLACIER_IR", StorageClass::GlacierIr),
        ] {
            let args = vec![
                "datasync",
                "--source-dir",
                "/data/export",
                "--s3-bucket",
                "my-bucket",
                "--storage-class",
                value,
            ];

            let config = build_config_from_args(args).unwrap();
            assert_eq!(config.transfer_config.storage_class, Some(expected));
        }
    }

    #[test]
    fn with_checksum_algorithm() {
        init_dummy_tracing_subscriber();

        for (value, expected) in [
            ("CRC32", ChecksumAlgorithm::Crc32),
            ("crc32c", ChecksumAlgorithm::Crc32C),
            ("CRC64NVME", ChecksumAlgorithm::Crc64Nvme),
            ("SHA1", ChecksumAlgorithm::Sha1),
            ("sha256", ChecksumAlgorithm::Sha256),
        ] {
            let args = vec![
                "datasync",
                "--source-dir",
                "/data/export",
                "--s3-bucket",
                "my-bucket",
                "--checksum-algorithm",
                value,
            ];

            let config = build_config_from_args(args).unwrap();
            assert_eq!(config.transfer_config.checksum_algorithm, Some(expected));
            assert!(config.is_checksum_verification_requested());
        }
    }

    #[test]
    fn checksum_is_not_verified_in_dry_run() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--checksum-algorithm",
            "SHA256",
            "--dry-run",
        ];

        let config = build_config_from_args(args).unwrap();
        assert!(!config.is_checksum_verification_requested());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
