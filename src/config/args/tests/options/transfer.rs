#[cfg(test)]
mod tests {
    use crate::config::args::*;

    #[test]
    fn with_default_value() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.transfer_config.concurrency, 64);
        assert_eq!(config.transfer_config.part_size, 64 * 1024 * 1024);
        assert_eq!(config.transfer_config.part_size_mib(), 64);
        assert_eq!(config.transfer_config.worker_size, 256);
        assert_eq!(config.transfer_config.retry_count, 10);
    }

    #[test]
    fn with_custom_value() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--concurrency",
            "16",
            "--part-size",
            "1GiB",
            "--num-workers",
            "1000",
            "--retry-count",
            "0",
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.transfer_config.concurrency, 16);
        assert_eq!(config.transfer_config.part_size, 1024 * 1024 * 1024);
        assert_eq!(config.transfer_config.part_size_mib(), 1024);
        assert_eq!(config.transfer_config.worker_size, 1000);
        assert_eq!(config.transfer_config.retry_count, 0);
    }

    #[test]
    fn error_part_size_out_of_range() {
        init_dummy_tracing_subscriber();

        for part_size in ["4MiB", "6GiB", "64Mbx"] {
            let args = vec![
                "datasync",
                "--source-dir",
                "/data/export",
                "--s3-bucket",
                "my-bucket",
                "--part-size",
                part_size,
            ];

            assert!(build_config_from_args(args).is_err(), "{part_size}");
        }
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
