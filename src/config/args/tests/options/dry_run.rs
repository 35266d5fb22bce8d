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

        assert!(!config.dry_run);
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
            "--dry-run",
        ];

        let config = build_config_from_args(args).unwrap();

        assert!(config.dry_run);
        assert_eq!(
            config.tracing_config.unwrap().tracing_level,
            log::Level::Info
        );
        assert!(!config.tracing_config.unwrap().json_tracing);
        assert!(!config.tracing_config.unwrap().span_events_tracing);
        assert!(!config.tracing_config.unwrap().disable_color_tracing);
    }

    #[test]
    fn with_custom_value_with_tracing_option() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--dry-run",
            "--json-tracing",
            "--disable-color-tracing",
            "-vv",
        ];

        let config = build_config_from_args(args).unwrap();

        assert!(config.dry_run);
        assert_eq!(
            config.tracing_config.unwrap().tracing_level,
            log::Level::Debug
        );
        assert!(config.tracing_config.unwrap().json_tracing);
        assert!(config.tracing_config.unwrap().disable_color_tracing);
    }

    #[test]
    fn with_quiet_option() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--dry-run",
            "-qqq",
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(
            config.tracing_config.unwrap().tracing_level,
            log::Level::Info
        );
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
