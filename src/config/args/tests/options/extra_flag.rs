#[cfg(test)]
mod tests {
    use crate::config::args::*;

    #[test]
    fn with_extra_flags() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--extra-flag=--no-clobber",
            "--extra-flag",
            "--sse=aws:kms",
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.extra_flags, vec!["--no-clobber", "--sse=aws:kms"]);
    }

    #[test]
    fn destructive_extra_flag_is_accepted_here_and_refused_before_upload() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--extra-flag=--delete",
        ];

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.extra_flags, vec!["--delete"]);
        assert!(crate::transfer::guard::check_upload_only(&config.extra_flags).is_err());
    }

    #[test]
    fn error_positional_extra_flag() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--extra-flag",
            "s3://other-bucket/",
        ];

        assert!(build_config_from_args(args).is_err());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
