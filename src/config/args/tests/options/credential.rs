#[cfg(test)]
mod tests {
    use crate::config::args::*;

    #[test]
    fn with_profile() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--aws-profile",
            "backup",
            "--aws-region",
            "ap-northeast-1",
        ];

        let config = build_config_from_args(args).unwrap();

        if let S3Credentials::Profile(profile_name) = &config.credential {
            assert_eq!(profile_name, "backup");
        } else {
            // skipcq: RS-W1021
            assert!(false, "profile not found");
        }
        assert_eq!(config.region, Some("ap-northeast-1".to_string()));
    }

    #[test]
    fn with_access_keys() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--aws-access-key-id",
            "access_key",
            "--aws-secret-access-key",
            "secret_access_key",
            "--aws-session-token",
            "session_token",
        ];

        let config = build_config_from_args(args).unwrap();

        if let S3Credentials::Credentials { access_keys } = &config.credential {
            assert_eq!(access_keys.access_key, "access_key");
            assert_eq!(access_keys.secret_access_key, "secret_access_key");
            assert_eq!(access_keys.session_token, Some("session_token".to_string()));
        } else {
            // skipcq: RS-W1021
            assert!(false, "access keys not found");
        }
    }

    #[test]
    fn access_keys_take_precedence_over_profile() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--aws-profile",
            "backup",
            "--aws-access-key-id",
            "access_key",
            "--aws-secret-access-key",
            "secret_access_key",
        ];

        let config = build_config_from_args(args).unwrap();

        assert!(matches!(
            config.credential,
            S3Credentials::Credentials { .. }
        ));
    }

    #[test]
    fn error_secret_access_key_without_access_key() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--aws-secret-access-key",
            "secret_access_key",
        ];

        assert!(build_config_from_args(args).is_err());
    }

    #[test]
    fn with_endpoint_url() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "datasync",
            "--source-dir",
            "/data/export",
            "--s3-bucket",
            "my-bucket",
            "--endpoint-url",
            "http://localhost:9000",
        ];

        let config = build_config_from_args(args).unwrap();
        assert_eq!(
            config.endpoint_url,
            Some("http://localhost:9000".to_string())
        );
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
