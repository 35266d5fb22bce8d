use anyhow::Result;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{error, info, trace};

use datasync::Config;
use datasync::report::{ReportPaths, TransferReport};
use datasync::transfer::command::build_transfer_command;
use datasync::transfer::guard::check_upload_only;
use datasync::transfer::prerequisite::validate_prerequisites;
use datasync::transfer::scan::scan_source;
use datasync::transfer::{SourceTotals, UploadOutcome, Uploader};
use datasync::types::error::{
    DatasyncError, EXIT_CODE_ERROR, EXIT_CODE_SUCCESS, exit_code_from_error,
};
use datasync::types::token::{UploadCancellationToken, create_upload_cancellation_token};

mod ctrl_c_handler;
mod indicator;
mod ui_config;

/// Runs one upload and returns the process exit code.
///
/// A report is written whatever happens after the configuration has been accepted.
pub async fn run(config: Config, report_paths: ReportPaths) -> i32 {
    let cancellation_token = create_upload_cancellation_token();

    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    run_with_cancellation_token(config, report_paths, cancellation_token).await
}

async fn run_with_cancellation_token(
    config: Config,
    report_paths: ReportPaths,
    cancellation_token: UploadCancellationToken,
) -> i32 {
    let start_time = Instant::now();
    trace!("datasync start.");

    let mut totals = SourceTotals::default();
    let result = upload(&config, &mut totals, cancellation_token).await;
    let finished_at = Utc::now();

    let (report, mut exit_code) = match result {
        Ok(outcome) => {
            let exit_code = if outcome.status.is_success() {
                EXIT_CODE_SUCCESS
            } else {
                EXIT_CODE_ERROR
            };
            let report =
                TransferReport::from_outcome(&config, totals, &outcome, exit_code, finished_at);
            (report, exit_code)
        }
        Err(e) => {
            let exit_code = exit_code_from_error(&e);
            error!(exit_code = exit_code, "{e:#}");

            let report = TransferReport::from_error(
                &config,
                totals,
                &e,
                exit_code,
                start_time.elapsed(),
                finished_at,
            );
            (report, exit_code)
        }
    };

    match report.write_atomically(&report_paths.report_file) {
        Ok(()) => {
            info!(
                report = report_paths.report_file.to_string_lossy().to_string(),
                log = report_paths.log_file.to_string_lossy().to_string(),
                "transfer report written."
            );
        }
        Err(e) => {
            error!("{e:#}");
            if exit_code == EXIT_CODE_SUCCESS {
                exit_code = EXIT_CODE_ERROR;
            }
        }
    }

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    trace!(
        duration_sec = duration_sec,
        exit_code = exit_code,
        "datasync has been completed."
    );

    exit_code
}

async fn upload(
    config: &Config,
    totals: &mut SourceTotals,
    cancellation_token: UploadCancellationToken,
) -> Result<UploadOutcome> {
    // Refuse before anything, including the destination check, runs the tool.
    check_upload_only(config.extra_flags.as_slice())?;

    let program = validate_prerequisites(config).await?;

    let source = config.target.source.clone();
    let follow_symlinks = config.follow_symlinks;
    *totals = tokio::task::spawn_blocking(move || scan_source(&source, follow_symlinks)).await?;
    info!(
        total_files = totals.total_files,
        total_bytes = totals.total_bytes,
        "source scanned."
    );

    if cancellation_token.is_cancelled() {
        return Err(DatasyncError::Cancelled.into());
    }

    let command = build_transfer_command(config, &program);
    let uploader = Uploader::new(config.clone(), command, *totals, cancellation_token);
    let indicator_join_handle = indicator::show_indicator(
        uploader.get_stats_receiver(),
        *totals,
        ui_config::is_progress_indicator_needed(config),
        ui_config::is_show_result_needed(config),
        config.dry_run,
    );

    let outcome = uploader.run().await;
    indicator_join_handle.await?;

    outcome
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use chrono::Local;
    use serde_json::Value;

    use datasync::config::args::parse_from_args;
    use datasync::transfer::prerequisite::find_in_paths;
    use datasync::types::error::{EXIT_CODE_PREREQUISITE, EXIT_CODE_SAFETY_GUARD};

    use super::*;

    fn system_command(name: &str) -> PathBuf {
        find_in_paths(name, &std::env::var_os("PATH").unwrap()).unwrap()
    }

    fn build_config(source: &Path, tool: &Path, log_dir: &Path, options: &[&str]) -> Config {
        let source = source.to_string_lossy().to_string();
        let tool = tool.to_string_lossy().to_string();
        let log_dir = log_dir.to_string_lossy().to_string();

        let mut args = vec![
            "datasync",
            "--source-dir",
            &source,
            "--s3-bucket",
            "my-bucket",
            "--tool-path",
            &tool,
            "--log-dir",
            &log_dir,
            "--skip-destination-check",
        ];
        args.extend_from_slice(options);

        Config::try_from(parse_from_args(args).unwrap()).unwrap()
    }

    fn read_report(report_paths: &ReportPaths) -> Value {
        serde_json::from_str(&std::fs::read_to_string(&report_paths.report_file).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn run_successful_upload() {
        init_dummy_tracing_subscriber();

        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), b"abc").unwrap();
        let log_dir = tempfile::tempdir().unwrap();

        let config = build_config(source.path(), &system_command("true"), log_dir.path(), &[]);
        let report_paths = ReportPaths::new(log_dir.path(), Local::now());

        let exit_code = run_with_cancellation_token(
            config,
            report_paths.clone(),
            create_upload_cancellation_token(),
        )
        .await;
        assert_eq!(exit_code, EXIT_CODE_SUCCESS);

        let report = read_report(&report_paths);
        assert_eq!(report["status"], "success");
        assert_eq!(report["exit_code"], 0);
        assert_eq!(report["total_files"], 1);
        assert_eq!(report["total_bytes"], 3);
    }

    #[tokio::test]
    async fn run_failed_upload() {
        init_dummy_tracing_subscriber();

        let source = tempfile::tempdir().unwrap();
        let log_dir = tempfile::tempdir().unwrap();

        let config = build_config(source.path(), &system_command("false"), log_dir.path(), &[]);
        let report_paths = ReportPaths::new(log_dir.path(), Local::now());

        let exit_code = run_with_cancellation_token(
            config,
            report_paths.clone(),
            create_upload_cancellation_token(),
        )
        .await;
        assert_eq!(exit_code, EXIT_CODE_ERROR);

        let report = read_report(&report_paths);
        assert_eq!(report["status"], "failed");
        assert_eq!(report["exit_code"], 1);
        assert!(report["error"].is_string());
    }

    #[tokio::test]
    async fn run_missing_source() {
        init_dummy_tracing_subscriber();

        let source = tempfile::tempdir().unwrap();
        let missing = source.path().join("missing");
        let log_dir = tempfile::tempdir().unwrap();

        let config = build_config(&missing, &system_command("true"), log_dir.path(), &[]);
        let report_paths = ReportPaths::new(log_dir.path(), Local::now());

        let exit_code = run_with_cancellation_token(
            config,
            report_paths.clone(),
            create_upload_cancellation_token(),
        )
        .await;
        assert_eq!(exit_code, EXIT_CODE_PREREQUISITE);

        let report = read_report(&report_paths);
        assert_eq!(report["status"], "failed");
        assert_eq!(report["exit_code"], EXIT_CODE_PREREQUISITE);
        assert_eq!(report["total_files"], 0);
    }

    #[tokio::test]
    async fn run_refuses_destructive_flag() {
        init_dummy_tracing_subscriber();

        let source = tempfile::tempdir().unwrap();
        let log_dir = tempfile::tempdir().unwrap();

        let config = build_config(
            source.path(),
            &system_command("true"),
            log_dir.path(),
            &["--extra-flag=--delete"],
        );
        let report_paths = ReportPaths::new(log_dir.path(), Local::now());

        let exit_code = run_with_cancellation_token(
            config,
            report_paths.clone(),
            create_upload_cancellation_token(),
        )
        .await;
        assert_eq!(exit_code, EXIT_CODE_SAFETY_GUARD);

        let report = read_report(&report_paths);
        assert_eq!(report["status"], "failed");
        assert!(
            report["error"].as_str().unwrap().contains("--delete"),
            "{}",
            report["error"]
        );
    }

    #[tokio::test]
    async fn run_cancelled_before_upload() {
        init_dummy_tracing_subscriber();

        let source = tempfile::tempdir().unwrap();
        let log_dir = tempfile::tempdir().unwrap();

        let config = build_config(source.path(), &system_command("true"), log_dir.path(), &[]);
        let report_paths = ReportPaths::new(log_dir.path(), Local::now());

        let cancellation_token = create_upload_cancellation_token();
        cancellation_token.cancel();

        let exit_code =
            run_with_cancellation_token(config, report_paths.clone(), cancellation_token).await;
        assert_eq!(exit_code, EXIT_CODE_ERROR);

        let report = read_report(&report_paths);
        assert_eq!(report["error"], "cancelled");
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
