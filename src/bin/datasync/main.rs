use ::tracing::{trace, warn};
use clap::CommandFactory;
use clap_complete::generate;

use datasync::CLIArgs;
use datasync::Config;
use datasync::config::args::{parse_from_args, validate_cli_args};
use datasync::report::ReportPaths;

mod cli;
mod tracing;

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "datasync",
            &mut std::io::stdout(),
        );

        return;
    }

    let started_at = chrono::Local::now();
    let (report_paths, log_file, log_file_error) =
        match ReportPaths::create_unique(&config.log_dir, started_at) {
            Ok((report_paths, log_file)) => (report_paths, Some(log_file), None),
            Err(e) => (ReportPaths::new(&config.log_dir, started_at), None, Some(e)),
        };

    start_tracing(&config, log_file);
    if let Some(e) = log_file_error {
        warn!("{e:#}");
    }

    trace!("config = {:?}", config);

    let exit_code = cli::run(config, report_paths).await;

    std::process::exit(exit_code);
}

#[cfg(not(tarpaulin_include))]
fn load_config_exit_if_err() -> Config {
    let args = parse_from_args(std::env::args_os()).unwrap_or_else(|e| e.exit());
    match validate_cli_args(args) {
        Ok(config) => config,
        Err(e) => {
            let _ = clap::Error::raw(clap::error::ErrorKind::ValueValidation, format!("{e}\n"))
                .print();
            std::process::exit(e.exit_code());
        }
    }
}

/// Returns whether anything will be written to the console or the log file.
fn start_tracing(config: &Config, log_file: Option<std::fs::File>) -> bool {
    if config.tracing_config.is_none() && log_file.is_none() {
        return false;
    }

    tracing::init_tracing(config.tracing_config.as_ref(), log_file);
    true
}
