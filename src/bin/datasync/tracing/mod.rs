use std::env;
use std::fmt;
use std::fs::File;
use std::sync::Mutex;

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FmtSpan, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::{LookupSpan, Registry};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use datasync::config::TracingConfig;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";
const LOG_FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Installs the console layer (when verbosity allows it) and the log file layer.
///
/// The log file always records info and above, or more when the console is more verbose.
pub fn init_tracing(config: Option<&TracingConfig>, log_file: Option<File>) {
    let console_layer = config.map(console_layer);

    let file_layer = log_file.map(|file| {
        let file_level = config
            .map(|config| config.tracing_level.max(log::Level::Info))
            .unwrap_or(log::Level::Info);

        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .event_format(LogFileFormat)
            .with_filter(EnvFilter::new(format!("datasync={file_level}")))
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn console_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync + 'static> {
    let fmt_span = if config.span_events_tracing {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut show_target = true;
    let tracing_level = config.tracing_level;
    let event_filter = if let Ok(filter) = env::var(EVENT_FILTER_ENV_VAR) {
        filter
    } else {
        show_target = false;
        format!("datasync={tracing_level}")
    };

    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(show_target)
        .with_ansi(!config.disable_color_tracing)
        .with_span_events(fmt_span);

    if config.json_tracing {
        Box::new(layer.json().with_filter(EnvFilter::new(event_filter)))
    } else {
        Box::new(layer.with_filter(EnvFilter::new(event_filter)))
    }
}

/// `[YYYY-MM-DD HH:MM:SS] [LEVEL] message key=value ...`
///
/// An info event carrying `success = true` is written with the `SUCCESS` level.
pub struct LogFileFormat;

impl<S, N> FormatEvent<S, N> for LogFileFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = LogFileVisitor::default();
        event.record(&mut visitor);

        let level = *event.metadata().level();
        let level_name = if level == Level::INFO && visitor.success {
            "SUCCESS"
        } else {
            level.as_str()
        };

        write!(
            writer,
            "[{}] [{}] {}",
            Local::now().format(LOG_FILE_TIMESTAMP_FORMAT),
            level_name,
            visitor.message
        )?;
        for (name, value) in &visitor.fields {
            write!(writer, " {name}={value}")?;
        }
        writeln!(writer)
    }
}

#[derive(Default)]
struct LogFileVisitor {
    message: String,
    fields: Vec<(&'static str, String)>,
    success: bool,
}

impl Visit for LogFileVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "success" {
            self.success = value;
            return;
        }
        self.fields.push((field.name(), value.to_string()));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
            return;
        }
        self.fields.push((field.name(), value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
            return;
        }
        self.fields.push((field.name(), format!("{value:?}")));
    }
}
