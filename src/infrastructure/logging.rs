use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::DomainError;

/// Initialize logging: a console layer, plus a daily-rolling JSON file
/// layer when file logging is enabled.
///
/// Returns the non-blocking writer guard; it must live as long as the
/// application or buffered log lines are lost on exit.
pub fn init_logging(
    logs_dir: &Path,
    level: &str,
    file_logging: bool,
) -> Result<Option<WorkerGuard>, DomainError> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("voicedesk={},warn", level))),
        );

    let (file_layer, guard) = if file_logging {
        fs::create_dir_all(logs_dir)?;
        let appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, "voicedesk.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .json()
            .with_filter(EnvFilter::new(format!("voicedesk={}", level)));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // try_init keeps repeated initialization (tests) from panicking.
    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    tracing::info!(
        level = level,
        file_logging = file_logging,
        "Logging initialized"
    );

    Ok(guard)
}
