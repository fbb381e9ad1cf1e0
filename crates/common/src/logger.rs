use std::path::Path;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "debug,hyper=warn,hyper_util=warn,reqwest=warn,teloxide=info";

pub const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "bot";
const LOG_FILE_SUFFIX: &str = "log";
const LOG_FILES_KEPT: usize = 5;

/// Installs the global subscriber: compact stdout plus a daily rolling file under
/// `log_dir`. `RUST_LOG` takes precedence over the default filter.
///
/// Keep the returned guard alive until exit, dropping it flushes the file writer.
/// When the log directory cannot be used the process logs to stdout only.
pub fn setup_logger(log_dir: impl AsRef<Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stdout = fmt::layer()
        // .with_file(true)
        // .with_line_number(true)
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .compact();

    let (file, guard, file_error) = match file_appender(log_dir.as_ref()) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_target(true).with_writer(writer);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .init();

    if let Some(e) = file_error {
        warn!("File logging disabled, {}: {}", log_dir.as_ref().display(), e);
    }
    guard
}

fn file_appender(log_dir: &Path) -> Result<RollingFileAppender, InitError> {
    Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(LOG_FILES_KEPT)
        .build(log_dir)
}
