//! Logger initialization.
//!
//! This module provides functions to initialize the logger with custom formatting
//! and to attach the in-memory ring buffer of recent records.

use std::io::Write;
use std::sync::Arc;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;
use crate::logging::LogBuffer;
use colored::*;
use log::{LevelFilter, Log, Metadata, Record};

/// Forwards records to `env_logger` and copies them into a [`LogBuffer`].
struct BufferedLogger {
    inner: env_logger::Logger,
    buffer: Arc<LogBuffer>,
}

impl Log for BufferedLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.inner.matches(record) {
            self.buffer.push(record);
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initializes the logger with the specified level and format.
///
/// Configures `env_logger` with custom formatting. Supports both plain text
/// (with colors) and JSON formats for structured logging.
///
/// The logger reads from the `RUST_LOG` environment variable by default, but
/// the provided `level` parameter will override it.
///
/// # Arguments
///
/// * `level` - Minimum log level to display (overrides `RUST_LOG` if set)
/// * `format` - Log format (Plain or Json)
///
/// # Returns
///
/// The ring buffer that receives a copy of every logged record.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// # Per-module filtering via RUST_LOG
/// RUST_LOG=pr0gramm_transport=debug,reqwest=info pr0gramm_transport https://pr0gramm.com/
/// ```
pub fn init_logger_with(
    level: LevelFilter,
    format: LogFormat,
) -> Result<Arc<LogBuffer>, InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();

    // Override with CLI-provided level (takes precedence over RUST_LOG)
    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);
    builder.filter_module("rustls", LevelFilter::Warn);
    // hickory logs every truncated UDP answer as a warning
    builder.filter_module("hickory_proto", LevelFilter::Error);
    builder.filter_module("pr0gramm_transport", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = record.level();
                let colored_level = match level {
                    log::Level::Error => level.to_string().red(),
                    log::Level::Warn => level.to_string().yellow(),
                    log::Level::Info => level.to_string().green(),
                    log::Level::Debug => level.to_string().blue(),
                    log::Level::Trace => level.to_string().purple(),
                };

                writeln!(
                    buf,
                    "[{}] {} [{}] {}",
                    std::thread::current().name().unwrap_or("unnamed"),
                    record.target().cyan(),
                    colored_level,
                    record.args()
                )
            });
        }
    }

    let inner = builder.build();
    let max_level = inner.filter();
    let buffer = Arc::new(LogBuffer::new());

    log::set_boxed_logger(Box::new(BufferedLogger {
        inner,
        buffer: Arc::clone(&buffer),
    }))?;
    log::set_max_level(max_level);

    Ok(buffer)
}
