//! # Logging Utilities
//!
//! Logging for zvaldump using `tracing`.
//!
//! Rendered values are the program's output on stdout, so console logs always
//! go to **stderr**. A log file can be added on top.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zvaldump_utils::init_logging;
//!
//! // Keep the guard alive until exit, it flushes the log file
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Level filter (e.g. `RUST_LOG=debug`, `RUST_LOG=zvaldump_core=trace`)
//! - `ZVALDUMP_LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
//! - `ZVALDUMP_LOG_FILE`: Optional log file. `{date}` in the path is replaced
//!   by the current UTC date, e.g. `/tmp/{date}-zvaldump.log`
//!
//! Without `RUST_LOG` or an explicit level only warnings and errors are shown.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Format variable
pub const LOG_FORMAT_ENV: &str = "ZVALDUMP_LOG_FORMAT";
/// Log file variable
pub const LOG_FILE_ENV: &str = "ZVALDUMP_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s} (use 'pretty' or 'json')"))),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    /// Per-entry hash table walking
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s} (use 'error', 'warn', 'info', 'debug' or 'trace')"
            ))),
        }
    }
}

/// Keeps the background log-file writer alive
///
/// Dropping it flushes and closes the file. Hold it until the end of `main`.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuard
{
    file: Option<WorkerGuard>,
    path: Option<PathBuf>,
}

impl LoggingGuard
{
    /// The log file in use, if any
    pub fn log_file(&self) -> Option<&Path>
    {
        self.path.as_deref()
    }

    pub fn has_file(&self) -> bool
    {
        self.file.is_some()
    }
}

/// Initialize logging from the environment
///
/// - `RUST_LOG`: Level filter, default `warn`
/// - `ZVALDUMP_LOG_FORMAT`: Output format
/// - `ZVALDUMP_LOG_FILE`: Optional log file
///
/// ## Errors
///
/// - `InvalidFormat`: unknown `ZVALDUMP_LOG_FORMAT`
/// - `InitializationFailed`: logging is already initialized
/// - `FileError`: the log file's directory can't be created
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = match std::env::var(LOG_FORMAT_ENV) {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::default(),
    };
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| Level::WARN.to_string());
    init_logging_internal(format, &directives)
}

/// Initialize logging with an explicit level, ignoring `RUST_LOG`
///
/// ## Example
///
/// ```rust,no_run
/// use zvaldump_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the log file's
/// directory can't be created.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, &Level::from(level).to_string())
}

/// Expand `{date}` in a `ZVALDUMP_LOG_FILE` value
pub fn expand_log_path(template: &str) -> PathBuf
{
    let today = Utc::now().format("%Y-%m-%d").to_string();
    PathBuf::from(template.replace("{date}", &today))
}

fn init_logging_internal(format: LogFormat, directives: &str) -> Result<LoggingGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = vec![console_layer(format, env_filter(directives))];
    let mut guard = LoggingGuard::default();

    if let Ok(template) = std::env::var(LOG_FILE_ENV) {
        let path = expand_log_path(&template);
        let (layer, worker) = file_layer(&path, format, env_filter(directives))?;
        layers.push(layer);
        guard = LoggingGuard {
            file: Some(worker),
            path: Some(path),
        };
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

/// A bad `RUST_LOG` falls back to `warn` instead of failing
fn env_filter(directives: &str) -> EnvFilter
{
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(io::stderr().is_terminal())
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(path: &Path, format: LogFormat, filter: EnvFilter) -> Result<(BoxedLayer, WorkerGuard), LoggingError>
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory)?;
    let file_name = path.file_name().unwrap_or_default();

    // The date is already part of the name when wanted, so never roll.
    let appender = tracing_appender::rolling::never(&directory, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    };
    Ok((layer, worker))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// A global subscriber is already set
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
