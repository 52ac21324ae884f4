//! # Logging Utilities
//!
//! Installs the global `tracing` subscriber for Pyscope.
//!
//! Events go to stderr so they never mix with captured stacks on stdout, and
//! optionally to a daily-rolling file as well.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pyscope_utils::init_logging;
//!
//! // Reads RUST_LOG, PYSCOPE_LOG_FORMAT and PYSCOPE_LOG_FILE
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("sampling started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Level or filter directives (e.g. `debug`, `pyscope_core=trace`)
//! - `PYSCOPE_LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
//! - `PYSCOPE_LOG_FILE`: Also write to this file, rotated daily
//!
//! ## Examples
//!
//! ```rust,no_run
//! use pyscope_utils::{LogFormat, LogLevel, init_logging_with_level};
//!
//! // A -v flag on the command line wins over RUST_LOG
//! let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Json)
//!     .expect("Failed to initialize logging");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" | "dev" => Ok(LogFormat::Pretty),
            "json" | "prod" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level (default for the CLI)
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level, one event per remote read
    Trace,
}

impl LogLevel
{
    /// Level for a `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
    pub fn from_verbosity(count: u8) -> Self
    {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
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
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Resolved logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig
{
    /// Explicit level; overrides `RUST_LOG` when set.
    pub level: Option<LogLevel>,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file, rotated daily.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig
{
    fn default() -> Self
    {
        Self {
            level: None,
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl LogConfig
{
    /// Settings from `PYSCOPE_LOG_FORMAT` and `PYSCOPE_LOG_FILE`.
    ///
    /// ## Errors
    ///
    /// `InvalidFormat` if `PYSCOPE_LOG_FORMAT` is set to something unknown.
    pub fn from_env() -> Result<Self, LoggingError>
    {
        let format = match env::var("PYSCOPE_LOG_FORMAT") {
            Ok(raw) => raw.parse().map_err(LoggingError::InvalidFormat)?,
            Err(_) => LogFormat::Pretty,
        };
        let file = env::var_os("PYSCOPE_LOG_FILE")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            level: None,
            format,
            file,
        })
    }

    fn filter(&self) -> EnvFilter
    {
        match self.level {
            Some(level) => EnvFilter::new(Level::from(level).to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string())),
        }
    }
}

/// Keeps the background file writer alive
///
/// Buffered file output is flushed when this is dropped, so hold it until
/// the program exits.
#[derive(Debug, Default)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `PYSCOPE_LOG_FORMAT` is invalid
/// - The log file's directory cannot be created
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init_with(LogConfig::from_env()?)
}

/// Initialize logging with an explicit level and format
///
/// `PYSCOPE_LOG_FILE` is still honored.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    let file = env::var_os("PYSCOPE_LOG_FILE")
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);
    init_with(LogConfig {
        level: Some(level),
        format,
        file,
    })
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the subscriber described by `config`.
pub fn init_with(config: LogConfig) -> Result<LoggingGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = vec![event_layer(config.format, io::stderr, true, config.filter())];

    let mut guard = LoggingGuard::default();
    if let Some(path) = &config.file {
        let (directory, name) = split_log_path(path)?;
        std::fs::create_dir_all(&directory).map_err(LoggingError::FileError)?;
        let appender = tracing_appender::rolling::daily(directory, name);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(event_layer(config.format, writer, false, config.filter()));
        guard._file = Some(file_guard);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

fn event_layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match format {
        LogFormat::Pretty => layer.with_ansi(ansi).with_filter(filter).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf), LoggingError>
{
    let name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.display().to_string()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((directory, PathBuf::from(name)))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Log file path has no file name
    #[error("Invalid log file path: {0}")]
    InvalidPath(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
