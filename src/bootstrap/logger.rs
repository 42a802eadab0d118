//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup, after settings are resolved. The broker's
//! debug mode is a logging concern too: it adds a directive that lets the
//! loader's step events through whatever base level is in effect.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::AppError;

/// Target of the config loading pipeline's events.
pub const BROKER_TARGET: &str = "jobbroker::broker";

/// What the global subscriber should emit, and where.
#[derive(Debug, Clone, Copy)]
pub struct LogSetup<'a> {
    /// A level (`"info"`) or any `EnvFilter` directive string
    /// (`"warn,jobbroker=debug"`).
    pub level: &'a str,
    /// `level` wins over `RUST_LOG` (set when it came from `-v` flags).
    pub prefer_level: bool,
    /// Broker debug mode: always show pipeline steps.
    pub trace_broker: bool,
    pub log_file: Option<&'a Path>,
}

/// Initialise the global tracing subscriber.
pub fn init(setup: LogSetup<'_>) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(
        setup.level,
        rust_log.as_deref(),
        setup.prefer_level,
        setup.trace_broker,
    )?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(open_writer(setup.log_file)?)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Pick the filter from the configured level and `RUST_LOG`.
///
/// With `prefer_level`, `level` is used and `RUST_LOG` is only a fallback
/// when `level` does not parse; otherwise the reverse.
pub fn build_filter(
    level: &str,
    rust_log: Option<&str>,
    prefer_level: bool,
    trace_broker: bool,
) -> Result<EnvFilter, AppError> {
    let from_env = || rust_log.and_then(|spec| EnvFilter::try_new(spec).ok());

    let filter = if prefer_level {
        match EnvFilter::try_new(level) {
            Ok(filter) => filter,
            Err(e) => from_env().ok_or_else(|| invalid_level(level, e))?,
        }
    } else {
        match from_env() {
            Some(filter) => filter,
            None => EnvFilter::try_new(level).map_err(|e| invalid_level(level, e))?,
        }
    };

    if !trace_broker {
        return Ok(filter);
    }
    let directive: Directive = format!("{BROKER_TARGET}=debug")
        .parse()
        .map_err(|e| AppError::Logger(format!("broker directive: {e}")))?;
    Ok(filter.add_directive(directive))
}

fn invalid_level(level: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Logger(format!("invalid log level '{level}': {err}"))
}

fn open_writer(log_file: Option<&Path>) -> Result<BoxMakeWriter, AppError> {
    let Some(path) = log_file else {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::Logger(format!("failed to open log file '{}': {e}", path.display())))?;
    Ok(BoxMakeWriter::new(file))
}

/// Map a `-v` count to a level: 1 → warn, 2 → info, 3 → debug, 4+ → trace.
pub fn level_for_verbosity(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    }
}
