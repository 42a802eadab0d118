//! Runtime settings loading with env-var overrides.
//!
//! Reads `config/jobbroker.toml` relative to the current working directory
//! (or an explicit path), then applies `JOBBROKER_LOG_LEVEL` and
//! `JOBBROKER_DEBUG` env overrides. These settings shape diagnostics only;
//! the broker config document itself is read by [`crate::broker::reader`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_SETTINGS_PATH: &str = "config/jobbroker.toml";

/// Fully-resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Verbose pipeline tracing. Never changes validation outcomes.
    pub debug: bool,
    pub log_level: String,
    /// Optional log file (already expanded, no `~`). `None` logs to stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawSettings {
    #[serde(default)]
    broker: RawBroker,
}

#[derive(Deserialize)]
struct RawBroker {
    #[serde(default)]
    debug: bool,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

impl Default for RawBroker {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Env overrides, gathered once so tests can pass them explicitly.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub debug: Option<bool>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("JOBBROKER_LOG_LEVEL").ok(),
            debug: env::var("JOBBROKER_DEBUG").ok().map(|v| parse_flag(&v)),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Load settings from the given path, or `config/jobbroker.toml`, then apply
/// env-var overrides. If no path is given and the default file does not
/// exist, hardcoded defaults are used.
pub fn load(settings_path: Option<&str>) -> Result<Settings, AppError> {
    let overrides = Overrides::from_env();

    if let Some(path) = settings_path {
        return load_from(Path::new(path), &overrides);
    }

    let default_path = Path::new(DEFAULT_SETTINGS_PATH);
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        Ok(apply_overrides(Settings::default(), &overrides))
    }
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Settings, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Settings(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawSettings = toml::from_str(&raw)
        .map_err(|e| AppError::Settings(format!("parse error in {}: {e}", path.display())))?;

    let b = parsed.broker;
    let settings = Settings {
        debug: b.debug,
        log_level: b.log_level,
        log_file: b.log_file.as_deref().map(expand_home),
    };

    Ok(apply_overrides(settings, overrides))
}

fn apply_overrides(mut settings: Settings, overrides: &Overrides) -> Settings {
    if let Some(level) = &overrides.log_level {
        settings.log_level = level.clone();
    }
    if let Some(debug) = overrides.debug {
        settings.debug = debug;
    }
    settings
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}
