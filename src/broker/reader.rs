//! Broker config file reading.
//!
//! Any failure to get bytes from the path is `ConfigFileNotFound`, including
//! permission errors and directories. Bytes that do not form a JSON document
//! (empty, whitespace, invalid UTF-8, syntax errors) are `CouldNotLoadJson`.

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::catalog::ErrorCode;
use super::result::ConfigError;

pub fn read_document(path: &Path) -> Result<Value, ConfigError> {
    let bytes = fs::read(path).map_err(|e| {
        ConfigError::new(
            ErrorCode::ConfigFileNotFound,
            format!("cannot read {}: {e}", path.display()),
        )
    })?;

    parse_document(&bytes).map_err(|detail| {
        ConfigError::new(
            ErrorCode::CouldNotLoadJson,
            format!("{}: {detail}", path.display()),
        )
    })
}

fn parse_document(bytes: &[u8]) -> Result<Value, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("not valid UTF-8: {e}"))?;
    if text.trim().is_empty() {
        return Err("file is empty".to_string());
    }
    serde_json::from_str(text).map_err(|e| format!("parse error: {e}"))
}
