//! Structural checks over the parsed broker document.
//!
//! Each accessor performs exactly one check from the fixed validation order
//! and returns the first failure as a classified [`ConfigError`]. The
//! pipeline in [`super::JobBroker`] calls them in sequence, interleaved with
//! module resolution, so the first problem in document order wins.
//!
//! A value of the wrong JSON type counts as missing, except `queue-name`,
//! where a present non-string value is an invalid name. `null` is absent.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::catalog::ErrorCode;
use super::result::ConfigError;
use crate::plugin::{ModuleOptions, ModuleRole};

pub const WORKERS_KEY: &str = "workers";
pub const JOB_TYPE_KEY: &str = "jobType";
pub const WORKER_KEY: &str = "worker";
pub const QUEUE_KEY: &str = "queue";
pub const QUEUE_NAME_KEY: &str = "queue-name";

/// Allowed queue names: 1–128 of ASCII alphanumerics, `_`, `.`, `-`.
pub const QUEUE_NAME_PATTERN: &str = r"^[A-Za-z0-9_.\-]{1,128}$";

static QUEUE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(QUEUE_NAME_PATTERN).expect("queue name pattern compiles"));

pub fn is_valid_queue_name(name: &str) -> bool {
    QUEUE_NAME_RE.is_match(name)
}

/// Top-level `workers` collection, non-empty.
pub fn workers(document: &Value) -> Result<&[Value], ConfigError> {
    let workers = document
        .get(WORKERS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ConfigError::new(
                ErrorCode::WorkersNotSpecified,
                "top-level 'workers' array is not specified",
            )
        })?;

    if workers.is_empty() {
        return Err(ConfigError::new(ErrorCode::NoWorkers, "'workers' is empty"));
    }
    Ok(workers.as_slice())
}

pub fn job_type(entry: &Value, index: usize) -> Result<&str, ConfigError> {
    non_empty_str(entry, JOB_TYPE_KEY).ok_or_else(|| {
        ConfigError::new(
            ErrorCode::JobTypeMissing,
            format!("workers[{index}]: '{JOB_TYPE_KEY}' missing or empty"),
        )
    })
}

pub fn worker_node(entry: &Value, index: usize) -> Result<&Value, ConfigError> {
    object_node(entry, WORKER_KEY).ok_or_else(|| {
        ConfigError::new(
            ErrorCode::WorkerNodeMissing,
            format!("workers[{index}]: '{WORKER_KEY}' node missing"),
        )
    })
}

pub fn queue_node(entry: &Value, index: usize) -> Result<&Value, ConfigError> {
    object_node(entry, QUEUE_KEY).ok_or_else(|| {
        ConfigError::new(
            ErrorCode::QueueNodeMissing,
            format!("workers[{index}]: '{QUEUE_KEY}' node missing"),
        )
    })
}

/// The role's module identifier inside its node.
pub fn module_id(node: &Value, role: ModuleRole, index: usize) -> Result<&str, ConfigError> {
    let code = match role {
        ModuleRole::Worker => ErrorCode::WorkerModuleMissing,
        ModuleRole::Queue => ErrorCode::QueueModuleMissing,
    };
    non_empty_str(node, role.module_key()).ok_or_else(|| {
        ConfigError::new(
            code,
            format!("workers[{index}].{role}: '{}' missing or empty", role.module_key()),
        )
    })
}

pub fn queue_name(queue: &Value, index: usize) -> Result<&str, ConfigError> {
    let value = queue.get(QUEUE_NAME_KEY).filter(|v| !v.is_null()).ok_or_else(|| {
        ConfigError::new(
            ErrorCode::QueueNameMissing,
            format!("workers[{index}].queue: '{QUEUE_NAME_KEY}' missing"),
        )
    })?;

    match value.as_str() {
        Some(name) if is_valid_queue_name(name) => Ok(name),
        _ => Err(ConfigError::new(
            ErrorCode::QueueNameInvalid,
            format!("workers[{index}].queue: '{QUEUE_NAME_KEY}' {value} does not match {QUEUE_NAME_PATTERN}"),
        )),
    }
}

/// Node fields passed to initialization: everything but the module key.
pub fn module_options(node: &Value, role: ModuleRole) -> ModuleOptions {
    let mut options = node.as_object().cloned().unwrap_or_default();
    options.remove(role.module_key());
    options
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn object_node<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| v.is_object())
}
