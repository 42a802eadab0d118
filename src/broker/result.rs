//! Load outcomes: the internal step error, the caller-facing result, and the
//! assembled broker.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::catalog::ErrorCode;
use crate::plugin::ModuleInstance;

/// Failure of one pipeline step, already classified.
///
/// `detail` is diagnostic text only; callers branch on `code`.
#[derive(Debug, Clone, Error)]
#[error("{code}: {detail}")]
pub struct ConfigError {
    pub code: ErrorCode,
    pub detail: String,
}

impl ConfigError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// The single outcome of a load call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    pub error_code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoadResult {
    pub fn success() -> Self {
        Self {
            error_code: ErrorCode::None,
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code.is_success()
    }

    /// The published catalog this result's code belongs to.
    pub fn error_codes(&self) -> &'static [ErrorCode] {
        &ErrorCode::ALL
    }
}

impl From<ConfigError> for LoadResult {
    fn from(err: ConfigError) -> Self {
        Self {
            error_code: err.code,
            message: Some(err.detail),
        }
    }
}

/// One jobType's initialized worker/queue pair.
#[derive(Debug, Clone)]
pub struct JobRegistration {
    pub job_type: String,
    pub worker_module: String,
    pub worker: Arc<dyn ModuleInstance>,
    pub queue_module: String,
    pub queue_name: String,
    pub queue: Arc<dyn ModuleInstance>,
}

/// Broker topology produced by a successful load. Owned by the caller.
#[derive(Debug)]
pub struct LoadedBroker {
    id: Uuid,
    jobs: HashMap<String, JobRegistration>,
    /// jobTypes in first-seen document order.
    order: Vec<String>,
}

impl LoadedBroker {
    /// Assemble from registrations in document order. A repeated jobType
    /// replaces the earlier registration but keeps its position.
    pub(crate) fn assemble(registrations: Vec<JobRegistration>) -> Self {
        let mut jobs = HashMap::with_capacity(registrations.len());
        let mut order = Vec::with_capacity(registrations.len());
        for reg in registrations {
            if !jobs.contains_key(&reg.job_type) {
                order.push(reg.job_type.clone());
            }
            jobs.insert(reg.job_type.clone(), reg);
        }
        Self {
            id: Uuid::new_v4(),
            jobs,
            order,
        }
    }

    /// Distinct per load call, even for the same config.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn get(&self, job_type: &str) -> Option<&JobRegistration> {
        self.jobs.get(job_type)
    }

    pub fn job_types(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn registrations(&self) -> impl Iterator<Item = &JobRegistration> {
        self.order.iter().filter_map(|t| self.jobs.get(t))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
