//! Published error catalog: every outcome a load call can report.
//!
//! Names and numeric codes are a stable contract: callers branch on them
//! directly. Codes are grouped by hundreds per [`ErrorCategory`].

use std::fmt;

use serde::Serialize;

/// Coarse grouping of catalog entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Success,
    /// The config path or its content.
    File,
    /// Required structure missing or malformed.
    Structure,
    /// Module resolution or initialization.
    Plugin,
    Uniqueness,
}

/// One variant per catalog entry. `None` is the success sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "none")]
    None,
    ConfigFileNotFound,
    CouldNotLoadJson,
    WorkersNotSpecified,
    NoWorkers,
    JobTypeMissing,
    WorkerNodeMissing,
    WorkerModuleMissing,
    QueueNodeMissing,
    QueueModuleMissing,
    QueueNameMissing,
    QueueNameInvalid,
    WorkerModuleCouldNotBeLoaded,
    WorkerModuleCouldNotBeInitialized,
    QueueModuleCouldNotBeLoaded,
    QueueModuleCouldNotBeInitialized,
    QueueDefinedTwice,
}

impl ErrorCode {
    /// The full catalog, success sentinel first.
    pub const ALL: [ErrorCode; 17] = [
        ErrorCode::None,
        ErrorCode::ConfigFileNotFound,
        ErrorCode::CouldNotLoadJson,
        ErrorCode::WorkersNotSpecified,
        ErrorCode::NoWorkers,
        ErrorCode::JobTypeMissing,
        ErrorCode::WorkerNodeMissing,
        ErrorCode::WorkerModuleMissing,
        ErrorCode::QueueNodeMissing,
        ErrorCode::QueueModuleMissing,
        ErrorCode::QueueNameMissing,
        ErrorCode::QueueNameInvalid,
        ErrorCode::WorkerModuleCouldNotBeLoaded,
        ErrorCode::WorkerModuleCouldNotBeInitialized,
        ErrorCode::QueueModuleCouldNotBeLoaded,
        ErrorCode::QueueModuleCouldNotBeInitialized,
        ErrorCode::QueueDefinedTwice,
    ];

    pub const fn code(self) -> u16 {
        match self {
            ErrorCode::None => 0,
            ErrorCode::ConfigFileNotFound => 100,
            ErrorCode::CouldNotLoadJson => 101,
            ErrorCode::WorkersNotSpecified => 200,
            ErrorCode::NoWorkers => 201,
            ErrorCode::JobTypeMissing => 202,
            ErrorCode::WorkerNodeMissing => 203,
            ErrorCode::WorkerModuleMissing => 204,
            ErrorCode::QueueNodeMissing => 205,
            ErrorCode::QueueModuleMissing => 206,
            ErrorCode::QueueNameMissing => 207,
            ErrorCode::QueueNameInvalid => 208,
            ErrorCode::WorkerModuleCouldNotBeLoaded => 300,
            ErrorCode::WorkerModuleCouldNotBeInitialized => 301,
            ErrorCode::QueueModuleCouldNotBeLoaded => 302,
            ErrorCode::QueueModuleCouldNotBeInitialized => 303,
            ErrorCode::QueueDefinedTwice => 400,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ErrorCode::None => "none",
            ErrorCode::ConfigFileNotFound => "ConfigFileNotFound",
            ErrorCode::CouldNotLoadJson => "CouldNotLoadJson",
            ErrorCode::WorkersNotSpecified => "WorkersNotSpecified",
            ErrorCode::NoWorkers => "NoWorkers",
            ErrorCode::JobTypeMissing => "JobTypeMissing",
            ErrorCode::WorkerNodeMissing => "WorkerNodeMissing",
            ErrorCode::WorkerModuleMissing => "WorkerModuleMissing",
            ErrorCode::QueueNodeMissing => "QueueNodeMissing",
            ErrorCode::QueueModuleMissing => "QueueModuleMissing",
            ErrorCode::QueueNameMissing => "QueueNameMissing",
            ErrorCode::QueueNameInvalid => "QueueNameInvalid",
            ErrorCode::WorkerModuleCouldNotBeLoaded => "WorkerModuleCouldNotBeLoaded",
            ErrorCode::WorkerModuleCouldNotBeInitialized => "WorkerModuleCouldNotBeInitialized",
            ErrorCode::QueueModuleCouldNotBeLoaded => "QueueModuleCouldNotBeLoaded",
            ErrorCode::QueueModuleCouldNotBeInitialized => "QueueModuleCouldNotBeInitialized",
            ErrorCode::QueueDefinedTwice => "QueueDefinedTwice",
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.code() == code)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    pub const fn category(self) -> ErrorCategory {
        match self.code() / 100 {
            0 => ErrorCategory::Success,
            1 => ErrorCategory::File,
            2 => ErrorCategory::Structure,
            3 => ErrorCategory::Plugin,
            _ => ErrorCategory::Uniqueness,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, ErrorCode::None)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
