//! Pluggable worker and queue modules.
//!
//! A broker config names its modules by string identifier. The
//! [`registry::ModuleRegistry`] maps each identifier to a loader that yields a
//! [`BrokerModule`]; [`init::initialize`] then runs the module's
//! initialization against the node's remaining options.
//!
//! Modules are opaque to the broker beyond that contract: the instances they
//! return are handed to the caller, who downcasts them via
//! [`ModuleInstance::as_any`] to drive jobs.

pub mod builtin;
pub mod init;
pub mod registry;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Options passed to a module's initialization: the node's fields minus the
/// module identifier.
pub type ModuleOptions = serde_json::Map<String, serde_json::Value>;

/// Which side of a job registration a module serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleRole {
    Worker,
    Queue,
}

impl ModuleRole {
    /// Config key holding this role's module identifier.
    pub const fn module_key(self) -> &'static str {
        match self {
            ModuleRole::Worker => "worker-module",
            ModuleRole::Queue => "queue-module",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ModuleRole::Worker => "worker",
            ModuleRole::Queue => "queue",
        }
    }
}

impl fmt::Display for ModuleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no {role} module registered as '{id}'")]
    NotFound { role: ModuleRole, id: String },
    #[error("{0}")]
    Load(String),
}

#[derive(Debug, Error)]
pub enum InitError {
    /// The module does not expose an initialization entry point.
    #[error("module does not support initialization")]
    Unsupported,
    /// The module declined the supplied options.
    #[error("initialization rejected: {0}")]
    Rejected(String),
    /// Initialization itself failed (I/O, connection, …).
    #[error("initialization failed: {0}")]
    Failed(String),
}

/// A resolved, not yet initialized module.
///
/// Implementations must be `Send + Sync`; a registry hands out shared
/// handles that overlapping loads may use concurrently.
pub trait BrokerModule: Send + Sync {
    /// Identifier this module was registered under.
    fn id(&self) -> &str;

    /// Build a live instance from the node options.
    ///
    /// May block (opening a connection, reading files). No timeout is
    /// imposed by the broker. The default reports [`InitError::Unsupported`].
    fn initialize(&self, _options: &ModuleOptions) -> Result<Arc<dyn ModuleInstance>, InitError> {
        Err(InitError::Unsupported)
    }
}

/// An initialized module, owned by the loaded broker.
pub trait ModuleInstance: Send + Sync + fmt::Debug {
    fn module_id(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}
