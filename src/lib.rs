// Library root: the broker loader and its module registry.
// The binary entry point is src/main.rs.

pub mod bootstrap;
pub mod broker;
pub mod core;
pub mod plugin;

pub use bootstrap::logger;
pub use crate::core::{error, settings};

pub use broker::{
    ConfigError, ErrorCategory, ErrorCode, JobBroker, JobRegistration, LoadDropped, LoadOutcome,
    LoadResult, LoadedBroker,
};
pub use plugin::registry::ModuleRegistry;
pub use plugin::{BrokerModule, InitError, ModuleInstance, ModuleOptions, ModuleRole, ResolveError};
