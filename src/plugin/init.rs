//! Module initialization with failure containment.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::registry::panic_message;
use super::{BrokerModule, InitError, ModuleInstance, ModuleOptions};

/// Run `module.initialize(options)`, converting a panic into
/// [`InitError::Failed`] so no unwinding crosses the broker boundary.
pub fn initialize(
    module: &dyn BrokerModule,
    options: &ModuleOptions,
) -> Result<Arc<dyn ModuleInstance>, InitError> {
    match panic::catch_unwind(AssertUnwindSafe(|| module.initialize(options))) {
        Ok(result) => result,
        Err(payload) => Err(InitError::Failed(format!(
            "module '{}' panicked during initialization: {}",
            module.id(),
            panic_message(payload.as_ref())
        ))),
    }
}
