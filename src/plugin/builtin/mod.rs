//! Compiled-in modules, registered by [`ModuleRegistry::with_builtins`].
//!
//! Adding a module = new file here + one `register_*` call below.
//!
//! [`ModuleRegistry::with_builtins`]: super::registry::ModuleRegistry::with_builtins

pub mod echo;
pub mod memory;

use std::sync::Arc;

use super::registry::ModuleRegistry;

pub fn register(registry: &mut ModuleRegistry) {
    registry
        .register_worker(Arc::new(echo::EchoModule))
        .register_queue(Arc::new(memory::MemoryQueueModule));
}
