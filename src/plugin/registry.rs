//! Module registry: string identifier → module loader.
//!
//! Loaders run on every resolve, so a module that fails to load (missing
//! resource, bad build) is reported per call rather than at registration.
//! Worker and queue identifiers live in separate namespaces.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

use super::{BrokerModule, ModuleRole, ResolveError};

/// Produces a module handle on demand.
pub type ModuleLoader =
    Arc<dyn Fn() -> Result<Arc<dyn BrokerModule>, ResolveError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ModuleRegistry {
    workers: HashMap<String, ModuleLoader>,
    queues: HashMap<String, ModuleLoader>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the compiled-in modules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::builtin::register(&mut registry);
        registry
    }

    /// Register an already-built worker module under its own id.
    pub fn register_worker(&mut self, module: Arc<dyn BrokerModule>) -> &mut Self {
        self.register_module(ModuleRole::Worker, module)
    }

    pub fn register_queue(&mut self, module: Arc<dyn BrokerModule>) -> &mut Self {
        self.register_module(ModuleRole::Queue, module)
    }

    pub fn register_worker_loader<F>(&mut self, id: impl Into<String>, loader: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn BrokerModule>, ResolveError> + Send + Sync + 'static,
    {
        self.register_loader(ModuleRole::Worker, id.into(), Arc::new(loader))
    }

    pub fn register_queue_loader<F>(&mut self, id: impl Into<String>, loader: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn BrokerModule>, ResolveError> + Send + Sync + 'static,
    {
        self.register_loader(ModuleRole::Queue, id.into(), Arc::new(loader))
    }

    fn register_module(&mut self, role: ModuleRole, module: Arc<dyn BrokerModule>) -> &mut Self {
        let id = module.id().to_string();
        self.register_loader(role, id, Arc::new(move || Ok(Arc::clone(&module))))
    }

    fn register_loader(&mut self, role: ModuleRole, id: String, loader: ModuleLoader) -> &mut Self {
        debug!(%role, module = %id, "registering module");
        if self.table_mut(role).insert(id.clone(), loader).is_some() {
            debug!(%role, module = %id, "replaced existing module registration");
        }
        self
    }

    pub fn contains(&self, role: ModuleRole, id: &str) -> bool {
        self.table(role).contains_key(id)
    }

    /// Registered identifiers for `role`, sorted.
    pub fn ids(&self, role: ModuleRole) -> Vec<&str> {
        let mut ids: Vec<&str> = self.table(role).keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve `id` to a module handle.
    ///
    /// A loader panic is caught and reported as [`ResolveError::Load`].
    pub fn resolve(&self, id: &str, role: ModuleRole) -> Result<Arc<dyn BrokerModule>, ResolveError> {
        let loader = self.table(role).get(id).ok_or_else(|| ResolveError::NotFound {
            role,
            id: id.to_string(),
        })?;

        match panic::catch_unwind(AssertUnwindSafe(|| loader())) {
            Ok(result) => result,
            Err(payload) => Err(ResolveError::Load(format!(
                "loader for {role} module '{id}' panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    fn table(&self, role: ModuleRole) -> &HashMap<String, ModuleLoader> {
        match role {
            ModuleRole::Worker => &self.workers,
            ModuleRole::Queue => &self.queues,
        }
    }

    fn table_mut(&mut self, role: ModuleRole) -> &mut HashMap<String, ModuleLoader> {
        match role {
            ModuleRole::Worker => &mut self.workers,
            ModuleRole::Queue => &mut self.queues,
        }
    }
}

/// Best-effort text from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
