//! Job broker loading: config file to initialized worker/queue topology.
//!
//! One load call runs a fixed, fail-fast sequence:
//!
//! 1. read and parse the file ([`reader`])
//! 2. top-level `workers` presence ([`schema::workers`])
//! 3. per entry, in array order: `jobType` → `worker` node → `worker-module`
//!    → resolve + initialize worker → `queue` node → `queue-module` →
//!    `queue-name` → name pattern → resolve + initialize queue
//! 4. global `(queue-module, queue-name)` uniqueness ([`duplicates`])
//!
//! The first failure ends the call. Its [`ErrorCode`] is delivered once, with
//! no broker; on success the [`LoadedBroker`] comes with `ErrorCode::None`.
//! Each call parses its own document and shares nothing mutable with
//! overlapping calls.

pub mod catalog;
pub mod duplicates;
pub mod reader;
pub mod result;
pub mod schema;

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::plugin::registry::{ModuleRegistry, panic_message};
use crate::plugin::{BrokerModule, ModuleInstance, ModuleRole, init};

pub use catalog::{ErrorCategory, ErrorCode};
pub use result::{ConfigError, JobRegistration, LoadResult, LoadedBroker};

/// What a load call delivers: the result, plus the broker iff it succeeded.
pub type LoadOutcome = (LoadResult, Option<LoadedBroker>);

/// The load task ended without invoking its completion.
#[derive(Debug, Error)]
#[error("broker load task ended without delivering a result")]
pub struct LoadDropped;

/// Pipeline step tracing: `info` in debug mode, `debug` otherwise.
macro_rules! step {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+)
        } else {
            debug!($($arg)+)
        }
    };
}

/// Every module and instance a load touched. Held until the outcome is
/// decided so that no plugin `Drop` runs inside the pipeline.
#[derive(Default)]
struct Staged {
    modules: Vec<Arc<dyn BrokerModule>>,
    instances: Vec<Arc<dyn ModuleInstance>>,
}

impl Staged {
    fn release(self) {
        for module in self.modules {
            release_one(module);
        }
        for instance in self.instances {
            release_one(instance);
        }
    }
}

fn release_one<T>(item: T) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || drop(item))) {
        warn!(
            panic = %panic_message(payload.as_ref()),
            "module panicked while being released"
        );
    }
}

/// Loads broker configs against a module registry.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct JobBroker {
    registry: Arc<ModuleRegistry>,
    debug: bool,
}

impl JobBroker {
    /// `debug` only raises diagnostic verbosity; outcomes never depend on it.
    pub fn new(registry: ModuleRegistry, debug: bool) -> Self {
        Self {
            registry: Arc::new(registry),
            debug,
        }
    }

    pub fn with_builtins(debug: bool) -> Self {
        Self::new(ModuleRegistry::with_builtins(), debug)
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Load `path` in the background and invoke `on_complete` exactly once.
    ///
    /// Returns immediately. Runs on tokio's blocking pool when called inside
    /// a runtime, on a dedicated thread otherwise, since module
    /// initialization may block.
    pub fn load<F>(&self, path: impl Into<PathBuf>, on_complete: F)
    where
        F: FnOnce(LoadResult, Option<LoadedBroker>) + Send + 'static,
    {
        let broker = self.clone();
        let path = path.into();
        let job = move || {
            let (result, loaded) = broker.load_blocking(&path);
            on_complete(result, loaded);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                std::thread::spawn(job);
            }
        }
    }

    /// Await a load's completion through a oneshot channel.
    pub async fn load_async(&self, path: impl Into<PathBuf>) -> Result<LoadOutcome, LoadDropped> {
        let (tx, rx) = oneshot::channel();
        self.load(path, move |result, loaded| {
            // Receiver gone means the caller stopped waiting.
            let _ = tx.send((result, loaded));
        });
        rx.await.map_err(|_| LoadDropped)
    }

    /// Run the whole pipeline on the current thread.
    pub fn load_blocking(&self, path: &Path) -> LoadOutcome {
        let started = Instant::now();
        step!(self.debug, path = %path.display(), "loading broker config");

        let mut staged = Staged::default();
        let outcome = match self.assemble(path, &mut staged) {
            Ok(loaded) => {
                info!(
                    path = %path.display(),
                    broker_id = %loaded.id(),
                    job_types = loaded.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "broker config loaded"
                );
                (LoadResult::success(), Some(loaded))
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error_code = %err.code,
                    code = err.code.code(),
                    detail = %err.detail,
                    "broker config rejected"
                );
                (LoadResult::from(err), None)
            }
        };
        staged.release();
        outcome
    }

    fn assemble(&self, path: &Path, staged: &mut Staged) -> Result<LoadedBroker, ConfigError> {
        let document = reader::read_document(path)?;
        let entries = schema::workers(&document)?;
        step!(self.debug, entries = entries.len(), "workers present");

        let mut registrations = Vec::with_capacity(entries.len());
        let mut job_types = HashSet::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let registration = self.load_entry(index, entry, staged)?;
            if !job_types.insert(registration.job_type.clone()) {
                warn!(
                    index,
                    job_type = %registration.job_type,
                    "jobType defined more than once; later entry replaces earlier"
                );
            }
            registrations.push(registration);
        }

        duplicates::check(
            registrations
                .iter()
                .map(|r| (r.queue_module.as_str(), r.queue_name.as_str())),
        )?;

        Ok(LoadedBroker::assemble(registrations))
    }

    fn load_entry(
        &self,
        index: usize,
        entry: &Value,
        staged: &mut Staged,
    ) -> Result<JobRegistration, ConfigError> {
        let job_type = schema::job_type(entry, index)?;

        let worker_node = schema::worker_node(entry, index)?;
        let worker_module = schema::module_id(worker_node, ModuleRole::Worker, index)?;
        let worker = self.activate(ModuleRole::Worker, worker_module, worker_node, index, staged)?;

        let queue_node = schema::queue_node(entry, index)?;
        let queue_module = schema::module_id(queue_node, ModuleRole::Queue, index)?;
        let queue_name = schema::queue_name(queue_node, index)?;
        let queue = self.activate(ModuleRole::Queue, queue_module, queue_node, index, staged)?;

        step!(
            self.debug,
            index,
            job_type,
            worker_module,
            queue_module,
            queue_name,
            "entry ready"
        );

        Ok(JobRegistration {
            job_type: job_type.to_string(),
            worker_module: worker_module.to_string(),
            worker,
            queue_module: queue_module.to_string(),
            queue_name: queue_name.to_string(),
            queue,
        })
    }

    /// Resolve then initialize one module, classifying failures by role.
    fn activate(
        &self,
        role: ModuleRole,
        module_id: &str,
        node: &Value,
        index: usize,
        staged: &mut Staged,
    ) -> Result<Arc<dyn ModuleInstance>, ConfigError> {
        let (load_code, init_code) = match role {
            ModuleRole::Worker => (
                ErrorCode::WorkerModuleCouldNotBeLoaded,
                ErrorCode::WorkerModuleCouldNotBeInitialized,
            ),
            ModuleRole::Queue => (
                ErrorCode::QueueModuleCouldNotBeLoaded,
                ErrorCode::QueueModuleCouldNotBeInitialized,
            ),
        };

        let module = self
            .registry
            .resolve(module_id, role)
            .map_err(|e| ConfigError::new(load_code, format!("workers[{index}]: {e}")))?;
        staged.modules.push(Arc::clone(&module));

        let options = schema::module_options(node, role);
        step!(
            self.debug,
            index,
            %role,
            module = module_id,
            options = ?options,
            "initializing module"
        );

        let instance = init::initialize(module.as_ref(), &options).map_err(|e| {
            ConfigError::new(
                init_code,
                format!("workers[{index}]: {role} module '{module_id}': {e}"),
            )
        })?;
        staged.instances.push(Arc::clone(&instance));
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    use serde_json::json;
    use tempfile::NamedTempFile;

    use crate::plugin::{BrokerModule, InitError, ModuleOptions, ResolveError};

    #[derive(Debug)]
    struct Instance(String);

    impl ModuleInstance for Instance {
        fn module_id(&self) -> &str {
            &self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Succeeds and counts initializations.
    struct Counting {
        id: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl BrokerModule for Counting {
        fn id(&self) -> &str {
            self.id
        }

        fn initialize(&self, _options: &ModuleOptions) -> Result<Arc<dyn ModuleInstance>, InitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Instance(self.id.to_string())))
        }
    }

    struct NoInit(&'static str);

    impl BrokerModule for NoInit {
        fn id(&self) -> &str {
            self.0
        }
    }

    struct Panicking(&'static str);

    /// Initializes fine; its instance panics when dropped.
    struct Grumpy;

    #[derive(Debug)]
    struct GrumpyInstance;

    impl ModuleInstance for GrumpyInstance {
        fn module_id(&self) -> &str {
            "grumpy"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Drop for GrumpyInstance {
        fn drop(&mut self) {
            panic!("worker refused to shut down")
        }
    }

    impl BrokerModule for Grumpy {
        fn id(&self) -> &str {
            "grumpy"
        }

        fn initialize(&self, _options: &ModuleOptions) -> Result<Arc<dyn ModuleInstance>, InitError> {
            Ok(Arc::new(GrumpyInstance))
        }
    }

    impl BrokerModule for Panicking {
        fn id(&self) -> &str {
            self.0
        }

        fn initialize(&self, _options: &ModuleOptions) -> Result<Arc<dyn ModuleInstance>, InitError> {
            panic!("backend unreachable")
        }
    }

    fn write_doc(doc: &Value) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(doc.to_string().as_bytes()).unwrap();
        f
    }

    fn entry(job_type: &str, worker: &str, queue: &str, name: &str) -> Value {
        json!({
            "jobType": job_type,
            "worker": { "worker-module": worker },
            "queue": { "queue-module": queue, "queue-name": name }
        })
    }

    fn test_broker() -> (JobBroker, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ModuleRegistry::with_builtins();
        registry
            .register_worker(Arc::new(Counting { id: "counting", calls: Arc::clone(&calls) }))
            .register_worker(Arc::new(NoInit("inert")))
            .register_worker(Arc::new(Panicking("panicky")))
            .register_worker(Arc::new(Grumpy))
            .register_queue(Arc::new(NoInit("inert-queue")))
            .register_queue(Arc::new(Panicking("panicky-queue")))
            .register_queue_loader("unloadable", || {
                Err(ResolveError::Load("shared object missing".into()))
            });
        (JobBroker::new(registry, false), calls)
    }

    fn outcome(doc: Value) -> LoadOutcome {
        let (broker, _) = test_broker();
        let f = write_doc(&doc);
        broker.load_blocking(f.path())
    }

    fn code(doc: Value) -> ErrorCode {
        outcome(doc).0.error_code
    }

    #[test]
    fn valid_config_yields_broker() {
        let (result, loaded) = outcome(json!({
            "workers": [entry("resize", "echo", "memory", "resize-jobs")]
        }));
        assert!(result.is_success());
        assert_eq!(result.message, None);
        let loaded = loaded.unwrap();
        assert_eq!(loaded.job_types().collect::<Vec<_>>(), vec!["resize"]);
        let reg = loaded.get("resize").unwrap();
        assert_eq!(reg.worker.module_id(), "echo");
        assert_eq!(reg.queue.module_id(), "memory");
        assert_eq!(reg.queue_name, "resize-jobs");
    }

    #[test]
    fn failure_carries_no_broker() {
        let (result, loaded) = outcome(json!({ "workers": [] }));
        assert_eq!(result.error_code, ErrorCode::NoWorkers);
        assert!(loaded.is_none());
    }

    #[test]
    fn module_without_initialize_is_init_failure() {
        assert_eq!(
            code(json!({ "workers": [entry("a", "inert", "memory", "q")] })),
            ErrorCode::WorkerModuleCouldNotBeInitialized
        );
        assert_eq!(
            code(json!({ "workers": [entry("a", "echo", "inert-queue", "q")] })),
            ErrorCode::QueueModuleCouldNotBeInitialized
        );
    }

    #[test]
    fn initializer_panic_is_contained() {
        assert_eq!(
            code(json!({ "workers": [entry("a", "panicky", "memory", "q")] })),
            ErrorCode::WorkerModuleCouldNotBeInitialized
        );
        assert_eq!(
            code(json!({ "workers": [entry("a", "echo", "panicky-queue", "q")] })),
            ErrorCode::QueueModuleCouldNotBeInitialized
        );
    }

    #[test]
    fn loader_error_is_load_failure() {
        assert_eq!(
            code(json!({ "workers": [entry("a", "echo", "unloadable", "q")] })),
            ErrorCode::QueueModuleCouldNotBeLoaded
        );
        assert_eq!(
            code(json!({ "workers": [entry("a", "missing", "memory", "q")] })),
            ErrorCode::WorkerModuleCouldNotBeLoaded
        );
    }

    #[test]
    fn worker_checked_before_queue_fields() {
        // Bad worker module and missing queue node: the worker failure wins.
        assert_eq!(
            code(json!({ "workers": [{ "jobType": "a", "worker": { "worker-module": "missing" } }] })),
            ErrorCode::WorkerModuleCouldNotBeLoaded
        );
    }

    #[test]
    fn queue_name_checked_before_queue_resolution() {
        assert_eq!(
            code(json!({ "workers": [entry("a", "echo", "missing", "bad name")] })),
            ErrorCode::QueueNameInvalid
        );
    }

    #[test]
    fn earlier_entry_error_wins() {
        let doc = json!({ "workers": [
            { "jobType": "a", "worker": { "worker-module": "echo" } },
            { "worker": { "worker-module": "echo" } }
        ]});
        assert_eq!(code(doc), ErrorCode::QueueNodeMissing);
    }

    #[test]
    fn later_entries_not_examined_after_failure() {
        let (broker, calls) = test_broker();
        let f = write_doc(&json!({ "workers": [
            { "jobType": "a" },
            entry("b", "counting", "memory", "q")
        ]}));
        let (result, _) = broker.load_blocking(f.path());
        assert_eq!(result.error_code, ErrorCode::WorkerNodeMissing);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn entry_errors_precede_duplicate_scan() {
        let doc = json!({ "workers": [
            entry("a", "echo", "memory", "q"),
            entry("b", "echo", "memory", "q"),
            { "jobType": "c" }
        ]});
        assert_eq!(code(doc), ErrorCode::WorkerNodeMissing);
    }

    #[test]
    fn duplicate_queue_pair_detected() {
        let doc = json!({ "workers": [
            entry("a", "echo", "memory", "q"),
            entry("b", "echo", "memory", "q")
        ]});
        let (result, loaded) = outcome(doc);
        assert_eq!(result.error_code, ErrorCode::QueueDefinedTwice);
        assert!(result.message.unwrap().starts_with("workers[1]"));
        assert!(loaded.is_none());
    }

    #[test]
    fn options_reach_initializer() {
        let doc = json!({ "workers": [{
            "jobType": "a",
            "worker": { "worker-module": "echo", "prefix": 5 },
            "queue": { "queue-module": "memory", "queue-name": "q" }
        }]});
        assert_eq!(code(doc), ErrorCode::WorkerModuleCouldNotBeInitialized);
    }

    #[test]
    fn debug_flag_does_not_change_outcome() {
        let doc = json!({ "workers": [entry("a", "echo", "memory", "bad name")] });
        let f = write_doc(&doc);
        let quiet = JobBroker::with_builtins(false).load_blocking(f.path()).0;
        let verbose = JobBroker::with_builtins(true).load_blocking(f.path()).0;
        assert_eq!(quiet, verbose);
    }

    #[test]
    fn callback_runs_once_without_runtime() {
        let (broker, _) = test_broker();
        let f = write_doc(&json!({ "workers": [entry("a", "echo", "memory", "q")] }));
        let (tx, rx) = mpsc::channel();
        broker.load(f.path(), move |result, loaded| {
            tx.send((result.error_code, loaded.is_some())).unwrap();
        });
        let delivered = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(delivered, (ErrorCode::None, true));
        // Sender dropped after the single delivery.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn callback_runs_once_when_instance_drop_panics() {
        let (broker, _) = test_broker();
        let f = write_doc(&json!({ "workers": [entry("a", "grumpy", "missing", "q")] }));
        let (tx, rx) = mpsc::channel();
        broker.load(f.path(), move |result, loaded| {
            tx.send((result.error_code, loaded.is_some())).unwrap();
        });
        let delivered = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(delivered, (ErrorCode::QueueModuleCouldNotBeLoaded, false));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[tokio::test]
    async fn load_async_delivers_result() {
        let (broker, _) = test_broker();
        let (result, loaded) = broker.load_async("randon").await.unwrap();
        assert_eq!(result.error_code, ErrorCode::ConfigFileNotFound);
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn repeated_loads_build_independent_brokers() {
        let (broker, calls) = test_broker();
        let f = write_doc(&json!({ "workers": [entry("a", "counting", "memory", "q")] }));
        let (r1, b1) = broker.load_async(f.path()).await.unwrap();
        let (r2, b2) = broker.load_async(f.path()).await.unwrap();
        assert!(r1.is_success() && r2.is_success());
        let (b1, b2) = (b1.unwrap(), b2.unwrap());
        assert_ne!(b1.id(), b2.id());
        assert!(!Arc::ptr_eq(
            &b1.get("a").unwrap().worker,
            &b2.get("a").unwrap().worker
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn overlapping_loads_complete_independently() {
        let (broker, _) = test_broker();
        let good = write_doc(&json!({ "workers": [entry("a", "echo", "memory", "q")] }));
        let bad = write_doc(&json!({}));
        let (a, b) = tokio::join!(broker.load_async(good.path()), broker.load_async(bad.path()));
        assert_eq!(a.unwrap().0.error_code, ErrorCode::None);
        assert_eq!(b.unwrap().0.error_code, ErrorCode::WorkersNotSpecified);
    }
}
