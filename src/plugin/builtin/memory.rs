//! In-process bounded FIFO queue.
//!
//! Receives `queue-name` with its options; `capacity` is an optional
//! positive integer (default 1024). Contents do not survive the process.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::plugin::{BrokerModule, InitError, ModuleInstance, ModuleOptions};

pub const MODULE_ID: &str = "memory";
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct MemoryQueueModule;

impl BrokerModule for MemoryQueueModule {
    fn id(&self) -> &str {
        MODULE_ID
    }

    fn initialize(&self, options: &ModuleOptions) -> Result<Arc<dyn ModuleInstance>, InitError> {
        let name = options
            .get("queue-name")
            .and_then(Value::as_str)
            .ok_or_else(|| InitError::Rejected("'queue-name' must be a string".into()))?
            .to_string();

        let capacity = match options.get("capacity") {
            None => DEFAULT_CAPACITY,
            Some(v) => match v.as_u64() {
                Some(n) if n > 0 => usize::try_from(n)
                    .map_err(|_| InitError::Rejected(format!("'capacity' too large: {n}")))?,
                _ => {
                    return Err(InitError::Rejected(format!(
                        "'capacity' must be a positive integer, got {v}"
                    )));
                }
            },
        };

        Ok(Arc::new(MemoryQueue {
            name,
            capacity,
            items: Mutex::new(VecDeque::new()),
        }))
    }
}

#[derive(Debug)]
pub struct MemoryQueue {
    name: String,
    capacity: usize,
    items: Mutex<VecDeque<Value>>,
}

impl MemoryQueue {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue a job payload. Returns it back when the queue is full.
    pub fn push(&self, job: Value) -> Result<(), Value> {
        let mut items = self.lock();
        if items.len() >= self.capacity {
            return Err(job);
        }
        items.push_back(job);
        Ok(())
    }

    pub fn pop(&self) -> Option<Value> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Value>> {
        // Queue contents stay consistent across a panicking holder.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ModuleInstance for MemoryQueue {
    fn module_id(&self) -> &str {
        MODULE_ID
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
