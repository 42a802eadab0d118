//! Echo worker: returns each job payload wrapped with a prefix.
//! Used for wiring checks without a real worker backend.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;

use crate::plugin::{BrokerModule, InitError, ModuleInstance, ModuleOptions};

pub const MODULE_ID: &str = "echo";
const DEFAULT_PREFIX: &str = "[echo]";

#[derive(Debug, Clone, Copy)]
pub struct EchoModule;

impl BrokerModule for EchoModule {
    fn id(&self) -> &str {
        MODULE_ID
    }

    fn initialize(&self, options: &ModuleOptions) -> Result<Arc<dyn ModuleInstance>, InitError> {
        let prefix = match options.get("prefix") {
            None => DEFAULT_PREFIX.to_string(),
            Some(Value::String(p)) => p.clone(),
            Some(other) => {
                return Err(InitError::Rejected(format!(
                    "'prefix' must be a string, got {other}"
                )));
            }
        };
        Ok(Arc::new(EchoWorker { prefix }))
    }
}

#[derive(Debug, Clone)]
pub struct EchoWorker {
    prefix: String,
}

impl EchoWorker {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn run(&self, payload: &Value) -> Value {
        serde_json::json!({ "prefix": self.prefix, "payload": payload })
    }
}

impl ModuleInstance for EchoWorker {
    fn module_id(&self) -> &str {
        MODULE_ID
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> ModuleOptions {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn default_prefix() {
        let instance = EchoModule.initialize(&ModuleOptions::new()).unwrap();
        let worker = instance.as_any().downcast_ref::<EchoWorker>().unwrap();
        assert_eq!(worker.prefix(), "[echo]");
        assert_eq!(worker.run(&json!(1)), json!({ "prefix": "[echo]", "payload": 1 }));
    }

    #[test]
    fn custom_prefix() {
        let instance = EchoModule.initialize(&options(json!({ "prefix": ">>" }))).unwrap();
        let worker = instance.as_any().downcast_ref::<EchoWorker>().unwrap();
        assert_eq!(worker.prefix(), ">>");
    }

    #[test]
    fn non_string_prefix_rejected() {
        let err = EchoModule
            .initialize(&options(json!({ "prefix": 42 })))
            .unwrap_err();
        assert!(matches!(err, InitError::Rejected(_)));
    }

    #[test]
    fn unknown_options_ignored() {
        assert!(EchoModule.initialize(&options(json!({ "threads": 4 }))).is_ok());
    }
}
