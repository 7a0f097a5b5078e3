//! Mock stage functions for testing.

use anyhow::anyhow;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::contracts::TypeSpec;
use crate::core::Resolvable;
use crate::functions::{FunctionDef, FunctionRegistry};

/// `identity(value) -> value`.
#[must_use]
pub fn identity() -> FunctionDef {
    FunctionDef::from_sync("identity", |call| {
        Ok(call.arg("value").cloned().unwrap_or(Value::Null))
    })
    .with_input("value", TypeSpec::Any)
    .with_category(["testing"])
    .with_description("Returns its argument.")
}

/// `double(x: integer) -> integer`.
#[must_use]
pub fn double() -> FunctionDef {
    FunctionDef::from_sync("double", |call| Ok(json!(call.get::<i64>("x")? * 2)))
        .with_input("x", TypeSpec::Integer)
        .with_output(TypeSpec::Integer)
        .with_category(["testing"])
        .with_description("Doubles an integer.")
}

/// `add(a: integer, b: integer) -> integer`.
#[must_use]
pub fn add() -> FunctionDef {
    FunctionDef::from_sync("add", |call| {
        Ok(json!(call.get::<i64>("a")? + call.get::<i64>("b")?))
    })
    .with_input("a", TypeSpec::Integer)
    .with_input("b", TypeSpec::Integer)
    .with_output(TypeSpec::Integer)
    .with_category(["testing"])
}

/// `fail(message = "stage failed")`, always errors.
#[must_use]
pub fn fail() -> FunctionDef {
    FunctionDef::from_sync("fail", |call| {
        let message: String = call.get("message")?;
        Err(anyhow!(message))
    })
    .with_optional_input("message", TypeSpec::String, json!("stage failed"))
    .with_category(["testing"])
}

/// `never()`, never completes.
#[must_use]
pub fn never() -> FunctionDef {
    FunctionDef::from_fn("never", |_| futures::future::pending::<anyhow::Result<Resolvable>>())
        .with_category(["testing"])
}

/// `sleep_then(ms: integer, value = null) -> value`, after `ms`
/// milliseconds.
#[must_use]
pub fn sleep_then() -> FunctionDef {
    FunctionDef::from_fn("sleep_then", |call| async move {
        let ms: u64 = call.get("ms")?;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok::<_, anyhow::Error>(Resolvable::Ready(
            call.arg("value").cloned().unwrap_or(Value::Null),
        ))
    })
    .with_input("ms", TypeSpec::Integer)
    .with_optional_input("value", TypeSpec::Any, Value::Null)
    .with_category(["testing"])
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// The registered function name.
    pub func: String,
    /// The resolved arguments.
    pub args: Map<String, Value>,
}

/// Records every call made to the functions it creates.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a function named `name` that records its arguments and
    /// returns its `value` argument (null when absent). Any argument is
    /// accepted.
    #[must_use]
    pub fn function(&self, name: &str) -> FunctionDef {
        let calls = Arc::clone(&self.calls);
        let func = name.to_string();
        FunctionDef::from_sync(name, move |call| {
            calls.lock().push(RecordedCall {
                func: func.clone(),
                args: call.args().clone(),
            });
            Ok(call.arg("value").cloned().unwrap_or(Value::Null))
        })
        .with_extra_args()
        .with_category(["testing"])
    }

    /// Returns all calls in the order they happened.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the `value` argument of every call, in call order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .map(|call| call.args.get("value").cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Clears recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

/// Builds a registry with the built-ins and every mock in this module.
#[must_use]
pub fn test_registry() -> Arc<FunctionRegistry> {
    let registry = FunctionRegistry::with_builtins();
    for def in [identity(), double(), add(), fail(), never(), sleep_then()] {
        registry.register(def);
    }
    Arc::new(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::Invocation;

    fn stage() -> Arc<Value> {
        Arc::new(json!({"name": "s", "func": "f"}))
    }

    fn args(pairs: &[(&str, Value)]) -> Vec<(String, Resolvable)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), Resolvable::Ready(v.clone())))
            .collect()
    }

    #[tokio::test]
    async fn test_arithmetic_mocks() {
        let doubled = double()
            .invoke(Invocation::new(stage(), args(&[("x", json!(4))])))
            .await
            .unwrap();
        assert_eq!(doubled, json!(8));

        let sum = add()
            .invoke(Invocation::new(stage(), args(&[("a", json!(2)), ("b", json!(3))])))
            .await
            .unwrap();
        assert_eq!(sum, json!(5));
    }

    #[tokio::test]
    async fn test_fail_uses_message() {
        let err = fail()
            .invoke(Invocation::new(stage(), args(&[("message", json!("nope"))])))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");

        let err = fail().invoke(Invocation::new(stage(), Vec::new())).await.unwrap_err();
        assert_eq!(err.to_string(), "stage failed");
    }

    #[tokio::test]
    async fn test_never_does_not_complete() {
        let def = never();
        let call = def.invoke(Invocation::new(stage(), Vec::new()));
        let result = tokio::time::timeout(Duration::from_millis(20), call).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_recorder() {
        let recorder = CallRecorder::new();
        let def = recorder.function("rec");

        let value = def
            .invoke(Invocation::new(stage(), args(&[("value", json!(1)), ("extra", json!(true))])))
            .await
            .unwrap();

        assert_eq!(value, json!(1));
        assert_eq!(recorder.call_count(), 1);
        assert_eq!(recorder.values(), [json!(1)]);
        assert_eq!(recorder.calls()[0].func, "rec");

        recorder.reset();
        assert_eq!(recorder.call_count(), 0);
    }

    #[test]
    fn test_registry_contents() {
        let registry = test_registry();
        for name in ["map", "identity", "double", "add", "fail", "never", "sleep_then"] {
            assert!(registry.contains(name), "{name} missing");
        }
    }
}
