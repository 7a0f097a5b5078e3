//! Name-to-function table.

use super::FunctionDef;
use crate::builtins::{register_builtins, INTERNAL_FUNCTIONS};
use crate::contracts::FunctionDescriptor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Registered functions by name.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: RwLock<HashMap<String, Arc<FunctionDef>>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in control-flow functions.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        register_builtins(&registry);
        registry
    }

    /// Registers a function, replacing any function of the same name.
    pub fn register(&self, def: FunctionDef) {
        let name = def.name().to_string();
        let replaced = self
            .functions
            .write()
            .insert(name.clone(), Arc::new(def))
            .is_some();
        if replaced {
            warn!(func = %name, "replacing registered function");
        }
    }

    /// Looks up a function.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<FunctionDef>> {
        self.functions.read().get(name).cloned()
    }

    /// Checks if a function is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }

    /// Lists registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.read().is_empty()
    }

    /// Describes every registered function except the built-in
    /// control-flow ones, sorted by name.
    #[must_use]
    pub fn catalog(&self) -> Vec<FunctionDescriptor> {
        self.catalog_excluding(INTERNAL_FUNCTIONS)
    }

    /// Describes every registered function not named in `exclude`, sorted
    /// by name.
    #[must_use]
    pub fn catalog_excluding(&self, exclude: &[&str]) -> Vec<FunctionDescriptor> {
        let mut catalog: Vec<FunctionDescriptor> = self
            .functions
            .read()
            .values()
            .filter(|def| !exclude.contains(&def.name()))
            .map(|def| def.descriptor())
            .collect();
        catalog.sort_by(|a, b| a.func.cmp(&b.func));
        catalog
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

// Global registry
static GLOBAL_REGISTRY: RwLock<Option<Arc<FunctionRegistry>>> = RwLock::new(None);

/// Gets the process-wide registry, creating it with the built-ins on first
/// use.
pub fn global_registry() -> Arc<FunctionRegistry> {
    if let Some(registry) = GLOBAL_REGISTRY.read().as_ref() {
        return Arc::clone(registry);
    }

    let mut write = GLOBAL_REGISTRY.write();
    Arc::clone(write.get_or_insert_with(|| Arc::new(FunctionRegistry::with_builtins())))
}

/// Registers a function in the process-wide registry.
pub fn register(def: FunctionDef) {
    global_registry().register(def);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::TypeSpec;
    use serde_json::{json, Value};

    fn noop(name: &str) -> FunctionDef {
        FunctionDef::from_sync(name, |_| Ok(Value::Null))
    }

    #[test]
    fn test_registry_creation() {
        let registry = FunctionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("map").is_none());
    }

    #[test]
    fn test_with_builtins() {
        let registry = FunctionRegistry::with_builtins();
        for name in INTERNAL_FUNCTIONS {
            assert!(registry.contains(name), "{name} should be registered");
        }
    }

    #[test]
    fn test_register_replaces() {
        let registry = FunctionRegistry::new();
        registry.register(noop("f"));
        registry.register(noop("f").with_output(TypeSpec::None));

        assert_eq!(registry.len(), 1);
        let def = registry.get("f").unwrap();
        assert_eq!(def.output(), &TypeSpec::None);
    }

    #[test]
    fn test_catalog_skips_internal_functions() {
        let registry = FunctionRegistry::with_builtins();
        registry.register(noop("zeta").with_category(["text"]));
        registry.register(noop("alpha"));

        let catalog = registry.catalog();
        let names: Vec<&str> = catalog.iter().map(|d| d.func.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);

        let everything = registry.catalog_excluding(&[]);
        assert_eq!(everything.len(), 2 + INTERNAL_FUNCTIONS.len());
    }

    #[test]
    fn test_catalog_serializes() {
        let registry = FunctionRegistry::new();
        registry.register(
            noop("upper")
                .with_input("text", TypeSpec::String)
                .with_output(TypeSpec::String)
                .with_description("Upper-cases text."),
        );

        let catalog = serde_json::to_value(registry.catalog()).unwrap();
        assert_eq!(
            catalog,
            json!([{
                "func": "upper",
                "input": {"text": {"type": "string"}},
                "output": {"type": "string"},
                "description": "Upper-cases text.",
                "category": ["default"]
            }])
        );
    }

    #[test]
    fn test_global_registry_is_shared() {
        register(noop("registry_test_global_fn"));
        assert!(global_registry().contains("registry_test_global_fn"));
        assert!(global_registry().contains("map"));
    }
}
