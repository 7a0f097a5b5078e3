//! Pipeline builder.

use super::{Pipeline, PipelineConfig, PipelineSpec};
use crate::errors::PipelineError;
use crate::functions::{global_registry, FunctionRegistry};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug)]
enum Source {
    Document(Value),
    Spec(PipelineSpec),
}

/// Builder for pipelines with a custom configuration or registry.
#[derive(Debug)]
pub struct PipelineBuilder {
    source: Source,
    config: PipelineConfig,
    registry: Option<Arc<FunctionRegistry>>,
}

impl PipelineBuilder {
    /// Starts from a spec document.
    #[must_use]
    pub fn new(document: Value) -> Self {
        Self {
            source: Source::Document(document),
            config: PipelineConfig::default(),
            registry: None,
        }
    }

    /// Starts from an already parsed spec.
    #[must_use]
    pub fn from_spec(spec: PipelineSpec) -> Self {
        Self {
            source: Source::Spec(spec),
            config: PipelineConfig::default(),
            registry: None,
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.config = self.config.with_timeout_secs(seconds);
        self
    }

    /// Resolves functions from `registry` instead of the global one.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Builds the pipeline graph.
    ///
    /// # Errors
    ///
    /// Returns the annotated error if the spec is malformed or names an
    /// unknown function.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let spec = match self.source {
            Source::Spec(spec) => spec,
            Source::Document(document) => {
                let document = Arc::new(document);
                PipelineSpec::parse(Arc::clone(&document))
                    .map_err(|err| PipelineError::new(&document, err))?
            }
        };
        let spec = Arc::new(spec);
        let registry = self.registry.unwrap_or_else(global_registry);

        Pipeline::assemble(Arc::clone(&spec), None, None, registry, self.config)
            .map_err(|err| PipelineError::new(spec.document(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DagErrorKind, ERROR_MARKER};
    use serde_json::json;

    #[test]
    fn test_build_with_defaults() {
        let pipeline = PipelineBuilder::new(json!({"input": ["x"], "output": "input.x"}))
            .with_registry(Arc::new(FunctionRegistry::new()))
            .build()
            .unwrap();

        assert_eq!(pipeline.config(), &PipelineConfig::default());
        assert_eq!(pipeline.spec().input(), ["x"]);
    }

    #[test]
    fn test_with_timeout() {
        let spec = PipelineSpec::from_value(json!({"output": "input"})).unwrap();
        let pipeline = PipelineBuilder::from_spec(spec)
            .with_timeout_secs(2.5)
            .build()
            .unwrap();

        assert_eq!(pipeline.config().timeout_secs, 2.5);
    }

    #[test]
    fn test_unknown_function_is_reported_at_stage() {
        let err = PipelineBuilder::new(json!({
            "stages": [{"name": "a", "func": "nope"}],
            "output": "a"
        }))
        .with_registry(Arc::new(FunctionRegistry::new()))
        .build()
        .unwrap_err();

        assert!(matches!(
            err.cause().kind(),
            DagErrorKind::UnknownFunction { func } if func == "nope"
        ));
        let marked = err
            .report()
            .lines()
            .find(|line| line.contains(ERROR_MARKER))
            .unwrap();
        assert!(marked.trim_start().starts_with('{'));
        assert!(marked.contains("unknown function \"nope\""));
    }
}
