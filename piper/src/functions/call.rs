//! Arguments handed to a stage function.

use crate::pipeline::PipelineHandle;
use anyhow::Context as _;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One invocation's resolved arguments plus any requested context.
#[derive(Debug, Clone, Default)]
pub struct Call {
    args: Map<String, Value>,
    stage: Option<Arc<Value>>,
    pipeline: Option<PipelineHandle>,
}

impl Call {
    /// Creates a call with the given keyword arguments.
    #[must_use]
    pub fn new(args: Map<String, Value>) -> Self {
        Self {
            args,
            stage: None,
            pipeline: None,
        }
    }

    /// Attaches the calling stage's descriptor.
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<Value>) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attaches the owning pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineHandle) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Returns all arguments.
    #[must_use]
    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// Returns one argument.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Deserializes one argument.
    ///
    /// # Errors
    ///
    /// Fails if the argument is absent or has the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self
            .args
            .get(name)
            .with_context(|| format!("argument \"{name}\" not provided"))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("argument \"{name}\" has an unexpected shape"))
    }

    /// Removes and returns one argument.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.args.remove(name)
    }

    /// Returns the calling stage's descriptor, if the function asked for it.
    #[must_use]
    pub fn stage(&self) -> Option<&Arc<Value>> {
        self.stage.as_ref()
    }

    /// Returns the owning pipeline, if the function asked for it.
    #[must_use]
    pub fn pipeline(&self) -> Option<&PipelineHandle> {
        self.pipeline.as_ref()
    }
}
