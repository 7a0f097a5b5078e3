//! Pipeline building and execution.
//!
//! This module provides:
//! - Spec parsing and validation
//! - The pipeline builder and configuration
//! - The execution engine, including child pipelines

mod builder;
mod config;
mod engine;
mod spec;
mod tasks;

pub use builder::PipelineBuilder;
pub use config::{PipelineConfig, DEFAULT_TIMEOUT_SECS};
pub use engine::{Pipeline, PipelineHandle};
pub use spec::{read_spec_file, OutputSpec, PipelineSpec, StageDescriptor, INPUT_REFERENCE};

use crate::errors::PipelineError;
use serde_json::Value;

/// Builds a pipeline with the default configuration and the global
/// registry, then runs it.
///
/// # Errors
///
/// Returns the annotated error if construction or the run fails.
pub async fn execute<I, K>(document: Value, inputs: I) -> Result<Value, PipelineError>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Pipeline::new(document)?.run(inputs).await
}
