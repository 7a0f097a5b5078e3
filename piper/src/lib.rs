//! # Piper
//!
//! A scheduler for declaratively specified computation graphs.
//!
//! A pipeline document names its inputs, a list of stages and an output
//! shape. Each stage calls a registered function; its arguments are either
//! static `params` or `input` references such as `"fetch.items.0.name"` that
//! point at another stage's result (or at `input`). The engine wires the
//! dependency graph from those references at run time and runs independent
//! stages concurrently:
//!
//! - **Path resolution**: dot-separated references with index and key steps
//! - **Function registry**: typed, category-tagged stage functions
//! - **Child pipelines**: `map`, `remap_regex` and `case_regex` built-ins
//! - **Fault attribution**: failures are rendered against the spec document
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use piper::prelude::*;
//! use serde_json::json;
//!
//! register(
//!     FunctionDef::from_sync("double", |call| Ok(json!(call.get::<i64>("x")? * 2)))
//!         .with_input("x", TypeSpec::Integer)
//!         .with_output(TypeSpec::Integer),
//! );
//!
//! let spec = json!({
//!     "input": ["x"],
//!     "stages": [
//!         {"name": "doubled", "func": "double", "input": {"x": "input.x"}}
//!     ],
//!     "output": {"result": "doubled"}
//! });
//!
//! let output = Pipeline::new(spec)?.run([("x", json!(21))]).await?;
//! assert_eq!(output, json!({"result": 42}));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod builtins;
pub mod contracts;
pub mod core;
pub mod errors;
pub mod functions;
pub mod observability;
pub mod pipeline;
pub mod testing;

pub use crate::errors::{DagError, DagErrorKind, ErrorCategory, PipelineError};
pub use crate::functions::{global_registry, register};
pub use crate::observability::init_tracing;
pub use crate::pipeline::{execute, Pipeline};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::contracts::{FunctionDescriptor, TypeSpec};
    pub use crate::core::{resolve_property, resolve_value, PropertyPath, Resolvable};
    pub use crate::errors::{DagError, DagErrorKind, ErrorCategory, PipelineError};
    pub use crate::functions::{
        global_registry, register, Call, FunctionDef, FunctionRegistry, Param, StageFunction,
    };
    pub use crate::pipeline::{
        execute, OutputSpec, Pipeline, PipelineBuilder, PipelineConfig, PipelineHandle,
        PipelineSpec, StageDescriptor,
    };
}
