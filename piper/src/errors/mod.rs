//! Error types for pipeline construction and execution.
//!
//! Every failure inside a pipeline is a [`DagError`]: a [`DagErrorKind`]
//! plus the spec node it was first observed at. Outer frames never replace
//! that node. At the `run` boundary the error is wrapped into a
//! [`PipelineError`] whose message is the whole spec rendered with the
//! faulting node marked.

mod render;

pub use render::{render_spec, ERROR_MARKER};

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Broad classes of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The spec or the run inputs are malformed, or the graph was torn down.
    Structural,
    /// A reference path could not be resolved.
    Reference,
    /// A function was called outside its declared signature.
    Contract,
    /// A stage function failed.
    Execution,
    /// The run exceeded its time bound.
    Timeout,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Structural => "structural",
            Self::Reference => "reference",
            Self::Contract => "contract",
            Self::Execution => "execution",
            Self::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// What went wrong.
#[derive(Debug, Clone, Error)]
pub enum DagErrorKind {
    /// The spec document does not have the expected shape.
    #[error("invalid pipeline spec: {message}")]
    InvalidSpec {
        /// Description of the problem.
        message: String,
    },

    /// A stage name contains the path separator.
    #[error("invalid stage name: \"{name}\" (\".\" are forbidden)")]
    InvalidStageName {
        /// The offending name.
        name: String,
    },

    /// Two stages share a name.
    #[error("duplicate name in call graph: {name}")]
    DuplicateStage {
        /// The duplicated name.
        name: String,
    },

    /// A stage calls a function that is not registered.
    #[error("unknown function \"{func}\"")]
    UnknownFunction {
        /// The function name.
        func: String,
    },

    /// `run` received a different number of inputs than declared.
    #[error("incorrect input parameters amount: expected {expected}, got {actual}")]
    InputCount {
        /// Number of declared inputs.
        expected: usize,
        /// Number of supplied inputs.
        actual: usize,
    },

    /// A declared input was not supplied to `run`.
    #[error("missing input parameter \"{name}\"")]
    MissingInput {
        /// The input name.
        name: String,
    },

    /// An input placeholder was awaited but never bound.
    #[error("input \"{name}\" was never bound")]
    UnboundInput {
        /// The input name.
        name: String,
    },

    /// The pipeline owning a stage went away while the stage still needed it.
    #[error("owning pipeline is no longer alive")]
    PipelineDropped,

    /// A reference names a stage that exists nowhere in the pipeline chain.
    #[error("missing stage \"{stage}\" in input param \"{path}\"")]
    MissingStage {
        /// The unresolved first path segment.
        stage: String,
        /// The full reference path.
        path: String,
    },

    /// An index segment points past the end of a sequence.
    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The sequence length.
        len: usize,
    },

    /// A key segment does not exist in a mapping.
    #[error("key \"{key}\" not found")]
    MissingKey {
        /// The missing key.
        key: String,
    },

    /// A segment was applied to a value that cannot be navigated with it.
    #[error("cannot look up \"{segment}\" in {found} value")]
    NotNavigable {
        /// The path segment.
        segment: String,
        /// JSON type of the value.
        found: String,
    },

    /// Arguments were given positionally.
    #[error("positional args are not supported for func \"{func}\"")]
    PositionalArgs {
        /// The function name.
        func: String,
    },

    /// A required argument is absent.
    #[error("func \"{func}\" is missing required argument \"{arg}\"")]
    MissingArgument {
        /// The function name.
        func: String,
        /// The argument name.
        arg: String,
    },

    /// An argument is not part of the function signature.
    #[error("func \"{func}\" got an unexpected argument \"{arg}\"")]
    UnexpectedArgument {
        /// The function name.
        func: String,
        /// The argument name.
        arg: String,
    },

    /// An argument value does not match its declared type.
    #[error("argument \"{arg}\" of func \"{func}\" must be {expected}, got {found}")]
    ArgumentType {
        /// The function name.
        func: String,
        /// The argument name.
        arg: String,
        /// Declared type.
        expected: String,
        /// JSON type of the value.
        found: String,
    },

    /// A return value does not match the declared output type.
    #[error("func \"{func}\" must return {expected}, got {found}")]
    ReturnType {
        /// The function name.
        func: String,
        /// Declared type.
        expected: String,
        /// JSON type of the value.
        found: String,
    },

    /// A stage task ended without producing a result.
    #[error("stage \"{stage}\" was cancelled before producing a result")]
    Cancelled {
        /// The stage name.
        stage: String,
    },

    /// A user function failed.
    #[error("{0}")]
    Execution(Arc<anyhow::Error>),

    /// The run exceeded its time bound.
    #[error("pipeline timed out after {seconds}s")]
    Timeout {
        /// The configured bound in seconds.
        seconds: f64,
    },
}

impl DagErrorKind {
    /// Returns the failure class.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSpec { .. }
            | Self::InvalidStageName { .. }
            | Self::DuplicateStage { .. }
            | Self::UnknownFunction { .. }
            | Self::InputCount { .. }
            | Self::MissingInput { .. }
            | Self::UnboundInput { .. }
            | Self::PipelineDropped
            | Self::Cancelled { .. } => ErrorCategory::Structural,
            Self::MissingStage { .. }
            | Self::IndexOutOfRange { .. }
            | Self::MissingKey { .. }
            | Self::NotNavigable { .. } => ErrorCategory::Reference,
            Self::PositionalArgs { .. }
            | Self::MissingArgument { .. }
            | Self::UnexpectedArgument { .. }
            | Self::ArgumentType { .. }
            | Self::ReturnType { .. } => ErrorCategory::Contract,
            Self::Execution(_) => ErrorCategory::Execution,
            Self::Timeout { .. } => ErrorCategory::Timeout,
        }
    }
}

/// A pipeline failure together with the spec node it is attributed to.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct DagError {
    kind: DagErrorKind,
    node: Option<Arc<Value>>,
}

impl DagError {
    /// Creates an error without attribution.
    #[must_use]
    pub fn new(kind: DagErrorKind) -> Self {
        Self { kind, node: None }
    }

    /// Creates an execution error from any user-level failure.
    #[must_use]
    pub fn execution(error: anyhow::Error) -> Self {
        Self::new(DagErrorKind::Execution(Arc::new(error)))
    }

    /// Creates a structural error for a malformed spec.
    #[must_use]
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::new(DagErrorKind::InvalidSpec {
            message: message.into(),
        })
    }

    /// Attributes the error to `node` unless it is already attributed.
    #[must_use]
    pub fn at(mut self, node: &Arc<Value>) -> Self {
        if self.node.is_none() {
            self.node = Some(Arc::clone(node));
        }
        self
    }

    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> &DagErrorKind {
        &self.kind
    }

    /// Returns the failure class.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns the spec node the failure is attributed to.
    #[must_use]
    pub fn node(&self) -> Option<&Value> {
        self.node.as_deref()
    }
}

impl From<DagErrorKind> for DagError {
    fn from(kind: DagErrorKind) -> Self {
        Self::new(kind)
    }
}

// Errors coming back out of user code keep their attribution when they
// originated inside the engine (child pipelines, nested calls).
impl From<anyhow::Error> for DagError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DagError>() {
            Ok(inner) => inner,
            Err(err) => Self::execution(err),
        }
    }
}

/// The single error reported by a failed pipeline.
///
/// Its message is the spec document with the faulting node marked; the
/// original [`DagError`] is kept as the source.
#[derive(Debug, Error)]
#[error("{report}")]
pub struct PipelineError {
    report: String,
    #[source]
    source: DagError,
}

impl PipelineError {
    /// Renders `source` against `document`.
    #[must_use]
    pub fn new(document: &Value, source: DagError) -> Self {
        Self {
            report: render_spec(document, &source),
            source,
        }
    }

    /// Returns the annotated spec text.
    #[must_use]
    pub fn report(&self) -> &str {
        &self.report
    }

    /// Returns the original error.
    #[must_use]
    pub fn cause(&self) -> &DagError {
        &self.source
    }

    /// Returns the failure class of the original error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.source.category()
    }
}

/// Returns the JSON type name of a value, for error messages.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::error::Error as _;

    #[test]
    fn test_attribution_is_set_once() {
        let inner = Arc::new(json!({"name": "inner"}));
        let outer = Arc::new(json!({"name": "outer"}));

        let err = DagError::new(DagErrorKind::PipelineDropped)
            .at(&inner)
            .at(&outer);

        assert_eq!(err.node(), Some(&json!({"name": "inner"})));
    }

    #[test]
    fn test_categories() {
        let missing = DagErrorKind::MissingStage {
            stage: "a".to_string(),
            path: "a.b".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::Reference);
        assert_eq!(
            DagErrorKind::DuplicateStage { name: "a".to_string() }.category(),
            ErrorCategory::Structural
        );
        assert_eq!(
            DagErrorKind::PositionalArgs { func: "f".to_string() }.category(),
            ErrorCategory::Contract
        );
        assert_eq!(
            DagErrorKind::Timeout { seconds: 1.0 }.category(),
            ErrorCategory::Timeout
        );
    }

    #[test]
    fn test_missing_stage_message() {
        let err = DagError::new(DagErrorKind::MissingStage {
            stage: "fetch".to_string(),
            path: "fetch.items".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "missing stage \"fetch\" in input param \"fetch.items\""
        );
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_attribution() {
        let node = Arc::new(json!({"name": "child"}));
        let original = DagError::new(DagErrorKind::MissingKey { key: "k".to_string() }).at(&node);

        let wrapped: anyhow::Error = original.into();
        let back = DagError::from(wrapped);

        assert_eq!(back.category(), ErrorCategory::Reference);
        assert_eq!(back.node(), Some(&json!({"name": "child"})));
    }

    #[test]
    fn test_plain_anyhow_becomes_execution() {
        let err = DagError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.category(), ErrorCategory::Execution);
        assert_eq!(err.to_string(), "disk on fire");
        assert!(err.node().is_none());
    }

    #[test]
    fn test_pipeline_error_keeps_source() {
        let document = json!({"output": "input"});
        let err = PipelineError::new(
            &document,
            DagError::new(DagErrorKind::Timeout { seconds: 2.0 }),
        );

        assert!(err.report().contains(ERROR_MARKER));
        assert_eq!(err.category(), ErrorCategory::Timeout);
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("pipeline timed out after 2s"));
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({"a": 1})), "object");
    }
}
