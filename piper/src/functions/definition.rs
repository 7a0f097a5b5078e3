//! Registration records.

use super::{Call, FnStageFunction, StageFunction, SyncFnStageFunction};
use crate::contracts::{FunctionDescriptor, TypeSpec};
use crate::core::Resolvable;
use crate::errors::{json_type_name, DagError, DagErrorKind};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Category assigned when none is given.
pub const DEFAULT_CATEGORY: &str = "default";

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Keyword name.
    pub name: String,
    /// Declared type.
    pub ty: TypeSpec,
    /// Value used when the argument is omitted. `None` marks the
    /// parameter as required.
    pub default: Option<Value>,
}

impl Param {
    /// Creates a required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>, ty: TypeSpec) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Creates an optional parameter.
    #[must_use]
    pub fn optional(name: impl Into<String>, ty: TypeSpec, default: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            default: Some(default),
        }
    }

    /// Returns true if the parameter has no default.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// A registered function: its handler plus its declared signature.
///
/// Capability flags decide at registration time whether the handler
/// receives the calling stage's descriptor and the owning pipeline.
#[derive(Clone)]
pub struct FunctionDef {
    name: String,
    params: Vec<Param>,
    output: TypeSpec,
    category: Vec<String>,
    description: Option<String>,
    extra_args: bool,
    stage: bool,
    pipeline: bool,
    pub(super) handler: Arc<dyn StageFunction>,
}

impl FunctionDef {
    /// Creates a definition with no parameters returning `any`.
    pub fn new(name: impl Into<String>, handler: impl StageFunction + 'static) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            output: TypeSpec::Any,
            category: vec![DEFAULT_CATEGORY.to_string()],
            description: None,
            extra_args: false,
            stage: false,
            pipeline: false,
            handler: Arc::new(handler),
        }
    }

    /// Creates a definition from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Resolvable>> + Send + 'static,
    {
        Self::new(name, FnStageFunction::new(func))
    }

    /// Creates a definition from a synchronous closure.
    pub fn from_sync<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Call) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::new(name, SyncFnStageFunction::new(func))
    }

    /// Declares a required parameter.
    #[must_use]
    pub fn with_input(mut self, name: impl Into<String>, ty: TypeSpec) -> Self {
        self.params.push(Param::required(name, ty));
        self
    }

    /// Declares an optional parameter.
    #[must_use]
    pub fn with_optional_input(
        mut self,
        name: impl Into<String>,
        ty: TypeSpec,
        default: Value,
    ) -> Self {
        self.params.push(Param::optional(name, ty, default));
        self
    }

    /// Declares the result type.
    #[must_use]
    pub fn with_output(mut self, ty: TypeSpec) -> Self {
        self.output = ty;
        self
    }

    /// Replaces the category tags.
    #[must_use]
    pub fn with_category<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.category = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the documentation string.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Accepts keyword arguments that are not declared.
    #[must_use]
    pub fn with_extra_args(mut self) -> Self {
        self.extra_args = true;
        self
    }

    /// Passes the calling stage's descriptor to the handler.
    #[must_use]
    pub fn with_stage(mut self) -> Self {
        self.stage = true;
        self
    }

    /// Passes the owning pipeline to the handler.
    #[must_use]
    pub fn with_pipeline(mut self) -> Self {
        self.pipeline = true;
        self
    }

    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared parameters.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the declared result type.
    #[must_use]
    pub fn output(&self) -> &TypeSpec {
        &self.output
    }

    /// Returns the category tags.
    #[must_use]
    pub fn category(&self) -> &[String] {
        &self.category
    }

    /// Returns the documentation string.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns true if undeclared arguments are accepted.
    #[must_use]
    pub fn allows_extra_args(&self) -> bool {
        self.extra_args
    }

    /// Returns true if the handler receives the stage descriptor.
    #[must_use]
    pub fn wants_stage(&self) -> bool {
        self.stage
    }

    /// Returns true if the handler receives the owning pipeline.
    #[must_use]
    pub fn wants_pipeline(&self) -> bool {
        self.pipeline
    }

    /// Builds the catalog record for this function.
    #[must_use]
    pub fn descriptor(&self) -> FunctionDescriptor {
        FunctionDescriptor {
            func: self.name.clone(),
            input: self
                .params
                .iter()
                .map(|p| (p.name.clone(), p.ty.clone()))
                .collect(),
            output: self.output.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
        }
    }

    /// Checks resolved keyword arguments against the declared parameters.
    ///
    /// Omitted optional parameters are filled with their defaults.
    ///
    /// # Errors
    ///
    /// Returns a contract error for undeclared arguments (unless extra
    /// arguments are allowed), missing required arguments, and values of
    /// the wrong type.
    pub fn bind_arguments(&self, mut args: Map<String, Value>) -> Result<Map<String, Value>, DagError> {
        if !self.extra_args {
            if let Some(arg) = args
                .keys()
                .find(|key| !self.params.iter().any(|p| &p.name == *key))
            {
                return Err(DagErrorKind::UnexpectedArgument {
                    func: self.name.clone(),
                    arg: arg.clone(),
                }
                .into());
            }
        }

        for param in &self.params {
            match args.get(&param.name) {
                Some(value) if !param.ty.check(value) => {
                    return Err(DagErrorKind::ArgumentType {
                        func: self.name.clone(),
                        arg: param.name.clone(),
                        expected: param.ty.to_string(),
                        found: json_type_name(value).to_string(),
                    }
                    .into());
                }
                Some(_) => {}
                None => match &param.default {
                    Some(default) => {
                        args.insert(param.name.clone(), default.clone());
                    }
                    None => {
                        return Err(DagErrorKind::MissingArgument {
                            func: self.name.clone(),
                            arg: param.name.clone(),
                        }
                        .into());
                    }
                },
            }
        }
        Ok(args)
    }

    /// Checks a resolved result against the declared output type.
    ///
    /// # Errors
    ///
    /// Returns a contract error on mismatch.
    pub fn check_output(&self, value: &Value) -> Result<(), DagError> {
        if self.output.check(value) {
            return Ok(());
        }
        Err(DagErrorKind::ReturnType {
            func: self.name.clone(),
            expected: self.output.to_string(),
            found: json_type_name(value).to_string(),
        }
        .into())
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("output", &self.output)
            .field("category", &self.category)
            .field("extra_args", &self.extra_args)
            .field("stage", &self.stage)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn scale() -> FunctionDef {
        FunctionDef::from_sync("scale", |call| {
            let x: f64 = call.get("x")?;
            let factor: f64 = call.get("factor")?;
            Ok(json!(x * factor))
        })
        .with_input("x", TypeSpec::Float)
        .with_optional_input("factor", TypeSpec::Float, json!(2))
        .with_output(TypeSpec::Float)
    }

    #[test]
    fn test_defaults_fill_omitted_arguments() {
        let bound = scale().bind_arguments(args(json!({"x": 1.5}))).unwrap();
        assert_eq!(Value::Object(bound), json!({"x": 1.5, "factor": 2}));
    }

    #[test]
    fn test_missing_required_argument() {
        let err = scale().bind_arguments(Map::new()).unwrap_err();
        assert!(matches!(
            err.kind(),
            DagErrorKind::MissingArgument { arg, .. } if arg == "x"
        ));
        assert_eq!(err.category(), ErrorCategory::Contract);
    }

    #[test]
    fn test_unexpected_argument() {
        let err = scale()
            .bind_arguments(args(json!({"x": 1, "y": 2})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "func \"scale\" got an unexpected argument \"y\""
        );

        let open = scale().with_extra_args();
        assert!(open.bind_arguments(args(json!({"x": 1, "y": 2}))).is_ok());
    }

    #[test]
    fn test_argument_type_mismatch() {
        let err = scale()
            .bind_arguments(args(json!({"x": "one"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument \"x\" of func \"scale\" must be float, got string"
        );
    }

    #[test]
    fn test_check_output() {
        let def = scale();
        assert!(def.check_output(&json!(3.0)).is_ok());
        let err = def.check_output(&json!([3.0])).unwrap_err();
        assert!(matches!(err.kind(), DagErrorKind::ReturnType { .. }));
    }

    #[test]
    fn test_descriptor() {
        let def = scale()
            .with_category(["math"])
            .with_description("Multiplies x by factor.");
        let descriptor = def.descriptor();

        assert_eq!(descriptor.func, "scale");
        assert_eq!(descriptor.input.len(), 2);
        assert_eq!(descriptor.input["factor"], TypeSpec::Float);
        assert_eq!(descriptor.category, ["math"]);
        assert_eq!(
            descriptor.description.as_deref(),
            Some("Multiplies x by factor.")
        );
    }

    #[test]
    fn test_default_flags() {
        let def = FunctionDef::from_sync("noop", |_| Ok(Value::Null));
        assert!(!def.wants_stage());
        assert!(!def.wants_pipeline());
        assert!(!def.allows_extra_args());
        assert_eq!(def.category(), [DEFAULT_CATEGORY]);
        assert_eq!(def.output(), &TypeSpec::Any);
    }
}
