//! Pipeline spec documents.

use crate::core::PATH_SEPARATOR;
use crate::errors::{DagError, DagErrorKind};
use anyhow::Context as _;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Name reserved for references to the pipeline's own input.
pub const INPUT_REFERENCE: &str = "input";

/// One stage of a spec.
#[derive(Debug, Clone)]
pub struct StageDescriptor {
    /// Unique name within the spec.
    pub name: String,
    /// Registered function to call.
    pub func: String,
    /// Static keyword arguments.
    pub params: Map<String, Value>,
    /// Argument name to reference path.
    pub input: Vec<(String, String)>,
    /// True if `params` or `input` was written as a list.
    pub positional: bool,
    /// The stage's node in the document.
    pub node: Arc<Value>,
    /// Node blamed for unresolved references: the stage's `input` value, or
    /// the stage itself when it has none.
    pub input_node: Arc<Value>,
}

/// The declared output shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    /// One reference; the output is that value.
    Single(String),
    /// A list of references; the output is a list.
    List(Vec<String>),
    /// Named references; the output is an object.
    Named(Vec<(String, String)>),
}

/// A parsed, validated spec document.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    document: Arc<Value>,
    input: Vec<String>,
    input_node: Arc<Value>,
    stages: Vec<StageDescriptor>,
    output: OutputSpec,
    output_node: Arc<Value>,
}

impl PipelineSpec {
    /// Parses a spec document.
    ///
    /// # Errors
    ///
    /// Returns a structural error, attributed to the offending node, when
    /// the document is malformed, a stage name contains `.`, or two stages
    /// share a name.
    pub fn from_value(document: Value) -> Result<Self, DagError> {
        Self::parse(Arc::new(document))
    }

    /// Parses a shared spec document.
    ///
    /// # Errors
    ///
    /// See [`PipelineSpec::from_value`].
    pub fn parse(document: Arc<Value>) -> Result<Self, DagError> {
        let Some(root) = document.as_object() else {
            return Err(DagError::invalid_spec("spec must be an object").at(&document));
        };

        let (input, input_node) = match root.get("input") {
            None => (Vec::new(), Arc::clone(&document)),
            Some(node) => {
                let node = Arc::new(node.clone());
                (parse_input_names(&node)?, node)
            }
        };

        let stages = match root.get("stages") {
            None => Vec::new(),
            Some(Value::Array(stages)) => parse_stages(stages)?,
            Some(other) => {
                return Err(
                    DagError::invalid_spec("\"stages\" must be a list").at(&Arc::new(other.clone()))
                );
            }
        };

        let Some(output_value) = root.get("output") else {
            return Err(DagError::invalid_spec("missing \"output\"").at(&document));
        };
        let output_node = Arc::new(output_value.clone());
        let (output, output_node) = match output_value {
            Value::String(path) => (OutputSpec::Single(path.clone()), Arc::clone(&document)),
            Value::Array(items) => (
                OutputSpec::List(
                    items
                        .iter()
                        .map(|item| reference(item, &output_node))
                        .collect::<Result<_, _>>()?,
                ),
                output_node,
            ),
            Value::Object(entries) => (
                OutputSpec::Named(
                    entries
                        .iter()
                        .map(|(name, item)| Ok((name.clone(), reference(item, &output_node)?)))
                        .collect::<Result<_, DagError>>()?,
                ),
                output_node,
            ),
            _ => {
                return Err(DagError::invalid_spec(
                    "\"output\" must be a path, a list of paths or a mapping of paths",
                )
                .at(&output_node));
            }
        };

        Ok(Self {
            document,
            input,
            input_node,
            stages,
            output,
            output_node,
        })
    }

    /// Returns the whole document.
    #[must_use]
    pub fn document(&self) -> &Arc<Value> {
        &self.document
    }

    /// Returns the declared input names.
    #[must_use]
    pub fn input(&self) -> &[String] {
        &self.input
    }

    /// Returns the node blamed for input binding failures.
    #[must_use]
    pub fn input_node(&self) -> &Arc<Value> {
        &self.input_node
    }

    /// Returns the stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// Returns the output shape.
    #[must_use]
    pub fn output(&self) -> &OutputSpec {
        &self.output
    }

    /// Returns the node blamed for output failures. For a single-path
    /// output this is the whole document.
    #[must_use]
    pub fn output_node(&self) -> &Arc<Value> {
        &self.output_node
    }
}

/// Reads and parses a JSON spec file.
///
/// # Errors
///
/// Fails if the file cannot be read, is not JSON, or is not a valid spec.
pub fn read_spec_file(path: impl AsRef<Path>) -> anyhow::Result<PipelineSpec> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spec file {}", path.display()))?;
    let document: Value = serde_json::from_str(&text)
        .with_context(|| format!("spec file {} is not valid JSON", path.display()))?;
    Ok(PipelineSpec::from_value(document)?)
}

fn parse_input_names(node: &Arc<Value>) -> Result<Vec<String>, DagError> {
    let Some(items) = node.as_array() else {
        return Err(DagError::invalid_spec("\"input\" must be a list of names").at(node));
    };
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        let name = item
            .as_str()
            .ok_or_else(|| DagError::invalid_spec("input names must be strings").at(node))?;
        // repeated names collapse onto their first occurrence
        if seen.insert(name) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn parse_stages(stages: &[Value]) -> Result<Vec<StageDescriptor>, DagError> {
    let mut seen = HashSet::new();
    let mut parsed = Vec::with_capacity(stages.len());
    for stage in stages {
        let stage = parse_stage(Arc::new(stage.clone()))?;
        if !seen.insert(stage.name.clone()) {
            return Err(DagError::new(DagErrorKind::DuplicateStage { name: stage.name }).at(&stage.node));
        }
        parsed.push(stage);
    }
    Ok(parsed)
}

fn parse_stage(node: Arc<Value>) -> Result<StageDescriptor, DagError> {
    let Some(fields) = node.as_object() else {
        return Err(DagError::invalid_spec("stage must be an object").at(&node));
    };
    let text_field = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DagError::invalid_spec(format!("stage needs a string \"{key}\"")).at(&node))
    };
    let name = text_field("name")?;
    let func = text_field("func")?;

    if name.contains(PATH_SEPARATOR) {
        return Err(DagError::new(DagErrorKind::InvalidStageName { name }).at(&node));
    }

    let mut positional = false;
    let params = match fields.get("params") {
        None => Map::new(),
        Some(Value::Object(params)) => params.clone(),
        Some(Value::Array(_)) => {
            positional = true;
            Map::new()
        }
        Some(_) => {
            return Err(DagError::invalid_spec("\"params\" must be a mapping").at(&node));
        }
    };

    let input_node = fields
        .get("input")
        .map_or_else(|| Arc::clone(&node), |input| Arc::new(input.clone()));
    let input = match fields.get("input") {
        None => Vec::new(),
        Some(Value::Object(input)) => input
            .iter()
            .map(|(arg, path)| Ok((arg.clone(), reference(path, &input_node)?)))
            .collect::<Result<_, DagError>>()?,
        Some(Value::Array(_)) => {
            positional = true;
            Vec::new()
        }
        Some(_) => {
            return Err(DagError::invalid_spec("\"input\" must be a mapping").at(&node));
        }
    };

    Ok(StageDescriptor {
        name,
        func,
        params,
        input,
        positional,
        node,
        input_node,
    })
}

fn reference(value: &Value, node: &Arc<Value>) -> Result<String, DagError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DagError::invalid_spec("references must be path strings").at(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;
    use serde_json::json;
    use std::io::Write as _;

    #[test]
    fn test_parse_full_spec() {
        let spec = PipelineSpec::from_value(json!({
            "input": ["text"],
            "stages": [
                {"name": "words", "func": "split", "params": {"sep": " "}, "input": {"text": "input.text"}},
                {"name": "count", "func": "len", "input": {"items": "words"}}
            ],
            "output": {"words": "words", "count": "count"}
        }))
        .unwrap();

        assert_eq!(spec.input(), ["text"]);
        assert_eq!(spec.stages().len(), 2);
        let words = &spec.stages()[0];
        assert_eq!(words.params.get("sep"), Some(&json!(" ")));
        assert_eq!(words.input, [("text".to_string(), "input.text".to_string())]);
        assert!(!words.positional);
        assert_eq!(
            spec.output(),
            &OutputSpec::Named(vec![
                ("words".to_string(), "words".to_string()),
                ("count".to_string(), "count".to_string()),
            ])
        );
        assert_eq!(spec.output_node().as_ref(), &json!({"words": "words", "count": "count"}));
    }

    #[test]
    fn test_single_output_blames_document() {
        let document = json!({"output": "input"});
        let spec = PipelineSpec::from_value(document.clone()).unwrap();
        assert_eq!(spec.output(), &OutputSpec::Single("input".to_string()));
        assert_eq!(spec.output_node().as_ref(), &document);
        assert!(spec.input().is_empty());
    }

    #[test]
    fn test_dot_in_stage_name() {
        let err = PipelineSpec::from_value(json!({
            "stages": [{"name": "a.b", "func": "f"}],
            "output": "a"
        }))
        .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Structural);
        assert_eq!(err.to_string(), "invalid stage name: \"a.b\" (\".\" are forbidden)");
        assert_eq!(err.node(), Some(&json!({"name": "a.b", "func": "f"})));
    }

    #[test]
    fn test_duplicate_stage_name() {
        let err = PipelineSpec::from_value(json!({
            "stages": [
                {"name": "a", "func": "f"},
                {"name": "a", "func": "g"}
            ],
            "output": "a"
        }))
        .unwrap_err();

        assert_eq!(err.to_string(), "duplicate name in call graph: a");
        assert_eq!(err.node(), Some(&json!({"name": "a", "func": "g"})));
    }

    #[test]
    fn test_positional_arguments_are_flagged() {
        let spec = PipelineSpec::from_value(json!({
            "stages": [{"name": "a", "func": "f", "params": [1, 2]}],
            "output": "a"
        }))
        .unwrap();
        assert!(spec.stages()[0].positional);
    }

    #[test]
    fn test_missing_reference_node_defaults_to_stage() {
        let spec = PipelineSpec::from_value(json!({
            "stages": [
                {"name": "a", "func": "f"},
                {"name": "b", "func": "f", "input": {"x": "a"}}
            ],
            "output": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(spec.stages()[0].input_node.as_ref(), &json!({"name": "a", "func": "f"}));
        assert_eq!(spec.stages()[1].input_node.as_ref(), &json!({"x": "a"}));
        assert_eq!(spec.output(), &OutputSpec::List(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_malformed_documents() {
        let cases = [
            json!([]),
            json!({"stages": []}),
            json!({"output": 3}),
            json!({"input": "x", "output": "input"}),
            json!({"stages": [{"func": "f"}], "output": "input"}),
            json!({"stages": [{"name": "a", "func": "f", "input": {"x": 1}}], "output": "a"}),
        ];
        for case in cases {
            let err = PipelineSpec::from_value(case.clone()).unwrap_err();
            assert!(
                matches!(err.kind(), DagErrorKind::InvalidSpec { .. }),
                "{case} should be rejected, got {err}"
            );
            assert!(err.node().is_some());
        }
    }

    #[test]
    fn test_repeated_input_names_collapse() {
        let spec = PipelineSpec::from_value(json!({
            "input": ["b", "a", "b", "a"],
            "output": "input"
        }))
        .unwrap();

        assert_eq!(spec.input(), ["b", "a"]);
        assert_eq!(spec.input_node().as_ref(), &json!(["b", "a", "b", "a"]));
    }

    #[test]
    fn test_read_spec_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"input": ["x"], "output": "input.x"}}"#).unwrap();

        let spec = read_spec_file(file.path()).unwrap();
        assert_eq!(spec.input(), ["x"]);
    }

    #[test]
    fn test_read_spec_file_errors() {
        let missing = read_spec_file("/definitely/not/here.json").unwrap_err();
        assert!(missing.to_string().starts_with("failed to read spec file"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let invalid = read_spec_file(file.path()).unwrap_err();
        assert!(invalid.to_string().contains("is not valid JSON"));
    }
}
