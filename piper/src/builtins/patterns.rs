//! Pattern-based branching.

use super::{CASE_REGEX, CONTROL_FLOW_CATEGORY, REMAP_REGEX};
use crate::contracts::TypeSpec;
use crate::core::Resolvable;
use crate::functions::{Call, FunctionDef, StageFunction};
use crate::pipeline::PipelineSpec;
use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// Compiles `pattern` so that it only matches whole strings.
fn whole_match(pattern: &str) -> anyhow::Result<Regex> {
    Regex::new(&format!(r"\A(?:{pattern})\z")).with_context(|| format!("invalid pattern \"{pattern}\""))
}

/// Returns the target of the first `(pattern, target)` pair matching `value`.
fn first_match(value: &str, items: Vec<(String, Value)>) -> anyhow::Result<Option<Value>> {
    for (pattern, target) in items {
        if whole_match(&pattern)?.is_match(value) {
            return Ok(Some(target));
        }
    }
    Ok(None)
}

fn pattern_pairs() -> TypeSpec {
    TypeSpec::array(TypeSpec::tuple([TypeSpec::String, TypeSpec::Any]))
}

/// The `remap_regex` definition.
///
/// Returns the target of the first pattern that matches the whole of
/// `value`, or `default` when none does.
#[must_use]
pub fn remap_regex() -> FunctionDef {
    FunctionDef::from_sync(REMAP_REGEX, |call| {
        let value: String = call.get("value")?;
        let items: Vec<(String, Value)> = call.get("items")?;
        let default = call.arg("default").cloned().unwrap_or(Value::Null);
        Ok(first_match(&value, items)?.unwrap_or(default))
    })
    .with_input("value", TypeSpec::String)
    .with_input("items", pattern_pairs())
    .with_optional_input("default", TypeSpec::Any, Value::Null)
    .with_category([CONTROL_FLOW_CATEGORY])
    .with_description("Maps a string to the target of the first fully matching pattern.")
}

/// Runs the sub-spec of the first pattern matching `value`, with `data`
/// as its input.
#[derive(Debug, Default)]
pub struct CaseRegexFunction;

#[async_trait]
impl StageFunction for CaseRegexFunction {
    async fn call(&self, call: Call) -> anyhow::Result<Resolvable> {
        let value: String = call.get("value")?;
        let items: Vec<(String, Value)> = call.get("items")?;
        let pipeline = call.pipeline().context("case_regex needs its owning pipeline")?;

        let branch = match first_match(&value, items)? {
            Some(branch) => branch,
            None => match call.arg("default") {
                Some(Value::Null) | None => {
                    return Err(anyhow!(
                        "no pattern matched \"{value}\" and there is no default branch"
                    ));
                }
                Some(default) => default.clone(),
            },
        };

        let spec = Arc::new(PipelineSpec::from_value(branch)?);
        let data = call.arg("data").cloned().unwrap_or(Value::Null);
        Ok(pipeline.spawn_child(spec, data)?)
    }
}

/// The `case_regex` definition.
#[must_use]
pub fn case_regex() -> FunctionDef {
    FunctionDef::new(CASE_REGEX, CaseRegexFunction)
        .with_input("data", TypeSpec::Any)
        .with_input("value", TypeSpec::String)
        .with_input("items", pattern_pairs())
        .with_optional_input("default", TypeSpec::Any, Value::Null)
        .with_category([CONTROL_FLOW_CATEGORY])
        .with_description(
            "Runs the sub-pipeline of the first fully matching pattern with data as its input.",
        )
        .with_pipeline()
}
