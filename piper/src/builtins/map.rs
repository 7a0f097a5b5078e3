//! Fan-out over a list.

use super::{CONTROL_FLOW_CATEGORY, MAP};
use crate::contracts::TypeSpec;
use crate::core::Resolvable;
use crate::functions::{Call, FunctionDef, StageFunction};
use crate::pipeline::PipelineSpec;
use anyhow::{bail, Context as _};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Runs the stage's `params`, read as a nested spec, once per item.
///
/// Every child pipeline gets one item as its `input` and falls back to the
/// calling pipeline for references it cannot resolve. Children run
/// concurrently; results keep the order of `items`.
#[derive(Debug, Default)]
pub struct MapFunction;

#[async_trait]
impl StageFunction for MapFunction {
    async fn call(&self, call: Call) -> anyhow::Result<Resolvable> {
        let Some(Value::Array(items)) = call.arg("items") else {
            bail!("\"items\" must be a list");
        };
        let stage = call.stage().context("map needs its stage descriptor")?;
        let pipeline = call.pipeline().context("map needs its owning pipeline")?;

        let sub_spec = stage.get("params").cloned().unwrap_or(Value::Null);
        let spec = Arc::new(PipelineSpec::from_value(sub_spec)?);

        let children = items
            .iter()
            .map(|item| pipeline.spawn_child(Arc::clone(&spec), item.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Resolvable::Sequence(children))
    }
}

/// The `map` definition.
#[must_use]
pub fn map() -> FunctionDef {
    FunctionDef::new(MAP, MapFunction)
        .with_input("items", TypeSpec::array(TypeSpec::Any))
        .with_output(TypeSpec::array(TypeSpec::Any))
        .with_category([CONTROL_FLOW_CATEGORY])
        .with_description(
            "Runs the stage params as a sub-pipeline for every item and returns the outputs in order.",
        )
        .with_extra_args()
        .with_stage()
        .with_pipeline()
}
