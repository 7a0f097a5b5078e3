//! Runs a registered function for one stage.

use super::{Call, FunctionDef};
use crate::core::{resolve_value, Resolvable};
use crate::errors::{DagError, DagErrorKind};
use crate::observability::SpanTimer;
use crate::pipeline::PipelineHandle;
use anyhow::anyhow;
use futures::future::try_join_all;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a stage hands to its function.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The stage descriptor; failures are attributed to it.
    pub stage: Arc<Value>,
    /// Keyword arguments, possibly still pending.
    pub args: Vec<(String, Resolvable)>,
    /// True if the stage supplied its arguments as a list.
    pub positional: bool,
    /// The owning pipeline.
    pub pipeline: Option<PipelineHandle>,
}

impl Invocation {
    /// Creates an invocation with keyword arguments.
    #[must_use]
    pub fn new(stage: Arc<Value>, args: Vec<(String, Resolvable)>) -> Self {
        Self {
            stage,
            args,
            positional: false,
            pipeline: None,
        }
    }

    fn stage_name(&self) -> &str {
        self.stage
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

impl FunctionDef {
    /// Resolves the arguments, calls the handler and resolves its result.
    ///
    /// # Errors
    ///
    /// Contract violations, argument resolution failures and handler errors
    /// are returned attributed to the stage, unless a deeper frame already
    /// attributed them.
    pub async fn invoke(&self, invocation: Invocation) -> Result<Value, DagError> {
        let stage = Arc::clone(&invocation.stage);
        let stage_name = invocation.stage_name().to_string();
        let run_id = invocation
            .pipeline
            .as_ref()
            .map(|p| p.run_id().to_string())
            .unwrap_or_default();

        let timer = SpanTimer::start(&stage_name);
        debug!(run_id = %run_id, stage = %stage_name, func = %self.name(), "stage started");

        match self.call_handler(invocation).await {
            Ok(value) => {
                debug!(
                    run_id = %run_id,
                    stage = %stage_name,
                    func = %self.name(),
                    duration_ms = timer.finish(),
                    "stage finished"
                );
                Ok(value)
            }
            Err(err) => {
                warn!(
                    run_id = %run_id,
                    stage = %stage_name,
                    func = %self.name(),
                    duration_ms = timer.finish(),
                    error = %err,
                    "stage failed"
                );
                Err(err.at(&stage))
            }
        }
    }

    async fn call_handler(&self, invocation: Invocation) -> Result<Value, DagError> {
        let Invocation {
            stage,
            args,
            positional,
            pipeline,
        } = invocation;

        if positional {
            return Err(DagErrorKind::PositionalArgs {
                func: self.name().to_string(),
            }
            .into());
        }

        let (names, values): (Vec<String>, Vec<Resolvable>) = args.into_iter().unzip();
        let values = try_join_all(values.into_iter().map(resolve_value)).await?;
        let args: Map<String, Value> = names.into_iter().zip(values).collect();
        let args = self.bind_arguments(args)?;

        let mut call = Call::new(args);
        if self.wants_stage() {
            call = call.with_stage(stage);
        }
        if self.wants_pipeline() {
            if let Some(pipeline) = pipeline {
                call = call.with_pipeline(pipeline);
            }
        }

        let output = AssertUnwindSafe(self.handler.call(call))
            .catch_unwind()
            .await
            .map_err(|panic| {
                DagError::execution(anyhow!(
                    "func \"{}\" panicked: {}",
                    self.name(),
                    panic_message(panic.as_ref())
                ))
            })?
            .map_err(DagError::from)?;

        let value = resolve_value(output).await?;
        self.check_output(&value)?;
        Ok(value)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
