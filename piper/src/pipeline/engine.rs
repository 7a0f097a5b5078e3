//! Pipeline construction and execution.

use super::spec::{OutputSpec, PipelineSpec, INPUT_REFERENCE};
use super::tasks::StageTasks;
use super::PipelineConfig;
use crate::core::{
    pending, resolve_property, resolve_value, PendingValue, PropertyPath, Resolvable,
    PATH_SEPARATOR,
};
use crate::errors::{DagError, DagErrorKind, PipelineError};
use crate::functions::{FunctionRegistry, Invocation};
use crate::observability::SpanTimer;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tracing::{debug, error, info};
use uuid::Uuid;

/// State shared by a pipeline's stage tasks.
///
/// Only the [`Pipeline`] holds it strongly; tasks, handles and child
/// pipelines hold weak references, so dropping the pipeline tears down the
/// whole graph.
pub(crate) struct PipelineInner {
    run_id: Uuid,
    spec: Arc<PipelineSpec>,
    stages: HashMap<String, PendingValue>,
    input: Resolvable,
    parent: Option<Weak<PipelineInner>>,
    registry: Arc<FunctionRegistry>,
    config: PipelineConfig,
    tasks: StageTasks,
}

impl PipelineInner {
    /// Splits `path` and finds its base value: this pipeline's input, a
    /// local stage, or a stage of an ancestor.
    fn lookup(
        &self,
        node: &Arc<Value>,
        path: &str,
    ) -> Result<(Resolvable, PropertyPath), DagError> {
        let (head, rest) = path.split_once(PATH_SEPARATOR).unwrap_or((path, ""));
        let rest = PropertyPath::parse(rest);
        if head == INPUT_REFERENCE {
            return Ok((self.input.clone(), rest));
        }
        match self.find_stage(head) {
            Some(stage) => Ok((Resolvable::Pending(stage), rest)),
            None => Err(DagError::new(DagErrorKind::MissingStage {
                stage: head.to_string(),
                path: path.to_string(),
            })
            .at(node)),
        }
    }

    fn find_stage(&self, name: &str) -> Option<PendingValue> {
        if let Some(stage) = self.stages.get(name) {
            return Some(stage.clone());
        }
        self.parent.as_ref()?.upgrade()?.find_stage(name)
    }
}

impl fmt::Debug for PipelineInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineInner")
            .field("run_id", &self.run_id)
            .field("stages", &self.stages.len())
            .field("has_parent", &self.parent.is_some())
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

async fn resolve_reference(
    pipeline: Weak<PipelineInner>,
    node: Arc<Value>,
    path: String,
) -> Result<Value, DagError> {
    let (base, rest) = {
        let inner = pipeline
            .upgrade()
            .ok_or_else(|| DagError::new(DagErrorKind::PipelineDropped))?;
        inner.lookup(&node, &path)?
    };
    let found = resolve_property(base, rest).await?;
    resolve_value(found).await
}

/// A single-use pipeline instance.
///
/// Construction builds the whole graph without running anything; [`run`]
/// binds the inputs, starts every stage and resolves the output. Dropping
/// the pipeline aborts any stage still running, including those of child
/// pipelines.
///
/// [`run`]: Pipeline::run
pub struct Pipeline {
    inner: Arc<PipelineInner>,
    output: Resolvable,
    jobs: Vec<BoxFuture<'static, ()>>,
    bindings: Vec<(String, oneshot::Sender<Value>)>,
}

impl Pipeline {
    /// Builds a pipeline with the default configuration and the global
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns the annotated error if the spec is malformed or names an
    /// unknown function.
    pub fn new(document: Value) -> Result<Self, PipelineError> {
        super::PipelineBuilder::new(document).build()
    }

    /// Starts a builder for `document`.
    #[must_use]
    pub fn builder(document: Value) -> super::PipelineBuilder {
        super::PipelineBuilder::new(document)
    }

    pub(super) fn assemble(
        spec: Arc<PipelineSpec>,
        bound_input: Option<Value>,
        parent: Option<Weak<PipelineInner>>,
        registry: Arc<FunctionRegistry>,
        config: PipelineConfig,
    ) -> Result<Self, DagError> {
        let defs = spec
            .stages()
            .iter()
            .map(|stage| {
                registry.get(&stage.func).ok_or_else(|| {
                    DagError::new(DagErrorKind::UnknownFunction {
                        func: stage.func.clone(),
                    })
                    .at(&stage.node)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut stages = HashMap::with_capacity(defs.len());
        let mut results = Vec::with_capacity(defs.len());
        for stage in spec.stages() {
            let (tx, rx) = oneshot::channel::<Result<Value, DagError>>();
            let name = stage.name.clone();
            let value = pending(async move {
                rx.await
                    .unwrap_or_else(|_| Err(DagErrorKind::Cancelled { stage: name }.into()))
            });
            stages.insert(stage.name.clone(), value);
            results.push(tx);
        }

        let mut bindings = Vec::new();
        let input = match bound_input {
            Some(value) => Resolvable::Ready(value),
            None => {
                let mut entries = Vec::with_capacity(spec.input().len());
                for name in spec.input() {
                    let (tx, rx) = oneshot::channel::<Value>();
                    let unbound = name.clone();
                    let value = Resolvable::pending(async move {
                        rx.await.map_err(|_| {
                            DagError::from(DagErrorKind::UnboundInput { name: unbound })
                        })
                    });
                    entries.push((name.clone(), value));
                    bindings.push((name.clone(), tx));
                }
                Resolvable::Mapping(entries)
            }
        };

        let inner = Arc::new(PipelineInner {
            run_id: Uuid::new_v4(),
            spec: Arc::clone(&spec),
            stages,
            input,
            parent,
            registry,
            config,
            tasks: StageTasks::default(),
        });
        let weak = Arc::downgrade(&inner);
        let handle = PipelineHandle {
            inner: Weak::clone(&weak),
            run_id: inner.run_id,
        };

        let mut jobs = Vec::with_capacity(defs.len());
        for ((stage, def), tx) in spec.stages().iter().zip(defs).zip(results) {
            let mut args: Vec<(String, Resolvable)> = stage
                .params
                .iter()
                .filter(|(key, _)| !stage.input.iter().any(|(arg, _)| arg == *key))
                .map(|(key, value)| (key.clone(), Resolvable::Ready(value.clone())))
                .collect();
            for (arg, path) in &stage.input {
                let reference = resolve_reference(
                    Weak::clone(&weak),
                    Arc::clone(&stage.input_node),
                    path.clone(),
                );
                args.push((arg.clone(), Resolvable::pending(reference)));
            }

            let invocation = Invocation {
                stage: Arc::clone(&stage.node),
                args,
                positional: stage.positional,
                pipeline: Some(handle.clone()),
            };
            jobs.push(
                async move {
                    let result = def.invoke(invocation).await;
                    let _ = tx.send(result);
                }
                .boxed(),
            );
        }

        let output_node = spec.output_node();
        let output_ref = |path: &String| {
            let node = Arc::clone(output_node);
            let reference = resolve_reference(Weak::clone(&weak), Arc::clone(&node), path.clone());
            Resolvable::pending(async move { reference.await.map_err(|err| err.at(&node)) })
        };
        let output = match spec.output() {
            OutputSpec::Single(path) => output_ref(path),
            OutputSpec::List(paths) => Resolvable::Sequence(paths.iter().map(output_ref).collect()),
            OutputSpec::Named(entries) => Resolvable::Mapping(
                entries
                    .iter()
                    .map(|(name, path)| (name.clone(), output_ref(path)))
                    .collect(),
            ),
        };

        debug!(run_id = %inner.run_id, stages = jobs.len(), "pipeline constructed");
        Ok(Self {
            inner,
            output,
            jobs,
            bindings,
        })
    }

    /// Returns this instance's run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    /// Returns the parsed spec.
    #[must_use]
    pub fn spec(&self) -> &Arc<PipelineSpec> {
        &self.inner.spec
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Returns a weak handle to this pipeline.
    #[must_use]
    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            inner: Arc::downgrade(&self.inner),
            run_id: self.inner.run_id,
        }
    }

    fn start(&mut self) {
        for job in self.jobs.drain(..) {
            self.inner.tasks.spawn(job);
        }
    }

    /// Binds `inputs`, runs every stage and resolves the output within the
    /// configured timeout.
    ///
    /// Every declared input must be supplied exactly once; nothing runs
    /// otherwise. Stages still running when the output is resolved (or the
    /// run fails) are aborted.
    ///
    /// # Errors
    ///
    /// Any failure is returned as one [`PipelineError`] whose message is the
    /// spec with the faulting node marked.
    pub async fn run<I, K>(self, inputs: I) -> Result<Value, PipelineError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let document = Arc::clone(self.inner.spec.document());
        let run_id = self.inner.run_id;
        let timer = SpanTimer::start(run_id.to_string());

        let supplied = inputs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        match self.run_to_completion(supplied).await {
            Ok(value) => {
                info!(run_id = %run_id, duration_ms = timer.finish(), "pipeline finished");
                Ok(value)
            }
            Err(err) => {
                error!(
                    run_id = %run_id,
                    category = %err.category(),
                    error = %err,
                    "pipeline failed"
                );
                Err(PipelineError::new(&document, err))
            }
        }
    }

    async fn run_to_completion(mut self, mut supplied: Map<String, Value>) -> Result<Value, DagError> {
        let spec = Arc::clone(&self.inner.spec);
        if supplied.len() != self.bindings.len() {
            return Err(DagError::new(DagErrorKind::InputCount {
                expected: self.bindings.len(),
                actual: supplied.len(),
            })
            .at(spec.input_node()));
        }

        let mut values = Vec::with_capacity(self.bindings.len());
        for (name, _) in &self.bindings {
            let value = supplied.remove(name).ok_or_else(|| {
                DagError::new(DagErrorKind::MissingInput { name: name.clone() })
                    .at(spec.input_node())
            })?;
            values.push(value);
        }
        for ((_, slot), value) in self.bindings.drain(..).zip(values) {
            let _ = slot.send(value);
        }

        info!(run_id = %self.inner.run_id, stages = spec.stages().len(), "pipeline started");
        self.start();

        let output = std::mem::replace(&mut self.output, Resolvable::Ready(Value::Null));
        let config = &self.inner.config;
        match tokio::time::timeout(config.timeout(), resolve_value(output)).await {
            Ok(result) => result,
            Err(_) => Err(DagErrorKind::Timeout {
                seconds: config.timeout_secs,
            }
            .into()),
        }
    }

    async fn into_output(self) -> Result<Value, DagError> {
        let Self { inner, output, .. } = self;
        let result = resolve_value(output).await;
        drop(inner);
        result
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("inner", &self.inner)
            .field("output", &self.output)
            .field("unstarted", &self.jobs.len())
            .finish_non_exhaustive()
    }
}

/// A non-owning reference to a running pipeline, handed to functions that
/// ask for it.
#[derive(Clone)]
pub struct PipelineHandle {
    inner: Weak<PipelineInner>,
    run_id: Uuid,
}

impl PipelineHandle {
    /// Returns the pipeline's run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns true while the pipeline exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Returns the pipeline's configuration, if it still exists.
    #[must_use]
    pub fn config(&self) -> Option<PipelineConfig> {
        self.inner.upgrade().map(|inner| inner.config.clone())
    }

    /// Builds and starts a child pipeline whose `input` is `input` and
    /// whose unresolved references fall back to this pipeline.
    ///
    /// The child inherits the registry and configuration. The returned
    /// value resolves to the child's output; dropping it aborts the child.
    ///
    /// # Errors
    ///
    /// Fails if this pipeline is gone or the child names an unknown
    /// function.
    pub fn spawn_child(&self, spec: Arc<PipelineSpec>, input: Value) -> Result<Resolvable, DagError> {
        let parent = self
            .inner
            .upgrade()
            .ok_or_else(|| DagError::new(DagErrorKind::PipelineDropped))?;
        let mut child = Pipeline::assemble(
            spec,
            Some(input),
            Some(Arc::downgrade(&parent)),
            Arc::clone(&parent.registry),
            parent.config.clone(),
        )?;
        drop(parent);

        debug!(run_id = %child.run_id(), parent_run_id = %self.run_id, "child pipeline started");
        child.start();
        Ok(Resolvable::pending(child.into_output()))
    }
}

impl fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("run_id", &self.run_id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
