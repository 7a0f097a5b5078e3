//! The seam user code implements.

use super::Call;
use crate::core::Resolvable;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

/// A function stages can call.
///
/// Implementations receive fully resolved arguments and may return values
/// that are still pending (for example the outputs of child pipelines); the
/// engine resolves them before the stage completes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageFunction: Send + Sync {
    /// Runs the function.
    ///
    /// # Errors
    ///
    /// Any error is reported as an execution failure of the calling stage.
    async fn call(&self, call: Call) -> anyhow::Result<Resolvable>;
}

/// An async closure adapted to [`StageFunction`].
pub struct FnStageFunction<F, Fut>
where
    F: Fn(Call) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Resolvable>> + Send,
{
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnStageFunction<F, Fut>
where
    F: Fn(Call) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Resolvable>> + Send,
{
    /// Wraps an async closure.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> fmt::Debug for FnStageFunction<F, Fut>
where
    F: Fn(Call) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Resolvable>> + Send,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStageFunction").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> StageFunction for FnStageFunction<F, Fut>
where
    F: Fn(Call) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Resolvable>> + Send,
{
    async fn call(&self, call: Call) -> anyhow::Result<Resolvable> {
        (self.func)(call).await
    }
}

/// A synchronous closure returning a plain value.
pub struct SyncFnStageFunction<F>
where
    F: Fn(Call) -> anyhow::Result<Value> + Send + Sync,
{
    func: F,
}

impl<F> SyncFnStageFunction<F>
where
    F: Fn(Call) -> anyhow::Result<Value> + Send + Sync,
{
    /// Wraps a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> fmt::Debug for SyncFnStageFunction<F>
where
    F: Fn(Call) -> anyhow::Result<Value> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncFnStageFunction").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> StageFunction for SyncFnStageFunction<F>
where
    F: Fn(Call) -> anyhow::Result<Value> + Send + Sync,
{
    async fn call(&self, call: Call) -> anyhow::Result<Resolvable> {
        (self.func)(call).map(Resolvable::Ready)
    }
}
