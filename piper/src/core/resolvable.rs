//! Values that may still be in flight.

use crate::errors::DagError;
use futures::future::{try_join_all, BoxFuture, FutureExt, Shared};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;

/// A value some other task is still computing.
///
/// Cloning is cheap and every clone observes the same result.
pub type PendingValue = Shared<BoxFuture<'static, Result<Value, DagError>>>;

/// Wraps a future into a [`PendingValue`].
///
/// The future is not polled until the first consumer awaits it.
pub fn pending<F>(future: F) -> PendingValue
where
    F: Future<Output = Result<Value, DagError>> + Send + 'static,
{
    future.boxed().shared()
}

/// A stage value: ready, pending, or a container of either.
#[derive(Clone)]
pub enum Resolvable {
    /// A fully materialized JSON value.
    Ready(Value),
    /// A value still being computed.
    Pending(PendingValue),
    /// An ordered sequence of values.
    Sequence(Vec<Resolvable>),
    /// An insertion-ordered mapping.
    Mapping(Vec<(String, Resolvable)>),
}

impl Resolvable {
    /// Creates a pending value from a future.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, DagError>> + Send + 'static,
    {
        Self::Pending(pending(future))
    }

    /// Returns true if the value or anything inside it is still pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        match self {
            Self::Ready(_) => false,
            Self::Pending(_) => true,
            Self::Sequence(items) => items.iter().any(Self::is_pending),
            Self::Mapping(entries) => entries.iter().any(|(_, item)| item.is_pending()),
        }
    }
}

impl From<Value> for Resolvable {
    fn from(value: Value) -> Self {
        Self::Ready(value)
    }
}

impl From<PendingValue> for Resolvable {
    fn from(value: PendingValue) -> Self {
        Self::Pending(value)
    }
}

impl fmt::Debug for Resolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending"),
            Self::Sequence(items) => f.debug_list().entries(items).finish(),
            Self::Mapping(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
        }
    }
}

/// Resolves every pending value inside `value`.
///
/// Sequence elements and mapping values are awaited concurrently; order and
/// keys are preserved. The first failure wins.
pub fn resolve_value(value: Resolvable) -> BoxFuture<'static, Result<Value, DagError>> {
    async move {
        match value {
            Resolvable::Ready(value) => Ok(value),
            Resolvable::Pending(pending) => pending.await,
            Resolvable::Sequence(items) => {
                let values = try_join_all(items.into_iter().map(resolve_value)).await?;
                Ok(Value::Array(values))
            }
            Resolvable::Mapping(entries) => {
                let (keys, items): (Vec<String>, Vec<Resolvable>) = entries.into_iter().unzip();
                let values = try_join_all(items.into_iter().map(resolve_value)).await?;
                Ok(Value::Object(keys.into_iter().zip(values).collect::<Map<_, _>>()))
            }
        }
    }
    .boxed()
}
