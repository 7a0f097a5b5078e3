//! Stage-callable functions.
//!
//! A [`FunctionDef`] pairs a [`StageFunction`] implementation with its
//! declared signature. Definitions live in a [`FunctionRegistry`]; the
//! process-wide one is reached through [`global_registry`].

mod call;
mod definition;
mod handler;
mod invoke;
mod registry;

pub use call::Call;
pub use definition::{FunctionDef, Param};
pub use handler::{FnStageFunction, StageFunction, SyncFnStageFunction};
pub use invoke::Invocation;
pub use registry::{global_registry, register, FunctionRegistry};

#[cfg(test)]
pub use handler::MockStageFunction;
