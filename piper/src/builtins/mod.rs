//! Built-in control-flow functions.
//!
//! `map` fans a sub-pipeline out over a list, `remap_regex` picks a value by
//! pattern and `case_regex` picks a sub-pipeline by pattern. They are
//! registered in every registry created with
//! [`FunctionRegistry::with_builtins`](crate::functions::FunctionRegistry::with_builtins)
//! and left out of the function catalog.

mod map;
mod patterns;

use crate::functions::FunctionRegistry;

pub use map::map;
pub use patterns::{case_regex, remap_regex};

/// Name of the fan-out function.
pub const MAP: &str = "map";
/// Name of the pattern remapping function.
pub const REMAP_REGEX: &str = "remap_regex";
/// Name of the pattern dispatch function.
pub const CASE_REGEX: &str = "case_regex";

/// Functions left out of the catalog.
pub const INTERNAL_FUNCTIONS: &[&str] = &[MAP, REMAP_REGEX, CASE_REGEX];

/// Category tag of the built-ins.
pub const CONTROL_FLOW_CATEGORY: &str = "control-flow";

/// Registers the built-ins in `registry`.
pub fn register_builtins(registry: &FunctionRegistry) {
    registry.register(map());
    registry.register(remap_regex());
    registry.register(case_regex());
}
