//! Catalog records for registered functions.

use super::TypeSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Describes one registered function for external consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Registered name.
    pub func: String,
    /// Declared parameters.
    pub input: BTreeMap<String, TypeSpec>,
    /// Declared result type.
    pub output: TypeSpec,
    /// Documentation string.
    pub description: Option<String>,
    /// Category tags.
    pub category: Vec<String>,
}
