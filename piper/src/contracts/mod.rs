//! Declared types of stage functions.
//!
//! This module provides:
//! - [`TypeSpec`], the type vocabulary used for runtime argument and result
//!   validation
//! - [`FunctionDescriptor`], the catalog record describing one registered
//!   function

mod catalog;
mod types;

pub use catalog::FunctionDescriptor;
pub use types::TypeSpec;
