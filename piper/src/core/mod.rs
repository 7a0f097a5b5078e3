//! Core value model and path resolution.
//!
//! This module contains:
//! - [`Resolvable`], the closed set of shapes a stage value can take
//! - [`resolve_value`], which forces every pending value inside a shape
//! - [`resolve_property`], which walks a dot-separated reference path

mod path;
mod resolvable;

pub use path::{resolve_property, PropertyPath, PATH_SEPARATOR};
pub use resolvable::{pending, resolve_value, PendingValue, Resolvable};
