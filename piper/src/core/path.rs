//! Dot-separated reference paths.

use super::Resolvable;
use crate::errors::{json_type_name, DagError, DagErrorKind};
use serde_json::Value;

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// A reference path split into segments.
///
/// Digit-only segments index into sequences; any other segment looks up a
/// key. The empty path has no segments and selects the value itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Splits a path string. The empty string is the empty path.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::default();
        }
        Self {
            segments: path.split(PATH_SEPARATOR).map(str::to_string).collect(),
        }
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true for the empty path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for PropertyPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<Vec<String>> for PropertyPath {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

impl From<&[&str]> for PropertyPath {
    fn from(segments: &[&str]) -> Self {
        Self {
            segments: segments.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Follows `path` from `item`, awaiting pending values along the way.
///
/// The base is awaited first even for the empty path. The result may still
/// contain pending values inside containers; pass it to
/// [`resolve_value`](super::resolve_value) to force them.
pub async fn resolve_property(item: Resolvable, path: PropertyPath) -> Result<Resolvable, DagError> {
    let mut segments = path.segments.into_iter();
    let mut current = item;
    loop {
        if let Resolvable::Pending(pending) = current {
            current = Resolvable::Ready(pending.await?);
        }
        let Some(segment) = segments.next() else {
            return Ok(current);
        };
        current = step(current, &segment)?;
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

fn index_into<T>(items: Vec<T>, segment: &str, found: &str) -> Result<T, DagError> {
    let index = parse_index(segment).ok_or_else(|| not_navigable(segment, found))?;
    let len = items.len();
    items
        .into_iter()
        .nth(index)
        .ok_or_else(|| DagError::new(DagErrorKind::IndexOutOfRange { index, len }))
}

fn not_navigable(segment: &str, found: &str) -> DagError {
    DagError::new(DagErrorKind::NotNavigable {
        segment: segment.to_string(),
        found: found.to_string(),
    })
}

fn missing_key(segment: &str) -> DagError {
    DagError::new(DagErrorKind::MissingKey {
        key: segment.to_string(),
    })
}

fn step(item: Resolvable, segment: &str) -> Result<Resolvable, DagError> {
    match item {
        Resolvable::Ready(Value::Array(items)) => {
            index_into(items, segment, "array").map(Resolvable::Ready)
        }
        Resolvable::Ready(Value::Object(map)) => map
            .into_iter()
            .find(|(key, _)| key == segment)
            .map(|(_, value)| Resolvable::Ready(value))
            .ok_or_else(|| missing_key(segment)),
        Resolvable::Sequence(items) => index_into(items, segment, "sequence"),
        Resolvable::Mapping(entries) => entries
            .into_iter()
            .find(|(key, _)| key == segment)
            .map(|(_, value)| value)
            .ok_or_else(|| missing_key(segment)),
        Resolvable::Ready(other) => Err(not_navigable(segment, json_type_name(&other))),
        Resolvable::Pending(_) => Err(not_navigable(segment, "pending")),
    }
}
