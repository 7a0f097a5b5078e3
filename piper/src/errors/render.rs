//! Annotated rendering of a spec document around a failure.

use super::DagError;
use serde_json::Value;
use std::cell::Cell;

/// Text placed after the first line of the faulting block.
pub const ERROR_MARKER: &str = "<---[ERROR HERE]---";

const INDENT: usize = 4;

/// Renders `document` as indented JSON, marking the node `error` is
/// attributed to.
///
/// Every line of the marked block is padded to the block's longest line and
/// closed with `|`; the first line carries the error message. Errors with no
/// attribution, or attributed to a node the document does not contain, mark
/// the document root.
#[must_use]
pub fn render_spec(document: &Value, error: &DagError) -> String {
    let message = error.to_string();
    let fault = error.node();

    if let Some(fault) = fault {
        let renderer = Renderer {
            fault,
            message: &message,
            found: Cell::new(false),
        };
        let lines = renderer.block(document, 0).finish(&message);
        if renderer.found.get() {
            return lines.join("\n");
        }
    }

    let renderer = Renderer {
        fault: document,
        message: &message,
        found: Cell::new(false),
    };
    let mut block = renderer.block(document, 0);
    // scalars are never marked by `block`
    block.marked = true;
    block.finish(&message).join("\n")
}

struct Renderer<'a> {
    fault: &'a Value,
    message: &'a str,
    found: Cell<bool>,
}

struct Block {
    lines: Vec<String>,
    marked: bool,
}

impl Block {
    fn scalar(prefix: &str, value: &Value) -> Self {
        Self {
            lines: vec![format!("{prefix}{value}")],
            marked: false,
        }
    }

    fn push_suffix(&mut self, suffix: &str) {
        if let Some(last) = self.lines.last_mut() {
            last.push_str(suffix);
        }
    }

    fn replace_first_indent(&mut self, prefix: &str) {
        if let Some(first) = self.lines.first_mut() {
            *first = format!("{prefix}{}", first.trim_start());
        }
    }

    fn finish(self, message: &str) -> Vec<String> {
        if !self.marked {
            return self.lines;
        }
        let width = self
            .lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let mut lines: Vec<String> = self
            .lines
            .into_iter()
            .map(|line| {
                let pad = width - line.chars().count() + 1;
                format!("{line}{}|", " ".repeat(pad))
            })
            .collect();
        if let Some(first) = lines.first_mut() {
            first.push_str(&format!(" {ERROR_MARKER}[{message}]"));
        }
        lines
    }
}

impl Renderer<'_> {
    fn block(&self, value: &Value, depth: usize) -> Block {
        let prefix = " ".repeat(depth * INDENT);
        let lines = match value {
            Value::Array(items) if !items.is_empty() => {
                let mut lines = vec![format!("{prefix}[")];
                let last = items.len() - 1;
                for (i, item) in items.iter().enumerate() {
                    let mut child = self.block(item, depth + 1);
                    if i != last {
                        child.push_suffix(",");
                    }
                    lines.extend(child.finish(self.message));
                }
                lines.push(format!("{prefix}]"));
                lines
            }
            Value::Object(map) if !map.is_empty() => {
                let inner_prefix = " ".repeat((depth + 1) * INDENT);
                let mut lines = vec![format!("{prefix}{{")];
                let last = map.len() - 1;
                for (i, (key, item)) in map.iter().enumerate() {
                    let mut child = self.block(item, depth + 1);
                    let key = Value::from(key.as_str());
                    child.replace_first_indent(&format!("{inner_prefix}{key}: "));
                    if i != last {
                        child.push_suffix(",");
                    }
                    lines.extend(child.finish(self.message));
                }
                lines.push(format!("{prefix}}}"));
                lines
            }
            _ => return Block::scalar(&prefix, value),
        };

        let marked = value == self.fault;
        if marked {
            self.found.set(true);
        }
        Block { lines, marked }
    }
}
