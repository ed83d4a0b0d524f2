//! Value Store addressing.
//!
//! Values live in a nested JSON tree addressed by dotted paths such as
//! `applicant.name` or `vehicles.2.plate`. Numeric segments index into arrays.
//! Only leaf and repeater nodes contribute a segment; groups and layouts are
//! transparent.

use serde_json::{Map, Value};

use crate::error::{FieldsError, Result};
use crate::types::{Node, NodeKind};

/// Path segment separator.
pub const SEPARATOR: char = '.';

/// Join a parent path and a segment.
pub fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else if segment.is_empty() {
        parent.to_string()
    } else {
        format!("{parent}{SEPARATOR}{segment}")
    }
}

/// Path of one row of a repeater.
pub fn row_path(repeater_path: &str, row: usize) -> String {
    join(repeater_path, &row.to_string())
}

/// Whether a node of the given kind owns a path segment.
///
/// Unknown types (`kind == None`) and keyless nodes never do.
pub fn owns_segment(node: &Node, kind: Option<NodeKind>) -> bool {
    kind.is_some_and(NodeKind::owns_path) && node.key().is_some()
}

/// Compute the path of `node` below `parent`.
///
/// With `row` set, `parent` is the path of a repeater and `node` is one of
/// its template children; the result is relative to `parent.row`.
pub fn child_path(parent: &str, node: &Node, kind: Option<NodeKind>, row: Option<usize>) -> String {
    let base = match row {
        Some(index) => row_path(parent, index),
        None => parent.to_string(),
    };
    match node.key() {
        Some(key) if owns_segment(node, kind) => join(&base, key),
        _ => base,
    }
}

/// Split a path into its segments. The empty path has no segments.
pub fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty())
}

/// Strip `base` from the front of `path`, yielding a path relative to it.
pub fn relative<'p>(base: &str, path: &'p str) -> &'p str {
    if base.is_empty() {
        return path;
    }
    path.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .unwrap_or(path)
}

/// Read the value at `path`. The empty path addresses the root.
pub fn get_path<'v>(values: &'v Value, path: &str) -> Option<&'v Value> {
    split(path).try_fold(values, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Numeric segments index existing arrays; writing one past the end appends.
/// Fails when an intermediate value is a scalar or an array index is out of
/// range.
pub fn set_path(values: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = split(path).collect();
    let Some((last, parents)) = segments.split_last() else {
        *values = value;
        return Ok(());
    };

    let mut current = values;
    for segment in parents {
        current = descend(current, segment, path)?;
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(last, path)?;
            if index < items.len() {
                items[index] = value;
                Ok(())
            } else if index == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(FieldsError::invalid_path(
                    path,
                    format!("row {index} is past the end of {} rows", items.len()),
                ))
            }
        }
        other => Err(FieldsError::invalid_path(
            path,
            format!("parent holds a scalar ({other})"),
        )),
    }
}

fn descend<'v>(current: &'v mut Value, segment: &str, path: &str) -> Result<&'v mut Value> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => Ok(map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        Value::Array(items) => {
            let index = parse_index(segment, path)?;
            let len = items.len();
            items.get_mut(index).ok_or_else(|| {
                FieldsError::invalid_path(path, format!("row {index} does not exist ({len} rows)"))
            })
        }
        other => Err(FieldsError::invalid_path(
            path,
            format!("'{segment}' is reached through a scalar ({other})"),
        )),
    }
}

fn parse_index(segment: &str, path: &str) -> Result<usize> {
    segment.parse::<usize>().map_err(|_| {
        FieldsError::invalid_path(path, format!("'{segment}' is not a row index"))
    })
}
