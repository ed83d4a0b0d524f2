//! Visibility conditions.
//!
//! The engine does not own a condition language. It asks a
//! [`ConditionEvaluator`] whether a node hides itself, given the value
//! snapshot and, inside a repeater, the current row. [`DeclarativeConditions`]
//! understands the static `hidden` flag and the `{show, when, eq}` form.

use serde_json::Value;

use crate::path::get_path;
use crate::types::{Conditional, Node};
use crate::value::{as_text, loose_eq};

/// What a condition may look at.
#[derive(Debug, Clone, Copy)]
pub struct ConditionScope<'a> {
    /// The whole value store snapshot.
    pub data: &'a Value,
    /// The current row, when the node sits in a repeater template.
    pub row: Option<&'a Value>,
    /// Path the node resolves to.
    pub path: &'a str,
}

impl<'a> ConditionScope<'a> {
    pub fn root(data: &'a Value) -> Self {
        Self {
            data,
            row: None,
            path: "",
        }
    }

    /// Resolve a path against the row first, then against the root.
    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        self.row
            .and_then(|row| get_path(row, path))
            .or_else(|| get_path(self.data, path))
    }
}

/// Decides whether a node hides itself.
pub trait ConditionEvaluator: Send + Sync {
    fn is_hidden(&self, node: &Node, scope: &ConditionScope<'_>) -> bool;
}

impl<F> ConditionEvaluator for F
where
    F: Fn(&Node, &ConditionScope<'_>) -> bool + Send + Sync,
{
    fn is_hidden(&self, node: &Node, scope: &ConditionScope<'_>) -> bool {
        self(node, scope)
    }
}

/// Evaluates `hidden` and the `{show, when, eq}` conditional.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarativeConditions;

impl ConditionEvaluator for DeclarativeConditions {
    fn is_hidden(&self, node: &Node, scope: &ConditionScope<'_>) -> bool {
        node.hidden
            || node
                .conditional
                .as_ref()
                .is_some_and(|cond| !shows(cond, scope))
    }
}

/// Whether a conditional lets its node show. Incomplete conditionals always
/// do.
pub fn shows(cond: &Conditional, scope: &ConditionScope<'_>) -> bool {
    let (Some(show), Some(when)) = (cond.show_flag(), cond.when_path()) else {
        return true;
    };
    let expected = cond.eq.as_ref().unwrap_or(&Value::Null);
    matches_value(scope.lookup(when), expected) == show
}

// Arrays match by membership; objects (checkbox groups) by a checked entry.
fn matches_value(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(Value::Array(items)) => items.iter().any(|item| loose_eq(item, expected)),
        Some(Value::Object(map)) => map
            .get(&as_text(expected))
            .is_some_and(|checked| checked == &Value::Bool(true)),
        Some(value) => loose_eq(value, expected),
        None => loose_eq(&Value::Null, expected),
    }
}
