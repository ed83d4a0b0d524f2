//! Last-write-wins bookkeeping for in-flight validations.
//!
//! Asynchronous refinements can finish after the value they checked has been
//! edited again. The tracker hands out a ticket per started validation and
//! accepts a finished result only when it belongs to the newest ticket for
//! its path and the value it checked is still the current one.

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

use super::validator::ValidationResult;

/// Identifies one started validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationTicket {
    path: String,
    generation: u64,
    value: Value,
}

impl ValidationTicket {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The value captured when the validation started.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

#[derive(Debug, Default)]
pub struct ValidationTracker {
    next_generation: u64,
    latest: HashMap<String, u64>,
    results: HashMap<String, ValidationResult>,
}

impl ValidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that validation of `value` at `path` has started.
    pub fn begin(&mut self, path: &str, value: &Value) -> ValidationTicket {
        self.next_generation += 1;
        self.latest.insert(path.to_string(), self.next_generation);
        ValidationTicket {
            path: path.to_string(),
            generation: self.next_generation,
            value: value.clone(),
        }
    }

    /// Offer a finished result. `current` is the value at the ticket's path
    /// now. Returns whether the result was accepted.
    pub fn finish(
        &mut self,
        ticket: ValidationTicket,
        result: ValidationResult,
        current: Option<&Value>,
    ) -> bool {
        let newest = self.latest.get(&ticket.path) == Some(&ticket.generation);
        let unchanged = current == Some(&ticket.value);
        if !(newest && unchanged) {
            trace!(path = %ticket.path, newest, unchanged, "discarding stale validation result");
            return false;
        }
        self.results.insert(ticket.path, result);
        true
    }

    /// The newest accepted result for `path`.
    pub fn result(&self, path: &str) -> Option<&ValidationResult> {
        self.results.get(path)
    }

    /// Forget a path, e.g. once it became hidden.
    pub fn forget(&mut self, path: &str) {
        self.latest.remove(path);
        self.results.remove(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validator::Issue;
    use serde_json::json;

    fn failed(path: &str) -> ValidationResult {
        ValidationResult {
            path: path.into(),
            issues: vec![Issue::error(path, "bad")],
        }
    }

    #[test]
    fn newest_matching_result_is_accepted() {
        let mut tracker = ValidationTracker::new();
        let ticket = tracker.begin("vin", &json!("abc"));
        assert!(tracker.finish(ticket, failed("vin"), Some(&json!("abc"))));
        assert!(!tracker.result("vin").unwrap().is_valid());
    }

    #[test]
    fn superseded_ticket_is_discarded() {
        let mut tracker = ValidationTracker::new();
        let old = tracker.begin("vin", &json!("abc"));
        let new = tracker.begin("vin", &json!("abcd"));

        let ok = ValidationResult {
            path: "vin".into(),
            issues: vec![],
        };
        assert!(tracker.finish(new, ok, Some(&json!("abcd"))));
        assert!(!tracker.finish(old, failed("vin"), Some(&json!("abcd"))));
        assert!(tracker.result("vin").unwrap().is_valid());
    }

    #[test]
    fn changed_value_is_discarded() {
        let mut tracker = ValidationTracker::new();
        let ticket = tracker.begin("vin", &json!("abc"));
        assert!(!tracker.finish(ticket, failed("vin"), Some(&json!("xyz"))));
        assert!(tracker.result("vin").is_none());
    }

    #[test]
    fn paths_are_independent() {
        let mut tracker = ValidationTracker::new();
        let a = tracker.begin("a", &json!(1));
        let b = tracker.begin("b", &json!(2));
        assert!(tracker.finish(b, failed("b"), Some(&json!(2))));
        assert!(tracker.finish(a, failed("a"), Some(&json!(1))));
        tracker.forget("a");
        assert!(tracker.result("a").is_none());
        assert!(tracker.result("b").is_some());
    }
}
