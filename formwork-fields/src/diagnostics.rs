//! Deduplicated author-facing diagnostics.
//!
//! Resolvers note things that are not errors but that a schema author should
//! fix, such as a misspelled type tag. Each distinct diagnostic is recorded
//! and logged once per context, however many passes run.

use std::sync::Mutex;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A node uses a type tag nothing is registered for.
    UnknownType,
    /// A node names validation plugins but no plugin validator is configured.
    MissingPluginValidator,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// What the diagnostic is about: the type tag or plugin list.
    pub subject: String,
    /// Path of the first node that triggered it.
    pub path: String,
    pub message: String,
}

#[derive(Debug)]
pub struct Diagnostics {
    emit_warnings: bool,
    seen: Mutex<IndexMap<(DiagnosticKind, String), Diagnostic>>,
}

impl Diagnostics {
    pub fn new(emit_warnings: bool) -> Self {
        Self {
            emit_warnings,
            seen: Mutex::new(IndexMap::new()),
        }
    }

    /// Record a diagnostic. Returns `true` the first time a given kind and
    /// subject is seen.
    pub fn record(
        &self,
        kind: DiagnosticKind,
        subject: &str,
        path: &str,
        message: impl Into<String>,
    ) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let key = (kind, subject.to_string());
        if seen.contains_key(&key) {
            return false;
        }
        let diagnostic = Diagnostic {
            kind,
            subject: subject.to_string(),
            path: path.to_string(),
            message: message.into(),
        };
        if self.emit_warnings {
            warn!(?kind, subject, path, "{}", diagnostic.message);
        }
        seen.insert(key, diagnostic);
        true
    }

    /// Record an unknown type tag.
    pub fn unknown_type(&self, type_: &str, path: &str) -> bool {
        self.record(
            DiagnosticKind::UnknownType,
            type_,
            path,
            format!("unknown node type '{type_}' at '{path}'; its subtree gets no type-specific behavior"),
        )
    }

    /// Everything recorded so far, in first-seen order.
    pub fn entries(&self) -> Vec<Diagnostic> {
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_subject_once() {
        let diagnostics = Diagnostics::new(false);
        assert!(diagnostics.unknown_type("unknown-widget", "a"));
        assert!(!diagnostics.unknown_type("unknown-widget", "b"));
        assert!(diagnostics.unknown_type("other-widget", "c"));

        let entries = diagnostics.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subject, "unknown-widget");
        assert_eq!(entries[0].path, "a");
    }

    #[test]
    fn kinds_are_distinct() {
        let diagnostics = Diagnostics::new(false);
        assert!(diagnostics.record(DiagnosticKind::UnknownType, "vin", "", "x"));
        assert!(diagnostics.record(DiagnosticKind::MissingPluginValidator, "vin", "", "y"));
        assert_eq!(diagnostics.len(), 2);
        diagnostics.clear();
        assert!(diagnostics.is_empty());
    }
}
