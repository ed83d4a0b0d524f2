//! Two-phase validators.
//!
//! A [`Validator`] is a synchronous shape check (optionality plus a
//! conjunction of [`Rule`]s) with an optional asynchronous [`Refinement`].
//! Building a validator never runs it. Running it never fails: every
//! problem, including a broken plugin, comes back as an [`Issue`].

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::plugin::Refinement;
use super::rule::Rule;
use crate::path::{get_path, join, row_path};
use crate::value::is_blank;

/// Validators keyed by path, in tree order.
pub type ValidatorMap = IndexMap<String, Validator>;

/// Type-specific emptiness test for values that are not blank.
pub type EmptinessFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// How much an issue matters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks submission.
    Error,
    /// Informational only (soft-required fields).
    Warning,
}

/// One problem found at a path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub path: String,
    pub message: String,
    pub severity: Severity,
}

impl Issue {
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Outcome of validating the value at one path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub path: String,
    pub issues: Vec<Issue>,
}

impl ValidationResult {
    /// No error-level issues. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(Issue::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| !i.is_error())
    }
}

/// Results for a whole validator map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(ValidationResult::is_valid)
    }

    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.results.iter().flat_map(|r| r.issues.iter())
    }

    /// The result for one path, if that path had a validator.
    pub fn get(&self, path: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.path == path)
    }
}

/// Validator for the value at one path.
#[derive(Clone)]
pub struct Validator {
    label: String,
    optional: bool,
    soft_required: bool,
    rules: Vec<Rule>,
    refine: Option<Arc<dyn Refinement>>,
    message: Option<String>,
    empty_when: Option<EmptinessFn>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("label", &self.label)
            .field("optional", &self.optional)
            .field("soft_required", &self.soft_required)
            .field("rules", &self.rules)
            .field("refine", &self.refine.is_some())
            .field("message", &self.message)
            .field("empty_when", &self.empty_when.is_some())
            .finish()
    }
}

impl Validator {
    /// A validator that requires a non-blank value and has no further rules.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            optional: false,
            soft_required: false,
            rules: Vec::new(),
            refine: None,
            message: None,
            empty_when: None,
        }
    }

    /// Let blank values pass without running any rule.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Warn, without failing, when an optional value is blank.
    pub fn soft_required(mut self) -> Self {
        self.soft_required = true;
        self
    }

    /// Add a rule; all rules must pass.
    pub fn and(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Attach the asynchronous second phase.
    pub fn with_refinement(mut self, refinement: Arc<dyn Refinement>) -> Self {
        self.refine = Some(refinement);
        self
    }

    /// Treat non-blank values matching `empty` as empty for the soft-required
    /// warning, e.g. an unchecked checkbox.
    pub fn with_emptiness(mut self, empty: EmptinessFn) -> Self {
        self.empty_when = Some(empty);
        self
    }

    /// Replace every synchronous error message with `message`.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_soft_required(&self) -> bool {
        self.soft_required
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn has_refinement(&self) -> bool {
        self.refine.is_some()
    }

    /// Per-row validator maps, when this validates a repeater.
    pub fn row_validators(&self) -> Option<&[ValidatorMap]> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::Rows(rows) => Some(rows.as_slice()),
            _ => None,
        })
    }

    /// Run the synchronous phase.
    pub fn check(&self, path: &str, value: Option<&Value>) -> Vec<Issue> {
        let mut issues = Vec::new();
        let value = match value {
            Some(v) if !is_blank(Some(v)) => v,
            _ => {
                if !self.optional {
                    issues.push(self.error(path, format!("{} is required", self.label)));
                } else if self.soft_required {
                    issues.push(self.recommended(path));
                }
                return issues;
            }
        };
        if self.optional && self.soft_required && self.empty_when.as_ref().is_some_and(|f| f(value)) {
            issues.push(self.recommended(path));
            return issues;
        }

        issues.extend(self.own_errors(path, value));
        if let Some(rows) = self.row_validators() {
            check_rows(path, value, rows, &mut issues);
        }
        issues
    }

    /// Run the synchronous phase, then the refinements of every part whose
    /// synchronous phase passed.
    pub async fn validate(&self, path: &str, value: Option<&Value>) -> ValidationResult {
        let mut issues = self.check(path, value);

        let mut pending = Vec::new();
        self.collect_refinements(path, value, &mut pending);
        let outcomes = join_all(pending.into_iter().map(|(at, value, refinement)| async move {
            let outcome = refinement.refine(&value).await;
            (at, outcome)
        }))
        .await;

        for (at, outcome) in outcomes {
            match outcome {
                Ok(None) => {}
                Ok(Some(message)) => issues.push(Issue::error(at, message)),
                Err(e) => {
                    warn!(path = %at, error = %e, "validation plugin failed");
                    issues.push(Issue::error(at, format!("could not be verified: {e}")));
                }
            }
        }

        ValidationResult {
            path: path.to_string(),
            issues,
        }
    }

    fn own_errors(&self, path: &str, value: &Value) -> Vec<Issue> {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(&self.label, value))
            .map(|message| self.error(path, message))
            .collect()
    }

    fn recommended(&self, path: &str) -> Issue {
        Issue::warning(path, format!("{} is recommended", self.label))
    }

    fn error(&self, path: &str, message: String) -> Issue {
        Issue::error(path, self.message.clone().unwrap_or(message))
    }

    fn collect_refinements(
        &self,
        path: &str,
        value: Option<&Value>,
        out: &mut Vec<(String, Value, Arc<dyn Refinement>)>,
    ) {
        let Some(value) = value.filter(|v| !is_blank(Some(*v))) else {
            return;
        };
        if !self.own_errors(path, value).is_empty() {
            return;
        }
        if let Some(refinement) = &self.refine {
            out.push((path.to_string(), value.clone(), Arc::clone(refinement)));
        }
        if let (Some(rows), Some(items)) = (self.row_validators(), value.as_array()) {
            for (index, (row, validators)) in items.iter().zip(rows).enumerate() {
                let base = row_path(path, index);
                for (relative, validator) in validators {
                    validator.collect_refinements(
                        &join(&base, relative),
                        get_path(row, relative),
                        out,
                    );
                }
            }
        }
    }
}

fn check_rows(path: &str, value: &Value, rows: &[ValidatorMap], issues: &mut Vec<Issue>) {
    let Some(items) = value.as_array() else {
        return;
    };
    for (index, (row, validators)) in items.iter().zip(rows).enumerate() {
        let base = row_path(path, index);
        for (relative, validator) in validators {
            issues.extend(validator.check(&join(&base, relative), get_path(row, relative)));
        }
    }
}

/// Validate every entry of a map against the value at its path.
///
/// Entries run concurrently and independently; one failing refinement only
/// affects its own result.
pub async fn validate_all(validators: &ValidatorMap, values: &Value) -> ValidationReport {
    let results = join_all(
        validators
            .iter()
            .map(|(path, validator)| validator.validate(path, get_path(values, path))),
    )
    .await;
    ValidationReport { results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::plugin::PluginError;
    use crate::validation::rule::ValueShape;
    use async_trait::async_trait;
    use serde_json::json;

    struct Reject(&'static str);

    #[async_trait]
    impl Refinement for Reject {
        async fn refine(&self, _value: &Value) -> Result<Option<String>, PluginError> {
            Ok(Some(self.0.to_string()))
        }
    }

    struct Offline;

    #[async_trait]
    impl Refinement for Offline {
        async fn refine(&self, _value: &Value) -> Result<Option<String>, PluginError> {
            Err(PluginError::Unavailable {
                plugin: "vin".into(),
                message: "connection refused".into(),
            })
        }
    }

    #[test]
    fn required_by_default() {
        let v = Validator::new("Name");
        let issues = v.check("name", Some(&json!("")));
        assert_eq!(issues, vec![Issue::error("name", "Name is required")]);
        assert!(v.check("name", Some(&json!("x"))).is_empty());
        assert_eq!(v.check("name", None).len(), 1);
    }

    #[test]
    fn optional_skips_rules_when_blank() {
        let v = Validator::new("Code").optional().and(Rule::MinLength(3));
        assert!(v.check("code", Some(&json!(""))).is_empty());
        assert_eq!(v.check("code", Some(&json!("ab"))).len(), 1);
    }

    #[test]
    fn soft_required_warns() {
        let v = Validator::new("Phone").optional().soft_required();
        let issues = v.check("phone", None);
        assert_eq!(issues, vec![Issue::warning("phone", "Phone is recommended")]);
        let result = ValidationResult {
            path: "phone".into(),
            issues,
        };
        assert!(result.is_valid());
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn soft_required_uses_type_emptiness() {
        let v = Validator::new("Terms")
            .optional()
            .soft_required()
            .and(Rule::Shape(ValueShape::Boolean))
            .with_emptiness(Arc::new(|value: &Value| value != &Value::Bool(true)));
        assert_eq!(
            v.check("terms", Some(&json!(false))),
            vec![Issue::warning("terms", "Terms is recommended")]
        );
        assert!(v.check("terms", Some(&json!(true))).is_empty());
    }

    #[test]
    fn custom_message_replaces_errors() {
        let v = Validator::new("Age")
            .and(Rule::Shape(ValueShape::Number))
            .with_message("Enter your age");
        let issues = v.check("age", Some(&json!("old")));
        assert_eq!(issues[0].message, "Enter your age");
    }

    #[test]
    fn rows_are_checked_with_full_paths() {
        let mut row = ValidatorMap::new();
        row.insert("n".into(), Validator::new("n"));
        let v = Validator::new("Rows")
            .optional()
            .and(Rule::Shape(ValueShape::Array))
            .and(Rule::Rows(vec![row.clone(), row]));

        let issues = v.check("rows", Some(&json!([{"n": "ok"}, {"n": ""}])));
        assert_eq!(issues, vec![Issue::error("rows.1.n", "n is required")]);
    }

    #[tokio::test]
    async fn refinement_runs_after_shape_passes() {
        let v = Validator::new("VIN")
            .and(Rule::MinLength(3))
            .with_refinement(Arc::new(Reject("unknown vehicle")));

        let short = v.validate("vin", Some(&json!("ab"))).await;
        assert_eq!(short.issues.len(), 1);
        assert!(short.issues[0].message.contains("at least 3"));

        let long = v.validate("vin", Some(&json!("abcdef"))).await;
        assert_eq!(long.issues, vec![Issue::error("vin", "unknown vehicle")]);
    }

    #[tokio::test]
    async fn plugin_failure_becomes_local_issue() {
        let v = Validator::new("VIN").with_refinement(Arc::new(Offline));
        let result = v.validate("vin", Some(&json!("abc"))).await;
        assert!(!result.is_valid());
        assert!(result.issues[0].message.contains("connection refused"));
    }

    #[tokio::test]
    async fn validate_all_isolates_failures() {
        let mut map = ValidatorMap::new();
        map.insert(
            "vin".into(),
            Validator::new("VIN").with_refinement(Arc::new(Offline)),
        );
        map.insert("name".into(), Validator::new("Name"));

        let report = validate_all(&map, &json!({"vin": "abc", "name": "Jane"})).await;
        assert!(!report.is_valid());
        assert!(!report.get("vin").unwrap().is_valid());
        assert!(report.get("name").unwrap().is_valid());
    }

    #[tokio::test]
    async fn row_refinements_are_collected() {
        let mut row = ValidatorMap::new();
        row.insert(
            "plate".into(),
            Validator::new("Plate").with_refinement(Arc::new(Reject("stolen"))),
        );
        let v = Validator::new("Vehicles").and(Rule::Rows(vec![row]));

        let result = v
            .validate("vehicles", Some(&json!([{"plate": "AB-1"}])))
            .await;
        assert_eq!(
            result.issues,
            vec![Issue::error("vehicles.0.plate", "stolen")]
        );
    }
}
