//! Synchronous shape rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validator::ValidatorMap;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});

/// JSON shape a value must have.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ValueShape {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueShape {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ValueShape::String => value.is_string(),
            ValueShape::Number => value.is_number(),
            ValueShape::Boolean => value.is_boolean(),
            ValueShape::Array => value.is_array(),
            ValueShape::Object => value.is_object(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ValueShape::String => "text",
            ValueShape::Number => "a number",
            ValueShape::Boolean => "true or false",
            ValueShape::Array => "a list",
            ValueShape::Object => "an object",
        }
    }
}

/// One synchronous check applied to a non-blank value.
#[derive(Debug, Clone)]
pub enum Rule {
    Shape(ValueShape),
    MinLength(usize),
    MaxLength(usize),
    /// Anchored regular expression over the whole text.
    Pattern(Regex),
    Email,
    Min(f64),
    Max(f64),
    MinItems(usize),
    MaxItems(usize),
    /// Checkbox semantics: the value must be `true`.
    MustBeTrue,
    /// Checkbox-group semantics: at least one entry must be `true`.
    AnyChecked,
    /// One validator map per existing row of a repeater, keyed by
    /// row-relative path.
    Rows(Vec<ValidatorMap>),
}

impl Rule {
    /// Build an anchored pattern rule.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{pattern})$")).map(Rule::Pattern)
    }

    /// Check a single value. Returns the failure message, if any.
    ///
    /// [`Rule::Rows`] is structural and always passes here; the owning
    /// validator descends into rows itself.
    pub fn check(&self, label: &str, value: &Value) -> Option<String> {
        match self {
            Rule::Shape(shape) => {
                (!shape.matches(value)).then(|| format!("{label} must be {}", shape.describe()))
            }
            Rule::MinLength(min) => text_len(value)
                .filter(|len| len < min)
                .map(|_| format!("{label} must be at least {min} characters")),
            Rule::MaxLength(max) => text_len(value)
                .filter(|len| len > max)
                .map(|_| format!("{label} must be at most {max} characters")),
            Rule::Pattern(re) => value
                .as_str()
                .filter(|s| !re.is_match(s))
                .map(|_| format!("{label} does not match the expected format")),
            Rule::Email => value
                .as_str()
                .filter(|s| !EMAIL.is_match(s))
                .map(|_| format!("{label} must be a valid email address")),
            Rule::Min(min) => value
                .as_f64()
                .filter(|n| n < min)
                .map(|_| format!("{label} must be at least {min}")),
            Rule::Max(max) => value
                .as_f64()
                .filter(|n| n > max)
                .map(|_| format!("{label} must be at most {max}")),
            Rule::MinItems(min) => value
                .as_array()
                .filter(|items| items.len() < *min)
                .map(|_| format!("{label} needs at least {min} entries")),
            Rule::MaxItems(max) => value
                .as_array()
                .filter(|items| items.len() > *max)
                .map(|_| format!("{label} allows at most {max} entries")),
            Rule::MustBeTrue => {
                (value != &Value::Bool(true)).then(|| format!("{label} must be checked"))
            }
            Rule::AnyChecked => (!any_checked(value))
                .then(|| format!("{label} needs at least one selection")),
            Rule::Rows(_) => None,
        }
    }
}

/// Whether an object of option → bool has a checked entry.
pub fn any_checked(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.values().any(|v| v == &Value::Bool(true)))
}

fn text_len(value: &Value) -> Option<usize> {
    value.as_str().map(|s| s.chars().count())
}
