//! Core node types for the form schema.
//!
//! A form is a tree of [`Node`]s deserialized from JSON. Every node carries a
//! `type` tag; whether that tag means a leaf, a group, a layout or a repeater
//! is decided by the capability bundle registered for it, not by the JSON.
//! Attributes the engine does not know about are preserved in `extra` so that
//! type-specific capabilities can read them.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldsError, Result};

/// Row breadcrumb label used when a repeater does not declare `rowLabel`.
pub const DEFAULT_ROW_LABEL: &str = "Row";

/// Structural role of a node type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Produces exactly one value at its own path.
    Leaf,
    /// Presentational container, no path segment.
    Group,
    /// Presentational container split into columns, no path segment.
    Layout,
    /// Owns an array of rows shaped like its template.
    Repeater,
}

impl NodeKind {
    /// Whether nodes of this kind own a path segment and a store entry.
    pub fn owns_path(self) -> bool {
        matches!(self, NodeKind::Leaf | NodeKind::Repeater)
    }
}

/// One column of a layout node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Column {
    #[serde(default)]
    pub components: Vec<Node>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Declarative "simple" visibility condition.
///
/// `when` names the path of another value; the node is shown when that value
/// equals `eq` if `show` is true, and hidden when it does if `show` is false.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Conditional {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<Value>,
}

impl Conditional {
    /// The `show` flag, accepting booleans and their string spellings.
    ///
    /// Returns `None` when the flag is absent or unparseable, in which case
    /// the condition does not apply.
    pub fn show_flag(&self) -> Option<bool> {
        match self.show.as_ref()? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// The `when` path, if it is set and non-empty.
    pub fn when_path(&self) -> Option<&str> {
        self.when.as_deref().filter(|w| !w.is_empty())
    }
}

/// Validation attributes of a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSpec {
    #[serde(default)]
    pub required: bool,
    /// Warn when empty without blocking submission.
    #[serde(default)]
    pub soft_required: bool,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    /// Names of externally delegated validation plugins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
}

/// Numeric attribute that may arrive as a number, a numeric string, `""` or
/// `null`. Anything that is not a usable number reads as unset.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + FromStr,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text.trim().parse().ok(),
        value => serde_json::from_value(value).ok(),
    })
}

fn default_true() -> bool {
    true
}

/// A single element of the form schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "default_true")]
    pub clear_on_hide: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<Conditional>,
    #[serde(default)]
    pub validate: ValidateSpec,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Create a bare node of the given type.
    pub fn new(type_: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            key: None,
            label: None,
            hidden: false,
            clear_on_hide: true,
            conditional: None,
            validate: ValidateSpec::default(),
            multiple: false,
            default_value: None,
            components: Vec::new(),
            columns: Vec::new(),
            row_label: None,
            extra: Map::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_components(mut self, components: Vec<Node>) -> Self {
        self.components = components;
        self
    }

    /// Add a column holding the given children.
    pub fn with_column(mut self, components: Vec<Node>) -> Self {
        self.columns.push(Column {
            components,
            extra: Map::new(),
        });
        self
    }

    pub fn with_conditional(mut self, show: bool, when: impl Into<String>, eq: Value) -> Self {
        self.conditional = Some(Conditional {
            show: Some(Value::Bool(show)),
            when: Some(when.into()),
            eq: Some(eq),
        });
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn clear_on_hide(mut self, clear: bool) -> Self {
        self.clear_on_hide = clear;
        self
    }

    pub fn required(mut self) -> Self {
        self.validate.required = true;
        self
    }

    pub fn soft_required(mut self) -> Self {
        self.validate.soft_required = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// The key, if present and non-empty.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    /// The human label: `label`, falling back to the `legend` and `title`
    /// attributes used by fieldsets and panels.
    pub fn display_label(&self) -> Option<&str> {
        if let Some(label) = self.label.as_deref().filter(|l| !l.is_empty()) {
            return Some(label);
        }
        ["legend", "title"]
            .iter()
            .filter_map(|name| self.extra.get(*name).and_then(Value::as_str))
            .find(|s| !s.is_empty())
    }

    /// Label used in breadcrumbs and messages; falls back to the key.
    pub fn breadcrumb_label(&self) -> &str {
        self.display_label()
            .or_else(|| self.key())
            .unwrap_or(&self.type_)
    }

    /// Label of one repeater row, without its number.
    pub fn row_label(&self) -> &str {
        self.row_label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_ROW_LABEL)
    }

    /// All children in document order: `components` first, then every
    /// column's components.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.components
            .iter()
            .chain(self.columns.iter().flat_map(|c| c.components.iter()))
    }
}

/// A parsed form schema: the top-level list of nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    #[serde(default)]
    pub components: Vec<Node>,
}

impl Schema {
    pub fn new(components: Vec<Node>) -> Self {
        Self { components }
    }

    /// Parse a schema from JSON text.
    ///
    /// Accepts either a bare array of nodes or an object with a `components`
    /// array.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Interpret an already parsed JSON document as a schema.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(_) => Ok(Self {
                components: serde_json::from_value(value)?,
            }),
            Value::Object(ref map) if map.contains_key("components") => {
                Ok(serde_json::from_value(value)?)
            }
            other => Err(FieldsError::invalid_schema(format!(
                "expected an array of nodes or an object with 'components', got {}",
                kind_name(&other)
            ))),
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object without 'components'",
    }
}
