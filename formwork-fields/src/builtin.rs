//! Built-in node types.
//!
//! Consumers start from [`TypeRegistry::with_builtins`] and register their own
//! tags on top; a later registration for a built-in tag replaces it.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::FormContext;
use crate::diagnostics::DiagnosticKind;
use crate::error::{FieldsError, Result};
use crate::registry::{CapabilityBundle, HideState, TypeRegistry};
use crate::types::Node;
use crate::validation::rule::any_checked;
use crate::validation::{PluginRefinement, Rule, Validator, ValueShape};
use crate::value::is_blank;

const TEXT_TYPES: &[&str] = &[
    "textfield",
    "textarea",
    "phoneNumber",
    "hidden",
    "radio",
    "datetime",
    "day",
    "time",
];
const NUMBER_TYPES: &[&str] = &["number", "currency"];
const GROUP_TYPES: &[&str] = &["fieldset", "panel", "well", "content"];
const REPEATER_TYPES: &[&str] = &["editgrid", "datagrid"];

pub(crate) fn register_builtins(registry: &mut TypeRegistry) {
    for tag in TEXT_TYPES {
        registry.register(*tag, text_bundle(text_validator));
    }
    registry.register("email", text_bundle(email_validator));
    for tag in NUMBER_TYPES {
        registry.register(*tag, text_bundle(number_validator));
    }
    registry.register("select", text_bundle(select_validator));
    registry.register("checkbox", checkbox_bundle());
    registry.register("selectboxes", selectboxes_bundle());
    registry.register("file", list_bundle());
    registry.register("address", object_bundle());

    for tag in GROUP_TYPES {
        registry.register(*tag, CapabilityBundle::group());
    }
    registry.register("columns", CapabilityBundle::layout());
    for tag in REPEATER_TYPES {
        registry.register(*tag, repeater_bundle());
    }
}

/// Default for a scalar-or-list leaf: the declared `defaultValue`, else `[]`
/// for multi-valued nodes and `""` otherwise.
pub fn empty_value_for(node: &Node) -> Value {
    node.default_value.clone().unwrap_or_else(|| {
        if node.multiple {
            Value::Array(Vec::new())
        } else {
            Value::String(String::new())
        }
    })
}

fn reset_to(
    default: fn(&Node) -> Value,
) -> impl Fn(&Node, HideState, Option<&Value>) -> Option<Value> + Send + Sync + 'static {
    move |node, state, _current| state.clear.then(|| default(node))
}

fn text_bundle(
    validator: fn(&Node, &FormContext) -> Result<Validator>,
) -> CapabilityBundle {
    CapabilityBundle::leaf()
        .with_default_value(empty_value_for)
        .with_is_empty(|_, value| is_blank(value))
        .with_apply_visibility(reset_to(empty_value_for))
        .with_validator(validator)
}

fn checkbox_default(node: &Node) -> Value {
    node.default_value.clone().unwrap_or(Value::Bool(false))
}

fn checkbox_bundle() -> CapabilityBundle {
    CapabilityBundle::leaf()
        .with_default_value(checkbox_default)
        .with_is_empty(|_, value| value != Some(&Value::Bool(true)))
        .with_apply_visibility(reset_to(checkbox_default))
        .with_validator(|node, ctx| {
            let mut validator = base_validator(node, ctx).and(Rule::Shape(ValueShape::Boolean));
            if node.validate.required {
                validator = validator.and(Rule::MustBeTrue);
            }
            Ok(validator)
        })
}

/// Every option of a checkbox group, unchecked.
fn selectboxes_default(node: &Node) -> Value {
    if let Some(value) = &node.default_value {
        return value.clone();
    }
    let options = node
        .extra
        .get("values")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o.get("value").and_then(Value::as_str))
                .filter(|v| !v.is_empty())
                .map(|v| (v.to_string(), Value::Bool(false)))
                .collect::<Map<String, Value>>()
        })
        .unwrap_or_default();
    Value::Object(options)
}

fn selectboxes_bundle() -> CapabilityBundle {
    CapabilityBundle::leaf()
        .with_default_value(selectboxes_default)
        .with_is_empty(|_, value| !value.is_some_and(any_checked))
        .with_apply_visibility(reset_to(selectboxes_default))
        .with_validator(|node, ctx| {
            let mut validator = base_validator(node, ctx).and(Rule::Shape(ValueShape::Object));
            if node.validate.required {
                validator = validator.and(Rule::AnyChecked);
            }
            Ok(validator)
        })
}

fn empty_list(node: &Node) -> Value {
    node.default_value
        .clone()
        .unwrap_or_else(|| Value::Array(Vec::new()))
}

fn list_bundle() -> CapabilityBundle {
    CapabilityBundle::leaf()
        .with_default_value(empty_list)
        .with_is_empty(|_, value| is_blank(value))
        .with_apply_visibility(reset_to(empty_list))
        .with_validator(|node, ctx| {
            Ok(item_counts(
                node,
                base_validator(node, ctx).and(Rule::Shape(ValueShape::Array)),
            ))
        })
}

fn empty_object(node: &Node) -> Value {
    node.default_value
        .clone()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

fn object_bundle() -> CapabilityBundle {
    CapabilityBundle::leaf()
        .with_default_value(empty_object)
        .with_is_empty(|_, value| is_blank(value))
        .with_apply_visibility(reset_to(empty_object))
        .with_validator(|node, ctx| Ok(base_validator(node, ctx).and(Rule::Shape(ValueShape::Object))))
}

// Repeaters never synthesize rows: the default is always an empty array.
fn no_rows(_node: &Node) -> Value {
    Value::Array(Vec::new())
}

fn repeater_bundle() -> CapabilityBundle {
    CapabilityBundle::repeater()
        .with_default_value(no_rows)
        .with_is_empty(|_, value| is_blank(value))
        .with_apply_visibility(reset_to(no_rows))
        .with_validator(|node, ctx| {
            let mut validator = base_validator(node, ctx).and(Rule::Shape(ValueShape::Array));
            let min = node.validate.min_items.unwrap_or(0);
            let min = if node.validate.required { min.max(1) } else { min };
            if min > 0 {
                validator = validator.and(Rule::MinItems(min));
            }
            if let Some(max) = node.validate.max_items {
                validator = validator.and(Rule::MaxItems(max));
            }
            Ok(validator)
        })
}

/// Label, optionality, soft-required flag, custom message and plugin
/// refinement shared by every built-in leaf.
pub fn base_validator(node: &Node, ctx: &FormContext) -> Validator {
    let spec = &node.validate;
    let mut validator = Validator::new(node.breadcrumb_label());
    if !spec.required {
        validator = validator.optional();
    }
    if spec.soft_required {
        validator = validator.soft_required();
    }
    if let Some(message) = spec.custom_message.as_deref().filter(|m| !m.is_empty()) {
        validator = validator.with_message(message);
    }
    if !spec.plugins.is_empty() {
        match ctx.plugin_validator() {
            Some(plugins) => {
                validator = validator.with_refinement(Arc::new(PluginRefinement::new(
                    spec.plugins.clone(),
                    Arc::clone(plugins),
                )));
            }
            None => {
                let subject = spec.plugins.join(",");
                ctx.diagnostics().record(
                    DiagnosticKind::MissingPluginValidator,
                    &subject,
                    node.key().unwrap_or_default(),
                    format!("plugins [{subject}] requested but no plugin validator is configured; skipping"),
                );
            }
        }
    }
    validator
}

fn item_counts(node: &Node, mut validator: Validator) -> Validator {
    if let Some(min) = node.validate.min_items {
        validator = validator.and(Rule::MinItems(min));
    }
    if let Some(max) = node.validate.max_items {
        validator = validator.and(Rule::MaxItems(max));
    }
    validator
}

fn text_validator(node: &Node, ctx: &FormContext) -> Result<Validator> {
    let spec = &node.validate;
    let validator = base_validator(node, ctx);
    if node.multiple {
        return Ok(item_counts(node, validator.and(Rule::Shape(ValueShape::Array))));
    }

    let mut validator = validator.and(Rule::Shape(ValueShape::String));
    if let Some(min) = spec.min_length {
        validator = validator.and(Rule::MinLength(min));
    }
    if let Some(max) = spec.max_length {
        validator = validator.and(Rule::MaxLength(max));
    }
    if let Some(pattern) = spec.pattern.as_deref().filter(|p| !p.is_empty()) {
        let rule = Rule::pattern(pattern).map_err(|e| {
            FieldsError::invalid_schema(format!(
                "invalid pattern on '{}': {e}",
                node.breadcrumb_label()
            ))
        })?;
        validator = validator.and(rule);
    }
    Ok(validator)
}

fn email_validator(node: &Node, ctx: &FormContext) -> Result<Validator> {
    let validator = text_validator(node, ctx)?;
    Ok(if node.multiple {
        validator
    } else {
        validator.and(Rule::Email)
    })
}

fn number_validator(node: &Node, ctx: &FormContext) -> Result<Validator> {
    let validator = base_validator(node, ctx);
    if node.multiple {
        return Ok(item_counts(node, validator.and(Rule::Shape(ValueShape::Array))));
    }
    let mut validator = validator.and(Rule::Shape(ValueShape::Number));
    if let Some(min) = node.validate.min {
        validator = validator.and(Rule::Min(min));
    }
    if let Some(max) = node.validate.max {
        validator = validator.and(Rule::Max(max));
    }
    Ok(validator)
}

fn select_validator(node: &Node, ctx: &FormContext) -> Result<Validator> {
    let validator = base_validator(node, ctx);
    Ok(if node.multiple {
        item_counts(node, validator.and(Rule::Shape(ValueShape::Array)))
    } else {
        validator
    })
}
