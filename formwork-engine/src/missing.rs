//! Missing-Required Reporter.
//!
//! Lists soft-required fields that are visible but empty, each with a
//! breadcrumb label such as `Vehicles > Vehicle 2 > Plate`. Runs over the
//! resolved tree in two steps: prune to the nodes that can contribute, then
//! evaluate emptiness against the value store.

use formwork_fields::{get_path, is_blank, FormContext, Node, NodeKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::visibility::ResolvedNode;

/// Separator between breadcrumb labels.
pub const BREADCRUMB_SEPARATOR: &str = " > ";

/// A visible soft-required field with no value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingField {
    pub path: String,
    pub label: String,
}

/// Report every visible, empty, soft-required field in tree order.
pub fn missing_required(
    tree: &[ResolvedNode<'_>],
    values: &Value,
    ctx: &FormContext,
) -> Vec<MissingField> {
    let pruned = prune_list(tree);
    let mut missing = Vec::new();
    for entry in &pruned {
        evaluate(entry, &[], values, ctx, &mut missing);
    }
    debug!(missing = missing.len(), "missing-field report built");
    missing
}

/// The part of the resolved tree that can produce a report entry.
enum Pruned<'r, 'a> {
    Field(&'r ResolvedNode<'a>),
    Group {
        label: Option<&'a str>,
        children: Vec<Pruned<'r, 'a>>,
    },
    Repeater {
        resolved: &'r ResolvedNode<'a>,
        soft: bool,
        rows: Vec<Vec<Pruned<'r, 'a>>>,
    },
}

fn prune_list<'r, 'a>(nodes: &'r [ResolvedNode<'a>]) -> Vec<Pruned<'r, 'a>> {
    nodes.iter().filter_map(prune).collect()
}

fn prune<'r, 'a>(resolved: &'r ResolvedNode<'a>) -> Option<Pruned<'r, 'a>> {
    if resolved.hidden {
        return None;
    }
    let node = resolved.node;
    match resolved.kind {
        Some(NodeKind::Leaf) => {
            (resolved.owns_value() && node.validate.soft_required).then_some(Pruned::Field(resolved))
        }
        Some(NodeKind::Repeater) => {
            if !resolved.owns_value() {
                return None;
            }
            let soft = node.validate.soft_required;
            if !has_soft_required_descendant(node) {
                return soft.then_some(Pruned::Field(resolved));
            }
            let rows: Vec<_> = resolved.rows.iter().map(|row| prune_list(row)).collect();
            (soft || rows.iter().any(|row| !row.is_empty())).then_some(Pruned::Repeater {
                resolved,
                soft,
                rows,
            })
        }
        kind => {
            let children = prune_list(&resolved.children);
            if children.is_empty() {
                return None;
            }
            let label = match kind {
                Some(NodeKind::Group) => node.display_label(),
                _ => None,
            };
            Some(Pruned::Group { label, children })
        }
    }
}

fn has_soft_required_descendant(node: &Node) -> bool {
    node.children()
        .any(|child| child.validate.soft_required || has_soft_required_descendant(child))
}

fn evaluate(
    entry: &Pruned<'_, '_>,
    crumbs: &[String],
    values: &Value,
    ctx: &FormContext,
    missing: &mut Vec<MissingField>,
) {
    match entry {
        Pruned::Field(resolved) => report_if_empty(resolved, crumbs, values, ctx, missing),
        Pruned::Group { label, children } => {
            let crumbs = with_crumb(crumbs, *label);
            for child in children {
                evaluate(child, &crumbs, values, ctx, missing);
            }
        }
        Pruned::Repeater {
            resolved,
            soft,
            rows,
        } => {
            if *soft {
                report_if_empty(resolved, crumbs, values, ctx, missing);
            }
            let repeater_crumbs = with_crumb(crumbs, Some(resolved.node.breadcrumb_label()));
            for (index, row) in rows.iter().enumerate() {
                let row_label = format!("{} {}", resolved.node.row_label(), index + 1);
                let row_crumbs = with_crumb(&repeater_crumbs, Some(row_label.as_str()));
                for child in row {
                    evaluate(child, &row_crumbs, values, ctx, missing);
                }
            }
        }
    }
}

fn report_if_empty(
    resolved: &ResolvedNode<'_>,
    crumbs: &[String],
    values: &Value,
    ctx: &FormContext,
    missing: &mut Vec<MissingField>,
) {
    let node = resolved.node;
    let value = get_path(values, &resolved.path);
    let empty = ctx
        .registry()
        .lookup(&node.type_)
        .and_then(|bundle| bundle.is_empty(node, value))
        .unwrap_or_else(|| is_blank(value));
    if empty {
        let crumbs = with_crumb(crumbs, Some(node.breadcrumb_label()));
        missing.push(MissingField {
            path: resolved.path.clone(),
            label: crumbs.join(BREADCRUMB_SEPARATOR),
        });
    }
}

fn with_crumb(crumbs: &[String], label: Option<&str>) -> Vec<String> {
    let mut next = crumbs.to_vec();
    if let Some(label) = label {
        next.push(label.to_string());
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::resolve_visibility;
    use formwork_fields::Schema;
    use serde_json::json;

    fn report(form: Value, values: Value) -> Vec<MissingField> {
        let ctx = FormContext::new();
        let schema = Schema::from_value(form).unwrap();
        let outcome = resolve_visibility(&schema.components, &values, &ctx).unwrap();
        missing_required(&outcome.tree, &outcome.values, &ctx)
    }

    fn field(path: &str, label: &str) -> MissingField {
        MissingField {
            path: path.into(),
            label: label.into(),
        }
    }

    #[test]
    fn empty_soft_required_leaf_is_reported() {
        let missing = report(
            json!([
                {"type": "textfield", "key": "phone", "label": "Phone",
                 "validate": {"softRequired": true}},
                {"type": "textfield", "key": "fax", "label": "Fax"}
            ]),
            json!({"phone": "", "fax": ""}),
        );
        assert_eq!(missing, vec![field("phone", "Phone")]);
    }

    #[test]
    fn group_labels_are_included_layouts_are_not() {
        let missing = report(
            json!([{
                "type": "panel", "title": "Contact",
                "components": [{
                    "type": "columns",
                    "columns": [{"components": [
                        {"type": "email", "key": "email", "validate": {"softRequired": true}}
                    ]}]
                }]
            }]),
            json!({}),
        );
        assert_eq!(missing, vec![field("email", "Contact > email")]);
    }

    #[test]
    fn hidden_fields_are_not_reported() {
        let missing = report(
            json!([{
                "type": "fieldset", "legend": "Extra", "hidden": true,
                "components": [
                    {"type": "textfield", "key": "a", "validate": {"softRequired": true}}
                ]
            }]),
            json!({"a": ""}),
        );
        assert!(missing.is_empty());
    }

    #[test]
    fn type_specific_emptiness() {
        let missing = report(
            json!([
                {"type": "checkbox", "key": "terms", "label": "Terms",
                 "validate": {"softRequired": true}},
                {"type": "selectboxes", "key": "days", "label": "Days",
                 "validate": {"softRequired": true}}
            ]),
            json!({"terms": false, "days": {"mon": true}}),
        );
        assert_eq!(missing, vec![field("terms", "Terms")]);
    }

    #[test]
    fn repeater_rows_get_numbered_breadcrumbs() {
        let missing = report(
            json!([{
                "type": "editgrid", "key": "cars", "label": "Vehicles", "rowLabel": "Vehicle",
                "components": [
                    {"type": "textfield", "key": "plate", "label": "Plate",
                     "validate": {"softRequired": true}}
                ]
            }]),
            json!({"cars": [{"plate": "A"}, {"plate": ""}]}),
        );
        assert_eq!(
            missing,
            vec![field("cars.1.plate", "Vehicles > Vehicle 2 > Plate")]
        );
    }

    #[test]
    fn soft_required_repeater_without_soft_children_is_terminal() {
        let missing = report(
            json!([{
                "type": "datagrid", "key": "kids", "label": "Children",
                "validate": {"softRequired": true},
                "components": [{"type": "textfield", "key": "name"}]
            }]),
            json!({"kids": []}),
        );
        assert_eq!(missing, vec![field("kids", "Children")]);
    }

    #[test]
    fn soft_required_repeater_with_rows_reports_children() {
        let missing = report(
            json!([{
                "type": "datagrid", "key": "kids", "label": "Children",
                "validate": {"softRequired": true},
                "components": [
                    {"type": "textfield", "key": "name", "validate": {"softRequired": true}}
                ]
            }]),
            json!({"kids": [{"name": ""}]}),
        );
        assert_eq!(missing, vec![field("kids.0.name", "Children > Row 1 > name")]);
    }

    #[test]
    fn nested_repeaters() {
        let missing = report(
            json!([{
                "type": "editgrid", "key": "owners", "label": "Owners",
                "components": [{
                    "type": "datagrid", "key": "cars", "label": "Cars",
                    "components": [
                        {"type": "textfield", "key": "vin", "label": "VIN",
                         "validate": {"softRequired": true}}
                    ]
                }]
            }]),
            json!({"owners": [{"cars": [{"vin": "1"}, {"vin": ""}]}]}),
        );
        assert_eq!(
            missing,
            vec![field(
                "owners.0.cars.1.vin",
                "Owners > Row 1 > Cars > Row 2 > VIN"
            )]
        );
    }
}
