//! Initial Value Resolver: seed a value store with every default.

use formwork_fields::builtin::empty_value_for;
use formwork_fields::{
    child_path, owns_segment, set_path, CapabilityBundle, FormContext, Node, NodeKind,
};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::Result;

/// Build the value store a fresh form starts from.
///
/// Every addressable leaf and repeater gets exactly one entry; groups,
/// layouts and unknown types contribute nothing of their own. Repeaters start
/// with no rows, so their template paths are not populated.
pub fn initial_values(nodes: &[Node], ctx: &FormContext) -> Result<Value> {
    let mut values = Value::Object(Map::new());
    for node in nodes {
        seed(node, "", ctx, &mut values)?;
    }
    debug!(
        entries = values.as_object().map_or(0, Map::len),
        "initial values resolved"
    );
    Ok(values)
}

fn seed(node: &Node, parent: &str, ctx: &FormContext, values: &mut Value) -> Result<()> {
    let bundle = ctx.registry().lookup(&node.type_);
    let kind = bundle.map(CapabilityBundle::kind);
    let path = child_path(parent, node, kind, None);

    match (kind, bundle) {
        (Some(NodeKind::Leaf), Some(bundle)) => {
            if owns_segment(node, kind) {
                let value = bundle
                    .default_value(node)
                    .unwrap_or_else(|| empty_value_for(node));
                trace!(path = %path, "seeding leaf");
                set_path(values, &path, value)?;
            }
        }
        (Some(NodeKind::Repeater), _) => {
            if owns_segment(node, kind) {
                set_path(values, &path, Value::Array(Vec::new()))?;
            }
        }
        _ => {
            if kind.is_none() {
                ctx.diagnostics().unknown_type(&node.type_, &path);
            }
            for child in node.children() {
                seed(child, &path, ctx, values)?;
            }
        }
    }
    Ok(())
}
