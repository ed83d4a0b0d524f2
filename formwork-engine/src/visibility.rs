//! Visibility Resolver: effective visibility plus clear-on-hide.
//!
//! One pass walks the node tree against a snapshot of the value store. A node
//! is hidden when its own condition says so or any ancestor is hidden. Hidden
//! nodes whose policy asks for it (or whose hidden ancestor forces it) have
//! their value reset through the type's `applyVisibility` capability. Clearing
//! is written to a new store; conditions always read the input snapshot.
//!
//! The pass also materializes the per-row instances of every repeater, giving
//! the [`ResolvedNode`] tree the composer and reporter work from. Rows of a
//! hidden repeater that kept its value are annotated as hidden but left as
//! they are.

use formwork_fields::{
    child_path, get_path, owns_segment, row_path, set_path, CapabilityBundle, ConditionScope,
    FieldsError, FormContext, HideState, Node, NodeKind,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::Result;

/// One node instance after a visibility pass.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedNode<'a> {
    #[serde(skip)]
    pub node: &'a Node,
    #[serde(rename = "type")]
    pub type_: &'a str,
    /// `None` for unknown type tags.
    pub kind: Option<NodeKind>,
    pub path: String,
    pub hidden: bool,
    /// Children of groups, layouts and unknown nodes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResolvedNode<'a>>,
    /// Template instances of a repeater, one list per existing row.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<ResolvedNode<'a>>>,
}

impl<'a> ResolvedNode<'a> {
    /// Whether this instance owns an entry in the value store.
    pub fn owns_value(&self) -> bool {
        owns_segment(self.node, self.kind)
    }

    /// Find the instance resolved at `path`, searching depth first.
    pub fn find(&self, path: &str) -> Option<&ResolvedNode<'a>> {
        if self.owns_value() && self.path == path {
            return Some(self);
        }
        self.children
            .iter()
            .chain(self.rows.iter().flatten())
            .find_map(|child| child.find(path))
    }
}

/// Find the instance resolved at `path` in a resolved forest.
pub fn find_resolved<'r, 'a>(tree: &'r [ResolvedNode<'a>], path: &str) -> Option<&'r ResolvedNode<'a>> {
    tree.iter().find_map(|node| node.find(path))
}

/// Output of one visibility pass.
#[derive(Debug, Clone)]
pub struct VisibilityOutcome<'a> {
    /// The adjusted value store.
    pub values: Value,
    pub tree: Vec<ResolvedNode<'a>>,
    /// Paths whose value was reset during this pass, in tree order.
    pub cleared: Vec<String>,
}

/// Run one visibility pass over `nodes`.
///
/// Fails when a value-owning template child of a repeater has a type without
/// the `applyVisibility` capability, or when clearing cannot address a path.
pub fn resolve_visibility<'a>(
    nodes: &'a [Node],
    values: &Value,
    ctx: &FormContext,
) -> Result<VisibilityOutcome<'a>> {
    let mut pass = Pass {
        ctx,
        snapshot: values,
        out: values.clone(),
        cleared: Vec::new(),
    };
    let tree = nodes
        .iter()
        .map(|node| pass.walk(node, Position::top(""), HideState::default()))
        .collect::<Result<Vec<_>>>()?;

    debug!(cleared = pass.cleared.len(), "visibility pass complete");
    Ok(VisibilityOutcome {
        values: pass.out,
        tree,
        cleared: pass.cleared,
    })
}

/// Where a node sits: its parent path and, inside a repeater, its row.
#[derive(Clone, Copy)]
struct Position<'p, 's> {
    parent: &'p str,
    /// Set only for direct template children of a repeater.
    row_index: Option<usize>,
    /// Snapshot of the enclosing row, if any.
    row: Option<&'s Value>,
    /// Inside the rows of a hidden repeater that was not cleared.
    keep_values: bool,
}

impl<'p, 's> Position<'p, 's> {
    fn top(parent: &'p str) -> Self {
        Self {
            parent,
            row_index: None,
            row: None,
            keep_values: false,
        }
    }
}

struct Pass<'c, 's> {
    ctx: &'c FormContext,
    snapshot: &'s Value,
    out: Value,
    cleared: Vec<String>,
}

impl<'c, 's> Pass<'c, 's> {
    fn walk<'a>(
        &mut self,
        node: &'a Node,
        at: Position<'_, 's>,
        inherited: HideState,
    ) -> Result<ResolvedNode<'a>> {
        let ctx = self.ctx;
        let bundle = ctx.registry().lookup(&node.type_);
        let kind = bundle.map(CapabilityBundle::kind);
        let path = child_path(at.parent, node, kind, at.row_index);

        let scope = ConditionScope {
            data: self.snapshot,
            row: at.row,
            path: &path,
        };
        let own_hidden = ctx.conditions().is_hidden(node, &scope);
        let hidden = own_hidden || inherited.hidden;
        let state = HideState {
            hidden,
            clear: hidden && (node.clear_on_hide || inherited.clear),
        };
        trace!(path = %path, type_ = %node.type_, hidden, clear = state.clear, "visibility");

        let mut resolved = ResolvedNode {
            node,
            type_: &node.type_,
            kind,
            path,
            hidden,
            children: Vec::new(),
            rows: Vec::new(),
        };

        match (kind, bundle) {
            (Some(NodeKind::Leaf), Some(bundle)) => {
                if resolved.owns_value() && !at.keep_values {
                    self.apply(bundle, node, &resolved.path, state)?;
                }
            }
            (Some(NodeKind::Repeater), Some(bundle)) => {
                if resolved.owns_value() {
                    check_template(node, &resolved.path, ctx)?;
                    if !at.keep_values {
                        self.apply(bundle, node, &resolved.path, state)?;
                    }
                    let keep_values = at.keep_values || state.hidden;
                    resolved.rows = self.walk_rows(node, &resolved.path, state, keep_values)?;
                }
            }
            _ => {
                if kind.is_none() {
                    ctx.diagnostics().unknown_type(&node.type_, &resolved.path);
                }
                let inner = Position {
                    parent: &resolved.path,
                    row_index: None,
                    ..at
                };
                resolved.children = node
                    .children()
                    .map(|child| self.walk(child, inner, state))
                    .collect::<Result<Vec<_>>>()?;
            }
        }
        Ok(resolved)
    }

    /// Apply the template to every row left after the repeater itself was
    /// processed. Each row sees its own snapshot slice as condition scope.
    fn walk_rows<'a>(
        &mut self,
        node: &'a Node,
        path: &str,
        state: HideState,
        keep_values: bool,
    ) -> Result<Vec<Vec<ResolvedNode<'a>>>> {
        let count = get_path(&self.out, path)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let snapshot = self.snapshot;

        (0..count)
            .map(|index| {
                let at = Position {
                    parent: path,
                    row_index: Some(index),
                    row: get_path(snapshot, &row_path(path, index)),
                    keep_values,
                };
                node.children()
                    .map(|child| self.walk(child, at, state))
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }

    fn apply(
        &mut self,
        bundle: &CapabilityBundle,
        node: &Node,
        path: &str,
        state: HideState,
    ) -> Result<()> {
        let current = get_path(&self.out, path);
        let Some(replacement) = bundle.apply_visibility(node, state, current) else {
            return Ok(());
        };
        if current != Some(&replacement) {
            trace!(path = %path, "clearing hidden value");
            set_path(&mut self.out, path, replacement)?;
            self.cleared.push(path.to_string());
        }
        Ok(())
    }
}

/// Every value-owning node of a repeater template, nested repeaters
/// included, must be able to clear itself. Checked whether or not rows exist.
fn check_template(repeater: &Node, path: &str, ctx: &FormContext) -> Result<()> {
    for child in repeater.children() {
        let bundle = ctx.registry().lookup(&child.type_);
        let kind = bundle.map(CapabilityBundle::kind);
        let child_at = child_path(path, child, kind, None);
        if let Some(bundle) = bundle {
            if owns_segment(child, kind) && !bundle.has_apply_visibility() {
                return Err(
                    FieldsError::missing_capability(&child.type_, child_at, "applyVisibility").into(),
                );
            }
        }
        check_template(child, &child_at, ctx)?;
    }
    Ok(())
}
