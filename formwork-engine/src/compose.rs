//! Validation Schema Composer.
//!
//! Builds one validator per visible value-owning node, keyed by path in tree
//! order. Repeaters carry the validators of their rows nested inside their
//! own entry, keyed relative to each row, so a row path never appears at the
//! top level. The composer never runs a validator.

use formwork_fields::path::relative;
use formwork_fields::{row_path, FormContext, NodeKind, Rule, Validator, ValidatorMap};
use tracing::debug;

use crate::error::Result;
use crate::visibility::ResolvedNode;

/// Compose the validator map for a resolved tree. Hidden nodes and all of
/// their descendants are skipped.
pub fn compose_validators(tree: &[ResolvedNode<'_>], ctx: &FormContext) -> Result<ValidatorMap> {
    let mut validators = ValidatorMap::new();
    compose_into(tree, "", ctx, &mut validators)?;
    debug!(validators = validators.len(), "validators composed");
    Ok(validators)
}

fn compose_into(
    nodes: &[ResolvedNode<'_>],
    base: &str,
    ctx: &FormContext,
    validators: &mut ValidatorMap,
) -> Result<()> {
    for resolved in nodes.iter().filter(|r| !r.hidden) {
        match resolved.kind {
            Some(NodeKind::Leaf) => {
                if !resolved.owns_value() {
                    continue;
                }
                if let Some(validator) = build(resolved, ctx)? {
                    validators.insert(relative(base, &resolved.path).to_string(), validator);
                }
            }
            Some(NodeKind::Repeater) => {
                if !resolved.owns_value() {
                    continue;
                }
                let validator = build(resolved, ctx)?.unwrap_or_else(|| {
                    Validator::new(resolved.node.breadcrumb_label()).optional()
                });
                let rows = resolved
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(index, row)| {
                        let mut row_validators = ValidatorMap::new();
                        compose_into(
                            row,
                            &row_path(&resolved.path, index),
                            ctx,
                            &mut row_validators,
                        )?;
                        Ok(row_validators)
                    })
                    .collect::<Result<Vec<_>>>()?;
                validators.insert(
                    relative(base, &resolved.path).to_string(),
                    validator.and(Rule::Rows(rows)),
                );
            }
            _ => compose_into(&resolved.children, base, ctx, validators)?,
        }
    }
    Ok(())
}

fn build(resolved: &ResolvedNode<'_>, ctx: &FormContext) -> Result<Option<Validator>> {
    let Some(bundle) = ctx.registry().lookup(resolved.type_) else {
        return Ok(None);
    };
    let Some(validator) = bundle.build_validator(resolved.node, ctx).transpose()? else {
        return Ok(None);
    };
    Ok(Some(match bundle.emptiness_for(resolved.node) {
        Some(empty) if validator.is_soft_required() => validator.with_emptiness(empty),
        _ => validator,
    }))
}
