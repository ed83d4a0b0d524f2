//! FormEngine: the four resolvers behind one facade.

use formwork_fields::{
    validate_all, Diagnostic, FormContext, Schema, ValidationReport, ValidatorMap,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::compose::compose_validators;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::initial::initial_values;
use crate::missing::{missing_required, MissingField};
use crate::visibility::{resolve_visibility, ResolvedNode, VisibilityOutcome};

/// Everything derived from one value store.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution<'a> {
    /// The value store after clearing.
    pub values: Value,
    pub tree: Vec<ResolvedNode<'a>>,
    #[serde(skip)]
    pub validators: ValidatorMap,
    pub missing: Vec<MissingField>,
    /// Every path reset across all passes, first reset first.
    pub cleared: Vec<String>,
    pub passes: usize,
    /// False when `max_passes` ran out before the store stopped changing.
    pub converged: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution<'_> {
    /// Paths that received a validator, in tree order.
    pub fn validator_paths(&self) -> Vec<&str> {
        self.validators.keys().map(String::as_str).collect()
    }

    /// Run every composed validator against the resolved values.
    pub async fn validate(&self) -> ValidationReport {
        validate_all(&self.validators, &self.values).await
    }
}

/// A parsed schema bound to a context and configuration.
#[derive(Debug)]
pub struct FormEngine {
    schema: Schema,
    ctx: FormContext,
    config: EngineConfig,
}

impl FormEngine {
    pub fn new(schema: Schema, ctx: FormContext, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            nodes = schema.components.len(),
            types = ctx.registry().len(),
            "form engine ready"
        );
        Ok(Self {
            schema,
            ctx,
            config,
        })
    }

    /// An engine over the built-in types, configured by `config`.
    pub fn with_config(schema: Schema, config: EngineConfig) -> Result<Self> {
        let ctx = config.context_builder().build();
        Self::new(schema, ctx, config)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn context(&self) -> &FormContext {
        &self.ctx
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The value store a fresh form starts from.
    pub fn initial_values(&self) -> Result<Value> {
        initial_values(&self.schema.components, &self.ctx)
    }

    /// One visibility pass. Conditions see `values` exactly as given, so a
    /// condition that depends on a value this pass clears is only re-read by
    /// the next pass.
    pub fn resolve_once(&self, values: &Value) -> Result<VisibilityOutcome<'_>> {
        resolve_visibility(&self.schema.components, values, &self.ctx)
    }

    /// Repeat visibility passes until the store stops changing (or
    /// `max_passes` is reached), then compose validators and the missing-field
    /// report over the final tree.
    pub fn resolve(&self, values: &Value) -> Result<Resolution<'_>> {
        let mut current = values.clone();
        let mut cleared: Vec<String> = Vec::new();
        let mut passes = 0;

        let (tree, converged) = loop {
            passes += 1;
            let VisibilityOutcome {
                values: next,
                tree,
                cleared: newly_cleared,
            } = self.resolve_once(&current)?;

            for path in newly_cleared {
                if !cleared.contains(&path) {
                    cleared.push(path);
                }
            }

            let stable = next == current;
            current = next;
            if stable {
                break (tree, true);
            }
            if passes >= self.config.max_passes {
                warn!(
                    passes,
                    "visibility did not converge; values may still depend on cleared fields"
                );
                break (tree, false);
            }
        };

        let validators = compose_validators(&tree, &self.ctx)?;
        let missing = missing_required(&tree, &current, &self.ctx);
        debug!(
            passes,
            converged,
            cleared = cleared.len(),
            validators = validators.len(),
            missing = missing.len(),
            "form resolved"
        );

        Ok(Resolution {
            values: current,
            tree,
            validators,
            missing,
            cleared,
            passes,
            converged,
            diagnostics: self.ctx.diagnostics().entries(),
        })
    }

    /// Resolve, then run every validator of the visible tree.
    pub async fn validate(&self, values: &Value) -> Result<(Resolution<'_>, ValidationReport)> {
        let resolution = self.resolve(values)?;
        let report = resolution.validate().await;
        Ok((resolution, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use serde_json::json;

    fn engine(form: Value) -> FormEngine {
        let schema = Schema::from_value(form).unwrap();
        FormEngine::with_config(schema, EngineConfig::default()).unwrap()
    }

    #[test]
    fn zero_max_passes_is_rejected() {
        let config = EngineConfig {
            max_passes: 0,
            ..EngineConfig::default()
        };
        let err = FormEngine::with_config(Schema::default(), config).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn stable_values_take_one_pass() {
        let engine = engine(json!([{"type": "textfield", "key": "a"}]));
        let resolution = engine.resolve(&json!({"a": "x"})).unwrap();
        assert_eq!(resolution.passes, 1);
        assert!(resolution.converged);
        assert_eq!(resolution.validator_paths(), vec!["a"]);
    }

    #[test]
    fn second_order_effects_need_another_pass() {
        // Clearing `b` hides `c`, which only the second pass can see.
        let engine = engine(json!([
            {"type": "checkbox", "key": "a"},
            {"type": "textfield", "key": "b",
             "conditional": {"show": true, "when": "a", "eq": true}},
            {"type": "textfield", "key": "c",
             "conditional": {"show": true, "when": "b", "eq": "yes"}}
        ]));
        let values = json!({"a": false, "b": "yes", "c": "filled"});

        let once = engine.resolve_once(&values).unwrap();
        assert_eq!(once.values, json!({"a": false, "b": "", "c": "filled"}));

        let resolution = engine.resolve(&values).unwrap();
        assert_eq!(resolution.values, json!({"a": false, "b": "", "c": ""}));
        assert_eq!(resolution.cleared, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(resolution.passes, 3);
        assert!(resolution.converged);
        assert_eq!(resolution.validator_paths(), vec!["a"]);
    }

    #[test]
    fn pass_limit_reports_non_convergence() {
        let schema = Schema::from_value(json!([
            {"type": "checkbox", "key": "a"},
            {"type": "textfield", "key": "b",
             "conditional": {"show": true, "when": "a", "eq": true}},
            {"type": "textfield", "key": "c",
             "conditional": {"show": true, "when": "b", "eq": "yes"}}
        ]))
        .unwrap();
        let config = EngineConfig {
            max_passes: 1,
            ..EngineConfig::default()
        };
        let engine = FormEngine::with_config(schema, config).unwrap();
        let resolution = engine
            .resolve(&json!({"a": false, "b": "yes", "c": "filled"}))
            .unwrap();
        assert_eq!(resolution.passes, 1);
        assert!(!resolution.converged);
    }

    #[tokio::test]
    async fn validate_runs_visible_validators_only() {
        let engine = engine(json!([
            {"type": "checkbox", "key": "more"},
            {"type": "textfield", "key": "details", "validate": {"required": true},
             "conditional": {"show": true, "when": "more", "eq": true}},
            {"type": "email", "key": "email"}
        ]));
        let (resolution, report) = engine
            .validate(&json!({"more": false, "details": "", "email": "nope"}))
            .await
            .unwrap();
        assert_eq!(resolution.validator_paths(), vec!["more", "email"]);
        assert!(!report.is_valid());
        assert!(report.get("details").is_none());
        assert!(!report.get("email").unwrap().is_valid());
    }

    #[test]
    fn resolution_serializes_without_validators() {
        let engine = engine(json!([{"type": "textfield", "key": "a"}]));
        let resolution = engine.resolve(&json!({"a": ""})).unwrap();
        let json = serde_json::to_value(&resolution).unwrap();
        assert!(json.get("validators").is_none());
        assert_eq!(json["tree"][0]["path"], "a");
        assert_eq!(json["converged"], true);
    }
}
