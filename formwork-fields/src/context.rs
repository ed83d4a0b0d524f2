//! Context threaded through every resolver call
//!
//! Holds the type registry, the condition evaluator, the optional plugin
//! validator and the diagnostics sink. There is no global instance: build one
//! at startup and pass it to every resolver call. Independent contexts (one
//! per test, one per tenant) never share state.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::condition::{ConditionEvaluator, DeclarativeConditions};
use crate::diagnostics::Diagnostics;
use crate::registry::{CapabilityBundle, TypeRegistry};
use crate::validation::PluginValidator;

/// Builder for `FormContext`. Created by `FormContext::builder()`.
pub struct FormContextBuilder {
    registry: Option<TypeRegistry>,
    extra_types: Vec<(String, CapabilityBundle)>,
    conditions: Arc<dyn ConditionEvaluator>,
    plugins: Option<Arc<dyn PluginValidator>>,
    warn_unknown_types: bool,
}

impl FormContextBuilder {
    /// Use `registry` instead of the built-in types.
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register an additional type on top of the chosen registry.
    pub fn with_type(mut self, tag: impl Into<String>, bundle: CapabilityBundle) -> Self {
        self.extra_types.push((tag.into(), bundle));
        self
    }

    /// Replace the declarative condition evaluator.
    pub fn with_conditions(mut self, conditions: impl ConditionEvaluator + 'static) -> Self {
        self.conditions = Arc::new(conditions);
        self
    }

    /// Provide the collaborator for plugin-backed validation.
    pub fn with_plugin_validator(mut self, plugins: Arc<dyn PluginValidator>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    /// Whether unknown types and similar diagnostics are logged as warnings.
    /// They are recorded either way.
    pub fn warn_unknown_types(mut self, warn: bool) -> Self {
        self.warn_unknown_types = warn;
        self
    }

    pub fn build(self) -> FormContext {
        let mut registry = self.registry.unwrap_or_else(TypeRegistry::with_builtins);
        for (tag, bundle) in self.extra_types {
            registry.register(tag, bundle);
        }

        debug!(
            types = registry.len(),
            plugins = self.plugins.is_some(),
            "form context built"
        );

        FormContext {
            registry,
            conditions: self.conditions,
            plugins: self.plugins,
            diagnostics: Diagnostics::new(self.warn_unknown_types),
        }
    }
}

/// Shared, read-only state threaded through every resolver call.
pub struct FormContext {
    registry: TypeRegistry,
    conditions: Arc<dyn ConditionEvaluator>,
    plugins: Option<Arc<dyn PluginValidator>>,
    diagnostics: Diagnostics,
}

impl fmt::Debug for FormContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormContext")
            .field("registry", &self.registry)
            .field("plugins", &self.plugins.is_some())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

impl FormContext {
    /// Start configuring a context.
    ///
    /// ```rust
    /// use formwork_fields::{CapabilityBundle, FormContext};
    ///
    /// let ctx = FormContext::builder()
    ///     .with_type("signature", CapabilityBundle::leaf())
    ///     .build();
    /// assert!(ctx.registry().lookup("signature").is_some());
    /// ```
    pub fn builder() -> FormContextBuilder {
        FormContextBuilder {
            registry: None,
            extra_types: Vec::new(),
            conditions: Arc::new(DeclarativeConditions),
            plugins: None,
            warn_unknown_types: true,
        }
    }

    /// Built-in types, declarative conditions, no plugin validator.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn conditions(&self) -> &dyn ConditionEvaluator {
        self.conditions.as_ref()
    }

    pub fn plugin_validator(&self) -> Option<&Arc<dyn PluginValidator>> {
        self.plugins.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl Default for FormContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionScope;
    use crate::types::{Node, NodeKind};
    use crate::validation::PluginError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct AlwaysOk;

    #[async_trait]
    impl PluginValidator for AlwaysOk {
        async fn validate(
            &self,
            _plugins: &[String],
            _value: &Value,
        ) -> Result<Option<String>, PluginError> {
            Ok(None)
        }
    }

    #[test]
    fn new_context_has_builtins() {
        let ctx = FormContext::new();
        assert!(ctx.registry().contains("textfield"));
        assert!(ctx.plugin_validator().is_none());
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn extra_types_override_builtins() {
        let ctx = FormContext::builder()
            .with_type("textfield", CapabilityBundle::group())
            .build();
        assert_eq!(ctx.registry().kind_of("textfield"), Some(NodeKind::Group));
    }

    #[test]
    fn custom_registry_replaces_builtins() {
        let ctx = FormContext::builder()
            .with_registry(TypeRegistry::new())
            .build();
        assert!(ctx.registry().is_empty());
    }

    #[test]
    fn custom_conditions() {
        let ctx = FormContext::builder()
            .with_conditions(|node: &Node, _scope: &ConditionScope<'_>| node.key() == Some("x"))
            .build();
        let data = json!({});
        let scope = ConditionScope::root(&data);
        assert!(ctx
            .conditions()
            .is_hidden(&Node::new("textfield").with_key("x"), &scope));
    }

    #[test]
    fn contexts_are_independent() {
        let a = FormContext::builder().warn_unknown_types(false).build();
        let b = FormContext::builder().warn_unknown_types(false).build();
        a.diagnostics().unknown_type("mystery", "m");
        assert_eq!(a.diagnostics().len(), 1);
        assert!(b.diagnostics().is_empty());
    }

    #[test]
    fn plugin_validator_is_exposed() {
        let ctx = FormContext::builder()
            .with_plugin_validator(Arc::new(AlwaysOk))
            .build();
        assert!(ctx.plugin_validator().is_some());
    }
}
