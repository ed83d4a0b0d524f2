//! Type registry and capability bundles.
//!
//! Node behavior is looked up by type tag, never hard-wired: each tag maps to
//! a [`CapabilityBundle`] holding the structural kind plus optional
//! capabilities. A missing capability means "nothing type-specific to do";
//! resolvers still walk through the node.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::FormContext;
use crate::error::Result;
use crate::types::{Node, NodeKind};
use crate::validation::{EmptinessFn, Validator};

/// Effective visibility of a node during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HideState {
    /// Hidden by its own condition or by an ancestor.
    pub hidden: bool,
    /// Hidden and its value must be reset.
    pub clear: bool,
}

pub type DefaultValueFn = Arc<dyn Fn(&Node) -> Value + Send + Sync>;
pub type IsEmptyFn = Arc<dyn Fn(&Node, Option<&Value>) -> bool + Send + Sync>;
/// Returns the replacement value, or `None` to keep the current one.
pub type ApplyVisibilityFn =
    Arc<dyn Fn(&Node, HideState, Option<&Value>) -> Option<Value> + Send + Sync>;
pub type BuildValidatorFn = Arc<dyn Fn(&Node, &FormContext) -> Result<Validator> + Send + Sync>;

/// Behaviors a node type supplies.
#[derive(Clone)]
pub struct CapabilityBundle {
    kind: NodeKind,
    default_value: Option<DefaultValueFn>,
    is_empty: Option<IsEmptyFn>,
    apply_visibility: Option<ApplyVisibilityFn>,
    build_validator: Option<BuildValidatorFn>,
    renderer: Option<Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for CapabilityBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityBundle")
            .field("kind", &self.kind)
            .field("default_value", &self.default_value.is_some())
            .field("is_empty", &self.is_empty.is_some())
            .field("apply_visibility", &self.apply_visibility.is_some())
            .field("build_validator", &self.build_validator.is_some())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl CapabilityBundle {
    /// A bundle with no capabilities.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            default_value: None,
            is_empty: None,
            apply_visibility: None,
            build_validator: None,
            renderer: None,
        }
    }

    pub fn leaf() -> Self {
        Self::new(NodeKind::Leaf)
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn layout() -> Self {
        Self::new(NodeKind::Layout)
    }

    pub fn repeater() -> Self {
        Self::new(NodeKind::Repeater)
    }

    pub fn with_default_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&Node) -> Value + Send + Sync + 'static,
    {
        self.default_value = Some(Arc::new(f));
        self
    }

    pub fn with_is_empty<F>(mut self, f: F) -> Self
    where
        F: Fn(&Node, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.is_empty = Some(Arc::new(f));
        self
    }

    pub fn with_apply_visibility<F>(mut self, f: F) -> Self
    where
        F: Fn(&Node, HideState, Option<&Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.apply_visibility = Some(Arc::new(f));
        self
    }

    pub fn with_validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Node, &FormContext) -> Result<Validator> + Send + Sync + 'static,
    {
        self.build_validator = Some(Arc::new(f));
        self
    }

    /// Attach the presentation layer's render-children callback. The engine
    /// stores it and never calls it.
    pub fn with_renderer(mut self, renderer: Arc<dyn Any + Send + Sync>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn renderer(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.renderer.as_ref()
    }

    pub fn has_apply_visibility(&self) -> bool {
        self.apply_visibility.is_some()
    }

    /// The type's default for `node`, or `None` without the capability.
    pub fn default_value(&self, node: &Node) -> Option<Value> {
        self.default_value.as_ref().map(|f| f(node))
    }

    /// Whether `value` counts as empty, or `None` without the capability.
    pub fn is_empty(&self, node: &Node, value: Option<&Value>) -> Option<bool> {
        self.is_empty.as_ref().map(|f| f(node, value))
    }

    /// The `isEmpty` capability bound to `node`, for validators that must
    /// agree with the missing-field report.
    pub fn emptiness_for(&self, node: &Node) -> Option<EmptinessFn> {
        let is_empty = Arc::clone(self.is_empty.as_ref()?);
        let node = node.clone();
        Some(Arc::new(move |value: &Value| is_empty(&node, Some(value))))
    }

    /// The replacement value for a node in the given hide state. `None`
    /// keeps the current value, including when the capability is absent.
    pub fn apply_visibility(
        &self,
        node: &Node,
        state: HideState,
        current: Option<&Value>,
    ) -> Option<Value> {
        self.apply_visibility
            .as_ref()
            .and_then(|f| f(node, state, current))
    }

    /// Build the validator for `node`, or `None` without the capability.
    pub fn build_validator(&self, node: &Node, ctx: &FormContext) -> Option<Result<Validator>> {
        self.build_validator.as_ref().map(|f| f(node, ctx))
    }
}

/// Table from type tag to capability bundle.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    bundles: HashMap<String, CapabilityBundle>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in type registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_builtins(&mut registry);
        registry
    }

    /// Register a bundle for `tag`. Replaces and returns any previous one.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        bundle: CapabilityBundle,
    ) -> Option<CapabilityBundle> {
        self.bundles.insert(tag.into(), bundle)
    }

    pub fn lookup(&self, tag: &str) -> Option<&CapabilityBundle> {
        self.bundles.get(tag)
    }

    pub fn kind_of(&self, tag: &str) -> Option<NodeKind> {
        self.lookup(tag).map(CapabilityBundle::kind)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.bundles.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.bundles.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}
