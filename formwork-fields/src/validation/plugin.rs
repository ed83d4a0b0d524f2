//! Asynchronous refinement steps and the plugin validation collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure of an externally delegated check.
///
/// Never surfaces as an error from validation: the validator turns it into
/// an issue on the path being validated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PluginError {
    /// The plugin could not be reached
    #[error("plugin '{plugin}' unavailable: {message}")]
    Unavailable { plugin: String, message: String },

    /// The plugin ran but failed
    #[error("plugin check failed: {0}")]
    Failed(String),
}

/// Externally supplied validation for plugin-backed fields.
///
/// Returns `Ok(Some(message))` for an invalid value, `Ok(None)` when the value
/// passes.
#[async_trait]
pub trait PluginValidator: Send + Sync {
    async fn validate(&self, plugins: &[String], value: &Value)
        -> Result<Option<String>, PluginError>;
}

/// The asynchronous second phase of a validator.
#[async_trait]
pub trait Refinement: Send + Sync {
    async fn refine(&self, value: &Value) -> Result<Option<String>, PluginError>;
}

/// Refinement delegating to a [`PluginValidator`] with a fixed plugin list.
pub struct PluginRefinement {
    plugins: Vec<String>,
    validator: Arc<dyn PluginValidator>,
}

impl PluginRefinement {
    pub fn new(plugins: Vec<String>, validator: Arc<dyn PluginValidator>) -> Self {
        Self { plugins, validator }
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }
}

#[async_trait]
impl Refinement for PluginRefinement {
    async fn refine(&self, value: &Value) -> Result<Option<String>, PluginError> {
        self.validator.validate(&self.plugins, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl PluginValidator for Echo {
        async fn validate(
            &self,
            plugins: &[String],
            value: &Value,
        ) -> Result<Option<String>, PluginError> {
            Ok(Some(format!("{} rejected {value}", plugins.join(","))))
        }
    }

    #[tokio::test]
    async fn plugin_refinement_forwards_plugin_names() {
        let refinement = PluginRefinement::new(vec!["vin".into()], Arc::new(Echo));
        let message = refinement.refine(&json!("abc")).await.unwrap();
        assert_eq!(message.as_deref(), Some("vin rejected \"abc\""));
        assert_eq!(refinement.plugins(), ["vin".to_string()]);
    }
}
