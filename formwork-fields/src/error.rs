//! Error types for the form schema and type registry

use thiserror::Error;

/// Result type for fields operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur while interpreting a form schema.
///
/// These are schema or registration bugs. Validation failures are not errors;
/// they are reported as [`crate::validation::Issue`] values.
#[derive(Debug, Error)]
pub enum FieldsError {
    /// A node type is used where it needs a capability its bundle does not provide
    #[error("type '{type_}' at '{path}' does not provide the {capability} capability")]
    MissingCapability {
        type_: String,
        path: String,
        capability: &'static str,
    },

    /// The schema document could not be interpreted
    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    /// A value could not be written at a path because an ancestor is not a container
    #[error("cannot address '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FieldsError {
    /// Create a missing capability error
    pub fn missing_capability(
        type_: impl Into<String>,
        path: impl Into<String>,
        capability: &'static str,
    ) -> Self {
        Self::MissingCapability {
            type_: type_.into(),
            path: path.into(),
            capability,
        }
    }

    /// Create an invalid schema error
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
