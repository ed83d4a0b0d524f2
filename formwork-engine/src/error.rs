//! Error types for the resolvers and the engine facade

use formwork_fields::FieldsError;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while resolving a form or loading engine configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A schema or registration problem surfaced by a resolver
    #[error(transparent)]
    Fields(#[from] FieldsError),

    /// Configuration sources could not be read or parsed
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration parsed but holds an unusable value
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl EngineError {
    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
