//! Configuration Error Types
//!
//! Errors raised while layering defaults, config files and environment
//! variables, and while validating the merged result.

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Layering or deserialization failed inside the `config` crate
    #[error("Failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// An environment override could not be parsed
    #[error("Environment override error for key {key}: {reason}")]
    EnvironmentOverrideError { key: String, reason: String },
}

impl ConfigurationError {
    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    pub fn environment_override(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvironmentOverrideError {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
