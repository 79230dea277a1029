//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set (or was blank).
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },

    /// A variable was set to a value that could not be interpreted.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Tag JSON could not be decoded.
    #[error("failed to parse tags from {name}: {source}")]
    InvalidTags {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Repository was not in `owner/repo` form.
    #[error("invalid repository '{value}': expected owner/repo")]
    InvalidRepository { value: String },

    /// The `start` and `stop` modes need different settings.
    #[error("{name} is required in {mode} mode")]
    MissingForMode {
        name: &'static str,
        mode: &'static str,
    },
}
