//! Error types for schema compilation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolymorphError {
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid type registry at {type_name}: {message}")]
    InvalidRegistry { type_name: String, message: String },

    #[error("No record or enum type is reachable from the given roots")]
    EmptyGraph,

    #[error("Ancestor {ancestor} of {type_name} is missing from the schema document")]
    MissingAncestor { type_name: String, ancestor: String },

    #[error("Ancestor {ancestor} of {type_name} is not an object schema")]
    AncestorNotObject { type_name: String, ancestor: String },

    #[error("Schema version must be specified")]
    MissingVersion,
}

impl PolymorphError {
    pub(crate) fn invalid_registry(type_name: &str, message: impl Into<String>) -> Self {
        Self::InvalidRegistry {
            type_name: type_name.to_string(),
            message: message.into(),
        }
    }
}
