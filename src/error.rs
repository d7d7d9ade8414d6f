use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum GrantError {
    /// A statement without actions or resources, or with a malformed action.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// The resource does not have the capability the grant targets enabled.
    #[error("missing capability: {0}")]
    MissingCapability(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The build has already run its resolution phase.
    #[error("build already resolved: {0}")]
    Sealed(String),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for GrantError {
    fn from(err: serde_json::Error) -> Self {
        GrantError::Serialization(err.to_string())
    }
}
