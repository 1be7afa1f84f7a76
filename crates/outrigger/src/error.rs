//! Error types for the outrigger adapter core.

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Main error type for the adapter core
#[derive(Error, Debug)]
pub enum AdapterError {
    /// An update tried to rebind a mapping document to a different adapter
    /// instance. Ownership is the mechanism associating a document with an
    /// instance and may not be retargeted after the fact.
    #[error("mapping document '{document}' may not change its outer adapter key")]
    OwnershipViolation { document: String },

    /// No mapping document was addressed to this instance at startup.
    #[error("no mapping document accepted for adapter instance key '{instance_key}'")]
    NoAcceptedConfigs { instance_key: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// YAML error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an ownership-violation error
    pub fn ownership(document: impl Into<String>) -> Self {
        Self::OwnershipViolation {
            document: document.into(),
        }
    }

    /// Check if this error is fatal to the whole adapter (as opposed to a
    /// single rejected operation)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NoAcceptedConfigs { .. })
    }
}
