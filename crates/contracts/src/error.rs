//! Layered error definitions
//!
//! Categorized by source: config / hardware / feature

use thiserror::Error;

/// Unified error type for configuration and hardware collaborators
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Hardware Errors =====
    /// Device (camera, stage, DAQ) reported a failure
    #[error("device '{device}' error: {message}")]
    Hardware { device: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create hardware error
    pub fn hardware(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hardware {
            device: device.into(),
            message: message.into(),
        }
    }
}

/// Error returned by feature callbacks
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Constructor arguments could not be interpreted
    #[error("invalid argument for '{feature}': {message}")]
    InvalidArgument { feature: String, message: String },

    /// The callback itself failed
    #[error("{0}")]
    Failed(String),

    /// A collaborator failed underneath the callback
    #[error(transparent)]
    Hardware(#[from] ContractError),

    /// The callback gave up because the acquisition is stopping
    #[error("interrupted by stop request")]
    Interrupted,
}

impl FeatureError {
    /// Create invalid argument error
    pub fn invalid_argument(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// Create generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
