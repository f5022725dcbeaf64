//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Plan file not found
    #[error("Plan file not found: {path}")]
    PlanNotFound { path: String },

    /// Plan references features the registry cannot build
    #[error("Failed to resolve plan: {message}")]
    PlanResolve { message: String },

    /// Acquisition ended with an error
    #[error("Acquisition failed: {message}")]
    AcquisitionFailed { message: String },
}

impl CliError {
    pub fn plan_not_found(path: impl Into<String>) -> Self {
        Self::PlanNotFound { path: path.into() }
    }

    pub fn plan_resolve(message: impl Into<String>) -> Self {
        Self::PlanResolve {
            message: message.into(),
        }
    }

    pub fn acquisition_failed(message: impl Into<String>) -> Self {
        Self::AcquisitionFailed {
            message: message.into(),
        }
    }
}
