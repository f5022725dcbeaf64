//! Acquisition errors

use contracts::ContractError;
use feature_engine::EngineError;
use thiserror::Error;

/// Single failure reported for an aborted acquisition
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The data thread exhausted its frame-wait budget
    #[error("camera timeout: no frame after {iterations} polls of {wait_ms}ms")]
    CameraTimeout { iterations: u32, wait_ms: u64 },

    /// Tree construction or a feature callback failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Microscope collaborator failed
    #[error("microscope error: {0}")]
    Hardware(#[from] ContractError),

    /// An acquisition thread panicked
    #[error("{thread} thread panicked")]
    ThreadPanicked { thread: &'static str },

    /// An acquisition thread could not be started
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },
}
