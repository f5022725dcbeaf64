//! Microscope trait - the hardware collaborator owned by the acquisition runner.

use std::time::Duration;

use crate::{ContractError, FrameId};

/// Stage axis addressed by [`Microscope::move_stage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageAxis {
    X,
    Y,
    Z,
    Theta,
    /// Detection focus
    Focus,
}

impl std::fmt::Display for StageAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageAxis::X => "x",
            StageAxis::Y => "y",
            StageAxis::Z => "z",
            StageAxis::Theta => "theta",
            StageAxis::Focus => "f",
        };
        f.write_str(name)
    }
}

/// Hardware abstraction the acquisition threads drive.
///
/// The signal thread calls [`Microscope::snap`] once per logical step; the data
/// thread polls [`Microscope::get_new_frame`] with a bounded wait.
pub trait Microscope: Send + Sync {
    /// Human readable name, used in logs
    fn name(&self) -> &str;

    /// Prepares devices before the first step
    fn prepare(&self) -> Result<(), ContractError> {
        Ok(())
    }

    /// Triggers one camera exposure for `frame_id`
    fn snap(&self, frame_id: FrameId) -> Result<(), ContractError>;

    /// Moves one stage axis to an absolute position and waits until it settles
    fn move_stage(&self, axis: StageAxis, position: f64) -> Result<(), ContractError>;

    /// Returns frames delivered since the last call, waiting at most `timeout`
    ///
    /// An empty result means nothing arrived in time.
    fn get_new_frame(&self, timeout: Duration) -> Vec<FrameId>;

    /// Stops devices after the acquisition (success or failure)
    fn end_acquisition(&self) -> Result<(), ContractError> {
        Ok(())
    }
}
