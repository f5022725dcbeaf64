//! Test helpers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{ContractError, FrameId, Microscope, StageAxis, Value};
use feature_engine::{AcquisitionControl, FeatureContext};

struct IdleMicroscope;

impl Microscope for IdleMicroscope {
    fn name(&self) -> &str {
        "idle"
    }

    fn snap(&self, _frame_id: FrameId) -> Result<(), ContractError> {
        Ok(())
    }

    fn move_stage(&self, _axis: StageAxis, _position: f64) -> Result<(), ContractError> {
        Ok(())
    }

    fn get_new_frame(&self, _timeout: Duration) -> Vec<FrameId> {
        Vec::new()
    }
}

pub(crate) fn context_with(experiment: Value) -> FeatureContext {
    FeatureContext::new(Arc::new(IdleMicroscope), AcquisitionControl::new()).with_experiment(experiment)
}

/// Microscope that records stage moves
#[derive(Default)]
pub(crate) struct StageRecorder {
    moves: Mutex<Vec<(StageAxis, f64)>>,
}

impl StageRecorder {
    pub(crate) fn positions(&self) -> Vec<f64> {
        self.moves.lock().unwrap().iter().map(|(_, p)| *p).collect()
    }
}

impl Microscope for StageRecorder {
    fn name(&self) -> &str {
        "stage"
    }

    fn snap(&self, _frame_id: FrameId) -> Result<(), ContractError> {
        Ok(())
    }

    fn move_stage(&self, axis: StageAxis, position: f64) -> Result<(), ContractError> {
        self.moves.lock().unwrap().push((axis, position));
        Ok(())
    }

    fn get_new_frame(&self, _timeout: Duration) -> Vec<FrameId> {
        Vec::new()
    }
}

pub(crate) fn stage_context(experiment: Value) -> (FeatureContext, Arc<StageRecorder>) {
    let stage = Arc::new(StageRecorder::default());
    let ctx = FeatureContext::new(stage.clone(), AcquisitionControl::new()).with_experiment(experiment);
    (ctx, stage)
}
