//! LogFrames - data-side frame bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{Feature, FeatureError, FrameId, Microscope, Value};
use feature_engine::FeatureContext;

pub const NAME: &str = "LogFrames";

pub struct LogFrames {
    microscope: Arc<dyn Microscope>,
    frames: AtomicU64,
}

impl LogFrames {
    pub fn new(microscope: Arc<dyn Microscope>) -> Self {
        Self {
            microscope,
            frames: AtomicU64::new(0),
        }
    }

    pub fn from_args(ctx: &FeatureContext, _args: &[Value]) -> Result<Arc<dyn Feature>, FeatureError> {
        Ok(Arc::new(Self::new(ctx.microscope().clone())))
    }

    /// Frames seen so far
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

impl Feature for LogFrames {
    fn data_main(&self, frame_ids: &[FrameId]) -> Result<Value, FeatureError> {
        let total = self.frames.fetch_add(frame_ids.len() as u64, Ordering::SeqCst) + frame_ids.len() as u64;
        tracing::info!(
            microscope = self.microscope.name(),
            ?frame_ids,
            total,
            "frames received"
        );
        Ok(Value::from(frame_ids.to_vec()))
    }
}
