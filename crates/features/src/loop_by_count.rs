//! LoopByCount - fixed-count loop control.
//!
//! Sits at the end of a loop group. Each side keeps its own counter; `main`
//! returns `true` (repeat the body) until the counter runs out, then resets
//! and returns `false` (leave the loop).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use contracts::{Feature, FeatureError, FrameId, Value};
use feature_engine::FeatureContext;

use crate::args::count_arg;

pub const NAME: &str = "LoopByCount";

#[derive(Debug)]
pub struct LoopByCount {
    steps: i64,
    /// Literal counts advance by frames on the data side, parameter counts by calls
    step_by_frame: bool,
    signals: AtomicI64,
    frames: AtomicI64,
}

impl LoopByCount {
    pub fn new(steps: i64) -> Self {
        Self::with_mode(steps, true)
    }

    fn with_mode(steps: i64, step_by_frame: bool) -> Self {
        Self {
            steps,
            step_by_frame,
            signals: AtomicI64::new(steps),
            frames: AtomicI64::new(steps),
        }
    }

    /// `LoopByCount(steps)`: integer, or dotted parameter path
    pub fn from_args(ctx: &FeatureContext, args: &[Value]) -> Result<Arc<dyn Feature>, FeatureError> {
        let count = count_arg(ctx, NAME, args, 0, 1)?;
        Ok(Arc::new(Self::with_mode(count.value, count.literal)))
    }

    pub fn steps(&self) -> i64 {
        self.steps
    }

    fn countdown(&self, counter: &AtomicI64, by: i64) -> bool {
        let remaining = counter.fetch_sub(by, Ordering::SeqCst) - by;
        if remaining <= 0 {
            counter.store(self.steps, Ordering::SeqCst);
            return false;
        }
        true
    }
}

impl Feature for LoopByCount {
    fn signal_main(&self) -> Result<Value, FeatureError> {
        Ok(Value::Bool(self.countdown(&self.signals, 1)))
    }

    fn data_main(&self, frame_ids: &[FrameId]) -> Result<Value, FeatureError> {
        let by = if self.step_by_frame {
            frame_ids.len().max(1) as i64
        } else {
            1
        };
        Ok(Value::Bool(self.countdown(&self.frames, by)))
    }
}
