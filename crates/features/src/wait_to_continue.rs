//! WaitToContinue - two-party gate between the signal and data threads.
//!
//! Whichever side reaches the gate first decides who waits:
//!
//! - Signal first (the usual case: a fast signal side ahead of slow frame
//!   processing): the signal node registers its arrival, the tick's frame is
//!   snapped, and the response wait holds the signal thread until the data
//!   side has consumed that frame and passed the gate.
//! - Data first (the data half of a preceding feature finished early): the
//!   data thread parks until the signal side arrives, then skips every frame
//!   the signal side produced in the meantime.
//!
//! Cleanup and stop release a parked data thread.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{Feature, FeatureError, FrameId, NodeConfig, Value};
use feature_engine::{AcquisitionControl, FeatureContext};

pub const NAME: &str = "WaitToContinue";

const PARK_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct GateState {
    /// Signal arrivals not yet matched by the data side
    signal_ahead: u64,
    data_waiting: bool,
    /// Tick in which the signal side last arrived
    signal_tick: FrameId,
    released: bool,
}

#[derive(Debug)]
pub struct WaitToContinue {
    control: AcquisitionControl,
    state: Mutex<GateState>,
    changed: Condvar,
}

impl WaitToContinue {
    pub fn new(control: AcquisitionControl) -> Self {
        Self {
            control,
            state: Mutex::new(GateState::default()),
            changed: Condvar::new(),
        }
    }

    pub fn from_args(ctx: &FeatureContext, _args: &[Value]) -> Result<Arc<dyn Feature>, FeatureError> {
        Ok(Arc::new(Self::new(ctx.control().clone())))
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let mut state = self.lock();
        state.released = true;
        state.data_waiting = false;
        self.changed.notify_all();
    }
}

impl Feature for WaitToContinue {
    fn node_config(&self) -> NodeConfig {
        NodeConfig::one_step().with_need_response(true)
    }

    fn signal_main(&self) -> Result<Value, FeatureError> {
        let tick = self.control.frame_id();
        let mut state = self.lock();
        state.signal_tick = tick;
        if state.data_waiting {
            state.data_waiting = false;
            self.changed.notify_all();
            tracing::debug!(tick, "signal side released waiting data side");
        } else {
            state.signal_ahead += 1;
            tracing::trace!(tick, "signal side reached gate first");
        }
        Ok(Value::Bool(true))
    }

    fn data_main(&self, frame_ids: &[FrameId]) -> Result<Value, FeatureError> {
        let mut state = self.lock();
        if state.signal_ahead > 0 {
            state.signal_ahead -= 1;
            return Ok(Value::Bool(true));
        }
        if state.released {
            return Ok(Value::Bool(true));
        }

        tracing::debug!(?frame_ids, "data side waiting for signal side");
        state.data_waiting = true;
        while state.data_waiting && !state.released {
            if self.control.is_stopped() {
                state.data_waiting = false;
                return Err(FeatureError::Interrupted);
            }
            state = self
                .changed
                .wait_timeout(state, PARK_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        if !state.released {
            let resume_at = state.signal_tick + 1;
            drop(state);
            self.control.skip_frames_before(resume_at);
            tracing::debug!(resume_at, "data side resynchronized");
        }
        Ok(Value::Bool(true))
    }

    fn signal_cleanup(&self) {
        self.release();
    }

    fn data_cleanup(&self) {
        self.release();
    }
}
