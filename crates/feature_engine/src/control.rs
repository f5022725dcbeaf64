//! Shared acquisition control: stop, frame counter, frame floor and the
//! data-thread pause gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use contracts::FrameId;

use crate::StopSignal;

const GATE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct GateState {
    requested: bool,
    parked: bool,
    closed: bool,
}

/// Pause gate the data thread passes through before every frame poll
#[derive(Debug, Default)]
pub struct DataThreadGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl DataThreadGate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the data thread to park; waits up to `timeout` for it to do so.
    ///
    /// Returns `true` once the data thread is parked.
    pub fn pause(&self, timeout: Duration, stop: &StopSignal) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.requested = true;
        self.changed.notify_all();

        while !state.parked && !state.closed && !stop.is_stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now).min(GATE_POLL);
            state = self
                .changed
                .wait_timeout(state, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        if !state.parked {
            // nobody will resume an unacknowledged pause
            state.requested = false;
            self.changed.notify_all();
        }
        state.parked
    }

    /// Let a parked data thread continue
    pub fn resume(&self) {
        let mut state = self.lock();
        state.requested = false;
        self.changed.notify_all();
    }

    /// Called by the data thread; parks while a pause is requested
    pub fn checkpoint(&self, stop: &StopSignal) {
        let mut state = self.lock();
        if !state.requested {
            return;
        }
        state.parked = true;
        self.changed.notify_all();
        tracing::debug!("data thread parked");

        while state.requested && !state.closed && !stop.is_stopped() {
            state = self
                .changed
                .wait_timeout(state, GATE_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        state.parked = false;
        self.changed.notify_all();
        tracing::debug!("data thread resumed");
    }

    /// Data thread exited; pause requests return immediately from now on
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.parked = false;
        self.changed.notify_all();
    }

    pub fn is_parked(&self) -> bool {
        self.lock().parked
    }
}

/// Handle shared by the runner threads and every feature of one acquisition
#[derive(Debug, Clone, Default)]
pub struct AcquisitionControl {
    stop: StopSignal,
    frame_id: Arc<AtomicU64>,
    frame_floor: Arc<AtomicU64>,
    gate: Arc<DataThreadGate>,
}

impl AcquisitionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Id of the frame the current signal tick will snap
    pub fn frame_id(&self) -> FrameId {
        self.frame_id.load(Ordering::SeqCst)
    }

    /// Move to the next frame, returning the new id
    pub fn advance_frame(&self) -> FrameId {
        self.frame_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Frames with a lower id no longer belong to any pending data step
    pub fn skip_frames_before(&self, frame_id: FrameId) {
        self.frame_floor.fetch_max(frame_id, Ordering::SeqCst);
    }

    pub fn frame_floor(&self) -> FrameId {
        self.frame_floor.load(Ordering::SeqCst)
    }

    pub fn data_gate(&self) -> &DataThreadGate {
        &self.gate
    }

    /// Park the data thread (bounded wait for acknowledgement)
    pub fn pause_data_thread(&self, timeout: Duration) -> bool {
        let parked = self.gate.pause(timeout, &self.stop);
        if !parked && !self.stop.is_stopped() {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "data thread did not park in time"
            );
        }
        parked
    }

    pub fn resume_data_thread(&self) {
        self.gate.resume();
    }
}
