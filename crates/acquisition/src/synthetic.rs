//! Synthetic microscope - in-memory camera for dry runs and tests.
//!
//! `snap` delivers the frame id into a queue after the exposure time;
//! `get_new_frame` drains the queue, waiting on a condvar up to the timeout.
//! Stage moves settle instantly and are only recorded.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{ContractError, FrameId, Microscope, StageAxis};

/// Synthetic microscope behaviour
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Device name in logs
    pub name: String,
    /// Simulated exposure per snap
    pub exposure: Duration,
    /// Frames with this id or higher are never delivered
    pub drop_frames_from: Option<FrameId>,
    /// Snapping this frame id fails
    pub fail_snap_at: Option<FrameId>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            exposure: Duration::ZERO,
            drop_frames_from: None,
            fail_snap_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct CameraState {
    queue: VecDeque<FrameId>,
    snapped: Vec<FrameId>,
    /// Absolute moves in the order they were issued
    moves: Vec<(StageAxis, f64)>,
}

/// In-memory microscope
#[derive(Debug)]
pub struct SyntheticMicroscope {
    config: SyntheticConfig,
    state: Mutex<CameraState>,
    frame_ready: Condvar,
    prepared: AtomicBool,
    ended: AtomicBool,
}

impl Default for SyntheticMicroscope {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

impl SyntheticMicroscope {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CameraState::default()),
            frame_ready: Condvar::new(),
            prepared: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        }
    }

    pub fn with_exposure(exposure: Duration) -> Self {
        Self::new(SyntheticConfig {
            exposure,
            ..Default::default()
        })
    }

    fn lock(&self) -> MutexGuard<'_, CameraState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every frame id snapped so far, in order
    pub fn snapped_frames(&self) -> Vec<FrameId> {
        self.lock().snapped.clone()
    }

    /// Every stage move so far, in order
    pub fn stage_moves(&self) -> Vec<(StageAxis, f64)> {
        self.lock().moves.clone()
    }

    /// Positions visited on one axis
    pub fn stage_positions(&self, axis: StageAxis) -> Vec<f64> {
        self.lock()
            .moves
            .iter()
            .filter(|(moved, _)| *moved == axis)
            .map(|(_, position)| *position)
            .collect()
    }

    pub fn was_prepared(&self) -> bool {
        self.prepared.load(Ordering::SeqCst)
    }

    pub fn was_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

impl Microscope for SyntheticMicroscope {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn prepare(&self) -> Result<(), ContractError> {
        self.prepared.store(true, Ordering::SeqCst);
        self.ended.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn snap(&self, frame_id: FrameId) -> Result<(), ContractError> {
        if self.config.fail_snap_at == Some(frame_id) {
            return Err(ContractError::hardware(
                &self.config.name,
                format!("camera failed to expose frame {}", frame_id),
            ));
        }
        if !self.config.exposure.is_zero() {
            std::thread::sleep(self.config.exposure);
        }

        let mut state = self.lock();
        state.snapped.push(frame_id);
        if self
            .config
            .drop_frames_from
            .is_some_and(|first_dropped| frame_id >= first_dropped)
        {
            tracing::trace!(frame_id, "frame dropped");
            return Ok(());
        }
        state.queue.push_back(frame_id);
        self.frame_ready.notify_all();
        Ok(())
    }

    fn move_stage(&self, axis: StageAxis, position: f64) -> Result<(), ContractError> {
        if !position.is_finite() {
            return Err(ContractError::hardware(
                &self.config.name,
                format!("cannot move {} to {}", axis, position),
            ));
        }
        tracing::debug!(%axis, position, "stage moved");
        self.lock().moves.push((axis, position));
        Ok(())
    }

    fn get_new_frame(&self, timeout: Duration) -> Vec<FrameId> {
        let state = self.lock();
        let (mut state, _) = self
            .frame_ready
            .wait_timeout_while(state, timeout, |state| state.queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        state.queue.drain(..).collect()
    }

    fn end_acquisition(&self) -> Result<(), ContractError> {
        self.ended.store(true, Ordering::SeqCst);
        Ok(())
    }
}
