//! ZStack - step the z stage through a list of planes.
//!
//! Multi-step and device-related: every plane gets its own frame. The signal
//! side moves the stage to the next plane on each entry and ends after the
//! last one; the data side counts one plane per delivered group of frames.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::{Feature, FeatureError, FrameId, Microscope, NodeConfig, StageAxis, Value};
use feature_engine::{AcquisitionControl, FeatureContext};

use crate::args::positions_arg;

pub const NAME: &str = "ZStack";

pub struct ZStack {
    microscope: Arc<dyn Microscope>,
    control: AcquisitionControl,
    planes: Vec<f64>,
    signal_plane: AtomicUsize,
    data_plane: AtomicUsize,
    frames: AtomicU64,
}

impl ZStack {
    pub fn new(microscope: Arc<dyn Microscope>, control: AcquisitionControl, planes: Vec<f64>) -> Self {
        Self {
            microscope,
            control,
            planes,
            signal_plane: AtomicUsize::new(0),
            data_plane: AtomicUsize::new(0),
            frames: AtomicU64::new(0),
        }
    }

    /// `ZStack(planes)`: list of z positions, or a parameter path to one
    pub fn from_args(ctx: &FeatureContext, args: &[Value]) -> Result<Arc<dyn Feature>, FeatureError> {
        let planes = positions_arg(ctx, NAME, args, 0)?;
        Ok(Arc::new(Self::new(
            ctx.microscope().clone(),
            ctx.control().clone(),
            planes,
        )))
    }

    pub fn planes(&self) -> &[f64] {
        &self.planes
    }

    /// Frames seen on the data side so far
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

impl Feature for ZStack {
    fn node_config(&self) -> NodeConfig {
        NodeConfig::multi_step().with_device_related(true)
    }

    fn signal_init(&self) -> Result<(), FeatureError> {
        self.signal_plane.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn signal_main(&self) -> Result<Value, FeatureError> {
        if self.control.is_stopped() {
            return Ok(Value::Bool(false));
        }
        let index = self.signal_plane.load(Ordering::SeqCst);
        let Some(&z) = self.planes.get(index) else {
            return Err(FeatureError::failed(format!("{} has no plane {}", NAME, index)));
        };
        self.microscope.move_stage(StageAxis::Z, z)?;
        tracing::debug!(plane = index, z, "z plane reached");
        Ok(Value::from(z))
    }

    fn signal_end(&self) -> bool {
        if self.control.is_stopped() {
            return true;
        }
        self.signal_plane.fetch_add(1, Ordering::SeqCst) + 1 >= self.planes.len()
    }

    fn data_init(&self) -> Result<(), FeatureError> {
        self.data_plane.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn data_main(&self, frame_ids: &[FrameId]) -> Result<Value, FeatureError> {
        let total = self.frames.fetch_add(frame_ids.len() as u64, Ordering::SeqCst) + frame_ids.len() as u64;
        tracing::trace!(plane = self.data_plane.load(Ordering::SeqCst), ?frame_ids, total, "plane frames");
        Ok(Value::Bool(true))
    }

    fn data_end(&self) -> bool {
        self.data_plane.fetch_add(1, Ordering::SeqCst) + 1 >= self.planes.len()
    }
}
