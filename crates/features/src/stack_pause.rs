//! StackPause - timed pause between stacks.
//!
//! Signal-only and device-related. For the first `pause_num - 1` entries it
//! parks the data thread, sleeps `pause_ms`, and resumes the data thread; the
//! final entry passes straight through. A stop request cuts the sleep short.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{Feature, FeatureError, NodeConfig, Value};
use feature_engine::{AcquisitionControl, FeatureContext};

use crate::args::{count_arg, millis_arg};

pub const NAME: &str = "StackPause";

const PAUSE_ACK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct StackPause {
    control: AcquisitionControl,
    remaining: AtomicI64,
    pause: Duration,
}

impl StackPause {
    pub fn new(control: AcquisitionControl, pause_num: i64, pause: Duration) -> Self {
        Self {
            control,
            remaining: AtomicI64::new(pause_num),
            pause,
        }
    }

    /// `StackPause(pause_num, pause_ms)`: literals or parameter paths
    pub fn from_args(ctx: &FeatureContext, args: &[Value]) -> Result<Arc<dyn Feature>, FeatureError> {
        let pause_num = count_arg(ctx, NAME, args, 0, 1)?.value;
        let pause_ms = millis_arg(ctx, NAME, args, 1)?;
        Ok(Arc::new(Self::new(
            ctx.control().clone(),
            pause_num,
            Duration::from_millis(pause_ms),
        )))
    }
}

impl Feature for StackPause {
    fn node_config(&self) -> NodeConfig {
        NodeConfig::one_step().with_device_related(true)
    }

    fn signal_main(&self) -> Result<Value, FeatureError> {
        let remaining = self.remaining.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining <= 0 || self.pause.is_zero() {
            return Ok(Value::Bool(false));
        }

        tracing::info!(pause_ms = self.pause.as_millis() as u64, remaining, "pausing between stacks");
        self.control.pause_data_thread(PAUSE_ACK_TIMEOUT);
        let completed = self.control.stop_signal().sleep(self.pause);
        self.control.resume_data_thread();

        if !completed {
            tracing::debug!("stack pause interrupted by stop");
        }
        Ok(Value::Bool(completed))
    }
}
