//! Acquisition report

use std::time::Duration;

use observability::AcquisitionMetricsAggregator;

/// Outcome counters of one acquisition
#[derive(Debug, Clone, Default)]
pub struct AcquisitionReport {
    /// Frames the signal thread snapped
    pub frames_triggered: u64,

    /// Frames the data thread received from the camera
    pub frames_received: u64,

    /// Frames fed through the data tree
    pub frames_processed: u64,

    /// Frames dropped after a resynchronization
    pub frames_skipped: u64,

    /// Completed passes over the signal tree
    pub signal_cycles: u32,

    /// Completed passes over the data tree
    pub data_cycles: u32,

    /// Ended by a stop request rather than by exhausting the trees
    pub stopped: bool,

    /// Wall-clock duration
    pub duration: Duration,

    /// Per-thread step statistics, merged
    pub metrics: AcquisitionMetricsAggregator,
}

impl AcquisitionReport {
    /// Processed frames per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn outcome(&self) -> &'static str {
        if self.stopped {
            "stopped"
        } else {
            "completed"
        }
    }
}
