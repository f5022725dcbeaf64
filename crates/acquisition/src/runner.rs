//! Acquisition runner: one signal thread, one data thread.
//!
//! The signal thread runs one tick of the signal tree per camera frame, snaps
//! the frame, then resolves any pending response. The data thread polls the
//! camera and feeds each delivered frame through the data tree. Both threads
//! share an [`AcquisitionControl`]; the first failure on either side stops the
//! other, and cleanup runs once both have joined.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{AcquisitionConfig, Microscope, Value};
use feature_engine::{
    load_features, AcquisitionControl, CleanupScope, DataContainer, FeatureContext, FeatureElement,
    SignalContainer, Tree, TreeNode,
};
use observability::{metrics, AcquisitionMetricsAggregator};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::{AcquisitionError, AcquisitionReport};

/// First failure of an acquisition; later failures are only logged
#[derive(Debug, Clone, Default)]
struct FailureSlot {
    inner: Arc<Mutex<Option<AcquisitionError>>>,
}

impl FailureSlot {
    fn lock(&self) -> MutexGuard<'_, Option<AcquisitionError>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, control: &AcquisitionControl, failure: AcquisitionError) {
        {
            let mut slot = self.lock();
            if slot.is_none() {
                error!(error = %failure, "acquisition aborted");
                *slot = Some(failure);
            } else {
                debug!(error = %failure, "secondary failure ignored");
            }
        }
        control.request_stop();
    }

    fn take(&self) -> Option<AcquisitionError> {
        self.lock().take()
    }
}

/// Requests stop if the owning thread unwinds
struct StopOnPanic<'a>(&'a AcquisitionControl);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.request_stop();
        }
    }
}

struct SignalOutcome {
    container: SignalContainer,
    frames_triggered: u64,
    cycles: u32,
    metrics: AcquisitionMetricsAggregator,
}

struct DataOutcome {
    container: DataContainer,
    frames_received: u64,
    frames_processed: u64,
    frames_skipped: u64,
    cycles: u32,
    metrics: AcquisitionMetricsAggregator,
}

/// Acquisition against one microscope
pub struct Acquisition {
    microscope: Arc<dyn Microscope>,
    config: AcquisitionConfig,
    experiment: Value,
}

impl Acquisition {
    pub fn new(microscope: Arc<dyn Microscope>, config: AcquisitionConfig) -> Self {
        Self {
            microscope,
            config,
            experiment: Value::Object(Default::default()),
        }
    }

    /// Parameters features resolve dotted-path arguments against
    pub fn with_experiment(mut self, experiment: Value) -> Self {
        self.experiment = experiment;
        self
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Build the trees, prepare the microscope and start both threads
    #[instrument(level = "debug", name = "acquisition_start", skip_all)]
    pub fn start(&self, features: &[FeatureElement]) -> Result<AcquisitionHandle, AcquisitionError> {
        let control = AcquisitionControl::new();
        let ctx = FeatureContext::new(self.microscope.clone(), control.clone())
            .with_experiment(self.experiment.clone());
        let (signal, data) = load_features(&ctx, features)?;
        self.microscope.prepare()?;

        info!(
            microscope = self.microscope.name(),
            nodes = signal.tree().len(),
            mode = ?self.config.mode,
            "acquisition starting"
        );

        let failure = FailureSlot::default();
        let started = Instant::now();

        let data_thread = {
            let microscope = self.microscope.clone();
            let control = control.clone();
            let config = self.config.clone();
            let failure = failure.clone();
            spawn("data", move || data_loop(data, microscope, control, config, failure))?
        };

        let signal_thread = {
            let microscope = self.microscope.clone();
            let control = control.clone();
            let config = self.config.clone();
            let failure = failure.clone();
            spawn("signal", move || signal_loop(signal, microscope, control, config, failure))
        };
        let signal_thread = match signal_thread {
            Ok(handle) => handle,
            Err(err) => {
                control.request_stop();
                if data_thread.join().is_err() {
                    warn!("data thread panicked during aborted start");
                }
                return Err(err);
            }
        };

        Ok(AcquisitionHandle {
            control,
            microscope: self.microscope.clone(),
            failure,
            started,
            signal: Some(signal_thread),
            data: Some(data_thread),
        })
    }

    /// Start and block until the acquisition finishes
    pub fn run(&self, features: &[FeatureElement]) -> Result<AcquisitionReport, AcquisitionError> {
        self.start(features)?.join()
    }
}

fn spawn<T, F>(name: &'static str, body: F) -> Result<JoinHandle<T>, AcquisitionError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(format!("acquisition-{name}"))
        .spawn(body)
        .map_err(|source| AcquisitionError::Spawn {
            thread: name,
            source,
        })
}

/// Handle to a running acquisition
pub struct AcquisitionHandle {
    control: AcquisitionControl,
    microscope: Arc<dyn Microscope>,
    failure: FailureSlot,
    started: Instant,
    signal: Option<JoinHandle<SignalOutcome>>,
    data: Option<JoinHandle<DataOutcome>>,
}

impl AcquisitionHandle {
    /// Ask both threads to stop; `join` still has to be called
    pub fn stop(&self) {
        info!("stop requested");
        self.control.request_stop();
    }

    pub fn control(&self) -> &AcquisitionControl {
        &self.control
    }

    pub fn is_finished(&self) -> bool {
        [
            self.signal.as_ref().map(JoinHandle::is_finished),
            self.data.as_ref().map(JoinHandle::is_finished),
        ]
        .into_iter()
        .all(|finished| finished.unwrap_or(true))
    }

    /// Wait for both threads, run cleanup on both trees and end the acquisition
    pub fn join(mut self) -> Result<AcquisitionReport, AcquisitionError> {
        let signal = self.signal.take().map(JoinHandle::join);
        let data = self.data.take().map(JoinHandle::join);

        let mut report = AcquisitionReport::default();
        let mut aggregator = AcquisitionMetricsAggregator::new();

        match signal {
            Some(Ok(mut outcome)) => {
                let cleaned = outcome.container.cleanup(CleanupScope::All);
                debug!(cleaned, "signal tree cleaned up");
                collect_node_runs(&mut aggregator, "signal", outcome.container.tree());
                aggregator.merge(&outcome.metrics);
                report.frames_triggered = outcome.frames_triggered;
                report.signal_cycles = outcome.cycles;
            }
            Some(Err(_)) => self
                .failure
                .record(&self.control, AcquisitionError::ThreadPanicked { thread: "signal" }),
            None => {}
        }

        match data {
            Some(Ok(mut outcome)) => {
                let cleaned = outcome.container.cleanup(CleanupScope::All);
                debug!(cleaned, "data tree cleaned up");
                collect_node_runs(&mut aggregator, "data", outcome.container.tree());
                aggregator.merge(&outcome.metrics);
                report.frames_received = outcome.frames_received;
                report.frames_processed = outcome.frames_processed;
                report.frames_skipped = outcome.frames_skipped;
                report.data_cycles = outcome.cycles;
            }
            Some(Err(_)) => self
                .failure
                .record(&self.control, AcquisitionError::ThreadPanicked { thread: "data" }),
            None => {}
        }

        if let Err(err) = self.microscope.end_acquisition() {
            self.failure.record(&self.control, err.into());
        }

        report.duration = self.started.elapsed();
        report.stopped = self.control.is_stopped();
        report.metrics = aggregator;

        if let Some(err) = self.failure.take() {
            metrics::record_acquisition_finished("failed", report.duration);
            return Err(err);
        }

        metrics::record_acquisition_finished(report.outcome(), report.duration);
        info!(
            outcome = report.outcome(),
            frames = report.frames_processed,
            skipped = report.frames_skipped,
            duration_ms = report.duration.as_millis() as u64,
            "acquisition finished"
        );
        Ok(report)
    }
}

impl Drop for AcquisitionHandle {
    fn drop(&mut self) {
        if self.signal.is_none() && self.data.is_none() {
            return;
        }
        self.control.request_stop();
        let signal = self.signal.take().map(|handle| handle.join().is_ok());
        let data = self.data.take().map(|handle| handle.join().is_ok());
        if signal == Some(false) || data == Some(false) {
            warn!("acquisition thread panicked while dropping handle");
        }
    }
}

fn collect_node_runs<N: TreeNode>(aggregator: &mut AcquisitionMetricsAggregator, side: &str, tree: &Tree<N>) {
    for (_, node) in tree.iter() {
        let runs = node.runs();
        if runs > 0 {
            aggregator.record_node(&format!("{side}/{}", node.info().name), runs);
        }
    }
}

fn signal_loop(
    mut signal: SignalContainer,
    microscope: Arc<dyn Microscope>,
    control: AcquisitionControl,
    config: AcquisitionConfig,
    failure: FailureSlot,
) -> SignalOutcome {
    let _guard = StopOnPanic(&control);
    let max_cycles = config.max_cycles();
    let pause_timeout = Duration::from_millis(config.pause_ack_timeout_ms);
    let mut aggregator = AcquisitionMetricsAggregator::new();
    let mut frames_triggered = 0;
    let mut cycles = 0;

    if signal.tree().is_empty() {
        warn!("empty feature list, signal thread idle");
    }

    while !control.is_stopped() && !signal.tree().is_empty() {
        if signal.is_ended() {
            if signal.is_closed() {
                break;
            }
            cycles += 1;
            if max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }
            debug!(cycle = cycles, "signal pass complete, rewinding");
            signal.reset();
            continue;
        }

        let tick_started = Instant::now();
        let paused = config.pause_data_on_device_nodes
            && signal.next_is_device_related()
            && control.pause_data_thread(pause_timeout);
        let result = signal.run();
        if paused {
            control.resume_data_thread();
        }

        let executed = match result {
            Ok(executed) => executed,
            Err(err) => {
                failure.record(&control, err.into());
                break;
            }
        };
        if executed == 0 {
            continue;
        }
        if control.is_stopped() {
            break;
        }

        let frame_id = control.frame_id();
        if let Err(err) = microscope.snap(frame_id) {
            failure.record(&control, err.into());
            break;
        }
        frames_triggered += 1;

        if let Err(err) = signal.run_response() {
            if !err.is_cancellation() {
                failure.record(&control, err.into());
            }
            break;
        }

        control.advance_frame();
        aggregator.record_tick(tick_started.elapsed());
        trace!(frame_id, executed, "signal tick complete");
    }

    debug!(frames_triggered, cycles, "signal thread exiting");
    SignalOutcome {
        container: signal,
        frames_triggered,
        cycles,
        metrics: aggregator,
    }
}

/// Rewind a finished data tree for the next pass; `false` when the data side is done
fn next_pass(
    data: &mut DataContainer,
    control: &AcquisitionControl,
    cycles: &mut u32,
    max_cycles: Option<u32>,
) -> bool {
    if control.is_stopped() {
        return false;
    }
    if !data.is_ended() {
        return true;
    }
    if data.is_closed() {
        return false;
    }
    *cycles += 1;
    if max_cycles.is_some_and(|max| *cycles >= max) {
        return false;
    }
    debug!(cycle = *cycles, "data pass complete, rewinding");
    data.reset();
    true
}

fn data_loop(
    mut data: DataContainer,
    microscope: Arc<dyn Microscope>,
    control: AcquisitionControl,
    config: AcquisitionConfig,
    failure: FailureSlot,
) -> DataOutcome {
    let _guard = StopOnPanic(&control);
    let max_cycles = config.max_cycles();
    let frame_wait = Duration::from_millis(config.frame_wait_ms);
    let mut waits_left = config.camera_wait_iterations;
    let mut aggregator = AcquisitionMetricsAggregator::new();
    let mut frames_received = 0;
    let mut frames_processed = 0;
    let mut frames_skipped = 0;
    let mut cycles = 0;

    'acquire: while !data.tree().is_empty() && next_pass(&mut data, &control, &mut cycles, max_cycles) {
        control.data_gate().checkpoint(control.stop_signal());

        let frames = microscope.get_new_frame(frame_wait);
        if frames.is_empty() {
            if control.is_stopped() {
                break;
            }
            waits_left = waits_left.saturating_sub(1);
            if waits_left == 0 {
                metrics::record_camera_timeout();
                failure.record(
                    &control,
                    AcquisitionError::CameraTimeout {
                        iterations: config.camera_wait_iterations,
                        wait_ms: config.frame_wait_ms,
                    },
                );
                break;
            }
            trace!(waits_left, "no frame yet");
            continue;
        }

        waits_left = config.camera_wait_iterations;
        metrics::record_frames_received(&frames);
        frames_received += frames.len() as u64;

        for frame_id in frames {
            if frame_id < control.frame_floor() {
                trace!(frame_id, floor = control.frame_floor(), "frame skipped");
                frames_skipped += 1;
                aggregator.record_skipped(1);
                metrics::record_frames_skipped(1);
                continue;
            }
            if !next_pass(&mut data, &control, &mut cycles, max_cycles) {
                break 'acquire;
            }

            let step_started = Instant::now();
            if let Err(err) = data.run(&[frame_id]) {
                if !err.is_cancellation() {
                    failure.record(&control, err.into());
                }
                break 'acquire;
            }
            frames_processed += 1;
            aggregator.record_step(step_started.elapsed());
        }
    }

    control.data_gate().close();
    debug!(frames_received, frames_processed, frames_skipped, cycles, "data thread exiting");
    DataOutcome {
        container: data,
        frames_received,
        frames_processed,
        frames_skipped,
        cycles,
        metrics: aggregator,
    }
}
