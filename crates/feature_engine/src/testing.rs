//! Test doubles for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{ContractError, Feature, FeatureError, FrameId, Microscope, StageAxis, Value};
use serde_json::json;

use crate::{AcquisitionControl, FeatureContext, FeatureDescriptor};

pub(crate) struct NullMicroscope;

impl Microscope for NullMicroscope {
    fn name(&self) -> &str {
        "null"
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

pub(crate) fn context() -> FeatureContext {
    FeatureContext::new(Arc::new(NullMicroscope), AcquisitionControl::new())
}

/// Shared call log: entries look like `"A.signal_main"`
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub(crate) fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// Scripted feature that logs every callback.
///
/// * `script`: results `main` returns in order (both sides independently),
///   `true` once exhausted
/// * `steps`: multi-step length on both sides
/// * `fail`: `"signal"` or `"data"` makes that side's `main` fail
pub(crate) struct Recorder {
    name: String,
    log: CallLog,
    script: Vec<Value>,
    steps: usize,
    fail: Option<String>,
    signal_calls: AtomicUsize,
    data_calls: AtomicUsize,
    signal_steps: AtomicUsize,
    data_steps: AtomicUsize,
}

impl Recorder {
    pub(crate) fn new(name: &str, log: CallLog) -> Arc<Self> {
        Arc::new(Self::build(name, log, &[]))
    }

    pub(crate) fn with_steps(self: Arc<Self>, steps: usize) -> Arc<Self> {
        let mut recorder = Self::build(&self.name, self.log.clone(), &[]);
        recorder.steps = steps;
        Arc::new(recorder)
    }

    fn build(name: &str, log: CallLog, args: &[Value]) -> Self {
        let mut recorder = Self {
            name: name.to_string(),
            log,
            script: Vec::new(),
            steps: 1,
            fail: None,
            signal_calls: AtomicUsize::new(0),
            data_calls: AtomicUsize::new(0),
            signal_steps: AtomicUsize::new(0),
            data_steps: AtomicUsize::new(0),
        };
        match args.first() {
            Some(Value::Array(script)) => recorder.script = script.clone(),
            Some(Value::String(mode)) => {
                recorder.fail = mode.strip_prefix("fail-").map(str::to_string);
            }
            _ => {}
        }
        if let Some(steps) = args.get(1).and_then(Value::as_u64) {
            recorder.steps = steps as usize;
        }
        recorder
    }

    fn record(&self, callback: &str) {
        self.log.push(format!("{}.{}", self.name, callback));
    }

    fn scripted(&self, calls: &AtomicUsize) -> Value {
        let index = calls.fetch_add(1, Ordering::SeqCst);
        self.script.get(index).cloned().unwrap_or(Value::Bool(true))
    }
}

impl Feature for Recorder {
    fn signal_init(&self) -> Result<(), FeatureError> {
        self.record("signal_init");
        self.signal_steps.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn signal_main(&self) -> Result<Value, FeatureError> {
        self.record("signal_main");
        if self.fail.as_deref() == Some("signal") {
            return Err(FeatureError::failed("scripted signal failure"));
        }
        self.signal_steps.fetch_add(1, Ordering::SeqCst);
        Ok(self.scripted(&self.signal_calls))
    }

    fn signal_response(&self, response: Value) -> Result<Value, FeatureError> {
        self.record("signal_response");
        Ok(response)
    }

    fn signal_end(&self) -> bool {
        self.signal_steps.load(Ordering::SeqCst) >= self.steps
    }

    fn signal_cleanup(&self) {
        self.record("signal_cleanup");
    }

    fn data_init(&self) -> Result<(), FeatureError> {
        self.record("data_init");
        self.data_steps.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn data_main(&self, frame_ids: &[FrameId]) -> Result<Value, FeatureError> {
        self.record("data_main");
        if self.fail.as_deref() == Some("data") {
            return Err(FeatureError::failed("scripted data failure"));
        }
        self.data_steps.fetch_add(1, Ordering::SeqCst);
        let result = self.scripted(&self.data_calls);
        if result == Value::Bool(true) {
            return Ok(json!(frame_ids));
        }
        Ok(result)
    }

    fn data_end(&self) -> bool {
        self.data_steps.load(Ordering::SeqCst) >= self.steps
    }

    fn data_cleanup(&self) {
        self.record("data_cleanup");
    }
}

/// Descriptor building a fresh [`Recorder`] from its args; logs `"<name>.new"`
pub(crate) fn descriptor(name: &str, log: &CallLog) -> FeatureDescriptor {
    let log = log.clone();
    let feature_name = name.to_string();
    FeatureDescriptor::from_fn(name, move |_, args| {
        log.push(format!("{}.new", feature_name));
        let feature: Arc<dyn Feature> = Arc::new(Recorder::build(&feature_name, log.clone(), args));
        Ok(feature)
    })
}
