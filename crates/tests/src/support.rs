//! Recording features and random feature lists for end-to-end runs.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use acquisition::{Acquisition, AcquisitionError, AcquisitionReport, SyntheticMicroscope};
use contracts::{AcquisitionConfig, Feature, FeatureError, FrameId, NodeConfig, Value};
use feature_engine::{AcquisitionControl, FeatureDescriptor, FeatureElement, FeatureList};
use features::LoopByCount;
use rand::rngs::StdRng;
use rand::Rng;

/// `(frame_id, feature name)` as seen by one side
pub type Record = (FrameId, String);

#[derive(Debug, Default)]
struct JournalState {
    signal: Vec<Record>,
    data: Vec<Record>,
    responses: Vec<String>,
    cleanups: Vec<String>,
}

/// Shared log of every scripted callback
#[derive(Debug, Clone, Default)]
pub struct Journal {
    inner: Arc<Mutex<JournalState>>,
}

impl Journal {
    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn signal(&self) -> Vec<Record> {
        self.lock().signal.clone()
    }

    pub fn data(&self) -> Vec<Record> {
        self.lock().data.clone()
    }

    pub fn responses(&self) -> Vec<String> {
        self.lock().responses.clone()
    }

    pub fn cleanups(&self) -> Vec<String> {
        self.lock().cleanups.clone()
    }
}

/// What a scripted feature returns from `main`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptResult {
    Always,
    /// `true` on odd calls, per side
    Alternate,
}

/// Behaviour of one scripted feature
#[derive(Debug, Clone, Copy)]
pub struct ScriptSpec {
    pub config: NodeConfig,
    /// Calls per multi-step run
    pub steps: i64,
    pub result: ScriptResult,
    /// 1-based data call that fails
    pub fail_data_at: Option<u64>,
}

impl Default for ScriptSpec {
    fn default() -> Self {
        Self {
            config: NodeConfig::one_step(),
            steps: 1,
            result: ScriptResult::Always,
            fail_data_at: None,
        }
    }
}

impl ScriptSpec {
    pub fn multi_step(steps: i64) -> Self {
        Self {
            config: NodeConfig::multi_step(),
            steps,
            ..Default::default()
        }
    }

    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }
}

/// Feature that records every call into a [`Journal`]
pub struct Scripted {
    name: String,
    spec: ScriptSpec,
    control: AcquisitionControl,
    journal: Journal,
    signal_left: AtomicI64,
    data_left: AtomicI64,
    signal_calls: AtomicU64,
    data_calls: AtomicU64,
}

impl Scripted {
    fn result(&self, call: u64) -> Value {
        match self.spec.result {
            ScriptResult::Always => Value::Bool(true),
            ScriptResult::Alternate => Value::Bool(call % 2 == 1),
        }
    }

    fn countdown(&self, counter: &AtomicI64) -> bool {
        let left = counter.fetch_sub(1, Ordering::SeqCst) - 1;
        if left <= 0 {
            counter.store(self.spec.steps, Ordering::SeqCst);
            return true;
        }
        false
    }
}

impl Feature for Scripted {
    fn node_config(&self) -> NodeConfig {
        self.spec.config
    }

    fn signal_main(&self) -> Result<Value, FeatureError> {
        let call = self.signal_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal
            .lock()
            .signal
            .push((self.control.frame_id(), self.name.clone()));
        Ok(self.result(call))
    }

    fn signal_response(&self, response: Value) -> Result<Value, FeatureError> {
        self.journal.lock().responses.push(self.name.clone());
        Ok(response)
    }

    fn signal_end(&self) -> bool {
        self.countdown(&self.signal_left)
    }

    fn signal_cleanup(&self) {
        self.journal
            .lock()
            .cleanups
            .push(format!("{}.signal", self.name));
    }

    fn data_main(&self, frame_ids: &[FrameId]) -> Result<Value, FeatureError> {
        let call = self.data_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.spec.fail_data_at == Some(call) {
            return Err(FeatureError::failed(format!("{} failed on call {}", self.name, call)));
        }
        let mut journal = self.journal.lock();
        for frame_id in frame_ids {
            journal.data.push((*frame_id, self.name.clone()));
        }
        Ok(self.result(call))
    }

    fn data_end(&self) -> bool {
        self.countdown(&self.data_left)
    }

    fn data_cleanup(&self) {
        self.journal
            .lock()
            .cleanups
            .push(format!("{}.data", self.name));
    }
}

/// Descriptor building a fresh scripted feature per acquisition
pub fn scripted(name: &str, spec: ScriptSpec, journal: &Journal) -> FeatureDescriptor {
    let journal = journal.clone();
    let feature_name = name.to_string();
    FeatureDescriptor::from_fn(name, move |ctx, _| {
        Ok(Arc::new(Scripted {
            name: feature_name.clone(),
            spec,
            control: ctx.control().clone(),
            journal: journal.clone(),
            signal_left: AtomicI64::new(spec.steps),
            data_left: AtomicI64::new(spec.steps),
            signal_calls: AtomicU64::new(0),
            data_calls: AtomicU64::new(0),
        }) as Arc<dyn Feature>)
    })
}

pub fn plain(name: &str, journal: &Journal) -> FeatureElement {
    scripted(name, ScriptSpec::default(), journal).into()
}

pub fn loop_by_count(steps: i64) -> FeatureDescriptor {
    FeatureDescriptor::from_fn("LoopByCount", move |_, _| {
        Ok(Arc::new(LoopByCount::new(steps)) as Arc<dyn Feature>)
    })
}

pub fn fast_config() -> AcquisitionConfig {
    AcquisitionConfig {
        camera_wait_iterations: 100,
        frame_wait_ms: 20,
        ..Default::default()
    }
}

/// Run `list` once against a fresh synthetic microscope
pub fn acquire(list: &[FeatureElement]) -> (Result<AcquisitionReport, AcquisitionError>, Arc<SyntheticMicroscope>) {
    let microscope = Arc::new(SyntheticMicroscope::with_exposure(Duration::ZERO));
    let result = Acquisition::new(microscope.clone(), fast_config()).run(list);
    (result, microscope)
}

/// Random feature list generator
pub struct ListGenerator<'a> {
    rng: &'a mut StdRng,
    journal: Journal,
    next_id: usize,
}

impl<'a> ListGenerator<'a> {
    pub fn new(rng: &'a mut StdRng, journal: &Journal) -> Self {
        Self {
            rng,
            journal: journal.clone(),
            next_id: 0,
        }
    }

    fn name(&mut self) -> String {
        let name = format!("node{}", self.next_id);
        self.next_id += 1;
        name
    }

    pub fn list(&mut self, depth: u32) -> FeatureList {
        let len = self.rng.random_range(1..=3);
        (0..len).map(|_| self.element(depth)).collect()
    }

    fn element(&mut self, depth: u32) -> FeatureElement {
        let pick = if depth == 0 { 0 } else { self.rng.random_range(0..6) };
        match pick {
            4 => {
                let body = self.list(depth - 1);
                let steps = self.rng.random_range(1..=3);
                FeatureElement::looped(body, loop_by_count(steps))
            }
            5 => {
                let name = self.name();
                let condition = scripted(
                    &name,
                    ScriptSpec {
                        result: ScriptResult::Alternate,
                        ..Default::default()
                    },
                    &self.journal,
                );
                let on_true = self.list(depth - 1);
                let on_false = if self.rng.random_bool(0.5) {
                    self.list(depth - 1)
                } else {
                    Vec::new()
                };
                FeatureElement::branch(condition, on_true, on_false)
            }
            _ => {
                let name = self.name();
                let spec = self.script_spec();
                scripted(&name, spec, &self.journal).into()
            }
        }
    }

    fn script_spec(&mut self) -> ScriptSpec {
        let base = if self.rng.random_bool(0.25) {
            ScriptSpec::multi_step(self.rng.random_range(1..=3))
        } else {
            ScriptSpec::default()
        };
        let config = base
            .config
            .with_device_related(self.rng.random_bool(0.25))
            .with_need_response(self.rng.random_bool(0.25))
            .normalized();
        base.with_config(config)
    }
}
