//! Construction context handed to every feature factory.

use std::sync::Arc;

use contracts::{Microscope, Value};

use crate::AcquisitionControl;

/// What a feature may hold on to: the microscope, the acquisition control
/// handle, and the experiment parameters.
#[derive(Clone)]
pub struct FeatureContext {
    microscope: Arc<dyn Microscope>,
    control: AcquisitionControl,
    experiment: Arc<Value>,
}

impl std::fmt::Debug for FeatureContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureContext")
            .field("microscope", &self.microscope.name())
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

impl FeatureContext {
    pub fn new(microscope: Arc<dyn Microscope>, control: AcquisitionControl) -> Self {
        Self {
            microscope,
            control,
            experiment: Arc::new(Value::Object(Default::default())),
        }
    }

    pub fn with_experiment(mut self, experiment: Value) -> Self {
        self.experiment = Arc::new(experiment);
        self
    }

    pub fn microscope(&self) -> &Arc<dyn Microscope> {
        &self.microscope
    }

    pub fn control(&self) -> &AcquisitionControl {
        &self.control
    }

    pub fn experiment(&self) -> &Value {
        &self.experiment
    }

    /// Look up an experiment parameter by dotted path (`"stack.z_steps"`).
    ///
    /// Numeric segments index into arrays.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.experiment.as_ref(), |value, segment| match value {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}
