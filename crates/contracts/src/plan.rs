//! Declarative acquisition plan
//!
//! A plan names features by their registry name; the engine resolves the names
//! to factories when the acquisition starts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NodeOverrides;

/// Acquisition plan (top-level config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionPlan {
    /// Config version
    #[serde(default = "default_version")]
    pub version: String,

    /// Runner settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Free-form experiment parameters, addressable by dotted path
    #[serde(default = "empty_table")]
    pub experiment: Value,

    /// Feature list
    pub features: Vec<PlanElement>,
}

fn default_version() -> String {
    "1".to_string()
}

fn empty_table() -> Value {
    Value::Object(Default::default())
}

/// One element of a feature list
///
/// Variant order matters for untagged matching: the structural forms carry
/// distinctive keys (`loop`, `branch`), a plain feature carries `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanElement {
    /// `{ loop = [...], control = { name = ... } }`
    Loop(LoopSpec),
    /// `{ branch = { name = ... }, on_true = [...], on_false = [...] }`
    Branch(BranchSpec),
    /// `{ name = ..., args = [...], node = {...} }`
    Feature(FeatureSpec),
    /// Nested list, spliced into the enclosing sequence
    Sequence(Vec<PlanElement>),
}

/// A single feature reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSpec {
    /// Registry name
    pub name: String,

    /// Positional constructor arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,

    /// Node config overrides
    #[serde(default, skip_serializing_if = "NodeOverrides::is_empty")]
    pub node: NodeOverrides,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            node: NodeOverrides::default(),
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// Loop group: body repeats while the control node returns a truthy value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopSpec {
    #[serde(rename = "loop")]
    pub body: Vec<PlanElement>,
    pub control: FeatureSpec,
}

/// Conditional branch on the condition node's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchSpec {
    #[serde(rename = "branch")]
    pub condition: FeatureSpec,
    #[serde(default)]
    pub on_true: Vec<PlanElement>,
    #[serde(default)]
    pub on_false: Vec<PlanElement>,
}

/// Acquisition mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionMode {
    /// Run the feature list once
    #[default]
    Single,
    /// Reset and rerun the feature list until stopped (or `live_cycles` reached)
    Live,
}

/// Runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Empty frame polls tolerated before a camera timeout
    pub camera_wait_iterations: u32,
    /// Upper bound of a single frame poll (ms)
    pub frame_wait_ms: u64,
    /// Park the data thread while device-related signal steps run
    pub pause_data_on_device_nodes: bool,
    /// How long a pause request waits for the data thread to park (ms)
    pub pause_ack_timeout_ms: u64,
    /// Single or live acquisition
    pub mode: AcquisitionMode,
    /// Number of passes in live mode (unbounded when unset)
    pub live_cycles: Option<u32>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            camera_wait_iterations: 20,
            frame_wait_ms: 500,
            pause_data_on_device_nodes: false,
            pause_ack_timeout_ms: 1000,
            mode: AcquisitionMode::Single,
            live_cycles: None,
        }
    }
}

impl AcquisitionConfig {
    /// Number of passes over the feature list, `None` = until stopped
    pub fn max_cycles(&self) -> Option<u32> {
        match self.mode {
            AcquisitionMode::Single => Some(1),
            AcquisitionMode::Live => self.live_cycles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeType;
    use serde_json::json;

    const PLAN: &str = r#"
version = "1"

[acquisition]
camera_wait_iterations = 5
mode = "live"
live_cycles = 2

[experiment.channels]
selected = 3

[[features]]
name = "Snap"

[[features]]
loop = [{ name = "Move", node = { node_type = "multi-step" } }, [{ name = "Save" }]]
control = { name = "LoopByCount", args = [3] }

[[features]]
branch = { name = "IsReady" }
on_true = [{ name = "Snap" }]
"#;

    #[test]
    fn test_parse_plan_from_toml() {
        let plan: AcquisitionPlan = toml::from_str(PLAN).unwrap();
        assert_eq!(plan.acquisition.camera_wait_iterations, 5);
        assert_eq!(plan.acquisition.frame_wait_ms, 500);
        assert_eq!(plan.acquisition.max_cycles(), Some(2));
        assert_eq!(plan.experiment["channels"]["selected"], json!(3));
        assert_eq!(plan.features.len(), 3);

        assert!(matches!(&plan.features[0], PlanElement::Feature(f) if f.name == "Snap"));

        let PlanElement::Loop(group) = &plan.features[1] else {
            panic!("expected loop group");
        };
        assert_eq!(group.control.args, vec![json!(3)]);
        assert_eq!(group.body.len(), 2);
        let PlanElement::Feature(first) = &group.body[0] else {
            panic!("expected feature");
        };
        assert_eq!(first.node.node_type, Some(NodeType::MultiStep));
        assert!(matches!(&group.body[1], PlanElement::Sequence(items) if items.len() == 1));

        let PlanElement::Branch(branch) = &plan.features[2] else {
            panic!("expected branch");
        };
        assert_eq!(branch.condition.name, "IsReady");
        assert!(branch.on_false.is_empty());
    }

    #[test]
    fn test_plan_json_round_trip_keeps_structure() {
        let plan: AcquisitionPlan = toml::from_str(PLAN).unwrap();
        let json = serde_json::to_string(&plan).unwrap();
        let parsed: AcquisitionPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.features, plan.features);
    }

    #[test]
    fn test_unknown_feature_key_rejected() {
        let result: Result<PlanElement, _> =
            serde_json::from_value(json!({"name": "A", "steps": 3}));
        assert!(result.is_err());
    }

    #[test]
    fn test_single_mode_runs_once() {
        assert_eq!(AcquisitionConfig::default().max_cycles(), Some(1));
    }
}
