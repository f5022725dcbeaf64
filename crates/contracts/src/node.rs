//! Node configuration contracts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Camera frame identifier, monotonically increasing per acquisition
pub type FrameId = u64;

/// How many logical steps a node occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// Completes in a single execution
    #[default]
    OneStep,
    /// Runs until its `end` callback returns true
    MultiStep,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::OneStep => write!(f, "one-step"),
            NodeType::MultiStep => write!(f, "multi-step"),
        }
    }
}

/// Per-feature node configuration, shared by its signal and data nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Step shape of the node
    pub node_type: NodeType,
    /// Node touches hardware: it starts a new logical step
    pub device_related: bool,
    /// Signal node waits for the data node's result before completing
    pub need_response: bool,
}

impl NodeConfig {
    /// Single-step node without hardware interaction
    pub fn one_step() -> Self {
        Self::default()
    }

    /// Multi-step node (always device-related)
    pub fn multi_step() -> Self {
        Self {
            node_type: NodeType::MultiStep,
            device_related: true,
            need_response: false,
        }
    }

    pub fn with_device_related(mut self, device_related: bool) -> Self {
        self.device_related = device_related;
        self
    }

    pub fn with_need_response(mut self, need_response: bool) -> Self {
        self.need_response = need_response;
        self
    }

    /// Multi-step nodes span several frames, so they always open a new step.
    pub fn normalized(mut self) -> Self {
        if self.node_type == NodeType::MultiStep {
            self.device_related = true;
        }
        self
    }

    pub fn is_multi_step(&self) -> bool {
        self.node_type == NodeType::MultiStep
    }
}

/// Descriptor-level overrides; set fields win over the feature's own config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_related: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub need_response: Option<bool>,
}

impl NodeOverrides {
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none() && self.device_related.is_none() && self.need_response.is_none()
    }

    /// Merge onto a base config and normalize the result
    pub fn apply(&self, base: NodeConfig) -> NodeConfig {
        NodeConfig {
            node_type: self.node_type.unwrap_or(base.node_type),
            device_related: self.device_related.unwrap_or(base.device_related),
            need_response: self.need_response.unwrap_or(base.need_response),
        }
        .normalized()
    }
}

/// Truthiness of a callback result.
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
