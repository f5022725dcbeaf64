//! Signal and data nodes.
//!
//! A node wraps one half of a shared feature instance and carries the
//! per-acquisition lifecycle: initialized / awaiting response / visited / cleaned.

use std::sync::Arc;

use contracts::{Feature, FrameId, NodeConfig, NodeType, Value};

use crate::rendezvous::{ResponseReceiver, ResponseSender};
use crate::{EngineError, Side, StopSignal};

/// Arena index of a node; the same index addresses the twin node in the other tree
pub type NodeId = usize;

/// Structural role of a node in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Plain,
    /// Truthy result re-enters the loop body through `child`
    LoopControl,
    /// Truthy result takes `child`, falsy takes `alt`
    Branch,
}

/// Arena links
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Links {
    pub sibling: Option<NodeId>,
    pub child: Option<NodeId>,
    pub alt: Option<NodeId>,
}

/// Static node description
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: String,
    pub config: NodeConfig,
    pub role: NodeRole,
    pub links: Links,
}

impl NodeInfo {
    pub fn is_device_related(&self) -> bool {
        self.config.device_related
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Lifecycle {
    initialized: bool,
    visited: bool,
    cleaned: bool,
    runs: u64,
}

/// Behaviour shared by signal and data nodes
pub trait TreeNode {
    fn info(&self) -> &NodeInfo;

    fn info_mut(&mut self) -> &mut NodeInfo;

    /// Whether the node was ever entered in this acquisition
    fn visited(&self) -> bool;

    /// Completed `main` calls so far
    fn runs(&self) -> u64;

    /// Run the side's cleanup once. Returns `true` if the callback ran.
    fn cleanup(&mut self) -> bool;

    /// Clear runtime state for a rerun of the tree
    fn reset_state(&mut self);
}

/// Signal-side node
pub struct SignalNode {
    info: NodeInfo,
    feature: Arc<dyn Feature>,
    life: Lifecycle,
    wait_response: bool,
    pending_end: bool,
    response: Option<ResponseReceiver>,
}

impl std::fmt::Debug for SignalNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalNode")
            .field("info", &self.info)
            .field("life", &self.life)
            .field("wait_response", &self.wait_response)
            .finish_non_exhaustive()
    }
}

impl SignalNode {
    pub(crate) fn new(
        info: NodeInfo,
        feature: Arc<dyn Feature>,
        response: Option<ResponseReceiver>,
    ) -> Self {
        Self {
            info,
            feature,
            life: Lifecycle::default(),
            wait_response: false,
            pending_end: false,
            response,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn is_initialized(&self) -> bool {
        self.life.initialized
    }

    /// Node ran `main` and is waiting for its data twin's result
    pub fn is_awaiting_response(&self) -> bool {
        self.wait_response
    }

    fn failed(&self, source: contracts::FeatureError) -> EngineError {
        EngineError::node_failed(Side::Signal, self.info.name.clone(), source)
    }

    /// Execute the node.
    ///
    /// With `wait_response == false` this runs init (on first entry) and main.
    /// With `wait_response == true` it only resolves a pending response; on a
    /// node that is not awaiting it is a no-op returning `(null, false)`.
    pub fn run(&mut self, wait_response: bool, stop: &StopSignal) -> Result<(Value, bool), EngineError> {
        if wait_response {
            return self.resolve_response(stop);
        }

        if !self.life.initialized {
            self.life.visited = true;
            self.feature.signal_init().map_err(|e| self.failed(e))?;
            self.life.initialized = true;
        }

        let result = self.feature.signal_main().map_err(|e| self.failed(e))?;
        self.life.runs += 1;
        let is_end = match self.info.config.node_type {
            NodeType::OneStep => true,
            NodeType::MultiStep => self.feature.signal_end(),
        };

        if self.info.config.need_response {
            self.wait_response = true;
            self.pending_end = is_end;
            return Ok((result, false));
        }

        if is_end {
            self.life.initialized = false;
        }
        Ok((result, is_end))
    }

    fn resolve_response(&mut self, stop: &StopSignal) -> Result<(Value, bool), EngineError> {
        if !self.wait_response {
            return Ok((Value::Null, false));
        }

        let response = match &self.response {
            Some(receiver) => receiver.wait(stop).map_err(|_| EngineError::Cancelled {
                node: self.info.name.clone(),
            })?,
            None => Value::Null,
        };
        self.wait_response = false;

        let result = self
            .feature
            .signal_response(response)
            .map_err(|e| self.failed(e))?;
        let is_end = self.pending_end;
        if is_end {
            self.life.initialized = false;
        }
        Ok((result, is_end))
    }
}

impl TreeNode for SignalNode {
    fn info(&self) -> &NodeInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut NodeInfo {
        &mut self.info
    }

    fn visited(&self) -> bool {
        self.life.visited
    }

    fn runs(&self) -> u64 {
        self.life.runs
    }

    fn cleanup(&mut self) -> bool {
        if !self.life.visited || self.life.cleaned {
            return false;
        }
        self.feature.signal_cleanup();
        self.life.cleaned = true;
        true
    }

    fn reset_state(&mut self) {
        self.life.initialized = false;
        self.wait_response = false;
        self.pending_end = false;
        if let Some(receiver) = &self.response {
            receiver.clear();
        }
    }
}

/// Data-side node
pub struct DataNode {
    info: NodeInfo,
    feature: Arc<dyn Feature>,
    life: Lifecycle,
    marked: bool,
    response: Option<ResponseSender>,
}

impl std::fmt::Debug for DataNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataNode")
            .field("info", &self.info)
            .field("life", &self.life)
            .field("marked", &self.marked)
            .finish_non_exhaustive()
    }
}

impl DataNode {
    pub(crate) fn new(
        info: NodeInfo,
        feature: Arc<dyn Feature>,
        response: Option<ResponseSender>,
    ) -> Self {
        Self {
            info,
            feature,
            life: Lifecycle::default(),
            marked: false,
            response,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn is_initialized(&self) -> bool {
        self.life.initialized
    }

    /// Marked nodes were cleaned up early and are skipped from now on
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn mark(&mut self) {
        self.marked = true;
    }

    /// Failures of plain one-step nodes without a response partner can be skipped
    pub(crate) fn is_skippable(&self) -> bool {
        self.info.role == NodeRole::Plain
            && self.info.config.node_type == NodeType::OneStep
            && !self.info.config.need_response
    }

    /// Execute the node against a frame batch
    pub fn run(&mut self, frame_ids: &[FrameId]) -> Result<(Value, bool), EngineError> {
        if self.marked {
            if self.info.config.need_response {
                if let Some(sender) = &self.response {
                    sender.send(Value::Null);
                }
            }
            return Ok((Value::Null, true));
        }

        if !self.life.initialized {
            self.life.visited = true;
            self.feature
                .data_init()
                .map_err(|e| EngineError::node_failed(Side::Data, self.info.name.clone(), e))?;
            self.life.initialized = true;
        }

        let result = self
            .feature
            .data_main(frame_ids)
            .map_err(|e| EngineError::node_failed(Side::Data, self.info.name.clone(), e))?;
        self.life.runs += 1;

        if self.info.config.need_response {
            if let Some(sender) = &self.response {
                sender.send(result.clone());
            }
        }

        let is_end = match self.info.config.node_type {
            NodeType::OneStep => true,
            NodeType::MultiStep => self.feature.data_end(),
        };
        if is_end {
            self.life.initialized = false;
        }
        Ok((result, is_end))
    }
}

impl TreeNode for DataNode {
    fn info(&self) -> &NodeInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut NodeInfo {
        &mut self.info
    }

    fn visited(&self) -> bool {
        self.life.visited
    }

    fn runs(&self) -> u64 {
        self.life.runs
    }

    fn cleanup(&mut self) -> bool {
        if !self.life.visited || self.life.cleaned {
            return false;
        }
        self.feature.data_cleanup();
        self.life.cleaned = true;
        true
    }

    fn reset_state(&mut self) {
        self.life.initialized = false;
    }
}
