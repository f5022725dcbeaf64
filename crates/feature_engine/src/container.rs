//! Signal and data containers: cursor-driven traversal of a feature tree.
//!
//! One call to [`SignalContainer::run`] (a *tick*) and one call to
//! [`DataContainer::run`] (a *frame*) execute the same group of nodes. A group
//! ends before a device-related node, after a node that has not finished,
//! after re-entering a loop body, and (data side) after a `need_response` node.

use contracts::{is_truthy, FrameId, Value};
use observability::metrics;
use tracing::instrument;

use crate::node::{DataNode, NodeId, NodeInfo, NodeRole, SignalNode, TreeNode};
use crate::tree::Tree;
use crate::{EngineError, Side, StopSignal};

/// Which nodes a cleanup pass covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupScope {
    /// Only the node under the cursor
    Current,
    /// Every node ever reached
    All,
}

/// Where the cursor went after a finished node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Moved(NodeId),
    /// Back-edge into a loop body
    Repeated(NodeId),
    Exhausted,
}

/// Cursor plus the return stack for branch arms
#[derive(Debug, Default)]
struct Cursor {
    current: Option<NodeId>,
    returns: Vec<NodeId>,
}

impl Cursor {
    fn new(root: Option<NodeId>) -> Self {
        Self {
            current: root,
            returns: Vec::new(),
        }
    }

    fn advance(&mut self, info: &NodeInfo, result: &Value) -> Step {
        let links = info.links;
        let (next, repeated) = match info.role {
            NodeRole::LoopControl if is_truthy(result) => (links.child, true),
            NodeRole::Branch => {
                if let Some(sibling) = links.sibling {
                    self.returns.push(sibling);
                }
                let arm = if is_truthy(result) { links.child } else { links.alt };
                (arm, false)
            }
            _ => (links.sibling, false),
        };

        self.current = next.or_else(|| self.returns.pop());
        match self.current {
            None => Step::Exhausted,
            Some(id) if repeated => Step::Repeated(id),
            Some(id) => Step::Moved(id),
        }
    }
}

/// Tree, cursor and flags shared by both container kinds
#[derive(Debug)]
struct Traversal<N> {
    tree: Tree<N>,
    cursor: Cursor,
    end_flag: bool,
    closed: bool,
    cleanup_list: Vec<NodeId>,
    stop: StopSignal,
}

impl<N: TreeNode> Traversal<N> {
    fn new(tree: Tree<N>, stop: StopSignal) -> Self {
        let cursor = Cursor::new(tree.root());
        let cleanup_list = tree.ids();
        Self {
            tree,
            cursor,
            end_flag: false,
            closed: false,
            cleanup_list,
            stop,
        }
    }

    /// Whether a driver call should return without executing anything
    fn halted(&mut self) -> bool {
        if self.stop.is_stopped() {
            self.end_flag = true;
        }
        self.end_flag || self.closed
    }

    fn current_info(&self) -> Option<&NodeInfo> {
        self.cursor
            .current
            .and_then(|id| self.tree.get(id))
            .map(|node| node.info())
    }

    fn is_device_related(&self, id: NodeId) -> bool {
        self.tree
            .get(id)
            .is_some_and(|node| node.info().is_device_related())
    }

    fn fail(&mut self) {
        self.closed = true;
        self.end_flag = true;
    }

    fn reset(&mut self) {
        self.cursor = Cursor::new(self.tree.root());
        self.end_flag = false;
        for (_, node) in self.tree.iter_mut() {
            node.reset_state();
        }
    }

    fn cleanup(&mut self, scope: CleanupScope, side: Side) -> usize {
        let ids = match scope {
            CleanupScope::Current => self.cursor.current.into_iter().collect(),
            CleanupScope::All => self.cleanup_list.clone(),
        };

        let mut cleaned = 0;
        for id in ids {
            if let Some(node) = self.tree.get_mut(id) {
                if node.cleanup() {
                    cleaned += 1;
                }
            }
        }
        if scope == CleanupScope::All {
            self.closed = true;
        }
        tracing::debug!(side = side.as_str(), ?scope, cleaned, "container cleanup");
        cleaned
    }
}

/// Drives the signal tree, one tick per camera frame
#[derive(Debug)]
pub struct SignalContainer {
    inner: Traversal<SignalNode>,
}

impl SignalContainer {
    pub fn new(tree: Tree<SignalNode>, stop: StopSignal) -> Self {
        Self {
            inner: Traversal::new(tree, stop),
        }
    }

    /// Run one tick: execute the current group of nodes, returning how many ran.
    ///
    /// Returns after the first node that leaves the tick open (multi-step or
    /// awaiting a response), before a device-related node, or after jumping
    /// back into a loop body.
    #[instrument(level = "trace", name = "signal_container_run", skip(self))]
    pub fn run(&mut self) -> Result<usize, EngineError> {
        if self.inner.halted() {
            return Ok(0);
        }

        let mut executed = 0;
        loop {
            let Some(id) = self.inner.cursor.current else {
                self.inner.end_flag = true;
                return Ok(executed);
            };
            let Some(node) = self.inner.tree.get_mut(id) else {
                self.inner.end_flag = true;
                return Ok(executed);
            };

            let (result, is_end) = match node.run(false, &self.inner.stop) {
                Ok(outcome) => outcome,
                Err(err) => {
                    metrics::record_node_failure(Side::Signal.as_str(), node.name());
                    tracing::error!(node = node.name(), error = %err, "signal node failed");
                    self.inner.fail();
                    return Err(err);
                }
            };
            executed += 1;
            metrics::record_node_executed(Side::Signal.as_str(), node.name());
            tracing::debug!(node = node.name(), is_end, "signal node executed");

            if !is_end {
                return Ok(executed);
            }

            match self.inner.cursor.advance(node.info(), &result) {
                Step::Exhausted => {
                    self.inner.end_flag = true;
                    return Ok(executed);
                }
                Step::Repeated(_) => return Ok(executed),
                Step::Moved(next) => {
                    if self.inner.is_device_related(next) || self.inner.stop.is_stopped() {
                        return Ok(executed);
                    }
                }
            }
        }
    }

    /// Resolve the response of the node under the cursor, if it is awaiting one.
    ///
    /// Blocks until the data side responds or stop is requested. Never runs
    /// further nodes; the next tick continues from the advanced cursor.
    #[instrument(level = "trace", name = "signal_container_run_response", skip(self))]
    pub fn run_response(&mut self) -> Result<(), EngineError> {
        if self.inner.closed {
            return Ok(());
        }
        let Some(id) = self.inner.cursor.current else {
            return Ok(());
        };
        let Some(node) = self.inner.tree.get_mut(id) else {
            return Ok(());
        };
        if !node.is_awaiting_response() {
            return Ok(());
        }

        let started = std::time::Instant::now();
        let (result, is_end) = match node.run(true, &self.inner.stop) {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_cancellation() {
                    tracing::debug!(node = node.name(), "response wait cancelled");
                    self.inner.end_flag = true;
                } else {
                    metrics::record_node_failure(Side::Signal.as_str(), node.name());
                    tracing::error!(node = node.name(), error = %err, "signal response failed");
                    self.inner.fail();
                }
                return Err(err);
            }
        };
        metrics::record_response_delivered(node.name(), started.elapsed());

        if is_end {
            if let Step::Exhausted = self.inner.cursor.advance(node.info(), &result) {
                self.inner.end_flag = true;
            }
        }
        Ok(())
    }

    /// Node the next tick starts with
    pub fn current_node(&self) -> Option<&NodeInfo> {
        self.inner.current_info()
    }

    /// Whether the next tick starts on a device-related node
    pub fn next_is_device_related(&self) -> bool {
        self.current_node().is_some_and(NodeInfo::is_device_related)
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.inner
            .cursor
            .current
            .and_then(|id| self.inner.tree.get(id))
            .is_some_and(SignalNode::is_awaiting_response)
    }

    /// Traversal exhausted or aborted
    pub fn is_ended(&self) -> bool {
        self.inner.end_flag
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed
    }

    pub fn tree(&self) -> &Tree<SignalNode> {
        &self.inner.tree
    }

    /// Rewind to the root for another pass (live mode)
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Run signal-side cleanup; each reached node is cleaned at most once
    pub fn cleanup(&mut self, scope: CleanupScope) -> usize {
        self.inner.cleanup(scope, Side::Signal)
    }
}

impl Drop for SignalContainer {
    fn drop(&mut self) {
        self.inner.cleanup(CleanupScope::All, Side::Signal);
    }
}

/// Drives the data tree, one call per delivered frame batch
#[derive(Debug)]
pub struct DataContainer {
    inner: Traversal<DataNode>,
}

impl DataContainer {
    pub fn new(tree: Tree<DataNode>, stop: StopSignal) -> Self {
        Self {
            inner: Traversal::new(tree, stop),
        }
    }

    /// Process one frame batch: execute the current group of nodes, returning
    /// how many ran.
    ///
    /// A failing plain one-step node without a response partner is cleaned up,
    /// marked and skipped; any other failure closes the container.
    #[instrument(level = "trace", name = "data_container_run", skip(self), fields(frames = frame_ids.len()))]
    pub fn run(&mut self, frame_ids: &[FrameId]) -> Result<usize, EngineError> {
        if self.inner.halted() {
            return Ok(0);
        }

        let mut executed = 0;
        loop {
            let Some(id) = self.inner.cursor.current else {
                self.inner.end_flag = true;
                return Ok(executed);
            };
            let Some(node) = self.inner.tree.get_mut(id) else {
                self.inner.end_flag = true;
                return Ok(executed);
            };
            let responded = node.info().config.need_response;

            let (result, is_end) = match node.run(frame_ids) {
                Ok(outcome) => outcome,
                Err(err) if node.is_skippable() && !err.is_cancellation() => {
                    metrics::record_node_failure(Side::Data.as_str(), node.name());
                    tracing::warn!(node = node.name(), error = %err, "data node failed, skipping it");
                    self.cleanup(CleanupScope::Current);
                    (Value::Null, true)
                }
                Err(err) => {
                    metrics::record_node_failure(Side::Data.as_str(), node.name());
                    tracing::error!(node = node.name(), error = %err, "data node failed");
                    self.inner.fail();
                    return Err(err);
                }
            };
            let Some(node) = self.inner.tree.get(id) else {
                self.inner.end_flag = true;
                return Ok(executed);
            };
            executed += 1;
            metrics::record_node_executed(Side::Data.as_str(), node.name());
            tracing::debug!(node = node.name(), ?frame_ids, is_end, "data node executed");

            if !is_end {
                return Ok(executed);
            }

            match self.inner.cursor.advance(node.info(), &result) {
                Step::Exhausted => {
                    self.inner.end_flag = true;
                    return Ok(executed);
                }
                Step::Repeated(_) => return Ok(executed),
                Step::Moved(next) => {
                    if responded
                        || self.inner.is_device_related(next)
                        || self.inner.stop.is_stopped()
                    {
                        return Ok(executed);
                    }
                }
            }
        }
    }

    /// Node the next frame starts with
    pub fn current_node(&self) -> Option<&NodeInfo> {
        self.inner.current_info()
    }

    pub fn is_ended(&self) -> bool {
        self.inner.end_flag
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed
    }

    pub fn tree(&self) -> &Tree<DataNode> {
        &self.inner.tree
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Run data-side cleanup.
    ///
    /// `Current` cleans up the node under the cursor and marks it, so later
    /// passes skip it. A node whose signal twin waits on its response cannot be
    /// skipped: `Current` on such a node ends the container and cleans up
    /// every reached node instead.
    pub fn cleanup(&mut self, scope: CleanupScope) -> usize {
        if scope == CleanupScope::All {
            return self.inner.cleanup(scope, Side::Data);
        }

        let current = self.inner.cursor.current.and_then(|id| self.inner.tree.get_mut(id));
        match current {
            Some(node) if node.is_skippable() => {
                node.mark();
                self.inner.cleanup(CleanupScope::Current, Side::Data)
            }
            Some(_) => {
                self.inner.end_flag = true;
                self.inner.cleanup(CleanupScope::All, Side::Data)
            }
            None => 0,
        }
    }
}

impl Drop for DataContainer {
    fn drop(&mut self) {
        self.inner.cleanup(CleanupScope::All, Side::Data);
    }
}
