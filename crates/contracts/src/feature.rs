//! Feature protocol - the unit of acquisition logic.
//!
//! A feature bundles a signal half (runs on the signal thread, drives hardware)
//! and a data half (runs on the data thread, consumes frames). The engine builds
//! one signal node and one data node per feature, both holding the same `Arc`.

use serde_json::Value;

use crate::{FeatureError, FrameId, NodeConfig};

/// Feature callbacks.
///
/// Every method has a default, so a feature only implements the halves it needs.
/// `main` defaults to `true`, `end` defaults to `true` (finish after one step),
/// `signal_response` passes the data side's result through.
///
/// Callbacks take `&self`: both threads call into the same instance, so any state
/// shared between the halves must use interior mutability.
pub trait Feature: Send + Sync {
    /// Node configuration of this feature
    fn node_config(&self) -> NodeConfig {
        NodeConfig::default()
    }

    /// Called once each time the signal node is entered
    fn signal_init(&self) -> Result<(), FeatureError> {
        Ok(())
    }

    /// Called on every signal execution
    fn signal_main(&self) -> Result<Value, FeatureError> {
        Ok(Value::Bool(true))
    }

    /// Receives the data side's result when `need_response` is set
    fn signal_response(&self, response: Value) -> Result<Value, FeatureError> {
        Ok(response)
    }

    /// Multi-step termination check for the signal side
    fn signal_end(&self) -> bool {
        true
    }

    /// Releases signal-side resources; called at most once per acquisition
    fn signal_cleanup(&self) {}

    /// Called once each time the data node is entered
    fn data_init(&self) -> Result<(), FeatureError> {
        Ok(())
    }

    /// Called for every delivered frame batch
    fn data_main(&self, frame_ids: &[FrameId]) -> Result<Value, FeatureError> {
        let _ = frame_ids;
        Ok(Value::Bool(true))
    }

    /// Multi-step termination check for the data side
    fn data_end(&self) -> bool {
        true
    }

    /// Releases data-side resources; called at most once per acquisition
    fn data_cleanup(&self) {}
}
