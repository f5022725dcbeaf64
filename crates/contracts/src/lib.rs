//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the feature engine.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Execution Model
//! - A *feature* is one unit of acquisition logic with a signal half and a data half
//! - Both halves share one [`Feature`] instance and one [`NodeConfig`]
//! - `frame_id` counts camera frames, one logical step per frame

mod error;
mod feature;
mod microscope;
mod node;
mod plan;

pub use error::*;
pub use feature::Feature;
pub use microscope::{Microscope, StageAxis};
pub use node::*;
pub use plan::*;

/// Dynamic value passed between feature callbacks.
pub use serde_json::Value;
