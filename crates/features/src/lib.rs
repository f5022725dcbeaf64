//! # Features
//!
//! Built-in feature primitives and their registry entries.
//!
//! | name | role |
//! |---|---|
//! | `LoopByCount(steps)` | loop control, repeats its body `steps` times |
//! | `WaitToContinue()` | two-party gate between signal and data threads |
//! | `StackPause(pause_num, pause_ms)` | timed pause with the data thread parked |
//! | `LogFrames()` | data-side frame bookkeeping |
//! | `ZStack(planes)` | moves the z stage one plane per frame |
//!
//! Numeric arguments accept a dotted path into the plan's experiment table.

pub mod args;
mod log_frames;
mod loop_by_count;
mod stack_pause;
mod wait_to_continue;
mod z_stack;

#[cfg(test)]
mod testing;

use feature_engine::FeatureRegistry;

pub use log_frames::LogFrames;
pub use loop_by_count::LoopByCount;
pub use stack_pause::StackPause;
pub use wait_to_continue::WaitToContinue;
pub use z_stack::ZStack;

/// Register every built-in feature
pub fn register_builtin(registry: &mut FeatureRegistry) {
    registry
        .register(loop_by_count::NAME, LoopByCount::from_args)
        .register(wait_to_continue::NAME, WaitToContinue::from_args)
        .register(stack_pause::NAME, StackPause::from_args)
        .register(log_frames::NAME, LogFrames::from_args)
        .register(z_stack::NAME, ZStack::from_args);
}

/// Registry pre-populated with the built-ins
pub fn builtin_registry() -> FeatureRegistry {
    let mut registry = FeatureRegistry::new();
    register_builtin(&mut registry);
    registry
}
