//! Engine error types

use contracts::FeatureError;
use thiserror::Error;

/// Which tree a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Signal,
    Data,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Signal => "signal",
            Side::Data => "data",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while building or driving feature trees
#[derive(Debug, Error)]
pub enum EngineError {
    /// Plan references a feature the registry does not know
    #[error("unknown feature '{name}'")]
    UnknownFeature { name: String },

    /// Feature factory rejected its arguments
    #[error("failed to construct feature '{name}': {source}")]
    Construct {
        name: String,
        #[source]
        source: FeatureError,
    },

    /// Loop group without body nodes
    #[error("loop controlled by '{control}' has an empty body")]
    EmptyLoopBody { control: String },

    /// A feature callback failed; the container is closed
    #[error("{side} node '{node}' failed: {source}")]
    NodeFailed {
        side: Side,
        node: String,
        #[source]
        source: FeatureError,
    },

    /// The response wait was released by a stop request
    #[error("response wait for node '{node}' cancelled")]
    Cancelled { node: String },
}

impl EngineError {
    pub fn node_failed(side: Side, node: impl Into<String>, source: FeatureError) -> Self {
        Self::NodeFailed {
            side,
            node: node.into(),
            source,
        }
    }

    /// Cancellation is the expected outcome of a stop request, not a fault
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            EngineError::Cancelled { .. }
                | EngineError::NodeFailed {
                    source: FeatureError::Interrupted,
                    ..
                }
        )
    }
}
