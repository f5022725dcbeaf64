//! Feature descriptors and feature lists.

use std::sync::Arc;

use contracts::{Feature, FeatureError, NodeConfig, NodeOverrides, NodeType, Value};

use crate::{EngineError, FeatureContext};

/// Builds one feature instance from the acquisition context and positional args
pub type FeatureFactory = Arc<
    dyn Fn(&FeatureContext, &[Value]) -> Result<Arc<dyn Feature>, FeatureError> + Send + Sync,
>;

/// A feature to instantiate: name, factory, arguments and node overrides
#[derive(Clone)]
pub struct FeatureDescriptor {
    name: String,
    factory: FeatureFactory,
    args: Vec<Value>,
    node: NodeOverrides,
}

impl std::fmt::Debug for FeatureDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureDescriptor")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl FeatureDescriptor {
    pub fn new(name: impl Into<String>, factory: FeatureFactory) -> Self {
        Self {
            name: name.into(),
            factory,
            args: Vec::new(),
            node: NodeOverrides::default(),
        }
    }

    /// Descriptor from a closure
    pub fn from_fn<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&FeatureContext, &[Value]) -> Result<Arc<dyn Feature>, FeatureError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, Arc::new(factory))
    }

    /// Descriptor around an already-built instance; every build shares it
    pub fn from_instance(name: impl Into<String>, feature: Arc<dyn Feature>) -> Self {
        Self::from_fn(name, move |_, _| Ok(feature.clone()))
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_overrides(mut self, node: NodeOverrides) -> Self {
        self.node = node;
        self
    }

    pub fn node_type(mut self, node_type: NodeType) -> Self {
        self.node.node_type = Some(node_type);
        self
    }

    pub fn device_related(mut self, device_related: bool) -> Self {
        self.node.device_related = Some(device_related);
        self
    }

    pub fn need_response(mut self, need_response: bool) -> Self {
        self.node.need_response = Some(need_response);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> FeatureFactory {
        self.factory.clone()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn overrides(&self) -> &NodeOverrides {
        &self.node
    }

    /// Construct the shared instance and its effective node config
    pub fn instantiate(
        &self,
        ctx: &FeatureContext,
    ) -> Result<(Arc<dyn Feature>, NodeConfig), EngineError> {
        let feature = (self.factory)(ctx, &self.args).map_err(|source| EngineError::Construct {
            name: self.name.clone(),
            source,
        })?;
        let config = self.node.apply(feature.node_config());
        Ok((feature, config))
    }
}

/// One element of a feature list
#[derive(Debug, Clone)]
pub enum FeatureElement {
    /// A single feature
    Feature(FeatureDescriptor),
    /// Nested list, spliced into the enclosing sequence
    Sequence(Vec<FeatureElement>),
    /// Body repeats while `control` returns a truthy value
    Loop {
        body: Vec<FeatureElement>,
        control: FeatureDescriptor,
    },
    /// `on_true` or `on_false` runs depending on `condition`'s result
    Branch {
        condition: FeatureDescriptor,
        on_true: Vec<FeatureElement>,
        on_false: Vec<FeatureElement>,
    },
}

/// Ordered feature list
pub type FeatureList = Vec<FeatureElement>;

impl FeatureElement {
    pub fn looped(body: Vec<FeatureElement>, control: FeatureDescriptor) -> Self {
        Self::Loop { body, control }
    }

    pub fn branch(
        condition: FeatureDescriptor,
        on_true: Vec<FeatureElement>,
        on_false: Vec<FeatureElement>,
    ) -> Self {
        Self::Branch {
            condition,
            on_true,
            on_false,
        }
    }

    /// Number of descriptors (tree nodes) this element expands to
    pub fn node_count(&self) -> usize {
        match self {
            FeatureElement::Feature(_) => 1,
            FeatureElement::Sequence(items) => items.iter().map(Self::node_count).sum(),
            FeatureElement::Loop { body, .. } => 1 + body.iter().map(Self::node_count).sum::<usize>(),
            FeatureElement::Branch {
                on_true, on_false, ..
            } => {
                1 + on_true.iter().map(Self::node_count).sum::<usize>()
                    + on_false.iter().map(Self::node_count).sum::<usize>()
            }
        }
    }
}

impl From<FeatureDescriptor> for FeatureElement {
    fn from(descriptor: FeatureDescriptor) -> Self {
        FeatureElement::Feature(descriptor)
    }
}
