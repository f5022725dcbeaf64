//! Feature registry: resolves plan names to factories.

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{Feature, FeatureError, FeatureSpec, PlanElement, Value};

use crate::{EngineError, FeatureContext, FeatureDescriptor, FeatureElement, FeatureFactory, FeatureList};

/// Name → factory table
#[derive(Clone, Default)]
pub struct FeatureRegistry {
    factories: BTreeMap<String, FeatureFactory>,
}

impl std::fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("features", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a factory under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&FeatureContext, &[Value]) -> Result<Arc<dyn Feature>, FeatureError>
            + Send
            + Sync
            + 'static,
    {
        self.register_factory(name, Arc::new(factory))
    }

    pub fn register_factory(&mut self, name: impl Into<String>, factory: FeatureFactory) -> &mut Self {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            tracing::debug!(feature = %name, "feature factory replaced");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Descriptor for one plan feature reference
    pub fn descriptor(&self, spec: &FeatureSpec) -> Result<FeatureDescriptor, EngineError> {
        let factory = self
            .factories
            .get(&spec.name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownFeature {
                name: spec.name.clone(),
            })?;
        Ok(FeatureDescriptor::new(spec.name.clone(), factory)
            .with_args(spec.args.clone())
            .with_overrides(spec.node))
    }

    /// Resolve a declarative plan into a feature list
    pub fn resolve(&self, elements: &[PlanElement]) -> Result<FeatureList, EngineError> {
        elements.iter().map(|element| self.resolve_element(element)).collect()
    }

    fn resolve_element(&self, element: &PlanElement) -> Result<FeatureElement, EngineError> {
        Ok(match element {
            PlanElement::Feature(spec) => FeatureElement::Feature(self.descriptor(spec)?),
            PlanElement::Sequence(items) => FeatureElement::Sequence(self.resolve(items)?),
            PlanElement::Loop(group) => FeatureElement::Loop {
                body: self.resolve(&group.body)?,
                control: self.descriptor(&group.control)?,
            },
            PlanElement::Branch(branch) => FeatureElement::Branch {
                condition: self.descriptor(&branch.condition)?,
                on_true: self.resolve(&branch.on_true)?,
                on_false: self.resolve(&branch.on_false)?,
            },
        })
    }
}
