//! Tree builder: compiles a feature list into twin signal/data trees.

use slab::Slab;
use tracing::instrument;

use crate::container::{DataContainer, SignalContainer};
use crate::node::{DataNode, Links, NodeId, NodeInfo, NodeRole, SignalNode, TreeNode};
use crate::rendezvous::response_slot;
use crate::tree::{is_isomorphic, Tree};
use crate::{EngineError, FeatureContext, FeatureDescriptor, FeatureElement};

/// Twin trees built from one feature list
#[derive(Debug)]
pub struct FeatureTrees {
    pub signal: Tree<SignalNode>,
    pub data: Tree<DataNode>,
}

#[derive(Debug, Clone, Copy)]
struct Chain {
    head: NodeId,
    tail: NodeId,
}

struct TreeBuilder<'a> {
    ctx: &'a FeatureContext,
    signal: Slab<SignalNode>,
    data: Slab<DataNode>,
}

impl<'a> TreeBuilder<'a> {
    fn new(ctx: &'a FeatureContext) -> Self {
        Self {
            ctx,
            signal: Slab::new(),
            data: Slab::new(),
        }
    }

    /// One feature instance, one node in each tree, same index
    fn add_node(&mut self, descriptor: &FeatureDescriptor, role: NodeRole) -> Result<NodeId, EngineError> {
        let (feature, config) = descriptor.instantiate(self.ctx)?;
        let info = NodeInfo {
            name: descriptor.name().to_string(),
            config,
            role,
            links: Links::default(),
        };

        let (sender, receiver) = if config.need_response {
            let (tx, rx) = response_slot();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let signal_id = self
            .signal
            .insert(SignalNode::new(info.clone(), feature.clone(), receiver));
        let data_id = self.data.insert(DataNode::new(info, feature, sender));
        debug_assert_eq!(signal_id, data_id);

        tracing::trace!(node = descriptor.name(), id = signal_id, ?role, "node added");
        Ok(signal_id)
    }

    fn link(&mut self, id: NodeId, update: impl Fn(&mut Links)) {
        if let Some(node) = self.signal.get_mut(id) {
            update(&mut node.info_mut().links);
        }
        if let Some(node) = self.data.get_mut(id) {
            update(&mut node.info_mut().links);
        }
    }

    fn build_chain(&mut self, elements: &[FeatureElement]) -> Result<Option<Chain>, EngineError> {
        let mut chain: Option<Chain> = None;
        for element in elements {
            let Some(part) = self.build_element(element)? else {
                continue;
            };
            chain = Some(match chain {
                None => part,
                Some(current) => {
                    self.link(current.tail, |links| links.sibling = Some(part.head));
                    Chain {
                        head: current.head,
                        tail: part.tail,
                    }
                }
            });
        }
        Ok(chain)
    }

    fn build_element(&mut self, element: &FeatureElement) -> Result<Option<Chain>, EngineError> {
        match element {
            FeatureElement::Feature(descriptor) => {
                let id = self.add_node(descriptor, NodeRole::Plain)?;
                Ok(Some(Chain { head: id, tail: id }))
            }
            FeatureElement::Sequence(items) => self.build_chain(items),
            FeatureElement::Loop { body, control } => {
                let body = self
                    .build_chain(body)?
                    .ok_or_else(|| EngineError::EmptyLoopBody {
                        control: control.name().to_string(),
                    })?;
                let id = self.add_node(control, NodeRole::LoopControl)?;
                self.link(body.tail, |links| links.sibling = Some(id));
                self.link(id, |links| links.child = Some(body.head));
                Ok(Some(Chain {
                    head: body.head,
                    tail: id,
                }))
            }
            FeatureElement::Branch {
                condition,
                on_true,
                on_false,
            } => {
                let id = self.add_node(condition, NodeRole::Branch)?;
                let on_true = self.build_chain(on_true)?.map(|chain| chain.head);
                let on_false = self.build_chain(on_false)?.map(|chain| chain.head);
                self.link(id, |links| {
                    links.child = on_true;
                    links.alt = on_false;
                });
                Ok(Some(Chain { head: id, tail: id }))
            }
        }
    }

    fn finish(self, root: Option<NodeId>) -> FeatureTrees {
        FeatureTrees {
            signal: Tree::from_parts(self.signal, root),
            data: Tree::from_parts(self.data, root),
        }
    }
}

/// Compile a feature list into twin trees without wrapping them in containers
pub fn build_trees(ctx: &FeatureContext, features: &[FeatureElement]) -> Result<FeatureTrees, EngineError> {
    let mut builder = TreeBuilder::new(ctx);
    let root = builder.build_chain(features)?.map(|chain| chain.head);
    Ok(builder.finish(root))
}

/// Build the signal and data containers for one acquisition.
///
/// Every descriptor is instantiated exactly once; its signal and data nodes
/// share the instance.
#[instrument(level = "trace", name = "load_features", skip_all, fields(elements = features.len()))]
pub fn load_features(
    ctx: &FeatureContext,
    features: &[FeatureElement],
) -> Result<(SignalContainer, DataContainer), EngineError> {
    let trees = build_trees(ctx, features)?;
    debug_assert!(is_isomorphic(&trees.signal, &trees.data));

    tracing::debug!(nodes = trees.signal.len(), "feature trees built");
    let stop = ctx.control().stop_signal().clone();
    Ok((
        SignalContainer::new(trees.signal, stop.clone()),
        DataContainer::new(trees.data, stop),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, descriptor, CallLog};
    use contracts::NodeConfig;

    #[test]
    fn test_flat_list_chains_siblings() {
        let log = CallLog::default();
        let list = vec![
            descriptor("A", &log).into(),
            descriptor("B", &log).into(),
            descriptor("C", &log).into(),
        ];
        let trees = build_trees(&context(), &list).unwrap();

        assert_eq!(trees.signal.names(), vec!["A", "B", "C"]);
        assert_eq!(trees.signal.root(), Some(0));
        let a = trees.signal.get(0).unwrap().info();
        assert_eq!(a.links.sibling, Some(1));
        assert!(is_isomorphic(&trees.signal, &trees.data));
    }

    #[test]
    fn test_loop_control_points_back_to_body() {
        let log = CallLog::default();
        let list = vec![
            descriptor("A", &log).into(),
            FeatureElement::looped(
                vec![descriptor("B", &log).into(), descriptor("C", &log).into()],
                descriptor("L", &log),
            ),
            descriptor("D", &log).into(),
        ];
        let trees = build_trees(&context(), &list).unwrap();

        let ids: Vec<(NodeId, &str)> = trees
            .signal
            .iter()
            .map(|(id, node)| (id, node.info().name.as_str()))
            .collect();
        assert_eq!(ids, vec![(0, "A"), (1, "B"), (2, "C"), (3, "L"), (4, "D")]);

        let control = trees.signal.get(3).unwrap().info();
        assert_eq!(control.role, NodeRole::LoopControl);
        assert_eq!(control.links.child, Some(1));
        assert_eq!(control.links.sibling, Some(4));
        assert_eq!(trees.signal.get(2).unwrap().info().links.sibling, Some(3));
        assert_eq!(trees.signal.get(0).unwrap().info().links.sibling, Some(1));
        assert!(is_isomorphic(&trees.signal, &trees.data));
    }

    #[test]
    fn test_nested_sequences_are_spliced() {
        let log = CallLog::default();
        let list = vec![FeatureElement::Sequence(vec![
            descriptor("A", &log).into(),
            FeatureElement::Sequence(vec![descriptor("B", &log).into()]),
        ])];
        let trees = build_trees(&context(), &list).unwrap();
        assert_eq!(trees.data.names(), vec!["A", "B"]);
    }

    #[test]
    fn test_branch_arms() {
        let log = CallLog::default();
        let list = vec![
            FeatureElement::branch(
                descriptor("If", &log),
                vec![descriptor("T", &log).into()],
                vec![descriptor("F", &log).into()],
            ),
            descriptor("After", &log).into(),
        ];
        let trees = build_trees(&context(), &list).unwrap();
        let branch = trees.signal.get(0).unwrap().info();
        assert_eq!(branch.role, NodeRole::Branch);
        assert_eq!(branch.links.child, Some(1));
        assert_eq!(branch.links.alt, Some(2));
        assert_eq!(branch.links.sibling, Some(3));
        assert!(trees.signal.get(1).unwrap().info().links.sibling.is_none());
    }

    #[test]
    fn test_empty_loop_body_rejected() {
        let log = CallLog::default();
        let list = vec![FeatureElement::looped(vec![], descriptor("L", &log))];
        let err = build_trees(&context(), &list).unwrap_err();
        assert!(matches!(err, EngineError::EmptyLoopBody { control } if control == "L"));
    }

    #[test]
    fn test_multi_step_override_forces_device_related() {
        let log = CallLog::default();
        let list = vec![descriptor("M", &log)
            .node_type(contracts::NodeType::MultiStep)
            .device_related(false)
            .into()];
        let trees = build_trees(&context(), &list).unwrap();
        let config = trees.signal.get(0).unwrap().info().config;
        assert_eq!(config, NodeConfig::multi_step());
    }

    #[test]
    fn test_one_instance_per_descriptor() {
        let log = CallLog::default();
        let list = vec![descriptor("A", &log).into(), descriptor("B", &log).into()];
        build_trees(&context(), &list).unwrap();
        assert_eq!(log.count("A.new"), 1);
        assert_eq!(log.count("B.new"), 1);
    }

    #[test]
    fn test_empty_list_builds_empty_trees() {
        let trees = build_trees(&context(), &[]).unwrap();
        assert!(trees.signal.is_empty());
        assert!(trees.signal.root().is_none());
        assert!(is_isomorphic(&trees.signal, &trees.data));
    }
}
