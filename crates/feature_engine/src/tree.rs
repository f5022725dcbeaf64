//! Arena-backed feature trees.
//!
//! Nodes live in a `Slab`; links are indices, so a loop back-edge is a plain
//! index and never an owning cycle. Signal and data trees built from the same
//! feature list share indices.

use std::collections::HashSet;

use slab::Slab;

use crate::node::{NodeId, TreeNode};

/// Feature tree over signal or data nodes
#[derive(Debug)]
pub struct Tree<N> {
    nodes: Slab<N>,
    root: Option<NodeId>,
}

impl<N> Default for Tree<N> {
    fn default() -> Self {
        Self {
            nodes: Slab::new(),
            root: None,
        }
    }
}

impl<N: TreeNode> Tree<N> {
    pub(crate) fn from_parts(nodes: Slab<N>, root: Option<NodeId>) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&N> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut N> {
        self.nodes.get_mut(id)
    }

    /// Node ids in build order
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &N)> {
        self.nodes.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut N)> {
        self.nodes.iter_mut()
    }

    /// Node names in pre-order (sibling chains, loop bodies, branch arms)
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(self.nodes.len());
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            names.push(node.info().name.as_str());
            let links = node.info().links;
            for next in [links.sibling, links.alt, links.child].into_iter().flatten() {
                stack.push(next);
            }
        }
        names
    }
}

/// Same shape and the same node name at every position.
///
/// Walks both trees in lockstep and tolerates loop back-edges.
pub fn is_isomorphic<A: TreeNode, B: TreeNode>(left: &Tree<A>, right: &Tree<B>) -> bool {
    if left.len() != right.len() {
        return false;
    }

    let mut seen = HashSet::new();
    let mut stack = vec![(left.root, right.root)];

    while let Some(pair) = stack.pop() {
        let (a, b) = match pair {
            (None, None) => continue,
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };
        if !seen.insert((a, b)) {
            continue;
        }
        let (Some(na), Some(nb)) = (left.get(a), right.get(b)) else {
            return false;
        };
        let (ia, ib) = (na.info(), nb.info());
        if ia.name != ib.name || ia.role != ib.role {
            return false;
        }
        stack.push((ia.links.sibling, ib.links.sibling));
        stack.push((ia.links.child, ib.links.child));
        stack.push((ia.links.alt, ib.links.alt));
    }
    true
}
