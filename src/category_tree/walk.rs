use std::collections::HashMap;

use super::node::CategoryNode;

/// Position of a node in the pre-order walk of a tree.  Stable for a given
/// tree, and unlike ids it can't collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub usize);

/// The relationships decorators need, derived from one pre-order walk:
/// every node, the leaves, and each node's parent.
pub struct TreeWalk<'a> {
    nodes: Vec<&'a CategoryNode>,
    parents: Vec<Option<NodeIndex>>,
    leaves: Vec<NodeIndex>,
    by_id: HashMap<&'a str, NodeIndex>,
}

impl<'a> TreeWalk<'a> {
    pub fn new(tree: &'a [CategoryNode]) -> Self {
        let mut walk = TreeWalk {
            nodes: vec![],
            parents: vec![],
            leaves: vec![],
            by_id: HashMap::new(),
        };
        walk.visit(tree, None);
        walk
    }

    fn visit(&mut self, nodes: &'a [CategoryNode], parent: Option<NodeIndex>) {
        for node in nodes {
            let idx = NodeIndex(self.nodes.len());
            self.nodes.push(node);
            self.parents.push(parent);
            self.by_id.entry(node.id.as_str()).or_insert(idx);
            if node.is_leaf() {
                self.leaves.push(idx);
            } else {
                self.visit(&node.children, Some(idx));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: NodeIndex) -> &'a CategoryNode {
        self.nodes[idx.0]
    }

    /// All nodes in pre-order.
    pub fn node_list(&self) -> impl Iterator<Item = (NodeIndex, &'a CategoryNode)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIndex(i), *n))
    }

    /// Nodes without children, in pre-order.
    pub fn leaf_list(&self) -> impl Iterator<Item = (NodeIndex, &'a CategoryNode)> + '_ {
        self.leaves.iter().map(move |idx| (*idx, self.nodes[idx.0]))
    }

    /// Top-level nodes have no parent; the root is not part of the walk.
    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.parents[idx.0]
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    /// Parent lookup by child id, for callers that only hold ids.
    pub fn parent_of(&self, id: &str) -> Option<&'a CategoryNode> {
        let parent = self.parent(self.index_of(id)?)?;
        Some(self.node(parent))
    }

    /// Up to `levels` ancestors of `idx`, nearest first.
    pub fn ancestors(&self, idx: NodeIndex, levels: usize) -> Vec<NodeIndex> {
        let mut out = vec![];
        let mut cur = idx;
        while out.len() < levels {
            match self.parent(cur) {
                Some(p) => {
                    out.push(p);
                    cur = p;
                }
                None => break,
            }
        }
        out
    }
}

/// Visit every node of `tree` mutably in the same pre-order `TreeWalk` uses,
/// handing over each node's `NodeIndex`.
pub fn for_each_pre_order_mut<F>(tree: &mut [CategoryNode], f: &mut F)
where
    F: FnMut(NodeIndex, &mut CategoryNode),
{
    fn visit<F>(nodes: &mut [CategoryNode], next: &mut usize, f: &mut F)
    where
        F: FnMut(NodeIndex, &mut CategoryNode),
    {
        for node in nodes {
            f(NodeIndex(*next), &mut *node);
            *next += 1;
            visit(&mut node.children, next, f);
        }
    }

    let mut next = 0;
    visit(tree, &mut next, f);
}
