//! Document-order node ids.
//!
//! A single depth-first walk after parsing assigns every CST node a stable
//! `NodeId` (the program node is 0). The map is the bridge between the CST
//! and everything downstream: AST and IR nodes carry these ids, and external
//! consumers address nodes by them.

use std::collections::HashMap;

use crisp_core::NodeId;

use super::cst::SyntaxNode;

#[derive(Debug, Clone, Default)]
pub struct NodeIdMap {
    ids: HashMap<SyntaxNode, NodeId>,
    nodes: Vec<SyntaxNode>,
}

impl NodeIdMap {
    pub fn new(root: &SyntaxNode) -> NodeIdMap {
        let mut ids = HashMap::new();
        let mut nodes = Vec::new();
        // `descendants` yields the root first, then children in document order.
        for (index, node) in root.descendants().enumerate() {
            let id = NodeId(index as u32);
            ids.insert(node.clone(), id);
            nodes.push(node);
        }
        NodeIdMap { ids, nodes }
    }

    /// Id of a node from this parse. Nodes from other trees have no id.
    pub fn try_id(&self, node: &SyntaxNode) -> Option<NodeId> {
        self.ids.get(node).copied()
    }

    /// Id of a node from this parse; panics on foreign nodes, which would be
    /// a cross-stage bookkeeping bug.
    pub fn id(&self, node: &SyntaxNode) -> NodeId {
        self.try_id(node)
            .expect("node does not belong to this parse")
    }

    pub fn node(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SyntaxNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }
}
