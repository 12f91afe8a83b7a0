//! Stable identifiers shared across compilation stages.

use serde::{Deserialize, Serialize};

/// Stable identity of a CST node.
///
/// Assigned by a depth-first walk in document order after parsing (the
/// program node is 0). AST and IR nodes carry the id of their originating
/// CST node, and the interpreter keys its decorator state tables by it, so
/// the id is the one identity every stage and external consumer agrees on.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id of the program (root) node of every file.
    pub const PROGRAM: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lightweight handle to a source file in a compilation session.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize,
)]
pub struct FileId(pub u32);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file:{}", self.0)
    }
}
