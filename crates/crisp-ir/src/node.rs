//! IR tree nodes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crisp_core::NodeId;

use crate::expr::{IrExpr, MethodRef};

/// Completion policy of a parallel composite.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ParallelPolicy {
    /// Success as soon as any child succeeds.
    Any,
    /// Success only when every child succeeds.
    All,
    /// Success once `n` children have succeeded.
    N(u32),
}

impl std::fmt::Display for ParallelPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParallelPolicy::Any => write!(f, ":any"),
            ParallelPolicy::All => write!(f, ":all"),
            ParallelPolicy::N(n) => write!(f, ":n {n}"),
        }
    }
}

/// An IR node with its originating node id.
///
/// The id keys the interpreter's stateful decorator tables, so it must stay
/// stable for the lifetime of a compiled module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IrNode {
    pub id: NodeId,
    pub kind: IrNodeKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IrNodeKind {
    Tree {
        name: String,
        body: Vec<IrNode>,
    },
    Selector {
        children: Vec<IrNode>,
    },
    Sequence {
        children: Vec<IrNode>,
    },
    Parallel {
        policy: ParallelPolicy,
        children: Vec<IrNode>,
    },
    Condition {
        expr: IrExpr,
    },
    Action {
        method: MethodRef,
        args: Vec<IrExpr>,
    },
    Guard {
        cond: IrExpr,
        body: Box<IrNode>,
    },
    If {
        cond: IrExpr,
        then: Box<IrNode>,
        otherwise: Option<Box<IrNode>>,
    },
    Invert {
        child: Box<IrNode>,
    },
    Repeat {
        count: u32,
        child: Box<IrNode>,
    },
    Timeout {
        seconds: f32,
        child: Box<IrNode>,
    },
    Cooldown {
        seconds: f32,
        child: Box<IrNode>,
    },
    While {
        cond: IrExpr,
        body: Box<IrNode>,
    },
    Reactive {
        cond: IrExpr,
        body: Box<IrNode>,
    },
    ReactiveSelect {
        children: Vec<IrNode>,
    },
    TreeRef {
        name: String,
    },
}

impl IrNode {
    pub fn new(id: NodeId, kind: IrNodeKind) -> IrNode {
        IrNode { id, kind }
    }

    /// Name of the tree, for `Tree` nodes.
    pub fn tree_name(&self) -> Option<&str> {
        match &self.kind {
            IrNodeKind::Tree { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Direct structural children, in evaluation order.
    pub fn children(&self) -> Vec<&IrNode> {
        match &self.kind {
            IrNodeKind::Tree { body, .. } => body.iter().collect(),
            IrNodeKind::Selector { children }
            | IrNodeKind::Sequence { children }
            | IrNodeKind::Parallel { children, .. }
            | IrNodeKind::ReactiveSelect { children } => children.iter().collect(),
            IrNodeKind::Guard { body, .. }
            | IrNodeKind::While { body, .. }
            | IrNodeKind::Reactive { body, .. } => vec![body],
            IrNodeKind::If {
                then, otherwise, ..
            } => {
                let mut out: Vec<&IrNode> = vec![then];
                if let Some(e) = otherwise {
                    out.push(e);
                }
                out
            }
            IrNodeKind::Invert { child }
            | IrNodeKind::Repeat { child, .. }
            | IrNodeKind::Timeout { child, .. }
            | IrNodeKind::Cooldown { child, .. } => vec![child],
            IrNodeKind::Condition { .. }
            | IrNodeKind::Action { .. }
            | IrNodeKind::TreeRef { .. } => Vec::new(),
        }
    }
}

/// A compiled file: every defined tree, in definition order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IrModule {
    pub trees: IndexMap<String, IrNode>,
}

impl IrModule {
    pub fn new() -> IrModule {
        IrModule::default()
    }

    pub fn tree(&self, name: &str) -> Option<&IrNode> {
        self.trees.get(name)
    }

    pub fn insert(&mut self, node: IrNode) {
        if let Some(name) = node.tree_name() {
            self.trees.insert(name.to_string(), node);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }
}
