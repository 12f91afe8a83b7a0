//! The owned AST: the simplified tree semantic analysis and IR lowering
//! work on.
//!
//! Every AST node carries two identities:
//! - `origin` - the id and span of the CST node it came from. Template
//!   expansion deliberately reuses the *call site's* origin for cloned
//!   nodes, so diagnostics point at call sites, not definitions.
//! - `aid` - a unique instance id within one lowered program. Expansion
//!   clones get fresh instance ids, which is what the semantic model keys
//!   its side tables by.

mod expand;
mod lower;

#[cfg(test)]
mod expand_tests;

pub use expand::{MAX_EXPANSION_DEPTH, expand};
pub use lower::lower;

use rowan::TextRange;

use crisp_core::{MemberPath, NodeId};
use crisp_ir::{BinaryOp, Literal, LogicOp, ParallelPolicy, UnaryOp};

/// Unique instance id of an AST node or expression within one program.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AstId(pub u32);

/// Back-reference to the originating CST node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AstOrigin {
    pub id: NodeId,
    pub span: TextRange,
}

/// A lowered file: trees, template definitions, imports.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub trees: Vec<Tree>,
    pub templates: Vec<Template>,
    pub imports: Vec<ImportDecl>,
    pub(crate) next_aid: u32,
}

impl Program {
    pub(crate) fn fresh_aid(&mut self) -> AstId {
        let aid = AstId(self.next_aid);
        self.next_aid += 1;
        aid
    }

    pub fn tree(&self, name: &str) -> Option<&Tree> {
        self.trees.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    pub origin: AstOrigin,
    pub name: String,
    pub blackboard: Option<String>,
    pub body: Vec<Node>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TemplateKind {
    /// `defdec` - wraps a child node via `<body>`.
    Decorator,
    /// `defmacro` - expression parameters only.
    Macro,
}

#[derive(Debug, Clone)]
pub struct Template {
    pub origin: AstOrigin,
    pub kind: TemplateKind,
    pub name: String,
    pub params: Vec<String>,
    pub body: Node,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub origin: AstOrigin,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub aid: AstId,
    pub origin: AstOrigin,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Selector(Vec<Node>),
    Sequence(Vec<Node>),
    Parallel {
        policy: ParallelPolicy,
        children: Vec<Node>,
    },
    Check(Expr),
    Guard {
        cond: Expr,
        body: Box<Node>,
    },
    If {
        cond: Expr,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    Invert(Box<Node>),
    Repeat {
        count: Expr,
        child: Box<Node>,
    },
    Timeout {
        seconds: Expr,
        child: Box<Node>,
    },
    Cooldown {
        seconds: Expr,
        child: Box<Node>,
    },
    While {
        cond: Expr,
        body: Box<Node>,
    },
    Reactive {
        cond: Expr,
        body: Box<Node>,
    },
    ReactiveSelect(Vec<Node>),
    Ref(String),
    Action {
        path: MemberPath,
        args: Vec<Expr>,
    },
    /// Unexpanded call of a defdec or defmacro. Gone after expansion.
    TemplateCall {
        name: String,
        args: Vec<TemplateArg>,
    },
    /// `<body>` inside a defdec body. Gone after expansion.
    Placeholder,
    /// Recovered parse error; analysis skips it.
    Error,
}

#[derive(Debug, Clone)]
pub enum TemplateArg {
    Expr(Expr),
    Node(Node),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub aid: AstId,
    pub origin: AstOrigin,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Member(MemberPath),
    Blackboard(MemberPath),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Logic {
        op: LogicOp,
        operands: Vec<Expr>,
    },
    Call {
        path: MemberPath,
        args: Vec<Expr>,
    },
    /// Template parameter reference. Gone after expansion.
    Param(String),
    /// Recovered parse error; analysis treats it as `Error`-typed.
    Error,
}

impl Node {
    /// Direct child nodes, in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Selector(children)
            | NodeKind::Sequence(children)
            | NodeKind::ReactiveSelect(children)
            | NodeKind::Parallel { children, .. } => children.iter().collect(),
            NodeKind::Guard { body, .. }
            | NodeKind::While { body, .. }
            | NodeKind::Reactive { body, .. } => vec![body],
            NodeKind::If {
                then, otherwise, ..
            } => {
                let mut out: Vec<&Node> = vec![then];
                if let Some(e) = otherwise {
                    out.push(e);
                }
                out
            }
            NodeKind::Invert(child) => vec![child],
            NodeKind::Repeat { child, .. }
            | NodeKind::Timeout { child, .. }
            | NodeKind::Cooldown { child, .. } => vec![child],
            NodeKind::TemplateCall { args, .. } => args
                .iter()
                .filter_map(|a| match a {
                    TemplateArg::Node(n) => Some(n),
                    TemplateArg::Expr(_) => None,
                })
                .collect(),
            NodeKind::Check(_)
            | NodeKind::Ref(_)
            | NodeKind::Action { .. }
            | NodeKind::Placeholder
            | NodeKind::Error => Vec::new(),
        }
    }

    /// The condition or parameter expressions attached to this node.
    pub fn exprs(&self) -> Vec<&Expr> {
        match &self.kind {
            NodeKind::Check(e) => vec![e],
            NodeKind::Guard { cond, .. }
            | NodeKind::If { cond, .. }
            | NodeKind::While { cond, .. }
            | NodeKind::Reactive { cond, .. } => vec![cond],
            NodeKind::Repeat { count, .. } => vec![count],
            NodeKind::Timeout { seconds, .. } | NodeKind::Cooldown { seconds, .. } => {
                vec![seconds]
            }
            NodeKind::Action { args, .. } => args.iter().collect(),
            NodeKind::TemplateCall { args, .. } => args
                .iter()
                .filter_map(|a| match a {
                    TemplateArg::Expr(e) => Some(e),
                    TemplateArg::Node(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}
