//! IR expressions.

use serde::{Deserialize, Serialize};

use crisp_core::{CrispType, MemberPath, NodeId};

/// Binary operators. Equality (`==`/`!=`) is separate from ordering in the
/// checking rules but shares the runtime dispatch.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem
        )
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
}

/// A compile-time constant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Enum { ty: String, member: String },
    Null,
}

/// A resolved method reference: the navigation prefix plus the method name,
/// all in the host's casing.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub path: MemberPath,
}

impl MethodRef {
    pub fn new(path: MemberPath) -> MethodRef {
        MethodRef { path }
    }

    /// The method name itself.
    pub fn name(&self) -> &str {
        self.path.last()
    }
}

impl std::fmt::Display for MethodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// An IR expression with its originating node id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IrExpr {
    pub id: NodeId,
    pub kind: IrExprKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IrExprKind {
    Literal(Literal),
    MemberLoad(MemberPath),
    BlackboardLoad(MemberPath),
    Binary {
        op: BinaryOp,
        lhs: Box<IrExpr>,
        rhs: Box<IrExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<IrExpr>,
    },
    Logic {
        op: LogicOp,
        operands: Vec<IrExpr>,
    },
    Call {
        method: MethodRef,
        args: Vec<IrExpr>,
    },
    Convert {
        operand: Box<IrExpr>,
        target: CrispType,
    },
}

impl IrExpr {
    pub fn new(id: NodeId, kind: IrExprKind) -> IrExpr {
        IrExpr { id, kind }
    }

    /// Wraps an expression in an explicit conversion, reusing the operand's id.
    pub fn converted(self, target: CrispType) -> IrExpr {
        IrExpr {
            id: self.id,
            kind: IrExprKind::Convert {
                operand: Box::new(self),
                target,
            },
        }
    }
}
