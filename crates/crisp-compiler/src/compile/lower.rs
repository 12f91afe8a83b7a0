//! Lowers the checked AST into the IR, preserving node ids and making
//! implicit numeric coercions explicit.
//!
//! Every site that expects Float but receives an Int wraps the operand in
//! `Convert(…, Float)`: mixed arithmetic and comparison operands, and
//! method arguments. The interpreter and downstream emitters never
//! re-derive promotion rules.
//!
//! Lowering is total: recovered `Error` nodes become always-failing
//! conditions so even an invalid file produces a structurally complete
//! module. Consumers gate on `has_errors` before treating the IR as
//! meaningful.

use crisp_core::CrispType;
use crisp_ir::{IrExpr, IrExprKind, IrModule, IrNode, IrNodeKind, Literal, MethodRef};

use crate::analyze::SemanticModel;
use crate::ast::{Expr, ExprKind, Node, NodeKind, Program};

/// Lowers every tree of a program.
pub fn lower_program(program: &Program, model: &SemanticModel) -> IrModule {
    let lowerer = Lowerer { model };
    let mut module = IrModule::new();
    for tree in &program.trees {
        let body = tree.body.iter().map(|n| lowerer.lower_node(n)).collect();
        module.insert(IrNode::new(
            tree.origin.id,
            IrNodeKind::Tree {
                name: tree.name.clone(),
                body,
            },
        ));
    }
    module
}

struct Lowerer<'a> {
    model: &'a SemanticModel,
}

impl Lowerer<'_> {
    fn lower_node(&self, node: &Node) -> IrNode {
        let id = node.origin.id;
        let kind = match &node.kind {
            NodeKind::Selector(children) => IrNodeKind::Selector {
                children: self.lower_all(children),
            },
            NodeKind::Sequence(children) => IrNodeKind::Sequence {
                children: self.lower_all(children),
            },
            NodeKind::ReactiveSelect(children) => IrNodeKind::ReactiveSelect {
                children: self.lower_all(children),
            },
            NodeKind::Parallel { policy, children } => IrNodeKind::Parallel {
                policy: *policy,
                children: self.lower_all(children),
            },
            NodeKind::Check(cond) => IrNodeKind::Condition {
                expr: self.lower_expr(cond),
            },
            NodeKind::Guard { cond, body } => IrNodeKind::Guard {
                cond: self.lower_expr(cond),
                body: Box::new(self.lower_node(body)),
            },
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => IrNodeKind::If {
                cond: self.lower_expr(cond),
                then: Box::new(self.lower_node(then)),
                otherwise: otherwise.as_ref().map(|n| Box::new(self.lower_node(n))),
            },
            NodeKind::Invert(child) => IrNodeKind::Invert {
                child: Box::new(self.lower_node(child)),
            },
            NodeKind::Repeat { count, child } => IrNodeKind::Repeat {
                count: literal_count(count),
                child: Box::new(self.lower_node(child)),
            },
            NodeKind::Timeout { seconds, child } => IrNodeKind::Timeout {
                seconds: literal_seconds(seconds),
                child: Box::new(self.lower_node(child)),
            },
            NodeKind::Cooldown { seconds, child } => IrNodeKind::Cooldown {
                seconds: literal_seconds(seconds),
                child: Box::new(self.lower_node(child)),
            },
            NodeKind::While { cond, body } => IrNodeKind::While {
                cond: self.lower_expr(cond),
                body: Box::new(self.lower_node(body)),
            },
            NodeKind::Reactive { cond, body } => IrNodeKind::Reactive {
                cond: self.lower_expr(cond),
                body: Box::new(self.lower_node(body)),
            },
            NodeKind::Ref(name) => IrNodeKind::TreeRef { name: name.clone() },
            NodeKind::Action { path, args } => {
                let (method, params) = match self.model.resolution(node.aid) {
                    Some(resolved) => (
                        MethodRef::new(resolved.member_path()),
                        resolved.last().params.clone(),
                    ),
                    None => (MethodRef::new(path.clone()), Vec::new()),
                };
                IrNodeKind::Action {
                    method,
                    args: self.lower_args(args, &params),
                }
            }
            // Recovered errors and unexpanded leftovers lower to a node
            // that fails every tick.
            NodeKind::TemplateCall { .. } | NodeKind::Placeholder | NodeKind::Error => {
                IrNodeKind::Condition {
                    expr: IrExpr::new(id, IrExprKind::Literal(Literal::Bool(false))),
                }
            }
        };
        IrNode::new(id, kind)
    }

    fn lower_all(&self, nodes: &[Node]) -> Vec<IrNode> {
        nodes.iter().map(|n| self.lower_node(n)).collect()
    }

    fn lower_expr(&self, expr: &Expr) -> IrExpr {
        let id = expr.origin.id;
        match &expr.kind {
            ExprKind::Literal(lit) => IrExpr::new(id, IrExprKind::Literal(lit.clone())),
            ExprKind::Member(path) => {
                let path = match self.model.resolution(expr.aid) {
                    Some(resolved) => resolved.member_path(),
                    None => path.clone(),
                };
                IrExpr::new(id, IrExprKind::MemberLoad(path))
            }
            ExprKind::Blackboard(path) => {
                let path = match self.model.resolution(expr.aid) {
                    Some(resolved) => resolved.member_path(),
                    None => path.clone(),
                };
                IrExpr::new(id, IrExprKind::BlackboardLoad(path))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let mut left = self.lower_expr(lhs);
                let mut right = self.lower_expr(rhs);
                if op.is_arithmetic() || op.is_ordering() {
                    let lt = self.model.type_of(lhs.aid);
                    let rt = self.model.type_of(rhs.aid);
                    if lt == CrispType::Int && rt == CrispType::Float {
                        left = left.converted(CrispType::Float);
                    } else if lt == CrispType::Float && rt == CrispType::Int {
                        right = right.converted(CrispType::Float);
                    }
                }
                IrExpr::new(
                    id,
                    IrExprKind::Binary {
                        op: *op,
                        lhs: Box::new(left),
                        rhs: Box::new(right),
                    },
                )
            }
            ExprKind::Unary { op, operand } => IrExpr::new(
                id,
                IrExprKind::Unary {
                    op: *op,
                    operand: Box::new(self.lower_expr(operand)),
                },
            ),
            ExprKind::Logic { op, operands } => IrExpr::new(
                id,
                IrExprKind::Logic {
                    op: *op,
                    operands: operands.iter().map(|e| self.lower_expr(e)).collect(),
                },
            ),
            ExprKind::Call { path, args } => {
                let (method, params) = match self.model.resolution(expr.aid) {
                    Some(resolved) => (
                        MethodRef::new(resolved.member_path()),
                        resolved.last().params.clone(),
                    ),
                    None => (MethodRef::new(path.clone()), Vec::new()),
                };
                IrExpr::new(
                    id,
                    IrExprKind::Call {
                        method,
                        args: self.lower_args(args, &params),
                    },
                )
            }
            ExprKind::Param(_) | ExprKind::Error => {
                IrExpr::new(id, IrExprKind::Literal(Literal::Null))
            }
        }
    }

    /// Lowers call arguments, converting Int arguments bound to Float
    /// parameters.
    fn lower_args(&self, args: &[Expr], params: &[CrispType]) -> Vec<IrExpr> {
        args.iter()
            .enumerate()
            .map(|(i, arg)| {
                let lowered = self.lower_expr(arg);
                let wants_float = params.get(i) == Some(&CrispType::Float);
                if wants_float && self.model.type_of(arg.aid) == CrispType::Int {
                    lowered.converted(CrispType::Float)
                } else {
                    lowered
                }
            })
            .collect()
    }
}

fn literal_count(expr: &Expr) -> u32 {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(n)) if *n >= 1 => *n as u32,
        // Checked upstream; a failed file still lowers.
        _ => 1,
    }
}

fn literal_seconds(expr: &Expr) -> f32 {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(n)) if *n > 0 => *n as f32,
        ExprKind::Literal(Literal::Float(f)) if *f > 0.0 => *f as f32,
        _ => 0.0,
    }
}
