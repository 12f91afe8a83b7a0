//! Bottom-up type inference over AST expressions.
//!
//! The cascade rule: if any direct subexpression is `Error`-typed, the
//! parent is `Error` and no additional diagnostic is emitted for it. The
//! one diagnostic at the root cause is all the user sees.

use crisp_core::{ContextType, CrispType};
use crisp_ir::{BinaryOp, Literal, UnaryOp};

use crate::ast::{Expr, ExprKind, Node, Program};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

use super::SemanticModel;

pub(super) fn infer_program(
    program: &Program,
    schema: &dyn ContextType,
    model: &mut SemanticModel,
    diagnostics: &mut Diagnostics,
) {
    let mut inferencer = Inferencer {
        schema,
        model,
        diagnostics,
    };
    for tree in &program.trees {
        for node in &tree.body {
            inferencer.infer_node(node);
        }
    }
}

struct Inferencer<'a> {
    schema: &'a dyn ContextType,
    model: &'a mut SemanticModel,
    diagnostics: &'a mut Diagnostics,
}

impl Inferencer<'_> {
    fn infer_node(&mut self, node: &Node) {
        for expr in node.exprs() {
            self.infer_expr(expr);
        }
        for child in node.children() {
            self.infer_node(child);
        }
    }

    fn infer_expr(&mut self, expr: &Expr) -> CrispType {
        let ty = self.infer_expr_kind(expr);
        self.model.set_type(expr.aid, ty.clone());
        ty
    }

    fn infer_expr_kind(&mut self, expr: &Expr) -> CrispType {
        match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Int(_) => CrispType::Int,
                Literal::Float(_) => CrispType::Float,
                Literal::Bool(_) => CrispType::Bool,
                Literal::Str(_) => CrispType::String,
                Literal::Null => CrispType::Null,
                Literal::Enum { ty, .. } => {
                    if self.schema.enum_members(ty).is_some() {
                        CrispType::Custom(ty.clone())
                    } else {
                        // Resolution already reported the unknown enum.
                        CrispType::Error
                    }
                }
            },
            ExprKind::Member(_) | ExprKind::Blackboard(_) => {
                match self.model.resolution(expr.aid) {
                    Some(resolved) => resolved.result_type(),
                    None => CrispType::Error,
                }
            }
            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.infer_expr(arg);
                }
                match self.model.resolution(expr.aid) {
                    Some(resolved) => resolved.result_type(),
                    None => CrispType::Error,
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lt = self.infer_expr(lhs);
                let rt = self.infer_expr(rhs);
                self.infer_binary(expr, *op, lt, rt)
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.infer_expr(operand);
                match op {
                    UnaryOp::Not => {
                        if ty.is_error() {
                            CrispType::Error
                        } else {
                            CrispType::Bool
                        }
                    }
                    UnaryOp::Neg => {
                        if !ty.is_checkable() {
                            ty
                        } else if ty.is_numeric() {
                            ty
                        } else {
                            self.diagnostics
                                .report(DiagnosticKind::InvalidArithmetic, expr.origin.span)
                                .message(format!("cannot negate a {ty} value"))
                                .emit();
                            CrispType::Error
                        }
                    }
                }
            }
            ExprKind::Logic { operands, .. } => {
                let mut any_error = false;
                for operand in operands {
                    if self.infer_expr(operand).is_error() {
                        any_error = true;
                    }
                }
                if any_error {
                    CrispType::Error
                } else {
                    CrispType::Bool
                }
            }
            ExprKind::Param(_) => CrispType::Error,
            ExprKind::Error => CrispType::Error,
        }
    }

    fn infer_binary(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        lt: CrispType,
        rt: CrispType,
    ) -> CrispType {
        if lt.is_error() || rt.is_error() {
            return CrispType::Error;
        }

        if op.is_arithmetic() {
            if lt.is_unknown() || rt.is_unknown() {
                return CrispType::Unknown;
            }
            if lt.is_numeric() && rt.is_numeric() {
                return if lt == CrispType::Float || rt == CrispType::Float {
                    CrispType::Float
                } else {
                    CrispType::Int
                };
            }
            self.diagnostics
                .report(DiagnosticKind::InvalidArithmetic, expr.origin.span)
                .message(format!(
                    "`{}` requires numeric operands, found {lt} and {rt}",
                    op.symbol()
                ))
                .emit();
            return CrispType::Error;
        }

        if op.is_ordering() {
            if lt.is_unknown() || rt.is_unknown() {
                return CrispType::Bool;
            }
            if (lt.is_numeric() && rt.is_numeric()) || lt == rt {
                return CrispType::Bool;
            }
            self.diagnostics
                .report(DiagnosticKind::CannotCompare, expr.origin.span)
                .message(format!("cannot compare {lt} with {rt}"))
                .emit();
            return CrispType::Error;
        }

        // Equality: any two values compare; nullability advisories are the
        // checker's concern.
        CrispType::Bool
    }
}
