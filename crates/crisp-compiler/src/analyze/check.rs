//! Top-down constraint validation: condition types, action return types,
//! argument assignability, structural constraints, reachability, and the
//! nullability advisories.

use std::collections::HashSet;

use crisp_core::{ContextType, CrispType, Nullability};
use crisp_ir::{BinaryOp, Literal};

use crate::ast::{Expr, ExprKind, Node, NodeKind, Program};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

use super::{ResolvedPath, SemanticModel, assignable};

/// Phase 3. Runs after `resolve`; consumes the model read-only.
pub fn check(
    program: &Program,
    model: &SemanticModel,
    schema: &dyn ContextType,
    diagnostics: &mut Diagnostics,
) {
    let mut checker = Checker {
        model,
        schema,
        diagnostics,
    };
    for tree in &program.trees {
        for node in &tree.body {
            checker.check_node(node);
        }
    }
}

struct Checker<'a> {
    model: &'a SemanticModel,
    schema: &'a dyn ContextType,
    diagnostics: &'a mut Diagnostics,
}

impl Checker<'_> {
    fn check_node(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Check(cond) => {
                self.require_bool(cond, DiagnosticKind::BoolRequired);
            }
            NodeKind::Guard { cond, .. }
            | NodeKind::If { cond, .. }
            | NodeKind::While { cond, .. } => {
                self.require_bool(cond, DiagnosticKind::BoolRequired);
            }
            NodeKind::Reactive { cond, .. } => {
                self.require_bool(cond, DiagnosticKind::ReactiveConditionType);
            }
            NodeKind::Action { args, .. } => {
                if let Some(resolved) = self.model.resolution(node.aid) {
                    let ret = resolved.result_type();
                    if ret.is_checkable()
                        && !matches!(ret, CrispType::BtStatus | CrispType::BtNode)
                    {
                        self.diagnostics
                            .report(DiagnosticKind::BtStatusRequired, node.origin.span)
                            .message(format!(
                                "action `{}` returns {ret}; actions must return BtStatus",
                                resolved.last().name
                            ))
                            .emit();
                    }
                    self.check_arguments(resolved, args);
                }
            }
            NodeKind::Repeat { count, .. } => self.require_repeat_count(count),
            NodeKind::Timeout { seconds, .. } | NodeKind::Cooldown { seconds, .. } => {
                self.require_duration(seconds);
            }
            _ => {}
        }

        if let NodeKind::If {
            otherwise: None, ..
        } = &node.kind
        {
            self.diagnostics
                .report(DiagnosticKind::IfWithoutElse, node.origin.span)
                .emit();
        }

        match &node.kind {
            NodeKind::Selector(children) => {
                self.require_children(node, children);
                self.check_reachability(children, true);
            }
            NodeKind::Sequence(children) => {
                self.require_children(node, children);
                self.check_reachability(children, false);
            }
            NodeKind::Parallel { children, .. } | NodeKind::ReactiveSelect(children) => {
                self.require_children(node, children);
            }
            _ => {}
        }

        for expr in node.exprs() {
            self.check_expr(expr);
        }
        for child in node.children() {
            self.check_node(child);
        }
    }

    fn require_bool(&mut self, expr: &Expr, kind: DiagnosticKind) {
        let ty = self.model.type_of(expr.aid);
        if ty.is_checkable() && ty != CrispType::Bool {
            self.diagnostics
                .report(kind, expr.origin.span)
                .message(format!("condition must be Bool, found {ty}"))
                .emit();
        }
    }

    fn require_repeat_count(&mut self, count: &Expr) {
        if self.model.type_of(count.aid).is_error() {
            return;
        }
        match &count.kind {
            ExprKind::Literal(Literal::Int(n)) if *n >= 1 => {}
            _ => {
                self.diagnostics
                    .report(DiagnosticKind::InvalidRepeatCount, count.origin.span)
                    .emit();
            }
        }
    }

    /// Timeout/cooldown seconds must be a positive numeric literal, even
    /// after template substitution.
    fn require_duration(&mut self, seconds: &Expr) {
        if self.model.type_of(seconds.aid).is_error() {
            return;
        }
        match &seconds.kind {
            ExprKind::Literal(Literal::Int(n)) if *n > 0 => {}
            ExprKind::Literal(Literal::Float(f)) if *f > 0.0 => {}
            _ => {
                self.diagnostics
                    .report(DiagnosticKind::InvalidDuration, seconds.origin.span)
                    .emit();
            }
        }
    }

    fn require_children(&mut self, node: &Node, children: &[Node]) {
        if children.is_empty() {
            self.diagnostics
                .report(DiagnosticKind::InsufficientChildren, node.origin.span)
                .message("this composite has no children")
                .emit();
        }
    }

    /// A statically-true check inside a selector (or statically-false check
    /// inside a sequence) makes the following sibling unreachable. One
    /// report per composite; scanning stops there.
    fn check_reachability(&mut self, children: &[Node], in_selector: bool) {
        for (index, child) in children.iter().enumerate() {
            let NodeKind::Check(cond) = &child.kind else {
                continue;
            };
            let ExprKind::Literal(Literal::Bool(value)) = &cond.kind else {
                continue;
            };
            let short_circuits = if in_selector { *value } else { !*value };
            if !short_circuits {
                continue;
            }
            if let Some(next) = children.get(index + 1) {
                self.diagnostics
                    .report(DiagnosticKind::UnreachableNode, next.origin.span)
                    .message(if in_selector {
                        "unreachable: a preceding check is always true"
                    } else {
                        "unreachable: a preceding check is always false"
                    })
                    .emit();
            }
            break;
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Member(_) | ExprKind::Blackboard(_) => {
                self.warn_null_dereference(expr);
            }
            ExprKind::Call { args, .. } => {
                self.warn_null_dereference(expr);
                if let Some(resolved) = self.model.resolution(expr.aid) {
                    self.check_arguments(resolved, args);
                }
                for arg in args {
                    self.check_expr(arg);
                }
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_equality() => {
                self.warn_vacuous_null_comparison(expr, *op, lhs, rhs);
                self.check_expr(lhs);
                self.check_expr(rhs);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs);
                self.check_expr(rhs);
            }
            ExprKind::Unary { operand, .. } => self.check_expr(operand),
            ExprKind::Logic { operands, .. } => {
                self.warn_duplicate_null_checks(operands);
                for operand in operands {
                    self.check_expr(operand);
                }
            }
            _ => {}
        }
    }

    fn check_arguments(&mut self, resolved: &ResolvedPath, args: &[Expr]) {
        let params = &resolved.last().params;
        for (param_ty, arg) in params.iter().zip(args) {
            let arg_ty = self.model.type_of(arg.aid);
            if !arg_ty.is_checkable() {
                continue;
            }
            if !assignable(self.schema, &arg_ty, param_ty) {
                self.diagnostics
                    .report(DiagnosticKind::ArgumentTypeMismatch, arg.origin.span)
                    .message(format!("expected {param_ty}, found {arg_ty}"))
                    .emit();
            }
        }
    }

    /// Navigating *through* a member annotated nullable may fault at runtime.
    fn warn_null_dereference(&mut self, expr: &Expr) {
        let Some(resolved) = self.model.resolution(expr.aid) else {
            return;
        };
        for segment in &resolved.segments[..resolved.segments.len().saturating_sub(1)] {
            if segment.nullable == Nullability::Annotated {
                self.diagnostics
                    .report(DiagnosticKind::DereferencePossiblyNull, expr.origin.span)
                    .message(format!("`{}` may be null here", segment.name))
                    .emit();
                return;
            }
        }
    }

    /// `== null` on a member declared non-nullable never holds.
    fn warn_vacuous_null_comparison(
        &mut self,
        expr: &Expr,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) {
        let (member, other) = if matches!(rhs.kind, ExprKind::Literal(Literal::Null)) {
            (lhs, rhs)
        } else if matches!(lhs.kind, ExprKind::Literal(Literal::Null)) {
            (rhs, lhs)
        } else {
            return;
        };
        debug_assert!(matches!(other.kind, ExprKind::Literal(Literal::Null)));

        let Some(resolved) = self.model.resolution(member.aid) else {
            return;
        };
        if resolved.last().nullable != Nullability::NotAnnotated {
            return;
        }
        let kind = if op == BinaryOp::Eq {
            DiagnosticKind::CompareNullAlwaysFalse
        } else {
            DiagnosticKind::CompareNullAlwaysTrue
        };
        self.diagnostics
            .report(kind, expr.origin.span)
            .message(format!(
                "`{}` is never null, so this comparison is vacuous",
                resolved.last().name
            ))
            .emit();
    }

    /// The same null test repeated inside one `and`/`or` chain.
    fn warn_duplicate_null_checks(&mut self, operands: &[Expr]) {
        let mut seen: HashSet<(String, bool)> = HashSet::new();
        for operand in operands {
            let ExprKind::Binary { op, lhs, rhs } = &operand.kind else {
                continue;
            };
            if !op.is_equality() {
                continue;
            }
            let member = if matches!(rhs.kind, ExprKind::Literal(Literal::Null)) {
                lhs
            } else if matches!(lhs.kind, ExprKind::Literal(Literal::Null)) {
                rhs
            } else {
                continue;
            };
            let (ExprKind::Member(path) | ExprKind::Blackboard(path)) = &member.kind else {
                continue;
            };
            let key = (path.to_string(), *op == BinaryOp::Eq);
            if !seen.insert(key) {
                self.diagnostics
                    .report(DiagnosticKind::NullCheckUnnecessary, operand.origin.span)
                    .message(format!("`{path}` was already tested against null"))
                    .emit();
            }
        }
    }
}
