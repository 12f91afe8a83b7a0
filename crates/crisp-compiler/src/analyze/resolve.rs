//! Name resolution against the context-type descriptor.
//!
//! DSL member names are matched candidate-first: the written segment, then
//! its kebab-to-PascalCase, kebab-to-camelCase, `_`-prefixed camelCase, and
//! kebab-to-snake_case renderings, each compared case-insensitively against
//! every member of the current type. The first candidate with a match wins;
//! a later candidate matching a *different* member is an ambiguity warning.

use std::collections::HashSet;

use rowan::TextRange;

use crisp_core::{ContextType, CrispType, MemberInfo, split_generic};
use crisp_ir::Literal;

use crate::ast::{Expr, ExprKind, Node, NodeKind, Program, Tree};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

use super::{ResolvedPath, ResolvedSegment, SemanticModel};

pub(super) fn resolve_program(
    program: &Program,
    schema: &dyn ContextType,
    model: &mut SemanticModel,
    diagnostics: &mut Diagnostics,
) {
    let mut resolver = Resolver {
        schema,
        model,
        diagnostics,
        validated_types: HashSet::new(),
    };
    resolver.validate_context();
    resolver.collect_trees(program);
    for tree in &program.trees {
        resolver.resolve_tree(tree);
    }
}

struct Resolver<'a> {
    schema: &'a dyn ContextType,
    model: &'a mut SemanticModel,
    diagnostics: &'a mut Diagnostics,
    /// Custom type references already validated for generic arity/constraints.
    validated_types: HashSet<String>,
}

impl Resolver<'_> {
    fn validate_context(&mut self) {
        let context = self.schema.context_type().to_string();
        let (base, args) = split_generic(&context);
        let params = self.schema.type_params(base);
        if !params.is_empty() && args.is_empty() {
            self.diagnostics
                .report(
                    DiagnosticKind::OpenGenericUsedAsContext,
                    TextRange::empty(0.into()),
                )
                .message(format!(
                    "context type `{base}` declares type parameters but none were supplied"
                ))
                .emit();
            return;
        }
        self.validate_type_ref(&context, TextRange::empty(0.into()));
    }

    /// Arity and constraint validation of a custom type reference.
    fn validate_type_ref(&mut self, ty: &str, span: TextRange) {
        if !self.validated_types.insert(ty.to_string()) {
            return;
        }
        let (base, args) = split_generic(ty);
        if !self.schema.contains(base) {
            return;
        }
        let params = self.schema.type_params(base);
        if args.len() != params.len() {
            self.diagnostics
                .report(DiagnosticKind::TypeArgumentCountMismatch, span)
                .message(format!(
                    "`{base}` takes {} type argument(s), got {}",
                    params.len(),
                    args.len()
                ))
                .emit();
            return;
        }
        for (param, arg) in params.iter().zip(&args) {
            if let Some(constraint) = &param.constraint
                && !self.schema.is_assignable(arg, constraint)
            {
                self.diagnostics
                    .report(DiagnosticKind::TypeArgumentConstraintViolation, span)
                    .message(format!(
                        "type argument `{arg}` does not satisfy the `{constraint}` constraint on `{}`",
                        param.name
                    ))
                    .emit();
            }
        }
    }

    fn collect_trees(&mut self, program: &Program) {
        for tree in &program.trees {
            if let Some(previous) = self.model.trees.insert(tree.name.clone(), tree.origin) {
                // The later definition shadows this one entirely.
                self.diagnostics
                    .report(DiagnosticKind::UnusedTree, previous.span)
                    .message(format!(
                        "tree `{}` is shadowed by a later definition",
                        tree.name
                    ))
                    .emit();
            }
        }
    }

    fn resolve_tree(&mut self, tree: &Tree) {
        if let Some(blackboard) = &tree.blackboard
            && !self.schema.contains(blackboard)
        {
            self.diagnostics
                .report(DiagnosticKind::MissingInterface, tree.origin.span)
                .message(format!(
                    "blackboard type `{blackboard}` is not in the context schema"
                ))
                .emit();
        }
        for node in &tree.body {
            self.resolve_node(node, tree);
        }
    }

    fn resolve_node(&mut self, node: &Node, tree: &Tree) {
        if let NodeKind::Action { path, args } = &node.kind {
            let root = self.schema.context_type().to_string();
            if let Some(resolved) =
                self.resolve_path(&root, path, Some(args.len()), node.origin.span, false)
            {
                self.model.set_resolution(node.aid, resolved);
            }
        }
        for expr in node.exprs() {
            self.resolve_expr(expr, tree);
        }
        for child in node.children() {
            self.resolve_node(child, tree);
        }
    }

    fn resolve_expr(&mut self, expr: &Expr, tree: &Tree) {
        match &expr.kind {
            ExprKind::Member(path) => {
                let root = self.schema.context_type().to_string();
                if let Some(resolved) =
                    self.resolve_path(&root, path, None, expr.origin.span, false)
                {
                    self.model.set_resolution(expr.aid, resolved);
                }
            }
            ExprKind::Blackboard(path) => match &tree.blackboard {
                Some(root) => {
                    let root = root.clone();
                    if let Some(resolved) =
                        self.resolve_path(&root, path, None, expr.origin.span, true)
                    {
                        self.model.set_resolution(expr.aid, resolved);
                    }
                }
                None => {
                    self.diagnostics
                        .report(DiagnosticKind::MissingInterface, expr.origin.span)
                        .message(format!(
                            "tree `{}` declares no `:blackboard` type",
                            tree.name
                        ))
                        .emit();
                }
            },
            ExprKind::Call { path, args } => {
                let root = self.schema.context_type().to_string();
                if let Some(resolved) =
                    self.resolve_path(&root, path, Some(args.len()), expr.origin.span, false)
                {
                    self.model.set_resolution(expr.aid, resolved);
                }
                for arg in args {
                    self.resolve_expr(arg, tree);
                }
                return;
            }
            ExprKind::Literal(Literal::Enum { ty, member }) => {
                self.resolve_enum_literal(ty, member, expr.origin.span);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs, tree);
                self.resolve_expr(rhs, tree);
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand, tree),
            ExprKind::Logic { operands, .. } => {
                for operand in operands {
                    self.resolve_expr(operand, tree);
                }
            }
            _ => {}
        }
    }

    fn resolve_enum_literal(&mut self, ty: &str, member: &str, span: TextRange) {
        if !self.schema.contains(ty) {
            self.diagnostics
                .report(DiagnosticKind::EnumTypeNotFound, span)
                .message(format!("no enum type `{ty}` in the context schema"))
                .emit();
            return;
        }
        let Some(values) = self.schema.enum_members(ty) else {
            self.diagnostics
                .report(DiagnosticKind::EnumTypeNotFound, span)
                .message(format!("`{ty}` is not an enum type"))
                .emit();
            return;
        };
        if !values.iter().any(|v| v.eq_ignore_ascii_case(member)) {
            self.diagnostics
                .report(DiagnosticKind::EnumMemberNotFound, span)
                .message(format!("enum `{ty}` has no member `{member}`"))
                .emit();
        }
    }

    /// Resolves a member path starting at `root_ty`. `call` carries the
    /// argument count for call sites; data accesses pass `None`.
    fn resolve_path(
        &mut self,
        root_ty: &str,
        path: &crisp_core::MemberPath,
        call: Option<usize>,
        span: TextRange,
        blackboard: bool,
    ) -> Option<ResolvedPath> {
        let mut current_ty = root_ty.to_string();
        let mut segments = Vec::new();

        for (index, segment) in path.iter().enumerate() {
            let is_final = index + 1 == path.len();
            let members = self.schema.members(&current_ty);
            if members.is_empty() && !self.schema.contains(&current_ty) {
                self.diagnostics
                    .report(DiagnosticKind::MemberNotFound, span)
                    .message(format!("`{current_ty}` has no member `{segment}`"))
                    .emit();
                return None;
            }

            let Some(member) = self.match_candidates(&members, segment, span) else {
                self.diagnostics
                    .report(DiagnosticKind::MemberNotFound, span)
                    .message(format!("no member `{segment}` on `{current_ty}`"))
                    .emit();
                return None;
            };

            if let Some(message) = &member.obsolete {
                self.diagnostics
                    .report(DiagnosticKind::ObsoleteMember, span)
                    .message(format!("`{}` is obsolete: {message}", member.name))
                    .emit();
            }

            if !is_final {
                if member.is_method() {
                    self.diagnostics
                        .report(DiagnosticKind::MemberNotFound, span)
                        .message(format!(
                            "`{}` is a method; only properties and fields can be navigated",
                            member.name
                        ))
                        .emit();
                    return None;
                }
                if let CrispType::Custom(name) = &member.ty {
                    self.validate_type_ref(name, span);
                }
                segments.push(segment_info(&member));
                current_ty = type_name(&member.ty);
                continue;
            }

            match call {
                None => {
                    if member.is_method() {
                        self.diagnostics
                            .report(DiagnosticKind::MemberNotFound, span)
                            .message(format!(
                                "`{}` is a method; expected a property or field",
                                member.name
                            ))
                            .emit();
                        return None;
                    }
                    if let CrispType::Custom(name) = &member.ty {
                        self.validate_type_ref(name, span);
                    }
                    segments.push(segment_info(&member));
                }
                Some(arg_count) => {
                    let chosen =
                        self.select_overload(&members, &member, arg_count, span)?;
                    segments.push(segment_info(&chosen));
                }
            }
        }

        Some(ResolvedPath {
            segments,
            blackboard,
        })
    }

    /// Candidate-priority matching. The written segment is tried first, then
    /// its conventional renderings; all comparisons ignore ASCII case.
    fn match_candidates(
        &mut self,
        members: &[MemberInfo],
        segment: &str,
        span: TextRange,
    ) -> Option<MemberInfo> {
        let mut chosen: Option<&MemberInfo> = None;
        let mut warned = false;
        for candidate in candidates(segment) {
            // An exact match beats a case-insensitive one within a candidate,
            // so `IsAlive` wins for the PascalCase rendering even when a
            // camelCase twin is declared first.
            let hit = members
                .iter()
                .find(|m| m.name == candidate)
                .or_else(|| {
                    members
                        .iter()
                        .find(|m| m.name.eq_ignore_ascii_case(&candidate))
                });
            let Some(member) = hit else { continue };
            match chosen {
                None => chosen = Some(member),
                Some(kept) if kept.name != member.name && !warned => {
                    self.diagnostics
                        .report(DiagnosticKind::AmbiguousMemberName, span)
                        .message(format!(
                            "`{segment}` matches both `{}` and `{}`; using `{}`",
                            kept.name, member.name, kept.name
                        ))
                        .emit();
                    warned = true;
                }
                Some(_) => {}
            }
        }
        chosen.cloned()
    }

    /// Overload selection by argument count among methods sharing the
    /// matched name.
    fn select_overload(
        &mut self,
        members: &[MemberInfo],
        matched: &MemberInfo,
        arg_count: usize,
        span: TextRange,
    ) -> Option<MemberInfo> {
        let overloads: Vec<&MemberInfo> = members
            .iter()
            .filter(|m| m.name == matched.name && m.is_method())
            .collect();
        if overloads.is_empty() {
            self.diagnostics
                .report(DiagnosticKind::MemberNotFound, span)
                .message(format!("`{}` is not a method", matched.name))
                .emit();
            return None;
        }

        let fitting: Vec<&&MemberInfo> = overloads
            .iter()
            .filter(|m| m.params.len() == arg_count)
            .collect();
        match fitting.len() {
            0 => {
                let counts: Vec<String> =
                    overloads.iter().map(|m| m.params.len().to_string()).collect();
                self.diagnostics
                    .report(DiagnosticKind::ArgumentCountMismatch, span)
                    .message(format!(
                        "`{}` takes {} argument(s), got {arg_count}",
                        matched.name,
                        counts.join(" or ")
                    ))
                    .emit();
                None
            }
            1 => Some((*fitting[0]).clone()),
            _ => {
                self.diagnostics
                    .report(DiagnosticKind::AmbiguousOverload, span)
                    .message(format!(
                        "`{}` has {} overloads taking {arg_count} argument(s)",
                        matched.name,
                        fitting.len()
                    ))
                    .emit();
                Some((*fitting[0]).clone())
            }
        }
    }
}

fn segment_info(member: &MemberInfo) -> ResolvedSegment {
    ResolvedSegment {
        name: member.name.clone(),
        kind: member.kind,
        ty: member.ty.clone(),
        nullable: member.nullable,
        params: member.params.iter().map(|p| p.ty.clone()).collect(),
    }
}

fn type_name(ty: &CrispType) -> String {
    match ty {
        CrispType::Custom(name) => name.clone(),
        other => other.to_string(),
    }
}

/// Candidate renderings in priority order, deduplicated.
pub(crate) fn candidates(segment: &str) -> Vec<String> {
    let words: Vec<&str> = segment.split('-').filter(|w| !w.is_empty()).collect();
    let pascal: String = words.iter().map(|w| capitalize(w)).collect();
    let camel = decapitalize(&pascal);

    let raw = [
        segment.to_string(),
        pascal.clone(),
        camel.clone(),
        format!("_{camel}"),
        words.join("_").to_lowercase(),
    ];
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for candidate in raw {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn decapitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
