//! Defdec/defmacro expansion.
//!
//! Runs on the owned AST before name resolution. Decorator calls
//! `(name arg* child)` and macro calls `(name arg*)` are replaced by clones
//! of the definition body with `<body>` and parameter references
//! substituted. Cloned nodes take the *call site's* origin so diagnostics
//! point at call sites; substituted arguments keep their own origins.
//!
//! Arguments are expanded before instantiation, so the expanding-name set
//! only ever sees calls that come from definition bodies - nested calls of
//! the same template in user source are not misreported as recursion.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::diagnostics::{DiagnosticKind, Diagnostics};

use super::{
    AstId, AstOrigin, Expr, ExprKind, Node, NodeKind, Program, Template, TemplateArg,
    TemplateKind,
};

/// Hard bound on nested template instantiations; guarantees termination.
pub const MAX_EXPANSION_DEPTH: u32 = 128;

/// Expands every template call in `program`'s trees. `extra_templates` come
/// from imported files; local definitions shadow them.
pub fn expand(program: &mut Program, extra_templates: &[Template], diagnostics: &mut Diagnostics) {
    validate_definitions(program, diagnostics);

    let mut templates: IndexMap<String, Template> = IndexMap::new();
    for template in extra_templates.iter().chain(program.templates.iter()) {
        templates.insert(template.name.clone(), template.clone());
    }

    let mut expander = Expander {
        templates,
        diagnostics,
        next_aid: program.next_aid,
        expanding: Vec::new(),
    };

    let trees = std::mem::take(&mut program.trees);
    program.trees = trees
        .into_iter()
        .map(|mut tree| {
            tree.body = tree
                .body
                .into_iter()
                .map(|node| {
                    let node = expander.expand_node(node, 0);
                    expander.reject_leftovers(node)
                })
                .collect();
            tree
        })
        .collect();
    program.next_aid = expander.next_aid;
}

fn validate_definitions(program: &Program, diagnostics: &mut Diagnostics) {
    for template in &program.templates {
        let placeholders = count_placeholders(&template.body);
        match template.kind {
            TemplateKind::Decorator => {
                if placeholders == 0 {
                    diagnostics
                        .report(DiagnosticKind::MissingBodyPlaceholder, template.origin.span)
                        .message(format!("defdec `{}` never uses `<body>`", template.name))
                        .emit();
                } else if placeholders > 1 {
                    diagnostics
                        .report(
                            DiagnosticKind::MultipleBodyPlaceholders,
                            template.origin.span,
                        )
                        .message(format!(
                            "defdec `{}` uses `<body>` {placeholders} times",
                            template.name
                        ))
                        .emit();
                }
            }
            TemplateKind::Macro => {
                if placeholders > 0 {
                    diagnostics
                        .report(DiagnosticKind::InvalidMacroExpansion, template.origin.span)
                        .message(format!(
                            "defmacro `{}` cannot use `<body>`",
                            template.name
                        ))
                        .emit();
                }
            }
        }
    }
}

fn count_placeholders(node: &Node) -> usize {
    let own = usize::from(matches!(node.kind, NodeKind::Placeholder));
    own + node
        .children()
        .iter()
        .map(|c| count_placeholders(c))
        .sum::<usize>()
}

struct Expander<'d> {
    templates: IndexMap<String, Template>,
    diagnostics: &'d mut Diagnostics,
    next_aid: u32,
    /// Names currently being instantiated, for recursion detection.
    expanding: Vec<String>,
}

impl Expander<'_> {
    fn fresh_aid(&mut self) -> AstId {
        let aid = AstId(self.next_aid);
        self.next_aid += 1;
        aid
    }

    fn error_node(&mut self, origin: AstOrigin) -> Node {
        Node {
            aid: self.fresh_aid(),
            origin,
            kind: NodeKind::Error,
        }
    }

    fn expand_node(&mut self, node: Node, depth: u32) -> Node {
        let Node { aid, origin, kind } = node;
        let kind = match kind {
            NodeKind::TemplateCall { name, args } => {
                return self.expand_call(origin, &name, args, depth);
            }
            NodeKind::Selector(children) => {
                NodeKind::Selector(self.expand_all(children, depth))
            }
            NodeKind::Sequence(children) => {
                NodeKind::Sequence(self.expand_all(children, depth))
            }
            NodeKind::ReactiveSelect(children) => {
                NodeKind::ReactiveSelect(self.expand_all(children, depth))
            }
            NodeKind::Parallel { policy, children } => NodeKind::Parallel {
                policy,
                children: self.expand_all(children, depth),
            },
            NodeKind::Guard { cond, body } => NodeKind::Guard {
                cond,
                body: Box::new(self.expand_node(*body, depth)),
            },
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => NodeKind::If {
                cond,
                then: Box::new(self.expand_node(*then, depth)),
                otherwise: otherwise.map(|n| Box::new(self.expand_node(*n, depth))),
            },
            NodeKind::Invert(child) => {
                NodeKind::Invert(Box::new(self.expand_node(*child, depth)))
            }
            NodeKind::Repeat { count, child } => NodeKind::Repeat {
                count,
                child: Box::new(self.expand_node(*child, depth)),
            },
            NodeKind::Timeout { seconds, child } => NodeKind::Timeout {
                seconds,
                child: Box::new(self.expand_node(*child, depth)),
            },
            NodeKind::Cooldown { seconds, child } => NodeKind::Cooldown {
                seconds,
                child: Box::new(self.expand_node(*child, depth)),
            },
            NodeKind::While { cond, body } => NodeKind::While {
                cond,
                body: Box::new(self.expand_node(*body, depth)),
            },
            NodeKind::Reactive { cond, body } => NodeKind::Reactive {
                cond,
                body: Box::new(self.expand_node(*body, depth)),
            },
            other => other,
        };
        Node { aid, origin, kind }
    }

    fn expand_all(&mut self, nodes: Vec<Node>, depth: u32) -> Vec<Node> {
        nodes
            .into_iter()
            .map(|n| self.expand_node(n, depth))
            .collect()
    }

    fn expand_call(
        &mut self,
        origin: AstOrigin,
        name: &str,
        args: Vec<TemplateArg>,
        depth: u32,
    ) -> Node {
        if depth >= MAX_EXPANSION_DEPTH {
            self.diagnostics
                .report(DiagnosticKind::MacroDepthExceeded, origin.span)
                .message(format!(
                    "expansion of `{name}` exceeds the depth bound of {MAX_EXPANSION_DEPTH}"
                ))
                .emit();
            return self.error_node(origin);
        }

        let has_node_arg = args.iter().any(|a| matches!(a, TemplateArg::Node(_)));
        let Some(template) = self.templates.get(name).cloned() else {
            let kind = if has_node_arg {
                DiagnosticKind::DefdecNotFound
            } else {
                DiagnosticKind::MacroNotFound
            };
            self.diagnostics
                .report(kind, origin.span)
                .message(format!("no decorator or macro named `{name}`"))
                .emit();
            return self.error_node(origin);
        };

        if self.expanding.iter().any(|n| n == name) {
            let kind = match template.kind {
                TemplateKind::Decorator => DiagnosticKind::RecursiveDefdec,
                TemplateKind::Macro => DiagnosticKind::RecursiveMacro,
            };
            self.diagnostics
                .report(kind, origin.span)
                .message(format!("`{name}` expands itself"))
                .emit();
            return self.error_node(origin);
        }

        let Some((exprs, body_arg)) = self.split_args(&template, origin, args, depth) else {
            return self.error_node(origin);
        };

        let substitution: HashMap<&str, &Expr> = template
            .params
            .iter()
            .map(String::as_str)
            .zip(exprs.iter())
            .collect();

        let mut body_slot = body_arg;
        let clone = self.instantiate(&template.body, origin, &substitution, &mut body_slot);

        self.expanding.push(name.to_string());
        let expanded = self.expand_node(clone, depth + 1);
        self.expanding.pop();
        expanded
    }

    /// Splits call arguments into parameter expressions and the body node.
    /// Zero-argument actions like `.Speed` double as member expressions when
    /// a parameter slot still wants one.
    fn split_args(
        &mut self,
        template: &Template,
        origin: AstOrigin,
        args: Vec<TemplateArg>,
        depth: u32,
    ) -> Option<(Vec<Expr>, Option<Node>)> {
        let mut exprs = Vec::new();
        let mut body: Option<Node> = None;
        let mut extra_nodes = 0usize;

        for arg in args {
            match arg {
                TemplateArg::Expr(e) => exprs.push(e),
                TemplateArg::Node(n) => {
                    if exprs.len() < template.params.len()
                        && body.is_none()
                        && let NodeKind::Action { path, args } = &n.kind
                        && args.is_empty()
                    {
                        exprs.push(Expr {
                            aid: n.aid,
                            origin: n.origin,
                            kind: ExprKind::Member(path.clone()),
                        });
                        continue;
                    }
                    if body.is_none() {
                        body = Some(n);
                    } else {
                        extra_nodes += 1;
                    }
                }
            }
        }

        let (count_kind, name) = match template.kind {
            TemplateKind::Decorator => (DiagnosticKind::DefdecParamCountMismatch, &template.name),
            TemplateKind::Macro => (DiagnosticKind::MacroArgCountMismatch, &template.name),
        };

        if exprs.len() != template.params.len() {
            self.diagnostics
                .report(count_kind, origin.span)
                .message(format!(
                    "`{name}` takes {} argument(s), got {}",
                    template.params.len(),
                    exprs.len()
                ))
                .emit();
            return None;
        }

        match template.kind {
            TemplateKind::Decorator => {
                if body.is_none() {
                    self.diagnostics
                        .report(count_kind, origin.span)
                        .message(format!("decorator `{name}` needs a child node"))
                        .emit();
                    return None;
                }
                if extra_nodes > 0 {
                    self.diagnostics
                        .report(count_kind, origin.span)
                        .message(format!("decorator `{name}` takes exactly one child node"))
                        .emit();
                    return None;
                }
            }
            TemplateKind::Macro => {
                if body.is_some() {
                    self.diagnostics
                        .report(DiagnosticKind::InvalidMacroExpansion, origin.span)
                        .message(format!("macro `{name}` cannot take a child node"))
                        .emit();
                    return None;
                }
            }
        }

        // The body argument comes from the call site; templates inside it
        // expand under the current depth, outside the expanding set.
        let body = body.map(|n| self.expand_node(n, depth));
        Some((exprs, body))
    }

    /// Structural clone of the definition body. Cloned nodes take the call
    /// site's origin; substituted arguments keep theirs.
    fn instantiate(
        &mut self,
        node: &Node,
        call_origin: AstOrigin,
        substitution: &HashMap<&str, &Expr>,
        body: &mut Option<Node>,
    ) -> Node {
        if matches!(node.kind, NodeKind::Placeholder) {
            return match body.take() {
                Some(n) => n,
                // Definition errors were reported up front.
                None => self.error_node(call_origin),
            };
        }

        let kind = match &node.kind {
            NodeKind::Selector(children) => NodeKind::Selector(
                children
                    .iter()
                    .map(|c| self.instantiate(c, call_origin, substitution, body))
                    .collect(),
            ),
            NodeKind::Sequence(children) => NodeKind::Sequence(
                children
                    .iter()
                    .map(|c| self.instantiate(c, call_origin, substitution, body))
                    .collect(),
            ),
            NodeKind::ReactiveSelect(children) => NodeKind::ReactiveSelect(
                children
                    .iter()
                    .map(|c| self.instantiate(c, call_origin, substitution, body))
                    .collect(),
            ),
            NodeKind::Parallel { policy, children } => NodeKind::Parallel {
                policy: *policy,
                children: children
                    .iter()
                    .map(|c| self.instantiate(c, call_origin, substitution, body))
                    .collect(),
            },
            NodeKind::Check(e) => NodeKind::Check(self.subst_expr(e, call_origin, substitution)),
            NodeKind::Guard { cond, body: b } => NodeKind::Guard {
                cond: self.subst_expr(cond, call_origin, substitution),
                body: Box::new(self.instantiate(b, call_origin, substitution, body)),
            },
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => NodeKind::If {
                cond: self.subst_expr(cond, call_origin, substitution),
                then: Box::new(self.instantiate(then, call_origin, substitution, body)),
                otherwise: otherwise
                    .as_ref()
                    .map(|n| Box::new(self.instantiate(n, call_origin, substitution, body))),
            },
            NodeKind::Invert(child) => NodeKind::Invert(Box::new(self.instantiate(
                child,
                call_origin,
                substitution,
                body,
            ))),
            NodeKind::Repeat { count, child } => NodeKind::Repeat {
                count: self.subst_expr(count, call_origin, substitution),
                child: Box::new(self.instantiate(child, call_origin, substitution, body)),
            },
            NodeKind::Timeout { seconds, child } => NodeKind::Timeout {
                seconds: self.subst_expr(seconds, call_origin, substitution),
                child: Box::new(self.instantiate(child, call_origin, substitution, body)),
            },
            NodeKind::Cooldown { seconds, child } => NodeKind::Cooldown {
                seconds: self.subst_expr(seconds, call_origin, substitution),
                child: Box::new(self.instantiate(child, call_origin, substitution, body)),
            },
            NodeKind::While { cond, body: b } => NodeKind::While {
                cond: self.subst_expr(cond, call_origin, substitution),
                body: Box::new(self.instantiate(b, call_origin, substitution, body)),
            },
            NodeKind::Reactive { cond, body: b } => NodeKind::Reactive {
                cond: self.subst_expr(cond, call_origin, substitution),
                body: Box::new(self.instantiate(b, call_origin, substitution, body)),
            },
            NodeKind::Ref(name) => NodeKind::Ref(name.clone()),
            NodeKind::Action { path, args } => NodeKind::Action {
                path: path.clone(),
                args: args
                    .iter()
                    .map(|a| self.subst_expr(a, call_origin, substitution))
                    .collect(),
            },
            NodeKind::TemplateCall { name, args } => NodeKind::TemplateCall {
                name: name.clone(),
                args: args
                    .iter()
                    .map(|a| match a {
                        TemplateArg::Expr(e) => {
                            TemplateArg::Expr(self.subst_expr(e, call_origin, substitution))
                        }
                        TemplateArg::Node(n) => TemplateArg::Node(self.instantiate(
                            n,
                            call_origin,
                            substitution,
                            body,
                        )),
                    })
                    .collect(),
            },
            NodeKind::Placeholder => unreachable!("handled above"),
            NodeKind::Error => NodeKind::Error,
        };

        Node {
            aid: self.fresh_aid(),
            origin: call_origin,
            kind,
        }
    }

    /// Clones a definition expression, replacing parameter references by the
    /// call's arguments (re-identified so instance ids stay unique).
    fn subst_expr(
        &mut self,
        expr: &Expr,
        call_origin: AstOrigin,
        substitution: &HashMap<&str, &Expr>,
    ) -> Expr {
        if let ExprKind::Param(name) = &expr.kind
            && let Some(arg) = substitution.get(name.as_str())
        {
            return self.refresh_expr((*arg).clone());
        }

        let kind = match &expr.kind {
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: *op,
                lhs: Box::new(self.subst_expr(lhs, call_origin, substitution)),
                rhs: Box::new(self.subst_expr(rhs, call_origin, substitution)),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: Box::new(self.subst_expr(operand, call_origin, substitution)),
            },
            ExprKind::Logic { op, operands } => ExprKind::Logic {
                op: *op,
                operands: operands
                    .iter()
                    .map(|e| self.subst_expr(e, call_origin, substitution))
                    .collect(),
            },
            ExprKind::Call { path, args } => ExprKind::Call {
                path: path.clone(),
                args: args
                    .iter()
                    .map(|e| self.subst_expr(e, call_origin, substitution))
                    .collect(),
            },
            other => other.clone(),
        };

        Expr {
            aid: self.fresh_aid(),
            origin: call_origin,
            kind,
        }
    }

    /// Fresh instance ids for a substituted argument (a parameter may be
    /// referenced more than once). Origins are kept: the argument is real
    /// call-site text.
    fn refresh_expr(&mut self, expr: Expr) -> Expr {
        let Expr { origin, kind, .. } = expr;
        let kind = match kind {
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: Box::new(self.refresh_expr(*lhs)),
                rhs: Box::new(self.refresh_expr(*rhs)),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: Box::new(self.refresh_expr(*operand)),
            },
            ExprKind::Logic { op, operands } => ExprKind::Logic {
                op,
                operands: operands.into_iter().map(|e| self.refresh_expr(e)).collect(),
            },
            ExprKind::Call { path, args } => ExprKind::Call {
                path,
                args: args.into_iter().map(|e| self.refresh_expr(e)).collect(),
            },
            other => other,
        };
        Expr {
            aid: self.fresh_aid(),
            origin,
            kind,
        }
    }

    /// Replaces stray `<body>` placeholders and unsubstituted parameter
    /// references left in tree bodies after expansion.
    fn reject_leftovers(&mut self, node: Node) -> Node {
        let Node { aid, origin, kind } = node;
        if matches!(kind, NodeKind::Placeholder) {
            self.diagnostics
                .report(DiagnosticKind::InvalidMacroExpansion, origin.span)
                .message("`<body>` is only allowed inside a defdec body")
                .emit();
            return Node {
                aid,
                origin,
                kind: NodeKind::Error,
            };
        }

        let kind = match kind {
            NodeKind::Selector(c) => {
                NodeKind::Selector(c.into_iter().map(|n| self.reject_leftovers(n)).collect())
            }
            NodeKind::Sequence(c) => {
                NodeKind::Sequence(c.into_iter().map(|n| self.reject_leftovers(n)).collect())
            }
            NodeKind::ReactiveSelect(c) => NodeKind::ReactiveSelect(
                c.into_iter().map(|n| self.reject_leftovers(n)).collect(),
            ),
            NodeKind::Parallel { policy, children } => NodeKind::Parallel {
                policy,
                children: children
                    .into_iter()
                    .map(|n| self.reject_leftovers(n))
                    .collect(),
            },
            NodeKind::Check(e) => NodeKind::Check(self.reject_param(e)),
            NodeKind::Guard { cond, body } => NodeKind::Guard {
                cond: self.reject_param(cond),
                body: Box::new(self.reject_leftovers(*body)),
            },
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => NodeKind::If {
                cond: self.reject_param(cond),
                then: Box::new(self.reject_leftovers(*then)),
                otherwise: otherwise.map(|n| Box::new(self.reject_leftovers(*n))),
            },
            NodeKind::Invert(child) => {
                NodeKind::Invert(Box::new(self.reject_leftovers(*child)))
            }
            NodeKind::Repeat { count, child } => NodeKind::Repeat {
                count: self.reject_param(count),
                child: Box::new(self.reject_leftovers(*child)),
            },
            NodeKind::Timeout { seconds, child } => NodeKind::Timeout {
                seconds: self.reject_param(seconds),
                child: Box::new(self.reject_leftovers(*child)),
            },
            NodeKind::Cooldown { seconds, child } => NodeKind::Cooldown {
                seconds: self.reject_param(seconds),
                child: Box::new(self.reject_leftovers(*child)),
            },
            NodeKind::While { cond, body } => NodeKind::While {
                cond: self.reject_param(cond),
                body: Box::new(self.reject_leftovers(*body)),
            },
            NodeKind::Reactive { cond, body } => NodeKind::Reactive {
                cond: self.reject_param(cond),
                body: Box::new(self.reject_leftovers(*body)),
            },
            NodeKind::Action { path, args } => NodeKind::Action {
                path,
                args: args.into_iter().map(|e| self.reject_param(e)).collect(),
            },
            other => other,
        };
        Node { aid, origin, kind }
    }

    fn reject_param(&mut self, expr: Expr) -> Expr {
        let Expr { aid, origin, kind } = expr;
        if let ExprKind::Param(name) = &kind {
            self.diagnostics
                .report(DiagnosticKind::InvalidMacroExpansion, origin.span)
                .message(format!("`{name}` is not defined here"))
                .emit();
            return Expr {
                aid,
                origin,
                kind: ExprKind::Error,
            };
        }

        let kind = match kind {
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: Box::new(self.reject_param(*lhs)),
                rhs: Box::new(self.reject_param(*rhs)),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: Box::new(self.reject_param(*operand)),
            },
            ExprKind::Logic { op, operands } => ExprKind::Logic {
                op,
                operands: operands.into_iter().map(|e| self.reject_param(e)).collect(),
            },
            ExprKind::Call { path, args } => ExprKind::Call {
                path,
                args: args.into_iter().map(|e| self.reject_param(e)).collect(),
            },
            other => other,
        };
        Expr { aid, origin, kind }
    }
}
