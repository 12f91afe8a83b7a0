//! CST to AST lowering.
//!
//! Pattern-matches each CST variant into the owned tree, decoding literal
//! text into typed values along the way. Recovered parse errors become
//! `Error` nodes/expressions that analysis skips.

use crisp_core::MemberPath;
use crisp_ir::{BinaryOp, Literal, LogicOp, ParallelPolicy, UnaryOp};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::{ParseResult, SyntaxKind, SyntaxNode, SyntaxToken};

use super::{
    AstOrigin, Expr, ExprKind, ImportDecl, Node, NodeKind, Program, Template, TemplateArg,
    TemplateKind, Tree,
};

/// Lowers a parse into the owned AST. Template calls are left unexpanded;
/// run [`super::expand`] afterwards.
pub fn lower(parse: &ParseResult, diagnostics: &mut Diagnostics) -> Program {
    let mut program = Program::default();

    for import in parse.program.imports() {
        if let Some(path) = import.path() {
            program.imports.push(ImportDecl {
                origin: origin_of(parse, import.syntax()),
                path,
            });
        }
    }

    for def in parse.program.defdecs() {
        lower_template(parse, TemplateKind::Decorator, def.name(), def.body(), {
            def.params().map(|p| p.names()).unwrap_or_default()
        }, def.syntax(), &mut program, diagnostics);
    }
    for def in parse.program.defmacros() {
        lower_template(parse, TemplateKind::Macro, def.name(), def.body(), {
            def.params().map(|p| p.names()).unwrap_or_default()
        }, def.syntax(), &mut program, diagnostics);
    }

    for tree in parse.program.trees() {
        let Some(name) = tree.name() else {
            // The parser already reported the missing name.
            continue;
        };
        let body = tree
            .body()
            .map(|node| lower_node(parse, &node, &mut program, diagnostics))
            .collect();
        program.trees.push(Tree {
            origin: origin_of(parse, tree.syntax()),
            name: name.text().to_string(),
            blackboard: tree.blackboard_type().map(|t| t.text().to_string()),
            body,
        });
    }

    program
}

fn lower_template(
    parse: &ParseResult,
    kind: TemplateKind,
    name: Option<SyntaxToken>,
    body: Option<SyntaxNode>,
    params: Vec<String>,
    syntax: &SyntaxNode,
    program: &mut Program,
    diagnostics: &mut Diagnostics,
) {
    let (Some(name), Some(body)) = (name, body) else {
        // Parser diagnostics already cover a missing name or body.
        return;
    };
    let body = lower_node(parse, &body, program, diagnostics);
    program.templates.push(Template {
        origin: origin_of(parse, syntax),
        kind,
        name: name.text().to_string(),
        params,
        body,
    });
}

fn origin_of(parse: &ParseResult, node: &SyntaxNode) -> AstOrigin {
    AstOrigin {
        id: parse.ids.id(node),
        span: node.text_range(),
    }
}

fn node_children(node: &SyntaxNode) -> impl Iterator<Item = SyntaxNode> + '_ {
    node.children().filter(|n| n.kind().is_bt_node())
}

fn expr_children(node: &SyntaxNode) -> impl Iterator<Item = SyntaxNode> + '_ {
    node.children()
        .filter(|n| n.kind().is_expr_node() || n.kind() == SyntaxKind::Error)
}

fn significant_tokens(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> + '_ {
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .filter(|t| !t.kind().is_trivia())
}

fn lower_node(
    parse: &ParseResult,
    node: &SyntaxNode,
    program: &mut Program,
    diagnostics: &mut Diagnostics,
) -> Node {
    let origin = origin_of(parse, node);
    let aid = program.fresh_aid();
    let kind = lower_node_kind(parse, node, program, diagnostics);
    Node { aid, origin, kind }
}

fn lower_node_kind(
    parse: &ParseResult,
    node: &SyntaxNode,
    program: &mut Program,
    diagnostics: &mut Diagnostics,
) -> NodeKind {
    let children = |program: &mut Program, diagnostics: &mut Diagnostics| -> Vec<Node> {
        node_children(node)
            .map(|n| lower_node(parse, &n, program, diagnostics))
            .collect()
    };

    match node.kind() {
        SyntaxKind::Selector => NodeKind::Selector(children(program, diagnostics)),
        SyntaxKind::Sequence => NodeKind::Sequence(children(program, diagnostics)),
        SyntaxKind::ReactiveSelect => NodeKind::ReactiveSelect(children(program, diagnostics)),
        SyntaxKind::Parallel => NodeKind::Parallel {
            policy: lower_policy(node),
            children: children(program, diagnostics),
        },
        SyntaxKind::Check => NodeKind::Check(lower_cond(parse, node, program, diagnostics)),
        SyntaxKind::Guard => NodeKind::Guard {
            cond: lower_cond(parse, node, program, diagnostics),
            body: Box::new(lower_only_child(parse, node, program, diagnostics)),
        },
        SyntaxKind::While => NodeKind::While {
            cond: lower_cond(parse, node, program, diagnostics),
            body: Box::new(lower_only_child(parse, node, program, diagnostics)),
        },
        SyntaxKind::Reactive => NodeKind::Reactive {
            cond: lower_cond(parse, node, program, diagnostics),
            body: Box::new(lower_only_child(parse, node, program, diagnostics)),
        },
        SyntaxKind::If => {
            let cond = lower_cond(parse, node, program, diagnostics);
            let mut nodes = node_children(node);
            let then = match nodes.next() {
                Some(n) => lower_node(parse, &n, program, diagnostics),
                None => error_node(origin_of(parse, node), program),
            };
            let otherwise =
                nodes.next().map(|n| Box::new(lower_node(parse, &n, program, diagnostics)));
            NodeKind::If {
                cond,
                then: Box::new(then),
                otherwise,
            }
        }
        SyntaxKind::Invert => {
            NodeKind::Invert(Box::new(lower_only_child(parse, node, program, diagnostics)))
        }
        SyntaxKind::Repeat => NodeKind::Repeat {
            count: lower_cond(parse, node, program, diagnostics),
            child: Box::new(lower_only_child(parse, node, program, diagnostics)),
        },
        SyntaxKind::Timeout => NodeKind::Timeout {
            seconds: lower_cond(parse, node, program, diagnostics),
            child: Box::new(lower_only_child(parse, node, program, diagnostics)),
        },
        SyntaxKind::Cooldown => NodeKind::Cooldown {
            seconds: lower_cond(parse, node, program, diagnostics),
            child: Box::new(lower_only_child(parse, node, program, diagnostics)),
        },
        SyntaxKind::Ref => {
            let name = significant_tokens(node)
                .filter(|t| t.kind() == SyntaxKind::Identifier)
                .nth(1)
                .map(|t| t.text().to_string())
                .filter(|t| !t.is_empty());
            match name {
                Some(name) => NodeKind::Ref(name),
                None => NodeKind::Error,
            }
        }
        SyntaxKind::Call => {
            let member = significant_tokens(node)
                .find(|t| t.kind() == SyntaxKind::MemberAccess);
            let path = member.and_then(|t| MemberPath::parse(t.text()));
            match path {
                Some(path) => NodeKind::Action {
                    path,
                    args: expr_children(node)
                        .map(|e| lower_expr(parse, &e, program, diagnostics))
                        .collect(),
                },
                None => NodeKind::Error,
            }
        }
        SyntaxKind::TemplateCall => {
            let name = significant_tokens(node)
                .find(|t| t.kind() == SyntaxKind::Identifier)
                .map(|t| t.text().to_string());
            let mut args = Vec::new();
            for child in node.children() {
                if child.kind().is_bt_node() {
                    args.push(TemplateArg::Node(lower_node(
                        parse,
                        &child,
                        program,
                        diagnostics,
                    )));
                } else if child.kind().is_expr_node() || child.kind() == SyntaxKind::Error {
                    args.push(TemplateArg::Expr(lower_expr(
                        parse,
                        &child,
                        program,
                        diagnostics,
                    )));
                }
            }
            match name {
                Some(name) => NodeKind::TemplateCall { name, args },
                None => NodeKind::Error,
            }
        }
        SyntaxKind::Placeholder => NodeKind::Placeholder,
        _ => NodeKind::Error,
    }
}

fn error_node(origin: AstOrigin, program: &mut Program) -> Node {
    Node {
        aid: program.fresh_aid(),
        origin,
        kind: NodeKind::Error,
    }
}

/// First expression child, or an `Error` expression when it is absent
/// (the parser reported that already).
fn lower_cond(
    parse: &ParseResult,
    node: &SyntaxNode,
    program: &mut Program,
    diagnostics: &mut Diagnostics,
) -> Expr {
    match expr_children(node).next() {
        Some(e) => lower_expr(parse, &e, program, diagnostics),
        None => Expr {
            aid: program.fresh_aid(),
            origin: origin_of(parse, node),
            kind: ExprKind::Error,
        },
    }
}

/// The single child node of a decorator, or an `Error` node.
fn lower_only_child(
    parse: &ParseResult,
    node: &SyntaxNode,
    program: &mut Program,
    diagnostics: &mut Diagnostics,
) -> Node {
    match node_children(node).next() {
        Some(n) => lower_node(parse, &n, program, diagnostics),
        None => error_node(origin_of(parse, node), program),
    }
}

fn lower_policy(node: &SyntaxNode) -> ParallelPolicy {
    let mut tokens = significant_tokens(node);
    let keyword = tokens.find(|t| t.kind() == SyntaxKind::Keyword);
    match keyword.as_ref().map(|t| t.text()) {
        Some(":any") => ParallelPolicy::Any,
        Some(":all") => ParallelPolicy::All,
        Some(":n") => {
            let count = tokens
                .find(|t| t.kind() == SyntaxKind::IntLiteral)
                .and_then(|t| t.text().parse::<u32>().ok())
                .unwrap_or(1);
            ParallelPolicy::N(count)
        }
        // The parser reported the missing/unknown policy; Any keeps going.
        _ => ParallelPolicy::Any,
    }
}

fn lower_expr(
    parse: &ParseResult,
    node: &SyntaxNode,
    program: &mut Program,
    diagnostics: &mut Diagnostics,
) -> Expr {
    let origin = origin_of(parse, node);
    let aid = program.fresh_aid();
    let kind = lower_expr_kind(parse, node, program, diagnostics);
    Expr { aid, origin, kind }
}

fn lower_expr_kind(
    parse: &ParseResult,
    node: &SyntaxNode,
    program: &mut Program,
    diagnostics: &mut Diagnostics,
) -> ExprKind {
    match node.kind() {
        SyntaxKind::Literal => {
            let Some(token) = significant_tokens(node).next() else {
                return ExprKind::Error;
            };
            lower_literal(&token, node, parse, diagnostics)
        }
        SyntaxKind::MemberExpr => {
            match significant_tokens(node)
                .next()
                .and_then(|t| MemberPath::parse(t.text()))
            {
                Some(path) => ExprKind::Member(path),
                None => ExprKind::Error,
            }
        }
        SyntaxKind::BlackboardExpr => {
            match significant_tokens(node)
                .next()
                .and_then(|t| MemberPath::parse(t.text()))
            {
                Some(path) => ExprKind::Blackboard(path),
                None => ExprKind::Error,
            }
        }
        SyntaxKind::NameExpr => {
            match significant_tokens(node)
                .find(|t| t.kind() == SyntaxKind::Identifier)
            {
                Some(t) => ExprKind::Param(t.text().to_string()),
                None => ExprKind::Error,
            }
        }
        SyntaxKind::BinaryExpr => {
            let op = significant_tokens(node)
                .find(|t| t.kind().is_operator())
                .map(|t| binary_op(t.kind()));
            let mut operands = expr_children(node);
            let lhs = operands.next();
            let rhs = operands.next();
            match (op, lhs, rhs) {
                (Some(op), Some(lhs), Some(rhs)) => ExprKind::Binary {
                    op,
                    lhs: Box::new(lower_expr(parse, &lhs, program, diagnostics)),
                    rhs: Box::new(lower_expr(parse, &rhs, program, diagnostics)),
                },
                _ => {
                    diagnostics
                        .report(DiagnosticKind::InsufficientChildren, node.text_range())
                        .message("this operator needs two operands")
                        .emit();
                    ExprKind::Error
                }
            }
        }
        SyntaxKind::UnaryExpr => {
            let op = significant_tokens(node).find_map(|t| match t.kind() {
                SyntaxKind::Minus => Some(UnaryOp::Neg),
                SyntaxKind::Identifier if t.text() == "not" => Some(UnaryOp::Not),
                _ => None,
            });
            let operand = expr_children(node).next();
            match (op, operand) {
                (Some(op), Some(operand)) => ExprKind::Unary {
                    op,
                    operand: Box::new(lower_expr(parse, &operand, program, diagnostics)),
                },
                _ => {
                    diagnostics
                        .report(DiagnosticKind::InsufficientChildren, node.text_range())
                        .message("this operator needs an operand")
                        .emit();
                    ExprKind::Error
                }
            }
        }
        SyntaxKind::LogicExpr => {
            let op = significant_tokens(node).find_map(|t| match t.text() {
                "and" => Some(LogicOp::And),
                "or" => Some(LogicOp::Or),
                _ => None,
            });
            let operands: Vec<Expr> = expr_children(node)
                .map(|e| lower_expr(parse, &e, program, diagnostics))
                .collect();
            match op {
                Some(op) if !operands.is_empty() => ExprKind::Logic { op, operands },
                _ => {
                    diagnostics
                        .report(DiagnosticKind::InsufficientChildren, node.text_range())
                        .message("`and`/`or` need at least one operand")
                        .emit();
                    ExprKind::Error
                }
            }
        }
        SyntaxKind::Call => {
            let path = significant_tokens(node)
                .find(|t| t.kind() == SyntaxKind::MemberAccess)
                .and_then(|t| MemberPath::parse(t.text()));
            match path {
                Some(path) => ExprKind::Call {
                    path,
                    args: expr_children(node)
                        .map(|e| lower_expr(parse, &e, program, diagnostics))
                        .collect(),
                },
                None => ExprKind::Error,
            }
        }
        _ => ExprKind::Error,
    }
}

fn binary_op(kind: SyntaxKind) -> BinaryOp {
    match kind {
        SyntaxKind::Plus => BinaryOp::Add,
        SyntaxKind::Minus => BinaryOp::Sub,
        SyntaxKind::Star => BinaryOp::Mul,
        SyntaxKind::Slash => BinaryOp::Div,
        SyntaxKind::Percent => BinaryOp::Rem,
        SyntaxKind::LessThan => BinaryOp::Lt,
        SyntaxKind::GreaterThan => BinaryOp::Gt,
        SyntaxKind::LessEqual => BinaryOp::Le,
        SyntaxKind::GreaterEqual => BinaryOp::Ge,
        SyntaxKind::Equal => BinaryOp::Eq,
        SyntaxKind::NotEqual => BinaryOp::Ne,
        other => unreachable!("not an operator token: {other:?}"),
    }
}

fn lower_literal(
    token: &SyntaxToken,
    node: &SyntaxNode,
    _parse: &ParseResult,
    diagnostics: &mut Diagnostics,
) -> ExprKind {
    let text = token.text();
    match token.kind() {
        SyntaxKind::IntLiteral => match text.parse::<i64>() {
            Ok(value) => ExprKind::Literal(Literal::Int(value)),
            Err(_) => {
                diagnostics
                    .report(DiagnosticKind::ParseError, node.text_range())
                    .message(format!("integer literal `{text}` is out of range"))
                    .emit();
                ExprKind::Error
            }
        },
        SyntaxKind::FloatLiteral => match text.parse::<f64>() {
            Ok(value) => ExprKind::Literal(Literal::Float(value)),
            Err(_) => ExprKind::Error,
        },
        SyntaxKind::StringLiteral => ExprKind::Literal(Literal::Str(decode_string(text))),
        SyntaxKind::BoolTrue => ExprKind::Literal(Literal::Bool(true)),
        SyntaxKind::BoolFalse => ExprKind::Literal(Literal::Bool(false)),
        SyntaxKind::NullLiteral => ExprKind::Literal(Literal::Null),
        SyntaxKind::EnumLiteral => {
            let body = text.strip_prefix("::").unwrap_or(text);
            match body.split_once('.') {
                Some((ty, member)) => ExprKind::Literal(Literal::Enum {
                    ty: ty.to_string(),
                    member: member.to_string(),
                }),
                None => ExprKind::Error,
            }
        }
        _ => ExprKind::Error,
    }
}

/// Strips the quotes and decodes `\"`, `\n`, `\t`, `\\` escapes.
/// Unknown escapes keep the escaped character.
fn decode_string(text: &str) -> String {
    let body = text.strip_prefix('"').unwrap_or(text);
    let body = body.strip_suffix('"').unwrap_or(body);
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
