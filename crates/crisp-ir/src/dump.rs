//! Text rendering of IR trees, for tests and debug tooling.

use std::fmt::Write;

use crate::expr::{IrExpr, IrExprKind, Literal};
use crate::node::{IrModule, IrNode, IrNodeKind};

/// Renders every tree of a module as an indented outline.
pub fn dump_module(module: &IrModule) -> String {
    let mut out = String::new();
    for tree in module.trees.values() {
        dump_node(&mut out, tree, 0);
    }
    out
}

fn dump_node(out: &mut String, node: &IrNode, depth: usize) {
    let pad = "  ".repeat(depth);
    match &node.kind {
        IrNodeKind::Tree { name, body } => {
            let _ = writeln!(out, "{pad}Tree {name:?}");
            for child in body {
                dump_node(out, child, depth + 1);
            }
        }
        IrNodeKind::Selector { children } => {
            let _ = writeln!(out, "{pad}Selector");
            for child in children {
                dump_node(out, child, depth + 1);
            }
        }
        IrNodeKind::Sequence { children } => {
            let _ = writeln!(out, "{pad}Sequence");
            for child in children {
                dump_node(out, child, depth + 1);
            }
        }
        IrNodeKind::Parallel { policy, children } => {
            let _ = writeln!(out, "{pad}Parallel {policy}");
            for child in children {
                dump_node(out, child, depth + 1);
            }
        }
        IrNodeKind::Condition { expr } => {
            let _ = writeln!(out, "{pad}Condition {}", dump_expr(expr));
        }
        IrNodeKind::Action { method, args } => {
            let mut line = format!("{pad}Action {method}");
            for arg in args {
                let _ = write!(line, " {}", dump_expr(arg));
            }
            let _ = writeln!(out, "{line}");
        }
        IrNodeKind::Guard { cond, body } => {
            let _ = writeln!(out, "{pad}Guard {}", dump_expr(cond));
            dump_node(out, body, depth + 1);
        }
        IrNodeKind::If {
            cond,
            then,
            otherwise,
        } => {
            let _ = writeln!(out, "{pad}If {}", dump_expr(cond));
            dump_node(out, then, depth + 1);
            if let Some(e) = otherwise {
                let _ = writeln!(out, "{pad}Else");
                dump_node(out, e, depth + 1);
            }
        }
        IrNodeKind::Invert { child } => {
            let _ = writeln!(out, "{pad}Invert");
            dump_node(out, child, depth + 1);
        }
        IrNodeKind::Repeat { count, child } => {
            let _ = writeln!(out, "{pad}Repeat {count}");
            dump_node(out, child, depth + 1);
        }
        IrNodeKind::Timeout { seconds, child } => {
            let _ = writeln!(out, "{pad}Timeout {seconds:?}");
            dump_node(out, child, depth + 1);
        }
        IrNodeKind::Cooldown { seconds, child } => {
            let _ = writeln!(out, "{pad}Cooldown {seconds:?}");
            dump_node(out, child, depth + 1);
        }
        IrNodeKind::While { cond, body } => {
            let _ = writeln!(out, "{pad}While {}", dump_expr(cond));
            dump_node(out, body, depth + 1);
        }
        IrNodeKind::Reactive { cond, body } => {
            let _ = writeln!(out, "{pad}Reactive {}", dump_expr(cond));
            dump_node(out, body, depth + 1);
        }
        IrNodeKind::ReactiveSelect { children } => {
            let _ = writeln!(out, "{pad}ReactiveSelect");
            for child in children {
                dump_node(out, child, depth + 1);
            }
        }
        IrNodeKind::TreeRef { name } => {
            let _ = writeln!(out, "{pad}TreeRef {name:?}");
        }
    }
}

/// Renders an expression as a compact S-expression.
pub fn dump_expr(expr: &IrExpr) -> String {
    match &expr.kind {
        IrExprKind::Literal(lit) => dump_literal(lit),
        IrExprKind::MemberLoad(path) => path.to_string(),
        IrExprKind::BlackboardLoad(path) => format!("${path}"),
        IrExprKind::Binary { op, lhs, rhs } => {
            format!("({} {} {})", op.symbol(), dump_expr(lhs), dump_expr(rhs))
        }
        IrExprKind::Unary { op, operand } => {
            let sym = match op {
                crate::expr::UnaryOp::Neg => "-",
                crate::expr::UnaryOp::Not => "not",
            };
            format!("({sym} {})", dump_expr(operand))
        }
        IrExprKind::Logic { op, operands } => {
            let sym = match op {
                crate::expr::LogicOp::And => "and",
                crate::expr::LogicOp::Or => "or",
            };
            let parts: Vec<String> = operands.iter().map(dump_expr).collect();
            format!("({sym} {})", parts.join(" "))
        }
        IrExprKind::Call { method, args } => {
            let mut s = format!("({method}");
            for arg in args {
                s.push(' ');
                s.push_str(&dump_expr(arg));
            }
            s.push(')');
            s
        }
        IrExprKind::Convert { operand, target } => {
            format!("(as {target} {})", dump_expr(operand))
        }
    }
}

fn dump_literal(lit: &Literal) -> String {
    match lit {
        Literal::Int(i) => i.to_string(),
        Literal::Float(x) => format!("{x:?}"),
        Literal::Bool(b) => b.to_string(),
        Literal::Str(s) => format!("{s:?}"),
        Literal::Enum { ty, member } => format!("::{ty}.{member}"),
        Literal::Null => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, MethodRef};
    use crisp_core::{CrispType, MemberPath, NodeId};

    fn expr(kind: IrExprKind) -> IrExpr {
        IrExpr::new(NodeId(1), kind)
    }

    #[test]
    fn dumps_condition_with_convert() {
        let cmp = expr(IrExprKind::Binary {
            op: BinaryOp::Lt,
            lhs: Box::new(expr(IrExprKind::MemberLoad(
                MemberPath::parse(".Health").unwrap(),
            ))),
            rhs: Box::new(expr(IrExprKind::Literal(Literal::Int(30))).converted(CrispType::Float)),
        });
        assert_eq!(dump_expr(&cmp), "(< .Health (as Float 30))");
    }

    #[test]
    fn modules_round_trip_through_serde() {
        let tree = IrNode::new(
            NodeId(0),
            IrNodeKind::Tree {
                name: "T".to_string(),
                body: vec![IrNode::new(
                    NodeId(1),
                    IrNodeKind::Timeout {
                        seconds: 1.5,
                        child: Box::new(IrNode::new(
                            NodeId(2),
                            IrNodeKind::Condition {
                                expr: expr(IrExprKind::Literal(Literal::Bool(true))),
                            },
                        )),
                    },
                )],
            },
        );
        let mut module = IrModule::new();
        module.insert(tree);

        let json = serde_json::to_string(&module).unwrap();
        let back: IrModule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, module);
    }

    #[test]
    fn dumps_tree_outline() {
        let tree = IrNode::new(
            NodeId(0),
            IrNodeKind::Tree {
                name: "T".to_string(),
                body: vec![IrNode::new(
                    NodeId(2),
                    IrNodeKind::Action {
                        method: MethodRef::new(MemberPath::parse(".Patrol").unwrap()),
                        args: Vec::new(),
                    },
                )],
            },
        );
        let mut module = IrModule::new();
        module.insert(tree);
        assert_eq!(dump_module(&module), "Tree \"T\"\n  Action .Patrol\n");
    }
}
