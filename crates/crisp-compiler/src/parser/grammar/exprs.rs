//! Expression-position productions.

use crate::diagnostics::DiagnosticKind;
use crate::parser::core::Parser;
use crate::parser::cst::SyntaxKind;
use crate::parser::cst::token_sets::{EXPR_FIRST, LITERALS};
use crate::parser::lexer::string_is_terminated;

impl Parser<'_> {
    pub(crate) fn at_expr_start(&mut self) -> bool {
        let kind = self.peek();
        EXPR_FIRST.contains(kind)
    }

    pub(crate) fn parse_expr(&mut self) {
        if !self.enter_recursion() {
            return;
        }
        match self.peek() {
            kind if LITERALS.contains(kind) => {
                if kind == SyntaxKind::StringLiteral
                    && !string_is_terminated(self.current_text())
                {
                    self.error(DiagnosticKind::UnterminatedString);
                }
                self.start_node(SyntaxKind::Literal);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::MemberAccess => {
                self.start_node(SyntaxKind::MemberExpr);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::BlackboardAccess => {
                self.start_node(SyntaxKind::BlackboardExpr);
                self.bump();
                self.finish_node();
            }
            // Bare identifiers only mean something inside template bodies
            // (parameter references); lowering validates the context.
            SyntaxKind::Identifier => {
                self.start_node(SyntaxKind::NameExpr);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::LeftParen => self.parse_paren_expr(),
            _ => {
                self.error_and_bump_msg(DiagnosticKind::UnexpectedToken, "expected an expression")
            }
        }
        self.exit_recursion();
    }

    /// `(op lhs rhs)`, `(- x)`, `(and …)`, `(or …)`, `(not x)`, `(.Member args…)`.
    fn parse_paren_expr(&mut self) {
        let checkpoint = self.checkpoint();
        self.push_delimiter();
        self.bump(); // (

        match self.peek() {
            kind if kind.is_operator() => {
                self.bump();
                let mut operands = 0usize;
                while !self.should_stop() && self.peek() != SyntaxKind::RightParen {
                    if self.at_expr_start() {
                        self.parse_expr();
                        operands += 1;
                    } else {
                        self.error_and_bump_msg(
                            DiagnosticKind::UnexpectedToken,
                            "expected an operand",
                        );
                    }
                }
                // A lone operand after `-` is negation; everything else is binary.
                let node_kind = if kind == SyntaxKind::Minus && operands == 1 {
                    SyntaxKind::UnaryExpr
                } else {
                    SyntaxKind::BinaryExpr
                };
                self.start_node_at(checkpoint, node_kind);
                self.expect_close("this expression");
                self.finish_node();
            }
            SyntaxKind::Identifier => match self.current_text() {
                "and" | "or" => {
                    self.bump();
                    while !self.should_stop() && self.peek() != SyntaxKind::RightParen {
                        if self.at_expr_start() {
                            self.parse_expr();
                        } else {
                            self.error_and_bump_msg(
                                DiagnosticKind::UnexpectedToken,
                                "expected an operand",
                            );
                        }
                    }
                    self.start_node_at(checkpoint, SyntaxKind::LogicExpr);
                    self.expect_close("this expression");
                    self.finish_node();
                }
                "not" => {
                    self.bump();
                    if self.at_expr_start() {
                        self.parse_expr();
                    } else {
                        self.error_msg(
                            DiagnosticKind::InsufficientChildren,
                            "`not` needs an operand",
                        );
                    }
                    self.start_node_at(checkpoint, SyntaxKind::UnaryExpr);
                    self.expect_close("this expression");
                    self.finish_node();
                }
                _ => self.recover_balanced_at(
                    checkpoint,
                    DiagnosticKind::ParseError,
                    "expected an operator, `and`, `or`, `not`, or a method call",
                ),
            },
            SyntaxKind::MemberAccess => {
                self.bump();
                while !self.should_stop() && self.peek() != SyntaxKind::RightParen {
                    if self.at_expr_start() {
                        self.parse_expr();
                    } else {
                        self.error_and_bump_msg(
                            DiagnosticKind::UnexpectedToken,
                            "expected an argument",
                        );
                    }
                }
                self.start_node_at(checkpoint, SyntaxKind::Call);
                self.expect_close("this call");
                self.finish_node();
            }
            _ => self.recover_balanced_at(
                checkpoint,
                DiagnosticKind::ParseError,
                "expected an operator, `and`, `or`, `not`, or a method call",
            ),
        }
    }
}
