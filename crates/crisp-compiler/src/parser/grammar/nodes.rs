//! Node-position productions: composites, decorators, and calls.

use crate::diagnostics::DiagnosticKind;
use crate::parser::core::Parser;
use crate::parser::cst::SyntaxKind;
use crate::parser::cst::token_sets::{EXPR_FIRST, LITERALS, NODE_FIRST};

impl Parser<'_> {
    pub(crate) fn at_node_start(&mut self) -> bool {
        let kind = self.peek();
        NODE_FIRST.contains(kind)
    }

    pub(crate) fn parse_node(&mut self) {
        if !self.enter_recursion() {
            return;
        }
        match self.peek() {
            // Bare `.Member` is an action call with zero arguments.
            SyntaxKind::MemberAccess => {
                self.start_node(SyntaxKind::Call);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::BodyPlaceholder => {
                self.start_node(SyntaxKind::Placeholder);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::LeftParen => self.parse_paren_node(),
            _ => self.error_and_bump_msg(DiagnosticKind::UnexpectedToken, "expected a node"),
        }
        self.exit_recursion();
    }

    fn parse_paren_node(&mut self) {
        match self.peek_nth(1) {
            SyntaxKind::MemberAccess => self.parse_action_call(),
            SyntaxKind::Identifier => match self.peek_nth_text(1) {
                "select" => self.parse_composite(SyntaxKind::Selector, "this selector"),
                "seq" => self.parse_composite(SyntaxKind::Sequence, "this sequence"),
                "reactive-select" => {
                    self.parse_composite(SyntaxKind::ReactiveSelect, "this reactive selector")
                }
                "parallel" => self.parse_parallel(),
                "check" => self.parse_check(),
                "guard" => self.parse_decorator_with_expr(SyntaxKind::Guard, "guard condition"),
                "while" => self.parse_decorator_with_expr(SyntaxKind::While, "while condition"),
                "reactive" => {
                    self.parse_decorator_with_expr(SyntaxKind::Reactive, "reactive condition")
                }
                "if" => self.parse_if(),
                "invert" => self.parse_invert(),
                "repeat" => self.parse_decorator_with_expr(SyntaxKind::Repeat, "repeat count"),
                "timeout" => {
                    self.parse_decorator_with_expr(SyntaxKind::Timeout, "timeout duration")
                }
                "cooldown" => {
                    self.parse_decorator_with_expr(SyntaxKind::Cooldown, "cooldown duration")
                }
                "ref" => self.parse_ref(),
                "tree" | "defdec" | "defmacro" | "import" => self.recover_balanced(
                    DiagnosticKind::ParseError,
                    "definitions cannot be nested inside a tree",
                ),
                _ => self.parse_template_call(),
            },
            _ => self.recover_balanced(
                DiagnosticKind::ParseError,
                "expected a node keyword or an action call",
            ),
        }
    }

    /// `(select node*)` and friends.
    fn parse_composite(&mut self, kind: SyntaxKind, what: &str) {
        self.start_node(kind);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // keyword
        self.parse_node_list(what);
        self.finish_node();
    }

    /// `(parallel :any|:all|:n <int> node*)`
    fn parse_parallel(&mut self) {
        self.start_node(SyntaxKind::Parallel);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // parallel

        if self.peek() == SyntaxKind::Keyword {
            match self.current_text() {
                ":any" | ":all" => self.bump(),
                ":n" => {
                    self.bump();
                    if self.peek() == SyntaxKind::IntLiteral {
                        self.bump();
                    } else {
                        self.error_msg(
                            DiagnosticKind::UnexpectedToken,
                            "expected a child count after `:n`",
                        );
                        self.fabricate(SyntaxKind::IntLiteral);
                    }
                }
                _ => self.error_and_bump_msg(
                    DiagnosticKind::ParseError,
                    "unknown parallel policy; expected `:any`, `:all`, or `:n <count>`",
                ),
            }
        } else {
            self.error_msg(
                DiagnosticKind::ParseError,
                "parallel requires a policy: `:any`, `:all`, or `:n <count>`",
            );
            self.fabricate(SyntaxKind::Keyword);
        }

        self.parse_node_list("this parallel");
        self.finish_node();
    }

    /// `(check expr)`
    fn parse_check(&mut self) {
        self.start_node(SyntaxKind::Check);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // check

        if self.at_expr_start() {
            self.parse_expr();
        } else {
            self.error_msg(
                DiagnosticKind::InsufficientChildren,
                "check needs a condition expression",
            );
        }

        self.expect_close("this check");
        self.finish_node();
    }

    /// `(kw expr node)` — guard/while/reactive conditions and
    /// repeat/timeout/cooldown parameters share one shape.
    fn parse_decorator_with_expr(&mut self, kind: SyntaxKind, what: &str) {
        self.start_node(kind);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // keyword

        if self.at_expr_start() {
            self.parse_expr();
        } else {
            self.error_msg(
                DiagnosticKind::InsufficientChildren,
                format!("expected a {what}"),
            );
        }

        if self.at_node_start() {
            self.parse_node();
        } else {
            self.error_msg(
                DiagnosticKind::InsufficientChildren,
                "this decorator needs a child node",
            );
        }

        self.expect_close("this decorator");
        self.finish_node();
    }

    /// `(if cond then [else])`
    fn parse_if(&mut self) {
        self.start_node(SyntaxKind::If);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // if

        if self.at_expr_start() {
            self.parse_expr();
        } else {
            self.error_msg(
                DiagnosticKind::InsufficientChildren,
                "if needs a condition expression",
            );
        }

        if self.at_node_start() {
            self.parse_node();
        } else {
            self.error_msg(
                DiagnosticKind::InsufficientChildren,
                "if needs a `then` node",
            );
        }

        // The else branch is detected by another node before the `)`.
        if self.at_node_start() {
            self.parse_node();
        }

        self.expect_close("this if");
        self.finish_node();
    }

    /// `(invert node)`
    fn parse_invert(&mut self) {
        self.start_node(SyntaxKind::Invert);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // invert

        if self.at_node_start() {
            self.parse_node();
        } else {
            self.error_msg(
                DiagnosticKind::InsufficientChildren,
                "invert needs a child node",
            );
        }

        self.expect_close("this invert");
        self.finish_node();
    }

    /// `(ref TreeName)`
    fn parse_ref(&mut self) {
        self.start_node(SyntaxKind::Ref);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // ref

        self.expect(SyntaxKind::Identifier, "tree name");

        self.expect_close("this ref");
        self.finish_node();
    }

    /// `(.Member expr*)`
    fn parse_action_call(&mut self) {
        self.start_node(SyntaxKind::Call);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // member access

        while !self.should_stop() && self.peek() != SyntaxKind::RightParen {
            if self.at_expr_start() {
                self.parse_expr();
            } else {
                self.error_and_bump_msg(DiagnosticKind::UnexpectedToken, "expected an argument");
            }
        }

        self.expect_close("this action call");
        self.finish_node();
    }

    /// `(name arg* [child-node])` — a user-defined decorator or macro call.
    /// Arguments are expressions; a trailing node becomes the decorator body.
    fn parse_template_call(&mut self) {
        self.start_node(SyntaxKind::TemplateCall);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // name

        while !self.should_stop() && self.peek() != SyntaxKind::RightParen {
            match self.peek() {
                SyntaxKind::BodyPlaceholder | SyntaxKind::MemberAccess => self.parse_node(),
                SyntaxKind::LeftParen => {
                    let head = self.peek_nth(1);
                    let is_expr_head = head.is_operator()
                        || LITERALS.contains(head)
                        || (head == SyntaxKind::Identifier
                            && matches!(self.peek_nth_text(1), "and" | "or" | "not"));
                    if is_expr_head {
                        self.parse_expr();
                    } else {
                        self.parse_node();
                    }
                }
                k if EXPR_FIRST.contains(k) => self.parse_expr(),
                _ => self.error_and_bump_msg(
                    DiagnosticKind::UnexpectedToken,
                    "expected an argument or child node",
                ),
            }
        }

        self.expect_close("this call");
        self.finish_node();
    }
}
