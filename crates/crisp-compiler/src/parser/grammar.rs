//! Grammar productions for the Crisp language.
//!
//! This module implements all `parse_*` methods as an extension of `Parser`.
//! Top-level forms live here; node-position and expression-position
//! productions live in the `nodes` and `exprs` submodules. The two positions
//! are syntactically different: `.Member` is an action call in node position
//! but a load in expression position, and `(op …)` groups only exist in
//! expression position.

mod exprs;
mod nodes;

use super::core::Parser;
use super::cst::SyntaxKind;
use super::cst::token_sets::NODE_FIRST;
use super::lexer::string_is_terminated;
use crate::diagnostics::DiagnosticKind;

impl Parser<'_> {
    pub(crate) fn parse_program(&mut self) {
        self.start_node(SyntaxKind::Program);

        loop {
            match self.peek() {
                SyntaxKind::EndOfFile => break,
                SyntaxKind::LeftParen => self.parse_top_form(),
                SyntaxKind::RightParen => {
                    self.error_and_bump(DiagnosticKind::UnexpectedCloseParen)
                }
                SyntaxKind::Error => self.error_and_bump_msg(
                    DiagnosticKind::ParseError,
                    "unrecognized characters",
                ),
                _ => self.error_and_bump_msg(
                    DiagnosticKind::UnexpectedToken,
                    "expected `(tree …)`, `(defdec …)`, `(defmacro …)`, or `(import …)`",
                ),
            }
            if self.has_fatal_error() {
                break;
            }
        }

        self.eat_trivia();
        self.finish_node();
    }

    fn parse_top_form(&mut self) {
        match (self.peek_nth(1), self.peek_nth_text(1)) {
            (SyntaxKind::Identifier, "tree") => self.parse_tree_def(),
            (SyntaxKind::Identifier, "defdec") => self.parse_template_def(SyntaxKind::Defdec),
            (SyntaxKind::Identifier, "defmacro") => self.parse_template_def(SyntaxKind::Defmacro),
            (SyntaxKind::Identifier, "import") => self.parse_import(),
            _ => {
                // A stray node at top level still parses, so analysis has
                // something to point at.
                self.error_msg(
                    DiagnosticKind::ParseError,
                    "expected `tree`, `defdec`, `defmacro`, or `import` at top level",
                );
                self.parse_node();
            }
        }
    }

    /// `(tree Name [:blackboard Type] body*)`
    fn parse_tree_def(&mut self) {
        self.start_node(SyntaxKind::TreeDef);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // tree

        self.expect(SyntaxKind::Identifier, "tree name");

        if self.peek() == SyntaxKind::Keyword {
            if self.current_text() == ":blackboard" {
                self.bump();
                self.expect(SyntaxKind::Identifier, "blackboard type name");
            } else {
                self.error_and_bump_msg(
                    DiagnosticKind::UnexpectedToken,
                    "unknown tree option; only `:blackboard Type` is allowed",
                );
            }
        }

        self.parse_node_list("this tree");
        self.finish_node();
    }

    /// `(defdec Name (params…) body)` | `(defmacro Name (params…) body)`
    fn parse_template_def(&mut self, kind: SyntaxKind) {
        let what = if kind == SyntaxKind::Defdec {
            "decorator"
        } else {
            "macro"
        };
        self.start_node(kind);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // defdec | defmacro

        self.expect(SyntaxKind::Identifier, "definition name");

        if self.peek() == SyntaxKind::LeftParen {
            self.start_node(SyntaxKind::ParamList);
            self.push_delimiter();
            self.bump();
            while !self.should_stop() && self.peek() != SyntaxKind::RightParen {
                if self.peek() == SyntaxKind::Identifier {
                    self.bump();
                } else {
                    self.error_and_bump_msg(
                        DiagnosticKind::UnexpectedToken,
                        "expected a parameter name",
                    );
                }
            }
            self.expect_close("the parameter list");
            self.finish_node();
        } else {
            self.error_msg(
                DiagnosticKind::UnexpectedToken,
                format!("expected a parameter list after the {what} name"),
            );
        }

        if self.at_node_start() {
            self.parse_node();
        } else {
            self.error_msg(
                DiagnosticKind::InsufficientChildren,
                format!("{what} definition needs a body node"),
            );
        }

        self.expect_close("this definition");
        self.finish_node();
    }

    /// `(import "path")`
    fn parse_import(&mut self) {
        self.start_node(SyntaxKind::Import);
        self.push_delimiter();
        self.bump(); // (
        self.peek();
        self.bump(); // import

        if self.peek() == SyntaxKind::StringLiteral {
            if !string_is_terminated(self.current_text()) {
                self.error(DiagnosticKind::UnterminatedString);
            }
            self.bump();
        } else {
            self.error_msg(DiagnosticKind::UnexpectedToken, "expected a file path string");
            self.fabricate(SyntaxKind::StringLiteral);
        }

        self.expect_close("this import");
        self.finish_node();
    }

    /// Parses child nodes until `)`, wrapping stray tokens, then closes.
    pub(super) fn parse_node_list(&mut self, what: &str) {
        while !self.should_stop() && self.peek() != SyntaxKind::RightParen {
            if self.at_set(NODE_FIRST) {
                self.parse_node();
            } else {
                self.error_and_bump_msg(DiagnosticKind::UnexpectedToken, "expected a node");
            }
        }
        self.expect_close(what);
    }
}
