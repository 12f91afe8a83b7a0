//! Parser infrastructure for the Crisp language.
//!
//! # Architecture
//!
//! This parser produces a lossless concrete syntax tree (CST) via Rowan's
//! green tree builder:
//!
//! - Zero-copy lexing: tokens carry spans, text sliced only when building tree nodes
//! - Trivia buffering: whitespace/comments collected, then flushed in source order
//! - Checkpoint-based wrapping: expression kind decided after the operator is seen
//! - Node ids: one post-parse walk assigns document-order ids (program = 0)
//!
//! # Recovery Strategy
//!
//! The parser is resilient — it always produces a tree covering every byte:
//!
//! 1. Unknown tokens get wrapped in `SyntaxKind::Error` nodes and consumed
//! 2. Missing expected tokens emit a diagnostic plus a zero-width token of
//!    the expected kind, so parent productions still get a typed slot
//! 3. A missing `)` inserts a `Missing` placeholder node
//! 4. Unalignable expression slots consume a balanced token run into an
//!    `Error` node
//!
//! Fuel exhaustion (exec fuel, recursion depth) returns an actual error
//! immediately rather than a diagnostic.

pub mod ast;
mod core;
mod cst;
mod grammar;
mod lexer;
mod node_ids;

#[cfg(test)]
mod tests;

pub use ast::{Defdec, Defmacro, Import, ParamList, Program, TreeDef};
pub use core::{ParseResult, Parser};
pub use cst::{
    CrispLang, EXPR_KEYWORDS, NODE_KEYWORDS, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken,
};
pub use lexer::{Token, lex, string_is_terminated, token_text};
pub use node_ids::NodeIdMap;

/// Lex and parse in one step with default limits.
pub fn parse(source: &str) -> crate::Result<ParseResult> {
    let tokens = lex(source);
    Parser::new(source, tokens).parse()
}

/// Renders a CST subtree with token text, for tests and tooling.
pub fn dump_cst(node: &SyntaxNode) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    dump_into(&mut out, &rowan::NodeOrToken::Node(node.clone()), 0);
    return out;

    fn dump_into(out: &mut String, element: &SyntaxElement, depth: usize) {
        let pad = "  ".repeat(depth);
        match element {
            rowan::NodeOrToken::Node(node) => {
                let _ = writeln!(out, "{pad}{:?}", node.kind());
                for child in node.children_with_tokens() {
                    dump_into(out, &child, depth + 1);
                }
            }
            rowan::NodeOrToken::Token(token) => {
                let _ = writeln!(out, "{pad}{:?} {:?}", token.kind(), token.text());
            }
        }
    }
}
