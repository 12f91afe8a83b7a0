//! Parser state machine and low-level operations.

use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

use super::ast::Program;
use super::cst::{SyntaxKind, SyntaxNode, TokenSet};
use super::lexer::{Token, token_text};
use super::node_ids::NodeIdMap;
use crate::Error;
use crate::diagnostics::{DiagnosticKind, Diagnostics};

#[derive(Debug)]
pub struct ParseResult {
    pub program: Program,
    pub ids: NodeIdMap,
    pub diagnostics: Diagnostics,
    pub fuel_consumed: u32,
}

impl ParseResult {
    pub fn syntax(&self) -> &SyntaxNode {
        self.program.syntax()
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct OpenDelimiter {
    pub span: TextRange,
}

/// Trivia tokens (whitespace, newlines, comments) are buffered and flushed as
/// leading trivia when starting a new node. This gives predictable trivia
/// attachment without backtracking.
pub struct Parser<'src> {
    pub(super) source: &'src str,
    pub(super) tokens: Vec<Token>,
    pub(super) pos: usize,
    pub(super) trivia_buffer: Vec<Token>,
    pub(super) builder: GreenNodeBuilder<'static>,
    pub(super) diagnostics: Diagnostics,
    pub(super) depth: u32,
    pub(super) last_diagnostic_pos: Option<TextSize>,
    pub(super) delimiter_stack: Vec<OpenDelimiter>,
    exec_fuel_initial: Option<u32>,
    exec_fuel_remaining: Option<u32>,
    recursion_fuel_limit: Option<u32>,
    fatal_error: Option<Error>,
}

const DEFAULT_EXEC_FUEL: u32 = 1_000_000;
const DEFAULT_MAX_DEPTH: u32 = 1024;

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            trivia_buffer: Vec::with_capacity(4),
            builder: GreenNodeBuilder::new(),
            diagnostics: Diagnostics::new(),
            depth: 0,
            last_diagnostic_pos: None,
            delimiter_stack: Vec::with_capacity(8),
            exec_fuel_initial: Some(DEFAULT_EXEC_FUEL),
            exec_fuel_remaining: Some(DEFAULT_EXEC_FUEL),
            recursion_fuel_limit: Some(DEFAULT_MAX_DEPTH),
            fatal_error: None,
        }
    }

    pub fn with_exec_fuel(mut self, limit: Option<u32>) -> Self {
        self.exec_fuel_initial = limit;
        self.exec_fuel_remaining = limit;
        self
    }

    pub fn with_recursion_fuel(mut self, limit: Option<u32>) -> Self {
        self.recursion_fuel_limit = limit;
        self
    }

    pub fn parse(mut self) -> Result<ParseResult, Error> {
        self.parse_program();
        let (cst, diagnostics, fuel_consumed) = self.finish()?;
        let root = SyntaxNode::new_root(cst);
        let ids = NodeIdMap::new(&root);
        let program = Program::cast(root).expect("parser always produces Program");
        Ok(ParseResult {
            program,
            ids,
            diagnostics,
            fuel_consumed,
        })
    }

    fn finish(mut self) -> Result<(GreenNode, Diagnostics, u32), Error> {
        self.drain_trivia();
        if let Some(err) = self.fatal_error {
            return Err(err);
        }
        let fuel_consumed = match (self.exec_fuel_initial, self.exec_fuel_remaining) {
            (Some(initial), Some(remaining)) => initial.saturating_sub(remaining),
            _ => 0,
        };
        Ok((self.builder.finish(), self.diagnostics, fuel_consumed))
    }

    pub(super) fn has_fatal_error(&self) -> bool {
        self.fatal_error.is_some()
    }

    /// Returns `EndOfFile` past the last token (acts as sentinel).
    pub(super) fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    pub(super) fn nth(&self, lookahead: usize) -> SyntaxKind {
        self.tokens
            .get(self.pos + lookahead)
            .map_or(SyntaxKind::EndOfFile, |t| t.kind)
    }

    fn consume_exec_fuel(&mut self) {
        if let Some(ref mut remaining) = self.exec_fuel_remaining {
            if *remaining == 0 {
                if self.fatal_error.is_none() {
                    self.fatal_error = Some(Error::ExecFuelExhausted);
                }
                return;
            }
            *remaining -= 1;
        }
    }

    pub(super) fn current_span(&self) -> TextRange {
        self.tokens
            .get(self.pos)
            .map_or_else(|| TextRange::empty(self.eof_offset()), |t| t.span)
    }

    pub(super) fn current_text(&self) -> &'src str {
        self.tokens
            .get(self.pos)
            .map_or("", |t| token_text(self.source, t))
    }

    pub(super) fn eof_offset(&self) -> TextSize {
        TextSize::from(self.source.len() as u32)
    }

    pub(super) fn eof(&self) -> bool {
        self.current() == SyntaxKind::EndOfFile
    }

    pub(super) fn should_stop(&self) -> bool {
        self.eof() || self.has_fatal_error()
    }

    pub(super) fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    pub(super) fn at_set(&self, set: TokenSet) -> bool {
        set.contains(self.current())
    }

    pub(super) fn peek(&mut self) -> SyntaxKind {
        self.skip_trivia_to_buffer();
        self.current()
    }

    /// LL(k) lookahead past trivia.
    pub(super) fn peek_nth(&mut self, n: usize) -> SyntaxKind {
        self.skip_trivia_to_buffer();
        let mut count = 0;
        let mut pos = self.pos;
        while pos < self.tokens.len() {
            let kind = self.tokens[pos].kind;
            if !kind.is_trivia() {
                if count == n {
                    return kind;
                }
                count += 1;
            }
            pos += 1;
        }
        SyntaxKind::EndOfFile
    }

    /// Text of the n-th significant token ahead.
    pub(super) fn peek_nth_text(&mut self, n: usize) -> &'src str {
        self.skip_trivia_to_buffer();
        let mut count = 0;
        let mut pos = self.pos;
        while pos < self.tokens.len() {
            let token = self.tokens[pos];
            if !token.kind.is_trivia() {
                if count == n {
                    return token_text(self.source, &token);
                }
                count += 1;
            }
            pos += 1;
        }
        ""
    }

    pub(super) fn skip_trivia_to_buffer(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.trivia_buffer.push(self.tokens[self.pos]);
            self.pos += 1;
        }
    }

    pub(super) fn drain_trivia(&mut self) {
        for token in self.trivia_buffer.drain(..) {
            let text = token_text(self.source, &token);
            self.builder.token(token.kind.into(), text);
        }
    }

    pub(super) fn eat_trivia(&mut self) {
        self.skip_trivia_to_buffer();
        self.drain_trivia();
    }

    pub(super) fn start_node(&mut self, kind: SyntaxKind) {
        self.drain_trivia();
        self.builder.start_node(kind.into());
    }

    /// Wrap previously-parsed content using checkpoint.
    pub(super) fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
    }

    pub(super) fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    pub(super) fn checkpoint(&mut self) -> Checkpoint {
        self.drain_trivia();
        self.builder.checkpoint()
    }

    pub(super) fn bump(&mut self) {
        assert!(
            self.pos < self.tokens.len() && !self.eof(),
            "bump called at EOF"
        );

        // Trivia buffered by lookahead precedes this token in the source,
        // so it has to land in the tree first.
        self.drain_trivia();
        self.consume_exec_fuel();

        let token = self.tokens[self.pos];
        let text = token_text(self.source, &token);
        self.builder.token(token.kind.into(), text);
        self.pos += 1;
    }

    pub(super) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// On mismatch: emit a diagnostic and fabricate a zero-width token of the
    /// expected kind so the parent production still gets a typed slot.
    pub(super) fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        self.peek();
        if self.eat(kind) {
            return true;
        }
        self.error_msg(DiagnosticKind::UnexpectedToken, format!("expected {what}"));
        self.fabricate(kind);
        false
    }

    /// Adds a zero-width token of `kind`. Contributes no bytes, so lossless
    /// round-tripping is unaffected.
    pub(super) fn fabricate(&mut self, kind: SyntaxKind) {
        self.builder.token(kind.into(), "");
    }

    /// Emit diagnostic with default message for the kind.
    pub(super) fn error(&mut self, kind: DiagnosticKind) {
        self.error_msg(kind, kind.default_message());
    }

    /// Emit diagnostic with custom message.
    pub(super) fn error_msg(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let range = self.current_span();
        let pos = range.start();
        if self.last_diagnostic_pos == Some(pos) {
            return;
        }
        self.last_diagnostic_pos = Some(pos);
        self.diagnostics.report(kind, range).message(message).emit();
    }

    pub(super) fn error_and_bump(&mut self, kind: DiagnosticKind) {
        self.error_and_bump_msg(kind, kind.default_message());
    }

    pub(super) fn error_and_bump_msg(&mut self, kind: DiagnosticKind, message: &str) {
        self.error_msg(kind, message);
        if !self.should_stop() {
            self.start_node(SyntaxKind::Error);
            self.bump();
            self.finish_node();
        }
    }

    /// Consumes one balanced group (or a single stray token) into an Error
    /// node. Used when a node or expression slot cannot be aligned at all.
    pub(super) fn recover_balanced(&mut self, kind: DiagnosticKind, message: &str) {
        self.error_msg(kind, message);
        self.peek();
        if self.should_stop() || self.at(SyntaxKind::RightParen) {
            return;
        }
        self.start_node(SyntaxKind::Error);
        let mut depth = 0u32;
        loop {
            let current = self.peek();
            if self.should_stop() {
                break;
            }
            match current {
                SyntaxKind::LeftParen => {
                    depth += 1;
                    self.bump();
                }
                SyntaxKind::RightParen => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        break;
                    }
                }
                _ => {
                    self.bump();
                    if depth == 0 {
                        break;
                    }
                }
            }
        }
        self.finish_node();
    }

    /// Like [`Parser::recover_balanced`], but the opening `(` has already
    /// been consumed: wraps everything since `checkpoint` and eats tokens
    /// through the matching `)`.
    pub(super) fn recover_balanced_at(
        &mut self,
        checkpoint: Checkpoint,
        kind: DiagnosticKind,
        message: &str,
    ) {
        self.error_msg(kind, message);
        self.start_node_at(checkpoint, SyntaxKind::Error);
        let mut depth = 1u32;
        while depth > 0 {
            match self.peek() {
                SyntaxKind::LeftParen => depth += 1,
                SyntaxKind::RightParen => depth -= 1,
                _ => {}
            }
            if self.should_stop() {
                break;
            }
            self.bump();
        }
        self.finish_node();
        self.delimiter_stack.pop();
    }

    pub(super) fn enter_recursion(&mut self) -> bool {
        if let Some(limit) = self.recursion_fuel_limit
            && self.depth >= limit
        {
            if self.fatal_error.is_none() {
                self.fatal_error = Some(Error::RecursionLimitExceeded);
            }
            return false;
        }
        self.depth += 1;
        true
    }

    pub(super) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(super) fn push_delimiter(&mut self) {
        self.delimiter_stack.push(OpenDelimiter {
            span: self.current_span(),
        });
    }

    /// Closes the innermost paren group: bumps `)` when present, otherwise
    /// reports the unmatched `(` and inserts a `Missing` placeholder.
    pub(super) fn expect_close(&mut self, what: &str) {
        let open = self.delimiter_stack.pop();
        self.skip_trivia_to_buffer();
        if self.at(SyntaxKind::RightParen) {
            self.bump();
            return;
        }
        let range = self.current_span();
        let mut builder = self
            .diagnostics
            .report(DiagnosticKind::UnmatchedOpenParen, range)
            .message(format!("missing closing `)` for {what}"));
        if let Some(open) = open {
            builder = builder.related_to("opened here", open.span);
        }
        builder.emit();
        self.start_node(SyntaxKind::Missing);
        self.finish_node();
    }
}
