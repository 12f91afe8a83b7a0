//! Lexer for the Crisp language.
//!
//! Produces span-based tokens without storing text - text is sliced from
//! source only when needed.
//!
//! ## Post-processing
//!
//! Two fixups run over the raw Logos output:
//! - Consecutive error characters coalesce into single `Error` tokens so
//!   malformed input stays manageable.
//! - A `-`-prefixed numeric literal that immediately follows `(` (ignoring
//!   trivia) is split into a `Minus` operator plus an unsigned literal:
//!   `(- 1 2)` subtracts, `(< .Health -30)` compares against minus thirty.

use logos::Logos;
use rowan::TextRange;
use std::ops::Range;

use super::cst::SyntaxKind;

/// Zero-copy token: kind + span, text retrieved via [`token_text`] when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub span: TextRange,
}

impl Token {
    #[inline]
    pub fn new(kind: SyntaxKind, span: TextRange) -> Self {
        Self { kind, span }
    }
}

fn range_to_text_range(range: Range<usize>) -> TextRange {
    TextRange::new((range.start as u32).into(), (range.end as u32).into())
}

/// Tokenizes source into a vector of span-based tokens.
///
/// Always ends with a zero-width `EndOfFile` token.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = SyntaxKind::lexer(source);
    let mut error_start: Option<usize> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(start) = error_start.take() {
                    let end = lexer.span().start;
                    tokens.push(Token::new(SyntaxKind::Error, range_to_text_range(start..end)));
                }

                let span = lexer.span();
                if matches!(kind, SyntaxKind::IntLiteral | SyntaxKind::FloatLiteral)
                    && source[span.clone()].starts_with('-')
                    && follows_left_paren(&tokens)
                {
                    split_leading_minus(kind, span, &mut tokens);
                } else {
                    tokens.push(Token::new(kind, range_to_text_range(span)));
                }
            }
            Some(Err(())) => {
                if error_start.is_none() {
                    error_start = Some(lexer.span().start);
                }
            }
            None => {
                if let Some(start) = error_start.take() {
                    tokens.push(Token::new(
                        SyntaxKind::Error,
                        range_to_text_range(start..source.len()),
                    ));
                }
                break;
            }
        }
    }

    let eof = source.len() as u32;
    tokens.push(Token::new(
        SyntaxKind::EndOfFile,
        TextRange::empty(eof.into()),
    ));
    tokens
}

/// Whether the last significant token emitted so far is `(`.
fn follows_left_paren(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .rev()
        .find(|t| !t.kind.is_trivia())
        .is_some_and(|t| t.kind == SyntaxKind::LeftParen)
}

/// Splits `-30` into `-` + `30` when the minus is an operator position.
fn split_leading_minus(kind: SyntaxKind, span: Range<usize>, tokens: &mut Vec<Token>) {
    tokens.push(Token::new(
        SyntaxKind::Minus,
        range_to_text_range(span.start..span.start + 1),
    ));
    tokens.push(Token::new(
        kind,
        range_to_text_range(span.start + 1..span.end),
    ));
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[std::ops::Range::<usize>::from(token.span)]
}

/// Whether a `StringLiteral` token's text carries its closing quote.
pub fn string_is_terminated(text: &str) -> bool {
    if text.len() < 2 || !text.ends_with('"') {
        return false;
    }
    // The closing quote must not be escaped: count the backslashes before it.
    let body = &text[..text.len() - 1];
    let backslashes = body.chars().rev().take_while(|&c| c == '\\').count();
    backslashes % 2 == 0
}
