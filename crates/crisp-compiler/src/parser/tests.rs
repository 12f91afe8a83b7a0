mod nodes;
mod recovery;
mod trivia;

use super::{ParseResult, parse};

fn parse_ok(source: &str) -> ParseResult {
    parse(source).expect("test inputs stay within default limits")
}

/// Kinds of the top-level forms of a parsed program.
fn top_level_kinds(result: &ParseResult) -> Vec<super::SyntaxKind> {
    result.syntax().children().map(|n| n.kind()).collect()
}
