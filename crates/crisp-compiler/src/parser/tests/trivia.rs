//! Trivia handling: comments and whitespace land in the tree in source order.

use super::parse_ok;
use crate::parser::{SyntaxKind, dump_cst};

#[test]
fn whitespace_lands_between_tokens() {
    let result = parse_ok("(tree T (.Patrol))");
    assert!(!result.diagnostics.has_errors());
    insta::assert_snapshot!(dump_cst(result.syntax()), @r#"
    Program
      TreeDef
        LeftParen "("
        Identifier "tree"
        Whitespace " "
        Identifier "T"
        Whitespace " "
        Call
          LeftParen "("
          MemberAccess ".Patrol"
          RightParen ")"
        RightParen ")"
    "#);
}

#[test]
fn leading_comment_attaches_before_the_tree() {
    let result = parse_ok("; header\n(tree T .Go)");
    assert!(!result.diagnostics.has_errors());
    insta::assert_snapshot!(dump_cst(result.syntax()), @r#"
    Program
      Comment "; header"
      Newline "\n"
      TreeDef
        LeftParen "("
        Identifier "tree"
        Whitespace " "
        Identifier "T"
        Whitespace " "
        Call
          MemberAccess ".Go"
        RightParen ")"
    "#);
}

#[test]
fn trailing_comment_attaches_at_the_end() {
    let source = "(tree T .Go)\n; after";
    let result = parse_ok(source);
    assert!(!result.diagnostics.has_errors());
    let program = result.syntax();
    let last_token = program
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .last()
        .unwrap();
    assert_eq!(last_token.kind(), SyntaxKind::Comment);
    assert_eq!(last_token.text(), "; after");
}

#[test]
fn comment_inside_a_composite_stays_in_place() {
    let source = "(tree T (select ; pick one\n  (.A)))";
    let result = parse_ok(source);
    assert!(!result.diagnostics.has_errors());
    assert_eq!(result.syntax().text().to_string(), source);

    let select = result
        .syntax()
        .descendants()
        .find(|n| n.kind() == SyntaxKind::Selector)
        .unwrap();
    let comment = select
        .children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == SyntaxKind::Comment)
        .unwrap();
    assert_eq!(comment.text(), "; pick one");
}

#[test]
fn every_comment_survives_in_the_tree() {
    let source = "; one\n(tree T ; two\n  .Go) ; three\n; four";
    let result = parse_ok(source);
    let comments: Vec<String> = result
        .syntax()
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| t.kind() == SyntaxKind::Comment)
        .map(|t| t.text().to_string())
        .collect();
    assert_eq!(comments, vec!["; one", "; two", "; three", "; four"]);
}
