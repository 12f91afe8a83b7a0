//! Error-recovery behavior: the parser must always terminate, always consume
//! all tokens, and always produce a complete tree.

use super::parse_ok;
use crate::diagnostics::DiagnosticKind;
use crate::parser::SyntaxKind;

#[test]
fn missing_close_paren_reports_the_open() {
    let result = parse_ok("(tree T (select (.A)");
    let diags = result.diagnostics.of_kind(DiagnosticKind::UnmatchedOpenParen);
    assert!(!diags.is_empty());
    assert!(
        result
            .syntax()
            .descendants()
            .any(|n| n.kind() == SyntaxKind::Missing)
    );
}

#[test]
fn unexpected_close_paren() {
    let result = parse_ok("(tree T (.A)))");
    let diags = result
        .diagnostics
        .of_kind(DiagnosticKind::UnexpectedCloseParen);
    assert_eq!(diags.len(), 1);
}

#[test]
fn garbage_is_wrapped_and_parsing_continues() {
    let result = parse_ok("(tree T #@! (.A))");
    assert!(result.diagnostics.has_errors());
    // The garbage run lands in one Error node; the action still parses.
    assert!(
        result
            .syntax()
            .descendants()
            .any(|n| n.kind() == SyntaxKind::Error)
    );
    assert!(
        result
            .syntax()
            .descendants()
            .any(|n| n.kind() == SyntaxKind::Call)
    );
}

#[test]
fn missing_tree_name_is_fabricated() {
    let result = parse_ok("(tree (select))");
    assert!(result.diagnostics.has_errors());
    let tree = result.program.trees().next().unwrap();
    // The fabricated identifier is zero-width, so the accessor reports no name.
    assert!(tree.name().is_none());
    // The body still parsed into a typed slot.
    assert_eq!(
        tree.body().map(|n| n.kind()).collect::<Vec<_>>(),
        vec![SyntaxKind::Selector]
    );
}

#[test]
fn nested_definitions_are_rejected_but_contained() {
    let result = parse_ok("(tree T (tree U (.A)) (.B))");
    assert!(result.diagnostics.has_errors());
    let tree = result.program.trees().next().unwrap();
    // The nested definition is consumed; the following action still parses.
    assert!(tree.body().any(|n| n.kind() == SyntaxKind::Call));
}

#[test]
fn stray_tokens_inside_composites_are_consumed() {
    let result = parse_ok("(tree T (select 5 (.A)))");
    assert!(result.diagnostics.has_errors());
    let select = result
        .syntax()
        .descendants()
        .find(|n| n.kind() == SyntaxKind::Selector)
        .unwrap();
    assert!(select.children().any(|n| n.kind() == SyntaxKind::Call));
}

#[test]
fn missing_parallel_policy_is_fabricated() {
    let result = parse_ok("(tree T (parallel (.A)))");
    assert!(result.diagnostics.has_errors());
    let parallel = result
        .syntax()
        .descendants()
        .find(|n| n.kind() == SyntaxKind::Parallel)
        .unwrap();
    assert!(parallel.children().any(|n| n.kind() == SyntaxKind::Call));
}

#[test]
fn check_without_condition() {
    let result = parse_ok("(tree T (check))");
    let diags = result
        .diagnostics
        .of_kind(DiagnosticKind::InsufficientChildren);
    assert_eq!(diags.len(), 1);
}

#[test]
fn deeply_nested_input_hits_the_recursion_limit() {
    let mut source = String::from("(tree T ");
    for _ in 0..3000 {
        source.push_str("(invert ");
    }
    source.push_str("(.A)");
    for _ in 0..3000 {
        source.push(')');
    }
    source.push(')');

    let tokens = crate::parser::lex(&source);
    let result = crate::parser::Parser::new(&source, tokens).parse();
    assert!(matches!(result, Err(crate::Error::RecursionLimitExceeded)));
}
