use indoc::indoc;

use super::{FormatOptions, format_source};
use crate::parser::{SyntaxKind, parse};

fn fmt(source: &str) -> String {
    format_source(source, &FormatOptions::default()).expect("within limits")
}

fn fmt_width(source: &str, width: usize) -> String {
    let options = FormatOptions {
        max_line_width: width,
        ..FormatOptions::default()
    };
    format_source(source, &options).expect("within limits")
}

#[test]
fn short_trees_stay_flat() {
    assert_eq!(fmt("(tree T   (.Patrol)  )"), "(tree T (.Patrol))\n");
}

#[test]
fn wide_trees_break_by_node() {
    let source = "(tree T (select (seq (check (< .Health 30)) (.Flee)) (.Patrol)))";
    assert_eq!(
        fmt_width(source, 30),
        indoc! {"
            (tree T
              (select
                (seq
                  (check (< .Health 30))
                  (.Flee))
                (.Patrol)))
        "}
    );
}

#[test]
fn align_close_paren_option() {
    let source = "(tree T (select (.A) (.B)))";
    let options = FormatOptions {
        max_line_width: 20,
        align_close_paren: true,
        ..FormatOptions::default()
    };
    assert_eq!(
        format_source(source, &options).unwrap(),
        indoc! {"
            (tree T
              (select
                (.A)
                (.B)
              )
            )
        "}
    );
}

#[test]
fn blank_line_between_trees() {
    let out = fmt("(tree A (.X))(tree B (.Y))");
    assert_eq!(out, "(tree A (.X))\n\n(tree B (.Y))\n");

    let options = FormatOptions {
        blank_line_between_trees: false,
        ..FormatOptions::default()
    };
    let out = format_source("(tree A (.X))(tree B (.Y))", &options).unwrap();
    assert_eq!(out, "(tree A (.X))\n(tree B (.Y))\n");
}

#[test]
fn leading_and_trailing_file_comments_survive() {
    let source = "; header\n(tree T (.Go))\n; after";
    let out = fmt(source);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.first(), Some(&"; header"));
    assert_eq!(lines.last(), Some(&"; after"));
}

#[test]
fn interior_comments_force_multiline_and_survive() {
    let source = "(tree T (select ; pick\n (.A) (.B)))";
    let out = fmt(source);
    assert!(out.contains("; pick"), "{out}");
    // Still parses, and the comment count is preserved.
    let reparsed = parse(&out).unwrap();
    assert!(!reparsed.diagnostics.has_errors());
    let comments = reparsed
        .syntax()
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| t.kind() == SyntaxKind::Comment)
        .count();
    assert_eq!(comments, 1);
}

#[test]
fn every_comment_appears_exactly_once() {
    let source = "; one\n(tree T ; two\n (select ; three\n (.A) ; four\n (.B))) ; five\n; six";
    let out = fmt(source);
    for needle in ["; one", "; two", "; three", "; four", "; five", "; six"] {
        assert_eq!(
            out.matches(needle).count(),
            1,
            "{needle} in output:\n{out}"
        );
    }
}

#[test]
fn formatter_is_idempotent() {
    let sources = [
        "(tree T (select (seq (check (< .Health 30)) (.Flee)) (.Patrol)))",
        "(tree T ; note\n (parallel :n 2 (.A) (.B)))",
        "; top\n(defdec gt (s) (guard .IsAlive (timeout s <body>)))\n(tree T (gt 1.0 (.Act)))",
        "(tree T :blackboard Board (check $.Ready) (.MoveTo 1.0 2.0))",
        "(tree A (.X))\n\n(tree B (if .C (.D) (.E)))",
    ];
    for source in sources {
        let once = fmt(source);
        let twice = fmt(&once);
        assert_eq!(once, twice, "not idempotent for {source:?}");

        let narrow_once = fmt_width(source, 24);
        let narrow_twice = fmt_width(&narrow_once, 24);
        assert_eq!(narrow_once, narrow_twice, "not idempotent at width 24 for {source:?}");
    }
}

#[test]
fn formatting_preserves_program_meaning() {
    let source = "(tree T (select (seq (check (< .Health 30)) (.Flee)) (.Patrol)))";
    let out = fmt_width(source, 24);
    let reparsed = parse(&out).unwrap();
    assert!(!reparsed.diagnostics.has_errors());
    let kinds: Vec<SyntaxKind> = reparsed
        .syntax()
        .descendants()
        .map(|n| n.kind())
        .collect();
    let original: Vec<SyntaxKind> = parse(source)
        .unwrap()
        .syntax()
        .descendants()
        .map(|n| n.kind())
        .collect();
    assert_eq!(kinds, original);
}
