use crisp_ir::Literal;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::{SyntaxKind, parse};

use super::{ExprKind, Node, NodeKind, Program, expand, lower};

fn expand_source(source: &str) -> (Program, Diagnostics) {
    let parsed = parse(source).expect("within limits");
    let mut diagnostics = parsed.diagnostics.clone();
    let mut program = lower(&parsed, &mut diagnostics);
    expand(&mut program, &[], &mut diagnostics);
    (program, diagnostics)
}

fn only_body_node(program: &Program) -> &Node {
    let tree = program.trees.first().expect("a tree");
    assert_eq!(tree.body.len(), 1);
    &tree.body[0]
}

#[test]
fn defdec_expands_to_its_body() {
    let source = "(defdec guarded-timeout (s) (guard .IsAlive (timeout s <body>)))\n\
                  (tree T (guarded-timeout 1.0 (.Act)))";
    let (program, diagnostics) = expand_source(source);
    assert!(
        !diagnostics.has_errors(),
        "{}",
        diagnostics.printer().render()
    );

    let guard = only_body_node(&program);
    let NodeKind::Guard { cond, body } = &guard.kind else {
        panic!("expected a guard, got {:?}", guard.kind);
    };
    assert!(matches!(&cond.kind, ExprKind::Member(p) if p.segments() == ["IsAlive"]));

    let NodeKind::Timeout { seconds, child } = &body.kind else {
        panic!("expected a timeout, got {:?}", body.kind);
    };
    assert!(matches!(
        seconds.kind,
        ExprKind::Literal(Literal::Float(s)) if s == 1.0
    ));
    assert!(matches!(&child.kind, NodeKind::Action { path, .. } if path.segments() == ["Act"]));
}

#[test]
fn expanded_nodes_point_at_the_call_site() {
    let source = "(defdec guarded-timeout (s) (guard .IsAlive (timeout s <body>)))\n\
                  (tree T (guarded-timeout 1.0 (.Act)))";
    let parsed = parse(source).expect("within limits");
    let mut diagnostics = parsed.diagnostics.clone();
    let mut program = lower(&parsed, &mut diagnostics);
    expand(&mut program, &[], &mut diagnostics);

    // Id of the call-site TemplateCall CST node.
    let call_site = parsed
        .syntax()
        .descendants()
        .find(|n| n.kind() == SyntaxKind::TemplateCall)
        .expect("template call in the tree");
    let call_id = parsed.ids.id(&call_site);

    let guard = only_body_node(&program);
    assert_eq!(guard.origin.id, call_id);
    let NodeKind::Guard { cond, body } = &guard.kind else {
        panic!("expected a guard");
    };
    // Cloned definition expressions also point at the call site.
    assert_eq!(cond.origin.id, call_id);
    assert_eq!(body.origin.id, call_id);

    // The substituted argument and body keep their own call-site origins,
    // which are distinct CST nodes.
    let NodeKind::Timeout { seconds, child } = &body.kind else {
        panic!("expected a timeout");
    };
    assert_ne!(seconds.origin.id, call_id);
    assert_ne!(child.origin.id, call_id);
}

#[test]
fn defmacro_expands_without_a_body() {
    let (program, diagnostics) =
        expand_source("(defmacro twice () (seq (.Step) (.Step)))\n(tree T (twice))");
    assert!(!diagnostics.has_errors());
    let node = only_body_node(&program);
    let NodeKind::Sequence(children) = &node.kind else {
        panic!("expected the macro body, got {:?}", node.kind);
    };
    assert_eq!(children.len(), 2);
}

#[test]
fn member_expressions_substitute_into_parameters() {
    let source = "(defdec limit (t) (timeout t <body>))\n(tree T (limit .Patience (.Act)))";
    let (program, diagnostics) = expand_source(source);
    assert!(!diagnostics.has_errors());
    let NodeKind::Timeout { seconds, .. } = &only_body_node(&program).kind else {
        panic!("expected a timeout");
    };
    assert!(matches!(&seconds.kind, ExprKind::Member(p) if p.segments() == ["Patience"]));
}

#[test]
fn nested_calls_of_the_same_template_are_not_recursion() {
    let source = "(defdec gt (s) (timeout s <body>))\n(tree T (gt 1.0 (gt 2.0 (.A))))";
    let (program, diagnostics) = expand_source(source);
    assert!(
        !diagnostics.has_errors(),
        "{}",
        diagnostics.printer().render()
    );
    let NodeKind::Timeout { child, .. } = &only_body_node(&program).kind else {
        panic!("expected the outer timeout");
    };
    assert!(matches!(child.kind, NodeKind::Timeout { .. }));
}

#[test]
fn self_expansion_is_recursive() {
    let (_, diagnostics) =
        expand_source("(defdec spin () (invert (spin <body>)))\n(tree T (spin (.A)))");
    assert_eq!(
        diagnostics.of_kind(DiagnosticKind::RecursiveDefdec).len(),
        1
    );
}

#[test]
fn mutual_expansion_is_recursive() {
    let source = "(defdec a () (invert (b <body>)))\n\
                  (defdec b () (invert (a <body>)))\n\
                  (tree T (a (.X)))";
    let (_, diagnostics) = expand_source(source);
    assert!(
        !diagnostics
            .of_kind(DiagnosticKind::RecursiveDefdec)
            .is_empty()
    );
}

#[test]
fn wrong_argument_count() {
    let (_, diagnostics) =
        expand_source("(defdec d (a b) (guard (> a b) <body>))\n(tree T (d 1 (.X)))");
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::DefdecParamCountMismatch)
            .len(),
        1
    );
}

#[test]
fn unknown_decorator_and_macro() {
    let (_, diagnostics) = expand_source("(tree T (ghost (.X)))");
    assert_eq!(diagnostics.of_kind(DiagnosticKind::DefdecNotFound).len(), 1);

    let (_, diagnostics) = expand_source("(tree T (ghost))");
    assert_eq!(diagnostics.of_kind(DiagnosticKind::MacroNotFound).len(), 1);
}

#[test]
fn macro_rejects_a_child_node() {
    let (_, diagnostics) =
        expand_source("(defmacro m () (.Step))\n(tree T (m (.X)))");
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::InvalidMacroExpansion)
            .len(),
        1
    );
}

#[test]
fn defdec_body_must_use_the_placeholder_once() {
    let (_, diagnostics) = expand_source("(defdec d () (invert (.A)))");
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::MissingBodyPlaceholder)
            .len(),
        1
    );

    let (_, diagnostics) =
        expand_source("(defdec d () (seq <body> <body>))");
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::MultipleBodyPlaceholders)
            .len(),
        1
    );
}

#[test]
fn stray_placeholder_in_a_tree_is_rejected() {
    let (program, diagnostics) = expand_source("(tree T (invert <body>))");
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::InvalidMacroExpansion)
            .len(),
        1
    );
    let NodeKind::Invert(child) = &only_body_node(&program).kind else {
        panic!("expected an invert");
    };
    assert!(matches!(child.kind, NodeKind::Error));
}

#[test]
fn unknown_parameter_reference_is_rejected() {
    let (_, diagnostics) = expand_source("(tree T (timeout s (.A)))");
    assert_eq!(
        diagnostics
            .of_kind(DiagnosticKind::InvalidMacroExpansion)
            .len(),
        1
    );
}
