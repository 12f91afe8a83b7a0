//! Node-position grammar tests.

use super::{parse_ok, top_level_kinds};
use crate::parser::{SyntaxKind, TreeDef};

fn first_tree(source: &str) -> TreeDef {
    let result = parse_ok(source);
    assert!(
        !result.diagnostics.has_errors(),
        "unexpected errors: {}",
        result.diagnostics.printer().render()
    );
    result.program.trees().next().expect("a tree")
}

fn body_kinds(tree: &TreeDef) -> Vec<SyntaxKind> {
    tree.body().map(|n| n.kind()).collect()
}

#[test]
fn tree_with_name_and_body() {
    let tree = first_tree("(tree Patrol (.Walk))");
    assert_eq!(tree.name().unwrap().text(), "Patrol");
    assert_eq!(body_kinds(&tree), vec![SyntaxKind::Call]);
}

#[test]
fn tree_with_blackboard_option() {
    let tree = first_tree("(tree T :blackboard Board (check $.Ready))");
    assert_eq!(tree.blackboard_type().unwrap().text(), "Board");
    assert_eq!(body_kinds(&tree), vec![SyntaxKind::Check]);
}

#[test]
fn composites_nest() {
    let tree = first_tree("(tree T (select (seq (.A) (.B)) (.C)))");
    let select = tree.body().next().unwrap();
    assert_eq!(select.kind(), SyntaxKind::Selector);
    let kinds: Vec<SyntaxKind> = select.children().map(|n| n.kind()).collect();
    assert_eq!(kinds, vec![SyntaxKind::Sequence, SyntaxKind::Call]);
}

#[test]
fn parallel_policies() {
    for (source, _policy) in [
        ("(tree T (parallel :any (.A)))", ":any"),
        ("(tree T (parallel :all (.A)))", ":all"),
        ("(tree T (parallel :n 2 (.A) (.B)))", ":n"),
    ] {
        let tree = first_tree(source);
        let parallel = tree.body().next().unwrap();
        assert_eq!(parallel.kind(), SyntaxKind::Parallel);
    }
}

#[test]
fn decorators_take_expr_and_child() {
    let tree = first_tree(
        "(tree T (guard .IsAlive (.A)) (repeat 3 (.B)) (timeout 1.5 (.C)) (cooldown 2.0 (.D)))",
    );
    assert_eq!(
        body_kinds(&tree),
        vec![
            SyntaxKind::Guard,
            SyntaxKind::Repeat,
            SyntaxKind::Timeout,
            SyntaxKind::Cooldown
        ]
    );
}

#[test]
fn if_with_and_without_else() {
    let tree = first_tree("(tree T (if .A (.B)) (if .A (.B) (.C)))");
    let ifs: Vec<_> = tree.body().collect();
    assert_eq!(ifs.len(), 2);
    assert_eq!(ifs[0].children().filter(|n| n.kind().is_bt_node()).count(), 1);
    assert_eq!(ifs[1].children().filter(|n| n.kind().is_bt_node()).count(), 2);
}

#[test]
fn bare_member_is_a_zero_argument_action() {
    let tree = first_tree("(tree T .Patrol)");
    let call = tree.body().next().unwrap();
    assert_eq!(call.kind(), SyntaxKind::Call);
    assert_eq!(call.text().to_string(), ".Patrol");
}

#[test]
fn action_call_with_arguments() {
    let tree = first_tree("(tree T (.MoveTo 1.0 2.0))");
    let call = tree.body().next().unwrap();
    assert_eq!(call.kind(), SyntaxKind::Call);
    let args: Vec<SyntaxKind> = call.children().map(|n| n.kind()).collect();
    assert_eq!(args, vec![SyntaxKind::Literal, SyntaxKind::Literal]);
}

#[test]
fn ref_names_a_tree() {
    let tree = first_tree("(tree T (ref Other))");
    assert_eq!(body_kinds(&tree), vec![SyntaxKind::Ref]);
}

#[test]
fn template_definitions_and_calls() {
    let result = parse_ok(
        "(defdec gt (s) (guard .IsAlive (timeout s <body>)))\n(tree T (gt 1.0 (.Act)))",
    );
    assert!(!result.diagnostics.has_errors());
    assert_eq!(
        top_level_kinds(&result),
        vec![SyntaxKind::Defdec, SyntaxKind::TreeDef]
    );

    let defdec = result.program.defdecs().next().unwrap();
    assert_eq!(defdec.name().unwrap().text(), "gt");
    assert_eq!(defdec.params().unwrap().names(), vec!["s"]);
    assert_eq!(defdec.body().unwrap().kind(), SyntaxKind::Guard);

    let tree = result.program.trees().next().unwrap();
    let call = tree.body().next().unwrap();
    assert_eq!(call.kind(), SyntaxKind::TemplateCall);
    let children: Vec<SyntaxKind> = call.children().map(|n| n.kind()).collect();
    assert_eq!(children, vec![SyntaxKind::Literal, SyntaxKind::Call]);
}

#[test]
fn defmacro_parses_like_defdec() {
    let result = parse_ok("(defmacro twice () (seq (.Step) (.Step)))");
    assert!(!result.diagnostics.has_errors());
    let mac = result.program.defmacros().next().unwrap();
    assert_eq!(mac.name().unwrap().text(), "twice");
    assert!(mac.params().unwrap().names().is_empty());
    assert_eq!(mac.body().unwrap().kind(), SyntaxKind::Sequence);
}

#[test]
fn body_placeholder_in_defdec_body() {
    let result = parse_ok("(defdec d () (invert <body>))");
    assert!(!result.diagnostics.has_errors());
    let body = result.program.defdecs().next().unwrap().body().unwrap();
    assert!(
        body.descendants()
            .any(|n| n.kind() == SyntaxKind::Placeholder)
    );
}

#[test]
fn import_records_its_path() {
    let result = parse_ok("(import \"lib/common.crisp\")");
    assert!(!result.diagnostics.has_errors());
    let import = result.program.imports().next().unwrap();
    assert_eq!(import.path().unwrap(), "lib/common.crisp");
}
