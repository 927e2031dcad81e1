//! Linker and scope-provider tests.

use deon_checker::scope::{candidates, context_of, relation_names, RefContext};
use deon_checker::{check_model, link, CheckOptions, TypeChecker, TypeEnv};
use deon_types::ast::{AnnotationKind, Link, NodeId, NodeKind, SyntaxTree};
use deon_types::{ErrorCode, TreeBuilder};

fn link_all(tree: &mut SyntaxTree) -> deon_checker::LinkReport {
    link(tree, &CheckOptions::default()).expect("linking failed")
}

fn text_of(tree: &SyntaxTree, reference: NodeId) -> &str {
    match tree.kind(reference) {
        NodeKind::Reference { text, .. } => text,
        other => panic!("expected a reference, found a {}", other.label()),
    }
}

fn find_reference(tree: &SyntaxTree, text: &str) -> NodeId {
    tree.references()
        .into_iter()
        .find(|r| text_of(tree, *r) == text)
        .unwrap_or_else(|| panic!("no reference '{text}'"))
}

#[test]
fn links_parents_annotations_and_values() {
    let mut b = TreeBuilder::new();
    let a = b.sig("A", &[], vec![]);
    let child = b.sig("B", &["A"], vec![]);
    let ann = b.custom("B");
    let x = b.var("x", Some(ann), None);
    let value = b.reference("x");
    b.var("y", None, Some(value));
    let mut tree = b.finish();

    let report = link_all(&mut tree);
    assert!(report.is_complete());
    assert_eq!(report.resolved, 3);
    assert_eq!(report.passes, 1);

    let NodeKind::Sig { parents, .. } = tree.kind(child) else {
        unreachable!()
    };
    assert_eq!(tree.target(parents[0]), Some(a));
    assert_eq!(tree.target(value), Some(x));
}

#[test]
fn forward_join_needs_a_second_pass() {
    // var early = later.amount
    // concept Box { amount: Integer }
    // var later: Box
    let mut b = TreeBuilder::new();
    let path = b.path("later", &["amount"]);
    b.var("early", None, Some(path));
    let int = b.builtin("Integer");
    let amount = b.relation("amount", int);
    b.sig("Box", &[], vec![amount]);
    let ann = b.custom("Box");
    b.var("later", Some(ann), None);
    let mut tree = b.finish();

    let report = link_all(&mut tree);
    assert!(report.is_complete(), "unresolved: {:?}", report.unresolved);
    assert_eq!(report.passes, 2);
    assert_eq!(tree.target(find_reference(&tree, "amount")), Some(amount));

    let result = check_model(&tree);
    assert!(result.success);
    assert_eq!(result.declarations[0].ty, "Integer");
}

#[test]
fn unresolved_references_get_a_message() {
    let mut b = TreeBuilder::new();
    let ghost = b.reference("ghost");
    b.var("v", None, Some(ghost));
    let mut tree = b.finish();

    let report = link_all(&mut tree);
    assert_eq!(report.unresolved, vec![ghost]);
    match tree.kind(ghost) {
        NodeKind::Reference {
            link: Link::Unresolved { message },
            ..
        } => assert_eq!(message.as_deref(), Some("could not resolve reference to 'ghost'")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn relinking_a_linked_tree_changes_nothing() {
    let mut b = TreeBuilder::new();
    b.sig("A", &[], vec![]);
    let ann = b.custom("A");
    b.var("a", Some(ann), None);
    let mut tree = b.finish();

    link_all(&mut tree);
    let before = tree.clone();
    let again = link_all(&mut tree);
    assert_eq!(again.resolved, 0);
    assert_eq!(again.passes, 0);
    assert_eq!(tree, before);
}

#[test]
fn parameters_shadow_top_level_declarations() {
    let mut b = TreeBuilder::new();
    let one = b.int(1);
    b.var("n", None, Some(one));
    let int = b.builtin("Integer");
    let ret = b.builtin("Integer");
    let body = b.reference("n");
    let f = b.function("id", &["n"], vec![int, ret], body);
    let mut tree = b.finish();

    link_all(&mut tree);
    let NodeKind::Function { params, .. } = tree.kind(f) else {
        unreachable!()
    };
    assert_eq!(tree.target(body), Some(params[0]));
}

#[test]
fn predicate_parameters_are_in_scope() {
    let mut b = TreeBuilder::new();
    let int = b.builtin("Integer");
    let typed = b.typed_param("n", int);
    let body = b.reference("n");
    b.predicate("p", vec![typed], Some(body));
    let mut tree = b.finish();

    link_all(&mut tree);
    let NodeKind::TypedParameter { param, .. } = tree.kind(typed) else {
        unreachable!()
    };
    assert_eq!(tree.target(body), Some(*param));
}

#[test]
fn callees_only_name_functions_and_predicates() {
    let mut b = TreeBuilder::new();
    let one = b.int(1);
    b.var("g", None, Some(one));
    let arg = b.int(2);
    let call = b.call("g", vec![arg]);
    b.var("r", None, Some(call));
    let mut tree = b.finish();

    let callee = match tree.kind(call) {
        NodeKind::Call { callee, .. } => *callee,
        _ => unreachable!(),
    };
    assert_eq!(context_of(&tree, callee), RefContext::Callee);
    let report = link_all(&mut tree);
    assert_eq!(report.unresolved, vec![callee]);
}

#[test]
fn annotations_only_name_concepts() {
    let mut b = TreeBuilder::new();
    let one = b.int(1);
    b.var("v", None, Some(one));
    let ann = b.custom("v");
    b.var("w", Some(ann), None);
    let mut tree = b.finish();

    let reference = match tree.kind(ann) {
        NodeKind::Annotation(AnnotationKind::Custom(r)) => *r,
        _ => unreachable!(),
    };
    assert_eq!(context_of(&tree, reference), RefContext::Concept);
    link_all(&mut tree);
    assert_eq!(tree.target(reference), None);

    let result = check_model(&tree);
    assert!(result.diagnostics.has_code(ErrorCode::UNKNOWN_ANNOTATION));
    assert!(result
        .diagnostics
        .errors
        .iter()
        .any(|d| d.message == "annotation 'v' not found (linking issue)"));
}

#[test]
fn value_candidates_list_parameters_first() {
    let mut b = TreeBuilder::new();
    b.sig("A", &[], vec![]);
    let int = b.builtin("Integer");
    let ret = b.builtin("Integer");
    let body = b.reference("x");
    b.function("f", &["x"], vec![int, ret], body);
    let tree = b.finish();

    let mut checker = TypeChecker::new(&tree);
    let names: Vec<String> = candidates(&mut checker, &TypeEnv::new(), body)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["x", "A", "f"]);
}

#[test]
fn relation_names_follow_ancestor_order() {
    let mut b = TreeBuilder::new();
    let int = b.builtin("Integer");
    let id = b.relation("id", int);
    b.sig("Base", &[], vec![id]);
    let text = b.builtin("String");
    let label = b.relation("label", text);
    let int = b.builtin("Integer");
    let shadow = b.relation("id", int);
    let derived = b.sig("Derived", &["Base"], vec![label, shadow]);
    let mut tree = b.finish();

    link_all(&mut tree);
    assert_eq!(relation_names(&tree, derived), vec!["label", "id"]);
}
