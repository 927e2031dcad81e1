//! Concept ancestry.
//!
//! A concept may extend several parents, so the hierarchy is a DAG (diamonds
//! included). Only resolved parent links to concept declarations are
//! followed; dangling parents are skipped. A seen-set keeps the walk finite
//! even on malformed cyclic input.

use std::collections::HashSet;

use deon_types::ast::{NodeId, NodeKind, SyntaxTree};

/// `sig` followed by every concept reachable through parent links, each
/// exactly once, in depth-first discovery order (parents in declaration
/// order).
pub fn ancestors(tree: &SyntaxTree, sig: NodeId) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![sig];
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        out.push(current);
        if let NodeKind::Sig { parents, .. } = tree.kind(current) {
            let resolved = parents
                .iter()
                .filter_map(|parent| tree.target(*parent))
                .filter(|target| matches!(tree.kind(*target), NodeKind::Sig { .. }));
            let resolved: Vec<NodeId> = resolved.collect();
            stack.extend(resolved.into_iter().rev());
        }
    }
    out
}

/// Relation declarations of a single concept.
pub fn declared_relations(tree: &SyntaxTree, sig: NodeId) -> &[NodeId] {
    match tree.kind(sig) {
        NodeKind::Sig { relations, .. } => relations,
        _ => &[],
    }
}

/// Every relation visible on `sig`: `(declaring concept, relation)` pairs
/// in ancestor order, then declaration order.
pub fn visible_relations(tree: &SyntaxTree, sig: NodeId) -> Vec<(NodeId, NodeId)> {
    ancestors(tree, sig)
        .into_iter()
        .flat_map(|ancestor| {
            declared_relations(tree, ancestor)
                .iter()
                .map(move |relation| (ancestor, *relation))
        })
        .collect()
}

/// First relation named `name` visible on `sig`.
pub fn find_relation(tree: &SyntaxTree, sig: NodeId, name: &str) -> Option<(NodeId, NodeId)> {
    visible_relations(tree, sig)
        .into_iter()
        .find(|(_, relation)| tree.name_of(*relation) == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deon_types::ast::Link;
    use deon_types::TreeBuilder;

    /// Link every parent reference of every concept by name.
    fn link_parents(b: &mut TreeBuilder) {
        let tree = b.tree().clone();
        for decl in tree.root_decls() {
            if let NodeKind::Sig { parents, .. } = tree.kind(*decl) {
                for parent in parents {
                    let NodeKind::Reference { text, .. } = tree.kind(*parent) else {
                        continue;
                    };
                    if let Some(target) = tree
                        .root_decls()
                        .iter()
                        .find(|d| tree.name_of(**d) == Some(text.as_str()))
                    {
                        b.link(*parent, *target).unwrap();
                    }
                }
            }
        }
    }

    #[test]
    fn diamond_visits_each_ancestor_once() {
        let mut b = TreeBuilder::new();
        let a = b.sig("A", &[], vec![]);
        let bb = b.sig("B", &["A"], vec![]);
        let c = b.sig("C", &["A"], vec![]);
        let d = b.sig("D", &["B", "C"], vec![]);
        link_parents(&mut b);
        let tree = b.finish();

        let result = ancestors(&tree, d);
        assert_eq!(result[0], d);
        assert_eq!(result.len(), 4);
        assert_eq!(result.iter().filter(|n| **n == a).count(), 1);
        assert!(result.contains(&bb) && result.contains(&c));
        assert_eq!(result, vec![d, bb, a, c]);
    }

    #[test]
    fn unresolved_parents_are_skipped() {
        let mut b = TreeBuilder::new();
        let orphan = b.sig("Orphan", &["Missing"], vec![]);
        let tree = b.finish();
        assert_eq!(ancestors(&tree, orphan), vec![orphan]);
    }

    #[test]
    fn cyclic_parents_terminate() {
        let mut b = TreeBuilder::new();
        let x = b.sig("X", &["Y"], vec![]);
        let y = b.sig("Y", &["X"], vec![]);
        link_parents(&mut b);
        let tree = b.finish();
        assert_eq!(ancestors(&tree, x), vec![x, y]);
        assert_eq!(ancestors(&tree, y), vec![y, x]);
    }

    #[test]
    fn parent_linked_to_non_concept_is_ignored() {
        let mut b = TreeBuilder::new();
        let one = b.int(1);
        let v = b.var("v", None, Some(one));
        let s = b.sig("S", &["v"], vec![]);
        let tree = b.tree().clone();
        let NodeKind::Sig { parents, .. } = tree.kind(s) else {
            unreachable!()
        };
        let mut tree = b.finish();
        tree.set_link(parents[0], Link::Resolved(v)).unwrap();
        assert_eq!(ancestors(&tree, s), vec![s]);
    }

    #[test]
    fn relations_are_found_on_ancestors() {
        let mut b = TreeBuilder::new();
        let int = b.builtin("Integer");
        let amount = b.relation("amount", int);
        let base = b.sig("Base", &[], vec![amount]);
        let text = b.builtin("String");
        let label = b.relation("label", text);
        let derived = b.sig("Derived", &["Base"], vec![label]);
        link_parents(&mut b);
        let tree = b.finish();

        assert_eq!(
            visible_relations(&tree, derived),
            vec![(derived, label), (base, amount)]
        );
        assert_eq!(find_relation(&tree, derived, "amount"), Some((base, amount)));
        assert_eq!(find_relation(&tree, base, "label"), None);
    }
}
