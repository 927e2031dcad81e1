//! Bottom-up construction of [`SyntaxTree`]s.
//!
//! Used by hosts that already hold a parsed model and by tests. Every node
//! gets a synthetic one-line span; every reference starts unresolved.

use crate::ast::{AnnotationKind, BinOp, Ident, Link, NodeId, NodeKind, SyntaxTree};
use crate::{Span, TreeError};

#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: SyntaxTree,
    line: u32,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_span(&mut self, width: usize) -> Span {
        self.line += 1;
        Span::new(self.line, 1, self.line, width.max(1) as u32)
    }

    fn ident(&mut self, name: &str) -> Ident {
        let span = self.next_span(name.len());
        Ident::new(name, span)
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let width = kind.declared_name().map_or(1, |ident| ident.name.len());
        let span = self.next_span(width);
        self.tree.add(kind, span)
    }

    fn decl(&mut self, kind: NodeKind) -> NodeId {
        let id = self.add(kind);
        self.tree.push_decl(id);
        id
    }

    // ── References & annotations ──

    pub fn reference(&mut self, text: &str) -> NodeId {
        self.add(NodeKind::Reference {
            text: text.to_string(),
            link: Link::pending(),
        })
    }

    /// Keyword annotation (`Integer`, `String`, `Boolean`, ...).
    pub fn builtin(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Annotation(AnnotationKind::Builtin(name.to_string())))
    }

    /// Annotation naming a concept.
    pub fn custom(&mut self, type_name: &str) -> NodeId {
        let reference = self.reference(type_name);
        self.add(NodeKind::Annotation(AnnotationKind::Custom(reference)))
    }

    // ── Declarations ──

    pub fn relation(&mut self, name: &str, relatum: NodeId) -> NodeId {
        let name = self.ident(name);
        self.add(NodeKind::Relation { name, relatum })
    }

    /// Top-level concept extending `parents` (by name).
    pub fn sig(&mut self, name: &str, parents: &[&str], relations: Vec<NodeId>) -> NodeId {
        let parents = parents.iter().map(|p| self.reference(p)).collect();
        let name = self.ident(name);
        self.decl(NodeKind::Sig {
            name,
            parents,
            relations,
        })
    }

    /// Top-level function. `signature` lists parameter annotations then the
    /// return annotation.
    pub fn function(
        &mut self,
        name: &str,
        params: &[&str],
        signature: Vec<NodeId>,
        body: NodeId,
    ) -> NodeId {
        let params = params.iter().map(|p| self.param(p)).collect();
        let name = self.ident(name);
        self.decl(NodeKind::Function {
            name,
            params,
            signature,
            body,
        })
    }

    pub fn param(&mut self, name: &str) -> NodeId {
        let name = self.ident(name);
        self.add(NodeKind::Parameter { name })
    }

    pub fn typed_param(&mut self, name: &str, annotation: NodeId) -> NodeId {
        let param = self.param(name);
        self.add(NodeKind::TypedParameter { param, annotation })
    }

    /// Top-level predicate over `TypedParameter` nodes.
    pub fn predicate(&mut self, name: &str, params: Vec<NodeId>, body: Option<NodeId>) -> NodeId {
        let name = self.ident(name);
        self.decl(NodeKind::Predicate { name, params, body })
    }

    /// Top-level variable.
    pub fn var(&mut self, name: &str, annotation: Option<NodeId>, value: Option<NodeId>) -> NodeId {
        let name = self.ident(name);
        self.decl(NodeKind::Var {
            name,
            annotation,
            value,
        })
    }

    // ── Expressions ──

    pub fn string(&mut self, value: &str) -> NodeId {
        self.add(NodeKind::StringLit(value.to_string()))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.add(NodeKind::BoolLit(value))
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.add(NodeKind::IntLit(value))
    }

    pub fn binary(&mut self, op: BinOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.add(NodeKind::Binary { op, lhs, rhs })
    }

    pub fn call(&mut self, callee: &str, args: Vec<NodeId>) -> NodeId {
        let callee = self.reference(callee);
        self.add(NodeKind::Call { callee, args })
    }

    /// `left.field`
    pub fn join(&mut self, left: NodeId, field: &str) -> NodeId {
        let right = self.reference(field);
        self.add(NodeKind::Join { left, right })
    }

    /// `root.f1.f2...` as a left-nested join chain.
    pub fn path(&mut self, root: &str, fields: &[&str]) -> NodeId {
        let start = self.reference(root);
        fields.iter().fold(start, |left, field| self.join(left, field))
    }

    pub fn if_then_else(&mut self, cond: NodeId, then_branch: NodeId, else_branch: NodeId) -> NodeId {
        self.add(NodeKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    // ── Linking ──

    /// Link `reference` to `target` directly, bypassing name lookup.
    pub fn link(&mut self, reference: NodeId, target: NodeId) -> Result<(), TreeError> {
        self.tree.set_link(reference, Link::Resolved(target))
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn finish(self) -> SyntaxTree {
        self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_are_registered_in_order() {
        let mut b = TreeBuilder::new();
        let a = b.sig("A", &[], vec![]);
        let one = b.int(1);
        let v = b.var("v", None, Some(one));
        let tree = b.finish();
        assert_eq!(tree.root_decls(), &[a, v]);
    }

    #[test]
    fn path_builds_left_nested_joins() {
        let mut b = TreeBuilder::new();
        let chain = b.path("x", &["a", "b"]);
        let tree = b.finish();
        let NodeKind::Join { left, right } = tree.kind(chain) else {
            panic!("expected join");
        };
        assert!(matches!(tree.kind(*left), NodeKind::Join { .. }));
        assert!(matches!(tree.kind(*right), NodeKind::Reference { text, .. } if text == "b"));
    }

    #[test]
    fn spans_are_distinct_lines() {
        let mut b = TreeBuilder::new();
        let one = b.int(1);
        let two = b.int(2);
        let tree = b.finish();
        assert!(tree.span(one).start_line < tree.span(two).start_line);
    }

    #[test]
    fn function_params_are_children() {
        let mut b = TreeBuilder::new();
        let int = b.builtin("Integer");
        let ret = b.builtin("Integer");
        let body = b.reference("n");
        let f = b.function("id", &["n"], vec![int, ret], body);
        let tree = b.finish();
        let NodeKind::Function { params, .. } = tree.kind(f) else {
            panic!("expected function");
        };
        assert_eq!(tree.parent(params[0]), Some(f));
        assert_eq!(tree.name_of(params[0]), Some("n"));
    }
}
