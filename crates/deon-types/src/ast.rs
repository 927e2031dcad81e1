//! Syntax tree for Deon models.
//!
//! The tree is an append-only arena: every node is addressed by a [`NodeId`]
//! and node identity is `NodeId` equality, never structural equality.
//! Children are allocated before their parent; [`SyntaxTree::add`] wires the
//! parent links. The only mutation after construction is reference linking
//! via [`SyntaxTree::set_link`], which belongs to the host linker.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Span, TreeError};

// ══════════════════════════════════════════════════════════════════════════════
// Node identity
// ══════════════════════════════════════════════════════════════════════════════

/// Index of a node in its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// References
// ══════════════════════════════════════════════════════════════════════════════

/// Resolution state of a reference node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// Linked to its target declaration.
    Resolved(NodeId),
    /// Not linked (yet). `message` is set once the linker gave up.
    Unresolved { message: Option<String> },
}

impl Link {
    pub fn pending() -> Self {
        Link::Unresolved { message: None }
    }

    pub fn target(&self) -> Option<NodeId> {
        match self {
            Link::Resolved(target) => Some(*target),
            Link::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Link::Resolved(_))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Node kinds
// ══════════════════════════════════════════════════════════════════════════════

/// Binary operators (in precedence order, lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Logical
    Or,
    And,
    // Comparison
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Shape of a type annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationKind {
    /// A keyword type such as `Integer`. Only `String`, `Integer` and
    /// `Boolean` are known to the checker.
    Builtin(String),
    /// A concept type, named through a reference node.
    Custom(NodeId),
}

/// The kind of a syntax node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    // ── Declarations ──
    /// `concept Name extends P1, P2 { relations }`
    Sig {
        name: Ident,
        /// Reference nodes naming parent concepts.
        parents: Vec<NodeId>,
        relations: Vec<NodeId>,
    },
    /// `name: Annotation` inside a concept.
    Relation { name: Ident, relatum: NodeId },
    /// `function name(params): T1 -> ... -> R = body`
    ///
    /// `signature` holds the parameter annotations followed by the return
    /// annotation.
    Function {
        name: Ident,
        params: Vec<NodeId>,
        signature: Vec<NodeId>,
        body: NodeId,
    },
    /// `predicate name(p: T, ...) { body }`
    Predicate {
        name: Ident,
        /// `TypedParameter` nodes.
        params: Vec<NodeId>,
        body: Option<NodeId>,
    },
    /// A formal parameter name.
    Parameter { name: Ident },
    /// `param: Annotation`
    TypedParameter { param: NodeId, annotation: NodeId },
    /// `var name [: Annotation] [= value]`
    Var {
        name: Ident,
        annotation: Option<NodeId>,
        value: Option<NodeId>,
    },
    Annotation(AnnotationKind),

    // ── Expressions ──
    /// A name occurrence, linked (or not) to its declaration.
    Reference { text: String, link: Link },
    /// `left.right`: relational join / field access. `right` is a reference.
    Join { left: NodeId, right: NodeId },
    StringLit(String),
    BoolLit(bool),
    IntLit(i64),
    Binary { op: BinOp, lhs: NodeId, rhs: NodeId },
    /// `callee(args...)`; `callee` is a reference.
    Call { callee: NodeId, args: Vec<NodeId> },
    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
}

impl NodeKind {
    /// Direct children, in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Sig {
                parents, relations, ..
            } => parents.iter().chain(relations).copied().collect(),
            NodeKind::Relation { relatum, .. } => vec![*relatum],
            NodeKind::Function {
                params,
                signature,
                body,
                ..
            } => params
                .iter()
                .chain(signature)
                .copied()
                .chain(std::iter::once(*body))
                .collect(),
            NodeKind::Predicate { params, body, .. } => {
                params.iter().copied().chain(*body).collect()
            }
            NodeKind::TypedParameter { param, annotation } => vec![*param, *annotation],
            NodeKind::Var {
                annotation, value, ..
            } => annotation.iter().chain(value).copied().collect(),
            NodeKind::Annotation(AnnotationKind::Custom(reference)) => vec![*reference],
            NodeKind::Join { left, right } => vec![*left, *right],
            NodeKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::Call { callee, args } => {
                std::iter::once(*callee).chain(args.iter().copied()).collect()
            }
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => vec![*cond, *then_branch, *else_branch],
            NodeKind::Parameter { .. }
            | NodeKind::Annotation(AnnotationKind::Builtin(_))
            | NodeKind::Reference { .. }
            | NodeKind::StringLit(_)
            | NodeKind::BoolLit(_)
            | NodeKind::IntLit(_) => Vec::new(),
        }
    }

    /// Declared name, for declaration kinds.
    pub fn declared_name(&self) -> Option<&Ident> {
        match self {
            NodeKind::Sig { name, .. }
            | NodeKind::Relation { name, .. }
            | NodeKind::Function { name, .. }
            | NodeKind::Predicate { name, .. }
            | NodeKind::Parameter { name }
            | NodeKind::Var { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Short lowercase label used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Sig { .. } => "concept",
            NodeKind::Relation { .. } => "relation",
            NodeKind::Function { .. } => "function",
            NodeKind::Predicate { .. } => "predicate",
            NodeKind::Parameter { .. } => "parameter",
            NodeKind::TypedParameter { .. } => "typed parameter",
            NodeKind::Var { .. } => "variable",
            NodeKind::Annotation(_) => "annotation",
            NodeKind::Reference { .. } => "reference",
            NodeKind::Join { .. } => "join",
            NodeKind::StringLit(_) => "string literal",
            NodeKind::BoolLit(_) => "boolean literal",
            NodeKind::IntLit(_) => "integer literal",
            NodeKind::Binary { .. } => "binary expression",
            NodeKind::Call { .. } => "call",
            NodeKind::If { .. } => "conditional",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Tree
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub span: Span,
}

/// Arena holding every node of one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    decls: Vec<NodeId>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node and adopt its children.
    pub fn add(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            if let Some(node) = self.nodes.get_mut(child.index()) {
                node.parent = Some(id);
            }
        }
        self.nodes.push(Node {
            kind,
            parent: None,
            span,
        });
        id
    }

    /// Register `decl` as a top-level declaration of the model.
    pub fn push_decl(&mut self, decl: NodeId) {
        self.decls.push(decl);
    }

    pub fn root_decls(&self) -> &[NodeId] {
        &self.decls
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// The node behind `id`.
    ///
    /// Panics if `id` was not allocated by this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.kind(id).declared_name().map(|ident| ident.name.as_str())
    }

    /// Nearest enclosing function or predicate declaration.
    pub fn container(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if matches!(
                self.kind(node),
                NodeKind::Function { .. } | NodeKind::Predicate { .. }
            ) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Link target of a reference node; `None` for unresolved references
    /// and non-reference nodes.
    pub fn target(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Reference { link, .. } => link.target(),
            _ => None,
        }
    }

    /// Every reference node reachable from the top-level declarations, in
    /// pre-order. The left operand of a join is always visited before its
    /// right-hand reference.
    pub fn references(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.decls.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if matches!(self.kind(id), NodeKind::Reference { .. }) {
                out.push(id);
            }
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    /// Link a reference. Intended for the host linker only.
    ///
    /// Fails if `reference` is not a reference node of this tree or if a
    /// resolved link points outside the tree.
    pub fn set_link(&mut self, reference: NodeId, new_link: Link) -> Result<(), TreeError> {
        if let Some(target) = new_link.target() {
            if self.get(target).is_none() {
                return Err(TreeError::UnknownNode(target));
            }
        }
        let node = self
            .nodes
            .get_mut(reference.index())
            .ok_or(TreeError::UnknownNode(reference))?;
        match &mut node.kind {
            NodeKind::Reference { link, .. } => {
                *link = new_link;
                Ok(())
            }
            _ => Err(TreeError::NotAReference(reference)),
        }
    }
}
