//! Scope provider and linker.
//!
//! Decides which declarations a reference may name, and links every
//! reference of a tree by name against that set. Right-hand names of joins
//! depend on the type of the join's left operand, so linking asks the
//! checker; the checker in turn reads the links made so far. Linking runs
//! in passes until no more references can be resolved.

use log::debug;

use deon_types::ast::{AnnotationKind, Link, NodeId, NodeKind, SyntaxTree};
use deon_types::TreeError;

use crate::ancestors::visible_relations;
use crate::checker::TypeChecker;
use crate::env::TypeEnv;
use crate::options::CheckOptions;

/// Names of every relation visible on concept `sig`, first occurrence wins.
pub fn relation_names(tree: &SyntaxTree, sig: NodeId) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (_, relation) in visible_relations(tree, sig) {
        if let Some(name) = tree.name_of(relation) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// What a reference is allowed to name, based on where it sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefContext {
    /// Right-hand side of a join: a relation of the left operand.
    JoinField(NodeId),
    /// Parent list or custom annotation: a concept.
    Concept,
    /// Callee of a call: a function or predicate.
    Callee,
    /// Anything else: parameters in scope, then top-level declarations.
    Value,
}

pub fn context_of(tree: &SyntaxTree, reference: NodeId) -> RefContext {
    let Some(parent) = tree.parent(reference) else {
        return RefContext::Value;
    };
    match tree.kind(parent) {
        NodeKind::Join { right, .. } if *right == reference => RefContext::JoinField(parent),
        NodeKind::Sig { parents, .. } if parents.contains(&reference) => RefContext::Concept,
        NodeKind::Annotation(AnnotationKind::Custom(_)) => RefContext::Concept,
        NodeKind::Call { callee, .. } if *callee == reference => RefContext::Callee,
        _ => RefContext::Value,
    }
}

/// Candidate `(name, declaration)` pairs for `reference`, in priority order.
pub fn candidates(
    checker: &mut TypeChecker<'_>,
    env: &TypeEnv,
    reference: NodeId,
) -> Vec<(String, NodeId)> {
    let tree = checker.tree();
    match context_of(tree, reference) {
        RefContext::JoinField(join) => checker.join_candidates(env, join),
        RefContext::Concept => top_level(tree, |kind| matches!(kind, NodeKind::Sig { .. })),
        RefContext::Callee => top_level(tree, |kind| {
            matches!(kind, NodeKind::Function { .. } | NodeKind::Predicate { .. })
        }),
        RefContext::Value => {
            let mut out = parameters_in_scope(tree, reference);
            out.extend(top_level(tree, |kind| {
                matches!(
                    kind,
                    NodeKind::Sig { .. }
                        | NodeKind::Function { .. }
                        | NodeKind::Predicate { .. }
                        | NodeKind::Var { .. }
                )
            }));
            out
        }
    }
}

fn top_level(tree: &SyntaxTree, keep: impl Fn(&NodeKind) -> bool) -> Vec<(String, NodeId)> {
    tree.root_decls()
        .iter()
        .filter(|decl| keep(tree.kind(**decl)))
        .filter_map(|decl| tree.name_of(*decl).map(|name| (name.to_string(), *decl)))
        .collect()
}

/// Formal parameters of the function or predicate enclosing `node`.
fn parameters_in_scope(tree: &SyntaxTree, node: NodeId) -> Vec<(String, NodeId)> {
    let Some(container) = tree.container(node) else {
        return Vec::new();
    };
    let params: Vec<NodeId> = match tree.kind(container) {
        NodeKind::Function { params, .. } => params.clone(),
        NodeKind::Predicate { params, .. } => params
            .iter()
            .map(|typed| match tree.kind(*typed) {
                NodeKind::TypedParameter { param, .. } => *param,
                _ => *typed,
            })
            .collect(),
        _ => Vec::new(),
    };
    params
        .into_iter()
        .filter_map(|param| tree.name_of(param).map(|name| (name.to_string(), param)))
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Linking
// ══════════════════════════════════════════════════════════════════════════════

/// Outcome of [`link`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// References linked by this call.
    pub resolved: usize,
    /// References left unresolved, in tree order.
    pub unresolved: Vec<NodeId>,
    pub passes: usize,
}

impl LinkReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Link every unresolved reference in `tree` by name.
///
/// Each lookup uses a fresh [`TypeEnv`]: links change between lookups, and
/// a cached type computed before a link was made would be stale.
pub fn link(tree: &mut SyntaxTree, options: &CheckOptions) -> Result<LinkReport, TreeError> {
    let mut pending: Vec<NodeId> = tree
        .references()
        .into_iter()
        .filter(|reference| {
            matches!(tree.kind(*reference), NodeKind::Reference { link, .. } if !link.is_resolved())
        })
        .collect();
    let mut report = LinkReport::default();

    while !pending.is_empty() {
        report.passes += 1;
        let resolved_before = report.resolved;
        let mut retry = Vec::new();
        for reference in pending {
            let target = {
                let mut checker = TypeChecker::with_options(tree, options.clone());
                resolve(&mut checker, &TypeEnv::new(), reference)
            };
            match target {
                Some(target) => {
                    tree.set_link(reference, Link::Resolved(target))?;
                    report.resolved += 1;
                }
                None => retry.push(reference),
            }
        }
        let progressed = report.resolved > resolved_before;
        debug!(
            "link pass {}: {} resolved so far, {} pending",
            report.passes,
            report.resolved,
            retry.len()
        );
        pending = retry;
        if !progressed {
            break;
        }
    }

    for reference in &pending {
        let message = match tree.kind(*reference) {
            NodeKind::Reference { text, .. } => format!("could not resolve reference to '{text}'"),
            _ => continue,
        };
        tree.set_link(
            *reference,
            Link::Unresolved {
                message: Some(message),
            },
        )?;
    }
    report.unresolved = pending;
    Ok(report)
}

fn resolve(checker: &mut TypeChecker<'_>, env: &TypeEnv, reference: NodeId) -> Option<NodeId> {
    let text = match checker.tree().kind(reference) {
        NodeKind::Reference { text, .. } => text.clone(),
        _ => return None,
    };
    candidates(checker, env, reference)
        .into_iter()
        .find(|(name, _)| *name == text)
        .map(|(_, decl)| decl)
}
