//! Deon type checker: assigns a [`TypeTag`] to syntax nodes.
//!
//! [`TypeChecker::synth`] infers bottom-up, [`TypeChecker::check`] verifies
//! top-down against an expected type. Both go through a shared [`TypeEnv`]:
//! every synthesized result, errors included, is written to the pass cache,
//! and a cached node is never re-inferred.
//!
//! Rules live in sibling modules:
//! - `synth`: per-construct synthesis
//! - `check`: per-construct checking and binary-expression inference
//! - `join`: the relational join operator

use std::collections::{HashMap, HashSet};

use log::trace;

use deon_types::ast::{NodeId, SyntaxTree};

use crate::env::TypeEnv;
use crate::options::CheckOptions;
use crate::ty::{TypeErrorKind, TypeTag};

// ══════════════════════════════════════════════════════════════════════════════
// TypeChecker
// ══════════════════════════════════════════════════════════════════════════════

/// Counters for one checker instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckStats {
    /// Synthesis requests answered from the environment.
    pub cache_hits: usize,
    /// Synthesis requests that ran an inference rule.
    pub inferences: usize,
}

/// Synthesis and checking over one syntax tree.
///
/// The tree is only read. The in-progress set and depth counter guard
/// against runaway recursion on cyclic input.
pub struct TypeChecker<'t> {
    pub(crate) tree: &'t SyntaxTree,
    options: CheckOptions,
    in_progress: HashSet<NodeId>,
    depth: usize,
    /// Results of `check`, keyed by node, one entry per expected type.
    checked: HashMap<NodeId, Vec<(TypeTag, TypeTag)>>,
    stats: CheckStats,
}

impl<'t> TypeChecker<'t> {
    pub fn new(tree: &'t SyntaxTree) -> Self {
        Self::with_options(tree, CheckOptions::default())
    }

    pub fn with_options(tree: &'t SyntaxTree, options: CheckOptions) -> Self {
        Self {
            tree,
            options,
            in_progress: HashSet::new(),
            depth: 0,
            checked: HashMap::new(),
            stats: CheckStats::default(),
        }
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn stats(&self) -> CheckStats {
        self.stats
    }

    /// Infer the type of `node`.
    ///
    /// Returns the cached tag when `env` already has one. Otherwise runs the
    /// matching rule and caches the result before returning it.
    pub fn synth(&mut self, env: &TypeEnv, node: NodeId) -> TypeTag {
        if let Some(ty) = env.lookup(node) {
            self.stats.cache_hits += 1;
            trace!("synth {node}: cached {ty}");
            return ty;
        }
        if self.in_progress.contains(&node) {
            return TypeTag::error(
                node,
                TypeErrorKind::Recursion,
                format!(
                    "cyclic reference: type of {} depends on itself",
                    self.tree.kind(node).label()
                ),
            );
        }
        if let Some(err) = self.enter(node) {
            return err;
        }

        self.in_progress.insert(node);
        let ty = self.infer(env, node);
        self.in_progress.remove(&node);
        self.leave();

        self.stats.inferences += 1;
        trace!("synth {node}: {ty}");
        env.set(node, ty.clone());
        ty
    }

    /// Count one level of nesting for `node`. Returns the recursion error
    /// when the configured depth is already reached.
    pub(crate) fn enter(&mut self, node: NodeId) -> Option<TypeTag> {
        if self.depth >= self.options.max_depth {
            return Some(TypeTag::error(
                node,
                TypeErrorKind::Recursion,
                format!("recursion limit of {} exceeded", self.options.max_depth),
            ));
        }
        self.depth += 1;
        None
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn recall_check(&self, node: NodeId, expected: &TypeTag) -> Option<TypeTag> {
        self.checked
            .get(&node)?
            .iter()
            .find(|(against, _)| against.same_type_as(expected))
            .map(|(_, result)| result.clone())
    }

    pub(crate) fn remember_check(&mut self, node: NodeId, expected: &TypeTag, result: &TypeTag) {
        self.checked
            .entry(node)
            .or_default()
            .push((expected.clone(), result.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use deon_types::ast::{Link, NodeKind};
    use deon_types::TreeBuilder;

    #[test]
    fn second_synth_is_a_cache_hit() {
        let mut b = TreeBuilder::new();
        let lit = b.int(4);
        let tree = b.finish();
        let env = TypeEnv::new();
        let mut checker = TypeChecker::new(&tree);

        let first = checker.synth(&env, lit);
        let after_first = checker.stats();
        let second = checker.synth(&env, lit);
        assert!(first.same_type_as(&second));
        assert_eq!(checker.stats().inferences, after_first.inferences);
        assert_eq!(checker.stats().cache_hits, after_first.cache_hits + 1);
    }

    #[test]
    fn errors_are_memoized() {
        let mut b = TreeBuilder::new();
        let dangling = b.reference("nowhere");
        let tree = b.finish();
        let env = TypeEnv::new();
        let mut checker = TypeChecker::new(&tree);

        let first = checker.synth(&env, dangling);
        assert!(first.is_error());
        assert_eq!(env.lookup(dangling), Some(first.clone()));
        let second = checker.synth(&env, dangling);
        assert!(first.same_type_as(&second));
        assert_eq!(checker.stats().inferences, 1);
    }

    #[test]
    fn self_referential_variable_terminates() {
        let mut b = TreeBuilder::new();
        let r = b.reference("loop");
        let v = b.var("loop", None, Some(r));
        let mut tree = b.finish();
        tree.set_link(r, Link::Resolved(v)).unwrap();

        let env = TypeEnv::new();
        let mut checker = TypeChecker::new(&tree);
        let ty = checker.synth(&env, v);
        let err = ty.as_error().expect("cycle should be an error");
        assert_eq!(err.kind, TypeErrorKind::Recursion);
    }

    #[test]
    fn depth_limit_trips_on_long_chains() {
        let mut b = TreeBuilder::new();
        let mut value = b.int(0);
        for i in 0..10 {
            value = b.var(&format!("v{i}"), None, Some(value));
        }
        let tree = b.finish();
        assert!(matches!(tree.kind(value), NodeKind::Var { .. }));

        let env = TypeEnv::new();
        let mut shallow = TypeChecker::with_options(&tree, CheckOptions::default().with_max_depth(4));
        let ty = shallow.synth(&env, value);
        assert_eq!(ty.as_error().map(|e| e.kind), Some(TypeErrorKind::Recursion));

        let mut deep = TypeChecker::new(&tree);
        assert!(matches!(deep.synth(&TypeEnv::new(), value), TypeTag::Integer(_)));
    }

    #[test]
    fn relation_synthesis_keeps_identity() {
        let mut b = TreeBuilder::new();
        let int = b.builtin("Integer");
        let amount = b.relation("amount", int);
        b.sig("Invoice", &[], vec![amount]);
        let tree = b.finish();
        let env = TypeEnv::new();
        let mut checker = TypeChecker::new(&tree);

        let (TypeTag::Relation(first), TypeTag::Relation(second)) =
            (checker.synth(&env, amount), checker.synth(&env, amount))
        else {
            panic!("relation declaration should synthesize a relation tag");
        };
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(checker.stats().cache_hits, 1);
    }
}
