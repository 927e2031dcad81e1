//! Deon checker: assigns types to a linked Deon syntax tree.
//!
//! ```text
//! host parser → SyntaxTree → link (scope) → check_model → CheckResult
//! ```
//!
//! The checker is bidirectional: declarations are synthesized, and where a
//! declaration states its type (function signatures, annotated variables)
//! its body is checked against it. Type problems never abort the pass; they
//! are [`TypeTag::Error`] values, reported as diagnostics at the end.

pub mod ancestors;
mod check;
pub mod checker;
pub mod env;
mod join;
pub mod options;
pub mod scope;
mod synth;
pub mod ty;

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use deon_types::ast::{NodeId, NodeKind, SyntaxTree};
use deon_types::{Diagnostic, Diagnostics, TreeError};

pub use checker::{CheckStats, TypeChecker};
pub use env::TypeEnv;
pub use options::{CheckOptions, ConfigError};
pub use scope::{link, LinkReport};
pub use ty::{TypeError, TypeErrorKind, TypeTag};

use scope::{context_of, RefContext};

// ══════════════════════════════════════════════════════════════════════════════
// Result types
// ══════════════════════════════════════════════════════════════════════════════

/// Type assigned to one top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclSummary {
    pub node: NodeId,
    pub name: String,
    pub kind: String,
    /// Rendered type tag.
    #[serde(rename = "type")]
    pub ty: String,
    pub ok: bool,
}

/// Outcome of checking one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// No error-severity diagnostics were produced.
    pub success: bool,
    pub diagnostics: Diagnostics,
    pub declarations: Vec<DeclSummary>,
    /// Hex SHA-256 of the serialized declarations and diagnostics.
    pub fingerprint: String,
}

// ══════════════════════════════════════════════════════════════════════════════
// Entry points
// ══════════════════════════════════════════════════════════════════════════════

/// Check every top-level declaration of an already-linked tree.
pub fn check_model(tree: &SyntaxTree) -> CheckResult {
    check_model_with(tree, &CheckOptions::default())
}

pub fn check_model_with(tree: &SyntaxTree, options: &CheckOptions) -> CheckResult {
    let mut pass = Pass::new(tree, options);
    for decl in tree.root_decls() {
        pass.check_decl(*decl);
    }
    pass.finish()
}

/// Link `tree` and check it. References the linker could not resolve are
/// reported even if no checked declaration reaches them, unless they name
/// the field of a join that already failed.
pub fn link_and_check(
    tree: &mut SyntaxTree,
    options: &CheckOptions,
) -> Result<CheckResult, TreeError> {
    let report = link(tree, options)?;
    debug!(
        "linked {} references in {} passes, {} unresolved",
        report.resolved,
        report.passes,
        report.unresolved.len()
    );

    let tree: &SyntaxTree = tree;
    let mut pass = Pass::new(tree, options);
    for decl in tree.root_decls() {
        pass.check_decl(*decl);
    }
    for reference in &report.unresolved {
        if pass.reported_by_join(*reference) {
            continue;
        }
        let ty = pass.checker.synth(&pass.env, *reference);
        pass.report(&ty);
    }
    Ok(pass.finish())
}

// ══════════════════════════════════════════════════════════════════════════════
// Pass
// ══════════════════════════════════════════════════════════════════════════════

/// One analysis pass: a checker, its shared environment and the collected
/// diagnostics.
struct Pass<'t> {
    tree: &'t SyntaxTree,
    checker: TypeChecker<'t>,
    env: TypeEnv,
    diagnostics: Diagnostics,
    declarations: Vec<DeclSummary>,
    seen: HashSet<(NodeId, String)>,
}

impl<'t> Pass<'t> {
    fn new(tree: &'t SyntaxTree, options: &CheckOptions) -> Self {
        Self {
            tree,
            checker: TypeChecker::with_options(tree, options.clone()),
            env: TypeEnv::new(),
            diagnostics: Diagnostics::with_limit(options.max_diagnostics),
            declarations: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn check_decl(&mut self, decl: NodeId) {
        let tree = self.tree;
        let kind = tree.kind(decl);
        let name = tree.name_of(decl).unwrap_or("<anonymous>").to_string();
        debug!("checking {} '{}'", kind.label(), name);

        let ty = match kind {
            NodeKind::Sig { relations, .. } => {
                let sig_ty = self.checker.synth(&self.env, decl);
                for relation in relations {
                    let relation_ty = self.checker.synth(&self.env, *relation);
                    self.report(&relation_ty);
                }
                sig_ty
            }
            NodeKind::Function { .. } => {
                let fn_ty = self.checker.synth(&self.env, decl);
                if fn_ty.as_function().is_some() {
                    self.checker.check(&self.env, decl, &fn_ty)
                } else {
                    fn_ty
                }
            }
            NodeKind::Var {
                annotation: Some(annotation),
                value: Some(value),
                ..
            } => {
                let declared = self.checker.synth(&self.env, *annotation);
                if declared.is_error() {
                    declared
                } else {
                    self.checker.check(&self.env, *value, &declared)
                }
            }
            _ => self.checker.synth(&self.env, decl),
        };

        self.report(&ty);
        self.declarations.push(DeclSummary {
            node: decl,
            name,
            kind: kind.label().to_string(),
            ty: ty.to_string(),
            ok: !ty.is_error(),
        });
    }

    /// True when `reference` is the field name of a join whose type is
    /// already a join error; that error covers the missing name.
    fn reported_by_join(&self, reference: NodeId) -> bool {
        let RefContext::JoinField(join) = context_of(self.tree, reference) else {
            return false;
        };
        self.env.lookup(join).is_some_and(|ty| {
            ty.as_error().is_some_and(|err| {
                matches!(err.kind, TypeErrorKind::JoinTarget | TypeErrorKind::JoinOperand)
            })
        })
    }

    /// Turn an error tag into a diagnostic, once per node and message.
    fn report(&mut self, ty: &TypeTag) {
        let Some(err) = ty.as_error() else {
            return;
        };
        if !self.seen.insert((err.node, err.message.clone())) {
            return;
        }
        let span = self
            .tree
            .get(err.node)
            .map(|node| node.span)
            .unwrap_or_default();
        let diagnostic = Diagnostic::new(err.kind.code(), err.message.clone(), err.node, span);
        let diagnostic = if err.kind == TypeErrorKind::NotImplemented {
            diagnostic.warning()
        } else {
            diagnostic
        };
        self.diagnostics.push(diagnostic);
    }

    fn finish(self) -> CheckResult {
        let fingerprint = fingerprint(&self.declarations, &self.diagnostics);
        let stats = self.checker.stats();
        debug!(
            "check finished: {} errors, {} warnings, {} inferences, {} cache hits",
            self.diagnostics.total_errors,
            self.diagnostics.total_warnings,
            stats.inferences,
            stats.cache_hits
        );
        CheckResult {
            success: !self.diagnostics.has_errors(),
            diagnostics: self.diagnostics,
            declarations: self.declarations,
            fingerprint,
        }
    }
}

fn fingerprint(declarations: &[DeclSummary], diagnostics: &Diagnostics) -> String {
    let mut hasher = Sha256::new();
    match serde_json::to_vec(&(declarations, diagnostics)) {
        Ok(bytes) => hasher.update(&bytes),
        Err(err) => log::warn!("could not serialize check result for fingerprinting: {err}"),
    }
    format!("{:x}", hasher.finalize())
}
