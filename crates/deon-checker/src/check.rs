//! Checking rules: does a node conform to an expected type?
//!
//! Binders and conditionals get their own rules; everything else is
//! synthesized and compared with [`TypeTag::same_type_as`].

use deon_types::ast::{BinOp, NodeId, NodeKind};
use log::trace;

use crate::checker::TypeChecker;
use crate::env::TypeEnv;
use crate::ty::{TypeErrorKind, TypeTag};

impl<'t> TypeChecker<'t> {
    /// Check `node` against `expected`. Returns `expected` on success and an
    /// error tag otherwise.
    ///
    /// Counts toward the same depth limit as synthesis. Results are
    /// remembered per expected type, so a node is checked against a given
    /// type at most once.
    pub fn check(&mut self, env: &TypeEnv, node: NodeId, expected: &TypeTag) -> TypeTag {
        if let Some(result) = self.recall_check(node, expected) {
            return result;
        }
        if let Some(err) = self.enter(node) {
            return err;
        }
        trace!("check {node} against {expected}");
        let result = self.check_node(env, node, expected);
        self.leave();
        self.remember_check(node, expected, &result);
        result
    }

    fn check_node(&mut self, env: &TypeEnv, node: NodeId, expected: &TypeTag) -> TypeTag {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::Binary { op, lhs, rhs } => {
                let left = self.check(env, *lhs, expected);
                if is_recursion(&left) {
                    return left;
                }
                let right = self.check(env, *rhs, expected);
                if is_recursion(&right) {
                    return right;
                }
                if left.same_type_as(expected) && right.same_type_as(expected) {
                    return expected.clone();
                }
                let left_ty = self.synth(env, *lhs);
                let right_ty = self.synth(env, *rhs);
                TypeTag::error(
                    node,
                    TypeErrorKind::Mismatch,
                    format!(
                        "operands of '{op}' have types {left_ty} and {right_ty}, expected {expected}"
                    ),
                )
            }
            NodeKind::Function { name, body, .. } => match expected {
                TypeTag::Function(func) => {
                    let scoped = env.extend_with(func.params.iter().cloned());
                    let result = self.check(&scoped, *body, &func.ret);
                    if result.is_error() {
                        result
                    } else {
                        expected.clone()
                    }
                }
                other => TypeTag::error(
                    node,
                    TypeErrorKind::Mismatch,
                    format!(
                        "function '{}' must be annotated with a function type, found {other}",
                        name.name
                    ),
                ),
            },
            NodeKind::Predicate { .. } => self.check_predicate(env, node, expected),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.synth(env, *cond);
                let then_ty = self.synth(env, *then_branch);
                let else_ty = self.synth(env, *else_branch);
                if cond_ty.is_boolean()
                    && then_ty.same_type_as(expected)
                    && else_ty.same_type_as(expected)
                {
                    return expected.clone();
                }
                let reason = if !cond_ty.is_boolean() {
                    format!("condition has type {cond_ty}, expected Boolean")
                } else if !then_ty.same_type_as(expected) {
                    format!("then branch has type {then_ty}, expected {expected}")
                } else {
                    format!("else branch has type {else_ty}, expected {expected}")
                };
                TypeTag::error(
                    node,
                    TypeErrorKind::Mismatch,
                    format!("conditional does not conform: {reason}"),
                )
            }
            _ => {
                let actual = self.synth(env, node);
                if actual.same_type_as(expected) {
                    expected.clone()
                } else {
                    TypeTag::error(
                        node,
                        TypeErrorKind::Mismatch,
                        format!("type error: expected {expected}, found {actual}"),
                    )
                }
            }
        }
    }

    /// Predicate bodies are not checked yet.
    ///
    /// Extension point: bind the parameters of `expected` with
    /// [`TypeEnv::extend_with`] and check the body against `Boolean`.
    fn check_predicate(&mut self, _env: &TypeEnv, node: NodeId, _expected: &TypeTag) -> TypeTag {
        // TODO: check predicate bodies once the predicate expression language is settled.
        TypeTag::error(
            node,
            TypeErrorKind::NotImplemented,
            "predicate body checking is not yet implemented",
        )
    }

    /// Binary expressions: comparisons and logical connectives are checked
    /// against `Boolean`, arithmetic against `Integer`.
    pub(crate) fn infer_bin_expr(&mut self, env: &TypeEnv, node: NodeId) -> TypeTag {
        let tree = self.tree;
        let NodeKind::Binary { op, .. } = tree.kind(node) else {
            return TypeTag::error(node, TypeErrorKind::Internal, "expected a binary expression");
        };
        match op {
            BinOp::Or
            | BinOp::And
            | BinOp::Eq
            | BinOp::NotEq
            | BinOp::Less
            | BinOp::Greater
            | BinOp::LessEq
            | BinOp::GreaterEq => self.check(env, node, &TypeTag::Boolean(None)),
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                self.check(env, node, &TypeTag::Integer(None))
            }
            other => TypeTag::error(
                node,
                TypeErrorKind::NotInferable,
                format!("type of operator '{other}' cannot be inferred"),
            ),
        }
    }
}

fn is_recursion(ty: &TypeTag) -> bool {
    ty.as_error()
        .is_some_and(|err| err.kind == TypeErrorKind::Recursion)
}
