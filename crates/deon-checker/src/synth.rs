//! Synthesis rules, one per construct.

use std::rc::Rc;

use deon_types::ast::{AnnotationKind, Link, NodeId, NodeKind};

use crate::checker::TypeChecker;
use crate::env::TypeEnv;
use crate::ty::{FunctionType, PredicateType, RelationType, SigType, TypeError, TypeErrorKind, TypeTag};

impl<'t> TypeChecker<'t> {
    /// Dispatch on node kind. References and joins come first: both must be
    /// handled before any rule that inspects a possibly half-linked subtree.
    pub(crate) fn infer(&mut self, env: &TypeEnv, node: NodeId) -> TypeTag {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::Reference { text, link } => match link {
                Link::Resolved(target) => self.synth(env, *target),
                Link::Unresolved { message } => TypeTag::error(
                    node,
                    TypeErrorKind::Unresolved,
                    TypeError::unresolved_message(text, message.as_deref()),
                ),
            },
            NodeKind::Join { .. } => self.synth_join(env, node),

            NodeKind::StringLit(_) => TypeTag::String(Some(node)),
            NodeKind::BoolLit(_) => TypeTag::Boolean(Some(node)),
            NodeKind::IntLit(_) => TypeTag::Integer(Some(node)),

            NodeKind::Var {
                name,
                annotation,
                value,
            } => match (annotation, value) {
                (Some(annotation), _) => self.synth(env, *annotation),
                (None, Some(value)) => self.synth(env, *value),
                (None, None) => TypeTag::error(
                    node,
                    TypeErrorKind::NotInferable,
                    format!("variable '{}' has neither a type annotation nor a value", name.name),
                ),
            },
            NodeKind::Parameter { name } => self.synth_parameter(env, node, &name.name),
            NodeKind::TypedParameter { annotation, .. } => self.synth(env, *annotation),
            NodeKind::Annotation(kind) => self.synth_annotation(node, kind),
            NodeKind::Sig { name, .. } => TypeTag::Sig(SigType {
                decl: node,
                name: name.name.clone(),
            }),
            NodeKind::Relation { name, relatum } => {
                self.synth_relation(env, node, &name.name, *relatum)
            }
            NodeKind::Binary { .. } => self.infer_bin_expr(env, node),
            NodeKind::Function {
                name,
                params,
                signature,
                ..
            } => self.synth_function(env, node, &name.name, params, signature),
            NodeKind::Call { callee, args } => self.synth_call(env, node, *callee, args),
            NodeKind::Predicate { params, .. } => self.synth_predicate(env, node, params),

            NodeKind::If { .. } => TypeTag::error(
                node,
                TypeErrorKind::NotInferable,
                format!("type cannot be inferred for {}", tree.kind(node).label()),
            ),
        }
    }

    fn synth_parameter(&mut self, env: &TypeEnv, node: NodeId, name: &str) -> TypeTag {
        let not_typed = || {
            TypeTag::error(
                node,
                TypeErrorKind::NotInferable,
                format!(
                    "parameter '{name}' is not a parameter of a function or lacks a type annotation"
                ),
            )
        };
        let Some(decl) = self.tree.parent(node) else {
            return not_typed();
        };
        match self.synth(env, decl) {
            TypeTag::Function(func) => func.param_type(node).cloned().unwrap_or_else(not_typed),
            _ => not_typed(),
        }
    }

    fn synth_annotation(&mut self, node: NodeId, kind: &AnnotationKind) -> TypeTag {
        match kind {
            AnnotationKind::Builtin(name) => match name.as_str() {
                "String" => TypeTag::String(None),
                "Integer" => TypeTag::Integer(None),
                "Boolean" => TypeTag::Boolean(None),
                other => TypeTag::error(
                    node,
                    TypeErrorKind::Annotation,
                    format!("annotation '{other}' not recognized"),
                ),
            },
            AnnotationKind::Custom(reference) => {
                let text = match self.tree.kind(*reference) {
                    NodeKind::Reference { text, .. } => text.as_str(),
                    _ => "?",
                };
                match self.tree.target(*reference) {
                    Some(decl) => match self.tree.kind(decl) {
                        NodeKind::Sig { name, .. } => TypeTag::Sig(SigType {
                            decl,
                            name: name.name.clone(),
                        }),
                        other => TypeTag::error(
                            node,
                            TypeErrorKind::Annotation,
                            format!(
                                "annotation '{text}' not recognized: it names a {}, not a concept",
                                other.label()
                            ),
                        ),
                    },
                    None => TypeTag::error(
                        node,
                        TypeErrorKind::Annotation,
                        format!("annotation '{text}' not found (linking issue)"),
                    ),
                }
            }
        }
    }

    fn synth_relation(
        &mut self,
        env: &TypeEnv,
        node: NodeId,
        name: &str,
        relatum: NodeId,
    ) -> TypeTag {
        let owner = self.tree.parent(node).and_then(|parent| {
            match self.tree.kind(parent) {
                NodeKind::Sig { name, .. } => Some(SigType {
                    decl: parent,
                    name: name.name.clone(),
                }),
                _ => None,
            }
        });
        let Some(owner) = owner else {
            return TypeTag::error(
                node,
                TypeErrorKind::RelationContainer,
                format!("relation '{name}' must have a concept as parent"),
            );
        };
        let relatum = self.synth(env, relatum);
        if relatum.is_error() {
            return relatum;
        }
        TypeTag::Relation(Rc::new(RelationType {
            decl: node,
            name: name.to_string(),
            owner,
            relatum,
        }))
    }

    fn synth_function(
        &mut self,
        env: &TypeEnv,
        node: NodeId,
        name: &str,
        params: &[NodeId],
        signature: &[NodeId],
    ) -> TypeTag {
        if signature.len() != params.len() + 1 {
            return TypeTag::error(
                node,
                TypeErrorKind::Arity,
                format!(
                    "parameter count mismatch: function '{name}' has {} parameters but {} parameter types",
                    params.len(),
                    signature.len().saturating_sub(1)
                ),
            );
        }
        let mut slots = Vec::with_capacity(signature.len());
        for slot in signature {
            let ty = self.synth(env, *slot);
            if ty.is_error() {
                return ty;
            }
            slots.push(ty);
        }
        let ret = slots.pop().unwrap_or(TypeTag::Unit);
        TypeTag::Function(Rc::new(FunctionType {
            params: params.iter().copied().zip(slots).collect(),
            ret,
        }))
    }

    fn synth_call(
        &mut self,
        env: &TypeEnv,
        node: NodeId,
        callee: NodeId,
        args: &[NodeId],
    ) -> TypeTag {
        let callee_ty = self.synth(env, callee);
        let Some(func) = callee_ty.as_function().cloned() else {
            return TypeTag::error(
                node,
                TypeErrorKind::NotCallable,
                format!("expected a function type, found {callee_ty}"),
            );
        };
        if args.len() != func.params.len() {
            return TypeTag::error(
                node,
                TypeErrorKind::Arity,
                format!(
                    "expected {} arguments, found {}",
                    func.params.len(),
                    args.len()
                ),
            );
        }
        for (arg, (_, expected)) in args.iter().zip(&func.params) {
            let result = self.check(env, *arg, expected);
            if result.is_error() {
                return result;
            }
        }
        func.ret.clone()
    }

    fn synth_predicate(&mut self, env: &TypeEnv, node: NodeId, params: &[NodeId]) -> TypeTag {
        let mut bindings = Vec::with_capacity(params.len());
        for typed in params {
            let param = match self.tree.kind(*typed) {
                NodeKind::TypedParameter { param, .. } => *param,
                other => {
                    let name = other.declared_name().map_or("?", |ident| ident.name.as_str());
                    return TypeTag::error(
                        *typed,
                        TypeErrorKind::NotInferable,
                        format!("predicate parameter '{name}' lacks a type annotation"),
                    );
                }
            };
            let ty = self.synth(env, *typed);
            if ty.is_error() {
                return ty;
            }
            bindings.push((param, ty));
        }
        let expected = TypeTag::Predicate(Rc::new(PredicateType { params: bindings }));
        self.check(env, node, &expected)
    }
}
