//! Type tags assigned to syntax nodes.
//!
//! [`TypeTag`] is a closed set. Failures are ordinary values
//! ([`TypeTag::Error`]) so they can sit anywhere a type is expected.
//! Tags keep back-references to the nodes they came from for diagnostics.

use std::fmt;
use std::rc::Rc;

use deon_types::ast::NodeId;
use deon_types::ErrorCode;

// ══════════════════════════════════════════════════════════════════════════════
// TypeTag
// ══════════════════════════════════════════════════════════════════════════════

/// The type of a syntax node.
#[derive(Debug, Clone)]
pub enum TypeTag {
    // ── Primitives (payload: originating literal, if any) ──
    Boolean(Option<NodeId>),
    String(Option<NodeId>),
    Integer(Option<NodeId>),
    Unit,

    // ── Signatures ──
    Function(Rc<FunctionType>),
    Predicate(Rc<PredicateType>),

    // ── Nominal ──
    Sig(SigType),
    /// Identity is the `Rc` allocation, not its contents.
    Relation(Rc<RelationType>),

    Error(Rc<TypeError>),
}

/// A concept type. Two sigs are the same type iff they name the same
/// declaration.
#[derive(Debug, Clone)]
pub struct SigType {
    pub decl: NodeId,
    pub name: String,
}

impl PartialEq for SigType {
    fn eq(&self, other: &Self) -> bool {
        self.decl == other.decl
    }
}

impl Eq for SigType {}

#[derive(Debug, Clone)]
pub struct FunctionType {
    /// Formal parameter node and its declared type, in order.
    pub params: Vec<(NodeId, TypeTag)>,
    pub ret: TypeTag,
}

impl FunctionType {
    /// Declared type of `param`, if it belongs to this signature.
    pub fn param_type(&self, param: NodeId) -> Option<&TypeTag> {
        self.params
            .iter()
            .find(|(node, _)| *node == param)
            .map(|(_, ty)| ty)
    }
}

/// A boolean-valued relation signature; the result type is implicit.
#[derive(Debug, Clone)]
pub struct PredicateType {
    pub params: Vec<(NodeId, TypeTag)>,
}

/// A field of a concept: `owner -> relatum`.
#[derive(Debug, Clone)]
pub struct RelationType {
    pub decl: NodeId,
    pub name: String,
    pub owner: SigType,
    pub relatum: TypeTag,
}

// ══════════════════════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════════════════════

/// What went wrong, for diagnostics. Not part of error equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeErrorKind {
    /// A name was never linked.
    Unresolved,
    /// Unrecognized or unresolved type annotation.
    Annotation,
    /// Parameter / argument / type-slot count disagreement.
    Arity,
    /// Join field not declared on any ancestor.
    JoinTarget,
    /// Left operand of a join is not a concept.
    JoinOperand,
    /// Relation declared outside a concept.
    RelationContainer,
    /// Checked-against type disagrees with the derived one.
    Mismatch,
    /// Callee is not a function.
    NotCallable,
    /// No synthesis rule applies.
    NotInferable,
    /// Checking rule still missing.
    NotImplemented,
    /// Recursion guard tripped.
    Recursion,
    /// An internal invariant did not hold.
    Internal,
}

impl TypeErrorKind {
    pub fn code(self) -> ErrorCode {
        match self {
            TypeErrorKind::Unresolved => ErrorCode::UNRESOLVED_REFERENCE,
            TypeErrorKind::Annotation => ErrorCode::UNKNOWN_ANNOTATION,
            TypeErrorKind::Arity => ErrorCode::WRONG_ARG_COUNT,
            TypeErrorKind::JoinTarget => ErrorCode::RELATUM_NOT_FOUND,
            TypeErrorKind::JoinOperand => ErrorCode::JOIN_ON_NON_CONCEPT,
            TypeErrorKind::RelationContainer => ErrorCode::RELATION_OUTSIDE_CONCEPT,
            TypeErrorKind::Mismatch => ErrorCode::TYPE_MISMATCH,
            TypeErrorKind::NotCallable => ErrorCode::NOT_A_FUNCTION,
            TypeErrorKind::NotInferable => ErrorCode::NOT_INFERABLE,
            TypeErrorKind::NotImplemented => ErrorCode::NOT_IMPLEMENTED,
            TypeErrorKind::Recursion => ErrorCode::RECURSION_LIMIT,
            TypeErrorKind::Internal => ErrorCode::INTERNAL,
        }
    }
}

/// An inference or checking failure at `node`.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub node: NodeId,
    pub kind: TypeErrorKind,
    pub message: String,
}

impl TypeError {
    /// Message for a reference the linker could not resolve.
    pub fn unresolved_message(text: &str, detail: Option<&str>) -> String {
        match detail {
            Some(detail) => format!("unresolved reference '{text}': {detail}"),
            None => format!("unresolved reference '{text}'"),
        }
    }
}

impl PartialEq for TypeError {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.message == other.message
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Construction & queries
// ══════════════════════════════════════════════════════════════════════════════

impl TypeTag {
    pub fn error(node: NodeId, kind: TypeErrorKind, message: impl Into<String>) -> Self {
        TypeTag::Error(Rc::new(TypeError {
            node,
            kind,
            message: message.into(),
        }))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TypeTag::Error(_))
    }

    pub fn as_error(&self) -> Option<&TypeError> {
        match self {
            TypeTag::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<FunctionType>> {
        match self {
            TypeTag::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeTag::Boolean(_))
    }

    /// The only compatibility predicate: per-variant equality, no subtyping.
    ///
    /// - primitives: same variant (literal payload ignored)
    /// - `Sig`: same declaration
    /// - `Relation`: same tag instance
    /// - `Function`/`Predicate`: same arity, pairwise equal parameter types
    ///   (and equal return types for functions)
    /// - `Error`: same node and same message
    pub fn same_type_as(&self, other: &TypeTag) -> bool {
        match (self, other) {
            (TypeTag::Boolean(_), TypeTag::Boolean(_))
            | (TypeTag::String(_), TypeTag::String(_))
            | (TypeTag::Integer(_), TypeTag::Integer(_))
            | (TypeTag::Unit, TypeTag::Unit) => true,
            (TypeTag::Function(a), TypeTag::Function(b)) => {
                same_params(&a.params, &b.params) && a.ret.same_type_as(&b.ret)
            }
            (TypeTag::Predicate(a), TypeTag::Predicate(b)) => same_params(&a.params, &b.params),
            (TypeTag::Sig(a), TypeTag::Sig(b)) => a == b,
            (TypeTag::Relation(a), TypeTag::Relation(b)) => Rc::ptr_eq(a, b),
            (TypeTag::Error(a), TypeTag::Error(b)) => a == b,
            _ => false,
        }
    }
}

fn same_params(a: &[(NodeId, TypeTag)], b: &[(NodeId, TypeTag)]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|((_, x), (_, y))| x.same_type_as(y))
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.same_type_as(other)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Display
// ══════════════════════════════════════════════════════════════════════════════

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Boolean(_) => write!(f, "Boolean"),
            TypeTag::String(_) => write!(f, "String"),
            TypeTag::Integer(_) => write!(f, "Integer"),
            TypeTag::Unit => write!(f, "Unit"),
            TypeTag::Function(func) => {
                write_params(f, &func.params)?;
                write!(f, " => {}", func.ret)
            }
            TypeTag::Predicate(pred) => {
                write!(f, "pred")?;
                write_params(f, &pred.params)
            }
            TypeTag::Sig(sig) => write!(f, "{}", sig.name),
            TypeTag::Relation(rel) => {
                write!(f, "{}: {} -> {}", rel.name, rel.owner.name, rel.relatum)
            }
            TypeTag::Error(err) => write!(f, "Error({})", err.message),
        }
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[(NodeId, TypeTag)]) -> fmt::Result {
    write!(f, "(")?;
    for (i, (_, ty)) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{ty}")?;
    }
    write!(f, ")")
}
