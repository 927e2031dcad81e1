use crate::ast::NodeId;
use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default number of diagnostics stored before the rest are only counted.
pub const MAX_DIAGNOSTICS: usize = 20;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Link,
    Type,
    Structure,
    Internal,
}

/// Numeric diagnostic code (E100–E999).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Link errors (E100–E199) ──
    pub const UNRESOLVED_REFERENCE: Self = Self(100);

    // ── Type errors (E200–E299) ──
    pub const UNKNOWN_ANNOTATION: Self = Self(200);
    pub const TYPE_MISMATCH: Self = Self(201);
    pub const WRONG_ARG_COUNT: Self = Self(202);
    pub const NOT_INFERABLE: Self = Self(203);
    pub const NOT_A_FUNCTION: Self = Self(204);

    // ── Structure errors (E300–E399) ──
    pub const JOIN_ON_NON_CONCEPT: Self = Self(300);
    pub const RELATUM_NOT_FOUND: Self = Self(301);
    pub const RELATION_OUTSIDE_CONCEPT: Self = Self(302);

    // ── Internal (E900–E999) ──
    pub const NOT_IMPLEMENTED: Self = Self(900);
    pub const RECURSION_LIMIT: Self = Self(901);
    pub const INTERNAL: Self = Self(999);

    /// Get the category for this code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Link,
            200..=299 => ErrorCategory::Type,
            300..=399 => ErrorCategory::Structure,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => write!(f, "link"),
            Self::Type => write!(f, "type"),
            Self::Structure => write!(f, "structure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// A structured checker diagnostic.
///
/// Diagnostics are rendered by the host; it must not parse the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub category: ErrorCategory,
    pub message: String,
    /// Offending node.
    pub node: NodeId,
    #[serde(flatten)]
    pub span: Span,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>, node: NodeId, span: Span) -> Self {
        Self {
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            node,
            span,
        }
    }

    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.span, self.code, self.category, self.message
        )
    }
}

/// Collected diagnostics for one check pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub total_errors: usize,
    pub total_warnings: usize,
    #[serde(skip, default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    MAX_DIAGNOSTICS
}

impl Diagnostics {
    pub fn empty() -> Self {
        Self::with_limit(MAX_DIAGNOSTICS)
    }

    /// Empty collection storing at most `limit` errors.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            total_errors: 0,
            total_warnings: 0,
            limit,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// True if any stored error or warning carries `code`.
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .any(|d| d.code == code)
    }

    /// Add a diagnostic, routing by severity. Errors beyond the limit are
    /// counted but not stored.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                if self.errors.len() < self.limit {
                    self.errors.push(diagnostic);
                }
                self.total_errors += 1;
            }
            Severity::Warning => {
                self.warnings.push(diagnostic);
                self.total_warnings += 1;
            }
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::empty()
    }
}

/// Misuse of the syntax-tree mutation surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not a reference")]
    NotAReference(NodeId),
}
