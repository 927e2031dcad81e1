//! Shared types for the Deon checker.
//!
//! This crate defines the syntax tree the checker consumes, source spans,
//! diagnostic records and a builder for constructing trees.

mod error;
mod span;
pub mod ast;
pub mod builder;

pub use builder::TreeBuilder;
pub use error::{
    Diagnostic, Diagnostics, ErrorCategory, ErrorCode, Severity, TreeError, MAX_DIAGNOSTICS,
};
pub use span::Span;
