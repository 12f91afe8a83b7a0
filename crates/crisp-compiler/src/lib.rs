//! Crisp compiler: parser, analyzer, IR emitter, and formatter.
//!
//! This crate provides the compilation pipeline for Crisp behavior trees:
//! - `parser` - lexer, CST, node ids
//! - `ast` - owned AST, defdec/defmacro expansion
//! - `analyze` - semantic analysis (name resolution, inference, checking)
//! - `compile` - AST to IR lowering with explicit numeric coercions
//! - `format` - comment-preserving canonical formatter
//! - `diagnostics` - error reporting
//! - `store` - memoized per-file query pipeline
//! - `line_index` - line/column mapping and position lookups

pub mod analyze;
pub mod ast;
pub mod compile;
pub mod diagnostics;
pub mod format;
pub mod line_index;
pub mod parser;
pub mod store;

#[cfg(test)]
pub mod test_fixtures;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, DiagnosticsPrinter, Severity};
pub use store::QueryStore;

/// Errors that can occur during parsing.
///
/// Ordinary malformed input never lands here - it becomes diagnostics and a
/// recovered tree. These are resource-limit failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Execution fuel exhausted (too many parser operations).
    #[error("execution limit exceeded")]
    ExecFuelExhausted,

    /// Recursion fuel exhausted (input nested too deeply).
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, Error>;
