// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! AST types for the Mini Triangle language.
//!
//! This crate contains all AST node definitions and the foundation types
//! (spans, source maps, operators, the static type enum) used by the parser
//! and the code generator.

pub mod ast;
pub mod foundation;

// Re-export commonly used types
pub use foundation::{BinaryOp, SourceFile, SourceMap, Span, Type, UnaryOp};

pub use ast::*;
