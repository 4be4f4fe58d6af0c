//! Foundation types shared across the compiler pipeline.

pub mod ops;
pub mod span;
pub mod types;

pub use ops::{BinaryOp, UnaryOp};
pub use span::{SourceFile, SourceMap, Span};
pub use types::Type;
