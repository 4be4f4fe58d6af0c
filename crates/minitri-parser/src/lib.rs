// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Hand-written recursive descent parser for Mini Triangle.
//!
//! One parse function per grammar nonterminal, each consuming the tokens of
//! its production and returning the corresponding AST node. Lookahead is
//! exactly one token beyond the current one; there is no backtracking and no
//! error recovery — the first grammar violation aborts the parse.

pub mod parser;

pub use parser::{parse, parse_expr, ParseError, ParseErrorKind};
