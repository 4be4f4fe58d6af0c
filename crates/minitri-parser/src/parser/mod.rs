//! Recursive descent parser for Mini Triangle.
//!
//! ## Architecture
//!
//! - `stream`: TokenStream wrapper with one-token lookahead
//! - `error`: ParseError construction helpers
//! - `expr`: expression parser (precedence climbing over a fixed table)
//! - `command`: command parsers (keyword-dispatched)
//! - `decl`: declaration parsers

mod error;
mod stream;

pub use error::{ParseError, ParseErrorKind};
use stream::TokenStream;

mod command;
mod decl;
mod expr;

use minitri_ast::{Expr, Program, Span};
use minitri_lexer::Token;
use std::ops::Range;

/// Parse a token sequence into a program.
///
/// # Parameters
/// - `tokens`: tokens paired with their byte spans, as produced by the lexer
/// - `file_id`: file identifier for span tracking
///
/// # Returns
/// - `Ok(Program)` if the whole input forms one well-formed program
/// - `Err(ParseError)` at the first grammar violation; no further tokens are
///   consumed past the offending one
pub fn parse(tokens: &[(Token, Range<usize>)], file_id: u16) -> Result<Program, ParseError> {
    let mut stream = TokenStream::new(tokens, file_id);
    let body = command::parse_command(&mut stream)?;

    // The grammar covers the whole input; trailing tokens are an error.
    if !stream.at_end() {
        return Err(ParseError::unexpected_token(
            stream.peek(),
            "after end of program",
            stream.current_span(),
        ));
    }

    let span = match (tokens.first(), tokens.last()) {
        (Some((_, first)), Some((_, last))) => {
            Span::new(file_id, first.start as u32, last.end as u32)
        }
        _ => Span::zero(file_id),
    };

    Ok(Program { body, span })
}

/// Parse a token sequence as a single expression.
///
/// Exposed for tests and tooling; the main entry point is [`parse`].
pub fn parse_expr(tokens: &[(Token, Range<usize>)], file_id: u16) -> Result<Expr, ParseError> {
    let mut stream = TokenStream::new(tokens, file_id);
    let expr = expr::parse_expr(&mut stream)?;

    if !stream.at_end() {
        return Err(ParseError::unexpected_token(
            stream.peek(),
            "after expression",
            stream.current_span(),
        ));
    }

    Ok(expr)
}
