//! Expression parser — precedence climbing over a fixed operator table.
//!
//! ## Precedence tiers (lowest to highest)
//!
//! 1. `<`, `>`, `=` (relational) — NON-associative: `a < b < c` is an error
//! 2. `+`, `-` — left associative
//! 3. `*`, `/`, `\` — left associative
//! 4. Unary `-` — prefix, binds tighter than any binary operator
//!
//! Parenthesized expressions restart the climb from the lowest tier.

use super::{ParseError, TokenStream};
use minitri_ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use minitri_lexer::Token;

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    NonAssoc,
}

/// Get binary operator metadata (precedence, associativity, operator enum).
///
/// Returns (precedence, associativity, op) where higher precedence = tighter
/// binding. This is the single source of truth for binary operator parsing.
fn binary_op_info(token: &Token) -> Option<(u8, Assoc, BinaryOp)> {
    match token {
        Token::Lt => Some((10, Assoc::NonAssoc, BinaryOp::Lt)),
        Token::Gt => Some((10, Assoc::NonAssoc, BinaryOp::Gt)),
        Token::Equal => Some((10, Assoc::NonAssoc, BinaryOp::Eq)),
        Token::Plus => Some((20, Assoc::Left, BinaryOp::Add)),
        Token::Minus => Some((20, Assoc::Left, BinaryOp::Sub)),
        Token::Star => Some((30, Assoc::Left, BinaryOp::Mul)),
        Token::Slash => Some((30, Assoc::Left, BinaryOp::Div)),
        Token::Backslash => Some((30, Assoc::Left, BinaryOp::Mod)),
        _ => None,
    }
}

/// Parse an expression.
pub(super) fn parse_expr(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    parse_climb(stream, 0)
}

/// Precedence climbing over binary operators.
fn parse_climb(stream: &mut TokenStream, min_prec: u8) -> Result<Expr, ParseError> {
    let mut left = parse_prefix(stream)?;

    while let Some(token) = stream.peek() {
        let Some((prec, assoc, op)) = binary_op_info(token) else {
            break;
        };
        if prec < min_prec {
            break;
        }

        let span_start = stream.current_pos();
        stream.advance();

        let right = parse_climb(stream, prec + 1)?;
        let span = left.span.merge(&stream.span_from(span_start));
        left = Expr::binary(op, left, right, span);

        if assoc == Assoc::NonAssoc {
            // Relational comparisons do not chain.
            if let Some((next_prec, _, _)) = stream.peek().and_then(binary_op_info) {
                if next_prec == prec {
                    return Err(ParseError::invalid_syntax(
                        "relational operators are non-associative and cannot be chained",
                        stream.current_span(),
                    ));
                }
            }
        }
    }

    Ok(left)
}

/// Parse prefix expressions (unary minus, then atoms).
fn parse_prefix(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    match stream.peek() {
        Some(Token::Minus) => {
            let start = stream.current_pos();
            stream.advance();
            let operand = parse_prefix(stream)?;
            let span = stream.span_from(start);
            Ok(Expr::unary(UnaryOp::Neg, operand, span))
        }
        _ => parse_atom(stream),
    }
}

/// Parse atomic expressions: literals, identifiers, calls, parenthesized.
fn parse_atom(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.current_pos();

    match stream.peek() {
        Some(Token::Integer(value)) => {
            let value = *value;
            stream.advance();
            Ok(Expr::int(value, stream.span_from(start)))
        }
        Some(Token::Ident(_)) => {
            // One token of lookahead separates a call from a plain reference.
            if matches!(stream.peek_nth(1), Some(Token::LParen)) {
                let name = stream.expect_ident("in expression")?;
                let args = parse_call_args(stream)?;
                Ok(Expr::new(
                    ExprKind::Call { name, args },
                    stream.span_from(start),
                ))
            } else {
                let name = stream.expect_ident("in expression")?;
                let span = name.span;
                Ok(Expr::var(name, span))
            }
        }
        Some(Token::LParen) => {
            stream.advance();
            let inner = parse_expr(stream)?;
            stream.expect(Token::RParen)?;
            Ok(Expr::new(
                ExprKind::Grouped(Box::new(inner)),
                stream.span_from(start),
            ))
        }
        other => Err(ParseError::unexpected_token(
            other,
            "in expression",
            stream.current_span(),
        )),
    }
}

/// Parse call arguments: `( [expr (',' expr)*] )`.
pub(super) fn parse_call_args(stream: &mut TokenStream) -> Result<Vec<Expr>, ParseError> {
    stream.expect(Token::LParen)?;

    let mut args = Vec::new();
    while !matches!(stream.peek(), Some(Token::RParen)) {
        args.push(parse_expr(stream)?);

        if !matches!(stream.peek(), Some(Token::RParen)) {
            stream.expect(Token::Comma)?;
        }
    }

    stream.expect(Token::RParen)?;
    Ok(args)
}
