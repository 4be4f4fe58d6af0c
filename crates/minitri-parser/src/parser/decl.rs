//! Declaration parsers (keyword-dispatched).

use super::{command, expr, ParseError, TokenStream};
use minitri_ast::{Declaration, DeclarationKind, Param, TypeDenoter};
use minitri_lexer::Token;

/// Parse the declaration list of a `let`: declarations joined by `;`.
///
/// The list ends at `in`; declarations are kept in source order and are
/// elaborated in that order by the code generator.
pub(super) fn parse_declarations(stream: &mut TokenStream) -> Result<Vec<Declaration>, ParseError> {
    let mut decls = vec![parse_declaration(stream)?];

    while matches!(stream.peek(), Some(Token::Semicolon)) {
        stream.advance();
        decls.push(parse_declaration(stream)?);
    }

    Ok(decls)
}

/// Parse a single declaration (keyword-dispatched).
fn parse_declaration(stream: &mut TokenStream) -> Result<Declaration, ParseError> {
    match stream.peek() {
        Some(Token::Const) => parse_const(stream),
        Some(Token::Var) => parse_var(stream),
        Some(Token::Proc) => parse_proc(stream),
        Some(Token::Func) => parse_func(stream),
        other => Err(ParseError::unexpected_token(
            other,
            "at declaration (expected `const`, `var`, `proc`, or `func`)",
            stream.current_span(),
        )),
    }
}

/// `const Identifier ~ Expression`
fn parse_const(stream: &mut TokenStream) -> Result<Declaration, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Const)?;
    let name = stream.expect_ident("as constant name")?;
    stream.expect(Token::Tilde)?;
    let value = expr::parse_expr(stream)?;

    Ok(Declaration::new(
        DeclarationKind::Const { name, value },
        stream.span_from(start),
    ))
}

/// `var Identifier : TypeDenoter`
fn parse_var(stream: &mut TokenStream) -> Result<Declaration, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Var)?;
    let name = stream.expect_ident("as variable name")?;
    stream.expect(Token::Colon)?;
    let ty = parse_type_denoter(stream)?;

    Ok(Declaration::new(
        DeclarationKind::Var { name, ty },
        stream.span_from(start),
    ))
}

/// `proc Identifier ( Formals ) single-Command`
fn parse_proc(stream: &mut TokenStream) -> Result<Declaration, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Proc)?;
    let name = stream.expect_ident("as procedure name")?;
    let params = parse_formals(stream)?;
    let body = command::parse_single_command(stream)?;

    Ok(Declaration::new(
        DeclarationKind::Proc {
            name,
            params,
            body: Box::new(body),
        },
        stream.span_from(start),
    ))
}

/// `func Identifier ( Formals ) : TypeDenoter single-Command`
fn parse_func(stream: &mut TokenStream) -> Result<Declaration, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Func)?;
    let name = stream.expect_ident("as function name")?;
    let params = parse_formals(stream)?;
    stream.expect(Token::Colon)?;
    let return_ty = parse_type_denoter(stream)?;
    let body = command::parse_single_command(stream)?;

    Ok(Declaration::new(
        DeclarationKind::Func {
            name,
            params,
            return_ty,
            body: Box::new(body),
        },
        stream.span_from(start),
    ))
}

/// Parse a formal parameter list: `( [name : type (',' name : type)*] )`.
fn parse_formals(stream: &mut TokenStream) -> Result<Vec<Param>, ParseError> {
    stream.expect(Token::LParen)?;

    let mut params = Vec::new();
    while !matches!(stream.peek(), Some(Token::RParen)) {
        let start = stream.current_pos();
        let name = stream.expect_ident("as parameter name")?;
        stream.expect(Token::Colon)?;
        let ty = parse_type_denoter(stream)?;
        params.push(Param {
            name,
            ty,
            span: stream.span_from(start),
        });

        if !matches!(stream.peek(), Some(Token::RParen)) {
            stream.expect(Token::Comma)?;
        }
    }

    stream.expect(Token::RParen)?;
    Ok(params)
}

/// `TypeDenoter ::= Identifier`
fn parse_type_denoter(stream: &mut TokenStream) -> Result<TypeDenoter, ParseError> {
    let name = stream.expect_ident("as type name")?;
    Ok(TypeDenoter {
        name: name.text,
        span: name.span,
    })
}
