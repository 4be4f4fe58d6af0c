//! Command parsers (keyword-dispatched).

use super::{decl, expr, ParseError, TokenStream};
use minitri_ast::{Command, CommandKind};
use minitri_lexer::Token;

/// Parse a command: single commands joined by `;` into a sequence.
///
/// `;` is a separator, not a terminator: `begin c1; c2 end` is well-formed,
/// `begin c1; end` is not.
pub(super) fn parse_command(stream: &mut TokenStream) -> Result<Command, ParseError> {
    let start = stream.current_pos();
    let first = parse_single_command(stream)?;

    if !matches!(stream.peek(), Some(Token::Semicolon)) {
        return Ok(first);
    }

    let mut commands = vec![first];
    while matches!(stream.peek(), Some(Token::Semicolon)) {
        stream.advance();
        commands.push(parse_single_command(stream)?);
    }

    let span = stream.span_from(start);
    Ok(Command::new(CommandKind::Sequence(commands), span))
}

/// Parse a single command (keyword-dispatched).
pub(super) fn parse_single_command(stream: &mut TokenStream) -> Result<Command, ParseError> {
    match stream.peek() {
        Some(Token::If) => parse_if(stream),
        Some(Token::While) => parse_while(stream),
        Some(Token::Let) => parse_let(stream),
        Some(Token::Begin) => parse_block(stream),
        Some(Token::Return) => parse_return(stream),
        Some(Token::Ident(_)) => parse_assign_or_call(stream),
        other => Err(ParseError::unexpected_token(
            other,
            "at start of command",
            stream.current_span(),
        )),
    }
}

/// `if Expression then single-Command else single-Command`
///
/// Both branches are required.
fn parse_if(stream: &mut TokenStream) -> Result<Command, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::If)?;
    let cond = expr::parse_expr(stream)?;
    stream.expect(Token::Then)?;
    let then_branch = parse_single_command(stream)?;
    stream.expect(Token::Else)?;
    let else_branch = parse_single_command(stream)?;

    Ok(Command::new(
        CommandKind::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        },
        stream.span_from(start),
    ))
}

/// `while Expression do single-Command`
fn parse_while(stream: &mut TokenStream) -> Result<Command, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::While)?;
    let cond = expr::parse_expr(stream)?;
    stream.expect(Token::Do)?;
    let body = parse_single_command(stream)?;

    Ok(Command::new(
        CommandKind::While {
            cond,
            body: Box::new(body),
        },
        stream.span_from(start),
    ))
}

/// `let Declarations in single-Command`
fn parse_let(stream: &mut TokenStream) -> Result<Command, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Let)?;
    let decls = decl::parse_declarations(stream)?;
    stream.expect(Token::In)?;
    let body = parse_single_command(stream)?;

    Ok(Command::new(
        CommandKind::Let {
            decls,
            body: Box::new(body),
        },
        stream.span_from(start),
    ))
}

/// `begin Command end`
fn parse_block(stream: &mut TokenStream) -> Result<Command, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Begin)?;
    let body = parse_command(stream)?;
    stream.expect(Token::End)?;

    Ok(Command::new(
        CommandKind::Block(Box::new(body)),
        stream.span_from(start),
    ))
}

/// `return Expression`
fn parse_return(stream: &mut TokenStream) -> Result<Command, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::Return)?;
    let value = expr::parse_expr(stream)?;

    Ok(Command::new(
        CommandKind::Return(value),
        stream.span_from(start),
    ))
}

/// `Identifier ':=' Expression` or `Identifier '(' Arguments ')'`
///
/// Disambiguated by the token after the identifier.
fn parse_assign_or_call(stream: &mut TokenStream) -> Result<Command, ParseError> {
    let start = stream.current_pos();
    let name = stream.expect_ident("at start of command")?;

    match stream.peek() {
        Some(Token::Becomes) => {
            stream.advance();
            let value = expr::parse_expr(stream)?;
            Ok(Command::new(
                CommandKind::Assign {
                    target: name,
                    value,
                },
                stream.span_from(start),
            ))
        }
        Some(Token::LParen) => {
            let args = expr::parse_call_args(stream)?;
            Ok(Command::new(
                CommandKind::Call { name, args },
                stream.span_from(start),
            ))
        }
        other => Err(ParseError::unexpected_token(
            other,
            "after identifier (expected `:=` or `(`)",
            stream.current_span(),
        )),
    }
}
