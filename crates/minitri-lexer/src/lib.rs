// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for the Mini Triangle language.
//!
//! Tokenization is done with logos.
//!
//! # Design
//!
//! - `Token` — all Mini Triangle token types (keywords, operators, literals,
//!   identifiers)
//! - Comments (`!` to end of line) are stripped during lexing, not tokens
//! - Token strings defined once in `TOKEN_STRINGS` table (single source of
//!   truth for Display)
//! - `scan` drives the lexer over a whole source text and pairs each token
//!   with its byte span, failing on the first unrecognized character
//!
//! # Examples
//!
//! ```
//! # use minitri_lexer::*;
//! let tokens = scan("let var x: Integer in x := 3").unwrap();
//! assert_eq!(tokens[0].0, Token::Let);
//! ```

use logos::Logos;
use std::ops::Range;
use std::rc::Rc;

/// Mini Triangle token.
///
/// Token strings for keywords, operators, and punctuation are defined once
/// in the `TOKEN_STRINGS` table and indexed by discriminant for Display.
///
/// # Layout
///
/// Uses `#[repr(u16)]` to guarantee discriminant values are stable and
/// can be safely used to index into `TOKEN_STRINGS`.
#[derive(Logos, Debug, Clone, PartialEq)]
#[repr(u16)]
#[logos(skip r"[ \t\r\n]+")] // Skip whitespace
#[logos(skip r"![^\n]*")] // Skip ! comments
pub enum Token {
    // === Keywords ===
    /// Keyword `begin`
    #[token("begin")]
    Begin,
    /// Keyword `const`
    #[token("const")]
    Const,
    /// Keyword `do`
    #[token("do")]
    Do,
    /// Keyword `else`
    #[token("else")]
    Else,
    /// Keyword `end`
    #[token("end")]
    End,
    /// Keyword `func`
    #[token("func")]
    Func,
    /// Keyword `if`
    #[token("if")]
    If,
    /// Keyword `in`
    #[token("in")]
    In,
    /// Keyword `let`
    #[token("let")]
    Let,
    /// Keyword `proc`
    #[token("proc")]
    Proc,
    /// Keyword `return`
    #[token("return")]
    Return,
    /// Keyword `then`
    #[token("then")]
    Then,
    /// Keyword `var`
    #[token("var")]
    Var,
    /// Keyword `while`
    #[token("while")]
    While,

    // === Operators ===
    /// Operator `+`
    #[token("+")]
    Plus,
    /// Operator `-`
    #[token("-")]
    Minus,
    /// Operator `*`
    #[token("*")]
    Star,
    /// Operator `/`
    #[token("/")]
    Slash,
    /// Operator `\` (modulo)
    #[token("\\")]
    Backslash,
    /// Operator `<`
    #[token("<")]
    Lt,
    /// Operator `>`
    #[token(">")]
    Gt,
    /// Operator `=`
    #[token("=")]
    Equal,

    // === Punctuation ===
    /// Assignment `:=`
    ///
    /// Must be declared before `Colon` so logos prefers the longer match.
    #[token(":=")]
    Becomes,
    /// Punctuation `:`
    #[token(":")]
    Colon,
    /// Constant binder `~`
    #[token("~")]
    Tilde,
    /// Punctuation `;`
    #[token(";")]
    Semicolon,
    /// Punctuation `,`
    #[token(",")]
    Comma,
    /// Delimiter `(`
    #[token("(")]
    LParen,
    /// Delimiter `)`
    #[token(")")]
    RParen,

    // === Literals ===
    /// Integer literal (e.g., 42, 0, 1000)
    ///
    /// LIMITATION: if integer parsing overflows `i64`, logos returns None and
    /// the lexer emits a generic error token at that span. The regex ensures
    /// a valid digit sequence, so overflow is the only failure mode.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    /// Identifier (e.g., x, fact, Integer)
    ///
    /// Uses `Rc<str>` for cheap cloning throughout the parser pipeline.
    #[regex(r"[a-zA-Z][a-zA-Z0-9]*", |lex| Rc::from(lex.slice()))]
    Ident(Rc<str>),
}

/// Token string lookup table.
///
/// Maps discriminant indices to their string representation.
/// This is the single source of truth for token display strings,
/// indexed by the enum discriminant order.
///
/// NOTE: The `#[token("...")]` attributes above must match these strings.
const TOKEN_STRINGS: &[&str] = &[
    "begin", "const", "do", "else", "end", "func", "if", "in", "let", "proc", "return", "then",
    "var", "while", // keywords
    "+", "-", "*", "/", "\\", "<", ">", "=", // operators
    ":=", ":", "~", ";", ",", "(", ")", // punctuation
];

impl Token {
    /// Get the index into TOKEN_STRINGS for simple tokens.
    ///
    /// # Safety
    ///
    /// Safe due to `#[repr(u16)]` on Token enum ensuring stable discriminants.
    fn token_string_index(&self) -> usize {
        let discriminant = unsafe { *(self as *const Token as *const u16) };
        discriminant as usize
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Literals with data (not in TOKEN_STRINGS table)
            Token::Integer(n) => write!(f, "{}", n),
            Token::Ident(id) => write!(f, "{}", id),

            // Simple tokens (keywords, operators, punctuation)
            _ => {
                let idx = self.token_string_index();
                let s = TOKEN_STRINGS
                    .get(idx)
                    .expect("BUG: token discriminant out of bounds for TOKEN_STRINGS");
                write!(f, "{}", s)
            }
        }
    }
}

/// Scan error: the source contained a character sequence that is not part of
/// any token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized character {text:?}")]
pub struct ScanError {
    /// Byte range of the offending input.
    pub span: Range<usize>,
    /// The offending source text.
    pub text: String,
}

/// Scan a whole source text into tokens paired with their byte spans.
///
/// Fails on the first unrecognized character. End of input is represented by
/// the end of the returned sequence; the parser treats exhaustion as the
/// end-of-file sentinel.
pub fn scan(source: &str) -> Result<Vec<(Token, Range<usize>)>, ScanError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let text = source[span.clone()].to_string();
                return Err(ScanError { span, text });
            }
        }
    }
    Ok(tokens)
}
