//! Token stream wrapper for the recursive descent parser.

use minitri_ast::{Name, Span};
use minitri_lexer::Token;
use std::ops::Range;

/// Token stream with single-token lookahead and span tracking.
///
/// Each token is paired with its byte span from the source, so parse errors
/// point at real source locations. The stream is sequential and single-pass;
/// the parser never rewinds it.
pub struct TokenStream<'src> {
    tokens: &'src [(Token, Range<usize>)],
    pos: usize,
    file_id: u16,
}

impl<'src> TokenStream<'src> {
    /// Create a new token stream from tokens with their byte spans.
    pub fn new(tokens: &'src [(Token, Range<usize>)], file_id: u16) -> Self {
        Self {
            tokens,
            pos: 0,
            file_id,
        }
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    /// Peek at the nth token ahead without consuming.
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(tok, _)| tok)
    }

    /// Advance to the next token and return the current one.
    pub fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|(tok, _)| tok);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token matches the expected token kind.
    pub fn check(&self, expected: &Token) -> bool {
        matches!(self.peek(), Some(t) if std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    /// Expect a specific token and advance past it.
    ///
    /// Returns an error naming the expected token if it doesn't match.
    pub fn expect(&mut self, expected: Token) -> Result<Span, super::ParseError> {
        if self.check(&expected) {
            let start = self.pos;
            self.advance();
            Ok(self.span_from(start))
        } else {
            Err(super::ParseError::expected_token(
                &expected,
                self.peek(),
                self.current_span(),
            ))
        }
    }

    /// Expect an identifier and advance past it.
    pub fn expect_ident(&mut self, context: &str) -> Result<Name, super::ParseError> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::Ident(text)) => {
                let name = Name {
                    text: text.to_string(),
                    span,
                };
                self.advance();
                Ok(name)
            }
            other => Err(super::ParseError::unexpected_token(other, context, span)),
        }
    }

    /// Check if we've reached the end of the token stream.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Get the current position in the token stream.
    pub fn current_pos(&self) -> usize {
        self.pos
    }

    /// Create a span from a starting token position to the last consumed
    /// token, using real byte offsets.
    pub fn span_from(&self, start: usize) -> Span {
        let start_byte = match self.tokens.get(start) {
            Some((_, span)) => span.start,
            None => return self.current_span(),
        };

        let end_byte = if self.pos > 0 && self.pos <= self.tokens.len() {
            // End of the last consumed token
            self.tokens[self.pos - 1].1.end
        } else {
            start_byte
        };

        Span::new(self.file_id, start_byte as u32, end_byte as u32)
    }

    /// Get a span for the current token, or a zero-length span at the end of
    /// the last token once the stream is exhausted.
    pub fn current_span(&self) -> Span {
        if let Some((_, span)) = self.tokens.get(self.pos) {
            Span::new(self.file_id, span.start as u32, span.end as u32)
        } else if let Some((_, span)) = self.tokens.last() {
            Span::new(self.file_id, span.end as u32, span.end as u32)
        } else {
            Span::zero(self.file_id)
        }
    }
}
