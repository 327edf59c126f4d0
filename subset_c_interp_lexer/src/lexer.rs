//! Lexer for C source code.
//!
//! Wraps the logos-generated lexer with span construction and peeking.
//! The interpreter pre-lexes each source into a token vector so the
//! evaluator can save and restore positions by copying a cursor.

use logos::Logos;

use crate::error::{LexError, LexResult};
use crate::span::{SourceMap, Span};
use crate::token::Token;

/// A token with its span and matched source text.
#[derive(Debug, Clone)]
pub struct SpannedToken<'a> {
    pub token: Token,
    pub span: Span,
    pub text: &'a str,
}

/// C lexer.
#[allow(missing_debug_implementations)]
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, Token>,
    source_map: SourceMap,
    peeked: Option<Option<LexResult<SpannedToken<'a>>>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: Token::lexer(source),
            source_map: SourceMap::new(source),
            peeked: None,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Option<&LexResult<SpannedToken<'a>>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_token_inner());
        }
        self.peeked.as_ref().and_then(|p| p.as_ref())
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Option<LexResult<SpannedToken<'a>>> {
        if let Some(peeked) = self.peeked.take() {
            return peeked;
        }
        self.next_token_inner()
    }

    fn next_token_inner(&mut self) -> Option<LexResult<SpannedToken<'a>>> {
        let result = self.inner.next()?;
        let range = self.inner.span();
        let span = self.source_map.span(range.start, range.end);
        let text = &self.source[range.start..range.end];
        Some(match result {
            Ok(token) => Ok(SpannedToken { token, span, text }),
            Err(()) => Err(LexError::UnrecognizedCharacter(span)),
        })
    }
}

/// Lex an entire source into a token vector.
pub fn lex_all(source: &str) -> LexResult<Vec<(Token, Span)>> {
    let mut lexer = Lexer::new(source);
    let mut out = Vec::new();
    while let Some(result) = lexer.next_token() {
        let spanned = result?;
        out.push((spanned.token, spanned.span));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn spans_carry_text() {
        let mut lexer = Lexer::new("int main()");
        let t = lexer.next_token().unwrap().unwrap();
        assert_eq!(t.token, Token::KwInt);
        assert_eq!(t.text, "int");
        let t = lexer.next_token().unwrap().unwrap();
        assert_eq!(t.token, Token::Ident);
        assert_eq!(t.text, "main");
        assert_eq!(t.span.start_column, 5);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new("x y");
        assert_eq!(lexer.peek().unwrap().as_ref().unwrap().text, "x");
        assert_eq!(lexer.next_token().unwrap().unwrap().text, "x");
        assert_eq!(lexer.next_token().unwrap().unwrap().text, "y");
        assert!(lexer.next_token().is_none());
    }

    #[test]
    fn reports_unrecognized_characters() {
        let mut lexer = Lexer::new("int @");
        lexer.next_token();
        let err = lexer.next_token().unwrap().unwrap_err();
        assert!(matches!(err, LexError::UnrecognizedCharacter(_)));
    }

    #[test]
    fn lex_all_collects_every_token() {
        let toks = lex_all("for (;;) {}").unwrap();
        let kinds: Vec<Token> = toks.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::KwFor,
                Token::LParen,
                Token::Semicolon,
                Token::Semicolon,
                Token::RParen,
                Token::LBrace,
                Token::RBrace,
            ]
        );
    }
}
