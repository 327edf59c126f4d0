//! Lexer error type.

use crate::span::Span;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unrecognized character at line {}, column {}", .0.start_line, .0.start_column)]
    UnrecognizedCharacter(Span),

    #[error("bad numeric literal '{text}' at line {}, column {}", .span.start_line, .span.start_column)]
    BadNumericLiteral { text: String, span: Span },

    #[error("bad character literal '{text}' at line {}, column {}", .span.start_line, .span.start_column)]
    BadCharLiteral { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnrecognizedCharacter(span) => *span,
            LexError::BadNumericLiteral { span, .. } => *span,
            LexError::BadCharLiteral { span, .. } => *span,
        }
    }
}

pub type LexResult<T> = Result<T, LexError>;
