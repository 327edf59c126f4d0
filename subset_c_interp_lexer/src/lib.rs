//! Lexer for a C99 subset, used by the `subset_c_interp` interpreter.
//!
//! The crate is deliberately small: token definitions (`token`), spans
//! (`span`), literal decoding (`literals`) and a spanned-token lexer
//! (`lexer`). Parsing and evaluation live in the interpreter crate.

pub mod error;
pub mod lexer;
pub mod literals;
pub mod span;
pub mod token;

pub use error::{LexError, LexResult};
pub use lexer::{lex_all, Lexer, SpannedToken};
pub use span::{SourceMap, Span};
pub use token::Token;
