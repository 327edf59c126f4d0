//! Interpreter error type.
//!
//! Every fatal condition funnels into one `CError` carrying source
//! coordinates; it propagates through every operator as a `Result` and is
//! caught exactly once by the driver or the embedding API.

use thiserror::Error;

/// Category of a fatal interpreter error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unexpected token, unclosed brackets, missing semicolon.
    Syntax,
    /// Incompatible types in an assignment or operation.
    Type,
    /// Undefined identifier, redefinition, out-of-scope access.
    Name,
    /// Arena exhausted or stack underrun.
    Memory,
    /// Null dereference, bad argument counts, division by zero.
    Runtime,
    /// Function declared but body undefined at call time.
    Link,
    /// Not an error: the program called `exit()`.
    Exit(i32),
}

/// A fatal interpreter error with source coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{file}:{line}:{column} {message}")]
pub struct CError {
    pub kind: ErrorKind,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl CError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            kind,
            message: message.into(),
            file: String::new(),
            line: 0,
            column: 0,
        })
    }

    /// The exit status the driver should report for this error.
    pub fn exit_status(&self) -> i32 {
        match self.kind {
            ErrorKind::Exit(status) => status,
            _ => 1,
        }
    }
}

pub type CResult<T> = Result<T, Box<CError>>;
