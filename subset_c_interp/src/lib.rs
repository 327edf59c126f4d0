// Library code reports through CError values, never stderr; the CLI
// binary owns user-facing printing.
#![deny(clippy::print_stderr)]

//! A token-walking interpreter for a C99 subset.
//!
//! Programs are lexed once into token streams and executed by walking the
//! tokens on demand; there is no AST and no bytecode. The core is the
//! operator-precedence expression evaluator in `expression`, backed by the
//! arena allocator (`arena`), the type registry (`types`), the value model
//! (`value`) and the variable/scope tables (`variables`). `statements`
//! drives control flow, `invocation` dispatches calls, `clibrary` provides
//! the host library, and `api` is the embedding surface.

pub mod api;
pub mod arena;
pub mod clibrary;
pub mod error;
pub mod expression;
pub mod intern;
pub mod interp;
pub mod invocation;
pub mod statements;
pub mod typeparse;
pub mod types;
pub mod value;
pub mod variables;

pub use api::{run_script, run_source, Interpreter};
pub use error::{CError, CResult, ErrorKind};
