//! Interpreter state and the token cursor.
//!
//! Sources are pre-lexed into owned token streams; a `ParseState` is a
//! copyable cursor into one stream, so saving and restoring a parse
//! position is a struct copy. Function and macro bodies are recorded as
//! cursors into these streams.

use std::collections::HashMap;

use subset_c_interp_lexer::{lex_all, literals, Span, Token};

use crate::arena::Arena;
use crate::error::{CError, CResult, ErrorKind};
use crate::intern::{Interner, StrId};
use crate::types::{self, BaseType, TypeId, TypeRegistry};
use crate::value::Value;
use crate::variables::{StackFrame, VarTable};

/// Payload of a literal or identifier token, resolved at pre-lex time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokValue {
    None,
    Int { value: i64, typ: TypeId },
    Float { value: f64, double: bool },
    Char(u8),
    Str(StrId),
    Ident(StrId),
}

/// One pre-lexed token.
#[derive(Debug, Clone, Copy)]
pub struct STok {
    pub tok: Token,
    pub value: TokValue,
    pub span: Span,
}

/// An owned, fully-lexed source.
#[derive(Debug)]
pub struct TokenStream {
    pub file: StrId,
    pub tokens: Vec<STok>,
}

/// A position inside a token stream (function/macro body cursor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsePos {
    pub stream: usize,
    pub pos: usize,
}

/// What the statement parser is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Executing normally.
    Run,
    /// Parsing without executing (untaken branches, function bodies).
    Skip,
    /// Unwinding to the enclosing function call after `return`.
    Return,
    /// Unwinding to the enclosing loop after `break`.
    Break,
    /// Unwinding to the enclosing loop head after `continue`.
    Continue,
    /// Scanning a switch block for a matching `case`.
    CaseSearch,
    /// Scanning for a `goto` label.
    Goto,
}

/// Copyable cursor over a token stream, plus the current execution mode.
#[derive(Debug, Clone, Copy)]
pub struct ParseState {
    pub stream: usize,
    pub pos: usize,
    pub mode: RunMode,
    /// Lexical scope id; `None` while binding function parameters so they
    /// are not scoped out on block exit.
    pub scope: Option<ScopeId>,
    /// Target label while `mode == Goto`.
    pub search_label: Option<StrId>,
    /// Controlling value while `mode == CaseSearch`.
    pub switch_value: i64,
}

impl ParseState {
    pub fn new(stream: usize) -> Self {
        Self {
            stream,
            pos: 0,
            mode: RunMode::Run,
            scope: Some(ScopeId(0)),
            search_label: None,
            switch_value: 0,
        }
    }
}

/// Identity of a lexical block, derived from its token position so it is
/// stable across re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u64);

/// A host function callable from interpreted code.
pub type IntrinsicFn = fn(&mut Interp, &ParseState, &Value, &[Value]) -> CResult<()>;

/// Index into the interpreter's function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncId(pub u32);

/// A function or parameterized-macro definition.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: StrId,
    pub ret: TypeId,
    pub params: Vec<(StrId, TypeId)>,
    pub varargs: bool,
    /// Cursor to the body: the `{` of a function, the expression of a macro.
    pub body: Option<ParsePos>,
    pub intrinsic: Option<IntrinsicFn>,
    pub is_macro: bool,
}

/// Where library output goes; tests capture it.
#[derive(Debug)]
pub enum OutputSink {
    Stdout,
    Capture(Vec<u8>),
}

/// One interpreter instance. Everything is exclusively owned: two
/// instances are fully independent.
#[derive(Debug)]
pub struct Interp {
    pub arena: Arena,
    pub interner: Interner,
    pub types: TypeRegistry,
    pub globals: VarTable,
    pub frames: Vec<StackFrame>,
    pub functions: Vec<FunctionDef>,
    pub streams: Vec<TokenStream>,
    /// Interned string-literal bodies -> arena address of the shared cell.
    pub string_literals: HashMap<StrId, u64>,
    pub output: OutputSink,
    /// Deterministic generator behind rand()/srand().
    pub rand_state: u64,
    /// Headers already switched in; repeated includes are no-ops.
    pub included_headers: Vec<String>,
}

impl Interp {
    pub fn new(arena_bytes: usize) -> Self {
        Self {
            arena: Arena::new(arena_bytes),
            interner: Interner::new(),
            types: TypeRegistry::new(),
            globals: VarTable::new(),
            frames: Vec::new(),
            functions: Vec::new(),
            streams: Vec::new(),
            string_literals: HashMap::new(),
            output: OutputSink::Stdout,
            rand_state: 1,
            included_headers: Vec::new(),
        }
    }

    // ==================== Token streams ====================

    /// Lex a source and append it as a new stream. Literal payloads are
    /// resolved once here.
    pub fn add_stream(&mut self, filename: &str, source: &str) -> CResult<usize> {
        let file = self.interner.intern(filename);
        let raw = lex_all(source).map_err(|e| {
            let span = e.span();
            Box::new(CError {
                kind: ErrorKind::Syntax,
                message: e.to_string(),
                file: filename.to_owned(),
                line: span.start_line,
                column: span.start_column,
            })
        })?;
        let mut tokens = Vec::with_capacity(raw.len() + 1);
        for (tok, span) in raw {
            let text = span.text(source);
            let value = match tok {
                Token::IntLit => {
                    let lit = literals::decode_int(text).ok_or_else(|| {
                        self.err_span(ErrorKind::Syntax, format!("bad integer literal '{text}'"), filename, span)
                    })?;
                    TokValue::Int { value: lit.value as i64, typ: int_literal_type(&lit) }
                }
                Token::FloatLit => {
                    let (value, single) = literals::decode_float(text).ok_or_else(|| {
                        self.err_span(ErrorKind::Syntax, format!("bad float literal '{text}'"), filename, span)
                    })?;
                    TokValue::Float { value, double: !single }
                }
                Token::CharLit => {
                    let c = literals::decode_char(text).ok_or_else(|| {
                        self.err_span(ErrorKind::Syntax, format!("bad character literal '{text}'"), filename, span)
                    })?;
                    TokValue::Char(c)
                }
                Token::StrLit => {
                    let bytes = literals::decode_string(text).ok_or_else(|| {
                        self.err_span(ErrorKind::Syntax, format!("bad string literal '{text}'"), filename, span)
                    })?;
                    let body = String::from_utf8_lossy(&bytes).into_owned();
                    TokValue::Str(self.interner.intern(&body))
                }
                Token::Ident => TokValue::Ident(self.interner.intern(text)),
                Token::HashInclude => {
                    // stash the target name: the part between <> or ""
                    let target = include_target(text);
                    TokValue::Str(self.interner.intern(target))
                }
                _ => TokValue::None,
            };
            tokens.push(STok { tok, value, span });
        }
        let end_span = tokens.last().map(|t| t.span).unwrap_or_else(Span::at_start);
        tokens.push(STok { tok: Token::Eof, value: TokValue::None, span: end_span });
        self.streams.push(TokenStream { file, tokens });
        Ok(self.streams.len() - 1)
    }

    /// Current token without consuming it.
    pub fn peek_tok(&self, ps: &ParseState) -> STok {
        let stream = &self.streams[ps.stream];
        stream.tokens[ps.pos.min(stream.tokens.len() - 1)]
    }

    /// The token after the current one (two-token lookahead).
    pub fn peek2_tok(&self, ps: &ParseState) -> STok {
        let stream = &self.streams[ps.stream];
        let idx = (ps.pos + 1).min(stream.tokens.len() - 1);
        stream.tokens[idx]
    }

    /// Consume and return the current token.
    pub fn next_tok(&self, ps: &mut ParseState) -> STok {
        let t = self.peek_tok(ps);
        if t.tok != Token::Eof {
            ps.pos += 1;
        }
        t
    }

    /// Consume one token and fail unless it is `expected`.
    pub fn expect_tok(&self, ps: &mut ParseState, expected: Token, what: &str) -> CResult<STok> {
        let t = self.next_tok(ps);
        if t.tok != expected {
            return Err(self.err(ps, ErrorKind::Syntax, format!("{what} expected")));
        }
        Ok(t)
    }

    // ==================== Errors ====================

    /// Build a fatal error at the cursor's current source position.
    pub fn err(&self, ps: &ParseState, kind: ErrorKind, message: impl Into<String>) -> Box<CError> {
        let stream = &self.streams[ps.stream];
        let span = stream.tokens[ps.pos.min(stream.tokens.len() - 1)].span;
        Box::new(CError {
            kind,
            message: message.into(),
            file: self.interner.resolve(stream.file).to_owned(),
            line: span.start_line,
            column: span.start_column,
        })
    }

    fn err_span(&self, kind: ErrorKind, message: String, file: &str, span: Span) -> Box<CError> {
        Box::new(CError {
            kind,
            message,
            file: file.to_owned(),
            line: span.start_line,
            column: span.start_column,
        })
    }

    /// Type name for diagnostics.
    pub fn type_name(&self, t: TypeId) -> String {
        self.types.display(t, &self.interner)
    }

    // ==================== Output ====================

    pub fn write_out(&mut self, bytes: &[u8]) {
        match &mut self.output {
            OutputSink::Stdout => {
                use std::io::Write;
                let _ = std::io::stdout().write_all(bytes);
            }
            OutputSink::Capture(buf) => buf.extend_from_slice(bytes),
        }
    }

    /// Swap the capture buffer out, returning what was written so far.
    pub fn take_output(&mut self) -> String {
        match &mut self.output {
            OutputSink::Capture(buf) => String::from_utf8_lossy(&std::mem::take(buf)).into_owned(),
            OutputSink::Stdout => String::new(),
        }
    }
}

/// The C type of an integer literal: `int` when it fits, widening to
/// `long`, with `u`/`l`/`ll` suffixes overriding.
fn int_literal_type(lit: &literals::IntLit) -> TypeId {
    let fits_i32 = lit.value <= i32::MAX as u64;
    let fits_u32 = lit.value <= u32::MAX as u64;
    match (lit.unsigned, lit.longs) {
        (false, 0) => {
            if fits_i32 {
                types::INT
            } else {
                types::LONG
            }
        }
        (false, 1) => types::LONG,
        (false, _) => types::LONGLONG,
        (true, 0) => {
            if fits_u32 {
                types::UINT
            } else {
                types::ULONG
            }
        }
        (true, 1) => types::ULONG,
        (true, _) => types::ULONGLONG,
    }
}

/// Extract the header name from a lexed `#include` directive.
fn include_target(text: &str) -> &str {
    let inner = text
        .find(['<', '"'])
        .map(|i| &text[i + 1..])
        .unwrap_or("");
    inner.trim_end_matches(['>', '"'])
}

/// Classification helpers shared by the evaluator and statement parser.
pub fn is_base_type_token(tok: Token) -> bool {
    matches!(
        tok,
        Token::KwVoid
            | Token::KwChar
            | Token::KwShort
            | Token::KwInt
            | Token::KwLong
            | Token::KwFloat
            | Token::KwDouble
            | Token::KwSigned
            | Token::KwUnsigned
            | Token::KwStruct
            | Token::KwUnion
            | Token::KwEnum
    )
}

pub fn is_storage_class_token(tok: Token) -> bool {
    matches!(
        tok,
        Token::KwStatic
            | Token::KwExtern
            | Token::KwRegister
            | Token::KwAuto
            | Token::KwConst
            | Token::KwTypedef
    )
}

impl Interp {
    /// Is this token the start of a type (including typedef'd names)?
    pub fn is_type_token(&self, t: &STok) -> bool {
        if is_base_type_token(t.tok) || is_storage_class_token(t.tok) {
            return true;
        }
        if t.tok == Token::Ident {
            if let TokValue::Ident(name) = t.value {
                if let Some((val, _)) = self.var_lookup(name) {
                    return self.types.base(val.typ) == BaseType::TypeKind;
                }
            }
        }
        false
    }
}
