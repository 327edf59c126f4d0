//! Embedding API: create an interpreter, feed it sources, call `main`.

use tracing::debug;

use crate::error::{CError, CResult, ErrorKind};
use crate::interp::{Interp, OutputSink, ParseState};
use crate::types::{self, BaseType};

/// Default arena size, overridable through `STACKSIZE`.
pub const DEFAULT_ARENA_BYTES: usize = 32 * 1024 * 1024;

/// One interpreter instance. Two instances are fully independent.
#[derive(Debug)]
pub struct Interpreter {
    interp: Interp,
}

impl Interpreter {
    pub fn new(arena_bytes: usize) -> Self {
        Self { interp: Interp::new(arena_bytes) }
    }

    /// An interpreter whose library output is captured instead of written
    /// to stdout; fetch it with `take_output`.
    pub fn with_captured_output(arena_bytes: usize) -> Self {
        let mut interp = Interp::new(arena_bytes);
        interp.output = OutputSink::Capture(Vec::new());
        Self { interp }
    }

    /// Register every host library header.
    pub fn include_all_system_headers(&mut self) -> CResult<()> {
        self.interp.include_all_system_headers()
    }

    /// Lex and execute the top-level declarations of a source.
    pub fn parse_source(&mut self, filename: &str, source: &str, interactive: bool) -> CResult<()> {
        debug!(filename, interactive, bytes = source.len(), "parse source");
        let stream = self.interp.add_stream(filename, source)?;
        self.interp.run_stream(stream)
    }

    /// Invoke the declared `main`, passing `args` through `__argc`/`__argv`
    /// when it takes parameters. Returns `main`'s value (0 for void).
    pub fn call_main(&mut self, args: &[String]) -> CResult<i32> {
        let Some(main_id) = self.interp.interner.get("main") else {
            return Err(CError::new(ErrorKind::Link, "main() is not defined"));
        };
        let Some((val, _)) = self.interp.var_lookup(main_id) else {
            return Err(CError::new(ErrorKind::Link, "main() is not defined"));
        };
        if self.interp.types.base(val.typ) != BaseType::Function {
            return Err(CError::new(ErrorKind::Link, "main is not a function"));
        }
        let boot_ps = ParseState::new(self.interp.ensure_platform_stream()?);
        let fid = self.interp.read_ptr(&boot_ps, val.addr)? as usize;
        let takes_args = !self.interp.functions[fid].params.is_empty();
        let returns_void = self.interp.functions[fid].ret == types::VOID;

        let source = match (returns_void, takes_args) {
            (true, false) => "main();",
            (true, true) => "main(__argc, __argv);",
            (false, false) => "__exit_value = main();",
            (false, true) => "__exit_value = main(__argc, __argv);",
        };

        if !returns_void && self.interp.interner.get("__exit_value").map_or(true, |id| self.interp.var_lookup(id).is_none()) {
            let id = self.interp.interner.intern("__exit_value");
            self.interp.var_define(&boot_ps, id, types::INT, true)?;
        }
        if takes_args {
            self.define_main_args(&boot_ps, args)?;
        }

        let stream = self.interp.add_stream("<startup>", source)?;
        self.interp.run_stream(stream)?;

        if returns_void {
            return Ok(0);
        }
        let id = self.interp.interner.intern("__exit_value");
        let (exit_val, _) = self.interp.var_get(&boot_ps, id)?;
        Ok(self.interp.coerce_int(&boot_ps, &exit_val)? as i32)
    }

    fn define_main_args(&mut self, ps: &ParseState, args: &[String]) -> CResult<()> {
        let oom = || CError::new(ErrorKind::Memory, "out of memory");
        // the strings, then a NULL-terminated pointer array
        let mut ptrs: Vec<u64> = Vec::with_capacity(args.len() + 1);
        for arg in args {
            let addr = self.interp.arena.alloc_heap(arg.len() + 1).ok_or_else(oom)?;
            self.interp.arena.write(addr, arg.as_bytes());
            ptrs.push(addr);
        }
        ptrs.push(0);
        let table = self.interp.arena.alloc_heap(ptrs.len() * 8).ok_or_else(oom)?;
        for (i, p) in ptrs.iter().enumerate() {
            self.interp.write_ptr(ps, table + (i * 8) as u64, *p)?;
        }
        let char_ptr = self.interp.types.char_ptr;
        let char_pp = self.interp.types.get_matching(char_ptr, BaseType::Pointer, 0, None);

        let argc_id = self.interp.interner.intern("__argc");
        if self.interp.var_lookup(argc_id).is_none() {
            let (argc_val, _) = self.interp.var_define(ps, argc_id, types::INT, true)?;
            self.interp.write_int_as(ps, argc_val.addr, BaseType::Int, args.len() as i64)?;
            let argv_id = self.interp.interner.intern("__argv");
            let (argv_val, _) = self.interp.var_define(ps, argv_id, char_pp, true)?;
            self.interp.write_ptr(ps, argv_val.addr, table)?;
        }
        Ok(())
    }

    /// Captured library output so far (empty when writing to stdout).
    pub fn take_output(&mut self) -> String {
        self.interp.take_output()
    }

    /// Current arena stack cursor; the LIFO discipline means this returns
    /// to its old value after every completed top-level statement.
    pub fn arena_stack_pos(&self) -> usize {
        self.interp.arena.stack_pos()
    }
}

/// Run a complete program: register the library, execute top-level
/// declarations, then call `main`. Returns the exit status and captured
/// output. `exit()` is reported as a normal status.
pub fn run_source(source: &str) -> CResult<(i32, String)> {
    let mut interpreter = Interpreter::with_captured_output(4 * 1024 * 1024);
    interpreter.include_all_system_headers()?;
    let status = match interpreter
        .parse_source("test.c", source, false)
        .and_then(|()| interpreter.call_main(&["test.c".to_owned()]))
    {
        Ok(status) => status,
        Err(e) => match e.kind {
            ErrorKind::Exit(status) => status,
            _ => return Err(e),
        },
    };
    Ok((status, interpreter.take_output()))
}

/// Run top-level statements without calling `main` (script mode).
pub fn run_script(source: &str) -> CResult<String> {
    let mut interpreter = Interpreter::with_captured_output(4 * 1024 * 1024);
    interpreter.include_all_system_headers()?;
    match interpreter.parse_source("script.c", source, false) {
        Ok(()) => {}
        Err(e) if matches!(e.kind, ErrorKind::Exit(_)) => {}
        Err(e) => return Err(e),
    }
    Ok(interpreter.take_output())
}
