//! Function and parameterized-macro call dispatch.
//!
//! A call pushes a result cell of the declared return type onto the
//! expression stack, opens an arena frame, binds each argument into a
//! parameter cell of the declared type, then either trampolines into a
//! host intrinsic or runs the body through the statement parser. Macros
//! differ in that the body is a single expression and arguments are bound
//! by value with the argument's own type.

use tracing::debug;

use subset_c_interp_lexer::Token;

use crate::error::{CResult, ErrorKind};
use crate::expression::Node;
use crate::interp::{FuncId, FunctionDef, Interp, ParsePos, ParseState, RunMode, ScopeId};
use crate::intern::StrId;
use crate::types::{self, BaseType, TypeRegistry};
use crate::value::Value;

impl Interp {
    /// Dispatch `name(...)`. The identifier has been consumed; the `(` has
    /// not. With `run_it` false the arguments are parsed in skip mode and a
    /// dummy result is pushed.
    pub(crate) fn call_dispatch(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        name: StrId,
        run_it: bool,
    ) -> CResult<()> {
        self.expect_tok(ps, Token::LParen, "'('")?;
        let old_mode = ps.mode;

        let fd = if run_it {
            let (val, _) = self.var_get(ps, name)?;
            match self.types.base(val.typ) {
                BaseType::Macro => {
                    let fid = FuncId(self.read_ptr(ps, val.addr)? as u32);
                    return self.macro_call(ps, stack, name, fid);
                }
                BaseType::Function => {
                    let fid = FuncId(self.read_ptr(ps, val.addr)? as u32);
                    Some(self.functions[fid.0 as usize].clone())
                }
                _ => {
                    let t = self.type_name(val.typ);
                    return Err(self.err(ps, ErrorKind::Type, format!("{t} is not a function - can't call")));
                }
            }
        } else {
            self.push_dummy(ps, stack)?;
            ps.mode = RunMode::Skip;
            None
        };

        let mut ret_val = Value::new(types::VOID, 0);
        if let Some(fd) = &fd {
            let ret_slot = self.push_blank(ps, stack, fd.ret)?;
            ret_val = ret_slot.value;
            self.arena.push_frame();
        }

        let mut argc = 0usize;
        let mut params: Vec<Value> = Vec::new();
        loop {
            if let Some(fd) = &fd {
                if argc < fd.params.len() {
                    let ptyp = fd.params[argc].1;
                    let size = self.types.size_of(ptyp);
                    let addr = self
                        .arena
                        .alloc_stack(size)
                        .ok_or_else(|| self.err(ps, ErrorKind::Memory, "out of memory"))?;
                    params.push(Value::lvalue(ptyp, addr, None));
                }
            }
            match self.eval_expression(ps)? {
                Some(arg) => {
                    if let Some(fd) = &fd {
                        if argc < fd.params.len() {
                            let declared = params[argc];
                            let declared_is_array = self.types.base(declared.typ) == BaseType::Array;
                            let arg_is_array = self.types.base(arg.value.typ) == BaseType::Array;
                            if declared_is_array && arg_is_array {
                                // array arguments keep the caller's storage
                                params[argc] =
                                    Value::lvalue(arg.value.typ, arg.value.addr, arg.value.lvalue_from);
                            } else {
                                let mut dest = declared;
                                self.assign(ps, &mut dest, &arg.value, true, false)?;
                                params[argc] = dest;
                            }
                            self.free_slot(ps, &arg)?;
                        } else if fd.varargs {
                            // copy the extra argument into a stable cell
                            let size = self.types.size_of(arg.value.typ);
                            let bytes = self
                                .arena
                                .read(arg.value.addr, size)
                                .map(<[u8]>::to_vec)
                                .unwrap_or_default();
                            let typ = arg.value.typ;
                            self.free_slot(ps, &arg)?;
                            let addr = self
                                .arena
                                .alloc_stack(size)
                                .ok_or_else(|| self.err(ps, ErrorKind::Memory, "out of memory"))?;
                            self.arena.write(addr, &bytes);
                            params.push(Value::new(typ, addr));
                        } else {
                            let fname = self.interner.resolve(name).to_owned();
                            return Err(self.err(ps, ErrorKind::Runtime, format!("too many arguments to {fname}()")));
                        }
                    } else {
                        self.free_slot(ps, &arg)?;
                    }
                    argc += 1;
                    let t = self.next_tok(ps);
                    match t.tok {
                        Token::Comma => continue,
                        Token::RParen => break,
                        _ => return Err(self.err(ps, ErrorKind::Syntax, "comma expected")),
                    }
                }
                None => {
                    let t = self.next_tok(ps);
                    if t.tok != Token::RParen {
                        return Err(self.err(ps, ErrorKind::Syntax, "bad argument"));
                    }
                    break;
                }
            }
        }

        if let Some(fd) = fd {
            if argc < fd.params.len() {
                let fname = self.interner.resolve(name).to_owned();
                return Err(self.err(ps, ErrorKind::Runtime, format!("not enough arguments to '{fname}'")));
            }
            debug!(func = self.interner.resolve(name), argc, "call");
            if let Some(intrinsic) = fd.intrinsic {
                intrinsic(self, ps, &ret_val, &params)?;
            } else {
                self.run_function_body(ps, &fd, name, ret_val, &params, argc)?;
            }
            if !self.arena.pop_frame() {
                return Err(self.err(ps, ErrorKind::Memory, "stack underrun"));
            }
        }
        ps.mode = old_mode;
        Ok(())
    }

    fn run_function_body(
        &mut self,
        ps: &ParseState,
        fd: &FunctionDef,
        name: StrId,
        ret_val: Value,
        params: &[Value],
        argc: usize,
    ) -> CResult<()> {
        let Some(body) = fd.body else {
            let fname = self.interner.resolve(name).to_owned();
            return Err(self.err(ps, ErrorKind::Link, format!("'{fname}' is undefined")));
        };
        self.frame_push(name, ret_val, argc);
        // parameters are bound without a scope so block exits never
        // deactivate them
        let mut bind_ps = *ps;
        bind_ps.scope = None;
        for (i, (pname, _)) in fd.params.iter().enumerate() {
            self.var_define_at(&bind_ps, *pname, params[i].typ, params[i].addr, true)?;
        }

        let mut fps = self.body_parse_state(body, RunMode::Run, None);
        self.parse_statement(&mut fps)?;
        while fps.mode == RunMode::Goto {
            // unresolved forward search: rescan from the top of the body,
            // which also serves backward jumps
            let label = fps.search_label.expect("goto mode always has a label");
            if !self.scan_for_label(body, label) {
                let l = self.interner.resolve(label).to_owned();
                return Err(self.err(&fps, ErrorKind::Syntax, format!("couldn't find goto label '{l}'")));
            }
            fps = self.body_parse_state(body, RunMode::Goto, Some(label));
            self.parse_statement(&mut fps)?;
        }
        if fps.mode == RunMode::Run && fd.ret != types::VOID {
            let t = self.type_name(fd.ret);
            return Err(self.err(&fps, ErrorKind::Runtime, format!("no value returned from a function returning {t}")));
        }
        self.frames.pop();
        Ok(())
    }

    fn body_parse_state(&self, body: ParsePos, mode: RunMode, label: Option<StrId>) -> ParseState {
        ParseState {
            stream: body.stream,
            pos: body.pos,
            mode,
            scope: Some(ScopeId(0)),
            search_label: label,
            switch_value: 0,
        }
    }

    /// Is `label:` present anywhere in this function body?
    fn scan_for_label(&self, body: ParsePos, label: StrId) -> bool {
        let tokens = &self.streams[body.stream].tokens;
        let mut depth = 0i32;
        let mut i = body.pos;
        while i < tokens.len() {
            match tokens[i].tok {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Token::Ident => {
                    if let crate::interp::TokValue::Ident(l) = tokens[i].value {
                        if l == label
                            && depth >= 1
                            && tokens.get(i + 1).map(|t| t.tok) == Some(Token::Colon)
                        {
                            return true;
                        }
                    }
                }
                Token::Eof => break,
                _ => {}
            }
            i += 1;
        }
        false
    }

    /// A parameterized macro call: arguments are bound as evaluated values
    /// and the body is one expression.
    fn macro_call(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        name: StrId,
        fid: FuncId,
    ) -> CResult<()> {
        let fd = self.functions[fid.0 as usize].clone();
        // placeholder with the widest integer type; retyped below if the
        // body turns out floating
        let ret_slot = self.push_blank(ps, stack, types::LONGLONG)?;
        let mut ret_val = ret_slot.value;
        self.arena.push_frame();

        let mut args: Vec<Value> = Vec::new();
        loop {
            match self.eval_expression(ps)? {
                Some(arg) => {
                    // keep the slot: it lives inside the arena frame
                    args.push(arg.value);
                    let t = self.next_tok(ps);
                    match t.tok {
                        Token::Comma => continue,
                        Token::RParen => break,
                        _ => return Err(self.err(ps, ErrorKind::Syntax, "comma expected")),
                    }
                }
                None => {
                    let t = self.next_tok(ps);
                    if t.tok != Token::RParen {
                        return Err(self.err(ps, ErrorKind::Syntax, "bad argument"));
                    }
                    break;
                }
            }
        }
        let mname = self.interner.resolve(name).to_owned();
        if args.len() < fd.params.len() {
            return Err(self.err(ps, ErrorKind::Runtime, format!("not enough arguments to '{mname}'")));
        }
        if args.len() > fd.params.len() {
            return Err(self.err(ps, ErrorKind::Runtime, format!("too many arguments to {mname}()")));
        }
        let Some(body) = fd.body else {
            return Err(self.err(ps, ErrorKind::Link, format!("'{mname}' is undefined")));
        };

        self.frame_push(name, ret_val, args.len());
        let mut bind_ps = *ps;
        bind_ps.scope = None;
        for (i, (pname, _)) in fd.params.iter().enumerate() {
            let arg = args[i];
            if self.types.base(arg.typ) == BaseType::Array {
                self.var_define_at(&bind_ps, *pname, arg.typ, arg.addr, true)?;
            } else {
                let size = self.types.size_of(arg.typ);
                let bytes = self
                    .arena
                    .read(arg.addr, size)
                    .map(<[u8]>::to_vec)
                    .unwrap_or_default();
                let addr = self
                    .arena
                    .alloc_stack(size)
                    .ok_or_else(|| self.err(ps, ErrorKind::Memory, "out of memory"))?;
                self.arena.write(addr, &bytes);
                self.var_define_at(&bind_ps, *pname, arg.typ, addr, true)?;
            }
        }

        let mut mps = self.body_parse_state(body, RunMode::Run, None);
        let Some(result) = self.eval_expression(&mut mps)? else {
            return Err(self.err(&mps, ErrorKind::Syntax, "expression expected"));
        };
        if self.next_tok(&mut mps).tok != Token::EndOfMacro {
            return Err(self.err(&mps, ErrorKind::Syntax, "expression expected"));
        }
        // the declared return type follows the body's result
        if TypeRegistry::is_fp(self.types.base(result.value.typ)) {
            ret_val.typ = types::DOUBLE;
            if let Some(Node::Val(slot)) = stack.last_mut() {
                slot.value.typ = types::DOUBLE;
            }
        }
        let mut dest = ret_val;
        self.assign(ps, &mut dest, &result.value, true, false)?;

        self.frames.pop();
        if !self.arena.pop_frame() {
            return Err(self.err(ps, ErrorKind::Memory, "stack underrun"));
        }
        Ok(())
    }

    /// A simple `#define` used as a bare identifier: evaluate its body as a
    /// sub-expression and push the result.
    pub(crate) fn inline_macro(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        name: StrId,
        val: Value,
    ) -> CResult<()> {
        let fid = FuncId(self.read_ptr(ps, val.addr)? as u32);
        let fd = &self.functions[fid.0 as usize];
        let mname = self.interner.resolve(name).to_owned();
        if !fd.params.is_empty() {
            return Err(self.err(ps, ErrorKind::Syntax, format!("macro arguments missing for '{mname}'")));
        }
        let Some(body) = fd.body else {
            return Err(self.err(ps, ErrorKind::Link, format!("'{mname}' is undefined")));
        };
        let mut mps = self.body_parse_state(body, ps.mode, None);
        mps.scope = ps.scope;
        let Some(result) = self.eval_expression(&mut mps)? else {
            return Err(self.err(&mps, ErrorKind::Syntax, "expression expected"));
        };
        if self.next_tok(&mut mps).tok != Token::EndOfMacro {
            return Err(self.err(&mps, ErrorKind::Syntax, "expression expected"));
        }
        // the result cell sits on top of our own arena stack, so it chains
        // into this expression's LIFO order
        stack.push(Node::Val(result));
        Ok(())
    }
}
