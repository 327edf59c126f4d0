//! Statement parser.
//!
//! Statements are executed as they are parsed, under a run mode: `Run`
//! executes, `Skip` parses without effect (untaken branches, function
//! bodies at definition time), and the unwind modes (`Return`, `Break`,
//! `Continue`, `Goto`, `CaseSearch`) carry control flow back out through
//! the enclosing constructs while the parser keeps consuming tokens.

use tracing::debug;

use subset_c_interp_lexer::Token;

use crate::error::{CResult, ErrorKind};
use crate::interp::{
    is_base_type_token, is_storage_class_token, FunctionDef, Interp, ParsePos, ParseState,
    RunMode, STok, TokValue, TokenStream,
};
use crate::intern::StrId;
use crate::types::{self, BaseType, TypeId};
use crate::value::Value;

impl Interp {
    /// Run every top-level statement of a pre-lexed stream.
    pub fn run_stream(&mut self, stream: usize) -> CResult<()> {
        let mut ps = ParseState::new(stream);
        while self.peek_tok(&ps).tok != Token::Eof {
            self.parse_statement(&mut ps)?;
            if ps.mode != RunMode::Run {
                return Err(self.err(&ps, ErrorKind::Syntax, "statement not allowed at top level"));
            }
        }
        Ok(())
    }

    /// Parse (and in run mode execute) one statement.
    pub fn parse_statement(&mut self, ps: &mut ParseState) -> CResult<()> {
        let st = self.peek_tok(ps);
        match st.tok {
            Token::Eof => Ok(()),
            Token::Semicolon => {
                self.next_tok(ps);
                Ok(())
            }
            Token::LBrace => self.parse_block(ps),
            Token::KwIf => self.parse_if(ps),
            Token::KwWhile => self.parse_while(ps),
            Token::KwDo => self.parse_do_while(ps),
            Token::KwFor => self.parse_for(ps),
            Token::KwSwitch => self.parse_switch(ps),
            Token::KwCase => self.parse_case(ps),
            Token::KwDefault => {
                self.next_tok(ps);
                self.expect_tok(ps, Token::Colon, "':'")?;
                if ps.mode == RunMode::CaseSearch {
                    ps.mode = RunMode::Run;
                }
                Ok(())
            }
            Token::KwBreak => {
                self.next_tok(ps);
                self.expect_tok(ps, Token::Semicolon, "';'")?;
                if ps.mode == RunMode::Run {
                    ps.mode = RunMode::Break;
                }
                Ok(())
            }
            Token::KwContinue => {
                self.next_tok(ps);
                self.expect_tok(ps, Token::Semicolon, "';'")?;
                if ps.mode == RunMode::Run {
                    ps.mode = RunMode::Continue;
                }
                Ok(())
            }
            Token::KwReturn => self.parse_return(ps),
            Token::KwGoto => {
                self.next_tok(ps);
                let t = self.next_tok(ps);
                let TokValue::Ident(label) = t.value else {
                    return Err(self.err(ps, ErrorKind::Syntax, "identifier expected"));
                };
                self.expect_tok(ps, Token::Semicolon, "';'")?;
                if ps.mode == RunMode::Run {
                    ps.mode = RunMode::Goto;
                    ps.search_label = Some(label);
                }
                Ok(())
            }
            Token::HashDefine => self.parse_define_directive(ps),
            Token::HashInclude => {
                let st = self.next_tok(ps);
                if ps.mode == RunMode::Run {
                    if let TokValue::Str(target) = st.value {
                        let header = self.interner.resolve(target).to_owned();
                        self.register_header_by_name(ps, &header)?;
                    }
                }
                Ok(())
            }
            Token::Ident => {
                if self.peek2_tok(ps).tok == Token::Colon {
                    // a label
                    let t = self.next_tok(ps);
                    self.next_tok(ps);
                    if ps.mode == RunMode::Goto {
                        if let TokValue::Ident(name) = t.value {
                            if ps.search_label == Some(name) {
                                ps.mode = RunMode::Run;
                                ps.search_label = None;
                            }
                        }
                    }
                    // the label prefixes a statement
                    return self.parse_statement(ps);
                }
                if self.is_type_token(&st) {
                    return self.parse_declaration(ps);
                }
                self.parse_expression_statement(ps)
            }
            tok if is_base_type_token(tok) || is_storage_class_token(tok) => {
                self.parse_declaration(ps)
            }
            _ => self.parse_expression_statement(ps),
        }
    }

    fn parse_expression_statement(&mut self, ps: &mut ParseState) -> CResult<()> {
        let Some(slot) = self.eval_expression(ps)? else {
            return Err(self.err(ps, ErrorKind::Syntax, "statement expected"));
        };
        self.free_slot(ps, &slot)?;
        self.expect_tok(ps, Token::Semicolon, "';'")?;
        Ok(())
    }

    /// Parse a sub-statement, forcing skip mode when `condition` is false.
    fn parse_statement_maybe_run(&mut self, ps: &mut ParseState, condition: bool) -> CResult<()> {
        if ps.mode == RunMode::Run && !condition {
            ps.mode = RunMode::Skip;
            self.parse_statement(ps)?;
            ps.mode = RunMode::Run;
            Ok(())
        } else {
            self.parse_statement(ps)
        }
    }

    fn parse_block(&mut self, ps: &mut ParseState) -> CResult<()> {
        self.expect_tok(ps, Token::LBrace, "'{'")?;
        let prev_scope = self.scope_begin(ps);
        loop {
            let tok = self.peek_tok(ps).tok;
            if tok == Token::RBrace || tok == Token::Eof {
                break;
            }
            self.parse_statement(ps)?;
        }
        self.expect_tok(ps, Token::RBrace, "'}'")?;
        self.scope_end(ps, prev_scope);
        Ok(())
    }

    // ==================== Control flow ====================

    fn parse_if(&mut self, ps: &mut ParseState) -> CResult<()> {
        self.next_tok(ps);
        self.expect_tok(ps, Token::LParen, "'('")?;
        let cond = self.eval_int(ps)? != 0;
        self.expect_tok(ps, Token::RParen, "')'")?;
        self.parse_statement_maybe_run(ps, cond)?;
        if self.peek_tok(ps).tok == Token::KwElse {
            self.next_tok(ps);
            self.parse_statement_maybe_run(ps, !cond)?;
        }
        Ok(())
    }

    fn parse_while(&mut self, ps: &mut ParseState) -> CResult<()> {
        self.next_tok(ps);
        self.expect_tok(ps, Token::LParen, "'('")?;
        let cond_pos = ps.pos;
        loop {
            ps.pos = cond_pos;
            let was_searching = ps.mode == RunMode::Goto;
            let cond = self.eval_int(ps)? != 0;
            self.expect_tok(ps, Token::RParen, "')'")?;
            self.parse_statement_maybe_run(ps, cond)?;
            if ps.mode == RunMode::Continue {
                ps.mode = RunMode::Run;
            }
            if ps.mode == RunMode::Break {
                ps.mode = RunMode::Run;
                break;
            }
            if ps.mode != RunMode::Run {
                break;
            }
            if was_searching {
                // a goto target inside the body was reached; loop for real
                continue;
            }
            if !cond {
                break;
            }
        }
        Ok(())
    }

    fn parse_do_while(&mut self, ps: &mut ParseState) -> CResult<()> {
        self.next_tok(ps);
        let body_pos = ps.pos;
        loop {
            self.parse_statement(ps)?;
            if ps.mode == RunMode::Continue {
                ps.mode = RunMode::Run;
            }
            let breaked = ps.mode == RunMode::Break;
            if breaked {
                ps.mode = RunMode::Run;
            }
            self.expect_tok(ps, Token::KwWhile, "'while'")?;
            self.expect_tok(ps, Token::LParen, "'('")?;
            let cond = if breaked && ps.mode == RunMode::Run {
                ps.mode = RunMode::Skip;
                self.eval_int(ps)?;
                ps.mode = RunMode::Run;
                false
            } else {
                self.eval_int(ps)? != 0
            };
            self.expect_tok(ps, Token::RParen, "')'")?;
            self.expect_tok(ps, Token::Semicolon, "';'")?;
            if breaked || ps.mode != RunMode::Run {
                break;
            }
            if !cond {
                break;
            }
            ps.pos = body_pos;
        }
        Ok(())
    }

    fn parse_for(&mut self, ps: &mut ParseState) -> CResult<()> {
        self.next_tok(ps);
        self.expect_tok(ps, Token::LParen, "'('")?;
        self.parse_statement(ps)?; // init, consumes its ';'
        let cond_pos = ps.pos;
        let mut cond = self.parse_for_condition(ps)?;
        self.expect_tok(ps, Token::Semicolon, "';'")?;
        let inc_pos = ps.pos;
        self.skip_expression(ps)?;
        self.expect_tok(ps, Token::RParen, "')'")?;
        let body_pos = ps.pos;
        let mut was_searching = ps.mode == RunMode::Goto;
        self.parse_statement_maybe_run(ps, cond)?;
        let body_end = ps.pos;
        loop {
            if ps.mode == RunMode::Continue {
                ps.mode = RunMode::Run;
            }
            if ps.mode == RunMode::Break {
                ps.mode = RunMode::Run;
                break;
            }
            if ps.mode != RunMode::Run {
                break;
            }
            if !cond && !was_searching {
                break;
            }
            was_searching = false;
            // increment, then re-test the condition
            ps.pos = inc_pos;
            if let Some(slot) = self.eval_expression(ps)? {
                self.free_slot(ps, &slot)?;
            }
            ps.pos = cond_pos;
            cond = self.parse_for_condition(ps)?;
            if !cond {
                break;
            }
            ps.pos = body_pos;
            self.parse_statement_maybe_run(ps, true)?;
        }
        ps.pos = body_end;
        Ok(())
    }

    /// An empty for-condition is always true.
    fn parse_for_condition(&mut self, ps: &mut ParseState) -> CResult<bool> {
        if self.peek_tok(ps).tok == Token::Semicolon {
            Ok(true)
        } else {
            Ok(self.eval_int(ps)? != 0)
        }
    }

    /// Parse an expression without running it (the for-increment on the
    /// first pass).
    fn skip_expression(&mut self, ps: &mut ParseState) -> CResult<()> {
        let old = ps.mode;
        if old == RunMode::Run {
            ps.mode = RunMode::Skip;
        }
        if let Some(slot) = self.eval_expression(ps)? {
            self.free_slot(ps, &slot)?;
        }
        ps.mode = old;
        Ok(())
    }

    fn parse_switch(&mut self, ps: &mut ParseState) -> CResult<()> {
        self.next_tok(ps);
        self.expect_tok(ps, Token::LParen, "'('")?;
        let value = self.eval_int(ps)?;
        self.expect_tok(ps, Token::RParen, "')'")?;
        if self.peek_tok(ps).tok != Token::LBrace {
            return Err(self.err(ps, ErrorKind::Syntax, "'{' expected"));
        }
        let old_mode = ps.mode;
        let old_value = ps.switch_value;
        if ps.mode == RunMode::Run {
            ps.mode = RunMode::CaseSearch;
            ps.switch_value = value;
        }
        self.parse_block(ps)?;
        if old_mode == RunMode::Run
            && (ps.mode == RunMode::Break || ps.mode == RunMode::CaseSearch)
        {
            ps.mode = RunMode::Run;
        }
        ps.switch_value = old_value;
        Ok(())
    }

    fn parse_case(&mut self, ps: &mut ParseState) -> CResult<()> {
        self.next_tok(ps);
        let value = match ps.mode {
            RunMode::CaseSearch => {
                ps.mode = RunMode::Run;
                let v = self.eval_int(ps)?;
                ps.mode = RunMode::CaseSearch;
                v
            }
            RunMode::Run => {
                // fallthrough past another case label
                ps.mode = RunMode::Skip;
                self.eval_int(ps)?;
                ps.mode = RunMode::Run;
                0
            }
            _ => self.eval_int(ps)?,
        };
        self.expect_tok(ps, Token::Colon, "':'")?;
        if ps.mode == RunMode::CaseSearch && value == ps.switch_value {
            ps.mode = RunMode::Run;
        }
        Ok(())
    }

    fn parse_return(&mut self, ps: &mut ParseState) -> CResult<()> {
        self.next_tok(ps);
        if ps.mode == RunMode::Run {
            if self.frames.is_empty() {
                return Err(self.err(ps, ErrorKind::Syntax, "'return' is not allowed here"));
            }
            let ret_val = self.frames.last().map(|f| f.ret_val).unwrap_or(Value::new(types::VOID, 0));
            if self.peek_tok(ps).tok != Token::Semicolon {
                let Some(slot) = self.eval_expression(ps)? else {
                    return Err(self.err(ps, ErrorKind::Syntax, "expression expected"));
                };
                if self.types.base(ret_val.typ) != BaseType::Void {
                    let mut dest = ret_val;
                    self.assign(ps, &mut dest, &slot.value, true, false)?;
                }
                self.free_slot(ps, &slot)?;
            }
            self.expect_tok(ps, Token::Semicolon, "';'")?;
            ps.mode = RunMode::Return;
        } else {
            if self.peek_tok(ps).tok != Token::Semicolon {
                if let Some(slot) = self.eval_expression(ps)? {
                    self.free_slot(ps, &slot)?;
                }
            }
            self.expect_tok(ps, Token::Semicolon, "';'")?;
        }
        Ok(())
    }

    // ==================== Declarations ====================

    fn parse_declaration(&mut self, ps: &mut ParseState) -> CResult<()> {
        let spec = self.parse_type_front(ps)?;
        if spec.is_typedef {
            let (typ, name) = self.parse_declarator(ps, spec.typ)?;
            let Some(name) = name else {
                return Err(self.err(ps, ErrorKind::Syntax, "identifier expected"));
            };
            if ps.mode == RunMode::Run && self.var_lookup(name).is_none() {
                let (val, _) = self.var_define(ps, name, types::TYPE_META, false)?;
                self.write_ptr(ps, val.addr, typ.0 as u64)?;
            }
            self.expect_tok(ps, Token::Semicolon, "';'")?;
            return Ok(());
        }
        if self.peek_tok(ps).tok == Token::Semicolon {
            // a bare struct/union/enum definition
            self.next_tok(ps);
            return Ok(());
        }
        loop {
            let (typ, name) = self.parse_declarator(ps, spec.typ)?;
            let Some(name) = name else {
                return Err(self.err(ps, ErrorKind::Syntax, "identifier expected"));
            };
            if self.peek_tok(ps).tok == Token::LParen {
                return self.parse_function_definition(ps, typ, name);
            }
            self.parse_variable_declaration(ps, typ, name, spec.is_static)?;
            if self.peek_tok(ps).tok == Token::Comma {
                self.next_tok(ps);
            } else {
                break;
            }
        }
        self.expect_tok(ps, Token::Semicolon, "';'")?;
        Ok(())
    }

    fn parse_variable_declaration(
        &mut self,
        ps: &mut ParseState,
        typ: TypeId,
        name: StrId,
        is_static: bool,
    ) -> CResult<()> {
        if ps.mode != RunMode::Run {
            // consume an initializer without defining anything
            if self.peek_tok(ps).tok == Token::Assign {
                self.next_tok(ps);
                if self.peek_tok(ps).tok == Token::LBrace {
                    self.skip_brace_initializer(ps)?;
                } else {
                    self.skip_expression(ps)?;
                }
            }
            return Ok(());
        }
        let (val, vr, first_visit) = self.var_define_but_ignore_identical(ps, name, typ, is_static)?;
        if self.peek_tok(ps).tok != Token::Assign {
            return Ok(());
        }
        self.next_tok(ps);
        let do_assign = !is_static || first_visit;
        if self.peek_tok(ps).tok == Token::LBrace {
            let mut dest = Value::lvalue(val.typ, val.addr, Some(vr));
            return self.parse_brace_initializer(ps, &mut dest, do_assign);
        }
        let Some(slot) = self.eval_expression(ps)? else {
            return Err(self.err(ps, ErrorKind::Syntax, "expression expected"));
        };
        if do_assign {
            let mut dest = Value::lvalue(val.typ, val.addr, Some(vr));
            self.assign(ps, &mut dest, &slot.value, false, false)?;
        }
        self.free_slot(ps, &slot)?;
        Ok(())
    }

    /// `{ e0, e1, ... }` initializers for arrays (one nesting level per
    /// array dimension) and scalars.
    fn parse_brace_initializer(
        &mut self,
        ps: &mut ParseState,
        dest: &mut Value,
        do_assign: bool,
    ) -> CResult<()> {
        self.expect_tok(ps, Token::LBrace, "'{'")?;
        let desc = self.types.desc(dest.typ).clone();
        if desc.base != BaseType::Array {
            // scalar in braces: int x = {5};
            let Some(slot) = self.eval_expression(ps)? else {
                return Err(self.err(ps, ErrorKind::Syntax, "expression expected"));
            };
            if do_assign && ps.mode == RunMode::Run {
                self.assign(ps, dest, &slot.value, false, false)?;
            }
            self.free_slot(ps, &slot)?;
            self.expect_tok(ps, Token::RBrace, "'}'")?;
            return Ok(());
        }
        let elem = desc.from.unwrap_or(types::VOID);
        let mut array_size = desc.array_size;
        if array_size == 0 && ps.mode == RunMode::Run {
            // unsized array: size it from the initializer list
            let count = self.count_initializer_elements(ps)?;
            let sized = self.types.get_matching(elem, BaseType::Array, count, None);
            let size = self.types.size_of(sized);
            let addr = self
                .arena
                .alloc_heap(size)
                .ok_or_else(|| self.err(ps, ErrorKind::Memory, "out of memory"))?;
            dest.typ = sized;
            dest.addr = addr;
            if let Some(vr) = dest.lvalue_from {
                self.update_var_slot(vr, sized, addr);
            }
            array_size = count;
        }
        let elem_size = self.types.size_of(elem) as u64;
        let mut index: u32 = 0;
        loop {
            if self.peek_tok(ps).tok == Token::RBrace {
                break;
            }
            let elem_addr = dest.addr + u64::from(index) * elem_size;
            if self.peek_tok(ps).tok == Token::LBrace {
                // one nesting level per array dimension
                let mut elem_dest = Value::lvalue(elem, elem_addr, None);
                let assign_this = do_assign && index < array_size;
                self.parse_brace_initializer(ps, &mut elem_dest, assign_this)?;
            } else {
                let Some(slot) = self.eval_expression(ps)? else {
                    return Err(self.err(ps, ErrorKind::Syntax, "expression expected"));
                };
                if do_assign && ps.mode == RunMode::Run && index < array_size {
                    let mut elem_dest = Value::lvalue(elem, elem_addr, None);
                    self.assign(ps, &mut elem_dest, &slot.value, false, false)?;
                }
                self.free_slot(ps, &slot)?;
            }
            index += 1;
            if self.peek_tok(ps).tok == Token::Comma {
                self.next_tok(ps);
            } else {
                break;
            }
        }
        self.expect_tok(ps, Token::RBrace, "'}'")?;
        Ok(())
    }

    fn skip_brace_initializer(&mut self, ps: &mut ParseState) -> CResult<()> {
        self.expect_tok(ps, Token::LBrace, "'{'")?;
        self.skip_to_matching_rbrace(ps)
    }

    /// Count top-level elements of a brace list without consuming it.
    fn count_initializer_elements(&self, ps: &ParseState) -> CResult<u32> {
        let tokens = &self.streams[ps.stream].tokens;
        let mut depth = 1;
        let mut count: u32 = 0;
        let mut any = false;
        let mut i = ps.pos;
        while i < tokens.len() {
            match tokens[i].tok {
                Token::LBrace | Token::LParen | Token::LBracket => depth += 1,
                Token::RParen | Token::RBracket => depth -= 1,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(count + u32::from(any));
                    }
                }
                Token::Comma if depth == 1 => count += 1,
                Token::Eof => break,
                _ => any = true,
            }
            i += 1;
        }
        Err(self.err(ps, ErrorKind::Syntax, "'}' expected"))
    }

    // ==================== Functions ====================

    fn parse_function_definition(
        &mut self,
        ps: &mut ParseState,
        ret: TypeId,
        name: StrId,
    ) -> CResult<()> {
        self.expect_tok(ps, Token::LParen, "'('")?;
        let mut params: Vec<(StrId, TypeId)> = Vec::new();
        let mut varargs = false;
        if self.peek_tok(ps).tok != Token::RParen {
            loop {
                if self.peek_tok(ps).tok == Token::Ellipsis {
                    self.next_tok(ps);
                    varargs = true;
                    break;
                }
                let spec = self.parse_type_front(ps)?;
                let (ptyp, pname) = self.parse_declarator(ps, spec.typ)?;
                if ptyp == types::VOID && pname.is_none() && params.is_empty() {
                    break; // (void)
                }
                let pname = match pname {
                    Some(p) => p,
                    None => {
                        let generated = format!("@param{}", params.len());
                        self.interner.intern(&generated)
                    }
                };
                params.push((pname, ptyp));
                if self.peek_tok(ps).tok == Token::Comma {
                    self.next_tok(ps);
                } else {
                    break;
                }
            }
        }
        self.expect_tok(ps, Token::RParen, "')'")?;

        let body = if self.peek_tok(ps).tok == Token::LBrace {
            let body = ParsePos { stream: ps.stream, pos: ps.pos };
            // skip over the body; it runs when called
            let old = ps.mode;
            ps.mode = RunMode::Skip;
            self.parse_statement(ps)?;
            ps.mode = old;
            Some(body)
        } else {
            self.expect_tok(ps, Token::Semicolon, "';'")?;
            None
        };

        if ps.mode != RunMode::Run {
            return Ok(());
        }
        let fname = self.interner.resolve(name).to_owned();
        match self.var_lookup(name) {
            Some((val, _)) if self.types.base(val.typ) == BaseType::Function => {
                let fid = self.read_ptr(ps, val.addr)? as usize;
                if body.is_some() {
                    if self.functions[fid].body.is_some() {
                        return Err(self.err(ps, ErrorKind::Name, format!("'{fname}' is already defined")));
                    }
                    // a definition completes an earlier prototype
                    self.functions[fid].body = body;
                    self.functions[fid].ret = ret;
                    self.functions[fid].params = params;
                    self.functions[fid].varargs = varargs;
                }
                Ok(())
            }
            Some(_) => Err(self.err(ps, ErrorKind::Name, format!("'{fname}' is already defined"))),
            None => {
                debug!(func = fname.as_str(), "define function");
                let fid = self.functions.len() as u64;
                self.functions.push(FunctionDef {
                    name,
                    ret,
                    params,
                    varargs,
                    body,
                    intrinsic: None,
                    is_macro: false,
                });
                let (val, _) = self.var_define(ps, name, types::FUNCTION, false)?;
                self.write_ptr(ps, val.addr, fid)?;
                Ok(())
            }
        }
    }

    // ==================== Preprocessor directives ====================

    /// `#define NAME body` and `#define NAME(args) body`; the body is the
    /// rest of the line, captured as its own token stream.
    fn parse_define_directive(&mut self, ps: &mut ParseState) -> CResult<()> {
        let directive = self.next_tok(ps);
        let line = directive.span.start_line;
        let name_tok = self.next_tok(ps);
        let TokValue::Ident(name) = name_tok.value else {
            return Err(self.err(ps, ErrorKind::Syntax, "identifier expected"));
        };
        let mut params: Vec<(StrId, TypeId)> = Vec::new();
        // a parameter list only counts when the '(' hugs the macro name
        let paren = self.peek_tok(ps);
        if paren.tok == Token::LParen && paren.span.start == name_tok.span.end {
            self.next_tok(ps);
            if self.peek_tok(ps).tok != Token::RParen {
                loop {
                    let t = self.next_tok(ps);
                    let TokValue::Ident(pname) = t.value else {
                        return Err(self.err(ps, ErrorKind::Syntax, "identifier expected"));
                    };
                    params.push((pname, types::LONGLONG));
                    if self.peek_tok(ps).tok == Token::Comma {
                        self.next_tok(ps);
                    } else {
                        break;
                    }
                }
            }
            self.expect_tok(ps, Token::RParen, "')'")?;
        }
        // the body: every remaining token on the directive's line
        let mut body_tokens: Vec<STok> = Vec::new();
        loop {
            let t = self.peek_tok(ps);
            if t.tok == Token::Eof || t.span.start_line != line {
                break;
            }
            body_tokens.push(self.next_tok(ps));
        }
        if ps.mode != RunMode::Run {
            return Ok(());
        }
        if let Some((val, _)) = self.var_lookup(name) {
            if self.types.base(val.typ) == BaseType::Macro {
                // a re-executed #define keeps its first body
                return Ok(());
            }
        }
        let end_span = body_tokens.last().map(|t| t.span).unwrap_or(name_tok.span);
        body_tokens.push(STok { tok: Token::EndOfMacro, value: TokValue::None, span: end_span });
        let file = self.streams[ps.stream].file;
        self.streams.push(TokenStream { file, tokens: body_tokens });
        let body = ParsePos { stream: self.streams.len() - 1, pos: 0 };
        let fid = self.functions.len() as u64;
        self.functions.push(FunctionDef {
            name,
            ret: types::LONGLONG,
            params,
            varargs: false,
            body: Some(body),
            intrinsic: None,
            is_macro: true,
        });
        let (val, _) = self.var_define(ps, name, types::MACRO, false)?;
        self.write_ptr(ps, val.addr, fid)?;
        Ok(())
    }
}
