//! Type parser: declaration specifiers and declarators.
//!
//! Turns type syntax (`unsigned long`, `struct point *`, `int [6]`,
//! typedef names) into registry descriptors. Storage classes are consumed
//! here; `const`, `extern`, `register` and `auto` are accepted without
//! effect.

use subset_c_interp_lexer::Token;

use crate::error::{CResult, ErrorKind};
use crate::interp::{Interp, ParseState, RunMode, TokValue};
use crate::intern::StrId;
use crate::types::{self, BaseType, Member, TypeId};

/// The parsed specifier half of a declaration.
#[derive(Debug, Clone, Copy)]
pub struct TypeSpec {
    pub typ: TypeId,
    pub is_static: bool,
    pub is_typedef: bool,
}

impl Interp {
    /// Parse declaration specifiers: storage classes plus the base type.
    pub fn parse_type_front(&mut self, ps: &mut ParseState) -> CResult<TypeSpec> {
        let mut is_static = false;
        let mut is_typedef = false;
        loop {
            match self.peek_tok(ps).tok {
                Token::KwStatic => {
                    is_static = true;
                    self.next_tok(ps);
                }
                Token::KwTypedef => {
                    is_typedef = true;
                    self.next_tok(ps);
                }
                Token::KwExtern | Token::KwRegister | Token::KwAuto | Token::KwConst => {
                    self.next_tok(ps);
                }
                _ => break,
            }
        }
        let typ = self.parse_base_type(ps)?;
        Ok(TypeSpec { typ, is_static, is_typedef })
    }

    fn parse_base_type(&mut self, ps: &mut ParseState) -> CResult<TypeId> {
        let st = self.peek_tok(ps);
        match st.tok {
            Token::KwStruct | Token::KwUnion => self.parse_aggregate(ps),
            Token::KwEnum => self.parse_enum(ps),
            Token::Ident => {
                // typedef name
                if let TokValue::Ident(name) = st.value {
                    if let Some((val, _)) = self.var_lookup(name) {
                        if self.types.base(val.typ) == BaseType::TypeKind {
                            self.next_tok(ps);
                            let t = self.read_ptr(ps, val.addr)?;
                            return Ok(TypeId(t as u32));
                        }
                    }
                }
                Err(self.err(ps, ErrorKind::Syntax, "type expected"))
            }
            _ => self.parse_scalar_type(ps),
        }
    }

    /// `signed`/`unsigned`/`short`/`long` combinations plus the scalar
    /// keywords.
    fn parse_scalar_type(&mut self, ps: &mut ParseState) -> CResult<TypeId> {
        let mut unsigned = false;
        let mut longs = 0u8;
        let mut short = false;
        let mut word: Option<Token> = None;
        let mut any = false;
        loop {
            let tok = self.peek_tok(ps).tok;
            match tok {
                Token::KwSigned => {}
                Token::KwUnsigned => unsigned = true,
                Token::KwShort => short = true,
                Token::KwLong => longs += 1,
                Token::KwChar | Token::KwInt | Token::KwFloat | Token::KwDouble | Token::KwVoid => {
                    if word.is_some() {
                        return Err(self.err(ps, ErrorKind::Syntax, "bad type declaration"));
                    }
                    word = Some(tok);
                }
                _ => break,
            }
            any = true;
            self.next_tok(ps);
        }
        if !any {
            return Err(self.err(ps, ErrorKind::Syntax, "type expected"));
        }
        let typ = match word {
            Some(Token::KwVoid) => types::VOID,
            Some(Token::KwChar) => {
                if unsigned {
                    types::UCHAR
                } else {
                    types::CHAR
                }
            }
            Some(Token::KwFloat) => types::FLOAT,
            Some(Token::KwDouble) => types::DOUBLE,
            _ => {
                // plain int, possibly sized
                if short {
                    if unsigned {
                        types::USHORT
                    } else {
                        types::SHORT
                    }
                } else if longs >= 2 {
                    if unsigned {
                        types::ULONGLONG
                    } else {
                        types::LONGLONG
                    }
                } else if longs == 1 {
                    if unsigned {
                        types::ULONG
                    } else {
                        types::LONG
                    }
                } else if unsigned {
                    types::UINT
                } else {
                    types::INT
                }
            }
        };
        Ok(typ)
    }

    fn parse_aggregate(&mut self, ps: &mut ParseState) -> CResult<TypeId> {
        let kw = self.next_tok(ps);
        let base = if kw.tok == Token::KwStruct { BaseType::Struct } else { BaseType::Union };
        let tag = match self.peek_tok(ps).value {
            TokValue::Ident(name) if self.peek_tok(ps).tok == Token::Ident => {
                self.next_tok(ps);
                Some(name)
            }
            _ => None,
        };
        let tag = match tag {
            Some(t) => t,
            None => {
                // anonymous aggregate: a generated tag keyed to the site
                let generated = format!("@anon:{}:{}", ps.stream, ps.pos);
                self.interner.intern(&generated)
            }
        };
        let typ = self.types.get_matching(types::VOID, base, 0, Some(tag));
        if self.peek_tok(ps).tok != Token::LBrace {
            return Ok(typ);
        }
        self.next_tok(ps);
        if self.types.desc(typ).members.is_some() {
            // a re-executed definition (a function body runs many times):
            // the layout is already known, just consume the member list
            self.skip_to_matching_rbrace(ps)?;
            return Ok(typ);
        }
        let mut members = Vec::new();
        let mut offset: u32 = 0;
        let mut max_size: u32 = 0;
        let mut align: u32 = 1;
        while self.peek_tok(ps).tok != Token::RBrace {
            let spec = self.parse_type_front(ps)?;
            loop {
                let (mtyp, mname) = self.parse_declarator(ps, spec.typ)?;
                let Some(mname) = mname else {
                    return Err(self.err(ps, ErrorKind::Syntax, "member name expected"));
                };
                let msize = self.types.size_of(mtyp) as u32;
                let malign = self.types.align_of(mtyp) as u32;
                align = align.max(malign);
                let moffset = if base == BaseType::Struct {
                    let aligned = (offset + malign - 1) & !(malign - 1);
                    offset = aligned + msize;
                    aligned
                } else {
                    max_size = max_size.max(msize);
                    0
                };
                members.push(Member { name: mname, typ: mtyp, offset: moffset });
                if self.peek_tok(ps).tok == Token::Comma {
                    self.next_tok(ps);
                } else {
                    break;
                }
            }
            self.expect_tok(ps, Token::Semicolon, "';'")?;
        }
        self.next_tok(ps); // the closing brace
        let size = if base == BaseType::Struct {
            (offset + align - 1) & !(align - 1)
        } else {
            (max_size + align - 1) & !(align - 1)
        };
        self.types.set_members(typ, members, size, align);
        Ok(typ)
    }

    fn parse_enum(&mut self, ps: &mut ParseState) -> CResult<TypeId> {
        self.next_tok(ps);
        let tag = match self.peek_tok(ps).value {
            TokValue::Ident(name) if self.peek_tok(ps).tok == Token::Ident => {
                self.next_tok(ps);
                Some(name)
            }
            _ => None,
        };
        let typ = self.types.get_matching(types::VOID, BaseType::Enum, 0, tag);
        if self.peek_tok(ps).tok != Token::LBrace {
            return Ok(typ);
        }
        self.next_tok(ps);
        let mut next_value: i64 = 0;
        while self.peek_tok(ps).tok != Token::RBrace {
            let t = self.next_tok(ps);
            let TokValue::Ident(name) = t.value else {
                return Err(self.err(ps, ErrorKind::Syntax, "identifier expected"));
            };
            if self.peek_tok(ps).tok == Token::Assign {
                self.next_tok(ps);
                next_value = self.eval_int(ps)?;
            }
            // enumerators are plain int constants
            if ps.mode == RunMode::Run && self.var_lookup(name).is_none() {
                let (val, _) = self.var_define(ps, name, types::INT, false)?;
                self.write_int_as(ps, val.addr, BaseType::Int, next_value)?;
            }
            next_value += 1;
            if self.peek_tok(ps).tok == Token::Comma {
                self.next_tok(ps);
            }
        }
        self.next_tok(ps);
        Ok(typ)
    }

    /// The declarator half: pointer stars, an optional identifier, array
    /// suffixes.
    pub fn parse_declarator(
        &mut self,
        ps: &mut ParseState,
        base: TypeId,
    ) -> CResult<(TypeId, Option<StrId>)> {
        let mut typ = base;
        loop {
            match self.peek_tok(ps).tok {
                Token::Star => {
                    typ = self.types.get_matching(typ, BaseType::Pointer, 0, None);
                    self.next_tok(ps);
                }
                Token::KwConst => {
                    self.next_tok(ps);
                }
                _ => break,
            }
        }
        let ident = if self.peek_tok(ps).tok == Token::Ident {
            let t = self.next_tok(ps);
            match t.value {
                TokValue::Ident(name) => Some(name),
                _ => None,
            }
        } else {
            None
        };
        // array suffixes, innermost last; sizes are constant expressions and
        // must resolve even while the surrounding code is being skipped
        let mut sizes = Vec::new();
        while self.peek_tok(ps).tok == Token::LBracket {
            self.next_tok(ps);
            if self.peek_tok(ps).tok == Token::RBracket {
                sizes.push(0u32);
            } else {
                let old_mode = ps.mode;
                ps.mode = RunMode::Run;
                let n = self.eval_int(ps);
                ps.mode = old_mode;
                let n = n?;
                if n < 0 {
                    return Err(self.err(ps, ErrorKind::Type, "array size must not be negative"));
                }
                sizes.push(n as u32);
            }
            self.expect_tok(ps, Token::RBracket, "']'")?;
        }
        for &n in sizes.iter().rev() {
            typ = self.types.get_matching(typ, BaseType::Array, n, None);
        }
        Ok((typ, ident))
    }

    /// A type inside a cast: specifiers plus pointer stars, no identifier.
    pub fn parse_cast_type(&mut self, ps: &mut ParseState) -> CResult<TypeId> {
        let spec = self.parse_type_front(ps)?;
        let mut typ = spec.typ;
        loop {
            match self.peek_tok(ps).tok {
                Token::Star => {
                    typ = self.types.get_matching(typ, BaseType::Pointer, 0, None);
                    self.next_tok(ps);
                }
                Token::KwConst => {
                    self.next_tok(ps);
                }
                _ => break,
            }
        }
        Ok(typ)
    }

    /// A type in expression position (`sizeof(int *)`).
    pub fn parse_type_in_expr(&mut self, ps: &mut ParseState) -> CResult<(TypeId, Option<StrId>)> {
        let typ = self.parse_cast_type(ps)?;
        Ok((typ, None))
    }

    /// Consume tokens up to and including the brace that closes the one
    /// already entered.
    pub(crate) fn skip_to_matching_rbrace(&mut self, ps: &mut ParseState) -> CResult<()> {
        let mut depth = 1;
        loop {
            match self.next_tok(ps).tok {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::Eof => return Err(self.err(ps, ErrorKind::Syntax, "'}' expected")),
                _ => {}
            }
        }
    }
}
