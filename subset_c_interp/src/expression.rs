//! Expression evaluator: a stack-based machine that parses and executes
//! expressions in one pass, driven by operator precedence.
//!
//! The evaluator alternates between expecting a prefix (operand) and an
//! infix/postfix token. Operators are pushed with their precedence plus a
//! "bracket precedence" boost (multiples of 20) so nested groupings never
//! collide with operator levels; collapsing the stack executes operators
//! whose precedence reaches the target.
//!
//! Short-circuit `&&`/`||` and the untaken ternary arm are suppressed with
//! an ignore threshold: once set, every operator, identifier and call above
//! the recording stack position is parsed but evaluated as zero.

use subset_c_interp_lexer::Token;

use crate::error::{CResult, ErrorKind};
use crate::interp::{Interp, ParseState, RunMode, TokValue};
use crate::types::{self, BaseType, TypeId, TypeRegistry};
use crate::value::Value;

const BRACKET_PRECEDENCE: i32 = 20;
/// Sentinel for "not ignoring": above any stack position.
const NOT_IGNORING: usize = usize::MAX;

fn is_left_to_right(prec: i32) -> bool {
    // assignment and prefix levels evaluate right-to-left
    prec != 2 && prec != 14
}

/// Prefix/postfix/infix precedence of a token; zero means "not that kind
/// of operator".
#[derive(Debug, Clone, Copy)]
pub struct OpPrec {
    pub prefix: i32,
    pub postfix: i32,
    pub infix: i32,
}

/// The dense precedence table; the hot path hits this on every token.
pub fn op_entry(tok: Token) -> OpPrec {
    let (prefix, postfix, infix) = match tok {
        Token::Assign
        | Token::AddAssign
        | Token::SubAssign
        | Token::MulAssign
        | Token::DivAssign
        | Token::ModAssign
        | Token::ShlAssign
        | Token::ShrAssign
        | Token::AndAssign
        | Token::OrAssign
        | Token::XorAssign => (0, 0, 2),
        Token::Question | Token::Colon => (0, 0, 3),
        Token::LogicalOr => (0, 0, 4),
        Token::LogicalAnd => (0, 0, 5),
        Token::BitOr => (0, 0, 6),
        Token::BitXor => (0, 0, 7),
        Token::Ampersand => (14, 0, 8),
        Token::Equal | Token::NotEqual => (0, 0, 9),
        Token::LessThan | Token::GreaterThan | Token::LessEqual | Token::GreaterEqual => (0, 0, 10),
        Token::Shl | Token::Shr => (0, 0, 11),
        Token::Plus | Token::Minus => (14, 0, 12),
        Token::Star => (14, 0, 13),
        Token::Slash | Token::Percent => (0, 0, 13),
        Token::Increment | Token::Decrement => (14, 15, 0),
        Token::Not | Token::Tilde | Token::KwSizeof | Token::Cast => (14, 0, 0),
        Token::LBracket => (0, 0, 15),
        Token::RBracket => (0, 15, 0),
        Token::Dot | Token::Arrow => (0, 0, 15),
        Token::LParen => (15, 0, 0),
        Token::RParen => (0, 15, 0),
        _ => (0, 0, 0),
    };
    OpPrec { prefix, postfix, infix }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Order {
    Prefix,
    Infix,
    Postfix,
}

/// A value on the evaluation stack, plus how many arena-stack bytes it
/// owns (0 for views into existing storage).
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub value: Value,
    pub owned: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Node {
    Val(Slot),
    Op { order: Order, tok: Token, prec: i32 },
}

/// Should the operator at `op_idx` actually execute? Releases the ignore
/// threshold once execution drops back to or below the recording position.
fn run_allowed(mode: RunMode, op_idx: usize, ignore_from: &mut usize) -> bool {
    if mode != RunMode::Run {
        return false;
    }
    if op_idx < *ignore_from {
        *ignore_from = NOT_IGNORING;
        true
    } else {
        false
    }
}

impl Interp {
    // ==================== Stack slot helpers ====================

    /// Allocate a blank temporary of a type on the arena stack.
    pub fn alloc_temp(&mut self, ps: &ParseState, typ: TypeId) -> CResult<Slot> {
        let size = self.types.size_of(typ);
        let addr = self
            .arena
            .alloc_stack(size)
            .ok_or_else(|| self.err(ps, ErrorKind::Memory, "out of memory"))?;
        Ok(Slot { value: Value::new(typ, addr), owned: size as u32 })
    }

    /// Release a slot's owned bytes; views release nothing.
    pub fn free_slot(&mut self, ps: &ParseState, slot: &Slot) -> CResult<()> {
        if slot.owned > 0 && !self.arena.pop_stack(slot.value.addr, slot.owned as usize) {
            return Err(self.err(ps, ErrorKind::Memory, "stack underrun"));
        }
        Ok(())
    }

    /// Copy a value into a fresh temporary. The source bytes are captured
    /// before allocating so a just-freed source cannot be clobbered.
    fn copy_to_temp(&mut self, ps: &ParseState, v: &Value) -> CResult<Slot> {
        let size = self.types.size_of(v.typ);
        let bytes = if size > 0 {
            self.arena
                .read(v.addr, size)
                .ok_or_else(|| self.err(ps, ErrorKind::Runtime, "invalid memory access"))?
                .to_vec()
        } else {
            Vec::new()
        };
        let mut slot = self.alloc_temp(ps, v.typ)?;
        if size > 0 {
            self.arena.write(slot.value.addr, &bytes);
        }
        slot.value.is_lvalue = v.is_lvalue;
        slot.value.lvalue_from = v.lvalue_from;
        Ok(slot)
    }

    fn push_int_typed(&mut self, ps: &ParseState, stack: &mut Vec<Node>, v: i64, typ: TypeId) -> CResult<()> {
        let slot = self.alloc_temp(ps, typ)?;
        self.write_int_as(ps, slot.value.addr, self.types.base(typ), v)?;
        stack.push(Node::Val(slot));
        Ok(())
    }

    fn push_ll(&mut self, ps: &ParseState, stack: &mut Vec<Node>, v: i64) -> CResult<()> {
        self.push_int_typed(ps, stack, v, types::LONGLONG)
    }

    fn push_int(&mut self, ps: &ParseState, stack: &mut Vec<Node>, v: i64) -> CResult<()> {
        self.push_int_typed(ps, stack, v, types::INT)
    }

    fn push_fp(&mut self, ps: &ParseState, stack: &mut Vec<Node>, v: f64, double: bool) -> CResult<()> {
        let typ = if double { types::DOUBLE } else { types::FLOAT };
        let slot = self.alloc_temp(ps, typ)?;
        self.write_fp_as(ps, slot.value.addr, self.types.base(typ), v)?;
        stack.push(Node::Val(slot));
        Ok(())
    }

    pub(crate) fn push_blank(&mut self, ps: &ParseState, stack: &mut Vec<Node>, typ: TypeId) -> CResult<Slot> {
        let slot = self.alloc_temp(ps, typ)?;
        stack.push(Node::Val(slot));
        Ok(slot)
    }

    fn push_view(&mut self, stack: &mut Vec<Node>, value: Value) {
        stack.push(Node::Val(Slot { value, owned: 0 }));
    }

    pub(crate) fn push_dummy(&mut self, ps: &ParseState, stack: &mut Vec<Node>) -> CResult<()> {
        self.push_ll(ps, stack, 0)
    }

    /// Is this value truthy? Floats compare against 0.0, everything else
    /// through the integer coercion.
    fn truthy(&self, ps: &ParseState, v: &Value) -> CResult<bool> {
        if TypeRegistry::is_fp(self.types.base(v.typ)) {
            Ok(self.coerce_fp(ps, v)? != 0.0)
        } else {
            Ok(self.coerce_int(ps, v)? != 0)
        }
    }

    // ==================== Collapse ====================

    /// Execute operators from the top of the stack while their precedence
    /// reaches `prec`.
    fn collapse(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        prec: i32,
        ignore_from: &mut usize,
    ) -> CResult<()> {
        loop {
            if stack.len() < 2 {
                return Ok(());
            }
            let top_is_value = matches!(stack.last(), Some(Node::Val(_)));
            let op_idx = if top_is_value { stack.len() - 2 } else { stack.len() - 1 };
            let Node::Op { order, tok, prec: found } = stack[op_idx] else {
                return Ok(());
            };
            if found < prec {
                return Ok(());
            }
            match order {
                Order::Prefix => {
                    if !top_is_value {
                        return Ok(());
                    }
                    let Some(Node::Val(operand)) = stack.pop() else { unreachable!() };
                    stack.pop();
                    self.free_slot(ps, &operand)?;
                    if run_allowed(ps.mode, op_idx, ignore_from) {
                        self.exec_prefix(ps, stack, tok, operand)?;
                    } else {
                        self.push_dummy(ps, stack)?;
                    }
                }
                Order::Postfix => {
                    if top_is_value {
                        return Ok(());
                    }
                    stack.pop();
                    let Some(Node::Val(operand)) = stack.pop() else {
                        return Err(self.err(ps, ErrorKind::Syntax, "invalid expression"));
                    };
                    self.free_slot(ps, &operand)?;
                    if run_allowed(ps.mode, op_idx, ignore_from) {
                        self.exec_postfix(ps, stack, tok, operand)?;
                    } else {
                        self.push_dummy(ps, stack)?;
                    }
                }
                Order::Infix => {
                    if !top_is_value {
                        return Ok(());
                    }
                    let Some(Node::Val(top)) = stack.pop() else { unreachable!() };
                    stack.pop();
                    let Some(Node::Val(bottom)) = stack.pop() else {
                        return Err(self.err(ps, ErrorKind::Syntax, "invalid expression"));
                    };
                    self.free_slot(ps, &top)?;
                    self.free_slot(ps, &bottom)?;
                    if run_allowed(ps.mode, op_idx, ignore_from) {
                        self.exec_infix(ps, stack, tok, bottom, top)?;
                    } else {
                        self.push_dummy(ps, stack)?;
                    }
                }
            }
        }
    }

    // ==================== Prefix operators ====================

    fn exec_prefix(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        op: Token,
        operand: Slot,
    ) -> CResult<()> {
        let v = operand.value;
        let base = self.types.base(v.typ);
        match op {
            Token::Ampersand => {
                if !v.is_lvalue {
                    return Err(self.err(ps, ErrorKind::Type, "can't get the address of this"));
                }
                let ptr_t = self.types.get_matching(v.typ, BaseType::Pointer, 0, None);
                let slot = self.push_blank(ps, stack, ptr_t)?;
                self.write_ptr(ps, slot.value.addr, v.addr)
            }
            Token::Star => {
                let under_sizeof =
                    matches!(stack.last(), Some(Node::Op { tok: Token::KwSizeof, .. }));
                match base {
                    BaseType::Pointer | BaseType::Array => {
                        let pointee = self.types.desc(v.typ).from.unwrap_or(types::VOID);
                        if under_sizeof {
                            // only the pointee type is inspected
                            self.push_blank(ps, stack, pointee)?;
                            return Ok(());
                        }
                        let addr = if base == BaseType::Pointer {
                            self.read_ptr(ps, v.addr)?
                        } else {
                            v.addr
                        };
                        if addr == 0 {
                            return Err(self.err(ps, ErrorKind::Runtime, "NULL pointer dereference"));
                        }
                        if self.types.base(pointee) == BaseType::Struct
                            && self.types.desc(pointee).members.is_none()
                        {
                            let name = self.type_name(pointee);
                            return Err(self.err(ps, ErrorKind::Type, format!("type '{name}' isn't defined")));
                        }
                        self.push_view(stack, Value::lvalue(pointee, addr, v.lvalue_from));
                        Ok(())
                    }
                    _ => Err(self.err(ps, ErrorKind::Type, "can't dereference this non-pointer")),
                }
            }
            Token::KwSizeof => {
                let typ = if base == BaseType::TypeKind {
                    TypeId(self.read_ptr(ps, v.addr)? as u32)
                } else {
                    v.typ
                };
                let size = self.types.size_of(typ) as i64;
                self.push_ll(ps, stack, size)
            }
            _ => self.exec_prefix_arith(ps, stack, op, operand),
        }
    }

    fn exec_prefix_arith(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        op: Token,
        operand: Slot,
    ) -> CResult<()> {
        let v = operand.value;
        let base = self.types.base(v.typ);
        if TypeRegistry::is_fp(base) {
            let fp = self.coerce_fp(ps, &v)?;
            let double = base == BaseType::Double;
            let result = match op {
                Token::Plus => fp,
                Token::Minus => -fp,
                Token::Increment => self.assign_fp(ps, &v, fp + 1.0)?,
                Token::Decrement => self.assign_fp(ps, &v, fp - 1.0)?,
                Token::Not => {
                    if fp == 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                }
                _ => return Err(self.err(ps, ErrorKind::Type, "invalid operation")),
            };
            return self.push_fp(ps, stack, result, double);
        }
        if TypeRegistry::is_numeric(base) {
            let ti = self.coerce_int(ps, &v)?;
            let mut needs_conversion = false;
            let result = match op {
                Token::Plus => {
                    needs_conversion = true;
                    ti
                }
                Token::Minus => {
                    needs_conversion = true;
                    ti.wrapping_neg()
                }
                Token::Increment => {
                    needs_conversion = true;
                    self.assign_int(ps, &v, ti.wrapping_add(1), false)?
                }
                Token::Decrement => {
                    needs_conversion = true;
                    self.assign_int(ps, &v, ti.wrapping_sub(1), false)?
                }
                Token::Not => i64::from(ti == 0),
                Token::Tilde => !ti,
                _ => return Err(self.err(ps, ErrorKind::Type, "invalid operation")),
            };
            // integer promotion to at least int
            let result_base = if needs_conversion {
                if TypeRegistry::int_rank(base) < TypeRegistry::int_rank(BaseType::Int) {
                    BaseType::Int
                } else {
                    base
                }
            } else {
                BaseType::LongLong
            };
            return self.push_int_typed(ps, stack, result, self.int_type_of(result_base));
        }
        if base == BaseType::Pointer {
            let pointee = self.types.desc(v.typ).from.unwrap_or(types::VOID);
            let size = self.types.size_of(pointee) as i64;
            let p = self.read_ptr(ps, v.addr)?;
            match op {
                Token::Not => {
                    // no write-back: checking a pointer must not mutate it
                    return self.push_int(ps, stack, i64::from(p == 0));
                }
                Token::Increment | Token::Decrement => {
                    if p == 0 {
                        return Err(self.err(ps, ErrorKind::Runtime, "invalid use of a NULL pointer"));
                    }
                    if !v.is_lvalue {
                        return Err(self.err(ps, ErrorKind::Type, "can't assign to this"));
                    }
                    let delta = if op == Token::Increment { size } else { -size };
                    let new = (p as i64).wrapping_add(delta) as u64;
                    self.write_ptr(ps, v.addr, new)?;
                    let slot = self.push_blank(ps, stack, v.typ)?;
                    return self.write_ptr(ps, slot.value.addr, new);
                }
                _ => {}
            }
        }
        Err(self.err(ps, ErrorKind::Type, "invalid operation"))
    }

    /// Map an integer base back to its canonical TypeId.
    fn int_type_of(&self, base: BaseType) -> TypeId {
        match base {
            BaseType::Char => types::CHAR,
            BaseType::UnsignedChar => types::UCHAR,
            BaseType::Short => types::SHORT,
            BaseType::UnsignedShort => types::USHORT,
            BaseType::Int | BaseType::Enum => types::INT,
            BaseType::UnsignedInt => types::UINT,
            BaseType::Long => types::LONG,
            BaseType::UnsignedLong => types::ULONG,
            BaseType::UnsignedLongLong => types::ULONGLONG,
            _ => types::LONGLONG,
        }
    }

    // ==================== Postfix operators ====================

    fn exec_postfix(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        op: Token,
        operand: Slot,
    ) -> CResult<()> {
        let v = operand.value;
        let base = self.types.base(v.typ);
        if TypeRegistry::is_fp(base) {
            let fp = self.coerce_fp(ps, &v)?;
            let double = base == BaseType::Double;
            let result = match op {
                Token::Increment => {
                    self.assign_fp(ps, &v, fp + 1.0)?;
                    fp
                }
                Token::Decrement => {
                    self.assign_fp(ps, &v, fp - 1.0)?;
                    fp
                }
                _ => return Err(self.err(ps, ErrorKind::Type, "invalid operation")),
            };
            return self.push_fp(ps, stack, result, double);
        }
        if TypeRegistry::is_numeric(base) {
            let ti = self.coerce_int(ps, &v)?;
            let result = match op {
                Token::Increment => self.assign_int(ps, &v, ti.wrapping_add(1), true)?,
                Token::Decrement => self.assign_int(ps, &v, ti.wrapping_sub(1), true)?,
                _ => return Err(self.err(ps, ErrorKind::Type, "invalid operation")),
            };
            let result_base = if TypeRegistry::int_rank(base) < TypeRegistry::int_rank(BaseType::Int) {
                BaseType::Int
            } else {
                base
            };
            return self.push_int_typed(ps, stack, result, self.int_type_of(result_base));
        }
        if base == BaseType::Pointer {
            let pointee = self.types.desc(v.typ).from.unwrap_or(types::VOID);
            let size = self.types.size_of(pointee) as i64;
            let p = self.read_ptr(ps, v.addr)?;
            if p == 0 {
                return Err(self.err(ps, ErrorKind::Runtime, "invalid use of a NULL pointer"));
            }
            if !v.is_lvalue {
                return Err(self.err(ps, ErrorKind::Type, "can't assign to this"));
            }
            let delta = match op {
                Token::Increment => size,
                Token::Decrement => -size,
                _ => return Err(self.err(ps, ErrorKind::Type, "invalid operation")),
            };
            let new = (p as i64).wrapping_add(delta) as u64;
            self.write_ptr(ps, v.addr, new)?;
            let slot = self.push_blank(ps, stack, v.typ)?;
            // postfix returns the pre-modification pointer
            return self.write_ptr(ps, slot.value.addr, p);
        }
        Err(self.err(ps, ErrorKind::Type, "invalid operation"))
    }

    // ==================== Infix operators ====================

    fn exec_infix(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        op: Token,
        bottom: Slot,
        top: Slot,
    ) -> CResult<()> {
        let bv = bottom.value;
        let tv = top.value;
        let b_base = self.types.base(bv.typ);
        let t_base = self.types.base(tv.typ);

        if op == Token::LBracket {
            return self.exec_index(ps, stack, bottom, top);
        }
        if op == Token::Question {
            return self.exec_question(ps, stack, bottom, top);
        }
        if op == Token::Colon {
            return self.exec_colon(ps, stack, bottom, top);
        }
        if op == Token::Cast {
            return self.exec_cast(ps, stack, bottom, top);
        }
        if op == Token::LogicalAnd || op == Token::LogicalOr {
            if self.is_numeric_or_pointer(&bv, true) && self.is_numeric_or_pointer(&tv, true) {
                let bt = self.truthy(ps, &bv)?;
                let tt = self.truthy(ps, &tv)?;
                let r = if op == Token::LogicalAnd { bt && tt } else { bt || tt };
                return self.push_int(ps, stack, i64::from(r));
            }
            return Err(self.err(ps, ErrorKind::Type, "invalid operation"));
        }

        let b_fp = TypeRegistry::is_fp(b_base);
        let t_fp = TypeRegistry::is_fp(t_base);
        let b_num = TypeRegistry::is_numeric(b_base);
        let t_num = TypeRegistry::is_numeric(t_base);

        if (b_fp || t_fp) && b_num && t_num {
            return self.exec_infix_fp(ps, stack, op, bottom, top);
        }
        if b_num && t_num {
            return self.exec_infix_int(ps, stack, op, bottom, top);
        }
        if (b_base == BaseType::Pointer || b_base == BaseType::Array) && t_num {
            return self.exec_infix_pointer_int(ps, stack, op, bottom, top);
        }
        if b_base == BaseType::Pointer && t_base == BaseType::Pointer && op != Token::Assign {
            let bp = self.read_ptr(ps, bv.addr)?;
            let tp = self.read_ptr(ps, tv.addr)?;
            return match op {
                Token::Equal => self.push_int(ps, stack, i64::from(bp == tp)),
                Token::NotEqual => self.push_int(ps, stack, i64::from(bp != tp)),
                Token::Minus => {
                    // difference in elements, so (p + n) - p == n
                    let pointee = self.types.desc(bv.typ).from.unwrap_or(types::VOID);
                    let size = self.types.size_of(pointee).max(1) as i64;
                    let diff = (bp as i64).wrapping_sub(tp as i64) / size;
                    self.push_ll(ps, stack, diff)
                }
                _ => Err(self.err(ps, ErrorKind::Type, "invalid operation")),
            };
        }
        if op == Token::Assign {
            // assign a non-numeric type
            let mut dest = bv;
            self.assign(ps, &mut dest, &tv, false, false)?;
            self.push_view(stack, dest);
            return Ok(());
        }
        Err(self.err(ps, ErrorKind::Type, "invalid operation"))
    }

    fn exec_index(&mut self, ps: &mut ParseState, stack: &mut Vec<Node>, bottom: Slot, top: Slot) -> CResult<()> {
        let bv = bottom.value;
        let tv = top.value;
        if !self.is_numeric(&tv) {
            return Err(self.err(ps, ErrorKind::Type, "array index must be an integer"));
        }
        let idx = self.coerce_int(ps, &tv)?;
        let desc = self.types.desc(bv.typ).clone();
        let (elem, base_addr) = match desc.base {
            BaseType::Array => (desc.from.unwrap_or(types::VOID), bv.addr),
            BaseType::Pointer => {
                let p = self.read_ptr(ps, bv.addr)?;
                if p == 0 {
                    return Err(self.err(ps, ErrorKind::Runtime, "NULL pointer dereference"));
                }
                (desc.from.unwrap_or(types::VOID), p)
            }
            _ => {
                let name = self.type_name(bv.typ);
                return Err(self.err(ps, ErrorKind::Type, format!("this {name} is not an array")));
            }
        };
        let size = self.types.size_of(elem) as i64;
        let addr = (base_addr as i64).wrapping_add(idx.wrapping_mul(size)) as u64;
        let mut view = Value::lvalue(elem, addr, bv.lvalue_from);
        view.is_lvalue = bv.is_lvalue;
        self.push_view(stack, view);
        Ok(())
    }

    /// First half of `cond ? a : b`: keep the taken value, or a void
    /// sentinel when the condition is false.
    fn exec_question(&mut self, ps: &mut ParseState, stack: &mut Vec<Node>, cond: Slot, then_val: Slot) -> CResult<()> {
        if !self.is_numeric_or_pointer(&cond.value, true) {
            return Err(self.err(ps, ErrorKind::Type, "first argument to '?' should be a number"));
        }
        if self.truthy(ps, &cond.value)? {
            let slot = self.copy_to_temp(ps, &then_val.value)?;
            stack.push(Node::Val(slot));
        } else {
            self.push_blank(ps, stack, types::VOID)?;
        }
        Ok(())
    }

    /// Second half of `cond ? a : b`: select the non-void side.
    fn exec_colon(&mut self, ps: &mut ParseState, stack: &mut Vec<Node>, prior: Slot, else_val: Slot) -> CResult<()> {
        let pick = if self.types.base(prior.value.typ) == BaseType::Void {
            else_val.value
        } else {
            prior.value
        };
        let slot = self.copy_to_temp(ps, &pick)?;
        stack.push(Node::Val(slot));
        Ok(())
    }

    fn exec_cast(&mut self, ps: &mut ParseState, stack: &mut Vec<Node>, bottom: Slot, top: Slot) -> CResult<()> {
        let cast_t = TypeId(self.read_ptr(ps, bottom.value.addr)? as u32);
        let cast_base = self.types.base(cast_t);
        let sv = top.value;
        match cast_base {
            BaseType::Float | BaseType::Double => {
                let v = self.coerce_fp(ps, &sv)?;
                let slot = self.push_blank(ps, stack, cast_t)?;
                self.write_fp_as(ps, slot.value.addr, cast_base, v)
            }
            BaseType::Pointer => {
                let s_base = self.types.base(sv.typ);
                let raw = match s_base {
                    BaseType::Pointer => self.read_ptr(ps, sv.addr)?,
                    BaseType::Array => sv.addr,
                    _ if self.is_numeric(&sv) => self.coerce_uint(ps, &sv)?,
                    _ => {
                        return Err(self.err(
                            ps,
                            ErrorKind::Type,
                            format!("can't cast {} to a pointer", self.type_name(sv.typ)),
                        ))
                    }
                };
                let slot = self.push_blank(ps, stack, cast_t)?;
                self.write_ptr(ps, slot.value.addr, raw)
            }
            _ if TypeRegistry::int_rank(cast_base) > 0 => {
                let v = self.coerce_int(ps, &sv)?;
                let slot = self.push_blank(ps, stack, cast_t)?;
                self.write_int_as(ps, slot.value.addr, cast_base, v)
            }
            BaseType::Void => {
                self.push_blank(ps, stack, types::VOID)?;
                Ok(())
            }
            _ => {
                let name = self.type_name(cast_t);
                Err(self.err(ps, ErrorKind::Type, format!("can't cast to {name}")))
            }
        }
    }

    fn exec_infix_fp(&mut self, ps: &mut ParseState, stack: &mut Vec<Node>, op: Token, bottom: Slot, top: Slot) -> CResult<()> {
        let bv = bottom.value;
        let tv = top.value;
        let b_base = self.types.base(bv.typ);
        let t_base = self.types.base(tv.typ);
        let top_fp = self.coerce_fp(ps, &tv)?;
        let bottom_fp = self.coerce_fp(ps, &bv)?;
        let dest_is_fp = TypeRegistry::is_fp(b_base);

        // compound assignment: narrow through an integer destination
        let mut assign_either = |interp: &mut Self, v: f64| -> CResult<(f64, Option<i64>)> {
            if dest_is_fp {
                Ok((interp.assign_fp(ps, &bv, v)?, None))
            } else {
                Ok((0.0, Some(interp.assign_int(ps, &bv, v as i64, false)?)))
            }
        };

        let mut int_result: Option<i64> = None;
        let mut fp_result = 0.0;
        match op {
            Token::Assign => {
                let (f, i) = assign_either(self, top_fp)?;
                fp_result = f;
                int_result = i;
            }
            Token::AddAssign => {
                let (f, i) = assign_either(self, bottom_fp + top_fp)?;
                fp_result = f;
                int_result = i;
            }
            Token::SubAssign => {
                let (f, i) = assign_either(self, bottom_fp - top_fp)?;
                fp_result = f;
                int_result = i;
            }
            Token::MulAssign => {
                let (f, i) = assign_either(self, bottom_fp * top_fp)?;
                fp_result = f;
                int_result = i;
            }
            Token::DivAssign => {
                let (f, i) = assign_either(self, bottom_fp / top_fp)?;
                fp_result = f;
                int_result = i;
            }
            Token::Equal => int_result = Some(i64::from(bottom_fp == top_fp)),
            Token::NotEqual => int_result = Some(i64::from(bottom_fp != top_fp)),
            Token::LessThan => int_result = Some(i64::from(bottom_fp < top_fp)),
            Token::GreaterThan => int_result = Some(i64::from(bottom_fp > top_fp)),
            Token::LessEqual => int_result = Some(i64::from(bottom_fp <= top_fp)),
            Token::GreaterEqual => int_result = Some(i64::from(bottom_fp >= top_fp)),
            Token::Plus => fp_result = bottom_fp + top_fp,
            Token::Minus => fp_result = bottom_fp - top_fp,
            Token::Star => fp_result = bottom_fp * top_fp,
            Token::Slash => fp_result = bottom_fp / top_fp,
            _ => return Err(self.err(ps, ErrorKind::Type, "invalid operation")),
        }

        if let Some(i) = int_result {
            if matches!(op, Token::Equal | Token::NotEqual | Token::LessThan | Token::GreaterThan | Token::LessEqual | Token::GreaterEqual) {
                self.push_int(ps, stack, i)
            } else {
                self.push_ll(ps, stack, i)
            }
        } else {
            let double = b_base == BaseType::Double || t_base == BaseType::Double;
            self.push_fp(ps, stack, fp_result, double)
        }
    }

    fn exec_infix_int(&mut self, ps: &mut ParseState, stack: &mut Vec<Node>, op: Token, bottom: Slot, top: Slot) -> CResult<()> {
        let bv = bottom.value;
        let tv = top.value;
        let mut b_base = self.types.base(bv.typ);
        let mut t_base = self.types.base(tv.typ);
        let ti = self.coerce_int(ps, &tv)?;
        let bi = self.coerce_int(ps, &bv)?;
        let sh = (ti as u32) & 63;

        let div_check = |interp: &Self| -> CResult<()> {
            if ti == 0 {
                Err(interp.err(ps, ErrorKind::Runtime, "division by zero"))
            } else {
                Ok(())
            }
        };

        // promoted left type decides whether >> is logical
        let promoted_left = if TypeRegistry::int_rank(b_base) < 3 { BaseType::Int } else { b_base };
        let shr = |v: i64| -> i64 {
            if TypeRegistry::is_unsigned(promoted_left) {
                ((v as u64) >> sh) as i64
            } else {
                v >> sh
            }
        };

        let mut needs_conversion = false;
        let mut result_base = BaseType::LongLong;
        let mut comparison = false;
        let result = match op {
            Token::Assign => {
                result_base = b_base;
                self.assign_int(ps, &bv, ti, false)?
            }
            Token::AddAssign => {
                result_base = b_base;
                self.assign_int(ps, &bv, bi.wrapping_add(ti), false)?
            }
            Token::SubAssign => {
                result_base = b_base;
                self.assign_int(ps, &bv, bi.wrapping_sub(ti), false)?
            }
            Token::MulAssign => {
                result_base = b_base;
                self.assign_int(ps, &bv, bi.wrapping_mul(ti), false)?
            }
            Token::DivAssign => {
                result_base = b_base;
                div_check(self)?;
                self.assign_int(ps, &bv, bi.wrapping_div(ti), false)?
            }
            Token::ModAssign => {
                result_base = b_base;
                div_check(self)?;
                self.assign_int(ps, &bv, bi.wrapping_rem(ti), false)?
            }
            Token::ShlAssign => self.assign_int(ps, &bv, bi.wrapping_shl(sh), false)?,
            Token::ShrAssign => self.assign_int(ps, &bv, shr(bi), false)?,
            Token::AndAssign => self.assign_int(ps, &bv, bi & ti, false)?,
            Token::OrAssign => self.assign_int(ps, &bv, bi | ti, false)?,
            Token::XorAssign => self.assign_int(ps, &bv, bi ^ ti, false)?,
            Token::BitOr => {
                needs_conversion = true;
                bi | ti
            }
            Token::BitXor => {
                needs_conversion = true;
                bi ^ ti
            }
            Token::Ampersand => {
                needs_conversion = true;
                bi & ti
            }
            Token::Equal => {
                comparison = true;
                i64::from(bi == ti)
            }
            Token::NotEqual => {
                comparison = true;
                i64::from(bi != ti)
            }
            Token::LessThan => {
                comparison = true;
                i64::from(bi < ti)
            }
            Token::GreaterThan => {
                comparison = true;
                i64::from(bi > ti)
            }
            Token::LessEqual => {
                comparison = true;
                i64::from(bi <= ti)
            }
            Token::GreaterEqual => {
                comparison = true;
                i64::from(bi >= ti)
            }
            Token::Shl => bi.wrapping_shl(sh),
            Token::Shr => shr(bi),
            Token::Plus => {
                needs_conversion = true;
                bi.wrapping_add(ti)
            }
            Token::Minus => {
                needs_conversion = true;
                bi.wrapping_sub(ti)
            }
            Token::Star => {
                needs_conversion = true;
                bi.wrapping_mul(ti)
            }
            Token::Slash => {
                needs_conversion = true;
                div_check(self)?;
                bi.wrapping_div(ti)
            }
            Token::Percent => {
                needs_conversion = true;
                div_check(self)?;
                bi.wrapping_rem(ti)
            }
            _ => return Err(self.err(ps, ErrorKind::Type, "invalid operation")),
        };

        if comparison {
            return self.push_int(ps, stack, result);
        }

        // the C usual arithmetic conversions
        if needs_conversion {
            if TypeRegistry::int_rank(b_base) < TypeRegistry::int_rank(BaseType::Int) {
                b_base = BaseType::Int;
            }
            if TypeRegistry::int_rank(t_base) < TypeRegistry::int_rank(BaseType::Int) {
                t_base = BaseType::Int;
            }
            result_base = if b_base == t_base {
                b_base
            } else if TypeRegistry::is_unsigned(b_base) == TypeRegistry::is_unsigned(t_base) {
                if TypeRegistry::int_rank(b_base) > TypeRegistry::int_rank(t_base) {
                    b_base
                } else {
                    t_base
                }
            } else if TypeRegistry::is_unsigned(b_base) {
                if TypeRegistry::int_rank(b_base) >= TypeRegistry::int_rank(t_base) {
                    b_base
                } else if TypeRegistry::int_size(t_base) > TypeRegistry::int_size(b_base) {
                    t_base
                } else {
                    TypeRegistry::unsigned_counterpart(t_base)
                }
            } else if TypeRegistry::int_rank(t_base) >= TypeRegistry::int_rank(b_base) {
                t_base
            } else if TypeRegistry::int_size(b_base) > TypeRegistry::int_size(t_base) {
                b_base
            } else {
                TypeRegistry::unsigned_counterpart(b_base)
            };
        }
        self.push_int_typed(ps, stack, result, self.int_type_of(result_base))
    }

    fn exec_infix_pointer_int(&mut self, ps: &mut ParseState, stack: &mut Vec<Node>, op: Token, bottom: Slot, top: Slot) -> CResult<()> {
        let bv = bottom.value;
        let tv = top.value;
        let b_base = self.types.base(bv.typ);
        let ti = self.coerce_int(ps, &tv)?;
        let desc = self.types.desc(bv.typ).clone();
        let elem = desc.from.unwrap_or(types::VOID);
        let ptr_val = if b_base == BaseType::Pointer {
            self.read_ptr(ps, bv.addr)?
        } else {
            // array name decays to the address of its first element
            bv.addr
        };
        match op {
            Token::Equal | Token::NotEqual => {
                if ti != 0 {
                    return Err(self.err(ps, ErrorKind::Type, "invalid operation"));
                }
                let is_null = ptr_val == 0;
                let r = if op == Token::Equal { is_null } else { !is_null };
                self.push_int(ps, stack, i64::from(r))
            }
            Token::Plus | Token::Minus => {
                if b_base == BaseType::Pointer && ptr_val == 0 {
                    return Err(self.err(ps, ErrorKind::Runtime, "invalid use of a NULL pointer"));
                }
                let size = self.types.size_of(elem) as i64;
                let delta = ti.wrapping_mul(size);
                let new = if op == Token::Plus {
                    (ptr_val as i64).wrapping_add(delta)
                } else {
                    (ptr_val as i64).wrapping_sub(delta)
                } as u64;
                let result_t = if b_base == BaseType::Pointer {
                    bv.typ
                } else {
                    self.types.get_matching(elem, BaseType::Pointer, 0, None)
                };
                let slot = self.push_blank(ps, stack, result_t)?;
                self.write_ptr(ps, slot.value.addr, new)
            }
            Token::Assign if ti == 0 => {
                let mut dest = bv;
                self.assign(ps, &mut dest, &tv, false, false)?;
                self.push_view(stack, dest);
                Ok(())
            }
            Token::AddAssign | Token::SubAssign => {
                if b_base != BaseType::Pointer {
                    return Err(self.err(ps, ErrorKind::Type, "invalid operation"));
                }
                if !bv.is_lvalue {
                    return Err(self.err(ps, ErrorKind::Type, "can't assign to this"));
                }
                if ptr_val == 0 {
                    return Err(self.err(ps, ErrorKind::Runtime, "invalid use of a NULL pointer"));
                }
                let size = self.types.size_of(elem) as i64;
                let delta = ti.wrapping_mul(size);
                let new = if op == Token::AddAssign {
                    (ptr_val as i64).wrapping_add(delta)
                } else {
                    (ptr_val as i64).wrapping_sub(delta)
                } as u64;
                self.write_ptr(ps, bv.addr, new)?;
                self.push_view(stack, bv);
                Ok(())
            }
            _ => Err(self.err(ps, ErrorKind::Type, "invalid operation")),
        }
    }

    // ==================== Struct member access ====================

    /// `.` and `->`: the member identifier is consumed directly from the
    /// token stream, not through the operator stack.
    fn struct_element(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        op: Token,
        ignore_from: usize,
    ) -> CResult<()> {
        let ident = self.next_tok(ps);
        let TokValue::Ident(member_name) = ident.value else {
            let opname = op.name();
            return Err(self.err(ps, ErrorKind::Syntax, format!("need a structure or union member after '{opname}'")));
        };
        let executing = ps.mode == RunMode::Run
            && stack.len().checked_sub(1).is_some_and(|i| i < ignore_from);
        if !executing {
            return Ok(());
        }
        let Some(Node::Val(base_slot)) = stack.pop() else {
            return Err(self.err(ps, ErrorKind::Syntax, "invalid expression"));
        };
        self.free_slot(ps, &base_slot)?;
        let bv = base_slot.value;
        let (agg_typ, agg_addr) = if op == Token::Arrow {
            if self.types.base(bv.typ) != BaseType::Pointer {
                let name = self.type_name(bv.typ);
                return Err(self.err(ps, ErrorKind::Type, format!("can't use '->' on a {name}")));
            }
            let pointee = self.types.desc(bv.typ).from.unwrap_or(types::VOID);
            let p = self.read_ptr(ps, bv.addr)?;
            if p == 0 {
                return Err(self.err(ps, ErrorKind::Runtime, "NULL pointer dereference"));
            }
            (pointee, p)
        } else {
            (bv.typ, bv.addr)
        };
        let agg_base = self.types.base(agg_typ);
        if agg_base != BaseType::Struct && agg_base != BaseType::Union {
            let name = self.type_name(agg_typ);
            let opname = op.name();
            return Err(self.err(
                ps,
                ErrorKind::Type,
                format!("can't use '{opname}' on something that's not a struct or union: it's a {name}"),
            ));
        }
        if self.types.desc(agg_typ).members.is_none() {
            let name = self.type_name(agg_typ);
            return Err(self.err(ps, ErrorKind::Type, format!("type '{name}' isn't defined")));
        }
        let Some(member) = self.types.member(agg_typ, member_name) else {
            let ident = self.interner.resolve(member_name).to_owned();
            return Err(self.err(ps, ErrorKind::Name, format!("doesn't have a member called '{ident}'")));
        };
        let addr = agg_addr + member.offset as u64;
        self.push_view(stack, Value::lvalue(member.typ, addr, bv.lvalue_from));
        Ok(())
    }

    // ==================== Ternary colon ====================

    /// On `:` the stack is collapsed exclusively, then the nearest pending
    /// `?` (through any already-resolved inner `:`s) executes here so its
    /// selection happens before the else-arm is parsed.
    fn resolve_pending_question(
        &mut self,
        ps: &mut ParseState,
        stack: &mut Vec<Node>,
        prec: i32,
        ignore_from: &mut usize,
    ) -> CResult<()> {
        loop {
            let n = stack.len();
            if n < 3 {
                return Err(self.err(ps, ErrorKind::Syntax, "':' without a matching '?'"));
            }
            let Node::Val(top) = stack[n - 1] else {
                return Err(self.err(ps, ErrorKind::Syntax, "invalid expression"));
            };
            let Node::Op { order: Order::Infix, tok, prec: op_prec } = stack[n - 2] else {
                return Err(self.err(ps, ErrorKind::Syntax, "':' without a matching '?'"));
            };
            if op_prec != prec {
                return Err(self.err(ps, ErrorKind::Syntax, "':' without a matching '?'"));
            }
            let Node::Val(under) = stack[n - 3] else {
                return Err(self.err(ps, ErrorKind::Syntax, "invalid expression"));
            };
            stack.truncate(n - 3);
            self.free_slot(ps, &top)?;
            self.free_slot(ps, &under)?;
            let run = run_allowed(ps.mode, n - 2, ignore_from);
            match tok {
                Token::Colon => {
                    if run {
                        self.exec_colon(ps, stack, under, top)?;
                    } else {
                        self.push_dummy(ps, stack)?;
                    }
                }
                Token::Question => {
                    if run {
                        self.exec_question(ps, stack, under, top)?;
                    } else {
                        self.push_dummy(ps, stack)?;
                    }
                    return Ok(());
                }
                _ => return Err(self.err(ps, ErrorKind::Syntax, "':' without a matching '?'")),
            }
        }
    }

    // ==================== Main loop ====================

    /// Parse and evaluate one expression. Returns `None` if no expression
    /// tokens were present; in run mode the returned slot is the result and
    /// must be released with `free_slot` once consumed.
    pub fn eval_expression(&mut self, ps: &mut ParseState) -> CResult<Option<Slot>> {
        let mut stack: Vec<Node> = Vec::new();
        let mut prefix_state = true;
        let mut done = false;
        let mut bracket_prec: i32 = 0;
        let mut precedence: i32 = 0;
        let mut ternary_depth: i32 = 0;
        let mut ignore_from: usize = NOT_IGNORING;

        while !done {
            let pre = *ps;
            let st = self.next_tok(ps);
            let tok = st.tok;
            let entry = op_entry(tok);
            let is_operator = (entry.prefix != 0 || entry.postfix != 0 || entry.infix != 0)
                && !(tok == Token::RParen && bracket_prec == 0)
                && !(tok == Token::Colon && ternary_depth == 0);

            if is_operator {
                if prefix_state {
                    if entry.prefix == 0 {
                        return Err(self.err(ps, ErrorKind::Syntax, "operator not expected here"));
                    }
                    let local_precedence = entry.prefix;
                    precedence = bracket_prec + local_precedence;
                    if tok == Token::LParen {
                        let peeked = self.peek_tok(ps);
                        let top_is_sizeof =
                            matches!(stack.last(), Some(Node::Op { tok: Token::KwSizeof, .. }));
                        if self.is_type_token(&peeked) && !top_is_sizeof {
                            // a cast: parse the type, then treat the cast as
                            // a synthetic infix operator
                            let cast_t = self.parse_cast_type(ps)?;
                            self.expect_tok(ps, Token::RParen, "')'")?;
                            precedence = bracket_prec + op_entry(Token::Cast).prefix;
                            self.collapse(ps, &mut stack, precedence + 1, &mut ignore_from)?;
                            let slot = self.alloc_temp(ps, types::TYPE_META)?;
                            self.write_ptr(ps, slot.value.addr, cast_t.0 as u64)?;
                            stack.push(Node::Val(slot));
                            stack.push(Node::Op { order: Order::Infix, tok: Token::Cast, prec: precedence });
                        } else {
                            bracket_prec += BRACKET_PRECEDENCE;
                        }
                    } else {
                        // when two equal-precedence prefix operators stack,
                        // nudge so the inner one executes first
                        let mut boost = 0;
                        let next = self.peek_tok(ps).tok;
                        let next_entry = op_entry(next);
                        if (next_entry.prefix != 0 || next_entry.infix != 0)
                            && next != Token::LParen
                            && next_entry.prefix == local_precedence
                        {
                            boost = -1;
                        }
                        self.collapse(ps, &mut stack, precedence, &mut ignore_from)?;
                        stack.push(Node::Op { order: Order::Prefix, tok, prec: precedence + boost });
                    }
                } else {
                    // expect an infix or postfix operator
                    if entry.postfix != 0 {
                        match tok {
                            Token::RParen | Token::RBracket => {
                                if bracket_prec == 0 {
                                    // this bracket is after the end of the expression
                                    *ps = pre;
                                    done = true;
                                } else {
                                    self.collapse(ps, &mut stack, bracket_prec, &mut ignore_from)?;
                                    bracket_prec -= BRACKET_PRECEDENCE;
                                }
                            }
                            _ => {
                                precedence = bracket_prec + entry.postfix;
                                self.collapse(ps, &mut stack, precedence, &mut ignore_from)?;
                                stack.push(Node::Op { order: Order::Postfix, tok, prec: precedence });
                            }
                        }
                    } else if entry.infix != 0 {
                        precedence = bracket_prec + entry.infix;
                        if tok == Token::Colon {
                            self.collapse(ps, &mut stack, precedence + 1, &mut ignore_from)?;
                            self.resolve_pending_question(ps, &mut stack, precedence, &mut ignore_from)?;
                            // a non-void selection means the else arm is skipped
                            if ps.mode == RunMode::Run && ignore_from == NOT_IGNORING {
                                if let Some(Node::Val(slot)) = stack.last() {
                                    if self.types.base(slot.value.typ) != BaseType::Void {
                                        ignore_from = stack.len() + 1;
                                    }
                                }
                            }
                            stack.push(Node::Op { order: Order::Infix, tok, prec: precedence });
                            ternary_depth -= 1;
                            prefix_state = true;
                        } else {
                            if is_left_to_right(entry.infix) {
                                self.collapse(ps, &mut stack, precedence, &mut ignore_from)?;
                            } else {
                                self.collapse(ps, &mut stack, precedence + 1, &mut ignore_from)?;
                            }
                            if tok == Token::Dot || tok == Token::Arrow {
                                self.struct_element(ps, &mut stack, tok, ignore_from)?;
                            } else {
                                if (tok == Token::LogicalAnd || tok == Token::LogicalOr)
                                    && ps.mode == RunMode::Run
                                    && ignore_from == NOT_IGNORING
                                {
                                    // decide whether the right side can be skipped
                                    if let Some(Node::Val(slot)) = stack.last() {
                                        if self.is_numeric_or_pointer(&slot.value, true) {
                                            let lhs = self.truthy(ps, &slot.value)?;
                                            if (tok == Token::LogicalOr && lhs)
                                                || (tok == Token::LogicalAnd && !lhs)
                                            {
                                                ignore_from = stack.len() + 1;
                                            }
                                        }
                                    }
                                }
                                if tok == Token::Question {
                                    ternary_depth += 1;
                                    if ps.mode == RunMode::Run && ignore_from == NOT_IGNORING {
                                        // a false condition skips the then-arm
                                        if let Some(Node::Val(slot)) = stack.last() {
                                            if self.is_numeric_or_pointer(&slot.value, true)
                                                && !self.truthy(ps, &slot.value)?
                                            {
                                                ignore_from = stack.len() + 1;
                                            }
                                        }
                                    }
                                }
                                stack.push(Node::Op { order: Order::Infix, tok, prec: precedence });
                                prefix_state = true;
                            }
                            if tok == Token::LBracket {
                                bracket_prec += BRACKET_PRECEDENCE;
                            }
                        }
                    } else {
                        return Err(self.err(ps, ErrorKind::Syntax, "operator not expected here"));
                    }
                }
            } else if tok == Token::Ident {
                if !prefix_state {
                    return Err(self.err(ps, ErrorKind::Syntax, "identifier not expected here"));
                }
                let TokValue::Ident(name) = st.value else {
                    return Err(self.err(ps, ErrorKind::Syntax, "invalid identifier"));
                };
                if self.is_type_token(&st) {
                    // a typedef name: push the type like a value (sizeof)
                    *ps = pre;
                    self.push_type_token(ps, &mut stack)?;
                } else if self.peek_tok(ps).tok == Token::LParen {
                    let run_it = ps.mode == RunMode::Run && ignore_from == NOT_IGNORING;
                    self.call_dispatch(ps, &mut stack, name, run_it)?;
                } else if ps.mode == RunMode::Run && ignore_from == NOT_IGNORING {
                    let (val, vr) = self.var_get(ps, name)?;
                    let base = self.types.base(val.typ);
                    if base == BaseType::Macro {
                        self.inline_macro(ps, &mut stack, name, val)?;
                    } else if base == BaseType::Void {
                        return Err(self.err(ps, ErrorKind::Type, "a void value isn't much use here"));
                    } else {
                        let mut view = val;
                        view.lvalue_from = Some(vr);
                        self.push_view(&mut stack, view);
                    }
                } else {
                    self.push_dummy(ps, &mut stack)?;
                }
                prefix_state = false;
            } else if matches!(tok, Token::IntLit | Token::FloatLit | Token::CharLit | Token::StrLit) {
                if !prefix_state {
                    return Err(self.err(ps, ErrorKind::Syntax, "value not expected here"));
                }
                prefix_state = false;
                match st.value {
                    TokValue::Int { value, typ } => self.push_int_typed(ps, &mut stack, value, typ)?,
                    TokValue::Float { value, double } => self.push_fp(ps, &mut stack, value, double)?,
                    TokValue::Char(c) => self.push_int_typed(ps, &mut stack, c as i64, types::CHAR)?,
                    TokValue::Str(body) => {
                        let addr = self.string_literal_cell(ps, body)?;
                        let char_ptr = self.types.char_ptr;
                        let slot = self.alloc_temp(ps, char_ptr)?;
                        self.write_ptr(ps, slot.value.addr, addr)?;
                        stack.push(Node::Val(slot));
                    }
                    TokValue::None | TokValue::Ident(_) => {
                        return Err(self.err(ps, ErrorKind::Syntax, "invalid literal"))
                    }
                }
            } else if self.is_type_token(&st) {
                // a type name: push it like a value, for sizeof()
                if !prefix_state {
                    return Err(self.err(ps, ErrorKind::Syntax, "type not expected here"));
                }
                *ps = pre;
                self.push_type_token(ps, &mut stack)?;
                prefix_state = false;
            } else {
                // not a token from an expression
                *ps = pre;
                done = true;
            }
        }

        if bracket_prec > 0 {
            return Err(self.err(ps, ErrorKind::Syntax, "brackets not closed"));
        }
        self.collapse(ps, &mut stack, 0, &mut ignore_from)?;

        if stack.is_empty() {
            return Ok(None);
        }
        if ps.mode == RunMode::Run {
            if stack.len() != 1 {
                return Err(self.err(ps, ErrorKind::Syntax, "invalid expression"));
            }
            let Some(Node::Val(result)) = stack.pop() else {
                return Err(self.err(ps, ErrorKind::Syntax, "invalid expression"));
            };
            Ok(Some(result))
        } else {
            // discard whatever the skip pass accumulated
            while let Some(node) = stack.pop() {
                if let Node::Val(slot) = node {
                    self.free_slot(ps, &slot)?;
                }
            }
            Ok(Some(Slot { value: Value::new(types::VOID, 0), owned: 0 }))
        }
    }

    /// Parse a type usage in expression position and push it as a
    /// type-meta value.
    fn push_type_token(&mut self, ps: &mut ParseState, stack: &mut Vec<Node>) -> CResult<()> {
        let (typ, _) = self.parse_type_in_expr(ps)?;
        let slot = self.alloc_temp(ps, types::TYPE_META)?;
        self.write_ptr(ps, slot.value.addr, typ.0 as u64)?;
        stack.push(Node::Val(slot));
        Ok(())
    }

    /// Parse an expression that must produce an integer (conditions, array
    /// sizes). Returns 0 when not in run mode.
    pub fn eval_int(&mut self, ps: &mut ParseState) -> CResult<i64> {
        let Some(slot) = self.eval_expression(ps)? else {
            return Err(self.err(ps, ErrorKind::Syntax, "expression expected"));
        };
        if ps.mode != RunMode::Run {
            self.free_slot(ps, &slot)?;
            return Ok(0);
        }
        if !self.is_numeric_or_pointer(&slot.value, true) {
            let name = self.type_name(slot.value.typ);
            return Err(self.err(ps, ErrorKind::Type, format!("integer value expected instead of {name}")));
        }
        let v = self.coerce_int(ps, &slot.value)?;
        self.free_slot(ps, &slot)?;
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_table_orders_the_usual_suspects() {
        assert!(op_entry(Token::Star).infix > op_entry(Token::Plus).infix);
        assert!(op_entry(Token::Plus).infix > op_entry(Token::Shl).infix);
        assert!(op_entry(Token::Shl).infix > op_entry(Token::LessThan).infix);
        assert!(op_entry(Token::LessThan).infix > op_entry(Token::Equal).infix);
        assert!(op_entry(Token::Equal).infix > op_entry(Token::Ampersand).infix);
        assert!(op_entry(Token::Ampersand).infix > op_entry(Token::BitXor).infix);
        assert!(op_entry(Token::BitXor).infix > op_entry(Token::BitOr).infix);
        assert!(op_entry(Token::BitOr).infix > op_entry(Token::LogicalAnd).infix);
        assert!(op_entry(Token::LogicalAnd).infix > op_entry(Token::LogicalOr).infix);
        assert!(op_entry(Token::LogicalOr).infix > op_entry(Token::Question).infix);
        assert!(op_entry(Token::Question).infix > op_entry(Token::Assign).infix);
        assert_eq!(op_entry(Token::Dot).infix, 15);
        assert_eq!(op_entry(Token::Increment).postfix, 15);
        assert_eq!(op_entry(Token::KwSizeof).prefix, 14);
        assert_eq!(op_entry(Token::Semicolon).infix, 0);
    }

    #[test]
    fn assignment_and_prefix_levels_are_right_to_left() {
        assert!(!is_left_to_right(2));
        assert!(!is_left_to_right(14));
        assert!(is_left_to_right(12));
        assert!(is_left_to_right(15));
    }
}
