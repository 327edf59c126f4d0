//! The value cell and every payload operation on it.
//!
//! A `Value` pairs a type descriptor with the arena address of its payload
//! plus l-value metadata. Payload bytes are only ever interpreted through
//! the explicit `read`/`write` operations below, keyed by the cell's base
//! type; nothing reads a payload as anything other than what its tag says.

use crate::error::{CResult, ErrorKind};
use crate::interp::{Interp, ParseState};
use crate::types::{self, BaseType, TypeId, TypeRegistry};
use crate::variables::VarRef;

/// A tagged value cell. Copyable: the payload lives in the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Value {
    pub typ: TypeId,
    /// Arena offset of the payload; 0 for zero-sized values.
    pub addr: u64,
    pub is_lvalue: bool,
    /// Owning table slot when this cell is a view into a variable; lets
    /// unsized-array assignment resize the variable in place.
    pub lvalue_from: Option<VarRef>,
}

impl Value {
    pub fn new(typ: TypeId, addr: u64) -> Self {
        Self { typ, addr, is_lvalue: false, lvalue_from: None }
    }

    pub fn lvalue(typ: TypeId, addr: u64, from: Option<VarRef>) -> Self {
        Self { typ, addr, is_lvalue: true, lvalue_from: from }
    }
}

impl Interp {
    fn mem_err(&self, ps: &ParseState) -> Box<crate::error::CError> {
        self.err(ps, ErrorKind::Runtime, "invalid memory access")
    }

    fn read_bytes<const N: usize>(&self, ps: &ParseState, addr: u64) -> CResult<[u8; N]> {
        let slice = self.arena.read(addr, N).ok_or_else(|| self.mem_err(ps))?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Read a pointer payload (an arena offset).
    pub fn read_ptr(&self, ps: &ParseState, addr: u64) -> CResult<u64> {
        Ok(u64::from_le_bytes(self.read_bytes::<8>(ps, addr)?))
    }

    pub fn write_ptr(&mut self, ps: &ParseState, addr: u64, value: u64) -> CResult<()> {
        if !self.arena.write(addr, &value.to_le_bytes()) {
            return Err(self.mem_err(ps));
        }
        Ok(())
    }

    /// Read any numeric or pointer cell as a signed 64-bit integer.
    pub fn coerce_int(&self, ps: &ParseState, v: &Value) -> CResult<i64> {
        Ok(match self.types.base(v.typ) {
            BaseType::Char => i8::from_le_bytes(self.read_bytes::<1>(ps, v.addr)?) as i64,
            BaseType::UnsignedChar => u8::from_le_bytes(self.read_bytes::<1>(ps, v.addr)?) as i64,
            BaseType::Short => i16::from_le_bytes(self.read_bytes::<2>(ps, v.addr)?) as i64,
            BaseType::UnsignedShort => u16::from_le_bytes(self.read_bytes::<2>(ps, v.addr)?) as i64,
            BaseType::Int | BaseType::Enum => {
                i32::from_le_bytes(self.read_bytes::<4>(ps, v.addr)?) as i64
            }
            BaseType::UnsignedInt => u32::from_le_bytes(self.read_bytes::<4>(ps, v.addr)?) as i64,
            BaseType::Long | BaseType::LongLong => {
                i64::from_le_bytes(self.read_bytes::<8>(ps, v.addr)?)
            }
            BaseType::UnsignedLong | BaseType::UnsignedLongLong => {
                u64::from_le_bytes(self.read_bytes::<8>(ps, v.addr)?) as i64
            }
            BaseType::Pointer => self.read_ptr(ps, v.addr)? as i64,
            BaseType::Float => f32::from_le_bytes(self.read_bytes::<4>(ps, v.addr)?) as i64,
            BaseType::Double => f64::from_le_bytes(self.read_bytes::<8>(ps, v.addr)?) as i64,
            _ => 0,
        })
    }

    /// Read any numeric or pointer cell as an unsigned 64-bit integer.
    pub fn coerce_uint(&self, ps: &ParseState, v: &Value) -> CResult<u64> {
        Ok(match self.types.base(v.typ) {
            BaseType::Float => f32::from_le_bytes(self.read_bytes::<4>(ps, v.addr)?) as u64,
            BaseType::Double => f64::from_le_bytes(self.read_bytes::<8>(ps, v.addr)?) as u64,
            _ => self.coerce_int(ps, v)? as u64,
        })
    }

    /// Read any numeric cell widened to double.
    pub fn coerce_fp(&self, ps: &ParseState, v: &Value) -> CResult<f64> {
        Ok(match self.types.base(v.typ) {
            BaseType::Float => f32::from_le_bytes(self.read_bytes::<4>(ps, v.addr)?) as f64,
            BaseType::Double => f64::from_le_bytes(self.read_bytes::<8>(ps, v.addr)?),
            BaseType::UnsignedChar
            | BaseType::UnsignedShort
            | BaseType::UnsignedInt
            | BaseType::UnsignedLong
            | BaseType::UnsignedLongLong => self.coerce_uint(ps, v)? as f64,
            _ => self.coerce_int(ps, v)? as f64,
        })
    }

    /// Narrow an i64 into a payload according to the destination base.
    pub fn write_int_as(&mut self, ps: &ParseState, addr: u64, base: BaseType, v: i64) -> CResult<()> {
        let ok = match base {
            BaseType::Char | BaseType::UnsignedChar => self.arena.write(addr, &(v as u8).to_le_bytes()),
            BaseType::Short | BaseType::UnsignedShort => self.arena.write(addr, &(v as u16).to_le_bytes()),
            BaseType::Int | BaseType::UnsignedInt | BaseType::Enum => {
                self.arena.write(addr, &(v as u32).to_le_bytes())
            }
            BaseType::Long
            | BaseType::UnsignedLong
            | BaseType::LongLong
            | BaseType::UnsignedLongLong
            | BaseType::Pointer => self.arena.write(addr, &v.to_le_bytes()),
            BaseType::Float => self.arena.write(addr, &(v as f32).to_le_bytes()),
            BaseType::Double => self.arena.write(addr, &(v as f64).to_le_bytes()),
            _ => false,
        };
        if !ok {
            return Err(self.mem_err(ps));
        }
        Ok(())
    }

    pub fn write_fp_as(&mut self, ps: &ParseState, addr: u64, base: BaseType, v: f64) -> CResult<()> {
        let ok = match base {
            BaseType::Float => self.arena.write(addr, &(v as f32).to_le_bytes()),
            BaseType::Double => self.arena.write(addr, &v.to_le_bytes()),
            _ => return self.write_int_as(ps, addr, base, v as i64),
        };
        if !ok {
            return Err(self.mem_err(ps));
        }
        Ok(())
    }

    /// Is this cell usable in arithmetic (integer or floating)?
    pub fn is_numeric(&self, v: &Value) -> bool {
        TypeRegistry::is_numeric(self.types.base(v.typ))
    }

    pub fn is_numeric_or_pointer(&self, v: &Value, allow_pointers: bool) -> bool {
        TypeRegistry::is_numeric_or_pointer(self.types.base(v.typ), allow_pointers)
    }

    /// Write an integer through an l-value. When `post` is set, returns the
    /// previous value (postfix `++`/`--`), else the incoming one; the
    /// caller narrows through the result type when it pushes.
    pub fn assign_int(&mut self, ps: &ParseState, dest: &Value, from: i64, post: bool) -> CResult<i64> {
        if !dest.is_lvalue {
            return Err(self.err(ps, ErrorKind::Type, "can't assign to this"));
        }
        let result = if post { self.coerce_int(ps, dest)? } else { from };
        self.write_int_as(ps, dest.addr, self.types.base(dest.typ), from)?;
        Ok(result)
    }

    /// Write a floating value through a Float or Double l-value.
    pub fn assign_fp(&mut self, ps: &ParseState, dest: &Value, from: f64) -> CResult<f64> {
        if !dest.is_lvalue {
            return Err(self.err(ps, ErrorKind::Type, "can't assign to this"));
        }
        self.write_fp_as(ps, dest.addr, self.types.base(dest.typ), from)?;
        Ok(from)
    }

    fn assign_fail(&self, ps: &ParseState, dest: TypeId, src: TypeId) -> Box<crate::error::CError> {
        self.err(
            ps,
            ErrorKind::Type,
            format!("can't assign {} from {}", self.type_name(dest), self.type_name(src)),
        )
    }

    /// The full pointer-assignment rule set.
    pub fn assign_to_pointer(
        &mut self,
        ps: &ParseState,
        dest: &Value,
        src: &Value,
        allow_coercion: bool,
    ) -> CResult<()> {
        let pointee = self.types.desc(dest.typ).from;
        let src_desc = self.types.desc(src.typ).clone();
        let void_ptr = self.types.void_ptr;

        if src.typ == dest.typ
            || src.typ == void_ptr
            || (dest.typ == void_ptr && src_desc.base == BaseType::Pointer)
        {
            // plain old pointer assignment
            let p = self.read_ptr(ps, src.addr)?;
            return self.write_ptr(ps, dest.addr, p);
        }
        if src_desc.base == BaseType::Array && (pointee == src_desc.from || dest.typ == void_ptr) {
            // blah *x = array of blah: decay to the first element
            return self.write_ptr(ps, dest.addr, src.addr);
        }
        if src_desc.base == BaseType::Pointer {
            if let Some(inner) = src_desc.from {
                let inner_desc = self.types.desc(inner);
                if inner_desc.base == BaseType::Array
                    && (pointee == inner_desc.from || dest.typ == void_ptr)
                {
                    // blah *x = pointer to array of blah: dereference once
                    let p = self.read_ptr(ps, src.addr)?;
                    return self.write_ptr(ps, dest.addr, p);
                }
            }
        }
        if self.is_numeric(src) && self.coerce_int(ps, src)? == 0 {
            // null pointer assignment
            return self.write_ptr(ps, dest.addr, 0);
        }
        if allow_coercion && self.is_numeric(src) {
            let raw = self.coerce_uint(ps, src)?;
            return self.write_ptr(ps, dest.addr, raw);
        }
        if allow_coercion && src_desc.base == BaseType::Pointer {
            let p = self.read_ptr(ps, src.addr)?;
            return self.write_ptr(ps, dest.addr, p);
        }
        Err(self.assign_fail(ps, dest.typ, src.typ))
    }

    /// General assignment of any value kind. `force` bypasses the l-value
    /// check (parameter binding, casts); `allow_ptr_coercion` admits the
    /// cast-only pointer conversions.
    pub fn assign(
        &mut self,
        ps: &ParseState,
        dest: &mut Value,
        src: &Value,
        force: bool,
        allow_ptr_coercion: bool,
    ) -> CResult<()> {
        if !dest.is_lvalue && !force {
            return Err(self.err(ps, ErrorKind::Type, "not an lvalue"));
        }
        let dest_base = self.types.base(dest.typ);
        if TypeRegistry::is_numeric(dest_base)
            && !self.is_numeric_or_pointer(src, allow_ptr_coercion)
        {
            return Err(self.assign_fail(ps, dest.typ, src.typ));
        }
        match dest_base {
            BaseType::Char
            | BaseType::UnsignedChar
            | BaseType::Short
            | BaseType::UnsignedShort
            | BaseType::Int
            | BaseType::UnsignedInt
            | BaseType::Enum
            | BaseType::Long
            | BaseType::UnsignedLong
            | BaseType::LongLong
            | BaseType::UnsignedLongLong => {
                let v = self.coerce_int(ps, src)?;
                self.write_int_as(ps, dest.addr, dest_base, v)
            }
            BaseType::Float | BaseType::Double => {
                let v = self.coerce_fp(ps, src)?;
                self.write_fp_as(ps, dest.addr, dest_base, v)
            }
            BaseType::Pointer => self.assign_to_pointer(ps, dest, src, allow_ptr_coercion),
            BaseType::Array => self.assign_to_array(ps, dest, src),
            BaseType::Struct | BaseType::Union => {
                if dest.typ != src.typ {
                    return Err(self.assign_fail(ps, dest.typ, src.typ));
                }
                let size = self.types.size_of(dest.typ);
                if !self.arena.copy(dest.addr, src.addr, size) {
                    return Err(self.mem_err(ps));
                }
                Ok(())
            }
            // function/macro/type cells carry an index payload
            BaseType::Function | BaseType::Macro | BaseType::TypeKind => {
                if dest.typ != src.typ {
                    return Err(self.assign_fail(ps, dest.typ, src.typ));
                }
                let v = self.read_ptr(ps, src.addr)?;
                self.write_ptr(ps, dest.addr, v)
            }
            _ => Err(self.assign_fail(ps, dest.typ, src.typ)),
        }
    }

    fn assign_to_array(&mut self, ps: &ParseState, dest: &mut Value, src: &Value) -> CResult<()> {
        let dest_desc = self.types.desc(dest.typ).clone();
        let src_desc = self.types.desc(src.typ).clone();

        if src_desc.base == BaseType::Array && dest_desc.array_size == 0 {
            // unsized destination: resize in place to the source's type
            self.resize_unsized_array(ps, dest, src.typ)?;
        }

        // char array = "abcd"
        let dest_desc = self.types.desc(dest.typ).clone();
        if dest_desc.from.map(|f| self.types.base(f)) == Some(BaseType::Char)
            && src_desc.base == BaseType::Pointer
            && src_desc.from.map(|f| self.types.base(f)) == Some(BaseType::Char)
        {
            let src_ptr = self.read_ptr(ps, src.addr)?;
            let len = self
                .arena
                .cstr_len(src_ptr)
                .ok_or_else(|| self.mem_err(ps))?;
            if dest_desc.array_size == 0 {
                let elem = dest_desc.from.unwrap_or(types::CHAR);
                let sized = self.types.get_matching(
                    elem,
                    BaseType::Array,
                    (len + 1) as u32,
                    dest_desc.ident,
                );
                self.resize_unsized_array(ps, dest, sized)?;
            }
            let dest_size = self.types.size_of(dest.typ);
            let n = dest_size.min(len + 1);
            if !self.arena.copy(dest.addr, src_ptr, n) {
                return Err(self.mem_err(ps));
            }
            return Ok(());
        }

        if src_desc.base == BaseType::Array
            && dest_desc.from == src_desc.from
            && dest_desc.array_size != src_desc.array_size
        {
            return Err(self.err(
                ps,
                ErrorKind::Type,
                format!(
                    "can't assign from an array of size {} to one of size {}",
                    src_desc.array_size, dest_desc.array_size
                ),
            ));
        }
        if dest.typ != src.typ {
            return Err(self.assign_fail(ps, dest.typ, src.typ));
        }
        let size = self.types.size_of(dest.typ);
        if !self.arena.copy(dest.addr, src.addr, size) {
            return Err(self.mem_err(ps));
        }
        Ok(())
    }

    /// Give an unsized array a real type and fresh storage, updating the
    /// owning variable slot so every alias sees the new payload.
    fn resize_unsized_array(&mut self, ps: &ParseState, dest: &mut Value, new_typ: TypeId) -> CResult<()> {
        let size = self.types.size_of(new_typ);
        let addr = self
            .arena
            .alloc_heap(size)
            .ok_or_else(|| self.err(ps, ErrorKind::Memory, "out of memory"))?;
        dest.typ = new_typ;
        dest.addr = addr;
        if let Some(vr) = dest.lvalue_from {
            self.update_var_slot(vr, new_typ, addr);
        }
        Ok(())
    }

    /// Read the NUL-terminated string at an interpreted address.
    pub fn read_cstr(&self, ps: &ParseState, addr: u64) -> CResult<Vec<u8>> {
        let len = self.arena.cstr_len(addr).ok_or_else(|| self.mem_err(ps))?;
        Ok(self.arena.read(addr, len).ok_or_else(|| self.mem_err(ps))?.to_vec())
    }
}
