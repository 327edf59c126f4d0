//! Type registry: canonical descriptors for every type the interpreter
//! knows about.
//!
//! Descriptors are interned: `get_matching` returns the unique id for a
//! (base, from, array-size, tag) combination, so `int*` is one descriptor
//! and type equality is id equality. Pointer and array types form a DAG
//! rooted at the base types.

use std::collections::HashMap;

use crate::intern::{Interner, StrId};

/// Closed enumeration of type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Char,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    Pointer,
    Array,
    Struct,
    Union,
    Enum,
    Function,
    Macro,
    GotoLabel,
    /// Meta-type: the value's payload is itself a type id (`sizeof`, casts).
    TypeKind,
}

/// Index into the registry. Equality is type identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

// Base descriptors are registered in a fixed order by `TypeRegistry::new`.
pub const VOID: TypeId = TypeId(0);
pub const CHAR: TypeId = TypeId(1);
pub const UCHAR: TypeId = TypeId(2);
pub const SHORT: TypeId = TypeId(3);
pub const USHORT: TypeId = TypeId(4);
pub const INT: TypeId = TypeId(5);
pub const UINT: TypeId = TypeId(6);
pub const LONG: TypeId = TypeId(7);
pub const ULONG: TypeId = TypeId(8);
pub const LONGLONG: TypeId = TypeId(9);
pub const ULONGLONG: TypeId = TypeId(10);
pub const FLOAT: TypeId = TypeId(11);
pub const DOUBLE: TypeId = TypeId(12);
pub const FUNCTION: TypeId = TypeId(13);
pub const MACRO: TypeId = TypeId(14);
pub const GOTO_LABEL: TypeId = TypeId(15);
pub const TYPE_META: TypeId = TypeId(16);

/// One member of a struct or union.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub name: StrId,
    pub typ: TypeId,
    pub offset: u32,
}

/// A canonical type descriptor.
#[derive(Debug, Clone)]
pub struct TypeDesc {
    pub base: BaseType,
    /// Element type for pointers/arrays.
    pub from: Option<TypeId>,
    /// 0 means incomplete/unsized for arrays.
    pub array_size: u32,
    /// Tag for structs/unions/enums.
    pub ident: Option<StrId>,
    /// `None` for a forward-declared aggregate.
    pub members: Option<Vec<Member>>,
    pub size: u32,
    pub align: u32,
}

#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<TypeDesc>,
    derived: HashMap<(BaseType, Option<TypeId>, u32, Option<StrId>), TypeId>,
    pub void_ptr: TypeId,
    pub char_ptr: TypeId,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            types: Vec::new(),
            derived: HashMap::new(),
            void_ptr: VOID,
            char_ptr: VOID,
        };
        let base = |b, size, align| TypeDesc {
            base: b,
            from: None,
            array_size: 0,
            ident: None,
            members: None,
            size,
            align,
        };
        reg.types.push(base(BaseType::Void, 0, 1));
        reg.types.push(base(BaseType::Char, 1, 1));
        reg.types.push(base(BaseType::UnsignedChar, 1, 1));
        reg.types.push(base(BaseType::Short, 2, 2));
        reg.types.push(base(BaseType::UnsignedShort, 2, 2));
        reg.types.push(base(BaseType::Int, 4, 4));
        reg.types.push(base(BaseType::UnsignedInt, 4, 4));
        reg.types.push(base(BaseType::Long, 8, 8));
        reg.types.push(base(BaseType::UnsignedLong, 8, 8));
        reg.types.push(base(BaseType::LongLong, 8, 8));
        reg.types.push(base(BaseType::UnsignedLongLong, 8, 8));
        reg.types.push(base(BaseType::Float, 4, 4));
        reg.types.push(base(BaseType::Double, 8, 8));
        // function/macro payloads hold an index into the function table
        reg.types.push(base(BaseType::Function, 8, 8));
        reg.types.push(base(BaseType::Macro, 8, 8));
        reg.types.push(base(BaseType::GotoLabel, 0, 1));
        // meta-type payloads hold a TypeId
        reg.types.push(base(BaseType::TypeKind, 8, 8));
        debug_assert_eq!(reg.types.len(), TYPE_META.0 as usize + 1);
        reg.void_ptr = reg.get_matching(VOID, BaseType::Pointer, 0, None);
        reg.char_ptr = reg.get_matching(CHAR, BaseType::Pointer, 0, None);
        reg
    }

    pub fn desc(&self, t: TypeId) -> &TypeDesc {
        &self.types[t.0 as usize]
    }

    pub fn base(&self, t: TypeId) -> BaseType {
        self.types[t.0 as usize].base
    }

    /// In-memory size of a value of this type.
    pub fn size_of(&self, t: TypeId) -> usize {
        self.types[t.0 as usize].size as usize
    }

    pub fn align_of(&self, t: TypeId) -> usize {
        self.types[t.0 as usize].align as usize
    }

    /// Return the unique descriptor for a derived type, creating it on
    /// first use.
    pub fn get_matching(
        &mut self,
        from: TypeId,
        base: BaseType,
        array_size: u32,
        ident: Option<StrId>,
    ) -> TypeId {
        let key = (base, Some(from), array_size, ident);
        if let Some(&id) = self.derived.get(&key) {
            return id;
        }
        let (size, align) = match base {
            BaseType::Pointer => (8, 8),
            BaseType::Array => {
                let elem = self.desc(from);
                (elem.size * array_size, elem.align)
            }
            // aggregates start incomplete; set_members fills the layout
            BaseType::Struct | BaseType::Union => (0, 1),
            BaseType::Enum => (4, 4),
            _ => (self.desc(from).size, self.desc(from).align),
        };
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeDesc {
            base,
            from: Some(from),
            array_size,
            ident,
            members: None,
            size,
            align,
        });
        self.derived.insert(key, id);
        id
    }

    /// Install the member table of a struct or union and compute its layout.
    pub fn set_members(&mut self, t: TypeId, members: Vec<Member>, size: u32, align: u32) {
        let desc = &mut self.types[t.0 as usize];
        desc.members = Some(members);
        desc.size = size;
        desc.align = align;
    }

    pub fn member(&self, t: TypeId, name: StrId) -> Option<Member> {
        self.desc(t)
            .members
            .as_ref()
            .and_then(|ms| ms.iter().find(|m| m.name == name).copied())
    }

    /// C integer conversion rank. 0 for non-integer types.
    pub fn int_rank(base: BaseType) -> i32 {
        match base {
            BaseType::Char | BaseType::UnsignedChar => 1,
            BaseType::Short | BaseType::UnsignedShort => 2,
            BaseType::Int | BaseType::UnsignedInt | BaseType::Enum => 3,
            BaseType::Long | BaseType::UnsignedLong => 4,
            BaseType::LongLong | BaseType::UnsignedLongLong => 5,
            _ => 0,
        }
    }

    pub fn is_unsigned(base: BaseType) -> bool {
        matches!(
            base,
            BaseType::UnsignedChar
                | BaseType::UnsignedShort
                | BaseType::UnsignedInt
                | BaseType::UnsignedLong
                | BaseType::UnsignedLongLong
        )
    }

    pub fn int_size(base: BaseType) -> u32 {
        match base {
            BaseType::Char | BaseType::UnsignedChar => 1,
            BaseType::Short | BaseType::UnsignedShort => 2,
            BaseType::Int | BaseType::UnsignedInt | BaseType::Enum => 4,
            BaseType::Long
            | BaseType::UnsignedLong
            | BaseType::LongLong
            | BaseType::UnsignedLongLong => 8,
            _ => 0,
        }
    }

    pub fn unsigned_counterpart(base: BaseType) -> BaseType {
        match base {
            BaseType::Char => BaseType::UnsignedChar,
            BaseType::Short => BaseType::UnsignedShort,
            BaseType::Int | BaseType::Enum => BaseType::UnsignedInt,
            BaseType::Long => BaseType::UnsignedLong,
            BaseType::LongLong => BaseType::UnsignedLongLong,
            other => other,
        }
    }

    pub fn is_fp(base: BaseType) -> bool {
        matches!(base, BaseType::Float | BaseType::Double)
    }

    /// Integer or floating: usable in arithmetic without conversion.
    pub fn is_numeric(base: BaseType) -> bool {
        Self::int_rank(base) > 0 || Self::is_fp(base)
    }

    /// Numeric, or a pointer when the caller allows pointer coercion.
    pub fn is_numeric_or_pointer(base: BaseType, allow_pointers: bool) -> bool {
        Self::is_numeric(base) || (allow_pointers && base == BaseType::Pointer)
    }

    /// Human-readable type name for diagnostics.
    pub fn display(&self, t: TypeId, interner: &Interner) -> String {
        let desc = self.desc(t);
        let tag = |prefix: &str| match desc.ident {
            Some(id) => format!("{} {}", prefix, interner.resolve(id)),
            None => prefix.to_owned(),
        };
        match desc.base {
            BaseType::Void => "void".into(),
            BaseType::Char => "char".into(),
            BaseType::UnsignedChar => "unsigned char".into(),
            BaseType::Short => "short".into(),
            BaseType::UnsignedShort => "unsigned short".into(),
            BaseType::Int => "int".into(),
            BaseType::UnsignedInt => "unsigned int".into(),
            BaseType::Long => "long".into(),
            BaseType::UnsignedLong => "unsigned long".into(),
            BaseType::LongLong => "long long".into(),
            BaseType::UnsignedLongLong => "unsigned long long".into(),
            BaseType::Float => "float".into(),
            BaseType::Double => "double".into(),
            BaseType::Pointer => format!("{} *", self.display(desc.from.unwrap_or(VOID), interner)),
            BaseType::Array => format!(
                "{} [{}]",
                self.display(desc.from.unwrap_or(VOID), interner),
                desc.array_size
            ),
            BaseType::Struct => tag("struct"),
            BaseType::Union => tag("union"),
            BaseType::Enum => tag("enum"),
            BaseType::Function => "function".into(),
            BaseType::Macro => "macro".into(),
            BaseType::GotoLabel => "goto label".into(),
            BaseType::TypeKind => "type".into(),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derived_types_are_interned() {
        let mut reg = TypeRegistry::new();
        let p1 = reg.get_matching(INT, BaseType::Pointer, 0, None);
        let p2 = reg.get_matching(INT, BaseType::Pointer, 0, None);
        assert_eq!(p1, p2);
        let a1 = reg.get_matching(INT, BaseType::Array, 6, None);
        let a2 = reg.get_matching(INT, BaseType::Array, 5, None);
        assert_ne!(a1, a2);
        assert_eq!(reg.size_of(a1), 24);
        assert_eq!(reg.size_of(p1), 8);
    }

    #[test]
    fn lp64_sizes() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.size_of(CHAR), 1);
        assert_eq!(reg.size_of(SHORT), 2);
        assert_eq!(reg.size_of(INT), 4);
        assert_eq!(reg.size_of(LONG), 8);
        assert_eq!(reg.size_of(ULONG), 8);
        assert_eq!(reg.size_of(LONGLONG), 8);
        assert_eq!(reg.size_of(FLOAT), 4);
        assert_eq!(reg.size_of(DOUBLE), 8);
        assert_eq!(reg.size_of(reg.void_ptr), 8);
    }

    #[test]
    fn rank_and_signedness_queries() {
        assert_eq!(TypeRegistry::int_rank(BaseType::Char), 1);
        assert_eq!(TypeRegistry::int_rank(BaseType::UnsignedLongLong), 5);
        assert!(TypeRegistry::is_unsigned(BaseType::UnsignedInt));
        assert!(!TypeRegistry::is_unsigned(BaseType::Int));
        assert_eq!(
            TypeRegistry::unsigned_counterpart(BaseType::Long),
            BaseType::UnsignedLong
        );
        assert!(TypeRegistry::is_numeric(BaseType::Double));
        assert!(!TypeRegistry::is_numeric(BaseType::Pointer));
        assert!(TypeRegistry::is_numeric_or_pointer(BaseType::Pointer, true));
    }

    #[test]
    fn display_formats_nested_types() {
        let mut reg = TypeRegistry::new();
        let interner = Interner::new();
        let pp = reg.get_matching(reg.char_ptr, BaseType::Pointer, 0, None);
        assert_eq!(reg.display(pp, &interner), "char * *");
        let arr = reg.get_matching(INT, BaseType::Array, 4, None);
        assert_eq!(reg.display(arr, &interner), "int [4]");
    }
}
