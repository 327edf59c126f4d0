//! string.h on arena memory.

use crate::error::CResult;
use crate::interp::{Interp, ParseState};
use crate::types::BaseType;
use crate::value::Value;

pub fn register(interp: &mut Interp) -> CResult<()> {
    interp.library_add(&[
        (c_strlen, "int strlen(char *);"),
        (c_strcpy, "char *strcpy(char *, char *);"),
        (c_strncpy, "char *strncpy(char *, char *, int);"),
        (c_strcmp, "int strcmp(char *, char *);"),
        (c_strncmp, "int strncmp(char *, char *, int);"),
        (c_strcat, "char *strcat(char *, char *);"),
        (c_strchr, "char *strchr(char *, int);"),
        (c_memset, "void *memset(void *, int, int);"),
        (c_memcpy, "void *memcpy(void *, void *, int);"),
    ])
}

fn c_strlen(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let p = interp.read_ptr(ps, args[0].addr)?;
    let s = interp.read_cstr(ps, p)?;
    interp.write_int_as(ps, ret.addr, BaseType::Int, s.len() as i64)
}

fn c_strcpy(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let dest = interp.read_ptr(ps, args[0].addr)?;
    let src = interp.read_ptr(ps, args[1].addr)?;
    let mut s = interp.read_cstr(ps, src)?;
    s.push(0);
    interp.arena.write(dest, &s);
    interp.write_ptr(ps, ret.addr, dest)
}

fn c_strncpy(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let dest = interp.read_ptr(ps, args[0].addr)?;
    let src = interp.read_ptr(ps, args[1].addr)?;
    let n = interp.coerce_int(ps, &args[2])?.max(0) as usize;
    let mut s = interp.read_cstr(ps, src)?;
    s.truncate(n);
    while s.len() < n {
        s.push(0);
    }
    interp.arena.write(dest, &s);
    interp.write_ptr(ps, ret.addr, dest)
}

fn c_strcmp(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let a = interp.read_ptr(ps, args[0].addr)?;
    let b = interp.read_ptr(ps, args[1].addr)?;
    let sa = interp.read_cstr(ps, a)?;
    let sb = interp.read_cstr(ps, b)?;
    let r = match sa.cmp(&sb) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    };
    interp.write_int_as(ps, ret.addr, BaseType::Int, r)
}

fn c_strncmp(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let a = interp.read_ptr(ps, args[0].addr)?;
    let b = interp.read_ptr(ps, args[1].addr)?;
    let n = interp.coerce_int(ps, &args[2])?.max(0) as usize;
    let mut sa = interp.read_cstr(ps, a)?;
    let mut sb = interp.read_cstr(ps, b)?;
    sa.truncate(n);
    sb.truncate(n);
    let r = match sa.cmp(&sb) {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    };
    interp.write_int_as(ps, ret.addr, BaseType::Int, r)
}

fn c_strcat(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let dest = interp.read_ptr(ps, args[0].addr)?;
    let src = interp.read_ptr(ps, args[1].addr)?;
    let old = interp.read_cstr(ps, dest)?;
    let mut s = interp.read_cstr(ps, src)?;
    s.push(0);
    interp.arena.write(dest + old.len() as u64, &s);
    interp.write_ptr(ps, ret.addr, dest)
}

fn c_strchr(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let p = interp.read_ptr(ps, args[0].addr)?;
    let c = interp.coerce_int(ps, &args[1])? as u8;
    let s = interp.read_cstr(ps, p)?;
    let addr = match s.iter().position(|&b| b == c) {
        Some(i) => p + i as u64,
        None if c == 0 => p + s.len() as u64,
        None => 0,
    };
    interp.write_ptr(ps, ret.addr, addr)
}

fn c_memset(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let dest = interp.read_ptr(ps, args[0].addr)?;
    let c = interp.coerce_int(ps, &args[1])? as u8;
    let n = interp.coerce_int(ps, &args[2])?.max(0) as usize;
    interp.arena.write(dest, &vec![c; n]);
    interp.write_ptr(ps, ret.addr, dest)
}

fn c_memcpy(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let dest = interp.read_ptr(ps, args[0].addr)?;
    let src = interp.read_ptr(ps, args[1].addr)?;
    let n = interp.coerce_int(ps, &args[2])?.max(0) as usize;
    interp.arena.copy(dest, src, n);
    interp.write_ptr(ps, ret.addr, dest)
}
