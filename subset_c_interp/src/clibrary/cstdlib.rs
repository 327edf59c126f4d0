//! stdlib.h: allocation on the arena heap, conversions, rand, exit.

use crate::error::{CError, CResult, ErrorKind};
use crate::interp::{Interp, ParseState};
use crate::types::BaseType;
use crate::value::Value;

pub fn register(interp: &mut Interp) -> CResult<()> {
    interp.library_add(&[
        (c_malloc, "void *malloc(int);"),
        (c_calloc, "void *calloc(int, int);"),
        (c_free, "void free(void *);"),
        (c_atoi, "int atoi(char *);"),
        (c_atof, "double atof(char *);"),
        (c_rand, "int rand();"),
        (c_srand, "void srand(int);"),
        (c_abs, "int abs(int);"),
        (c_exit, "void exit(int);"),
    ])
}

pub fn register_assert(interp: &mut Interp) -> CResult<()> {
    interp.library_add(&[(c_assert, "void assert(int);")])
}

fn c_malloc(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let n = interp.coerce_int(ps, &args[0])?.max(0) as usize;
    let addr = interp.arena.alloc_heap(n).unwrap_or(0);
    interp.write_ptr(ps, ret.addr, addr)
}

fn c_calloc(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let n = interp.coerce_int(ps, &args[0])?.max(0) as usize;
    let size = interp.coerce_int(ps, &args[1])?.max(0) as usize;
    // heap blocks come back zeroed already
    let addr = interp.arena.alloc_heap(n.saturating_mul(size)).unwrap_or(0);
    interp.write_ptr(ps, ret.addr, addr)
}

fn c_free(interp: &mut Interp, ps: &ParseState, _ret: &Value, args: &[Value]) -> CResult<()> {
    let p = interp.read_ptr(ps, args[0].addr)?;
    if p != 0 && !interp.arena.free_heap(p) {
        return Err(interp.err(ps, ErrorKind::Runtime, "free() of an invalid pointer"));
    }
    Ok(())
}

fn c_atoi(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let p = interp.read_ptr(ps, args[0].addr)?;
    let s = interp.read_cstr(ps, p)?;
    interp.write_int_as(ps, ret.addr, BaseType::Int, parse_int_prefix(&s))
}

fn c_atof(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let p = interp.read_ptr(ps, args[0].addr)?;
    let s = interp.read_cstr(ps, p)?;
    let text = String::from_utf8_lossy(&s);
    let trimmed = text.trim_start();
    let end = trimmed
        .char_indices()
        .take_while(|(i, c)| {
            c.is_ascii_digit() || *c == '.' || *c == 'e' || *c == 'E' || ((*c == '+' || *c == '-') && (*i == 0 || trimmed.as_bytes()[*i - 1].eq_ignore_ascii_case(&b'e')))
        })
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    let v = trimmed[..end].parse::<f64>().unwrap_or(0.0);
    interp.write_fp_as(ps, ret.addr, BaseType::Double, v)
}

fn parse_int_prefix(s: &[u8]) -> i64 {
    let mut i = 0;
    while i < s.len() && (s[i] == b' ' || s[i] == b'\t') {
        i += 1;
    }
    let neg = i < s.len() && s[i] == b'-';
    if neg || (i < s.len() && s[i] == b'+') {
        i += 1;
    }
    let mut v: i64 = 0;
    while i < s.len() && s[i].is_ascii_digit() {
        v = v.wrapping_mul(10).wrapping_add(i64::from(s[i] - b'0'));
        i += 1;
    }
    if neg {
        -v
    } else {
        v
    }
}

fn c_rand(interp: &mut Interp, ps: &ParseState, ret: &Value, _args: &[Value]) -> CResult<()> {
    // the classic LCG; deterministic across runs for a given seed
    interp.rand_state = interp
        .rand_state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    let v = ((interp.rand_state >> 33) & 0x7fff_ffff) as i64;
    interp.write_int_as(ps, ret.addr, BaseType::Int, v)
}

fn c_srand(interp: &mut Interp, ps: &ParseState, _ret: &Value, args: &[Value]) -> CResult<()> {
    interp.rand_state = interp.coerce_uint(ps, &args[0])?;
    Ok(())
}

fn c_abs(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let v = interp.coerce_int(ps, &args[0])?;
    interp.write_int_as(ps, ret.addr, BaseType::Int, v.wrapping_abs())
}

fn c_exit(interp: &mut Interp, ps: &ParseState, _ret: &Value, args: &[Value]) -> CResult<()> {
    let status = interp.coerce_int(ps, &args[0])? as i32;
    Err(CError::new(ErrorKind::Exit(status), format!("exit({status})")))
}

fn c_assert(interp: &mut Interp, ps: &ParseState, _ret: &Value, args: &[Value]) -> CResult<()> {
    if interp.coerce_int(ps, &args[0])? == 0 {
        return Err(interp.err(ps, ErrorKind::Runtime, "assertion failed"));
    }
    Ok(())
}
