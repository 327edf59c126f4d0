//! stdio.h: formatted output and character IO.

use std::io::Read;

use crate::error::{CResult, ErrorKind};
use crate::interp::{Interp, ParseState};
use crate::types::BaseType;
use crate::value::Value;

pub fn register(interp: &mut Interp) -> CResult<()> {
    interp.library_add(&[
        (c_printf, "int printf(char *, ...);"),
        (c_sprintf, "int sprintf(char *, char *, ...);"),
        (c_putchar, "int putchar(int);"),
        (c_puts, "int puts(char *);"),
        (c_getchar, "int getchar();"),
    ])
}

fn c_printf(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    if args.is_empty() {
        return Err(interp.err(ps, ErrorKind::Runtime, "not enough arguments to 'printf'"));
    }
    let fmt_ptr = interp.read_ptr(ps, args[0].addr)?;
    let fmt = interp.read_cstr(ps, fmt_ptr)?;
    let out = format_c(interp, ps, &fmt, &args[1..])?;
    let n = out.len() as i64;
    interp.write_out(&out);
    interp.write_int_as(ps, ret.addr, BaseType::Int, n)
}

fn c_sprintf(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    if args.len() < 2 {
        return Err(interp.err(ps, ErrorKind::Runtime, "not enough arguments to 'sprintf'"));
    }
    let dest = interp.read_ptr(ps, args[0].addr)?;
    let fmt_ptr = interp.read_ptr(ps, args[1].addr)?;
    let fmt = interp.read_cstr(ps, fmt_ptr)?;
    let mut out = format_c(interp, ps, &fmt, &args[2..])?;
    let n = out.len() as i64;
    out.push(0);
    if !interp.arena.write(dest, &out) {
        return Err(interp.err(ps, ErrorKind::Runtime, "invalid memory access"));
    }
    interp.write_int_as(ps, ret.addr, BaseType::Int, n)
}

fn c_putchar(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let c = interp.coerce_int(ps, &args[0])? as u8;
    interp.write_out(&[c]);
    interp.write_int_as(ps, ret.addr, BaseType::Int, i64::from(c))
}

fn c_puts(interp: &mut Interp, ps: &ParseState, ret: &Value, args: &[Value]) -> CResult<()> {
    let p = interp.read_ptr(ps, args[0].addr)?;
    let mut s = interp.read_cstr(ps, p)?;
    s.push(b'\n');
    interp.write_out(&s);
    interp.write_int_as(ps, ret.addr, BaseType::Int, 0)
}

fn c_getchar(interp: &mut Interp, ps: &ParseState, ret: &Value, _args: &[Value]) -> CResult<()> {
    let mut buf = [0u8; 1];
    let v = match std::io::stdin().read(&mut buf) {
        Ok(1) => i64::from(buf[0]),
        _ => -1,
    };
    interp.write_int_as(ps, ret.addr, BaseType::Int, v)
}

/// The conversions printf/sprintf understand.
#[derive(Debug, Clone, Copy, Default)]
struct FmtSpec {
    left: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    /// 0 = int, 1 = long, 2 = long long.
    longs: u8,
}

/// Render a C format string against evaluated arguments.
fn format_c(interp: &mut Interp, ps: &ParseState, fmt: &[u8], args: &[Value]) -> CResult<Vec<u8>> {
    let mut out = Vec::with_capacity(fmt.len());
    let mut next_arg = 0usize;
    let mut take = |interp: &Interp| -> CResult<Value> {
        let v = args.get(next_arg).copied().ok_or_else(|| {
            interp.err(ps, ErrorKind::Runtime, "too few arguments for format string")
        })?;
        next_arg += 1;
        Ok(v)
    };
    let mut i = 0usize;
    while i < fmt.len() {
        if fmt[i] != b'%' {
            out.push(fmt[i]);
            i += 1;
            continue;
        }
        i += 1;
        if i >= fmt.len() {
            break;
        }
        if fmt[i] == b'%' {
            out.push(b'%');
            i += 1;
            continue;
        }
        let mut spec = FmtSpec::default();
        while i < fmt.len() {
            match fmt[i] {
                b'-' => spec.left = true,
                b'0' => spec.zero = true,
                b'+' | b' ' | b'#' => {}
                _ => break,
            }
            i += 1;
        }
        while i < fmt.len() && fmt[i].is_ascii_digit() {
            spec.width = spec.width * 10 + (fmt[i] - b'0') as usize;
            i += 1;
        }
        if i < fmt.len() && fmt[i] == b'.' {
            i += 1;
            let mut p = 0usize;
            while i < fmt.len() && fmt[i].is_ascii_digit() {
                p = p * 10 + (fmt[i] - b'0') as usize;
                i += 1;
            }
            spec.precision = Some(p);
        }
        while i < fmt.len() && (fmt[i] == b'l' || fmt[i] == b'h') {
            if fmt[i] == b'l' {
                spec.longs += 1;
            }
            i += 1;
        }
        if i >= fmt.len() {
            break;
        }
        let conv = fmt[i];
        i += 1;
        let rendered: Vec<u8> = match conv {
            b'd' | b'i' => {
                let v = interp.coerce_int(ps, &take(interp)?)?;
                pad(v.to_string().into_bytes(), &spec)
            }
            b'u' => {
                let v = mask_unsigned(interp.coerce_uint(ps, &take(interp)?)?, spec.longs);
                pad(v.to_string().into_bytes(), &spec)
            }
            b'x' => {
                let v = mask_unsigned(interp.coerce_uint(ps, &take(interp)?)?, spec.longs);
                pad(format!("{v:x}").into_bytes(), &spec)
            }
            b'X' => {
                let v = mask_unsigned(interp.coerce_uint(ps, &take(interp)?)?, spec.longs);
                pad(format!("{v:X}").into_bytes(), &spec)
            }
            b'o' => {
                let v = mask_unsigned(interp.coerce_uint(ps, &take(interp)?)?, spec.longs);
                pad(format!("{v:o}").into_bytes(), &spec)
            }
            b'c' => {
                let v = interp.coerce_int(ps, &take(interp)?)? as u8;
                pad(vec![v], &spec)
            }
            b's' => {
                let p = interp.read_ptr(ps, take(interp)?.addr)?;
                let mut s = interp.read_cstr(ps, p)?;
                if let Some(prec) = spec.precision {
                    s.truncate(prec);
                }
                pad(s, &spec)
            }
            b'f' | b'F' => {
                let v = interp.coerce_fp(ps, &take(interp)?)?;
                let prec = spec.precision.unwrap_or(6);
                pad(format!("{v:.prec$}").into_bytes(), &spec)
            }
            b'e' | b'E' | b'g' | b'G' => {
                let v = interp.coerce_fp(ps, &take(interp)?)?;
                pad(format!("{v}").into_bytes(), &spec)
            }
            b'p' => {
                let p = interp.read_ptr(ps, take(interp)?.addr)?;
                pad(format!("0x{p:x}").into_bytes(), &spec)
            }
            other => {
                out.push(b'%');
                out.push(other);
                continue;
            }
        };
        out.extend_from_slice(&rendered);
    }
    Ok(out)
}

/// Varargs read a 32-bit unsigned unless a length modifier widens them.
fn mask_unsigned(v: u64, longs: u8) -> u64 {
    if longs == 0 {
        v & 0xffff_ffff
    } else {
        v
    }
}

fn pad(mut s: Vec<u8>, spec: &FmtSpec) -> Vec<u8> {
    if s.len() >= spec.width {
        return s;
    }
    let fill = if spec.zero && !spec.left { b'0' } else { b' ' };
    let n = spec.width - s.len();
    if spec.left {
        s.extend(std::iter::repeat(b' ').take(n));
        s
    } else {
        let mut out = vec![fill; n];
        out.append(&mut s);
        out
    }
}
