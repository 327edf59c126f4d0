//! End-to-end programs: the ADPCM pointer-walk kernel and the bit-shift
//! width program, plus cross-cutting invariants.

use pretty_assertions::assert_eq;
use subset_c_interp::{run_source, Interpreter};

#[test]
fn adpcm_pointer_step() {
    let src = r#"
#include <stdio.h>
#include <assert.h>

int a[6];
int b[6] = {0, 1, 2, 3, 4, 5};

int filtez(int *bpl, int *dlt) {
    int i;
    long zl;
    zl = (long)(*bpl++) * (*dlt++);
    for (i = 1; i < 6; i++)
        zl += (long)(*bpl++) * (*dlt++);
    return (int)(zl >> 14);
}

int main() {
    int r = filtez(&a[0], &b[0]);
    /* all products are zero: a is zero-filled */
    assert(r == 0);
    /* parameters were local copies of the pointers */
    assert(a[0] == 0 && a[5] == 0);
    assert(b[0] == 0 && b[5] == 5);
    return !(a == 0 && b == 8);
}
"#;
    let (status, _) = run_source(src).expect("program should run");
    // the array name decays to a nonzero address, so a == 0 is false and
    // the right side of && is never evaluated
    assert_eq!(status, 1);
}

#[test]
fn bit_shift_width_matches_the_host() {
    let src = r#"
#include <stdio.h>

#define BITSPERLONG 32
#define TOP2BITS(x) ((x & (3L << (BITSPERLONG-2))) >> (BITSPERLONG-2))

int main(void) {
    unsigned long a = 1;
    unsigned long b = 0;
    int i;

    printf("%2d: 0x%016lx\n", 0, a);
    for (i = 1; i < 65; i++) {
        a <<= 1;
        b = TOP2BITS(a);
        printf("%2d: 0x%016lx 0x%lx\n", i, a, b);
    }

    unsigned long x = 0;
    x = TOP2BITS(0x40000000);
    printf("0x%lx\n", x);

    unsigned long y = TOP2BITS(0x40000000);
    printf("0x%lx\n", y);

    return 0;
}
"#;
    let (status, out) = run_source(src).expect("program should run");
    assert_eq!(status, 0);

    // mirror of the program with host 64-bit unsigned long arithmetic
    let mut a: u64 = 1;
    let mut expected = format!("{:2}: 0x{:016x}\n", 0, a);
    for i in 1..65u32 {
        a = a.wrapping_shl(1);
        let b = ((a as i64 & (3i64 << 30)) as u64) >> 30;
        expected.push_str(&format!("{i:2}: 0x{a:016x} 0x{b:x}\n"));
    }
    expected.push_str("0x1\n0x1\n");
    assert_eq!(out, expected);
}

#[test]
fn arena_stack_returns_to_entry_after_each_statement() {
    let mut interpreter = Interpreter::with_captured_output(1024 * 1024);
    interpreter.include_all_system_headers().unwrap();
    let entry = interpreter.arena_stack_pos();
    interpreter
        .parse_source(
            "leak.c",
            r#"
int square(int x) { return x * x; }
int g;
"#,
            false,
        )
        .unwrap();
    // globals live on the heap side; the stack side must be clean
    assert_eq!(interpreter.arena_stack_pos(), entry);
    interpreter
        .parse_source("calls.c", "g = square(7) + square(2) * square(3);", false)
        .unwrap();
    assert_eq!(interpreter.arena_stack_pos(), entry);
    interpreter.parse_source("check.c", "g = g - 85;", false).unwrap();
    assert_eq!(interpreter.arena_stack_pos(), entry);
}

#[test]
fn lvalue_integrity_across_every_scalar_width() {
    let src = r#"
#include <assert.h>
int main() {
    char c; unsigned char uc;
    short s; unsigned short us;
    int i; unsigned int ui;
    long l; unsigned long ul;
    c = 300; assert(c == 44);
    uc = 300; assert(uc == 44);
    s = 70000; assert(s == 4464);
    us = 70000; assert(us == 4464);
    i = 5000000000; assert(i == 705032704);
    ui = 4294967295; assert(ui + 1 == 0);
    l = 5000000000; assert(l == 5000000000);
    ul = 1; assert(ul - 2 == 18446744073709551615UL);
    return 0;
}
"#;
    let (status, _) = run_source(src).expect("program should run");
    assert_eq!(status, 0);
}

#[test]
fn two_interpreters_are_independent() {
    let mut one = Interpreter::with_captured_output(256 * 1024);
    let mut two = Interpreter::with_captured_output(256 * 1024);
    one.include_all_system_headers().unwrap();
    two.include_all_system_headers().unwrap();
    one.parse_source("a.c", "int shared = 1;", false).unwrap();
    // the other instance never sees the first one's globals
    let err = two.parse_source("b.c", "int x = shared;", false).unwrap_err();
    assert_eq!(err.kind, subset_c_interp::ErrorKind::Name);
}