//! Expression evaluator semantics: operators, conversions, pointers,
//! short-circuiting and casts.

use pretty_assertions::assert_eq;
use subset_c_interp::run_source;

/// Run a complete program and return (exit status, captured output).
fn run(src: &str) -> (i32, String) {
    run_source(src).expect("program should run")
}

/// Run a program that reports through assert(); asserts clean exit.
fn check(src: &str) {
    let (status, _) = run(src);
    assert_eq!(status, 0, "program exited with {status}");
}

#[test]
fn arithmetic_precedence() {
    let (_, out) = run(r#"
#include <stdio.h>
int main() {
    printf("%d %d %d %d\n", 2 + 3 * 4, (2 + 3) * 4, 20 / 4 - 1, 17 % 5);
    return 0;
}
"#);
    assert_eq!(out, "14 20 4 2\n");
}

#[test]
fn unary_operators() {
    check(r#"
#include <assert.h>
int main() {
    int x = 5;
    assert(-x == -5);
    assert(+x == 5);
    assert(!x == 0);
    assert(!0 == 1);
    assert(~0 == -1);
    assert(~5 == -6);
    return 0;
}
"#);
}

#[test]
fn increment_and_decrement() {
    check(r#"
#include <assert.h>
int main() {
    int i = 5;
    assert(i++ == 5);
    assert(i == 6);
    assert(++i == 7);
    assert(i-- == 7);
    assert(--i == 5);
    return 0;
}
"#);
}

#[test]
fn compound_assignment() {
    check(r#"
#include <assert.h>
int main() {
    int x = 10;
    x += 5; assert(x == 15);
    x -= 3; assert(x == 12);
    x *= 2; assert(x == 24);
    x /= 4; assert(x == 6);
    x %= 4; assert(x == 2);
    x <<= 3; assert(x == 16);
    x >>= 2; assert(x == 4);
    x |= 3; assert(x == 7);
    x &= 5; assert(x == 5);
    x ^= 1; assert(x == 4);
    return 0;
}
"#);
}

#[test]
fn char_compound_assignment_narrows_through_destination() {
    // 100 + 200 computed wide, then narrowed through the signed char
    let (_, out) = run(r#"
#include <stdio.h>
int main() {
    char c = 100;
    c += 200;
    printf("%d\n", c);
    return 0;
}
"#);
    assert_eq!(out, "44\n");
}

#[test]
fn integer_promotion_of_narrow_operands() {
    check(r#"
#include <assert.h>
int main() {
    char a = 100;
    char b = 100;
    int r = a + b;
    assert(r == 200);
    assert(sizeof(a + b) == sizeof(int));
    return 0;
}
"#);
}

#[test]
fn signed_char_to_unsigned_int_conversion() {
    check(r#"
#include <assert.h>
int main() {
    signed char c = -1;
    unsigned int u = c;
    assert(u > 0);
    return 0;
}
"#);
}

#[test]
fn signed_right_shift_is_arithmetic() {
    check(r#"
#include <assert.h>
int main() {
    int x = -8;
    assert((x >> 1) == -4);
    unsigned int u = 0x80000000;
    assert((u >> 31) == 1);
    return 0;
}
"#);
}

#[test]
fn comparisons_yield_int() {
    check(r#"
#include <assert.h>
int main() {
    assert((1 < 2) == 1);
    assert((2 <= 1) == 0);
    assert((3 == 3) == 1);
    assert((3 != 3) == 0);
    assert(sizeof(1 < 2) == sizeof(int));
    return 0;
}
"#);
}

#[test]
fn floating_point_arithmetic() {
    let (_, out) = run(r#"
#include <stdio.h>
int main() {
    double d = 1.5 + 2.25;
    float f = 0.5f;
    printf("%.2f %.1f %d\n", d, f * 4.0, 1.5 < 2.0);
    return 0;
}
"#);
    assert_eq!(out, "3.75 2.0 1\n");
}

#[test]
fn float_to_int_assignment_truncates() {
    check(r#"
#include <assert.h>
int main() {
    int x;
    x = 3.9;
    assert(x == 3);
    double d = 7;
    assert(d == 7.0);
    return 0;
}
"#);
}

#[test]
fn casts() {
    check(r#"
#include <assert.h>
int main() {
    assert((int)3.9 == 3);
    assert((char)300 == 44);
    assert((unsigned char)(-1) == 255);
    assert((long)(int)7 == 7);
    double d = (double)3;
    assert(d == 3.0);
    return 0;
}
"#);
}

#[test]
fn sizeof_types_and_expressions() {
    check(r#"
#include <assert.h>
int main() {
    int a[6];
    int *p = &a[0];
    assert(sizeof(char) == 1);
    assert(sizeof(short) == 2);
    assert(sizeof(int) == 4);
    assert(sizeof(long) == 8);
    assert(sizeof(unsigned long long) == 8);
    assert(sizeof(double) == 8);
    assert(sizeof(int *) == 8);
    assert(sizeof(a) == 24);
    assert(sizeof(*p) == 4);
    return 0;
}
"#);
}

#[test]
fn address_of_and_dereference() {
    check(r#"
#include <assert.h>
int main() {
    int x = 42;
    int *p = &x;
    assert(*p == 42);
    *p = 7;
    assert(x == 7);
    *p += 1;
    assert(x == 8);
    return 0;
}
"#);
}

#[test]
fn pointer_arithmetic_consistency() {
    check(r#"
#include <assert.h>
int main() {
    int a[6];
    int i;
    for (i = 0; i < 6; i++) a[i] = i * 10;
    int *p = &a[0];
    int *q = p + 3;
    assert(q - p == 3);
    assert(*(p + 3) == a[3]);
    assert(p[3] == 30);
    q--;
    assert(*q == 20);
    return 0;
}
"#);
}

#[test]
fn pointer_null_checks() {
    check(r#"
#include <assert.h>
int main() {
    int *p = 0;
    assert(p == 0);
    assert(!p);
    int x = 1;
    p = &x;
    assert(p != 0);
    assert(!p == 0);
    return 0;
}
"#);
}

#[test]
fn pointer_increment_walks_elements() {
    let (_, out) = run(r#"
#include <stdio.h>
int main() {
    int b[4] = {5, 6, 7, 8};
    int *p = &b[0];
    printf("%d %d %d\n", *p++, *p++, *p);
    return 0;
}
"#);
    assert_eq!(out, "5 6 7\n");
}

#[test]
fn short_circuit_and_skips_side_effects() {
    check(r#"
#include <assert.h>
int n = 0;
int f() { n++; return 1; }
int main() {
    int r = (0 && f());
    assert(n == 0 && r == 0);
    r = (1 || f());
    assert(n == 0 && r == 1);
    r = (1 && f());
    assert(n == 1 && r == 1);
    r = (0 || f());
    assert(n == 2 && r == 1);
    return 0;
}
"#);
}

#[test]
fn short_circuit_skips_assignments_too() {
    check(r#"
#include <assert.h>
int main() {
    int n = 0;
    int r = 0 && (n = 5);
    assert(n == 0 && r == 0);
    r = 1 || (n = 5);
    assert(n == 0 && r == 1);
    return 0;
}
"#);
}

#[test]
fn ternary_selects_and_evaluates_exactly_one_arm() {
    check(r#"
#include <assert.h>
int n = 0;
int f() { n++; return 5; }
int main() {
    int r = 1 ? 10 : 20;
    assert(r == 10);
    r = 0 ? 10 : 20;
    assert(r == 20);
    r = 1 ? 2 : f();
    assert(n == 0 && r == 2);
    r = 0 ? 2 : f();
    assert(n == 1 && r == 5);
    r = 1 ? f() : 2;
    assert(n == 2 && r == 5);
    return 0;
}
"#);
}

#[test]
fn nested_ternary() {
    check(r#"
#include <assert.h>
int main() {
    int a = 1;
    int r = a ? 10 : a ? 20 : 30;
    assert(r == 10);
    a = 0;
    r = a ? 10 : a ? 20 : 30;
    assert(r == 30);
    return 0;
}
"#);
}

#[test]
fn string_literals_share_storage() {
    check(r#"
#include <assert.h>
int main() {
    char *a = "xyz";
    char *b = "xyz";
    char *c = "other";
    assert(a == b);
    assert(a != c);
    assert(a[1] == 'y');
    return 0;
}
"#);
}

#[test]
fn usual_arithmetic_conversions_table() {
    check(r#"
#include <assert.h>
int main() {
    /* same signedness: higher rank wins */
    assert(sizeof(1 + 1L) == sizeof(long));
    /* unsigned operand of higher or equal rank wins */
    assert(sizeof(1 + 1U) == sizeof(unsigned int));
    assert(sizeof(1L + 1UL) == sizeof(unsigned long));
    /* narrow operands promote to int first */
    char c = 1;
    short s = 1;
    assert(sizeof(c + s) == sizeof(int));
    return 0;
}
"#);
}

#[test]
fn division_by_zero_is_fatal() {
    let err = run_source(
        r#"
int main() {
    int x = 1;
    int y = 0;
    return x / y;
}
"#,
    )
    .unwrap_err();
    assert_eq!(err.kind, subset_c_interp::ErrorKind::Runtime);
    assert!(err.message.contains("division by zero"), "{}", err.message);
}

#[test]
fn sixty_four_shifts_zero_an_unsigned_long() {
    let (_, out) = run(r#"
#include <stdio.h>
int main() {
    unsigned long a = 1;
    int i;
    for (i = 1; i < 65; i++) {
        a <<= 1;
    }
    printf("%lu\n", a);
    return 0;
}
"#);
    assert_eq!(out, "0\n");
}
