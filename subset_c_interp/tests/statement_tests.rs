//! Control flow, scoping, declarations, functions and macros.

use pretty_assertions::assert_eq;
use subset_c_interp::run_source;

fn run(src: &str) -> (i32, String) {
    run_source(src).expect("program should run")
}

fn check(src: &str) {
    let (status, _) = run(src);
    assert_eq!(status, 0, "program exited with {status}");
}

#[test]
fn if_else_chains() {
    let (_, out) = run(r#"
#include <stdio.h>
int classify(int x) {
    if (x < 0) return -1;
    else if (x == 0) return 0;
    else return 1;
}
int main() {
    printf("%d %d %d\n", classify(-5), classify(0), classify(9));
    return 0;
}
"#);
    assert_eq!(out, "-1 0 1\n");
}

#[test]
fn while_and_do_while() {
    check(r#"
#include <assert.h>
int main() {
    int n = 0;
    int i = 0;
    while (i < 5) { n += i; i++; }
    assert(n == 10);
    i = 0;
    do { i++; } while (i < 3);
    assert(i == 3);
    /* a do-while body always runs once */
    i = 0;
    do { i++; } while (0);
    assert(i == 1);
    return 0;
}
"#);
}

#[test]
fn for_loops_with_break_and_continue() {
    check(r#"
#include <assert.h>
int main() {
    int sum = 0;
    int i;
    for (i = 0; i < 10; i++) {
        if (i == 3) continue;
        if (i == 7) break;
        sum += i;
    }
    assert(sum == 0 + 1 + 2 + 4 + 5 + 6);
    assert(i == 7);
    return 0;
}
"#);
}

#[test]
fn nested_loops() {
    check(r#"
#include <assert.h>
int main() {
    int count = 0;
    int i;
    int j;
    for (i = 0; i < 3; i++) {
        for (j = 0; j < 4; j++) {
            if (j == 2) break;
            count++;
        }
    }
    assert(count == 6);
    return 0;
}
"#);
}

#[test]
fn switch_with_fallthrough_and_default() {
    let (_, out) = run(r#"
#include <stdio.h>
const char *dummy;
int describe(int x) {
    int r = 0;
    switch (x) {
    case 1:
        r += 1;
    case 2:
        r += 2;
        break;
    case 3:
        r = 30;
        break;
    default:
        r = -1;
        break;
    }
    return r;
}
int main() {
    printf("%d %d %d %d\n", describe(1), describe(2), describe(3), describe(99));
    return 0;
}
"#);
    assert_eq!(out, "3 2 30 -1\n");
}

#[test]
fn goto_forward_and_backward() {
    check(r#"
#include <assert.h>
int main() {
    int n = 0;
    goto skip;
    n = 100;
skip:
    assert(n == 0);
    /* a backward goto makes a loop */
again:
    n++;
    if (n < 3) goto again;
    assert(n == 3);
    return 0;
}
"#);
}

#[test]
fn block_scoping_shadows_and_restores() {
    check(r#"
#include <assert.h>
int x = 1;
int main() {
    assert(x == 1);
    {
        int x = 2;
        assert(x == 2);
    }
    assert(x == 1);
    return 0;
}
"#);
}

#[test]
fn loop_body_redeclaration_reinitializes() {
    check(r#"
#include <assert.h>
int main() {
    int i = 0;
    while (i < 3) {
        int y = 0;
        y++;
        assert(y == 1);
        i++;
    }
    return 0;
}
"#);
}

#[test]
fn variable_is_not_visible_after_its_block() {
    let err = run_source(
        r#"
int main() {
    { int inner = 5; }
    return inner;
}
"#,
    )
    .unwrap_err();
    assert_eq!(err.kind, subset_c_interp::ErrorKind::Name);
    assert!(err.message.contains("out of scope"), "{}", err.message);
}

#[test]
fn static_locals_persist_across_calls() {
    check(r#"
#include <assert.h>
int f() {
    static int k;
    return ++k;
}
int g() {
    static int k;
    return ++k;
}
int main() {
    assert(f() == 1);
    assert(f() == 2);
    assert(f() == 3);
    /* a same-named static in another function is separate storage */
    assert(g() == 1);
    assert(f() == 4);
    return 0;
}
"#);
}

#[test]
fn static_initializer_runs_once() {
    check(r#"
#include <assert.h>
int next() {
    static int k = 10;
    return k++;
}
int main() {
    assert(next() == 10);
    assert(next() == 11);
    assert(next() == 12);
    return 0;
}
"#);
}

#[test]
fn recursion() {
    check(r#"
#include <assert.h>
int fact(int n) {
    if (n <= 1) return 1;
    return n * fact(n - 1);
}
int fib(int n) {
    if (n < 2) return n;
    return fib(n - 1) + fib(n - 2);
}
int main() {
    assert(fact(10) == 3628800);
    assert(fib(10) == 55);
    return 0;
}
"#);
}

#[test]
fn prototypes_resolve_at_call_time() {
    check(r#"
#include <assert.h>
int helper(int x);
int main() {
    assert(helper(4) == 8);
    return 0;
}
int helper(int x) { return x * 2; }
"#);
}

#[test]
fn void_functions_and_early_return() {
    check(r#"
#include <assert.h>
int n = 0;
void bump(int times) {
    if (times <= 0) return;
    n += times;
}
int main() {
    bump(0);
    assert(n == 0);
    bump(5);
    assert(n == 5);
    return 0;
}
"#);
}

#[test]
fn array_arguments_alias_caller_storage() {
    check(r#"
#include <assert.h>
void fill(int dest[], int n) {
    int i;
    for (i = 0; i < n; i++) dest[i] = i + 1;
}
int main() {
    int a[4];
    fill(a, 4);
    assert(a[0] == 1 && a[3] == 4);
    return 0;
}
"#);
}

#[test]
fn structs_and_unions() {
    check(r#"
#include <assert.h>
struct point {
    int x;
    int y;
};
union pun {
    int i;
    char c;
};
int main() {
    struct point pt;
    struct point *pp;
    union pun u;
    pt.x = 3;
    pt.y = 4;
    assert(pt.x + pt.y == 7);
    pp = &pt;
    pp->x = 10;
    assert(pt.x == 10);
    u.i = 65;
    assert(u.c == 'A');
    assert(sizeof(struct point) == 8);
    return 0;
}
"#);
}

#[test]
fn struct_assignment_copies_bytes() {
    check(r#"
#include <assert.h>
struct pair { int a; int b; };
int main() {
    struct pair p;
    struct pair q;
    p.a = 1;
    p.b = 2;
    q = p;
    q.a = 99;
    assert(p.a == 1 && q.a == 99 && q.b == 2);
    return 0;
}
"#);
}

#[test]
fn nested_struct_member_access() {
    check(r#"
#include <assert.h>
struct inner { int v; };
struct outer { struct inner in; int w; };
int main() {
    struct outer o;
    o.in.v = 5;
    o.w = 6;
    assert(o.in.v + o.w == 11);
    return 0;
}
"#);
}

#[test]
fn enums_define_integer_constants() {
    check(r#"
#include <assert.h>
enum color { RED, GREEN = 5, BLUE };
int main() {
    assert(RED == 0);
    assert(GREEN == 5);
    assert(BLUE == 6);
    enum color c = GREEN;
    assert(c == 5);
    return 0;
}
"#);
}

#[test]
fn typedefs() {
    check(r#"
#include <assert.h>
typedef int myint;
typedef unsigned long ulong_t;
int main() {
    myint x = 5;
    ulong_t big = 1;
    assert(x == 5);
    assert(sizeof(myint) == 4);
    assert(sizeof(ulong_t) == 8);
    assert((myint)7.9 == 7);
    assert(big == 1);
    return 0;
}
"#);
}

#[test]
fn array_initializers() {
    check(r#"
#include <assert.h>
int g[3] = {7, 8, 9};
int main() {
    int a[3] = {1, 2, 3};
    int b[] = {4, 5, 6, 7};
    int m[2][2] = {{1, 2}, {3, 4}};
    assert(a[0] == 1 && a[2] == 3);
    assert(sizeof(b) == 16 && b[3] == 7);
    assert(g[1] == 8);
    assert(m[0][0] == 1 && m[1][0] == 3 && m[1][1] == 4);
    return 0;
}
"#);
}

#[test]
fn char_array_from_string_literal() {
    check(r#"
#include <assert.h>
int main() {
    char s[] = "abcd";
    char t[10] = "xy";
    assert(sizeof(s) == 5);
    assert(s[0] == 'a' && s[3] == 'd' && s[4] == 0);
    assert(t[0] == 'x' && t[2] == 0);
    s[0] = 'A';
    assert(s[0] == 'A');
    return 0;
}
"#);
}

#[test]
fn simple_and_parameterized_macros() {
    check(r#"
#include <assert.h>
#define LIMIT 10
#define SQUARE(x) ((x) * (x))
#define MAX(a, b) ((a) > (b) ? (a) : (b))
int main() {
    assert(LIMIT == 10);
    assert(SQUARE(5) == 25);
    assert(SQUARE(LIMIT) == 100);
    assert(MAX(3, 9) == 9);
    assert(MAX(9, 3) == 9);
    return 0;
}
"#);
}

#[test]
fn macro_arguments_are_evaluated_values() {
    check(r#"
#include <assert.h>
#define DOUBLE(x) ((x) + (x))
int n = 0;
int bump() { n++; return 3; }
int main() {
    /* call-by-value of the evaluated expression: bump runs once */
    int r = DOUBLE(bump());
    assert(r == 6);
    assert(n == 1);
    return 0;
}
"#);
}

#[test]
fn global_initialization_order() {
    check(r#"
#include <assert.h>
int a = 5;
int b = 7;
int main() {
    assert(a + b == 12);
    a = b * 2;
    assert(a == 14);
    return 0;
}
"#);
}

#[test]
fn exit_status_from_main() {
    let (status, _) = run("int main() { return 42; }");
    assert_eq!(status, 42);
    let (status, _) = run(r#"
#include <stdlib.h>
int main() { exit(7); return 0; }
"#);
    assert_eq!(status, 7);
}

#[test]
fn main_receives_arguments() {
    // run_source passes the program name as argv[0]
    check(r#"
#include <assert.h>
#include <string.h>
int main(int argc, char **argv) {
    assert(argc == 1);
    assert(strcmp(argv[0], "test.c") == 0);
    return 0;
}
"#);
}
