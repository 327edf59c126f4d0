//! Host library coverage: stdio formatting, string.h, stdlib.h, math.h.

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
fn printf_conversions_and_widths() {
    let (_, out) = run(r#"
#include <stdio.h>
int main() {
    printf("%d|%5d|%-5d|%05d|\n", 42, 42, 42, 42);
    printf("%u %x %X %o\n", -1, 255, 255, 8);
    printf("%c%c %s\n", 'h', 'i', "there");
    printf("%ld %lu\n", 123456789012345, 123456789012345);
    printf("%%\n");
    return 0;
}
"#);
    assert_eq!(
        out,
        "42|   42|42   |00042|\n\
         4294967295 ff FF 10\n\
         hi there\n\
         123456789012345 123456789012345\n\
         %\n"
    );
}

#[test]
fn printf_returns_byte_count() {
    check(r#"
#include <stdio.h>
#include <assert.h>
int main() {
    int n = printf("abc\n");
    assert(n == 4);
    return 0;
}
"#);
}

#[test]
fn sprintf_writes_into_a_buffer() {
    check(r#"
#include <stdio.h>
#include <string.h>
#include <assert.h>
int main() {
    char buf[32];
    int n = sprintf(buf, "x=%d y=%s", 7, "ok");
    assert(n == 8);
    assert(strcmp(buf, "x=7 y=ok") == 0);
    return 0;
}
"#);
}

#[test]
fn putchar_and_puts() {
    let (_, out) = run(r#"
#include <stdio.h>
int main() {
    putchar('a');
    putchar('\n');
    puts("line");
    return 0;
}
"#);
    assert_eq!(out, "a\nline\n");
}

#[test]
fn string_functions() {
    check(r#"
#include <string.h>
#include <assert.h>
int main() {
    char buf[32];
    assert(strlen("hello") == 5);
    strcpy(buf, "hello");
    assert(strcmp(buf, "hello") == 0);
    assert(strcmp(buf, "help") < 0);
    assert(strcmp("b", "a") > 0);
    strcat(buf, " world");
    assert(strlen(buf) == 11);
    assert(strncmp(buf, "hello!", 5) == 0);
    char *p = strchr(buf, 'w');
    assert(p != 0);
    assert(*p == 'w');
    memset(buf, 0, 32);
    assert(buf[0] == 0 && strlen(buf) == 0);
    memcpy(buf, "abc", 4);
    assert(strcmp(buf, "abc") == 0);
    return 0;
}
"#);
}

#[test]
fn malloc_and_free() {
    check(r#"
#include <stdlib.h>
#include <assert.h>
int main() {
    int *p = (int *)malloc(10 * sizeof(int));
    int i;
    assert(p != 0);
    for (i = 0; i < 10; i++) p[i] = i * i;
    assert(p[9] == 81);
    free(p);
    /* calloc storage is zeroed */
    p = (int *)calloc(4, sizeof(int));
    assert(p[0] == 0 && p[3] == 0);
    free(p);
    return 0;
}
"#);
}

#[test]
fn atoi_and_atof() {
    check(r#"
#include <stdlib.h>
#include <assert.h>
int main() {
    assert(atoi("42") == 42);
    assert(atoi("-17") == -17);
    assert(atoi("  99x") == 99);
    assert(atoi("junk") == 0);
    double d = atof("2.5");
    assert(d == 2.5);
    return 0;
}
"#);
}

#[test]
fn rand_is_deterministic_per_seed() {
    check(r#"
#include <stdlib.h>
#include <assert.h>
int main() {
    srand(42);
    int a = rand();
    int b = rand();
    srand(42);
    assert(rand() == a);
    assert(rand() == b);
    assert(a >= 0);
    return 0;
}
"#);
}

#[test]
fn math_functions_and_constants() {
    check(r#"
#include <math.h>
#include <assert.h>
int main() {
    assert(sqrt(16.0) == 4.0);
    assert(pow(2.0, 10.0) == 1024.0);
    assert(fabs(-2.5) == 2.5);
    assert(floor(2.9) == 2.0);
    assert(ceil(2.1) == 3.0);
    assert(fmod(7.5, 2.0) == 1.5);
    assert(sin(0.0) == 0.0);
    assert(cos(0.0) == 1.0);
    assert(M_PI > 3.14 && M_PI < 3.15);
    assert(exp(0.0) == 1.0);
    assert(log(M_E) > 0.99 && log(M_E) < 1.01);
    return 0;
}
"#);
}

#[test]
fn abs_from_stdlib() {
    check(r#"
#include <stdlib.h>
#include <assert.h>
int main() {
    assert(abs(-5) == 5);
    assert(abs(5) == 5);
    return 0;
}
"#);
}

#[test]
fn true_false_null_platform_constants() {
    check(r#"
#include <stdio.h>
#include <assert.h>
int main() {
    int *p = NULL;
    assert(p == 0);
    assert(TRUE == 1);
    assert(FALSE == 0);
    return 0;
}
"#);
}
