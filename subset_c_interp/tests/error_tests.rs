//! One failure per error category, with source coordinates.

use pretty_assertions::assert_eq;
use subset_c_interp::{run_source, ErrorKind, Interpreter};

fn expect_error(src: &str) -> Box<subset_c_interp::CError> {
    run_source(src).expect_err("program should fail")
}

#[test]
fn syntax_errors() {
    let err = expect_error("int main() { int x = ; return 0; }");
    assert_eq!(err.kind, ErrorKind::Syntax);

    let err = expect_error("int main() { return (1 + 2; }");
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert!(err.message.contains("brackets not closed"), "{}", err.message);

    let err = expect_error("int main() { int x = 1 }");
    assert_eq!(err.kind, ErrorKind::Syntax);
}

#[test]
fn type_errors() {
    let err = expect_error(r#"int main() { int x; x = "str"; return 0; }"#);
    assert_eq!(err.kind, ErrorKind::Type);

    let err = expect_error("int main() { 5 = 6; return 0; }");
    assert_eq!(err.kind, ErrorKind::Type);
    assert!(err.message.contains("assign"), "{}", err.message);

    // pointer-to-pointer of a different type needs a cast
    let err = expect_error(
        r#"
int main() {
    int x = 1;
    int *ip = &x;
    char *cp;
    cp = ip;
    return 0;
}
"#,
    );
    assert_eq!(err.kind, ErrorKind::Type);

    let err = expect_error(
        r#"
int main() {
    int a[3];
    int b[4];
    a = b;
    return 0;
}
"#,
    );
    assert_eq!(err.kind, ErrorKind::Type);
    assert!(err.message.contains("size"), "{}", err.message);
}

#[test]
fn name_errors() {
    let err = expect_error("int main() { return missing; }");
    assert_eq!(err.kind, ErrorKind::Name);
    assert!(err.message.contains("undefined"), "{}", err.message);

    let err = expect_error("int main() { int x; int x; return 0; }");
    assert_eq!(err.kind, ErrorKind::Name);
    assert!(err.message.contains("already defined"), "{}", err.message);

    let err = expect_error(
        r#"
struct point { int x; };
int main() {
    struct point p;
    p.z = 1;
    return 0;
}
"#,
    );
    assert_eq!(err.kind, ErrorKind::Name);
    assert!(err.message.contains("member"), "{}", err.message);
}

#[test]
fn memory_errors() {
    let mut interpreter = Interpreter::with_captured_output(2048);
    let err = interpreter
        .parse_source("big.c", "int big[100000];", false)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Memory);
    assert!(err.message.contains("out of memory"), "{}", err.message);
}

#[test]
fn runtime_errors() {
    let err = expect_error(
        r#"
int main() {
    int *p = 0;
    return *p;
}
"#,
    );
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert!(err.message.contains("NULL pointer dereference"), "{}", err.message);

    let err = expect_error(
        r#"
int f(int a) { return a; }
int main() { return f(1, 2); }
"#,
    );
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert!(err.message.contains("too many arguments"), "{}", err.message);

    let err = expect_error(
        r#"
int f(int a, int b) { return a + b; }
int main() { return f(1); }
"#,
    );
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert!(err.message.contains("not enough arguments"), "{}", err.message);

    let err = expect_error(
        r#"
int f() { int x = 1; }
int main() { return f(); }
"#,
    );
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert!(err.message.contains("no value returned"), "{}", err.message);
}

#[test]
fn link_errors() {
    let err = expect_error(
        r#"
int declared_only(int x);
int main() { return declared_only(1); }
"#,
    );
    assert_eq!(err.kind, ErrorKind::Link);
    assert!(err.message.contains("undefined"), "{}", err.message);
}

#[test]
fn errors_carry_source_coordinates() {
    let err = expect_error("int main() {\n    return missing;\n}");
    assert_eq!(err.file, "test.c");
    assert_eq!(err.line, 2);
    assert!(err.column > 0);
    let shown = err.to_string();
    assert!(shown.contains("test.c:2:"), "{shown}");
}
