//! Driver surface: flags, exit statuses, file execution, program args.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn sci() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sci"))
}

fn write_program(dir: &TempDir, name: &str, source: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, source).expect("write test program");
    path.to_string_lossy().into_owned()
}

#[test]
fn no_arguments_prints_help() {
    let out = sci().output().expect("run sci");
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("interactive mode"), "{text}");
    assert!(text.contains("-s"), "{text}");
}

#[test]
fn license_flag() {
    let out = sci().arg("-c").output().expect("run sci");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("MIT License"));
}

#[test]
fn runs_a_program_and_reports_main_status() {
    let dir = TempDir::new().unwrap();
    let file = write_program(
        &dir,
        "hello.c",
        r#"
#include <stdio.h>
int main() {
    printf("hello from sci\n");
    return 3;
}
"#,
    );
    let out = sci().arg(&file).output().expect("run sci");
    assert_eq!(out.status.code(), Some(3));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "hello from sci\n");
}

#[test]
fn script_mode_runs_without_main() {
    let dir = TempDir::new().unwrap();
    let file = write_program(
        &dir,
        "script.c",
        r#"
printf("top level\n");
"#,
    );
    let out = sci().arg("-s").arg(&file).output().expect("run sci");
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "top level\n");
}

#[test]
fn program_arguments_follow_the_dash() {
    let dir = TempDir::new().unwrap();
    let file = write_program(
        &dir,
        "args.c",
        r#"
#include <stdio.h>
int main(int argc, char **argv) {
    int i;
    for (i = 1; i < argc; i++) printf("[%s]", argv[i]);
    printf("\n");
    return argc;
}
"#,
    );
    let out = sci()
        .arg(&file)
        .arg("-")
        .arg("one")
        .arg("two")
        .output()
        .expect("run sci");
    assert_eq!(String::from_utf8_lossy(&out.stdout), "[one][two]\n");
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn fatal_errors_exit_nonzero_with_coordinates() {
    let dir = TempDir::new().unwrap();
    let file = write_program(&dir, "bad.c", "int main() {\n    return missing;\n}\n");
    let out = sci().arg(&file).output().expect("run sci");
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("bad.c:2:"), "{err}");
    assert!(err.contains("undefined"), "{err}");
}

#[test]
fn stacksize_environment_variable_limits_the_arena() {
    let dir = TempDir::new().unwrap();
    let file = write_program(&dir, "big.c", "int big[1000000];\nint main() { return 0; }\n");
    let out = sci()
        .env("STACKSIZE", "4096")
        .arg(&file)
        .output()
        .expect("run sci");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("out of memory"));
}
