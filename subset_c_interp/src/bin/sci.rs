//! Subset-C interpreter command-line driver.
//!
//! Usage:
//!   sci <file1.c>... [- <arg1>...]     run a program, calling main()
//!   sci -s <file1.c>... [- <arg1>...]  run a script without calling main()
//!   sci -i                             interactive mode, Ctrl+d to exit
//!   sci -c                             license text
//!   sci -h                             this help

use std::env;
use std::fs;
use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use subset_c_interp::api::DEFAULT_ARENA_BYTES;
use subset_c_interp::{ErrorKind, Interpreter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const LICENSE: &str = "\
MIT License

Permission is hereby granted, free of charge, to any person obtaining a
copy of this software and associated documentation files, to deal in the
Software without restriction, including without limitation the rights to
use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software. The Software is provided \"as is\", without
warranty of any kind.";

fn print_help() {
    println!(
        "sci {VERSION}\n\
         Format:\n\n\
         > sci <file1.c>... [- <arg1>...]    : run a program, calls main() as the entry point\n\
         > sci -s <file1.c>... [- <arg1>...] : run a script, runs the program without calling main()\n\
         > sci -i                            : interactive mode, Ctrl+d to exit\n\
         > sci -c                            : license text\n\
         > sci -h                            : this help message"
    );
}

fn arena_size_from_env() -> usize {
    env::var("STACKSIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_ARENA_BYTES)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] == "-h" {
        print_help();
        return ExitCode::SUCCESS;
    }
    if args[1] == "-c" {
        println!("{LICENSE}");
        return ExitCode::SUCCESS;
    }

    let mut interpreter = Interpreter::new(arena_size_from_env());

    let mut param = 1;
    let mut run_main = true;
    if args[param] == "-s" {
        run_main = false;
        param += 1;
        if let Err(e) = interpreter.include_all_system_headers() {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    } else if args[param] == "-i" {
        if let Err(e) = interpreter.include_all_system_headers() {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
        return run_repl(&mut interpreter);
    }

    // source files run in order; everything after "-" belongs to the program
    let mut files: Vec<String> = Vec::new();
    while param < args.len() && args[param] != "-" {
        files.push(args[param].clone());
        param += 1;
    }
    let program_args: Vec<String> = if param < args.len() {
        args[param + 1..].to_vec()
    } else {
        Vec::new()
    };
    if files.is_empty() {
        print_help();
        return ExitCode::FAILURE;
    }

    for file in &files {
        let source = match fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("can't read '{file}': {e}");
                return ExitCode::FAILURE;
            }
        };
        match interpreter.parse_source(file, &source, false) {
            Ok(()) => {}
            Err(e) => return exit_code_for(&e.kind, &e.to_string()),
        }
    }

    if run_main {
        let mut main_args = vec![files[0].clone()];
        main_args.extend(program_args);
        match interpreter.call_main(&main_args) {
            Ok(status) => return status_code(status),
            Err(e) => return exit_code_for(&e.kind, &e.to_string()),
        }
    }
    ExitCode::SUCCESS
}

fn exit_code_for(kind: &ErrorKind, message: &str) -> ExitCode {
    match kind {
        ErrorKind::Exit(status) => status_code(*status),
        _ => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn status_code(status: i32) -> ExitCode {
    ExitCode::from((status & 0xff) as u8)
}

// ==================== Interactive mode ====================

/// Count bracket nesting outside string/char literals so multi-line input
/// is submitted only when balanced.
fn is_balanced(src: &str) -> bool {
    let mut depth: i32 = 0;
    let mut in_str = false;
    let mut in_char = false;
    let mut escaped = false;
    for c in src.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_str || in_char => escaped = true,
            '"' if !in_char => in_str = !in_str,
            '\'' if !in_str => in_char = !in_char,
            '{' | '(' | '[' if !in_str && !in_char => depth += 1,
            '}' | ')' | ']' if !in_str && !in_char => depth -= 1,
            _ => {}
        }
    }
    depth <= 0 && !in_str
}

fn run_repl(interpreter: &mut Interpreter) -> ExitCode {
    println!("sci {VERSION} - interactive mode, Ctrl+d to exit");
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("can't start the line editor: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "c> " } else { " > " };
        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');
                if !is_balanced(&buffer) {
                    continue;
                }
                let source = std::mem::take(&mut buffer);
                if source.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(source.trim());
                match interpreter.parse_source("<stdin>", &source, true) {
                    Ok(()) => {}
                    Err(e) => match e.kind {
                        ErrorKind::Exit(status) => return status_code(status),
                        _ => eprintln!("{e}"),
                    },
                }
            }
            Err(ReadlineError::Interrupted) => buffer.clear(),
            Err(ReadlineError::Eof) => return ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    }
}
