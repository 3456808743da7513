use std::env;
use std::fs;
use std::process::ExitCode;

use lc3_assembler::encoder::{encode, object_bytes};
use lc3_assembler::first_pass::first_pass;
use lc3_assembler::lexer::tokenize;
use lc3_assembler::parser::parse_lines;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: lc3-assembler <input.asm> <output.obj>");
        return ExitCode::FAILURE;
    }
    let input_path = &args[1];
    let output_path = &args[2];

    let source = match fs::read_to_string(input_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Failed to read {}: {}", input_path, err);
            return ExitCode::FAILURE;
        }
    };

    let lexed = tokenize(&source);
    let mut had_errors = !lexed.errors.is_empty();
    for err in &lexed.errors {
        eprintln!("{}", err);
    }

    let parsed = parse_lines(&lexed.tokens);
    had_errors |= !parsed.errors.is_empty();
    for err in &parsed.errors {
        eprintln!("{}", err);
    }

    let first = first_pass(parsed.lines);
    had_errors |= !first.errors.is_empty();
    for err in &first.errors {
        eprintln!("{}", err);
    }

    if had_errors {
        return ExitCode::FAILURE;
    }

    let encoded = encode(&first);
    if !encoded.errors.is_empty() {
        for err in &encoded.errors {
            eprintln!("{}", err);
        }
        return ExitCode::FAILURE;
    }

    if let Err(err) = fs::write(output_path, object_bytes(&encoded)) {
        eprintln!("Failed to write {}: {}", output_path, err);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
