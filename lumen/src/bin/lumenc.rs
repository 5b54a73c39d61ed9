//! Lumen compiler driver.
//!
//! Usage:
//!   lumenc SOURCE.lum              # compile to SOURCE.lbc
//!   lumenc SOURCE.lum -o OUT.lbc   # compile to an explicit output path
//!   lumenc SOURCE.lum -d           # additionally dump AST, bound tree and
//!                                  # disassembly

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::exit;

use lumen::binder::tree::BoundProgram;
use lumen::codegen;
use lumen::pipeline::CompileError;
use lumen::{bytecode, Binder};
use lumen_parser::ast_to_json;

fn usage(program_name: &str) -> ! {
    eprintln!("Usage: {program_name} SOURCE.lum [-o OUT.lbc] [-d]");
    exit(1)
}

fn main() {
    let mut args = env::args();
    let program_name = args.next().unwrap_or_else(|| "lumenc".to_string());

    let mut source_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut debug = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" => match args.next() {
                Some(path) => output_path = Some(PathBuf::from(path)),
                None => usage(&program_name),
            },
            "-d" => debug = true,
            _ if source_path.is_none() => source_path = Some(PathBuf::from(arg)),
            _ => usage(&program_name),
        }
    }

    let Some(source_path) = source_path else {
        usage(&program_name);
    };
    let file_name = source_path.display().to_string();

    let source = match fs::read_to_string(&source_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{file_name}: error: cannot read source file: {e}");
            exit(1);
        }
    };

    let ast = match lumen_parser::parse(&source) {
        Ok(ast) => ast,
        Err(e) => {
            eprintln!("{}", e.render(&file_name, &source));
            exit(1);
        }
    };
    if debug {
        println!("=== ast ===");
        println!("{}", ast_to_json(&ast));
    }

    let bound: BoundProgram = match Binder::new().bind_program(&ast) {
        Ok(bound) => bound,
        Err(e) => {
            eprintln!("{}", e.render(&file_name, &source));
            exit(1);
        }
    };
    if debug {
        println!("=== bound tree ===");
        print!("{}", bound.root.render(&bound.symbols));
    }

    let program = match codegen::generate(&bound) {
        Ok(program) => program,
        Err(e) => {
            let wrapped = CompileError::Generate(e);
            eprintln!("{}", wrapped.render(&file_name, &source));
            exit(1);
        }
    };
    if debug {
        println!("=== program ===");
        print!("{}", program.disassemble());
    }

    let output_path = output_path.unwrap_or_else(|| source_path.with_extension("lbc"));
    if let Err(e) = bytecode::save(&program, &output_path) {
        eprintln!("{}: error: cannot write program: {e}", output_path.display());
        exit(1);
    }
}
