//! Lumen VM driver.
//!
//! Usage:
//!   lumenvm PROGRAM.lbc        # run a compiled program
//!   lumenvm PROGRAM.lbc -d     # also dump the program and the final stack
//!   lumenvm PROGRAM.lbc -t     # trace each instruction before executing it

use std::env;
use std::path::PathBuf;
use std::process::exit;

use lumen::{bytecode, Vm};

fn usage(program_name: &str) -> ! {
    eprintln!("Usage: {program_name} PROGRAM.lbc [-d] [-t]");
    exit(1)
}

fn main() {
    let mut args = env::args();
    let program_name = args.next().unwrap_or_else(|| "lumenvm".to_string());

    let mut program_path: Option<PathBuf> = None;
    let mut debug = false;
    let mut trace = false;

    for arg in args {
        match arg.as_str() {
            "-d" => debug = true,
            "-t" => trace = true,
            _ if program_path.is_none() => program_path = Some(PathBuf::from(arg)),
            _ => usage(&program_name),
        }
    }

    let Some(program_path) = program_path else {
        usage(&program_name);
    };

    let (program, skipped) = match bytecode::load(&program_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}: error: {e}", program_path.display());
            exit(1);
        }
    };
    for tag in skipped {
        eprintln!(
            "{}: warning: ignoring unsupported chunk \"{tag}\"",
            program_path.display()
        );
    }

    if debug {
        println!("=== program ===");
        print!("{}", program.disassemble());
    }

    let mut vm = Vm::new(program);
    loop {
        if trace {
            if let Some((line, _)) = vm.program().disassemble_instruction(vm.ip()) {
                eprintln!("{line}");
            }
        }
        match vm.step() {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                print!("{}", vm.output());
                eprintln!("{}: fatal: {e}", program_path.display());
                exit(1);
            }
        }
    }

    print!("{}", vm.output());

    if debug {
        let stack = vm.stack();
        println!("=== stack ({} values) ===", stack.len());
        for value in stack {
            println!("[ {} ]", vm.render_value(value));
        }
    }
}
