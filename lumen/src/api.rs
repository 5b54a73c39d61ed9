//! Programmatic compile-and-run entry points, used by the drivers and the
//! integration tests.

use crate::pipeline::{compile_source, CompileError};
use crate::vm::{Vm, VmError};

/// Compilation or execution failure
#[derive(Debug)]
pub enum RunError {
    Compile(CompileError),
    Runtime(VmError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Compile(e) => write!(f, "{e}"),
            RunError::Runtime(e) => write!(f, "runtime error: {e}"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<CompileError> for RunError {
    fn from(e: CompileError) -> Self {
        RunError::Compile(e)
    }
}

impl From<VmError> for RunError {
    fn from(e: VmError) -> Self {
        RunError::Runtime(e)
    }
}

/// Compile and execute source code; the returned VM exposes the captured
/// output, the final operand stack and the heap pool.
pub fn compile_and_run(source: &str) -> Result<Vm, RunError> {
    let program = compile_source(source)?;
    let mut vm = Vm::new(program);
    vm.run()?;
    Ok(vm)
}

/// Compile and execute source code, returning what `print` produced.
pub fn run_output(source: &str) -> Result<String, RunError> {
    let mut vm = compile_and_run(source)?;
    Ok(vm.take_output())
}
