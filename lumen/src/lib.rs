// Library code reports problems through Result values; only the CLI
// binaries talk to stderr.
#![deny(clippy::print_stderr)]

//! lumen
//!
//! Compiler and stack virtual machine for the Lumen language. The front end
//! (lexer, parser, AST) lives in the `lumen_parser` crate; this crate binds
//! the AST into a typed tree, generates bytecode into a program container,
//! serializes it, and executes it.
//!
//! # Example
//!
//! ```
//! let output = lumen::api::run_output("{ print(1 + 2 * 3) }").expect("run failed");
//! assert_eq!(output, "7\n");
//! ```

pub mod api;
pub mod binder;
pub mod bytecode;
pub mod codegen;
pub mod intrinsics;
pub mod pipeline;
pub mod pool;
pub mod program;
pub mod symbols;
pub mod value;
pub mod vm;

// Re-exports
pub use api::{compile_and_run, run_output, RunError};
pub use binder::{BindError, Binder};
pub use intrinsics::Intrinsic;
pub use pipeline::{bind_source, compile_source, CompileError};
pub use pool::ValuePool;
pub use program::{Opcode, Program, PROGRAM_VERSION};
pub use value::{Value, ValueKind, NUMBER_EPSILON};
pub use vm::{Vm, VmError};
