//! The compile pipeline: source text → parser → binder → code generator.

use lumen_parser::ParseError;

use crate::binder::tree::BoundProgram;
use crate::binder::{BindError, Binder};
use crate::codegen::{self, GenerateError};
use crate::program::Program;

/// Any error a compile can end with
#[derive(Debug)]
pub enum CompileError {
    /// Source failed to lex or parse
    Parse(ParseError),
    /// Name resolution or type checking failed
    Bind(BindError),
    /// Code emission failed
    Generate(GenerateError),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Parse(e) => write!(f, "parse error: {e}"),
            CompileError::Bind(e) => write!(f, "bind error: {e}"),
            CompileError::Generate(e) => write!(f, "codegen error: {e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<BindError> for CompileError {
    fn from(e: BindError) -> Self {
        CompileError::Bind(e)
    }
}

impl From<GenerateError> for CompileError {
    fn from(e: GenerateError) -> Self {
        CompileError::Generate(e)
    }
}

impl CompileError {
    /// Render a source-annotated diagnostic in the stable format. Codegen
    /// errors carry no span and render as a bare message.
    pub fn render(&self, file_name: &str, source: &str) -> String {
        match self {
            CompileError::Parse(e) => e.render(file_name, source),
            CompileError::Bind(e) => e.render(file_name, source),
            CompileError::Generate(e) => format!("{file_name}: error: {e}"),
        }
    }
}

/// Parse and bind source code, producing the typed bound tree.
pub fn bind_source(source: &str) -> Result<BoundProgram, CompileError> {
    let ast = lumen_parser::parse(source)?;
    Ok(Binder::new().bind_program(&ast)?)
}

/// Compile source code all the way to a program.
pub fn compile_source(source: &str) -> Result<Program, CompileError> {
    let bound = bind_source(source)?;
    Ok(codegen::generate(&bound)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_success() {
        let program = compile_source("{ print(1 + 2) }").unwrap();
        assert!(!program.code.is_empty());
    }

    #[test]
    fn test_parse_errors_are_wrapped() {
        let err = compile_source("{ 1 +").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert!(err.to_string().starts_with("parse error:"));
    }

    #[test]
    fn test_bind_errors_are_wrapped() {
        let err = compile_source("{ missing }").unwrap_err();
        assert!(matches!(err, CompileError::Bind(_)));
    }

    #[test]
    fn test_render_includes_location() {
        let source = "{ missing }";
        let err = compile_source(source).unwrap_err();
        let rendered = err.render("main.lum", source);
        assert!(rendered.starts_with("main.lum:1:3: error:"));
        assert!(rendered.contains("{ missing }"));
    }
}
