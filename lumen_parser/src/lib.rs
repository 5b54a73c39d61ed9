//! lumen_parser
//!
//! Front end for the Lumen language: lexer, precedence-climbing parser and
//! AST. The back-end crate (`lumen`) consumes the AST produced here.
//!
//! # Example
//!
//! ```
//! use lumen_parser::{parse, Expr};
//!
//! let program = parse("{ print(1 + 2) }").expect("parse failed");
//! assert!(matches!(program, Expr::Scope { .. }));
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

// Re-exports
pub use ast::{DeclKeyword, Expr, Parameter, TypeExpr, TypeField};
pub use error::{render_diagnostic, ParseError, ParseResult};
pub use lexer::{tokenize, Lexer, SpannedToken, MAX_INTERPOLATION_DEPTH};
pub use parser::Parser;
pub use span::{SourceMap, Span};
pub use token::{InfixRule, Precedence, PrefixRule, Rule, Token};

/// Parse Lumen source code into its program scope.
///
/// The program as a whole is a scope terminated by end of file; at least one
/// expression is required.
pub fn parse(source: &str) -> ParseResult<Expr> {
    parser::parse(source)
}

/// Serialize an AST to pretty-printed JSON (used by the compiler driver's
/// debug dump).
pub fn ast_to_json(expr: &Expr) -> String {
    serde_json::to_string_pretty(expr).unwrap_or_else(|_| "<unserializable>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program_is_a_scope() {
        let program = parse("1 + 2").unwrap();
        assert!(matches!(program, Expr::Scope { .. }));
    }

    #[test]
    fn test_ast_json_dump() {
        let program = parse("var x := 1").unwrap();
        let json = ast_to_json(&program);
        assert!(json.contains("Declaration"));
    }
}
