//! Lex and parse error types.
//!
//! The front end recovers nothing: the first error aborts the compile. Every
//! error carries a span so drivers can render a source-annotated diagnostic.

use thiserror::Error;

use crate::span::{SourceMap, Span};

/// Errors produced by the lexer and parser
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("unexpected character")]
    UnexpectedCharacter { span: Span },

    #[error("string interpolation may nest only {max} levels deep")]
    InterpolationTooDeep { max: usize, span: Span },

    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        span: Span,
    },

    #[error("expected expression, got {found}")]
    ExpectedExpression { found: String, span: Span },

    #[error("expected at least one expression in scope")]
    EmptyScope { span: Span },

    #[error("{found} is not a valid assignment target")]
    InvalidAssignmentTarget { found: String, span: Span },

    #[error("object fields cannot be assigned directly; compose a new object from the old one instead")]
    FieldAssignment { span: Span },

    #[error("only symbols can be called as functions")]
    InvalidCallTarget { span: Span },

    #[error("duplicate field `{name}` in object type")]
    DuplicateTypeField { name: String, span: Span },
}

impl ParseError {
    /// The source region the error points at
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnterminatedString { span }
            | ParseError::UnexpectedCharacter { span }
            | ParseError::InterpolationTooDeep { span, .. }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::ExpectedExpression { span, .. }
            | ParseError::EmptyScope { span }
            | ParseError::InvalidAssignmentTarget { span, .. }
            | ParseError::FieldAssignment { span }
            | ParseError::InvalidCallTarget { span }
            | ParseError::DuplicateTypeField { span, .. } => *span,
        }
    }

    /// Render the diagnostic in the stable `file:line:column` format with the
    /// offending source line and a caret marker underneath.
    pub fn render(&self, file_name: &str, source: &str) -> String {
        render_diagnostic(file_name, source, self.span(), &self.to_string())
    }
}

/// Result type for lexing and parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Shared diagnostic rendering: `file:line:column: error: message`, the
/// source line, and a `^~~~` marker under the implicated range.
pub fn render_diagnostic(file_name: &str, source: &str, span: Span, message: &str) -> String {
    let mut out = format!(
        "{}:{}:{}: error: {}",
        file_name, span.line, span.column, message
    );

    let map = SourceMap::new(source);
    let Some((line_start, line_end)) = map.line_range(span.line) else {
        return out;
    };
    let line_text = &source[line_start..line_end];

    let col = span.column.saturating_sub(1).min(line_text.len());
    let marker_len = span
        .len()
        .max(1)
        .min(line_text.len().saturating_sub(col).max(1));
    let mut marker = String::from("^");
    for _ in 1..marker_len {
        marker.push('~');
    }

    let gutter = span.line.to_string();
    out.push_str(&format!(
        "\n  {} | {}\n  {} | {}{}",
        gutter,
        line_text,
        " ".repeat(gutter.len()),
        " ".repeat(col),
        marker
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_accessor() {
        let span = Span::new(3, 7, 1, 4);
        let err = ParseError::UnexpectedToken {
            found: "`)`".to_string(),
            expected: "`(`".to_string(),
            span,
        };
        assert_eq!(err.span(), span);
        assert!(err.to_string().contains("`)`"));
        assert!(err.to_string().contains("`(`"));
    }

    #[test]
    fn test_render_marks_the_token() {
        let source = "var x := )";
        let err = ParseError::ExpectedExpression {
            found: "`)`".to_string(),
            span: Span::new(9, 10, 1, 10),
        };
        let rendered = err.render("test.lum", source);
        assert!(rendered.starts_with("test.lum:1:10: error: expected expression"));
        assert!(rendered.contains("var x := )"));
        assert!(rendered.ends_with("         ^"));
    }

    #[test]
    fn test_render_multichar_marker() {
        let source = "print(value)";
        let rendered = render_diagnostic(
            "test.lum",
            source,
            Span::new(6, 11, 1, 7),
            "cannot resolve symbol `value`",
        );
        assert!(rendered.contains("^~~~~"));
    }

    #[test]
    fn test_render_out_of_range_line() {
        let rendered = render_diagnostic("test.lum", "x", Span::new(40, 41, 9, 1), "boom");
        assert_eq!(rendered, "test.lum:9:1: error: boom");
    }

    #[test]
    fn test_stable_messages() {
        let span = Span::new(9, 10, 1, 10);
        let err = ParseError::ExpectedExpression {
            found: "`)`".to_string(),
            span,
        };
        insta::assert_snapshot!(err.to_string(), @"expected expression, got `)`");

        let err = ParseError::InterpolationTooDeep { max: 8, span };
        insta::assert_snapshot!(
            err.to_string(),
            @"string interpolation may nest only 8 levels deep"
        );
    }
}
