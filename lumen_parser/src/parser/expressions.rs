//! Prefix and infix expression parsers.

use crate::ast::Expr;
use crate::error::{ParseError, ParseResult};
use crate::parser::Parser;
use crate::token::{Precedence, Token};

impl<'a> Parser<'a> {
    pub(crate) fn parse_literal(&mut self) -> ParseResult<Expr> {
        let token = self.advance()?;
        Ok(Expr::Literal {
            token: token.kind,
            text: token.text.to_string(),
            span: token.span,
        })
    }

    /// Parse an interpolated string: alternating literal fragments and
    /// embedded expressions. Empty fragments (`"${`, `}"`, `}${`) are
    /// dropped; the embedded expressions always survive.
    pub(crate) fn parse_interpolation(&mut self) -> ParseResult<Expr> {
        let mut parts = Vec::new();
        let start_span = self.peek().span;

        let mut token = self.advance()?;
        while token.kind == Token::StringInterpolation {
            // Segment text ends in `${` and starts with `"` or `}`; anything
            // longer than the delimiters is a literal fragment.
            if token.text.len() > 3 {
                parts.push(Expr::Literal {
                    token: token.kind,
                    text: token.text.to_string(),
                    span: token.span,
                });
            }
            parts.push(self.parse_precedence(Precedence::Assignment)?);
            token = self.advance()?;
        }

        if token.kind != Token::String {
            return Err(ParseError::UnexpectedToken {
                found: token.kind.name().to_string(),
                expected: Token::String.name().to_string(),
                span: token.span,
            });
        }
        if token.text.len() > 2 {
            parts.push(Expr::Literal {
                token: token.kind,
                text: token.text.to_string(),
                span: token.span,
            });
        }

        Ok(Expr::Interpolation {
            span: start_span.merge(&token.span),
            parts,
        })
    }

    pub(crate) fn parse_unary(&mut self) -> ParseResult<Expr> {
        let operator = self.advance()?;
        let operand = self.parse_precedence(Precedence::Unary)?;
        Ok(Expr::Unary {
            operator: operator.kind,
            span: operator.span.merge(&operand.span()),
            operand: Box::new(operand),
        })
    }

    pub(crate) fn parse_grouping(&mut self) -> ParseResult<Expr> {
        self.advance()?;
        let inner = self.parse_precedence(Precedence::Assignment)?;
        self.expect(Token::CloseParen)?;
        Ok(inner)
    }

    pub(crate) fn parse_binary(&mut self, lhs: Expr) -> ParseResult<Expr> {
        let operator = self.advance()?;
        // Left-associative: the right operand climbs one level higher.
        let rhs = self.parse_precedence(operator.kind.rule().precedence.next())?;
        Ok(Expr::Binary {
            operator: operator.kind,
            span: lhs.span().merge(&rhs.span()),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub(crate) fn parse_assignment(&mut self, lhs: Expr) -> ParseResult<Expr> {
        self.advance()?;

        if matches!(lhs, Expr::FieldAccess { .. }) {
            return Err(ParseError::FieldAssignment { span: lhs.span() });
        }
        if !matches!(lhs, Expr::Symbol { .. }) {
            return Err(ParseError::InvalidAssignmentTarget {
                found: lhs.kind_name().to_string(),
                span: lhs.span(),
            });
        }

        // Right-associative: recurse at the same level.
        let rhs = self.parse_precedence(Precedence::Assignment)?;
        Ok(Expr::Assignment {
            span: lhs.span().merge(&rhs.span()),
            target: Box::new(lhs),
            expression: Box::new(rhs),
        })
    }

    pub(crate) fn parse_identifier(&mut self) -> ParseResult<Expr> {
        let token = self.advance()?;
        Ok(Expr::Symbol {
            name: token.text.to_string(),
            span: token.span,
        })
    }

    pub(crate) fn parse_scope(&mut self) -> ParseResult<Expr> {
        let open = self.advance()?;
        self.parse_scope_contents(open.span, Token::CloseBrace)
    }

    pub(crate) fn parse_function_call(&mut self, lhs: Expr) -> ParseResult<Expr> {
        let lhs_span = lhs.span();
        let Expr::Symbol { name, span } = lhs else {
            return Err(ParseError::InvalidCallTarget { span: lhs_span });
        };

        self.expect(Token::OpenParen)?;
        let arguments = if self.peek().kind == Token::CloseParen {
            Vec::new()
        } else {
            self.parse_expressions(Token::Comma, Token::CloseParen, Precedence::Assignment)?
        };
        let closing = self.expect(Token::CloseParen)?;

        Ok(Expr::FunctionCall {
            name,
            name_span: span,
            arguments,
            span: span.merge(&closing.span),
        })
    }

    /// `expr.field` loads a field; `expr.name(args…)` is method-call sugar
    /// that inserts `expr` as the first argument of `name`.
    pub(crate) fn parse_dot_access(&mut self, lhs: Expr) -> ParseResult<Expr> {
        self.advance()?;
        let name_token = self.expect(Token::Identifier)?;

        if self.peek().kind == Token::OpenParen {
            self.advance()?;
            let mut arguments = vec![lhs];
            if self.peek().kind != Token::CloseParen {
                arguments.extend(self.parse_expressions(
                    Token::Comma,
                    Token::CloseParen,
                    Precedence::Assignment,
                )?);
            }
            let closing = self.expect(Token::CloseParen)?;
            return Ok(Expr::FunctionCall {
                name: name_token.text.to_string(),
                name_span: name_token.span,
                span: arguments[0].span().merge(&closing.span),
                arguments,
            });
        }

        Ok(Expr::FieldAccess {
            span: lhs.span().merge(&name_token.span),
            object: Box::new(lhs),
            field: name_token.text.to_string(),
            field_span: name_token.span,
        })
    }

    pub(crate) fn parse_element_access(&mut self, lhs: Expr) -> ParseResult<Expr> {
        let operator = self.advance()?;
        let rhs = self.parse_precedence(Precedence::Assignment)?;
        let closing = self.expect(Token::CloseBracket)?;
        Ok(Expr::Binary {
            operator: operator.kind,
            span: lhs.span().merge(&closing.span),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub(crate) fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        let open = self.advance()?;
        let mut fields = vec![self.parse_object_field()?];
        while self.peek().kind == Token::Comma {
            self.advance()?;
            if self.peek().kind == Token::CloseBracket {
                break;
            }
            fields.push(self.parse_object_field()?);
        }
        let closing = self.expect(Token::CloseBracket)?;
        Ok(Expr::ObjectLiteral {
            fields,
            span: open.span.merge(&closing.span),
        })
    }

    /// One object-literal entry: `name: expr` or `name := expr` (both become
    /// assignment nodes), a `..spread`, or a bare `name` shorthand.
    fn parse_object_field(&mut self) -> ParseResult<Expr> {
        if self.peek().kind == Token::Identifier && self.peek_next_kind()? == Token::Colon {
            let name = self.advance()?;
            self.advance()?; // the colon
            let value = self.parse_precedence(Precedence::Assignment)?;
            return Ok(Expr::Assignment {
                span: name.span.merge(&value.span()),
                target: Box::new(Expr::Symbol {
                    name: name.text.to_string(),
                    span: name.span,
                }),
                expression: Box::new(value),
            });
        }
        self.parse_precedence(Precedence::Assignment)
    }

    pub(crate) fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        let open = self.advance()?;
        let elements = if self.peek().kind == Token::CloseBracket {
            Vec::new()
        } else {
            self.parse_expressions(Token::Comma, Token::CloseBracket, Precedence::Assignment)?
        };
        let closing = self.expect(Token::CloseBracket)?;
        Ok(Expr::ArrayLiteral {
            elements,
            span: open.span.merge(&closing.span),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::Expr;
    use crate::error::ParseError;
    use crate::parser::parse;
    use crate::token::Token;
    use pretty_assertions::assert_eq;

    fn parse_one(source: &str) -> Expr {
        match parse(source).expect("parse failed") {
            Expr::Scope {
                mut expressions, ..
            } => expressions.remove(0),
            other => panic!("expected scope, got {:?}", other),
        }
    }

    #[test]
    fn test_interpolation_parts() {
        let Expr::Interpolation { parts, .. } = parse_one(r#""x is ${x + 1}""#) else {
            panic!("expected interpolation");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], Expr::Literal { token: Token::StringInterpolation, .. }));
        assert!(matches!(&parts[1], Expr::Binary { .. }));
    }

    #[test]
    fn test_interpolation_without_fragments() {
        let Expr::Interpolation { parts, .. } = parse_one(r#""${x}""#) else {
            panic!("expected interpolation");
        };
        assert_eq!(parts.len(), 1);
        assert!(matches!(&parts[0], Expr::Symbol { name, .. } if name == "x"));
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        let Expr::Binary { operator, lhs, .. } = parse_one("(1 + 2) * 3") else {
            panic!("expected binary");
        };
        assert_eq!(operator, Token::Star);
        assert!(matches!(
            *lhs,
            Expr::Binary {
                operator: Token::Plus,
                ..
            }
        ));
    }

    #[test]
    fn test_object_literal_fields() {
        let Expr::ObjectLiteral { fields, .. } = parse_one("$[x := 1, ..base, y]") else {
            panic!("expected object literal");
        };
        assert_eq!(fields.len(), 3);
        assert!(matches!(&fields[0], Expr::Assignment { .. }));
        assert!(matches!(
            &fields[1],
            Expr::Unary {
                operator: Token::DotDot,
                ..
            }
        ));
        assert!(matches!(&fields[2], Expr::Symbol { .. }));
    }

    #[test]
    fn test_object_literal_colon_fields() {
        let Expr::ObjectLiteral { fields, .. } = parse_one("$[x: 10, y: 20]") else {
            panic!("expected object literal");
        };
        assert_eq!(fields.len(), 2);
        let Expr::Assignment { target, .. } = &fields[0] else {
            panic!("expected assignment-shaped field");
        };
        assert!(matches!(target.as_ref(), Expr::Symbol { name, .. } if name == "x"));
    }

    #[test]
    fn test_empty_array_literal() {
        let Expr::ArrayLiteral { elements, .. } = parse_one("[]") else {
            panic!("expected array literal");
        };
        assert!(elements.is_empty());
    }

    #[test]
    fn test_element_access_parses_as_binary() {
        let Expr::Binary { operator, .. } = parse_one("xs[0]") else {
            panic!("expected binary");
        };
        assert_eq!(operator, Token::OpenBracket);
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let Expr::Assignment { expression, .. } = parse_one("a := b := 1") else {
            panic!("expected assignment");
        };
        assert!(matches!(*expression, Expr::Assignment { .. }));
    }

    #[test]
    fn test_field_assignment_is_rejected() {
        let err = parse("{ p.x := 1 }").unwrap_err();
        assert!(matches!(err, ParseError::FieldAssignment { .. }));
    }

    #[test]
    fn test_literal_call_target_is_rejected() {
        let err = parse("{ 1(2) }").unwrap_err();
        assert!(matches!(err, ParseError::InvalidCallTarget { .. }));
    }
}
