//! Declarations, control flow, and type expressions.

use crate::ast::{DeclKeyword, Expr, Parameter, TypeExpr, TypeField};
use crate::error::{ParseError, ParseResult};
use crate::parser::Parser;
use crate::token::{Precedence, Token};

impl<'a> Parser<'a> {
    pub(crate) fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let keyword = self.advance()?;

        self.expect(Token::OpenParen)?;
        let condition = self.parse_precedence(Precedence::Assignment)?;
        self.expect(Token::CloseParen)?;
        let then_clause = self.parse_precedence(Precedence::Assignment)?;
        self.expect(Token::KwElse)?;
        let else_clause = self.parse_precedence(Precedence::Assignment)?;

        Ok(Expr::Conditional {
            span: keyword.span.merge(&else_clause.span()),
            condition: Box::new(condition),
            then_clause: Box::new(then_clause),
            else_clause: Box::new(else_clause),
        })
    }

    pub(crate) fn parse_while_loop(&mut self) -> ParseResult<Expr> {
        let keyword = self.advance()?;

        self.expect(Token::OpenParen)?;
        let condition = self.parse_precedence(Precedence::Assignment)?;
        self.expect(Token::CloseParen)?;
        let body = self.parse_precedence(Precedence::Assignment)?;

        Ok(Expr::WhileLoop {
            span: keyword.span.merge(&body.span()),
            condition: Box::new(condition),
            body: Box::new(body),
        })
    }

    pub(crate) fn parse_for_loop(&mut self) -> ParseResult<Expr> {
        let keyword = self.advance()?;

        self.expect(Token::OpenParen)?;
        self.expect(Token::KwVar)?;
        let variable = self.expect(Token::Identifier)?;
        self.expect(Token::KwIn)?;
        let iterator = self.parse_precedence(Precedence::Assignment)?;
        self.expect(Token::CloseParen)?;
        let body = self.parse_precedence(Precedence::Assignment)?;

        Ok(Expr::ForLoop {
            span: keyword.span.merge(&body.span()),
            variable: variable.text.to_string(),
            variable_span: variable.span,
            iterator: Box::new(iterator),
            body: Box::new(body),
        })
    }

    /// `var NAME [: TYPE] := EXPR` and `constant NAME [: TYPE] := EXPR`
    pub(crate) fn parse_var_const_declaration(&mut self) -> ParseResult<Expr> {
        let keyword_token = self.advance()?;
        let keyword = if keyword_token.kind == Token::KwVar {
            DeclKeyword::Var
        } else {
            DeclKeyword::Constant
        };
        let name = self.expect(Token::Identifier)?;

        let type_expr = if self.peek().kind == Token::Colon {
            self.advance()?;
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(Token::ColonEqual)?;
        let initializer = self.parse_precedence(Precedence::Assignment)?;

        Ok(Expr::Declaration {
            keyword,
            name: name.text.to_string(),
            name_span: name.span,
            type_expr,
            span: keyword_token.span.merge(&initializer.span()),
            initializer: Some(Box::new(initializer)),
        })
    }

    /// `function NAME(param: T, …) [: T] := EXPR`
    pub(crate) fn parse_function_declaration(&mut self) -> ParseResult<Expr> {
        let keyword = self.advance()?;
        let name = self.expect(Token::Identifier)?;

        self.expect(Token::OpenParen)?;
        let mut parameters = Vec::new();
        if self.peek().kind != Token::CloseParen {
            loop {
                let param_name = self.expect(Token::Identifier)?;
                self.expect(Token::Colon)?;
                let type_expr = self.parse_type()?;
                parameters.push(Parameter {
                    name: param_name.text.to_string(),
                    name_span: param_name.span,
                    type_expr,
                });

                if self.peek().kind != Token::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(Token::CloseParen)?;

        let return_type = if self.peek().kind == Token::Colon {
            self.advance()?;
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(Token::ColonEqual)?;
        let body = self.parse_precedence(Precedence::Assignment)?;

        Ok(Expr::Function {
            name: name.text.to_string(),
            name_span: name.span,
            parameters,
            return_type,
            span: keyword.span.merge(&body.span()),
            body: Box::new(body),
        })
    }

    /// `type NAME := TYPE`
    pub(crate) fn parse_type_declaration(&mut self) -> ParseResult<Expr> {
        let keyword = self.advance()?;
        let name = self.expect(Token::Identifier)?;
        self.expect(Token::ColonEqual)?;
        let type_expr = self.parse_type()?;

        Ok(Expr::Declaration {
            keyword: DeclKeyword::Type,
            name: name.text.to_string(),
            name_span: name.span,
            span: keyword.span.merge(&type_expr.span()),
            type_expr: Some(type_expr),
            initializer: None,
        })
    }

    /// A type expression: a name, an object type `$[f: T, …]` (fields stored
    /// sorted by name), or an array type `[T]`.
    pub(crate) fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        match self.peek().kind {
            Token::Identifier => {
                let name = self.advance()?;
                Ok(TypeExpr::Name {
                    name: name.text.to_string(),
                    span: name.span,
                })
            }
            Token::OpenDollarBracket => {
                let open = self.advance()?;
                let mut fields: Vec<TypeField> = Vec::new();
                while self.peek().kind != Token::CloseBracket {
                    if !fields.is_empty() {
                        self.expect(Token::Comma)?;
                    }
                    let field_name = self.expect(Token::Identifier)?;
                    self.expect(Token::Colon)?;
                    let field_type = self.parse_type()?;

                    if fields.iter().any(|f| f.name == field_name.text) {
                        return Err(ParseError::DuplicateTypeField {
                            name: field_name.text.to_string(),
                            span: field_name.span,
                        });
                    }
                    fields.push(TypeField {
                        name: field_name.text.to_string(),
                        name_span: field_name.span,
                        type_expr: field_type,
                    });
                }
                let closing = self.expect(Token::CloseBracket)?;
                fields.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(TypeExpr::Object {
                    fields,
                    span: open.span.merge(&closing.span),
                })
            }
            Token::OpenBracket => {
                let open = self.advance()?;
                let element = self.parse_type()?;
                let closing = self.expect(Token::CloseBracket)?;
                Ok(TypeExpr::Array {
                    element: Box::new(element),
                    span: open.span.merge(&closing.span),
                })
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.name().to_string(),
                expected: "a type".to_string(),
                span: self.peek().span,
            }),
        }
    }
}
