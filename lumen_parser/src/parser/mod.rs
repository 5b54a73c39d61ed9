//! Precedence-climbing parser for Lumen.
//!
//! The driver reads a prefix expression for the current token, then keeps
//! applying infix rules while the upcoming token's precedence is at least the
//! caller's. The rule table lives on [`Token::rule`]; this module only
//! dispatches. There is no error recovery: the first error aborts.

mod declarations;
mod expressions;

use crate::ast::Expr;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, SpannedToken};
use crate::span::Span;
use crate::token::{InfixRule, Precedence, PrefixRule, Token};

/// Lumen parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Current (non-trivia) token; `Eof` once input is exhausted
    current: SpannedToken<'a>,
}

impl std::fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

/// Parse a complete program: a scope terminated by end of file.
pub fn parse(source: &str) -> ParseResult<Expr> {
    Parser::new(source)?.parse_program()
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = Self::next_meaningful(&mut lexer)?;
        Ok(Self { lexer, current })
    }

    /// Parse the whole input as the program scope.
    pub fn parse_program(mut self) -> ParseResult<Expr> {
        self.parse_scope_contents(self.current.span, Token::Eof)
    }

    // ==================== Token management ====================

    fn next_meaningful(lexer: &mut Lexer<'a>) -> ParseResult<SpannedToken<'a>> {
        loop {
            match lexer.next_token() {
                Some(Ok(token)) if token.kind.is_trivia() => continue,
                Some(Ok(token)) => return Ok(token),
                Some(Err(e)) => return Err(e),
                None => {
                    let end = lexer.source().len();
                    let span = lexer.source_map().span(end, end);
                    return Ok(SpannedToken::new(Token::Eof, span, ""));
                }
            }
        }
    }

    /// Consume the current token and return it.
    pub(crate) fn advance(&mut self) -> ParseResult<SpannedToken<'a>> {
        let previous = self.current;
        if previous.kind != Token::Eof {
            self.current = Self::next_meaningful(&mut self.lexer)?;
        }
        Ok(previous)
    }

    /// The current token without consuming it.
    pub(crate) fn peek(&self) -> SpannedToken<'a> {
        self.current
    }

    /// Kind of the token after the current one (second lookahead)
    pub(crate) fn peek_next_kind(&mut self) -> ParseResult<Token> {
        loop {
            let peeked = match self.lexer.peek() {
                Some(Ok(token)) => Some(token.kind),
                Some(Err(e)) => return Err(e.clone()),
                None => None,
            };
            match peeked {
                Some(kind) if kind.is_trivia() => {
                    let _ = self.lexer.next_token();
                }
                Some(kind) => return Ok(kind),
                None => return Ok(Token::Eof),
            }
        }
    }

    /// Consume the current token if it has the expected kind.
    pub(crate) fn expect(&mut self, expected: Token) -> ParseResult<SpannedToken<'a>> {
        if self.current.kind == expected {
            self.advance()
        } else {
            Err(ParseError::UnexpectedToken {
                found: self.current.kind.name().to_string(),
                expected: expected.name().to_string(),
                span: self.current.span,
            })
        }
    }

    // ==================== Driver ====================

    pub(crate) fn parse_precedence(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        let token = self.peek();
        let rule = token.kind.rule();

        let Some(prefix) = rule.prefix else {
            return Err(ParseError::ExpectedExpression {
                found: token.kind.name().to_string(),
                span: token.span,
            });
        };
        if rule.precedence != Precedence::None && rule.precedence < precedence {
            return Err(ParseError::ExpectedExpression {
                found: token.kind.name().to_string(),
                span: token.span,
            });
        }

        let mut result = self.dispatch_prefix(prefix)?;

        loop {
            let next_rule = self.peek().kind.rule();
            if precedence > next_rule.precedence {
                break;
            }
            let Some(infix) = next_rule.infix else {
                break;
            };
            result = self.dispatch_infix(infix, result)?;
        }

        Ok(result)
    }

    fn dispatch_prefix(&mut self, rule: PrefixRule) -> ParseResult<Expr> {
        match rule {
            PrefixRule::Literal => self.parse_literal(),
            PrefixRule::Interpolation => self.parse_interpolation(),
            PrefixRule::Unary => self.parse_unary(),
            PrefixRule::Grouping => self.parse_grouping(),
            PrefixRule::Scope => self.parse_scope(),
            PrefixRule::Identifier => self.parse_identifier(),
            PrefixRule::ObjectLiteral => self.parse_object_literal(),
            PrefixRule::ArrayLiteral => self.parse_array_literal(),
            PrefixRule::Conditional => self.parse_conditional(),
            PrefixRule::WhileLoop => self.parse_while_loop(),
            PrefixRule::ForLoop => self.parse_for_loop(),
            PrefixRule::VarConstDeclaration => self.parse_var_const_declaration(),
            PrefixRule::FunctionDeclaration => self.parse_function_declaration(),
            PrefixRule::TypeDeclaration => self.parse_type_declaration(),
        }
    }

    fn dispatch_infix(&mut self, rule: InfixRule, lhs: Expr) -> ParseResult<Expr> {
        match rule {
            InfixRule::Binary => self.parse_binary(lhs),
            InfixRule::Assignment => self.parse_assignment(lhs),
            InfixRule::DotAccess => self.parse_dot_access(lhs),
            InfixRule::FunctionCall => self.parse_function_call(lhs),
            InfixRule::ElementAccess => self.parse_element_access(lhs),
        }
    }

    // ==================== Shared helpers ====================

    /// Parse a delimited expression list. Stops before `closing`; allows a
    /// trailing delimiter.
    pub(crate) fn parse_expressions(
        &mut self,
        delimiter: Token,
        closing: Token,
        precedence: Precedence,
    ) -> ParseResult<Vec<Expr>> {
        let mut list = vec![self.parse_precedence(precedence)?];
        while self.peek().kind == delimiter {
            self.advance()?;
            if self.peek().kind == closing {
                break;
            }
            list.push(self.parse_precedence(precedence)?);
        }
        Ok(list)
    }

    /// Parse the inside of a scope up to (and including) `closing`. At least
    /// one expression is required.
    pub(crate) fn parse_scope_contents(
        &mut self,
        opening_span: Span,
        closing: Token,
    ) -> ParseResult<Expr> {
        if self.peek().kind == closing {
            return Err(ParseError::EmptyScope {
                span: self.peek().span,
            });
        }

        let expressions =
            self.parse_expressions(Token::Semicolon, closing, Precedence::Declaration)?;
        let closing_token = self.expect(closing)?;

        Ok(Expr::Scope {
            span: opening_span.merge(&closing_token.span),
            expressions,
        })
    }
}
