//! Compile-time constant folding.
//!
//! `constant` initializers must fold completely; ordinary literals go
//! through the same routine so literal handling exists exactly once.
//! Foldable shapes: literals, references to earlier constants, and the
//! binary operators `+ - * /` (with `+` also concatenating strings).

use lumen_parser::{Expr, Span, Token};

use crate::binder::{BindResult, Binder};
use crate::symbols::{BaseType, ConstObjectField, ConstValue, ObjectField, SymbolId};

impl Binder {
    pub(crate) fn fold_constant(&mut self, expr: &Expr) -> BindResult<(SymbolId, ConstValue)> {
        match expr {
            Expr::Literal { token, text, span } => self.fold_literal(*token, text, *span),
            Expr::Binary {
                operator,
                lhs,
                rhs,
                span,
            } => self.fold_binary(*operator, lhs, rhs, *span),
            Expr::Symbol { name, span } => self.fold_symbol(name, *span),
            Expr::ObjectLiteral { fields, span } => self.fold_object_literal(fields, *span),
            other => self.error(
                other.span(),
                format!("cannot fold a {} into a constant", other.kind_name()),
            ),
        }
    }

    /// Fold an object literal into a constant object. Spreads cannot appear
    /// in constants; duplicate field names follow last-wins.
    fn fold_object_literal(
        &mut self,
        fields: &[Expr],
        _span: Span,
    ) -> BindResult<(SymbolId, ConstValue)> {
        let mut folded: Vec<ConstObjectField> = Vec::with_capacity(fields.len());
        for field in fields {
            let (name, value_expr) = match field {
                Expr::Assignment {
                    target, expression, ..
                } => match target.as_ref() {
                    Expr::Symbol { name, .. } => (name.clone(), expression.as_ref()),
                    other => {
                        return self.error(
                            other.span(),
                            format!("cannot use a {} as a constant object field", other.kind_name()),
                        )
                    }
                },
                Expr::Symbol { name, .. } => (name.clone(), field),
                other => {
                    return self.error(
                        other.span(),
                        format!("cannot fold a {} in a constant object", other.kind_name()),
                    )
                }
            };

            let (type_id, value) = self.fold_constant(value_expr)?;
            let entry = ConstObjectField {
                name,
                type_id,
                value,
            };
            match folded.iter_mut().find(|f| f.name == entry.name) {
                Some(existing) => *existing = entry,
                None => folded.push(entry),
            }
        }
        folded.sort_by(|a, b| a.name.cmp(&b.name));

        let query: Vec<ObjectField> = folded
            .iter()
            .map(|f| ObjectField {
                name: f.name.clone(),
                type_id: f.type_id,
            })
            .collect();
        let type_id = self.symbols.intern_type_object(query);
        Ok((type_id, ConstValue::Object(folded)))
    }

    fn fold_literal(
        &mut self,
        token: Token,
        text: &str,
        span: Span,
    ) -> BindResult<(SymbolId, ConstValue)> {
        match token {
            Token::Number => {
                let value: f64 = text.parse().map_err(|_| {
                    self.make_error(span, format!("invalid number literal `{text}`"))
                })?;
                Ok((self.types.number, ConstValue::Number(value)))
            }
            // A complete string literal: strip `"…"`.
            Token::String => Ok((
                self.types.string,
                ConstValue::String(self.unescape_string(text, 1, 1, span)?),
            )),
            // An interpolation segment: strip the leading `"`/`}` and the
            // trailing `${`.
            Token::StringInterpolation => Ok((
                self.types.string,
                ConstValue::String(self.unescape_string(text, 1, 2, span)?),
            )),
            Token::True => Ok((self.types.boolean, ConstValue::Boolean(true))),
            Token::False => Ok((self.types.boolean, ConstValue::Boolean(false))),
            other => self.error(span, format!("cannot fold {} literal", other.name())),
        }
    }

    fn fold_binary(
        &mut self,
        operator: Token,
        lhs: &Expr,
        rhs: &Expr,
        span: Span,
    ) -> BindResult<(SymbolId, ConstValue)> {
        let (lhs_type, lhs_value) = self.fold_constant(lhs)?;
        let (rhs_type, rhs_value) = self.fold_constant(rhs)?;

        if operator == Token::Plus {
            if let (ConstValue::String(a), ConstValue::String(b)) = (&lhs_value, &rhs_value) {
                return Ok((
                    self.types.string,
                    ConstValue::String(format!("{a}{b}")),
                ));
            }
        }

        let number = |binder: &mut Self, type_id: SymbolId, value: &ConstValue, side: &str| {
            if !binder.symbols.is_type_base(type_id, BaseType::Number) {
                return binder.error(
                    span,
                    format!(
                        "cannot fold constant for operator {}: {side} operand must be of type `Number`",
                        operator.name()
                    ),
                );
            }
            match value {
                ConstValue::Number(n) => Ok(*n),
                _ => binder.error(
                    span,
                    format!(
                        "cannot fold constant for operator {}: {side} operand must be of type `Number`",
                        operator.name()
                    ),
                ),
            }
        };

        let a = number(self, lhs_type, &lhs_value, "left")?;
        let b = number(self, rhs_type, &rhs_value, "right")?;

        let folded = match operator {
            Token::Plus => a + b,
            Token::Minus => a - b,
            Token::Star => a * b,
            Token::Slash => a / b,
            other => {
                return self.error(
                    span,
                    format!("cannot fold constant for operator {}", other.name()),
                )
            }
        };
        Ok((self.types.number, ConstValue::Number(folded)))
    }

    fn fold_symbol(&mut self, name: &str, span: Span) -> BindResult<(SymbolId, ConstValue)> {
        let Some(id) = self.symbols.find(name) else {
            return self.error(span, format!("cannot fold constant: unknown symbol `{name}`"));
        };
        match &self.symbols.symbol(id).info {
            crate::symbols::SymbolInfo::Constant { type_id, value } => {
                Ok((*type_id, value.clone()))
            }
            _ => self.error(
                span,
                format!("cannot fold constant: symbol `{name}` does not resolve to a constant value"),
            ),
        }
    }

    /// Strip `prefix`/`postfix` delimiter bytes and process escapes.
    /// Supported: `\n`, `\r`, `\t`, `\"`, `\\`; anything else is an error.
    pub(crate) fn unescape_string(
        &self,
        text: &str,
        prefix: usize,
        postfix: usize,
        span: Span,
    ) -> BindResult<String> {
        let payload = &text[prefix..text.len() - postfix];
        let mut out = String::with_capacity(payload.len());
        let mut chars = payload.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    return self.error(span, format!("unknown escape sequence `\\{other}`"))
                }
                None => return self.error(span, "unknown escape sequence at end of string"),
            }
        }
        Ok(out)
    }
}
