//! Expression binding: literals, operators, calls, object and array
//! literals, field access, control flow, and string interpolation.

use lumen_parser::{Expr, Span, Token};

use crate::binder::tree::{BoundField, BoundKind, BoundNode, LogicalOp};
use crate::binder::{BindResult, Binder};
use crate::symbols::{
    BaseType, BoundaryKind, ConstValue, ObjectField, SymbolId, SymbolInfo, TypeInfo,
};

impl Binder {
    // ==================== Literals ====================

    pub(crate) fn bind_literal(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        let (type_id, value) = self.fold_constant(expr)?;
        Ok(BoundNode::new(BoundKind::Value(value), type_id))
    }

    // ==================== Operators ====================

    /// Resolve a unary operation as a one-argument function call. Returns
    /// `None` when no overload matches, so callers can phrase the error.
    pub(crate) fn bind_unary_call(
        &mut self,
        operand: BoundNode,
        name: &str,
    ) -> BindResult<Option<BoundNode>> {
        let Some(function) = self.symbols.find_function(name, &[operand.type_id]) else {
            return Ok(None);
        };
        self.note_function_used(function);
        let SymbolInfo::Function { signature, .. } = &self.symbols.symbol(function).info else {
            unreachable!("find_function returned a non-function");
        };
        let returns = signature.returns;
        Ok(Some(BoundNode::new(
            BoundKind::FunctionCall {
                function,
                arguments: vec![operand],
            },
            returns,
        )))
    }

    pub(crate) fn bind_unary_operator(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        let Expr::Unary {
            operator,
            operand,
            span,
        } = expr
        else {
            unreachable!("bind_unary_operator called on a non-unary");
        };

        let name = match operator {
            Token::Minus => "negate",
            Token::Bang => "not",
            Token::DotDot => {
                return self.error(
                    *span,
                    "spread is only allowed inside object and array literals",
                )
            }
            other => {
                return self.error(
                    *span,
                    format!("cannot resolve function for unary operator {}", other.name()),
                )
            }
        };

        let bound_operand = self.bind_expr(operand)?;
        let operand_type = bound_operand.type_id;
        match self.bind_unary_call(bound_operand, name)? {
            Some(node) => Ok(node),
            None => self.error(
                *span,
                format!(
                    "cannot resolve function `{name}({})` for unary operator {}",
                    self.symbols.type_name(operand_type),
                    operator.name()
                ),
            ),
        }
    }

    pub(crate) fn bind_binary_operator(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        let Expr::Binary {
            operator,
            lhs,
            rhs,
            span,
        } = expr
        else {
            unreachable!("bind_binary_operator called on a non-binary");
        };

        let name = match operator {
            Token::Plus => "add",
            Token::Minus => "subtract",
            Token::Star => "multiply",
            Token::Slash => "divide",
            Token::Less => "less",
            Token::LessEqual => "lessEqual",
            Token::Greater => "greater",
            Token::GreaterEqual => "greaterEqual",
            Token::EqualEqual => "equal",
            Token::BangEqual => "notEqual",
            Token::AndAnd | Token::PipePipe => {
                return self.bind_logical_operator(*operator, lhs, rhs, *span)
            }
            Token::DotDot => return self.bind_range(lhs, rhs, *span),
            other => {
                return self.error(
                    *span,
                    format!(
                        "cannot resolve function for binary operator {}",
                        other.name()
                    ),
                )
            }
        };

        let bound_lhs = self.bind_expr(lhs)?;
        let bound_rhs = self.bind_expr(rhs)?;
        let (lhs_type, rhs_type) = (bound_lhs.type_id, bound_rhs.type_id);

        let Some(function) = self.symbols.find_function(name, &[lhs_type, rhs_type]) else {
            return self.error(
                *span,
                format!(
                    "cannot resolve function `{name}({}, {})` for binary operator {}",
                    self.symbols.type_name(lhs_type),
                    self.symbols.type_name(rhs_type),
                    operator.name()
                ),
            );
        };
        self.note_function_used(function);
        let SymbolInfo::Function { signature, .. } = &self.symbols.symbol(function).info else {
            unreachable!("find_function returned a non-function");
        };
        let returns = signature.returns;

        Ok(BoundNode::new(
            BoundKind::FunctionCall {
                function,
                arguments: vec![bound_lhs, bound_rhs],
            },
            returns,
        ))
    }

    fn bind_logical_operator(
        &mut self,
        operator: Token,
        lhs: &Expr,
        rhs: &Expr,
        span: Span,
    ) -> BindResult<BoundNode> {
        let bound_lhs = self.bind_expr(lhs)?;
        let bound_rhs = self.bind_expr(rhs)?;
        for (side, node) in [("left", &bound_lhs), ("right", &bound_rhs)] {
            if !self.symbols.is_type_base(node.type_id, BaseType::Boolean) {
                return self.error(
                    span,
                    format!(
                        "{side} operand of {} must be of type `Boolean`, found `{}`",
                        operator.name(),
                        self.symbols.type_name(node.type_id)
                    ),
                );
            }
        }

        let op = if operator == Token::AndAnd {
            LogicalOp::And
        } else {
            LogicalOp::Or
        };
        Ok(BoundNode::new(
            BoundKind::LogicalOperator {
                operator: op,
                lhs: Box::new(bound_lhs),
                rhs: Box::new(bound_rhs),
            },
            self.types.boolean,
        ))
    }

    /// `a .. b` builds the range object `[from: a, to: b]`.
    fn bind_range(&mut self, lhs: &Expr, rhs: &Expr, span: Span) -> BindResult<BoundNode> {
        let bound_lhs = self.bind_expr(lhs)?;
        let bound_rhs = self.bind_expr(rhs)?;
        for (side, node) in [("left", &bound_lhs), ("right", &bound_rhs)] {
            if !self.symbols.is_type_base(node.type_id, BaseType::Number) {
                return self.error(
                    span,
                    format!(
                        "{side} operand of `..` must be of type `Number`, found `{}`",
                        self.symbols.type_name(node.type_id)
                    ),
                );
            }
        }

        let number = self.types.number;
        let type_id = self.symbols.intern_type_object(vec![
            ObjectField {
                name: "from".to_string(),
                type_id: number,
            },
            ObjectField {
                name: "to".to_string(),
                type_id: number,
            },
        ]);
        Ok(BoundNode::new(
            BoundKind::Object(vec![
                BoundField {
                    name: "from".to_string(),
                    expression: bound_lhs,
                },
                BoundField {
                    name: "to".to_string(),
                    expression: bound_rhs,
                },
            ]),
            type_id,
        ))
    }

    // ==================== Calls ====================

    pub(crate) fn bind_function_call(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        let Expr::FunctionCall {
            name,
            arguments,
            span,
            ..
        } = expr
        else {
            unreachable!("bind_function_call called on a non-call");
        };

        let mut bound_arguments = Vec::with_capacity(arguments.len());
        for argument in arguments {
            bound_arguments.push(self.bind_expr(argument)?);
        }
        let argument_types: Vec<SymbolId> =
            bound_arguments.iter().map(|a| a.type_id).collect();

        let Some(function) = self.symbols.find_function(name, &argument_types) else {
            let rendered: Vec<&str> = argument_types
                .iter()
                .map(|&t| self.symbols.type_name(t))
                .collect();
            return self.error(
                *span,
                format!("cannot resolve function `{name}({})`", rendered.join(", ")),
            );
        };
        self.note_function_used(function);
        let SymbolInfo::Function { signature, .. } = &self.symbols.symbol(function).info else {
            unreachable!("find_function returned a non-function");
        };
        let returns = signature.returns;

        Ok(BoundNode::new(
            BoundKind::FunctionCall {
                function,
                arguments: bound_arguments,
            },
            returns,
        ))
    }

    // ==================== Object literals ====================

    pub(crate) fn bind_object_literal(
        &mut self,
        fields: &[Expr],
        _span: Span,
    ) -> BindResult<BoundNode> {
        self.symbols.push_boundary(BoundaryKind::Scope);

        let mut bound_fields: Vec<BoundField> = Vec::new();
        let mut type_query: Vec<ObjectField> = Vec::new();
        let mut temporaries: Vec<BoundNode> = Vec::new();

        for field in fields {
            match field {
                Expr::Assignment {
                    target, expression, ..
                } => {
                    let Expr::Symbol { name, .. } = target.as_ref() else {
                        return self.error(
                            target.span(),
                            format!("cannot use a {} as an object field", target.kind_name()),
                        );
                    };
                    let bound = self.bind_expr(expression)?;
                    if self.symbols.is_type_base(bound.type_id, BaseType::None) {
                        return self.error(
                            expression.span(),
                            format!("object field `{name}` does not produce a value"),
                        );
                    }
                    add_object_field(&mut bound_fields, &mut type_query, name.clone(), bound);
                }
                Expr::Unary {
                    operator: Token::DotDot,
                    operand,
                    ..
                } => {
                    // Spread: evaluate the source object into an anonymous
                    // local so each field load references it exactly once.
                    let mut bound = self.bind_expr(operand)?;
                    bound.persistent = true;
                    let spread_type = self.symbols.resolve_alias(bound.type_id);
                    let SymbolInfo::Type(TypeInfo::Object(spread_fields)) =
                        self.symbols.symbol(spread_type).info.clone()
                    else {
                        return self.error(
                            operand.span(),
                            "only object expressions can be spread for composing objects",
                        );
                    };
                    let var = self.symbols.push_var("", bound.type_id);
                    let var_index = self.symbols.symbol(var).stack_index as usize;
                    temporaries.push(bound);

                    for (index, spread_field) in spread_fields.iter().enumerate() {
                        let load = BoundNode::new(
                            BoundKind::LoadField {
                                expression: Box::new(BoundNode::new(
                                    BoundKind::VarRef(var_index),
                                    spread_type,
                                )),
                                field_index: index,
                            },
                            spread_field.type_id,
                        );
                        add_object_field(
                            &mut bound_fields,
                            &mut type_query,
                            spread_field.name.clone(),
                            load,
                        );
                    }
                }
                Expr::Symbol { name, .. } => {
                    let bound = self.bind_expr(field)?;
                    add_object_field(&mut bound_fields, &mut type_query, name.clone(), bound);
                }
                other => {
                    return self.error(
                        other.span(),
                        format!("cannot use a {} in an object expression", other.kind_name()),
                    )
                }
            }
        }

        // Intern only after the literal's boundary is gone; a type symbol
        // pushed inside it would be truncated away with the temporaries and
        // the next structurally-equal literal would intern a distinct id.
        self.symbols.pop_boundary();
        let type_id = self.symbols.intern_type_object(type_query);
        let node = BoundNode::new(BoundKind::Object(bound_fields), type_id);

        if temporaries.is_empty() {
            Ok(node)
        } else {
            temporaries.push(node);
            Ok(BoundNode::new(BoundKind::Scope(temporaries), type_id))
        }
    }

    // ==================== Array literals ====================

    pub(crate) fn bind_array_literal(
        &mut self,
        elements: &[Expr],
        span: Span,
    ) -> BindResult<BoundNode> {
        let mut bound_elements = Vec::with_capacity(elements.len());
        let mut element_type: Option<SymbolId> = None;

        for element in elements {
            let (node, contributed) = match element {
                Expr::Unary {
                    operator: Token::DotDot,
                    operand,
                    ..
                } => {
                    let bound = self.bind_expr(operand)?;
                    let resolved = self.symbols.resolve_alias(bound.type_id);
                    let contributed = match &self.symbols.symbol(resolved).info {
                        SymbolInfo::Type(TypeInfo::Array(element_type)) => Some(*element_type),
                        SymbolInfo::Type(TypeInfo::Base(BaseType::EmptyArray)) => None,
                        _ => {
                            return self.error(
                                operand.span(),
                                "only array expressions can be spread into an array literal",
                            )
                        }
                    };
                    let spread_type = bound.type_id;
                    (
                        BoundNode::new(BoundKind::Spread(Box::new(bound)), spread_type),
                        contributed,
                    )
                }
                other => {
                    let bound = self.bind_expr(other)?;
                    if self.symbols.is_type_base(bound.type_id, BaseType::None) {
                        return self.error(
                            other.span(),
                            "array element does not produce a value",
                        );
                    }
                    let contributed = Some(bound.type_id);
                    (bound, contributed)
                }
            };

            if let Some(contributed) = contributed {
                match element_type {
                    None => element_type = Some(contributed),
                    Some(expected) => {
                        if !self.symbols.assignable(contributed, expected) {
                            return self.error(
                                span,
                                format!(
                                    "array element of type `{}` does not match element type `{}`",
                                    self.symbols.type_name(contributed),
                                    self.symbols.type_name(expected)
                                ),
                            );
                        }
                    }
                }
            }
            bound_elements.push(node);
        }

        let type_id = match element_type {
            Some(element) => self.symbols.intern_type_array(element),
            None => self.types.empty_array,
        };
        Ok(BoundNode::new(BoundKind::Array(bound_elements), type_id))
    }

    // ==================== Field access ====================

    pub(crate) fn bind_field_access(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        let Expr::FieldAccess {
            object,
            field,
            field_span,
            ..
        } = expr
        else {
            unreachable!("bind_field_access called on a non-field-access");
        };

        let bound_object = self.bind_expr(object)?;
        let object_type = self.symbols.resolve_alias(bound_object.type_id);
        let SymbolInfo::Type(TypeInfo::Object(fields)) =
            &self.symbols.symbol(object_type).info
        else {
            return self.error(
                object.span(),
                format!(
                    "fields can only be accessed on object types, found `{}`",
                    self.symbols.type_name(bound_object.type_id)
                ),
            );
        };

        let Some(field_index) = fields.iter().position(|f| f.name == *field) else {
            return self.error(
                *field_span,
                format!(
                    "objects of type `{}` have no field `{field}`",
                    self.symbols.type_name(bound_object.type_id)
                ),
            );
        };
        let field_type = fields[field_index].type_id;

        // Field access on a folded constant object folds away entirely.
        if let BoundKind::Value(ConstValue::Object(const_fields)) = &bound_object.kind {
            let folded = const_fields[field_index].clone();
            return Ok(BoundNode::new(BoundKind::Value(folded.value), folded.type_id));
        }

        Ok(BoundNode::new(
            BoundKind::LoadField {
                expression: Box::new(bound_object),
                field_index,
            },
            field_type,
        ))
    }

    // ==================== Control flow ====================

    pub(crate) fn bind_conditional(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        let Expr::Conditional {
            condition,
            then_clause,
            else_clause,
            span,
        } = expr
        else {
            unreachable!("bind_conditional called on a non-conditional");
        };

        let bound_condition = self.bind_condition(condition)?;
        let bound_then = self.bind_expr(then_clause)?;
        let bound_else = self.bind_expr(else_clause)?;

        let then_type = self.symbols.resolve_alias(bound_then.type_id);
        let else_type = self.symbols.resolve_alias(bound_else.type_id);
        if then_type != else_type {
            return self.error(
                *span,
                format!(
                    "types `{}` and `{}` do not match in the conditional expression clauses",
                    self.symbols.type_name(bound_then.type_id),
                    self.symbols.type_name(bound_else.type_id)
                ),
            );
        }

        let type_id = bound_then.type_id;
        Ok(BoundNode::new(
            BoundKind::Conditional {
                condition: Box::new(bound_condition),
                then_clause: Box::new(bound_then),
                else_clause: Box::new(bound_else),
            },
            type_id,
        ))
    }

    fn bind_condition(&mut self, condition: &Expr) -> BindResult<BoundNode> {
        let bound = self.bind_expr(condition)?;
        if !self.symbols.is_type_base(bound.type_id, BaseType::Boolean) {
            return self.error(
                condition.span(),
                format!(
                    "condition operand type `{}` does not match type `Boolean`",
                    self.symbols.type_name(bound.type_id)
                ),
            );
        }
        Ok(bound)
    }

    pub(crate) fn bind_while_loop(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        let Expr::WhileLoop {
            condition, body, ..
        } = expr
        else {
            unreachable!("bind_while_loop called on a non-while");
        };

        let bound_condition = self.bind_condition(condition)?;
        let bound_body = self.bind_expr(body)?;
        Ok(BoundNode::new(
            BoundKind::WhileLoop {
                condition: Box::new(bound_condition),
                body: Box::new(bound_body),
            },
            self.types.none,
        ))
    }

    /// Lower `for (var x in init) body` into
    /// `{ var it := init; while (!it.finished) { var x := it.current; body; it := next(it) } }`
    /// with `it` held in an anonymous local.
    pub(crate) fn bind_for_loop(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        let Expr::ForLoop {
            variable,
            iterator,
            body,
            ..
        } = expr
        else {
            unreachable!("bind_for_loop called on a non-for");
        };

        self.symbols.push_boundary(BoundaryKind::Scope);

        let mut bound_initializer = self.bind_expr(iterator)?;
        let iterator_type = bound_initializer.type_id;

        let resolved = self.symbols.resolve_alias(iterator_type);
        let SymbolInfo::Type(TypeInfo::Object(fields)) = self.symbols.symbol(resolved).info.clone()
        else {
            return self.error(
                iterator.span(),
                "only objects can be used as iterators in for loops",
            );
        };

        let mut finished_index = None;
        let mut current = None;
        for (index, field) in fields.iter().enumerate() {
            if field.name == "finished"
                && self.symbols.is_type_base(field.type_id, BaseType::Boolean)
            {
                finished_index = Some(index);
            } else if field.name == "current" {
                current = Some((index, field.type_id));
            }
        }
        let (Some(finished_index), Some((current_index, value_type))) = (finished_index, current)
        else {
            return self.error(
                iterator.span(),
                "iterator in for loop needs a field `current` and a field `finished` of type `Boolean`",
            );
        };

        let next_function = self.symbols.find_function("next", &[iterator_type]);
        let next_returns_iterator = next_function.is_some_and(|f| {
            match &self.symbols.symbol(f).info {
                SymbolInfo::Function { signature, .. } => {
                    self.symbols.resolve_alias(signature.returns)
                        == self.symbols.resolve_alias(iterator_type)
                }
                _ => false,
            }
        });
        let Some(next_function) = next_function.filter(|_| next_returns_iterator) else {
            let name = self.symbols.type_name(iterator_type).to_string();
            return self.error(
                iterator.span(),
                format!("iterator in for loop needs a function `next({name}): {name}`"),
            );
        };
        self.note_function_used(next_function);

        let iterator_var = self.symbols.push_var("", iterator_type);
        let iterator_slot = self.symbols.symbol(iterator_var).stack_index as usize;
        bound_initializer.persistent = true;

        let iterator_ref =
            || BoundNode::new(BoundKind::VarRef(iterator_slot), iterator_type);

        let finished_load = BoundNode::new(
            BoundKind::LoadField {
                expression: Box::new(iterator_ref()),
                field_index: finished_index,
            },
            self.types.boolean,
        );
        let Some(while_condition) = self.bind_unary_call(finished_load, "not")? else {
            return self.error(iterator.span(), "cannot resolve function `not(Boolean)`");
        };

        self.symbols.push_boundary(BoundaryKind::Scope);
        self.symbols.push_var(variable.clone(), value_type);
        let mut current_load = BoundNode::new(
            BoundKind::LoadField {
                expression: Box::new(iterator_ref()),
                field_index: current_index,
            },
            value_type,
        );
        current_load.persistent = true;

        let inner_body = self.bind_expr(body)?;

        let next_call = BoundNode::new(
            BoundKind::FunctionCall {
                function: next_function,
                arguments: vec![iterator_ref()],
            },
            iterator_type,
        );
        let advance = BoundNode::new(
            BoundKind::Assignment {
                scope_index: iterator_slot,
                expression: Box::new(next_call),
            },
            iterator_type,
        );
        self.symbols.pop_boundary();

        let loop_scope = BoundNode::new(
            BoundKind::Scope(vec![current_load, inner_body, advance]),
            iterator_type,
        );
        let while_loop = BoundNode::new(
            BoundKind::WhileLoop {
                condition: Box::new(while_condition),
                body: Box::new(loop_scope),
            },
            self.types.none,
        );

        self.symbols.pop_boundary();

        let none = self.types.none;
        Ok(BoundNode::new(
            BoundKind::Scope(vec![bound_initializer, while_loop]),
            none,
        ))
    }

    // ==================== Interpolation ====================

    pub(crate) fn bind_interpolation(
        &mut self,
        parts: &[Expr],
        span: Span,
    ) -> BindResult<BoundNode> {
        let mut bound_parts = Vec::with_capacity(parts.len());
        for part in parts {
            let bound = self.bind_expr(part)?;
            let bound = if self.symbols.is_type_base(bound.type_id, BaseType::String) {
                bound
            } else {
                let part_type = bound.type_id;
                match self.bind_unary_call(bound, "toString")? {
                    Some(converted) => converted,
                    None => {
                        return self.error(
                            span,
                            format!(
                                "cannot resolve function `toString({})` for string interpolation",
                                self.symbols.type_name(part_type)
                            ),
                        )
                    }
                }
            };
            bound_parts.push(bound);
        }

        Ok(BoundNode::new(
            BoundKind::Interpolation(bound_parts),
            self.types.string,
        ))
    }
}

/// Insert or override (last wins) one object-literal field, keeping both
/// the bound fields and the type query sorted by field name.
fn add_object_field(
    bound_fields: &mut Vec<BoundField>,
    type_query: &mut Vec<ObjectField>,
    name: String,
    expression: BoundNode,
) {
    let type_id = expression.type_id;
    if let Some(position) = bound_fields.iter().position(|f| f.name == name) {
        bound_fields[position].expression = expression;
        type_query[position].type_id = type_id;
        return;
    }
    let position = bound_fields
        .iter()
        .position(|f| f.name > name)
        .unwrap_or(bound_fields.len());
    bound_fields.insert(
        position,
        BoundField {
            name: name.clone(),
            expression,
        },
    );
    type_query.insert(position, ObjectField { name, type_id });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::tree::BoundProgram;
    use lumen_parser::parse;

    fn bind(source: &str) -> crate::binder::BindResult<BoundProgram> {
        let program = parse(source).expect("parse failed");
        Binder::new().bind_program(&program)
    }

    fn first_of(bound: &BoundProgram) -> &BoundNode {
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!("expected inner scope, got {:?}", expressions[0].kind);
        };
        &inner[0]
    }

    #[test]
    fn test_binary_operator_resolves_to_instruction() {
        let bound = bind("{ 1 + 2 }").unwrap();
        let node = first_of(&bound);
        assert!(matches!(node.kind, BoundKind::FunctionCall { .. }));
        assert_eq!(bound.symbols.type_name(node.type_id), "Number");
    }

    #[test]
    fn test_string_concatenation_overload() {
        let bound = bind(r#"{ "a" + "b" }"#).unwrap();
        assert_eq!(
            bound.symbols.type_name(first_of(&bound).type_id),
            "String"
        );
    }

    #[test]
    fn test_unresolved_operator_overload() {
        let err = bind("{ 1 + true }").unwrap_err();
        assert!(err.message.contains("add(Number, Boolean)"));
    }

    #[test]
    fn test_logical_operator_requires_booleans() {
        let err = bind("{ 1 && true }").unwrap_err();
        assert!(err.message.contains("Boolean"));
        let bound = bind("{ true && false }").unwrap();
        assert!(matches!(
            first_of(&bound).kind,
            BoundKind::LogicalOperator {
                operator: LogicalOp::And,
                ..
            }
        ));
    }

    #[test]
    fn test_range_builds_object() {
        let bound = bind("{ 1..3 }").unwrap();
        let node = first_of(&bound);
        assert!(matches!(node.kind, BoundKind::Object(_)));
        assert_eq!(
            bound.symbols.type_name(node.type_id),
            "[from: Number, to: Number]"
        );
    }

    #[test]
    fn test_object_literal_sorted_fields() {
        let bound = bind("{ $[y: 2, x: 1] }").unwrap();
        let BoundKind::Object(fields) = &first_of(&bound).kind else {
            panic!("expected object");
        };
        assert_eq!(fields[0].name, "x");
        assert_eq!(fields[1].name, "y");
    }

    #[test]
    fn test_object_literal_spread_becomes_scope() {
        let bound = bind("{ var p := $[x: 1, y: 2]; $[..p, y: 9] }").unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        // inner[1] is the spread literal, lowered to a scope holding the
        // temporary plus the object node.
        let BoundKind::Scope(parts) = &inner[1].kind else {
            panic!("expected lowered scope, got {:?}", inner[1].kind);
        };
        assert_eq!(parts.len(), 2);
        assert!(parts[0].persistent);
        let BoundKind::Object(fields) = &parts[1].kind else {
            panic!("expected object node");
        };
        assert_eq!(fields.len(), 2);
        // the override `y: 9` replaced the spread's load of y
        assert!(matches!(fields[1].expression.kind, BoundKind::Value(_)));
    }

    #[test]
    fn test_object_shorthand_field() {
        let bound = bind("{ var x := 1; $[x] }").unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        let BoundKind::Object(fields) = &inner[1].kind else {
            panic!("expected object");
        };
        assert_eq!(fields[0].name, "x");
        assert!(matches!(fields[0].expression.kind, BoundKind::VarRef(0)));
    }

    #[test]
    fn test_array_literal_types() {
        let bound = bind("{ [1, 2, 3] }").unwrap();
        assert_eq!(
            bound.symbols.type_name(first_of(&bound).type_id),
            "[Number]"
        );

        let bound = bind("{ [] }").unwrap();
        assert_eq!(bound.symbols.type_name(first_of(&bound).type_id), "[]");
    }

    #[test]
    fn test_array_element_type_mismatch() {
        let err = bind(r#"{ [1, "two"] }"#).unwrap_err();
        assert!(err.message.contains("does not match element type"));
    }

    #[test]
    fn test_array_spread() {
        let bound = bind("{ var xs := [1]; [..xs, 2] }").unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        let BoundKind::Array(elements) = &inner[1].kind else {
            panic!("expected array");
        };
        assert!(matches!(elements[0].kind, BoundKind::Spread(_)));
    }

    #[test]
    fn test_field_access_lowered_to_index() {
        let bound = bind("{ var p := $[x: 1, y: 2]; p.y }").unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        assert!(matches!(
            inner[1].kind,
            BoundKind::LoadField { field_index: 1, .. }
        ));
    }

    #[test]
    fn test_constant_field_access_folds() {
        let bound = bind("{ constant p := $[x: 10, y: 20]; p.x }").unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        assert!(matches!(
            &inner[0].kind,
            BoundKind::Value(ConstValue::Number(n)) if *n == 10.0
        ));
    }

    #[test]
    fn test_missing_field() {
        let err = bind("{ var p := $[x: 1]; p.z }").unwrap_err();
        assert!(err.message.contains("no field `z`"));
    }

    #[test]
    fn test_conditional_branch_types_must_match() {
        let err = bind(r#"{ if (true) 1 else "s" }"#).unwrap_err();
        assert!(err.message.contains("do not match"));
    }

    #[test]
    fn test_non_boolean_condition() {
        let err = bind("{ if (1) 2 else 3 }").unwrap_err();
        assert!(err.message.contains("Boolean"));
    }

    #[test]
    fn test_while_loop_type_is_none() {
        let bound = bind("{ var i := 0; while (i < 3) i := i + 1; 0 }").unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        assert!(matches!(inner[1].kind, BoundKind::WhileLoop { .. }));
        assert_eq!(bound.symbols.type_name(inner[1].type_id), "None");
    }

    #[test]
    fn test_for_loop_lowering() {
        let bound = bind("{ for (var k in iterator(1..3)) print(k) }").unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        // outer lowered scope: [persistent initializer, while loop]
        let BoundKind::Scope(outer) = &inner[0].kind else {
            panic!("expected lowered scope, got {:?}", inner[0].kind);
        };
        assert_eq!(outer.len(), 2);
        assert!(outer[0].persistent);
        let BoundKind::WhileLoop { body, .. } = &outer[1].kind else {
            panic!("expected while loop");
        };
        let BoundKind::Scope(loop_body) = &body.kind else {
            panic!("expected loop scope");
        };
        assert_eq!(loop_body.len(), 3);
        assert!(loop_body[0].persistent);
        assert!(matches!(loop_body[2].kind, BoundKind::Assignment { .. }));
    }

    #[test]
    fn test_for_loop_requires_iterator_shape() {
        let err = bind("{ for (var k in $[x: 1]) print(k) }").unwrap_err();
        assert!(err.message.contains("`current`"));
    }

    #[test]
    fn test_interpolation_wraps_non_strings() {
        let bound = bind(r#"{ var x := 3; "x is ${x + 1}" }"#).unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        let BoundKind::Interpolation(parts) = &inner[1].kind else {
            panic!("expected interpolation");
        };
        assert_eq!(parts.len(), 2);
        // the embedded number is wrapped with toString
        assert!(matches!(parts[1].kind, BoundKind::FunctionCall { .. }));
        assert_eq!(bound.symbols.type_name(parts[1].type_id), "String");
    }

    #[test]
    fn test_interpolation_without_tostring_overload() {
        let err = bind(r#"{ var p := $[x: 1]; "p: ${p}" }"#).unwrap_err();
        assert!(err.message.contains("toString"));
    }
}
