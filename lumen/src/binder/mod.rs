//! The binder: name resolution, type checking, constant folding, and
//! lowering of the AST into the typed bound tree.
//!
//! The binder owns the symbol stack for the duration of a compile. It
//! installs the base environment (base types, instruction-backed operators,
//! intrinsics), walks the program scope, and collects the user functions
//! that are actually called so the code generator emits only those.

mod expr;
mod fold;
pub mod tree;

use lumen_parser::{render_diagnostic, DeclKeyword, Expr, Span, TypeExpr};

use crate::intrinsics::Intrinsic;
use crate::program::Opcode;
use crate::symbols::{
    BaseType, BoundaryKind, FunctionImpl, ObjectField, SymbolId, SymbolInfo, SymbolStack,
};
use tree::{BoundKind, BoundNode, BoundProgram, UserFunction};

/// A bind or type error with its source region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BindError {}

impl BindError {
    /// Render in the stable `file:line:column` diagnostic format
    pub fn render(&self, file_name: &str, source: &str) -> String {
        render_diagnostic(file_name, source, self.span, &self.message)
    }
}

pub type BindResult<T> = Result<T, BindError>;

/// Handles of the base type symbols, looked up once at bootstrap
#[derive(Debug, Clone, Copy)]
pub(crate) struct BaseTypeIds {
    pub number: SymbolId,
    pub string: SymbolId,
    pub boolean: SymbolId,
    pub none: SymbolId,
    pub empty_array: SymbolId,
}

/// The binder
#[derive(Debug)]
pub struct Binder {
    pub(crate) symbols: SymbolStack,
    pub(crate) types: BaseTypeIds,
    user_functions: Vec<UserFunction>,
    bodies: Vec<BoundNode>,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl Binder {
    pub fn new() -> Self {
        let mut symbols = SymbolStack::new();
        let types = install_base_environment(&mut symbols);
        Self {
            symbols,
            types,
            user_functions: Vec::new(),
            bodies: Vec::new(),
        }
    }

    /// Bind a parsed program and hand back the bound tree together with the
    /// symbol table its ids refer to.
    pub fn bind_program(mut self, program: &Expr) -> BindResult<BoundProgram> {
        let root = self.bind_expr(program)?;
        Ok(BoundProgram {
            root,
            user_functions: self.user_functions,
            bodies: self.bodies,
            symbols: self.symbols,
        })
    }

    // ==================== Error helpers ====================

    pub(crate) fn make_error(&self, span: Span, message: impl Into<String>) -> BindError {
        BindError {
            message: message.into(),
            span,
        }
    }

    pub(crate) fn error<T>(&self, span: Span, message: impl Into<String>) -> BindResult<T> {
        Err(self.make_error(span, message))
    }

    // ==================== Dispatch ====================

    /// Bind any AST node. Declarations that emit no expression (constants,
    /// type aliases, functions) return `None`.
    pub(crate) fn bind_node(&mut self, expr: &Expr) -> BindResult<Option<BoundNode>> {
        match expr {
            Expr::Literal { .. } => self.bind_literal(expr).map(Some),
            Expr::Symbol { name, span } => self.bind_symbol(name, *span).map(Some),
            Expr::Unary { .. } => self.bind_unary_operator(expr).map(Some),
            Expr::Binary { .. } => self.bind_binary_operator(expr).map(Some),
            Expr::FunctionCall { .. } => self.bind_function_call(expr).map(Some),
            Expr::Scope { expressions, span } => {
                self.bind_scope(expressions, *span).map(Some)
            }
            Expr::ObjectLiteral { fields, span } => {
                self.bind_object_literal(fields, *span).map(Some)
            }
            Expr::ArrayLiteral { elements, span } => {
                self.bind_array_literal(elements, *span).map(Some)
            }
            Expr::FieldAccess { .. } => self.bind_field_access(expr).map(Some),
            Expr::Assignment { .. } => self.bind_assignment(expr).map(Some),
            Expr::Declaration { .. } => self.bind_declaration(expr),
            Expr::Function { .. } => self.bind_function_declaration(expr),
            Expr::Conditional { .. } => self.bind_conditional(expr).map(Some),
            Expr::WhileLoop { .. } => self.bind_while_loop(expr).map(Some),
            Expr::ForLoop { .. } => self.bind_for_loop(expr).map(Some),
            Expr::Interpolation { parts, span } => {
                self.bind_interpolation(parts, *span).map(Some)
            }
        }
    }

    /// Bind a node that must produce a value.
    pub(crate) fn bind_expr(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        match self.bind_node(expr)? {
            Some(node) => Ok(node),
            None => self.error(
                expr.span(),
                format!("a {} does not produce a value here", expr.kind_name()),
            ),
        }
    }

    // ==================== Scopes ====================

    pub(crate) fn bind_scope(&mut self, expressions: &[Expr], span: Span) -> BindResult<BoundNode> {
        self.symbols.push_boundary(BoundaryKind::Scope);
        let mut bound = Vec::new();
        for expression in expressions {
            if let Some(node) = self.bind_node(expression)? {
                bound.push(node);
            }
        }
        self.symbols.pop_boundary();

        let Some(last) = bound.last() else {
            return self.error(span, "scope does not produce a value");
        };
        let type_id = last.type_id;
        Ok(BoundNode::new(BoundKind::Scope(bound), type_id))
    }

    // ==================== Symbols and assignment ====================

    fn bind_symbol(&mut self, name: &str, span: Span) -> BindResult<BoundNode> {
        let Some(id) = self.symbols.find(name) else {
            return self.error(span, format!("cannot resolve symbol `{name}` in current scope"));
        };

        let symbol = self.symbols.symbol(id);
        match &symbol.info {
            SymbolInfo::Constant { type_id, value } => Ok(BoundNode::new(
                BoundKind::Value(value.clone()),
                *type_id,
            )),
            SymbolInfo::Var { type_id } => Ok(BoundNode::new(
                BoundKind::VarRef(symbol.stack_index as usize),
                *type_id,
            )),
            SymbolInfo::Argument { type_id } => Ok(BoundNode::new(
                BoundKind::ArgRef(symbol.stack_index as usize),
                *type_id,
            )),
            other => self.error(
                span,
                format!("cannot use {} `{name}` as an expression", other.kind_name()),
            ),
        }
    }

    fn bind_assignment(&mut self, expr: &Expr) -> BindResult<BoundNode> {
        let Expr::Assignment {
            target,
            expression,
            span,
        } = expr
        else {
            unreachable!("bind_assignment called on a non-assignment");
        };
        let Expr::Symbol { name, span: target_span } = target.as_ref() else {
            return self.error(
                target.span(),
                format!("cannot assign to a {}", target.kind_name()),
            );
        };

        let Some(id) = self.symbols.find(name) else {
            return self.error(*target_span, format!("cannot find symbol `{name}`"));
        };
        let symbol = self.symbols.symbol(id);
        let SymbolInfo::Var { type_id } = symbol.info else {
            return self.error(
                *target_span,
                format!("cannot assign to {} `{name}`", symbol.info.kind_name()),
            );
        };
        let scope_index = symbol.stack_index as usize;

        let bound_expression = self.bind_expr(expression)?;
        if !self.symbols.assignable(bound_expression.type_id, type_id) {
            return self.error(
                *span,
                format!(
                    "cannot assign expression of type `{}` to variable `{name}` of type `{}`",
                    self.symbols.type_name(bound_expression.type_id),
                    self.symbols.type_name(type_id)
                ),
            );
        }

        let type_id = bound_expression.type_id;
        Ok(BoundNode::new(
            BoundKind::Assignment {
                scope_index,
                expression: Box::new(bound_expression),
            },
            type_id,
        ))
    }

    // ==================== Declarations ====================

    fn bind_declaration(&mut self, expr: &Expr) -> BindResult<Option<BoundNode>> {
        let Expr::Declaration {
            keyword,
            name,
            name_span: _,
            type_expr,
            initializer,
            span,
        } = expr
        else {
            unreachable!("bind_declaration called on a non-declaration");
        };

        match keyword {
            DeclKeyword::Constant => {
                let initializer = initializer
                    .as_deref()
                    .ok_or_else(|| self.make_error(*span, "constant needs an initializer"))?;
                let (type_id, value) = self.fold_constant(initializer)?;
                self.check_declared_type("constant", name, type_expr.as_ref(), type_id, *span)?;
                self.symbols.push_constant(name.clone(), type_id, value);
                Ok(None)
            }
            DeclKeyword::Var => {
                let initializer = initializer
                    .as_deref()
                    .ok_or_else(|| self.make_error(*span, "variable needs an initializer"))?;
                let mut bound = self.bind_expr(initializer)?;
                if self.symbols.is_type_base(bound.type_id, BaseType::None) {
                    return self.error(
                        initializer.span(),
                        format!("cannot initialize variable `{name}` with a value of type `None`"),
                    );
                }
                bound.persistent = true;
                self.check_declared_type("variable", name, type_expr.as_ref(), bound.type_id, *span)?;
                self.symbols.push_var(name.clone(), bound.type_id);
                Ok(Some(bound))
            }
            DeclKeyword::Type => {
                let type_expr = type_expr
                    .as_ref()
                    .ok_or_else(|| self.make_error(*span, "type alias needs a target type"))?;
                let target = self.resolve_type(type_expr)?;
                self.symbols.push_type_alias(name.clone(), target);
                Ok(None)
            }
        }
    }

    fn check_declared_type(
        &mut self,
        what: &str,
        name: &str,
        declared: Option<&TypeExpr>,
        actual: SymbolId,
        span: Span,
    ) -> BindResult<()> {
        let Some(declared) = declared else {
            return Ok(());
        };
        let declared_id = self.resolve_type(declared)?;
        if !self.symbols.assignable(actual, declared_id) {
            return self.error(
                span,
                format!(
                    "cannot initialize {what} `{name}` of type `{}` with expression of type `{}`",
                    self.symbols.type_name(declared_id),
                    self.symbols.type_name(actual)
                ),
            );
        }
        Ok(())
    }

    fn bind_function_declaration(&mut self, expr: &Expr) -> BindResult<Option<BoundNode>> {
        let Expr::Function {
            name,
            parameters,
            return_type,
            body,
            span,
            ..
        } = expr
        else {
            unreachable!("bind_function_declaration called on a non-function");
        };

        let mut argument_types = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let resolved = self.resolve_type(&parameter.type_expr)?;
            argument_types.push(self.symbols.resolve_alias(resolved));
        }

        // With a declared return type the signature is complete up front,
        // which is what makes recursive calls inside the body bindable.
        let declared_return = return_type
            .as_ref()
            .map(|t| self.resolve_type(t))
            .transpose()?
            .map(|t| self.symbols.resolve_alias(t));
        let returns = declared_return.unwrap_or(self.types.none);

        let function = self
            .symbols
            .push_function_user(name.clone(), argument_types.clone(), returns);

        self.symbols.push_boundary(BoundaryKind::Function);
        for (parameter, &type_id) in parameters.iter().zip(&argument_types) {
            self.symbols.push_argument(parameter.name.clone(), type_id);
        }

        let bound_body = self.bind_expr(body)?;
        if self.symbols.is_type_base(bound_body.type_id, BaseType::None) {
            return self.error(
                body.span(),
                format!("body of function `{name}` does not produce a value"),
            );
        }

        match declared_return {
            Some(declared) => {
                if !self.symbols.assignable(bound_body.type_id, declared) {
                    return self.error(
                        *span,
                        format!(
                            "declared return type `{}` of function `{name}` is not compatible with body expression type `{}`",
                            self.symbols.type_name(declared),
                            self.symbols.type_name(bound_body.type_id)
                        ),
                    );
                }
            }
            None => {
                let body_type = bound_body.type_id;
                if let SymbolInfo::Function { signature, .. } =
                    &mut self.symbols.symbol_mut(function).info
                {
                    signature.returns = body_type;
                }
            }
        }

        let body_index = self.bodies.len();
        self.bodies.push(bound_body);
        if let SymbolInfo::Function {
            implementation: FunctionImpl::User(state),
            ..
        } = &mut self.symbols.symbol_mut(function).info
        {
            state.body = Some(body_index);
        }

        self.symbols.pop_boundary();
        Ok(None)
    }

    // ==================== Types ====================

    /// Resolve an AST type expression to a type symbol, interning
    /// structural types.
    pub(crate) fn resolve_type(&mut self, type_expr: &TypeExpr) -> BindResult<SymbolId> {
        match type_expr {
            TypeExpr::Name { name, span } => match self.symbols.find_type(name) {
                Some(id) => Ok(id),
                None => self.error(
                    *span,
                    format!("cannot resolve type `{name}` in current scope"),
                ),
            },
            TypeExpr::Object { fields, .. } => {
                // Fields arrive sorted and duplicate-free from the parser.
                let mut resolved = Vec::with_capacity(fields.len());
                for field in fields {
                    resolved.push(ObjectField {
                        name: field.name.clone(),
                        type_id: self.resolve_type(&field.type_expr)?,
                    });
                }
                Ok(self.symbols.intern_type_object(resolved))
            }
            TypeExpr::Array { element, .. } => {
                let element = self.resolve_type(element)?;
                Ok(self.symbols.intern_type_array(element))
            }
        }
    }

    // ==================== User-function tracking ====================

    /// Mark a function as used on first call; only used functions are
    /// emitted by the code generator.
    pub(crate) fn note_function_used(&mut self, function: SymbolId) {
        let (name, arity) = {
            let symbol = self.symbols.symbol(function);
            let SymbolInfo::Function { signature, .. } = &symbol.info else {
                return;
            };
            (symbol.name.clone(), signature.arguments.len())
        };

        let next_index = self.user_functions.len();
        if let SymbolInfo::Function {
            implementation: FunctionImpl::User(state),
            ..
        } = &mut self.symbols.symbol_mut(function).info
        {
            if !state.used {
                state.used = true;
                state.index = Some(next_index);
                self.user_functions.push(UserFunction {
                    symbol: function,
                    name,
                    arity,
                });
            }
        }
    }
}

/// Push the base types, the instruction-backed operator functions and the
/// VM intrinsics under the module boundary.
fn install_base_environment(symbols: &mut SymbolStack) -> BaseTypeIds {
    let number = symbols.push_type_base(BaseType::Number);
    let string = symbols.push_type_base(BaseType::String);
    let boolean = symbols.push_type_base(BaseType::Boolean);
    let none = symbols.push_type_base(BaseType::None);
    let empty_array = symbols.push_type_base(BaseType::EmptyArray);

    // Unary operators
    symbols.push_function_instruction("negate", vec![number], number, Opcode::Negate);
    symbols.push_function_instruction("not", vec![boolean], boolean, Opcode::Not);

    // Binary operators
    symbols.push_function_instruction("add", vec![number, number], number, Opcode::Add);
    symbols.push_function_instruction("add", vec![string, string], string, Opcode::Add);
    symbols.push_function_instruction("subtract", vec![number, number], number, Opcode::Subtract);
    symbols.push_function_instruction("multiply", vec![number, number], number, Opcode::Multiply);
    symbols.push_function_instruction("divide", vec![number, number], number, Opcode::Divide);

    // Comparisons
    symbols.push_function_instruction("less", vec![number, number], boolean, Opcode::Less);
    symbols.push_function_instruction("lessEqual", vec![number, number], boolean, Opcode::LessEqual);
    symbols.push_function_instruction("greater", vec![number, number], boolean, Opcode::Greater);
    symbols.push_function_instruction(
        "greaterEqual",
        vec![number, number],
        boolean,
        Opcode::GreaterEqual,
    );
    for (lhs, rhs) in [(number, number), (string, string), (boolean, boolean)] {
        symbols.push_function_instruction("equal", vec![lhs, rhs], boolean, Opcode::Equal);
        symbols.push_function_instruction("notEqual", vec![lhs, rhs], boolean, Opcode::NotEqual);
    }

    // Intrinsics
    symbols.push_function_intrinsic("print", vec![number], number, Intrinsic::NumberPrint);
    symbols.push_function_intrinsic("print", vec![string], string, Intrinsic::StringPrint);
    symbols.push_function_intrinsic("print", vec![boolean], boolean, Intrinsic::BooleanPrint);
    symbols.push_function_intrinsic("toString", vec![number], string, Intrinsic::NumberToString);
    symbols.push_function_intrinsic("toString", vec![boolean], string, Intrinsic::BooleanToString);
    symbols.push_function_intrinsic("toString", vec![string], string, Intrinsic::StringToString);
    symbols.push_function_intrinsic("length", vec![string], number, Intrinsic::StringLength);

    let range = symbols.intern_type_object(vec![
        ObjectField {
            name: "from".to_string(),
            type_id: number,
        },
        ObjectField {
            name: "to".to_string(),
            type_id: number,
        },
    ]);
    let iterator = symbols.intern_type_object(vec![
        ObjectField {
            name: "current".to_string(),
            type_id: number,
        },
        ObjectField {
            name: "finished".to_string(),
            type_id: boolean,
        },
        ObjectField {
            name: "to".to_string(),
            type_id: number,
        },
    ]);
    symbols.push_function_intrinsic("iterator", vec![range], iterator, Intrinsic::RangeIterator);
    symbols.push_function_intrinsic("next", vec![iterator], iterator, Intrinsic::IteratorNext);

    BaseTypeIds {
        number,
        string,
        boolean,
        none,
        empty_array,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::ConstValue;
    use lumen_parser::parse;

    fn bind(source: &str) -> BindResult<BoundProgram> {
        let program = parse(source).expect("parse failed");
        Binder::new().bind_program(&program)
    }

    #[test]
    fn test_simple_program_binds() {
        let bound = bind("{ print(1 + 2) }").unwrap();
        assert!(matches!(bound.root.kind, BoundKind::Scope(_)));
        assert!(bound.user_functions.is_empty());
    }

    #[test]
    fn test_unknown_symbol() {
        let err = bind("{ print(missing) }").unwrap_err();
        assert!(err.message.contains("missing"));
    }

    #[test]
    fn test_var_declaration_is_persistent() {
        let bound = bind("{ var x := 1; x }").unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        assert!(inner[0].persistent);
        assert!(matches!(inner[1].kind, BoundKind::VarRef(0)));
    }

    #[test]
    fn test_constants_inline() {
        let bound = bind("{ constant three := 3; three }").unwrap();
        let BoundKind::Scope(expressions) = &bound.root.kind else {
            panic!();
        };
        let BoundKind::Scope(inner) = &expressions[0].kind else {
            panic!();
        };
        assert_eq!(inner.len(), 1);
        assert!(matches!(
            &inner[0].kind,
            BoundKind::Value(ConstValue::Number(n)) if *n == 3.0
        ));
    }

    #[test]
    fn test_user_function_collection() {
        let bound = bind("{ function sq(n: Number): Number := n * n; print(sq(4)) }").unwrap();
        assert_eq!(bound.user_functions.len(), 1);
        assert_eq!(bound.user_functions[0].name, "sq");
        assert_eq!(bound.user_functions[0].arity, 1);
        assert_eq!(bound.bodies.len(), 1);
    }

    #[test]
    fn test_unused_function_not_collected() {
        let bound = bind("{ function sq(n: Number): Number := n * n; 1 }").unwrap();
        assert!(bound.user_functions.is_empty());
    }

    #[test]
    fn test_recursive_function_with_declared_return() {
        let bound = bind(
            "{ function fac(n: Number): Number := if (n < 2) 1 else n * fac(n - 1); print(fac(5)) }",
        )
        .unwrap();
        assert_eq!(bound.user_functions.len(), 1);
    }

    #[test]
    fn test_return_type_mismatch() {
        let err = bind("{ function f(): Number := true; f() }").unwrap_err();
        assert!(err.message.contains("not compatible"));
    }

    #[test]
    fn test_type_alias_declaration_and_use() {
        let bound = bind("{ type Meters := Number; var d: Meters := 3; d }").unwrap();
        assert!(bound.user_functions.is_empty());
    }

    #[test]
    fn test_declared_type_mismatch() {
        let err = bind("{ var x: Number := true; x }").unwrap_err();
        assert!(err.message.contains("cannot initialize"));
    }

    #[test]
    fn test_assignment_type_mismatch() {
        let err = bind("{ var x := 1; x := \"s\" }").unwrap_err();
        assert!(err.message.contains("cannot assign"));
    }

    #[test]
    fn test_assignment_to_constant_rejected() {
        let err = bind("{ constant c := 1; c := 2 }").unwrap_err();
        assert!(err.message.contains("cannot assign to constant"));
    }

    #[test]
    fn test_scope_must_produce_value() {
        let err = bind("{ constant c := 1 }").unwrap_err();
        assert!(err.message.contains("does not produce a value"));
    }

    #[test]
    fn test_object_type_interning_across_literals() {
        let bound = bind("{ var a := $[x: 1]; var b := $[x: 2]; a == b }");
        // equal(object, object) is not a registered overload
        assert!(bound.is_err());
    }
}
