//! The typed bound tree, the compiler's lowered IR.
//!
//! Every node carries its type symbol and a `persistent` flag. Persistent
//! expressions (variable initializers, spread temporaries, the for-loop
//! iterator) stay on the operand stack after their scope moves on, becoming
//! the scope's locals; everything else is popped between scope expressions.

use crate::symbols::{ConstValue, SymbolId, SymbolStack};

/// Short-circuiting logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// One field of a bound object literal; fields are sorted by name
#[derive(Debug, Clone, PartialEq)]
pub struct BoundField {
    pub name: String,
    pub expression: BoundNode,
}

/// Node payloads
#[derive(Debug, Clone, PartialEq)]
pub enum BoundKind {
    /// A literal or folded constant
    Value(ConstValue),
    /// Object construction; field order is the type's canonical order
    Object(Vec<BoundField>),
    FunctionCall {
        function: SymbolId,
        arguments: Vec<BoundNode>,
    },
    /// Sequence of expressions; the value is the last one's
    Scope(Vec<BoundNode>),
    /// Read a variable's local slot
    VarRef(usize),
    /// Read an argument's local slot
    ArgRef(usize),
    Assignment {
        scope_index: usize,
        expression: Box<BoundNode>,
    },
    Conditional {
        condition: Box<BoundNode>,
        then_clause: Box<BoundNode>,
        else_clause: Box<BoundNode>,
    },
    LogicalOperator {
        operator: LogicalOp,
        lhs: Box<BoundNode>,
        rhs: Box<BoundNode>,
    },
    WhileLoop {
        condition: Box<BoundNode>,
        body: Box<BoundNode>,
    },
    LoadField {
        expression: Box<BoundNode>,
        field_index: usize,
    },
    /// String concatenation of the parts, each already of type String
    Interpolation(Vec<BoundNode>),
    /// Array construction; elements may be [`BoundKind::Spread`] nodes
    Array(Vec<BoundNode>),
    /// Splice all elements of an array expression into the array under
    /// construction
    Spread(Box<BoundNode>),
}

/// A bound expression with its type
#[derive(Debug, Clone, PartialEq)]
pub struct BoundNode {
    pub kind: BoundKind,
    pub type_id: SymbolId,
    pub persistent: bool,
}

impl BoundNode {
    pub fn new(kind: BoundKind, type_id: SymbolId) -> Self {
        Self {
            kind,
            type_id,
            persistent: false,
        }
    }

    /// Indented tree rendering for the compiler driver's debug dump
    pub fn render(&self, symbols: &SymbolStack) -> String {
        let mut out = String::new();
        self.render_into(symbols, 0, &mut out);
        out
    }

    fn render_into(&self, symbols: &SymbolStack, level: usize, out: &mut String) {
        let indent = "  ".repeat(level);
        out.push_str(&indent);
        if self.persistent {
            out.push('*');
        }
        out.push_str(&format!("[{}] ", symbols.type_name(self.type_id)));

        match &self.kind {
            BoundKind::Value(value) => {
                out.push_str(&format!("value {value:?}\n"));
            }
            BoundKind::Object(fields) => {
                out.push_str("object\n");
                for field in fields {
                    out.push_str(&format!("{indent}  {}:\n", field.name));
                    field.expression.render_into(symbols, level + 2, out);
                }
            }
            BoundKind::FunctionCall {
                function,
                arguments,
            } => {
                out.push_str(&format!("call {}\n", symbols.function_signature(*function)));
                for argument in arguments {
                    argument.render_into(symbols, level + 1, out);
                }
            }
            BoundKind::Scope(expressions) => {
                out.push_str("scope\n");
                for expression in expressions {
                    expression.render_into(symbols, level + 1, out);
                }
            }
            BoundKind::VarRef(index) => {
                out.push_str(&format!("varref slot={index}\n"));
            }
            BoundKind::ArgRef(index) => {
                out.push_str(&format!("argref slot={index}\n"));
            }
            BoundKind::Assignment {
                scope_index,
                expression,
            } => {
                out.push_str(&format!("assignment slot={scope_index}\n"));
                expression.render_into(symbols, level + 1, out);
            }
            BoundKind::Conditional {
                condition,
                then_clause,
                else_clause,
            } => {
                out.push_str("conditional\n");
                condition.render_into(symbols, level + 1, out);
                then_clause.render_into(symbols, level + 1, out);
                else_clause.render_into(symbols, level + 1, out);
            }
            BoundKind::LogicalOperator { operator, lhs, rhs } => {
                out.push_str(&format!("logical {operator:?}\n"));
                lhs.render_into(symbols, level + 1, out);
                rhs.render_into(symbols, level + 1, out);
            }
            BoundKind::WhileLoop { condition, body } => {
                out.push_str("while\n");
                condition.render_into(symbols, level + 1, out);
                body.render_into(symbols, level + 1, out);
            }
            BoundKind::LoadField {
                expression,
                field_index,
            } => {
                out.push_str(&format!("load-field {field_index}\n"));
                expression.render_into(symbols, level + 1, out);
            }
            BoundKind::Interpolation(parts) => {
                out.push_str("interpolation\n");
                for part in parts {
                    part.render_into(symbols, level + 1, out);
                }
            }
            BoundKind::Array(elements) => {
                out.push_str("array\n");
                for element in elements {
                    element.render_into(symbols, level + 1, out);
                }
            }
            BoundKind::Spread(expression) => {
                out.push_str("spread\n");
                expression.render_into(symbols, level + 1, out);
            }
        }
    }
}

/// A user function collected for code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFunction {
    pub symbol: SymbolId,
    pub name: String,
    pub arity: usize,
}

/// The binder's complete output
#[derive(Debug)]
pub struct BoundProgram {
    /// The program scope
    pub root: BoundNode,
    /// Functions reachable from the program, in collection order
    pub user_functions: Vec<UserFunction>,
    /// Bound function bodies, indexed by the body slot on each function
    /// symbol
    pub bodies: Vec<BoundNode>,
    /// The symbol table the tree's ids point into
    pub symbols: SymbolStack,
}
