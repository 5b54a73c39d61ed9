//! The symbol stack: a boundary-scoped table of types, constants, variables,
//! arguments and functions.
//!
//! Symbols live in an append-only arena and are addressed by [`SymbolId`];
//! the stack itself is a vector of handles. Every symbol records how far the
//! nearest boundary above it is (`boundary_count`, inclusive), so popping a
//! boundary is a single truncation. Structural types (objects, arrays) are
//! interned: looking up the same shape twice yields the same handle.

use crate::intrinsics::Intrinsic;
use crate::program::Opcode;

/// Handle of a symbol in the arena
pub type SymbolId = usize;

/// Kinds of boundary markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Module,
    Scope,
    Function,
}

/// Built-in base types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Number,
    String,
    Boolean,
    None,
    EmptyArray,
}

impl BaseType {
    pub fn name(self) -> &'static str {
        match self {
            BaseType::Number => "Number",
            BaseType::String => "String",
            BaseType::Boolean => "Boolean",
            BaseType::None => "None",
            BaseType::EmptyArray => "[]",
        }
    }
}

/// One field of an object type; fields are stored in canonical (sorted)
/// order and names are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectField {
    pub name: String,
    pub type_id: SymbolId,
}

/// The type carried by a type symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInfo {
    Base(BaseType),
    Object(Vec<ObjectField>),
    Array(SymbolId),
    Alias(SymbolId),
}

/// One field of a folded constant object, in canonical (sorted) order
#[derive(Debug, Clone, PartialEq)]
pub struct ConstObjectField {
    pub name: String,
    pub type_id: SymbolId,
    pub value: ConstValue,
}

/// A folded compile-time constant
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Object(Vec<ConstObjectField>),
}

/// A function's argument and return types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub arguments: Vec<SymbolId>,
    pub returns: SymbolId,
}

/// State of a user-defined function symbol
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserFunctionState {
    /// Set once a call site binds against this function
    pub used: bool,
    /// Index in the binder's user-function list, assigned on first use
    pub index: Option<usize>,
    /// Index of the bound body in the binder's body table
    pub body: Option<usize>,
}

/// How a function symbol is implemented
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionImpl {
    /// Maps 1:1 to a VM instruction
    Instruction(Opcode),
    /// Host-implemented callback dispatched by kind
    Intrinsic(Intrinsic),
    /// Declared in the Language
    User(UserFunctionState),
}

/// Symbol payload by kind
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolInfo {
    Boundary(BoundaryKind),
    Type(TypeInfo),
    Constant { type_id: SymbolId, value: ConstValue },
    Var { type_id: SymbolId },
    Argument { type_id: SymbolId },
    Function {
        signature: Signature,
        implementation: FunctionImpl,
    },
}

impl SymbolInfo {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SymbolInfo::Boundary(_) => "boundary",
            SymbolInfo::Type(_) => "type",
            SymbolInfo::Constant { .. } => "constant",
            SymbolInfo::Var { .. } => "variable",
            SymbolInfo::Argument { .. } => "argument",
            SymbolInfo::Function { .. } => "function",
        }
    }
}

/// One symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Possibly empty for anonymous scopes and temporaries
    pub name: String,
    pub info: SymbolInfo,
    /// Distance (inclusive) to the nearest boundary above, for O(1) pops
    pub boundary_count: usize,
    /// Runtime local slot for vars/args; −1 for symbols without a slot
    pub stack_index: i32,
}

/// The symbol stack
#[derive(Debug)]
pub struct SymbolStack {
    arena: Vec<Symbol>,
    stack: Vec<SymbolId>,
    last_error: Option<String>,
}

impl Default for SymbolStack {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolStack {
    /// A fresh stack with the module boundary already pushed
    pub fn new() -> Self {
        let mut stack = Self {
            arena: Vec::new(),
            stack: Vec::new(),
            last_error: None,
        };
        stack.push_boundary(BoundaryKind::Module);
        stack
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.arena[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.arena[id]
    }

    /// Message recorded by the most recent failed lookup
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of entries currently on the stack (tests)
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    // ==================== Pushing ====================

    fn push_symbol(&mut self, name: impl Into<String>, info: SymbolInfo) -> SymbolId {
        let is_boundary = matches!(info, SymbolInfo::Boundary(_));
        let boundary_count = if is_boundary {
            1
        } else {
            self.stack
                .last()
                .map(|&top| self.arena[top].boundary_count + 1)
                .unwrap_or(1)
        };

        let mut stack_index = self
            .stack
            .last()
            .map(|&top| self.arena[top].stack_index)
            .unwrap_or(-1);
        if matches!(info, SymbolInfo::Var { .. } | SymbolInfo::Argument { .. }) {
            stack_index += 1;
        }

        let id = self.arena.len();
        self.arena.push(Symbol {
            name: name.into(),
            info,
            boundary_count,
            stack_index,
        });
        self.stack.push(id);
        id
    }

    /// Push a boundary marker. Function boundaries reset the slot numbering
    /// for subsequently pushed vars and arguments.
    pub fn push_boundary(&mut self, kind: BoundaryKind) -> SymbolId {
        let id = self.push_symbol("", SymbolInfo::Boundary(kind));
        if kind == BoundaryKind::Function {
            self.arena[id].stack_index = -1;
        }
        id
    }

    /// Pop everything back through the nearest boundary, inclusive.
    pub fn pop_boundary(&mut self) -> bool {
        let Some(&top) = self.stack.last() else {
            self.last_error = Some("cannot pop boundary: symbol stack is empty".to_string());
            return false;
        };
        let count = self.arena[top].boundary_count;
        self.stack.truncate(self.stack.len() - count);
        true
    }

    pub fn push_type_base(&mut self, base: BaseType) -> SymbolId {
        self.push_symbol(base.name(), SymbolInfo::Type(TypeInfo::Base(base)))
    }

    /// Push an object type with canonical (sorted, unique) fields.
    pub fn push_type_object(&mut self, fields: Vec<ObjectField>) -> SymbolId {
        let name = self.object_type_name(&fields);
        self.push_symbol(name, SymbolInfo::Type(TypeInfo::Object(fields)))
    }

    pub fn push_type_array(&mut self, element: SymbolId) -> SymbolId {
        let name = format!("[{}]", self.arena[element].name);
        self.push_symbol(name, SymbolInfo::Type(TypeInfo::Array(element)))
    }

    pub fn push_type_alias(&mut self, name: impl Into<String>, target: SymbolId) -> SymbolId {
        self.push_symbol(name, SymbolInfo::Type(TypeInfo::Alias(target)))
    }

    pub fn push_constant(
        &mut self,
        name: impl Into<String>,
        type_id: SymbolId,
        value: ConstValue,
    ) -> SymbolId {
        self.push_symbol(name, SymbolInfo::Constant { type_id, value })
    }

    pub fn push_var(&mut self, name: impl Into<String>, type_id: SymbolId) -> SymbolId {
        self.push_symbol(name, SymbolInfo::Var { type_id })
    }

    pub fn push_argument(&mut self, name: impl Into<String>, type_id: SymbolId) -> SymbolId {
        self.push_symbol(name, SymbolInfo::Argument { type_id })
    }

    pub fn push_function_instruction(
        &mut self,
        name: impl Into<String>,
        arguments: Vec<SymbolId>,
        returns: SymbolId,
        instruction: Opcode,
    ) -> SymbolId {
        self.push_symbol(
            name,
            SymbolInfo::Function {
                signature: Signature { arguments, returns },
                implementation: FunctionImpl::Instruction(instruction),
            },
        )
    }

    pub fn push_function_intrinsic(
        &mut self,
        name: impl Into<String>,
        arguments: Vec<SymbolId>,
        returns: SymbolId,
        intrinsic: Intrinsic,
    ) -> SymbolId {
        self.push_symbol(
            name,
            SymbolInfo::Function {
                signature: Signature { arguments, returns },
                implementation: FunctionImpl::Intrinsic(intrinsic),
            },
        )
    }

    /// Push a user function symbol. Argument types are resolved up front by
    /// the binder; the return type starts as `None` and is set after the
    /// body is bound.
    pub fn push_function_user(
        &mut self,
        name: impl Into<String>,
        arguments: Vec<SymbolId>,
        returns: SymbolId,
    ) -> SymbolId {
        self.push_symbol(
            name,
            SymbolInfo::Function {
                signature: Signature { arguments, returns },
                implementation: FunctionImpl::User(UserFunctionState::default()),
            },
        )
    }

    // ==================== Lookup ====================

    /// Search top-down by name. Variables and arguments are not visible
    /// across a function boundary; a var/arg match beyond one stops the
    /// search. Types, constants and functions stay visible.
    pub fn find(&mut self, name: &str) -> Option<SymbolId> {
        let mut function_boundary_crossed = false;
        for &id in self.stack.iter().rev() {
            let symbol = &self.arena[id];
            if symbol.name == name {
                if function_boundary_crossed
                    && matches!(
                        symbol.info,
                        SymbolInfo::Var { .. } | SymbolInfo::Argument { .. }
                    )
                {
                    break;
                }
                return Some(id);
            }
            if matches!(symbol.info, SymbolInfo::Boundary(BoundaryKind::Function)) {
                function_boundary_crossed = true;
            }
        }
        self.last_error = Some(format!("cannot find symbol `{name}`"));
        None
    }

    /// Search for a type symbol by name
    pub fn find_type(&mut self, name: &str) -> Option<SymbolId> {
        let found = self
            .find(name)
            .filter(|&id| matches!(self.arena[id].info, SymbolInfo::Type(_)));
        if found.is_none() {
            self.last_error = Some(format!("cannot find type `{name}`"));
        }
        found
    }

    pub fn find_type_base(&mut self, base: BaseType) -> Option<SymbolId> {
        for &id in self.stack.iter().rev() {
            if matches!(self.arena[id].info, SymbolInfo::Type(TypeInfo::Base(b)) if b == base) {
                return Some(id);
            }
        }
        self.last_error = Some(format!("cannot find base type `{}`", base.name()));
        None
    }

    /// Structural lookup of an object type by its canonical field sequence
    pub fn find_type_object(&mut self, query: &[ObjectField]) -> Option<SymbolId> {
        for &id in self.stack.iter().rev() {
            if let SymbolInfo::Type(TypeInfo::Object(fields)) = &self.arena[id].info {
                if fields.as_slice() == query {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Structural lookup of an array type by element type
    pub fn find_type_array(&mut self, element: SymbolId) -> Option<SymbolId> {
        for &id in self.stack.iter().rev() {
            if matches!(self.arena[id].info, SymbolInfo::Type(TypeInfo::Array(e)) if e == element)
            {
                return Some(id);
            }
        }
        None
    }

    /// Find the interned object type for `query`, interning it if new.
    pub fn intern_type_object(&mut self, query: Vec<ObjectField>) -> SymbolId {
        match self.find_type_object(&query) {
            Some(id) => id,
            None => self.push_type_object(query),
        }
    }

    /// Find the interned array type for `element`, interning it if new.
    pub fn intern_type_array(&mut self, element: SymbolId) -> SymbolId {
        match self.find_type_array(element) {
            Some(id) => id,
            None => self.push_type_array(element),
        }
    }

    /// Overload resolution: exact argument-type match after alias
    /// resolution, searched top-down.
    pub fn find_function(&mut self, name: &str, argument_types: &[SymbolId]) -> Option<SymbolId> {
        let resolved_args: Vec<SymbolId> = argument_types
            .iter()
            .map(|&t| self.resolve_alias(t))
            .collect();

        for &id in self.stack.iter().rev() {
            let symbol = &self.arena[id];
            if symbol.name != name {
                continue;
            }
            let SymbolInfo::Function { signature, .. } = &symbol.info else {
                continue;
            };
            if signature.arguments.len() != resolved_args.len() {
                continue;
            }
            let matches = signature
                .arguments
                .iter()
                .zip(&resolved_args)
                .all(|(&declared, &given)| self.resolve_alias(declared) == given);
            if matches {
                return Some(id);
            }
        }

        self.last_error = Some(format!("cannot resolve function `{name}`"));
        None
    }

    // ==================== Types ====================

    /// Walk an alias chain to the underlying type
    pub fn resolve_alias(&self, mut type_id: SymbolId) -> SymbolId {
        while let SymbolInfo::Type(TypeInfo::Alias(target)) = &self.arena[type_id].info {
            type_id = *target;
        }
        type_id
    }

    /// A value of type `from` may initialize or be assigned to a slot of
    /// type `to`. The empty array type is assignable to every array type.
    pub fn assignable(&self, from: SymbolId, to: SymbolId) -> bool {
        let from = self.resolve_alias(from);
        let to = self.resolve_alias(to);
        if from == to {
            return true;
        }
        matches!(
            (&self.arena[from].info, &self.arena[to].info),
            (
                SymbolInfo::Type(TypeInfo::Base(BaseType::EmptyArray)),
                SymbolInfo::Type(TypeInfo::Array(_))
            )
        )
    }

    pub fn is_type_base(&self, type_id: SymbolId, base: BaseType) -> bool {
        matches!(
            self.arena[self.resolve_alias(type_id)].info,
            SymbolInfo::Type(TypeInfo::Base(b)) if b == base
        )
    }

    /// Display name of a type symbol
    pub fn type_name(&self, type_id: SymbolId) -> &str {
        &self.arena[type_id].name
    }

    fn object_type_name(&self, fields: &[ObjectField]) -> String {
        let inner: Vec<String> = fields
            .iter()
            .map(|f| format!("{}: {}", f.name, self.arena[f.type_id].name))
            .collect();
        format!("[{}]", inner.join(", "))
    }

    /// `name(T1, T2): R` rendering for diagnostics
    pub fn function_signature(&self, id: SymbolId) -> String {
        let symbol = &self.arena[id];
        let SymbolInfo::Function { signature, .. } = &symbol.info else {
            return symbol.name.clone();
        };
        let args: Vec<&str> = signature
            .arguments
            .iter()
            .map(|&a| self.type_name(a))
            .collect();
        format!(
            "{}({}): {}",
            symbol.name,
            args.join(", "),
            self.type_name(signature.returns)
        )
    }
}
