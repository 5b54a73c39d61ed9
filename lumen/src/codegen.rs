//! Code generation: bound tree to bytecode.
//!
//! User functions are emitted first, each ending in `RETURN`; the program
//! entry point is the code offset after the last function body. Call sites
//! reference functions through the binder's collection order, whose begin
//! ips are recorded as each body is emitted (a function's own ip is recorded
//! before its body, so recursive calls resolve).

use crate::binder::tree::{BoundKind, BoundNode, BoundProgram, LogicalOp};
use crate::program::{Opcode, Program, ProgramError};
use crate::symbols::{ConstValue, FunctionImpl, SymbolInfo};

/// Errors raised during code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// Jump displacement overflowed the 16-bit encoding
    Jump(ProgramError),
    /// An 8-bit operand cannot hold the required count
    LimitExceeded { what: &'static str, count: usize },
    /// A collected function has no bound body (an internal inconsistency)
    MissingBody { name: String },
    /// The bound tree violated a generator invariant
    Internal { message: String },
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::Jump(e) => write!(f, "{e}"),
            GenerateError::LimitExceeded { what, count } => {
                write!(f, "{what} count {count} exceeds the limit of {}", u8::MAX)
            }
            GenerateError::MissingBody { name } => {
                write!(f, "function `{name}` has no bound body")
            }
            GenerateError::Internal { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for GenerateError {}

impl From<ProgramError> for GenerateError {
    fn from(e: ProgramError) -> Self {
        GenerateError::Jump(e)
    }
}

fn narrow(what: &'static str, count: usize) -> Result<u8, GenerateError> {
    u8::try_from(count).map_err(|_| GenerateError::LimitExceeded { what, count })
}

/// Generate a complete program from the binder's output.
pub fn generate(bound: &BoundProgram) -> Result<Program, GenerateError> {
    let mut generator = Generator {
        bound,
        program: Program::new(),
        begin_ips: vec![None; bound.user_functions.len()],
    };

    for (index, function) in bound.user_functions.iter().enumerate() {
        generator.begin_ips[index] = Some(generator.program.code.len() as u64);

        let body = match &bound.symbols.symbol(function.symbol).info {
            SymbolInfo::Function {
                implementation: FunctionImpl::User(state),
                ..
            } => state.body.map(|i| &bound.bodies[i]),
            _ => None,
        };
        let Some(body) = body else {
            return Err(GenerateError::MissingBody {
                name: function.name.clone(),
            });
        };

        generator.emit(body)?;
        generator.program.write(Opcode::Return);
    }

    generator.program.entry = generator.program.code.len() as u64;
    generator.emit(&bound.root)?;

    Ok(generator.program)
}

struct Generator<'a> {
    bound: &'a BoundProgram,
    program: Program,
    begin_ips: Vec<Option<u64>>,
}

impl Generator<'_> {
    /// `None`-typed expressions (loops) leave nothing on the operand stack.
    fn produces_value(&self, node: &BoundNode) -> bool {
        !self
            .bound
            .symbols
            .is_type_base(node.type_id, crate::symbols::BaseType::None)
    }

    fn emit(&mut self, node: &BoundNode) -> Result<(), GenerateError> {
        match &node.kind {
            BoundKind::Value(value) => self.emit_value(value)?,

            BoundKind::Object(fields) => {
                for field in fields {
                    self.emit(&field.expression)?;
                }
                let count = narrow("object field", fields.len())?;
                self.program.write_create_object(count);
            }

            BoundKind::LoadField {
                expression,
                field_index,
            } => {
                self.emit(expression)?;
                self.program
                    .write_load_field(narrow("field index", *field_index)?);
            }

            BoundKind::FunctionCall {
                function,
                arguments,
            } => {
                for argument in arguments {
                    self.emit(argument)?;
                }
                self.emit_call(*function, arguments.len())?;
            }

            BoundKind::Scope(expressions) => {
                let mut previous_persistent = false;
                let mut previous_produced = false;
                let mut persistent_count: u64 = 0;
                for (index, expression) in expressions.iter().enumerate() {
                    if index > 0 {
                        if previous_persistent {
                            persistent_count += 1;
                        } else if previous_produced {
                            self.program.write(Opcode::Pop);
                        }
                    }
                    self.emit(expression)?;
                    previous_persistent = expression.persistent;
                    previous_produced = self.produces_value(expression);
                }
                if persistent_count > 0 {
                    // A scope ending in a value keeps it above the locals;
                    // a `None`-typed tail leaves nothing, so the locals are
                    // simply popped.
                    if previous_persistent || previous_produced {
                        self.program.write_pop_scope(persistent_count);
                    } else {
                        for _ in 0..persistent_count {
                            self.program.write(Opcode::Pop);
                        }
                    }
                }
            }

            BoundKind::VarRef(index) | BoundKind::ArgRef(index) => {
                self.program.write_push_local(*index as u64);
            }

            BoundKind::Assignment {
                scope_index,
                expression,
            } => {
                self.emit(expression)?;
                self.program.write_store_local(*scope_index as u64);
            }

            BoundKind::Conditional {
                condition,
                then_clause,
                else_clause,
            } => {
                self.emit(condition)?;
                // JUMP_IF_FALSE pops the condition when it falls through to
                // the then-branch; on a jump it keeps the value, so the
                // else-side target starts with a POP.
                let over_then = self.program.write_jump(Opcode::JumpIfFalse);

                self.emit(then_clause)?;
                let over_else = self.program.write_jump(Opcode::Jump);

                self.program.patch_jump(over_then)?;
                self.program.write(Opcode::Pop);
                self.emit(else_clause)?;
                self.program.patch_jump(over_else)?;
            }

            BoundKind::LogicalOperator { operator, lhs, rhs } => {
                self.emit(lhs)?;
                let jump = self.program.write_jump(match operator {
                    LogicalOp::And => Opcode::JumpIfFalse,
                    LogicalOp::Or => Opcode::JumpIfTrue,
                });
                // On fall-through the jump popped the lhs value; the rhs
                // result replaces it. On a short-circuit jump the lhs value
                // stays as the result.
                self.emit(rhs)?;
                self.program.patch_jump(jump)?;
            }

            BoundKind::WhileLoop { condition, body } => {
                // Loops produce no value: nothing remains on the stack once
                // the exit path pops the final condition. Entering the body
                // needs no POP of its own, since JUMP_IF_FALSE pops the
                // condition when it falls through.
                let loop_start = self.program.code.len();
                self.emit(condition)?;
                let exit = self.program.write_jump(Opcode::JumpIfFalse);

                self.emit(body)?;
                if self.produces_value(body) {
                    self.program.write(Opcode::Pop);
                }

                self.program.write_loop(loop_start)?;
                self.program.patch_jump(exit)?;
                self.program.write(Opcode::Pop);
            }

            BoundKind::Interpolation(parts) => {
                for part in parts {
                    self.emit(part)?;
                }
                self.program
                    .write_interpolation(narrow("interpolation part", parts.len())?);
            }

            BoundKind::Array(elements) => {
                self.program.write(Opcode::BeginArray);
                for element in elements {
                    match &element.kind {
                        BoundKind::Spread(expression) => {
                            self.emit(expression)?;
                            self.program.write(Opcode::Spread);
                        }
                        _ => {
                            self.emit(element)?;
                            self.program.write(Opcode::ConcatArray);
                        }
                    }
                }
                self.program.write(Opcode::EndArray);
            }

            BoundKind::Spread(_) => {
                // Spread nodes are consumed by their enclosing array.
                return Err(GenerateError::Internal {
                    message: "spread node outside an array literal".to_string(),
                });
            }
        }
        Ok(())
    }

    fn emit_value(&mut self, value: &ConstValue) -> Result<(), GenerateError> {
        match value {
            ConstValue::Number(n) => self.program.write_push_number(*n),
            ConstValue::String(s) => self.program.write_push_string(s),
            ConstValue::Boolean(b) => self.program.write_push_boolean(*b),
            ConstValue::Object(fields) => {
                for field in fields {
                    self.emit_value(&field.value)?;
                }
                let count = narrow("object field", fields.len())?;
                self.program.write_create_object(count);
            }
        }
        Ok(())
    }

    fn emit_call(&mut self, function: usize, arity: usize) -> Result<(), GenerateError> {
        let symbol = self.bound.symbols.symbol(function);
        let SymbolInfo::Function { implementation, .. } = &symbol.info else {
            return Err(GenerateError::Internal {
                message: format!("call target `{}` is not a function", symbol.name),
            });
        };
        match implementation {
            FunctionImpl::Instruction(opcode) => self.program.write(*opcode),
            FunctionImpl::Intrinsic(intrinsic) => self.program.write_call_intrinsic(*intrinsic),
            FunctionImpl::User(state) => {
                let begin = state
                    .index
                    .and_then(|i| self.begin_ips.get(i).copied().flatten());
                let Some(begin) = begin else {
                    return Err(GenerateError::MissingBody {
                        name: symbol.name.clone(),
                    });
                };
                let arity = narrow("argument", arity)?;
                self.program.write_call_user(arity, begin);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Binder;
    use crate::intrinsics::Intrinsic;
    use lumen_parser::parse;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Program {
        let ast = parse(source).expect("parse failed");
        let bound = Binder::new().bind_program(&ast).expect("bind failed");
        generate(&bound).expect("generate failed")
    }

    fn opcodes(program: &Program) -> Vec<Opcode> {
        let mut out = Vec::new();
        let mut ip = 0;
        while let Some((_, next)) = program.disassemble_instruction(ip) {
            out.push(Opcode::from_u8(program.code[ip]).unwrap());
            ip = next;
        }
        out
    }

    #[test]
    fn test_arithmetic_uses_instructions() {
        let program = compile("{ 1 + 2 * 3 }");
        assert_eq!(
            opcodes(&program),
            vec![
                Opcode::PushNumber,
                Opcode::PushNumber,
                Opcode::PushNumber,
                Opcode::Multiply,
                Opcode::Add,
            ]
        );
        assert_eq!(program.entry, 0);
    }

    #[test]
    fn test_scope_pops_between_expressions() {
        let program = compile("{ 1; 2 }");
        assert_eq!(
            opcodes(&program),
            vec![Opcode::PushNumber, Opcode::Pop, Opcode::PushNumber]
        );
    }

    #[test]
    fn test_var_scope_emits_pop_scope() {
        let program = compile("{ var x := 1; x + 2 }");
        let ops = opcodes(&program);
        assert_eq!(ops.last(), Some(&Opcode::PopScope));
        assert!(ops.contains(&Opcode::PushLocal));
    }

    #[test]
    fn test_conditional_shape() {
        // JUMP_IF_FALSE pops the condition on fall-through, so only the
        // else-side target carries a POP.
        let program = compile("{ if (true) 1 else 2 }");
        assert_eq!(
            opcodes(&program),
            vec![
                Opcode::PushBoolean,
                Opcode::JumpIfFalse,
                Opcode::PushNumber,
                Opcode::Jump,
                Opcode::Pop,
                Opcode::PushNumber,
            ]
        );
    }

    #[test]
    fn test_logical_operator_has_no_pop() {
        let program = compile("{ true && false }");
        assert_eq!(
            opcodes(&program),
            vec![Opcode::PushBoolean, Opcode::JumpIfFalse, Opcode::PushBoolean]
        );
    }

    #[test]
    fn test_while_shape() {
        let program = compile("{ var i := 0; while (i < 1) i := i + 1; 9 }");
        let ops = opcodes(&program);
        assert!(ops.contains(&Opcode::JumpLoop));
        assert_eq!(ops.iter().filter(|&&op| op == Opcode::JumpIfFalse).count(), 1);
        // the loop leaves no value: no POP separates it from the `9`
        let loop_position = ops.iter().position(|&op| op == Opcode::JumpLoop).unwrap();
        assert_eq!(ops[loop_position + 1], Opcode::Pop); // final condition
        assert_eq!(ops[loop_position + 2], Opcode::PushNumber); // the `9`
    }

    #[test]
    fn test_user_function_emitted_before_entry() {
        let program = compile("{ function sq(n: Number): Number := n * n; sq(4) }");
        // function body: PUSH_LOCAL MULTIPLY... RETURN precedes the entry
        assert!(program.entry > 0);
        let ops = opcodes(&program);
        assert_eq!(ops[0], Opcode::PushLocal);
        assert!(ops.contains(&Opcode::Return));
        assert!(ops.contains(&Opcode::CallUser));
    }

    #[test]
    fn test_unused_function_not_emitted() {
        let program = compile("{ function sq(n: Number): Number := n * n; 1 }");
        assert_eq!(program.entry, 0);
        assert!(!opcodes(&program).contains(&Opcode::Return));
    }

    #[test]
    fn test_interpolation_emits_parts_then_concat() {
        let program = compile(r#"{ var x := 1; "x ${x}" }"#);
        let ops = opcodes(&program);
        assert!(ops.contains(&Opcode::Interpolation));
        assert!(ops.contains(&Opcode::CallIntrinsic));
    }

    #[test]
    fn test_array_emission() {
        let program = compile("{ [1, 2] }");
        assert_eq!(
            opcodes(&program),
            vec![
                Opcode::BeginArray,
                Opcode::PushNumber,
                Opcode::ConcatArray,
                Opcode::PushNumber,
                Opcode::ConcatArray,
                Opcode::EndArray,
            ]
        );
    }

    #[test]
    fn test_array_spread_emission() {
        let program = compile("{ var xs := [1]; [..xs, 2] }");
        let ops = opcodes(&program);
        assert!(ops.contains(&Opcode::Spread));
    }

    #[test]
    fn test_object_emission() {
        let program = compile("{ $[y: 2, x: 1] }");
        assert_eq!(
            opcodes(&program),
            vec![Opcode::PushNumber, Opcode::PushNumber, Opcode::CreateObject]
        );
        // sorted field order: x before y
        assert_eq!(program.number_at(0), Some(1.0));
        assert_eq!(program.number_at(8), Some(2.0));
    }

    #[test]
    fn test_constant_object_value_emission() {
        let program = compile("{ constant p := $[x: 10, y: 20]; var q := p; q }");
        let ops = opcodes(&program);
        assert!(ops.contains(&Opcode::CreateObject));
    }

    #[test]
    fn test_intrinsic_call_operand() {
        let program = compile("{ print(1) }");
        let ops = opcodes(&program);
        assert_eq!(ops, vec![Opcode::PushNumber, Opcode::CallIntrinsic]);
        // operand byte is the intrinsic tag
        assert_eq!(program.code[program.code.len() - 1], Intrinsic::NumberPrint as u8);
    }

    #[test]
    fn test_constants_deduplicated_across_sites() {
        let program = compile(r#"{ print("go"); print("go"); print(2); print(2) }"#);
        assert_eq!(program.constants_dictionary().len(), 2);
    }
}
