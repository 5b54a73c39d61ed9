//! Host implementations of the VM intrinsics.
//!
//! Dispatch goes through a fixed callback table indexed by the intrinsic's
//! tag. Every intrinsic consumes one argument from the operand stack;
//! `print` leaves its argument in place as the return value, the conversions
//! pop it and push their result.

use once_cell::sync::Lazy;

use crate::intrinsics::{Intrinsic, INTRINSICS};
use crate::value::{format_boolean, format_number, CellRef, Value};
use crate::vm::{Vm, VmError};

type IntrinsicCallback = fn(&mut Vm, usize) -> Result<(), VmError>;

/// Callback table in tag order
static INTRINSIC_CALLBACKS: Lazy<[IntrinsicCallback; INTRINSICS.len()]> = Lazy::new(|| {
    let mut table: [IntrinsicCallback; INTRINSICS.len()] = [execute_print; INTRINSICS.len()];
    table[Intrinsic::BooleanPrint as usize] = execute_print;
    table[Intrinsic::BooleanToString as usize] = execute_boolean_to_string;
    table[Intrinsic::NumberPrint as usize] = execute_print;
    table[Intrinsic::NumberToString as usize] = execute_number_to_string;
    table[Intrinsic::IteratorNext as usize] = execute_iterator_next;
    table[Intrinsic::RangeIterator as usize] = execute_range_iterator;
    table[Intrinsic::StringLength as usize] = execute_string_length;
    table[Intrinsic::StringPrint as usize] = execute_print;
    table[Intrinsic::StringToString as usize] = execute_string_to_string;
    table
});

impl Vm {
    pub(crate) fn call_intrinsic(
        &mut self,
        intrinsic: Intrinsic,
        ip: usize,
    ) -> Result<(), VmError> {
        INTRINSIC_CALLBACKS[intrinsic as usize](self, ip)
    }

    fn pop_object(&mut self, ip: usize) -> Result<CellRef, VmError> {
        let value = self.pop(ip)?;
        match value {
            Value::Object(cell) => Ok(cell),
            other => Err(VmError::TypeMismatch {
                expected: "object",
                found: other.kind(),
                ip,
            }),
        }
    }

    fn object_number_field(
        &self,
        cell: CellRef,
        index: usize,
        ip: usize,
    ) -> Result<f64, VmError> {
        if index >= self.pool.field_count(cell) {
            return Err(VmError::InvalidIndex { index, ip });
        }
        match self.pool.field(cell, index) {
            Value::Number(n) => Ok(n),
            other => Err(VmError::TypeMismatch {
                expected: "number",
                found: other.kind(),
                ip,
            }),
        }
    }
}

/// Append the top of stack to the output, followed by a newline. The
/// argument is left on the stack as `print`'s return value.
fn execute_print(vm: &mut Vm, ip: usize) -> Result<(), VmError> {
    let value = *vm.stack.last().ok_or(VmError::StackUnderflow { ip })?;
    match value {
        Value::Number(n) => vm.output.push_str(&format_number(n)),
        Value::Boolean(b) => vm.output.push_str(format_boolean(b)),
        Value::String(cell) => {
            let text = vm.pool.string(cell).to_string();
            vm.output.push_str(&text);
        }
        other => {
            return Err(VmError::TypeMismatch {
                expected: "printable value",
                found: other.kind(),
                ip,
            })
        }
    }
    vm.output.push('\n');
    Ok(())
}

fn execute_number_to_string(vm: &mut Vm, ip: usize) -> Result<(), VmError> {
    let value = vm.pop_number(ip)?;
    let text = format_number(value);
    let result = vm.pool.new_string(&text);
    vm.push(result, ip)
}

fn execute_boolean_to_string(vm: &mut Vm, ip: usize) -> Result<(), VmError> {
    let value = vm.pop_boolean(ip)?;
    let result = vm.pool.new_string(format_boolean(value));
    vm.push(result, ip)
}

/// `toString` on a string is the identity; the argument stays as the
/// return value.
fn execute_string_to_string(_vm: &mut Vm, _ip: usize) -> Result<(), VmError> {
    Ok(())
}

fn execute_string_length(vm: &mut Vm, ip: usize) -> Result<(), VmError> {
    let value = vm.pop(ip)?;
    let Value::String(cell) = value else {
        return Err(VmError::TypeMismatch {
            expected: "string",
            found: value.kind(),
            ip,
        });
    };
    let length = vm.pool.string(cell).len() as f64;
    vm.pool.release(value);
    vm.push(Value::Number(length), ip)
}

/// `iterator([from, to])` builds `[current, finished, to]` (canonical field
/// order) with `current = from` and `finished = from > to`.
fn execute_range_iterator(vm: &mut Vm, ip: usize) -> Result<(), VmError> {
    let range = vm.pop_object(ip)?;
    let from = vm.object_number_field(range, 0, ip)?;
    let to = vm.object_number_field(range, 1, ip)?;
    vm.pool.release(Value::Object(range));

    let iterator = vm.pool.new_object(vec![
        Value::Number(from),
        Value::Boolean(from > to),
        Value::Number(to),
    ]);
    vm.push(iterator, ip)
}

fn execute_iterator_next(vm: &mut Vm, ip: usize) -> Result<(), VmError> {
    let iterator = vm.pop_object(ip)?;
    let current = vm.object_number_field(iterator, 0, ip)?;
    let to = vm.object_number_field(iterator, 2, ip)?;
    vm.pool.release(Value::Object(iterator));

    let next = current + 1.0;
    let advanced = vm.pool.new_object(vec![
        Value::Number(next),
        Value::Boolean(next > to),
        Value::Number(to),
    ]);
    vm.push(advanced, ip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Program;
    use pretty_assertions::assert_eq;

    fn run(program: Program) -> Vm {
        let mut vm = Vm::new(program);
        vm.run().expect("vm error");
        vm
    }

    #[test]
    fn test_print_number_formats_and_returns() {
        let mut program = Program::new();
        program.write_push_number(7.0);
        program.write_call_intrinsic(Intrinsic::NumberPrint);
        let vm = run(program);
        assert_eq!(vm.output(), "7\n");
        assert_eq!(vm.stack(), &[Value::Number(7.0)]);
    }

    #[test]
    fn test_print_string_is_unquoted() {
        let mut program = Program::new();
        program.write_push_string("x is 4");
        program.write_call_intrinsic(Intrinsic::StringPrint);
        let vm = run(program);
        assert_eq!(vm.output(), "x is 4\n");
    }

    #[test]
    fn test_tostring_number() {
        let mut program = Program::new();
        program.write_push_number(2.5);
        program.write_call_intrinsic(Intrinsic::NumberToString);
        let vm = run(program);
        assert_eq!(vm.render_value(&vm.stack()[0]), "\"2.500000\"");
    }

    #[test]
    fn test_tostring_boolean() {
        let mut program = Program::new();
        program.write_push_boolean(true);
        program.write_call_intrinsic(Intrinsic::BooleanToString);
        let vm = run(program);
        assert_eq!(vm.render_value(&vm.stack()[0]), "\"true\"");
    }

    #[test]
    fn test_tostring_string_is_identity() {
        let mut program = Program::new();
        program.write_push_string("same");
        program.write_call_intrinsic(Intrinsic::StringToString);
        let vm = run(program);
        assert_eq!(vm.render_value(&vm.stack()[0]), "\"same\"");
        assert_eq!(vm.pool().live_cells(), 1);
    }

    #[test]
    fn test_string_length() {
        let mut program = Program::new();
        program.write_push_string("hello");
        program.write_call_intrinsic(Intrinsic::StringLength);
        let vm = run(program);
        assert_eq!(vm.stack(), &[Value::Number(5.0)]);
        assert_eq!(vm.pool().live_cells(), 0);
    }

    #[test]
    fn test_range_iterator_construction() {
        let mut program = Program::new();
        program.write_push_number(1.0);
        program.write_push_number(3.0);
        program.write_create_object(2);
        program.write_call_intrinsic(Intrinsic::RangeIterator);
        let vm = run(program);
        assert_eq!(vm.render_value(&vm.stack()[0]), "object(1, false, 3)");
    }

    #[test]
    fn test_descending_range_starts_finished() {
        let mut program = Program::new();
        program.write_push_number(3.0);
        program.write_push_number(1.0);
        program.write_create_object(2);
        program.write_call_intrinsic(Intrinsic::RangeIterator);
        let vm = run(program);
        assert_eq!(vm.render_value(&vm.stack()[0]), "object(3, true, 1)");
    }

    #[test]
    fn test_iterator_next_advances_and_finishes() {
        let mut program = Program::new();
        program.write_push_number(2.0);
        program.write_push_boolean(false);
        program.write_push_number(3.0);
        program.write_create_object(3);
        program.write_call_intrinsic(Intrinsic::IteratorNext);
        program.write_call_intrinsic(Intrinsic::IteratorNext);
        let vm = run(program);
        assert_eq!(vm.render_value(&vm.stack()[0]), "object(4, true, 3)");
        assert_eq!(vm.pool().live_cells(), 1);
    }

    #[test]
    fn test_unknown_intrinsic_tag() {
        let mut program = Program::new();
        program.write_push_number(0.0);
        program.write(crate::program::Opcode::CallIntrinsic);
        program.code.push(200);
        let mut vm = Vm::new(program);
        assert!(matches!(
            vm.run().unwrap_err(),
            VmError::UnknownIntrinsic { tag: 200, .. }
        ));
    }
}
