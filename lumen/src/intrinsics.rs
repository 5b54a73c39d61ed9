//! Intrinsic functions implemented by the host VM.
//!
//! Intrinsics are the operations the Language cannot express itself: output,
//! string conversion and measurement, and the number-range iterator
//! protocol. The binder registers one function symbol per entry; codegen
//! emits `CALL_INTRINSIC` with the kind tag; the VM dispatches through a
//! fixed callback table.

use serde::{Deserialize, Serialize};

/// Intrinsic kinds. The `u8` values are part of the bytecode ABI and must
/// stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Intrinsic {
    /// print(Boolean): Boolean
    BooleanPrint = 0,
    /// toString(Boolean): String
    BooleanToString = 1,
    /// print(Number): Number
    NumberPrint = 2,
    /// toString(Number): String
    NumberToString = 3,
    /// next(Iterator): Iterator
    IteratorNext = 4,
    /// iterator([from: Number, to: Number]): Iterator
    RangeIterator = 5,
    /// length(String): Number
    StringLength = 6,
    /// print(String): String
    StringPrint = 7,
    /// toString(String): String
    StringToString = 8,
}

/// All intrinsic kinds in tag order
pub const INTRINSICS: [Intrinsic; 9] = [
    Intrinsic::BooleanPrint,
    Intrinsic::BooleanToString,
    Intrinsic::NumberPrint,
    Intrinsic::NumberToString,
    Intrinsic::IteratorNext,
    Intrinsic::RangeIterator,
    Intrinsic::StringLength,
    Intrinsic::StringPrint,
    Intrinsic::StringToString,
];

impl Intrinsic {
    /// Decode a bytecode operand
    pub fn from_u8(value: u8) -> Option<Self> {
        INTRINSICS.get(value as usize).copied()
    }

    /// The full signature, used by the disassembler and in diagnostics
    pub fn signature(self) -> &'static str {
        match self {
            Intrinsic::BooleanPrint => "print(Boolean): Boolean",
            Intrinsic::BooleanToString => "toString(Boolean): String",
            Intrinsic::NumberPrint => "print(Number): Number",
            Intrinsic::NumberToString => "toString(Number): String",
            Intrinsic::IteratorNext => {
                "next([current: Number, finished: Boolean, to: Number]): [current: Number, finished: Boolean, to: Number]"
            }
            Intrinsic::RangeIterator => {
                "iterator([from: Number, to: Number]): [current: Number, finished: Boolean, to: Number]"
            }
            Intrinsic::StringLength => "length(String): Number",
            Intrinsic::StringPrint => "print(String): String",
            Intrinsic::StringToString => "toString(String): String",
        }
    }

    /// Number of arguments consumed from the operand stack
    pub fn arity(self) -> usize {
        1
    }
}
