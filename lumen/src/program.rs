//! The compiled program container.
//!
//! A [`Program`] owns two byte buffers: the constants chunk (numbers as
//! little-endian binary64, strings length-prefixed) and the code chunk (the
//! opcode stream). A side dictionary of `(kind, offset)` entries lets the
//! code generator deduplicate constants at emit time; the dictionary is not
//! persisted. The on-disk chunk format lives in [`crate::bytecode`].

use crate::intrinsics::Intrinsic;
use crate::value::{format_number, numbers_equal};

/// Current program format version
pub const PROGRAM_VERSION: u8 = 1;

/// Bytecode operation tags. The `u8` values are the wire format; operands
/// are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Noop = 0,
    PushNumber = 1,
    PushString = 2,
    PushBoolean = 3,
    Pop = 4,
    Negate = 5,
    Not = 6,
    Add = 7,
    Subtract = 8,
    Multiply = 9,
    Divide = 10,
    Less = 11,
    LessEqual = 12,
    Greater = 13,
    GreaterEqual = 14,
    Equal = 15,
    NotEqual = 16,
    CallIntrinsic = 17,
    CallUser = 18,
    PushLocal = 19,
    StoreLocal = 20,
    PopScope = 21,
    Return = 22,
    Jump = 23,
    JumpIfFalse = 24,
    JumpIfTrue = 25,
    JumpLoop = 26,
    CreateObject = 27,
    LoadField = 28,
    Interpolation = 29,
    BeginArray = 30,
    EndArray = 31,
    ConcatArray = 32,
    Spread = 33,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Opcode::Noop,
            1 => Opcode::PushNumber,
            2 => Opcode::PushString,
            3 => Opcode::PushBoolean,
            4 => Opcode::Pop,
            5 => Opcode::Negate,
            6 => Opcode::Not,
            7 => Opcode::Add,
            8 => Opcode::Subtract,
            9 => Opcode::Multiply,
            10 => Opcode::Divide,
            11 => Opcode::Less,
            12 => Opcode::LessEqual,
            13 => Opcode::Greater,
            14 => Opcode::GreaterEqual,
            15 => Opcode::Equal,
            16 => Opcode::NotEqual,
            17 => Opcode::CallIntrinsic,
            18 => Opcode::CallUser,
            19 => Opcode::PushLocal,
            20 => Opcode::StoreLocal,
            21 => Opcode::PopScope,
            22 => Opcode::Return,
            23 => Opcode::Jump,
            24 => Opcode::JumpIfFalse,
            25 => Opcode::JumpIfTrue,
            26 => Opcode::JumpLoop,
            27 => Opcode::CreateObject,
            28 => Opcode::LoadField,
            29 => Opcode::Interpolation,
            30 => Opcode::BeginArray,
            31 => Opcode::EndArray,
            32 => Opcode::ConcatArray,
            33 => Opcode::Spread,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Noop => "NOOP",
            Opcode::PushNumber => "PUSH_NUMBER",
            Opcode::PushString => "PUSH_STRING",
            Opcode::PushBoolean => "PUSH_BOOLEAN",
            Opcode::Pop => "POP",
            Opcode::Negate => "NEGATE",
            Opcode::Not => "NOT",
            Opcode::Add => "ADD",
            Opcode::Subtract => "SUBTRACT",
            Opcode::Multiply => "MULTIPLY",
            Opcode::Divide => "DIVIDE",
            Opcode::Less => "LESS",
            Opcode::LessEqual => "LESS_EQUAL",
            Opcode::Greater => "GREATER",
            Opcode::GreaterEqual => "GREATER_EQUAL",
            Opcode::Equal => "EQUAL",
            Opcode::NotEqual => "NOT_EQUAL",
            Opcode::CallIntrinsic => "CALL_INTRINSIC",
            Opcode::CallUser => "CALL_USER",
            Opcode::PushLocal => "PUSH_LOCAL",
            Opcode::StoreLocal => "STORE_LOCAL",
            Opcode::PopScope => "POP_SCOPE",
            Opcode::Return => "RETURN",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::JumpIfTrue => "JUMP_IF_TRUE",
            Opcode::JumpLoop => "JUMP_LOOP",
            Opcode::CreateObject => "CREATE_OBJECT",
            Opcode::LoadField => "LOAD_FIELD",
            Opcode::Interpolation => "INTERPOLATION",
            Opcode::BeginArray => "BEGIN_ARRAY",
            Opcode::EndArray => "END_ARRAY",
            Opcode::ConcatArray => "CONCAT_ARRAY",
            Opcode::Spread => "SPREAD",
        }
    }
}

/// Kind tag of a constants-dictionary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    Number,
    String,
}

/// One entry of the emit-time deduplication dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant {
    pub kind: ConstantKind,
    pub offset: usize,
}

/// Errors raised while emitting code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// A forward jump or loop displacement exceeded the 16-bit encoding
    JumpTooFar { distance: usize },
}

impl std::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramError::JumpTooFar { distance } => {
                write!(
                    f,
                    "jump displacement {} exceeds the 16-bit limit of {}",
                    distance,
                    u16::MAX
                )
            }
        }
    }
}

impl std::error::Error for ProgramError {}

/// A compiled program: header fields plus the constants and code chunks
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Program {
    pub version: u8,
    /// Instruction pointer where execution starts (after function bodies)
    pub entry: u64,
    pub constants: Vec<u8>,
    pub code: Vec<u8>,
    /// Emit-time dictionary for constant deduplication; not persisted
    constants_dictionary: Vec<Constant>,
}

impl Program {
    pub fn new() -> Self {
        Self {
            version: PROGRAM_VERSION,
            ..Self::default()
        }
    }

    pub fn constants_dictionary(&self) -> &[Constant] {
        &self.constants_dictionary
    }

    // ==================== Constant emission ====================

    fn find_number_constant(&self, value: f64) -> Option<usize> {
        self.constants_dictionary.iter().find_map(|c| {
            (c.kind == ConstantKind::Number
                && self.number_at(c.offset).is_some_and(|n| numbers_equal(n, value)))
            .then_some(c.offset)
        })
    }

    fn find_string_constant(&self, value: &str) -> Option<usize> {
        self.constants_dictionary.iter().find_map(|c| {
            (c.kind == ConstantKind::String
                && self.string_at(c.offset).is_some_and(|s| s == value))
            .then_some(c.offset)
        })
    }

    fn add_number_constant(&mut self, value: f64) -> usize {
        if let Some(offset) = self.find_number_constant(value) {
            return offset;
        }
        let offset = self.constants.len();
        self.constants.extend_from_slice(&value.to_le_bytes());
        self.constants_dictionary.push(Constant {
            kind: ConstantKind::Number,
            offset,
        });
        offset
    }

    fn add_string_constant(&mut self, value: &str) -> usize {
        if let Some(offset) = self.find_string_constant(value) {
            return offset;
        }
        let offset = self.constants.len();
        self.constants
            .extend_from_slice(&(value.len() as u64).to_le_bytes());
        self.constants.extend_from_slice(value.as_bytes());
        self.constants_dictionary.push(Constant {
            kind: ConstantKind::String,
            offset,
        });
        offset
    }

    /// Read the number literal at a constants-chunk offset
    pub fn number_at(&self, offset: usize) -> Option<f64> {
        let bytes: [u8; 8] = self.constants.get(offset..offset + 8)?.try_into().ok()?;
        Some(f64::from_le_bytes(bytes))
    }

    /// Read the string literal at a constants-chunk offset
    pub fn string_at(&self, offset: usize) -> Option<&str> {
        let len_bytes: [u8; 8] = self.constants.get(offset..offset + 8)?.try_into().ok()?;
        let len = u64::from_le_bytes(len_bytes) as usize;
        let bytes = self.constants.get(offset + 8..offset + 8 + len)?;
        std::str::from_utf8(bytes).ok()
    }

    // ==================== Code emission ====================

    pub fn write(&mut self, opcode: Opcode) {
        self.code.push(opcode as u8);
    }

    pub fn write_push_number(&mut self, value: f64) {
        self.write(Opcode::PushNumber);
        let offset = self.add_number_constant(value) as u64;
        self.code.extend_from_slice(&offset.to_le_bytes());
    }

    pub fn write_push_string(&mut self, value: &str) {
        self.write(Opcode::PushString);
        let offset = self.add_string_constant(value) as u64;
        self.code.extend_from_slice(&offset.to_le_bytes());
    }

    pub fn write_push_boolean(&mut self, value: bool) {
        self.write(Opcode::PushBoolean);
        self.code.push(value as u8);
    }

    pub fn write_push_local(&mut self, scope_index: u64) {
        self.write(Opcode::PushLocal);
        self.code.extend_from_slice(&scope_index.to_le_bytes());
    }

    pub fn write_store_local(&mut self, scope_index: u64) {
        self.write(Opcode::StoreLocal);
        self.code.extend_from_slice(&scope_index.to_le_bytes());
    }

    pub fn write_pop_scope(&mut self, count: u64) {
        self.write(Opcode::PopScope);
        self.code.extend_from_slice(&count.to_le_bytes());
    }

    pub fn write_call_intrinsic(&mut self, intrinsic: Intrinsic) {
        self.write(Opcode::CallIntrinsic);
        self.code.push(intrinsic as u8);
    }

    pub fn write_call_user(&mut self, arity: u8, begin_ip: u64) {
        self.write(Opcode::CallUser);
        self.code.push(arity);
        self.code.extend_from_slice(&begin_ip.to_le_bytes());
    }

    pub fn write_create_object(&mut self, field_count: u8) {
        self.write(Opcode::CreateObject);
        self.code.push(field_count);
    }

    pub fn write_load_field(&mut self, field_index: u8) {
        self.write(Opcode::LoadField);
        self.code.push(field_index);
    }

    pub fn write_interpolation(&mut self, count: u8) {
        self.write(Opcode::Interpolation);
        self.code.push(count);
    }

    /// Emit a forward jump with a placeholder displacement; returns the
    /// placeholder's offset for [`Self::patch_jump`].
    pub fn write_jump(&mut self, kind: Opcode) -> usize {
        self.write(kind);
        let placeholder = self.code.len();
        self.code.extend_from_slice(&u16::MAX.to_le_bytes());
        placeholder
    }

    /// Point the placeholder at the current end of code. The displacement is
    /// relative to the instruction pointer after the operand.
    pub fn patch_jump(&mut self, placeholder: usize) -> Result<(), ProgramError> {
        let distance = self.code.len() - (placeholder + 2);
        let encoded =
            u16::try_from(distance).map_err(|_| ProgramError::JumpTooFar { distance })?;
        self.code[placeholder..placeholder + 2].copy_from_slice(&encoded.to_le_bytes());
        Ok(())
    }

    /// Emit a backward jump to `target`
    pub fn write_loop(&mut self, target: usize) -> Result<(), ProgramError> {
        self.write(Opcode::JumpLoop);
        // ip after decoding the operand is current length + 2
        let distance = self.code.len() + 2 - target;
        let encoded =
            u16::try_from(distance).map_err(|_| ProgramError::JumpTooFar { distance })?;
        self.code.extend_from_slice(&encoded.to_le_bytes());
        Ok(())
    }

    // ==================== Disassembly ====================

    /// Render one instruction; returns the text and the next ip
    pub fn disassemble_instruction(&self, ip: usize) -> Option<(String, usize)> {
        let mut cursor = ip;
        let tag = *self.code.get(cursor)?;
        cursor += 1;
        let Some(opcode) = Opcode::from_u8(tag) else {
            return Some((format!("{ip:04} <unknown opcode {tag:#04x}>"), cursor));
        };

        let mut text = format!("{ip:04} {}", opcode.name());
        match opcode {
            Opcode::PushNumber => {
                let offset = read_u64(&self.code, &mut cursor)?;
                let rendered = self
                    .number_at(offset as usize)
                    .map(format_number)
                    .unwrap_or_else(|| "<bad offset>".to_string());
                text.push_str(&format!(" {offset} ({rendered})"));
            }
            Opcode::PushString => {
                let offset = read_u64(&self.code, &mut cursor)?;
                let rendered = self
                    .string_at(offset as usize)
                    .map(|s| format!("\"{}\"", escape_string(s)))
                    .unwrap_or_else(|| "<bad offset>".to_string());
                text.push_str(&format!(" {offset} ({rendered})"));
            }
            Opcode::PushBoolean => {
                let value = read_u8(&self.code, &mut cursor)?;
                text.push_str(if value == 0 { " false" } else { " true" });
            }
            Opcode::PushLocal | Opcode::StoreLocal | Opcode::PopScope => {
                let operand = read_u64(&self.code, &mut cursor)?;
                text.push_str(&format!(" {operand}"));
            }
            Opcode::CallIntrinsic => {
                let tag = read_u8(&self.code, &mut cursor)?;
                match Intrinsic::from_u8(tag) {
                    Some(intrinsic) => {
                        text.push_str(&format!(" {tag} ({})", intrinsic.signature()))
                    }
                    None => text.push_str(&format!(" {tag} (<unknown intrinsic>)")),
                }
            }
            Opcode::CallUser => {
                let arity = read_u8(&self.code, &mut cursor)?;
                let begin = read_u64(&self.code, &mut cursor)?;
                text.push_str(&format!(" arity={arity} ip={begin}"));
            }
            Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue => {
                let offset = read_u16(&self.code, &mut cursor)?;
                text.push_str(&format!(" +{offset} -> {}", cursor + offset as usize));
            }
            Opcode::JumpLoop => {
                let offset = read_u16(&self.code, &mut cursor)?;
                text.push_str(&format!(" -{offset} -> {}", cursor - offset as usize));
            }
            Opcode::CreateObject | Opcode::LoadField | Opcode::Interpolation => {
                let operand = read_u8(&self.code, &mut cursor)?;
                text.push_str(&format!(" {operand}"));
            }
            _ => {}
        }

        Some((text, cursor))
    }

    /// Render the whole code chunk
    pub fn disassemble(&self) -> String {
        let mut out = format!("entry: {}\n", self.entry);
        let mut ip = 0;
        while let Some((line, next)) = self.disassemble_instruction(ip) {
            out.push_str(&line);
            out.push('\n');
            ip = next;
        }
        out
    }
}

/// Escape a string for disassembly display
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

// ==================== Byte-stream reading ====================

pub(crate) fn read_u8(bytes: &[u8], cursor: &mut usize) -> Option<u8> {
    let value = *bytes.get(*cursor)?;
    *cursor += 1;
    Some(value)
}

pub(crate) fn read_u16(bytes: &[u8], cursor: &mut usize) -> Option<u16> {
    let slice: [u8; 2] = bytes.get(*cursor..*cursor + 2)?.try_into().ok()?;
    *cursor += 2;
    Some(u16::from_le_bytes(slice))
}

pub(crate) fn read_u64(bytes: &[u8], cursor: &mut usize) -> Option<u64> {
    let slice: [u8; 8] = bytes.get(*cursor..*cursor + 8)?.try_into().ok()?;
    *cursor += 8;
    Some(u64::from_le_bytes(slice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_number_constants_deduplicate() {
        let mut program = Program::new();
        program.write_push_number(1.5);
        program.write_push_number(1.5);
        program.write_push_number(1.5 + 1e-7); // within epsilon
        program.write_push_number(2.0);
        assert_eq!(program.constants_dictionary().len(), 2);
        assert_eq!(program.constants.len(), 16);
    }

    #[test]
    fn test_string_constants_deduplicate() {
        let mut program = Program::new();
        program.write_push_string("hi");
        program.write_push_string("hi");
        program.write_push_string("ho");
        assert_eq!(program.constants_dictionary().len(), 2);
        // each entry: 8-byte length + 2 bytes payload
        assert_eq!(program.constants.len(), 20);
    }

    #[test]
    fn test_mixed_kinds_do_not_collide() {
        let mut program = Program::new();
        program.write_push_string("12345678");
        program.write_push_number(3.0);
        assert_eq!(program.constants_dictionary().len(), 2);
    }

    #[test]
    fn test_jump_patching() {
        let mut program = Program::new();
        let placeholder = program.write_jump(Opcode::JumpIfFalse);
        program.write(Opcode::Pop);
        program.write(Opcode::Noop);
        program.patch_jump(placeholder).unwrap();
        // displacement covers POP + NOOP = 2 bytes
        assert_eq!(&program.code[placeholder..placeholder + 2], &[2, 0]);
    }

    #[test]
    fn test_loop_encoding() {
        let mut program = Program::new();
        program.write(Opcode::Noop);
        let target = program.code.len();
        program.write(Opcode::Pop);
        program.write_loop(target).unwrap();
        let mut cursor = target + 1 + 1; // POP + JUMP_LOOP tag
        let offset = read_u16(&program.code, &mut cursor).unwrap();
        assert_eq!(cursor - offset as usize, target);
    }

    #[test]
    fn test_constant_readers() {
        let mut program = Program::new();
        program.write_push_number(2.5);
        program.write_push_string("abc");
        assert_eq!(program.number_at(0), Some(2.5));
        assert_eq!(program.string_at(8), Some("abc"));
        assert_eq!(program.string_at(999), None);
    }

    #[test]
    fn test_opcode_roundtrip() {
        for tag in 0..=33u8 {
            let opcode = Opcode::from_u8(tag).unwrap();
            assert_eq!(opcode as u8, tag);
        }
        assert_eq!(Opcode::from_u8(34), None);
    }

    #[test]
    fn test_disassemble_push_number() {
        let mut program = Program::new();
        program.write_push_number(7.0);
        let (line, next) = program.disassemble_instruction(0).unwrap();
        assert_eq!(line, "0000 PUSH_NUMBER 0 (7)");
        assert_eq!(next, 9);
    }

    #[test]
    fn test_disassemble_snapshot() {
        let mut program = Program::new();
        program.write_push_number(1.0);
        program.write_push_number(2.0);
        program.write(Opcode::Add);
        program.write(Opcode::Pop);
        insta::assert_snapshot!(program.disassemble(), @r###"
        entry: 0
        0000 PUSH_NUMBER 0 (1)
        0009 PUSH_NUMBER 8 (2)
        0018 ADD
        0019 POP
        "###);
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\nb\t\"c\"\\"), "a\\nb\\t\\\"c\\\"\\\\");
    }
}
