//! The `.lbc` program file format.
//!
//! A program file is a sequence of tagged chunks:
//!
//! ```text
//! +-------------+----------------+-------------+
//! | tag (4 b)   | length (u64 le)| bytes       |
//! +-------------+----------------+-------------+
//! ```
//!
//! Three tags are defined: `HEAD` (`[version:u8][entry:u64 le]`), `CONS`
//! (the raw constants buffer) and `CODE` (the raw opcode stream). Unknown
//! tags are skipped for forward compatibility; loaders report them as
//! warnings. All integers are little-endian.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::program::{Program, PROGRAM_VERSION};

/// Chunk tags
pub const TAG_HEAD: &[u8; 4] = b"HEAD";
pub const TAG_CONS: &[u8; 4] = b"CONS";
pub const TAG_CODE: &[u8; 4] = b"CODE";

/// Errors while saving or loading program files
#[derive(Debug)]
pub enum ProgramFileError {
    /// I/O error during file operations
    Io(std::io::Error),
    /// A chunk header or payload was cut short
    Truncated,
    /// The HEAD chunk payload has the wrong size
    MalformedHeader,
    /// The file requires a newer format version
    UnsupportedVersion(u8),
}

impl std::fmt::Display for ProgramFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramFileError::Io(e) => write!(f, "I/O error: {e}"),
            ProgramFileError::Truncated => write!(f, "truncated program file"),
            ProgramFileError::MalformedHeader => write!(f, "malformed HEAD chunk"),
            ProgramFileError::UnsupportedVersion(v) => {
                write!(
                    f,
                    "unsupported program version {v} (current: {PROGRAM_VERSION})"
                )
            }
        }
    }
}

impl std::error::Error for ProgramFileError {}

impl From<std::io::Error> for ProgramFileError {
    fn from(e: std::io::Error) -> Self {
        ProgramFileError::Io(e)
    }
}

/// Serialize a program to the chunked byte format
pub fn save_to_bytes(program: &Program) -> Vec<u8> {
    let mut header = Vec::with_capacity(9);
    header.push(program.version);
    header.extend_from_slice(&program.entry.to_le_bytes());

    let mut out = Vec::new();
    write_chunk(&mut out, TAG_HEAD, &header);
    write_chunk(&mut out, TAG_CONS, &program.constants);
    write_chunk(&mut out, TAG_CODE, &program.code);
    out
}

fn write_chunk(out: &mut Vec<u8>, tag: &[u8; 4], bytes: &[u8]) {
    out.extend_from_slice(tag);
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// Save a program to a file
pub fn save<P: AsRef<Path>>(program: &Program, path: P) -> Result<(), ProgramFileError> {
    let mut file = File::create(path)?;
    file.write_all(&save_to_bytes(program))?;
    Ok(())
}

/// Deserialize a program, collecting the tags of any skipped unknown chunks
pub fn load_from_bytes(data: &[u8]) -> Result<(Program, Vec<String>), ProgramFileError> {
    let mut program = Program::new();
    let mut skipped = Vec::new();
    let mut cursor = 0usize;

    while cursor < data.len() {
        let tag = data
            .get(cursor..cursor + 4)
            .ok_or(ProgramFileError::Truncated)?;
        cursor += 4;
        let length_bytes: [u8; 8] = data
            .get(cursor..cursor + 8)
            .ok_or(ProgramFileError::Truncated)?
            .try_into()
            .map_err(|_| ProgramFileError::Truncated)?;
        cursor += 8;
        let length = u64::from_le_bytes(length_bytes) as usize;
        let payload = data
            .get(cursor..cursor + length)
            .ok_or(ProgramFileError::Truncated)?;
        cursor += length;

        if tag == TAG_HEAD {
            if payload.len() != 9 {
                return Err(ProgramFileError::MalformedHeader);
            }
            let version = payload[0];
            if version > PROGRAM_VERSION {
                return Err(ProgramFileError::UnsupportedVersion(version));
            }
            program.version = version;
            let entry_bytes: [u8; 8] = payload[1..9]
                .try_into()
                .map_err(|_| ProgramFileError::MalformedHeader)?;
            program.entry = u64::from_le_bytes(entry_bytes);
        } else if tag == TAG_CONS {
            program.constants.extend_from_slice(payload);
        } else if tag == TAG_CODE {
            program.code.extend_from_slice(payload);
        } else {
            skipped.push(String::from_utf8_lossy(tag).into_owned());
        }
    }

    Ok((program, skipped))
}

/// Load a program from a file; skipped unknown chunk tags are returned so
/// the driver can warn about them.
pub fn load<P: AsRef<Path>>(path: P) -> Result<(Program, Vec<String>), ProgramFileError> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    load_from_bytes(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Opcode;
    use pretty_assertions::assert_eq;

    fn sample_program() -> Program {
        let mut program = Program::new();
        program.write_push_number(1.0);
        program.write_push_string("hello");
        program.write(Opcode::Add);
        program.entry = 0;
        program
    }

    #[test]
    fn test_roundtrip_bytes() {
        let program = sample_program();
        let bytes = save_to_bytes(&program);
        let (loaded, skipped) = load_from_bytes(&bytes).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(loaded.version, program.version);
        assert_eq!(loaded.entry, program.entry);
        assert_eq!(loaded.constants, program.constants);
        assert_eq!(loaded.code, program.code);
    }

    #[test]
    fn test_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.lbc");
        let program = sample_program();
        save(&program, &path).unwrap();
        let (loaded, _) = load(&path).unwrap();
        assert_eq!(loaded.code, program.code);
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let program = sample_program();
        let mut bytes = save_to_bytes(&program);
        write_chunk(&mut bytes, b"XTRA", &[1, 2, 3]);
        let (loaded, skipped) = load_from_bytes(&bytes).unwrap();
        assert_eq!(skipped, vec!["XTRA".to_string()]);
        assert_eq!(loaded.code, program.code);
    }

    #[test]
    fn test_truncated_file() {
        let bytes = save_to_bytes(&sample_program());
        let result = load_from_bytes(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(ProgramFileError::Truncated)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut program = sample_program();
        program.version = PROGRAM_VERSION + 1;
        let bytes = save_to_bytes(&program);
        assert!(matches!(
            load_from_bytes(&bytes),
            Err(ProgramFileError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_head_layout() {
        let mut program = Program::new();
        program.entry = 0x0102030405060708;
        let bytes = save_to_bytes(&program);
        assert_eq!(&bytes[0..4], TAG_HEAD);
        // length = 9
        assert_eq!(u64::from_le_bytes(bytes[4..12].try_into().unwrap()), 9);
        assert_eq!(bytes[12], PROGRAM_VERSION);
        assert_eq!(
            u64::from_le_bytes(bytes[13..21].try_into().unwrap()),
            0x0102030405060708
        );
    }
}
