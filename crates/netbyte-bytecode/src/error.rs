//! Codec errors.

use thiserror::Error;

/// Corrupt-format error raised by [`decode`](crate::codec::decode).
///
/// Decoding is all-or-nothing: any corruption aborts the load before any
/// execution begins. Every variant carries the byte offset at which the
/// corruption was detected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("bad magic number")]
    BadMagic,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    #[error("unknown opcode 0x{tag:02X} at offset {offset}")]
    UnknownOpcode { tag: u8, offset: usize },

    #[error("unknown expcode 0x{tag:02X} at offset {offset}")]
    UnknownExpcode { tag: u8, offset: usize },

    #[error("unknown operand tag 0x{tag:02X} at offset {offset}")]
    UnknownOperandTag { tag: u8, offset: usize },

    #[error("operand at offset {offset} is not a literal value")]
    ExpectedValue { offset: usize },

    #[error("invalid UTF-8 in string at offset {0}")]
    InvalidUtf8(usize),

    #[error("varint overflow at offset {0}")]
    VarintOverflow(usize),

    #[error("non-canonical varint encoding at offset {0}")]
    NonCanonicalVarint(usize),

    #[error("{0} trailing bytes after program end")]
    TrailingBytes(usize),
}

/// Codec result type.
pub type Result<T> = std::result::Result<T, FormatError>;
