//! Instruction tags.
//!
//! Defines the raw opcode and expcode sets for Netbyte bytecode.
//! This file contains no execution semantics.
//! Tag values are a wire-format contract.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Statement-level operation tags.
///
/// Operations execute for effect and never produce a value by themselves.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCode {
    /// Bind a global variable: `SETVAR name expr`.
    SetVar = 0x01,
    /// Remove a global binding if present: `DELVAR name`.
    DelVar = 0x02,
    /// Register a function: `MKFUNC name arity mutation report`.
    MkFunc = 0x03,
    /// Halt the current sequence with a value: `RETURN expr`.
    Return = 0x04,
    /// Halt the current sequence immediately, yielding null.
    Termin = 0x05,
    /// Jump to an absolute instruction index: `JUMPTO expr`.
    JumpTo = 0x06,
    /// Unconditional jump to a label: `JUMPLB label`.
    JumpLb = 0x07,
    /// Conditional jump: `JUMPIF expr label`.
    JumpIf = 0x08,
    /// Mark a label; a no-op at run time, resolved in the pre-pass.
    MLabel = 0x09,
    /// Evaluate operands and emit one space-joined output line.
    PrintV = 0x0A,
    /// Evaluate an expression and discard its result.
    NullEv = 0x0B,
}

impl OpCode {
    /// Convert a raw byte to an opcode.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(OpCode::SetVar),
            0x02 => Some(OpCode::DelVar),
            0x03 => Some(OpCode::MkFunc),
            0x04 => Some(OpCode::Return),
            0x05 => Some(OpCode::Termin),
            0x06 => Some(OpCode::JumpTo),
            0x07 => Some(OpCode::JumpLb),
            0x08 => Some(OpCode::JumpIf),
            0x09 => Some(OpCode::MLabel),
            0x0A => Some(OpCode::PrintV),
            0x0B => Some(OpCode::NullEv),
            _ => None,
        }
    }

    /// Canonical six-character mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::SetVar => "SETVAR",
            OpCode::DelVar => "DELVAR",
            OpCode::MkFunc => "MKFUNC",
            OpCode::Return => "RETURN",
            OpCode::Termin => "TERMIN",
            OpCode::JumpTo => "JUMPTO",
            OpCode::JumpLb => "JUMPLB",
            OpCode::JumpIf => "JUMPIF",
            OpCode::MLabel => "MLABEL",
            OpCode::PrintV => "PRINTV",
            OpCode::NullEv => "NULLEV",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Expression-level instruction tags.
///
/// Evaluating an expression always yields exactly one value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpCode {
    // Generic
    /// Read a global variable.
    GetVar = 0x01,
    /// Assignment expression: bind a global and yield the value.
    GstVar = 0x02,
    /// Positional argument of the current frame.
    GetArg = 0x03,
    /// Display-string of a value.
    VToStr = 0x04,

    // Comparison
    /// All operands equal.
    Equals = 0x10,
    /// Any operand differs.
    Differ = 0x11,
    /// Numeric less-than.
    LsrThn = 0x12,
    /// Numeric greater-than.
    GrtThn = 0x13,
    /// Numeric less-or-equal.
    LsrEql = 0x14,
    /// Numeric greater-or-equal.
    GrtEql = 0x15,

    // Numeric
    /// Variadic addition.
    AddNum = 0x20,
    /// Subtraction.
    SubNum = 0x21,
    /// Variadic multiplication.
    MulNum = 0x22,
    /// True division, always float.
    DivNum = 0x23,
    /// Power, always float.
    PowNum = 0x24,
    /// B-th root, always float.
    RotNum = 0x25,
    /// Bitwise AND, integers only.
    AndNum = 0x26,
    /// Bitwise OR, integers only.
    IorNum = 0x27,
    /// Bitwise XOR, integers only.
    XorNum = 0x28,
    /// Bitwise complement, integers only.
    NotNum = 0x29,

    // String
    /// Character slice of a string.
    SSlice = 0x30,
    /// One-character string at an index.
    SpsChr = 0x31,
    /// Stringify and concatenate left-to-right.
    Concat = 0x32,

    // Control / calls
    /// Choose and run one of two operation blocks.
    IfElse = 0x40,
    /// Evaluate an expression N times, yielding the last value.
    Repeat = 0x41,
    /// Call a registered function with positional arguments.
    FnCall = 0x42,
}

impl ExpCode {
    /// Convert a raw byte to an expcode.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(ExpCode::GetVar),
            0x02 => Some(ExpCode::GstVar),
            0x03 => Some(ExpCode::GetArg),
            0x04 => Some(ExpCode::VToStr),

            0x10 => Some(ExpCode::Equals),
            0x11 => Some(ExpCode::Differ),
            0x12 => Some(ExpCode::LsrThn),
            0x13 => Some(ExpCode::GrtThn),
            0x14 => Some(ExpCode::LsrEql),
            0x15 => Some(ExpCode::GrtEql),

            0x20 => Some(ExpCode::AddNum),
            0x21 => Some(ExpCode::SubNum),
            0x22 => Some(ExpCode::MulNum),
            0x23 => Some(ExpCode::DivNum),
            0x24 => Some(ExpCode::PowNum),
            0x25 => Some(ExpCode::RotNum),
            0x26 => Some(ExpCode::AndNum),
            0x27 => Some(ExpCode::IorNum),
            0x28 => Some(ExpCode::XorNum),
            0x29 => Some(ExpCode::NotNum),

            0x30 => Some(ExpCode::SSlice),
            0x31 => Some(ExpCode::SpsChr),
            0x32 => Some(ExpCode::Concat),

            0x40 => Some(ExpCode::IfElse),
            0x41 => Some(ExpCode::Repeat),
            0x42 => Some(ExpCode::FnCall),
            _ => None,
        }
    }

    /// Canonical six-character mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ExpCode::GetVar => "GETVAR",
            ExpCode::GstVar => "GSTVAR",
            ExpCode::GetArg => "GETARG",
            ExpCode::VToStr => "VTOSTR",
            ExpCode::Equals => "EQUALS",
            ExpCode::Differ => "DIFFER",
            ExpCode::LsrThn => "LSRTHN",
            ExpCode::GrtThn => "GRTTHN",
            ExpCode::LsrEql => "LSREQL",
            ExpCode::GrtEql => "GRTEQL",
            ExpCode::AddNum => "ADDNUM",
            ExpCode::SubNum => "SUBNUM",
            ExpCode::MulNum => "MULNUM",
            ExpCode::DivNum => "DIVNUM",
            ExpCode::PowNum => "POWNUM",
            ExpCode::RotNum => "ROTNUM",
            ExpCode::AndNum => "ANDNUM",
            ExpCode::IorNum => "IORNUM",
            ExpCode::XorNum => "XORNUM",
            ExpCode::NotNum => "NOTNUM",
            ExpCode::SSlice => "SSLICE",
            ExpCode::SpsChr => "SPSCHR",
            ExpCode::Concat => "CONCAT",
            ExpCode::IfElse => "IFELSE",
            ExpCode::Repeat => "REPEAT",
            ExpCode::FnCall => "FNCALL",
        }
    }
}

impl fmt::Display for ExpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
