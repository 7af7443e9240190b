//! Instruction tree.
//!
//! The in-memory representation of a whole program: an ordered sequence of
//! operations whose operands may nest expressions, operation blocks, and
//! literal values. Pure data; construction belongs to an external parser or
//! to [`decode`](crate::codec::decode), behavior to the runtime.

use serde::{Deserialize, Serialize};

use crate::opcode::{ExpCode, OpCode};
use crate::value::Value;

/// A whole program: the top-level operation sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Top-level operations in execution order.
    pub ops: Vec<Op>,
}

impl Program {
    /// Create a program from a sequence of operations.
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    /// Number of top-level operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the program has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Serialize to the binary wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        crate::codec::encode(self)
    }

    /// Deserialize from the binary wire format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::error::FormatError> {
        crate::codec::decode(bytes)
    }
}

/// Statement-level instruction: an opcode plus ordered operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Op {
    /// Operation tag.
    pub code: OpCode,
    /// Ordered operands.
    pub args: Vec<Operand>,
}

impl Op {
    /// Create an operation.
    pub fn new(code: OpCode, args: Vec<Operand>) -> Self {
        Self { code, args }
    }
}

/// Expression-level instruction: an expcode plus ordered operands.
///
/// Evaluating an expression always yields exactly one value; only
/// operations redirect the instruction pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Expression tag.
    pub code: ExpCode,
    /// Ordered operands.
    pub args: Vec<Operand>,
}

impl Expr {
    /// Create an expression.
    pub fn new(code: ExpCode, args: Vec<Operand>) -> Self {
        Self { code, args }
    }
}

/// A single operand slot of an operation or expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Literal value.
    Value(Value),
    /// Variable name reference.
    Var(String),
    /// Label name reference.
    Label(String),
    /// Nested expression, evaluated when the slot is read.
    Expr(Expr),
    /// Nested operation sequence (function bodies, `IFELSE` arms).
    Block(Vec<Op>),
}

impl Operand {
    /// Short tag name, used in diagnostics and listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Operand::Value(_) => "value",
            Operand::Var(_) => "var",
            Operand::Label(_) => "label",
            Operand::Expr(_) => "expr",
            Operand::Block(_) => "block",
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Expr> for Operand {
    fn from(e: Expr) -> Self {
        Operand::Expr(e)
    }
}
