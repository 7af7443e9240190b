//! Runtime errors.
//!
//! Every fault aborts the run immediately; there is no language-level
//! recovery construct, and re-running an unchanged program fails
//! identically. A fault surfaces as an [`Error`] pairing the specific
//! [`ErrorKind`] with the top-level instruction index at which it occurred.

use thiserror::Error;

/// Runtime result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A runtime fault with the instruction index where it surfaced.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind} (at instruction {at})")]
pub struct Error {
    /// Specific fault.
    pub kind: ErrorKind,
    /// Index into the top-level operation sequence.
    pub at: usize,
}

impl Error {
    /// Attach a top-level instruction index to a fault kind.
    pub fn at(kind: ErrorKind, at: usize) -> Self {
        Self { kind, at }
    }
}

/// Runtime fault kinds.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("undefined function `{0}`")]
    UndefinedFunction(String),

    #[error("undefined label `{0}`")]
    UndefinedLabel(String),

    #[error("duplicate function `{0}`")]
    DuplicateFunction(String),

    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),

    #[error("argument index {index} out of range for frame of {len}")]
    ArgumentIndex { index: usize, len: usize },

    #[error("index {index} out of bounds for string of {len} characters")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("type mismatch in {op}: {message}")]
    TypeMismatch { op: &'static str, message: String },

    #[error("execution interrupted by host")]
    Interrupted,
}

impl ErrorKind {
    /// Helper for the common mismatch shape.
    pub(crate) fn mismatch(op: &'static str, message: impl Into<String>) -> Self {
        ErrorKind::TypeMismatch {
            op,
            message: message.into(),
        }
    }
}
