//! # Netbyte bytecode
//!
//! Instruction tree and binary codec for the Netbyte intermediary bytecode
//! system.
//!
//! A Netbyte program is an ordered sequence of statement-level operations
//! ([`Op`]), whose operands may nest expression-level instructions ([`Expr`])
//! to arbitrary depth. This crate defines:
//!
//! - [`Value`] — the dynamic tagged-union datum shared with the runtime
//! - [`Program`] / [`Op`] / [`Expr`] / [`Operand`] — the instruction tree
//! - [`OpCode`] / [`ExpCode`] — the two-tier instruction vocabulary
//! - [`encode`] / [`decode`] — the compact self-describing wire format
//!
//! Execution lives in `netbyte-runtime`; this crate is pure data plus
//! serialization.

pub mod codec;
pub mod error;
pub mod opcode;
pub mod tree;
pub mod value;

pub use codec::{decode, encode};
pub use error::FormatError;
pub use opcode::{ExpCode, OpCode};
pub use tree::{Expr, Op, Operand, Program};
pub use value::{FuncRef, Value};

/// Crate version, matching the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
