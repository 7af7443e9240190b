//! # Netbyte runtime
//!
//! Tree-walking execution engine for Netbyte programs.
//!
//! The [`Engine`] owns one [`Env`] (global variables, functions, labels)
//! and walks a decoded [`Program`](netbyte_bytecode::Program): operations
//! run for effect and control flow, expressions evaluate recursively to
//! values. Runs are deterministic; any fault aborts immediately with an
//! [`Error`] carrying the top-level instruction index.
//!
//! ```no_run
//! use netbyte_bytecode::Program;
//! use netbyte_runtime::Engine;
//!
//! # fn main() -> netbyte_runtime::Result<()> {
//! let program = Program::default();
//! let mut engine = Engine::new();
//! let result = engine.run(&program)?;
//! println!("program yielded {result}");
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod error;
pub mod executor;
pub mod output;

pub use env::{resolve_labels, Env, Frame, Function};
pub use error::{Error, ErrorKind, Result};
pub use executor::Engine;
pub use output::{OutputBuffer, OutputSink, StdoutSink};
