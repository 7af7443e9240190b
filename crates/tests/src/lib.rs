//! Integration test harness for Netbyte.
//!
//! This crate provides utilities for end-to-end testing of the full
//! pipeline: Build tree → Encode → Decode → Execute → Verify.

use netbyte_bytecode::{ExpCode, Expr, Op, OpCode, Operand, Program, Value};
use netbyte_runtime::{Engine, Env, OutputBuffer, Result};

/// Test harness running programs against a fresh engine with captured
/// output.
pub struct TestHarness {
    engine: Engine,
    output: OutputBuffer,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Create a harness with an empty environment and an in-memory sink.
    pub fn new() -> Self {
        let output = OutputBuffer::new();
        let engine = Engine::with_output(Box::new(output.clone()));
        Self { engine, output }
    }

    /// Execute a program directly.
    pub fn run(&mut self, program: &Program) -> Result<Value> {
        self.engine.run(program)
    }

    /// Encode a program to the wire format, decode it back, and execute
    /// the decoded copy.
    ///
    /// # Panics
    ///
    /// Panics if decoding fails or the decoded tree differs from the
    /// original.
    pub fn run_roundtrip(&mut self, program: &Program) -> Result<Value> {
        let bytes = program.to_bytes();
        let decoded = Program::from_bytes(&bytes).expect("decoding failed");
        assert_eq!(&decoded, program, "decoded tree differs from original");
        self.engine.run(&decoded)
    }

    /// Snapshot of all output lines emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.output.lines()
    }

    /// Access the engine's environment for state verification.
    pub fn env(&self) -> &Env {
        self.engine.env()
    }

    /// Read a global variable, panicking if undefined.
    pub fn var(&self, name: &str) -> Value {
        self.env()
            .get_var(name)
            .unwrap_or_else(|e| panic!("{e}"))
            .clone()
    }
}

// Tree-building shorthand for tests.

/// Literal value operand.
pub fn lit(value: impl Into<Value>) -> Operand {
    Operand::Value(value.into())
}

/// Variable reference operand.
pub fn var(name: &str) -> Operand {
    Operand::Var(name.into())
}

/// Label reference operand.
pub fn label(name: &str) -> Operand {
    Operand::Label(name.into())
}

/// Nested expression operand.
pub fn expr(code: ExpCode, args: Vec<Operand>) -> Operand {
    Operand::Expr(Expr::new(code, args))
}

/// Nested operation-block operand.
pub fn block(ops: Vec<Op>) -> Operand {
    Operand::Block(ops)
}

/// Statement-level operation.
pub fn op(code: OpCode, args: Vec<Operand>) -> Op {
    Op::new(code, args)
}

/// `GETVAR` shorthand.
pub fn getvar(name: &str) -> Operand {
    expr(ExpCode::GetVar, vec![var(name)])
}

/// `GETARG` shorthand.
pub fn getarg(index: i64) -> Operand {
    expr(ExpCode::GetArg, vec![lit(index)])
}
