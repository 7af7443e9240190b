//! Execution engine.
//!
//! Walks an instruction tree against a [`Env`], executing operations
//! sequentially and evaluating expressions recursively. Control flow is an
//! explicit instruction pointer over the current operation sequence; only
//! operations redirect it, expressions always produce exactly one value.
//!
//! Execution is single-threaded and synchronous: one operation or
//! expression runs to completion before the next begins. A host may abort
//! a run cooperatively through a stop flag checked between top-level
//! dispatches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use netbyte_bytecode::{ExpCode, Expr, Op, OpCode, Operand, Program, Value};

use crate::env::{resolve_labels, Env, Frame, Function};
use crate::error::{Error, ErrorKind, Result};
use crate::output::{OutputSink, StdoutSink};

/// Outcome of executing one operation.
enum Flow {
    /// Fall through to the next instruction.
    Continue,
    /// Redirect the instruction pointer within the current sequence.
    Jump(usize),
    /// Halt the current sequence with an explicit value.
    Return(Value),
    /// Halt the current sequence without a value.
    Halt,
}

/// Tree-walking interpreter for one program run.
///
/// Owns the runtime environment and the output sink. State is created
/// fresh per engine; independent engines may run concurrently since no
/// state is shared between them.
pub struct Engine {
    env: Env,
    output: Box<dyn OutputSink>,
    stop: Option<Arc<AtomicBool>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine writing program output to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(StdoutSink))
    }

    /// Create an engine with a custom output sink.
    pub fn with_output(output: Box<dyn OutputSink>) -> Self {
        Self {
            env: Env::new(),
            output,
            stop: None,
        }
    }

    /// Install a cooperative stop flag, checked between top-level
    /// dispatches. A set flag faults the run with
    /// [`ErrorKind::Interrupted`] without corrupting environment state.
    pub fn set_stop_flag(&mut self, flag: Arc<AtomicBool>) {
        self.stop = Some(flag);
    }

    /// Inspect the runtime environment.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Execute a program and yield its final value.
    ///
    /// Labels of the top-level sequence are resolved in one pre-pass
    /// before the first instruction runs, so forward jump references are
    /// legal. Reaching the end of the sequence without `RETURN` yields
    /// null.
    #[instrument(skip_all, fields(ops = program.len()))]
    pub fn run(&mut self, program: &Program) -> Result<Value> {
        let labels = resolve_labels(&program.ops).map_err(|kind| Error::at(kind, 0))?;
        self.env.set_labels(labels.clone());
        debug!(labels = labels.len(), "labels resolved");

        let mut ip = 0;
        while ip < program.ops.len() {
            if self.should_stop() {
                return Err(Error::at(ErrorKind::Interrupted, ip));
            }
            let op = &program.ops[ip];
            trace!(ip, code = %op.code, "dispatch");
            match self
                .exec_op(op, None, &labels)
                .map_err(|kind| Error::at(kind, ip))?
            {
                Flow::Continue => ip += 1,
                Flow::Jump(target) => ip = target,
                Flow::Return(value) => {
                    debug!(%value, "explicit return");
                    return Ok(value);
                }
                Flow::Halt => return Ok(Value::Null),
            }
        }
        Ok(Value::Null)
    }

    fn should_stop(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Run a nested operation sequence (function body or `IFELSE` arm).
    ///
    /// The sequence resolves its own labels, so jumps are scoped to the
    /// block they appear in. Returns `Some` only for an explicit `RETURN`.
    fn run_block(&mut self, ops: &[Op], frame: Option<&Frame>) -> std::result::Result<Option<Value>, ErrorKind> {
        let labels = resolve_labels(ops)?;
        let mut ip = 0;
        while ip < ops.len() {
            match self.exec_op(&ops[ip], frame, &labels)? {
                Flow::Continue => ip += 1,
                Flow::Jump(target) => ip = target,
                Flow::Return(value) => return Ok(Some(value)),
                Flow::Halt => return Ok(None),
            }
        }
        Ok(None)
    }

    fn exec_op(
        &mut self,
        op: &Op,
        frame: Option<&Frame>,
        labels: &IndexMap<String, usize>,
    ) -> std::result::Result<Flow, ErrorKind> {
        match op.code {
            OpCode::SetVar => {
                let name = var_name("SETVAR", &op.args, 0)?.to_string();
                let value = self.eval(operand("SETVAR", &op.args, 1)?, frame)?;
                trace!(var = %name, %value, "setvar");
                self.env.set_var(name, value);
                Ok(Flow::Continue)
            }
            OpCode::DelVar => {
                let name = var_name("DELVAR", &op.args, 0)?;
                self.env.delete_var(name);
                Ok(Flow::Continue)
            }
            OpCode::MkFunc => {
                let name = str_value("MKFUNC", &op.args, 0)?.to_string();
                let arity = int_value("MKFUNC", &op.args, 1)?;
                if arity < 0 {
                    return Err(ErrorKind::mismatch("MKFUNC", "negative arity"));
                }
                let mutation = block("MKFUNC", &op.args, 2)?.to_vec();
                let report = block("MKFUNC", &op.args, 3)?.to_vec();
                debug!(name = %name, arity, "function registered");
                self.env.define_function(Function {
                    name,
                    arity: arity as usize,
                    mutation,
                    report,
                })?;
                Ok(Flow::Continue)
            }
            OpCode::Return => {
                let value = match op.args.first() {
                    Some(arg) => self.eval(arg, frame)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            OpCode::Termin => Ok(Flow::Halt),
            OpCode::JumpTo => {
                let target = self.eval(operand("JUMPTO", &op.args, 0)?, frame)?;
                let index = int_of("JUMPTO", &target)?;
                if index < 0 {
                    return Err(ErrorKind::mismatch("JUMPTO", "negative instruction index"));
                }
                Ok(Flow::Jump(index as usize))
            }
            OpCode::JumpLb => {
                let name = label_name("JUMPLB", &op.args, 0)?;
                let target = lookup_label(labels, name)?;
                Ok(Flow::Jump(target))
            }
            OpCode::JumpIf => {
                let cond = self.eval(operand("JUMPIF", &op.args, 0)?, frame)?;
                if cond.is_truthy() {
                    let name = label_name("JUMPIF", &op.args, 1)?;
                    let target = lookup_label(labels, name)?;
                    trace!(label = name, target, "jump taken");
                    Ok(Flow::Jump(target))
                } else {
                    Ok(Flow::Continue)
                }
            }
            OpCode::MLabel => Ok(Flow::Continue),
            OpCode::PrintV => {
                let mut parts = Vec::with_capacity(op.args.len());
                for arg in &op.args {
                    parts.push(self.eval(arg, frame)?.to_string());
                }
                self.output.line(&parts.join(" "));
                Ok(Flow::Continue)
            }
            OpCode::NullEv => {
                for arg in &op.args {
                    self.eval(arg, frame)?;
                }
                Ok(Flow::Continue)
            }
        }
    }

    /// Evaluate an operand in value position.
    fn eval(&mut self, operand: &Operand, frame: Option<&Frame>) -> std::result::Result<Value, ErrorKind> {
        match operand {
            Operand::Value(v) => Ok(v.clone()),
            Operand::Var(name) => self.env.get_var(name).cloned(),
            Operand::Expr(expr) => self.eval_expr(expr, frame),
            Operand::Label(_) | Operand::Block(_) => Err(ErrorKind::mismatch(
                "operand",
                format!("{} is not valid in value position", operand.kind()),
            )),
        }
    }

    fn eval_expr(&mut self, expr: &Expr, frame: Option<&Frame>) -> std::result::Result<Value, ErrorKind> {
        match expr.code {
            ExpCode::GetVar => {
                let name = var_name("GETVAR", &expr.args, 0)?;
                self.env.get_var(name).cloned()
            }
            ExpCode::GstVar => {
                let name = var_name("GSTVAR", &expr.args, 0)?.to_string();
                let value = self.eval(operand("GSTVAR", &expr.args, 1)?, frame)?;
                self.env.set_var(name, value.clone());
                Ok(value)
            }
            ExpCode::GetArg => {
                let index = int_of(
                    "GETARG",
                    &self.eval(operand("GETARG", &expr.args, 0)?, frame)?,
                )?;
                if index < 0 {
                    return Err(ErrorKind::mismatch("GETARG", "negative argument index"));
                }
                let index = index as usize;
                let frame = frame.ok_or(ErrorKind::ArgumentIndex { index, len: 0 })?;
                frame
                    .get(index)
                    .cloned()
                    .ok_or(ErrorKind::ArgumentIndex {
                        index,
                        len: frame.len(),
                    })
            }
            ExpCode::VToStr => {
                let value = self.eval(operand("VTOSTR", &expr.args, 0)?, frame)?;
                Ok(Value::Str(value.to_string()))
            }
            ExpCode::Equals => {
                let values = self.eval_at_least("EQUALS", &expr.args, 2, frame)?;
                Ok(Value::Bool(all_equal(&values)))
            }
            ExpCode::Differ => {
                let values = self.eval_at_least("DIFFER", &expr.args, 2, frame)?;
                Ok(Value::Bool(!all_equal(&values)))
            }
            ExpCode::LsrThn => self.compare(expr, frame, "LSRTHN", |o| o.is_lt()),
            ExpCode::GrtThn => self.compare(expr, frame, "GRTTHN", |o| o.is_gt()),
            ExpCode::LsrEql => self.compare(expr, frame, "LSREQL", |o| o.is_le()),
            ExpCode::GrtEql => self.compare(expr, frame, "GRTEQL", |o| o.is_ge()),
            ExpCode::AddNum => self.fold_numeric("ADDNUM", expr, frame, num_add),
            ExpCode::MulNum => self.fold_numeric("MULNUM", expr, frame, num_mul),
            ExpCode::SubNum => {
                let (a, b) = self.eval_pair("SUBNUM", &expr.args, frame)?;
                Ok(num_value(num_sub(
                    num_of("SUBNUM", &a)?,
                    num_of("SUBNUM", &b)?,
                )))
            }
            ExpCode::DivNum => {
                let (a, b) = self.eval_pair("DIVNUM", &expr.args, frame)?;
                Ok(Value::Float(
                    float_of("DIVNUM", &a)? / float_of("DIVNUM", &b)?,
                ))
            }
            ExpCode::PowNum => {
                let (a, b) = self.eval_pair("POWNUM", &expr.args, frame)?;
                Ok(Value::Float(
                    float_of("POWNUM", &a)?.powf(float_of("POWNUM", &b)?),
                ))
            }
            ExpCode::RotNum => {
                let (a, b) = self.eval_pair("ROTNUM", &expr.args, frame)?;
                Ok(Value::Float(
                    float_of("ROTNUM", &a)?.powf(1.0 / float_of("ROTNUM", &b)?),
                ))
            }
            ExpCode::AndNum => self.fold_bitwise("ANDNUM", expr, frame, |a, b| a & b),
            ExpCode::IorNum => self.fold_bitwise("IORNUM", expr, frame, |a, b| a | b),
            ExpCode::XorNum => self.fold_bitwise("XORNUM", expr, frame, |a, b| a ^ b),
            ExpCode::NotNum => {
                let value = self.eval(operand("NOTNUM", &expr.args, 0)?, frame)?;
                Ok(Value::Int(!int_of("NOTNUM", &value)?))
            }
            ExpCode::SSlice => {
                let s = self.eval(operand("SSLICE", &expr.args, 0)?, frame)?;
                let s = str_of("SSLICE", &s)?.to_string();
                let start = int_of(
                    "SSLICE",
                    &self.eval(operand("SSLICE", &expr.args, 1)?, frame)?,
                )?;
                let end = int_of(
                    "SSLICE",
                    &self.eval(operand("SSLICE", &expr.args, 2)?, frame)?,
                )?;
                Ok(Value::Str(slice_chars(&s, start, end)))
            }
            ExpCode::SpsChr => {
                let s = self.eval(operand("SPSCHR", &expr.args, 0)?, frame)?;
                let s = str_of("SPSCHR", &s)?.to_string();
                let index = int_of(
                    "SPSCHR",
                    &self.eval(operand("SPSCHR", &expr.args, 1)?, frame)?,
                )?;
                char_at(&s, index).map(Value::Str)
            }
            ExpCode::Concat => {
                let mut out = String::new();
                for arg in &expr.args {
                    out.push_str(&self.eval(arg, frame)?.to_string());
                }
                Ok(Value::Str(out))
            }
            ExpCode::IfElse => {
                let cond = self.eval(operand("IFELSE", &expr.args, 0)?, frame)?;
                let arm = if cond.is_truthy() { 1 } else { 2 };
                let ops = block("IFELSE", &expr.args, arm)?;
                Ok(self.run_block(ops, frame)?.unwrap_or(Value::Null))
            }
            ExpCode::Repeat => {
                let count = int_of(
                    "REPEAT",
                    &self.eval(operand("REPEAT", &expr.args, 0)?, frame)?,
                )?;
                let body = operand("REPEAT", &expr.args, 1)?;
                let mut last = Value::Null;
                for _ in 0..count {
                    last = self.eval(body, frame)?;
                }
                Ok(last)
            }
            ExpCode::FnCall => {
                let callee = self.eval(operand("FNCALL", &expr.args, 0)?, frame)?;
                let name = match &callee {
                    Value::Str(name) => name.clone(),
                    Value::Func(r) => r.name.clone(),
                    other => {
                        return Err(ErrorKind::mismatch(
                            "FNCALL",
                            format!("expected function name, found {}", other.type_name()),
                        ))
                    }
                };
                let mut args = Vec::with_capacity(expr.args.len().saturating_sub(1));
                for arg in &expr.args[1..] {
                    args.push(self.eval(arg, frame)?);
                }
                self.call(&name, args)
            }
        }
    }

    /// Invoke a registered function with an already-evaluated frame.
    ///
    /// The mutation block runs first; an explicit `RETURN` there
    /// short-circuits the call. Otherwise the report block's `RETURN`
    /// value (or null) is the call's result.
    fn call(&mut self, name: &str, args: Vec<Value>) -> std::result::Result<Value, ErrorKind> {
        let function = self.env.lookup_function(name)?;
        trace!(name, args = args.len(), "call");
        let frame = Frame::new(args);
        if let Some(value) = self.run_block(&function.mutation, Some(&frame))? {
            return Ok(value);
        }
        Ok(self
            .run_block(&function.report, Some(&frame))?
            .unwrap_or(Value::Null))
    }

    fn eval_at_least(
        &mut self,
        op: &'static str,
        args: &[Operand],
        min: usize,
        frame: Option<&Frame>,
    ) -> std::result::Result<Vec<Value>, ErrorKind> {
        if args.len() < min {
            return Err(ErrorKind::mismatch(
                op,
                format!("expected at least {} operands, found {}", min, args.len()),
            ));
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, frame)?);
        }
        Ok(values)
    }

    fn eval_pair(
        &mut self,
        op: &'static str,
        args: &[Operand],
        frame: Option<&Frame>,
    ) -> std::result::Result<(Value, Value), ErrorKind> {
        if args.len() != 2 {
            return Err(ErrorKind::mismatch(
                op,
                format!("expected 2 operands, found {}", args.len()),
            ));
        }
        let a = self.eval(&args[0], frame)?;
        let b = self.eval(&args[1], frame)?;
        Ok((a, b))
    }

    fn compare(
        &mut self,
        expr: &Expr,
        frame: Option<&Frame>,
        op: &'static str,
        pick: fn(std::cmp::Ordering) -> bool,
    ) -> std::result::Result<Value, ErrorKind> {
        let (a, b) = self.eval_pair(op, &expr.args, frame)?;
        let result = match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => pick(x.cmp(y)),
            _ => {
                let x = float_of(op, &a)?;
                let y = float_of(op, &b)?;
                // NaN compares false everywhere rather than faulting.
                x.partial_cmp(&y).map_or(false, pick)
            }
        };
        Ok(Value::Bool(result))
    }

    fn fold_numeric(
        &mut self,
        op: &'static str,
        expr: &Expr,
        frame: Option<&Frame>,
        combine: fn(Num, Num) -> Num,
    ) -> std::result::Result<Value, ErrorKind> {
        let values = self.eval_at_least(op, &expr.args, 2, frame)?;
        let mut acc = num_of(op, &values[0])?;
        for value in &values[1..] {
            acc = combine(acc, num_of(op, value)?);
        }
        Ok(num_value(acc))
    }

    fn fold_bitwise(
        &mut self,
        op: &'static str,
        expr: &Expr,
        frame: Option<&Frame>,
        combine: fn(i64, i64) -> i64,
    ) -> std::result::Result<Value, ErrorKind> {
        let values = self.eval_at_least(op, &expr.args, 2, frame)?;
        let mut acc = int_of(op, &values[0])?;
        for value in &values[1..] {
            acc = combine(acc, int_of(op, value)?);
        }
        Ok(Value::Int(acc))
    }
}

/// Numeric operand with the Int/Float coercion rule: a float anywhere
/// makes the result float, otherwise integer arithmetic applies.
#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

fn num_of(op: &'static str, value: &Value) -> std::result::Result<Num, ErrorKind> {
    match value {
        Value::Int(n) => Ok(Num::Int(*n)),
        Value::Float(f) => Ok(Num::Float(*f)),
        other => Err(ErrorKind::mismatch(
            op,
            format!("expected number, found {}", other.type_name()),
        )),
    }
}

fn num_value(num: Num) -> Value {
    match num {
        Num::Int(n) => Value::Int(n),
        Num::Float(f) => Value::Float(f),
    }
}

fn num_float(num: Num) -> f64 {
    match num {
        Num::Int(n) => n as f64,
        Num::Float(f) => f,
    }
}

fn num_add(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_add(y)),
        _ => Num::Float(num_float(a) + num_float(b)),
    }
}

fn num_sub(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_sub(y)),
        _ => Num::Float(num_float(a) - num_float(b)),
    }
}

fn num_mul(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(x.wrapping_mul(y)),
        _ => Num::Float(num_float(a) * num_float(b)),
    }
}

fn int_of(op: &'static str, value: &Value) -> std::result::Result<i64, ErrorKind> {
    value.as_int().ok_or_else(|| {
        ErrorKind::mismatch(op, format!("expected integer, found {}", value.type_name()))
    })
}

fn float_of(op: &'static str, value: &Value) -> std::result::Result<f64, ErrorKind> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        other => Err(ErrorKind::mismatch(
            op,
            format!("expected number, found {}", other.type_name()),
        )),
    }
}

fn str_of<'a>(op: &'static str, value: &'a Value) -> std::result::Result<&'a str, ErrorKind> {
    value.as_str().ok_or_else(|| {
        ErrorKind::mismatch(op, format!("expected string, found {}", value.type_name()))
    })
}

/// Equality with numeric cross-tag comparison; everything else is
/// structural.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (*x as f64) == *y,
        _ => a == b,
    }
}

fn all_equal(values: &[Value]) -> bool {
    values
        .windows(2)
        .all(|pair| values_equal(&pair[0], &pair[1]))
}

/// Character slice with clamping and negative (from-end) indices.
fn slice_chars(s: &str, start: i64, end: i64) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let norm = |i: i64| {
        if i < 0 {
            (i + len).clamp(0, len)
        } else {
            i.min(len)
        }
    };
    let (a, b) = (norm(start), norm(end));
    if a >= b {
        String::new()
    } else {
        chars[a as usize..b as usize].iter().collect()
    }
}

fn char_at(s: &str, index: i64) -> std::result::Result<String, ErrorKind> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(ErrorKind::IndexOutOfBounds { index, len });
    }
    Ok(chars[resolved as usize].to_string())
}

fn operand<'a>(
    op: &'static str,
    args: &'a [Operand],
    index: usize,
) -> std::result::Result<&'a Operand, ErrorKind> {
    args.get(index)
        .ok_or_else(|| ErrorKind::mismatch(op, format!("missing operand {}", index)))
}

/// Variable-name operand: a `Var` reference or a string literal.
fn var_name<'a>(
    op: &'static str,
    args: &'a [Operand],
    index: usize,
) -> std::result::Result<&'a str, ErrorKind> {
    match operand(op, args, index)? {
        Operand::Var(name) => Ok(name),
        Operand::Value(Value::Str(name)) => Ok(name),
        other => Err(ErrorKind::mismatch(
            op,
            format!("expected variable name, found {}", other.kind()),
        )),
    }
}

fn label_name<'a>(
    op: &'static str,
    args: &'a [Operand],
    index: usize,
) -> std::result::Result<&'a str, ErrorKind> {
    match operand(op, args, index)? {
        Operand::Label(name) => Ok(name),
        other => Err(ErrorKind::mismatch(
            op,
            format!("expected label operand, found {}", other.kind()),
        )),
    }
}

fn str_value<'a>(
    op: &'static str,
    args: &'a [Operand],
    index: usize,
) -> std::result::Result<&'a str, ErrorKind> {
    match operand(op, args, index)? {
        Operand::Value(Value::Str(s)) => Ok(s),
        other => Err(ErrorKind::mismatch(
            op,
            format!("expected string literal, found {}", other.kind()),
        )),
    }
}

fn int_value(
    op: &'static str,
    args: &[Operand],
    index: usize,
) -> std::result::Result<i64, ErrorKind> {
    match operand(op, args, index)? {
        Operand::Value(Value::Int(n)) => Ok(*n),
        other => Err(ErrorKind::mismatch(
            op,
            format!("expected integer literal, found {}", other.kind()),
        )),
    }
}

fn block<'a>(
    op: &'static str,
    args: &'a [Operand],
    index: usize,
) -> std::result::Result<&'a [Op], ErrorKind> {
    match operand(op, args, index)? {
        Operand::Block(ops) => Ok(ops),
        other => Err(ErrorKind::mismatch(
            op,
            format!("expected operation block, found {}", other.kind()),
        )),
    }
}

fn lookup_label(
    labels: &IndexMap<String, usize>,
    name: &str,
) -> std::result::Result<usize, ErrorKind> {
    labels
        .get(name)
        .copied()
        .ok_or_else(|| ErrorKind::UndefinedLabel(name.to_string()))
}
