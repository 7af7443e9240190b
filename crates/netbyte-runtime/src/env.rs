//! Runtime environment.
//!
//! One [`Env`] exists per program run. It owns the global-variable table,
//! the function table, and the top-level label table. There is no block
//! scoping: top-level code and every function body share the single
//! variable namespace. Argument frames are the only call-local state.

use std::rc::Rc;

use indexmap::IndexMap;

use netbyte_bytecode::{Op, OpCode, Operand, Value};

use crate::error::ErrorKind;

/// A registered function: declared arity plus the two body blocks.
///
/// Registered once at `MKFUNC` time and immutable thereafter. The table
/// owns the body; call sites resolve by name and hold an `Rc` for the
/// duration of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Registered name.
    pub name: String,
    /// Declared positional parameter count.
    pub arity: usize,
    /// Operations executed for effect.
    pub mutation: Vec<Op>,
    /// Operations executed after the mutation block.
    pub report: Vec<Op>,
}

/// Ephemeral positional-argument frame for one function call.
///
/// Created per call, destroyed on return. Nested calls stack fresh frames;
/// a frame never outlives its call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    args: Vec<Value>,
}

impl Frame {
    /// Build a frame from evaluated call arguments.
    pub fn new(args: Vec<Value>) -> Self {
        Self { args }
    }

    /// Positional argument lookup.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Number of arguments in the frame.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the frame holds no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Per-run storage: global variables, functions, and top-level labels.
#[derive(Debug, Default)]
pub struct Env {
    vars: IndexMap<String, Value>,
    funcs: IndexMap<String, Rc<Function>>,
    labels: IndexMap<String, usize>,
}

impl Env {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a global variable. Undefined reads fail fast rather than
    /// defaulting to null, surfacing authoring bugs early.
    pub fn get_var(&self, name: &str) -> Result<&Value, ErrorKind> {
        self.vars
            .get(name)
            .ok_or_else(|| ErrorKind::UndefinedVariable(name.to_string()))
    }

    /// Create or overwrite a global binding.
    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Remove a binding. Removing an absent name is a no-op.
    pub fn delete_var(&mut self, name: &str) -> bool {
        self.vars.shift_remove(name).is_some()
    }

    /// Whether a binding exists, without the fail-fast read policy.
    pub fn has_var(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Register a function. Functions are not redefinable.
    pub fn define_function(&mut self, function: Function) -> Result<(), ErrorKind> {
        if self.funcs.contains_key(&function.name) {
            return Err(ErrorKind::DuplicateFunction(function.name));
        }
        self.funcs
            .insert(function.name.clone(), Rc::new(function));
        Ok(())
    }

    /// Resolve a function by name.
    pub fn lookup_function(&self, name: &str) -> Result<Rc<Function>, ErrorKind> {
        self.funcs
            .get(name)
            .cloned()
            .ok_or_else(|| ErrorKind::UndefinedFunction(name.to_string()))
    }

    /// Install the top-level label table produced by [`resolve_labels`].
    pub fn set_labels(&mut self, labels: IndexMap<String, usize>) {
        self.labels = labels;
    }

    /// Resolve a top-level label to its instruction index.
    pub fn resolve_label(&self, name: &str) -> Result<usize, ErrorKind> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| ErrorKind::UndefinedLabel(name.to_string()))
    }

    /// Iterate global bindings in insertion order.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Collect label positions for one operation sequence.
///
/// Runs as a pre-pass before the sequence executes, so forward jump
/// references are legal within a single pass. Labels are unique per
/// sequence; a duplicate fails before any instruction runs.
pub fn resolve_labels(ops: &[Op]) -> Result<IndexMap<String, usize>, ErrorKind> {
    let mut labels = IndexMap::new();
    for (index, op) in ops.iter().enumerate() {
        if op.code != OpCode::MLabel {
            continue;
        }
        let name = match op.args.first() {
            Some(Operand::Label(name)) => name.clone(),
            other => {
                return Err(ErrorKind::mismatch(
                    "MLABEL",
                    format!(
                        "expected label operand, found {}",
                        other.map_or("nothing", |o| o.kind())
                    ),
                ))
            }
        };
        if labels.insert(name.clone(), index).is_some() {
            return Err(ErrorKind::DuplicateLabel(name));
        }
    }
    Ok(labels)
}
