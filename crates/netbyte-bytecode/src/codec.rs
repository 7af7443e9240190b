//! Binary codec.
//!
//! Serializes an instruction tree to a compact byte buffer and back.
//! This layer performs structural validation only; name resolution and
//! type checks belong to the runtime.
//!
//! ## Wire format
//!
//! ```text
//! file    := magic "NBYT" | version u8 | op-count varint | op*
//! op      := opcode u8 | argc varint | operand*
//! operand := tag u8 | payload
//! tags    : 0x00 Null | 0x01 Int (i64 LE) | 0x02 Float (f64 LE)
//!         | 0x03 Bool (u8)  | 0x04 Str (varint len + UTF-8)
//!         | 0x05 List (varint count + value-operand*)
//!         | 0x06 Func (varint len + name, varint arity)
//!         | 0x10 Var (varint len + name) | 0x11 Label (varint len + name)
//!         | 0x12 Expr (expcode u8 | argc varint | operand*)
//!         | 0x13 Block (varint count + op*)
//! varint  := LEB128 unsigned, canonical (at most 10 bytes, no zero final chunk)
//! ```
//!
//! Every operand is self-describing, so program size stays proportional to
//! logical complexity rather than a fixed per-instruction width. Nesting is
//! bounded only by available memory.

use crate::error::{FormatError, Result};
use crate::opcode::{ExpCode, OpCode};
use crate::tree::{Expr, Op, Operand, Program};
use crate::value::{FuncRef, Value};

/// File magic.
pub const MAGIC: &[u8; 4] = b"NBYT";

/// Supported format version.
pub const FORMAT_VERSION: u8 = 1;

// Operand tags. Values 0x00..=0x06 double as literal-value tags inside lists.
const TAG_NULL: u8 = 0x00;
const TAG_INT: u8 = 0x01;
const TAG_FLOAT: u8 = 0x02;
const TAG_BOOL: u8 = 0x03;
const TAG_STR: u8 = 0x04;
const TAG_LIST: u8 = 0x05;
const TAG_FUNC: u8 = 0x06;
const TAG_VAR: u8 = 0x10;
const TAG_LABEL: u8 = 0x11;
const TAG_EXPR: u8 = 0x12;
const TAG_BLOCK: u8 = 0x13;

/// Encode a program to its binary form.
pub fn encode(program: &Program) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.push(FORMAT_VERSION);
    write_varint(&mut buf, program.ops.len() as u64);
    for op in &program.ops {
        write_op(&mut buf, op);
    }
    buf
}

/// Decode a program from its binary form.
///
/// Fails with [`FormatError`] on truncated input, unknown tags, malformed
/// strings, or trailing bytes after the declared operation count.
pub fn decode(bytes: &[u8]) -> Result<Program> {
    let mut reader = Reader::new(bytes);
    let magic = reader.take(4).map_err(|_| FormatError::BadMagic)?;
    if magic != MAGIC {
        return Err(FormatError::BadMagic);
    }
    let version = reader.u8()?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }
    let count = reader.varint()? as usize;
    let mut ops = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        ops.push(read_op(&mut reader)?);
    }
    if reader.remaining() > 0 {
        return Err(FormatError::TrailingBytes(reader.remaining()));
    }
    Ok(Program { ops })
}

fn write_op(buf: &mut Vec<u8>, op: &Op) {
    buf.push(op.code as u8);
    write_varint(buf, op.args.len() as u64);
    for arg in &op.args {
        write_operand(buf, arg);
    }
}

fn write_operand(buf: &mut Vec<u8>, operand: &Operand) {
    match operand {
        Operand::Value(v) => write_value(buf, v),
        Operand::Var(name) => {
            buf.push(TAG_VAR);
            write_str(buf, name);
        }
        Operand::Label(name) => {
            buf.push(TAG_LABEL);
            write_str(buf, name);
        }
        Operand::Expr(expr) => {
            buf.push(TAG_EXPR);
            buf.push(expr.code as u8);
            write_varint(buf, expr.args.len() as u64);
            for arg in &expr.args {
                write_operand(buf, arg);
            }
        }
        Operand::Block(ops) => {
            buf.push(TAG_BLOCK);
            write_varint(buf, ops.len() as u64);
            for op in ops {
                write_op(buf, op);
            }
        }
    }
}

fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Int(n) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&n.to_le_bytes());
        }
        Value::Float(f) => {
            buf.push(TAG_FLOAT);
            buf.extend_from_slice(&f.to_le_bytes());
        }
        Value::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(*b as u8);
        }
        Value::Str(s) => {
            buf.push(TAG_STR);
            write_str(buf, s);
        }
        Value::List(items) => {
            buf.push(TAG_LIST);
            write_varint(buf, items.len() as u64);
            for item in items {
                write_value(buf, item);
            }
        }
        Value::Func(r) => {
            buf.push(TAG_FUNC);
            write_str(buf, &r.name);
            write_varint(buf, r.arity as u64);
        }
    }
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    write_varint(buf, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn read_op(reader: &mut Reader<'_>) -> Result<Op> {
    let offset = reader.pos;
    let tag = reader.u8()?;
    let code = OpCode::from_u8(tag).ok_or(FormatError::UnknownOpcode { tag, offset })?;
    let argc = reader.varint()? as usize;
    let mut args = Vec::with_capacity(argc.min(4096));
    for _ in 0..argc {
        args.push(read_operand(reader)?);
    }
    Ok(Op { code, args })
}

fn read_operand(reader: &mut Reader<'_>) -> Result<Operand> {
    let offset = reader.pos;
    let tag = reader.u8()?;
    match tag {
        TAG_NULL | TAG_INT | TAG_FLOAT | TAG_BOOL | TAG_STR | TAG_LIST | TAG_FUNC => {
            Ok(Operand::Value(read_value_payload(reader, tag)?))
        }
        TAG_VAR => Ok(Operand::Var(reader.string()?)),
        TAG_LABEL => Ok(Operand::Label(reader.string()?)),
        TAG_EXPR => {
            let exp_offset = reader.pos;
            let exp_tag = reader.u8()?;
            let code = ExpCode::from_u8(exp_tag).ok_or(FormatError::UnknownExpcode {
                tag: exp_tag,
                offset: exp_offset,
            })?;
            let argc = reader.varint()? as usize;
            let mut args = Vec::with_capacity(argc.min(4096));
            for _ in 0..argc {
                args.push(read_operand(reader)?);
            }
            Ok(Operand::Expr(Expr { code, args }))
        }
        TAG_BLOCK => {
            let count = reader.varint()? as usize;
            let mut ops = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                ops.push(read_op(reader)?);
            }
            Ok(Operand::Block(ops))
        }
        _ => Err(FormatError::UnknownOperandTag { tag, offset }),
    }
}

/// Read a literal value. Lists may only contain values, never variable or
/// label references, so nested elements go through here as well.
fn read_value(reader: &mut Reader<'_>) -> Result<Value> {
    let offset = reader.pos;
    let tag = reader.u8()?;
    match tag {
        TAG_NULL | TAG_INT | TAG_FLOAT | TAG_BOOL | TAG_STR | TAG_LIST | TAG_FUNC => {
            read_value_payload(reader, tag)
        }
        _ => Err(FormatError::ExpectedValue { offset }),
    }
}

fn read_value_payload(reader: &mut Reader<'_>, tag: u8) -> Result<Value> {
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_INT => {
            let bytes = reader.take(8)?;
            Ok(Value::Int(i64::from_le_bytes(bytes.try_into().unwrap())))
        }
        TAG_FLOAT => {
            let bytes = reader.take(8)?;
            Ok(Value::Float(f64::from_le_bytes(bytes.try_into().unwrap())))
        }
        TAG_BOOL => Ok(Value::Bool(reader.u8()? != 0)),
        TAG_STR => Ok(Value::Str(reader.string()?)),
        TAG_LIST => {
            let count = reader.varint()? as usize;
            let mut items = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                items.push(read_value(reader)?);
            }
            Ok(Value::List(items))
        }
        TAG_FUNC => {
            let name = reader.string()?;
            let arity = reader.varint()? as usize;
            Ok(Value::Func(FuncRef { name, arity }))
        }
        _ => unreachable!("caller checked the tag"),
    }
}

/// Cursor over the input buffer with offset tracking for diagnostics.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn u8(&mut self) -> Result<u8> {
        if self.pos >= self.bytes.len() {
            return Err(FormatError::UnexpectedEof(self.pos));
        }
        let byte = self.bytes[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        // Compare against the remaining length; `pos + n` could overflow
        // when a corrupt varint yields a length near u64::MAX.
        if n > self.remaining() {
            return Err(FormatError::UnexpectedEof(self.pos));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Canonical LEB128: at most ten bytes, the tenth carrying only bit
    /// 63, and the final chunk never zero (so every value has exactly one
    /// encoding).
    fn varint(&mut self) -> Result<u64> {
        let start = self.pos;
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.u8()?;
            if shift >= 64 || (shift == 63 && byte & 0x7F > 1) {
                return Err(FormatError::VarintOverflow(start));
            }
            if shift > 0 && byte == 0 {
                return Err(FormatError::NonCanonicalVarint(start));
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn string(&mut self) -> Result<String> {
        let offset = self.pos;
        let len = self.varint()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidUtf8(offset))
    }
}
