//! Netbyte runner - executes and inspects binary instruction files.
//!
//! `netbyte run FILE` decodes and executes a bytecode file, printing the
//! program's output and its final value. `netbyte dump FILE` decodes
//! without executing and prints a readable listing (or JSON with
//! `--json`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netbyte_bytecode::{Expr, Op, Operand, Program, Value};
use netbyte_runtime::Engine;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "netbyte", version)]
#[command(about = "Execute and inspect Netbyte bytecode files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a bytecode file
    Run {
        /// Path to a .nbe bytecode file
        file: PathBuf,
    },
    /// Decode a bytecode file and print its instructions without executing
    Dump {
        /// Path to a .nbe bytecode file
        file: PathBuf,

        /// Emit the instruction tree as JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netbyte_run=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { file } => run(&file),
        Command::Dump { file, json } => dump(&file, json),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load(path: &Path) -> Result<Program> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let program = Program::from_bytes(&bytes)
        .with_context(|| format!("decoding {}", path.display()))?;
    info!(ops = program.len(), "program decoded");
    Ok(program)
}

fn run(path: &Path) -> Result<()> {
    let program = load(path)?;
    let mut engine = Engine::new();
    let value = engine
        .run(&program)
        .with_context(|| format!("executing {}", path.display()))?;
    if value != Value::Null {
        println!("{value}");
    }
    Ok(())
}

fn dump(path: &Path, json: bool) -> Result<()> {
    let program = load(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&program)?);
    } else {
        print!("{}", render_listing(&program));
    }
    Ok(())
}

/// Render a whole program as an indexed listing, one operation per line,
/// with block operands expanded on indented lines below their owner.
fn render_listing(program: &Program) -> String {
    let mut out = String::new();
    render_ops(&mut out, &program.ops, 0);
    out
}

fn render_ops(out: &mut String, ops: &[Op], depth: usize) {
    let pad = "  ".repeat(depth);
    for (index, op) in ops.iter().enumerate() {
        out.push_str(&format!("{pad}{index:04}  {}", op.code));
        for arg in &op.args {
            out.push(' ');
            out.push_str(&render_operand(arg));
        }
        out.push('\n');
        for arg in &op.args {
            if let Operand::Block(block) = arg {
                render_ops(out, block, depth + 1);
            }
        }
    }
}

fn render_operand(operand: &Operand) -> String {
    match operand {
        Operand::Value(value) => render_value(value),
        Operand::Var(name) => format!("${name}"),
        Operand::Label(name) => format!("@{name}"),
        Operand::Expr(expr) => render_expr(expr),
        Operand::Block(ops) => format!("{{{} ops}}", ops.len()),
    }
}

fn render_expr(expr: &Expr) -> String {
    let mut out = format!("({}", expr.code);
    for arg in &expr.args {
        out.push(' ');
        out.push_str(&render_operand(arg));
    }
    out.push(')');
    out
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}
