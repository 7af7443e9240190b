//! Output sinks.
//!
//! The engine treats program output as an ordered append of UTF-8 text
//! lines into an opaque synchronous sink supplied by the host.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Append-only line sink for `PRINTV` output.
pub trait OutputSink {
    /// Append one line (without trailing newline).
    fn line(&mut self, text: &str);
}

/// Sink writing each line to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn line(&mut self, text: &str) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        // Output failure (e.g. closed pipe) is not a language-level fault.
        let _ = writeln!(lock, "{}", text);
    }
}

/// Sink collecting lines in memory.
///
/// Cloning shares the underlying buffer, so a test can hand one clone to
/// the engine and read the accumulated lines through another.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl OutputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all accumulated lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// Number of accumulated lines.
    pub fn len(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    /// Whether no lines have been emitted.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }

    /// Take all accumulated lines, leaving the buffer empty.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut self.lines.lock().unwrap())
    }
}

impl OutputSink for OutputBuffer {
    fn line(&mut self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}
