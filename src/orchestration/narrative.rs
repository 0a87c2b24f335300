//! Append-only text log that one trigger invocation renders back to its caller.
//!
//! Every invocation gets its own narrative. Operations it issues append
//! progress lines from whichever lane they run on, so the order of lines is
//! the order in which things actually happened for that invocation only.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Narrative {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Narrative {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(line = %line, "Narrative");
        self.lines.lock().push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// All lines, newline separated
    pub fn render(&self) -> String {
        self.lines.lock().join("\n")
    }
}
