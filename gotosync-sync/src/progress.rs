//! User-facing progress output.
//!
//! The engine reports what it is doing as [`ProgressLine`]s; the CLI decides
//! how to style them. Diagnostics for operators go through the logger
//! instead.

/// One line of run output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressLine {
    /// Start of a category (`Synchronizing registrants for GoToWebinar`).
    Heading(String),
    /// Per-item step.
    Step(String),
    /// A failure the run recovered from, or the reason it aborted.
    Error(String),
    /// Extended diagnostic detail, only emitted in dev mode.
    Detail(String),
    /// End-of-run totals.
    Summary(String),
    Done,
}

pub trait ProgressSink {
    fn emit(&mut self, line: ProgressLine);
}

/// Collects lines in memory.
impl ProgressSink for Vec<ProgressLine> {
    fn emit(&mut self, line: ProgressLine) {
        self.push(line);
    }
}

/// Discards everything.
impl ProgressSink for () {
    fn emit(&mut self, _line: ProgressLine) {}
}
