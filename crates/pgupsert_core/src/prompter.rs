//! The confirmation prompter capability. The engine depends only on
//! `confirm(...)`. A TTY read, an always-proceed stub, eventually a GUI
//! dialog: each variant owns how a decision is produced, not the QA/upsert
//! code that calls it.

use crate::value::Value;

/// The operator's decision after seeing a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDecision {
    /// Continue with the action just described.
    Proceed,
    /// Skip this action, continue the run.
    Skip,
    /// Abort the run; the orchestrator rolls back.
    Cancel,
}

/// A small preview of rows a prompt is about to act on, capped at roughly
/// a thousand rows for a preview SELECT.
#[derive(Debug, Clone, Default)]
pub struct SampleRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// True if `rows` was truncated relative to the full match set.
    pub truncated: bool,
}

/// Never mutates the database; purely a communication channel between the
/// engine and the operator.
pub trait ConfirmationPrompter {
    fn confirm(&mut self, title: &str, message: &str, sample: Option<&SampleRows>) -> PromptDecision;
}

/// Renders a sample as a `comfy-table`, with a trailing note row when the
/// sample was truncated against the sampling bound.
fn render_sample(sample: &SampleRows) -> String {
    use comfy_table::{presets::UTF8_FULL, Cell, Table};

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(sample.columns.iter().map(Cell::new));

    for row in &sample.rows {
        table.add_row(row.iter().map(|v| v.as_display_string()));
    }

    if sample.truncated {
        let note = format!("... and more ({} shown)", sample.rows.len());
        let mut cells = vec![Cell::new(note)];
        cells.resize_with(sample.columns.len().max(1), || Cell::new(""));
        table.add_row(cells);
    }

    table.to_string()
}

/// Always proceeds without asking anyone. The non-interactive path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPrompter;

impl ConfirmationPrompter for SilentPrompter {
    fn confirm(&mut self, _title: &str, _message: &str, _sample: Option<&SampleRows>) -> PromptDecision {
        PromptDecision::Proceed
    }
}

/// Reads a decision from stdin, printing the prompt and an optional sample
/// to the given writer. Used by the CLI's `--interactive` flag.
pub struct TerminalPrompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: std::io::BufRead, W: std::io::Write> TerminalPrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: std::io::BufRead, W: std::io::Write> ConfirmationPrompter for TerminalPrompter<R, W> {
    fn confirm(&mut self, title: &str, message: &str, sample: Option<&SampleRows>) -> PromptDecision {
        let _ = writeln!(self.writer, "== {title} ==");
        let _ = writeln!(self.writer, "{message}");

        if let Some(sample) = sample {
            let _ = writeln!(self.writer, "{}", render_sample(sample));
        }

        loop {
            let _ = write!(self.writer, "[p]roceed / [s]kip / [c]ancel? ");
            let _ = self.writer.flush();

            let mut line = String::new();
            if self.reader.read_line(&mut line).unwrap_or(0) == 0 {
                return PromptDecision::Cancel;
            }

            match line.trim().to_ascii_lowercase().as_str() {
                "p" | "proceed" | "y" | "yes" => return PromptDecision::Proceed,
                "s" | "skip" => return PromptDecision::Skip,
                "c" | "cancel" | "n" | "no" => return PromptDecision::Cancel,
                _ => {
                    let _ = writeln!(self.writer, "please answer p, s, or c");
                }
            }
        }
    }
}

/// A GUI front-end is out of scope for this workspace; this
/// variant exists only so the prompter capability is truly polymorphic at
/// the type level. Any call is logged and treated as a cancellation, since
/// `ConfirmationPrompter` has no "not supported" outcome of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuiPrompter;

impl ConfirmationPrompter for GuiPrompter {
    fn confirm(&mut self, title: &str, _message: &str, _sample: Option<&SampleRows>) -> PromptDecision {
        log::error!("GUI confirmation prompter is not supported in this build (title: {title})");
        PromptDecision::Cancel
    }
}
