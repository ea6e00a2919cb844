//! Sources of input lines for the interpreter loop.

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::BufRead;
use std::path::PathBuf;

/// Result of asking a reader for the next line.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// The user pressed Ctrl-C while typing; the partial line is gone.
    Interrupted,
    Eof,
}

pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Remember a line that was accepted for execution.
    fn add_history(&mut self, _line: &str) {}
}

/// Interactive terminal reader with line editing and history.
pub struct EditorReader {
    editor: DefaultEditor,
    history_file: Option<PathBuf>,
}

impl EditorReader {
    pub fn new(history_file: Option<PathBuf>) -> Result<Self> {
        let mut editor = DefaultEditor::new().context("failed to initialize line editor")?;
        if let Some(path) = &history_file {
            // a missing file just means no history yet
            if let Err(e) = editor.load_history(path) {
                tracing::debug!(path = %path.display(), error = %e, "history not loaded");
            }
        }
        Ok(Self {
            editor,
            history_file,
        })
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err).context("failed to read line"),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            tracing::warn!(error = %e, "failed to add history entry");
        }
    }
}

impl Drop for EditorReader {
    fn drop(&mut self) {
        if let Some(path) = &self.history_file {
            if let Err(e) = self.editor.save_history(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to save history");
            }
        }
    }
}

/// Reader over any buffered stream, for piped input and tests. Prints no prompt.
pub struct StreamReader<R> {
    input: R,
}

impl<R: BufRead> StreamReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> LineReader for StreamReader<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .context("failed to read line")?;
        if n == 0 {
            return Ok(ReadOutcome::Eof);
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        Ok(ReadOutcome::Line(trimmed.to_string()))
    }
}
