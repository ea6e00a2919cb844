use crate::command::{ExitCode, FAILURE, SUCCESS};
use crate::env::Environment;
use crate::error::ShellError;
use crate::lexer;
use crate::parser;
use crate::reader::{LineReader, ReadOutcome};
use crate::runner::Runner;
use crate::substitute::substitute;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub const DEFAULT_PROMPT: &str = "maxishell> ";

/// What happened to one input line.
#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// The line ran; the status of the last executed pipeline.
    Ran(ExitCode),
    /// The line was blank.
    Skipped,
    /// An interrupt arrived before the line could run; nothing was executed.
    Interrupted,
    /// The line could not be run; the diagnostic was already printed.
    Failed,
}

/// A line-oriented shell: substitutes `$NAME`, tokenizes, parses and runs each line.
///
/// Example
/// ```
/// use maxishell::{Interpreter, LineOutcome};
/// let mut sh = Interpreter::default();
/// assert_eq!(sh.process_line("true && echo hello"), LineOutcome::Ran(0));
/// ```
pub struct Interpreter {
    env: Environment,
    prompt: String,
    interrupted: Arc<AtomicBool>,
}

impl Interpreter {
    pub fn new(env: Environment, prompt: impl Into<String>) -> Self {
        Self {
            env,
            prompt: prompt.into(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag raised by the interrupt handler; checked between lines.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Run one raw input line, reporting errors on the process stderr.
    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        self.process_line_with(line, &mut std::io::stderr())
    }

    /// Run one raw input line, reporting errors on `stderr`.
    pub fn process_line_with(&mut self, line: &str, stderr: &mut dyn Write) -> LineOutcome {
        if line.trim().is_empty() {
            return LineOutcome::Skipped;
        }
        if self.interrupted.swap(false, Ordering::SeqCst) {
            debug!(line, "line dropped after interrupt");
            return LineOutcome::Interrupted;
        }

        match self.execute(line, stderr) {
            Ok(code) => LineOutcome::Ran(code),
            Err(e) => {
                let _ = writeln!(stderr, "{}", e);
                LineOutcome::Failed
            }
        }
    }

    fn execute(&mut self, line: &str, stderr: &mut dyn Write) -> Result<ExitCode, ShellError> {
        let line = substitute(line, &self.env);
        let tokens = lexer::tokenize(&line);
        debug!(?tokens, "tokenized");
        let commands = parser::parse(tokens)?;
        debug!(?commands, "parsed");
        let status = Runner::new(&mut self.env, stderr).run(&commands)?;
        debug!(status, "line finished");
        Ok(status)
    }

    /// Read-eval loop. Returns the shell's exit status once input ends or `exit` runs.
    pub fn repl(&mut self, reader: &mut dyn LineReader) -> anyhow::Result<ExitCode> {
        while !self.env.should_exit {
            let line = match reader.read_line(&self.prompt)? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted => continue,
                ReadOutcome::Eof => {
                    println!();
                    break;
                }
            };

            match self.process_line(&line) {
                LineOutcome::Skipped => continue,
                LineOutcome::Interrupted => println!("Interrupted"),
                LineOutcome::Ran(_) | LineOutcome::Failed => {}
            }
            reader.add_history(&line);
        }
        Ok(SUCCESS)
    }

    /// Run a single line non-interactively; the result is the process exit status.
    pub fn run_once(&mut self, line: &str) -> ExitCode {
        match self.process_line(line) {
            LineOutcome::Ran(code) => code,
            LineOutcome::Skipped => SUCCESS,
            LineOutcome::Interrupted | LineOutcome::Failed => FAILURE,
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Environment::new(), DEFAULT_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::lock_current_dir;
    use crate::reader::StreamReader;
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;

    fn interpreter_in(dir: &Path) -> Interpreter {
        let mut env = Environment::new();
        env.current_dir = dir.to_path_buf();
        Interpreter::new(env, "test> ")
    }

    #[test]
    fn test_blank_line_is_skipped() {
        let mut sh = interpreter_in(Path::new("/"));
        assert_eq!(sh.process_line("   \t "), LineOutcome::Skipped);
    }

    #[test]
    fn test_parse_error_reported() {
        let mut sh = interpreter_in(Path::new("/"));
        let mut err = Vec::new();
        assert_eq!(sh.process_line_with("| wc", &mut err), LineOutcome::Failed);
        assert_eq!(String::from_utf8(err).unwrap(), "parse error: '|' unexpected\n");
    }

    #[test]
    fn test_unknown_command_reported() {
        let mut sh = interpreter_in(Path::new("/"));
        let mut err = Vec::new();
        assert_eq!(sh.process_line_with("no-such-cmd-42", &mut err), LineOutcome::Failed);
        assert_eq!(String::from_utf8(err).unwrap(), "command not found: no-such-cmd-42\n");
    }

    #[test]
    fn test_substitution_before_tokenizing() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        sh.env.set_var("TARGET", "subst.txt");
        sh.env.set_var("WORDS", "two words");
        assert_eq!(sh.process_line("echo $WORDS > $TARGET"), LineOutcome::Ran(0));
        assert_eq!(fs::read_to_string(dir.path().join("subst.txt")).unwrap(), "two words\n");
    }

    #[test]
    fn test_interrupt_drops_next_line_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        sh.interrupt_flag().store(true, Ordering::SeqCst);

        assert_eq!(sh.process_line("touch first.txt"), LineOutcome::Interrupted);
        assert!(!dir.path().join("first.txt").exists());

        assert_eq!(sh.process_line("touch second.txt"), LineOutcome::Ran(0));
        assert!(dir.path().join("second.txt").exists());
    }

    #[test]
    fn test_interrupt_does_not_cancel_running_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        let flag = sh.interrupt_flag();
        let raiser = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(100));
            flag.store(true, Ordering::SeqCst);
        });

        assert_eq!(sh.process_line("sleep 0.5 && touch done.txt"), LineOutcome::Ran(0));
        raiser.join().unwrap();
        assert!(dir.path().join("done.txt").exists());
        assert_eq!(sh.process_line("touch dropped.txt"), LineOutcome::Interrupted);
    }

    #[test]
    fn test_repl_runs_until_exit() {
        let _lock = lock_current_dir();
        let orig = std::env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let mut sh = interpreter_in(dir.path());

        let script = "\n| bad\ncd sub\ntouch in-sub.txt\nexit\ntouch after-exit.txt\n";
        let mut reader = StreamReader::new(Cursor::new(script));
        let code = sh.repl(&mut reader).unwrap();
        std::env::set_current_dir(&orig).unwrap();

        assert_eq!(code, 0);
        assert!(sh.should_exit());
        assert!(dir.path().join("sub/in-sub.txt").exists());
        assert!(!dir.path().join("sub/after-exit.txt").exists());
    }

    #[test]
    fn test_repl_ends_on_eof() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        let mut reader = StreamReader::new(Cursor::new("false\ntouch x.txt"));
        assert_eq!(sh.repl(&mut reader).unwrap(), 0);
        assert!(!sh.should_exit());
        assert!(dir.path().join("x.txt").exists());
    }

    #[test]
    fn test_echo_dashed_argument_does_not_short_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = interpreter_in(dir.path());
        assert_eq!(sh.process_line("echo -e x > e.txt && touch f"), LineOutcome::Ran(0));
        assert_eq!(fs::read_to_string(dir.path().join("e.txt")).unwrap(), "-e x\n");
        assert!(dir.path().join("f").exists());
    }

    #[test]
    fn test_run_once_status() {
        let mut sh = interpreter_in(Path::new("/"));
        assert_eq!(sh.run_once("sh -c 'exit 4'"), 4);
        assert_eq!(sh.run_once("&&"), FAILURE);
        assert_eq!(sh.run_once(""), SUCCESS);
    }
}
