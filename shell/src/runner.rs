//! Execution of a parsed command sequence.
//!
//! The sequence is walked left to right. Each step takes the longest run of
//! `|`-connected commands, runs it either as an in-process built-in (a lone
//! built-in name) or as a set of child processes, and then decides from the
//! status and the `&&`/`||` relation whether the line goes on.

use crate::builtin::Builtin;
use crate::command::{ExitCode, FAILURE, Stdout};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::{exit_code, resolve_program};
use crate::parser::{Command, Relation};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Stdio};
use tracing::{debug, warn};

/// Split off the maximal pipe-connected run at the start of `commands`.
fn next_pipeline(commands: &[Command]) -> (&[Command], &[Command]) {
    let len = commands
        .iter()
        .position(|c| c.next != Relation::Pipe)
        .map_or(commands.len(), |i| i + 1);
    commands.split_at(len)
}

/// Whether the line continues after a pipeline ending in `relation` finished with `status`.
fn should_continue(relation: Relation, status: ExitCode) -> bool {
    match relation {
        Relation::And => status == 0,
        Relation::Or => status != 0,
        Relation::None | Relation::Pipe => true,
    }
}

/// Children of one pipeline.
///
/// Dropping the guard without [`Children::wait_all`] kills and reaps whatever
/// is still owned, so a failure halfway through spawning leaves no strays.
#[derive(Default)]
struct Children(Vec<Child>);

impl Children {
    fn push(&mut self, child: Child) {
        self.0.push(child);
    }

    /// Wait for every child in start order; the status of the last one is returned.
    fn wait_all(mut self) -> io::Result<ExitCode> {
        let mut status = 0;
        while !self.0.is_empty() {
            let mut child = self.0.remove(0);
            status = exit_code(child.wait()?);
            debug!(pid = child.id(), status, "stage finished");
        }
        Ok(status)
    }
}

impl Drop for Children {
    fn drop(&mut self) {
        for child in &mut self.0 {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Files named by the redirections of a pipeline, opened before anything runs.
struct Redirects {
    input: Option<File>,
    output: Option<File>,
}

impl Redirects {
    fn open(env: &Environment, first: &Command, last: &Command) -> Result<Self, (String, io::Error)> {
        let input = first
            .input_redirect
            .as_deref()
            .map(|p| open_with(p, env, |path| File::open(path)))
            .transpose()?;
        let output = last
            .output_redirect
            .as_deref()
            .map(|p| open_with(p, env, |path| File::create(path)))
            .transpose()?;
        Ok(Self { input, output })
    }

    /// Stdout and stderr for the last stage; both share the output file when there is one.
    fn output_pair(&self) -> io::Result<Option<(File, File)>> {
        match &self.output {
            Some(file) => Ok(Some((file.try_clone()?, file.try_clone()?))),
            None => Ok(None),
        }
    }
}

fn open_with(
    path: &Path,
    env: &Environment,
    open: impl FnOnce(&Path) -> io::Result<File>,
) -> Result<File, (String, io::Error)> {
    open(&env.resolve_path(path)).map_err(|e| (path.display().to_string(), e))
}

/// Runs command sequences against one [`Environment`].
///
/// Redirection failures are reported on `stderr`. Built-ins write to the
/// process streams unless their output is redirected.
pub struct Runner<'a> {
    env: &'a mut Environment,
    stderr: &'a mut dyn Write,
}

impl<'a> Runner<'a> {
    pub fn new(env: &'a mut Environment, stderr: &'a mut dyn Write) -> Self {
        Self { env, stderr }
    }

    /// Execute a whole line and return the status of the last pipeline that ran.
    ///
    /// Spawn failures abandon the rest of the line and are returned as errors.
    pub fn run(&mut self, commands: &[Command]) -> Result<ExitCode, ShellError> {
        let mut rest = commands;
        let mut status = 0;

        while !rest.is_empty() {
            let (pipeline, tail) = next_pipeline(rest);
            rest = tail;

            status = self.run_pipeline(pipeline)?;

            if self.env.should_exit {
                debug!("exit requested, dropping rest of line");
                break;
            }
            let relation = pipeline[pipeline.len() - 1].next;
            if !should_continue(relation, status) {
                debug!(?relation, status, skipped = rest.len(), "short-circuit");
                break;
            }
        }
        Ok(status)
    }

    fn run_pipeline(&mut self, pipeline: &[Command]) -> Result<ExitCode, ShellError> {
        let first = &pipeline[0];
        let last = &pipeline[pipeline.len() - 1];

        let redirects = match Redirects::open(self.env, first, last) {
            Ok(redirects) => redirects,
            Err((path, e)) => {
                warn!(%path, error = %e, "redirection failed");
                writeln!(self.stderr, "maxishell: {}: {}", path, e)?;
                return Ok(FAILURE);
            }
        };

        if let [command] = pipeline {
            if Builtin::is_builtin(command.name()) {
                return self.run_builtin(command, redirects);
            }
        }
        self.spawn_pipeline(pipeline, redirects)
    }

    fn run_builtin(&mut self, command: &Command, redirects: Redirects) -> Result<ExitCode, ShellError> {
        let args: Vec<&str> = command.args().iter().map(String::as_str).collect();
        let Some(invocation) = Builtin::parse(command.name(), &args) else {
            return Err(ShellError::CommandNotFound(command.name().to_string()));
        };

        let (stdout, stderr): (Box<dyn Stdout>, Box<dyn Stdout>) = match redirects.output_pair()? {
            Some((out, err)) => (Box::new(out), Box::new(err)),
            None => (Box::new(io::stdout()), Box::new(io::stderr())),
        };
        Ok(invocation.run(stdout, stderr, self.env)?)
    }

    /// Start every stage, wiring stdout of each to stdin of the next, then wait for all.
    fn spawn_pipeline(&mut self, pipeline: &[Command], mut redirects: Redirects) -> Result<ExitCode, ShellError> {
        let last_index = pipeline.len() - 1;
        let mut children = Children::default();
        let mut upstream: Option<Stdio> = redirects.input.take().map(Stdio::from);

        for (i, stage) in pipeline.iter().enumerate() {
            let program = resolve_program(self.env, stage.name())?;

            let mut cmd = std::process::Command::new(&program);
            cmd.args(stage.args())
                .env_clear()
                .envs(&self.env.vars)
                .current_dir(&self.env.current_dir)
                .stdin(upstream.take().unwrap_or_else(Stdio::inherit));

            if i == last_index {
                match redirects.output_pair()? {
                    Some((out, err)) => cmd.stdout(out).stderr(err),
                    None => cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit()),
                };
            } else {
                cmd.stdout(Stdio::piped()).stderr(Stdio::inherit());
            }

            let mut child = cmd.spawn().map_err(|source| ShellError::Spawn {
                program: stage.name().to_string(),
                source,
            })?;
            debug!(pid = child.id(), program = %program.display(), stage = i, "spawned");

            upstream = child.stdout.take().map(Stdio::from);
            children.push(child);
        }

        // Closes the output file handle held here; the children keep their own copies.
        drop(redirects);
        Ok(children.wait_all()?)
    }
}
