use crate::command::{ExitCode, FAILURE, SUCCESS, Stdout};
use crate::env::Environment;
use crate::external::{exit_code, resolve_program};
use anyhow::{Context, Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::process::Stdio;
use tracing::debug;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are executed directly in-process without spawning a child process.
/// Most of them parse their arguments with the [`argh`] crate (`FromArgs`).
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command writing to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    /// Errors are reported by the caller with the command name as prefix; `stderr`
    /// is only for diagnostics the command passes through itself.
    fn execute(
        self,
        stdout: Box<dyn Stdout>,
        stderr: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// The closed set of built-ins, each variant carrying its parsed arguments.
pub enum Builtin {
    Cd(Cd),
    Pwd(Pwd),
    Echo(Echo),
    Kill(Kill),
    Ps(Ps),
    Exit(Exit),
}

/// What `argh` produced for a built-in invocation.
pub enum Invocation {
    Run(Builtin),
    /// `--help` output (status 0) or a usage error (status 1).
    Usage { output: String, is_error: bool },
}

const NAMES: [&str; 6] = ["cd", "pwd", "echo", "kill", "ps", "exit"];

fn parse_as<T: BuiltinCommand + FromArgs>(args: &[&str], wrap: fn(T) -> Builtin) -> Invocation {
    match T::from_args(&[T::name()], args) {
        Ok(cmd) => Invocation::Run(wrap(cmd)),
        Err(EarlyExit { output, status }) => Invocation::Usage {
            output,
            is_error: status.is_err(),
        },
    }
}

impl Builtin {
    pub fn is_builtin(name: &str) -> bool {
        NAMES.contains(&name)
    }

    /// Parse the arguments of the built-in called `name`.
    ///
    /// Returns `None` when `name` is not a built-in.
    pub fn parse(name: &str, args: &[&str]) -> Option<Invocation> {
        let invocation = match name {
            "cd" => parse_as(args, Builtin::Cd),
            "pwd" => parse_as(args, Builtin::Pwd),
            "echo" => Invocation::Run(Builtin::Echo(Echo::from_words(args))),
            "kill" => parse_as(args, Builtin::Kill),
            "ps" => parse_as(args, Builtin::Ps),
            "exit" => parse_as(args, Builtin::Exit),
            _ => return None,
        };
        Some(invocation)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Cd(_) => Cd::name(),
            Builtin::Pwd(_) => Pwd::name(),
            Builtin::Echo(_) => Echo::name(),
            Builtin::Kill(_) => Kill::name(),
            Builtin::Ps(_) => Ps::name(),
            Builtin::Exit(_) => Exit::name(),
        }
    }

    pub fn execute(
        self,
        stdout: Box<dyn Stdout>,
        stderr: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match self {
            Builtin::Cd(cmd) => cmd.execute(stdout, stderr, env),
            Builtin::Pwd(cmd) => cmd.execute(stdout, stderr, env),
            Builtin::Echo(cmd) => cmd.execute(stdout, stderr, env),
            Builtin::Kill(cmd) => cmd.execute(stdout, stderr, env),
            Builtin::Ps(cmd) => cmd.execute(stdout, stderr, env),
            Builtin::Exit(cmd) => cmd.execute(stdout, stderr, env),
        }
    }
}

impl Invocation {
    /// Run the invocation, reporting failures on `stderr` as `<name>: <reason>`.
    pub fn run(
        self,
        stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> std::io::Result<ExitCode> {
        match self {
            Invocation::Run(builtin) => {
                let name = builtin.name();
                debug!(builtin = name, "running builtin");
                match builtin.execute(stdout, &mut *stderr, env) {
                    Ok(code) => Ok(code),
                    Err(e) => {
                        writeln!(stderr, "{}: {:#}", name, e)?;
                        Ok(FAILURE)
                    }
                }
            }
            Invocation::Usage { output, is_error } => {
                if is_error {
                    writeln!(stderr, "{}", output)?;
                    Ok(FAILURE)
                } else {
                    let mut stdout = stdout;
                    writeln!(stdout, "{}", output)?;
                    Ok(SUCCESS)
                }
            }
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        mut stdout: Box<dyn Stdout>,
        _stderr: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(SUCCESS)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdout: Box<dyn Stdout>,
        _stderr: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let target = match self.target {
            Some(t) if !t.is_empty() => t,
            _ => bail!("missing argument"),
        };
        let new_dir = env.change_dir(&target)?;
        debug!(dir = %new_dir.display(), "changed directory");
        Ok(SUCCESS)
    }
}

#[derive(FromArgs)]
/// Exit the shell with status 0.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdout: Box<dyn Stdout>,
        _stderr: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(SUCCESS)
    }
}

/// Write the arguments to standard output, separated by spaces.
///
/// Arguments are printed as given, dashes included. Only a leading `-n` is
/// taken as an option and drops the trailing newline.
pub struct Echo {
    pub no_newline: bool,
    pub args: Vec<String>,
}

impl Echo {
    fn from_words(words: &[&str]) -> Self {
        let (no_newline, rest) = match words {
            ["-n", rest @ ..] => (true, rest),
            rest => (false, rest),
        };
        Self {
            no_newline,
            args: rest.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        mut stdout: Box<dyn Stdout>,
        _stderr: &mut dyn Stdout,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        stdout.flush()?;
        Ok(SUCCESS)
    }
}

#[derive(FromArgs)]
/// send a signal (SIGTERM by default) to a process.
pub struct Kill {
    #[argh(option, short = 's', default = "String::from(\"TERM\")")]
    /// signal to send, by name (TERM, SIGKILL, ...) or number.
    pub signal: String,

    #[argh(positional)]
    /// id of the target process.
    pub pid: Option<String>,
}

impl Kill {
    fn parse_signal(&self) -> Result<Signal> {
        let spec = self.signal.trim();
        if let Ok(number) = spec.parse::<i32>() {
            return Signal::try_from(number).map_err(|_| anyhow!("invalid signal: {}", spec));
        }
        let upper = spec.to_ascii_uppercase();
        let full = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{}", upper)
        };
        full.parse::<Signal>()
            .map_err(|_| anyhow!("invalid signal: {}", spec))
    }

    fn parse_pid(&self) -> Result<Pid> {
        let raw = self.pid.as_deref().ok_or_else(|| anyhow!("missing pid"))?;
        match raw.parse::<i32>() {
            Ok(pid) if pid > 0 => Ok(Pid::from_raw(pid)),
            _ => bail!("invalid pid: {}", raw),
        }
    }
}

impl BuiltinCommand for Kill {
    fn name() -> &'static str {
        "kill"
    }

    fn execute(
        self,
        _stdout: Box<dyn Stdout>,
        _stderr: &mut dyn Stdout,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let pid = self.parse_pid()?;
        let sig = self.parse_signal()?;
        signal::kill(pid, sig).with_context(|| format!("{}", pid))?;
        debug!(%pid, signal = ?sig, "signal sent");
        Ok(SUCCESS)
    }
}

#[derive(FromArgs)]
/// list running processes using the system `ps aux`.
pub struct Ps {}

impl BuiltinCommand for Ps {
    fn name() -> &'static str {
        "ps"
    }

    fn execute(
        self,
        stdout: Box<dyn Stdout>,
        stderr: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let program = resolve_program(env, "ps")?;
        // stderr is collected and forwarded so it follows the built-in's redirection
        let output = std::process::Command::new(&program)
            .arg("aux")
            .env_clear()
            .envs(&env.vars)
            .current_dir(&env.current_dir)
            .stdin(Stdio::null())
            .stdout(stdout.stdio())
            .stderr(Stdio::piped())
            .output()
            .context("failed to run ps")?;
        stderr.write_all(&output.stderr)?;
        stderr.flush()?;
        Ok(exit_code(output.status))
    }
}
