use anyhow::{Context, Result};
use argh::FromArgs;
use maxishell::reader::{EditorReader, LineReader, StreamReader};
use maxishell::{DEFAULT_PROMPT, Interpreter};
use maxishell::env::Environment;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const PROMPT_VAR: &str = "MAXISHELL_PROMPT";

#[derive(FromArgs)]
/// A line-oriented command shell with pipelines, redirection and && / ||.
struct Args {
    #[argh(option, short = 'p')]
    /// prompt to print before each line (default: $MAXISHELL_PROMPT or "maxishell> ").
    prompt: Option<String>,

    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status.
    command: Option<String>,

    #[argh(option)]
    /// file to load and save interactive history.
    history: Option<PathBuf>,

    #[argh(switch, short = 'v')]
    /// log debug information to stderr.
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<i32> {
    let prompt = args
        .prompt
        .or_else(|| std::env::var(PROMPT_VAR).ok())
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let mut shell = Interpreter::new(Environment::new(), prompt);

    if let Some(line) = args.command {
        return Ok(shell.run_once(&line));
    }

    signal_hook::flag::register(signal_hook::consts::SIGINT, shell.interrupt_flag())
        .context("failed to install SIGINT handler")?;

    let mut reader: Box<dyn LineReader> = if std::io::stdin().is_terminal() {
        Box::new(EditorReader::new(args.history)?)
    } else {
        Box::new(StreamReader::new(std::io::stdin().lock()))
    };
    shell.repl(reader.as_mut())
}

fn main() -> std::process::ExitCode {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    match run(args) {
        Ok(code) => std::process::ExitCode::from(code.clamp(0, 255) as u8),
        Err(e) => {
            eprintln!("maxishell: {:#}", e);
            std::process::ExitCode::FAILURE
        }
    }
}
