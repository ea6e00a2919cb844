use assert_cmd::cargo::cargo_bin_cmd;
use maxishell::env::Environment;
use maxishell::lexer::{Token, tokenize};
use maxishell::parser::{Relation, parse};
use maxishell::{Interpreter, LineOutcome};
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn interpreter_in(dir: &Path) -> Interpreter {
    let mut env = Environment::new();
    env.current_dir = dir.to_path_buf();
    Interpreter::new(env, "")
}

#[test]
fn quoted_echo_then_filtered_listing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();
    fs::write(dir.path().join("domain.txt"), "x\n").unwrap();
    fs::write(dir.path().join("other.txt"), "y\n").unwrap();

    let line = r#"echo "hello world" && ls -l | grep main > out.txt"#;
    let commands = parse(tokenize(line)).expect("line parses");
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0].arguments, ["echo", "hello world"]);
    assert_eq!(commands[0].next, Relation::And);
    assert_eq!(commands[1].next, Relation::Pipe);

    let mut sh = interpreter_in(dir.path());
    assert_eq!(sh.process_line(line), LineOutcome::Ran(0));

    let out = fs::read_to_string(dir.path().join("out.txt")).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2, "{out}");
    assert!(lines.iter().all(|l| l.contains("main")));
    assert!(lines.iter().any(|l| l.ends_with("main.rs")));
    assert!(lines.iter().any(|l| l.ends_with("domain.txt")));
}

#[test]
fn whitespace_only_lines_split_into_words() {
    for (a, b) in [("x", "y"), ("--flag", "value"), ("a.b", "c/d")] {
        let tokens = tokenize(&format!("{} {}", a, b));
        assert_eq!(tokens, [Token::Word(a.into()), Token::Word(b.into())]);
    }
}

#[test]
fn and_or_never_start_skipped_command() {
    let dir = tempfile::tempdir().unwrap();
    let mut sh = interpreter_in(dir.path());

    assert_eq!(sh.process_line("false && touch and.txt"), LineOutcome::Ran(1));
    assert_eq!(sh.process_line("true || touch or.txt"), LineOutcome::Ran(0));
    assert!(!dir.path().join("and.txt").exists());
    assert!(!dir.path().join("or.txt").exists());
}

#[test]
fn pipeline_status_comes_from_last_stage() {
    let mut sh = Interpreter::default();
    assert_eq!(sh.process_line("false | true"), LineOutcome::Ran(0));
    assert_eq!(sh.process_line("true | false"), LineOutcome::Ran(1));
}

#[test]
fn variables_expand_from_the_shell_environment() {
    let dir = tempfile::tempdir().unwrap();
    let mut env = Environment::new();
    env.current_dir = dir.path().to_path_buf();
    env.set_var("TESTVAR", "value123");
    env.vars.remove("UNSETVAR");
    let mut sh = Interpreter::new(env, "");

    assert_eq!(sh.process_line("echo $TESTVAR and $UNSETVAR > v.txt"), LineOutcome::Ran(0));
    assert_eq!(fs::read_to_string(dir.path().join("v.txt")).unwrap(), "value123 and\n");
}

#[test]
fn binary_runs_single_command() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("maxishell")
        .args(["-c", "echo from-binary > b.txt && sh -c 'exit 3'"])
        .current_dir(dir.path())
        .assert()
        .code(3);
    assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "from-binary\n");
}

#[test]
fn binary_reads_piped_script() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("maxishell")
        .current_dir(dir.path())
        .write_stdin("echo one\n&& broken\nmissing-program-9\necho two | tr a-z A-Z\nexit\necho never\n")
        .assert()
        .success()
        .stdout("one\nTWO\n")
        .stderr(predicate::str::contains("parse error: '&&' unexpected"))
        .stderr(predicate::str::contains("command not found: missing-program-9"));
}

#[test]
fn binary_prompt_is_not_printed_for_piped_input() {
    cargo_bin_cmd!("maxishell")
        .args(["--prompt", "PROMPT> "])
        .write_stdin("pwd > /dev/null\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("PROMPT>").not());
}
