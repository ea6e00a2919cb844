use crate::error::ParseError;
use crate::lexer::Token;
use std::path::PathBuf;

/// How a command is connected to the one after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relation {
    /// Last command of the line.
    #[default]
    None,
    /// Stdout feeds the next command's stdin.
    Pipe,
    /// Run the next command only if this one succeeded.
    And,
    /// Run the next command only if this one failed.
    Or,
}

/// One stage of a command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    /// `arguments[0]` is the program or built-in name.
    pub arguments: Vec<String>,
    pub input_redirect: Option<PathBuf>,
    /// Receives both stdout and stderr.
    pub output_redirect: Option<PathBuf>,
    pub next: Relation,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.arguments[0]
    }

    pub fn args(&self) -> &[String] {
        &self.arguments[1..]
    }
}

struct CommandListBuilder {
    tokens: std::vec::IntoIter<Token>,
    commands: Vec<Command>,
    current: Command,
}

impl CommandListBuilder {
    fn new(tokens: Vec<Token>) -> Self {
        CommandListBuilder {
            tokens: tokens.into_iter(),
            commands: Vec::new(),
            current: Command::default(),
        }
    }

    fn build(mut self) -> Result<Vec<Command>, ParseError> {
        let mut last_operator = None;

        while let Some(token) = self.tokens.next() {
            match token {
                Token::Word(word) => self.current.arguments.push(word),
                Token::RedirectIn => {
                    let target = self.expect_filename(Token::RedirectIn)?;
                    self.current.input_redirect = Some(target);
                }
                Token::RedirectOut => {
                    let target = self.expect_filename(Token::RedirectOut)?;
                    self.current.output_redirect = Some(target);
                }
                op @ (Token::Pipe | Token::And | Token::Or) => {
                    let relation = match op {
                        Token::Pipe => Relation::Pipe,
                        Token::And => Relation::And,
                        _ => Relation::Or,
                    };
                    self.seal(relation, &op)?;
                    last_operator = Some(op);
                    continue;
                }
            }
            last_operator = None;
        }

        if !self.current.arguments.is_empty() {
            self.commands.push(self.current);
        } else if self.current.input_redirect.is_some() || self.current.output_redirect.is_some() {
            return Err(ParseError::MissingCommand);
        } else if let Some(op) = last_operator {
            return Err(ParseError::UnexpectedEnd(op));
        }

        Ok(self.commands)
    }

    fn expect_filename(&mut self, operator: Token) -> Result<PathBuf, ParseError> {
        match self.tokens.next() {
            Some(Token::Word(name)) => Ok(PathBuf::from(name)),
            _ => Err(ParseError::ExpectedFilename(operator)),
        }
    }

    /// Close the current command with the relation introduced by `operator`.
    fn seal(&mut self, relation: Relation, operator: &Token) -> Result<(), ParseError> {
        if self.current.arguments.is_empty() {
            return Err(if self.current.input_redirect.is_some() || self.current.output_redirect.is_some() {
                ParseError::MissingCommand
            } else {
                ParseError::UnexpectedOperator(operator.clone())
            });
        }
        let mut command = std::mem::take(&mut self.current);
        command.next = relation;
        self.commands.push(command);
        Ok(())
    }
}

/// Only the first member of a pipeline may read from a file and only the last may write to one.
fn check_pipeline_redirects(commands: &[Command]) -> Result<(), ParseError> {
    let mut previous = Relation::None;
    for command in commands {
        if command.input_redirect.is_some() && previous == Relation::Pipe {
            return Err(ParseError::MisplacedRedirect(Token::RedirectIn, "first"));
        }
        if command.output_redirect.is_some() && command.next == Relation::Pipe {
            return Err(ParseError::MisplacedRedirect(Token::RedirectOut, "last"));
        }
        previous = command.next;
    }
    Ok(())
}

/// Build the command sequence of one line.
///
/// On success the sequence is non-empty and its last command has
/// [`Relation::None`].
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Command>, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::EmptyCommand);
    }
    let commands = CommandListBuilder::new(tokens).build()?;
    check_pipeline_redirects(&commands)?;
    Ok(commands)
}
