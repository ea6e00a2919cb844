//! A module implementing lexical analysis (tokenization) of a substituted command line.

use std::fmt;

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word: program name, argument or redirection target. Quotes are already removed.
    Word(String),
    /// The pipe operator, `|`.
    Pipe,
    /// The logical AND operator, `&&`.
    And,
    /// The logical OR operator, `||`.
    Or,
    /// Input redirection symbol, `<`.
    RedirectIn,
    /// Output redirection symbol, `>`.
    RedirectOut,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => f.write_str(w),
            Token::Pipe => f.write_str("|"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::RedirectIn => f.write_str("<"),
            Token::RedirectOut => f.write_str(">"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    /// Inside a quoted section closed by the carried character.
    ReadingQuote(char),
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    /// The current word contained a quoted section, so it is emitted even when empty.
    quoted: bool,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            quoted: false,
        }
    }

    /// Runs the machine to the end of input.
    ///
    /// Tokenization never fails: an unterminated quote swallows the rest of the
    /// line and the word is closed as if the quote had been.
    fn make_tokens(mut self) -> Vec<Token> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start | LexingState::ReadingWord => self.handle_unquoted(ch, &mut out),
                LexingState::ReadingQuote(close) => self.handle_quote(ch, close),
            }
        }

        self.finish_word(&mut out);
        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_unquoted(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            ' ' | '\t' => self.finish_word(out),
            '\'' | '"' => {
                self.quoted = true;
                self.state = LexingState::ReadingQuote(ch);
            }
            '&' if self.peek_char() == Some('&') => {
                self.read_char();
                self.push_operator(Token::And, out);
            }
            '|' if self.peek_char() == Some('|') => {
                self.read_char();
                self.push_operator(Token::Or, out);
            }
            '|' => self.push_operator(Token::Pipe, out),
            '<' => self.push_operator(Token::RedirectIn, out),
            '>' => self.push_operator(Token::RedirectOut, out),
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_quote(&mut self, ch: char, close: char) {
        if ch == close {
            self.state = LexingState::ReadingWord;
        } else {
            self.buffer.push(ch);
        }
    }

    fn push_operator(&mut self, token: Token, out: &mut Vec<Token>) {
        self.finish_word(out);
        out.push(token);
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        if !self.buffer.is_empty() || self.quoted {
            out.push(Token::Word(std::mem::take(&mut self.buffer)));
        }
        self.quoted = false;
        self.state = LexingState::Start;
    }
}

/// Split a substituted line into tokens.
///
/// Whitespace outside quotes separates words, `'...'` and `"..."` keep their
/// content verbatim (operators and spaces included), and `&&`, `||`, `|`, `<`,
/// `>` become operator tokens. A lone `&` is an ordinary character.
pub fn tokenize(line: &str) -> Vec<Token> {
    LexingFSM::new(line).make_tokens()
}
