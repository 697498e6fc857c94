//! Finite-state lexer for AXX.
//!
//! The scanner keeps one `State` describing what it is currently
//! recognizing. Each character is offered to that state; when the state
//! rejects it, the pending text is turned into a token, the machine goes
//! back to `Start`, and the same character is offered again. Lookahead that
//! needs more than one character (`1.5` versus `1..5`) is done by moving into
//! a successor state instead of backtracking.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io::Read;

use log::trace;

use crate::error::CompileError;
use crate::token::{Token, TokenKind, classify_word};

/// Anything the parser can pull tokens from.
pub trait TokenSource {
    /// Return the next token. After the input is exhausted every call
    /// returns an `Eof` token.
    fn next_token(&mut self) -> Result<Token, CompileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Skip,
    Id { underscore: bool },
    FirstNumPart,
    SecondNumPart { digits: bool },
    /// Integer immediately followed by `..`.
    NumberRange,
    Str { closed: bool },
    CharOpen,
    CharBody,
    CharClosed,
    Colon,
    Less,
    Greater,
    Div,
    Minus,
    Dot,
    Comment,
    Done(TokenKind),
}

#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    row: usize,
    column: usize,
    state: State,
    pending: String,
    start_position: usize,
    start_row: usize,
    ready: VecDeque<Token>,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        Lexer {
            chars: Vec::new(),
            index: 0,
            row: 1,
            column: 1,
            state: State::Start,
            pending: String::new(),
            start_position: 1,
            start_row: 1,
            ready: VecDeque::new(),
        }
    }

    pub fn from_source(source: &str) -> Self {
        let mut lexer = Lexer::new();
        lexer.reset(source);
        lexer
    }

    /// Read a whole character stream and restart scanning at its beginning.
    pub fn open(&mut self, mut reader: impl Read) -> Result<(), CompileError> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        self.reset(&source);
        Ok(())
    }

    fn reset(&mut self, source: &str) {
        *self = Lexer {
            chars: source.chars().collect(),
            ..Lexer::new()
        };
    }

    /// Drain the remaining tokens and render one line per token, `Eof`
    /// included.
    pub fn dump_tokens(&mut self) -> Result<String, CompileError> {
        let mut out = String::new();
        loop {
            let token = self.next_token()?;
            let _ = writeln!(out, "{token}");
            if token.is(TokenKind::Eof) {
                return Ok(out);
            }
        }
    }

    fn consume(&mut self, ch: char) {
        self.index += 1;
        if ch == '\n' {
            self.row += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn error_here(&self, message: impl Into<String>) -> CompileError {
        CompileError::Lexical {
            message: message.into(),
            position: self.column,
            row: self.row,
        }
    }

    fn error_at_start(&self, message: impl Into<String>) -> CompileError {
        CompileError::Lexical {
            message: message.into(),
            position: self.start_position,
            row: self.start_row,
        }
    }

    /// Offer `c` to the current state. Returns whether it was consumed.
    fn recognize(&mut self, c: Option<char>) -> Result<bool, CompileError> {
        let Some(ch) = c else {
            return match self.state {
                State::Str { closed: false } => {
                    Err(self.error_at_start("unterminated string literal"))
                }
                State::CharOpen | State::CharBody => {
                    Err(self.error_at_start("unterminated character literal"))
                }
                _ => Ok(false),
            };
        };

        let next = match self.state {
            State::Start => return self.start(ch).map(|()| true),
            State::Skip => is_whitespace(ch).then_some(State::Skip),
            State::Id { underscore } => {
                if ch.is_ascii_alphanumeric() {
                    Some(State::Id { underscore: false })
                } else if ch == '_' {
                    if underscore {
                        return Err(self.error_here("consecutive underscores in identifier"));
                    }
                    Some(State::Id { underscore: true })
                } else {
                    None
                }
            }
            State::FirstNumPart => match ch {
                '0'..='9' => Some(State::FirstNumPart),
                '.' => Some(State::SecondNumPart { digits: false }),
                _ => None,
            },
            State::SecondNumPart { digits } => match ch {
                '0'..='9' => Some(State::SecondNumPart { digits: true }),
                '.' if !digits => Some(State::NumberRange),
                _ => None,
            },
            State::Str { closed: false } => match ch {
                '"' => {
                    self.state = State::Str { closed: true };
                    return Ok(true);
                }
                '\n' => return Err(self.error_at_start("unterminated string literal")),
                _ => Some(State::Str { closed: false }),
            },
            State::CharOpen => match ch {
                '\'' | '\n' => return Err(self.error_here("malformed character literal")),
                _ => Some(State::CharBody),
            },
            State::CharBody => {
                if ch != '\'' {
                    return Err(self.error_at_start("unterminated character literal"));
                }
                self.state = State::CharClosed;
                return Ok(true);
            }
            State::Colon => (ch == '=').then_some(State::Done(TokenKind::Assign)),
            State::Less => (ch == '=').then_some(State::Done(TokenKind::LEqual)),
            State::Greater => (ch == '=').then_some(State::Done(TokenKind::GrEqual)),
            State::Div => (ch == '=').then_some(State::Done(TokenKind::NotEq)),
            State::Dot => (ch == '.').then_some(State::Done(TokenKind::DoubleDot)),
            State::Minus => {
                if ch == '-' {
                    self.state = State::Comment;
                    return Ok(true);
                }
                None
            }
            State::Comment => return Ok(ch != '\n'),
            State::Str { closed: true }
            | State::CharClosed
            | State::NumberRange
            | State::Done(_) => None,
        };

        match next {
            Some(state) => {
                if !matches!(state, State::Skip) {
                    self.pending.push(ch);
                }
                self.state = state;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Pick the state that begins a token with `ch`.
    fn start(&mut self, ch: char) -> Result<(), CompileError> {
        self.pending.clear();
        self.start_position = self.column;
        self.start_row = self.row;

        let state = match ch {
            c if is_whitespace(c) => State::Skip,
            c if c.is_ascii_alphabetic() => State::Id { underscore: false },
            '0'..='9' => State::FirstNumPart,
            '"' => {
                self.state = State::Str { closed: false };
                return Ok(());
            }
            '\'' => {
                self.state = State::CharOpen;
                return Ok(());
            }
            ':' => State::Colon,
            '<' => State::Less,
            '>' => State::Greater,
            '/' => State::Div,
            '-' => State::Minus,
            '.' => State::Dot,
            '+' => State::Done(TokenKind::Plus),
            '*' => State::Done(TokenKind::Star),
            '=' => State::Done(TokenKind::Equal),
            '(' => State::Done(TokenKind::Lpr),
            ')' => State::Done(TokenKind::Rpr),
            ';' => State::Done(TokenKind::Semicolon),
            ',' => State::Done(TokenKind::Comma),
            '&' => State::Done(TokenKind::And),
            '|' => State::Done(TokenKind::Or),
            '!' => State::Done(TokenKind::Not),
            other => return Err(self.error_here(format!("unexpected character '{other}'"))),
        };

        if !matches!(state, State::Skip) {
            self.pending.push(ch);
        }
        self.state = state;
        Ok(())
    }

    /// Turn the pending text of the current state into tokens.
    fn finalize(&mut self) -> Result<(), CompileError> {
        let text = std::mem::take(&mut self.pending);
        let kind = match self.state {
            State::Start | State::Skip | State::Comment => return Ok(()),
            State::Id { underscore: true } => {
                return Err(self.error_at_start("identifier cannot end with an underscore"));
            }
            State::Id { underscore: false } => classify_word(&text),
            State::FirstNumPart | State::SecondNumPart { digits: true } => TokenKind::Number,
            State::SecondNumPart { digits: false } => {
                return Err(self.error_at_start(format!("malformed number literal '{text}'")));
            }
            State::NumberRange => {
                let digits = &text[..text.len() - 2];
                self.emit(TokenKind::Number, digits, self.start_position);
                self.emit(
                    TokenKind::DoubleDot,
                    "..",
                    self.start_position + digits.chars().count(),
                );
                return Ok(());
            }
            State::Str { closed: true } => TokenKind::String,
            State::CharClosed => TokenKind::Character,
            State::Str { closed: false } => {
                return Err(self.error_at_start("unterminated string literal"));
            }
            State::CharOpen | State::CharBody => {
                return Err(self.error_at_start("unterminated character literal"));
            }
            State::Dot => return Err(self.error_at_start("unexpected '.'")),
            State::Colon => TokenKind::Colon,
            State::Less => TokenKind::Less,
            State::Greater => TokenKind::Greater,
            State::Div => TokenKind::Div,
            State::Minus => TokenKind::Minus,
            State::Done(kind) => kind,
        };
        self.emit(kind, &text, self.start_position);
        Ok(())
    }

    fn emit(&mut self, kind: TokenKind, value: &str, position: usize) {
        let token = Token::new(kind, value, position, self.start_row);
        trace!("token {token}");
        self.ready.push_back(token);
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Result<Token, CompileError> {
        loop {
            if let Some(token) = self.ready.pop_front() {
                return Ok(token);
            }

            let c = self.chars.get(self.index).copied();
            if self.recognize(c)? {
                if let Some(ch) = c {
                    self.consume(ch);
                }
                continue;
            }

            if self.state == State::Start {
                // Only the end of input is rejected by `Start`.
                return Ok(Token::new(TokenKind::Eof, "", self.column, self.row));
            }
            self.finalize()?;
            self.state = State::Start;
        }
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}
