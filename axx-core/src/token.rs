//! Tokens produced by the lexer.

use std::fmt;

use phf::phf_map;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Id,
    Number,
    String,
    Character,

    // Punctuation
    Assign,    // :=
    Colon,     // :
    Semicolon, // ;
    Comma,     // ,
    Lpr,       // (
    Rpr,       // )
    DoubleDot, // ..

    // Operators
    Plus,    // +
    Minus,   // -
    Star,    // *
    Div,     // /
    Mod,     // mod
    Equal,   // =
    NotEq,   // /=
    Less,    // <
    LEqual,  // <=
    Greater, // >
    GrEqual, // >=
    And,     // and, &
    Or,      // or, |
    Not,     // not, !

    // Keywords
    Function,
    Procedure,
    Return,
    Is,
    Begin,
    End,
    If,
    Then,
    Elsif,
    Else,
    While,
    Loop,
    For,
    In,
    Array,
    Of,
}

/// Reserved words. Lookup is done on the lowercased identifier text, so
/// keywords are case-insensitive the way they are in Ada.
static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "function" => TokenKind::Function,
    "procedure" => TokenKind::Procedure,
    "return" => TokenKind::Return,
    "is" => TokenKind::Is,
    "begin" => TokenKind::Begin,
    "end" => TokenKind::End,
    "if" => TokenKind::If,
    "then" => TokenKind::Then,
    "elsif" => TokenKind::Elsif,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "loop" => TokenKind::Loop,
    "for" => TokenKind::For,
    "in" => TokenKind::In,
    "array" => TokenKind::Array,
    "of" => TokenKind::Of,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "not" => TokenKind::Not,
    "mod" => TokenKind::Mod,
};

/// Classify an identifier-shaped word as a keyword or a plain identifier.
pub fn classify_word(text: &str) -> TokenKind {
    KEYWORDS
        .get(text.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(TokenKind::Id)
}

/// A single token.
///
/// `position` is the 1-based column of the first character and `row` the
/// 1-based line. Literal tokens store their text without delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub position: usize,
    pub row: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, position: usize, row: usize) -> Self {
        Token {
            kind,
            value: value.into(),
            position,
            row,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} '{}' pos={} row={}",
            self.kind, self.value, self.position, self.row
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_ignore_case() {
        assert_eq!(classify_word("BEGIN"), TokenKind::Begin);
        assert_eq!(classify_word("Elsif"), TokenKind::Elsif);
        assert_eq!(classify_word("mod"), TokenKind::Mod);
    }

    #[test]
    fn plain_words_are_identifiers() {
        assert_eq!(classify_word("counter"), TokenKind::Id);
        assert_eq!(classify_word("Integer"), TokenKind::Id);
        assert_eq!(classify_word("ends"), TokenKind::Id);
    }
}
