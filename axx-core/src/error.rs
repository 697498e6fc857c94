use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
    #[error("lexical error: {message} pos={position} row={row}")]
    Lexical {
        message: String,
        position: usize,
        row: usize,
    },
    #[error("syntax error: {message} pos={position} row={row} type={found:?} value={value}")]
    Syntax {
        message: String,
        position: usize,
        row: usize,
        found: TokenKind,
        value: String,
    },
    #[error("semantic error: {message} pos={position} row={row}")]
    Semantic {
        message: String,
        position: usize,
        row: usize,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn syntax(message: impl Into<String>, token: &Token) -> Self {
        CompileError::Syntax {
            message: message.into(),
            position: token.position,
            row: token.row,
            found: token.kind,
            value: token.value.clone(),
        }
    }

    pub fn semantic(message: impl Into<String>, token: &Token) -> Self {
        CompileError::Semantic {
            message: message.into(),
            position: token.position,
            row: token.row,
        }
    }
}
