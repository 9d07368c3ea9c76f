use crate::text::LinePosition;

/// A lexing or parsing failure in host source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{position}: {kind}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub position: LinePosition,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, position: LinePosition) -> Self {
        Self { kind, position }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated raw string literal")]
    UnterminatedRawString,
    #[error("raw string literal does not start with a new line")]
    InvalidRawStringStart,
    #[error("unterminated character literal")]
    UnterminatedChar,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },
    #[error("unexpected {0}")]
    Unexpected(String),
}
