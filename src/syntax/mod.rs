//! Host language front end: lexer, parser and syntax tree.

mod error;
mod kind;
mod lexer;
mod parser;
mod tree;

pub use error::{SyntaxError, SyntaxErrorKind};
pub use kind::{NodeKind, TokenKind, TriviaKind};
pub use lexer::{LexedToken, Trivia, lex};
pub use tree::{Node, NodeId, SyntaxElement, SyntaxTree, Token, TokenId};
