//! Turning a classified literal into a pattern tree.

use crate::pattern::{PatternParser, PatternTree};
use crate::syntax::{SyntaxTree, TokenId};
use crate::virtual_chars::{self, VirtualCharError};

use super::cancel::Cancelled;
use super::options::PatternOptions;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeBuildError {
    #[error("pattern literal cannot be decoded: {0}")]
    InvalidLiteral(#[from] VirtualCharError),
    #[error("pattern parser declined the literal")]
    ParserDeclined,
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

pub(crate) fn build(
    tree: &SyntaxTree,
    token: TokenId,
    options: PatternOptions,
    parser: &dyn PatternParser,
) -> Result<PatternTree, TreeBuildError> {
    let chars = virtual_chars::convert(tree, token)?;
    parser.parse(&chars, options).ok_or(TreeBuildError::ParserDeclined)
}
