//! Batch detection over a whole tree.

use std::sync::Arc;

use tracing::debug;

use crate::pattern::PatternTree;
use crate::semantic::SemanticModel;
use crate::syntax::TokenId;
use crate::text::TextSpan;

use super::cancel::{CancellationToken, Cancelled};
use super::detector::DetectorCache;
use super::options::PatternOptions;
use super::tree_builder::TreeBuildError;

/// A string literal classified as a pattern.
#[derive(Debug, Clone)]
pub struct DetectedPattern {
    pub token: TokenId,
    /// Span of the literal token in source.
    pub span: TextSpan,
    pub options: PatternOptions,
    /// The parsed tree, or why it could not be built.
    pub tree: Result<PatternTree, TreeBuildError>,
}

/// Classify every string literal of `model`'s tree, in source order.
pub fn scan(
    cache: &DetectorCache,
    model: &Arc<SemanticModel>,
    cancel: &CancellationToken,
) -> Result<Vec<DetectedPattern>, Cancelled> {
    let Some(detector) = cache.get(model) else {
        debug!(model = model.id(), "engine type not declared, nothing to scan");
        return Ok(Vec::new());
    };
    let tree = model.tree();
    let mut found = Vec::new();
    for token in tree.tokens() {
        cancel.check()?;
        let Some(options) = detector.is_pattern(model, token) else {
            continue;
        };
        found.push(DetectedPattern {
            token,
            span: tree.token(token).span,
            options,
            tree: detector.build(model, token, options),
        });
    }
    debug!(model = model.id(), patterns = found.len(), "scanned tree");
    Ok(found)
}
