//! The detector facade and its per-model cache.

use std::fmt;
use std::sync::{Arc, LazyLock, Weak};

use dashmap::DashMap;
use itertools::Itertools;
use tracing::{debug, trace};

use crate::pattern::{PatternParser, PatternTree, RegexParser};
use crate::semantic::{SemanticModel, TypeId};
use crate::syntax::{NodeId, TokenId};

use super::call_site::{EngineSymbols, literal_argument};
use super::cancel::CancellationToken;
use super::config::EngineConfig;
use super::directive::DirectiveParser;
use super::option_resolver::resolve_options;
use super::options::PatternOptions;
use super::tree_builder::{self, TreeBuildError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("engine config field `{0}` is empty")]
    EmptyName(&'static str),
    #[error("directive language word {word:?} cannot be matched")]
    Directive {
        word: String,
        #[source]
        source: regex::Error,
    },
}

/// Configuration shared by every detector a cache creates.
struct Shared {
    config: EngineConfig,
    directives: DirectiveParser,
    parser: Arc<dyn PatternParser>,
}

/// Decides whether string literals of one semantic model are patterns.
///
/// Bound to the model it was created for; passing another model is a caller
/// error.
pub struct PatternDetector {
    model_id: u64,
    shared: Arc<Shared>,
    engine: EngineSymbols,
}

impl fmt::Debug for PatternDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternDetector")
            .field("model_id", &self.model_id)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl PatternDetector {
    fn create(model: &SemanticModel, shared: Arc<Shared>) -> Option<Self> {
        let engine = EngineSymbols::resolve(model, &shared.config)?;
        Some(Self {
            model_id: model.id(),
            shared,
            engine,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn engine_type(&self) -> TypeId {
        self.engine.engine_type
    }

    /// Names of the engine methods that take a pattern, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        self.engine
            .method_names
            .iter()
            .map(String::as_str)
            .sorted_unstable()
            .collect()
    }

    fn check_model(&self, model: &SemanticModel, token: TokenId) {
        debug_assert_eq!(
            self.model_id,
            model.id(),
            "detector used with a semantic model it was not created for"
        );
        debug_assert!(model.tree().contains_token(token), "token is not in the model's tree");
    }

    /// Syntactic classification. The directive search runs at most once.
    fn candidate(&self, model: &SemanticModel, token: TokenId) -> Candidate {
        self.check_model(model, token);
        let tree = model.tree();
        if !tree.token_kind(token).is_string_literal() {
            return Candidate::Rejected;
        }
        if let Some(options) = self.shared.directives.find(tree, token) {
            return Candidate::Directive(options);
        }
        literal_argument(tree, token).map_or(Candidate::Rejected, Candidate::Argument)
    }

    /// Cheap syntactic rejection. `true` means the token can never be a
    /// pattern; `false` means it might be.
    pub fn is_definitely_not_pattern(&self, model: &SemanticModel, token: TokenId) -> bool {
        matches!(self.candidate(model, token), Candidate::Rejected)
    }

    /// The options of the pattern `token` holds, or `None` when it is not a pattern.
    pub fn is_pattern(&self, model: &SemanticModel, token: TokenId) -> Option<PatternOptions> {
        let tree = model.tree();
        match self.candidate(model, token) {
            Candidate::Rejected => None,
            Candidate::Directive(options) => {
                trace!(token = tree.token_text(token), %options, "pattern by directive");
                Some(options)
            }
            Candidate::Argument(argument) => {
                if !self.engine.is_pattern_argument(model, &self.shared.config, argument) {
                    return None;
                }
                let options = resolve_options(model, &self.shared.config.options_type, argument);
                trace!(token = tree.token_text(token), %options, "pattern by call site");
                Some(options)
            }
        }
    }

    /// Parse the pattern `token` holds. `Ok(None)` when it is not a pattern.
    pub fn try_parse(
        &self,
        model: &SemanticModel,
        token: TokenId,
        cancel: &CancellationToken,
    ) -> Result<Option<PatternTree>, TreeBuildError> {
        cancel.check()?;
        let Some(options) = self.is_pattern(model, token) else {
            return Ok(None);
        };
        cancel.check()?;
        self.build(model, token, options).map(Some)
    }

    /// Parse a literal already classified with `options`.
    pub(crate) fn build(
        &self,
        model: &SemanticModel,
        token: TokenId,
        options: PatternOptions,
    ) -> Result<PatternTree, TreeBuildError> {
        tree_builder::build(model.tree(), token, options, self.shared.parser.as_ref())
    }
}

enum Candidate {
    Rejected,
    /// Covered by a directive comment, which overrides any call site.
    Directive(PatternOptions),
    /// The direct literal of this argument node.
    Argument(NodeId),
}

struct Entry {
    model: Weak<SemanticModel>,
    /// `None` when the model's compilation has no engine type.
    detector: Option<Arc<PatternDetector>>,
}

/// One detector per semantic model, held without keeping models alive.
pub struct DetectorCache {
    shared: Arc<Shared>,
    entries: DashMap<u64, Entry>,
}

impl fmt::Debug for DetectorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorCache")
            .field("config", &self.shared.config)
            .field("entries", &self.entries.len())
            .finish()
    }
}

static SHARED: LazyLock<DetectorCache> = LazyLock::new(|| {
    DetectorCache::new(EngineConfig::default()).expect("default engine config is valid")
});

impl DetectorCache {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_parser(config, Arc::new(RegexParser))
    }

    /// A cache whose detectors hand literals to `parser`.
    pub fn with_parser(config: EngineConfig, parser: Arc<dyn PatternParser>) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("engine_type", &config.engine_type),
            ("options_type", &config.options_type),
            ("pattern_parameter", &config.pattern_parameter),
            ("language", &config.language),
        ] {
            if value.is_empty() {
                return Err(ConfigError::EmptyName(field));
            }
        }
        let directives = DirectiveParser::new(&config.language).map_err(|source| ConfigError::Directive {
            word: config.language.clone(),
            source,
        })?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                directives,
                parser,
            }),
            entries: DashMap::new(),
        })
    }

    /// Process-wide cache for the .NET regex engine.
    pub fn shared() -> &'static DetectorCache {
        &SHARED
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// The detector for `model`, created on first request. `None` when the
    /// model's compilation does not declare the engine type; that outcome is
    /// cached too.
    pub fn get(&self, model: &Arc<SemanticModel>) -> Option<Arc<PatternDetector>> {
        if let Some(entry) = self.entries.get(&model.id()) {
            return entry.detector.clone();
        }
        self.purge();
        let entry = self.entries.entry(model.id()).or_insert_with(|| {
            let detector = PatternDetector::create(model, Arc::clone(&self.shared)).map(Arc::new);
            debug!(
                model = model.id(),
                available = detector.is_some(),
                "created pattern detector"
            );
            Entry {
                model: Arc::downgrade(model),
                detector,
            }
        });
        entry.detector.clone()
    }

    /// Drop the entry for `model`.
    pub fn evict(&self, model: &SemanticModel) {
        if self.entries.remove(&model.id()).is_some() {
            debug!(model = model.id(), "evicted pattern detector");
        }
    }

    /// Drop entries whose model has been dropped.
    pub fn purge(&self) {
        self.entries.retain(|_, entry| entry.model.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// [`PatternDetector::is_pattern`] through the shared cache.
pub fn is_pattern(model: &Arc<SemanticModel>, token: TokenId) -> Option<PatternOptions> {
    DetectorCache::shared().get(model)?.is_pattern(model, token)
}

/// [`PatternDetector::try_parse`] through the shared cache.
pub fn try_parse(
    model: &Arc<SemanticModel>,
    token: TokenId,
    cancel: &CancellationToken,
) -> Result<Option<PatternTree>, TreeBuildError> {
    match DetectorCache::shared().get(model) {
        Some(detector) => detector.try_parse(model, token, cancel),
        None => Ok(None),
    }
}
