//! Detection of regular expression patterns in string literals.
//!
//! A literal is a pattern when a `language=pattern` directive comment covers
//! it, or when it is passed as the `pattern` argument of a public static
//! method or constructor of the engine type. Detection never fails: anything
//! ambiguous is simply not a pattern.

mod call_site;
mod cancel;
mod config;
mod detector;
mod directive;
mod option_resolver;
mod options;
mod scan;
mod tree_builder;

#[cfg(test)]
mod tests;

pub use cancel::{CancellationToken, Cancelled};
pub use config::EngineConfig;
pub use detector::{ConfigError, DetectorCache, PatternDetector, is_pattern, try_parse};
pub use directive::DirectiveParser;
pub use options::PatternOptions;
pub use scan::{DetectedPattern, scan};
pub use tree_builder::TreeBuildError;
