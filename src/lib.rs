//! Finds regular expressions embedded in C#-style string literals.
//!
//! Source files are parsed into syntax trees, bound into a
//! [`Compilation`](semantic::Compilation), and each string literal is
//! classified by a [`PatternDetector`](detect::PatternDetector). Literals
//! that are patterns can be parsed into [`PatternTree`](pattern::PatternTree)s.
//!
//! # Example
//!
//! ```rust
//! use patternlens::detect::{CancellationToken, DetectorCache, PatternOptions, scan};
//! use patternlens::semantic::Compilation;
//! use patternlens::syntax::SyntaxTree;
//!
//! let source = r#"
//! using System.Text.RegularExpressions;
//! class C {
//!     bool M(string s) => Regex.IsMatch(s, @"\d+", RegexOptions.IgnoreCase);
//! }"#;
//! let tree = SyntaxTree::parse(source).unwrap();
//! let compilation = Compilation::with_prelude([tree]).unwrap();
//! let model = compilation.semantic_model(0);
//!
//! let found = scan(DetectorCache::shared(), &model, &CancellationToken::new()).unwrap();
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].options, PatternOptions::IGNORE_CASE);
//! assert_eq!(found[0].tree.as_ref().unwrap().text(), r"\d+");
//! ```

pub mod detect;
pub mod pattern;
pub mod semantic;
pub mod syntax;
pub mod text;
pub mod virtual_chars;
