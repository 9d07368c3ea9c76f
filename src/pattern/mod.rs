//! .NET regular expression trees.
//!
//! Patterns are parsed from the virtual characters of a string literal, so
//! every node and diagnostic can be mapped back to source text.
//!
//! # Supported syntax
//!
//! | Construct                  | Example                  |
//! |----------------------------|--------------------------|
//! | Alternation                | `a\|b`                   |
//! | Quantifiers, lazy forms    | `* + ? {n} {n,} {n,m}`   |
//! | Classes and ranges         | `[^a-z\d]`               |
//! | Class escapes, categories  | `\d \W \s \p{Lu}`        |
//! | Anchors                    | `^ $ \A \z \Z \b \B \G`  |
//! | Capturing groups           | `(x)`, `(?<n>x)`         |
//! | Balancing groups           | `(?<a-b>x)`              |
//! | Lookaround, atomic         | `(?=x) (?<!x) (?>x)`     |
//! | Inline options             | `(?i)`, `(?s-m:x)`       |
//! | Conditionals               | `(?(1)yes\|no)`          |
//! | Backreferences             | `\1`, `\k<n>`            |
//! | Comments                   | `(?#...)`, `x`-mode `#`  |

pub mod ast;
pub mod parser;

use crate::detect::PatternOptions;
use crate::text::TextSpan;
use crate::virtual_chars::VirtualCharSequence;

use ast::{Alternation, Span};

pub use parser::{Diagnostic, DiagnosticKind, parse, parse_str};

/// A parsed pattern. Always produced, even for malformed input.
#[derive(Debug, Clone)]
pub struct PatternTree {
    root: Alternation,
    diagnostics: Vec<Diagnostic>,
    options: PatternOptions,
    capture_names: Vec<String>,
    chars: VirtualCharSequence,
}

impl PatternTree {
    pub(crate) fn new(
        root: Alternation,
        diagnostics: Vec<Diagnostic>,
        options: PatternOptions,
        capture_names: Vec<String>,
        chars: VirtualCharSequence,
    ) -> Self {
        Self {
            root,
            diagnostics,
            options,
            capture_names,
            chars,
        }
    }

    pub fn root(&self) -> &Alternation {
        &self.root
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The options the pattern was parsed with.
    pub fn options(&self) -> PatternOptions {
        self.options
    }

    /// Group names in numbering order: `"0"`, unnamed groups, then named groups.
    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }

    pub fn chars(&self) -> &VirtualCharSequence {
        &self.chars
    }

    /// The pattern text after escape decoding.
    pub fn text(&self) -> String {
        self.chars.text()
    }

    pub fn source_span(&self, span: &Span) -> TextSpan {
        self.chars.source_span(span.clone())
    }
}

/// Turns the characters of a pattern literal into a tree.
///
/// Returning `None` means the parser declined the input altogether, which is
/// distinct from a tree with diagnostics.
pub trait PatternParser: Send + Sync {
    fn parse(&self, chars: &VirtualCharSequence, options: PatternOptions) -> Option<PatternTree>;
}

/// The built-in .NET regex grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexParser;

impl PatternParser for RegexParser {
    fn parse(&self, chars: &VirtualCharSequence, options: PatternOptions) -> Option<PatternTree> {
        Some(parser::parse(chars, options))
    }
}
