//! `language=pattern,Option,...` directive comments.

use regex::{Regex, RegexBuilder};

use crate::syntax::{SyntaxTree, TokenId, Trivia};

use super::options::PatternOptions;

/// Recognizes directive comments for one language word.
#[derive(Debug, Clone)]
pub struct DirectiveParser {
    regex: Regex,
}

impl DirectiveParser {
    /// Build a parser for `language=<word>`. The word is matched literally.
    pub fn new(word: &str) -> Result<Self, regex::Error> {
        let source = format!(
            r"language\s*=\s*{}(p)?(?<options>(?:\s*,\s*[a-zA-Z]+)*)",
            regex::escape(word)
        );
        let regex = RegexBuilder::new(&source).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    /// Options named by a directive in `text`, or `None` when there is no directive.
    ///
    /// Names are accumulated left to right; the first unknown name ends the
    /// list without invalidating the directive.
    pub fn parse(&self, text: &str) -> Option<PatternOptions> {
        let captures = self.regex.captures(text)?;
        let mut options = PatternOptions::NONE;
        let tail = captures.name("options").map_or("", |m| m.as_str());
        for name in tail.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let Some(flag) = PatternOptions::from_name(name) else {
                break;
            };
            options |= flag;
        }
        Some(options)
    }

    fn parse_trivia(&self, tree: &SyntaxTree, trivia: &[Trivia]) -> Option<PatternOptions> {
        trivia
            .iter()
            .filter(|t| t.kind.is_comment())
            .find_map(|t| self.parse(tree.trivia_text(t)))
    }

    /// The directive covering `token`: the previous token's trailing comments
    /// first, then the leading comments of each enclosing node, innermost first.
    pub fn find(&self, tree: &SyntaxTree, token: TokenId) -> Option<PatternOptions> {
        if let Some(previous) = tree.previous_token(token)
            && let Some(options) = self.parse_trivia(tree, &tree.token(previous).trailing)
        {
            return Some(options);
        }
        tree.ancestors(tree.token_parent(token))
            .find_map(|node| self.parse_trivia(tree, tree.leading_trivia(node)))
    }
}
