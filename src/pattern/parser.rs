//! Recursive descent parser for .NET regular expressions.
//!
//! The parser never fails: malformed input produces a [`Diagnostic`] and
//! parsing resumes, so every pattern yields a tree.

use std::fmt;

use phf::{Set, phf_set};

use crate::detect::PatternOptions;
use crate::text::TextSpan;
use crate::virtual_chars::{VirtualChar, VirtualCharSequence};

use super::PatternTree;
use super::ast::*;

/// Problems found while parsing a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    TooManyParens,
    NotEnoughParens,
    UnterminatedClass,
    UnterminatedComment,
    QuantifierAfterNothing,
    NestedQuantifier(char),
    ReversedQuantifierRange,
    ReversedClassRange,
    ClassInRange,
    IllegalEndEscape,
    UnrecognizedEscape(char),
    InsufficientHexDigits,
    MissingControlChar,
    UnrecognizedControlChar,
    MalformedCategory,
    UnknownCategory(String),
    MalformedNamedReference,
    UndefinedGroupNumber(u32),
    UndefinedGroupName(String),
    InvalidGroupName,
    UnrecognizedGrouping,
    TooManyAlternates,
    IncompatibleEcmaScriptOptions,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyParens => write!(f, "Too many )'s"),
            Self::NotEnoughParens => write!(f, "Not enough )'s"),
            Self::UnterminatedClass => write!(f, "Unterminated [] set"),
            Self::UnterminatedComment => write!(f, "Unterminated (?#...) comment"),
            Self::QuantifierAfterNothing => write!(f, "Quantifier following nothing"),
            Self::NestedQuantifier(c) => write!(f, "Nested quantifier '{c}'"),
            Self::ReversedQuantifierRange => write!(f, "Illegal {{x,y}} with x > y"),
            Self::ReversedClassRange => write!(f, "[x-y] range in reverse order"),
            Self::ClassInRange => write!(f, "Cannot include class in character range"),
            Self::IllegalEndEscape => write!(f, "Illegal \\ at end of pattern"),
            Self::UnrecognizedEscape(c) => write!(f, "Unrecognized escape sequence \\{c}"),
            Self::InsufficientHexDigits => write!(f, "Insufficient hexadecimal digits"),
            Self::MissingControlChar => write!(f, "Missing control character"),
            Self::UnrecognizedControlChar => write!(f, "Unrecognized control character"),
            Self::MalformedCategory => write!(f, "Malformed \\p{{X}} character escape"),
            Self::UnknownCategory(name) => write!(f, "Unknown property '{name}'"),
            Self::MalformedNamedReference => write!(f, "Malformed \\k<...> named back reference"),
            Self::UndefinedGroupNumber(n) => write!(f, "Reference to undefined group number {n}"),
            Self::UndefinedGroupName(name) => write!(f, "Reference to undefined group name '{name}'"),
            Self::InvalidGroupName => {
                write!(f, "Invalid group name: group names must begin with a word character")
            }
            Self::UnrecognizedGrouping => write!(f, "Unrecognized grouping construct"),
            Self::TooManyAlternates => write!(f, "Too many | in (?()|)"),
            Self::IncompatibleEcmaScriptOptions => write!(
                f,
                "ECMAScript can only be combined with IgnoreCase, Multiline and Compiled"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.kind, self.span.start, self.span.end)
    }
}

/// Unicode general categories accepted by `\p{..}`. Block names (`IsGreek`)
/// are accepted by prefix.
static CATEGORIES: Set<&'static str> = phf_set! {
    "L", "Lu", "Ll", "Lt", "Lm", "Lo",
    "M", "Mn", "Mc", "Me",
    "N", "Nd", "Nl", "No",
    "P", "Pc", "Pd", "Ps", "Pe", "Pi", "Pf", "Po",
    "S", "Sm", "Sc", "Sk", "So",
    "Z", "Zs", "Zl", "Zp",
    "C", "Cc", "Cf", "Cs", "Co", "Cn",
};

const ECMA_SCRIPT_COMPATIBLE: PatternOptions = PatternOptions::from_bits(
    PatternOptions::IGNORE_CASE.bits()
        | PatternOptions::MULTILINE.bits()
        | PatternOptions::COMPILED.bits()
        | PatternOptions::ECMA_SCRIPT.bits(),
);

/// Parse the characters of a pattern literal.
pub fn parse(chars: &VirtualCharSequence, options: PatternOptions) -> PatternTree {
    let mut parser = Parser {
        chars: chars.iter().map(|vc| vc.ch).collect(),
        pos: 0,
        options,
        diagnostics: Vec::new(),
        capture_count: 0,
        capture_names: Vec::new(),
        references: Vec::new(),
    };
    if options.contains(PatternOptions::ECMA_SCRIPT)
        && !(options & !ECMA_SCRIPT_COMPATIBLE).is_empty()
    {
        parser.diagnose(DiagnosticKind::IncompatibleEcmaScriptOptions, 0..0);
    }
    let root = parser.parse_root();
    parser.check_references();

    let mut capture_names: Vec<String> = (0..=parser.capture_count).map(|n| n.to_string()).collect();
    for name in parser.capture_names {
        if !capture_names.contains(&name) {
            capture_names.push(name);
        }
    }
    PatternTree::new(root, parser.diagnostics, options, capture_names, chars.clone())
}

/// Parse a plain string. Virtual char spans are the byte offsets of `pattern`.
pub fn parse_str(pattern: &str, options: PatternOptions) -> PatternTree {
    let chars = pattern
        .char_indices()
        .map(|(i, ch)| VirtualChar {
            ch,
            span: TextSpan::new(i, i + ch.len_utf8()),
        })
        .collect();
    parse(&VirtualCharSequence::new(chars), options)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    /// Current options, updated by inline option constructs.
    options: PatternOptions,
    diagnostics: Vec<Diagnostic>,
    capture_count: u32,
    capture_names: Vec<String>,
    references: Vec<(Reference, Span)>,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn diagnose(&mut self, kind: DiagnosticKind, span: Span) {
        self.diagnostics.push(Diagnostic { kind, span });
    }

    /// Whitespace and `#` comments are skipped outside classes when
    /// `IgnorePatternWhitespace` is on.
    fn skip_ignored(&mut self) {
        if !self.options.contains(PatternOptions::IGNORE_PATTERN_WHITESPACE) {
            return;
        }
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            if self.peek() != Some('#') {
                return;
            }
            while let Some(c) = self.bump() {
                if c == '\n' {
                    break;
                }
            }
        }
    }

    // --- Structure ---

    fn parse_root(&mut self) -> Alternation {
        let mut root = self.parse_alternation();
        // A stray `)` is reported and the rest is parsed as a continuation.
        while self.peek() == Some(')') {
            self.diagnose(DiagnosticKind::TooManyParens, self.pos..self.pos + 1);
            self.pos += 1;
            let rest = self.parse_alternation();
            let mut branches = rest.branches.into_iter();
            if let (Some(last), Some(first)) = (root.branches.last_mut(), branches.next()) {
                last.items.extend(first.items);
                last.span.end = first.span.end;
            }
            root.branches.extend(branches);
            root.span.end = self.pos;
        }
        root
    }

    fn parse_alternation(&mut self) -> Alternation {
        let start = self.pos;
        let mut branches = vec![self.parse_sequence()];
        while self.eat('|') {
            branches.push(self.parse_sequence());
        }
        Alternation {
            branches,
            span: start..self.pos,
        }
    }

    fn parse_sequence(&mut self) -> Sequence {
        let start = self.pos;
        let mut items: Vec<Item> = Vec::new();
        loop {
            self.skip_ignored();
            match self.peek() {
                None | Some('|') | Some(')') => break,
                _ => {}
            }

            if let Some(quantifier) = self.parse_quantifier() {
                match items.last_mut() {
                    Some(item) if item.quantifier.is_some() => {
                        let c = self.chars[quantifier.span.start];
                        self.diagnose(DiagnosticKind::NestedQuantifier(c), quantifier.span);
                    }
                    Some(item) if !matches!(item.element, Element::InlineOptions { .. }) => {
                        item.span.end = quantifier.span.end;
                        item.quantifier = Some(quantifier);
                    }
                    _ => self.diagnose(DiagnosticKind::QuantifierAfterNothing, quantifier.span),
                }
                continue;
            }

            let item_start = self.pos;
            if let Some(element) = self.parse_element() {
                items.push(Item {
                    element,
                    quantifier: None,
                    span: item_start..self.pos,
                });
            }
        }
        Sequence {
            items,
            span: start..self.pos,
        }
    }

    // --- Quantifiers ---

    fn parse_quantifier(&mut self) -> Option<Quantifier> {
        let start = self.pos;
        let kind = match self.peek()? {
            '*' => QuantifierKind::ZeroOrMore,
            '+' => QuantifierKind::OneOrMore,
            '?' => QuantifierKind::ZeroOrOne,
            '{' => {
                let (kind, end) = self.scan_brace_quantifier()?;
                self.pos = end - 1;
                kind
            }
            _ => return None,
        };
        self.pos += 1;
        let lazy = self.eat('?');
        if let QuantifierKind::Between(min, max) = kind
            && min > max
        {
            self.diagnose(DiagnosticKind::ReversedQuantifierRange, start..self.pos);
        }
        Some(Quantifier {
            kind,
            lazy,
            span: start..self.pos,
        })
    }

    fn scan_number(&self, from: usize) -> Option<(u32, usize)> {
        let digits = self.chars[from.min(self.chars.len())..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }
        let value = self.chars[from..from + digits]
            .iter()
            .fold(0u32, |acc, c| {
                acc.saturating_mul(10)
                    .saturating_add(c.to_digit(10).unwrap_or(0))
            });
        Some((value, from + digits))
    }

    /// `{n}`, `{n,}` or `{n,m}` at the cursor, without consuming. Returns the
    /// kind and the index just past `}`. Anything else is not a quantifier.
    fn scan_brace_quantifier(&self) -> Option<(QuantifierKind, usize)> {
        let (min, after_min) = self.scan_number(self.pos + 1)?;
        match self.chars.get(after_min)? {
            '}' => Some((QuantifierKind::Exactly(min), after_min + 1)),
            ',' => match self.scan_number(after_min + 1) {
                Some((max, after_max)) if self.chars.get(after_max) == Some(&'}') => {
                    Some((QuantifierKind::Between(min, max), after_max + 1))
                }
                None if self.chars.get(after_min + 1) == Some(&'}') => {
                    Some((QuantifierKind::AtLeast(min), after_min + 2))
                }
                _ => None,
            },
            _ => None,
        }
    }

    // --- Elements ---

    /// One element, or `None` for constructs that produce nothing (comments).
    fn parse_element(&mut self) -> Option<Element> {
        let start = self.pos;
        let c = self.bump()?;
        Some(match c {
            '(' => return self.parse_group(start),
            '[' => Element::Class(self.parse_class(start)),
            '.' => Element::Any,
            '^' => Element::Anchor(Anchor::StartOfLine),
            '$' => Element::Anchor(Anchor::EndOfLine),
            '\\' => self.parse_escape(start),
            c => Element::Char(c),
        })
    }

    fn scan_name(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn reference_for(name: String) -> Reference {
        match name.parse::<u32>() {
            Ok(n) if name.chars().all(|c| c.is_ascii_digit()) => Reference::Number(n),
            _ => Reference::Name(name),
        }
    }

    fn parse_group(&mut self, open: usize) -> Option<Element> {
        let saved_options = self.options;
        let kind = if self.eat('?') {
            match self.peek() {
                Some(':') => {
                    self.pos += 1;
                    GroupKind::NonCapture
                }
                Some('=') => {
                    self.pos += 1;
                    GroupKind::Lookahead
                }
                Some('!') => {
                    self.pos += 1;
                    GroupKind::NegativeLookahead
                }
                Some('>') => {
                    self.pos += 1;
                    GroupKind::Atomic
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == ')' {
                            return None;
                        }
                    }
                    self.diagnose(DiagnosticKind::UnterminatedComment, open..self.pos);
                    return None;
                }
                Some('<') if self.peek_at(1) == Some('=') => {
                    self.pos += 2;
                    GroupKind::Lookbehind
                }
                Some('<') if self.peek_at(1) == Some('!') => {
                    self.pos += 2;
                    GroupKind::NegativeLookbehind
                }
                Some(quote @ ('<' | '\'')) => {
                    self.pos += 1;
                    self.parse_group_name(open, if quote == '<' { '>' } else { '\'' })
                }
                Some('(') => return Some(self.parse_conditional(open)),
                Some(c) if "imnsx-".contains(c.to_ascii_lowercase()) => {
                    let (on, off) = self.scan_options();
                    if self.eat(')') {
                        self.options = (self.options | on) & !off;
                        return Some(Element::InlineOptions { on, off });
                    }
                    if self.eat(':') {
                        self.options = (self.options | on) & !off;
                        GroupKind::Options { on, off }
                    } else {
                        self.diagnose(DiagnosticKind::UnrecognizedGrouping, open..self.pos);
                        GroupKind::NonCapture
                    }
                }
                _ => {
                    self.diagnose(DiagnosticKind::UnrecognizedGrouping, open..self.pos);
                    GroupKind::NonCapture
                }
            }
        } else if self.options.contains(PatternOptions::EXPLICIT_CAPTURE) {
            GroupKind::NonCapture
        } else {
            self.capture_count += 1;
            GroupKind::Capture(self.capture_count)
        };

        let body = self.parse_alternation();
        self.options = saved_options;
        if !self.eat(')') {
            self.diagnose(DiagnosticKind::NotEnoughParens, open..self.pos);
        }
        Some(Element::Group(Group {
            kind,
            body: Box::new(body),
        }))
    }

    /// `<name>`, `'name'` or balancing `<name-other>` after `(?`.
    fn parse_group_name(&mut self, open: usize, close: char) -> GroupKind {
        let name = self.scan_name();
        let balancing = if self.eat('-') {
            let start = self.pos;
            let other = self.scan_name();
            if !other.is_empty() {
                self.references
                    .push((Self::reference_for(other.clone()), start..self.pos));
            }
            Some(other)
        } else {
            None
        };
        let closed = self.eat(close);
        if !closed || (name.is_empty() && balancing.as_ref().is_none_or(String::is_empty)) {
            self.diagnose(DiagnosticKind::InvalidGroupName, open..self.pos);
        }
        if !name.is_empty() && !self.capture_names.contains(&name) {
            self.capture_names.push(name.clone());
        }
        GroupKind::NamedCapture { name, balancing }
    }

    fn scan_options(&mut self) -> (PatternOptions, PatternOptions) {
        let mut on = PatternOptions::NONE;
        let mut off = PatternOptions::NONE;
        let mut negate = false;
        while let Some(c) = self.peek() {
            let flag = match c.to_ascii_lowercase() {
                '-' => {
                    negate = true;
                    self.pos += 1;
                    continue;
                }
                'i' => PatternOptions::IGNORE_CASE,
                'm' => PatternOptions::MULTILINE,
                'n' => PatternOptions::EXPLICIT_CAPTURE,
                's' => PatternOptions::SINGLELINE,
                'x' => PatternOptions::IGNORE_PATTERN_WHITESPACE,
                _ => break,
            };
            if negate { off |= flag } else { on |= flag }
            self.pos += 1;
        }
        (on, off)
    }

    /// `(?(` has been seen; the cursor is on the inner `(`.
    fn parse_conditional(&mut self, open: usize) -> Element {
        let saved_options = self.options;
        let condition_start = self.pos;
        self.pos += 1;
        let name_start = self.pos;
        let name = self.scan_name();
        let condition = if !name.is_empty() && self.eat(')') {
            let reference = Self::reference_for(name);
            if let Reference::Number(_) = reference {
                self.references
                    .push((reference.clone(), name_start..self.pos - 1));
            }
            Condition::Reference(reference)
        } else {
            // `(?(?=x)...)` and `(?(x)...)` both test `x` as a lookahead.
            self.pos = condition_start + 1;
            if self.peek() == Some('?') {
                match (self.peek_at(1), self.peek_at(2)) {
                    (Some('=' | '!'), _) => self.pos += 2,
                    (Some('<'), Some('=' | '!')) => self.pos += 3,
                    _ => {}
                }
            }
            let expression = self.parse_alternation();
            if !self.eat(')') {
                self.diagnose(DiagnosticKind::NotEnoughParens, condition_start..self.pos);
            }
            Condition::Expression(Box::new(expression))
        };

        let body = self.parse_alternation();
        self.options = saved_options;
        if body.branches.len() > 2 {
            self.diagnose(DiagnosticKind::TooManyAlternates, open..self.pos);
        }
        if !self.eat(')') {
            self.diagnose(DiagnosticKind::NotEnoughParens, open..self.pos);
        }
        Element::Group(Group {
            kind: GroupKind::Conditional(condition),
            body: Box::new(body),
        })
    }

    // --- Classes ---

    fn parse_class(&mut self, open: usize) -> CharClass {
        let negated = self.eat('^');
        let mut items = Vec::new();
        let mut first = true;
        loop {
            let Some(c) = self.peek() else {
                self.diagnose(DiagnosticKind::UnterminatedClass, open..self.pos);
                break;
            };
            if c == ']' && !first {
                self.pos += 1;
                break;
            }
            first = false;

            let item_start = self.pos;
            let low = self.parse_class_atom();
            let is_range = self.peek() == Some('-') && self.peek_at(1).is_some_and(|c| c != ']');
            match low {
                ClassItem::Char(lo) if is_range => {
                    self.pos += 1;
                    match self.parse_class_atom() {
                        ClassItem::Char(hi) => {
                            if hi < lo {
                                self.diagnose(DiagnosticKind::ReversedClassRange, item_start..self.pos);
                            }
                            items.push(ClassItem::Range(lo, hi));
                        }
                        other => {
                            self.diagnose(DiagnosticKind::ClassInRange, item_start..self.pos);
                            items.push(ClassItem::Char(lo));
                            items.push(ClassItem::Char('-'));
                            items.push(other);
                        }
                    }
                }
                ClassItem::Escape(escape) if is_range => {
                    self.diagnose(DiagnosticKind::ClassInRange, item_start..self.pos + 1);
                    items.push(ClassItem::Escape(escape));
                }
                item => items.push(item),
            }
        }
        CharClass { negated, items }
    }

    fn parse_class_atom(&mut self) -> ClassItem {
        let start = self.pos;
        match self.bump() {
            Some('\\') => match self.bump() {
                None => {
                    self.diagnose(DiagnosticKind::IllegalEndEscape, start..self.pos);
                    ClassItem::Char('\\')
                }
                Some('b') => ClassItem::Char('\u{8}'),
                Some(c @ ('d' | 'D' | 'w' | 'W' | 's' | 'S')) => ClassItem::Escape(Self::class_escape(c)),
                Some(c @ ('p' | 'P')) => ClassItem::Escape(self.parse_category(c == 'P', start)),
                Some(c) => ClassItem::Char(self.parse_char_escape(c, start)),
            },
            Some(c) => ClassItem::Char(c),
            None => ClassItem::Char('\0'),
        }
    }

    // --- Escapes ---

    fn class_escape(c: char) -> ClassEscape {
        let negated = c.is_ascii_uppercase();
        match c.to_ascii_lowercase() {
            'd' => ClassEscape::Digit { negated },
            'w' => ClassEscape::Word { negated },
            _ => ClassEscape::Space { negated },
        }
    }

    /// The cursor is just past `\`.
    fn parse_escape(&mut self, start: usize) -> Element {
        let Some(c) = self.bump() else {
            self.diagnose(DiagnosticKind::IllegalEndEscape, start..self.pos);
            return Element::Char('\\');
        };
        match c {
            'b' => Element::Anchor(Anchor::WordBoundary),
            'B' => Element::Anchor(Anchor::NonWordBoundary),
            'A' => Element::Anchor(Anchor::StartOfText),
            'z' => Element::Anchor(Anchor::EndOfText),
            'Z' => Element::Anchor(Anchor::EndOfTextOrNewline),
            'G' => Element::Anchor(Anchor::ContiguousMatch),
            'd' | 'D' | 'w' | 'W' | 's' | 'S' => Element::ClassEscape(Self::class_escape(c)),
            'p' | 'P' => Element::ClassEscape(self.parse_category(c == 'P', start)),
            'k' => self.parse_named_reference(start),
            '1'..='9' => {
                let (number, end) = self.scan_number(self.pos - 1).unwrap_or((0, self.pos));
                // Multi-digit escapes such as `\101` are octal.
                if number > 9 && c <= '7' {
                    return Element::Char(self.parse_char_escape(c, start));
                }
                self.pos = end;
                self.references.push((Reference::Number(number), start..self.pos));
                Element::Backreference(Reference::Number(number))
            }
            c => Element::Char(self.parse_char_escape(c, start)),
        }
    }

    fn parse_named_reference(&mut self, start: usize) -> Element {
        let close = match self.peek() {
            Some('<') => '>',
            Some('\'') => '\'',
            _ => {
                self.diagnose(DiagnosticKind::MalformedNamedReference, start..self.pos);
                return Element::Char('k');
            }
        };
        self.pos += 1;
        let name = self.scan_name();
        if name.is_empty() || !self.eat(close) {
            self.diagnose(DiagnosticKind::MalformedNamedReference, start..self.pos);
            return Element::Char('k');
        }
        let reference = Self::reference_for(name);
        self.references.push((reference.clone(), start..self.pos));
        Element::Backreference(reference)
    }

    fn parse_category(&mut self, negated: bool, start: usize) -> ClassEscape {
        let mut name = String::new();
        let mut closed = false;
        if self.eat('{') {
            while let Some(c) = self.bump() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }
        }
        if !closed || name.is_empty() {
            self.diagnose(DiagnosticKind::MalformedCategory, start..self.pos);
        } else if !CATEGORIES.contains(name.as_str()) && !name.starts_with("Is") {
            self.diagnose(DiagnosticKind::UnknownCategory(name.clone()), start..self.pos);
        }
        ClassEscape::Category { negated, name }
    }

    fn scan_hex(&mut self, digits: usize, start: usize) -> char {
        let count = self.chars[self.pos..]
            .iter()
            .take(digits)
            .take_while(|c| c.is_ascii_hexdigit())
            .count();
        let value = self.chars[self.pos..self.pos + count]
            .iter()
            .fold(0u32, |acc, c| acc * 16 + c.to_digit(16).unwrap_or(0));
        self.pos += count;
        if count < digits {
            self.diagnose(DiagnosticKind::InsufficientHexDigits, start..self.pos);
        }
        char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    /// A single-character escape; `c` is the char after `\`.
    fn parse_char_escape(&mut self, c: char, start: usize) -> char {
        match c {
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            'f' => '\u{c}',
            'v' => '\u{b}',
            'e' => '\u{1b}',
            'a' => '\u{7}',
            'x' => self.scan_hex(2, start),
            'u' => self.scan_hex(4, start),
            'c' => match self.bump() {
                Some(ctl) if ('@'..='_').contains(&ctl.to_ascii_uppercase()) => {
                    char::from(ctl.to_ascii_uppercase() as u8 - b'@')
                }
                Some(_) => {
                    self.diagnose(DiagnosticKind::UnrecognizedControlChar, start..self.pos);
                    'c'
                }
                None => {
                    self.diagnose(DiagnosticKind::MissingControlChar, start..self.pos);
                    'c'
                }
            },
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                let mut count = 1;
                while count < 3
                    && let Some(d) = self.peek().and_then(|d| d.to_digit(8))
                {
                    value = value * 8 + d;
                    self.pos += 1;
                    count += 1;
                }
                char::from((value & 0xFF) as u8)
            }
            c if is_word_char(c) => {
                self.diagnose(DiagnosticKind::UnrecognizedEscape(c), start..self.pos);
                c
            }
            c => c,
        }
    }

    // --- Validation ---

    fn check_references(&mut self) {
        let group_count = self.capture_count as usize + self.capture_names.len();
        let references = std::mem::take(&mut self.references);
        for (reference, span) in references {
            match reference {
                Reference::Number(n) => {
                    let defined = (n as usize) <= group_count
                        || self.capture_names.iter().any(|name| *name == n.to_string());
                    if !defined {
                        self.diagnose(DiagnosticKind::UndefinedGroupNumber(n), span);
                    }
                }
                Reference::Name(name) => {
                    if !self.capture_names.contains(&name) {
                        self.diagnose(DiagnosticKind::UndefinedGroupName(name), span);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn kinds(pattern: &str, options: PatternOptions) -> Vec<DiagnosticKind> {
        parse_str(pattern, options)
            .diagnostics()
            .iter()
            .map(|d| d.kind.clone())
            .collect()
    }

    fn items(pattern: &str) -> Vec<Item> {
        let tree = parse_str(pattern, PatternOptions::NONE);
        assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
        assert_eq!(tree.root().branches.len(), 1);
        tree.root().branches[0].items.clone()
    }

    // --- Well-formed patterns ---

    #[parameterized(
        literal = { "abc" },
        classes = { r"\d+\w*\s?" },
        anchors = { r"^\Aa\b\B\G\z\Z$" },
        char_class = { "[a-z0-9_]" },
        negated_class = { r"[^\]\\-]" },
        groups = { "(a)(?:b)(?=c)(?!d)(?<=e)(?<!f)(?>g)" },
        named = { r"(?<year>\d{4})-(?'month'\d\d)\k<year>\k'month'" },
        backreference = { r"(a)(b)\2\1" },
        inline_options = { "(?i)a(?-i:b)(?im-sx)c" },
        quantifiers = { "a*b+c?d{2}e{2,}f{2,3}g*?h+?" },
        escapes = { r"\t\n\x41B\cA\0\101\.\*" },
        categories = { r"\p{Lu}\P{IsGreek}[\p{N}]" },
        conditional = { "(a)?(?(1)b|c)" },
        conditional_expression = { "(?(?=x)xy|z)" },
        comment = { "a(?#note)b" },
        literal_braces = { "a{b}{,1}{1,x}" },
        balancing = { "(?<open>a)(?<close-open>b)" },
    )]
    fn test_valid_patterns(pattern: &str) {
        let tree = parse_str(pattern, PatternOptions::NONE);
        assert!(tree.diagnostics().is_empty(), "{pattern}: {:?}", tree.diagnostics());
    }

    #[test]
    fn test_alternation() {
        let tree = parse_str("a|bc|", PatternOptions::NONE);
        let branches = &tree.root().branches;
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[1].items.len(), 2);
        assert!(branches[2].items.is_empty());
        assert_eq!(branches[1].span, 2..4);
    }

    #[test]
    fn test_quantifier_attaches_to_previous_item() {
        let items = items("ab{2,3}?");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].element, Element::Char('b'));
        assert_eq!(
            items[1].quantifier,
            Some(Quantifier {
                kind: QuantifierKind::Between(2, 3),
                lazy: true,
                span: 2..8,
            })
        );
        assert_eq!(items[1].span, 1..8);
    }

    #[test]
    fn test_non_quantifier_brace_is_literal() {
        let items = items("a{x}");
        assert_eq!(items.len(), 4);
        assert_eq!(items[1].element, Element::Char('{'));
    }

    #[test]
    fn test_capture_numbering() {
        let tree = parse_str("(a)(?<n>b)(c)", PatternOptions::NONE);
        let kinds: Vec<GroupKind> = tree.root().branches[0]
            .items
            .iter()
            .filter_map(|item| match &item.element {
                Element::Group(g) => Some(g.kind.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(kinds[0], GroupKind::Capture(1));
        assert_eq!(kinds[2], GroupKind::Capture(2));
        assert_eq!(tree.capture_names(), ["0", "1", "2", "n"]);
    }

    #[test]
    fn test_class_items() {
        let items = items(r"[a-c\d.]");
        let Element::Class(class) = &items[0].element else {
            panic!("expected class");
        };
        assert!(!class.negated);
        assert_eq!(
            class.items,
            vec![
                ClassItem::Range('a', 'c'),
                ClassItem::Escape(ClassEscape::Digit { negated: false }),
                ClassItem::Char('.'),
            ]
        );
    }

    #[test]
    fn test_leading_bracket_is_literal_in_class() {
        let items = items("[]a]");
        let Element::Class(class) = &items[0].element else {
            panic!("expected class");
        };
        assert_eq!(class.items, vec![ClassItem::Char(']'), ClassItem::Char('a')]);
    }

    #[test]
    fn test_escape_values() {
        let values: Vec<Element> = items(r"\x41é\cJ\101").into_iter().map(|i| i.element).collect();
        assert_eq!(
            values,
            vec![
                Element::Char('A'),
                Element::Char('\u{e9}'),
                Element::Char('\n'),
                Element::Char('A'),
            ]
        );
    }

    // --- Options ---

    #[test]
    fn test_ignore_pattern_whitespace() {
        let options = PatternOptions::IGNORE_PATTERN_WHITESPACE;
        let tree = parse_str("a b # comment\n c", options);
        assert!(tree.diagnostics().is_empty());
        assert_eq!(tree.root().branches[0].items.len(), 3);
        // Whitespace inside a class is kept.
        let tree = parse_str("[ ]", options);
        let Element::Class(class) = &tree.root().branches[0].items[0].element else {
            panic!("expected class");
        };
        assert_eq!(class.items, vec![ClassItem::Char(' ')]);
    }

    #[test]
    fn test_inline_whitespace_option_is_scoped() {
        let tree = parse_str("(?x: a b ) c", PatternOptions::NONE);
        let items = &tree.root().branches[0].items;
        // group, ' ', 'c'
        assert_eq!(items.len(), 3);
        let Element::Group(group) = &items[0].element else {
            panic!("expected group");
        };
        assert_eq!(group.body.branches[0].items.len(), 2);
    }

    #[test]
    fn test_explicit_capture() {
        let tree = parse_str("(a)(?<n>b)", PatternOptions::EXPLICIT_CAPTURE);
        let Element::Group(group) = &tree.root().branches[0].items[0].element else {
            panic!("expected group");
        };
        assert_eq!(group.kind, GroupKind::NonCapture);
        assert_eq!(tree.capture_names(), ["0", "n"]);
    }

    #[test]
    fn test_inline_explicit_capture_makes_reference_undefined() {
        assert_eq!(
            kinds(r"(?n)(a)\1", PatternOptions::NONE),
            vec![DiagnosticKind::UndefinedGroupNumber(1)]
        );
    }

    #[parameterized(
        ignore_case = { PatternOptions::IGNORE_CASE, false },
        multiline_compiled = { PatternOptions::from_bits(2 | 8), false },
        singleline = { PatternOptions::SINGLELINE, true },
        right_to_left = { PatternOptions::RIGHT_TO_LEFT, true },
    )]
    fn test_ecma_script_combinations(extra: PatternOptions, diagnosed: bool) {
        let found = kinds("a", PatternOptions::ECMA_SCRIPT | extra);
        assert_eq!(found.contains(&DiagnosticKind::IncompatibleEcmaScriptOptions), diagnosed);
    }

    // --- Diagnostics ---

    #[parameterized(
        too_many_parens = { "a)b", DiagnosticKind::TooManyParens },
        not_enough_parens = { "(a", DiagnosticKind::NotEnoughParens },
        unterminated_class = { "[a-", DiagnosticKind::UnterminatedClass },
        unterminated_comment = { "(?#abc", DiagnosticKind::UnterminatedComment },
        quantifier_after_nothing = { "*a", DiagnosticKind::QuantifierAfterNothing },
        quantifier_after_bar = { "a|+", DiagnosticKind::QuantifierAfterNothing },
        quantifier_after_options = { "(?i)*", DiagnosticKind::QuantifierAfterNothing },
        nested_quantifier = { "a**", DiagnosticKind::NestedQuantifier('*') },
        nested_lazy = { "a+??", DiagnosticKind::NestedQuantifier('?') },
        reversed_quantifier = { "a{3,2}", DiagnosticKind::ReversedQuantifierRange },
        reversed_range = { "[z-a]", DiagnosticKind::ReversedClassRange },
        class_in_range = { r"[a-\d]", DiagnosticKind::ClassInRange },
        trailing_backslash = { "ab\\", DiagnosticKind::IllegalEndEscape },
        unrecognized_escape = { r"\q", DiagnosticKind::UnrecognizedEscape('q') },
        short_hex = { r"\x4", DiagnosticKind::InsufficientHexDigits },
        missing_control = { r"\c", DiagnosticKind::MissingControlChar },
        malformed_category = { r"\p{L", DiagnosticKind::MalformedCategory },
        unknown_category = { r"\p{Bogus}", DiagnosticKind::UnknownCategory("Bogus".into()) },
        malformed_reference = { r"\k<a", DiagnosticKind::MalformedNamedReference },
        undefined_number = { r"(a)\2", DiagnosticKind::UndefinedGroupNumber(2) },
        undefined_name = { r"(?<a>x)\k<b>", DiagnosticKind::UndefinedGroupName("b".into()) },
        invalid_group_name = { "(?<>a)", DiagnosticKind::InvalidGroupName },
        unrecognized_grouping = { "(?~a)", DiagnosticKind::UnrecognizedGrouping },
        too_many_alternates = { "(?(a)b|c|d)", DiagnosticKind::TooManyAlternates },
    )]
    fn test_diagnostics(pattern: &str, expected: DiagnosticKind) {
        let found = kinds(pattern, PatternOptions::NONE);
        assert!(found.contains(&expected), "{pattern}: {found:?}");
    }

    #[test]
    fn test_forward_reference_is_allowed() {
        assert!(kinds(r"\1(a)", PatternOptions::NONE).is_empty());
    }

    #[test]
    fn test_parsing_continues_after_errors() {
        let tree = parse_str("a)b(c", PatternOptions::NONE);
        assert_eq!(tree.diagnostics().len(), 2);
        let items = &tree.root().branches[0].items;
        assert_eq!(items.len(), 3);
        assert!(matches!(items[2].element, Element::Group(_)));
    }

    #[test]
    fn test_diagnostic_spans_are_char_indices() {
        let tree = parse_str("é)", PatternOptions::NONE);
        assert_eq!(tree.diagnostics()[0].span, 1..2);
        // The source span goes through the virtual chars: 'é' is two bytes.
        assert_eq!(tree.source_span(&tree.diagnostics()[0].span), TextSpan::new(2, 3));
    }
}
