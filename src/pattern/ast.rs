//! Tree types for parsed regular expressions.
//!
//! Spans are ranges of virtual-char indices into the literal the pattern was
//! parsed from, not byte offsets in the source file.

use std::ops::Range;

use crate::detect::PatternOptions;

pub type Span = Range<usize>;

/// An alternation of one or more sequences (`|`-separated).
#[derive(Debug, Clone, PartialEq)]
pub struct Alternation {
    pub branches: Vec<Sequence>,
    pub span: Span,
}

/// A concatenation of items.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub items: Vec<Item>,
    pub span: Span,
}

/// One element with an optional quantifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub element: Element,
    pub quantifier: Option<Quantifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quantifier {
    pub kind: QuantifierKind,
    pub lazy: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    ZeroOrMore,
    OneOrMore,
    ZeroOrOne,
    Exactly(u32),
    AtLeast(u32),
    Between(u32, u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Char(char),
    /// `.`
    Any,
    Anchor(Anchor),
    ClassEscape(ClassEscape),
    Class(CharClass),
    Group(Group),
    Backreference(Reference),
    /// `(?imnsx-imnsx)`, applying to the rest of the enclosing group.
    InlineOptions {
        on: PatternOptions,
        off: PatternOptions,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    StartOfLine,         // ^
    EndOfLine,           // $
    StartOfText,         // \A
    EndOfText,           // \z
    EndOfTextOrNewline,  // \Z
    WordBoundary,        // \b
    NonWordBoundary,     // \B
    ContiguousMatch,     // \G
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassEscape {
    Digit { negated: bool },
    Word { negated: bool },
    Space { negated: bool },
    /// `\p{Name}` or `\P{Name}`.
    Category { negated: bool, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharClass {
    pub negated: bool,
    pub items: Vec<ClassItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
    Escape(ClassEscape),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Number(u32),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub kind: GroupKind,
    pub body: Box<Alternation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupKind {
    /// Plain `(...)`, numbered left to right.
    Capture(u32),
    /// `(?<name>...)`, `(?'name'...)`, or balancing `(?<name-other>...)`.
    NamedCapture { name: String, balancing: Option<String> },
    NonCapture,
    Lookahead,
    NegativeLookahead,
    Lookbehind,
    NegativeLookbehind,
    Atomic,
    /// `(?imnsx-imnsx:...)`
    Options { on: PatternOptions, off: PatternOptions },
    /// `(?(name)yes|no)` or `(?(expression)yes|no)`.
    Conditional(Condition),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Reference(Reference),
    Expression(Box<Alternation>),
}
