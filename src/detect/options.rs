//! Pattern option flags.
//!
//! Values match the .NET `RegexOptions` enumeration, so constant option
//! arguments found in source map onto flags bit for bit.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use phf::{Map, phf_map};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PatternOptions(u32);

impl PatternOptions {
    pub const NONE: Self = Self(0);
    pub const IGNORE_CASE: Self = Self(1);
    pub const MULTILINE: Self = Self(2);
    pub const EXPLICIT_CAPTURE: Self = Self(4);
    pub const COMPILED: Self = Self(8);
    pub const SINGLELINE: Self = Self(16);
    pub const IGNORE_PATTERN_WHITESPACE: Self = Self(32);
    pub const RIGHT_TO_LEFT: Self = Self(64);
    pub const ECMA_SCRIPT: Self = Self(256);
    pub const CULTURE_INVARIANT: Self = Self(512);
    pub const NON_BACKTRACKING: Self = Self(1024);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Case-insensitive lookup of a flag by its .NET member name.
    pub fn from_name(name: &str) -> Option<Self> {
        OPTION_NAMES.get(name.to_ascii_lowercase().as_str()).copied()
    }
}

/// Display order and spelling of the named flags.
pub(crate) const NAMED_FLAGS: [(&str, PatternOptions); 10] = [
    ("IgnoreCase", PatternOptions::IGNORE_CASE),
    ("Multiline", PatternOptions::MULTILINE),
    ("ExplicitCapture", PatternOptions::EXPLICIT_CAPTURE),
    ("Compiled", PatternOptions::COMPILED),
    ("Singleline", PatternOptions::SINGLELINE),
    ("IgnorePatternWhitespace", PatternOptions::IGNORE_PATTERN_WHITESPACE),
    ("RightToLeft", PatternOptions::RIGHT_TO_LEFT),
    ("ECMAScript", PatternOptions::ECMA_SCRIPT),
    ("CultureInvariant", PatternOptions::CULTURE_INVARIANT),
    ("NonBacktracking", PatternOptions::NON_BACKTRACKING),
];

/// Lowercased option names accepted in directive comments.
static OPTION_NAMES: Map<&'static str, PatternOptions> = phf_map! {
    "none" => PatternOptions::NONE,
    "ignorecase" => PatternOptions::IGNORE_CASE,
    "multiline" => PatternOptions::MULTILINE,
    "explicitcapture" => PatternOptions::EXPLICIT_CAPTURE,
    "compiled" => PatternOptions::COMPILED,
    "singleline" => PatternOptions::SINGLELINE,
    "ignorepatternwhitespace" => PatternOptions::IGNORE_PATTERN_WHITESPACE,
    "righttoleft" => PatternOptions::RIGHT_TO_LEFT,
    "ecmascript" => PatternOptions::ECMA_SCRIPT,
    "cultureinvariant" => PatternOptions::CULTURE_INVARIANT,
    "nonbacktracking" => PatternOptions::NON_BACKTRACKING,
};

impl BitOr for PatternOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PatternOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PatternOptions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for PatternOptions {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for PatternOptions {
    /// `IgnoreCase, Multiline`, `None`, or the raw value for unnamed bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let mut rest = self.0;
        let mut first = true;
        for (name, flag) in NAMED_FLAGS {
            if self.contains(flag) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
                first = false;
                rest &= !flag.0;
            }
        }
        if rest != 0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{rest:#x}")?;
        }
        Ok(())
    }
}
