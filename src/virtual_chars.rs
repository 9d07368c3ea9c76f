//! Decoding string literal tokens into virtual characters.
//!
//! A virtual character is one character of the literal's runtime value
//! together with the span of source text that produced it, so `\n` is a
//! single virtual char covering two bytes of source.

use std::ops::{Index, Range};

use crate::syntax::{SyntaxTree, TokenId, TokenKind};
use crate::text::TextSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualChar {
    pub ch: char,
    pub span: TextSpan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualCharSequence {
    chars: Vec<VirtualChar>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VirtualCharError {
    #[error("token of kind {0:?} is not a plain string literal")]
    NotAStringLiteral(TokenKind),
    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
    #[error("escape at offset {0} does not denote a valid character")]
    InvalidCodePoint(usize),
    #[error("raw string line at offset {0} does not start with the closing line's indentation")]
    MissingIndentation(usize),
}

impl VirtualCharSequence {
    pub fn new(chars: Vec<VirtualChar>) -> Self {
        Self { chars }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VirtualChar> {
        self.chars.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualChar> {
        self.chars.iter()
    }

    /// The decoded value.
    pub fn text(&self) -> String {
        self.chars.iter().map(|vc| vc.ch).collect()
    }

    /// Source span covered by the virtual chars in `range`. An empty range maps
    /// to an empty span at the position it would start.
    pub fn source_span(&self, range: Range<usize>) -> TextSpan {
        let start = range.start.min(self.chars.len());
        let end = range.end.min(self.chars.len());
        if start >= end {
            let at = match self.chars.get(start) {
                Some(vc) => vc.span.start,
                None => self.chars.last().map_or(0, |vc| vc.span.end),
            };
            return TextSpan::new(at, at);
        }
        self.chars[start].span.cover(self.chars[end - 1].span)
    }
}

impl Index<usize> for VirtualCharSequence {
    type Output = VirtualChar;

    fn index(&self, index: usize) -> &VirtualChar {
        &self.chars[index]
    }
}

/// Decode a string literal token of `tree`.
pub fn convert(tree: &SyntaxTree, token: TokenId) -> Result<VirtualCharSequence, VirtualCharError> {
    let kind = tree.token_kind(token);
    let base = tree.token(token).span.start;
    convert_text(kind, tree.token_text(token), base)
}

/// Decode literal `text` of the given kind that starts at byte `base`.
pub fn convert_text(kind: TokenKind, text: &str, base: usize) -> Result<VirtualCharSequence, VirtualCharError> {
    let chars = match kind {
        TokenKind::StringLiteral if text.starts_with('@') => convert_verbatim(text, base),
        TokenKind::StringLiteral => convert_regular(text, base)?,
        TokenKind::SingleLineRawStringLiteral => convert_raw_single_line(text, base),
        TokenKind::MultiLineRawStringLiteral => convert_raw_multi_line(text, base)?,
        other => return Err(VirtualCharError::NotAStringLiteral(other)),
    };
    Ok(VirtualCharSequence::new(chars))
}

fn push_plain(out: &mut Vec<VirtualChar>, text: &str, offset: usize) {
    out.extend(text.char_indices().map(|(i, ch)| VirtualChar {
        ch,
        span: TextSpan::new(offset + i, offset + i + ch.len_utf8()),
    }));
}

fn convert_verbatim(text: &str, base: usize) -> Vec<VirtualChar> {
    // @" ... "
    let body = &text[2..text.len().saturating_sub(1).max(2)];
    let offset = base + 2;
    let mut out = Vec::with_capacity(body.len());
    let mut iter = body.char_indices().peekable();
    while let Some((i, ch)) = iter.next() {
        let mut end = i + ch.len_utf8();
        if ch == '"' && iter.peek().is_some_and(|&(_, c)| c == '"') {
            iter.next();
            end += 1;
        }
        out.push(VirtualChar {
            ch,
            span: TextSpan::new(offset + i, offset + end),
        });
    }
    out
}

fn parse_hex(digits: &str) -> Option<u32> {
    u32::from_str_radix(digits, 16).ok()
}

/// One decoded UTF-16 code unit or full code point with its span.
struct Unit {
    value: u32,
    span: TextSpan,
}

fn convert_regular(text: &str, base: usize) -> Result<Vec<VirtualChar>, VirtualCharError> {
    let body = &text[1..text.len().saturating_sub(1).max(1)];
    let offset = base + 1;
    let mut units = Vec::with_capacity(body.len());
    let mut i = 0;
    while let Some(ch) = body[i..].chars().next() {
        let start = i;
        if ch != '\\' {
            i += ch.len_utf8();
            units.push(Unit {
                value: ch as u32,
                span: TextSpan::new(offset + start, offset + i),
            });
            continue;
        }
        let Some(escape) = body[i + 1..].chars().next() else {
            return Err(VirtualCharError::InvalidEscape(offset + start));
        };
        i += 1 + escape.len_utf8();
        let value = match escape {
            '\'' => '\'' as u32,
            '"' => '"' as u32,
            '\\' => '\\' as u32,
            '0' => 0,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0C,
            'n' => '\n' as u32,
            'r' => '\r' as u32,
            't' => '\t' as u32,
            'v' => 0x0B,
            'x' => {
                let digits: usize = body[i..]
                    .chars()
                    .take(4)
                    .take_while(char::is_ascii_hexdigit)
                    .count();
                if digits == 0 {
                    return Err(VirtualCharError::InvalidEscape(offset + start));
                }
                let value = parse_hex(&body[i..i + digits])
                    .ok_or(VirtualCharError::InvalidEscape(offset + start))?;
                i += digits;
                value
            }
            'u' | 'U' => {
                let width = if escape == 'u' { 4 } else { 8 };
                let digits = body
                    .get(i..i + width)
                    .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
                    .ok_or(VirtualCharError::InvalidEscape(offset + start))?;
                let value = parse_hex(digits).ok_or(VirtualCharError::InvalidEscape(offset + start))?;
                i += width;
                if value > 0x10FFFF {
                    return Err(VirtualCharError::InvalidCodePoint(offset + start));
                }
                value
            }
            _ => return Err(VirtualCharError::InvalidEscape(offset + start)),
        };
        units.push(Unit {
            value,
            span: TextSpan::new(offset + start, offset + i),
        });
    }
    combine_surrogates(units)
}

fn combine_surrogates(units: Vec<Unit>) -> Result<Vec<VirtualChar>, VirtualCharError> {
    let mut out = Vec::with_capacity(units.len());
    let mut iter = units.into_iter().peekable();
    while let Some(unit) = iter.next() {
        let (value, span) = match unit.value {
            0xD800..=0xDBFF => match iter.peek() {
                Some(low) if (0xDC00..=0xDFFF).contains(&low.value) => {
                    let value = 0x10000 + ((unit.value - 0xD800) << 10) + (low.value - 0xDC00);
                    let span = unit.span.cover(low.span);
                    iter.next();
                    (value, span)
                }
                _ => return Err(VirtualCharError::InvalidCodePoint(unit.span.start)),
            },
            _ => (unit.value, unit.span),
        };
        let ch = char::from_u32(value).ok_or(VirtualCharError::InvalidCodePoint(span.start))?;
        out.push(VirtualChar { ch, span });
    }
    Ok(out)
}

fn quote_count(text: &str) -> usize {
    text.chars().take_while(|&c| c == '"').count()
}

fn convert_raw_single_line(text: &str, base: usize) -> Vec<VirtualChar> {
    let quotes = quote_count(text);
    let body = &text[quotes..text.len().saturating_sub(quotes).max(quotes)];
    let mut out = Vec::with_capacity(body.len());
    push_plain(&mut out, body, base + quotes);
    out
}

fn convert_raw_multi_line(text: &str, base: usize) -> Result<Vec<VirtualChar>, VirtualCharError> {
    let quotes = quote_count(text);
    let open_end = match text[quotes..].find('\n') {
        Some(i) => quotes + i + 1,
        None => return Ok(Vec::new()),
    };
    let close_line_start = text.rfind('\n').map_or(text.len(), |i| i + 1);
    let indent_len = text[close_line_start..]
        .chars()
        .take_while(|&c| c == ' ' || c == '\t')
        .count();
    let indent = &text[close_line_start..close_line_start + indent_len];

    let break_len = if text[..close_line_start].ends_with("\r\n") { 2 } else { 1 };
    let content_end = close_line_start.saturating_sub(break_len);
    if content_end <= open_end {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let mut line_start = open_end;
    while line_start <= content_end {
        let rest = &text[line_start..content_end];
        let line_len = rest.find(['\r', '\n']).unwrap_or(rest.len());
        let line = &rest[..line_len];
        if !line.trim_matches([' ', '\t']).is_empty() {
            let Some(stripped) = line.strip_prefix(indent) else {
                return Err(VirtualCharError::MissingIndentation(base + line_start));
            };
            push_plain(&mut out, stripped, base + line_start + indent_len);
        }
        let break_start = line_start + line_len;
        if break_start >= content_end {
            break;
        }
        let terminator = if text[break_start..].starts_with("\r\n") { "\r\n" } else { &text[break_start..break_start + 1] };
        push_plain(&mut out, terminator, base + break_start);
        line_start = break_start + terminator.len();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn decode(kind: TokenKind, text: &str) -> String {
        convert_text(kind, text, 0).unwrap().text()
    }

    // --- Regular strings ---

    #[parameterized(
        plain = { r#""abc""#, "abc" },
        empty = { r#""""#, "" },
        newline = { r#""a\nb""#, "a\nb" },
        backslash_d = { r#""\\d+""#, "\\d+" },
        quote = { r#""say \"hi\"""#, "say \"hi\"" },
        hex_short = { r#""\x41""#, "A" },
        hex_stops_at_four = { r#""\x00411""#, "A1" },
        unicode = { r#""\u00E9""#, "\u{e9}" },
        long_unicode = { r#""\U0001F600""#, "\u{1F600}" },
        surrogate_pair = { r#""\uD83D\uDE00""#, "\u{1F600}" },
        null_char = { r#""\0""#, "\0" },
    )]
    fn test_regular_escapes(source: &str, expected: &str) {
        assert_eq!(decode(TokenKind::StringLiteral, source), expected);
    }

    #[parameterized(
        unknown = { r#""\q""# },
        short_unicode = { r#""\u12""# },
        bare_hex = { r#""\xg""# },
        lone_surrogate = { r#""\uD83D""# },
        out_of_range = { r#""\U00110000""# },
    )]
    fn test_regular_escape_errors(source: &str) {
        assert!(convert_text(TokenKind::StringLiteral, source, 0).is_err());
    }

    #[test]
    fn test_escape_spans() {
        let seq = convert_text(TokenKind::StringLiteral, r#""a\tb""#, 10).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq[0].span, TextSpan::new(11, 12));
        assert_eq!(seq[1].span, TextSpan::new(12, 14));
        assert_eq!(seq[2].span, TextSpan::new(14, 15));
        assert_eq!(seq.source_span(1..3), TextSpan::new(12, 15));
        assert_eq!(seq.source_span(3..3), TextSpan::new(15, 15));
    }

    // --- Verbatim strings ---

    #[test]
    fn test_verbatim_keeps_backslashes() {
        assert_eq!(decode(TokenKind::StringLiteral, r#"@"\d+\.""#), "\\d+\\.");
    }

    #[test]
    fn test_verbatim_doubled_quote() {
        let seq = convert_text(TokenKind::StringLiteral, r#"@"a""b""#, 0).unwrap();
        assert_eq!(seq.text(), "a\"b");
        assert_eq!(seq[1].span, TextSpan::new(3, 5));
    }

    // --- Raw strings ---

    #[test]
    fn test_raw_single_line() {
        assert_eq!(
            decode(TokenKind::SingleLineRawStringLiteral, r#""""a"b\d""""#),
            "a\"b\\d"
        );
    }

    #[test]
    fn test_raw_multi_line_strips_indentation() {
        let text = "\"\"\"\n    a+\n      b\n\n    \"\"\"";
        assert_eq!(decode(TokenKind::MultiLineRawStringLiteral, text), "a+\n  b\n");
    }

    #[test]
    fn test_raw_multi_line_crlf() {
        let text = "\"\"\"\r\n  x\r\n  y\r\n  \"\"\"";
        assert_eq!(decode(TokenKind::MultiLineRawStringLiteral, text), "x\r\ny");
    }

    #[test]
    fn test_raw_multi_line_missing_indentation() {
        let text = "\"\"\"\n  a\n b\n  \"\"\"";
        assert_eq!(
            convert_text(TokenKind::MultiLineRawStringLiteral, text, 0),
            Err(VirtualCharError::MissingIndentation(8))
        );
    }

    #[test]
    fn test_interpolated_is_rejected() {
        assert_eq!(
            convert_text(TokenKind::InterpolatedStringLiteral, r#"$"a""#, 0),
            Err(VirtualCharError::NotAStringLiteral(TokenKind::InterpolatedStringLiteral))
        );
    }
}
