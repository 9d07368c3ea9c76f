//! Hand-written lexer producing tokens with attached trivia.
//!
//! Trivia attachment follows the usual C# rule: a token's trailing trivia runs
//! up to and including the first end-of-line after it; everything else is
//! leading trivia of the next token. The end-of-file token collects whatever
//! trivia is left.

use crate::text::{SourceText, TextSpan};

use super::error::{SyntaxError, SyntaxErrorKind};
use super::kind::{KEYWORDS, TokenKind, TriviaKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: TextSpan,
}

/// A token before it is placed in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexedToken {
    pub kind: TokenKind,
    pub span: TextSpan,
    pub leading: Vec<Trivia>,
    pub trailing: Vec<Trivia>,
}

/// Lex the whole text. The last token is always [`TokenKind::EndOfFile`].
pub fn lex(text: &SourceText) -> Result<Vec<LexedToken>, SyntaxError> {
    let mut lexer = Lexer {
        text,
        src: text.as_str(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    loop {
        let leading = lexer.lex_trivia(false)?;
        if lexer.pos >= lexer.src.len() {
            tokens.push(LexedToken {
                kind: TokenKind::EndOfFile,
                span: TextSpan::new(lexer.pos, lexer.pos),
                leading,
                trailing: Vec::new(),
            });
            return Ok(tokens);
        }
        let start = lexer.pos;
        let kind = lexer.lex_token()?;
        let span = TextSpan::new(start, lexer.pos);
        let trailing = lexer.lex_trivia(true)?;
        tokens.push(LexedToken {
            kind,
            span,
            leading,
            trailing,
        });
    }
}

struct Lexer<'a> {
    text: &'a SourceText,
    src: &'a str,
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn error_at(&self, offset: usize, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(kind, self.text.line_position(offset))
    }

    fn lex_trivia(&mut self, trailing: bool) -> Result<Vec<Trivia>, SyntaxError> {
        let mut trivia = Vec::new();
        loop {
            let start = self.pos;
            let kind = match self.peek() {
                Some(' ' | '\t' | '\x0b' | '\x0c') => {
                    while matches!(self.peek(), Some(' ' | '\t' | '\x0b' | '\x0c')) {
                        self.bump();
                    }
                    TriviaKind::Whitespace
                }
                Some('\r' | '\n') => {
                    if self.eat('\r') {
                        self.eat('\n');
                    } else {
                        self.bump();
                    }
                    trivia.push(Trivia {
                        kind: TriviaKind::EndOfLine,
                        span: TextSpan::new(start, self.pos),
                    });
                    if trailing {
                        return Ok(trivia);
                    }
                    continue;
                }
                Some('/') if self.peek_nth(1) == Some('/') => {
                    while !matches!(self.peek(), None | Some('\r' | '\n')) {
                        self.bump();
                    }
                    TriviaKind::SingleLineComment
                }
                Some('/') if self.peek_nth(1) == Some('*') => {
                    self.pos += 2;
                    match self.src[self.pos..].find("*/") {
                        Some(end) => self.pos += end + 2,
                        None => {
                            return Err(self.error_at(start, SyntaxErrorKind::UnterminatedComment));
                        }
                    }
                    TriviaKind::MultiLineComment
                }
                _ => return Ok(trivia),
            };
            trivia.push(Trivia {
                kind,
                span: TextSpan::new(start, self.pos),
            });
        }
    }

    fn lex_token(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        let Some(ch) = self.bump() else {
            return Ok(TokenKind::EndOfFile);
        };
        let kind = match ch {
            c if is_identifier_start(c) => self.lex_identifier_or_keyword(start),
            '@' if self.peek().is_some_and(is_identifier_start) => {
                self.lex_identifier_rest();
                TokenKind::Identifier
            }
            '@' if self.peek() == Some('$') && self.peek_nth(1) == Some('"') => {
                self.pos += 2;
                self.scan_verbatim_string(start)?;
                TokenKind::InterpolatedStringLiteral
            }
            '@' if self.eat('"') => {
                self.scan_verbatim_string(start)?;
                TokenKind::StringLiteral
            }
            '$' => self.lex_interpolated(start)?,
            '"' => {
                self.pos = start;
                self.lex_string(start)?
            }
            '\'' => {
                self.scan_quoted(start, '\'', SyntaxErrorKind::UnterminatedChar)?;
                TokenKind::CharLiteral
            }
            c if c.is_ascii_digit() => self.lex_number(c),
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '~' => TokenKind::Tilde,
            '*' => TokenKind::Asterisk,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' if self.eat('=') => TokenKind::EqualsEquals,
            '=' if self.eat('>') => TokenKind::EqualsGreater,
            '=' => TokenKind::Equals,
            '!' if self.eat('=') => TokenKind::ExclamationEquals,
            '!' => TokenKind::Exclamation,
            '<' if self.eat('=') => TokenKind::LessEquals,
            '<' if self.eat('<') => TokenKind::LessLess,
            '<' => TokenKind::Less,
            '>' if self.eat('=') => TokenKind::GreaterEquals,
            '>' if self.eat('>') => TokenKind::GreaterGreater,
            '>' => TokenKind::Greater,
            '+' if self.eat('=') => TokenKind::PlusEquals,
            '+' => TokenKind::Plus,
            '-' if self.eat('=') => TokenKind::MinusEquals,
            '-' => TokenKind::Minus,
            '&' if self.eat('&') => TokenKind::AmpersandAmpersand,
            '&' if self.eat('=') => TokenKind::AmpersandEquals,
            '&' => TokenKind::Ampersand,
            '|' if self.eat('|') => TokenKind::BarBar,
            '|' if self.eat('=') => TokenKind::BarEquals,
            '|' => TokenKind::Bar,
            '^' if self.eat('=') => TokenKind::CaretEquals,
            '^' => TokenKind::Caret,
            other => return Err(self.error_at(start, SyntaxErrorKind::UnexpectedChar(other))),
        };
        Ok(kind)
    }

    fn lex_identifier_rest(&mut self) {
        while self.peek().is_some_and(is_identifier_part) {
            self.bump();
        }
    }

    fn lex_identifier_or_keyword(&mut self, start: usize) -> TokenKind {
        self.lex_identifier_rest();
        KEYWORDS
            .get(&self.src[start..self.pos])
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn lex_number(&mut self, first: char) -> TokenKind {
        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.bump();
            }
        } else {
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
                self.bump();
            }
        }
        while matches!(self.peek(), Some('u' | 'U' | 'l' | 'L')) {
            self.bump();
        }
        TokenKind::IntegerLiteral
    }

    /// `$"..."`, `$@"..."`, `$"""..."""` (the `$` run is consumed here).
    fn lex_interpolated(&mut self, start: usize) -> Result<TokenKind, SyntaxError> {
        while self.eat('$') {}
        if self.eat('@') {
            if !self.eat('"') {
                return Err(self.error_at(start, SyntaxErrorKind::UnexpectedChar('@')));
            }
            self.scan_verbatim_string(start)?;
        } else if self.peek() == Some('"') {
            self.lex_string(start)?;
        } else {
            return Err(self.error_at(start, SyntaxErrorKind::UnexpectedChar('$')));
        }
        Ok(TokenKind::InterpolatedStringLiteral)
    }

    /// Regular or raw string starting at the current `"`.
    fn lex_string(&mut self, start: usize) -> Result<TokenKind, SyntaxError> {
        let quotes = self.src[self.pos..].chars().take_while(|&c| c == '"').count();
        if quotes >= 3 {
            self.pos += quotes;
            return self.scan_raw_string(start, quotes);
        }
        self.bump();
        self.scan_quoted(start, '"', SyntaxErrorKind::UnterminatedString)?;
        Ok(TokenKind::StringLiteral)
    }

    /// Scan to the closing `delim`, honoring backslash escapes. The opening
    /// delimiter has been consumed.
    fn scan_quoted(
        &mut self,
        start: usize,
        delim: char,
        unterminated: SyntaxErrorKind,
    ) -> Result<(), SyntaxError> {
        loop {
            match self.bump() {
                None | Some('\r' | '\n') => return Err(self.error_at(start, unterminated)),
                Some('\\') => {
                    if matches!(self.bump(), None | Some('\r' | '\n')) {
                        return Err(self.error_at(start, unterminated));
                    }
                }
                Some(c) if c == delim => return Ok(()),
                Some(_) => {}
            }
        }
    }

    /// Scan a verbatim string body; `""` is an escaped quote. The opening
    /// quote has been consumed.
    fn scan_verbatim_string(&mut self, start: usize) -> Result<(), SyntaxError> {
        loop {
            match self.bump() {
                None => return Err(self.error_at(start, SyntaxErrorKind::UnterminatedString)),
                Some('"') if self.eat('"') => {}
                Some('"') => return Ok(()),
                Some(_) => {}
            }
        }
    }

    /// The opening run of `quotes` quotes has been consumed.
    fn scan_raw_string(&mut self, start: usize, quotes: usize) -> Result<TokenKind, SyntaxError> {
        let rest_of_line = self.src[self.pos..]
            .split(['\r', '\n'])
            .next()
            .unwrap_or_default();
        let multi_line = rest_of_line.trim().is_empty() && self.pos + rest_of_line.len() < self.src.len();

        if !multi_line {
            let line_end = self.pos + rest_of_line.len();
            let closing = "\"".repeat(quotes);
            return match self.src[self.pos..line_end].find(&closing) {
                Some(0) => Err(self.error_at(start, SyntaxErrorKind::InvalidRawStringStart)),
                Some(offset) => {
                    self.pos += offset + quotes;
                    if self.peek() == Some('"') {
                        return Err(self.error_at(start, SyntaxErrorKind::UnterminatedRawString));
                    }
                    Ok(TokenKind::SingleLineRawStringLiteral)
                }
                None => Err(self.error_at(start, SyntaxErrorKind::UnterminatedRawString)),
            };
        }

        // Skip to the start of the first content line, then look for a line
        // that consists of indentation followed by the closing quotes.
        self.pos += rest_of_line.len();
        if !self.eat('\r') {
            self.bump();
        } else {
            self.eat('\n');
        }
        loop {
            if self.pos >= self.src.len() {
                return Err(self.error_at(start, SyntaxErrorKind::UnterminatedRawString));
            }
            let line_start = self.pos;
            let line = self.src[line_start..]
                .split(['\r', '\n'])
                .next()
                .unwrap_or_default();
            let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
            let after_indent = &line[indent..];
            let run = after_indent.chars().take_while(|&c| c == '"').count();
            if run >= quotes {
                if run > quotes {
                    return Err(self.error_at(start, SyntaxErrorKind::UnterminatedRawString));
                }
                self.pos = line_start + indent + quotes;
                return Ok(TokenKind::MultiLineRawStringLiteral);
            }
            self.pos = line_start + line.len();
            if !self.eat('\r') {
                self.bump();
            } else {
                self.eat('\n');
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(&SourceText::new(src))
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn texts(src: &str) -> Vec<String> {
        let text = SourceText::new(src);
        lex(&text)
            .unwrap()
            .into_iter()
            .map(|t| text.slice(t.span).to_string())
            .collect()
    }

    fn lex_err(src: &str) -> SyntaxErrorKind {
        lex(&SourceText::new(src)).unwrap_err().kind
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(
            kinds("public static Regex var"),
            vec![
                TokenKind::Public,
                TokenKind::Static,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::EndOfFile
            ]
        );
    }

    #[test]
    fn test_verbatim_identifier() {
        assert_eq!(texts("@class x"), vec!["@class", "x", ""]);
        assert_eq!(kinds("@class")[0], TokenKind::Identifier);
    }

    #[test]
    fn test_regular_string_with_escapes() {
        assert_eq!(texts(r#""a\"b" x"#), vec![r#""a\"b""#, "x", ""]);
        assert_eq!(kinds(r#""a\"b""#)[0], TokenKind::StringLiteral);
    }

    #[test]
    fn test_verbatim_string() {
        assert_eq!(texts(r#"@"a""b\" ;"#), vec![r#"@"a""b\""#, ";", ""]);
        assert_eq!(kinds(r#"@"x""#)[0], TokenKind::StringLiteral);
    }

    #[test]
    fn test_empty_string_is_not_raw() {
        assert_eq!(kinds(r#""""#)[0], TokenKind::StringLiteral);
    }

    #[test]
    fn test_single_line_raw_string() {
        assert_eq!(kinds(r#""""a"b""" x"#)[0], TokenKind::SingleLineRawStringLiteral);
        assert_eq!(texts(r#""""a"b""" x"#)[0], r#""""a"b""""#);
    }

    #[test]
    fn test_multi_line_raw_string() {
        let src = "x = \"\"\"\n    a+\n    \"\"\";";
        let text = SourceText::new(src);
        let tokens = lex(&text).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::MultiLineRawStringLiteral);
        assert_eq!(text.slice(tokens[2].span), "\"\"\"\n    a+\n    \"\"\"");
        assert_eq!(tokens[3].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_interpolated_string() {
        assert_eq!(kinds(r#"$"a{b}""#)[0], TokenKind::InterpolatedStringLiteral);
        assert_eq!(kinds(r#"$@"a""#)[0], TokenKind::InterpolatedStringLiteral);
        assert_eq!(kinds(r#"@$"a""#)[0], TokenKind::InterpolatedStringLiteral);
    }

    #[test]
    fn test_operators_maximal_munch() {
        assert_eq!(
            kinds("|= || | => == <<"),
            vec![
                TokenKind::BarEquals,
                TokenKind::BarBar,
                TokenKind::Bar,
                TokenKind::EqualsGreater,
                TokenKind::EqualsEquals,
                TokenKind::LessLess,
                TokenKind::EndOfFile
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(texts("0x1F 1_000L 7"), vec!["0x1F", "1_000L", "7", ""]);
    }

    #[test]
    fn test_trailing_trivia_stops_after_newline() {
        let text = SourceText::new("a // one\n// two\nb");
        let tokens = lex(&text).unwrap();
        let a = &tokens[0];
        assert_eq!(
            a.trailing.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TriviaKind::Whitespace,
                TriviaKind::SingleLineComment,
                TriviaKind::EndOfLine
            ]
        );
        let b = &tokens[1];
        assert_eq!(text.slice(b.leading[0].span), "// two");
        assert_eq!(b.leading[1].kind, TriviaKind::EndOfLine);
    }

    #[test]
    fn test_block_comment_trivia() {
        let text = SourceText::new("/* c */ x");
        let tokens = lex(&text).unwrap();
        assert_eq!(tokens[0].leading[0].kind, TriviaKind::MultiLineComment);
        assert_eq!(text.slice(tokens[0].leading[0].span), "/* c */");
    }

    #[test]
    fn test_end_of_file_collects_trivia() {
        let tokens = lex(&SourceText::new("x\n// tail")).unwrap();
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::EndOfFile);
        assert_eq!(eof.leading[0].kind, TriviaKind::SingleLineComment);
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(lex_err("\"abc"), SyntaxErrorKind::UnterminatedString);
        assert_eq!(lex_err("\"abc\nd\""), SyntaxErrorKind::UnterminatedString);
    }

    #[test]
    fn test_unterminated_raw_string() {
        assert_eq!(lex_err("\"\"\"\nabc\n"), SyntaxErrorKind::UnterminatedRawString);
    }

    #[test]
    fn test_unterminated_comment() {
        assert_eq!(lex_err("/* abc"), SyntaxErrorKind::UnterminatedComment);
    }

    #[test]
    fn test_unexpected_char() {
        assert_eq!(lex_err("#"), SyntaxErrorKind::UnexpectedChar('#'));
    }
}
