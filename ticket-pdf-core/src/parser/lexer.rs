//! PDF Lexer
//!
//! Tokenizes a PDF byte buffer. The same lexer drives the file-level object
//! parser and the content-stream tokenizer; words that are not structural
//! keywords come back as [`Token::Keyword`] so that content-stream operators
//! pass through untouched.

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// Literal string `(...)`
    String(Vec<u8>),

    /// Hexadecimal string `<...>`
    HexString(Vec<u8>),

    /// Name object (e.g., /Type)
    Name(String),

    /// Array start [
    ArrayStart,

    /// Array end ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    /// Stream keyword
    Stream,

    /// Endstream keyword
    EndStream,

    /// Obj keyword
    Obj,

    /// Endobj keyword
    EndObj,

    /// Startxref keyword
    StartXRef,

    /// Any other bare word: `R`, `xref`, `trailer`, `n`, `f`, content operators
    Keyword(String),

    /// Null object
    Null,

    /// End of file
    Eof,
}

impl Token {
    /// Text of a bare word token, including the structural keywords.
    pub fn keyword_text(&self) -> Option<&str> {
        match self {
            Token::Keyword(word) => Some(word),
            Token::Stream => Some("stream"),
            Token::EndStream => Some("endstream"),
            Token::Obj => Some("obj"),
            Token::EndObj => Some("endobj"),
            Token::StartXRef => Some("startxref"),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.keyword_text() == Some(keyword)
    }
}

pub(crate) fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}

pub(crate) fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

pub(crate) fn is_regular(ch: u8) -> bool {
    !is_whitespace(ch) && !is_delimiter(ch)
}

/// PDF Lexer over an in-memory buffer
pub struct Lexer<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, position: 0 }
    }

    /// Lexer positioned at `position`.
    pub fn at(input: &'a [u8], position: usize) -> Self {
        Self {
            input,
            position: position.min(input.len()),
        }
    }

    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.input.len());
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();

        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => self.read_angle_bracket(),
            b'>' => {
                self.position += 1;
                if self.peek_char() == Some(b'>') {
                    self.position += 1;
                    Ok(Token::DictEnd)
                } else {
                    Err(ParseError::syntax(self.position, "Expected '>' after '>'"))
                }
            }
            b'[' => {
                self.position += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.position += 1;
                Ok(Token::ArrayEnd)
            }
            b'{' | b'}' | b')' => {
                self.position += 1;
                Ok(Token::Keyword((ch as char).to_string()))
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.read_number(),
            _ => self.read_keyword(),
        }
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> ParseResult<Token> {
        let saved = self.position;
        let token = self.next_token();
        self.position = saved;
        token
    }

    fn peek_char(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    fn consume_char(&mut self) -> Option<u8> {
        let ch = self.peek_char()?;
        self.position += 1;
        Some(ch)
    }

    /// Skip whitespace and comments
    pub fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.position += 1;
            } else if ch == b'%' {
                while let Some(ch) = self.consume_char() {
                    if ch == b'\n' || ch == b'\r' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Read a name token
    fn read_name(&mut self) -> ParseResult<Token> {
        self.position += 1; // consume '/'
        let mut name = Vec::new();

        while let Some(ch) = self.peek_char() {
            if !is_regular(ch) {
                break;
            }
            self.position += 1;
            if ch == b'#' {
                let hex = self.input.get(self.position..self.position + 2);
                match hex.and_then(|h| std::str::from_utf8(h).ok()) {
                    Some(h) => match u8::from_str_radix(h, 16) {
                        Ok(byte) => {
                            name.push(byte);
                            self.position += 2;
                        }
                        Err(_) => name.push(ch),
                    },
                    None => name.push(ch),
                }
            } else {
                name.push(ch);
            }
        }

        Ok(Token::Name(String::from_utf8_lossy(&name).into_owned()))
    }

    /// Read a literal string
    fn read_literal_string(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.position += 1; // consume '('
        let mut string = Vec::new();
        let mut paren_depth = 1;

        while paren_depth > 0 {
            let ch = self
                .consume_char()
                .ok_or_else(|| ParseError::syntax(start, "Unterminated string"))?;

            match ch {
                b'\\' => {
                    let escaped = self
                        .consume_char()
                        .ok_or_else(|| ParseError::syntax(start, "Unterminated string"))?;
                    match escaped {
                        b'n' => string.push(b'\n'),
                        b'r' => string.push(b'\r'),
                        b't' => string.push(b'\t'),
                        b'b' => string.push(b'\x08'),
                        b'f' => string.push(b'\x0C'),
                        b'0'..=b'7' => {
                            let mut value = (escaped - b'0') as u16;
                            for _ in 0..2 {
                                match self.peek_char() {
                                    Some(next @ b'0'..=b'7') => {
                                        self.position += 1;
                                        value = value * 8 + (next - b'0') as u16;
                                    }
                                    _ => break,
                                }
                            }
                            string.push((value & 0xFF) as u8);
                        }
                        // line continuation
                        b'\r' => {
                            if self.peek_char() == Some(b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        other => string.push(other),
                    }
                }
                b'(' => {
                    string.push(ch);
                    paren_depth += 1;
                }
                b')' => {
                    paren_depth -= 1;
                    if paren_depth > 0 {
                        string.push(ch);
                    }
                }
                _ => string.push(ch),
            }
        }

        Ok(Token::String(string))
    }

    /// Read hex string or dictionary start
    fn read_angle_bracket(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.position += 1; // consume '<'

        if self.peek_char() == Some(b'<') {
            self.position += 1;
            return Ok(Token::DictStart);
        }

        let mut digits = Vec::new();
        loop {
            let ch = self
                .consume_char()
                .ok_or_else(|| ParseError::syntax(start, "Unterminated hex string"))?;
            match ch {
                b'>' => break,
                c if c.is_ascii_hexdigit() => digits.push(c),
                c if is_whitespace(c) => {}
                c => {
                    return Err(ParseError::syntax(
                        self.position - 1,
                        format!("Invalid hex digit '{}'", c as char),
                    ))
                }
            }
        }

        if digits.len() % 2 != 0 {
            digits.push(b'0');
        }

        let bytes = digits
            .chunks(2)
            .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
            .collect();

        Ok(Token::HexString(bytes))
    }

    /// Read a number (integer or real)
    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position;
        let mut text = String::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                b'0'..=b'9' | b'.' | b'+' | b'-' => {
                    text.push(ch as char);
                    self.position += 1;
                }
                _ => break,
            }
        }

        // Producers occasionally emit doubled signs such as "--5"
        let normalized = normalize_sign(&text);

        if normalized.contains('.') {
            let value = normalized
                .parse::<f64>()
                .map_err(|_| ParseError::syntax(start, format!("Invalid number '{text}'")))?;
            Ok(Token::Real(value))
        } else if normalized.is_empty() || normalized == "-" {
            Ok(Token::Integer(0))
        } else {
            match normalized.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(value)),
                Err(_) => normalized
                    .parse::<f64>()
                    .map(Token::Real)
                    .map_err(|_| ParseError::syntax(start, format!("Invalid number '{text}'"))),
            }
        }
    }

    /// Read a keyword (bare word)
    fn read_keyword(&mut self) -> ParseResult<Token> {
        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if !is_regular(ch) {
                break;
            }
            self.position += 1;
        }

        if start == self.position {
            // a lone delimiter we do not otherwise handle
            self.position += 1;
        }

        let word = String::from_utf8_lossy(&self.input[start..self.position]).into_owned();
        Ok(self.process_keyword(word))
    }

    fn process_keyword(&self, word: String) -> Token {
        match word.as_str() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            "stream" => Token::Stream,
            "endstream" => Token::EndStream,
            "obj" => Token::Obj,
            "endobj" => Token::EndObj,
            "startxref" => Token::StartXRef,
            _ => Token::Keyword(word),
        }
    }

    /// Consume the end-of-line marker that follows the `stream` keyword
    pub fn read_newline(&mut self) {
        match self.peek_char() {
            Some(b'\r') => {
                self.position += 1;
                if self.peek_char() == Some(b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }
    }

    /// Read exactly n bytes
    pub fn read_bytes(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(n)
            .filter(|end| *end <= self.input.len())
            .ok_or_else(|| ParseError::syntax(self.position, "Unexpected end of input"))?;
        let bytes = &self.input[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Offset of the next occurrence of `sequence` at or after the current position
    pub fn find(&self, sequence: &[u8]) -> Option<usize> {
        find_subsequence(&self.input[self.position..], sequence).map(|i| i + self.position)
    }

    /// Expect a specific keyword
    pub fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        let position = self.position;
        let token = self.next_token()?;
        if token.is_keyword(keyword) {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                position,
                expected: keyword.to_string(),
                found: format!("{token:?}"),
            })
        }
    }
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

fn normalize_sign(text: &str) -> String {
    let body = text.trim_start_matches(['+', '-']);
    let negative = text.len() > body.len() && text.starts_with('-');
    let mut body: String = body.chars().filter(|c| *c != '+' && *c != '-').collect();
    if body.starts_with('.') {
        body.insert(0, '0');
    }
    if body.ends_with('.') {
        body.push('0');
    }
    if negative {
        format!("-{body}")
    } else {
        body
    }
}

pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub(crate) fn rfind_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_lexer_basic_tokens() {
        assert_eq!(
            tokens(b"true false null 123 -456 3.14 /Name"),
            vec![
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Null,
                Token::Integer(123),
                Token::Integer(-456),
                Token::Real(3.14),
                Token::Name("Name".to_string()),
            ]
        );
    }

    #[test]
    fn test_lexer_real_edge_cases() {
        assert_eq!(
            tokens(b".5 -.25 4. --3"),
            vec![
                Token::Real(0.5),
                Token::Real(-0.25),
                Token::Real(4.0),
                Token::Integer(-3),
            ]
        );
    }

    #[test]
    fn test_lexer_strings() {
        assert_eq!(
            tokens(b"(Hello \\(World\\)) (a(b)c) (\\101\\n) <48 65 6c6c6f> <7>"),
            vec![
                Token::String(b"Hello (World)".to_vec()),
                Token::String(b"a(b)c".to_vec()),
                Token::String(b"A\n".to_vec()),
                Token::HexString(b"Hello".to_vec()),
                Token::HexString(vec![0x70]),
            ]
        );
    }

    #[test]
    fn test_lexer_string_line_continuation() {
        assert_eq!(
            tokens(b"(Platz\\\nkarte)"),
            vec![Token::String(b"Platzkarte".to_vec())]
        );
    }

    #[test]
    fn test_lexer_dictionaries_and_arrays() {
        assert_eq!(
            tokens(b"<< /Type /Page /Kids [1 0 R] >>"),
            vec![
                Token::DictStart,
                Token::Name("Type".to_string()),
                Token::Name("Page".to_string()),
                Token::Name("Kids".to_string()),
                Token::ArrayStart,
                Token::Integer(1),
                Token::Integer(0),
                Token::Keyword("R".to_string()),
                Token::ArrayEnd,
                Token::DictEnd,
            ]
        );
    }

    #[test]
    fn test_lexer_names_with_escapes() {
        assert_eq!(
            tokens(b"/A#20B /F1"),
            vec![
                Token::Name("A B".to_string()),
                Token::Name("F1".to_string())
            ]
        );
    }

    #[test]
    fn test_lexer_comments_are_skipped() {
        assert_eq!(
            tokens(b"%PDF-1.7\n1 % trailing\n2"),
            vec![Token::Integer(1), Token::Integer(2)]
        );
    }

    #[test]
    fn test_lexer_keywords() {
        assert_eq!(
            tokens(b"1 0 obj endobj stream endstream startxref q Tj"),
            vec![
                Token::Integer(1),
                Token::Integer(0),
                Token::Obj,
                Token::EndObj,
                Token::Stream,
                Token::EndStream,
                Token::StartXRef,
                Token::Keyword("q".to_string()),
                Token::Keyword("Tj".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let mut lexer = Lexer::new(b"(never closed");
        assert!(matches!(
            lexer.next_token(),
            Err(ParseError::SyntaxError { position: 0, .. })
        ));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = Lexer::new(b"42 /X");
        assert_eq!(lexer.peek_token().unwrap(), Token::Integer(42));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(42));
        assert_eq!(lexer.next_token().unwrap(), Token::Name("X".to_string()));
    }

    #[test]
    fn test_find_subsequence() {
        assert_eq!(find_subsequence(b"abcabc", b"ca"), Some(2));
        assert_eq!(rfind_subsequence(b"abcabc", b"bc"), Some(4));
        assert_eq!(find_subsequence(b"ab", b"abc"), None);
    }
}
