//! PDF Object Parser
//!
//! Builds [`Object`] values from lexer tokens, including indirect objects and
//! their stream payloads.

use super::lexer::{is_whitespace, Lexer, Token};
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Nesting limit for arrays and dictionaries
const MAX_DEPTH: usize = 256;

/// Parse one direct object
pub fn parse_object(lexer: &mut Lexer<'_>) -> ParseResult<Object> {
    let token = lexer.next_token()?;
    parse_from_token(lexer, token, 0)
}

/// Parse an object whose first token was already read
pub(crate) fn parse_operand(lexer: &mut Lexer<'_>, token: Token) -> ParseResult<Object> {
    parse_from_token(lexer, token, 0)
}

fn parse_from_token(lexer: &mut Lexer<'_>, token: Token, depth: usize) -> ParseResult<Object> {
    if depth > MAX_DEPTH {
        return Err(ParseError::syntax(lexer.position(), "Nesting too deep"));
    }

    match token {
        Token::Null => Ok(Object::Null),
        Token::Boolean(b) => Ok(Object::Boolean(b)),
        Token::Integer(i) => parse_integer_or_reference(lexer, i),
        Token::Real(r) => Ok(Object::Real(r)),
        Token::String(s) => Ok(Object::String(s)),
        Token::HexString(s) => Ok(Object::HexString(s)),
        Token::Name(n) => Ok(Object::Name(n)),
        Token::ArrayStart => parse_array(lexer, depth),
        Token::DictStart => parse_dictionary(lexer, depth).map(Object::Dictionary),
        Token::Eof => Err(ParseError::syntax(
            lexer.position(),
            "Unexpected end of input",
        )),
        other => Err(ParseError::UnexpectedToken {
            position: lexer.position(),
            expected: "object".to_string(),
            found: format!("{other:?}"),
        }),
    }
}

/// `n g R` is only a reference when both lookahead tokens fit.
fn parse_integer_or_reference(lexer: &mut Lexer<'_>, value: i64) -> ParseResult<Object> {
    let saved = lexer.position();

    if let Ok(Token::Integer(generation)) = lexer.next_token() {
        if let Ok(Token::Keyword(word)) = lexer.next_token() {
            if word == "R" && value >= 0 && (0..=u16::MAX as i64).contains(&generation) {
                return Ok(Object::Reference(ObjectId::new(
                    value as u32,
                    generation as u16,
                )));
            }
        }
    }

    lexer.seek(saved);
    Ok(Object::Integer(value))
}

fn parse_array(lexer: &mut Lexer<'_>, depth: usize) -> ParseResult<Object> {
    let mut elements = Vec::new();

    loop {
        let token = lexer.next_token()?;
        match token {
            Token::ArrayEnd => break,
            token => elements.push(parse_from_token(lexer, token, depth + 1)?),
        }
    }

    Ok(Object::Array(elements))
}

/// Parse dictionary entries after a consumed `<<`
pub(crate) fn parse_dictionary(lexer: &mut Lexer<'_>, depth: usize) -> ParseResult<Dictionary> {
    let mut dict = Dictionary::new();

    loop {
        let position = lexer.position();
        let token = lexer.next_token()?;
        let key = match token {
            Token::DictEnd => break,
            Token::Name(name) => name,
            other => {
                return Err(ParseError::UnexpectedToken {
                    position,
                    expected: "dictionary key".to_string(),
                    found: format!("{other:?}"),
                })
            }
        };

        let value_token = lexer.next_token()?;
        if value_token == Token::DictEnd {
            // a key without value; treat as null like other readers do
            dict.set(key, Object::Null);
            break;
        }
        let value = parse_from_token(lexer, value_token, depth + 1)?;
        dict.set(key, value);
    }

    Ok(dict)
}

/// Parse `n g obj ... endobj` at the lexer's position.
///
/// `resolve_length` answers indirect `/Length` entries of stream dictionaries.
pub fn parse_indirect_object(
    lexer: &mut Lexer<'_>,
    resolve_length: &dyn Fn(ObjectId) -> Option<usize>,
) -> ParseResult<(ObjectId, Object)> {
    let position = lexer.position();
    let number = match lexer.next_token()? {
        Token::Integer(n) if n >= 0 => n as u32,
        other => {
            return Err(ParseError::UnexpectedToken {
                position,
                expected: "object number".to_string(),
                found: format!("{other:?}"),
            })
        }
    };
    let generation = match lexer.next_token()? {
        Token::Integer(g) if (0..=u16::MAX as i64).contains(&g) => g as u16,
        other => {
            return Err(ParseError::UnexpectedToken {
                position,
                expected: "generation number".to_string(),
                found: format!("{other:?}"),
            })
        }
    };
    lexer.expect_keyword("obj")?;
    let id = ObjectId::new(number, generation);

    let object = parse_object(lexer)?;

    let object = match (object, lexer.peek_token()?) {
        (Object::Dictionary(dict), Token::Stream) => {
            lexer.next_token()?;
            let data = parse_stream_data(lexer, &dict, resolve_length)?;
            Object::Stream(Stream::with_dictionary(dict, data))
        }
        (object, _) => object,
    };

    lexer.expect_keyword("endobj")?;
    Ok((id, object))
}

fn parse_stream_data(
    lexer: &mut Lexer<'_>,
    dict: &Dictionary,
    resolve_length: &dyn Fn(ObjectId) -> Option<usize>,
) -> ParseResult<Vec<u8>> {
    lexer.read_newline();
    let start = lexer.position();

    let declared = match dict.get("Length") {
        Some(Object::Integer(n)) if *n >= 0 => Some(*n as usize),
        Some(Object::Reference(id)) => resolve_length(*id),
        _ => None,
    };

    if let Some(length) = declared {
        if let Ok(data) = lexer.read_bytes(length) {
            let data = data.to_vec();
            if lexer.peek_token()? == Token::EndStream {
                lexer.next_token()?;
                return Ok(data);
            }
        }
        lexer.seek(start);
    }

    // Length missing or wrong: the payload ends right before `endstream`
    let end = lexer
        .find(b"endstream")
        .ok_or_else(|| ParseError::syntax(start, "Stream without endstream"))?;
    let mut data_end = end;
    if data_end > start && lexer.input()[data_end - 1] == b'\n' {
        data_end -= 1;
    }
    if data_end > start && lexer.input()[data_end - 1] == b'\r' {
        data_end -= 1;
    }
    let data = lexer.input()[start..data_end].to_vec();
    lexer.seek(end);
    lexer.expect_keyword("endstream")?;
    Ok(data)
}

/// Skip whitespace and report whether the next byte sequence is `keyword`.
pub(crate) fn starts_with_keyword(input: &[u8], mut position: usize, keyword: &[u8]) -> bool {
    while position < input.len() && is_whitespace(input[position]) {
        position += 1;
    }
    input[position..].starts_with(keyword)
}
