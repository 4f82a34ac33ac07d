//! Content stream tokenizer
//!
//! Splits a decoded content stream into `(operands, operator)` groups with
//! their byte ranges. Inline images are read as one group whose payload ends at
//! the `EI` marker rather than after a fixed operand count.

use crate::objects::{Dictionary, Object};
use crate::parser::lexer::{is_whitespace, Lexer, Token};
use crate::parser::objects::parse_operand;
use crate::parser::{ParseError, ParseResult};

/// One operator with its operands, as found in the stream
#[derive(Debug, Clone, PartialEq)]
pub struct RawOperation {
    pub operator: String,
    pub operands: Vec<Object>,
    /// Offset of the first operand (or of the operator when there is none)
    pub offset: usize,
    /// Offset just past the operator keyword
    pub end_offset: usize,
    /// Dictionary and payload of a `BI ... ID ... EI` group
    pub inline_image: Option<(Dictionary, Vec<u8>)>,
}

pub struct ContentTokenizer<'a> {
    lexer: Lexer<'a>,
}

impl<'a> ContentTokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
        }
    }

    /// Tokenize the whole stream
    pub fn tokenize(data: &'a [u8]) -> ParseResult<Vec<RawOperation>> {
        let mut tokenizer = Self::new(data);
        let mut operations = Vec::new();
        while let Some(operation) = tokenizer.next_operation()? {
            operations.push(operation);
        }
        Ok(operations)
    }

    pub fn next_operation(&mut self) -> ParseResult<Option<RawOperation>> {
        let mut operands = Vec::new();
        self.lexer.skip_whitespace();
        let offset = self.lexer.position();

        loop {
            let token = self.lexer.next_token()?;
            let operator = match token {
                Token::Eof if operands.is_empty() => return Ok(None),
                Token::Eof => {
                    return Err(ParseError::syntax(
                        self.lexer.position(),
                        "operands without operator at end of content stream",
                    ))
                }
                ref keyword if keyword.keyword_text().is_some() => keyword
                    .keyword_text()
                    .map(str::to_string)
                    .unwrap_or_default(),
                token => {
                    operands.push(parse_operand(&mut self.lexer, token)?);
                    continue;
                }
            };

            if operator == "BI" {
                let (dict, data) = self.read_inline_image()?;
                return Ok(Some(RawOperation {
                    operator,
                    operands,
                    offset,
                    end_offset: self.lexer.position(),
                    inline_image: Some((dict, data)),
                }));
            }

            return Ok(Some(RawOperation {
                operator,
                operands,
                offset,
                end_offset: self.lexer.position(),
                inline_image: None,
            }));
        }
    }

    /// Reads `key value ... ID <data> EI` after a consumed `BI`
    fn read_inline_image(&mut self) -> ParseResult<(Dictionary, Vec<u8>)> {
        let mut dict = Dictionary::new();
        loop {
            let position = self.lexer.position();
            match self.lexer.next_token()? {
                Token::Keyword(word) if word == "ID" => break,
                Token::Name(key) => {
                    let value_token = self.lexer.next_token()?;
                    dict.set(key, parse_operand(&mut self.lexer, value_token)?);
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        position,
                        expected: "inline image key or ID".to_string(),
                        found: format!("{other:?}"),
                    })
                }
            }
        }

        // single white-space byte after ID
        let input = self.lexer.input();
        let mut start = self.lexer.position();
        if input.get(start).copied().is_some_and(is_whitespace) {
            start += 1;
        }

        let known_end = unfiltered_length(&dict)
            .and_then(|length| start.checked_add(length))
            .filter(|&end| end <= input.len() && is_ei_at(input, end));
        let end = match known_end {
            Some(end) => end,
            None => find_ei(input, start).ok_or_else(|| {
                ParseError::syntax(start, "inline image without EI marker")
            })?,
        };

        let data = input[start..end].to_vec();
        // skip the whitespace before EI and the marker itself
        let mut after = end;
        while after < input.len() && is_whitespace(input[after]) {
            after += 1;
        }
        self.lexer.seek(after + 2);
        Ok((dict, data))
    }
}

/// Payload size of an inline image without filters
fn unfiltered_length(dict: &Dictionary) -> Option<usize> {
    if dict.contains_key("F") || dict.contains_key("Filter") {
        return None;
    }
    let width = dict.get_integer("W").or_else(|| dict.get_integer("Width"))?;
    let height = dict.get_integer("H").or_else(|| dict.get_integer("Height"))?;
    let is_mask = dict
        .get("IM")
        .or_else(|| dict.get("ImageMask"))
        .and_then(Object::as_bool)
        .unwrap_or(false);
    let bpc = if is_mask {
        1
    } else {
        dict.get_integer("BPC")
            .or_else(|| dict.get_integer("BitsPerComponent"))?
    };
    let components = if is_mask {
        1
    } else {
        match dict.get_name("CS").or_else(|| dict.get_name("ColorSpace")) {
            Some("G" | "DeviceGray" | "I" | "Indexed") => 1,
            Some("RGB" | "DeviceRGB") => 3,
            Some("CMYK" | "DeviceCMYK") => 4,
            _ => return None,
        }
    };
    if width <= 0 || height <= 0 || bpc <= 0 {
        return None;
    }
    let bits = width.checked_mul(components)?.checked_mul(bpc)?;
    let row = bits.checked_add(7)? / 8;
    usize::try_from(row.checked_mul(height)?).ok()
}

/// `EI` at `position`, optionally after white space, followed by a boundary
fn is_ei_at(input: &[u8], mut position: usize) -> bool {
    while position < input.len() && is_whitespace(input[position]) {
        position += 1;
    }
    input[position..].starts_with(b"EI")
        && input
            .get(position + 2)
            .map_or(true, |b| is_whitespace(*b) || *b == b'%')
}

/// End of the payload: white space followed by a delimited `EI`
fn find_ei(input: &[u8], start: usize) -> Option<usize> {
    (start..input.len()).find(|&i| {
        is_whitespace(input[i])
            && input[i + 1..].starts_with(b"EI")
            && input
                .get(i + 3)
                .map_or(true, |b| is_whitespace(*b) || *b == b'%')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(data: &[u8]) -> Vec<String> {
        ContentTokenizer::tokenize(data)
            .unwrap()
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn test_operands_and_offsets() {
        let data = b"q 1 0 0 1 10 20 cm\n/Im1 Do Q";
        let ops = ContentTokenizer::tokenize(data).unwrap();
        assert_eq!(ops.len(), 4);
        assert_eq!(ops[1].operator, "cm");
        assert_eq!(ops[1].operands.len(), 6);
        assert_eq!(ops[1].offset, 2);
        assert_eq!(&data[ops[1].offset..ops[1].end_offset], b"1 0 0 1 10 20 cm");
        assert_eq!(ops[2].operands, vec![Object::name("Im1")]);
        assert_eq!(&data[ops[2].offset..ops[2].end_offset], b"/Im1 Do");
    }

    #[test]
    fn test_text_operators() {
        let data = b"BT /F1 12 Tf 72 700 Td (Platz) Tj [(A) -120 (B)] TJ T* (x) ' 1 2 (y) \" ET";
        assert_eq!(
            operators(data),
            vec!["BT", "Tf", "Td", "Tj", "TJ", "T*", "'", "\"", "ET"]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(operators(b"% header\nq % save\nQ"), vec!["q", "Q"]);
    }

    #[test]
    fn test_inline_image_with_known_length() {
        let data = b"q BI /W 2 /H 2 /BPC 8 /CS /G ID \x00EI\xFF EI Q";
        let ops = ContentTokenizer::tokenize(data).unwrap();
        assert_eq!(ops.len(), 3);
        let (dict, payload) = ops[1].inline_image.as_ref().unwrap();
        assert_eq!(dict.get_integer("W"), Some(2));
        assert_eq!(payload, &vec![0x00, b'E', b'I', 0xFF]);
        assert_eq!(ops[2].operator, "Q");
    }

    #[test]
    fn test_inline_image_scanned_to_ei() {
        let data = b"BI /W 4 /H 1 /BPC 8 /CS /RGB /F /AHx ID 00FF00AA> EI";
        let ops = ContentTokenizer::tokenize(data).unwrap();
        let (_, payload) = ops[0].inline_image.as_ref().unwrap();
        assert_eq!(payload, b"00FF00AA>");
    }

    #[test]
    fn test_inline_image_with_overflowing_size() {
        let data = b"BI /W 4611686018427387904 /H 1 /BPC 8 /CS /RGB ID \x00 EI";
        let ops = ContentTokenizer::tokenize(data).unwrap();
        let (_, payload) = ops[0].inline_image.as_ref().unwrap();
        assert_eq!(payload, &vec![0x00]);

        let huge = b"BI /W 3037000500 /H 3037000500 /BPC 8 /CS /CMYK ID \x01 EI";
        assert_eq!(ContentTokenizer::tokenize(huge).unwrap().len(), 1);
    }

    #[test]
    fn test_dangling_operands_are_error() {
        assert!(ContentTokenizer::tokenize(b"q 1 2").is_err());
    }
}
