//! Object Streams (`/Type /ObjStm`)

use super::lexer::{Lexer, Token};
use super::objects::parse_object;
use super::{ParseError, ParseResult};
use crate::objects::{Object, Stream};

/// Decoded object stream: `(object number, object)` in index order
#[derive(Debug, Clone)]
pub struct ObjectStream {
    objects: Vec<(u32, Object)>,
}

impl ObjectStream {
    pub fn parse(stream: &Stream) -> ParseResult<Self> {
        let dict = stream.dictionary();
        let n = dict
            .get_integer("N")
            .filter(|n| *n >= 0)
            .ok_or_else(|| ParseError::MissingKey("N".to_string()))? as usize;
        let first = dict
            .get_integer("First")
            .filter(|f| *f >= 0)
            .ok_or_else(|| ParseError::MissingKey("First".to_string()))? as usize;

        let data = super::filters::decode_stream(stream.data(), dict)?;
        let mut lexer = Lexer::new(&data);

        let mut header = Vec::with_capacity(n);
        for _ in 0..n {
            let number = match lexer.next_token()? {
                Token::Integer(v) if v >= 0 => v as u32,
                _ => return Err(ParseError::syntax(lexer.position(), "Bad object stream header")),
            };
            let offset = match lexer.next_token()? {
                Token::Integer(v) if v >= 0 => v as usize,
                _ => return Err(ParseError::syntax(lexer.position(), "Bad object stream header")),
            };
            header.push((number, offset));
        }

        let mut objects = Vec::with_capacity(n);
        for (number, offset) in header {
            lexer.seek(first + offset);
            objects.push((number, parse_object(&mut lexer)?));
        }

        Ok(Self { objects })
    }

    pub fn get(&self, index: usize) -> Option<&(u32, Object)> {
        self.objects.get(index)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn into_objects(self) -> Vec<(u32, Object)> {
        self.objects
    }
}
