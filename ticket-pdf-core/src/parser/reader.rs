//! High-level PDF Reader
//!
//! Loads every live object of a file into memory. Object streams are unpacked
//! and dropped together with xref streams, so the resulting [`Document`] holds
//! only content objects.

use super::lexer::{find_subsequence, Lexer};
use super::object_stream::ObjectStream;
use super::objects::parse_indirect_object;
use super::xref::{XRefEntry, XRefTable};
use super::{ParseError, ParseResult};
use crate::document::Document;
use crate::objects::{Object, ObjectId};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Trailer keys that only describe the file layout being read
const LAYOUT_KEYS: &[&str] = &[
    "Prev", "XRefStm", "Type", "W", "Index", "Filter", "DecodeParms", "Length", "Size",
];

/// PDF Reader over a byte buffer
pub struct PdfReader<'a> {
    input: &'a [u8],
}

impl<'a> PdfReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    /// Parse a buffer into a document
    pub fn parse(input: &'a [u8]) -> ParseResult<Document> {
        PdfReader::new(input).read_document()
    }

    /// Version string from the `%PDF-x.y` header
    pub fn version(&self) -> ParseResult<String> {
        let window = &self.input[..self.input.len().min(1024)];
        let start = find_subsequence(window, b"%PDF-").ok_or(ParseError::InvalidHeader)? + 5;
        let version: String = self.input[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'.')
            .map(|b| *b as char)
            .collect();
        if version.is_empty() {
            return Err(ParseError::InvalidHeader);
        }
        Ok(version)
    }

    pub fn read_document(&self) -> ParseResult<Document> {
        let version = self.version()?;
        let xref = XRefTable::parse(self.input)?;

        if xref.trailer().contains_key("Encrypt") {
            return Err(ParseError::EncryptionNotSupported);
        }

        let offsets: HashMap<u32, usize> = xref
            .entries()
            .filter_map(|(number, entry)| match entry {
                XRefEntry::InUse { offset, .. } => Some((number, *offset)),
                _ => None,
            })
            .collect();

        let mut objects = BTreeMap::new();
        let mut compressed: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();

        for (number, entry) in xref.entries() {
            match *entry {
                XRefEntry::InUse { offset, generation } if number != 0 => {
                    let expected = ObjectId::new(number, generation);
                    let object = self.read_object_at(offset, expected, &offsets)?;
                    objects.insert(expected, object);
                }
                XRefEntry::Compressed {
                    stream_number,
                    index,
                } => compressed
                    .entry(stream_number)
                    .or_default()
                    .push((number, index)),
                _ => {}
            }
        }

        let mut container_ids = Vec::new();
        for (stream_number, members) in compressed {
            let container_id = ObjectId::new(stream_number, 0);
            let stream = objects
                .get(&container_id)
                .and_then(Object::as_stream)
                .ok_or(ParseError::InvalidReference(stream_number, 0))?;
            let object_stream = ObjectStream::parse(stream)?;

            for (number, index) in members {
                let (stored_number, object) = object_stream
                    .get(index as usize)
                    .ok_or(ParseError::InvalidReference(number, 0))?;
                if *stored_number != number {
                    return Err(ParseError::InvalidReference(number, 0));
                }
                objects.insert(ObjectId::new(number, 0), object.clone());
            }
            container_ids.push(container_id);
        }

        for id in container_ids {
            objects.remove(&id);
        }
        objects.retain(|_, object| {
            object
                .as_stream()
                .map_or(true, |s| s.dictionary().get_type() != Some("XRef"))
        });

        let mut trailer = xref.trailer().clone();
        for key in LAYOUT_KEYS {
            trailer.remove(key);
        }

        debug!(
            version = %version,
            objects = objects.len(),
            "parsed PDF document"
        );

        Ok(Document::from_parsed(version, objects, trailer, xref))
    }

    fn read_object_at(
        &self,
        offset: usize,
        expected: ObjectId,
        offsets: &HashMap<u32, usize>,
    ) -> ParseResult<Object> {
        if offset >= self.input.len() {
            return Err(ParseError::InvalidReference(
                expected.number(),
                expected.generation(),
            ));
        }
        let mut lexer = Lexer::at(self.input, offset);
        let resolve = |id: ObjectId| resolve_length(self.input, offsets, id);
        let (id, object) = parse_indirect_object(&mut lexer, &resolve)?;
        if id != expected {
            return Err(ParseError::InvalidReference(
                expected.number(),
                expected.generation(),
            ));
        }
        Ok(object)
    }
}

/// Indirect `/Length` values must be plain integers stored uncompressed
fn resolve_length(input: &[u8], offsets: &HashMap<u32, usize>, id: ObjectId) -> Option<usize> {
    let offset = offsets.get(&id.number()).copied()?;
    let mut lexer = Lexer::at(input, offset);
    let (found, object) = parse_indirect_object(&mut lexer, &|_| None).ok()?;
    if found != id {
        return None;
    }
    object.as_integer().filter(|n| *n >= 0).map(|n| n as usize)
}
