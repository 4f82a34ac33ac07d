//! PDF Cross-Reference Table Parser
//!
//! Follows `startxref` and the `/Prev` chain through classic tables, xref
//! streams and hybrid files (`/XRefStm`). Entries from newer sections shadow
//! entries from older ones.

use super::lexer::{rfind_subsequence, Lexer, Token};
use super::objects::{parse_dictionary, parse_indirect_object, starts_with_keyword};
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};
use std::collections::{BTreeMap, HashSet};

/// Cross-reference entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free slot
    Free { next: u32, generation: u16 },
    /// Uncompressed object at a byte offset
    InUse { offset: usize, generation: u16 },
    /// Object stored inside an object stream
    Compressed { stream_number: u32, index: u32 },
}

impl XRefEntry {
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { generation, .. } | XRefEntry::InUse { generation, .. } => {
                *generation
            }
            XRefEntry::Compressed { .. } => 0,
        }
    }
}

/// Cross-reference table plus the trailer dictionary of the newest section
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    trailer: Dictionary,
}

impl XRefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the complete cross-reference chain of a file
    pub fn parse(input: &[u8]) -> ParseResult<Self> {
        let mut table = XRefTable::new();
        let mut visited = HashSet::new();
        let mut next = Some(find_startxref(input)?);
        let mut newest = true;

        while let Some(offset) = next {
            if !visited.insert(offset) {
                return Err(ParseError::CircularReference);
            }
            let (entries, trailer) = parse_section(input, offset)?;

            for (number, entry) in entries {
                table.entries.entry(number).or_insert(entry);
            }

            next = trailer
                .get_integer("Prev")
                .filter(|prev| *prev >= 0)
                .map(|prev| prev as usize);

            if newest {
                table.trailer = trailer;
                newest = false;
            } else {
                for (key, value) in trailer {
                    if !table.trailer.contains_key(&key) {
                        table.trailer.set(key, value);
                    }
                }
            }
        }

        if !table.trailer.contains_key("Root") {
            return Err(ParseError::MissingKey("Root".to_string()));
        }

        Ok(table)
    }

    pub fn get(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    pub fn insert(&mut self, number: u32, entry: XRefEntry) {
        self.entries.insert(number, entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = (u32, &XRefEntry)> {
        self.entries.iter().map(|(n, e)| (*n, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    /// Reserve a fresh object slot. The offset is filled in by the writer.
    pub fn allocate(&mut self) -> ObjectId {
        let number = self.max_object_number() + 1;
        self.entries.insert(
            number,
            XRefEntry::InUse {
                offset: 0,
                generation: 0,
            },
        );
        ObjectId::new(number, 0)
    }
}

/// Locate the offset announced by the last `startxref`
fn find_startxref(input: &[u8]) -> ParseResult<usize> {
    let tail_start = input.len().saturating_sub(1024);
    let position = rfind_subsequence(&input[tail_start..], b"startxref")
        .map(|p| p + tail_start)
        .ok_or(ParseError::InvalidXRef)?;

    let mut lexer = Lexer::at(input, position);
    lexer.next_token()?; // startxref
    match lexer.next_token()? {
        Token::Integer(offset) if offset >= 0 && (offset as usize) < input.len() => {
            Ok(offset as usize)
        }
        _ => Err(ParseError::InvalidXRef),
    }
}

type Section = (Vec<(u32, XRefEntry)>, Dictionary);

fn parse_section(input: &[u8], offset: usize) -> ParseResult<Section> {
    if starts_with_keyword(input, offset, b"xref") {
        parse_classic_section(input, offset)
    } else {
        parse_stream_section(input, offset)
    }
}

fn parse_classic_section(input: &[u8], offset: usize) -> ParseResult<Section> {
    let mut lexer = Lexer::at(input, offset);
    lexer.expect_keyword("xref")?;
    let mut entries = Vec::new();

    loop {
        let token = lexer.next_token()?;
        let start = match token {
            Token::Keyword(ref word) if word == "trailer" => break,
            Token::Integer(start) if start >= 0 => start as u32,
            _ => return Err(ParseError::InvalidXRef),
        };
        let count = match lexer.next_token()? {
            Token::Integer(count) if count >= 0 => count as u32,
            _ => return Err(ParseError::InvalidXRef),
        };

        for i in 0..count {
            let first = match lexer.next_token()? {
                Token::Integer(v) if v >= 0 => v,
                _ => return Err(ParseError::InvalidXRef),
            };
            let generation = match lexer.next_token()? {
                Token::Integer(v) if (0..=u16::MAX as i64).contains(&v) => v as u16,
                _ => return Err(ParseError::InvalidXRef),
            };
            let entry = match lexer.next_token()? {
                Token::Keyword(kind) if kind == "n" => XRefEntry::InUse {
                    offset: first as usize,
                    generation,
                },
                Token::Keyword(kind) if kind == "f" => XRefEntry::Free {
                    next: first as u32,
                    generation,
                },
                _ => return Err(ParseError::InvalidXRef),
            };
            entries.push((start + i, entry));
        }
    }

    match lexer.next_token()? {
        Token::DictStart => {}
        _ => return Err(ParseError::InvalidTrailer),
    }
    let trailer = parse_dictionary(&mut lexer, 0)?;

    // Hybrid file: objects hidden from old readers live in the xref stream
    if let Some(stream_offset) = trailer.get_integer("XRefStm").filter(|o| *o >= 0) {
        let (hidden, _) = parse_stream_section(input, stream_offset as usize)?;
        let mut merged: BTreeMap<u32, XRefEntry> = entries.into_iter().collect();
        for (number, entry) in hidden {
            match merged.get(&number) {
                Some(XRefEntry::InUse { .. }) => {}
                _ => {
                    merged.insert(number, entry);
                }
            }
        }
        return Ok((merged.into_iter().collect(), trailer));
    }

    Ok((entries, trailer))
}

fn parse_stream_section(input: &[u8], offset: usize) -> ParseResult<Section> {
    let mut lexer = Lexer::at(input, offset);
    let (_, object) = parse_indirect_object(&mut lexer, &|_| None)?;
    let stream = match object {
        Object::Stream(stream) if stream.dictionary().get_type() == Some("XRef") => stream,
        _ => return Err(ParseError::InvalidXRef),
    };
    let dict = stream.dictionary();

    let widths: Vec<usize> = dict
        .get_array("W")
        .ok_or_else(|| ParseError::MissingKey("W".to_string()))?
        .iter()
        .map(|w| w.as_integer().filter(|w| *w >= 0).map(|w| w as usize))
        .collect::<Option<_>>()
        .ok_or(ParseError::InvalidXRef)?;
    if widths.len() != 3 {
        return Err(ParseError::InvalidXRef);
    }

    let size = dict
        .get_integer("Size")
        .ok_or_else(|| ParseError::MissingKey("Size".to_string()))?;
    let index: Vec<i64> = match dict.get_array("Index") {
        Some(array) => array
            .iter()
            .map(Object::as_integer)
            .collect::<Option<_>>()
            .ok_or(ParseError::InvalidXRef)?,
        None => vec![0, size],
    };

    let data = super::filters::decode_stream(stream.data(), dict)?;
    let row_width: usize = widths.iter().sum();
    if row_width == 0 {
        return Err(ParseError::InvalidXRef);
    }

    let mut rows = data.chunks_exact(row_width);
    let mut entries = Vec::new();
    for pair in index.chunks(2) {
        let (start, count) = match pair {
            [start, count] if *start >= 0 && *count >= 0 => (*start as u32, *count as u32),
            _ => return Err(ParseError::InvalidXRef),
        };
        for i in 0..count {
            let row = rows.next().ok_or(ParseError::InvalidXRef)?;
            let (type_field, rest) = row.split_at(widths[0]);
            let (second, third) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 {
                1
            } else {
                read_field(type_field)
            };
            let second = read_field(second);
            let third = read_field(third);

            let entry = match kind {
                0 => XRefEntry::Free {
                    next: second as u32,
                    generation: third as u16,
                },
                1 => XRefEntry::InUse {
                    offset: second as usize,
                    generation: third as u16,
                },
                2 => XRefEntry::Compressed {
                    stream_number: second as u32,
                    index: third as u32,
                },
                // unknown entry types are treated as null references
                _ => continue,
            };
            entries.push((start + i, entry));
        }
    }

    let mut trailer = Dictionary::new();
    for key in ["Root", "Info", "ID", "Encrypt", "Prev", "Size"] {
        if let Some(value) = dict.get(key) {
            trailer.set(key, value.clone());
        }
    }

    Ok((entries, trailer))
}

/// Big-endian unsigned field of an xref stream row
fn read_field(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic_file() -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let first = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref = pdf.len();
        pdf.extend_from_slice(
            format!(
                "xref\n0 2\n0000000000 65535 f \n{first:010} 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n"
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_parse_classic_table() {
        let pdf = classic_file();
        let table = XRefTable::parse(&pdf).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(1),
            Some(&XRefEntry::InUse {
                offset: 9,
                generation: 0
            })
        );
        assert!(matches!(table.get(0), Some(XRefEntry::Free { .. })));
        assert_eq!(
            table.trailer().get_reference("Root"),
            Some(ObjectId::new(1, 0))
        );
    }

    #[test]
    fn test_missing_startxref() {
        assert!(matches!(
            XRefTable::parse(b"%PDF-1.4\n1 0 obj null endobj"),
            Err(ParseError::InvalidXRef)
        ));
    }

    #[test]
    fn test_read_field() {
        assert_eq!(read_field(&[0x01, 0x02]), 0x0102);
        assert_eq!(read_field(&[]), 0);
    }

    #[test]
    fn test_parse_uncompressed_xref_stream() {
        let mut pdf = b"%PDF-1.5\n".to_vec();
        let first = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref = pdf.len();
        let rows = [
            [0u8, 0, 0, 0xFF],
            [1, 0, first as u8, 0],
            [1, 0, xref as u8, 0],
        ]
        .concat();
        pdf.extend_from_slice(
            format!(
                "2 0 obj\n<< /Type /XRef /Size 3 /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        pdf.extend_from_slice(&rows);
        pdf.extend_from_slice(
            format!("\nendstream\nendobj\nstartxref\n{xref}\n%%EOF\n").as_bytes(),
        );

        let table = XRefTable::parse(&pdf).unwrap();
        assert_eq!(
            table.get(1),
            Some(&XRefEntry::InUse {
                offset: first,
                generation: 0
            })
        );
        assert!(table.trailer().contains_key("Root"));
    }

    #[test]
    fn test_allocate_uses_next_number() {
        let mut table = XRefTable::new();
        table.insert(
            4,
            XRefEntry::InUse {
                offset: 10,
                generation: 0,
            },
        );
        assert_eq!(table.allocate(), ObjectId::new(5, 0));
        assert_eq!(table.allocate(), ObjectId::new(6, 0));
    }
}
