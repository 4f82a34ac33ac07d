//! XRef Stream Writer for PDF 1.5+
//!
//! Writes cross-reference streams according to ISO 32000-1:2008 Section 7.5.8.
//! Required whenever objects are packed into object streams.

use crate::objects::{Dictionary, Object};
use crate::parser::XRefEntry;
use std::collections::BTreeMap;

/// Writer for XRef streams
pub struct XRefStreamWriter {
    /// Entries keyed by object number
    entries: BTreeMap<u32, XRefEntry>,
    /// Field widths [type, field2, field3]
    widths: [usize; 3],
}

impl Default for XRefStreamWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XRefStreamWriter {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            widths: [1, 1, 1],
        }
    }

    pub fn add_entry(&mut self, number: u32, entry: XRefEntry) {
        let (second, third) = match entry {
            XRefEntry::Free { next, generation } => (next as u64, generation as u64),
            XRefEntry::InUse { offset, generation } => (offset as u64, generation as u64),
            XRefEntry::Compressed {
                stream_number,
                index,
            } => (stream_number as u64, index as u64),
        };
        self.widths[1] = self.widths[1].max(Self::bytes_needed(second));
        self.widths[2] = self.widths[2].max(Self::bytes_needed(third));
        self.entries.insert(number, entry);
    }

    /// Number of slots covered, object 0 included
    pub fn size(&self) -> u32 {
        self.entries.keys().next_back().map_or(1, |n| n + 1)
    }

    pub fn widths(&self) -> [usize; 3] {
        self.widths
    }

    /// Calculate minimum bytes needed to represent a value
    fn bytes_needed(value: u64) -> usize {
        if value == 0 {
            1
        } else {
            ((value.ilog2() / 8) + 1) as usize
        }
    }

    /// Encode rows for every slot `0..size`; gaps become free entries
    pub fn encode_entries(&self) -> Vec<u8> {
        let mut data = Vec::new();

        for number in 0..self.size() {
            let (kind, second, third) = match self.entries.get(&number) {
                Some(XRefEntry::InUse { offset, generation }) => {
                    (1, *offset as u64, *generation as u64)
                }
                Some(XRefEntry::Compressed {
                    stream_number,
                    index,
                }) => (2, *stream_number as u64, *index as u64),
                Some(XRefEntry::Free { next, generation }) => (0, *next as u64, *generation as u64),
                None if number == 0 => (0, 0, 0xFF),
                None => (0, 0, 0),
            };
            Self::write_field(&mut data, kind, self.widths[0]);
            Self::write_field(&mut data, second, self.widths[1]);
            Self::write_field(&mut data, third, self.widths[2]);
        }

        data
    }

    /// Write a field with the specified width
    fn write_field(data: &mut Vec<u8>, value: u64, width: usize) {
        for i in (0..width).rev() {
            data.push(((value >> (i * 8)) & 0xFF) as u8);
        }
    }

    /// The XRef stream dictionary, carrying the trailer entries
    pub fn create_dictionary(&self, trailer: &Dictionary) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XRef"));
        dict.set("Size", self.size());
        dict.set(
            "W",
            Object::Array(self.widths.iter().map(|w| Object::from(*w)).collect()),
        );
        for (key, value) in trailer.iter() {
            if key != "Size" {
                dict.set(key.clone(), value.clone());
            }
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_needed() {
        assert_eq!(XRefStreamWriter::bytes_needed(0), 1);
        assert_eq!(XRefStreamWriter::bytes_needed(255), 1);
        assert_eq!(XRefStreamWriter::bytes_needed(256), 2);
        assert_eq!(XRefStreamWriter::bytes_needed(70_000), 3);
    }

    #[test]
    fn test_widths_grow_with_offsets() {
        let mut writer = XRefStreamWriter::new();
        writer.add_entry(
            1,
            XRefEntry::InUse {
                offset: 300,
                generation: 0,
            },
        );
        writer.add_entry(
            2,
            XRefEntry::Compressed {
                stream_number: 3,
                index: 0,
            },
        );
        assert_eq!(writer.widths(), [1, 2, 1]);
        assert_eq!(writer.size(), 3);

        let rows = writer.encode_entries();
        assert_eq!(
            rows,
            vec![
                0, 0, 0, 0xFF, // object 0
                1, 0x01, 0x2C, 0, // offset 300
                2, 0, 3, 0, // in stream 3, index 0
            ]
        );
    }

    #[test]
    fn test_dictionary_carries_trailer() {
        let mut trailer = Dictionary::new();
        trailer.set("Root", crate::objects::ObjectId::new(1, 0));
        let writer = XRefStreamWriter::new();
        let dict = writer.create_dictionary(&trailer);
        assert_eq!(dict.get_type(), Some("XRef"));
        assert!(dict.contains_key("Root"));
        assert_eq!(dict.get_integer("Size"), Some(1));
    }
}
