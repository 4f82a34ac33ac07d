//! PDF serialization
//!
//! Writes a [`Document`] either with a classic cross-reference table or, for
//! PDF 1.5+ consumers, with non-stream objects packed into compressed object
//! streams indexed by an xref stream.

mod xref_stream_writer;

pub use xref_stream_writer::XRefStreamWriter;

use crate::document::Document;
use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use crate::parser::XRefEntry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::debug;

/// Objects per object stream
const OBJECTS_PER_STREAM: usize = 100;

/// Output options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Flate-encode streams that carry no filter yet
    pub compress_streams: bool,
    /// Pack non-stream objects into object streams (PDF 1.5)
    pub use_object_streams: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compress_streams: true,
            use_object_streams: true,
        }
    }
}

impl WriterConfig {
    /// Output readable by minimal-feature PDF readers: no object streams
    pub fn compatible() -> Self {
        Self {
            compress_streams: true,
            use_object_streams: false,
        }
    }
}

pub struct PdfWriter<W: Write> {
    writer: W,
    xref_positions: BTreeMap<u32, XRefEntry>,
    current_position: u64,
}

impl<W: Write> PdfWriter<W> {
    pub fn new_with_writer(writer: W) -> Self {
        Self {
            writer,
            xref_positions: BTreeMap::new(),
            current_position: 0,
        }
    }

    pub fn write_document(&mut self, document: &Document, config: &WriterConfig) -> Result<()> {
        let version = if config.use_object_streams {
            max_version(document.version(), "1.5")
        } else {
            document.version().to_string()
        };
        self.write_header(&version)?;

        let trailer = trailer_entries(document.trailer());
        if config.use_object_streams {
            self.write_with_object_streams(document, config, &trailer)?;
        } else {
            for (id, object) in document.objects() {
                self.write_object(*id, object, config)?;
            }
            let xref_position = self.current_position;
            self.write_xref()?;
            self.write_trailer(&trailer, xref_position)?;
        }

        debug!(
            objects = document.len(),
            bytes = self.current_position,
            object_streams = config.use_object_streams,
            "wrote PDF document"
        );
        self.writer.flush()?;
        Ok(())
    }

    fn write_header(&mut self, version: &str) -> Result<()> {
        self.write_bytes(format!("%PDF-{version}\n").as_bytes())?;
        // Binary comment to ensure file is treated as binary
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])?;
        Ok(())
    }

    fn write_with_object_streams(
        &mut self,
        document: &Document,
        config: &WriterConfig,
        trailer: &Dictionary,
    ) -> Result<()> {
        let mut next_number = document.max_object_number() + 1;
        let mut packable = Vec::new();

        for (id, object) in document.objects() {
            match object {
                Object::Stream(_) => self.write_object(*id, object, config)?,
                _ if id.generation() != 0 => self.write_object(*id, object, config)?,
                _ => packable.push((*id, object)),
            }
        }

        for chunk in packable.chunks(OBJECTS_PER_STREAM) {
            let stream_id = ObjectId::new(next_number, 0);
            next_number += 1;

            let mut header = Vec::new();
            let mut body = Vec::new();
            for (index, (id, object)) in chunk.iter().enumerate() {
                header.extend_from_slice(format!("{} {} ", id.number(), body.len()).as_bytes());
                write_object_value(&mut body, object);
                body.push(b'\n');
                self.xref_positions.insert(
                    id.number(),
                    XRefEntry::Compressed {
                        stream_number: stream_id.number(),
                        index: index as u32,
                    },
                );
            }

            let mut dict = Dictionary::new();
            dict.set("Type", Object::name("ObjStm"));
            dict.set("N", chunk.len());
            dict.set("First", header.len());
            header.extend_from_slice(&body);
            let stream = Stream::with_dictionary(dict, header);
            self.write_object(stream_id, &Object::Stream(stream), config)?;
        }

        let xref_id = ObjectId::new(next_number, 0);
        let xref_position = self.current_position;
        self.xref_positions.insert(
            xref_id.number(),
            XRefEntry::InUse {
                offset: xref_position as usize,
                generation: 0,
            },
        );

        let mut xref_writer = XRefStreamWriter::new();
        for (number, entry) in &self.xref_positions {
            xref_writer.add_entry(*number, *entry);
        }
        let dict = xref_writer.create_dictionary(trailer);
        let xref_stream = Stream::with_dictionary(dict, xref_writer.encode_entries());
        let uncompressed = WriterConfig {
            compress_streams: false,
            ..*config
        };
        self.write_object(xref_id, &Object::Stream(xref_stream), &uncompressed)?;

        self.write_bytes(format!("startxref\n{xref_position}\n%%EOF\n").as_bytes())
    }

    fn write_object(&mut self, id: ObjectId, object: &Object, config: &WriterConfig) -> Result<()> {
        self.xref_positions.insert(
            id.number(),
            XRefEntry::InUse {
                offset: self.current_position as usize,
                generation: id.generation(),
            },
        );

        let mut buffer = format!("{} {} obj\n", id.number(), id.generation()).into_bytes();
        match object {
            Object::Stream(stream) => {
                let prepared = prepare_stream(stream, config)?;
                write_object_value(&mut buffer, &Object::Stream(prepared));
            }
            other => write_object_value(&mut buffer, other),
        }
        buffer.extend_from_slice(b"\nendobj\n");
        self.write_bytes(&buffer)
    }

    fn write_xref(&mut self) -> Result<()> {
        let size = self.xref_positions.keys().next_back().map_or(1, |n| n + 1);
        let mut table = format!("xref\n0 {size}\n").into_bytes();
        table.extend_from_slice(b"0000000000 65535 f \n");

        for number in 1..size {
            let line = match self.xref_positions.get(&number) {
                Some(XRefEntry::InUse { offset, generation }) => {
                    format!("{offset:010} {generation:05} n \n")
                }
                _ => "0000000000 00000 f \n".to_string(),
            };
            table.extend_from_slice(line.as_bytes());
        }
        self.write_bytes(&table)
    }

    fn write_trailer(&mut self, trailer: &Dictionary, xref_position: u64) -> Result<()> {
        let size = self.xref_positions.keys().next_back().map_or(1, |n| n + 1);
        let mut dict = Dictionary::new();
        dict.set("Size", size);
        for (key, value) in trailer.iter() {
            dict.set(key.clone(), value.clone());
        }

        let mut buffer = b"trailer\n".to_vec();
        write_object_value(&mut buffer, &Object::Dictionary(dict));
        buffer.extend_from_slice(format!("\nstartxref\n{xref_position}\n%%EOF\n").as_bytes());
        self.write_bytes(&buffer)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }
}

/// Trailer keys that survive into the output
fn trailer_entries(trailer: &Dictionary) -> Dictionary {
    trailer
        .iter()
        .filter(|(key, _)| matches!(key.as_str(), "Root" | "Info" | "ID"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn prepare_stream(stream: &Stream, config: &WriterConfig) -> Result<Stream> {
    let mut prepared = stream.clone();
    let is_metadata = prepared.dictionary().get_type() == Some("Metadata");
    if config.compress_streams && !is_metadata {
        prepared.compress_flate()?;
    }
    let length = prepared.data().len();
    prepared.dictionary_mut().set("Length", length);
    Ok(prepared)
}

fn max_version(version: &str, minimum: &str) -> String {
    let parse = |v: &str| -> (u32, u32) {
        let mut parts = v.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
        (parts.next().unwrap_or(1), parts.next().unwrap_or(0))
    };
    if parse(version) >= parse(minimum) {
        version.to_string()
    } else {
        minimum.to_string()
    }
}

/// Serialize a direct value (or a stream body) in PDF syntax
pub(crate) fn write_object_value(out: &mut Vec<u8>, object: &Object) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(f) => out.extend_from_slice(format_real(*f).as_bytes()),
        Object::String(bytes) => write_literal_string(out, bytes),
        Object::HexString(bytes) => {
            out.push(b'<');
            for byte in bytes {
                out.extend_from_slice(format!("{byte:02X}").as_bytes());
            }
            out.push(b'>');
        }
        Object::Name(name) => write_name(out, name),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object_value(out, item);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Stream(stream) => {
            write_dictionary(out, stream.dictionary());
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(stream.data());
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference(id) => {
            out.extend_from_slice(format!("{} {} R", id.number(), id.generation()).as_bytes())
        }
    }
}

fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b' ');
        write_name(out, key);
        out.push(b' ');
        write_object_value(out, value);
    }
    out.extend_from_slice(b" >>");
}

/// Real object in the shortest form that parses back to the same value.
/// The point is always written so the value stays a real.
pub(crate) fn format_real(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0.0".to_string();
    }
    let formatted = value.to_string();
    if formatted.contains('.') {
        formatted
    } else {
        formatted + ".0"
    }
}

/// Shortest decimal form with at most 6 fractional digits, for generated content
pub(crate) fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

fn write_literal_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &byte in bytes {
        match byte {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(byte);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x00..=0x1F | 0x7F => out.extend_from_slice(format!("\\{byte:03o}").as_bytes()),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &byte in name.as_bytes() {
        let needs_escape = !(0x21..=0x7E).contains(&byte)
            || byte == b'#'
            || crate::parser::lexer::is_delimiter(byte);
        if needs_escape {
            out.extend_from_slice(format!("#{byte:02X}").as_bytes());
        } else {
            out.push(byte);
        }
    }
}

/// Format a DateTime as a PDF date string (D:YYYYMMDDHHmmSSOHH'mm)
pub fn format_pdf_date(date: DateTime<Utc>) -> String {
    let formatted = date.format("D:%Y%m%d%H%M%S");
    format!("{formatted}+00'00")
}
