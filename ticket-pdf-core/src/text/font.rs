//! Font resources as seen by the content-stream engine
//!
//! Only what text layout needs is kept: how character codes map to Unicode
//! and how wide every glyph is. Composite (Type0) fonts are carried as opaque
//! placeholders; re-encoding text for them is not supported.

use super::encoding::{glyph_name_to_char, TextEncoding};
use super::metrics::StandardFont;
use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};
use std::collections::BTreeMap;

/// A font resource
#[derive(Debug, Clone, PartialEq)]
pub enum Font {
    /// Single-byte font (Type1, TrueType, MMType1, Type3)
    Simple(SimpleFont),
    /// Multi-byte Type0 font
    Composite(CompositeFont),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleFont {
    base_font: String,
    encoding: Option<TextEncoding>,
    differences: BTreeMap<u8, char>,
    first_char: u32,
    widths: Vec<f64>,
    missing_width: f64,
    standard: Option<StandardFont>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFont {
    base_font: String,
}

impl Font {
    /// Read a font dictionary, resolving indirect entries through `document`
    pub fn from_dictionary(document: &Document, dict: &Dictionary) -> Result<Self> {
        let base_font = dict.get_name("BaseFont").unwrap_or("Unnamed").to_string();

        if dict.get_name("Subtype") == Some("Type0") {
            return Ok(Font::Composite(CompositeFont { base_font }));
        }

        let standard = StandardFont::from_base_font(&base_font);
        let (encoding, differences) = match document.resolve_key(dict, "Encoding")? {
            None => (None, BTreeMap::new()),
            Some(Object::Name(name)) => (TextEncoding::from_name(name), BTreeMap::new()),
            Some(Object::Dictionary(encoding_dict)) => (
                encoding_dict
                    .get_name("BaseEncoding")
                    .and_then(TextEncoding::from_name),
                parse_differences(encoding_dict),
            ),
            Some(other) => {
                return Err(PdfError::FontError(format!(
                    "font {base_font} has /Encoding of type {}",
                    other.type_name()
                )))
            }
        };

        let first_char = dict.get_integer("FirstChar").unwrap_or(0).max(0) as u32;
        let widths = match document.resolve_key(dict, "Widths")? {
            Some(array) => array.as_number_array().unwrap_or_default(),
            None => Vec::new(),
        };

        let missing_width = match document.resolve_key(dict, "FontDescriptor")? {
            Some(descriptor) => descriptor
                .as_dict()
                .and_then(|d| d.get_number("MissingWidth"))
                .unwrap_or(0.0),
            None => 0.0,
        };

        Ok(Font::Simple(SimpleFont {
            base_font,
            encoding,
            differences,
            first_char,
            widths,
            missing_width,
            standard,
        }))
    }

    /// One of the standard 14 fonts with WinAnsi encoding
    pub fn standard(font: StandardFont) -> Self {
        let encoding = (!font.is_symbolic()).then_some(TextEncoding::WinAnsi);
        Font::Simple(SimpleFont {
            base_font: font.pdf_name().to_string(),
            encoding,
            differences: BTreeMap::new(),
            first_char: 0,
            widths: Vec::new(),
            missing_width: 0.0,
            standard: Some(font),
        })
    }

    /// Stand-in for a font resource that could not be resolved
    pub fn placeholder(name: &str) -> Self {
        Font::Simple(SimpleFont {
            base_font: name.to_string(),
            encoding: None,
            differences: BTreeMap::new(),
            first_char: 0,
            widths: Vec::new(),
            missing_width: 0.0,
            standard: None,
        })
    }

    pub fn base_font(&self) -> &str {
        match self {
            Font::Simple(font) => &font.base_font,
            Font::Composite(font) => &font.base_font,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Font::Composite(_))
    }

    pub fn encoding(&self) -> Option<TextEncoding> {
        match self {
            Font::Simple(font) => font.effective_encoding(),
            Font::Composite(_) => None,
        }
    }

    /// Whether [`Font::encode`] can succeed for this font at all
    pub fn can_encode(&self) -> bool {
        self.encoding().is_some_and(|e| e.is_encodable())
    }

    /// Horizontal advance of `code` in glyph units (1/1000 em)
    pub fn width_of(&self, code: u8) -> f64 {
        match self {
            Font::Simple(font) => font.width_of(code),
            Font::Composite(_) => 1000.0,
        }
    }

    /// Text for a shown string; unmapped codes fall back to Latin-1
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Font::Simple(font) => bytes
                .iter()
                .map(|b| font.decode_code(*b).unwrap_or(*b as char))
                .collect(),
            Font::Composite(_) => bytes.iter().map(|b| *b as char).collect(),
        }
    }

    /// Character codes that render `text` in this font
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let font = match self {
            Font::Simple(font) => font,
            Font::Composite(font) => {
                return Err(PdfError::CompositeFontEncoding(font.base_font.clone()))
            }
        };
        let encoding = font
            .effective_encoding()
            .filter(TextEncoding::is_encodable)
            .ok_or_else(|| {
                PdfError::UnsupportedEncoding(format!(
                    "font {} has no WinAnsi or MacRoman encoding",
                    font.base_font
                ))
            })?;

        text.chars()
            .map(|ch| {
                font.differences
                    .iter()
                    .find(|(_, mapped)| **mapped == ch)
                    .map(|(code, _)| *code)
                    .or_else(|| encoding.encode_char(ch))
                    .ok_or_else(|| {
                        PdfError::UnsupportedEncoding(format!(
                            "character {ch:?} is not encodable in {}",
                            encoding.pdf_name()
                        ))
                    })
            })
            .collect()
    }

    /// Width of `text` in text space units at `font_size`, without spacing
    pub fn text_width(&self, text: &str, font_size: f64) -> Result<f64> {
        let units: f64 = self.encode(text)?.iter().map(|c| self.width_of(*c)).sum();
        Ok(units / 1000.0 * font_size)
    }

    /// Font dictionary for a newly referenced standard font
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Font"));
        match self {
            Font::Simple(font) => {
                dict.set("Subtype", Object::name("Type1"));
                dict.set("BaseFont", Object::name(font.base_font.clone()));
                if let Some(encoding) = font.encoding {
                    dict.set("Encoding", Object::name(encoding.pdf_name()));
                }
            }
            Font::Composite(font) => {
                dict.set("Subtype", Object::name("Type0"));
                dict.set("BaseFont", Object::name(font.base_font.clone()));
            }
        }
        dict
    }
}

impl SimpleFont {
    fn effective_encoding(&self) -> Option<TextEncoding> {
        self.encoding.or_else(|| match self.standard {
            Some(font) if !font.is_symbolic() => Some(TextEncoding::Standard),
            _ => None,
        })
    }

    fn decode_code(&self, code: u8) -> Option<char> {
        self.differences
            .get(&code)
            .copied()
            .or_else(|| self.effective_encoding()?.decode_byte(code))
    }

    fn width_of(&self, code: u8) -> f64 {
        let code_u32 = code as u32;
        if !self.widths.is_empty() {
            if code_u32 >= self.first_char {
                if let Some(width) = self.widths.get((code_u32 - self.first_char) as usize) {
                    return *width;
                }
            }
            return self.missing_width;
        }
        match (self.standard, self.decode_code(code)) {
            (Some(font), Some(ch)) => font.char_width(ch) as f64,
            (Some(font), None) if font.is_symbolic() => font.char_width(' ') as f64,
            _ => self.missing_width,
        }
    }
}

fn parse_differences(encoding: &Dictionary) -> BTreeMap<u8, char> {
    let mut differences = BTreeMap::new();
    let Some(entries) = encoding.get_array("Differences") else {
        return differences;
    };

    let mut code: i64 = 0;
    for entry in entries {
        match entry {
            Object::Integer(start) => code = *start,
            Object::Name(glyph) => {
                if let (Ok(byte), Some(ch)) = (u8::try_from(code), glyph_name_to_char(glyph)) {
                    differences.insert(byte, ch);
                }
                code += 1;
            }
            _ => {}
        }
    }
    differences
}
