//! Glyph widths of the standard 14 fonts
//!
//! All widths are in 1/1000 of text space units (font size 1.0). The tables
//! cover printable ASCII plus the German Latin-1 letters and the euro sign;
//! any other character falls back to the font's average width.

use std::collections::HashMap;

/// One of the 14 fonts every PDF reader provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    pub const ALL: [StandardFont; 14] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
        StandardFont::Symbol,
        StandardFont::ZapfDingbats,
    ];

    /// PostScript name used as `/BaseFont`
    pub fn pdf_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Match a `/BaseFont` value, tolerating subset tags and common aliases
    pub fn from_base_font(name: &str) -> Option<Self> {
        let name = match name.split_once('+') {
            Some((tag, rest)) if tag.len() == 6 => rest,
            _ => name,
        };
        let found = match name {
            "Helvetica" | "Arial" | "ArialMT" => StandardFont::Helvetica,
            "Helvetica-Bold" | "Arial-Bold" | "Arial,Bold" | "Arial-BoldMT" => {
                StandardFont::HelveticaBold
            }
            "Helvetica-Oblique" | "Arial-Italic" | "Arial,Italic" | "Arial-ItalicMT" => {
                StandardFont::HelveticaOblique
            }
            "Helvetica-BoldOblique" | "Arial-BoldItalic" | "Arial,BoldItalic" => {
                StandardFont::HelveticaBoldOblique
            }
            "Times-Roman" | "TimesNewRoman" | "TimesNewRomanPSMT" => StandardFont::TimesRoman,
            "Times-Bold" | "TimesNewRoman,Bold" | "TimesNewRomanPS-BoldMT" => {
                StandardFont::TimesBold
            }
            "Times-Italic" | "TimesNewRoman,Italic" | "TimesNewRomanPS-ItalicMT" => {
                StandardFont::TimesItalic
            }
            "Times-BoldItalic" | "TimesNewRoman,BoldItalic" => StandardFont::TimesBoldItalic,
            "Courier" | "CourierNew" | "CourierNewPSMT" => StandardFont::Courier,
            "Courier-Bold" | "CourierNew,Bold" => StandardFont::CourierBold,
            "Courier-Oblique" | "CourierNew,Italic" => StandardFont::CourierOblique,
            "Courier-BoldOblique" | "CourierNew,BoldItalic" => StandardFont::CourierBoldOblique,
            "Symbol" => StandardFont::Symbol,
            "ZapfDingbats" => StandardFont::ZapfDingbats,
            _ => return None,
        };
        Some(found)
    }

    /// Symbol and ZapfDingbats use their own built-in encodings
    pub fn is_symbolic(&self) -> bool {
        matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }

    /// Width of `ch` in glyph units
    pub fn char_width(&self, ch: char) -> u16 {
        let family = match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => Family::Helvetica,
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => {
                Family::HelveticaBold
            }
            StandardFont::TimesRoman | StandardFont::TimesItalic => Family::Times,
            StandardFont::TimesBold | StandardFont::TimesBoldItalic => Family::TimesBold,
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => return 600,
            StandardFont::Symbol | StandardFont::ZapfDingbats => return 600,
        };
        WIDTHS
            .get(&family)
            .map(|table| table.width(ch))
            .unwrap_or(500)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Family {
    Helvetica,
    HelveticaBold,
    Times,
    TimesBold,
}

struct WidthTable {
    widths: HashMap<char, u16>,
    default_width: u16,
}

impl WidthTable {
    fn new(default_width: u16, ascii: &[u16; 95], extra: &[(char, u16)]) -> Self {
        let mut widths: HashMap<char, u16> = (0x20u8..=0x7E)
            .map(|b| b as char)
            .zip(ascii.iter().copied())
            .collect();
        widths.extend(extra.iter().copied());
        Self {
            widths,
            default_width,
        }
    }

    fn width(&self, ch: char) -> u16 {
        self.widths.get(&ch).copied().unwrap_or(self.default_width)
    }
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

lazy_static::lazy_static! {
    static ref WIDTHS: HashMap<Family, WidthTable> = {
        let mut tables = HashMap::new();

        tables.insert(Family::Helvetica, WidthTable::new(556, &HELVETICA, &[
            ('Ä', 667), ('Ö', 778), ('Ü', 722), ('ä', 556), ('ö', 556), ('ü', 556),
            ('ß', 611), ('€', 556), ('é', 556), ('°', 400), ('\u{2013}', 556),
        ]));
        tables.insert(Family::HelveticaBold, WidthTable::new(611, &HELVETICA_BOLD, &[
            ('Ä', 722), ('Ö', 778), ('Ü', 722), ('ä', 556), ('ö', 611), ('ü', 611),
            ('ß', 611), ('€', 556), ('é', 556), ('°', 400), ('\u{2013}', 556),
        ]));
        tables.insert(Family::Times, WidthTable::new(500, &TIMES, &[
            ('Ä', 722), ('Ö', 722), ('Ü', 722), ('ä', 444), ('ö', 500), ('ü', 500),
            ('ß', 500), ('€', 500), ('é', 444), ('°', 400), ('\u{2013}', 500),
        ]));
        tables.insert(Family::TimesBold, WidthTable::new(500, &TIMES_BOLD, &[
            ('Ä', 722), ('Ö', 778), ('Ü', 722), ('ä', 500), ('ö', 500), ('ü', 556),
            ('ß', 556), ('€', 500), ('é', 444), ('°', 400), ('\u{2013}', 500),
        ]));

        tables
    };
}

/// Width of `text` set in `font` at `font_size`, in text space units
pub fn measure_text(text: &str, font: StandardFont, font_size: f64) -> f64 {
    let units: u32 = text.chars().map(|ch| font.char_width(ch) as u32).sum();
    units as f64 / 1000.0 * font_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_widths() {
        let font = StandardFont::Helvetica;
        assert_eq!(font.char_width(' '), 278);
        assert_eq!(font.char_width('A'), 667);
        assert_eq!(font.char_width('i'), 222);
        assert_eq!(font.char_width('ü'), 556);
        assert_eq!(font.char_width('€'), 556);
        assert_eq!(font.char_width('\u{4E2D}'), 556);
    }

    #[test]
    fn test_courier_is_monospace() {
        for ch in ['i', 'W', 'ß', ' '] {
            assert_eq!(StandardFont::CourierBold.char_width(ch), 600);
        }
    }

    #[test]
    fn test_measure_text() {
        let width = measure_text("Datum", StandardFont::Helvetica, 10.0);
        // D 722 + a 556 + t 278 + u 556 + m 833
        assert!((width - 29.45).abs() < 1e-9);
    }

    #[test]
    fn test_from_base_font() {
        assert_eq!(
            StandardFont::from_base_font("ABCDEF+Helvetica-Bold"),
            Some(StandardFont::HelveticaBold)
        );
        assert_eq!(
            StandardFont::from_base_font("ArialMT"),
            Some(StandardFont::Helvetica)
        );
        assert_eq!(StandardFont::from_base_font("Frutiger"), None);
        for font in StandardFont::ALL {
            assert_eq!(StandardFont::from_base_font(font.pdf_name()), Some(font));
        }
    }
}
