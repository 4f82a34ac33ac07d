//! Single-byte text encodings for simple fonts

/// Windows-1252 code points for 0x80..=0x9F, `None` where undefined
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Mac OS Roman code points for 0x80..=0xFF
const MAC_ROMAN_HIGH: [char; 128] = [
    'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é', 'è', //
    'ê', 'ë', 'í', 'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û', 'ü', //
    '†', '°', '¢', '£', '§', '•', '¶', 'ß', '®', '©', '™', '´', '¨', '≠', 'Æ', 'Ø', //
    '∞', '±', '≤', '≥', '¥', 'µ', '∂', '∑', '∏', 'π', '∫', 'ª', 'º', 'Ω', 'æ', 'ø', //
    '¿', '¡', '¬', '√', 'ƒ', '≈', '∆', '«', '»', '…', '\u{00A0}', 'À', 'Ã', 'Õ', 'Œ', 'œ', //
    '–', '—', '“', '”', '‘', '’', '÷', '◊', 'ÿ', 'Ÿ', '⁄', '€', '‹', '›', 'ﬁ', 'ﬂ', //
    '‡', '·', '‚', '„', '‰', 'Â', 'Ê', 'Á', 'Ë', 'È', 'Í', 'Î', 'Ï', 'Ì', 'Ó', 'Ô', //
    '\u{F8FF}', 'Ò', 'Ú', 'Û', 'Ù', 'ı', 'ˆ', '˜', '¯', '˘', '˙', '˚', '¸', '˝', '˛', 'ˇ',
];

/// Base encodings a simple font can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// WinAnsiEncoding (Windows-1252)
    WinAnsi,
    /// MacRomanEncoding
    MacRoman,
    /// StandardEncoding; decoded for analysis only
    Standard,
}

impl TextEncoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "WinAnsiEncoding" => Some(TextEncoding::WinAnsi),
            "MacRomanEncoding" => Some(TextEncoding::MacRoman),
            "StandardEncoding" => Some(TextEncoding::Standard),
            _ => None,
        }
    }

    pub fn pdf_name(&self) -> &'static str {
        match self {
            TextEncoding::WinAnsi => "WinAnsiEncoding",
            TextEncoding::MacRoman => "MacRomanEncoding",
            TextEncoding::Standard => "StandardEncoding",
        }
    }

    /// Whether text can be encoded into this encoding
    pub fn is_encodable(&self) -> bool {
        matches!(self, TextEncoding::WinAnsi | TextEncoding::MacRoman)
    }

    pub fn decode_byte(&self, byte: u8) -> Option<char> {
        match self {
            TextEncoding::WinAnsi => match byte {
                0x20..=0x7E | 0xA0..=0xFF => Some(byte as char),
                0x80..=0x9F => WIN_ANSI_HIGH[(byte - 0x80) as usize],
                _ => None,
            },
            TextEncoding::MacRoman => match byte {
                0x20..=0x7E => Some(byte as char),
                0x80..=0xFF => Some(MAC_ROMAN_HIGH[(byte - 0x80) as usize]),
                _ => None,
            },
            TextEncoding::Standard => match byte {
                b'\'' => Some('\u{2019}'),
                b'`' => Some('\u{2018}'),
                0x20..=0x7E => Some(byte as char),
                _ => None,
            },
        }
    }

    pub fn encode_char(&self, ch: char) -> Option<u8> {
        match self {
            TextEncoding::WinAnsi => match ch as u32 {
                0x20..=0x7E | 0xA0..=0xFF => Some(ch as u8),
                _ => WIN_ANSI_HIGH
                    .iter()
                    .position(|c| *c == Some(ch))
                    .map(|i| 0x80 + i as u8),
            },
            TextEncoding::MacRoman => match ch as u32 {
                0x20..=0x7E => Some(ch as u8),
                _ => MAC_ROMAN_HIGH
                    .iter()
                    .position(|c| *c == ch)
                    .map(|i| 0x80 + i as u8),
            },
            TextEncoding::Standard => None,
        }
    }
}

/// Unicode value for an Adobe glyph name used in `/Differences`
pub fn glyph_name_to_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii_alphabetic() {
            return Some(ch);
        }
    }

    if let Some(hex) = name.strip_prefix("uni").filter(|h| h.len() == 4) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }

    let ch = match name {
        "space" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "quoteright" => '\u{2019}',
        "quoteleft" => '\u{2018}',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" | "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "underscore" => '_',
        "grave" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        "Adieresis" => 'Ä',
        "Odieresis" => 'Ö',
        "Udieresis" => 'Ü',
        "adieresis" => 'ä',
        "odieresis" => 'ö',
        "udieresis" => 'ü',
        "germandbls" => 'ß',
        "eacute" => 'é',
        "Eacute" => 'É',
        "egrave" => 'è',
        "agrave" => 'à',
        "ccedilla" => 'ç',
        "Euro" => '€',
        "endash" => '–',
        "emdash" => '—',
        "bullet" => '•',
        "section" => '§',
        "degree" => '°',
        "periodcentered" => '·',
        "quotedblleft" => '“',
        "quotedblright" => '”',
        "quotedblbase" => '„',
        "guillemotleft" => '«',
        "guillemotright" => '»',
        _ => return None,
    };
    Some(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_german_text() {
        let encoding = TextEncoding::WinAnsi;
        let bytes: Vec<u8> = "Größe 12,50 €"
            .chars()
            .map(|c| encoding.encode_char(c).unwrap())
            .collect();
        assert_eq!(bytes[2], 0xF6);
        assert_eq!(bytes[3], 0xDF);
        assert_eq!(*bytes.last().unwrap(), 0x80);

        let decoded: String = bytes
            .iter()
            .map(|b| encoding.decode_byte(*b).unwrap())
            .collect();
        assert_eq!(decoded, "Größe 12,50 €");
    }

    #[test]
    fn test_mac_roman_umlauts() {
        let encoding = TextEncoding::MacRoman;
        assert_eq!(encoding.encode_char('Ä'), Some(0x80));
        assert_eq!(encoding.encode_char('ü'), Some(0x9F));
        assert_eq!(encoding.encode_char('ß'), Some(0xA7));
        assert_eq!(encoding.decode_byte(0x8A), Some('ä'));
    }

    #[test]
    fn test_undefined_codes() {
        assert_eq!(TextEncoding::WinAnsi.decode_byte(0x81), None);
        assert_eq!(TextEncoding::WinAnsi.encode_char('\u{4E2D}'), None);
        assert_eq!(TextEncoding::Standard.encode_char('A'), None);
        assert!(!TextEncoding::Standard.is_encodable());
    }

    #[test]
    fn test_glyph_names() {
        assert_eq!(glyph_name_to_char("A"), Some('A'));
        assert_eq!(glyph_name_to_char("udieresis"), Some('ü'));
        assert_eq!(glyph_name_to_char("uni20AC"), Some('€'));
        assert_eq!(glyph_name_to_char("space"), Some(' '));
        assert_eq!(glyph_name_to_char("g123"), None);
    }
}
