//! Fonts, encodings and glyph metrics

mod encoding;
mod font;
mod metrics;

pub use encoding::{glyph_name_to_char, TextEncoding};
pub use font::{CompositeFont, Font, SimpleFont};
pub use metrics::{measure_text, StandardFont};
