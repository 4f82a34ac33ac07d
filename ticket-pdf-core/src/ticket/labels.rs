//! Label values and their placement

use super::config::{Alignment, LabelField, TextConfig, TicketConfig};
use super::model::{BookingData, PlatzStatus, Vorgang, Vorstellung};
use crate::error::{PdfError, Result};
use crate::generation::ContentGenerator;
use crate::geometry::TransformationMatrix;
use crate::graphics::Color;
use crate::objects::Object;
use crate::resources::ResourceResolver;
use crate::text::{Font, StandardFont};
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// `1250` cents as `12,50 €`
pub fn format_price(cents: u32, currency: &str) -> String {
    format!("{},{:02} {}", cents / 100, cents % 100, currency)
}

/// Nine digits in groups of three: `000 012 345`
pub fn format_booking_number(number: u32) -> String {
    let digits = format!("{number:09}");
    let groups: Vec<&str> = digits
        .as_bytes()
        .chunks(3)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect();
    groups.join(" ")
}

/// Free tickets show the kind of ticket instead of a price
pub fn price_text(booking: &BookingData) -> String {
    let vorgang = &booking.vorgang;
    if vorgang.zahlungsart.is_free() {
        return vorgang.zahlungsart.display_name().to_string();
    }
    let event = &booking.veranstaltung;
    format_price(event.preis, &event.extra.currency)
}

pub fn payment_text(vorgang: &Vorgang) -> String {
    if vorgang.zahlungsart.is_free() {
        vorgang.zahlungsart.display_name().to_string()
    } else if vorgang.bezahlt {
        "bezahlt".to_string()
    } else {
        "offen".to_string()
    }
}

/// Text of every label field for one ticket
pub fn ticket_labels(
    booking: &BookingData,
    status: &PlatzStatus,
    vorstellung: &Vorstellung,
) -> BTreeMap<LabelField, String> {
    LabelField::ALL
        .into_iter()
        .map(|field| {
            let text = match field {
                LabelField::Datum => format_date(vorstellung.datum),
                LabelField::Uhrzeit => format_time(vorstellung.uhrzeit),
                LabelField::Block => status.block.clone(),
                LabelField::Reihe => status.reihe.clone(),
                LabelField::Platz => status.platz.to_string(),
                LabelField::Preis => price_text(booking),
                LabelField::Bezahlstatus => payment_text(&booking.vorgang),
                LabelField::Vorgangsnummer => format_booking_number(booking.vorgang.nummer),
            };
            (field, text)
        })
        .collect()
}

/// A font ready for [`ContentGenerator::set_font`]
#[derive(Debug, Clone)]
pub struct LabelFont {
    pub resource_name: String,
    pub font: Arc<Font>,
    /// Font dictionary to add to the page, `None` for template fonts
    pub resource: Option<Object>,
}

/// Look `name` up among the template's fonts, then among the standard 14
pub fn resolve_label_font(resolver: &mut ResourceResolver<'_>, name: &str) -> Result<LabelFont> {
    if resolver.names("Font")?.iter().any(|n| n == name) {
        let font = resolver.font(name);
        if !font.can_encode() {
            return Err(PdfError::UnsupportedEncoding(format!(
                "template font {name} ({})",
                font.base_font()
            )));
        }
        return Ok(LabelFont {
            resource_name: name.to_string(),
            font,
            resource: None,
        });
    }
    let standard = StandardFont::from_base_font(name)
        .ok_or_else(|| PdfError::FontError(format!("unknown label font {name}")))?;
    let font = Font::standard(standard);
    let resource = Object::Dictionary(font.to_dictionary());
    Ok(LabelFont {
        resource_name: format!("TP{}", standard.pdf_name().replace('-', "")),
        font: Arc::new(font),
        resource: Some(resource),
    })
}

/// Fonts a label can be set in: encodable template fonts, then the standard 14
pub fn usable_fonts(resolver: &mut ResourceResolver<'_>) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for name in resolver.names("Font")? {
        if resolver.font(&name).can_encode() {
            names.push(name);
        }
    }
    names.extend(StandardFont::ALL.iter().map(|f| f.pdf_name().to_string()));
    Ok(names)
}

/// Write `text` at `config`'s anchor, aligned by its exact advance
pub fn draw_label(
    generator: &mut ContentGenerator,
    config: &TextConfig,
    font: &LabelFont,
    text: &str,
) -> Result<()> {
    let color = config.color;
    generator
        .set_fill_color(Color::rgb(color.r, color.g, color.b))
        .begin_text()
        .set_font(
            &font.resource_name,
            Arc::clone(&font.font),
            config.font_size,
            font.resource.clone(),
        );
    let advance = generator.text_advance(text)?;
    let x = match config.alignment {
        Alignment::Left => config.position.x,
        Alignment::Center => config.position.x - advance / 2.0,
        Alignment::Right => config.position.x - advance,
    };
    generator
        .set_text_matrix(TransformationMatrix::translation(x, config.position.y))
        .show_text(text)?
        .end_text();
    Ok(())
}

/// Every configured label of one ticket
pub fn draw_labels(
    generator: &mut ContentGenerator,
    resolver: &mut ResourceResolver<'_>,
    config: &TicketConfig,
    values: &BTreeMap<LabelField, String>,
) -> Result<()> {
    let mut fonts: BTreeMap<String, LabelFont> = BTreeMap::new();
    for (field, text) in values {
        let Some(text_config) = config.text(*field) else {
            continue;
        };
        let font = match fonts.get(&text_config.font) {
            Some(font) => font.clone(),
            None => {
                let font = resolve_label_font(resolver, &text_config.font)?;
                fonts.insert(text_config.font.clone(), font.clone());
                font
            }
        };
        debug!(?field, text = %text, "label");
        draw_label(generator, text_config, &font, text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::GraphicsState;
    use crate::document::Document;
    use crate::objects::Dictionary;
    use crate::ticket::config::{Position, RgbColor};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_formats() {
        assert_eq!(format_booking_number(12345), "000 012 345");
        assert_eq!(format_booking_number(987654321), "987 654 321");
        assert_eq!(format_price(1250, "€"), "12,50 €");
        assert_eq!(format_price(5, "EUR"), "0,05 EUR");
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(format_date(date), "01.03.2024");
        let time = NaiveTime::from_hms_opt(9, 5, 0).unwrap();
        assert_eq!(format_time(time), "09:05");
    }

    fn label(alignment: Alignment) -> TextConfig {
        TextConfig {
            position: Position { x: 200.0, y: 100.0 },
            alignment,
            font: "Helvetica".into(),
            font_size: 10.0,
            color: RgbColor::BLACK,
        }
    }

    fn drawn(alignment: Alignment) -> String {
        let document = Document::new();
        let mut resolver = ResourceResolver::empty(&document);
        let font = resolve_label_font(&mut resolver, "Helvetica").unwrap();
        let mut generator = ContentGenerator::new(GraphicsState::default());
        draw_label(&mut generator, &label(alignment), &font, "Platz").unwrap();
        let content = generator.finish();
        assert!(content
            .resources
            .get_dict("Font")
            .unwrap()
            .contains_key("TPHelvetica"));
        String::from_utf8(content.data).unwrap()
    }

    #[test]
    fn test_alignment_uses_advance() {
        assert!(drawn(Alignment::Left).contains("1 0 0 1 200 100 Tm"));
        assert!(drawn(Alignment::Right).contains("1 0 0 1 177.77 100 Tm"));
        assert!(drawn(Alignment::Center).contains("1 0 0 1 188.885 100 Tm"));
    }

    #[test]
    fn test_color_precedes_text_object() {
        let text = drawn(Alignment::Left);
        assert!(text.starts_with("0 0 0 rg\nBT\n/TPHelvetica 10 Tf\n"));
        assert!(text.ends_with("(Platz) Tj\nET\n"));
    }

    #[test]
    fn test_unknown_font() {
        let document = Document::new();
        let mut resolver = ResourceResolver::empty(&document);
        assert!(resolve_label_font(&mut resolver, "Comic Sans").is_err());
        assert_eq!(usable_fonts(&mut resolver).unwrap().len(), 14);
    }

    #[test]
    fn test_template_font_preferred() {
        let mut document = Document::new();
        let font_id = document.add_object(Font::standard(StandardFont::TimesRoman).to_dictionary());
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", fonts);
        let mut resolver = ResourceResolver::new(&document, resources);

        let font = resolve_label_font(&mut resolver, "F1").unwrap();
        assert_eq!(font.resource_name, "F1");
        assert!(font.resource.is_none());
        assert_eq!(font.font.base_font(), "Times-Roman");
        assert_eq!(usable_fonts(&mut resolver).unwrap()[0], "F1");
    }
}
