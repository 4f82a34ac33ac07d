//! Per-template ticket configuration
//!
//! Produced by [`crate::analysis::detect`], stored as JSON next to the
//! template and read back unchanged when tickets are rendered.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for Position {
    fn from(point: Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }
}

impl From<Position> for Point {
    fn from(position: Position) -> Self {
        Point::new(position.x, position.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`, as stored in event settings
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .ok()
                .map(|v| f64::from(v) / 255.0)
        };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Mixed with white by `amount` (0 keeps the color, 1 gives white)
    pub fn lighten(&self, amount: f64) -> Self {
        let mix = |c: f64| c + (1.0 - c) * amount;
        Self::new(mix(self.r), mix(self.g), mix(self.b))
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Inclusive operator index range in the template content stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRange {
    pub start: usize,
    pub end: usize,
}

impl OperatorRange {
    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corners {
    pub lower_left: Position,
    pub lower_right: Position,
    pub upper_left: Position,
    pub upper_right: Position,
}

impl Corners {
    /// Axis-aligned box from `(x, y)` with `width` and `height`
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            lower_left: Position { x, y },
            lower_right: Position { x: x + width, y },
            upper_left: Position { x, y: y + height },
            upper_right: Position {
                x: x + width,
                y: y + height,
            },
        }
    }
}

/// A placeholder image found in the template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// Resource name used by `Do`; absent for inline images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xobject_name: Option<String>,
    /// Object number of the image XObject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<u32>,
    /// Operators to delete with the placeholder
    pub operator_range: OperatorRange,
    pub corners: Corners,
}

fn default_caption_font() -> String {
    "Helvetica".to_string()
}

fn default_caption_font_size() -> f64 {
    4.0
}

fn default_line_width() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatPlanConfig {
    #[serde(flatten)]
    pub image: ImageConfig,
    /// Standard font for seat numbers and zone captions
    #[serde(default = "default_caption_font")]
    pub caption_font: String,
    #[serde(default = "default_caption_font_size")]
    pub caption_font_size: f64,
    /// Stroke width of entrance arrows
    #[serde(default = "default_line_width")]
    pub line_width: f64,
}

impl SeatPlanConfig {
    pub fn new(image: ImageConfig) -> Self {
        Self {
            image,
            caption_font: default_caption_font(),
            caption_font_size: default_caption_font_size(),
            line_width: default_line_width(),
        }
    }
}

fn default_quiet_zone() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeConfig {
    #[serde(flatten)]
    pub image: ImageConfig,
    /// Light modules added around the code
    #[serde(default = "default_quiet_zone")]
    pub quiet_zone: u32,
}

impl QrCodeConfig {
    pub fn new(image: ImageConfig) -> Self {
        Self {
            image,
            quiet_zone: default_quiet_zone(),
        }
    }
}

/// Where and how one label value is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextConfig {
    pub position: Position,
    #[serde(default)]
    pub alignment: Alignment,
    /// Font resource name in the template, or a standard font name
    pub font: String,
    pub font_size: f64,
    #[serde(default)]
    pub color: RgbColor,
}

/// The label fields a ticket carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelField {
    Datum,
    Uhrzeit,
    Block,
    Reihe,
    Platz,
    Preis,
    Bezahlstatus,
    Vorgangsnummer,
}

impl LabelField {
    pub const ALL: [LabelField; 8] = [
        LabelField::Datum,
        LabelField::Uhrzeit,
        LabelField::Block,
        LabelField::Reihe,
        LabelField::Platz,
        LabelField::Preis,
        LabelField::Bezahlstatus,
        LabelField::Vorgangsnummer,
    ];

    /// Label texts that mark this field in a template
    pub fn search_terms(&self) -> &'static [&'static str] {
        match self {
            LabelField::Datum => &["Datum"],
            LabelField::Uhrzeit => &["Uhrzeit"],
            LabelField::Block => &["Block"],
            LabelField::Reihe => &["Reihe"],
            LabelField::Platz => &["Platz"],
            LabelField::Preis => &["Preis"],
            LabelField::Bezahlstatus => &["Bezahlstatus", "Status"],
            LabelField::Vorgangsnummer => &["Vorgangsnummer"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitzplan_config: Option<SeatPlanConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_config: Option<QrCodeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datum_config: Option<TextConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uhrzeit_config: Option<TextConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_config: Option<TextConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reihe_config: Option<TextConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platz_config: Option<TextConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preis_config: Option<TextConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bezahlstatus_config: Option<TextConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vorgangsnummer_config: Option<TextConfig>,
}

impl TicketConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Nothing was detected
    pub fn is_empty(&self) -> bool {
        self.sitzplan_config.is_none()
            && self.qr_code_config.is_none()
            && LabelField::ALL.iter().all(|f| self.text(*f).is_none())
    }

    pub fn text(&self, field: LabelField) -> Option<&TextConfig> {
        self.text_slot(field).as_ref()
    }

    pub fn set_text(&mut self, field: LabelField, config: Option<TextConfig>) {
        *self.text_slot_mut(field) = config;
    }

    fn text_slot(&self, field: LabelField) -> &Option<TextConfig> {
        match field {
            LabelField::Datum => &self.datum_config,
            LabelField::Uhrzeit => &self.uhrzeit_config,
            LabelField::Block => &self.block_config,
            LabelField::Reihe => &self.reihe_config,
            LabelField::Platz => &self.platz_config,
            LabelField::Preis => &self.preis_config,
            LabelField::Bezahlstatus => &self.bezahlstatus_config,
            LabelField::Vorgangsnummer => &self.vorgangsnummer_config,
        }
    }

    fn text_slot_mut(&mut self, field: LabelField) -> &mut Option<TextConfig> {
        match field {
            LabelField::Datum => &mut self.datum_config,
            LabelField::Uhrzeit => &mut self.uhrzeit_config,
            LabelField::Block => &mut self.block_config,
            LabelField::Reihe => &mut self.reihe_config,
            LabelField::Platz => &mut self.platz_config,
            LabelField::Preis => &mut self.preis_config,
            LabelField::Bezahlstatus => &mut self.bezahlstatus_config,
            LabelField::Vorgangsnummer => &mut self.vorgangsnummer_config,
        }
    }

    /// Placeholder operator ranges to cut from the template, in stream order
    pub fn placeholder_ranges(&self) -> Vec<OperatorRange> {
        let mut ranges: Vec<OperatorRange> = self
            .sitzplan_config
            .iter()
            .map(|c| c.image.operator_range)
            .chain(self.qr_code_config.iter().map(|c| c.image.operator_range))
            .collect();
        ranges.sort_by_key(|r| r.start);
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn image() -> ImageConfig {
        ImageConfig {
            xobject_name: Some("Im1".into()),
            object_id: Some(7),
            operator_range: OperatorRange { start: 3, end: 6 },
            corners: Corners::from_rect(10.0, 20.0, 100.0, 50.0),
        }
    }

    #[test]
    fn test_json_field_names() {
        let mut config = TicketConfig {
            sitzplan_config: Some(SeatPlanConfig::new(image())),
            ..TicketConfig::default()
        };
        config.set_text(
            LabelField::Datum,
            Some(TextConfig {
                position: Position { x: 1.0, y: 2.0 },
                alignment: Alignment::Right,
                font: "F1".into(),
                font_size: 9.0,
                color: RgbColor::BLACK,
            }),
        );
        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(json["sitzplanConfig"]["xobjectName"], "Im1");
        assert_eq!(json["sitzplanConfig"]["operatorRange"]["start"], 3);
        assert_eq!(json["sitzplanConfig"]["captionFont"], "Helvetica");
        assert_eq!(json["datumConfig"]["alignment"], "right");
        assert_eq!(json["datumConfig"]["fontSize"], 9.0);
        assert!(json.get("qrCodeConfig").is_none());
    }

    #[test]
    fn test_defaults_when_reading() {
        let json = r#"{
            "qrCodeConfig": {
                "operatorRange": {"start": 1, "end": 1},
                "corners": {
                    "lowerLeft": {"x": 0, "y": 0},
                    "lowerRight": {"x": 10, "y": 0},
                    "upperLeft": {"x": 0, "y": 10},
                    "upperRight": {"x": 10, "y": 10}
                }
            },
            "platzConfig": {"position": {"x": 5, "y": 5}, "font": "Helvetica", "fontSize": 8}
        }"#;
        let config = TicketConfig::from_json(json).unwrap();
        let qr = config.qr_code_config.as_ref().unwrap();
        assert_eq!(qr.quiet_zone, 1);
        assert_eq!(qr.image.xobject_name, None);
        let platz = config.text(LabelField::Platz).unwrap();
        assert_eq!(platz.alignment, Alignment::Left);
        assert_eq!(platz.color, RgbColor::BLACK);
        assert!(!config.is_empty());
        assert!(TicketConfig::default().is_empty());
    }

    #[test]
    fn test_round_trip() {
        let config = TicketConfig {
            qr_code_config: Some(QrCodeConfig::new(image())),
            ..TicketConfig::default()
        };
        assert_eq!(TicketConfig::from_json(&config.to_json().unwrap()).unwrap(), config);
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(RgbColor::from_hex("#ff0000"), Some(RgbColor::new(1.0, 0.0, 0.0)));
        assert_eq!(RgbColor::from_hex("00ff00"), Some(RgbColor::new(0.0, 1.0, 0.0)));
        assert_eq!(RgbColor::from_hex("#fff"), None);
        assert_eq!(RgbColor::BLACK.lighten(0.5), RgbColor::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_placeholder_ranges_sorted() {
        let mut qr = image();
        qr.operator_range = OperatorRange { start: 0, end: 1 };
        let config = TicketConfig {
            sitzplan_config: Some(SeatPlanConfig::new(image())),
            qr_code_config: Some(QrCodeConfig::new(qr)),
            ..TicketConfig::default()
        };
        let starts: Vec<usize> = config.placeholder_ranges().iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0, 3]);
    }
}
