//! Placeholder detection
//!
//! Finds the seat-plan and QR-code placeholder images and the label texts of
//! a template from the geometry recorded by [`AnalyzedContentStream`]. Nothing
//! found is a valid outcome and yields an empty [`TicketConfig`].

use super::{AnalyzedContentStream, ImageCorners, TextSpan};
use crate::content::Operator;
use crate::error::Result;
use crate::geometry::{Point, Rectangle};
use crate::ticket::config::{
    Alignment, Corners, ImageConfig, LabelField, OperatorRange, Position, QrCodeConfig,
    RgbColor, SeatPlanConfig, TextConfig, TicketConfig,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Extra characters a text run may carry around a label, such as a colon
const LABEL_SLACK: usize = 2;

/// Distance from the label baseline to the value baseline, in font sizes
const VALUE_OFFSET: f64 = 1.5;

/// Distance from the price baseline to a synthesized payment status
const STATUS_OFFSET: f64 = 3.0;

pub struct AutoConfig<'s> {
    stream: &'s AnalyzedContentStream,
    crop_box: Rectangle,
}

/// Run every detection step over `stream` on a page with `crop_box`
pub fn detect(stream: &AnalyzedContentStream, crop_box: Rectangle) -> Result<TicketConfig> {
    AutoConfig::new(stream, crop_box).run()
}

impl<'s> AutoConfig<'s> {
    pub fn new(stream: &'s AnalyzedContentStream, crop_box: Rectangle) -> Self {
        Self { stream, crop_box }
    }

    pub fn run(&self) -> Result<TicketConfig> {
        let mut config = TicketConfig::default();

        let seat_plan = self.seat_plan_index();
        if let Some(index) = seat_plan {
            config.sitzplan_config = Some(SeatPlanConfig::new(self.image_config(index)?));
        }
        match self.qr_code_index() {
            Some(index) if Some(index) == seat_plan => {
                debug!(index, "QR candidate is the seat plan image, ignoring it");
            }
            Some(index) => {
                config.qr_code_config = Some(QrCodeConfig::new(self.image_config(index)?));
            }
            None => {}
        }

        for (field, text) in self.labels() {
            config.set_text(field, Some(text));
        }
        Ok(config)
    }

    fn images(&self) -> impl Iterator<Item = (usize, ImageCorners)> + '_ {
        self.stream
            .image_indices()
            .iter()
            .filter_map(|&index| Some((index, self.stream.image_corners(index)?)))
    }

    /// Image whose lower-left corner is closest to the origin
    pub fn seat_plan_index(&self) -> Option<usize> {
        self.images()
            .min_by(|(_, a), (_, b)| {
                let ka = a.lower_left.x + a.lower_left.y;
                let kb = b.lower_left.x + b.lower_left.y;
                ka.total_cmp(&kb)
            })
            .map(|(index, _)| index)
    }

    /// Image in the right half of the crop box reaching farthest to the upper right
    pub fn qr_code_index(&self) -> Option<usize> {
        let center_x = self.crop_box.center().x;
        self.images()
            .filter(|(index, corners)| {
                if corners.min_x() < center_x {
                    return false;
                }
                let inside = corners.all().iter().all(|p| self.strictly_inside(p));
                if !inside {
                    debug!(index, "image touches the crop box edge, not a QR placeholder");
                }
                inside
            })
            .max_by(|(_, a), (_, b)| {
                let fa = a.farthest();
                let fb = b.farthest();
                (fa.x + fa.y).total_cmp(&(fb.x + fb.y))
            })
            .map(|(index, _)| index)
    }

    fn strictly_inside(&self, point: &Point) -> bool {
        let b = &self.crop_box;
        point.x > b.lower_left.x
            && point.x < b.upper_right.x
            && point.y > b.lower_left.y
            && point.y < b.upper_right.y
    }

    fn image_config(&self, index: usize) -> Result<ImageConfig> {
        let range = self.stream.deletable_range(index)?;
        let (xobject_name, object_id) = match self.stream.get(index).map(|op| &op.operator) {
            Some(Operator::PaintXObject { name, xobject }) => {
                (Some(name.clone()), xobject.id().map(|id| id.number()))
            }
            _ => (None, None),
        };
        let corners = self
            .stream
            .image_corners(index)
            .map(|c| Corners {
                lower_left: c.lower_left.into(),
                lower_right: c.lower_right.into(),
                upper_left: c.upper_left.into(),
                upper_right: c.upper_right.into(),
            })
            .unwrap_or_else(|| Corners::from_rect(0.0, 0.0, 0.0, 0.0));
        debug!(index, ?range, ?xobject_name, "placeholder image");
        Ok(ImageConfig {
            xobject_name,
            object_id,
            operator_range: OperatorRange {
                start: *range.start(),
                end: *range.end(),
            },
            corners,
        })
    }

    /// Best text run per label field
    pub fn label_spans(&self) -> BTreeMap<LabelField, TextSpan> {
        let spans = self.stream.text_spans();
        let corner = self.crop_box.upper_right;
        let mut found = BTreeMap::new();
        for field in LabelField::ALL {
            let best = spans
                .iter()
                .filter(|span| {
                    field
                        .search_terms()
                        .iter()
                        .any(|term| matches_label(&span.text, term))
                })
                .min_by(|a, b| {
                    a.start
                        .distance_to(&corner)
                        .total_cmp(&b.start.distance_to(&corner))
                });
            if let Some(span) = best {
                debug!(?field, text = %span.text, index = span.index, "label found");
                found.insert(field, span.clone());
            }
        }
        found
    }

    /// Text configurations for every label found
    pub fn labels(&self) -> BTreeMap<LabelField, TextConfig> {
        let spans = self.label_spans();
        let mut configs = BTreeMap::new();
        if spans.is_empty() {
            return configs;
        }

        let starts: Vec<f64> = spans.values().map(|s| s.start.x).collect();
        let centers: Vec<f64> = spans.values().map(TextSpan::center_x).collect();
        let ends: Vec<f64> = spans.values().map(|s| s.end.x).collect();
        let (alignment, xs) = choose_alignment(&starts, &centers, &ends);
        let x = mean(xs);
        debug!(?alignment, x, "label alignment");

        for (field, span) in &spans {
            configs.insert(*field, self.text_config(span, alignment, x, VALUE_OFFSET));
        }

        if !configs.contains_key(&LabelField::Bezahlstatus) {
            if let Some(price) = spans.get(&LabelField::Preis) {
                configs.insert(
                    LabelField::Bezahlstatus,
                    self.text_config(price, alignment, x, STATUS_OFFSET),
                );
            }
        }
        configs
    }

    fn text_config(
        &self,
        span: &TextSpan,
        alignment: Alignment,
        x: f64,
        offset: f64,
    ) -> TextConfig {
        let color = self
            .stream
            .state_before(span.index)
            .fill_color
            .to_rgb()
            .map(|(r, g, b)| RgbColor::new(r, g, b))
            .unwrap_or_default();
        let font = span
            .font_name
            .clone()
            .or_else(|| span.font.as_ref().map(|f| f.base_font().to_string()))
            .unwrap_or_else(|| "Helvetica".to_string());
        TextConfig {
            position: Position {
                x,
                y: span.start.y - offset * span.font_size,
            },
            alignment,
            font,
            font_size: span.font_size,
            color,
        }
    }
}

/// `text` contains `label` (ignoring case) with at most two characters more
pub fn matches_label(text: &str, label: &str) -> bool {
    let text = text.trim().to_lowercase();
    let label = label.to_lowercase();
    text.contains(&label) && text.chars().count() <= label.chars().count() + LABEL_SLACK
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    mean(&values.iter().map(|v| (v - m).powi(2)).collect::<Vec<_>>())
}

/// Axis with the least spread; ties keep the earlier of left, center, right
fn choose_alignment<'v>(
    starts: &'v [f64],
    centers: &'v [f64],
    ends: &'v [f64],
) -> (Alignment, &'v [f64]) {
    let mut best = (Alignment::Left, starts, variance(starts));
    for (alignment, values) in [(Alignment::Center, centers), (Alignment::Right, ends)] {
        let v = variance(values);
        if v < best.2 {
            best = (alignment, values, v);
        }
    }
    (best.0, best.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::GraphicsState;
    use crate::document::Document;
    use crate::objects::Dictionary;
    use crate::resources::ResourceResolver;
    use crate::text::{Font, StandardFont};

    fn analyze(document: &Document, resources: Dictionary, data: &[u8]) -> AnalyzedContentStream {
        let mut resolver = ResourceResolver::new(document, resources);
        AnalyzedContentStream::parse(data, &mut resolver, GraphicsState::default()).unwrap()
    }

    fn helvetica_resources() -> Dictionary {
        let mut fonts = Dictionary::new();
        fonts.set("F1", Font::standard(StandardFont::Helvetica).to_dictionary());
        let mut resources = Dictionary::new();
        resources.set("Font", fonts);
        resources
    }

    #[test]
    fn test_label_matching() {
        assert!(matches_label("Datum:", "Datum"));
        assert!(matches_label(" PLATZ ", "Platz"));
        assert!(!matches_label("Sitzplatz", "Platz"));
        assert!(!matches_label("Bezahlstatus", "Status"));
        assert!(matches_label("Status", "Status"));
    }

    #[test]
    fn test_variance_and_alignment() {
        assert_eq!(variance(&[1.0, 1.0, 1.0]), 0.0);
        assert_eq!(variance(&[0.0, 2.0]), 1.0);
        let starts = [10.0, 10.0];
        let centers = [12.0, 15.0];
        let ends = [14.0, 20.0];
        assert_eq!(choose_alignment(&starts, &centers, &ends).0, Alignment::Left);
        let starts = [10.0, 4.0];
        let ends = [20.0, 20.0];
        assert_eq!(choose_alignment(&starts, &centers, &ends).0, Alignment::Right);
        // all equal falls back to left
        assert_eq!(choose_alignment(&[1.0], &[2.0], &[3.0]).0, Alignment::Left);
    }

    #[test]
    fn test_empty_template_gives_empty_config() {
        let document = Document::new();
        let stream = analyze(&document, Dictionary::new(), b"0 0 m 10 10 l S");
        let config = detect(&stream, Rectangle::from_array([0.0, 0.0, 100.0, 100.0])).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_right_aligned_labels() {
        let document = Document::new();
        // "Datum" is 29.45 wide and "Platz" 22.23 at 10pt: both end at x = 200
        let data = b"BT /F1 10 Tf 170.55 700 Td (Datum) Tj ET \
                     BT /F1 10 Tf 177.77 650 Td (Platz) Tj ET";
        let stream = analyze(&document, helvetica_resources(), data);
        let labels = AutoConfig::new(&stream, Rectangle::from_array([0.0, 0.0, 400.0, 800.0]))
            .labels();
        let datum = &labels[&LabelField::Datum];
        assert_eq!(datum.alignment, Alignment::Right);
        assert!((datum.position.x - 200.0).abs() < 1e-6);
        assert!((datum.position.y - 685.0).abs() < 1e-9);
        assert_eq!(datum.font, "F1");
        assert_eq!(datum.font_size, 10.0);
        assert!(labels.contains_key(&LabelField::Platz));
        assert!(!labels.contains_key(&LabelField::Bezahlstatus));
    }

    #[test]
    fn test_payment_status_below_price() {
        let document = Document::new();
        let data = b"BT /F1 8 Tf 1 0 0 1 300 100 Tm (Preis:) Tj ET";
        let stream = analyze(&document, helvetica_resources(), data);
        let labels = AutoConfig::new(&stream, Rectangle::from_array([0.0, 0.0, 400.0, 800.0]))
            .labels();
        assert_eq!(labels[&LabelField::Preis].position.y, 88.0);
        assert_eq!(labels[&LabelField::Bezahlstatus].position.y, 76.0);
        assert_eq!(labels[&LabelField::Bezahlstatus].position.x, 300.0);
    }

    #[test]
    fn test_closest_to_upper_right_wins() {
        let document = Document::new();
        let data = b"BT /F1 8 Tf 1 0 0 1 10 10 Tm (Block) Tj 1 0 0 1 300 700 Tm (Block) Tj ET";
        let stream = analyze(&document, helvetica_resources(), data);
        let spans = AutoConfig::new(&stream, Rectangle::from_array([0.0, 0.0, 400.0, 800.0]))
            .label_spans();
        assert_eq!(spans[&LabelField::Block].start, Point::new(300.0, 700.0));
    }

    #[test]
    fn test_fill_color_recorded() {
        let document = Document::new();
        let data = b"BT 1 0 0 rg /F1 8 Tf (Reihe) Tj ET";
        let stream = analyze(&document, helvetica_resources(), data);
        let labels = AutoConfig::new(&stream, Rectangle::from_array([0.0, 0.0, 400.0, 800.0]))
            .labels();
        assert_eq!(labels[&LabelField::Reihe].color, RgbColor::new(1.0, 0.0, 0.0));
    }
}
