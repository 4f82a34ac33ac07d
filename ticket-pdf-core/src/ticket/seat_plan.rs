//! Seat plan drawing
//!
//! The plan is split into three content streams. The prefix sets up the room
//! transform and paints everything every page shares (background, zones,
//! free seats); a per-seat variant highlights the booking's seats and the
//! entrance route; the suffix writes the captions and closes the room
//! transform. The prefix leaves its save open for the suffix, so all three
//! must appear on a page in that order.

use super::config::{RgbColor, SeatPlanConfig};
use super::icons::{IconBitmap, SeatIcons};
use super::model::{find_seat, BookingData, Eingang, Platz, PlatzStatus};
use super::placement::perspective_fit_transform;
use crate::content::GraphicsState;
use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::generation::{ContentGenerator, GeneratedContent};
use crate::geometry::{Point, TransformationMatrix};
use crate::graphics::Color;
use crate::objects::{Object, ObjectId};
use crate::text::{Font, StandardFont};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Baseline offset below a caption's center, in font sizes
const CAPTION_BASELINE: f64 = 0.35;

/// Arrowhead length relative to the smaller seat dimension
const ARROW_SCALE: f64 = 0.5;

/// An icon stored in the output document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedIcon {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

impl PlacedIcon {
    fn add(document: &mut Document, bitmap: &IconBitmap) -> Self {
        Self {
            id: bitmap.add_to(document),
            width: bitmap.width(),
            height: bitmap.height(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedIcons {
    pub free: PlacedIcon,
    pub related: PlacedIcon,
    pub subject: PlacedIcon,
}

impl PlacedIcons {
    pub fn add(document: &mut Document, icons: &SeatIcons) -> Self {
        Self {
            free: PlacedIcon::add(document, &icons.free),
            related: PlacedIcon::add(document, &icons.related),
            subject: PlacedIcon::add(document, &icons.subject),
        }
    }
}

struct CaptionFont {
    name: String,
    font: Arc<Font>,
    dictionary: Object,
}

pub struct SeatPlan<'b> {
    booking: &'b BookingData,
    config: &'b SeatPlanConfig,
    seats: Vec<Platz>,
    room_matrix: TransformationMatrix,
    caption_font: CaptionFont,
}

impl<'b> SeatPlan<'b> {
    pub fn new(booking: &'b BookingData, config: &'b SeatPlanConfig) -> Result<Self> {
        let event = &booking.veranstaltung;
        if event.raum_breite <= 0.0 || event.raum_hoehe <= 0.0 {
            return Err(PdfError::Consistency(format!(
                "room of {}x{} cannot be drawn",
                event.raum_breite, event.raum_hoehe
            )));
        }
        let fit =
            perspective_fit_transform(&config.image.corners, event.raum_breite, event.raum_hoehe)?;
        // room y grows downwards from the top-left corner
        let flip = TransformationMatrix::new(
            1.0 / event.raum_breite,
            0.0,
            0.0,
            -1.0 / event.raum_hoehe,
            0.0,
            1.0,
        );

        let standard = StandardFont::from_base_font(&config.caption_font).ok_or_else(|| {
            PdfError::FontError(format!("unknown caption font {}", config.caption_font))
        })?;
        let font = Font::standard(standard);
        let caption_font = CaptionFont {
            name: format!("TP{}", standard.pdf_name().replace('-', "")),
            dictionary: Object::Dictionary(font.to_dictionary()),
            font: Arc::new(font),
        };

        Ok(Self {
            booking,
            config,
            seats: booking.all_seats(),
            room_matrix: flip.multiply(&fit),
            caption_font,
        })
    }

    pub fn seats(&self) -> &[Platz] {
        &self.seats
    }

    /// Room coordinates to device space
    pub fn room_matrix(&self) -> TransformationMatrix {
        self.room_matrix
    }

    /// Unit square to the seat's box in room coordinates, turned around its center
    pub fn seat_matrix(&self, seat: &Platz) -> TransformationMatrix {
        let w = self.booking.veranstaltung.sitz_breite;
        let h = self.booking.veranstaltung.sitz_hoehe;
        TransformationMatrix::new(w, 0.0, 0.0, -h, 0.0, h)
            .multiply(&TransformationMatrix::translation(-w / 2.0, -h / 2.0))
            .multiply(&TransformationMatrix::rotation(seat.rotation.to_radians()))
            .multiply(&TransformationMatrix::translation(
                seat.x + w / 2.0,
                seat.y + h / 2.0,
            ))
    }

    fn draw_seat(
        &self,
        generator: &mut ContentGenerator,
        name: &str,
        icon: PlacedIcon,
        seat: &Platz,
    ) -> Result<()> {
        generator
            .save_state()
            .concat_matrix(self.seat_matrix(seat))
            .draw_image(name, icon.id, icon.width, icon.height)
            .restore_state()?;
        Ok(())
    }

    /// Shared opening stream; leaves the room transform saved and active
    pub fn prefix(&self, icons: &PlacedIcons) -> Result<GeneratedContent> {
        let event = &self.booking.veranstaltung;
        let mut generator = ContentGenerator::new(GraphicsState::default());
        generator
            .save_state()
            .concat_matrix(self.room_matrix)
            .rectangle(0.0, 0.0, event.raum_breite, event.raum_hoehe)
            .clip()
            .set_fill_color(Color::gray(1.0))
            .rectangle(0.0, 0.0, event.raum_breite, event.raum_hoehe)
            .fill();

        for bereich in &self.booking.bereiche {
            let color = RgbColor::from_hex(&bereich.farbe).ok_or_else(|| {
                PdfError::Consistency(format!("zone color {:?} is not #rrggbb", bereich.farbe))
            })?;
            generator
                .set_fill_color(rgb(color))
                .rectangle(bereich.x, bereich.y, bereich.breite, bereich.hoehe)
                .fill();
        }

        for seat in &self.seats {
            self.draw_seat(&mut generator, "SeatFree", icons.free, seat)?;
        }
        debug!(
            seats = self.seats.len(),
            zones = self.booking.bereiche.len(),
            "seat plan prefix"
        );
        Ok(generator.finish())
    }

    /// Per-page stream: the booking's seats, the ticket's seat and its route
    pub fn seat_variant(
        &self,
        prefix: &GeneratedContent,
        icons: &PlacedIcons,
        subject: &PlatzStatus,
    ) -> Result<GeneratedContent> {
        let mut generator = ContentGenerator::resume(prefix);
        generator.save_state();

        for related in self.booking.tickets() {
            if related.vorstellung != subject.vorstellung || related == subject {
                continue;
            }
            let seat = find_seat(&self.seats, related)?;
            self.draw_seat(&mut generator, "SeatRelated", icons.related, seat)?;
        }
        let seat = find_seat(&self.seats, subject)?;
        self.draw_seat(&mut generator, "SeatSubject", icons.subject, seat)?;

        if let Some(entrance) = seat.eingang {
            let chain = self.entrance_chain(entrance)?;
            self.draw_entrances(&mut generator, &chain)?;
        }

        generator.restore_state()?;
        Ok(generator.finish())
    }

    /// Shared closing stream: captions, then the room transform is dropped
    pub fn suffix(&self, prefix: &GeneratedContent) -> Result<GeneratedContent> {
        let event = &self.booking.veranstaltung;
        let mut generator = ContentGenerator::resume(prefix);
        generator.set_fill_color(Color::gray(0.0));

        if event.extra.show_seat_numbers {
            for seat in &self.seats {
                let center = Point::new(
                    seat.x + event.sitz_breite / 2.0,
                    seat.y + event.sitz_hoehe / 2.0,
                );
                self.caption(&mut generator, center, &seat.nummer.to_string())?;
            }
        }
        for bereich in &self.booking.bereiche {
            if let Some(text) = &bereich.beschriftung {
                let center = Point::new(
                    bereich.x + bereich.breite / 2.0,
                    bereich.y + bereich.hoehe / 2.0,
                );
                self.caption(&mut generator, center, text)?;
            }
        }

        generator.restore_all();
        Ok(generator.finish())
    }

    /// Upright text centered on `center`, in room coordinates
    fn caption(&self, generator: &mut ContentGenerator, center: Point, text: &str) -> Result<()> {
        let size = self.config.caption_font_size;
        generator.begin_text().set_font(
            &self.caption_font.name,
            Arc::clone(&self.caption_font.font),
            size,
            Some(self.caption_font.dictionary.clone()),
        );
        let advance = generator.text_advance(text)?;
        generator
            .set_text_matrix(TransformationMatrix::new(
                1.0,
                0.0,
                0.0,
                -1.0,
                center.x - advance / 2.0,
                center.y + size * CAPTION_BASELINE,
            ))
            .show_text(text)?
            .end_text();
        Ok(())
    }

    /// Entrances from the one next to the seat back to the first one walked through
    pub fn entrance_chain(&self, start: u32) -> Result<Vec<&'b Eingang>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(start);
        while let Some(id) = next {
            if !seen.insert(id) {
                return Err(PdfError::Consistency(format!(
                    "entrance {id} links back into its own chain"
                )));
            }
            let entrance = self.booking.eingang(id)?;
            chain.push(entrance);
            next = entrance.eingang;
        }
        Ok(chain)
    }

    /// Stroke the chain towards the seat; only the last hop gets an arrowhead
    fn draw_entrances(&self, generator: &mut ContentGenerator, chain: &[&Eingang]) -> Result<()> {
        let Some(terminus) = chain.first() else {
            return Ok(());
        };
        let connect = self.booking.veranstaltung.extra.connect_entrance_arrows;
        generator
            .set_stroke_color(Color::gray(0.0))
            .set_fill_color(Color::gray(0.0))
            .set_line_width(self.config.line_width);

        let mut pen: Option<Point> = None;
        for entrance in chain.iter().rev() {
            let [p0, p1, p2, p3] = entrance.punkte.map(Point::from);
            match pen {
                Some(end) if connect => {
                    if !end.approx_eq(&p0, 1e-9) {
                        generator.line_to(p0);
                    }
                }
                _ => {
                    generator.move_to(p0);
                }
            }
            generator.curve_to(p1, p2, p3);
            if !connect {
                generator.stroke();
            }
            pen = Some(p3);
        }
        if connect {
            generator.stroke();
        }

        self.arrowhead(generator, terminus);

        for entrance in chain.iter().rev() {
            if let Some(text) = &entrance.text {
                self.caption(generator, entrance.punkte[0].into(), text)?;
            }
        }
        Ok(())
    }

    fn arrowhead(&self, generator: &mut ContentGenerator, entrance: &Eingang) {
        let [p0, _, p2, p3] = entrance.punkte.map(Point::from);
        let mut direction = p3 - p2;
        if direction.length() < 1e-9 {
            direction = p3 - p0;
        }
        if direction.length() < 1e-9 {
            return;
        }
        let event = &self.booking.veranstaltung;
        let length = event.sitz_breite.min(event.sitz_hoehe) * ARROW_SCALE;
        let unit = direction.scale(1.0 / direction.length());
        let normal = Point::new(-unit.y, unit.x).scale(length / 2.0);
        let base = p3 - unit.scale(length);
        generator
            .move_to(p3)
            .line_to(base + normal)
            .line_to(base - normal)
            .close_path()
            .fill();
    }
}

fn rgb(color: RgbColor) -> Color {
    Color::rgb(color.r, color.g, color.b)
}
