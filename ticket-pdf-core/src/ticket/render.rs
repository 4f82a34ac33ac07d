//! Ticket rendering pipeline
//!
//! A run moves through fixed stages, each one a type:
//!
//! ```text
//! LoadData -> StripPlaceholders -> SharedPrefix -> SharedSuffix -> PerSeatPage -> Assembled
//! ```
//!
//! Every output page paints, in order: the stripped template wrapped in a
//! save/restore pair, the seat plan prefix, its per-seat variant, the seat
//! plan suffix, and a stream with the labels and the QR code. Streams that do
//! not depend on the seat are stored once and shared by all pages.

use super::config::TicketConfig;
use super::icons::SeatIcons;
use super::labels::{
    draw_labels, format_date, format_time, payment_text, price_text, ticket_labels,
};
use super::model::{find_seat, BookingData, PlatzStatus, Vorstellung};
use super::qr::{draw_qr_code, QrCodeProvider, QrPayload};
use super::seat_plan::{PlacedIcons, SeatPlan};
use crate::analysis::AnalyzedContentStream;
use crate::content::{GraphicsState, Operator};
use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::generation::{ContentGenerator, GeneratedContent};
use crate::objects::{Dictionary, Object, ObjectId, Stream};
use crate::page::Page;
use crate::page_tree;
use crate::resources::ResourceResolver;
use crate::writer::WriterConfig;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

/// Key of the page-piece dictionary tickets are tagged with
pub const DEFAULT_PIECE_INFO_KEY: &str = "TicketPdf";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub writer: WriterConfig,
    pub piece_info_key: String,
    /// `LastModified` of the generated pages, now when absent
    pub modified: Option<DateTime<Utc>>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            writer: WriterConfig::default(),
            piece_info_key: DEFAULT_PIECE_INFO_KEY.to_string(),
            modified: None,
        }
    }
}

/// One ticket run in stage `S`
pub struct TicketRun<'r, S> {
    document: Document,
    template: Page,
    config: &'r TicketConfig,
    booking: &'r BookingData,
    options: &'r RenderOptions,
    stage: S,
}

pub struct LoadData;

/// The template's content without placeholders
#[derive(Debug, Clone, Copy)]
struct TemplateContent {
    id: ObjectId,
    open_saves: usize,
}

pub struct StripPlaceholders {
    template: TemplateContent,
}

struct SharedStream {
    id: ObjectId,
    resources: Dictionary,
}

struct SeatPlanStreams<'r> {
    plan: SeatPlan<'r>,
    icons: PlacedIcons,
    prefix: GeneratedContent,
    prefix_stream: SharedStream,
}

pub struct SharedPrefix<'r> {
    template: TemplateContent,
    seat_plan: Option<SeatPlanStreams<'r>>,
}

pub struct SharedSuffix<'r> {
    template: TemplateContent,
    seat_plan: Option<(SeatPlanStreams<'r>, SharedStream)>,
}

pub struct Assembled {
    pages: Vec<Page>,
}

impl<'r, S> TicketRun<'r, S> {
    pub fn document(&self) -> &Document {
        &self.document
    }

    fn advance<T>(self, stage: T) -> TicketRun<'r, T> {
        TicketRun {
            document: self.document,
            template: self.template,
            config: self.config,
            booking: self.booking,
            options: self.options,
            stage,
        }
    }
}

impl<'r> TicketRun<'r, LoadData> {
    /// Parse the template and check it has a single page and the booking has seats
    pub fn load(
        template: &[u8],
        config: &'r TicketConfig,
        booking: &'r BookingData,
        options: &'r RenderOptions,
    ) -> Result<Self> {
        let mut document = Document::load(template)?;
        let pages = page_tree::flatten(&mut document)?;
        let [page] = pages.as_slice() else {
            return Err(PdfError::UnsupportedPageCount(pages.len()));
        };
        if booking.tickets().is_empty() {
            return Err(PdfError::Consistency(format!(
                "booking {} has no seats",
                booking.vorgang.nummer
            )));
        }
        debug!(objects = document.len(), "template loaded");
        Ok(Self {
            template: *page,
            document,
            config,
            booking,
            options,
            stage: LoadData,
        })
    }

    /// Cut the placeholder operators out of the template content
    pub fn strip_placeholders(mut self) -> Result<TicketRun<'r, StripPlaceholders>> {
        let page = self.template;
        let data = page.content_data(&self.document)?;
        let mut resources = page.resources(&self.document)?;

        let (stripped, open_saves, used) = {
            let mut resolver = ResourceResolver::new(&self.document, resources.clone());
            let analyzed =
                AnalyzedContentStream::parse(&data, &mut resolver, GraphicsState::default())?;
            let stripped = cut_ranges(&data, &analyzed, self.config)?;
            let remaining =
                AnalyzedContentStream::parse(&stripped, &mut resolver, GraphicsState::default())?;
            (stripped, remaining.open_saves(), xobject_names(&remaining))
        };

        if let Some(xobjects) = resources.get_mut("XObject").and_then(Object::as_dict_mut) {
            let placeholder_names = self
                .config
                .sitzplan_config
                .iter()
                .map(|c| &c.image)
                .chain(self.config.qr_code_config.iter().map(|c| &c.image))
                .filter_map(|image| image.xobject_name.as_deref());
            for name in placeholder_names {
                if !used.contains(name) && xobjects.remove(name).is_some() {
                    debug!(name, "placeholder XObject dropped");
                }
            }
        }
        page.set_resources(&mut self.document, resources)?;
        let id = page.set_content(&mut self.document, stripped)?;

        Ok(self.advance(StripPlaceholders {
            template: TemplateContent { id, open_saves },
        }))
    }
}

fn cut_ranges(
    data: &[u8],
    analyzed: &AnalyzedContentStream,
    config: &TicketConfig,
) -> Result<Vec<u8>> {
    let mut stripped = Vec::with_capacity(data.len());
    let mut cursor = 0;
    for range in config.placeholder_ranges() {
        let bytes = analyzed
            .byte_range(&(range.start..=range.end))
            .ok_or_else(|| {
                PdfError::InvalidStructure(format!(
                    "placeholder operators {}..={} are not in the template ({} operators)",
                    range.start,
                    range.end,
                    analyzed.len()
                ))
            })?;
        if bytes.start < cursor {
            return Err(PdfError::InvalidStructure(format!(
                "placeholder operators {}..={} overlap",
                range.start, range.end
            )));
        }
        stripped.extend_from_slice(&data[cursor..bytes.start]);
        stripped.push(b'\n');
        cursor = bytes.end;
    }
    stripped.extend_from_slice(&data[cursor..]);
    Ok(stripped)
}

fn xobject_names(stream: &AnalyzedContentStream) -> HashSet<String> {
    stream
        .operators()
        .iter()
        .filter_map(|op| match &op.operator {
            Operator::PaintXObject { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

impl<'r> TicketRun<'r, StripPlaceholders> {
    /// Store the seat icons and the shared opening of the seat plan
    pub fn build_shared_prefix(
        mut self,
        icons: &SeatIcons,
    ) -> Result<TicketRun<'r, SharedPrefix<'r>>> {
        let template = self.stage.template;
        let config: &'r TicketConfig = self.config;
        let Some(config) = config.sitzplan_config.as_ref() else {
            return Ok(self.advance(SharedPrefix {
                template,
                seat_plan: None,
            }));
        };

        let plan = SeatPlan::new(self.booking, config)?;
        let placed = PlacedIcons::add(&mut self.document, icons);
        let prefix = plan.prefix(&placed)?;
        let prefix_stream = SharedStream {
            id: self.document.add_object(Stream::new(prefix.data.clone())),
            resources: prefix.resources.clone(),
        };
        Ok(self.advance(SharedPrefix {
            template,
            seat_plan: Some(SeatPlanStreams {
                plan,
                icons: placed,
                prefix,
                prefix_stream,
            }),
        }))
    }
}

impl<'r> TicketRun<'r, SharedPrefix<'r>> {
    /// Store the shared closing of the seat plan
    pub fn build_shared_suffix(self) -> Result<TicketRun<'r, SharedSuffix<'r>>> {
        let TicketRun {
            mut document,
            template,
            config,
            booking,
            options,
            stage,
        } = self;
        let seat_plan = match stage.seat_plan {
            Some(streams) => {
                let suffix = streams.plan.suffix(&streams.prefix)?;
                let stream = SharedStream {
                    id: document.add_object(Stream::new(suffix.data)),
                    resources: suffix.resources,
                };
                Some((streams, stream))
            }
            None => None,
        };
        Ok(TicketRun {
            document,
            template,
            config,
            booking,
            options,
            stage: SharedSuffix {
                template: stage.template,
                seat_plan,
            },
        })
    }
}

impl<'r> TicketRun<'r, SharedSuffix<'r>> {
    /// One page per ticket of the booking
    pub fn render_pages(mut self, qr: &dyn QrCodeProvider) -> Result<TicketRun<'r, Assembled>> {
        let booking = self.booking;
        let template = self.stage.template;
        let seats = booking.all_seats();
        let template_resources = self.template.resources(&self.document)?;
        let modified = self.options.modified.unwrap_or_else(Utc::now);

        let open = self.document.add_object(Stream::new(b"q\n".to_vec()));
        let close = self
            .document
            .add_object(Stream::new(b"Q\n".repeat(template.open_saves + 1)));

        let mut pages = Vec::new();
        for status in booking.tickets() {
            let vorstellung = booking.vorstellung(status.vorstellung)?;
            find_seat(&seats, status)?;

            let page = page_tree::clone_page(&mut self.document, self.template)?;
            page.set_contents(&mut self.document, &[open, template.id, close])?;

            if let Some((streams, suffix)) = &self.stage.seat_plan {
                let prefix = &streams.prefix_stream;
                page.append_content_id(&mut self.document, prefix.id, &prefix.resources)?;
                let variant = streams
                    .plan
                    .seat_variant(&streams.prefix, &streams.icons, status)?;
                page.add_content_stream(&mut self.document, variant.data, &variant.resources)?;
                page.append_content_id(&mut self.document, suffix.id, &suffix.resources)?;
            }

            let overlay = {
                let mut resolver =
                    ResourceResolver::new(&self.document, template_resources.clone());
                ticket_overlay(self.config, booking, status, vorstellung, &mut resolver, qr)?
            };
            if !overlay.operators.is_empty() {
                page.add_content_stream(&mut self.document, overlay.data, &overlay.resources)?;
            }

            page.set_piece_info(
                &mut self.document,
                &self.options.piece_info_key,
                piece_info(booking, status, vorstellung),
                modified,
            )?;
            debug!(
                block = %status.block,
                reihe = %status.reihe,
                platz = status.platz,
                "ticket page"
            );
            pages.push(page);
        }

        page_tree::remove_page(&mut self.document, self.template)?;
        info!(pages = pages.len(), vorgang = booking.vorgang.nummer, "tickets rendered");
        Ok(self.advance(Assembled { pages }))
    }
}

/// Labels and QR code of one ticket
fn ticket_overlay(
    config: &TicketConfig,
    booking: &BookingData,
    status: &PlatzStatus,
    vorstellung: &Vorstellung,
    resolver: &mut ResourceResolver<'_>,
    qr: &dyn QrCodeProvider,
) -> Result<GeneratedContent> {
    let mut generator = ContentGenerator::new(GraphicsState::default());
    let values = ticket_labels(booking, status, vorstellung);
    draw_labels(&mut generator, resolver, config, &values)?;

    if let Some(qr_config) = &config.qr_code_config {
        let payload = qr_payload(booking, status, vorstellung);
        let bitmap = qr.encode(&payload.to_json()?)?;
        draw_qr_code(&mut generator, qr_config, &bitmap)?;
    }
    Ok(generator.finish())
}

pub fn qr_payload(
    booking: &BookingData,
    status: &PlatzStatus,
    vorstellung: &Vorstellung,
) -> QrPayload {
    QrPayload {
        date: format_date(vorstellung.datum),
        time: format_time(vorstellung.uhrzeit),
        block: status.block.clone(),
        row: status.reihe.clone(),
        seat: status.platz,
        price: price_text(booking),
        payment: payment_text(&booking.vorgang),
        booking_number: booking.vorgang.nummer,
    }
}

fn piece_info(
    booking: &BookingData,
    status: &PlatzStatus,
    vorstellung: &Vorstellung,
) -> Dictionary {
    let mut private = Dictionary::new();
    private.set("Block", Object::string(status.block.as_str()));
    private.set("Reihe", Object::string(status.reihe.as_str()));
    private.set("Platz", status.platz);
    private.set("VorgangsNummer", booking.vorgang.nummer);
    private.set("Datum", Object::string(format_date(vorstellung.datum)));
    private.set("Uhrzeit", Object::string(format_time(vorstellung.uhrzeit)));
    private
}

impl<'r> TicketRun<'r, Assembled> {
    pub fn pages(&self) -> &[Page] {
        &self.stage.pages
    }

    /// Drop what no page uses any more and serialize
    pub fn finish(mut self) -> Result<Vec<u8>> {
        page_tree::uplift(&mut self.document)?;
        let pruned = self.document.prune_unreachable();
        debug!(pruned, "unreachable objects dropped");
        self.document.save(&self.options.writer)
    }
}
