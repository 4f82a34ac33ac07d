//! # ticket-pdf
//!
//! Personalized theater tickets from a one-page PDF template.
//!
//! The crate reads the template's page content as a typed operator sequence,
//! replays the graphics state over it and uses the resulting device-space
//! geometry to find the placeholder artwork and the label texts a designer
//! put on the page. From that configuration and a booking it writes a new
//! PDF with one page per booked seat: the template without its placeholders,
//! a seat plan with the booking's seats highlighted, the label values and a
//! QR code.
//!
//! ## Features
//!
//! - **Object model**: parse and write PDF files, including cross-reference
//!   streams, object streams and incremental updates
//! - **Content streams**: tokenizer, typed operators and a pure graphics state
//!   machine with exact glyph advances
//! - **Analysis**: device-space geometry per operator, deletable operator
//!   ranges and placeholder detection
//! - **Generation**: new content streams built against a mirrored state
//! - **Tickets**: seat plans, labels, QR codes and page assembly
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ticket_pdf::ticket::{BookingData, QrBitmap, QrCodeProvider, RenderOptions, SeatIcons};
//! use ticket_pdf::{detect_configuration, render_ticket_set, Result};
//!
//! struct BlankQr;
//!
//! impl QrCodeProvider for BlankQr {
//!     fn encode(&self, _payload: &str) -> Result<QrBitmap> {
//!         QrBitmap::new(21, vec![false; 21 * 21])
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let template = std::fs::read("template.pdf")?;
//! let config = detect_configuration(&template)?;
//!
//! let booking = BookingData::from_json(&std::fs::read_to_string("booking.json")?)?;
//! let icons = SeatIcons::builtin(&booking.veranstaltung.extra)?;
//! let pdf = render_ticket_set(
//!     &template,
//!     &config,
//!     &booking,
//!     &BlankQr,
//!     &icons,
//!     &RenderOptions::default(),
//! )?;
//! std::fs::write("tickets.pdf", pdf)?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod content;
pub mod document;
pub mod error;
pub mod generation;
pub mod geometry;
pub mod graphics;
pub mod objects;
pub mod page;
pub mod page_tree;
pub mod parser;
pub mod resources;
pub mod text;
pub mod ticket;
pub mod writer;

pub use analysis::AnalyzedContentStream;
pub use content::{GraphicsState, Operator};
pub use document::Document;
pub use error::{ErrorKind, PdfError, Result};
pub use geometry::{Point, Rectangle, TransformationMatrix};
pub use objects::{Dictionary, Object, ObjectId, Stream};
pub use page::Page;
pub use ticket::{BookingData, RenderOptions, SeatIcons, TicketConfig, TicketStore};
pub use writer::WriterConfig;

use resources::ResourceResolver;
use ticket::{QrCodeProvider, TicketRun};
use tracing::debug;

/// Current version of ticket-pdf
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The analyzed content of a template page
#[derive(Debug, Clone)]
pub struct TemplateAnalysis {
    pub stream: AnalyzedContentStream,
    pub crop_box: Rectangle,
}

fn single_page(document: &mut Document) -> Result<Page> {
    let pages = page_tree::flatten(document)?;
    match pages.as_slice() {
        [page] => Ok(*page),
        _ => Err(PdfError::UnsupportedPageCount(pages.len())),
    }
}

/// Parse a one-page template and replay its content
pub fn analyze_template(template: &[u8]) -> Result<TemplateAnalysis> {
    let mut document = Document::load(template)?;
    let page = single_page(&mut document)?;
    let data = page.content_data(&document)?;
    let resources = page.resources(&document)?;
    let crop_box = page.crop_box(&document)?;

    let mut resolver = ResourceResolver::new(&document, resources);
    let stream = AnalyzedContentStream::parse(&data, &mut resolver, GraphicsState::default())?;
    debug!(
        operators = stream.len(),
        images = stream.image_indices().len(),
        texts = stream.text_indices().len(),
        "template analyzed"
    );
    Ok(TemplateAnalysis { stream, crop_box })
}

/// Find placeholders and labels; an empty configuration when nothing matches
pub fn detect_configuration(template: &[u8]) -> Result<TicketConfig> {
    let analysis = analyze_template(template)?;
    analysis::detect(&analysis.stream, analysis.crop_box)
}

/// Font names a label of this template can use
pub fn list_usable_fonts(template: &[u8]) -> Result<Vec<String>> {
    let mut document = Document::load(template)?;
    let page = single_page(&mut document)?;
    let resources = page.resources(&document)?;
    let mut resolver = ResourceResolver::new(&document, resources);
    ticket::labels::usable_fonts(&mut resolver)
}

/// One page per ticket of `booking`, serialized
pub fn render_ticket_set(
    template: &[u8],
    config: &TicketConfig,
    booking: &BookingData,
    qr: &dyn QrCodeProvider,
    icons: &SeatIcons,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    TicketRun::load(template, config, booking, options)?
        .strip_placeholders()?
        .build_shared_prefix(icons)?
        .build_shared_suffix()?
        .render_pages(qr)?
        .finish()
}

/// Remove a stored ticket file; `false` when it did not exist
pub fn delete_generated_ticket(store: &TicketStore, url: &str) -> Result<bool> {
    store.delete(url)
}
