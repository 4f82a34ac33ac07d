//! Ticket rendering
//!
//! Booking records, the persisted template configuration and everything that
//! turns both into ticket pages.

pub mod config;
pub mod icons;
pub mod labels;
pub mod model;
pub mod placement;
pub mod qr;
pub mod render;
pub mod seat_plan;
pub mod store;

pub use config::{
    Alignment, Corners, ImageConfig, LabelField, OperatorRange, Position, QrCodeConfig, RgbColor,
    SeatPlanConfig, TextConfig, TicketConfig,
};
pub use icons::{IconBitmap, SeatIcons};
pub use model::{
    Bereich, BookingData, Eingang, Platz, PlatzGruppe, PlatzStatus, Status, Veranstaltung,
    VeranstaltungsEinstellungen, Vorgang, Vorstellung, Zahlungsart,
};
pub use placement::perspective_fit_transform;
#[cfg(feature = "qr")]
pub use qr::QrCodeCrateProvider;
pub use qr::{QrBitmap, QrCodeProvider, QrPayload};
pub use render::{RenderOptions, TicketRun, DEFAULT_PIECE_INFO_KEY};
pub use store::TicketStore;
