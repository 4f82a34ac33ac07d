//! Graphics-state value types: colors, color spaces and line style

mod color;
mod line;

pub use color::{Color, ColorSpace};
pub use line::{LineCap, LineDashPattern, LineJoin, LineStyle};
