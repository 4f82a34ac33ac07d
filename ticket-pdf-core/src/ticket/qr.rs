//! QR codes on tickets
//!
//! The bit matrix comes from a [`QrCodeProvider`]; this module only turns it
//! into a 1-bit inline image and places it on the QR placeholder.

use super::config::QrCodeConfig;
use super::placement::perspective_fit_transform;
use crate::content::InlineImage;
use crate::error::{PdfError, Result};
use crate::generation::ContentGenerator;
use crate::objects::{Dictionary, Object};
use serde::Serialize;

/// Data encoded in a ticket's QR code
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub date: String,
    pub time: String,
    pub block: String,
    pub row: String,
    pub seat: u32,
    pub price: String,
    pub payment: String,
    pub booking_number: u32,
}

impl QrPayload {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Square module matrix, row-major from the top, `true` for dark modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrBitmap {
    width: usize,
    modules: Vec<bool>,
}

impl QrBitmap {
    pub fn new(width: usize, modules: Vec<bool>) -> Result<Self> {
        if width == 0 || modules.len() != width * width {
            return Err(PdfError::InvalidImage(format!(
                "QR matrix of width {width} needs {} modules, got {}",
                width * width,
                modules.len()
            )));
        }
        Ok(Self { width, modules })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.modules[y * self.width + x]
    }

    /// DeviceGray image with one bit per module, `quiet_zone` light modules
    /// on each side
    pub fn to_inline_image(&self, quiet_zone: usize) -> InlineImage {
        let size = self.width + 2 * quiet_zone;
        let row_bytes = size.div_ceil(8);
        let mut data = vec![0u8; row_bytes * size];
        for y in 0..size {
            for x in 0..size {
                let dark = x >= quiet_zone
                    && y >= quiet_zone
                    && self.is_dark(x - quiet_zone, y - quiet_zone);
                if !dark {
                    data[y * row_bytes + x / 8] |= 0x80 >> (x % 8);
                }
            }
        }

        let mut dictionary = Dictionary::new();
        dictionary.set("W", size);
        dictionary.set("H", size);
        dictionary.set("BPC", 1);
        dictionary.set("CS", Object::name("G"));
        InlineImage { dictionary, data }
    }
}

/// Source of QR bit matrices
pub trait QrCodeProvider {
    fn encode(&self, payload: &str) -> Result<QrBitmap>;
}

/// [`QrCodeProvider`] backed by the `qrcode` crate
#[cfg(feature = "qr")]
#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodeCrateProvider;

#[cfg(feature = "qr")]
impl QrCodeProvider for QrCodeCrateProvider {
    fn encode(&self, payload: &str) -> Result<QrBitmap> {
        let code = qrcode::QrCode::new(payload.as_bytes())
            .map_err(|e| PdfError::InvalidImage(format!("QR encoding failed: {e}")))?;
        let modules = code
            .to_colors()
            .into_iter()
            .map(|color| color == qrcode::Color::Dark)
            .collect();
        QrBitmap::new(code.width(), modules)
    }
}

/// Paint `bitmap` onto the QR placeholder
pub fn draw_qr_code(
    generator: &mut ContentGenerator,
    config: &QrCodeConfig,
    bitmap: &QrBitmap,
) -> Result<()> {
    let image = bitmap.to_inline_image(config.quiet_zone as usize);
    let size = (bitmap.width() + 2 * config.quiet_zone as usize) as f64;
    let matrix = perspective_fit_transform(&config.image.corners, size, size)?;
    generator
        .save_state()
        .concat_matrix(matrix)
        .inline_image(image)
        .restore_state()?;
    Ok(())
}
