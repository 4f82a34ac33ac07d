//! Seat icons
//!
//! Three RGBA bitmaps: free seats, other seats of the booking, and the seat a
//! page is printed for. They are either drawn here in the event's seat
//! colors or decoded from PNG files (`external-images` feature), and become
//! image XObjects with a soft mask for their alpha channel.

use super::config::RgbColor;
use super::model::VeranstaltungsEinstellungen;
use crate::document::Document;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object, ObjectId, Stream};

/// Edge length of the built-in icons, in pixels
const BUILTIN_SIZE: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconBitmap {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl IconBitmap {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || rgba.len() != (width * height * 4) as usize {
            return Err(PdfError::InvalidImage(format!(
                "{width}x{height} icon with {} bytes of RGBA data",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    #[cfg(feature = "external-images")]
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .map_err(|e| PdfError::InvalidImage(format!("seat icon: {e}")))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Self::from_rgba(width, height, decoded.into_raw())
    }

    /// A seat seen from above: backrest on top, rounded seat below
    pub fn seat(color: RgbColor) -> Self {
        let size = BUILTIN_SIZE as i64;
        let fill = [channel(color.r), channel(color.g), channel(color.b)];
        let back = [
            channel(color.r * 0.6),
            channel(color.g * 0.6),
            channel(color.b * 0.6),
        ];
        let mut rgba = Vec::with_capacity((BUILTIN_SIZE * BUILTIN_SIZE * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let pixel = if in_rounded_rect(x, y, 2, 2, size - 3, 9, 3) {
                    Some(back)
                } else if in_rounded_rect(x, y, 4, 11, size - 5, size - 3, 5) {
                    Some(fill)
                } else {
                    None
                };
                match pixel {
                    Some([r, g, b]) => rgba.extend_from_slice(&[r, g, b, 255]),
                    None => rgba.extend_from_slice(&[255, 255, 255, 0]),
                }
            }
        }
        Self {
            width: BUILTIN_SIZE,
            height: BUILTIN_SIZE,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn has_transparency(&self) -> bool {
        self.rgba.chunks_exact(4).any(|px| px[3] != 255)
    }

    /// Add the icon to `document` as an image XObject
    pub fn add_to(&self, document: &mut Document) -> ObjectId {
        let rgb: Vec<u8> = self
            .rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        let mut image = self.image_dictionary("DeviceRGB");

        if self.has_transparency() {
            let alpha: Vec<u8> = self.rgba.chunks_exact(4).map(|px| px[3]).collect();
            let mask = Stream::with_dictionary(self.image_dictionary("DeviceGray"), alpha);
            let mask_id = document.add_object(mask);
            image.set("SMask", Object::Reference(mask_id));
        }
        document.add_object(Stream::with_dictionary(image, rgb))
    }

    fn image_dictionary(&self, color_space: &str) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("XObject"));
        dict.set("Subtype", Object::name("Image"));
        dict.set("Width", self.width);
        dict.set("Height", self.height);
        dict.set("ColorSpace", Object::name(color_space));
        dict.set("BitsPerComponent", 8);
        dict
    }
}

fn channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn in_rounded_rect(x: i64, y: i64, x0: i64, y0: i64, x1: i64, y1: i64, radius: i64) -> bool {
    if x < x0 || x > x1 || y < y0 || y > y1 {
        return false;
    }
    let cx = x.clamp(x0 + radius, x1 - radius);
    let cy = y.clamp(y0 + radius, y1 - radius);
    let (dx, dy) = (x - cx, y - cy);
    dx * dx + dy * dy <= radius * radius
}

/// The three icon states of a seat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatIcons {
    pub free: IconBitmap,
    pub related: IconBitmap,
    pub subject: IconBitmap,
}

impl SeatIcons {
    /// Icons drawn in the event's seat colors
    pub fn builtin(settings: &VeranstaltungsEinstellungen) -> Result<Self> {
        Ok(Self {
            free: IconBitmap::seat(settings.free_color()?),
            related: IconBitmap::seat(settings.related_color()?),
            subject: IconBitmap::seat(settings.subject_color()?),
        })
    }

    #[cfg(feature = "external-images")]
    pub fn from_png_files(
        free: &std::path::Path,
        related: &std::path::Path,
        subject: &std::path::Path,
    ) -> Result<Self> {
        Ok(Self {
            free: IconBitmap::from_png(&std::fs::read(free)?)?,
            related: IconBitmap::from_png(&std::fs::read(related)?)?,
            subject: IconBitmap::from_png(&std::fs::read(subject)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rgba_length_checked() {
        assert!(IconBitmap::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(IconBitmap::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_builtin_seat_shape() {
        let icon = IconBitmap::seat(RgbColor::new(1.0, 0.0, 0.0));
        assert_eq!((icon.width(), icon.height()), (32, 32));
        let pixel = |x: usize, y: usize| &icon.rgba[(y * 32 + x) * 4..(y * 32 + x) * 4 + 4];
        assert_eq!(pixel(0, 0)[3], 0);
        assert_eq!(pixel(16, 20), &[255, 0, 0, 255]);
        assert_eq!(pixel(16, 5), &[153, 0, 0, 255]);
    }

    #[test]
    fn test_xobject_with_soft_mask() {
        let mut document = Document::new();
        let icon = IconBitmap::seat(RgbColor::BLACK);
        let id = icon.add_to(&mut document);
        let image = document.object(id).unwrap().as_stream().unwrap();
        assert_eq!(image.data().len(), 32 * 32 * 3);
        let mask_id = image.dictionary().get_reference("SMask").unwrap();
        let mask = document.object(mask_id).unwrap().as_stream().unwrap();
        assert_eq!(mask.dictionary().get_name("ColorSpace"), Some("DeviceGray"));
        assert_eq!(mask.data().len(), 32 * 32);
    }

    #[test]
    fn test_opaque_icon_has_no_mask() {
        let mut document = Document::new();
        let icon = IconBitmap::from_rgba(1, 1, vec![10, 20, 30, 255]).unwrap();
        let id = icon.add_to(&mut document);
        let image = document.object(id).unwrap().as_stream().unwrap();
        assert!(image.dictionary().get("SMask").is_none());
        assert_eq!(image.data(), &[10, 20, 30]);
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn test_builtin_uses_settings() {
        let mut settings = VeranstaltungsEinstellungen::default();
        assert!(SeatIcons::builtin(&settings).is_ok());
        settings.free_seat_color = "grau".into();
        assert!(SeatIcons::builtin(&settings).is_err());
    }
}
