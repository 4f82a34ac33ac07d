/// A color value as tracked by the graphics state.
///
/// Colors set through a color space the engine does not model are recorded as
/// [`Color::Unknown`] instead of failing the replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    /// Grayscale color with value from 0.0 (black) to 1.0 (white)
    Gray(f64),
    /// RGB color (red, green, blue) with values from 0.0 to 1.0
    Rgb(f64, f64, f64),
    /// CMYK color (cyan, magenta, yellow, key/black) with values from 0.0 to 1.0
    Cmyk(f64, f64, f64, f64),
    /// Set through an unsupported color space
    Unknown,
}

impl Default for Color {
    fn default() -> Self {
        Color::black()
    }
}

impl Color {
    /// Creates an RGB color with values clamped to 0.0-1.0.
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color::Rgb(r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0))
    }

    /// Creates a grayscale color with value clamped to 0.0-1.0.
    pub fn gray(value: f64) -> Self {
        Color::Gray(value.clamp(0.0, 1.0))
    }

    pub fn cmyk(c: f64, m: f64, y: f64, k: f64) -> Self {
        Color::Cmyk(
            c.clamp(0.0, 1.0),
            m.clamp(0.0, 1.0),
            y.clamp(0.0, 1.0),
            k.clamp(0.0, 1.0),
        )
    }

    pub fn black() -> Self {
        Color::Gray(0.0)
    }

    pub fn white() -> Self {
        Color::Gray(1.0)
    }

    /// Initial color of `space` after a color space switch
    pub fn initial(space: &ColorSpace) -> Self {
        match space {
            ColorSpace::DeviceGray => Color::Gray(0.0),
            ColorSpace::DeviceRgb => Color::Rgb(0.0, 0.0, 0.0),
            ColorSpace::DeviceCmyk => Color::Cmyk(0.0, 0.0, 0.0, 1.0),
            ColorSpace::Unsupported(_) => Color::Unknown,
        }
    }

    /// Build a color from `sc`/`scn` components in `space`
    pub fn from_components(space: &ColorSpace, components: &[f64]) -> Self {
        match (space, components) {
            (ColorSpace::DeviceGray, [g]) => Color::gray(*g),
            (ColorSpace::DeviceRgb, [r, g, b]) => Color::rgb(*r, *g, *b),
            (ColorSpace::DeviceCmyk, [c, m, y, k]) => Color::cmyk(*c, *m, *y, *k),
            _ => Color::Unknown,
        }
    }

    /// Approximate RGB rendition, `None` for unknown colors
    pub fn to_rgb(&self) -> Option<(f64, f64, f64)> {
        match *self {
            Color::Gray(g) => Some((g, g, g)),
            Color::Rgb(r, g, b) => Some((r, g, b)),
            Color::Cmyk(c, m, y, k) => Some((
                (1.0 - c) * (1.0 - k),
                (1.0 - m) * (1.0 - k),
                (1.0 - y) * (1.0 - k),
            )),
            Color::Unknown => None,
        }
    }

    /// Color space the value belongs to
    pub fn space(&self) -> Option<ColorSpace> {
        match self {
            Color::Gray(_) => Some(ColorSpace::DeviceGray),
            Color::Rgb(..) => Some(ColorSpace::DeviceRgb),
            Color::Cmyk(..) => Some(ColorSpace::DeviceCmyk),
            Color::Unknown => None,
        }
    }

    pub fn components(&self) -> Vec<f64> {
        match *self {
            Color::Gray(g) => vec![g],
            Color::Rgb(r, g, b) => vec![r, g, b],
            Color::Cmyk(c, m, y, k) => vec![c, m, y, k],
            Color::Unknown => Vec::new(),
        }
    }
}

/// Color spaces the state machine distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    /// Any other family, kept by name
    Unsupported(String),
}

impl Default for ColorSpace {
    fn default() -> Self {
        ColorSpace::DeviceGray
    }
}

impl ColorSpace {
    /// Device color space for a name or its inline-image abbreviation
    pub fn from_device_name(name: &str) -> Option<Self> {
        match name {
            "DeviceGray" | "G" | "CalGray" => Some(ColorSpace::DeviceGray),
            "DeviceRGB" | "RGB" | "CalRGB" => Some(ColorSpace::DeviceRgb),
            "DeviceCMYK" | "CMYK" => Some(ColorSpace::DeviceCmyk),
            _ => None,
        }
    }

    /// Device space with `n` components (ICCBased /N)
    pub fn from_component_count(n: i64) -> Option<Self> {
        match n {
            1 => Some(ColorSpace::DeviceGray),
            3 => Some(ColorSpace::DeviceRgb),
            4 => Some(ColorSpace::DeviceCmyk),
            _ => None,
        }
    }

    pub fn pdf_name(&self) -> &str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRgb => "DeviceRGB",
            ColorSpace::DeviceCmyk => "DeviceCMYK",
            ColorSpace::Unsupported(name) => name,
        }
    }

    pub fn component_count(&self) -> Option<usize> {
        match self {
            ColorSpace::DeviceGray => Some(1),
            ColorSpace::DeviceRgb => Some(3),
            ColorSpace::DeviceCmyk => Some(4),
            ColorSpace::Unsupported(_) => None,
        }
    }
}
