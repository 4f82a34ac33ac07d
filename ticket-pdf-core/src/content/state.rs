//! Device-independent graphics state and its transition function

use super::operator::{Operator, TextArrayElement};
use crate::geometry::{Point, TransformationMatrix};
use crate::graphics::{Color, ColorSpace, LineStyle};
use crate::text::Font;
use std::sync::Arc;

/// Text state parameters (`Tc`, `Tw`, `Tz`, `TL`, `Tf`, `Tr`, `Ts`)
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    pub char_spacing: f64,
    pub word_spacing: f64,
    /// Percent
    pub horizontal_scaling: f64,
    pub leading: f64,
    pub font: Option<Arc<Font>>,
    pub font_name: Option<String>,
    pub font_size: f64,
    pub render_mode: i64,
    pub rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            font: None,
            font_name: None,
            font_size: 0.0,
            render_mode: 0,
            rise: 0.0,
        }
    }
}

/// State that only exists between a path's first operator and its painting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathConstructionState {
    pub current_point: Option<Point>,
    pub subpath_start: Option<Point>,
}

/// Text and text-line matrix inside `BT ... ET`
#[derive(Debug, Clone, PartialEq)]
pub struct TextObjectState {
    pub text_matrix: TransformationMatrix,
    pub line_matrix: TransformationMatrix,
}

impl Default for TextObjectState {
    fn default() -> Self {
        Self {
            text_matrix: TransformationMatrix::identity(),
            line_matrix: TransformationMatrix::identity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalState {
    PathConstruction(PathConstructionState),
    TextObject(TextObjectState),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphicsState {
    pub ctm: TransformationMatrix,
    pub stroke_color_space: ColorSpace,
    pub stroke_color: Color,
    pub fill_color_space: ColorSpace,
    pub fill_color: Color,
    pub line: LineStyle,
    pub text: TextState,
    pub additional: Option<AdditionalState>,
}

impl GraphicsState {
    /// Initial state of a page whose user space is mapped by `ctm`
    pub fn with_ctm(ctm: TransformationMatrix) -> Self {
        Self {
            ctm,
            ..Self::default()
        }
    }

    pub fn text_object(&self) -> Option<&TextObjectState> {
        match &self.additional {
            Some(AdditionalState::TextObject(text)) => Some(text),
            _ => None,
        }
    }

    pub fn path_construction(&self) -> Option<&PathConstructionState> {
        match &self.additional {
            Some(AdditionalState::PathConstruction(path)) => Some(path),
            _ => None,
        }
    }

    /// State after `operator`. `q`/`Q` are left to the caller's state stack.
    pub fn react(&self, operator: &Operator) -> GraphicsState {
        let mut next = self.clone();
        match operator {
            Operator::ConcatMatrix(matrix) => next.ctm = matrix.multiply(&self.ctm),
            Operator::SetLineWidth(width) => next.line.width = *width,
            Operator::SetLineCap(cap) => next.line.cap = *cap,
            Operator::SetLineJoin(join) => next.line.join = *join,
            Operator::SetMiterLimit(limit) => next.line.miter_limit = *limit,
            Operator::SetDashPattern(dash) => next.line.dash = dash.clone(),
            Operator::SetExtGState { state, .. } => {
                if let Some(width) = state.line_width {
                    next.line.width = width;
                }
                if let Some(cap) = state.line_cap {
                    next.line.cap = cap;
                }
                if let Some(join) = state.line_join {
                    next.line.join = join;
                }
                if let Some(limit) = state.miter_limit {
                    next.line.miter_limit = limit;
                }
                if let Some(dash) = &state.dash {
                    next.line.dash = dash.clone();
                }
                if let Some((font, size)) = &state.font {
                    next.text.font = Some(Arc::clone(font));
                    next.text.font_name = None;
                    next.text.font_size = *size;
                }
            }

            Operator::MoveTo(point) => {
                next.with_path(|path| {
                    path.current_point = Some(*point);
                    path.subpath_start = Some(*point);
                });
            }
            Operator::LineTo(point)
            | Operator::CurveTo(_, _, point)
            | Operator::CurveToV(_, point)
            | Operator::CurveToY(_, point) => {
                next.with_path(|path| path.current_point = Some(*point));
            }
            Operator::ClosePath => {
                next.with_path(|path| path.current_point = path.subpath_start);
            }
            Operator::Rectangle { x, y, .. } => {
                let corner = Point::new(*x, *y);
                next.with_path(|path| {
                    path.current_point = Some(corner);
                    path.subpath_start = Some(corner);
                });
            }
            painting if painting.is_path_painting() => {
                if self.path_construction().is_some() {
                    next.additional = None;
                }
            }
            // clipping takes effect at the painting operator and has no geometric effect here
            Operator::Clip | Operator::ClipEvenOdd => {}

            Operator::BeginText => {
                next.additional = Some(AdditionalState::TextObject(TextObjectState::default()))
            }
            Operator::EndText => {
                if self.text_object().is_some() {
                    next.additional = None;
                }
            }
            Operator::SetCharSpacing(v) => next.text.char_spacing = *v,
            Operator::SetWordSpacing(v) => next.text.word_spacing = *v,
            Operator::SetHorizontalScaling(v) => next.text.horizontal_scaling = *v,
            Operator::SetLeading(v) => next.text.leading = *v,
            Operator::SetFont { name, font, size } => {
                next.text.font = Some(Arc::clone(font));
                next.text.font_name = Some(name.clone());
                next.text.font_size = *size;
            }
            Operator::SetTextRenderMode(mode) => next.text.render_mode = *mode,
            Operator::SetTextRise(rise) => next.text.rise = *rise,

            Operator::MoveText { tx, ty } => next.move_text(*tx, *ty),
            Operator::MoveTextSetLeading { tx, ty } => {
                next.text.leading = -*ty;
                next.move_text(*tx, *ty);
            }
            Operator::SetTextMatrix(matrix) => next.with_text(|text| {
                text.text_matrix = *matrix;
                text.line_matrix = *matrix;
            }),
            Operator::NextLine => {
                let leading = next.text.leading;
                next.move_text(0.0, -leading);
            }

            Operator::ShowText(bytes) => next.advance_text(bytes),
            Operator::ShowTextArray(elements) => {
                for element in elements {
                    match element {
                        TextArrayElement::Text(bytes) => next.advance_text(bytes),
                        TextArrayElement::Adjustment(amount) => {
                            let tx = -amount / 1000.0
                                * next.text.font_size
                                * next.text.horizontal_scaling
                                / 100.0;
                            next.translate_text(tx);
                        }
                    }
                }
            }
            Operator::NextLineShowText(bytes)
            | Operator::NextLineSpacingShowText { text: bytes, .. } => {
                next = self.prepare_show(operator);
                next.advance_text(bytes);
            }

            Operator::SetStrokeColorSpace { space, .. } => {
                next.stroke_color_space = space.clone();
                next.stroke_color = Color::initial(space);
            }
            Operator::SetFillColorSpace { space, .. } => {
                next.fill_color_space = space.clone();
                next.fill_color = Color::initial(space);
            }
            Operator::SetStrokeColor(components) => {
                next.stroke_color = Color::from_components(&self.stroke_color_space, components)
            }
            Operator::SetStrokeColorN {
                components,
                pattern,
            } => {
                next.stroke_color = match pattern {
                    Some(_) => Color::Unknown,
                    None => Color::from_components(&self.stroke_color_space, components),
                }
            }
            Operator::SetFillColor(components) => {
                next.fill_color = Color::from_components(&self.fill_color_space, components)
            }
            Operator::SetFillColorN {
                components,
                pattern,
            } => {
                next.fill_color = match pattern {
                    Some(_) => Color::Unknown,
                    None => Color::from_components(&self.fill_color_space, components),
                }
            }
            Operator::SetStrokeGray(g) => {
                next.stroke_color_space = ColorSpace::DeviceGray;
                next.stroke_color = Color::gray(*g);
            }
            Operator::SetFillGray(g) => {
                next.fill_color_space = ColorSpace::DeviceGray;
                next.fill_color = Color::gray(*g);
            }
            Operator::SetStrokeRgb(r, g, b) => {
                next.stroke_color_space = ColorSpace::DeviceRgb;
                next.stroke_color = Color::rgb(*r, *g, *b);
            }
            Operator::SetFillRgb(r, g, b) => {
                next.fill_color_space = ColorSpace::DeviceRgb;
                next.fill_color = Color::rgb(*r, *g, *b);
            }
            Operator::SetStrokeCmyk(c, m, y, k) => {
                next.stroke_color_space = ColorSpace::DeviceCmyk;
                next.stroke_color = Color::cmyk(*c, *m, *y, *k);
            }
            Operator::SetFillCmyk(c, m, y, k) => {
                next.fill_color_space = ColorSpace::DeviceCmyk;
                next.fill_color = Color::cmyk(*c, *m, *y, *k);
            }

            _ => {}
        }
        next
    }

    /// State at the start of the glyphs shown by `operator`
    ///
    /// `'` and `"` move to the next line (and `"` sets spacing) before showing.
    pub fn prepare_show(&self, operator: &Operator) -> GraphicsState {
        match operator {
            Operator::NextLineShowText(_) => self.react(&Operator::NextLine),
            Operator::NextLineSpacingShowText {
                word_spacing,
                char_spacing,
                ..
            } => {
                let mut next = self.clone();
                next.text.word_spacing = *word_spacing;
                next.text.char_spacing = *char_spacing;
                next.react(&Operator::NextLine)
            }
            _ => self.clone(),
        }
    }

    /// Text rendering matrix: text space to device space
    pub fn text_rendering_matrix(&self) -> Option<TransformationMatrix> {
        let text = self.text_object()?;
        let parameters = TransformationMatrix::new(
            self.text.font_size * self.text.horizontal_scaling / 100.0,
            0.0,
            0.0,
            self.text.font_size,
            0.0,
            self.text.rise,
        );
        Some(parameters.multiply(&text.text_matrix).multiply(&self.ctm))
    }

    /// Baseline origin of the next glyph in device space
    pub fn text_position(&self) -> Option<Point> {
        let text = self.text_object()?;
        let matrix = text.text_matrix.multiply(&self.ctm);
        Some(matrix.apply(Point::new(0.0, self.text.rise)))
    }

    /// Font size as rendered in device space
    pub fn device_font_size(&self) -> f64 {
        let text_matrix = self
            .text_object()
            .map(|t| t.text_matrix)
            .unwrap_or_default();
        let vertical = text_matrix.multiply(&self.ctm).apply_vector(Point::new(0.0, 1.0));
        self.text.font_size * vertical.length()
    }

    fn with_path(&mut self, update: impl FnOnce(&mut PathConstructionState)) {
        match &mut self.additional {
            Some(AdditionalState::PathConstruction(path)) => update(path),
            Some(AdditionalState::TextObject(_)) => {}
            None => {
                let mut path = PathConstructionState::default();
                update(&mut path);
                self.additional = Some(AdditionalState::PathConstruction(path));
            }
        }
    }

    fn with_text(&mut self, update: impl FnOnce(&mut TextObjectState)) {
        if let Some(AdditionalState::TextObject(text)) = &mut self.additional {
            update(text);
        }
    }

    fn move_text(&mut self, tx: f64, ty: f64) {
        self.with_text(|text| {
            let moved = TransformationMatrix::translation(tx, ty).multiply(&text.line_matrix);
            text.text_matrix = moved;
            text.line_matrix = moved;
        });
    }

    fn translate_text(&mut self, tx: f64) {
        self.with_text(|text| {
            text.text_matrix =
                TransformationMatrix::translation(tx, 0.0).multiply(&text.text_matrix);
        });
    }

    /// Move the text matrix past `bytes`, glyph by glyph
    fn advance_text(&mut self, bytes: &[u8]) {
        let Some(font) = self.text.font.clone() else {
            return;
        };
        let single_byte_space = !font.is_composite();
        let scale = self.text.horizontal_scaling / 100.0;
        let mut tx = 0.0;
        for &code in bytes {
            let mut advance =
                font.width_of(code) / 1000.0 * self.text.font_size + self.text.char_spacing;
            if code == b' ' && single_byte_space {
                advance += self.text.word_spacing;
            }
            tx += advance * scale;
        }
        self.translate_text(tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::StandardFont;

    fn helvetica(size: f64) -> Operator {
        Operator::SetFont {
            name: "F1".into(),
            font: Arc::new(Font::standard(StandardFont::Helvetica)),
            size,
        }
    }

    fn replay(operators: &[Operator]) -> GraphicsState {
        operators
            .iter()
            .fold(GraphicsState::default(), |state, op| state.react(op))
    }

    #[test]
    fn test_react_is_pure() {
        let state = GraphicsState::default();
        let next = state.react(&Operator::SetLineWidth(3.0));
        assert_eq!(state.line.width, 1.0);
        assert_eq!(next.line.width, 3.0);
    }

    #[test]
    fn test_concat_matrix_composes_operand_first() {
        let state = replay(&[
            Operator::ConcatMatrix(TransformationMatrix::translation(100.0, 50.0)),
            Operator::ConcatMatrix(TransformationMatrix::scaling(2.0, 2.0)),
        ]);
        // scaling is applied in the translated coordinate system
        let p = state.ctm.apply(Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(102.0, 52.0));
    }

    #[test]
    fn test_path_state_lifecycle() {
        let state = replay(&[
            Operator::MoveTo(Point::new(1.0, 2.0)),
            Operator::LineTo(Point::new(5.0, 2.0)),
        ]);
        assert_eq!(
            state.path_construction().unwrap().current_point,
            Some(Point::new(5.0, 2.0))
        );
        let closed = state.react(&Operator::ClosePath);
        assert_eq!(
            closed.path_construction().unwrap().current_point,
            Some(Point::new(1.0, 2.0))
        );
        assert_eq!(closed.react(&Operator::Stroke).additional, None);
    }

    #[test]
    fn test_show_text_advances_by_glyph_widths() {
        let state = replay(&[
            Operator::BeginText,
            helvetica(10.0),
            Operator::MoveText { tx: 100.0, ty: 700.0 },
            Operator::ShowText(b"Datum".to_vec()),
        ]);
        let position = state.text_position().unwrap();
        assert!((position.x - 129.45).abs() < 1e-9);
        assert_eq!(position.y, 700.0);
    }

    #[test]
    fn test_spacing_and_scaling() {
        let state = replay(&[
            Operator::BeginText,
            helvetica(10.0),
            Operator::SetCharSpacing(1.0),
            Operator::SetWordSpacing(2.0),
            Operator::SetHorizontalScaling(50.0),
            Operator::ShowText(b"a b".to_vec()),
        ]);
        // (5.56 + 1) * 2 + (2.78 + 1 + 2), halved
        let expected = ((5.56 + 1.0) * 2.0 + (2.78 + 1.0 + 2.0)) * 0.5;
        assert!((state.text_position().unwrap().x - expected).abs() < 1e-9);
    }

    #[test]
    fn test_text_array_adjustments() {
        let state = replay(&[
            Operator::BeginText,
            helvetica(10.0),
            Operator::ShowTextArray(vec![
                TextArrayElement::Text(b"a".to_vec()),
                TextArrayElement::Adjustment(-1000.0),
            ]),
        ]);
        assert!((state.text_position().unwrap().x - 15.56).abs() < 1e-9);
    }

    #[test]
    fn test_next_line_operators() {
        let state = replay(&[
            Operator::BeginText,
            helvetica(10.0),
            Operator::MoveTextSetLeading { tx: 10.0, ty: -12.0 },
            Operator::NextLineShowText(Vec::new()),
        ]);
        assert_eq!(state.text.leading, 12.0);
        assert_eq!(state.text_position().unwrap(), Point::new(10.0, -24.0));

        let spaced = state.react(&Operator::NextLineSpacingShowText {
            word_spacing: 3.0,
            char_spacing: 1.0,
            text: Vec::new(),
        });
        assert_eq!(spaced.text.word_spacing, 3.0);
        assert_eq!(spaced.text_position().unwrap(), Point::new(10.0, -36.0));
    }

    #[test]
    fn test_colors() {
        let state = replay(&[
            Operator::SetFillRgb(1.0, 0.0, 0.0),
            Operator::SetStrokeColorSpace {
                name: "DeviceCMYK".into(),
                space: ColorSpace::DeviceCmyk,
            },
        ]);
        assert_eq!(state.fill_color, Color::Rgb(1.0, 0.0, 0.0));
        assert_eq!(state.stroke_color, Color::Cmyk(0.0, 0.0, 0.0, 1.0));

        let unknown = state.react(&Operator::SetFillColorSpace {
            name: "CS9".into(),
            space: ColorSpace::Unsupported("Separation".into()),
        });
        let unknown = unknown.react(&Operator::SetFillColor(vec![0.5]));
        assert_eq!(unknown.fill_color, Color::Unknown);
    }

    #[test]
    fn test_device_font_size() {
        let state = replay(&[
            Operator::ConcatMatrix(TransformationMatrix::scaling(2.0, 2.0)),
            Operator::BeginText,
            helvetica(12.0),
        ]);
        assert_eq!(state.device_font_size(), 24.0);
    }
}
