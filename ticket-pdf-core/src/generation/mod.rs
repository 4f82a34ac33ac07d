//! Content stream generation
//!
//! [`ContentGenerator`] builds a new content stream operator by operator while
//! mirroring the graphics state it produces, so state operators that would not
//! change anything are never written. The resources the new operators name
//! are collected alongside and handed back by [`ContentGenerator::finish`].

use crate::content::{GraphicsState, InlineImage, Operator, TextArrayElement};
use crate::error::{PdfError, Result};
use crate::geometry::{Point, TransformationMatrix};
use crate::graphics::{Color, ColorSpace};
use crate::objects::{Dictionary, Object, ObjectId};
use crate::resources::XObject;
use crate::text::Font;
use std::sync::Arc;

/// Output of a finished generator
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub data: Vec<u8>,
    pub operators: Vec<Operator>,
    /// Resources named by `operators`, by category
    pub resources: Dictionary,
    /// State after the last operator, to start a following generator from
    pub end_state: GraphicsState,
    /// Saved states still waiting for a restore, innermost last
    pub open_states: Vec<GraphicsState>,
}

#[derive(Debug, Clone)]
pub struct ContentGenerator {
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    operators: Vec<Operator>,
    resources: Dictionary,
}

impl ContentGenerator {
    pub fn new(start_state: GraphicsState) -> Self {
        Self {
            state: start_state,
            stack: Vec::new(),
            operators: Vec::new(),
            resources: Dictionary::new(),
        }
    }

    /// Continue where `previous` stopped, including its open saves
    pub fn resume(previous: &GeneratedContent) -> Self {
        Self {
            state: previous.end_state.clone(),
            stack: previous.open_states.clone(),
            operators: Vec::new(),
            resources: Dictionary::new(),
        }
    }

    /// Live state after everything emitted so far
    pub fn state(&self) -> &GraphicsState {
        &self.state
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Append `operator` unconditionally
    pub fn push(&mut self, operator: Operator) -> Result<&mut Self> {
        match &operator {
            Operator::SaveState => self.stack.push(self.state.clone()),
            Operator::RestoreState => {
                self.state = self.stack.pop().ok_or(PdfError::UnbalancedGraphicsState {
                    index: self.operators.len(),
                })?;
            }
            other => self.state = self.state.react(other),
        }
        self.operators.push(operator);
        Ok(self)
    }

    fn emit(&mut self, operator: Operator) -> &mut Self {
        self.state = self.state.react(&operator);
        self.operators.push(operator);
        self
    }

    /// Register `object` under `name` in resource `category`
    pub fn add_resource(&mut self, category: &str, name: &str, object: impl Into<Object>) {
        if let Some(sub) = self
            .resources
            .get_mut(category)
            .and_then(Object::as_dict_mut)
        {
            sub.set(name, object);
            return;
        }
        let mut sub = Dictionary::new();
        sub.set(name, object);
        self.resources.set(category, sub);
    }

    pub fn save_state(&mut self) -> &mut Self {
        self.stack.push(self.state.clone());
        self.operators.push(Operator::SaveState);
        self
    }

    pub fn restore_state(&mut self) -> Result<&mut Self> {
        self.push(Operator::RestoreState)
    }

    /// Saves still waiting for their restore
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn concat_matrix(&mut self, matrix: TransformationMatrix) -> &mut Self {
        if matrix.is_identity() {
            return self;
        }
        self.emit(Operator::ConcatMatrix(matrix))
    }

    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        if self.state.line.width == width {
            return self;
        }
        self.emit(Operator::SetLineWidth(width))
    }

    pub fn set_fill_color(&mut self, color: Color) -> &mut Self {
        if self.state.fill_color == color
            && color.space() == Some(self.state.fill_color_space.clone())
        {
            return self;
        }
        match color {
            Color::Gray(g) => self.emit(Operator::SetFillGray(g)),
            Color::Rgb(r, g, b) => self.emit(Operator::SetFillRgb(r, g, b)),
            Color::Cmyk(c, m, y, k) => self.emit(Operator::SetFillCmyk(c, m, y, k)),
            Color::Unknown => self,
        }
    }

    pub fn set_stroke_color(&mut self, color: Color) -> &mut Self {
        if self.state.stroke_color == color
            && color.space() == Some(self.state.stroke_color_space.clone())
        {
            return self;
        }
        match color {
            Color::Gray(g) => self.emit(Operator::SetStrokeGray(g)),
            Color::Rgb(r, g, b) => self.emit(Operator::SetStrokeRgb(r, g, b)),
            Color::Cmyk(c, m, y, k) => self.emit(Operator::SetStrokeCmyk(c, m, y, k)),
            Color::Unknown => self,
        }
    }

    // Paths

    pub fn move_to(&mut self, point: Point) -> &mut Self {
        self.emit(Operator::MoveTo(point))
    }

    pub fn line_to(&mut self, point: Point) -> &mut Self {
        self.emit(Operator::LineTo(point))
    }

    pub fn curve_to(&mut self, c1: Point, c2: Point, end: Point) -> &mut Self {
        self.emit(Operator::CurveTo(c1, c2, end))
    }

    pub fn close_path(&mut self) -> &mut Self {
        self.emit(Operator::ClosePath)
    }

    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.emit(Operator::Rectangle {
            x,
            y,
            width,
            height,
        })
    }

    pub fn fill(&mut self) -> &mut Self {
        self.emit(Operator::Fill)
    }

    pub fn stroke(&mut self) -> &mut Self {
        self.emit(Operator::Stroke)
    }

    pub fn fill_stroke(&mut self) -> &mut Self {
        self.emit(Operator::FillStroke)
    }

    /// Intersect the clip with the current path and end it
    pub fn clip(&mut self) -> &mut Self {
        self.emit(Operator::Clip);
        self.emit(Operator::EndPath)
    }

    // Text

    pub fn begin_text(&mut self) -> &mut Self {
        self.emit(Operator::BeginText)
    }

    pub fn end_text(&mut self) -> &mut Self {
        self.emit(Operator::EndText)
    }

    /// Select `font` as resource `name`; `resource` is the font dictionary or
    /// a reference to it, `None` when the page already defines `name`
    pub fn set_font(
        &mut self,
        name: &str,
        font: Arc<Font>,
        size: f64,
        resource: Option<Object>,
    ) -> &mut Self {
        if let Some(resource) = resource {
            self.add_resource("Font", name, resource);
        }
        if self.state.text.font_name.as_deref() == Some(name) && self.state.text.font_size == size {
            return self;
        }
        self.emit(Operator::SetFont {
            name: name.to_string(),
            font,
            size,
        })
    }

    pub fn set_char_spacing(&mut self, spacing: f64) -> &mut Self {
        if self.state.text.char_spacing == spacing {
            return self;
        }
        self.emit(Operator::SetCharSpacing(spacing))
    }

    pub fn set_word_spacing(&mut self, spacing: f64) -> &mut Self {
        if self.state.text.word_spacing == spacing {
            return self;
        }
        self.emit(Operator::SetWordSpacing(spacing))
    }

    pub fn set_horizontal_scaling(&mut self, scale: f64) -> &mut Self {
        if self.state.text.horizontal_scaling == scale {
            return self;
        }
        self.emit(Operator::SetHorizontalScaling(scale))
    }

    pub fn set_text_rise(&mut self, rise: f64) -> &mut Self {
        if self.state.text.rise == rise {
            return self;
        }
        self.emit(Operator::SetTextRise(rise))
    }

    pub fn set_text_render_mode(&mut self, mode: i64) -> &mut Self {
        if self.state.text.render_mode == mode {
            return self;
        }
        self.emit(Operator::SetTextRenderMode(mode))
    }

    pub fn set_text_matrix(&mut self, matrix: TransformationMatrix) -> &mut Self {
        self.emit(Operator::SetTextMatrix(matrix))
    }

    fn current_font(&self) -> Result<Arc<Font>> {
        self.state
            .text
            .font
            .clone()
            .ok_or_else(|| PdfError::FontError("text shown before a font was selected".into()))
    }

    /// Text-space advance of `text` with the current font, spacing and scaling
    pub fn text_advance(&self, text: &str) -> Result<f64> {
        let font = self.current_font()?;
        let codes = font.encode(text)?;
        let state = &self.state.text;
        let advance: f64 = codes
            .iter()
            .map(|&code| {
                let mut w = font.width_of(code) / 1000.0 * state.font_size + state.char_spacing;
                if code == b' ' && !font.is_composite() {
                    w += state.word_spacing;
                }
                w
            })
            .sum();
        Ok(advance * state.horizontal_scaling / 100.0)
    }

    /// Show `text`, encoded for the current font
    pub fn show_text(&mut self, text: &str) -> Result<&mut Self> {
        let codes = self.current_font()?.encode(text)?;
        Ok(self.emit(Operator::ShowText(codes)))
    }

    pub fn show_text_array(&mut self, elements: Vec<TextArrayElement>) -> &mut Self {
        self.emit(Operator::ShowTextArray(elements))
    }

    // Images

    /// Paint image XObject `id` as resource `name`
    pub fn draw_image(&mut self, name: &str, id: ObjectId, width: u32, height: u32) -> &mut Self {
        self.add_resource("XObject", name, Object::Reference(id));
        self.emit(Operator::PaintXObject {
            name: name.to_string(),
            xobject: Arc::new(XObject::Image {
                id: Some(id),
                width,
                height,
            }),
        })
    }

    pub fn inline_image(&mut self, image: InlineImage) -> &mut Self {
        self.emit(Operator::InlineImage(Arc::new(image)))
    }

    /// Select a device color space for fills
    pub fn set_fill_color_space(&mut self, space: ColorSpace) -> &mut Self {
        if self.state.fill_color_space == space {
            return self;
        }
        let name = space.pdf_name().to_string();
        self.emit(Operator::SetFillColorSpace { name, space })
    }

    /// Close every open save
    pub fn restore_all(&mut self) -> &mut Self {
        while let Some(state) = self.stack.pop() {
            self.state = state;
            self.operators.push(Operator::RestoreState);
        }
        self
    }

    pub fn finish(self) -> GeneratedContent {
        GeneratedContent {
            data: Operator::serialize(&self.operators),
            operators: self.operators,
            resources: self.resources,
            end_state: self.state,
            open_states: self.stack,
        }
    }
}
