//! Content stream operators
//!
//! One variant per operator kind, carrying that kind's operands in typed form.
//! Operators that name a resource hold the resolved resource next to its name.

use crate::geometry::{Point, TransformationMatrix};
use crate::graphics::{ColorSpace, LineCap, LineDashPattern, LineJoin};
use crate::objects::{Dictionary, Object};
use crate::resources::{ExtGState, XObject};
use crate::text::Font;
use crate::writer::{format_number, write_object_value};
use std::sync::Arc;

/// Element of a `TJ` array
#[derive(Debug, Clone, PartialEq)]
pub enum TextArrayElement {
    Text(Vec<u8>),
    /// Horizontal adjustment in thousandths of text space
    Adjustment(f64),
}

/// `BI ... ID ... EI`
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub dictionary: Dictionary,
    pub data: Vec<u8>,
}

impl InlineImage {
    pub fn width(&self) -> Option<i64> {
        self.dictionary
            .get_integer("W")
            .or_else(|| self.dictionary.get_integer("Width"))
    }

    pub fn height(&self) -> Option<i64> {
        self.dictionary
            .get_integer("H")
            .or_else(|| self.dictionary.get_integer("Height"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    // General graphics state
    SaveState,
    RestoreState,
    ConcatMatrix(TransformationMatrix),
    SetLineWidth(f64),
    SetLineCap(LineCap),
    SetLineJoin(LineJoin),
    SetMiterLimit(f64),
    SetDashPattern(LineDashPattern),
    SetRenderingIntent(String),
    SetFlatness(f64),
    SetExtGState {
        name: String,
        state: Arc<ExtGState>,
    },

    // Path construction
    MoveTo(Point),
    LineTo(Point),
    CurveTo(Point, Point, Point),
    /// `v`: first control point is the current point
    CurveToV(Point, Point),
    /// `y`: second control point is the end point
    CurveToY(Point, Point),
    ClosePath,
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },

    // Path painting
    Stroke,
    CloseStroke,
    Fill,
    /// `F`, equivalent to `f`
    FillObsolete,
    FillEvenOdd,
    FillStroke,
    FillStrokeEvenOdd,
    CloseFillStroke,
    CloseFillStrokeEvenOdd,
    EndPath,

    // Clipping paths
    Clip,
    ClipEvenOdd,

    // Text objects and state
    BeginText,
    EndText,
    SetCharSpacing(f64),
    SetWordSpacing(f64),
    /// Percent, 100 is unscaled
    SetHorizontalScaling(f64),
    SetLeading(f64),
    SetFont {
        name: String,
        font: Arc<Font>,
        size: f64,
    },
    SetTextRenderMode(i64),
    SetTextRise(f64),

    // Text positioning
    MoveText {
        tx: f64,
        ty: f64,
    },
    MoveTextSetLeading {
        tx: f64,
        ty: f64,
    },
    SetTextMatrix(TransformationMatrix),
    NextLine,

    // Text showing
    ShowText(Vec<u8>),
    ShowTextArray(Vec<TextArrayElement>),
    NextLineShowText(Vec<u8>),
    NextLineSpacingShowText {
        word_spacing: f64,
        char_spacing: f64,
        text: Vec<u8>,
    },

    // Color
    SetStrokeColorSpace {
        name: String,
        space: ColorSpace,
    },
    SetFillColorSpace {
        name: String,
        space: ColorSpace,
    },
    SetStrokeColor(Vec<f64>),
    SetStrokeColorN {
        components: Vec<f64>,
        pattern: Option<String>,
    },
    SetFillColor(Vec<f64>),
    SetFillColorN {
        components: Vec<f64>,
        pattern: Option<String>,
    },
    SetStrokeGray(f64),
    SetFillGray(f64),
    SetStrokeRgb(f64, f64, f64),
    SetFillRgb(f64, f64, f64),
    SetStrokeCmyk(f64, f64, f64, f64),
    SetFillCmyk(f64, f64, f64, f64),

    // Shading, images and external objects
    PaintShading(String),
    InlineImage(Arc<InlineImage>),
    PaintXObject {
        name: String,
        xobject: Arc<XObject>,
    },

    // Marked content
    MarkPoint(String),
    MarkPointProperties(String, Object),
    BeginMarkedContent(String),
    BeginMarkedContentProperties(String, Object),
    EndMarkedContent,

    // Compatibility sections
    BeginCompatibility,
    EndCompatibility,

    /// Anything else, passed through verbatim
    Unknown {
        operator: String,
        operands: Vec<Object>,
    },
}

impl Operator {
    /// Operator keyword as written in the stream
    pub fn name(&self) -> &str {
        match self {
            Operator::SaveState => "q",
            Operator::RestoreState => "Q",
            Operator::ConcatMatrix(_) => "cm",
            Operator::SetLineWidth(_) => "w",
            Operator::SetLineCap(_) => "J",
            Operator::SetLineJoin(_) => "j",
            Operator::SetMiterLimit(_) => "M",
            Operator::SetDashPattern(_) => "d",
            Operator::SetRenderingIntent(_) => "ri",
            Operator::SetFlatness(_) => "i",
            Operator::SetExtGState { .. } => "gs",
            Operator::MoveTo(_) => "m",
            Operator::LineTo(_) => "l",
            Operator::CurveTo(..) => "c",
            Operator::CurveToV(..) => "v",
            Operator::CurveToY(..) => "y",
            Operator::ClosePath => "h",
            Operator::Rectangle { .. } => "re",
            Operator::Stroke => "S",
            Operator::CloseStroke => "s",
            Operator::Fill => "f",
            Operator::FillObsolete => "F",
            Operator::FillEvenOdd => "f*",
            Operator::FillStroke => "B",
            Operator::FillStrokeEvenOdd => "B*",
            Operator::CloseFillStroke => "b",
            Operator::CloseFillStrokeEvenOdd => "b*",
            Operator::EndPath => "n",
            Operator::Clip => "W",
            Operator::ClipEvenOdd => "W*",
            Operator::BeginText => "BT",
            Operator::EndText => "ET",
            Operator::SetCharSpacing(_) => "Tc",
            Operator::SetWordSpacing(_) => "Tw",
            Operator::SetHorizontalScaling(_) => "Tz",
            Operator::SetLeading(_) => "TL",
            Operator::SetFont { .. } => "Tf",
            Operator::SetTextRenderMode(_) => "Tr",
            Operator::SetTextRise(_) => "Ts",
            Operator::MoveText { .. } => "Td",
            Operator::MoveTextSetLeading { .. } => "TD",
            Operator::SetTextMatrix(_) => "Tm",
            Operator::NextLine => "T*",
            Operator::ShowText(_) => "Tj",
            Operator::ShowTextArray(_) => "TJ",
            Operator::NextLineShowText(_) => "'",
            Operator::NextLineSpacingShowText { .. } => "\"",
            Operator::SetStrokeColorSpace { .. } => "CS",
            Operator::SetFillColorSpace { .. } => "cs",
            Operator::SetStrokeColor(_) => "SC",
            Operator::SetStrokeColorN { .. } => "SCN",
            Operator::SetFillColor(_) => "sc",
            Operator::SetFillColorN { .. } => "scn",
            Operator::SetStrokeGray(_) => "G",
            Operator::SetFillGray(_) => "g",
            Operator::SetStrokeRgb(..) => "RG",
            Operator::SetFillRgb(..) => "rg",
            Operator::SetStrokeCmyk(..) => "K",
            Operator::SetFillCmyk(..) => "k",
            Operator::PaintShading(_) => "sh",
            Operator::InlineImage(_) => "BI",
            Operator::PaintXObject { .. } => "Do",
            Operator::MarkPoint(_) => "MP",
            Operator::MarkPointProperties(..) => "DP",
            Operator::BeginMarkedContent(_) => "BMC",
            Operator::BeginMarkedContentProperties(..) => "BDC",
            Operator::EndMarkedContent => "EMC",
            Operator::BeginCompatibility => "BX",
            Operator::EndCompatibility => "EX",
            Operator::Unknown { operator, .. } => operator,
        }
    }

    /// Literal operands in stream order
    pub fn operands(&self) -> Vec<Object> {
        let real = |v: f64| Object::Real(v);
        let point = |p: &Point| [real(p.x), real(p.y)];
        let matrix = |m: &TransformationMatrix| -> Vec<Object> {
            m.to_array().into_iter().map(real).collect()
        };

        match self {
            Operator::ConcatMatrix(m) | Operator::SetTextMatrix(m) => matrix(m),
            Operator::SetLineWidth(v)
            | Operator::SetMiterLimit(v)
            | Operator::SetFlatness(v)
            | Operator::SetCharSpacing(v)
            | Operator::SetWordSpacing(v)
            | Operator::SetHorizontalScaling(v)
            | Operator::SetLeading(v)
            | Operator::SetTextRise(v)
            | Operator::SetStrokeGray(v)
            | Operator::SetFillGray(v) => vec![real(*v)],
            Operator::SetLineCap(cap) => vec![Object::Integer(*cap as i64)],
            Operator::SetLineJoin(join) => vec![Object::Integer(*join as i64)],
            Operator::SetTextRenderMode(mode) => vec![Object::Integer(*mode)],
            Operator::SetDashPattern(dash) => vec![
                Object::Array(dash.array.iter().copied().map(real).collect()),
                real(dash.phase),
            ],
            Operator::SetRenderingIntent(name)
            | Operator::SetExtGState { name, .. }
            | Operator::SetStrokeColorSpace { name, .. }
            | Operator::SetFillColorSpace { name, .. }
            | Operator::PaintShading(name)
            | Operator::PaintXObject { name, .. }
            | Operator::MarkPoint(name)
            | Operator::BeginMarkedContent(name) => vec![Object::name(name.clone())],
            Operator::MoveTo(p) | Operator::LineTo(p) => point(p).to_vec(),
            Operator::CurveTo(p1, p2, p3) => [point(p1), point(p2), point(p3)].concat(),
            Operator::CurveToV(p1, p2) | Operator::CurveToY(p1, p2) => {
                [point(p1), point(p2)].concat()
            }
            Operator::Rectangle {
                x,
                y,
                width,
                height,
            } => vec![real(*x), real(*y), real(*width), real(*height)],
            Operator::SetFont { name, size, .. } => vec![Object::name(name.clone()), real(*size)],
            Operator::MoveText { tx, ty } | Operator::MoveTextSetLeading { tx, ty } => {
                vec![real(*tx), real(*ty)]
            }
            Operator::ShowText(text) | Operator::NextLineShowText(text) => {
                vec![Object::String(text.clone())]
            }
            Operator::ShowTextArray(elements) => vec![Object::Array(
                elements
                    .iter()
                    .map(|e| match e {
                        TextArrayElement::Text(text) => Object::String(text.clone()),
                        TextArrayElement::Adjustment(v) => real(*v),
                    })
                    .collect(),
            )],
            Operator::NextLineSpacingShowText {
                word_spacing,
                char_spacing,
                text,
            } => vec![
                real(*word_spacing),
                real(*char_spacing),
                Object::String(text.clone()),
            ],
            Operator::SetStrokeColor(components) | Operator::SetFillColor(components) => {
                components.iter().copied().map(real).collect()
            }
            Operator::SetStrokeColorN {
                components,
                pattern,
            }
            | Operator::SetFillColorN {
                components,
                pattern,
            } => components
                .iter()
                .copied()
                .map(real)
                .chain(pattern.iter().map(|p| Object::name(p.clone())))
                .collect(),
            Operator::SetStrokeRgb(r, g, b) | Operator::SetFillRgb(r, g, b) => {
                vec![real(*r), real(*g), real(*b)]
            }
            Operator::SetStrokeCmyk(c, m, y, k) | Operator::SetFillCmyk(c, m, y, k) => {
                vec![real(*c), real(*m), real(*y), real(*k)]
            }
            Operator::MarkPointProperties(tag, properties)
            | Operator::BeginMarkedContentProperties(tag, properties) => {
                vec![Object::name(tag.clone()), properties.clone()]
            }
            Operator::Unknown { operands, .. } => operands.clone(),
            _ => Vec::new(),
        }
    }

    /// Append the operator in content-stream syntax, followed by a newline
    pub fn write_to(&self, out: &mut Vec<u8>) {
        if let Operator::InlineImage(image) = self {
            out.extend_from_slice(b"BI");
            for (key, value) in image.dictionary.iter() {
                out.push(b' ');
                write_object_value(out, &Object::Name(key.clone()));
                out.push(b' ');
                write_object_value(out, value);
            }
            out.extend_from_slice(b" ID\n");
            out.extend_from_slice(&image.data);
            out.extend_from_slice(b"\nEI\n");
            return;
        }

        for operand in self.operands() {
            match operand {
                Object::Real(v) => out.extend_from_slice(format_number(v).as_bytes()),
                other => write_object_value(out, &other),
            }
            out.push(b' ');
        }
        out.extend_from_slice(self.name().as_bytes());
        out.push(b'\n');
    }

    /// Serialize a sequence of operators
    pub fn serialize(operators: &[Operator]) -> Vec<u8> {
        let mut out = Vec::new();
        for operator in operators {
            operator.write_to(&mut out);
        }
        out
    }

    /// Operators that only change the graphics state
    pub fn is_graphics_state_operator(&self) -> bool {
        matches!(
            self,
            Operator::SaveState
                | Operator::RestoreState
                | Operator::ConcatMatrix(_)
                | Operator::SetLineWidth(_)
                | Operator::SetLineCap(_)
                | Operator::SetLineJoin(_)
                | Operator::SetMiterLimit(_)
                | Operator::SetDashPattern(_)
                | Operator::SetRenderingIntent(_)
                | Operator::SetFlatness(_)
                | Operator::SetExtGState { .. }
                | Operator::SetCharSpacing(_)
                | Operator::SetWordSpacing(_)
                | Operator::SetHorizontalScaling(_)
                | Operator::SetLeading(_)
                | Operator::SetFont { .. }
                | Operator::SetTextRenderMode(_)
                | Operator::SetTextRise(_)
                | Operator::SetStrokeColorSpace { .. }
                | Operator::SetFillColorSpace { .. }
                | Operator::SetStrokeColor(_)
                | Operator::SetStrokeColorN { .. }
                | Operator::SetFillColor(_)
                | Operator::SetFillColorN { .. }
                | Operator::SetStrokeGray(_)
                | Operator::SetFillGray(_)
                | Operator::SetStrokeRgb(..)
                | Operator::SetFillRgb(..)
                | Operator::SetStrokeCmyk(..)
                | Operator::SetFillCmyk(..)
        )
    }

    /// Operators that put marks on the page
    pub fn is_rendering_operator(&self) -> bool {
        self.is_path_painting() && !matches!(self, Operator::EndPath)
            || self.is_text_showing()
            || matches!(
                self,
                Operator::PaintShading(_)
                    | Operator::InlineImage(_)
                    | Operator::PaintXObject { .. }
            )
    }

    pub fn is_path_construction(&self) -> bool {
        matches!(
            self,
            Operator::MoveTo(_)
                | Operator::LineTo(_)
                | Operator::CurveTo(..)
                | Operator::CurveToV(..)
                | Operator::CurveToY(..)
                | Operator::ClosePath
                | Operator::Rectangle { .. }
        )
    }

    pub fn is_clipping(&self) -> bool {
        matches!(self, Operator::Clip | Operator::ClipEvenOdd)
    }

    /// Operators that end a path object
    pub fn is_path_painting(&self) -> bool {
        matches!(
            self,
            Operator::Stroke
                | Operator::CloseStroke
                | Operator::Fill
                | Operator::FillObsolete
                | Operator::FillEvenOdd
                | Operator::FillStroke
                | Operator::FillStrokeEvenOdd
                | Operator::CloseFillStroke
                | Operator::CloseFillStrokeEvenOdd
                | Operator::EndPath
        )
    }

    pub fn is_text_showing(&self) -> bool {
        matches!(
            self,
            Operator::ShowText(_)
                | Operator::ShowTextArray(_)
                | Operator::NextLineShowText(_)
                | Operator::NextLineSpacingShowText { .. }
        )
    }

    pub fn is_text_positioning(&self) -> bool {
        matches!(
            self,
            Operator::MoveText { .. }
                | Operator::MoveTextSetLeading { .. }
                | Operator::SetTextMatrix(_)
                | Operator::NextLine
        )
    }

    /// `Do` on an image XObject, or an inline image
    pub fn is_image(&self) -> bool {
        match self {
            Operator::InlineImage(_) => true,
            Operator::PaintXObject { xobject, .. } => xobject.is_image(),
            _ => false,
        }
    }

    /// Text bytes shown by this operator, concatenated
    pub fn shown_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Operator::ShowText(text)
            | Operator::NextLineShowText(text)
            | Operator::NextLineSpacingShowText { text, .. } => Some(text.clone()),
            Operator::ShowTextArray(elements) => Some(
                elements
                    .iter()
                    .filter_map(|e| match e {
                        TextArrayElement::Text(text) => Some(text.as_slice()),
                        TextArrayElement::Adjustment(_) => None,
                    })
                    .flatten()
                    .copied()
                    .collect(),
            ),
            _ => None,
        }
    }
}
