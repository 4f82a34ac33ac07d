//! Typed content stream parsing
//!
//! Maps the tokenizer's raw `(operands, operator)` groups onto [`Operator`]
//! variants. Operators naming a font, XObject, ExtGState or color space are
//! resolved against the page resources while parsing.
//!
//! Inside `BX ... EX` unrecognized operators and operators with malformed
//! operands are kept as [`Operator::Unknown`]. Outside such a section a known
//! operator with malformed operands is a parse error, and an unrecognized one
//! is passed through with a warning.

use super::operator::{InlineImage, Operator, TextArrayElement};
use super::tokenizer::{ContentTokenizer, RawOperation};
use crate::error::Result;
use crate::geometry::{Point, TransformationMatrix};
use crate::graphics::{LineCap, LineDashPattern, LineJoin};
use crate::objects::Object;
use crate::parser::ParseError;
use crate::resources::ResourceResolver;
use std::sync::Arc;
use tracing::{debug, warn};

/// An operator together with the byte range it occupies in the stream
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOperation {
    pub operator: Operator,
    pub offset: usize,
    pub end_offset: usize,
}

pub struct ContentParser<'r, 'a> {
    resolver: &'r mut ResourceResolver<'a>,
    compatibility_depth: usize,
}

impl<'r, 'a> ContentParser<'r, 'a> {
    pub fn new(resolver: &'r mut ResourceResolver<'a>) -> Self {
        Self {
            resolver,
            compatibility_depth: 0,
        }
    }

    /// Parse a decoded content stream
    pub fn parse(&mut self, data: &[u8]) -> Result<Vec<ParsedOperation>> {
        let raw = ContentTokenizer::tokenize(data)?;
        let mut operations = Vec::with_capacity(raw.len());
        for operation in raw {
            let offset = operation.offset;
            let end_offset = operation.end_offset;
            let operator = self.convert(operation)?;
            operations.push(ParsedOperation {
                operator,
                offset,
                end_offset,
            });
        }
        Ok(operations)
    }

    /// Parse and keep only the operators
    pub fn parse_operators(&mut self, data: &[u8]) -> Result<Vec<Operator>> {
        Ok(self
            .parse(data)?
            .into_iter()
            .map(|parsed| parsed.operator)
            .collect())
    }

    fn convert(&mut self, raw: RawOperation) -> Result<Operator> {
        let RawOperation {
            operator,
            operands,
            offset,
            inline_image,
            ..
        } = raw;

        if let Some((dictionary, data)) = inline_image {
            return Ok(Operator::InlineImage(Arc::new(InlineImage {
                dictionary,
                data,
            })));
        }

        match self.typed(&operator, &operands) {
            Ok(Some(typed)) => {
                match typed {
                    Operator::BeginCompatibility => self.compatibility_depth += 1,
                    Operator::EndCompatibility => {
                        self.compatibility_depth = self.compatibility_depth.saturating_sub(1)
                    }
                    _ => {}
                }
                Ok(typed)
            }
            Ok(None) => {
                if self.compatibility_depth == 0 {
                    warn!(operator = %operator, offset, "unknown content stream operator");
                }
                Ok(Operator::Unknown { operator, operands })
            }
            Err(message) if self.compatibility_depth > 0 => {
                debug!(
                    operator = %operator,
                    offset,
                    reason = %message,
                    "malformed operator tolerated"
                );
                Ok(Operator::Unknown { operator, operands })
            }
            Err(message) => {
                Err(ParseError::syntax(offset, format!("{operator}: {message}")).into())
            }
        }
    }

    /// `Ok(None)` for an unrecognized operator name
    fn typed(
        &mut self,
        operator: &str,
        operands: &[Object],
    ) -> std::result::Result<Option<Operator>, String> {
        let ops = Operands::new(operands);
        let typed = match operator {
            "q" => ops.none(Operator::SaveState)?,
            "Q" => ops.none(Operator::RestoreState)?,
            "cm" => Operator::ConcatMatrix(ops.matrix()?),
            "w" => Operator::SetLineWidth(ops.single_number()?),
            "J" => {
                let code = ops.single_integer()?;
                Operator::SetLineCap(
                    LineCap::from_code(code).ok_or_else(|| format!("invalid line cap {code}"))?,
                )
            }
            "j" => {
                let code = ops.single_integer()?;
                Operator::SetLineJoin(
                    LineJoin::from_code(code).ok_or_else(|| format!("invalid line join {code}"))?,
                )
            }
            "M" => Operator::SetMiterLimit(ops.single_number()?),
            "d" => {
                ops.expect_count(2)?;
                let array = ops.number_array(0)?;
                let phase = ops.number(1)?;
                Operator::SetDashPattern(LineDashPattern::new(array, phase))
            }
            "ri" => Operator::SetRenderingIntent(ops.single_name()?),
            "i" => Operator::SetFlatness(ops.single_number()?),
            "gs" => {
                let name = ops.single_name()?;
                let state = self.resolver.ext_gstate(&name);
                Operator::SetExtGState { name, state }
            }

            "m" => Operator::MoveTo(ops.single_point()?),
            "l" => Operator::LineTo(ops.single_point()?),
            "c" => {
                ops.expect_count(6)?;
                Operator::CurveTo(ops.point(0)?, ops.point(2)?, ops.point(4)?)
            }
            "v" => {
                ops.expect_count(4)?;
                Operator::CurveToV(ops.point(0)?, ops.point(2)?)
            }
            "y" => {
                ops.expect_count(4)?;
                Operator::CurveToY(ops.point(0)?, ops.point(2)?)
            }
            "h" => ops.none(Operator::ClosePath)?,
            "re" => {
                ops.expect_count(4)?;
                Operator::Rectangle {
                    x: ops.number(0)?,
                    y: ops.number(1)?,
                    width: ops.number(2)?,
                    height: ops.number(3)?,
                }
            }

            "S" => ops.none(Operator::Stroke)?,
            "s" => ops.none(Operator::CloseStroke)?,
            "f" => ops.none(Operator::Fill)?,
            "F" => ops.none(Operator::FillObsolete)?,
            "f*" => ops.none(Operator::FillEvenOdd)?,
            "B" => ops.none(Operator::FillStroke)?,
            "B*" => ops.none(Operator::FillStrokeEvenOdd)?,
            "b" => ops.none(Operator::CloseFillStroke)?,
            "b*" => ops.none(Operator::CloseFillStrokeEvenOdd)?,
            "n" => ops.none(Operator::EndPath)?,
            "W" => ops.none(Operator::Clip)?,
            "W*" => ops.none(Operator::ClipEvenOdd)?,

            "BT" => ops.none(Operator::BeginText)?,
            "ET" => ops.none(Operator::EndText)?,
            "Tc" => Operator::SetCharSpacing(ops.single_number()?),
            "Tw" => Operator::SetWordSpacing(ops.single_number()?),
            "Tz" => Operator::SetHorizontalScaling(ops.single_number()?),
            "TL" => Operator::SetLeading(ops.single_number()?),
            "Tf" => {
                ops.expect_count(2)?;
                let name = ops.name(0)?;
                let size = ops.number(1)?;
                let font = self.resolver.font(&name);
                Operator::SetFont { name, font, size }
            }
            "Tr" => Operator::SetTextRenderMode(ops.single_integer()?),
            "Ts" => Operator::SetTextRise(ops.single_number()?),
            "Td" => {
                let p = ops.single_point()?;
                Operator::MoveText { tx: p.x, ty: p.y }
            }
            "TD" => {
                let p = ops.single_point()?;
                Operator::MoveTextSetLeading { tx: p.x, ty: p.y }
            }
            "Tm" => Operator::SetTextMatrix(ops.matrix()?),
            "T*" => ops.none(Operator::NextLine)?,

            "Tj" => Operator::ShowText(ops.single_string()?),
            "'" => Operator::NextLineShowText(ops.single_string()?),
            "\"" => {
                ops.expect_count(3)?;
                Operator::NextLineSpacingShowText {
                    word_spacing: ops.number(0)?,
                    char_spacing: ops.number(1)?,
                    text: ops.string(2)?,
                }
            }
            "TJ" => {
                ops.expect_count(1)?;
                let items = ops.array(0)?;
                let elements = items
                    .iter()
                    .map(|item| match item {
                        Object::String(bytes) | Object::HexString(bytes) => {
                            Ok(TextArrayElement::Text(bytes.clone()))
                        }
                        other => other
                            .as_number()
                            .map(TextArrayElement::Adjustment)
                            .ok_or_else(|| {
                                format!("unexpected {} in text array", other.type_name())
                            }),
                    })
                    .collect::<std::result::Result<Vec<_>, String>>()?;
                Operator::ShowTextArray(elements)
            }

            "CS" => {
                let name = ops.single_name()?;
                let space = self.resolver.color_space(&name);
                Operator::SetStrokeColorSpace { name, space }
            }
            "cs" => {
                let name = ops.single_name()?;
                let space = self.resolver.color_space(&name);
                Operator::SetFillColorSpace { name, space }
            }
            "SC" => Operator::SetStrokeColor(ops.all_numbers()?),
            "sc" => Operator::SetFillColor(ops.all_numbers()?),
            "SCN" => {
                let (components, pattern) = ops.components_with_pattern()?;
                Operator::SetStrokeColorN {
                    components,
                    pattern,
                }
            }
            "scn" => {
                let (components, pattern) = ops.components_with_pattern()?;
                Operator::SetFillColorN {
                    components,
                    pattern,
                }
            }
            "G" => Operator::SetStrokeGray(ops.single_number()?),
            "g" => Operator::SetFillGray(ops.single_number()?),
            "RG" => {
                ops.expect_count(3)?;
                Operator::SetStrokeRgb(ops.number(0)?, ops.number(1)?, ops.number(2)?)
            }
            "rg" => {
                ops.expect_count(3)?;
                Operator::SetFillRgb(ops.number(0)?, ops.number(1)?, ops.number(2)?)
            }
            "K" => {
                ops.expect_count(4)?;
                Operator::SetStrokeCmyk(
                    ops.number(0)?,
                    ops.number(1)?,
                    ops.number(2)?,
                    ops.number(3)?,
                )
            }
            "k" => {
                ops.expect_count(4)?;
                Operator::SetFillCmyk(
                    ops.number(0)?,
                    ops.number(1)?,
                    ops.number(2)?,
                    ops.number(3)?,
                )
            }

            "sh" => Operator::PaintShading(ops.single_name()?),
            "Do" => {
                let name = ops.single_name()?;
                let xobject = self.resolver.xobject(&name);
                Operator::PaintXObject { name, xobject }
            }

            "MP" => Operator::MarkPoint(ops.single_name()?),
            "BMC" => Operator::BeginMarkedContent(ops.single_name()?),
            "DP" => {
                ops.expect_count(2)?;
                Operator::MarkPointProperties(ops.name(0)?, ops.take(1)?)
            }
            "BDC" => {
                ops.expect_count(2)?;
                Operator::BeginMarkedContentProperties(ops.name(0)?, ops.take(1)?)
            }
            "EMC" => ops.none(Operator::EndMarkedContent)?,
            "BX" => ops.none(Operator::BeginCompatibility)?,
            "EX" => ops.none(Operator::EndCompatibility)?,

            _ => return Ok(None),
        };
        Ok(Some(typed))
    }
}

/// Typed access to an operand list
struct Operands<'o> {
    operands: &'o [Object],
}

impl<'o> Operands<'o> {
    fn new(operands: &'o [Object]) -> Self {
        Self { operands }
    }

    fn expect_count(&self, count: usize) -> std::result::Result<(), String> {
        if self.operands.len() == count {
            Ok(())
        } else {
            Err(format!(
                "expected {count} operands, found {}",
                self.operands.len()
            ))
        }
    }

    fn none(&self, operator: Operator) -> std::result::Result<Operator, String> {
        self.expect_count(0)?;
        Ok(operator)
    }

    fn get(&self, index: usize) -> std::result::Result<&'o Object, String> {
        self.operands
            .get(index)
            .ok_or_else(|| format!("missing operand {index}"))
    }

    fn take(&self, index: usize) -> std::result::Result<Object, String> {
        self.get(index).cloned()
    }

    fn number(&self, index: usize) -> std::result::Result<f64, String> {
        let operand = self.get(index)?;
        operand
            .as_number()
            .ok_or_else(|| format!("expected number, found {}", operand.type_name()))
    }

    fn integer(&self, index: usize) -> std::result::Result<i64, String> {
        let operand = self.get(index)?;
        match operand {
            Object::Integer(value) => Ok(*value),
            Object::Real(value) if value.fract() == 0.0 => Ok(*value as i64),
            other => Err(format!("expected integer, found {}", other.type_name())),
        }
    }

    fn name(&self, index: usize) -> std::result::Result<String, String> {
        let operand = self.get(index)?;
        operand
            .as_name()
            .map(str::to_string)
            .ok_or_else(|| format!("expected name, found {}", operand.type_name()))
    }

    fn string(&self, index: usize) -> std::result::Result<Vec<u8>, String> {
        let operand = self.get(index)?;
        operand
            .as_string_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| format!("expected string, found {}", operand.type_name()))
    }

    fn array(&self, index: usize) -> std::result::Result<&'o Vec<Object>, String> {
        let operand = self.get(index)?;
        operand
            .as_array()
            .ok_or_else(|| format!("expected array, found {}", operand.type_name()))
    }

    fn number_array(&self, index: usize) -> std::result::Result<Vec<f64>, String> {
        self.get(index)?
            .as_number_array()
            .ok_or_else(|| "expected numeric array".to_string())
    }

    fn point(&self, index: usize) -> std::result::Result<Point, String> {
        Ok(Point::new(self.number(index)?, self.number(index + 1)?))
    }

    fn single_number(&self) -> std::result::Result<f64, String> {
        self.expect_count(1)?;
        self.number(0)
    }

    fn single_integer(&self) -> std::result::Result<i64, String> {
        self.expect_count(1)?;
        self.integer(0)
    }

    fn single_name(&self) -> std::result::Result<String, String> {
        self.expect_count(1)?;
        self.name(0)
    }

    fn single_string(&self) -> std::result::Result<Vec<u8>, String> {
        self.expect_count(1)?;
        self.string(0)
    }

    fn single_point(&self) -> std::result::Result<Point, String> {
        self.expect_count(2)?;
        self.point(0)
    }

    fn matrix(&self) -> std::result::Result<TransformationMatrix, String> {
        self.expect_count(6)?;
        let mut values = [0.0; 6];
        for (index, value) in values.iter_mut().enumerate() {
            *value = self.number(index)?;
        }
        Ok(TransformationMatrix::from_array(values))
    }

    fn all_numbers(&self) -> std::result::Result<Vec<f64>, String> {
        (0..self.operands.len()).map(|i| self.number(i)).collect()
    }

    /// `scn`/`SCN`: numbers optionally followed by a pattern name
    fn components_with_pattern(
        &self,
    ) -> std::result::Result<(Vec<f64>, Option<String>), String> {
        match self.operands.split_last() {
            Some((Object::Name(pattern), rest)) => {
                let components = Operands::new(rest).all_numbers()?;
                Ok((components, Some(pattern.clone())))
            }
            _ => Ok((self.all_numbers()?, None)),
        }
    }
}
