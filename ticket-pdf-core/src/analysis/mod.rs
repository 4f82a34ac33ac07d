//! Content stream analysis
//!
//! [`AnalyzedContentStream::analyze`] replays a parsed content stream through
//! [`GraphicsState::react`] with an explicit save/restore stack and keeps, for
//! every operator, the state it produced and the bytes it came from. Image and
//! text geometry in device space is derived from that record, and
//! [`AnalyzedContentStream::deletable_range`] finds what can be cut to remove
//! one drawing instruction.

mod auto_config;
mod deletable;

pub use auto_config::{detect, AutoConfig};

use crate::content::{ContentParser, GraphicsState, Operator, ParsedOperation};
use crate::error::{PdfError, Result};
use crate::geometry::Point;
use crate::resources::ResourceResolver;
use crate::text::Font;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// What analysis recorded for one operator
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorMetadata {
    /// State after the operator
    pub state: GraphicsState,
    pub index: usize,
    pub offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedOperator {
    pub operator: Operator,
    pub metadata: OperatorMetadata,
}

/// Device-space corners of the unit square an image is painted into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageCorners {
    pub lower_left: Point,
    pub lower_right: Point,
    pub upper_left: Point,
    pub upper_right: Point,
}

impl ImageCorners {
    pub fn all(&self) -> [Point; 4] {
        [
            self.lower_left,
            self.lower_right,
            self.upper_left,
            self.upper_right,
        ]
    }

    pub fn min_x(&self) -> f64 {
        self.all().iter().map(|p| p.x).fold(f64::INFINITY, f64::min)
    }

    /// Corner with the largest `x + y`
    pub fn farthest(&self) -> Point {
        self.all()
            .into_iter()
            .fold(self.lower_left, |best, p| {
                if p.x + p.y > best.x + best.y {
                    p
                } else {
                    best
                }
            })
    }
}

/// A text-showing operator placed in device space
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub index: usize,
    /// Baseline origin of the first glyph
    pub start: Point,
    /// Baseline point after the last glyph's advance
    pub end: Point,
    pub font: Option<Arc<Font>>,
    /// Resource name from the active `Tf`
    pub font_name: Option<String>,
    /// Font size in device space
    pub font_size: f64,
    pub text: String,
}

impl TextSpan {
    pub fn center_x(&self) -> f64 {
        (self.start.x + self.end.x) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedContentStream {
    start_state: GraphicsState,
    operators: Vec<AnalyzedOperator>,
    images: Vec<usize>,
    texts: Vec<usize>,
    /// `q` operators never closed by a `Q`
    open_saves: usize,
}

impl AnalyzedContentStream {
    /// Parse `data` against the resources behind `resolver` and analyze it
    pub fn parse(
        data: &[u8],
        resolver: &mut ResourceResolver<'_>,
        start_state: GraphicsState,
    ) -> Result<Self> {
        let operations = ContentParser::new(resolver).parse(data)?;
        Self::analyze(operations, start_state)
    }

    /// Replay `operations` from `start_state`
    pub fn analyze(operations: Vec<ParsedOperation>, start_state: GraphicsState) -> Result<Self> {
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut current = start_state.clone();
        let mut operators = Vec::with_capacity(operations.len());
        let mut images = Vec::new();
        let mut texts = Vec::new();

        for (index, parsed) in operations.into_iter().enumerate() {
            let ParsedOperation {
                operator,
                offset,
                end_offset,
            } = parsed;

            current = match &operator {
                Operator::SaveState => {
                    stack.push(current.clone());
                    current
                }
                Operator::RestoreState => stack
                    .pop()
                    .ok_or(PdfError::UnbalancedGraphicsState { index })?,
                other => current.react(other),
            };

            if operator.is_image() {
                images.push(index);
            }
            if operator.is_text_showing() {
                texts.push(index);
            }

            operators.push(AnalyzedOperator {
                operator,
                metadata: OperatorMetadata {
                    state: current.clone(),
                    index,
                    offset,
                    end_offset,
                },
            });
        }

        Ok(Self {
            start_state,
            operators,
            images,
            texts,
            open_saves: stack.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn operators(&self) -> &[AnalyzedOperator] {
        &self.operators
    }

    pub fn get(&self, index: usize) -> Option<&AnalyzedOperator> {
        self.operators.get(index)
    }

    pub fn start_state(&self) -> &GraphicsState {
        &self.start_state
    }

    /// State after the last operator
    pub fn end_state(&self) -> &GraphicsState {
        self.operators
            .last()
            .map(|op| &op.metadata.state)
            .unwrap_or(&self.start_state)
    }

    /// Number of `Q` operators needed to balance the stream
    pub fn open_saves(&self) -> usize {
        self.open_saves
    }

    /// State in effect when operator `index` runs
    pub fn state_before(&self, index: usize) -> &GraphicsState {
        match index.checked_sub(1).and_then(|i| self.operators.get(i)) {
            Some(previous) => &previous.metadata.state,
            None => &self.start_state,
        }
    }

    /// Indices of image-painting operators
    pub fn image_indices(&self) -> &[usize] {
        &self.images
    }

    /// Indices of text-showing operators
    pub fn text_indices(&self) -> &[usize] {
        &self.texts
    }

    /// Device-space corners of the image painted by operator `index`
    pub fn image_corners(&self, index: usize) -> Option<ImageCorners> {
        let operator = self.operators.get(index)?;
        if !operator.operator.is_image() {
            return None;
        }
        let ctm = self.state_before(index).ctm;
        Some(ImageCorners {
            lower_left: ctm.apply(Point::new(0.0, 0.0)),
            lower_right: ctm.apply(Point::new(1.0, 0.0)),
            upper_left: ctm.apply(Point::new(0.0, 1.0)),
            upper_right: ctm.apply(Point::new(1.0, 1.0)),
        })
    }

    /// Device-space placement of the text shown by operator `index`
    pub fn text_span(&self, index: usize) -> Option<TextSpan> {
        let analyzed = self.operators.get(index)?;
        let bytes = analyzed.operator.shown_bytes()?;
        let before = self.state_before(index).prepare_show(&analyzed.operator);
        let after = &analyzed.metadata.state;

        let start = before.text_position()?;
        let end = after.text_position()?;
        let text = match &before.text.font {
            Some(font) => font.decode(&bytes),
            None => bytes.iter().map(|b| *b as char).collect(),
        };

        Some(TextSpan {
            index,
            start,
            end,
            font: before.text.font.clone(),
            font_name: before.text.font_name.clone(),
            font_size: before.device_font_size(),
            text,
        })
    }

    pub fn text_spans(&self) -> Vec<TextSpan> {
        self.texts
            .iter()
            .filter_map(|&index| self.text_span(index))
            .collect()
    }

    /// Byte range covered by operators `range`
    pub fn byte_range(&self, range: &RangeInclusive<usize>) -> Option<std::ops::Range<usize>> {
        let first = self.operators.get(*range.start())?;
        let last = self.operators.get(*range.end())?;
        Some(first.metadata.offset..last.metadata.end_offset)
    }

    /// Operators to remove so that operator `index` disappears with its wrappers
    pub fn deletable_range(&self, index: usize) -> Result<RangeInclusive<usize>> {
        deletable::deletable_range(self, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::geometry::TransformationMatrix;

    fn analyze(data: &[u8]) -> Result<AnalyzedContentStream> {
        let document = Document::new();
        let mut resolver = ResourceResolver::empty(&document);
        AnalyzedContentStream::parse(data, &mut resolver, GraphicsState::default())
    }

    #[test]
    fn test_metadata_per_operator() {
        let data = b"q 2 0 0 2 0 0 cm 1 w Q 0.5 g";
        let analyzed = analyze(data).unwrap();
        assert_eq!(analyzed.len(), 5);
        let cm = &analyzed.operators()[1].metadata;
        assert_eq!(cm.index, 1);
        assert_eq!(cm.state.ctm, TransformationMatrix::scaling(2.0, 2.0));
        // Q restores the saved state
        assert!(analyzed.operators()[3].metadata.state.ctm.is_identity());
        assert_eq!(analyzed.end_state().line.width, 1.0);
        assert_eq!(&data[cm.offset..cm.end_offset], b"2 0 0 2 0 0 cm");
    }

    #[test]
    fn test_restore_without_save() {
        match analyze(b"q Q Q") {
            Err(PdfError::UnbalancedGraphicsState { index }) => assert_eq!(index, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_open_saves_counted() {
        let analyzed = analyze(b"q q Q").unwrap();
        assert_eq!(analyzed.open_saves(), 1);
    }

    #[test]
    fn test_inline_image_corners() {
        let analyzed =
            analyze(b"q 20 0 0 10 100 50 cm BI /W 1 /H 1 /BPC 8 /CS /G ID \x00 EI Q").unwrap();
        assert_eq!(analyzed.image_indices(), &[2]);
        let corners = analyzed.image_corners(2).unwrap();
        assert_eq!(corners.lower_left, Point::new(100.0, 50.0));
        assert_eq!(corners.upper_right, Point::new(120.0, 60.0));
        assert_eq!(corners.farthest(), Point::new(120.0, 60.0));
    }

    #[test]
    fn test_analysis_is_repeatable() {
        let data = b"BT 1 0 0 1 10 10 Tm (Platz) Tj ET \
                     q 5 0 0 5 1 1 cm BI /W 1 /H 1 /BPC 8 /CS /G ID \x00 EI Q";
        let first = analyze(data).unwrap();
        let second = analyze(data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_byte_range() {
        let data = b"q 1 w Q";
        let analyzed = analyze(data).unwrap();
        let range = analyzed.byte_range(&(0..=2)).unwrap();
        assert_eq!(&data[range], b"q 1 w Q");
    }
}
