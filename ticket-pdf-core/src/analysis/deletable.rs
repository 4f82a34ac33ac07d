use super::AnalyzedContentStream;
use crate::content::Operator;
use crate::error::{PdfError, Result};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket {
    State,
    Text,
    MarkedContent,
}

fn opener(operator: &Operator) -> Option<Bracket> {
    match operator {
        Operator::SaveState => Some(Bracket::State),
        Operator::BeginText => Some(Bracket::Text),
        Operator::BeginMarkedContent(_) | Operator::BeginMarkedContentProperties(..) => {
            Some(Bracket::MarkedContent)
        }
        _ => None,
    }
}

fn closer(operator: &Operator) -> Option<Bracket> {
    match operator {
        Operator::RestoreState => Some(Bracket::State),
        Operator::EndText => Some(Bracket::Text),
        Operator::EndMarkedContent => Some(Bracket::MarkedContent),
        _ => None,
    }
}

/// Operators whose removal changes nothing once the drawing they set up is
/// gone and the enclosing `Q` has restored the state
fn is_inert(operator: &Operator) -> bool {
    if opener(operator).is_some() || closer(operator).is_some() {
        return false;
    }
    operator.is_graphics_state_operator()
        || operator.is_path_construction()
        || operator.is_clipping()
        || operator.is_text_positioning()
        || matches!(operator, Operator::EndPath)
}

/// Operators a bracket drops by itself when it closes
fn is_scoped_to(operator: &Operator, bracket: Bracket) -> bool {
    match bracket {
        Bracket::State => is_inert(operator),
        // BT resets the text matrix; TD also sets the leading, which survives ET
        Bracket::Text => matches!(
            operator,
            Operator::MoveText { .. } | Operator::SetTextMatrix(_) | Operator::NextLine
        ),
        Bracket::MarkedContent => false,
    }
}

pub(super) fn deletable_range(
    stream: &AnalyzedContentStream,
    index: usize,
) -> Result<RangeInclusive<usize>> {
    let operators: Vec<&Operator> = stream.operators().iter().map(|op| &op.operator).collect();
    if index >= operators.len() {
        return Err(PdfError::InvalidStructure(format!(
            "operator index {index} out of range ({} operators)",
            operators.len()
        )));
    }

    let (mut start, mut end) = own_extent(&operators, index);
    let mut committed = (start, end);
    // absorbed brackets left state behind that no q/Q has restored yet
    let mut pending = false;

    // grow outwards while the enclosing bracket holds nothing else worth keeping;
    // state set inside BT/ET or BMC/EMC only goes away with an enclosing q/Q
    while let Some((open, close, bracket)) = enclosing_pair(&operators, start, end) {
        let rest: Vec<&Operator> = operators[open + 1..start]
            .iter()
            .chain(operators[end + 1..close].iter())
            .copied()
            .collect();
        if !rest.iter().all(|op| is_inert(op)) {
            break;
        }
        start = open;
        end = close;
        if bracket == Bracket::State {
            pending = false;
        } else if !rest.iter().all(|op| is_scoped_to(op, bracket)) {
            pending = true;
        }
        if !pending {
            committed = (start, end);
        }
    }

    Ok(committed.0..=committed.1)
}

/// The operator itself plus what it cannot be separated from
fn own_extent(operators: &[&Operator], index: usize) -> (usize, usize) {
    let operator = operators[index];

    if let Some(bracket) = opener(operator) {
        return match matching_closer(operators, index, bracket) {
            Some(close) => (index, close),
            None => (index, index),
        };
    }
    if let Some(bracket) = closer(operator) {
        return match matching_opener(operators, index, bracket) {
            Some(open) => (open, index),
            None => (index, index),
        };
    }
    if operator.is_path_painting() {
        let mut start = index;
        while start > 0 {
            let previous = operators[start - 1];
            if previous.is_path_construction() || previous.is_clipping() {
                start -= 1;
            } else {
                break;
            }
        }
        return (start, index);
    }
    (index, index)
}

fn matching_closer(operators: &[&Operator], open: usize, bracket: Bracket) -> Option<usize> {
    let mut depth = 0usize;
    for (i, operator) in operators.iter().enumerate().skip(open + 1) {
        if opener(operator) == Some(bracket) {
            depth += 1;
        } else if closer(operator) == Some(bracket) {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

fn matching_opener(operators: &[&Operator], close: usize, bracket: Bracket) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..close).rev() {
        let operator = operators[i];
        if closer(operator) == Some(bracket) {
            depth += 1;
        } else if opener(operator) == Some(bracket) {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

/// Nearest bracket pair strictly around `start..=end`
fn enclosing_pair(
    operators: &[&Operator],
    start: usize,
    end: usize,
) -> Option<(usize, usize, Bracket)> {
    // closers seen while walking back, innermost first
    let mut pending: Vec<Bracket> = Vec::new();
    for i in (0..start).rev() {
        let operator = operators[i];
        if let Some(bracket) = closer(operator) {
            pending.push(bracket);
        } else if let Some(bracket) = opener(operator) {
            match pending.last() {
                Some(&last) if last == bracket => {
                    pending.pop();
                }
                Some(_) => return None,
                None => {
                    let close = matching_closer(operators, i, bracket)?;
                    return (close > end).then_some((i, close, bracket));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::analysis::AnalyzedContentStream;
    use crate::content::GraphicsState;
    use crate::document::Document;
    use crate::resources::ResourceResolver;
    use proptest::prelude::*;

    fn analyze(data: &[u8]) -> AnalyzedContentStream {
        let document = Document::new();
        let mut resolver = ResourceResolver::empty(&document);
        AnalyzedContentStream::parse(data, &mut resolver, GraphicsState::default()).unwrap()
    }

    fn names(stream: &AnalyzedContentStream) -> Vec<&str> {
        stream.operators().iter().map(|op| op.operator.name()).collect()
    }

    #[test]
    fn test_image_with_state_wrapper() {
        // q cm Do Q
        let stream = analyze(b"0 g q 10 0 0 10 5 5 cm /Im1 Do Q 1 g");
        assert_eq!(stream.deletable_range(3).unwrap(), 1..=4);
    }

    #[test]
    fn test_wrapper_kept_when_it_paints_something_else() {
        let stream = analyze(b"q 10 0 0 10 5 5 cm /Im1 Do 0 0 1 1 re f Q");
        assert_eq!(stream.deletable_range(2).unwrap(), 2..=2);
    }

    #[test]
    fn test_nested_wrappers_collapse() {
        let stream = analyze(b"q 1 w q 2 0 0 2 0 0 cm /Im1 Do Q Q (x) Tj");
        assert_eq!(stream.deletable_range(4).unwrap(), 0..=6);
    }

    #[test]
    fn test_painting_absorbs_path_and_clip() {
        let stream = analyze(b"q 0 0 m 5 5 l 0 0 9 9 re W n 1 0 0 RG 1 1 m 2 2 l S Q");
        // S takes its path (7, 8); the clip, the n and the color before it are inert
        assert_eq!(stream.deletable_range(9).unwrap(), 0..=10);
    }

    #[test]
    fn test_text_object_absorbed() {
        let stream = analyze(b"q BT /F1 9 Tf 1 0 0 1 10 10 Tm (Datum) Tj ET Q");
        assert_eq!(stream.deletable_range(4).unwrap(), 0..=6);
    }

    #[test]
    fn test_text_object_with_other_text_kept() {
        let stream = analyze(b"BT /F1 9 Tf (Datum) Tj 0 -10 Td (Platz) Tj ET");
        assert_eq!(stream.deletable_range(2).unwrap(), 2..=2);
    }

    #[test]
    fn test_save_expands_to_restore() {
        let stream = analyze(b"1 w q 2 w Q 3 w");
        assert_eq!(stream.deletable_range(1).unwrap(), 1..=3);
        assert_eq!(stream.deletable_range(3).unwrap(), 1..=3);
    }

    #[test]
    fn test_marked_content_absorbed() {
        let stream = analyze(b"/Artifact BMC q /Im1 Do Q EMC");
        assert_eq!(stream.deletable_range(2).unwrap(), 0..=4);
    }

    #[test]
    fn test_marked_content_with_state_kept() {
        let stream =
            analyze(b"/Artifact BMC 1 0 0 rg 100 0 0 100 0 0 cm /Im1 Do EMC 0 0 5 5 re f");
        assert_eq!(stream.deletable_range(3).unwrap(), 3..=3);
    }

    #[test]
    fn test_text_object_with_state_kept() {
        let stream = analyze(b"BT 1 0 0 rg /F1 9 Tf (Datum) Tj ET 0 0 5 5 re f");
        assert_eq!(stream.deletable_range(3).unwrap(), 3..=3);
    }

    #[test]
    fn test_text_object_with_positioning_absorbed() {
        let stream = analyze(b"BT 1 0 0 1 10 10 Tm 0 -5 Td (Datum) Tj ET 1 w");
        assert_eq!(stream.deletable_range(3).unwrap(), 0..=4);
    }

    #[test]
    fn test_leading_outlives_text_object() {
        let stream = analyze(b"BT 0 -12 TD (Datum) Tj ET");
        assert_eq!(stream.deletable_range(2).unwrap(), 2..=2);
    }

    #[test]
    fn test_state_in_text_object_absorbed_by_outer_save() {
        let stream = analyze(b"q BT 1 0 0 rg /F1 9 Tf (Datum) Tj ET Q 0 0 5 5 re f");
        assert_eq!(stream.deletable_range(4).unwrap(), 0..=6);
    }

    /// The content with `range` cut out, re-analyzed
    fn cut(
        data: &[u8],
        stream: &AnalyzedContentStream,
        range: &std::ops::RangeInclusive<usize>,
    ) -> AnalyzedContentStream {
        let from = stream.operators()[*range.start()].metadata.offset;
        let to = stream.operators()[*range.end()].metadata.end_offset;
        let mut rest = data[..from].to_vec();
        rest.push(b' ');
        rest.extend_from_slice(&data[to..]);
        analyze(&rest)
    }

    #[test]
    fn test_cut_leaves_following_state_alone() {
        let last = |s: &AnalyzedContentStream| {
            s.operators().last().map(|op| op.metadata.state.clone())
        };
        let cases: [(&[u8], usize); 5] = [
            (b"/Artifact BMC 1 0 0 rg 100 0 0 100 0 0 cm /Im1 Do EMC 0 0 5 5 re f", 3),
            (b"BT 1 0 0 rg /F1 9 Tf (Datum) Tj ET 0 0 5 5 re f", 3),
            (b"/Span BMC BT 2 Tc 3 Tw 50 Tz (Datum) Tj ET EMC 0 0 5 5 re f", 5),
            (b"/Span BMC 0 0 9 9 re W n /Im1 Do EMC 0 0 5 5 re f", 4),
            (b"q BT 0 0 1 rg (Datum) Tj ET Q 0 0 5 5 re f", 3),
        ];
        for (data, index) in cases {
            let stream = analyze(data);
            let range = stream.deletable_range(index).unwrap();
            assert!(range.contains(&index));
            let stripped = cut(data, &stream, &range);
            assert_eq!(
                last(&stripped),
                last(&stream),
                "{}",
                String::from_utf8_lossy(data)
            );
        }
    }

    #[test]
    fn test_out_of_range() {
        let stream = analyze(b"q Q");
        assert!(stream.deletable_range(2).is_err());
    }

    fn balance_after_removal(names: &[&str], range: std::ops::RangeInclusive<usize>) -> bool {
        let mut depth = 0i64;
        for (i, name) in names.iter().enumerate() {
            if range.contains(&i) {
                continue;
            }
            match *name {
                "q" => depth += 1,
                "Q" => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }
        depth == 0
    }

    fn fragment() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("q 1 0 0 1 2 3 cm /Im1 Do Q "),
            Just("q 0.5 g 0 0 5 5 re f Q "),
            Just("BT /F1 8 Tf 4 4 Td (Reihe) Tj ET "),
            Just("1 w "),
            Just("q q /Im2 Do Q 2 w Q "),
            Just("/Span BMC 1 1 m 2 2 l S EMC "),
        ]
    }

    proptest! {
        #[test]
        fn prop_range_contains_index_and_keeps_balance(
            parts in prop::collection::vec(fragment(), 1..8)
        ) {
            let data = parts.concat();
            let stream = analyze(data.as_bytes());
            let names = names(&stream);
            for index in 0..stream.len() {
                let range = stream.deletable_range(index).unwrap();
                prop_assert!(range.contains(&index));
                prop_assert!(balance_after_removal(&names, range));
            }
        }
    }
}
