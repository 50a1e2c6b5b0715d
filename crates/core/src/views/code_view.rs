//! Code panel: the loaded text split into plain and highlighted runs, plus
//! the caret geometry needed to turn a screen selection back into a span.

use crate::model::{CodeWindow, SelectionState};
use crate::span::{LocalSpan, SpanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentStyle {
    Plain,
    /// The active selection or picked trace event.
    Highlight,
    /// The span the picked trace event refers to.
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub style: SegmentStyle,
}

/// Split the window's text according to the state's code highlight.
///
/// Highlight spans are translated into the window's local coordinates
/// first; a span that does not fit the window is an error, not a garbled
/// render.
pub fn code_segments<'a>(
    window: &'a CodeWindow,
    state: &SelectionState,
) -> Result<Vec<Segment<'a>>, SpanError> {
    let (primary, reference) = state.code_highlight();
    let primary = primary.map(|s| window.to_local(s)).transpose()?;
    let reference = reference.map(|s| window.to_local(s)).transpose()?;
    Ok(split_segments(window.text(), primary, reference))
}

/// Cut `text` into `[pre, highlight, mid, reference, post]`-style runs.
///
/// Empty runs are omitted and adjacent runs of the same style merge, so a
/// single highlight yields at most three segments and a highlight followed
/// by a reference at most five. The spans may come in either order; where
/// they overlap the highlight wins. Callers guarantee both spans lie within
/// `text` on char boundaries.
pub fn split_segments<'a>(
    text: &'a str,
    highlight: Option<LocalSpan>,
    reference: Option<LocalSpan>,
) -> Vec<Segment<'a>> {
    let mut cuts = vec![0, text.len()];
    for span in highlight.iter().chain(reference.iter()) {
        cuts.push(span.start().min(text.len()));
        cuts.push(span.end().min(text.len()));
    }
    cuts.sort_unstable();
    cuts.dedup();

    let mut runs: Vec<(usize, usize, SegmentStyle)> = Vec::new();
    for pair in cuts.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let covers = |span: &Option<LocalSpan>| span.is_some_and(|s| s.start() <= a && b <= s.end());
        let style = if covers(&highlight) {
            SegmentStyle::Highlight
        } else if covers(&reference) {
            SegmentStyle::Reference
        } else {
            SegmentStyle::Plain
        };
        match runs.last_mut() {
            Some(last) if last.2 == style => last.1 = b,
            _ => runs.push((a, b, style)),
        }
    }

    runs.into_iter()
        .filter_map(|(a, b, style)| text.get(a..b).map(|text| Segment { text, style }))
        .collect()
}

/// Regroup segments into display lines, splitting runs at `\n`.
pub fn split_lines<'a>(segments: &[Segment<'a>]) -> Vec<Vec<Segment<'a>>> {
    let mut lines = vec![Vec::new()];
    for seg in segments {
        let mut parts = seg.text.split('\n').peekable();
        while let Some(part) = parts.next() {
            if let Some(line) = lines.last_mut()
                && !part.is_empty()
            {
                line.push(Segment {
                    text: part,
                    style: seg.style,
                });
            }
            if parts.peek().is_some() {
                lines.push(Vec::new());
            }
        }
    }
    lines
}

/// Maps between byte offsets and `(line, column)` positions of a text,
/// columns counted in chars.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Byte offset of `(line, column)`, clamped to the end of that line.
    pub fn offset(&self, text: &str, line: usize, column: usize) -> usize {
        let Some(&start) = self.starts.get(line) else {
            return self.len;
        };
        let end = self
            .starts
            .get(line + 1)
            .map_or(self.len, |next| next - 1);
        text.get(start..end)
            .and_then(|line| line.char_indices().nth(column))
            .map_or(end, |(i, _)| start + i)
    }

    /// `(line, column)` of a byte offset.
    pub fn position(&self, text: &str, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        let start = self.starts[line];
        let column = text.get(start..offset).map_or(0, |s| s.chars().count());
        (line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::GlobalSpan;

    fn l(start: usize, end: usize) -> Option<LocalSpan> {
        LocalSpan::new(start, end).ok()
    }

    fn texts<'a>(segments: &[Segment<'a>]) -> Vec<(&'a str, SegmentStyle)> {
        segments.iter().map(|s| (s.text, s.style)).collect()
    }

    #[test]
    fn no_highlight_is_raw_text() {
        let segs = split_segments("let x = 1;", None, None);
        assert_eq!(texts(&segs), vec![("let x = 1;", SegmentStyle::Plain)]);
    }

    #[test]
    fn highlight_and_reference_make_five_runs() {
        let segs = split_segments("let x = 1; x + 2", l(4, 5), l(11, 12));
        assert_eq!(
            texts(&segs),
            vec![
                ("let ", SegmentStyle::Plain),
                ("x", SegmentStyle::Highlight),
                (" = 1; ", SegmentStyle::Plain),
                ("x", SegmentStyle::Reference),
                (" + 2", SegmentStyle::Plain),
            ]
        );
    }

    #[test]
    fn reference_before_highlight_keeps_text_order() {
        let segs = split_segments("abcdef", l(4, 5), l(1, 2));
        assert_eq!(
            texts(&segs),
            vec![
                ("a", SegmentStyle::Plain),
                ("b", SegmentStyle::Reference),
                ("cd", SegmentStyle::Plain),
                ("e", SegmentStyle::Highlight),
                ("f", SegmentStyle::Plain),
            ]
        );
    }

    #[test]
    fn highlight_wins_where_spans_overlap() {
        let segs = split_segments("abcdef", l(1, 4), l(3, 6));
        assert_eq!(
            texts(&segs),
            vec![
                ("a", SegmentStyle::Plain),
                ("bcd", SegmentStyle::Highlight),
                ("ef", SegmentStyle::Reference),
            ]
        );
        let joined: String = segs.iter().map(|s| s.text).collect();
        assert_eq!(joined, "abcdef");
    }

    #[test]
    fn window_offset_applied_before_split() {
        let window = CodeWindow::new(
            0,
            "let x = 1;",
            GlobalSpan::new(100, 110).unwrap(),
        );
        let state = SelectionState {
            active_span: GlobalSpan::new(104, 105).ok(),
            ..SelectionState::default()
        };
        let segs = code_segments(&window, &state).unwrap();
        let pieces: Vec<&str> = segs.iter().map(|s| s.text).collect();
        assert_eq!(pieces, vec!["let ", "x", " = 1;"]);
    }

    #[test]
    fn highlight_outside_window_is_an_error() {
        let window = CodeWindow::new(
            0,
            "abc",
            GlobalSpan::new(10, 13).unwrap(),
        );
        let state = SelectionState {
            active_span: GlobalSpan::new(2, 4).ok(),
            ..SelectionState::default()
        };
        assert!(code_segments(&window, &state).is_err());
    }

    #[test]
    fn lines_split_inside_runs() {
        let segs = split_segments("ab\ncd\nef", l(1, 4), None);
        let lines = split_lines(&segs);
        assert_eq!(lines.len(), 3);
        assert_eq!(
            texts(&lines[0]),
            vec![("a", SegmentStyle::Plain), ("b", SegmentStyle::Highlight)]
        );
        assert_eq!(
            texts(&lines[1]),
            vec![("c", SegmentStyle::Highlight), ("d", SegmentStyle::Plain)]
        );
        assert_eq!(texts(&lines[2]), vec![("ef", SegmentStyle::Plain)]);
    }

    #[test]
    fn line_index_maps_both_ways() {
        let text = "fn main\n  é = 1\n";
        let idx = LineIndex::new(text);
        assert_eq!(idx.line_count(), 3);
        assert_eq!(idx.offset(text, 1, 2), 10);
        assert_eq!(idx.offset(text, 1, 3), 12, "é is two bytes");
        assert_eq!(idx.offset(text, 0, 99), 7, "clamped to line end");
        assert_eq!(idx.position(text, 12), (1, 3));
        assert_eq!(idx.position(text, text.len()), (2, 0));
    }
}
