use tracing::warn;

use crate::model::{StageFilter, TraceEvent};
use crate::span::GlobalSpan;

/// One visible row of the trace table. `index` addresses the full result
/// set, not the filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRow<'a> {
    pub index: usize,
    pub event: &'a TraceEvent,
    pub selected: bool,
}

/// Trace events for the active span, as last fetched.
///
/// Filtering by stage happens at render time; a filter change never needs
/// a new fetch.
#[derive(Debug, Clone, Default)]
pub struct TraceView {
    span: Option<GlobalSpan>,
    events: Vec<TraceEvent>,
    selected: Option<usize>,
}

impl TraceView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything; used when there is no active span.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Replace the result set. Row selection resets.
    pub fn load(&mut self, span: GlobalSpan, events: Vec<TraceEvent>) {
        self.span = Some(span);
        self.events = events;
        self.selected = None;
    }

    /// The span the current events were fetched for.
    pub fn span(&self) -> Option<GlobalSpan> {
        self.span
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn rows(&self, filter: &StageFilter) -> Vec<TraceRow<'_>> {
        self.events
            .iter()
            .enumerate()
            .filter(|(_, ev)| filter.matches(&ev.stage))
            .map(|(index, event)| TraceRow {
                index,
                event,
                selected: self.selected == Some(index),
            })
            .collect()
    }

    /// Mark row `index` selected and return the `(source, ref)` pair to
    /// publish, or `None` for an index outside the result set.
    pub fn click(&mut self, index: usize) -> Option<(GlobalSpan, Option<GlobalSpan>)> {
        let Some(event) = self.events.get(index) else {
            warn!(index, len = self.events.len(), "trace row out of range");
            return None;
        };
        self.selected = Some(index);
        Some((event.source, event.ref_span))
    }

    /// Index of the visible row `delta` steps away from `from` (or the first
    /// visible row when `from` is `None`), clamped to the visible rows.
    pub fn step(&self, filter: &StageFilter, from: Option<usize>, delta: isize) -> Option<usize> {
        let rows = self.rows(filter);
        if rows.is_empty() {
            return None;
        }
        let pos = match from.and_then(|f| rows.iter().position(|r| r.index == f)) {
            Some(p) => p.saturating_add_signed(delta).min(rows.len() - 1),
            None => 0,
        };
        Some(rows[pos].index)
    }
}
