use thorn_insight_protocol::FileId;
use tracing::debug;

use crate::model::code_window::CodeWindow;
use crate::model::trace::StageFilter;
use crate::span::GlobalSpan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tab {
    #[default]
    EventList,
    EventGraph,
}

impl Tab {
    pub fn label(&self) -> &'static str {
        match self {
            Tab::EventList => "Event List",
            Tab::EventGraph => "Event Graph",
        }
    }
}

/// Everything the three panels render from. Cloned as a whole when a
/// consistent snapshot is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub active_file: Option<FileId>,
    /// The span the user selected in the code; drives the trace query and
    /// graph containment highlighting.
    pub active_span: Option<GlobalSpan>,
    /// Span of the trace event (or graph node) the user picked.
    pub trace_event_span: Option<GlobalSpan>,
    /// Span the picked event refers to. Only set alongside
    /// `trace_event_span`.
    pub ref_span: Option<GlobalSpan>,
    pub stage_filter: StageFilter,
    pub selected_tab: Tab,
}

impl SelectionState {
    /// The `(primary, reference)` pair the code view highlights: a picked
    /// trace event if there is one, otherwise the active selection.
    pub fn code_highlight(&self) -> (Option<GlobalSpan>, Option<GlobalSpan>) {
        match self.trace_event_span {
            Some(span) => (Some(span), self.ref_span),
            None => (self.active_span, None),
        }
    }
}

/// Sole owner of [`SelectionState`] and the loaded [`CodeWindow`].
///
/// Every mutation goes through one of the methods below; each leaves the
/// state consistent and reports whether anything observable changed.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    state: SelectionState,
    window: Option<CodeWindow>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn window(&self) -> Option<&CodeWindow> {
        self.window.as_ref()
    }

    /// Set the active span and drop any trace-event highlight. Returns
    /// `true` when the active span itself changed.
    pub fn select_primary_span(&mut self, span: GlobalSpan) -> bool {
        debug!(%span, "select primary span");
        self.clear_trace_highlight();
        let changed = self.state.active_span != Some(span);
        self.state.active_span = Some(span);
        changed
    }

    /// Highlight a picked trace event (or graph node) and the span it
    /// refers to. The active span is left alone, so the trace table and the
    /// graph's containment colors stay as they are.
    pub fn select_trace_event(&mut self, span: GlobalSpan, ref_span: Option<GlobalSpan>) {
        debug!(%span, ?ref_span, "select trace event");
        self.state.trace_event_span = Some(span);
        self.state.ref_span = ref_span;
    }

    pub fn clear_trace_highlight(&mut self) {
        self.state.trace_event_span = None;
        self.state.ref_span = None;
    }

    /// Returns `false` (and changes nothing) when `filter` is already active.
    pub fn set_stage_filter(&mut self, filter: StageFilter) -> bool {
        if self.state.stage_filter == filter {
            return false;
        }
        debug!(filter = filter.label(), "stage filter");
        self.state.stage_filter = filter;
        true
    }

    /// Switch files. The old window and every span expressed against it are
    /// dropped; the new window arrives through [`Self::load_window`].
    pub fn set_active_file(&mut self, file_id: FileId) {
        debug!(file_id, "active file");
        self.state.active_file = Some(file_id);
        self.state.active_span = None;
        self.clear_trace_highlight();
        self.window = None;
    }

    /// Install a loaded window. Ignored unless it belongs to the active file.
    pub fn load_window(&mut self, window: CodeWindow) -> bool {
        if self.state.active_file != Some(window.file_id()) {
            return false;
        }
        self.state.active_span = None;
        self.clear_trace_highlight();
        self.window = Some(window);
        true
    }

    pub fn set_tab(&mut self, tab: Tab) -> bool {
        let changed = self.state.selected_tab != tab;
        self.state.selected_tab = tab;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::trace::Stage;

    fn g(start: u64, end: u64) -> GlobalSpan {
        GlobalSpan::new(start, end).unwrap()
    }

    #[test]
    fn new_primary_span_clears_trace_highlight() {
        let mut store = SelectionStore::new();
        store.select_primary_span(g(1, 4));
        store.select_trace_event(g(2, 3), Some(g(10, 12)));
        assert_eq!(store.state().trace_event_span, Some(g(2, 3)));

        store.select_primary_span(g(5, 6));
        assert_eq!(store.state().active_span, Some(g(5, 6)));
        assert_eq!(store.state().trace_event_span, None);
        assert_eq!(store.state().ref_span, None);
    }

    #[test]
    fn trace_event_keeps_active_span() {
        let mut store = SelectionStore::new();
        store.select_primary_span(g(1, 4));
        store.select_trace_event(g(2, 3), None);
        assert_eq!(store.state().active_span, Some(g(1, 4)));
        assert_eq!(store.state().code_highlight(), (Some(g(2, 3)), None));
    }

    #[test]
    fn same_stage_filter_is_a_no_op() {
        let mut store = SelectionStore::new();
        assert!(!store.set_stage_filter(StageFilter::All));
        assert!(store.set_stage_filter(StageFilter::Only(Stage::Lexer)));
        assert!(!store.set_stage_filter(StageFilter::Only(Stage::Lexer)));
    }

    #[test]
    fn window_for_another_file_is_ignored() {
        let mut store = SelectionStore::new();
        store.set_active_file(2);
        let stale = CodeWindow::new(1, "old", g(0, 3));
        assert!(!store.load_window(stale));
        assert!(store.window().is_none());

        let fresh = CodeWindow::new(2, "new", g(3, 6));
        assert!(store.load_window(fresh));
        assert_eq!(store.window().map(CodeWindow::offset), Some(3));
    }

    #[test]
    fn switching_files_clears_spans() {
        let mut store = SelectionStore::new();
        store.set_active_file(0);
        store.select_primary_span(g(1, 2));
        store.select_trace_event(g(1, 2), Some(g(4, 5)));
        store.set_active_file(1);
        let state = store.state();
        assert_eq!(
            (state.active_span, state.trace_event_span, state.ref_span),
            (None, None, None)
        );
    }
}
