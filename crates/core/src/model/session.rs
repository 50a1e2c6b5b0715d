use thorn_insight_protocol::{
    FileContent, FileEntry, FileId, GraphPayload, Point, RenderCommand, TraceEventRecord, Viewport,
};
use tracing::{debug, warn};

use crate::model::code_window::CodeWindow;
use crate::model::graph::{EventGraph, NodeId};
use crate::model::requests::{Channel, RequestToken, RequestTracker};
use crate::model::selection::{SelectionState, SelectionStore, Tab};
use crate::model::trace::{Stage, StageFilter, TraceEvent};
use crate::span::{GlobalSpan, LocalSpan};
use crate::views::{GraphView, Segment, TraceRow, TraceView, code_segments};

/// A user gesture, in the vocabulary of the three panels.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Initial load: the file list and the default graph.
    Start,
    SelectFile(FileId),
    /// A text selection in the code panel, relative to the loaded window.
    SelectCodeRange(LocalSpan),
    SelectPrimarySpan(GlobalSpan),
    /// Index into the full trace result set.
    ClickTraceRow(usize),
    SetStageFilter(StageFilter),
    SetTab(Tab),
    /// Pointer gestures on the graph canvas, in screen units.
    GraphPointerDown(Point),
    GraphPointerMove(Point),
    GraphPointerUp,
    ZoomIn,
    ZoomOut,
    ZoomToFit(Viewport),
    ClickGraphNode(NodeId),
}

/// One backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Files,
    FileContent(FileId),
    SpanText(GlobalSpan),
    TraceEvents(GlobalSpan),
    Graph(Stage),
}

/// A request the front-end must issue and answer with a [`Response`]
/// carrying the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub token: RequestToken,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Files(Vec<FileEntry>),
    FileContent(FileContent),
    SpanText(String),
    TraceEvents(Vec<TraceEventRecord>),
    Graph(GraphPayload),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub token: RequestToken,
    pub result: Result<Payload, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Files,
    Code,
    Trace,
    Graph,
}

/// Per-panel load state, shown inline in the panel it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PanelStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// The selection coordination model.
///
/// [`Session::dispatch`] and [`Session::receive`] are the only ways state
/// changes. Each runs to completion and returns the requests to issue, so a
/// render between two calls always sees one consistent snapshot.
#[derive(Debug, Clone, Default)]
pub struct Session {
    store: SelectionStore,
    tracker: RequestTracker,
    files: Vec<FileEntry>,
    trace: TraceView,
    graph: GraphView,
    trace_request: Option<GlobalSpan>,
    graph_request: Option<Stage>,
    files_status: PanelStatus,
    code_status: PanelStatus,
    trace_status: PanelStatus,
    graph_status: PanelStatus,
    last_applied: Option<Channel>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that starts narrowed to `filter`. Nothing is requested
    /// until [`Action::Start`], which fetches that filter's graph.
    pub fn with_stage_filter(filter: StageFilter) -> Self {
        let mut session = Self::default();
        session.store.set_stage_filter(filter);
        session
    }

    pub fn state(&self) -> &SelectionState {
        self.store.state()
    }

    pub fn window(&self) -> Option<&CodeWindow> {
        self.store.window()
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn trace(&self) -> &TraceView {
        &self.trace
    }

    pub fn graph(&self) -> &GraphView {
        &self.graph
    }

    pub fn status(&self, panel: Panel) -> &PanelStatus {
        match panel {
            Panel::Files => &self.files_status,
            Panel::Code => &self.code_status,
            Panel::Trace => &self.trace_status,
            Panel::Graph => &self.graph_status,
        }
    }

    fn status_mut(&mut self, panel: Panel) -> &mut PanelStatus {
        match panel {
            Panel::Files => &mut self.files_status,
            Panel::Code => &mut self.code_status,
            Panel::Trace => &mut self.trace_status,
            Panel::Graph => &mut self.graph_status,
        }
    }

    /// Channel whose response the last [`Session::receive`] applied. `None`
    /// when that response was stale or failed.
    pub fn last_applied(&self) -> Option<Channel> {
        self.last_applied
    }

    /// Outstanding requests that would still be applied.
    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }

    /// Code text split into plain and highlighted runs. A highlight that
    /// does not fit the window is reported instead of rendered.
    pub fn code_segments(&self) -> Option<Result<Vec<Segment<'_>>, String>> {
        let window = self.store.window()?;
        Some(code_segments(window, self.store.state()).map_err(|e| e.to_string()))
    }

    /// Trace rows visible under the current stage filter.
    pub fn trace_rows(&self) -> Vec<TraceRow<'_>> {
        self.trace.rows(&self.store.state().stage_filter)
    }

    pub fn graph_commands(&self, viewport: &Viewport) -> Vec<RenderCommand> {
        self.graph.render(self.store.state().active_span, viewport)
    }

    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        debug!(?action, "dispatch");
        match action {
            Action::Start => {
                let mut effects = vec![self.issue(Channel::Files, Request::Files)];
                self.files_status = PanelStatus::Loading;
                effects.push(self.request_graph());
                effects
            }
            Action::SelectFile(file_id) => {
                self.store.set_active_file(file_id);
                self.reset_trace();
                self.code_status = PanelStatus::Loading;
                vec![self.issue(Channel::FileContent, Request::FileContent(file_id))]
            }
            Action::SelectCodeRange(local) => {
                let Some(window) = self.store.window() else {
                    debug!("code selection without a loaded window");
                    return Vec::new();
                };
                if local.is_empty() {
                    return Vec::new();
                }
                match window.to_global(local) {
                    Ok(span) => {
                        self.code_status = PanelStatus::Ready;
                        self.select_primary_span(span)
                    }
                    Err(e) => {
                        warn!(error = %e, "rejected code selection");
                        self.code_status = PanelStatus::Failed(e.to_string());
                        Vec::new()
                    }
                }
            }
            Action::SelectPrimarySpan(span) => self.select_primary_span(span),
            Action::ClickTraceRow(index) => {
                if let Some((span, ref_span)) = self.trace.click(index) {
                    self.store.select_trace_event(span, ref_span);
                }
                Vec::new()
            }
            Action::SetStageFilter(filter) => {
                if self.store.set_stage_filter(filter) {
                    vec![self.request_graph()]
                } else {
                    Vec::new()
                }
            }
            Action::SetTab(tab) => {
                self.store.set_tab(tab);
                Vec::new()
            }
            Action::GraphPointerDown(point) => {
                if let Some(id) = self.graph.pointer_down(point) {
                    self.click_node(id);
                }
                Vec::new()
            }
            Action::GraphPointerMove(point) => {
                self.graph.pointer_move(point);
                Vec::new()
            }
            Action::GraphPointerUp => {
                self.graph.pointer_up();
                Vec::new()
            }
            Action::ZoomIn => {
                self.graph.zoom_in();
                Vec::new()
            }
            Action::ZoomOut => {
                self.graph.zoom_out();
                Vec::new()
            }
            Action::ZoomToFit(viewport) => {
                self.graph.zoom_to_fit(viewport);
                Vec::new()
            }
            Action::ClickGraphNode(id) => {
                self.click_node(id);
                Vec::new()
            }
        }
    }

    /// Apply a backend response. Responses to superseded requests are
    /// dropped without touching state.
    pub fn receive(&mut self, response: Response) -> Vec<Effect> {
        let Response { token, result } = response;
        self.last_applied = None;
        if !self.tracker.complete(&token) {
            debug!(?token, "discarding stale response");
            return Vec::new();
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(message) => {
                self.fail(token.channel, message);
                return Vec::new();
            }
        };

        match (token.channel, payload) {
            (Channel::Files, Payload::Files(files)) => {
                debug!(count = files.len(), "file list");
                self.files = files;
                self.files_status = PanelStatus::Ready;
                self.last_applied = Some(Channel::Files);
                Vec::new()
            }
            (Channel::FileContent, Payload::FileContent(content)) => {
                self.apply_file_content(content);
                Vec::new()
            }
            (Channel::TraceEvents, Payload::TraceEvents(records)) => {
                self.apply_trace_events(records);
                Vec::new()
            }
            (Channel::Graph, Payload::Graph(payload)) => self.apply_graph(payload),
            (Channel::Preview(id), Payload::SpanText(text)) => {
                if self.graph.apply_preview(id, &text) {
                    self.last_applied = Some(Channel::Preview(id));
                }
                Vec::new()
            }
            (channel, payload) => {
                warn!(?channel, ?payload, "payload does not match its request");
                self.fail(channel, "unexpected response from server".into());
                Vec::new()
            }
        }
    }

    fn issue(&mut self, channel: Channel, request: Request) -> Effect {
        let token = self.tracker.issue(channel);
        debug!(?token, ?request, "request");
        Effect { token, request }
    }

    fn request_graph(&mut self) -> Effect {
        let stage = self.store.state().stage_filter.graph_stage();
        self.graph_request = Some(stage.clone());
        self.graph_status = PanelStatus::Loading;
        self.issue(Channel::Graph, Request::Graph(stage))
    }

    fn reset_trace(&mut self) {
        self.tracker.retire(Channel::TraceEvents);
        self.trace.clear();
        self.trace_request = None;
        self.trace_status = PanelStatus::Idle;
    }

    fn select_primary_span(&mut self, span: GlobalSpan) -> Vec<Effect> {
        self.trace.deselect();
        if !self.store.select_primary_span(span) {
            return Vec::new();
        }
        self.trace.clear();
        self.trace_request = Some(span);
        self.trace_status = PanelStatus::Loading;
        vec![self.issue(Channel::TraceEvents, Request::TraceEvents(span))]
    }

    fn click_node(&mut self, id: NodeId) {
        if let Some((span, ref_span)) = self.graph.click(id) {
            self.store.select_trace_event(span, ref_span);
        }
    }

    fn apply_file_content(&mut self, content: FileContent) {
        let Some(file_id) = self.store.state().active_file else {
            return;
        };
        match CodeWindow::from_content(file_id, content) {
            Ok(window) => {
                debug!(file_id, range = %window.range(), "code window");
                self.store.load_window(window);
                self.reset_trace();
                self.code_status = PanelStatus::Ready;
                self.last_applied = Some(Channel::FileContent);
            }
            Err(e) => self.fail(Channel::FileContent, e.to_string()),
        }
    }

    fn apply_trace_events(&mut self, records: Vec<TraceEventRecord>) {
        let Some(span) = self.trace_request.take() else {
            return;
        };
        let events: Result<Vec<TraceEvent>, _> =
            records.into_iter().map(TraceEvent::try_from).collect();
        match events {
            Ok(events) => {
                debug!(%span, count = events.len(), "trace events");
                self.trace.load(span, events);
                self.trace_status = PanelStatus::Ready;
                self.last_applied = Some(Channel::TraceEvents);
            }
            Err(e) => self.fail(Channel::TraceEvents, e.to_string()),
        }
    }

    fn apply_graph(&mut self, payload: GraphPayload) -> Vec<Effect> {
        let Some(stage) = self.graph_request.take() else {
            return Vec::new();
        };
        let graph = match EventGraph::from_payload(payload) {
            Ok(graph) => graph,
            Err(e) => {
                self.fail(Channel::Graph, e.to_string());
                return Vec::new();
            }
        };
        self.tracker.retire_previews();
        self.graph_status = PanelStatus::Ready;
        self.last_applied = Some(Channel::Graph);
        self.graph
            .load(stage, graph)
            .into_iter()
            .map(|(id, span)| self.issue(Channel::Preview(id), Request::SpanText(span)))
            .collect()
    }

    fn fail(&mut self, channel: Channel, message: String) {
        let panel = match channel {
            Channel::Files => Panel::Files,
            Channel::FileContent => Panel::Code,
            Channel::TraceEvents => Panel::Trace,
            Channel::Graph => Panel::Graph,
            Channel::Preview(id) => {
                // The node keeps its span header.
                debug!(%id, %message, "preview failed");
                return;
            }
        };
        warn!(?panel, %message, "request failed");
        *self.status_mut(panel) = PanelStatus::Failed(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thorn_insight_protocol::WireSpan;

    fn g(start: u64, end: u64) -> GlobalSpan {
        GlobalSpan::new(start, end).expect("valid span")
    }

    fn only(effects: Vec<Effect>) -> Effect {
        assert_eq!(effects.len(), 1, "{effects:?}");
        effects.into_iter().next().expect("one effect")
    }

    fn loaded() -> Session {
        let mut s = Session::new();
        let effect = only(s.dispatch(Action::SelectFile(3)));
        assert_eq!(effect.request, Request::FileContent(3));
        s.receive(Response {
            token: effect.token,
            result: Ok(Payload::FileContent(FileContent(
                "let x = 1;".into(),
                WireSpan(100, 110),
            ))),
        });
        s
    }

    #[test]
    fn start_requests_files_and_parser_graph() {
        let mut s = Session::new();
        let requests: Vec<_> = s
            .dispatch(Action::Start)
            .into_iter()
            .map(|e| e.request)
            .collect();
        assert_eq!(requests, vec![Request::Files, Request::Graph(Stage::Parser)]);
        assert_eq!(s.status(Panel::Graph), &PanelStatus::Loading);
    }

    #[test]
    fn code_selection_translates_to_global() {
        let mut s = loaded();
        let effect = only(s.dispatch(Action::SelectCodeRange(LocalSpan::between(4, 5))));
        assert_eq!(effect.request, Request::TraceEvents(g(104, 105)));
        assert_eq!(s.state().active_span, Some(g(104, 105)));
    }

    #[test]
    fn code_selection_without_window_is_ignored() {
        let mut s = Session::new();
        assert!(s.dispatch(Action::SelectCodeRange(LocalSpan::between(0, 2))).is_empty());
        assert_eq!(s.state().active_span, None);
    }

    #[test]
    fn out_of_window_selection_is_reported() {
        let mut s = loaded();
        assert!(s.dispatch(Action::SelectCodeRange(LocalSpan::between(4, 50))).is_empty());
        assert!(matches!(s.status(Panel::Code), PanelStatus::Failed(_)));
        assert_eq!(s.state().active_span, None);
    }

    #[test]
    fn stale_trace_response_is_discarded() {
        let mut s = loaded();
        let first = only(s.dispatch(Action::SelectPrimarySpan(g(100, 103))));
        let second = only(s.dispatch(Action::SelectPrimarySpan(g(104, 105))));

        let record = |low, high| TraceEventRecord {
            id: None,
            parent_id: None,
            stage: "lexer".into(),
            source: WireSpan(low, high),
            ok: Some("tok".into()),
            error: None,
            ref_span: None,
        };
        s.receive(Response {
            token: second.token,
            result: Ok(Payload::TraceEvents(vec![record(104, 105)])),
        });
        s.receive(Response {
            token: first.token,
            result: Ok(Payload::TraceEvents(vec![record(100, 103), record(100, 101)])),
        });
        assert_eq!(s.trace().span(), Some(g(104, 105)));
        assert_eq!(s.trace().events().len(), 1);
    }

    #[test]
    fn failures_land_on_their_panel() {
        let mut s = Session::new();
        let effects = s.dispatch(Action::Start);
        let graph = effects
            .iter()
            .find(|e| e.token.channel == Channel::Graph)
            .expect("graph request");
        s.receive(Response {
            token: graph.token,
            result: Err("connection refused".into()),
        });
        assert_eq!(
            s.status(Panel::Graph),
            &PanelStatus::Failed("connection refused".into())
        );
        assert_eq!(s.status(Panel::Files), &PanelStatus::Loading);
    }

    #[test]
    fn mismatched_payload_is_a_failure() {
        let mut s = Session::new();
        let files = s.dispatch(Action::Start).remove(0);
        s.receive(Response {
            token: files.token,
            result: Ok(Payload::SpanText("oops".into())),
        });
        assert!(matches!(s.status(Panel::Files), PanelStatus::Failed(_)));
    }

    #[test]
    fn switching_files_drops_the_old_selection() {
        let mut s = loaded();
        let pending = only(s.dispatch(Action::SelectPrimarySpan(g(104, 105))));
        s.dispatch(Action::SelectFile(4));
        assert_eq!(s.state().active_span, None);
        assert!(s.window().is_none());
        assert!(!s.tracker.is_current(&pending.token));
    }
}
