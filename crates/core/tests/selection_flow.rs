//! Integration test: drive a Session through file load, code selection,
//! trace and graph responses, and check what each panel would render.

use thorn_insight_core::model::{
    Action, Channel, Effect, NodeId, Payload, Request, Response, Session, Stage, StageFilter,
};
use thorn_insight_core::views::SegmentStyle;
use thorn_insight_core::{GlobalSpan, LocalSpan};
use thorn_insight_protocol::{
    EdgeKind, EdgeRecord, FileContent, FileEntry, GraphPayload, NodeTable, Point, ThemeToken,
    TraceEventRecord, WireSpan,
};

fn g(start: u64, end: u64) -> GlobalSpan {
    GlobalSpan::new(start, end).expect("valid span")
}

fn record(stage: &str, low: u64, high: u64, ref_span: Option<(u64, u64)>) -> TraceEventRecord {
    TraceEventRecord {
        id: None,
        parent_id: None,
        stage: stage.into(),
        source: WireSpan(low, high),
        ok: Some(format!("{stage} ok")),
        error: None,
        ref_span: ref_span.map(|(l, h)| WireSpan(l, h)),
    }
}

fn answer(session: &mut Session, effect: &Effect, payload: Payload) -> Vec<Effect> {
    session.receive(Response {
        token: effect.token,
        result: Ok(payload),
    })
}

fn find(effects: &[Effect], channel: Channel) -> Effect {
    effects
        .iter()
        .find(|e| e.token.channel == channel)
        .cloned()
        .unwrap_or_else(|| panic!("no {channel:?} request in {effects:?}"))
}

/// A session with `let x = 1;` loaded at global offsets `[100, 110)`.
fn session_with_code() -> Session {
    let mut session = Session::new();
    let start = session.dispatch(Action::Start);
    answer(
        &mut session,
        &find(&start, Channel::Files),
        Payload::Files(vec![FileEntry(7, "main.thorn".into())]),
    );
    let open = session.dispatch(Action::SelectFile(7));
    answer(
        &mut session,
        &find(&open, Channel::FileContent),
        Payload::FileContent(FileContent("let x = 1;".into(), WireSpan(100, 110))),
    );
    session
}

fn rendered(session: &Session) -> Vec<(String, SegmentStyle)> {
    session
        .code_segments()
        .expect("window loaded")
        .expect("highlight fits")
        .into_iter()
        .map(|s| (s.text.to_string(), s.style))
        .collect()
}

#[test]
fn code_selection_renders_three_segments() {
    let mut session = session_with_code();
    assert_eq!(session.files().len(), 1);
    session.dispatch(Action::SelectCodeRange(LocalSpan::between(4, 5)));
    assert_eq!(session.state().active_span, Some(g(104, 105)));
    assert_eq!(
        rendered(&session),
        vec![
            ("let ".to_string(), SegmentStyle::Plain),
            ("x".to_string(), SegmentStyle::Highlight),
            (" = 1;".to_string(), SegmentStyle::Plain),
        ]
    );
}

#[test]
fn new_primary_span_clears_trace_highlight() {
    let mut session = session_with_code();
    let select = session.dispatch(Action::SelectPrimarySpan(g(100, 110)));
    answer(
        &mut session,
        &find(&select, Channel::TraceEvents),
        Payload::TraceEvents(vec![record("parser", 100, 103, Some((108, 109)))]),
    );
    session.dispatch(Action::ClickTraceRow(0));
    assert_eq!(session.state().trace_event_span, Some(g(100, 103)));
    assert_eq!(session.state().ref_span, Some(g(108, 109)));
    assert_eq!(
        rendered(&session),
        vec![
            ("let".to_string(), SegmentStyle::Highlight),
            (" x = ".to_string(), SegmentStyle::Plain),
            ("1".to_string(), SegmentStyle::Reference),
            (";".to_string(), SegmentStyle::Plain),
        ]
    );

    session.dispatch(Action::SelectPrimarySpan(g(104, 105)));
    assert_eq!(session.state().trace_event_span, None);
    assert_eq!(session.state().ref_span, None);
    assert_eq!(session.trace().selected(), None);
}

#[test]
fn stage_filter_fetches_graph_only_on_change() {
    let mut session = session_with_code();
    assert!(
        session
            .dispatch(Action::SetStageFilter(StageFilter::All))
            .is_empty()
    );

    let effects = session.dispatch(Action::SetStageFilter(StageFilter::Only(Stage::Lexer)));
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].request, Request::Graph(Stage::Lexer));

    assert!(
        session
            .dispatch(Action::SetStageFilter(StageFilter::Only(Stage::Lexer)))
            .is_empty()
    );
}

#[test]
fn stage_filter_narrows_trace_rows_without_refetch() {
    let mut session = session_with_code();
    let select = session.dispatch(Action::SelectPrimarySpan(g(100, 110)));
    answer(
        &mut session,
        &find(&select, Channel::TraceEvents),
        Payload::TraceEvents(vec![
            record("lexer", 100, 103, None),
            record("parser", 100, 110, None),
        ]),
    );
    assert_eq!(session.trace_rows().len(), 2);

    let effects = session.dispatch(Action::SetStageFilter(StageFilter::Only(Stage::Parser)));
    assert!(effects.iter().all(|e| e.token.channel == Channel::Graph));
    let rows = session.trace_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event.stage, Stage::Parser);
}

fn graph_payload() -> GraphPayload {
    let node = |low, high, ok: &str| TraceEventRecord {
        id: None,
        parent_id: None,
        stage: "parser".into(),
        source: WireSpan(low, high),
        ok: Some(ok.into()),
        error: None,
        ref_span: None,
    };
    GraphPayload {
        nodes: NodeTable::List(vec![
            node(0, 0, "root"),
            node(0, 20, "Item"),
            node(5, 10, "Expr"),
            node(30, 40, "Path"),
        ]),
        edges: vec![
            EdgeRecord {
                source: 1,
                target: 2,
                kind: EdgeKind::Parent,
            },
            EdgeRecord {
                source: 2,
                target: 3,
                kind: EdgeKind::Ref,
            },
        ],
    }
}

#[test]
fn nested_nodes_are_highlighted_and_recolor_is_stable() {
    let mut session = Session::new();
    let start = session.dispatch(Action::Start);
    let previews = answer(&mut session, &find(&start, Channel::Graph), Payload::Graph(graph_payload()));
    assert_eq!(previews.len(), 4);
    assert!(previews.iter().all(|e| matches!(e.request, Request::SpanText(_))));

    session.dispatch(Action::SelectPrimarySpan(g(6, 7)));
    let first = session.graph().colors(session.state().active_span);
    let again = session.graph().colors(session.state().active_span);
    assert_eq!(first, again);

    assert_eq!(first[&NodeId(1)].stroke, ThemeToken::NodeContainsSelection);
    assert_eq!(first[&NodeId(2)].stroke, ThemeToken::NodeContainsSelection);
    assert_eq!(first[&NodeId(3)].stroke, ThemeToken::NodeStroke);
}

#[test]
fn graph_click_highlights_reference_in_code_and_graph() {
    let mut session = Session::new();
    let start = session.dispatch(Action::Start);
    answer(&mut session, &find(&start, Channel::Graph), Payload::Graph(graph_payload()));

    session.dispatch(Action::ClickGraphNode(NodeId(2)));
    assert_eq!(session.state().trace_event_span, Some(g(5, 10)));
    assert_eq!(session.state().ref_span, Some(g(30, 40)));
    let colors = session.graph().colors(None);
    assert_eq!(colors[&NodeId(2)].header, ThemeToken::NodeSelected);
    assert_eq!(colors[&NodeId(3)].header, ThemeToken::NodeReferenced);
}

#[test]
fn previews_from_a_replaced_graph_are_dropped() {
    let mut session = Session::new();
    let start = session.dispatch(Action::Start);
    let old_previews = answer(&mut session, &find(&start, Channel::Graph), Payload::Graph(graph_payload()));

    let refetch = session.dispatch(Action::SetStageFilter(StageFilter::Only(Stage::Lexer)));
    answer(&mut session, &refetch[0], Payload::Graph(graph_payload()));

    let stale = find(&old_previews, Channel::Preview(NodeId(1)));
    answer(&mut session, &stale, Payload::SpanText("fn main() { let x = 1; }".into()));
    assert_eq!(
        session.graph().node_box(NodeId(1)).map(|b| b.header.as_str()),
        Some("[0, 20]")
    );
    assert_eq!(session.graph().stage(), Some(&Stage::Lexer));
}

#[test]
fn initial_stage_filter_fetches_its_graph_once() {
    let mut session = Session::with_stage_filter(StageFilter::Only(Stage::Llvm));
    assert_eq!(session.pending(), 0);

    let graphs: Vec<_> = session
        .dispatch(Action::Start)
        .into_iter()
        .filter(|e| e.token.channel == Channel::Graph)
        .map(|e| e.request)
        .collect();
    assert_eq!(graphs, vec![Request::Graph(Stage::Llvm)]);
    assert_eq!(session.state().stage_filter, StageFilter::Only(Stage::Llvm));
}

#[test]
fn default_session_shows_every_stage() {
    let mut session = session_with_code();
    assert_eq!(session.state().stage_filter, StageFilter::All);
    let select = session.dispatch(Action::SelectPrimarySpan(g(100, 110)));
    answer(
        &mut session,
        &find(&select, Channel::TraceEvents),
        Payload::TraceEvents(vec![
            record("lexer", 100, 103, None),
            record("type-resolver", 104, 105, None),
            record("parser", 100, 110, None),
        ]),
    );
    assert_eq!(session.trace_rows().len(), 3);
}

#[test]
fn superseded_graph_leaves_camera_alone() {
    let mut session = Session::new();
    let lexer = session.dispatch(Action::SetStageFilter(StageFilter::Only(Stage::Lexer)));
    let llvm = session.dispatch(Action::SetStageFilter(StageFilter::Only(Stage::Llvm)));

    answer(&mut session, &llvm[0], Payload::Graph(graph_payload()));
    assert_eq!(session.last_applied(), Some(Channel::Graph));

    // Pan on blank canvas far from every node.
    session.dispatch(Action::GraphPointerDown(Point::new(5000.0, 5000.0)));
    session.dispatch(Action::GraphPointerMove(Point::new(5232.0, 5287.0)));
    session.dispatch(Action::GraphPointerUp);
    let panned = *session.graph().camera();

    let effects = answer(&mut session, &lexer[0], Payload::Graph(graph_payload()));
    assert!(effects.is_empty());
    assert_eq!(session.last_applied(), None);
    assert_eq!(*session.graph().camera(), panned);
    assert_eq!(session.graph().stage(), Some(&Stage::Llvm));
}

#[test]
fn failed_response_is_not_applied() {
    let mut session = Session::new();
    let start = session.dispatch(Action::Start);
    session.receive(Response {
        token: find(&start, Channel::Files).token,
        result: Err("timed out".into()),
    });
    assert_eq!(session.last_applied(), None);
    answer(&mut session, &find(&start, Channel::Graph), Payload::Graph(graph_payload()));
    assert_eq!(session.last_applied(), Some(Channel::Graph));
}
