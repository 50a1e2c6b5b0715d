use std::io;

use anyhow::Result;
use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use thorn_insight_client::InsightClient;
use thorn_insight_core::LocalSpan;
use thorn_insight_core::model::{Action, Channel, Effect, Response, Session, Tab};
use thorn_insight_core::views::LineIndex;
use thorn_insight_core::views::graph_view::{CHAR_WIDTH, LINE_HEIGHT};
use thorn_insight_protocol::Point;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Code,
    Trace,
    Graph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Code,
    Graph,
}

pub struct App {
    pub session: Session,
    pub server: String,
    pub focus: Focus,
    /// Open file picker and its cursor.
    pub picker: Option<usize>,
    /// Caret and selection anchor, as byte offsets into the loaded window.
    pub caret: usize,
    pub mark: Option<usize>,
    pub code_scroll: usize,
    pub trace_scroll: usize,
    pub should_quit: bool,
    client: InsightClient,
    responses: mpsc::UnboundedSender<Response>,
    screen: Rect,
    drag: Option<Drag>,
}

impl App {
    pub fn new(
        client: InsightClient,
        session: Session,
        responses: mpsc::UnboundedSender<Response>,
    ) -> Self {
        Self {
            session,
            server: client.base_url().to_string(),
            focus: Focus::Code,
            picker: None,
            caret: 0,
            mark: None,
            code_scroll: 0,
            trace_scroll: 0,
            should_quit: false,
            client,
            responses,
            screen: Rect::default(),
            drag: None,
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        let effects = self.session.dispatch(action);
        self.spawn(effects);
    }

    /// Feed a response to the session. Cursor resets and the graph fit
    /// only follow a response the session actually applied.
    pub fn receive(&mut self, response: Response) {
        let effects = self.session.receive(response);
        self.spawn(effects);

        match self.session.last_applied() {
            Some(Channel::FileContent) => {
                self.caret = 0;
                self.mark = None;
                self.code_scroll = 0;
            }
            Some(Channel::TraceEvents) => self.trace_scroll = 0,
            Some(Channel::Graph) => {
                let viewport = ui::graph_viewport(ui::areas(self.screen).content);
                self.dispatch(Action::ZoomToFit(viewport));
            }
            _ => {}
        }
    }

    fn spawn(&self, effects: Vec<Effect>) {
        for effect in effects {
            let client = self.client.clone();
            let responses = self.responses.clone();
            tokio::spawn(async move {
                let response = client.fulfill(effect).await;
                // The receiver is gone only while shutting down.
                let _ = responses.send(response);
            });
        }
    }

    pub fn resize(&mut self, screen: Rect) {
        self.screen = screen;
    }

    pub fn on_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key(key),
            Event::Mouse(mouse) => self.on_mouse(mouse),
            _ => {}
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if let Some(cursor) = self.picker {
            self.on_picker_key(key, cursor);
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Code => Focus::Trace,
                    Focus::Trace => Focus::Graph,
                    Focus::Graph => Focus::Code,
                };
                self.sync_tab();
            }
            KeyCode::Char('o') => self.picker = Some(0),
            KeyCode::Char('s') | KeyCode::Char('S') => {
                let forward = key.code == KeyCode::Char('s');
                let filter = self.session.state().stage_filter.cycle(forward);
                self.dispatch(Action::SetStageFilter(filter));
            }
            KeyCode::Char('1') => self.dispatch(Action::SetTab(Tab::EventList)),
            KeyCode::Char('2') => self.dispatch(Action::SetTab(Tab::EventGraph)),
            _ => match self.focus {
                Focus::Code => self.on_code_key(key),
                Focus::Trace => self.on_trace_key(key),
                Focus::Graph => self.on_graph_key(key),
            },
        }
    }

    /// Keep the right-hand tab on the panel that has focus.
    fn sync_tab(&mut self) {
        match self.focus {
            Focus::Trace => self.dispatch(Action::SetTab(Tab::EventList)),
            Focus::Graph => self.dispatch(Action::SetTab(Tab::EventGraph)),
            Focus::Code => {}
        }
    }

    fn on_picker_key(&mut self, key: KeyEvent, cursor: usize) {
        let count = self.session.files().len();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.picker = None,
            KeyCode::Up => self.picker = Some(cursor.saturating_sub(1)),
            KeyCode::Down => self.picker = Some((cursor + 1).min(count.saturating_sub(1))),
            KeyCode::Enter => {
                self.picker = None;
                if let Some(file) = self.session.files().get(cursor) {
                    let id = file.0;
                    info!(file_id = id, name = %file.1, "open file");
                    self.focus = Focus::Code;
                    self.dispatch(Action::SelectFile(id));
                }
            }
            _ => {}
        }
    }

    fn on_code_key(&mut self, key: KeyEvent) {
        let Some(window) = self.session.window() else {
            return;
        };
        let text = window.text();
        let index = LineIndex::new(text);
        let (line, col) = index.position(text, self.caret);
        match key.code {
            KeyCode::Left => {
                self.caret = text
                    .get(..self.caret)
                    .and_then(|s| s.chars().next_back())
                    .map_or(self.caret, |c| self.caret - c.len_utf8());
            }
            KeyCode::Right => {
                self.caret = text
                    .get(self.caret..)
                    .and_then(|s| s.chars().next())
                    .map_or(self.caret, |c| self.caret + c.len_utf8());
            }
            KeyCode::Up => self.caret = index.offset(text, line.saturating_sub(1), col),
            KeyCode::Down => {
                if line + 1 < index.line_count() {
                    self.caret = index.offset(text, line + 1, col);
                }
            }
            KeyCode::Home => self.caret = index.offset(text, line, 0),
            KeyCode::End => self.caret = index.offset(text, line, usize::MAX),
            KeyCode::PageUp => self.code_scroll = self.code_scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll_code_down(10),
            KeyCode::Char('v') => {
                self.mark = match self.mark {
                    Some(_) => None,
                    None => Some(self.caret),
                };
            }
            KeyCode::Enter => self.commit_code_selection(),
            _ => {}
        }
        self.scroll_to_caret();
    }

    fn commit_code_selection(&mut self) {
        if let Some(mark) = self.mark.take() {
            self.dispatch(Action::SelectCodeRange(LocalSpan::between(mark, self.caret)));
        }
    }

    /// Scroll the code panel down, stopping with the last line at the top.
    fn scroll_code_down(&mut self, lines: usize) {
        let last = self
            .session
            .window()
            .map_or(0, |w| LineIndex::new(w.text()).line_count().saturating_sub(1));
        self.code_scroll = self.code_scroll.saturating_add(lines).min(last);
    }

    fn scroll_to_caret(&mut self) {
        let Some(window) = self.session.window() else {
            return;
        };
        let (line, _) = LineIndex::new(window.text()).position(window.text(), self.caret);
        let height = usize::from(ui::inner(ui::areas(self.screen).code).height.max(1));
        if line < self.code_scroll {
            self.code_scroll = line;
        } else if line >= self.code_scroll + height {
            self.code_scroll = line + 1 - height;
        }
    }

    fn on_trace_key(&mut self, key: KeyEvent) {
        let delta = match key.code {
            KeyCode::Up => -1,
            KeyCode::Down => 1,
            KeyCode::PageUp => -10,
            KeyCode::PageDown => 10,
            KeyCode::Enter => 0,
            _ => return,
        };
        let filter = self.session.state().stage_filter.clone();
        let next = self
            .session
            .trace()
            .step(&filter, self.session.trace().selected(), delta);
        if let Some(index) = next {
            self.dispatch(Action::ClickTraceRow(index));
            self.scroll_to_trace_row(index);
        }
    }

    fn scroll_to_trace_row(&mut self, index: usize) {
        let Some(pos) = self
            .session
            .trace_rows()
            .iter()
            .position(|r| r.index == index)
        else {
            return;
        };
        // One line of the panel holds the table header.
        let height =
            usize::from(ui::inner(ui::areas(self.screen).content).height.saturating_sub(1)).max(1);
        if pos < self.trace_scroll {
            self.trace_scroll = pos;
        } else if pos >= self.trace_scroll + height {
            self.trace_scroll = pos + 1 - height;
        }
    }

    fn on_graph_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('+') | KeyCode::Char('=') => self.dispatch(Action::ZoomIn),
            KeyCode::Char('-') => self.dispatch(Action::ZoomOut),
            KeyCode::Char('0') => {
                let viewport = ui::graph_viewport(ui::areas(self.screen).content);
                self.dispatch(Action::ZoomToFit(viewport));
            }
            KeyCode::Char('n') | KeyCode::Char('p') => {
                let forward = key.code == KeyCode::Char('n');
                if let Some(id) = self.session.graph().neighbour(forward) {
                    self.dispatch(Action::ClickGraphNode(id));
                }
            }
            _ => {}
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        if self.picker.is_some() {
            return;
        }
        let areas = ui::areas(self.screen);
        let at = Rect::new(mouse.column, mouse.row, 1, 1);
        let code = ui::inner(areas.code);
        let content = ui::inner(areas.content);
        let on_graph = self.session.state().selected_tab == Tab::EventGraph;

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if code.intersects(at) {
                    self.focus = Focus::Code;
                    if let Some(offset) = self.code_offset_at(code, mouse.column, mouse.row) {
                        self.mark = Some(offset);
                        self.caret = offset;
                        self.drag = Some(Drag::Code);
                    }
                } else if content.intersects(at) && on_graph {
                    self.focus = Focus::Graph;
                    self.drag = Some(Drag::Graph);
                    self.dispatch(Action::GraphPointerDown(graph_point(content, mouse)));
                } else if content.intersects(at) {
                    self.focus = Focus::Trace;
                    self.click_trace_row(content, mouse.row);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => match self.drag {
                Some(Drag::Code) => {
                    if let Some(offset) = self.code_offset_at(code, mouse.column, mouse.row) {
                        self.caret = offset;
                    }
                }
                Some(Drag::Graph) => {
                    self.dispatch(Action::GraphPointerMove(graph_point(content, mouse)));
                }
                None => {}
            },
            MouseEventKind::Up(MouseButton::Left) => match self.drag.take() {
                Some(Drag::Code) => {
                    if self.mark == Some(self.caret) {
                        self.mark = None;
                    } else {
                        self.commit_code_selection();
                    }
                }
                Some(Drag::Graph) => self.dispatch(Action::GraphPointerUp),
                None => {}
            },
            MouseEventKind::ScrollUp if code.intersects(at) => {
                self.code_scroll = self.code_scroll.saturating_sub(3);
            }
            MouseEventKind::ScrollDown if code.intersects(at) => self.scroll_code_down(3),
            MouseEventKind::ScrollUp if on_graph && content.intersects(at) => {
                self.dispatch(Action::ZoomIn);
            }
            MouseEventKind::ScrollDown if on_graph && content.intersects(at) => {
                self.dispatch(Action::ZoomOut);
            }
            _ => {}
        }
    }

    /// Byte offset of the character under a cell of the code panel.
    fn code_offset_at(&self, code: Rect, column: u16, row: u16) -> Option<usize> {
        let window = self.session.window()?;
        let text = window.text();
        let line = usize::from(row.saturating_sub(code.y)) + self.code_scroll;
        let col = usize::from(column.saturating_sub(code.x));
        Some(LineIndex::new(text).offset(text, line, col))
    }

    fn click_trace_row(&mut self, content: Rect, row: u16) {
        // The first line is the table header.
        let Some(pos) = usize::from(row.saturating_sub(content.y)).checked_sub(1) else {
            return;
        };
        let index = self
            .session
            .trace_rows()
            .get(pos + self.trace_scroll)
            .map(|r| r.index);
        if let Some(index) = index {
            debug!(index, "trace row clicked");
            self.dispatch(Action::ClickTraceRow(index));
        }
    }
}

fn graph_point(content: Rect, mouse: MouseEvent) -> Point {
    Point::new(
        f64::from(mouse.column.saturating_sub(content.x)) * CHAR_WIDTH,
        f64::from(mouse.row.saturating_sub(content.y)) * LINE_HEIGHT,
    )
}

/// Drive the terminal until the user quits. Backend responses arrive on
/// `responses` and are applied between input events.
pub async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    mut responses: mpsc::UnboundedReceiver<Response>,
) -> Result<()> {
    let mut events = EventStream::new();
    let size = terminal.size()?;
    app.resize(Rect::new(0, 0, size.width, size.height));
    app.dispatch(Action::Start);

    loop {
        let size = terminal.size()?;
        app.resize(Rect::new(0, 0, size.width, size.height));
        terminal.draw(|frame| ui::draw(frame, &app))?;

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => app.on_event(event),
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(response) = responses.recv() => app.receive(response),
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use thorn_insight_core::model::{Payload, Stage, StageFilter};
    use thorn_insight_protocol::{FileContent, GraphPayload, NodeTable, TraceEventRecord, WireSpan};

    fn app() -> App {
        let client = InsightClient::new("127.0.0.1:9", Duration::from_millis(50)).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(client, Session::new(), tx);
        app.resize(Rect::new(0, 0, 120, 40));
        app
    }

    fn graph() -> Payload {
        Payload::Graph(GraphPayload {
            nodes: NodeTable::List(vec![TraceEventRecord {
                id: None,
                parent_id: None,
                stage: "parser".into(),
                source: WireSpan(0, 20),
                ok: Some("Item".into()),
                error: None,
                ref_span: None,
            }]),
            edges: Vec::new(),
        })
    }

    fn file(text: &str) -> Payload {
        let len = text.len() as u64;
        Payload::FileContent(FileContent(text.into(), WireSpan(0, len)))
    }

    #[tokio::test]
    async fn superseded_graph_does_not_refit() {
        let mut app = app();
        let lexer = app
            .session
            .dispatch(Action::SetStageFilter(StageFilter::Only(Stage::Lexer)))
            .remove(0);
        let llvm = app
            .session
            .dispatch(Action::SetStageFilter(StageFilter::Only(Stage::Llvm)))
            .remove(0);

        app.receive(Response {
            token: llvm.token,
            result: Ok(graph()),
        });
        let fitted = *app.session.graph().camera();
        app.dispatch(Action::ZoomOut);
        let zoomed = *app.session.graph().camera();
        assert_ne!(fitted, zoomed);

        app.receive(Response {
            token: lexer.token,
            result: Ok(graph()),
        });
        assert_eq!(*app.session.graph().camera(), zoomed);
    }

    #[test]
    fn superseded_file_keeps_the_caret() {
        let mut app = app();
        let first = app.session.dispatch(Action::SelectFile(1)).remove(0);
        let second = app.session.dispatch(Action::SelectFile(2)).remove(0);

        app.receive(Response {
            token: second.token,
            result: Ok(file("let x = 1;\nlet y = 2;")),
        });
        app.caret = 4;
        app.mark = Some(2);

        app.receive(Response {
            token: first.token,
            result: Ok(file("fn old() {}")),
        });
        assert_eq!(app.caret, 4);
        assert_eq!(app.mark, Some(2));
        assert_eq!(
            app.session.window().map(|w| w.text()),
            Some("let x = 1;\nlet y = 2;")
        );
    }

    #[test]
    fn code_scroll_stops_at_last_line() {
        let mut app = app();
        let open = app.session.dispatch(Action::SelectFile(1)).remove(0);
        app.receive(Response {
            token: open.token,
            result: Ok(file("a\nb\nc")),
        });
        app.scroll_code_down(3);
        app.scroll_code_down(10);
        assert_eq!(app.code_scroll, 2);
    }
}
