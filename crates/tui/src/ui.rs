use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, List, ListItem, ListState, Paragraph, Row, Table, Tabs},
};
use thorn_insight_core::model::{Panel, PanelStatus, Tab};
use thorn_insight_core::views::{LineIndex, Segment, SegmentStyle, split_lines};
use thorn_insight_protocol::{ThemeToken, Viewport};

use crate::app::{App, Focus};
use crate::renderer::{draw_commands, theme_to_color};

/// Screen regions, shared by drawing and mouse hit-testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Areas {
    pub header: Rect,
    pub code: Rect,
    pub toolbar: Rect,
    pub content: Rect,
    pub status: Rect,
}

pub fn areas(area: Rect) -> Areas {
    let [header, body, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(area);
    let [code, right] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(body);
    let [toolbar, content] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(2)]).areas(right);
    Areas {
        header,
        code,
        toolbar,
        content,
        status,
    }
}

/// The part of a bordered block that holds content.
pub fn inner(area: Rect) -> Rect {
    area.inner(Margin::new(1, 1))
}

/// Canvas size of the graph panel.
pub fn graph_viewport(content: Rect) -> Viewport {
    let inner = inner(content);
    Viewport::sized(
        f64::from(inner.width) * thorn_insight_core::views::graph_view::CHAR_WIDTH,
        f64::from(inner.height) * thorn_insight_core::views::graph_view::LINE_HEIGHT,
    )
}

pub fn draw(frame: &mut Frame<'_>, app: &App) {
    let areas = areas(frame.area());
    draw_header(frame, areas.header, app);
    draw_code(frame, areas.code, app);
    draw_toolbar(frame, areas.toolbar, app);
    match app.session.state().selected_tab {
        Tab::EventList => draw_trace(frame, areas.content, app),
        Tab::EventGraph => draw_graph(frame, areas.content, app),
    }
    draw_status(frame, areas.status, app);
    if let Some(cursor) = app.picker {
        draw_picker(frame, areas.code, app, cursor);
    }
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    Block::bordered()
        .title(title)
        .border_style(Style::default().fg(border))
}

/// One-line description of a panel's load state, if it is worth showing.
fn status_line(status: &PanelStatus) -> Option<Line<'static>> {
    match status {
        PanelStatus::Loading => Some(Line::styled(
            "loading…",
            Style::default().fg(theme_to_color(ThemeToken::TextMuted)),
        )),
        PanelStatus::Failed(message) => Some(Line::styled(
            format!("error: {message}"),
            Style::default().fg(theme_to_color(ThemeToken::StatusError)),
        )),
        PanelStatus::Idle | PanelStatus::Ready => None,
    }
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let state = app.session.state();
    let span = state
        .active_span
        .map_or_else(|| "no selection".to_string(), |s| format!("selection {s}"));
    let text = format!(" thorn-insight │ {} │ {span} ", app.server);
    frame.render_widget(
        Paragraph::new(text).style(
            Style::default()
                .fg(theme_to_color(ThemeToken::ToolbarText))
                .bg(theme_to_color(ThemeToken::ToolbarBackground)),
        ),
        area,
    );
}

fn segment_style(style: SegmentStyle) -> Style {
    match style {
        SegmentStyle::Plain => Style::default(),
        SegmentStyle::Highlight => Style::default()
            .fg(Color::Black)
            .bg(theme_to_color(ThemeToken::CodeHighlight)),
        SegmentStyle::Reference => Style::default()
            .fg(Color::Black)
            .bg(theme_to_color(ThemeToken::CodeRefHighlight)),
    }
}

fn draw_code(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let session = &app.session;
    let title = match session.window() {
        Some(window) => {
            let name = session
                .files()
                .iter()
                .find(|f| f.0 == window.file_id())
                .map_or("untitled", |f| f.1.as_str());
            format!(" {name} {} ", window.range())
        }
        None => " code (o: open file) ".to_string(),
    };
    let block = panel_block(title, app.focus == Focus::Code);
    let body = inner(area);
    frame.render_widget(block, area);

    let Some(window) = session.window() else {
        let line = status_line(session.status(Panel::Code))
            .unwrap_or_else(|| Line::from("press o to pick a file"));
        frame.render_widget(Paragraph::new(line), body);
        return;
    };

    let (segments, error) = match session.code_segments() {
        Some(Ok(segments)) => (segments, None),
        Some(Err(message)) => (
            vec![Segment {
                text: window.text(),
                style: SegmentStyle::Plain,
            }],
            Some(message),
        ),
        None => (Vec::new(), None),
    };
    let lines: Vec<Line<'_>> = split_lines(&segments)
        .into_iter()
        .map(|line| {
            Line::from(
                line.into_iter()
                    .map(|seg| Span::styled(seg.text, segment_style(seg.style)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    let status = match error {
        Some(message) => status_line(&PanelStatus::Failed(message)),
        None => status_line(session.status(Panel::Code)),
    };
    let text_area = match status {
        Some(line) => {
            frame.render_widget(Paragraph::new(line), Rect { height: 1, ..body });
            Rect {
                y: body.y + 1,
                height: body.height.saturating_sub(1),
                ..body
            }
        }
        None => body,
    };
    frame.render_widget(
        Paragraph::new(lines).scroll((u16::try_from(app.code_scroll).unwrap_or(u16::MAX), 0)),
        text_area,
    );

    if app.focus == Focus::Code {
        let text = window.text();
        let index = LineIndex::new(text);
        if let Some(mark) = app.mark {
            let (from, to) = (mark.min(app.caret), mark.max(app.caret));
            overlay(
                frame.buffer_mut(),
                text_area,
                text,
                &index,
                (from, to),
                app.code_scroll,
                Style::default().add_modifier(Modifier::UNDERLINED | Modifier::BOLD),
            );
        }
        let caret_end = text
            .get(app.caret..)
            .and_then(|rest| rest.chars().next())
            .map_or(app.caret + 1, |c| app.caret + c.len_utf8());
        overlay(
            frame.buffer_mut(),
            text_area,
            text,
            &index,
            (app.caret, caret_end),
            app.code_scroll,
            Style::default().add_modifier(Modifier::REVERSED),
        );
    }
}

/// Restyle the cells showing `text[from..to]`; a range ending past the text
/// marks the cell after the last char.
fn overlay(
    buf: &mut Buffer,
    area: Rect,
    text: &str,
    index: &LineIndex,
    (from, to): (usize, usize),
    scroll: usize,
    style: Style,
) {
    let mut offset = from;
    while offset < to.max(from + 1) {
        let (line, col) = index.position(text, offset);
        if line >= scroll {
            let row = line - scroll;
            if row < usize::from(area.height) && col < usize::from(area.width) {
                let pos = (area.x + col as u16, area.y + row as u16);
                if let Some(cell) = buf.cell_mut(pos) {
                    cell.set_style(style);
                }
            }
        }
        match text.get(offset..).and_then(|rest| rest.chars().next()) {
            Some(c) => offset += c.len_utf8(),
            None => break,
        }
        if offset >= to {
            break;
        }
    }
}

fn draw_toolbar(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let state = app.session.state();
    let [filter_area, tabs_area] =
        Layout::horizontal([Constraint::Length(24), Constraint::Min(10)]).areas(area);
    let filter = Paragraph::new(format!(" stage: {} (s/S)", state.stage_filter.label())).style(
        Style::default()
            .fg(theme_to_color(ThemeToken::ToolbarText))
            .bg(theme_to_color(ThemeToken::ToolbarBackground)),
    );
    frame.render_widget(filter, filter_area);

    let selected = match state.selected_tab {
        Tab::EventList => 0,
        Tab::EventGraph => 1,
    };
    let tabs = Tabs::new(vec![
        format!("1 {}", Tab::EventList.label()),
        format!("2 {}", Tab::EventGraph.label()),
    ])
    .select(selected)
    .style(Style::default().bg(theme_to_color(ThemeToken::ToolbarBackground)))
    .highlight_style(
        Style::default()
            .fg(theme_to_color(ThemeToken::ToolbarTabActive))
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(tabs, tabs_area);
}

fn draw_trace(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let session = &app.session;
    let rows = session.trace_rows();
    let title = match session.trace().span() {
        Some(span) => format!(" trace {span} · {} rows ", rows.len()),
        None => " trace ".to_string(),
    };
    frame.render_widget(panel_block(title, app.focus == Focus::Trace), area);
    let body = inner(area);

    if let Some(line) = status_line(session.status(Panel::Trace)) {
        frame.render_widget(Paragraph::new(line), body);
        return;
    }
    if session.trace().span().is_none() {
        frame.render_widget(
            Paragraph::new("select code to see its trace events"),
            body,
        );
        return;
    }

    let table_rows = rows.iter().enumerate().skip(app.trace_scroll).map(|(i, row)| {
        let ev = row.event;
        let (result, result_color) = match &ev.result {
            Some(r) if r.is_error() => (r.text().to_string(), ThemeToken::ResultError),
            Some(r) => (r.text().to_string(), ThemeToken::ResultOk),
            None => (String::new(), ThemeToken::TextMuted),
        };
        let bg = if row.selected {
            ThemeToken::TableRowSelected
        } else if i % 2 == 0 {
            ThemeToken::TableRowEven
        } else {
            ThemeToken::TableRowOdd
        };
        Row::new(vec![
            Span::raw(ev.stage.label().to_string()),
            Span::raw(ev.source.to_string()),
            Span::styled(
                result.replace('\n', " "),
                Style::default().fg(theme_to_color(result_color)),
            ),
            Span::raw(ev.ref_span.map(|s| s.to_string()).unwrap_or_default()),
        ])
        .style(Style::default().bg(theme_to_color(bg)))
    });
    let table = Table::new(
        table_rows,
        [
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Min(10),
            Constraint::Length(14),
        ],
    )
    .header(
        Row::new(vec!["Stage", "Source", "Result", "Ref"]).style(
            Style::default()
                .bg(theme_to_color(ThemeToken::TableHeaderBackground))
                .add_modifier(Modifier::BOLD),
        ),
    );
    frame.render_widget(table, body);
}

fn draw_graph(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let session = &app.session;
    let graph = session.graph();
    let title = match graph.stage() {
        Some(stage) => format!(
            " {} graph · {} nodes · {:.0}% ",
            stage.label(),
            graph.graph().len(),
            graph.camera().scale * 100.0
        ),
        None => " graph ".to_string(),
    };
    frame.render_widget(panel_block(title, app.focus == Focus::Graph), area);
    let body = inner(area);

    if let Some(line) = status_line(session.status(Panel::Graph)) {
        frame.render_widget(Paragraph::new(line), body);
        return;
    }
    let commands = session.graph_commands(&graph_viewport(area));
    draw_commands(frame.buffer_mut(), body, &commands);
}

fn draw_picker(frame: &mut Frame<'_>, area: Rect, app: &App, cursor: usize) {
    let files = app.session.files();
    let height = u16::try_from(files.len())
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(area.height);
    let popup = Rect {
        x: area.x + 2,
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height,
    };
    frame.render_widget(Clear, popup);

    let block = Block::bordered().title(" open file ");
    if files.is_empty() {
        let line = status_line(app.session.status(Panel::Files))
            .unwrap_or_else(|| Line::from("no files"));
        frame.render_widget(Paragraph::new(line).block(block), popup);
        return;
    }
    let items: Vec<ListItem<'_>> = files
        .iter()
        .map(|f| ListItem::new(format!("{:>3}  {}", f.0, f.1)))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(Some(cursor));
    frame.render_stateful_widget(list, popup, &mut state);
}

fn draw_status(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let hints = match app.focus {
        Focus::Code => "←↑→↓ move · v mark · enter select · drag to select",
        Focus::Trace => "↑↓ pick event · click row",
        Focus::Graph => "drag pan · +/- zoom · 0 fit · n/p node",
    };
    let pending = app.session.pending();
    let text = format!(" tab focus · o open · q quit · {hints} · {pending} pending ");
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(theme_to_color(ThemeToken::TextSecondary))),
        area,
    );
}
