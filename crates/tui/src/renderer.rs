use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
};
use thorn_insight_core::views::graph_view::{CHAR_WIDTH, LINE_HEIGHT};
use thorn_insight_protocol::{Point, RenderCommand, ThemeToken};

pub fn theme_to_color(token: ThemeToken) -> Color {
    match token {
        ThemeToken::Background => Color::Reset,
        ThemeToken::TextPrimary => Color::White,
        ThemeToken::TextSecondary => Color::Gray,
        ThemeToken::TextMuted => Color::DarkGray,
        ThemeToken::CodeHighlight => Color::Yellow,
        ThemeToken::CodeRefHighlight => Color::Green,
        ThemeToken::CanvasBackground => Color::Reset,
        ThemeToken::NodeBody => Color::Reset,
        ThemeToken::NodeStroke => Color::Gray,
        ThemeToken::NodeHeaderOk => Color::LightBlue,
        ThemeToken::NodeHeaderError => Color::Red,
        ThemeToken::NodeContainsSelection => Color::Rgb(255, 165, 0),
        ThemeToken::NodeSelected => Color::LightGreen,
        ThemeToken::NodeReferenced => Color::LightYellow,
        ThemeToken::EdgeLine => Color::DarkGray,
        ThemeToken::TableHeaderBackground => Color::DarkGray,
        ThemeToken::TableRowEven => Color::Reset,
        ThemeToken::TableRowOdd => Color::Rgb(20, 20, 20),
        ThemeToken::TableRowSelected => Color::Rgb(40, 70, 40),
        ThemeToken::ResultOk => Color::Green,
        ThemeToken::ResultError => Color::LightRed,
        ThemeToken::ToolbarBackground => Color::DarkGray,
        ThemeToken::ToolbarText => Color::White,
        ThemeToken::ToolbarTabActive => Color::Green,
        ThemeToken::StatusError => Color::Red,
    }
}

/// Accumulated `PushTransform` state: screen = world * scale + translate.
#[derive(Debug, Clone, Copy)]
struct Transform {
    translate: Point,
    scale: Point,
}

impl Transform {
    const IDENTITY: Transform = Transform {
        translate: Point { x: 0.0, y: 0.0 },
        scale: Point { x: 1.0, y: 1.0 },
    };

    fn then(&self, translate: Point, scale: Point) -> Transform {
        Transform {
            translate: Point::new(
                self.translate.x + translate.x * self.scale.x,
                self.translate.y + translate.y * self.scale.y,
            ),
            scale: Point::new(self.scale.x * scale.x, self.scale.y * scale.y),
        }
    }

    fn apply(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale.x + self.translate.x,
            p.y * self.scale.y + self.translate.y,
        )
    }
}

/// Canvas units to a cell position relative to `area`, `None` when outside.
fn to_cell(area: Rect, p: Point) -> Option<(u16, u16)> {
    let col = (p.x / CHAR_WIDTH).floor();
    let row = (p.y / LINE_HEIGHT).floor();
    if col < 0.0 || row < 0.0 || col >= f64::from(area.width) || row >= f64::from(area.height) {
        return None;
    }
    Some((area.x + col as u16, area.y + row as u16))
}

fn put(buf: &mut Buffer, pos: (u16, u16), ch: char, fg: Option<Color>, bg: Option<Color>) {
    if let Some(cell) = buf.cell_mut(pos) {
        cell.set_char(ch);
        if let Some(fg) = fg {
            cell.set_fg(fg);
        }
        if let Some(bg) = bg {
            cell.set_bg(bg);
        }
    }
}

/// Paint a command list into `area`, one cell per `CHAR_WIDTH` x
/// `LINE_HEIGHT` canvas units.
pub fn draw_commands(buf: &mut Buffer, area: Rect, commands: &[RenderCommand]) {
    let mut stack = vec![Transform::IDENTITY];

    for cmd in commands {
        let t = stack.last().copied().unwrap_or(Transform::IDENTITY);
        match cmd {
            RenderCommand::PushTransform { translate, scale } => {
                stack.push(t.then(*translate, *scale));
            }
            RenderCommand::PopTransform => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            RenderCommand::DrawRect {
                rect,
                color,
                border_color,
                label,
                ..
            } => {
                let tl = t.apply(Point::new(rect.x, rect.y));
                let br = t.apply(Point::new(rect.right(), rect.bottom()));
                draw_rect(buf, area, tl, br, *color, *border_color, label.as_deref());
            }
            RenderCommand::DrawText {
                position,
                text,
                color,
                ..
            } => {
                let start = t.apply(*position);
                let fg = theme_to_color(*color);
                for (i, ch) in text.chars().enumerate() {
                    let p = Point::new(start.x + i as f64 * CHAR_WIDTH, start.y);
                    if let Some(pos) = to_cell(area, p) {
                        put(buf, pos, ch, Some(fg), None);
                    }
                }
            }
            RenderCommand::DrawLine {
                from, to, color, ..
            } => {
                draw_line(buf, area, t.apply(*from), t.apply(*to), theme_to_color(*color));
            }
            RenderCommand::BeginGroup { .. } | RenderCommand::EndGroup => {}
        }
    }
}

fn draw_rect(
    buf: &mut Buffer,
    area: Rect,
    tl: Point,
    br: Point,
    color: ThemeToken,
    border: Option<ThemeToken>,
    label: Option<&str>,
) {
    let c0 = (tl.x / CHAR_WIDTH).floor() as i64;
    let r0 = (tl.y / LINE_HEIGHT).floor() as i64;
    let c1 = ((br.x / CHAR_WIDTH).ceil() as i64 - 1).max(c0);
    let r1 = ((br.y / LINE_HEIGHT).ceil() as i64 - 1).max(r0);
    let fill = theme_to_color(color);
    let stroke = border.map(theme_to_color);

    for row in r0..=r1 {
        for col in c0..=c1 {
            if col < 0 || row < 0 || col >= i64::from(area.width) || row >= i64::from(area.height) {
                continue;
            }
            let pos = (area.x + col as u16, area.y + row as u16);
            let edge_v = col == c0 || col == c1;
            let edge_h = row == r0 || row == r1;
            let ch = match (stroke.is_some() && label.is_none(), edge_h, edge_v) {
                (true, true, true) => corner(row == r0, col == c0),
                (true, true, false) => '─',
                (true, false, true) => '│',
                _ => ' ',
            };
            put(buf, pos, ch, stroke, Some(fill));
        }
    }

    if let Some(label) = label {
        // Headers are filled bars; the text sits one cell in.
        let width = (c1 - c0 - 1).max(0) as usize;
        for (i, ch) in label.chars().take(width).enumerate() {
            let col = c0 + 1 + i as i64;
            if col < 0 || r0 < 0 || col >= i64::from(area.width) || r0 >= i64::from(area.height) {
                continue;
            }
            if let Some(cell) = buf.cell_mut((area.x + col as u16, area.y + r0 as u16)) {
                cell.set_char(ch)
                    .set_fg(Color::Black)
                    .set_bg(fill)
                    .set_style(Style::default().add_modifier(Modifier::BOLD));
            }
        }
    }
}

fn corner(top: bool, left: bool) -> char {
    match (top, left) {
        (true, true) => '┌',
        (true, false) => '┐',
        (false, true) => '└',
        (false, false) => '┘',
    }
}

fn draw_line(buf: &mut Buffer, area: Rect, from: Point, to: Point, color: Color) {
    let (x0, y0) = (from.x / CHAR_WIDTH, from.y / LINE_HEIGHT);
    let (x1, y1) = (to.x / CHAR_WIDTH, to.y / LINE_HEIGHT);
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
    let glyph = if (x1 - x0).abs() < 0.5 { '│' } else { '·' };
    for i in 0..=steps {
        let f = i as f64 / steps as f64;
        let p = Point::new(
            (x0 + (x1 - x0) * f) * CHAR_WIDTH,
            (y0 + (y1 - y0) * f) * LINE_HEIGHT,
        );
        if let Some(pos) = to_cell(area, p) {
            // Never draw over a node.
            if buf.cell(pos).is_some_and(|c| c.symbol() == " ") {
                put(buf, pos, glyph, Some(color), None);
            }
        }
    }
}
