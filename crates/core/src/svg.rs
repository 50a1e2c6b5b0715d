//! SVG renderer: converts `RenderCommand` lists into standalone SVG strings.

use thorn_insight_protocol::{RenderCommand, ThemeToken};

const FONT_SIZE: f64 = 11.0;

/// Render a list of commands as an SVG document string.
///
/// `width` and `height` define the SVG viewBox dimensions.
/// `dark` selects the color palette.
pub fn render_svg(commands: &[RenderCommand], width: f64, height: f64, dark: bool) -> String {
    let mut svg = String::with_capacity(commands.len() * 200);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}" style="font-family:ui-monospace,monospace;font-size:11px">"#,
    ));

    let bg = resolve_color(ThemeToken::Background, dark);
    svg.push_str(&format!(
        r#"<rect width="{width}" height="{height}" fill="{bg}"/>"#,
    ));

    for cmd in commands {
        match cmd {
            RenderCommand::DrawRect {
                rect,
                color,
                border_color,
                label,
                node_id,
            } => {
                let fill = resolve_color(*color, dark);
                svg.push_str(&format!(
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{fill}""#,
                    rect.x, rect.y, rect.w, rect.h,
                ));
                if let Some(border) = border_color {
                    svg.push_str(&format!(
                        r#" stroke="{}""#,
                        resolve_color(*border, dark)
                    ));
                }
                if let Some(id) = node_id {
                    svg.push_str(&format!(r#" data-node="{id}""#));
                }
                svg.push_str("/>");

                // Render text label if rect is wide enough
                if let Some(label) = label
                    && rect.w > 30.0
                {
                    let text_color = resolve_color(ThemeToken::TextPrimary, dark);
                    let tx = rect.x + 8.0;
                    let ty = rect.y + rect.h * 0.7;
                    svg.push_str(&format!(
                        r#"<text x="{tx}" y="{ty}" fill="{text_color}" style="pointer-events:none">{}</text>"#,
                        escape_xml(label),
                    ));
                }
            }
            RenderCommand::DrawLine {
                from,
                to,
                color,
                width: line_width,
            } => {
                let stroke = resolve_color(*color, dark);
                svg.push_str(&format!(
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{stroke}" stroke-width="{line_width}"/>"#,
                    from.x, from.y, to.x, to.y,
                ));
            }
            RenderCommand::DrawText {
                text,
                position,
                color,
            } => {
                let fill = resolve_color(*color, dark);
                // `position` is the glyph top; SVG anchors text at the baseline.
                svg.push_str(&format!(
                    r#"<text x="{}" y="{}" fill="{fill}">{}</text>"#,
                    position.x,
                    position.y + FONT_SIZE,
                    escape_xml(text),
                ));
            }
            RenderCommand::PushTransform { translate, scale } => {
                svg.push_str(&format!(
                    r#"<g transform="translate({} {}) scale({} {})">"#,
                    translate.x, translate.y, scale.x, scale.y,
                ));
            }
            RenderCommand::BeginGroup { id, label } => {
                svg.push_str(&format!(r#"<g data-group="{}">"#, escape_xml(id)));
                if let Some(label) = label {
                    svg.push_str(&format!("<title>{}</title>", escape_xml(label)));
                }
            }
            RenderCommand::PopTransform | RenderCommand::EndGroup => svg.push_str("</g>"),
        }
    }

    svg.push_str("</svg>");
    svg
}

fn resolve_color(token: ThemeToken, dark: bool) -> &'static str {
    if dark {
        match token {
            ThemeToken::Background | ThemeToken::CanvasBackground => "#181818",
            ThemeToken::NodeBody => "#262626",
            ThemeToken::NodeStroke | ThemeToken::EdgeLine => "#9e9e9e",
            ThemeToken::TextPrimary | ThemeToken::ToolbarText => "#ececec",
            ThemeToken::TextSecondary | ThemeToken::TextMuted => "#9e9e9e",
            ThemeToken::NodeHeaderOk => "#1e4f7a",
            ThemeToken::NodeHeaderError | ThemeToken::ResultError => "#c62828",
            ThemeToken::NodeContainsSelection => "#ffa726",
            ThemeToken::NodeSelected => "#2e7d32",
            ThemeToken::NodeReferenced => "#8d7a00",
            ThemeToken::CodeHighlight => "#448aff",
            ThemeToken::CodeRefHighlight => "#ffd600",
            _ => "#616161",
        }
    } else {
        match token {
            ThemeToken::Background | ThemeToken::CanvasBackground => "#ffffff",
            ThemeToken::NodeBody => "#f8f9fa",
            ThemeToken::NodeStroke | ThemeToken::EdgeLine => "#000000",
            ThemeToken::TextPrimary | ThemeToken::ToolbarText => "#1a1a2e",
            ThemeToken::TextSecondary | ThemeToken::TextMuted => "#666677",
            ThemeToken::NodeHeaderOk => "#add8e6",
            ThemeToken::NodeHeaderError | ThemeToken::ResultError => "#ff0000",
            ThemeToken::NodeContainsSelection => "#ffa500",
            ThemeToken::NodeSelected => "#90ee90",
            ThemeToken::NodeReferenced => "#ffffe0",
            ThemeToken::CodeHighlight => "#ffd60a",
            ThemeToken::CodeRefHighlight => "#00b87a",
            _ => "#999999",
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
