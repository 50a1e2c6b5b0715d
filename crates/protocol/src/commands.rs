use serde::{Deserialize, Serialize};

use crate::theme::ThemeToken;
use crate::types::{Point, Rect};

/// A single, stateless render instruction.
///
/// The graph canvas emits a `Vec<RenderCommand>` per frame. Renderers
/// (terminal cells, SVG) consume the list sequentially; each command carries
/// all the data it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Draw a filled rectangle, optionally with a one-line label and the id
    /// of the graph node it belongs to (for hit-testing).
    DrawRect {
        rect: Rect,
        color: ThemeToken,
        border_color: Option<ThemeToken>,
        label: Option<String>,
        node_id: Option<u64>,
    },

    /// Draw a text string; `position` is the top-left of the first glyph.
    DrawText {
        position: Point,
        text: String,
        color: ThemeToken,
    },

    /// Draw a line segment.
    DrawLine {
        from: Point,
        to: Point,
        color: ThemeToken,
        width: f64,
    },

    /// Push an affine transform (applied to all subsequent commands until
    /// the matching `PopTransform`).
    PushTransform { translate: Point, scale: Point },

    /// Pop the most recent transform.
    PopTransform,

    /// Begin a logical group (e.g. the edges layer, or one node box).
    BeginGroup { id: String, label: Option<String> },

    /// End the current group.
    EndGroup,
}
