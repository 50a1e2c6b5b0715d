use serde::{Deserialize, Serialize};

/// Semantic color tokens resolved by the renderer's active palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    Background,

    TextPrimary,
    TextSecondary,
    TextMuted,

    // Code view
    CodeHighlight,
    CodeRefHighlight,

    // Graph canvas
    CanvasBackground,
    NodeBody,
    NodeStroke,
    NodeHeaderOk,
    NodeHeaderError,
    /// Stroke of nodes whose span contains the active selection.
    NodeContainsSelection,
    /// Header fill of the clicked node.
    NodeSelected,
    /// Header fill of the node the clicked node refers to.
    NodeReferenced,
    EdgeLine,

    // Trace table
    TableHeaderBackground,
    TableRowEven,
    TableRowOdd,
    TableRowSelected,
    ResultOk,
    ResultError,

    // Toolbar / status
    ToolbarBackground,
    ToolbarText,
    ToolbarTabActive,
    StatusError,
}
