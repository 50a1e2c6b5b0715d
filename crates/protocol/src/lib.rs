pub mod commands;
pub mod theme;
pub mod types;
pub mod wire;

pub use commands::RenderCommand;
pub use theme::ThemeToken;
pub use types::{Point, Rect, Viewport};
pub use wire::{
    EdgeKind, EdgeRecord, FileContent, FileEntry, FileId, GraphPayload, NodeTable,
    TraceEventRecord, WireSpan,
};
