pub mod camera;
pub mod code_view;
pub mod graph_view;
pub mod layout;
pub mod trace_view;

pub use camera::Camera;
pub use code_view::{LineIndex, Segment, SegmentStyle, code_segments, split_lines, split_segments};
pub use graph_view::{GraphView, NodeBox, NodeColors, preview_text, recolor};
pub use layout::{LayoutConfig, layered_layout};
pub use trace_view::{TraceRow, TraceView};
