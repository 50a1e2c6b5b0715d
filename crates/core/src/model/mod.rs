pub mod code_window;
pub mod graph;
pub mod requests;
pub mod selection;
pub mod session;
pub mod trace;

pub use code_window::CodeWindow;
pub use graph::{EventGraph, GraphNode, NodeId};
pub use requests::{Channel, RequestToken, RequestTracker};
pub use selection::{SelectionState, SelectionStore, Tab};
pub use session::{Action, Effect, Panel, PanelStatus, Payload, Request, Response, Session};
pub use trace::{EventResult, Stage, StageFilter, TraceEvent};
