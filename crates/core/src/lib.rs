//! Selection coordination for the thorn compiler's visual debugger.
//!
//! Code text, trace events and the event graph all address the same source
//! file by global byte offset. [`model::Session`] owns the shared selection
//! and turns user gestures and server responses into new state plus the
//! requests to issue next; the [`views`] render that state.

pub mod model;
pub mod span;
pub mod svg;
pub mod views;

pub use span::{GlobalSpan, LocalSpan, SpanError};
