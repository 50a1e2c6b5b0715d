//! Byte-offset spans in the two coordinate spaces the viewer deals with.
//!
//! [`GlobalSpan`] is an absolute position in the compiler's source map (what
//! the server speaks); [`LocalSpan`] indexes into the text of the currently
//! loaded [`CodeWindow`](crate::model::CodeWindow). The only conversions
//! between the two live on `CodeWindow`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use thorn_insight_protocol::WireSpan;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("invalid span: start {start} is after end {end}")]
    Inverted { start: u64, end: u64 },
    #[error("span [{start}, {end}) lies outside the loaded window [{low}, {high})")]
    OutOfWindow {
        start: u64,
        end: u64,
        low: u64,
        high: u64,
    },
    #[error("offset {offset} does not fall on a character boundary")]
    NotCharBoundary { offset: usize },
}

/// Half-open `[start, end)` interval of absolute source offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WireSpan", into = "WireSpan")]
pub struct GlobalSpan {
    start: u64,
    end: u64,
}

impl GlobalSpan {
    /// Fails with [`SpanError::Inverted`] when `start > end`. Offsets are
    /// unsigned, so a negative bound cannot be expressed at all.
    pub fn new(start: u64, end: u64) -> Result<Self, SpanError> {
        if start > end {
            return Err(SpanError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `true` when `inner` lies entirely within `self`. Reflexive.
    pub fn contains(&self, inner: &GlobalSpan) -> bool {
        self.start <= inner.start && inner.end <= self.end
    }
}

impl TryFrom<WireSpan> for GlobalSpan {
    type Error = SpanError;

    fn try_from(w: WireSpan) -> Result<Self, Self::Error> {
        GlobalSpan::new(w.low(), w.high())
    }
}

impl From<GlobalSpan> for WireSpan {
    fn from(s: GlobalSpan) -> Self {
        WireSpan(s.start, s.end)
    }
}

impl fmt::Display for GlobalSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Half-open `[start, end)` interval of offsets into a window's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalSpan {
    start: usize,
    end: usize,
}

impl LocalSpan {
    /// Fails with [`SpanError::Inverted`] when `start > end`.
    pub fn new(start: usize, end: usize) -> Result<Self, SpanError> {
        if start > end {
            return Err(SpanError::Inverted {
                start: start as u64,
                end: end as u64,
            });
        }
        Ok(Self { start, end })
    }

    /// Span between two carets, in whichever order they were placed.
    pub fn between(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, inner: &LocalSpan) -> bool {
        self.start <= inner.start && inner.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(start: u64, end: u64) -> GlobalSpan {
        GlobalSpan::new(start, end).unwrap()
    }

    #[test]
    fn rejects_inverted_spans() {
        assert_eq!(
            GlobalSpan::new(5, 2),
            Err(SpanError::Inverted { start: 5, end: 2 })
        );
        assert!(LocalSpan::new(3, 1).is_err());
        assert!(GlobalSpan::new(4, 4).is_ok_and(|s| s.is_empty()));
    }

    #[test]
    fn containment_is_nested_interval() {
        assert!(g(0, 10).contains(&g(2, 5)));
        assert!(!g(2, 5).contains(&g(0, 10)));
        assert!(g(3, 7).contains(&g(3, 7)));
        assert!(g(3, 7).contains(&g(7, 7)));
        assert!(!g(3, 7).contains(&g(6, 8)));
    }

    #[test]
    fn wire_conversion_validates() {
        assert!(GlobalSpan::try_from(WireSpan(9, 3)).is_err());
        let json = serde_json::to_string(&g(1, 4)).unwrap();
        assert_eq!(json, "[1,4]");
        assert!(serde_json::from_str::<GlobalSpan>("[4,1]").is_err());
    }

    #[test]
    fn between_orders_carets() {
        let s = LocalSpan::between(9, 2);
        assert_eq!((s.start(), s.end()), (2, 9));
    }
}
