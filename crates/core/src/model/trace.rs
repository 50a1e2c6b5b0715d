use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thorn_insight_protocol::TraceEventRecord;

use crate::span::{GlobalSpan, SpanError};

/// A phase of the compiler pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    Lexer,
    Parser,
    CanonizeItemPath,
    TypeResolver,
    Llvm,
    /// A stage this build of the viewer does not know by name.
    Other(String),
}

impl Stage {
    pub const KNOWN: [Stage; 5] = [
        Stage::Lexer,
        Stage::Parser,
        Stage::CanonizeItemPath,
        Stage::TypeResolver,
        Stage::Llvm,
    ];

    /// Identifier used on the wire (`stage=` query values, event records).
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Lexer => "lexer",
            Stage::Parser => "parser",
            Stage::CanonizeItemPath => "canonize-item-path",
            Stage::TypeResolver => "type-resolver",
            Stage::Llvm => "llvm",
            Stage::Other(name) => name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Stage::Lexer => "Lexer",
            Stage::Parser => "Parser",
            Stage::CanonizeItemPath => "Canonizer",
            Stage::TypeResolver => "Type Resolver",
            Stage::Llvm => "LLVM",
            Stage::Other(name) => name,
        }
    }
}

impl From<&str> for Stage {
    fn from(s: &str) -> Self {
        match s {
            "lexer" => Stage::Lexer,
            "parser" => Stage::Parser,
            "canonize-item-path" => Stage::CanonizeItemPath,
            "type-resolver" => Stage::TypeResolver,
            "llvm" => Stage::Llvm,
            other => Stage::Other(other.to_string()),
        }
    }
}

impl From<String> for Stage {
    fn from(s: String) -> Self {
        Stage::from(s.as_str())
    }
}

impl From<Stage> for String {
    fn from(s: Stage) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stage the trace table and graph are narrowed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum StageFilter {
    #[default]
    All,
    Only(Stage),
}

impl StageFilter {
    /// Every selectable filter, in menu order.
    pub fn choices() -> Vec<StageFilter> {
        std::iter::once(StageFilter::All)
            .chain(Stage::KNOWN.iter().cloned().map(StageFilter::Only))
            .collect()
    }

    pub fn matches(&self, stage: &Stage) -> bool {
        match self {
            StageFilter::All => true,
            StageFilter::Only(s) => s == stage,
        }
    }

    /// The stage whose graph is shown; `All` has no graph of its own and
    /// shows the parser's.
    pub fn graph_stage(&self) -> Stage {
        match self {
            StageFilter::All => Stage::Parser,
            StageFilter::Only(s) => s.clone(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            StageFilter::All => "All",
            StageFilter::Only(s) => s.label(),
        }
    }

    /// Next entry of [`Self::choices`], wrapping around.
    pub fn cycle(&self, forward: bool) -> StageFilter {
        let choices = Self::choices();
        let n = choices.len();
        let pos = choices.iter().position(|c| c == self).unwrap_or(0);
        let next = if forward { (pos + 1) % n } else { (pos + n - 1) % n };
        choices[next].clone()
    }
}

impl FromStr for StageFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "" | "all" => StageFilter::All,
            other => StageFilter::Only(Stage::from(other)),
        })
    }
}

/// Outcome recorded for a trace event or graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventResult {
    Ok(String),
    Error(String),
}

impl EventResult {
    /// Collapse the wire's `ok`/`error` pair. An error wins when a record
    /// carries both.
    pub fn from_parts(ok: Option<String>, error: Option<String>) -> Option<EventResult> {
        match (ok, error) {
            (_, Some(e)) => Some(EventResult::Error(e)),
            (Some(o), None) => Some(EventResult::Ok(o)),
            (None, None) => None,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            EventResult::Ok(s) | EventResult::Error(s) => s,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EventResult::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub id: Option<u64>,
    pub parent_id: Option<u64>,
    pub stage: Stage,
    pub source: GlobalSpan,
    pub result: Option<EventResult>,
    pub ref_span: Option<GlobalSpan>,
}

impl TryFrom<TraceEventRecord> for TraceEvent {
    type Error = SpanError;

    fn try_from(r: TraceEventRecord) -> Result<Self, Self::Error> {
        Ok(TraceEvent {
            id: r.id,
            parent_id: r.parent_id,
            stage: Stage::from(r.stage),
            source: GlobalSpan::try_from(r.source)?,
            result: EventResult::from_parts(r.ok, r.error),
            ref_span: r.ref_span.map(GlobalSpan::try_from).transpose()?,
        })
    }
}
