//! JSON shapes served by the compiler's insight server.
//!
//! These mirror the server's responses field-for-field and perform no
//! validation; `thorn-insight-core` converts them into checked model types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type FileId = u64;

/// A `[low, high)` byte-offset pair as sent by the server (`[12, 40]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireSpan(pub u64, pub u64);

impl WireSpan {
    pub fn low(&self) -> u64 {
        self.0
    }

    pub fn high(&self) -> u64 {
        self.1
    }
}

/// One entry of `GET /files`: `[id, "src/main.br"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry(pub FileId, pub String);

/// Body of `GET /files/{id}`: `["<text>", [start, end]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent(pub String, pub WireSpan);

/// A single compiler trace event, as returned by `GET /data` and embedded in
/// graph payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
    pub stage: String,
    pub source: WireSpan,
    #[serde(default)]
    pub ok: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "ref", default)]
    pub ref_span: Option<WireSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Direct syntactic relationship; drives the layout hierarchy.
    Parent,
    /// The source node used the target node as context during resolution.
    Ref,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: u64,
    pub target: u64,
    #[serde(rename = "ty", alias = "type")]
    pub kind: EdgeKind,
}

/// Graph nodes keyed by id.
///
/// The server emits a plain array whose indices are the ids edges refer to;
/// an explicit `{ "id": node }` object is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeTable {
    List(Vec<TraceEventRecord>),
    Map(BTreeMap<String, TraceEventRecord>),
}

impl NodeTable {
    /// Nodes paired with their ids, in ascending id order. Object keys that
    /// are not integers are skipped.
    pub fn into_indexed(self) -> Vec<(u64, TraceEventRecord)> {
        match self {
            NodeTable::List(nodes) => nodes
                .into_iter()
                .enumerate()
                .map(|(i, n)| (i as u64, n))
                .collect(),
            NodeTable::Map(nodes) => {
                let mut indexed: Vec<_> = nodes
                    .into_iter()
                    .filter_map(|(k, n)| k.trim().parse::<u64>().ok().map(|id| (id, n)))
                    .collect();
                indexed.sort_by_key(|(id, _)| *id);
                indexed
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NodeTable::List(nodes) => nodes.len(),
            NodeTable::Map(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NodeTable {
    fn default() -> Self {
        NodeTable::List(Vec::new())
    }
}

/// Body of `GET /data/graph?stage=...`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPayload {
    #[serde(default)]
    pub nodes: NodeTable,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}
