use std::collections::BTreeMap;
use std::fmt;

use thorn_insight_protocol::{EdgeKind, GraphPayload};
use tracing::debug;

use crate::model::trace::{EventResult, Stage};
use crate::span::{GlobalSpan, SpanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: NodeId,
    pub stage: Stage,
    pub source: GlobalSpan,
    pub result: EventResult,
}

/// The event graph of one pipeline stage.
///
/// Parent edges form the layout hierarchy. Ref edges are kept as an id
/// lookup from a node to the node it refers to, never as a drawn edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
    parent_edges: Vec<(NodeId, NodeId)>,
    refs: BTreeMap<NodeId, NodeId>,
}

impl EventGraph {
    /// Build from a `GET /data/graph` payload.
    ///
    /// Nodes without an `ok` or `error` payload are dropped along with any
    /// edge touching them. A node with a malformed span fails the whole
    /// graph.
    pub fn from_payload(payload: GraphPayload) -> Result<Self, SpanError> {
        let mut nodes = BTreeMap::new();
        for (id, record) in payload.nodes.into_indexed() {
            let Some(result) = EventResult::from_parts(record.ok, record.error) else {
                continue;
            };
            let id = NodeId(id);
            nodes.insert(
                id,
                GraphNode {
                    id,
                    stage: Stage::from(record.stage),
                    source: GlobalSpan::try_from(record.source)?,
                    result,
                },
            );
        }

        let mut parent_edges = Vec::new();
        let mut refs = BTreeMap::new();
        for edge in payload.edges {
            let (source, target) = (NodeId(edge.source), NodeId(edge.target));
            if !nodes.contains_key(&source) || !nodes.contains_key(&target) {
                debug!(%source, %target, "dropping edge to a skipped node");
                continue;
            }
            match edge.kind {
                EdgeKind::Parent => parent_edges.push((source, target)),
                EdgeKind::Ref => {
                    refs.insert(source, target);
                }
            }
        }

        Ok(Self {
            nodes,
            parent_edges,
            refs,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// `(parent, child)` pairs in payload order.
    pub fn parent_edges(&self) -> &[(NodeId, NodeId)] {
        &self.parent_edges
    }

    /// The node `id` refers to, if any.
    pub fn ref_target(&self, id: NodeId) -> Option<NodeId> {
        self.refs.get(&id).copied()
    }
}
