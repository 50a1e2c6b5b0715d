//! Layered top-to-bottom layout for the event graph.
//!
//! Parents are ranked above their children (longest path from the roots),
//! ranks are ordered with a few barycenter sweeps to reduce crossings, and
//! children are centered under their parents where space allows.

use std::collections::{BTreeMap, BTreeSet};

use thorn_insight_protocol::Rect;

use crate::model::NodeId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub margin_x: f64,
    pub margin_y: f64,
    /// Horizontal gap between neighbours in a rank.
    pub node_sep: f64,
    /// Vertical gap between ranks.
    pub rank_sep: f64,
    pub sweeps: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_x: 100.0,
            margin_y: 100.0,
            node_sep: 50.0,
            rank_sep: 50.0,
            sweeps: 4,
        }
    }
}

/// Position every node in `sizes` (`(width, height)`), returning its box.
pub fn layered_layout(
    sizes: &BTreeMap<NodeId, (f64, f64)>,
    edges: &[(NodeId, NodeId)],
    config: &LayoutConfig,
) -> BTreeMap<NodeId, Rect> {
    if sizes.is_empty() {
        return BTreeMap::new();
    }

    let edges = acyclic_edges(sizes, edges);
    let mut children: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    let mut parents: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for &(p, c) in &edges {
        children.entry(p).or_default().push(c);
        parents.entry(c).or_default().push(p);
    }

    let rank = assign_ranks(sizes, &children, &parents);
    let mut layers = initial_order(sizes, &children, &parents, &rank);
    for _ in 0..config.sweeps {
        reorder(&mut layers, &parents, true);
        reorder(&mut layers, &children, false);
    }

    place(sizes, &layers, &parents, config)
}

/// Drop self loops, edges to unknown nodes, and back edges found by a DFS
/// in id order.
fn acyclic_edges(
    sizes: &BTreeMap<NodeId, (f64, f64)>,
    edges: &[(NodeId, NodeId)],
) -> Vec<(NodeId, NodeId)> {
    let mut out: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for &(p, c) in edges {
        if p != c && sizes.contains_key(&p) && sizes.contains_key(&c) {
            out.entry(p).or_default().push(c);
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Open,
        Done,
    }
    let mut marks: BTreeMap<NodeId, Mark> = BTreeMap::new();
    let mut kept = Vec::new();

    for &root in sizes.keys() {
        if marks.contains_key(&root) {
            continue;
        }
        // Iterative DFS: (node, next child index).
        let mut stack = vec![(root, 0usize)];
        marks.insert(root, Mark::Open);
        while let Some((node, next)) = stack.pop() {
            let succ = out.get(&node).map_or(&[][..], Vec::as_slice);
            if let Some(&child) = succ.get(next) {
                stack.push((node, next + 1));
                match marks.get(&child) {
                    Some(Mark::Open) => {}
                    Some(Mark::Done) => kept.push((node, child)),
                    None => {
                        kept.push((node, child));
                        marks.insert(child, Mark::Open);
                        stack.push((child, 0));
                    }
                }
            } else {
                marks.insert(node, Mark::Done);
            }
        }
    }
    kept
}

fn assign_ranks(
    sizes: &BTreeMap<NodeId, (f64, f64)>,
    children: &BTreeMap<NodeId, Vec<NodeId>>,
    parents: &BTreeMap<NodeId, Vec<NodeId>>,
) -> BTreeMap<NodeId, usize> {
    let mut indegree: BTreeMap<NodeId, usize> = sizes
        .keys()
        .map(|&id| (id, parents.get(&id).map_or(0, Vec::len)))
        .collect();
    let mut ready: BTreeSet<NodeId> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut rank: BTreeMap<NodeId, usize> = sizes.keys().map(|&id| (id, 0)).collect();

    while let Some(node) = ready.pop_first() {
        let r = rank.get(&node).copied().unwrap_or(0);
        for &child in children.get(&node).map_or(&[][..], Vec::as_slice) {
            if let Some(cr) = rank.get_mut(&child) {
                *cr = (*cr).max(r + 1);
            }
            if let Some(d) = indegree.get_mut(&child) {
                *d -= 1;
                if *d == 0 {
                    ready.insert(child);
                }
            }
        }
    }
    rank
}

/// Group nodes by rank in DFS preorder from the roots.
fn initial_order(
    sizes: &BTreeMap<NodeId, (f64, f64)>,
    children: &BTreeMap<NodeId, Vec<NodeId>>,
    parents: &BTreeMap<NodeId, Vec<NodeId>>,
    rank: &BTreeMap<NodeId, usize>,
) -> Vec<Vec<NodeId>> {
    let depth = rank.values().copied().max().unwrap_or(0);
    let mut layers = vec![Vec::new(); depth + 1];
    let mut seen = BTreeSet::new();

    let roots = sizes.keys().filter(|id| !parents.contains_key(id));
    for &root in roots.chain(sizes.keys()) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            layers[rank.get(&node).copied().unwrap_or(0)].push(node);
            if let Some(kids) = children.get(&node) {
                stack.extend(kids.iter().rev());
            }
        }
    }
    layers
}

/// One barycenter sweep. `down` orders each rank by its neighbours in the
/// rank above; otherwise by the rank below.
fn reorder(layers: &mut [Vec<NodeId>], neighbours: &BTreeMap<NodeId, Vec<NodeId>>, down: bool) {
    let order: Vec<usize> = if down {
        (1..layers.len()).collect()
    } else {
        (0..layers.len().saturating_sub(1)).rev().collect()
    };
    for r in order {
        let fixed = if down { r - 1 } else { r + 1 };
        let position: BTreeMap<NodeId, usize> = layers[fixed]
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let mut keyed: Vec<(f64, NodeId)> = layers[r]
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                let ps: Vec<usize> = neighbours
                    .get(&id)
                    .into_iter()
                    .flatten()
                    .filter_map(|n| position.get(n).copied())
                    .collect();
                let key = if ps.is_empty() {
                    i as f64
                } else {
                    ps.iter().sum::<usize>() as f64 / ps.len() as f64
                };
                (key, id)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        layers[r] = keyed.into_iter().map(|(_, id)| id).collect();
    }
}

fn place(
    sizes: &BTreeMap<NodeId, (f64, f64)>,
    layers: &[Vec<NodeId>],
    parents: &BTreeMap<NodeId, Vec<NodeId>>,
    config: &LayoutConfig,
) -> BTreeMap<NodeId, Rect> {
    let mut boxes: BTreeMap<NodeId, Rect> = BTreeMap::new();
    let mut y = config.margin_y;

    for layer in layers {
        let mut cursor = f64::NEG_INFINITY;
        let mut tallest: f64 = 0.0;
        for &id in layer {
            let (w, h) = sizes.get(&id).copied().unwrap_or((0.0, 0.0));
            let centers: Vec<f64> = parents
                .get(&id)
                .into_iter()
                .flatten()
                .filter_map(|p| boxes.get(p))
                .map(|b| b.x + b.w / 2.0)
                .collect();
            let desired = if centers.is_empty() {
                cursor
            } else {
                centers.iter().sum::<f64>() / centers.len() as f64 - w / 2.0
            };
            let x = if cursor.is_finite() {
                desired.max(cursor)
            } else if desired.is_finite() {
                desired
            } else {
                0.0
            };
            boxes.insert(id, Rect::new(x, y, w, h));
            cursor = x + w + config.node_sep;
            tallest = tallest.max(h);
        }
        y += tallest + config.rank_sep;
    }

    let min_x = boxes.values().map(|b| b.x).fold(f64::INFINITY, f64::min);
    if min_x.is_finite() {
        for b in boxes.values_mut() {
            b.x += config.margin_x - min_x;
        }
    }
    boxes
}
