use std::collections::BTreeMap;

use thorn_insight_protocol::{Point, Rect, RenderCommand, ThemeToken, Viewport};
use tracing::debug;

use crate::model::{EventGraph, NodeId, Stage};
use crate::span::GlobalSpan;
use crate::views::camera::Camera;
use crate::views::layout::{LayoutConfig, layered_layout};

/// Canvas units per character column and per text line.
pub const CHAR_WIDTH: f64 = 7.0;
pub const LINE_HEIGHT: f64 = 14.0;
const WIDTH_PADDING: f64 = 50.0;
const HEIGHT_PADDING: f64 = 30.0;
const HEADER_HEIGHT: f64 = 24.0;
const TEXT_INSET: f64 = 8.0;
const PREVIEW_LIMIT: usize = 30;
const PREVIEW_KEEP: usize = 15;

/// Collapse a source excerpt into a one-line node header.
pub fn preview_text(raw: &str) -> String {
    let flat: String = raw
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let len = flat.chars().count();
    if len < PREVIEW_LIMIT {
        return flat;
    }
    let head: String = flat.chars().take(PREVIEW_KEEP).collect();
    let tail: String = flat.chars().skip(len - PREVIEW_KEEP).collect();
    format!("{head}...{tail}")
}

/// `(width, height)` of a box showing `body`.
pub fn box_size(body: &str) -> (f64, f64) {
    let longest = body.split('\n').map(|l| l.chars().count()).max().unwrap_or(0);
    let newlines = body.matches('\n').count();
    (
        longest as f64 * CHAR_WIDTH + WIDTH_PADDING,
        (newlines + 2) as f64 * LINE_HEIGHT + HEIGHT_PADDING,
    )
}

fn header_width(header: &str) -> f64 {
    header.chars().count() as f64 * CHAR_WIDTH + WIDTH_PADDING
}

/// Display state of one node. Everything here is derived from the node and
/// the preview text; color lives in [`NodeColors`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBox {
    pub id: NodeId,
    pub header: String,
    pub body: String,
    pub is_error: bool,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeColors {
    pub stroke: ThemeToken,
    pub header: ThemeToken,
}

/// Colors for every node from scratch: defaults, then containment of
/// `active`, then the selected node and the node it refers to.
pub fn recolor(
    graph: &EventGraph,
    active: Option<GlobalSpan>,
    selected: Option<NodeId>,
) -> BTreeMap<NodeId, NodeColors> {
    let mut colors: BTreeMap<NodeId, NodeColors> = graph
        .nodes()
        .map(|node| {
            let header = if node.result.is_error() {
                ThemeToken::NodeHeaderError
            } else {
                ThemeToken::NodeHeaderOk
            };
            (
                node.id,
                NodeColors {
                    stroke: ThemeToken::NodeStroke,
                    header,
                },
            )
        })
        .collect();

    if let Some(active) = active {
        for node in graph.nodes().filter(|n| n.source.contains(&active)) {
            if let Some(c) = colors.get_mut(&node.id) {
                c.stroke = ThemeToken::NodeContainsSelection;
            }
        }
    }

    if let Some(id) = selected {
        if let Some(c) = colors.get_mut(&id) {
            c.header = ThemeToken::NodeSelected;
        }
        if let Some(target) = graph.ref_target(id)
            && let Some(c) = colors.get_mut(&target)
        {
            c.header = ThemeToken::NodeReferenced;
        }
    }
    colors
}

/// The event graph of one stage, laid out on a pannable canvas.
#[derive(Debug, Clone, Default)]
pub struct GraphView {
    stage: Option<Stage>,
    graph: EventGraph,
    boxes: BTreeMap<NodeId, NodeBox>,
    selected: Option<NodeId>,
    camera: Camera,
    layout: LayoutConfig,
}

impl GraphView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the graph and lay it out. Returns the spans whose text should
    /// be fetched as node headers.
    pub fn load(&mut self, stage: Stage, graph: EventGraph) -> Vec<(NodeId, GlobalSpan)> {
        self.boxes = graph
            .nodes()
            .map(|node| {
                let body = node.result.text().to_string();
                let header = node.source.to_string();
                let (w, h) = box_size(&body);
                let rect = Rect::new(0.0, 0.0, w.max(header_width(&header)), h);
                (
                    node.id,
                    NodeBox {
                        id: node.id,
                        header,
                        body,
                        is_error: node.result.is_error(),
                        rect,
                    },
                )
            })
            .collect();
        let previews = graph.nodes().map(|n| (n.id, n.source)).collect();
        debug!(%stage, nodes = graph.len(), edges = graph.parent_edges().len(), "graph loaded");
        self.stage = Some(stage);
        self.graph = graph;
        self.selected = None;
        self.relayout();
        previews
    }

    pub fn stage(&self) -> Option<&Stage> {
        self.stage.as_ref()
    }

    pub fn graph(&self) -> &EventGraph {
        &self.graph
    }

    pub fn boxes(&self) -> impl Iterator<Item = &NodeBox> {
        self.boxes.values()
    }

    pub fn node_box(&self, id: NodeId) -> Option<&NodeBox> {
        self.boxes.get(&id)
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Install a fetched header preview. The box widens to fit it (never
    /// narrows) and the graph is laid out again.
    pub fn apply_preview(&mut self, id: NodeId, raw: &str) -> bool {
        let Some(node) = self.boxes.get_mut(&id) else {
            return false;
        };
        node.header = preview_text(raw);
        node.rect.w = node.rect.w.max(header_width(&node.header));
        self.relayout();
        true
    }

    /// Recompute every box position from the current sizes.
    pub fn relayout(&mut self) {
        let sizes = self
            .boxes
            .iter()
            .map(|(id, b)| (*id, (b.rect.w, b.rect.h)))
            .collect();
        let placed = layered_layout(&sizes, self.graph.parent_edges(), &self.layout);
        for (id, rect) in placed {
            if let Some(b) = self.boxes.get_mut(&id) {
                b.rect = rect;
            }
        }
    }

    /// Smallest world rectangle covering every box.
    pub fn bounds(&self) -> Option<Rect> {
        self.boxes
            .values()
            .map(|b| b.rect)
            .reduce(|acc, r| acc.union(&r))
    }

    pub fn colors(&self, active: Option<GlobalSpan>) -> BTreeMap<NodeId, NodeColors> {
        recolor(&self.graph, active, self.selected)
    }

    /// Topmost node under a screen point.
    pub fn hit_test(&self, screen: Point) -> Option<NodeId> {
        let world = self.camera.to_world(screen);
        self.boxes
            .values()
            .rev()
            .find(|b| b.rect.contains(world))
            .map(|b| b.id)
    }

    /// Pointer pressed: returns the node under it, or starts a pan when the
    /// press lands on blank canvas.
    pub fn pointer_down(&mut self, screen: Point) -> Option<NodeId> {
        let hit = self.hit_test(screen);
        if hit.is_none() {
            self.camera.begin_drag(screen);
        }
        hit
    }

    pub fn pointer_move(&mut self, screen: Point) -> bool {
        self.camera.drag_to(screen)
    }

    pub fn pointer_up(&mut self) {
        self.camera.end_drag();
    }

    pub fn zoom_in(&mut self) {
        self.camera.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_out();
    }

    pub fn zoom_to_fit(&mut self, viewport: Viewport) {
        match self.bounds() {
            Some(bounds) => self.camera.fit(bounds, viewport),
            None => self.camera = Camera::default(),
        }
    }

    /// Select `id` and return its span plus the span of the node it refers
    /// to. `None` if the node is not in the graph.
    pub fn click(&mut self, id: NodeId) -> Option<(GlobalSpan, Option<GlobalSpan>)> {
        let node = self.graph.node(id)?;
        let ref_span = self
            .graph
            .ref_target(id)
            .and_then(|t| self.graph.node(t))
            .map(|t| t.source);
        self.selected = Some(id);
        Some((node.source, ref_span))
    }

    /// The node after (or before) the selected one in id order, wrapping.
    pub fn neighbour(&self, forward: bool) -> Option<NodeId> {
        let ids: Vec<NodeId> = self.graph.ids().collect();
        if ids.is_empty() {
            return None;
        }
        let pos = self.selected.and_then(|s| ids.iter().position(|&i| i == s));
        let next = match (pos, forward) {
            (None, true) => 0,
            (None, false) => ids.len() - 1,
            (Some(p), true) => (p + 1) % ids.len(),
            (Some(p), false) => (p + ids.len() - 1) % ids.len(),
        };
        Some(ids[next])
    }

    pub fn render(&self, active: Option<GlobalSpan>, viewport: &Viewport) -> Vec<RenderCommand> {
        let colors = self.colors(active);
        let mut commands = Vec::with_capacity(self.boxes.len() * 5 + self.graph.parent_edges().len() + 6);

        commands.push(RenderCommand::BeginGroup {
            id: "graph".into(),
            label: self.stage.as_ref().map(|s| s.label().to_string()),
        });
        commands.push(RenderCommand::DrawRect {
            rect: Rect::new(viewport.x, viewport.y, viewport.width, viewport.height),
            color: ThemeToken::CanvasBackground,
            border_color: None,
            label: None,
            node_id: None,
        });
        commands.push(RenderCommand::PushTransform {
            translate: self.camera.translate,
            scale: Point::new(self.camera.scale, self.camera.scale),
        });

        for (parent, child) in self.graph.parent_edges() {
            let (Some(p), Some(c)) = (self.boxes.get(parent), self.boxes.get(child)) else {
                continue;
            };
            commands.push(RenderCommand::DrawLine {
                from: Point::new(p.rect.x + p.rect.w / 2.0, p.rect.bottom()),
                to: Point::new(c.rect.x + c.rect.w / 2.0, c.rect.y),
                color: ThemeToken::EdgeLine,
                width: 1.0,
            });
        }

        for b in self.boxes.values() {
            let Some(c) = colors.get(&b.id) else {
                continue;
            };
            commands.push(RenderCommand::DrawRect {
                rect: b.rect,
                color: ThemeToken::NodeBody,
                border_color: Some(c.stroke),
                label: None,
                node_id: Some(b.id.0),
            });
            commands.push(RenderCommand::DrawRect {
                rect: Rect::new(b.rect.x, b.rect.y, b.rect.w, HEADER_HEIGHT),
                color: c.header,
                border_color: Some(c.stroke),
                label: Some(b.header.clone()),
                node_id: Some(b.id.0),
            });
            for (i, line) in b.body.lines().enumerate() {
                commands.push(RenderCommand::DrawText {
                    position: Point::new(
                        b.rect.x + TEXT_INSET,
                        b.rect.y + HEADER_HEIGHT + TEXT_INSET + i as f64 * LINE_HEIGHT,
                    ),
                    text: line.to_string(),
                    color: if b.is_error {
                        ThemeToken::ResultError
                    } else {
                        ThemeToken::TextPrimary
                    },
                });
            }
        }

        commands.push(RenderCommand::PopTransform);
        commands.push(RenderCommand::EndGroup);
        commands
    }
}
