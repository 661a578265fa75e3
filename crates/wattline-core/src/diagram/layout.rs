//! Deterministic layered layout for the diagram graph.
//!
//! Top-to-bottom flow: the bus at rank 0, every device one rank below
//! its resolved parent. Within a rank, subtrees are placed left-to-right
//! in the builder's deterministic child order, parents centered over
//! their children where widths allow. Identical graph + identical params
//! always produce identical positions.
//!
//! Coordinates are in abstract layout units (the TUI maps them straight
//! to terminal cells); `(x, y)` is a node's top-left corner.

use std::collections::HashMap;

use super::builder::{DiagramEdge, DiagramGraph, DiagramNode, NodeId};

/// Spacing knobs for the layout, chosen for visual legibility rather
/// than density.
#[derive(Debug, Clone)]
pub struct LayoutParams {
    /// Horizontal gap between sibling node boxes.
    pub node_sep: f64,
    /// Vertical gap between ranks.
    pub rank_sep: f64,
    /// Left/top margins around the whole diagram.
    pub margin_x: f64,
    pub margin_y: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            node_sep: 4.0,
            rank_sep: 2.0,
            margin_x: 1.0,
            margin_y: 1.0,
        }
    }
}

/// A diagram node with its assigned top-left position.
#[derive(Debug, Clone)]
pub struct PositionedNode {
    pub node: DiagramNode,
    pub x: f64,
    pub y: f64,
}

impl PositionedNode {
    /// Horizontal center, where inbound/outbound edges attach.
    pub fn center_x(&self) -> f64 {
        self.x + self.node.width / 2.0
    }

    /// Bottom edge y (outbound edge attachment).
    pub fn bottom(&self) -> f64 {
        self.y + self.node.height
    }
}

/// The positioned diagram: every node with coordinates, the edge list
/// unchanged from the builder, and the overall bounding size.
#[derive(Debug, Clone)]
pub struct LayoutedDiagram {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<DiagramEdge>,
    pub width: f64,
    pub height: f64,
}

impl LayoutedDiagram {
    /// Look up a positioned node by id.
    pub fn node(&self, id: NodeId) -> Option<&PositionedNode> {
        self.nodes.iter().find(|p| p.node.id == id)
    }
}

/// Assign positions to every node of `graph`.
pub fn layout_diagram(graph: &DiagramGraph, params: &LayoutParams) -> LayoutedDiagram {
    let ranks = assign_ranks(graph);

    let mut xs: HashMap<NodeId, f64> = HashMap::with_capacity(graph.nodes.len());
    let mut cursor = params.margin_x;
    if !graph.nodes.is_empty() {
        place_subtree(graph, NodeId::Bus, params, &mut cursor, &mut xs);
    }

    // Rank y offsets from cumulative rank heights.
    let rank_count = ranks.values().copied().max().map_or(0, |r| r + 1);
    let mut rank_height = vec![0.0f64; rank_count];
    for node in &graph.nodes {
        if let Some(&rank) = ranks.get(&node.id) {
            rank_height[rank] = rank_height[rank].max(node.height);
        }
    }
    let mut rank_y = Vec::with_capacity(rank_count);
    let mut y = params.margin_y;
    for height in &rank_height {
        rank_y.push(y);
        y += height + params.rank_sep;
    }

    let nodes: Vec<PositionedNode> = graph
        .nodes
        .iter()
        .map(|node| {
            let rank = ranks.get(&node.id).copied().unwrap_or(0);
            PositionedNode {
                node: node.clone(),
                x: xs.get(&node.id).copied().unwrap_or(params.margin_x),
                y: rank_y.get(rank).copied().unwrap_or(params.margin_y),
            }
        })
        .collect();

    let width = nodes
        .iter()
        .map(|p| p.x + p.node.width)
        .fold(0.0f64, f64::max)
        + params.margin_x;
    let height = nodes
        .iter()
        .map(|p| p.bottom())
        .fold(0.0f64, f64::max)
        + params.margin_y;

    LayoutedDiagram {
        nodes,
        edges: graph.edges.clone(),
        width,
        height,
    }
}

/// Rank = depth from the bus. The graph is a forest under a single root,
/// so a plain walk suffices (cycles were already broken by the builder).
fn assign_ranks(graph: &DiagramGraph) -> HashMap<NodeId, usize> {
    let mut ranks = HashMap::with_capacity(graph.nodes.len());
    let mut stack = vec![(NodeId::Bus, 0usize)];
    while let Some((id, rank)) = stack.pop() {
        ranks.insert(id, rank);
        for &child in graph.children_of(id) {
            stack.push((child, rank + 1));
        }
    }
    ranks
}

/// Place `id`'s subtree left-to-right starting at `cursor`, returning the
/// node's center x. Parents center over their children; a parent wider
/// than its children's span is pushed right instead of overlapping the
/// neighbor subtree.
fn place_subtree(
    graph: &DiagramGraph,
    id: NodeId,
    params: &LayoutParams,
    cursor: &mut f64,
    xs: &mut HashMap<NodeId, f64>,
) -> f64 {
    let width = graph.node(id).map_or(0.0, |n| n.width);
    let kids = graph.children_of(id);

    if kids.is_empty() {
        let x = *cursor;
        xs.insert(id, x);
        *cursor = x + width + params.node_sep;
        return x + width / 2.0;
    }

    let leftmost = *cursor;
    let mut first_center = 0.0;
    let mut last_center = 0.0;
    for (i, &child) in kids.iter().enumerate() {
        let center = place_subtree(graph, child, params, cursor, xs);
        if i == 0 {
            first_center = center;
        }
        last_center = center;
    }

    let x = ((first_center + last_center) / 2.0 - width / 2.0).max(leftmost);
    xs.insert(id, x);
    *cursor = cursor.max(x + width + params.node_sep);
    x + width / 2.0
}
