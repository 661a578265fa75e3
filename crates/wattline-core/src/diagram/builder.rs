//! Hierarchy-to-graph builder.
//!
//! Converts a flat device list into a node/edge graph rooted at a single
//! synthetic bus node. Parent resolution rules:
//!
//! - `parent_device_id == None` → fed from the bus
//! - parent id not present in the input → fed from the bus (fallback,
//!   never dropped, never an error)
//! - parent id on an unreachable cycle → the lowest-id member of the
//!   cycle is re-attached to the bus, the rest of the subtree keeps its
//!   declared structure (fail closed)
//!
//! The result always holds N+1 nodes and N edges for N input devices,
//! with every device node having exactly one inbound edge. Duplicate
//! device ids in the input are unspecified behavior and not guarded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::model::Device;

/// Default node box size in layout units (terminal cells).
const DEVICE_NODE_HEIGHT: f64 = 3.0;
const BUS_NODE_WIDTH: f64 = 9.0;
const NODE_LABEL_PADDING: f64 = 4.0;

/// Identifies a diagram node: the synthetic bus root or a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Bus,
    Device(i64),
}

/// A node in the diagram graph. Width/height are declared sizes used
/// purely by the layout stage.
#[derive(Debug, Clone)]
pub struct DiagramNode {
    pub id: NodeId,
    pub label: String,
    pub width: f64,
    pub height: f64,
    /// Backing device record; `None` only for the bus root.
    pub device: Option<Arc<Device>>,
}

impl DiagramNode {
    fn bus() -> Self {
        Self {
            id: NodeId::Bus,
            label: "BUS".into(),
            width: BUS_NODE_WIDTH,
            height: DEVICE_NODE_HEIGHT,
            device: None,
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn device(device: &Arc<Device>) -> Self {
        let width = device.name.chars().count() as f64 + NODE_LABEL_PADDING;
        Self {
            id: NodeId::Device(device.id),
            label: device.name.clone(),
            width,
            height: DEVICE_NODE_HEIGHT,
            device: Some(Arc::clone(device)),
        }
    }
}

/// Directed edge from a device's resolved parent (or the bus) to the
/// device. `live` is a pure function of the child's `is_online` flag at
/// build time -- recomputed on every build, never carried over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub live: bool,
}

/// The derived diagram graph: one bus node, one node per device, one
/// inbound edge per device.
#[derive(Debug, Clone)]
pub struct DiagramGraph {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    /// Parent → children adjacency, children sorted by id for
    /// deterministic layout.
    children: HashMap<NodeId, Vec<NodeId>>,
    /// NodeId → index into `nodes`.
    index: HashMap<NodeId, usize>,
}

impl DiagramGraph {
    /// Children of a node in deterministic (ascending id) order.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&DiagramNode> {
        self.index.get(&id).and_then(|&i| self.nodes.get(i))
    }

    /// Number of device nodes (excludes the bus root).
    pub fn device_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// Build the diagram graph for one snapshot's device list.
///
/// Pure: no side effects, input order irrelevant to correctness (node
/// order follows input order, adjacency is id-sorted).
pub fn build_diagram(devices: &[Arc<Device>]) -> DiagramGraph {
    let known: HashSet<i64> = devices.iter().map(|d| d.id).collect();

    // Resolve each device's parent: declared parent if it exists in this
    // snapshot and isn't a self-reference, otherwise the bus.
    let mut parent_of: HashMap<i64, NodeId> = HashMap::with_capacity(devices.len());
    for dev in devices {
        let parent = match dev.parent_device_id {
            Some(pid) if pid != dev.id && known.contains(&pid) => NodeId::Device(pid),
            _ => NodeId::Bus,
        };
        parent_of.insert(dev.id, parent);
    }

    rescue_cycles(&known, &mut parent_of);

    // Adjacency, id-sorted for deterministic traversal and layout.
    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut ids: Vec<i64> = known.iter().copied().collect();
    ids.sort_unstable();
    for id in ids {
        if let Some(&parent) = parent_of.get(&id) {
            children.entry(parent).or_default().push(NodeId::Device(id));
        }
    }

    // Nodes in input order; bus first.
    let mut nodes = Vec::with_capacity(devices.len() + 1);
    nodes.push(DiagramNode::bus());
    nodes.extend(devices.iter().map(DiagramNode::device));

    let index: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id, i))
        .collect();

    // One edge per device, live iff the child is online right now.
    let edges = devices
        .iter()
        .map(|dev| DiagramEdge {
            from: parent_of.get(&dev.id).copied().unwrap_or(NodeId::Bus),
            to: NodeId::Device(dev.id),
            live: dev.is_online,
        })
        .collect();

    DiagramGraph {
        nodes,
        edges,
        children,
        index,
    }
}

/// Fail-closed cycle handling: walk down from the bus marking reachable
/// devices; while any device remains unreached it sits on or below a
/// `parent_device_id` cycle, so the lowest-id unreached device is
/// re-attached to the bus and the walk continues from there. The rest of
/// the offending subtree keeps its declared structure.
fn rescue_cycles(known: &HashSet<i64>, parent_of: &mut HashMap<i64, NodeId>) {
    let mut children: HashMap<NodeId, Vec<i64>> = HashMap::new();
    for (&id, &parent) in parent_of.iter() {
        children.entry(parent).or_default().push(id);
    }

    let mut visited: HashSet<i64> = HashSet::with_capacity(known.len());
    let mut stack: Vec<i64> = children.get(&NodeId::Bus).cloned().unwrap_or_default();

    loop {
        while let Some(id) = stack.pop() {
            if visited.insert(id) {
                if let Some(kids) = children.get(&NodeId::Device(id)) {
                    stack.extend(kids.iter().copied());
                }
            }
        }

        let Some(rescued) = known
            .iter()
            .copied()
            .filter(|id| !visited.contains(id))
            .min()
        else {
            break;
        };
        parent_of.insert(rescued, NodeId::Bus);
        stack.push(rescued);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn device(id: i64, parent: Option<i64>, online: bool) -> Arc<Device> {
        Arc::new(Device {
            id,
            name: format!("D{id}"),
            location: None,
            power_value: Some(1.0),
            unit: Some("kW".into()),
            is_online: online,
            parent_device_id: parent,
            parent_device_name: None,
        })
    }

    fn edge_from(graph: &DiagramGraph, to: i64) -> &DiagramEdge {
        graph
            .edges
            .iter()
            .find(|e| e.to == NodeId::Device(to))
            .unwrap()
    }

    #[test]
    fn empty_list_yields_root_only() {
        let graph = build_diagram(&[]);
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, NodeId::Bus);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn node_and_edge_counts() {
        let devices = vec![
            device(1, None, true),
            device(2, Some(1), true),
            device(3, Some(1), true),
            device(4, Some(3), false),
        ];
        let graph = build_diagram(&devices);

        assert_eq!(graph.nodes.len(), devices.len() + 1);
        assert_eq!(graph.edges.len(), devices.len());
        assert_eq!(graph.device_count(), 4);

        // every device has exactly one inbound edge
        for dev in &devices {
            let inbound = graph
                .edges
                .iter()
                .filter(|e| e.to == NodeId::Device(dev.id))
                .count();
            assert_eq!(inbound, 1, "device {} in-degree", dev.id);
        }
        // the root has none
        assert!(graph.edges.iter().all(|e| e.to != NodeId::Bus));
    }

    #[test]
    fn dangling_parent_falls_back_to_bus() {
        // Scenario from the backend contract: [{1,∅},{2,parent 1},{3,parent 99}]
        let devices = vec![
            device(1, None, true),
            device(2, Some(1), true),
            device(3, Some(99), true),
        ];
        let graph = build_diagram(&devices);

        assert_eq!(edge_from(&graph, 1).from, NodeId::Bus);
        assert_eq!(edge_from(&graph, 2).from, NodeId::Device(1));
        assert_eq!(edge_from(&graph, 3).from, NodeId::Bus);
        assert_eq!(graph.edges.len(), 3);
    }

    #[test]
    fn self_reference_falls_back_to_bus() {
        let graph = build_diagram(&[device(5, Some(5), true)]);
        assert_eq!(edge_from(&graph, 5).from, NodeId::Bus);
    }

    #[test]
    fn edge_live_tracks_child_online_flag() {
        let devices = vec![device(1, None, true), device(2, Some(1), false)];
        let graph = build_diagram(&devices);

        assert!(edge_from(&graph, 1).live);
        assert!(!edge_from(&graph, 2).live);
    }

    #[test]
    fn rebuild_recolors_edge_after_status_flip() {
        // A poll reporting a previously online device as offline must
        // produce a non-live inbound edge on the next build.
        let graph = build_diagram(&[device(1, None, true)]);
        assert!(edge_from(&graph, 1).live);

        let graph = build_diagram(&[device(1, None, false)]);
        assert!(!edge_from(&graph, 1).live);
    }

    #[test]
    fn two_node_cycle_attaches_representative_to_bus() {
        // A's parent is B, B's parent is A: fail closed, lowest id goes
        // to the bus, the other keeps its declared parent.
        let devices = vec![device(1, Some(2), true), device(2, Some(1), true)];
        let graph = build_diagram(&devices);

        assert_eq!(edge_from(&graph, 1).from, NodeId::Bus);
        assert_eq!(edge_from(&graph, 2).from, NodeId::Device(1));
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn cycle_subtree_keeps_structure() {
        // 3→4→3 cycle with 5 hanging off 4: the cycle is broken at its
        // lowest id, 5 stays under its declared parent.
        let devices = vec![
            device(3, Some(4), true),
            device(4, Some(3), true),
            device(5, Some(4), true),
        ];
        let graph = build_diagram(&devices);

        assert_eq!(edge_from(&graph, 3).from, NodeId::Bus);
        assert_eq!(edge_from(&graph, 4).from, NodeId::Device(3));
        assert_eq!(edge_from(&graph, 5).from, NodeId::Device(4));
    }

    #[test]
    fn input_order_does_not_change_resolution() {
        let forward = build_diagram(&[device(1, None, true), device(2, Some(1), true)]);
        let reverse = build_diagram(&[device(2, Some(1), true), device(1, None, true)]);

        assert_eq!(edge_from(&forward, 2).from, NodeId::Device(1));
        assert_eq!(edge_from(&reverse, 2).from, NodeId::Device(1));
        assert_eq!(forward.children_of(NodeId::Bus), reverse.children_of(NodeId::Bus));
    }

    #[test]
    fn children_are_id_sorted() {
        let devices = vec![
            device(9, None, true),
            device(2, None, true),
            device(5, None, true),
        ];
        let graph = build_diagram(&devices);
        assert_eq!(
            graph.children_of(NodeId::Bus),
            &[NodeId::Device(2), NodeId::Device(5), NodeId::Device(9)]
        );
    }
}
