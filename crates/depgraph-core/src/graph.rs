//! Concurrency-safe dependency graph backed by petgraph::StableDiGraph

use std::collections::HashMap;

use parking_lot::RwLock;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::algo;
use crate::model::{Cycle, Edge, Node};

/// Point-in-time copy of a graph. Algorithms run on snapshots so they never
/// hold the graph lock while traversing.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    inner: StableDiGraph<Node, Edge>,
    index: HashMap<String, NodeIndex>,
}

impl GraphSnapshot {
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Node indices in insertion order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.inner.node_indices()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.inner.node_weight(idx)
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.index_of(id).and_then(|idx| self.node(idx))
    }

    /// Outgoing edges of a node as `(target, edge)`, in insertion order.
    pub fn outgoing(&self, idx: NodeIndex) -> Vec<(NodeIndex, &Edge)> {
        let mut out: Vec<_> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        // petgraph walks adjacency lists newest-first.
        out.reverse();
        out
    }

    /// Incoming edges of a node, in insertion order.
    pub fn incoming(&self, idx: NodeIndex) -> Vec<&Edge> {
        let mut inc: Vec<_> = self
            .inner
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.weight())
            .collect();
        inc.reverse();
        inc
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.inner
            .edge_indices()
            .filter_map(move |idx| self.inner.edge_weight(idx))
    }

    fn add_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.index.get(node.id()) {
            return idx;
        }
        let id = node.id().to_string();
        let idx = self.inner.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    fn ensure_node(&mut self, id: &str, fallback: impl FnOnce() -> Node) -> NodeIndex {
        match self.index.get(id) {
            Some(&idx) => idx,
            None => self.add_node(fallback()),
        }
    }

    fn add_edge(&mut self, edge: Edge, source: Node, target: Node) -> bool {
        let s = self.add_node(source);
        let t = self.add_node(target);
        self.insert_edge(s, t, edge)
    }

    fn insert_edge(&mut self, s: NodeIndex, t: NodeIndex, edge: Edge) -> bool {
        // One edge per (source, target) pair; the first one wins.
        if self.inner.find_edge(s, t).is_some() {
            return false;
        }
        self.inner.add_edge(s, t, edge);
        true
    }

    fn remove_node(&mut self, id: &str) -> Option<Node> {
        let idx = self.index.remove(id)?;
        self.inner.remove_node(idx)
    }
}

/// A directed dependency graph that is safe to share between threads.
///
/// Edges point from the dependent to its dependency. One reader/writer lock
/// guards the whole structure, so an edge insertion (which touches the
/// adjacency of both endpoints) is never observed half-applied. Queries
/// return owned copies rather than live views.
#[derive(Default)]
pub struct DependencyGraph {
    state: RwLock<GraphSnapshot>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DependencyGraph")
            .field("node_count", &state.node_count())
            .field("edge_count", &state.edge_count())
            .finish()
    }
}

impl Clone for DependencyGraph {
    fn clone(&self) -> Self {
        DependencyGraph::from(self.snapshot())
    }
}

impl From<GraphSnapshot> for DependencyGraph {
    fn from(snapshot: GraphSnapshot) -> Self {
        DependencyGraph {
            state: RwLock::new(snapshot),
        }
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless one with the same identity exists.
    /// Returns `true` if the node was new.
    pub fn add_node(&self, node: Node) -> bool {
        let mut state = self.state.write();
        if state.index.contains_key(node.id()) {
            return false;
        }
        state.add_node(node);
        true
    }

    /// Insert an edge, creating placeholder nodes for unknown endpoints.
    ///
    /// A placeholder is a project node named after its id. Returns `false`
    /// when an edge between the same pair already exists.
    pub fn add_edge(&self, edge: Edge) -> bool {
        let mut state = self.state.write();
        let source_id = edge.source.clone();
        let target_id = edge.target.clone();
        let s = state.ensure_node(&source_id, || placeholder(&source_id));
        let t = state.ensure_node(&target_id, || placeholder(&target_id));
        state.insert_edge(s, t, edge)
    }

    /// Insert an edge together with its endpoint nodes in one write section.
    pub fn connect(&self, source: Node, target: Node, edge: Edge) -> bool {
        debug_assert_eq!(source.id(), edge.source);
        debug_assert_eq!(target.id(), edge.target);
        self.state.write().add_edge(edge, source, target)
    }

    /// Remove a node and every edge incident to it.
    pub fn remove_node(&self, id: &str) -> Option<Node> {
        self.state.write().remove_node(id)
    }

    pub fn node_by_id(&self, id: &str) -> Option<Node> {
        self.state.read().node_by_id(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().index.contains_key(id)
    }

    pub fn all_nodes(&self) -> Vec<Node> {
        self.state.read().nodes().cloned().collect()
    }

    pub fn all_edges(&self) -> Vec<Edge> {
        self.state.read().edges().cloned().collect()
    }

    pub fn project_nodes(&self) -> Vec<Node> {
        self.state.read().nodes().filter(|n| n.is_project()).cloned().collect()
    }

    pub fn package_nodes(&self) -> Vec<Node> {
        self.state.read().nodes().filter(|n| n.is_package()).cloned().collect()
    }

    /// Edges leaving `id`; empty for unknown nodes.
    pub fn outgoing_edges(&self, id: &str) -> Vec<Edge> {
        let state = self.state.read();
        state
            .index_of(id)
            .map(|idx| state.outgoing(idx).into_iter().map(|(_, e)| e.clone()).collect())
            .unwrap_or_default()
    }

    /// Edges entering `id`; empty for unknown nodes.
    pub fn incoming_edges(&self, id: &str) -> Vec<Edge> {
        let state = self.state.read();
        state
            .index_of(id)
            .map(|idx| state.incoming(idx).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.state.read().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.state.read().edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Union `other` into this graph. Existing nodes and edges are kept.
    pub fn merge(&self, other: &DependencyGraph) {
        let incoming = other.snapshot();
        self.merge_snapshot(&incoming);
    }

    pub fn merge_snapshot(&self, other: &GraphSnapshot) {
        let mut state = self.state.write();
        for node in other.nodes() {
            state.add_node(node.clone());
        }
        for edge in other.edges() {
            let (Some(s), Some(t)) = (state.index_of(&edge.source), state.index_of(&edge.target))
            else {
                continue;
            };
            state.insert_edge(s, t, edge.clone());
        }
    }

    pub fn clear(&self) {
        *self.state.write() = GraphSnapshot::default();
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.state.read().clone()
    }

    pub fn find_cycles(&self) -> Vec<Cycle> {
        algo::find_cycles(&self.snapshot())
    }

    pub fn has_cycles(&self) -> bool {
        !self.find_cycles().is_empty()
    }
}

fn placeholder(id: &str) -> Node {
    Node::project(id, id, id)
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let snapshot = self.snapshot();
        let nodes: Vec<&Node> = snapshot.nodes().collect();
        let edges: Vec<&Edge> = snapshot.edges().collect();
        let mut s = serializer.serialize_struct("DependencyGraph", 2)?;
        s.serialize_field("nodes", &nodes)?;
        s.serialize_field("edges", &edges)?;
        s.end()
    }
}
