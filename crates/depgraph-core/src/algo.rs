//! Stateless graph algorithms: cycle enumeration, topological sort,
//! transitive closure and package version conflict detection.
//!
//! Everything here runs on a [`GraphSnapshot`], never on the locked graph.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::stable_graph::NodeIndex;

use crate::graph::GraphSnapshot;
use crate::model::{Cycle, Edge, Node};
use crate::records::{PackageDependency, PackageVersionConflict};

/// Enumerate the cycles reachable by depth-first search.
///
/// Each node is used as a DFS root at most once. Cycles found from different
/// entry points are canonicalized and deduplicated; the result is ordered
/// longest first.
pub fn find_cycles(snapshot: &GraphSnapshot) -> Vec<Cycle> {
    let mut search = CycleSearch {
        snapshot,
        visited: HashSet::new(),
        path: Vec::new(),
        positions: HashMap::new(),
        path_edges: Vec::new(),
        seen: HashSet::new(),
        cycles: Vec::new(),
    };

    for root in snapshot.node_indices() {
        if !search.visited.contains(&root) {
            search.visit(root);
        }
    }

    let mut cycles = search.cycles;
    cycles.sort_by(|a, b| b.len().cmp(&a.len()));
    cycles
}

struct CycleSearch<'a> {
    snapshot: &'a GraphSnapshot,
    visited: HashSet<NodeIndex>,
    path: Vec<NodeIndex>,
    /// Position of each on-path node within `path`.
    positions: HashMap<NodeIndex, usize>,
    /// `path_edges[i]` leads from `path[i]` to `path[i + 1]`.
    path_edges: Vec<&'a Edge>,
    seen: HashSet<String>,
    cycles: Vec<Cycle>,
}

impl<'a> CycleSearch<'a> {
    fn visit(&mut self, node: NodeIndex) {
        self.visited.insert(node);
        self.positions.insert(node, self.path.len());
        self.path.push(node);

        let snapshot = self.snapshot;
        for (target, edge) in snapshot.outgoing(node) {
            if let Some(&start) = self.positions.get(&target) {
                self.record(start, edge);
            } else if !self.visited.contains(&target) {
                self.path_edges.push(edge);
                self.visit(target);
                self.path_edges.pop();
            }
        }

        self.path.pop();
        self.positions.remove(&node);
    }

    fn record(&mut self, start: usize, closing: &'a Edge) {
        let mut nodes: Vec<Node> = self.path[start..]
            .iter()
            .filter_map(|&idx| self.snapshot.node(idx).cloned())
            .collect();
        let mut edges: Vec<Edge> = self.path_edges[start..].iter().map(|&e| e.clone()).collect();
        edges.push(closing.clone());

        // Rotate so the smallest id comes first; edges rotate with their source.
        if let Some(first) = nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.id().cmp(b.id()))
            .map(|(i, _)| i)
        {
            nodes.rotate_left(first);
            edges.rotate_left(first);
        }

        let cycle = Cycle::new(nodes, edges);
        if self.seen.insert(cycle.canonical_key()) {
            tracing::debug!("Found dependency cycle: {}", cycle.description());
            self.cycles.push(cycle);
        }
    }
}

/// Order nodes so every dependency precedes its dependents.
///
/// Returns `None` when the graph contains a cycle.
pub fn topological_sort(snapshot: &GraphSnapshot) -> Option<Vec<Node>> {
    fn visit(
        snapshot: &GraphSnapshot,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_stack: &mut HashSet<NodeIndex>,
        order: &mut Vec<NodeIndex>,
    ) -> bool {
        visited.insert(node);
        on_stack.insert(node);

        for (target, _) in snapshot.outgoing(node) {
            if on_stack.contains(&target) {
                return false;
            }
            if !visited.contains(&target) && !visit(snapshot, target, visited, on_stack, order) {
                return false;
            }
        }

        on_stack.remove(&node);
        order.push(node);
        true
    }

    let mut visited = HashSet::new();
    let mut on_stack = HashSet::new();
    let mut order = Vec::with_capacity(snapshot.node_count());

    for root in snapshot.node_indices() {
        if !visited.contains(&root)
            && !visit(snapshot, root, &mut visited, &mut on_stack, &mut order)
        {
            return None;
        }
    }

    // Post-order already lists dependencies before their dependents, since
    // edges point from dependent to dependency.
    Some(
        order
            .into_iter()
            .filter_map(|idx| snapshot.node(idx).cloned())
            .collect(),
    )
}

/// Reachability set for every node, keyed by node id.
///
/// A node appears in its own set only if it lies on a cycle.
pub fn transitive_closure(snapshot: &GraphSnapshot) -> HashMap<String, HashSet<String>> {
    let mut closure = HashMap::with_capacity(snapshot.node_count());

    for root in snapshot.node_indices() {
        let Some(root_node) = snapshot.node(root) else {
            continue;
        };

        let mut reached: HashSet<NodeIndex> = HashSet::new();
        let mut stack: Vec<NodeIndex> =
            snapshot.outgoing(root).into_iter().map(|(t, _)| t).collect();
        while let Some(current) = stack.pop() {
            if !reached.insert(current) {
                continue;
            }
            stack.extend(
                snapshot
                    .outgoing(current)
                    .into_iter()
                    .map(|(t, _)| t)
                    .filter(|t| !reached.contains(t)),
            );
        }

        let ids = reached
            .into_iter()
            .filter_map(|idx| snapshot.node(idx).map(|n| n.id().to_string()))
            .collect();
        closure.insert(root_node.id().to_string(), ids);
    }

    closure
}

/// Whether `from` depends on `to` through any path.
pub fn depends_on(closure: &HashMap<String, HashSet<String>>, from: &str, to: &str) -> bool {
    closure.get(from).is_some_and(|reachable| reachable.contains(to))
}

/// Ids of every node that takes part in at least one cycle.
pub fn nodes_in_cycles(cycles: &[Cycle]) -> HashSet<String> {
    cycles
        .iter()
        .flat_map(|c| c.nodes.iter().map(|n| n.id().to_string()))
        .collect()
}

/// Group package references by id and report every package resolved to more
/// than one version. Conflicts are ordered by package id.
pub fn detect_package_version_conflicts(
    dependencies: &[PackageDependency],
) -> Vec<PackageVersionConflict> {
    let mut by_package: BTreeMap<&str, BTreeMap<&str, Vec<&PackageDependency>>> = BTreeMap::new();

    for dep in dependencies {
        by_package
            .entry(dep.package_id.as_str())
            .or_default()
            .entry(dep.resolved_version.as_str())
            .or_default()
            .push(dep);
    }

    by_package
        .into_iter()
        .filter(|(_, versions)| versions.len() > 1)
        .map(|(package_id, versions)| {
            let mut seen = HashSet::new();
            let dependencies = versions
                .values()
                .flatten()
                .filter(|dep| seen.insert(**dep))
                .map(|dep| (*dep).clone())
                .collect();

            PackageVersionConflict {
                package_id: package_id.to_string(),
                versions: versions.keys().map(|v| v.to_string()).collect(),
                dependencies,
            }
        })
        .collect()
}
