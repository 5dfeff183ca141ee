//! Core data structures for the dependency graph

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A project vertex. Identity is the absolute project path.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectNode {
    pub path: String,
    pub name: String,
    pub file_path: String,
}

/// A package vertex. Identity is `package_id:version`.
#[derive(Debug, Clone, Serialize)]
pub struct PackageNode {
    id: String,
    pub package_id: String,
    pub version: String,
    pub name: String,
}

impl PackageNode {
    pub fn new(package_id: impl Into<String>, version: impl Into<String>) -> Self {
        let package_id = package_id.into();
        let version = version.into();
        PackageNode {
            id: package_node_id(&package_id, &version),
            name: package_id.clone(),
            package_id,
            version,
        }
    }
}

/// Build the identity string of a package node.
pub fn package_node_id(package_id: &str, version: &str) -> String {
    format!("{}:{}", package_id, version)
}

/// A vertex in the dependency graph.
///
/// Equality and hashing only look at [`Node::id`]; two nodes with the same
/// identity are the same node regardless of their other attributes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Project(ProjectNode),
    Package(PackageNode),
}

impl Node {
    pub fn project(
        path: impl Into<String>,
        name: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Node::Project(ProjectNode {
            path: path.into(),
            name: name.into(),
            file_path: file_path.into(),
        })
    }

    pub fn package(package_id: impl Into<String>, version: impl Into<String>) -> Self {
        Node::Package(PackageNode::new(package_id, version))
    }

    /// Stable identity of this node.
    pub fn id(&self) -> &str {
        match self {
            Node::Project(p) => &p.path,
            Node::Package(p) => &p.id,
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        match self {
            Node::Project(p) => &p.name,
            Node::Package(p) => &p.name,
        }
    }

    pub fn is_project(&self) -> bool {
        matches!(self, Node::Project(_))
    }

    pub fn is_package(&self) -> bool {
        matches!(self, Node::Package(_))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Project(p) => write!(f, "{}", p.name),
            Node::Package(p) => write!(f, "{} {}", p.package_id, p.version),
        }
    }
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    ProjectReference,
    PackageReference,
    TransitiveDependency,
    Other,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProjectReference => write!(f, "project-reference"),
            Self::PackageReference => write!(f, "package-reference"),
            Self::TransitiveDependency => write!(f, "transitive-dependency"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A directed edge from a dependent node to its dependency.
///
/// Identity is `(source, target)`; the kind is not part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Edge {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.target == other.target
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.target.hash(state);
    }
}

/// A closed path of nodes.
///
/// `nodes` holds each node of the cycle once, in traversal order; the path
/// closes from the last node back to the first. `edges[i]` leads from
/// `nodes[i]` to `nodes[(i + 1) % len]`.
#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Cycle {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Cycle { nodes, edges }
    }

    /// Number of distinct nodes in the cycle.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rotation-invariant key: node ids starting from the smallest one.
    pub fn canonical_key(&self) -> String {
        let ids: Vec<&str> = self.nodes.iter().map(Node::id).collect();
        canonical_key(&ids)
    }

    /// Formatted path, e.g. `A -> B -> C -> A`.
    pub fn description(&self) -> String {
        let mut parts: Vec<String> = self.nodes.iter().map(|n| n.name().to_string()).collect();
        if let Some(first) = self.nodes.first() {
            parts.push(first.name().to_string());
        }
        parts.join(" -> ")
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id() == id)
    }
}

/// Rotate a node-id sequence so it starts at its smallest id and join it.
pub fn canonical_key<S: AsRef<str>>(ids: &[S]) -> String {
    let Some(start) = ids
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.as_ref().cmp(b.as_ref()))
        .map(|(i, _)| i)
    else {
        return String::new();
    };

    ids[start..]
        .iter()
        .chain(ids[..start].iter())
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("->")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_node_identity_ignores_attributes() {
        let a = Node::project("/src/App/App.csproj", "App", "/src/App/App.csproj");
        let b = Node::project("/src/App/App.csproj", "Renamed", "elsewhere");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_package_node_id() {
        let node = Node::package("Newtonsoft.Json", "13.0.3");
        assert_eq!(node.id(), "Newtonsoft.Json:13.0.3");
        assert_eq!(node.name(), "Newtonsoft.Json");
        assert!(node.is_package());
        assert_eq!(node.to_string(), "Newtonsoft.Json 13.0.3");
    }

    #[test]
    fn test_edge_identity_ignores_kind() {
        let a = Edge::new("a", "b", EdgeKind::ProjectReference);
        let b = Edge::new("a", "b", EdgeKind::TransitiveDependency);
        let c = Edge::new("b", "a", EdgeKind::ProjectReference);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_canonical_key_rotation_invariant() {
        let ids = ["c", "a", "b"];
        let expected = canonical_key(&ids);
        assert_eq!(expected, "a->b->c");

        for shift in 0..ids.len() {
            let rotated: Vec<&str> =
                ids[shift..].iter().chain(ids[..shift].iter()).copied().collect();
            assert_eq!(canonical_key(&rotated), expected);
        }
    }

    #[test]
    fn test_canonical_key_empty() {
        let ids: [&str; 0] = [];
        assert_eq!(canonical_key(&ids), "");
    }

    #[test]
    fn test_cycle_description() {
        let cycle = Cycle::new(
            vec![Node::project("/a", "A", "/a"), Node::project("/b", "B", "/b")],
            vec![
                Edge::new("/a", "/b", EdgeKind::ProjectReference),
                Edge::new("/b", "/a", EdgeKind::ProjectReference),
            ],
        );
        insta::assert_snapshot!(cycle.description(), @"A -> B -> A");
        assert_eq!(cycle.len(), 2);
        assert!(cycle.contains("/b"));
    }

    #[test]
    fn test_edge_kind_display() {
        assert_eq!(EdgeKind::ProjectReference.to_string(), "project-reference");
        assert_eq!(EdgeKind::TransitiveDependency.to_string(), "transitive-dependency");
    }
}
