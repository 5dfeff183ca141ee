//! Assembles dependency graphs from resolver records

use std::collections::HashMap;

use crate::graph::DependencyGraph;
use crate::model::{Edge, EdgeKind, Node, package_node_id};
use crate::records::{PackageDependency, ProjectDependency, ProjectInfo};

/// Incrementally builds a [`DependencyGraph`].
///
/// Project nodes registered through [`GraphBuilder::add_project`] keep their
/// full attributes; projects that only appear as the target of a reference
/// get a node built from the reference itself.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DependencyGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph of a single project: the project, the projects it references
    /// and the packages it pulls in.
    pub fn project_graph(
        info: &ProjectInfo,
        references: &[ProjectDependency],
        packages: &[PackageDependency],
    ) -> DependencyGraph {
        let mut builder = GraphBuilder::new();
        builder
            .add_project(info)
            .add_project_references(references)
            .add_package_dependencies(packages);
        builder.build()
    }

    /// Project-only graph of a solution from its project → references map.
    pub fn solution_graph(projects: &HashMap<String, Vec<ProjectDependency>>) -> DependencyGraph {
        let mut paths: Vec<&String> = projects.keys().collect();
        paths.sort();

        let mut builder = GraphBuilder::new();
        for path in paths {
            let references = &projects[path];
            let name = references
                .first()
                .map(|r| r.source_project_name.clone())
                .unwrap_or_else(|| display_name(path));
            builder.add_project(&ProjectInfo::new(path.as_str(), name, path.as_str()));
            builder.add_project_references(references);
        }
        builder.build()
    }

    pub fn add_project(&mut self, info: &ProjectInfo) -> &mut Self {
        self.graph
            .add_node(Node::project(&info.path, &info.name, &info.file_path));
        self
    }

    pub fn add_project_references(&mut self, references: &[ProjectDependency]) -> &mut Self {
        for reference in references {
            let source = Node::project(
                &reference.source_project_path,
                &reference.source_project_name,
                &reference.source_project_path,
            );
            let target = Node::project(
                &reference.target_project_path,
                &reference.target_project_name,
                &reference.target_project_path,
            );
            let edge = Edge::new(
                &reference.source_project_path,
                &reference.target_project_path,
                EdgeKind::ProjectReference,
            );
            self.graph.connect(source, target, edge);
        }
        self
    }

    pub fn add_package_dependencies(&mut self, packages: &[PackageDependency]) -> &mut Self {
        for package in packages {
            let source = Node::project(
                &package.project_path,
                &package.project_name,
                &package.project_path,
            );
            let target = Node::package(&package.package_id, &package.resolved_version);
            let kind = if package.is_transitive {
                EdgeKind::TransitiveDependency
            } else {
                EdgeKind::PackageReference
            };
            let edge = Edge::new(
                &package.project_path,
                package_node_id(&package.package_id, &package.resolved_version),
                kind,
            );
            self.graph.connect(source, target, edge);
        }
        self
    }

    pub fn build(self) -> DependencyGraph {
        tracing::debug!(
            "Built dependency graph: {} nodes, {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );
        self.graph
    }
}

/// Last path component without its extension, e.g. `Core` for
/// `/src/Core/Core.csproj`.
pub fn display_name(path: &str) -> String {
    let file = path
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(path: &str, name: &str) -> ProjectInfo {
        ProjectInfo::new(path, name, format!("{}/{}.csproj", path, name))
    }

    #[test]
    fn test_project_graph() {
        let app = info("/src/App", "App");
        let references = vec![ProjectDependency::new("/src/App", "/src/Core", "App", "Core")];
        let packages = vec![
            PackageDependency::direct("/src/App", "App", "Serilog", "3.1.1"),
            PackageDependency::direct("/src/App", "App", "Serilog.Sinks", "5.0.0").transitive(),
        ];

        let graph = GraphBuilder::project_graph(&app, &references, &packages);

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.project_nodes().len(), 2);
        assert_eq!(graph.package_nodes().len(), 2);

        // The registered project keeps its full attributes.
        match graph.node_by_id("/src/App") {
            Some(Node::Project(p)) => assert_eq!(p.file_path, "/src/App/App.csproj"),
            other => panic!("unexpected node: {:?}", other),
        }

        let kinds: Vec<EdgeKind> = graph
            .outgoing_edges("/src/App")
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EdgeKind::ProjectReference,
                EdgeKind::PackageReference,
                EdgeKind::TransitiveDependency
            ]
        );
    }

    #[test]
    fn test_package_nodes_are_keyed_by_resolved_version() {
        let packages = vec![
            PackageDependency::direct("/a", "A", "Polly", "7.0.0").resolved_to("7.2.4"),
        ];
        let graph = GraphBuilder::project_graph(&info("/a", "A"), &[], &packages);
        assert!(graph.contains("Polly:7.2.4"));
        assert!(!graph.contains("Polly:7.0.0"));
    }

    #[test]
    fn test_solution_graph() {
        let mut projects = HashMap::new();
        projects.insert(
            "/src/App".to_string(),
            vec![ProjectDependency::new("/src/App", "/src/Core", "App", "Core")],
        );
        projects.insert("/src/Core".to_string(), vec![]);

        let graph = GraphBuilder::solution_graph(&projects);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        let name = |id: &str| graph.node_by_id(id).map(|n| n.name().to_string());
        assert_eq!(name("/src/App").as_deref(), Some("App"));
        assert_eq!(name("/src/Core").as_deref(), Some("Core"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("/src/Core/Core.csproj"), "Core");
        assert_eq!(display_name("C:\\repo\\Web\\Web.fsproj"), "Web");
        assert_eq!(display_name("/src/Core/"), "Core");
        assert_eq!(display_name("plain"), "plain");
    }
}
