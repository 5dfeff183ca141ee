//! Aggregate output of one analysis call

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::algo;
use crate::graph::DependencyGraph;
use crate::model::{Cycle, Node};
use crate::records::{PackageDependency, PackageVersionConflict, ProjectDependency};

/// A project left out of a solution analysis because its own analysis failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedProject {
    pub path: String,
    pub reason: String,
}

/// The result of analyzing a project or a solution.
///
/// A failed result (`success == false`) carries an error message and empty
/// collections. Results are never mutated once produced; the cache shares
/// them read-only.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub graph: DependencyGraph,
    pub project_dependencies: Vec<ProjectDependency>,
    pub package_dependencies: Vec<PackageDependency>,
    pub cycles: Vec<Cycle>,
    pub conflicts: Vec<PackageVersionConflict>,
    /// Node ids, dependencies first. `None` when the graph has cycles.
    pub build_order: Option<Vec<String>>,
    pub skipped: Vec<SkippedProject>,
    pub success: bool,
    pub error_message: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Run cycle, ordering and conflict detection over analyzed data.
    pub fn analyzed(
        graph: DependencyGraph,
        project_dependencies: Vec<ProjectDependency>,
        package_dependencies: Vec<PackageDependency>,
    ) -> Self {
        let snapshot = graph.snapshot();
        let cycles = algo::find_cycles(&snapshot);
        let build_order = algo::topological_sort(&snapshot)
            .map(|nodes| nodes.iter().map(|n| n.id().to_string()).collect());
        let conflicts = algo::detect_package_version_conflicts(&package_dependencies);

        AnalysisResult {
            graph,
            project_dependencies,
            package_dependencies,
            cycles,
            conflicts,
            build_order,
            skipped: Vec::new(),
            success: true,
            error_message: None,
            analyzed_at: Utc::now(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        AnalysisResult {
            graph: DependencyGraph::new(),
            project_dependencies: Vec::new(),
            package_dependencies: Vec::new(),
            cycles: Vec::new(),
            conflicts: Vec::new(),
            build_order: None,
            skipped: Vec::new(),
            success: false,
            error_message: Some(message.into()),
            analyzed_at: Utc::now(),
        }
    }

    pub fn with_skipped(mut self, skipped: Vec<SkippedProject>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Build order resolved to nodes of the result graph.
    pub fn build_order_nodes(&self) -> Option<Vec<Node>> {
        let order = self.build_order.as_ref()?;
        Some(order.iter().filter_map(|id| self.graph.node_by_id(id)).collect())
    }
}
