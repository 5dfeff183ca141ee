//! depgraph core: dependency graph model, version logic and graph algorithms

pub mod algo;
pub mod builder;
pub mod graph;
pub mod model;
pub mod records;
pub mod result;
pub mod version;


pub use algo::{
    depends_on, detect_package_version_conflicts, find_cycles, nodes_in_cycles, topological_sort,
    transitive_closure,
};
pub use builder::GraphBuilder;
pub use graph::{DependencyGraph, GraphSnapshot};
pub use model::{Cycle, Edge, EdgeKind, Node, PackageNode, ProjectNode};
pub use records::{PackageDependency, PackageVersionConflict, ProjectDependency, ProjectInfo};
pub use result::{AnalysisResult, SkippedProject};
pub use version::{
    Version, VersionError, VersionRange, compare_versions, is_valid_version, is_version_in_range,
    latest_version, parse_range, parse_version,
};
