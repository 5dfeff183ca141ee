//! Collaborators that turn on-disk projects into records
//!
//! The analysis engine never reads project or solution files itself; it asks
//! these resolvers. Implementations are shared across worker threads.

use std::collections::HashMap;

use anyhow::Result;
use depgraph_core::{PackageDependency, ProjectDependency, ProjectInfo};

/// Resolves project identity and project-to-project references.
pub trait ProjectReferenceResolver: Send + Sync {
    /// Name and project-file path of a project.
    fn project_info(&self, project_path: &str) -> Result<ProjectInfo>;

    /// Direct project references of one project.
    fn project_references(&self, project_path: &str) -> Result<Vec<ProjectDependency>>;

    /// Every project of a solution mapped to its direct project references.
    fn solution_projects(
        &self,
        solution_path: &str,
    ) -> Result<HashMap<String, Vec<ProjectDependency>>>;
}

/// Resolves the packages a project pulls in.
pub trait PackageDependencyResolver: Send + Sync {
    /// Direct and transitive package dependencies of one project.
    fn package_dependencies(&self, project_path: &str) -> Result<Vec<PackageDependency>>;
}
