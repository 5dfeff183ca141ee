//! Plain records handed to the core by project and package resolvers

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::version;

/// Basic identity of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Absolute project path; the project node identity.
    pub path: String,
    pub name: String,
    /// Path of the project file itself.
    pub file_path: String,
}

impl ProjectInfo {
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        ProjectInfo {
            path: path.into(),
            name: name.into(),
            file_path: file_path.into(),
        }
    }
}

/// A project-to-project reference. Identity is `(source, target)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDependency {
    pub source_project_path: String,
    pub target_project_path: String,
    pub source_project_name: String,
    pub target_project_name: String,
}

impl ProjectDependency {
    pub fn new(
        source_project_path: impl Into<String>,
        target_project_path: impl Into<String>,
        source_project_name: impl Into<String>,
        target_project_name: impl Into<String>,
    ) -> Self {
        ProjectDependency {
            source_project_path: source_project_path.into(),
            target_project_path: target_project_path.into(),
            source_project_name: source_project_name.into(),
            target_project_name: target_project_name.into(),
        }
    }
}

impl PartialEq for ProjectDependency {
    fn eq(&self, other: &Self) -> bool {
        self.source_project_path == other.source_project_path
            && self.target_project_path == other.target_project_path
    }
}

impl Eq for ProjectDependency {}

impl Hash for ProjectDependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source_project_path.hash(state);
        self.target_project_path.hash(state);
    }
}

/// A package pulled in by a project, directly or transitively.
///
/// Identity is `(project_path, package_id, resolved_version)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDependency {
    pub project_path: String,
    pub project_name: String,
    pub package_id: String,
    pub requested_version: String,
    pub is_transitive: bool,
    pub resolved_version: String,
}

impl PackageDependency {
    /// A direct reference whose resolved version equals the requested one.
    pub fn direct(
        project_path: impl Into<String>,
        project_name: impl Into<String>,
        package_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let version = version.into();
        PackageDependency {
            project_path: project_path.into(),
            project_name: project_name.into(),
            package_id: package_id.into(),
            requested_version: version.clone(),
            is_transitive: false,
            resolved_version: version,
        }
    }

    pub fn transitive(mut self) -> Self {
        self.is_transitive = true;
        self
    }

    pub fn resolved_to(mut self, version: impl Into<String>) -> Self {
        self.resolved_version = version.into();
        self
    }
}

impl PartialEq for PackageDependency {
    fn eq(&self, other: &Self) -> bool {
        self.project_path == other.project_path
            && self.package_id == other.package_id
            && self.resolved_version == other.resolved_version
    }
}

impl Eq for PackageDependency {}

impl Hash for PackageDependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.project_path.hash(state);
        self.package_id.hash(state);
        self.resolved_version.hash(state);
    }
}

/// Several resolved versions of one package across the analyzed scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageVersionConflict {
    pub package_id: String,
    pub versions: BTreeSet<String>,
    pub dependencies: Vec<PackageDependency>,
}

impl PackageVersionConflict {
    /// Greatest of the conflicting versions. Advisory only; unparsable
    /// versions are ignored.
    pub fn highest_version(&self) -> Option<String> {
        let valid: Vec<&str> = self
            .versions
            .iter()
            .map(String::as_str)
            .filter(|v| version::is_valid_version(v))
            .collect();
        version::latest_version(&valid).ok()
    }

    /// Names of the projects contributing to the conflict.
    pub fn projects(&self) -> BTreeSet<&str> {
        self.dependencies.iter().map(|d| d.project_name.as_str()).collect()
    }

    pub fn description(&self) -> String {
        let versions: Vec<&str> = self.versions.iter().map(String::as_str).collect();
        format!("{} has {} versions: {}", self.package_id, versions.len(), versions.join(", "))
    }
}
