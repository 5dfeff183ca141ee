//! JSON manifest resolver
//!
//! A manifest describes solutions, projects, their references and their
//! resolved packages:
//!
//! ```json
//! {
//!   "solutions": { "App.sln": ["src/App", "src/Core"] },
//!   "projects": {
//!     "src/App": {
//!       "name": "App",
//!       "references": ["src/Core"],
//!       "packages": [{ "id": "Newtonsoft.Json", "version": "13.0.3" }]
//!     },
//!     "src/Core": {}
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use depgraph_analysis::{PackageDependencyResolver, ProjectReferenceResolver};
use depgraph_core::builder::display_name;
use depgraph_core::{PackageDependency, ProjectDependency, ProjectInfo, is_valid_version};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub solutions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectEntry {
    pub name: Option<String>,
    pub file: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageEntry {
    pub id: String,
    pub version: String,
    /// Defaults to `version`.
    pub resolved: Option<String>,
    #[serde(default)]
    pub transitive: bool,
}

/// Serves both resolver traits from a parsed [`Manifest`].
#[derive(Debug)]
pub struct ManifestResolver {
    manifest: Manifest,
}

impl ManifestResolver {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(content)?;
        Ok(ManifestResolver { manifest })
    }

    /// The solution named on the command line, or the only one in the
    /// manifest when none was named.
    pub fn pick_solution(&self, requested: Option<&str>) -> Result<String> {
        if let Some(name) = requested {
            return Ok(name.to_string());
        }
        let mut names = self.manifest.solutions.keys();
        match (names.next(), names.next()) {
            (Some(only), None) => Ok(only.clone()),
            (None, _) => bail!("manifest declares no solutions"),
            (Some(_), Some(_)) => {
                let all: Vec<&str> = self.manifest.solutions.keys().map(String::as_str).collect();
                bail!(
                    "manifest declares several solutions, pick one with --solution: {}",
                    all.join(", ")
                )
            }
        }
    }

    fn entry(&self, project_path: &str) -> Result<&ProjectEntry> {
        self.manifest
            .projects
            .get(project_path)
            .ok_or_else(|| anyhow!("project {} is not declared in the manifest", project_path))
    }

    fn name_of(&self, project_path: &str) -> String {
        self.manifest
            .projects
            .get(project_path)
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| display_name(project_path))
    }

    fn references_of(&self, project_path: &str, entry: &ProjectEntry) -> Vec<ProjectDependency> {
        let source_name = self.name_of(project_path);
        entry
            .references
            .iter()
            .map(|target| {
                ProjectDependency::new(
                    project_path,
                    target.as_str(),
                    source_name.clone(),
                    self.name_of(target),
                )
            })
            .collect()
    }
}

impl ProjectReferenceResolver for ManifestResolver {
    fn project_info(&self, project_path: &str) -> Result<ProjectInfo> {
        let entry = self.entry(project_path)?;
        let name = self.name_of(project_path);
        let file_path = entry.file.clone().unwrap_or_else(|| project_path.to_string());
        Ok(ProjectInfo::new(project_path, name, file_path))
    }

    fn project_references(&self, project_path: &str) -> Result<Vec<ProjectDependency>> {
        let entry = self.entry(project_path)?;
        Ok(self.references_of(project_path, entry))
    }

    fn solution_projects(
        &self,
        solution_path: &str,
    ) -> Result<HashMap<String, Vec<ProjectDependency>>> {
        let projects = self
            .manifest
            .solutions
            .get(solution_path)
            .ok_or_else(|| anyhow!("solution {} is not declared in the manifest", solution_path))?;

        Ok(projects
            .iter()
            .map(|path| {
                let references = self
                    .manifest
                    .projects
                    .get(path)
                    .map(|entry| self.references_of(path, entry))
                    .unwrap_or_default();
                (path.clone(), references)
            })
            .collect())
    }
}

impl PackageDependencyResolver for ManifestResolver {
    fn package_dependencies(&self, project_path: &str) -> Result<Vec<PackageDependency>> {
        let entry = self.entry(project_path)?;
        let project_name = self.name_of(project_path);

        entry
            .packages
            .iter()
            .map(|package| {
                if package.id.trim().is_empty() {
                    bail!("package with an empty id in {}", project_path);
                }
                let resolved = package.resolved.as_deref().unwrap_or(&package.version);
                if !is_valid_version(resolved) {
                    tracing::debug!("Unparsable resolved version {} of {}", resolved, package.id);
                }
                let mut dependency = PackageDependency::direct(
                    project_path,
                    project_name.as_str(),
                    package.id.as_str(),
                    package.version.as_str(),
                )
                .resolved_to(resolved);
                if package.transitive {
                    dependency = dependency.transitive();
                }
                Ok(dependency)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "solutions": { "App.sln": ["src/App", "src/Core"] },
        "projects": {
            "src/App": {
                "name": "App",
                "file": "src/App/App.csproj",
                "references": ["src/Core"],
                "packages": [
                    { "id": "Newtonsoft.Json", "version": "13.0.1", "resolved": "13.0.3" },
                    { "id": "System.Memory", "version": "4.5.5", "transitive": true }
                ]
            },
            "src/Core": {}
        }
    }"#;

    #[test]
    fn test_project_lookups() {
        let resolver = ManifestResolver::from_json(MANIFEST).unwrap();

        let info = resolver.project_info("src/App").unwrap();
        assert_eq!(info.name, "App");
        assert_eq!(info.file_path, "src/App/App.csproj");

        let core = resolver.project_info("src/Core").unwrap();
        assert_eq!(core.name, "Core");
        assert_eq!(core.file_path, "src/Core");

        let references = resolver.project_references("src/App").unwrap();
        assert_eq!(references, vec![ProjectDependency::new("src/App", "src/Core", "App", "Core")]);

        assert!(resolver.project_info("src/Missing").is_err());
    }

    #[test]
    fn test_packages() {
        let resolver = ManifestResolver::from_json(MANIFEST).unwrap();
        let packages = resolver.package_dependencies("src/App").unwrap();

        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].requested_version, "13.0.1");
        assert_eq!(packages[0].resolved_version, "13.0.3");
        assert!(!packages[0].is_transitive);
        assert_eq!(packages[1].resolved_version, "4.5.5");
        assert!(packages[1].is_transitive);
    }

    #[test]
    fn test_solution_projects() {
        let resolver = ManifestResolver::from_json(MANIFEST).unwrap();
        let projects = resolver.solution_projects("App.sln").unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects["src/App"].len(), 1);
        assert!(projects["src/Core"].is_empty());
        assert!(resolver.solution_projects("Other.sln").is_err());
    }

    #[test]
    fn test_pick_solution() {
        let resolver = ManifestResolver::from_json(MANIFEST).unwrap();
        assert_eq!(resolver.pick_solution(None).unwrap(), "App.sln");
        assert_eq!(resolver.pick_solution(Some("X.sln")).unwrap(), "X.sln");

        let empty = ManifestResolver::from_json("{}").unwrap();
        assert!(empty.pick_solution(None).is_err());

        let two = ManifestResolver::from_json(r#"{"solutions": {"a": [], "b": []}}"#).unwrap();
        let err = two.pick_solution(None).unwrap_err();
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(ManifestResolver::from_json(r#"{"projekts": {}}"#).is_err());
    }
}
