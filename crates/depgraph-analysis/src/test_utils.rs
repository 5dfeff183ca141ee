//! Test utilities for depgraph-analysis

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use depgraph_core::builder::display_name;
use depgraph_core::{PackageDependency, ProjectDependency, ProjectInfo};
use tempfile::TempDir;

use crate::config::AnalyzerConfig;
use crate::orchestrator::AnalysisOrchestrator;
use crate::resolver::{PackageDependencyResolver, ProjectReferenceResolver};

/// In-memory resolver serving both resolver traits.
///
/// Project names default to the last path segment. Projects marked with
/// [`StaticResolver::failing`] error out of every lookup.
#[derive(Debug, Default)]
pub struct StaticResolver {
    names: HashMap<String, String>,
    references: HashMap<String, Vec<ProjectDependency>>,
    packages: HashMap<String, Vec<PackageDependency>>,
    solutions: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    delay: Duration,
    info_calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, path: &str, name: &str) -> Self {
        self.names.insert(path.to_string(), name.to_string());
        self
    }

    pub fn reference(mut self, from: &str, to: &str) -> Self {
        let dependency = ProjectDependency::new(from, to, self.name_of(from), self.name_of(to));
        self.references.entry(from.to_string()).or_default().push(dependency);
        self
    }

    pub fn package(mut self, path: &str, package_id: &str, version: &str) -> Self {
        let dependency = PackageDependency::direct(path, self.name_of(path), package_id, version);
        self.packages.entry(path.to_string()).or_default().push(dependency);
        self
    }

    pub fn transitive_package(mut self, path: &str, package_id: &str, version: &str) -> Self {
        let dependency =
            PackageDependency::direct(path, self.name_of(path), package_id, version).transitive();
        self.packages.entry(path.to_string()).or_default().push(dependency);
        self
    }

    pub fn solution(mut self, path: &str, projects: &[&str]) -> Self {
        self.solutions
            .insert(path.to_string(), projects.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    /// Make every project info lookup take at least `delay`.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// How many times project info was resolved, i.e. projects actually analyzed.
    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    fn name_of(&self, path: &str) -> String {
        self.names
            .get(path)
            .cloned()
            .unwrap_or_else(|| display_name(path))
    }

    fn check(&self, path: &str) -> Result<()> {
        if self.failing.contains(path) {
            bail!("project file {} is malformed", path);
        }
        Ok(())
    }
}

impl ProjectReferenceResolver for StaticResolver {
    fn project_info(&self, project_path: &str) -> Result<ProjectInfo> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.check(project_path)?;
        let name = self.name_of(project_path);
        let file_path = format!("{}/{}.csproj", project_path, name);
        Ok(ProjectInfo::new(project_path, name, file_path))
    }

    fn project_references(&self, project_path: &str) -> Result<Vec<ProjectDependency>> {
        self.check(project_path)?;
        Ok(self.references.get(project_path).cloned().unwrap_or_default())
    }

    fn solution_projects(
        &self,
        solution_path: &str,
    ) -> Result<HashMap<String, Vec<ProjectDependency>>> {
        let projects = self
            .solutions
            .get(solution_path)
            .ok_or_else(|| anyhow!("solution {} not found", solution_path))?;
        Ok(projects
            .iter()
            .map(|p| (p.clone(), self.references.get(p).cloned().unwrap_or_default()))
            .collect())
    }
}

impl PackageDependencyResolver for StaticResolver {
    fn package_dependencies(&self, project_path: &str) -> Result<Vec<PackageDependency>> {
        self.check(project_path)?;
        Ok(self.packages.get(project_path).cloned().unwrap_or_default())
    }
}

/// Orchestrator over `resolver` with a small worker pool.
pub fn orchestrator(resolver: &Arc<StaticResolver>) -> AnalysisOrchestrator {
    let config = AnalyzerConfig::default().with_worker_threads(4);
    AnalysisOrchestrator::new(resolver.clone(), resolver.clone(), config).unwrap()
}

/// The classic layered solution: App -> Core -> Util, with a Newtonsoft.Json
/// version split between App and Core.
pub fn layered_solution() -> StaticResolver {
    StaticResolver::new()
        .project("/src/App", "App")
        .project("/src/Core", "Core")
        .project("/src/Util", "Util")
        .reference("/src/App", "/src/Core")
        .reference("/src/Core", "/src/Util")
        .package("/src/App", "Newtonsoft.Json", "13.0.3")
        .package("/src/Core", "Newtonsoft.Json", "12.0.3")
        .package("/src/Util", "Serilog", "3.1.1")
        .solution("/src/App.sln", &["/src/App", "/src/Core", "/src/Util"])
}

/// Create project directories with a project file each, on disk.
pub fn create_project_dirs(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
    let temp_dir = TempDir::new().unwrap();
    let dirs = names
        .iter()
        .map(|name| {
            let dir = temp_dir.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join(format!("{}.csproj", name)),
                "<Project Sdk=\"Microsoft.NET.Sdk\"></Project>\n",
            )
            .unwrap();
            dir
        })
        .collect();
    (temp_dir, dirs)
}
