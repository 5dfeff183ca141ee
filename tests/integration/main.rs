//! Integration tests for depgraph
//!
//! These tests drive the CLI binary against manifests on disk and exercise
//! the library crates together.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use anyhow::anyhow;
use depgraph_analysis::{
    AnalysisOrchestrator, AnalyzerConfig, PackageDependencyResolver, ProjectReferenceResolver,
};
use depgraph_core::{PackageDependency, ProjectDependency, ProjectInfo};
use tempfile::TempDir;

const LAYERED: &str = r#"{
    "solutions": { "App.sln": ["src/App", "src/Core", "src/Util"] },
    "projects": {
        "src/App": {
            "name": "App",
            "references": ["src/Core"],
            "packages": [{ "id": "Newtonsoft.Json", "version": "13.0.3" }]
        },
        "src/Core": {
            "name": "Core",
            "references": ["src/Util"],
            "packages": [{ "id": "Newtonsoft.Json", "version": "12.0.3" }]
        },
        "src/Util": { "name": "Util" }
    }
}"#;

const CYCLIC: &str = r#"{
    "solutions": { "Loop.sln": ["A", "B", "C"] },
    "projects": {
        "A": { "references": ["B"] },
        "B": { "references": ["C"] },
        "C": { "references": ["A"] }
    }
}"#;

fn write_manifest(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("depgraph.json");
    std::fs::write(&path, content).unwrap();
    path
}

fn depgraph(args: &[&str], manifest: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_depgraph"))
        .args(args)
        .arg(manifest)
        .output()
        .expect("Failed to execute depgraph")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_depgraph"))
        .arg("--help")
        .output()
        .expect("Failed to execute depgraph");

    let text = stdout(&output);
    assert!(output.status.success());
    assert!(text.contains("Project and package dependency analysis"));
    for command in ["analyze", "project", "cycles", "conflicts", "order"] {
        assert!(text.contains(command), "missing subcommand {}", command);
    }
}

#[test]
fn test_analyze_json() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, LAYERED);

    let output = depgraph(&["--json", "analyze"], &manifest);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["graph"]["nodes"].as_array().unwrap().len(), 5);
    assert_eq!(result["cycles"].as_array().unwrap().len(), 0);
    assert_eq!(result["conflicts"][0]["package_id"], "Newtonsoft.Json");
    assert_eq!(result["graph"]["nodes"][0]["type"], "project");
}

#[test]
fn test_order() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, LAYERED);

    let output = depgraph(&["--json", "order"], &manifest);
    assert!(output.status.success());
    let order: Vec<String> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(order, vec!["src/Util", "src/Core", "src/App"]);
}

#[test]
fn test_cycles_and_order_on_cyclic_solution() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, CYCLIC);

    let output = depgraph(&["cycles"], &manifest);
    assert!(output.status.success());
    insta::assert_snapshot!(stdout(&output).trim(), @"A -> B -> C -> A");

    let output = depgraph(&["order"], &manifest);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("circular"));
}

#[test]
fn test_conflicts_text() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, LAYERED);

    let output = depgraph(&["conflicts", "--solution", "App.sln"], &manifest);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Newtonsoft.Json has 2 versions: 12.0.3, 13.0.3"));
    assert!(text.contains("used by App, Core"));
    assert!(text.contains("consider unifying on 13.0.3"));
}

#[test]
fn test_unknown_solution_fails() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, LAYERED);

    let output = depgraph(&["analyze", "--solution", "Other.sln"], &manifest);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Other.sln"));
}

#[test]
fn test_invalid_manifest_fails() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, "{ not json");

    let output = depgraph(&["analyze"], &manifest);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid manifest"));
}

/// Resolver whose projects form a wide fan-in onto one shared library.
struct FanIn {
    width: usize,
}

impl FanIn {
    fn path(i: usize) -> String {
        format!("/src/P{}", i)
    }
}

impl ProjectReferenceResolver for FanIn {
    fn project_info(&self, project_path: &str) -> anyhow::Result<ProjectInfo> {
        let name = project_path.trim_start_matches("/src/");
        Ok(ProjectInfo::new(project_path, name, project_path))
    }

    fn project_references(&self, project_path: &str) -> anyhow::Result<Vec<ProjectDependency>> {
        if project_path == "/src/Shared" {
            return Ok(vec![]);
        }
        let name = project_path.trim_start_matches("/src/");
        Ok(vec![ProjectDependency::new(project_path, "/src/Shared", name, "Shared")])
    }

    fn solution_projects(
        &self,
        solution_path: &str,
    ) -> anyhow::Result<HashMap<String, Vec<ProjectDependency>>> {
        if solution_path != "/Fan.sln" {
            return Err(anyhow!("unknown solution {}", solution_path));
        }
        let mut projects: HashMap<String, Vec<ProjectDependency>> = (0..self.width)
            .map(|i| (Self::path(i), self.project_references(&Self::path(i)).unwrap_or_default()))
            .collect();
        projects.insert("/src/Shared".to_string(), vec![]);
        Ok(projects)
    }
}

impl PackageDependencyResolver for FanIn {
    fn package_dependencies(&self, project_path: &str) -> anyhow::Result<Vec<PackageDependency>> {
        let name = project_path.trim_start_matches("/src/");
        // Even and odd projects disagree on the logging package version.
        let version = if name.ends_with(|c: char| c.is_ascii_digit() && (c as u8) % 2 == 0) {
            "3.1.1"
        } else {
            "2.12.0"
        };
        Ok(vec![PackageDependency::direct(project_path, name, "Serilog", version)])
    }
}

#[tokio::test]
async fn test_parallel_solution_analysis() {
    let resolver = Arc::new(FanIn { width: 40 });
    let config = AnalyzerConfig::default().with_worker_threads(8);
    let orchestrator =
        Arc::new(AnalysisOrchestrator::new(resolver.clone(), resolver.clone(), config).unwrap());

    let result = Arc::clone(&orchestrator)
        .analyze_solution_async("/Fan.sln")
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.skipped.is_empty());
    // 41 projects, 2 Serilog versions
    assert_eq!(result.graph.project_nodes().len(), 41);
    assert_eq!(result.graph.package_nodes().len(), 2);
    assert_eq!(result.project_dependencies.len(), 40);
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].highest_version().as_deref(), Some("3.1.1"));

    let order = result.build_order.as_ref().unwrap();
    let shared = order.iter().position(|id| id == "/src/Shared").unwrap();
    for i in 0..40 {
        let project = order.iter().position(|id| *id == FanIn::path(i)).unwrap();
        assert!(shared < project);
    }

    // The merged graph does not depend on scheduling.
    orchestrator.clear_cache();
    let again = orchestrator.analyze_solution("/Fan.sln");
    assert_eq!(again.graph.node_count(), result.graph.node_count());
    assert_eq!(again.graph.edge_count(), result.graph.edge_count());
    assert_eq!(again.build_order, result.build_order);
}
