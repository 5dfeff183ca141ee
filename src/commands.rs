//! CLI command implementations

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use depgraph_analysis::{AnalysisOrchestrator, AnalyzerConfig};
use depgraph_core::AnalysisResult;
use serde::Serialize;

use crate::manifest::ManifestResolver;

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct Options {
    pub json: bool,
    pub cache_ttl_secs: u64,
    pub workers: Option<usize>,
    pub timeout_secs: u64,
}

impl Options {
    fn config(&self) -> AnalyzerConfig {
        let config =
            AnalyzerConfig::default().with_cache_ttl(Duration::from_secs(self.cache_ttl_secs));
        match self.workers {
            Some(workers) => config.with_worker_threads(workers),
            None => config,
        }
    }
}

struct Session {
    orchestrator: Arc<AnalysisOrchestrator>,
    resolver: Arc<ManifestResolver>,
    timeout: Duration,
}

impl Session {
    fn open(options: &Options, manifest: &Path) -> anyhow::Result<Self> {
        let resolver = Arc::new(ManifestResolver::load(manifest)?);
        let orchestrator =
            AnalysisOrchestrator::new(resolver.clone(), resolver.clone(), options.config())?;
        tracing::debug!("Orchestrator ready: {:?}", orchestrator);
        Ok(Session {
            orchestrator: Arc::new(orchestrator),
            resolver,
            timeout: Duration::from_secs(options.timeout_secs),
        })
    }

    async fn solution(&self, requested: Option<String>) -> anyhow::Result<Arc<AnalysisResult>> {
        let solution = self.resolver.pick_solution(requested.as_deref())?;
        let task = Arc::clone(&self.orchestrator).analyze_solution_async(solution.clone());
        let result = self.bounded(&solution, task).await?;
        ensure_success(&solution, result)
    }

    async fn project(&self, project: String) -> anyhow::Result<Arc<AnalysisResult>> {
        let task = Arc::clone(&self.orchestrator).analyze_project_async(project.clone());
        let result = self.bounded(&project, task).await?;
        ensure_success(&project, result)
    }

    async fn bounded<F>(&self, target: &str, task: F) -> anyhow::Result<Arc<AnalysisResult>>
    where
        F: Future<Output = depgraph_analysis::Result<Arc<AnalysisResult>>>,
    {
        match tokio::time::timeout(self.timeout, task).await {
            Ok(result) => result.with_context(|| format!("analysis of {} aborted", target)),
            Err(_) => bail!("analysis of {} timed out after {}s", target, self.timeout.as_secs()),
        }
    }
}

fn ensure_success(
    target: &str,
    result: Arc<AnalysisResult>,
) -> anyhow::Result<Arc<AnalysisResult>> {
    if !result.success {
        bail!(
            "analysis of {} failed: {}",
            target,
            result.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(result)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn analyze(
    options: &Options,
    manifest: PathBuf,
    solution: Option<String>,
) -> anyhow::Result<()> {
    let session = Session::open(options, &manifest)?;
    let result = session.solution(solution).await?;

    if options.json {
        return print_json(&*result);
    }
    print_summary(&result);
    Ok(())
}

pub async fn project(options: &Options, manifest: PathBuf, project: String) -> anyhow::Result<()> {
    let session = Session::open(options, &manifest)?;
    let result = session.project(project).await?;

    if options.json {
        return print_json(&*result);
    }
    print_summary(&result);
    Ok(())
}

pub async fn cycles(
    options: &Options,
    manifest: PathBuf,
    solution: Option<String>,
) -> anyhow::Result<()> {
    let session = Session::open(options, &manifest)?;
    let result = session.solution(solution).await?;

    if options.json {
        return print_json(&result.cycles);
    }
    if result.cycles.is_empty() {
        println!("No circular dependencies");
    }
    for cycle in &result.cycles {
        println!("{}", cycle.description());
    }
    Ok(())
}

pub async fn conflicts(
    options: &Options,
    manifest: PathBuf,
    solution: Option<String>,
) -> anyhow::Result<()> {
    let session = Session::open(options, &manifest)?;
    let result = session.solution(solution).await?;

    if options.json {
        return print_json(&result.conflicts);
    }
    if result.conflicts.is_empty() {
        println!("No version conflicts");
    }
    for conflict in &result.conflicts {
        let projects: Vec<&str> = conflict.projects().into_iter().collect();
        println!("{} (used by {})", conflict.description(), projects.join(", "));
        if let Some(highest) = conflict.highest_version() {
            println!("  consider unifying on {}", highest);
        }
    }
    Ok(())
}

pub async fn order(
    options: &Options,
    manifest: PathBuf,
    solution: Option<String>,
) -> anyhow::Result<()> {
    let session = Session::open(options, &manifest)?;
    let result = session.solution(solution).await?;

    let Some(nodes) = result.build_order_nodes() else {
        let cycles: Vec<String> = result.cycles.iter().map(|c| c.description()).collect();
        bail!("no build order exists, circular dependencies: {}", cycles.join("; "));
    };
    let projects: Vec<_> = nodes.into_iter().filter(|n| n.is_project()).collect();

    if options.json {
        let ids: Vec<&str> = projects.iter().map(|n| n.id()).collect();
        return print_json(&ids);
    }
    for (i, node) in projects.iter().enumerate() {
        println!("{:>3}. {} ({})", i + 1, node.name(), node.id());
    }
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    println!(
        "{} nodes, {} edges ({} projects, {} packages)",
        result.graph.node_count(),
        result.graph.edge_count(),
        result.graph.project_nodes().len(),
        result.graph.package_nodes().len()
    );
    println!(
        "{} project references, {} package references",
        result.project_dependencies.len(),
        result.package_dependencies.len()
    );

    if result.cycles.is_empty() {
        println!("Circular dependencies: none");
    } else {
        println!("Circular dependencies:");
        for cycle in &result.cycles {
            println!("  {}", cycle.description());
        }
    }

    if result.conflicts.is_empty() {
        println!("Version conflicts: none");
    } else {
        println!("Version conflicts:");
        for conflict in &result.conflicts {
            println!("  {}", conflict.description());
        }
    }

    for skipped in &result.skipped {
        println!("Skipped {}: {}", skipped.path, skipped.reason);
    }
}
