//! Analysis façade: per-project analysis, parallel solution fan-out, merge

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use anyhow::Context;
use depgraph_core::{
    AnalysisResult, Cycle, DependencyGraph, GraphBuilder, PackageVersionConflict, SkippedProject,
};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::cache::AnalysisCache;
use crate::config::AnalyzerConfig;
use crate::error::{AnalysisError, Result};
use crate::fingerprint::{Fingerprinter, ModifiedTimeFingerprinter};
use crate::resolver::{PackageDependencyResolver, ProjectReferenceResolver};

/// Entry point for dependency analysis.
///
/// Project analyses of a solution run on a dedicated worker pool and are
/// merged once all of them have finished. Results are memoized in an
/// [`AnalysisCache`] that may be shared between orchestrators.
pub struct AnalysisOrchestrator {
    projects: Arc<dyn ProjectReferenceResolver>,
    packages: Arc<dyn PackageDependencyResolver>,
    cache: Arc<AnalysisCache>,
    fingerprinter: Arc<dyn Fingerprinter>,
    pool: ThreadPool,
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("workers", &self.pool.current_num_threads())
            .field("cache", &self.cache.stats())
            .finish()
    }
}

impl AnalysisOrchestrator {
    pub fn new(
        projects: Arc<dyn ProjectReferenceResolver>,
        packages: Arc<dyn PackageDependencyResolver>,
        config: AnalyzerConfig,
    ) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("depgraph-worker-{}", i))
            .build()?;

        Ok(Self {
            projects,
            packages,
            cache: Arc::new(AnalysisCache::new(config.cache_ttl)),
            fingerprinter: Arc::new(ModifiedTimeFingerprinter),
            pool,
        })
    }

    /// Use a shared cache instead of a private one.
    pub fn with_cache(mut self, cache: Arc<AnalysisCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Analyze every project of a solution and merge the results.
    ///
    /// Projects whose analysis fails are left out of the merge and listed in
    /// [`AnalysisResult::skipped`]. The call fails as a whole only when the
    /// solution cannot be resolved or when every project failed.
    pub fn analyze_solution(&self, solution_path: &str) -> Arc<AnalysisResult> {
        let fingerprint = self.fingerprinter.fingerprint(solution_path);
        if let Some(cached) = self.cache.get_solution(solution_path, fingerprint) {
            debug!("Solution cache hit: {}", solution_path);
            return cached;
        }

        info!("Analyzing solution: {}", solution_path);

        let scope = match self
            .projects
            .solution_projects(solution_path)
            .with_context(|| format!("failed to resolve projects of {}", solution_path))
        {
            Ok(scope) => scope,
            Err(e) => {
                warn!("Solution analysis failed: {:#}", e);
                return Arc::new(AnalysisResult::failed(format!("{:#}", e)));
            }
        };

        let mut paths: Vec<&String> = scope.keys().collect();
        paths.sort();

        let outcomes: Vec<(String, Arc<AnalysisResult>)> = self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| ((*path).clone(), self.analyze_project(path)))
                .collect()
        });

        let graph = DependencyGraph::new();
        let mut project_dependencies = Vec::new();
        let mut package_dependencies = Vec::new();
        let mut skipped = Vec::new();

        let (analyzed, failed): (Vec<_>, Vec<_>) =
            outcomes.into_iter().partition(|(_, outcome)| outcome.success);

        for (path, outcome) in failed {
            let reason = outcome
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            warn!("Skipping project {}: {}", path, reason);
            skipped.push(SkippedProject { path, reason });
        }

        // Each project's own node goes in before any graph that only knows
        // it as a reference target, since the first node per id is kept.
        for (path, outcome) in &analyzed {
            if let Some(node) = outcome.graph.node_by_id(path) {
                graph.add_node(node);
            }
        }

        for (_, outcome) in &analyzed {
            graph.merge(&outcome.graph);
            project_dependencies.extend(outcome.project_dependencies.iter().cloned());
            package_dependencies.extend(outcome.package_dependencies.iter().cloned());
        }

        if !scope.is_empty() && skipped.len() == scope.len() {
            let reasons: Vec<String> = skipped
                .iter()
                .map(|s| format!("{}: {}", s.path, s.reason))
                .collect();
            let message = format!(
                "every project of {} failed to analyze ({})",
                solution_path,
                reasons.join("; ")
            );
            warn!("{}", message);
            return Arc::new(AnalysisResult::failed(message).with_skipped(skipped));
        }

        let result = AnalysisResult::analyzed(
            graph,
            dedup_by_identity(project_dependencies),
            dedup_by_identity(package_dependencies),
        )
        .with_skipped(skipped);

        if result.has_cycles() {
            for cycle in &result.cycles {
                warn!("Circular dependency: {}", cycle.description());
            }
        }
        info!(
            "Solution {} analyzed: {} nodes, {} cycles, {} conflicts",
            solution_path,
            result.graph.node_count(),
            result.cycles.len(),
            result.conflicts.len()
        );

        let result = Arc::new(result);
        // Partial results are not cached so skipped projects are retried.
        if result.skipped.is_empty() {
            self.cache
                .set_solution(solution_path, Arc::clone(&result), fingerprint);
        }
        result
    }

    /// Analyze a single project: its references, its packages and the
    /// cycles among them. Resolution errors become a failed result.
    pub fn analyze_project(&self, project_path: &str) -> Arc<AnalysisResult> {
        let fingerprint = self.fingerprinter.fingerprint(project_path);
        if let Some(cached) = self.cache.get_project(project_path, fingerprint) {
            debug!("Project cache hit: {}", project_path);
            return cached;
        }

        debug!("Analyzing project: {}", project_path);
        match self.resolve_project(project_path) {
            Ok(result) => {
                let result = Arc::new(result);
                self.cache
                    .set_project(project_path, Arc::clone(&result), fingerprint);
                result
            }
            Err(e) => {
                warn!("Project analysis failed for {}: {:#}", project_path, e);
                Arc::new(AnalysisResult::failed(format!("{:#}", e)))
            }
        }
    }

    fn resolve_project(&self, project_path: &str) -> anyhow::Result<AnalysisResult> {
        let info = self
            .projects
            .project_info(project_path)
            .with_context(|| format!("failed to read project info for {}", project_path))?;
        let references = self
            .projects
            .project_references(project_path)
            .with_context(|| format!("failed to resolve project references of {}", project_path))?;
        let packages = self
            .packages
            .package_dependencies(project_path)
            .with_context(|| format!("failed to resolve packages of {}", project_path))?;

        let graph = GraphBuilder::project_graph(&info, &references, &packages);
        Ok(AnalysisResult::analyzed(graph, references, packages))
    }

    pub fn detect_cycles(&self, solution_path: &str) -> Result<Vec<Cycle>> {
        let result = self.successful_solution(solution_path)?;
        Ok(result.cycles.clone())
    }

    pub fn check_version_conflicts(
        &self,
        solution_path: &str,
    ) -> Result<Vec<PackageVersionConflict>> {
        let result = self.successful_solution(solution_path)?;
        Ok(result.conflicts.clone())
    }

    /// Build order of a solution, dependencies first. `None` when the
    /// solution has circular dependencies.
    pub fn build_order(&self, solution_path: &str) -> Result<Option<Vec<String>>> {
        let result = self.successful_solution(solution_path)?;
        Ok(result.build_order.clone())
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Analysis cache cleared");
    }

    /// Run [`Self::analyze_solution`] on the blocking pool so callers can
    /// put a timeout on it. A timed-out analysis keeps running to completion.
    pub async fn analyze_solution_async(
        self: Arc<Self>,
        solution_path: impl Into<String>,
    ) -> Result<Arc<AnalysisResult>> {
        let solution_path = solution_path.into();
        Ok(tokio::task::spawn_blocking(move || self.analyze_solution(&solution_path)).await?)
    }

    pub async fn analyze_project_async(
        self: Arc<Self>,
        project_path: impl Into<String>,
    ) -> Result<Arc<AnalysisResult>> {
        let project_path = project_path.into();
        Ok(tokio::task::spawn_blocking(move || self.analyze_project(&project_path)).await?)
    }

    fn successful_solution(&self, solution_path: &str) -> Result<Arc<AnalysisResult>> {
        let result = self.analyze_solution(solution_path);
        if result.success {
            Ok(result)
        } else {
            Err(AnalysisError::Failed {
                path: solution_path.to_string(),
                message: result.error_message.clone().unwrap_or_default(),
            })
        }
    }
}

/// Keep the first record of each identity, preserving order.
fn dedup_by_identity<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
