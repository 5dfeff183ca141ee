//! Staleness-aware cache of analysis results

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use depgraph_core::AnalysisResult;
use tracing::debug;

use crate::config::DEFAULT_CACHE_TTL;
use crate::fingerprint::Fingerprint;

/// Cache entry with the fingerprint observed when it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: Arc<AnalysisResult>,
    pub stored_at: Instant,
    pub fingerprint: Option<Fingerprint>,
}

impl CacheEntry {
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }

    fn is_fresh(&self, ttl: Duration, current: Option<Fingerprint>) -> bool {
        !self.is_expired(ttl) && self.fingerprint == current
    }
}

/// One keyed table. Entries are replaced whole, never mutated in place.
#[derive(Debug, Default)]
struct Table {
    entries: DashMap<String, CacheEntry>,
}

impl Table {
    fn get(
        &self,
        key: &str,
        ttl: Duration,
        current: Option<Fingerprint>,
    ) -> Option<Arc<AnalysisResult>> {
        {
            let entry = self.entries.get(key)?;
            if entry.is_fresh(ttl, current) {
                return Some(Arc::clone(&entry.result));
            }
        }

        // The shard guard above must be released before removing.
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_fresh(ttl, current))
            .is_some()
        {
            debug!("Evicted stale cache entry: {}", key);
        }
        None
    }

    fn insert(&self, key: &str, result: Arc<AnalysisResult>, fingerprint: Option<Fingerprint>) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                result,
                stored_at: Instant::now(),
                fingerprint,
            },
        );
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn cleanup_expired(&self, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(ttl));
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Cache for project and solution analysis results, keyed by path.
///
/// An entry is served only while it is younger than the TTL and the current
/// fingerprint of its source equals the one recorded when it was stored.
/// Anything else is a miss and the entry is dropped. A solution entry only
/// tracks the solution's own fingerprint; changes confined to a project of the
/// solution are picked up once the TTL runs out.
#[derive(Debug)]
pub struct AnalysisCache {
    projects: Table,
    solutions: Table,
    ttl: Duration,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            projects: Table::default(),
            solutions: Table::default(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn has_project(&self, path: &str, current: Option<Fingerprint>) -> bool {
        self.get_project(path, current).is_some()
    }

    /// Get the cached project result if it is still valid
    pub fn get_project(
        &self,
        path: &str,
        current: Option<Fingerprint>,
    ) -> Option<Arc<AnalysisResult>> {
        self.projects.get(path, self.ttl, current)
    }

    pub fn set_project(
        &self,
        path: &str,
        result: Arc<AnalysisResult>,
        fingerprint: Option<Fingerprint>,
    ) {
        self.projects.insert(path, result, fingerprint);
    }

    pub fn clear_project(&self, path: &str) {
        self.projects.remove(path);
    }

    pub fn clear_projects(&self) {
        self.projects.clear();
    }

    pub fn has_solution(&self, path: &str, current: Option<Fingerprint>) -> bool {
        self.get_solution(path, current).is_some()
    }

    /// Get the cached solution result if it is still valid
    pub fn get_solution(
        &self,
        path: &str,
        current: Option<Fingerprint>,
    ) -> Option<Arc<AnalysisResult>> {
        self.solutions.get(path, self.ttl, current)
    }

    pub fn set_solution(
        &self,
        path: &str,
        result: Arc<AnalysisResult>,
        fingerprint: Option<Fingerprint>,
    ) {
        self.solutions.insert(path, result, fingerprint);
    }

    pub fn clear_solution(&self, path: &str) {
        self.solutions.remove(path);
    }

    pub fn clear_solutions(&self) {
        self.solutions.clear();
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.projects.clear();
        self.solutions.clear();
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let removed =
            self.projects.cleanup_expired(self.ttl) + self.solutions.cleanup_expired(self.ttl);
        if removed > 0 {
            debug!("Removed {} expired cache entries", removed);
        }
        removed
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            project_entries: self.projects.len(),
            solution_entries: self.solutions.len(),
            ttl: self.ttl,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub project_entries: usize,
    pub solution_entries: usize,
    pub ttl: Duration,
}
