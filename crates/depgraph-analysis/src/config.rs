//! Analyzer configuration

use std::num::NonZeroUsize;
use std::time::Duration;

/// Default lifetime of a cache entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// How long a cached result stays valid when its source is unchanged.
    pub cache_ttl: Duration,
    /// Size of the per-project analysis worker pool.
    pub worker_threads: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            cache_ttl: DEFAULT_CACHE_TTL,
            worker_threads: AnalyzerConfig::default_worker_threads(),
        }
    }
}

impl AnalyzerConfig {
    /// Twice the available hardware parallelism, but at least 2.
    pub fn default_worker_threads() -> usize {
        std::thread::available_parallelism()
            .map(|n| NonZeroUsize::get(n) * 2)
            .unwrap_or(2)
            .max(2)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }
}
