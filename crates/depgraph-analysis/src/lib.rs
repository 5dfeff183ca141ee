//! depgraph analysis: resolver seams, result cache and the analysis orchestrator

pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod orchestrator;
pub mod resolver;


#[cfg(test)]
pub mod test_utils;

pub use cache::{AnalysisCache, CacheEntry, CacheStats};
pub use config::{AnalyzerConfig, DEFAULT_CACHE_TTL};
pub use error::{AnalysisError, Result};
pub use fingerprint::{Fingerprint, Fingerprinter, ModifiedTimeFingerprinter};
pub use orchestrator::AnalysisOrchestrator;
pub use resolver::{PackageDependencyResolver, ProjectReferenceResolver};
