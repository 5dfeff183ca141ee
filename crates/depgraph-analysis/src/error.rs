//! Errors surfaced by the analysis façade

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis of {path} failed: {message}")]
    Failed { path: String, message: String },

    #[error("failed to start analysis worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("analysis task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
