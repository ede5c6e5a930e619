//! Error types for pipeline runs

use thiserror::Error;

use crate::model::ContentError;

/// Rejection before any pipeline stage runs
///
/// Every failure after ingestion is reported as a FAILED report instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("Invalid content: {0}")]
    InvalidContent(#[from] ContentError),
}
