//! Error types for content analysis

use thiserror::Error;

use crate::model::FailureCode;

/// Error type for content analysis
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),

    #[error("Analyzer returned malformed output: {0}")]
    MalformedOutput(String),
}

impl AnalyzerError {
    pub fn failure_code(&self) -> FailureCode {
        match self {
            AnalyzerError::Unavailable(_) => FailureCode::AnalyzerUnavailable,
            AnalyzerError::MalformedOutput(_) => FailureCode::AnalyzerMalformedOutput,
        }
    }
}
