//! Error types for the analysis pipeline
//!
//! Stage-level code (key estimation, chord recognition, feature extraction)
//! returns `InvalidInput` and never catches its own errors. The orchestrator
//! wraps whatever a stage returns into `AnalysisFailed`, tagged with the stage
//! that produced it.

use std::fmt;
use thiserror::Error;

/// Pipeline stage that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    BeatTracking,
    Chroma,
    KeyEstimation,
    ChordRecognition,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "signal validation",
            Stage::BeatTracking => "beat tracking",
            Stage::Chroma => "chroma extraction",
            Stage::KeyEstimation => "key estimation",
            Stage::ChordRecognition => "chord recognition",
        };
        f.write_str(name)
    }
}

/// Errors produced by the analysis core
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Empty or degenerate signal/chroma handed to a stage
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration rejected by `AnalysisConfig::validate`
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised by the orchestrator only, carrying the stage error
    #[error("Analysis failed during {stage}")]
    AnalysisFailed {
        stage: Stage,
        #[source]
        source: Box<AnalysisError>,
    },

    /// A background job panicked, or its result was already taken
    #[error("Analysis worker exited without a result")]
    WorkerLost,
}

/// Result type alias for the analysis core
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        AnalysisError::InvalidInput(reason.into())
    }

    /// Wrap a stage error. Already-wrapped errors are passed through unchanged.
    pub fn failed(stage: Stage, source: AnalysisError) -> Self {
        match source {
            AnalysisError::AnalysisFailed { .. } => source,
            other => AnalysisError::AnalysisFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage that failed, if this error came out of the orchestrator
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AnalysisError::AnalysisFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, AnalysisError::InvalidInput(_))
    }
}

/// Extension for tagging stage results with the stage they came from
pub trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    fn in_stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| AnalysisError::failed(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_failed_wraps_cause() {
        let err = AnalysisError::failed(Stage::Chroma, AnalysisError::invalid_input("silent signal"));
        assert_eq!(err.stage(), Some(Stage::Chroma));
        let cause = err.source().unwrap().to_string();
        assert!(cause.contains("silent signal"));
        assert!(err.to_string().contains("chroma extraction"));
    }

    #[test]
    fn test_failed_does_not_double_wrap() {
        let inner = AnalysisError::failed(Stage::KeyEstimation, AnalysisError::invalid_input("empty"));
        let outer = AnalysisError::failed(Stage::ChordRecognition, inner);
        assert_eq!(outer.stage(), Some(Stage::KeyEstimation));
    }
}
