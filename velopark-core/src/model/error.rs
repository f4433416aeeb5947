use std::path::PathBuf;

/// run-level failures. every variant aborts the run before any artifact
/// is written, leaving the previous artifact set as last-known-good for
/// the display layer. per-pair conditions (insufficient samples, undefined
/// correlation) are not errors and live in
/// [`crate::model::correlation::PairExclusion`].
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("historical data unavailable: {0}")]
    DataUnavailable(String),
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("run exceeded wall-clock budget of {budget} (elapsed {elapsed})")]
    BudgetExceeded { budget: String, elapsed: String },
    #[error("error writing artifact to '{path}': {message}")]
    ArtifactWrite { path: PathBuf, message: String },
    #[error("{0}")]
    Internal(String),
}
