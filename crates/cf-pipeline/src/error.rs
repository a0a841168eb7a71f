//! Pipeline error types.

use thiserror::Error;

use crate::topology::RouterError;
use cf_daq::DaqError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that abort a cycle (or the pipeline setup).
///
/// Channel-level conversion errors never appear here: they travel as
/// validity flags inside an otherwise published [`crate::CycleResult`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Acquisition failed; the cycle is dropped and filter state reset.
    #[error(transparent)]
    Acquisition(#[from] DaqError),

    /// The sample set does not match the configured topology; the cycle
    /// is dropped.
    #[error(transparent)]
    Topology(#[from] RouterError),

    /// The pipeline was assembled from inconsistent parts.
    #[error("invalid pipeline setup: {what}")]
    InvalidSetup { what: &'static str },
}
