//! Error types for pipeline document assembly.

use thiserror::Error;

/// Fatal configuration errors detected while assembling a pipeline document.
///
/// These indicate a malformed template, not a transient condition, and are
/// surfaced immediately rather than recorded per source.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The template is not a non-empty ordered stage list.
    #[error("invalid pipeline template: {0}")]
    InvalidTemplate(String),
}
