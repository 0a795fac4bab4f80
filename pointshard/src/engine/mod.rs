//! Decode-engine seam.
//!
//! The heavy point-cloud decode/reprojection engine is an external
//! collaborator consumed behind the [`PipelineEngine`] / [`PipelineRun`]
//! traits: construct and validate a pipeline from its document, prepare it,
//! then execute it (streaming when the pipeline supports it, batched
//! through a fixed-capacity point table otherwise), yielding dimensions,
//! per-dimension statistics, an optional fixed-point scale/offset, and a
//! spatial reference.
//!
//! Construction, validation, and preparation are NOT safe for concurrent
//! initialization; callers serialize those phases (the analyzer holds its
//! preparation lock across them and releases it before execution).

mod text;

pub use text::TextEngine;

use crate::geom::ScaleOffset;
use crate::source::Dimension;
use serde_json::Value;
use thiserror::Error;

/// Capacity of the point table used for batched (non-streaming) execution.
pub const POINT_TABLE_CAPACITY: usize = 4096;

/// Errors surfaced by pipeline construction, validation, or execution.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The pipeline document cannot be built into a runnable pipeline.
    #[error("invalid pipeline - {0}")]
    InvalidPipeline(String),

    /// Decoding the underlying data failed.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The pipeline output lacks a required spatial dimension.
    #[error("pipeline output has no {0} dimension")]
    MissingDimension(&'static str),

    /// The pipeline output lacks statistics for a required dimension.
    #[error("pipeline output has no statistics for {0}")]
    MissingStats(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a pipeline execution yields about its source.
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    /// Available dimensions, in layout order, with statistics where the
    /// stats stage computed them.
    pub dimensions: Vec<Dimension>,
    /// Format-specific reader metadata, opaque to this layer.
    pub metadata: Value,
    /// Fixed-point transform, when the reader exposes one.
    pub scale_offset: Option<ScaleOffset>,
    /// Spatial reference as WKT, or empty.
    pub srs: String,
}

/// A decode engine that can turn pipeline documents into runnable pipelines.
pub trait PipelineEngine: Send + Sync {
    /// Construct and validate a pipeline from its stage documents.
    ///
    /// Not reentrant: callers must serialize concurrent `open` calls.
    fn open(&self, stages: &[Value]) -> Result<Box<dyn PipelineRun>, EngineError>;
}

/// A constructed pipeline, ready to prepare and execute once.
pub trait PipelineRun: Send {
    /// Whether the whole pipeline can execute point-by-point.
    fn streamable(&self) -> bool;

    /// Prepare the pipeline for execution.
    ///
    /// Same reentrancy caveat as [`PipelineEngine::open`].
    fn prepare(&mut self) -> Result<(), EngineError>;

    /// Execute point-by-point.
    fn execute_streaming(self: Box<Self>) -> Result<ExecutionOutput, EngineError>;

    /// Execute through a fixed-capacity point table.
    fn execute_batched(self: Box<Self>, capacity: usize) -> Result<ExecutionOutput, EngineError>;
}
