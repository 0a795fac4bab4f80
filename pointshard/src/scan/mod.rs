//! Concurrent source analysis.
//!
//! [`SourceAnalyzer::analyze`] fans one task per input file across the
//! worker pool, building and executing a metadata pipeline for each, and
//! collects the results into an ordered list. Result slots are pre-assigned
//! by input index before any task runs, so output order always matches
//! input order regardless of completion order, and no two tasks ever touch
//! the same slot.
//!
//! Every per-source failure (fetch, parse, decode, even a panic) is
//! captured as data in that source's own error list. One bad file degrades
//! the batch's outcome, never its completion.

mod serialize;

pub use serialize::serialize;

use crate::config::ScanConfig;
use crate::engine::{
    EngineError, ExecutionOutput, PipelineEngine, PipelineRun, POINT_TABLE_CAPACITY,
};
use crate::geom::Bounds;
use crate::pipeline::{create_info_pipeline, PipelineError, STATS_STAGE};
use crate::pool::Pool;
use crate::source::{DimType, Dimension, Source, SourceInfo};
use crate::storage::{Storage, StorageError};
use serde_json::{json, Value};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::info;

/// Errors from the top-level scan entry point.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What one analysis task hands back for its slot.
struct TaskOutcome {
    /// Replacement path, when the input was a metadata document pointing at
    /// the actual data file.
    path: Option<String>,
    info: SourceInfo,
}

/// Orchestrates per-source metadata extraction across the worker pool.
pub struct SourceAnalyzer {
    engine: Arc<dyn PipelineEngine>,
    storage: Arc<dyn Storage>,
    /// Serializes pipeline construction, validation, and preparation: the
    /// engine is not safe for concurrent initialization. Held only across
    /// those setup phases, never across execution.
    prep: Arc<Mutex<()>>,
}

impl SourceAnalyzer {
    pub fn new(engine: Arc<dyn PipelineEngine>, storage: Arc<dyn Storage>) -> Self {
        Self {
            engine,
            storage,
            prep: Arc::new(Mutex::new(())),
        }
    }

    /// Analyze every input, returning one source per input in input order.
    ///
    /// The template must be a non-empty stage list whose first stage is an
    /// object; anything else is a configuration error. Per-source failures
    /// land in each source's own error list and the batch always completes.
    pub fn analyze(
        &self,
        template: &[Value],
        inputs: &[String],
        threads: usize,
    ) -> Result<Vec<Source>, PipelineError> {
        if template.is_empty() {
            return Err(PipelineError::InvalidTemplate("empty stage list".into()));
        }
        if !template[0].is_object() {
            return Err(PipelineError::InvalidTemplate(format!(
                "reader stage is not an object: {}",
                template[0]
            )));
        }

        let mut sources: Vec<Source> = inputs.iter().map(|path| Source::new(path.clone())).collect();
        let total = sources.len();

        let (tx, rx) = mpsc::channel::<(usize, TaskOutcome)>();
        let pool = Pool::new(threads);

        for (index, source) in sources.iter().enumerate() {
            info!("{}/{}: {}", index + 1, total, source.path);
            let tx = tx.clone();

            if extension(&source.path) == Some("json") {
                // The input is a pre-computed metadata document pointing at
                // the actual data file.
                let storage = Arc::clone(&self.storage);
                let path = source.path.clone();
                pool.add(move || {
                    let outcome = catch_task(|| fetch_info(storage.as_ref(), &path));
                    let _ = tx.send((index, outcome));
                });
            } else {
                let mut pipeline = template.to_vec();
                pipeline[0]["filename"] = json!(source.path);

                let engine = Arc::clone(&self.engine);
                let prep = Arc::clone(&self.prep);
                pool.add(move || {
                    let outcome = catch_task(|| TaskOutcome {
                        path: None,
                        info: source_info(engine.as_ref(), &prep, &pipeline),
                    });
                    let _ = tx.send((index, outcome));
                });
            }
        }

        drop(tx);
        pool.join();

        // One writer per slot: each task owns exactly the index it was given.
        for (index, outcome) in rx {
            if let Some(path) = outcome.path {
                sources[index].path = path;
            }
            sources[index].info = outcome.info;
        }

        Ok(sources)
    }
}

/// Run the config-driven scan: assemble the pipeline, resolve the inputs,
/// analyze.
pub fn scan(
    config: &ScanConfig,
    engine: Arc<dyn PipelineEngine>,
    storage: Arc<dyn Storage>,
) -> Result<Vec<Source>, ScanError> {
    let pipeline = create_info_pipeline(config.pipeline.clone(), config.reprojection.as_ref())?;
    let inputs = resolve(&config.input, storage.as_ref())?;
    let analyzer = SourceAnalyzer::new(engine, storage);
    Ok(analyzer.analyze(&pipeline, &inputs, config.threads)?)
}

/// Expand directory inputs into their contained files; pass others through.
pub fn resolve(inputs: &[String], storage: &dyn Storage) -> Result<Vec<String>, StorageError> {
    let mut resolved = Vec::new();
    for input in inputs {
        if storage.is_dir(input) {
            resolved.extend(storage.list(input)?);
        } else {
            resolved.push(input.clone());
        }
    }
    Ok(resolved)
}

fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|e| e.to_str())
}

/// Contain a task: a panic becomes a generic error on the task's own source
/// instead of crashing its worker.
fn catch_task(task: impl FnOnce() -> TaskOutcome) -> TaskOutcome {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(outcome) => outcome,
        Err(_) => TaskOutcome {
            path: None,
            info: SourceInfo {
                errors: vec!["unknown error".to_string()],
                ..SourceInfo::default()
            },
        },
    }
}

/// Fetch and adopt a pre-computed metadata document.
fn fetch_info(storage: &dyn Storage, path: &str) -> TaskOutcome {
    match try_fetch(storage, path) {
        Ok(source) => TaskOutcome {
            path: Some(source.path),
            info: source.info,
        },
        Err(e) => TaskOutcome {
            path: None,
            info: SourceInfo {
                errors: vec![format!("failed to fetch info: {e}")],
                ..SourceInfo::default()
            },
        },
    }
}

fn try_fetch(storage: &dyn Storage, path: &str) -> Result<Source, String> {
    let data = storage.get(path).map_err(|e| e.to_string())?;
    // The document embeds the data path alongside the info fields; the
    // recorded path is replaced with it.
    serde_json::from_slice(&data).map_err(|e| e.to_string())
}

/// Build, run, and harvest one pipeline, folding any failure into the
/// result's error list.
fn source_info(engine: &dyn PipelineEngine, prep: &Mutex<()>, pipeline: &[Value]) -> SourceInfo {
    let mut info = SourceInfo::default();

    let result = run_pipeline(engine, prep, pipeline)
        .and_then(|output| harvest(&mut info, output));
    if let Err(e) = result {
        info.errors.push(format!("failed to analyze: {e}"));
    }

    info
}

/// Execute a pipeline: open and prepare under the preparation lock, then run
/// outside it: streaming when supported, batched through the fixed-capacity
/// point table otherwise.
fn run_pipeline(
    engine: &dyn PipelineEngine,
    prep: &Mutex<()>,
    stages: &[Value],
) -> Result<ExecutionOutput, EngineError> {
    let last_type = stages
        .last()
        .and_then(|stage| stage.get("type"))
        .and_then(Value::as_str);
    if last_type != Some(STATS_STAGE) {
        return Err(EngineError::InvalidPipeline(format!(
            "must end with {STATS_STAGE}"
        )));
    }

    if let Some(first_type) = stages
        .first()
        .and_then(|stage| stage.get("type"))
        .and_then(Value::as_str)
    {
        if !first_type.starts_with("readers.") {
            return Err(EngineError::InvalidPipeline(
                "must start with a reader".into(),
            ));
        }
    }

    let mut run = {
        let _guard = prep.lock().unwrap();
        engine.open(stages)?
    };
    {
        let _guard = prep.lock().unwrap();
        run.prepare()?;
    }

    if run.streamable() {
        run.execute_streaming()
    } else {
        run.execute_batched(POINT_TABLE_CAPACITY)
    }
}

/// Fill a source's info from a pipeline execution.
fn harvest(info: &mut SourceInfo, output: ExecutionOutput) -> Result<(), EngineError> {
    info.dimensions = output.dimensions;
    info.metadata = output.metadata;

    let xi = dimension_index(&info.dimensions, "X").ok_or(EngineError::MissingDimension("X"))?;
    let yi = dimension_index(&info.dimensions, "Y").ok_or(EngineError::MissingDimension("Y"))?;
    let zi = dimension_index(&info.dimensions, "Z").ok_or(EngineError::MissingDimension("Z"))?;

    // A reader-supplied fixed-point transform reinterprets the spatial
    // dimensions as scaled 32-bit integers.
    if let Some(so) = output.scale_offset {
        for (axis, &index) in [xi, yi, zi].iter().enumerate() {
            let dim = &mut info.dimensions[index];
            dim.scale = Some(so.scale[axis]);
            dim.offset = Some(so.offset[axis]);
            dim.dim_type = DimType::Int32;
        }
    }

    let x = stats_of(&info.dimensions, xi, "X")?;
    let y = stats_of(&info.dimensions, yi, "Y")?;
    let z = stats_of(&info.dimensions, zi, "Z")?;

    info.bounds = Some(Bounds::new(
        x.minimum, y.minimum, z.minimum, x.maximum, y.maximum, z.maximum,
    ));
    info.points = x.count;
    info.srs = output.srs;

    Ok(())
}

fn dimension_index(dimensions: &[Dimension], name: &str) -> Option<usize> {
    dimensions.iter().position(|d| d.name == name)
}

fn stats_of(
    dimensions: &[Dimension],
    index: usize,
    name: &'static str,
) -> Result<crate::source::DimStats, EngineError> {
    dimensions[index]
        .stats
        .clone()
        .ok_or(EngineError::MissingStats(name))
}
