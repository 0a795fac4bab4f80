//! Built-in engine for whitespace-delimited XYZ text files.
//!
//! The `readers.text` format is one point per line, columns separated by
//! whitespace. An optional leading header line names the dimensions;
//! without one, three columns are assumed and named X, Y, Z. Text files
//! declare no spatial reference of their own, so the reader's
//! `override_srs`/`default_srs` settings are equivalent here, and a
//! `filters.reprojection` stage only records its target system; coordinate
//! math belongs to a full decode engine behind the same seam.

use super::{EngineError, ExecutionOutput, PipelineEngine, PipelineRun};
use crate::pipeline::{REPROJECTION_STAGE, STATS_STAGE};
use crate::source::{DimStats, DimType, Dimension};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

/// Streaming decode engine for whitespace-delimited text point files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEngine;

impl TextEngine {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineEngine for TextEngine {
    fn open(&self, stages: &[Value]) -> Result<Box<dyn PipelineRun>, EngineError> {
        let reader = stages
            .first()
            .ok_or_else(|| EngineError::InvalidPipeline("no stages".into()))?;

        let reader_type = reader
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("readers.text");
        if reader_type != "readers.text" {
            return Err(EngineError::InvalidPipeline(format!(
                "unsupported reader: {reader_type}"
            )));
        }

        let filename = reader
            .get("filename")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::InvalidPipeline("reader has no filename".into()))?;

        let override_srs = reader.get("override_srs").and_then(Value::as_str);
        let default_srs = reader.get("default_srs").and_then(Value::as_str);

        let mut out_srs = None;
        for stage in &stages[1..] {
            if stage.get("inputs").is_some() {
                return Err(EngineError::InvalidPipeline("must be linear".into()));
            }
            match stage.get("type").and_then(Value::as_str) {
                Some(REPROJECTION_STAGE) => {
                    out_srs = stage.get("out_srs").and_then(Value::as_str);
                }
                Some(STATS_STAGE) => {}
                other => {
                    return Err(EngineError::InvalidPipeline(format!(
                        "unsupported stage: {}",
                        other.unwrap_or("<untyped>")
                    )));
                }
            }
        }

        // A text file carries no spatial reference, so the forced and the
        // fallback input system coincide; the reprojection target wins.
        let input_srs = override_srs.or(default_srs).unwrap_or("");
        let srs = out_srs.unwrap_or(input_srs).to_string();

        Ok(Box::new(TextRun {
            path: PathBuf::from(filename),
            srs,
        }))
    }
}

struct TextRun {
    path: PathBuf,
    srs: String,
}

impl TextRun {
    fn scan(self) -> Result<ExecutionOutput, EngineError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut names: Option<Vec<String>> = None;
        let mut accumulators: Vec<StatsAccumulator> = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }

            if names.is_none() {
                // A non-numeric first line names the dimensions.
                if tokens.iter().any(|t| t.parse::<f64>().is_err()) {
                    names = Some(tokens.iter().map(|t| t.to_string()).collect());
                    accumulators = tokens.iter().map(|_| StatsAccumulator::new()).collect();
                    continue;
                }
                if tokens.len() != 3 {
                    return Err(EngineError::Decode(format!(
                        "line {}: expected 3 columns without a header, got {}",
                        number + 1,
                        tokens.len()
                    )));
                }
                names = Some(vec!["X".into(), "Y".into(), "Z".into()]);
                accumulators = (0..3).map(|_| StatsAccumulator::new()).collect();
            }

            let expected = names.as_ref().map(Vec::len).unwrap_or(0);
            if tokens.len() != expected {
                return Err(EngineError::Decode(format!(
                    "line {}: expected {} columns, got {}",
                    number + 1,
                    expected,
                    tokens.len()
                )));
            }

            for (token, accumulator) in tokens.iter().zip(accumulators.iter_mut()) {
                let value: f64 = token.parse().map_err(|_| {
                    EngineError::Decode(format!("line {}: bad number '{}'", number + 1, token))
                })?;
                accumulator.push(value);
            }
        }

        let names = names.unwrap_or_else(|| vec!["X".into(), "Y".into(), "Z".into()]);
        if accumulators.is_empty() {
            accumulators = names.iter().map(|_| StatsAccumulator::new()).collect();
        }

        let dimensions = names
            .into_iter()
            .zip(accumulators)
            .map(|(name, accumulator)| {
                Dimension::new(name, DimType::Double, Some(accumulator.finish()))
            })
            .collect();

        Ok(ExecutionOutput {
            dimensions,
            metadata: json!({
                "readers.text": { "filename": self.path.to_string_lossy() }
            }),
            scale_offset: None,
            srs: self.srs,
        })
    }
}

impl PipelineRun for TextRun {
    fn streamable(&self) -> bool {
        true
    }

    fn prepare(&mut self) -> Result<(), EngineError> {
        std::fs::metadata(&self.path)?;
        Ok(())
    }

    fn execute_streaming(self: Box<Self>) -> Result<ExecutionOutput, EngineError> {
        self.scan()
    }

    fn execute_batched(self: Box<Self>, _capacity: usize) -> Result<ExecutionOutput, EngineError> {
        // Text decoding accumulates nothing per point, so the fixed-capacity
        // table adds no buffering here; the batched path shares the scan.
        self.scan()
    }
}

/// Running min/max/count/mean/variance (Welford), population variance.
struct StatsAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
    minimum: f64,
    maximum: f64,
}

impl StatsAccumulator {
    fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            minimum: f64::INFINITY,
            maximum: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.minimum = self.minimum.min(value);
        self.maximum = self.maximum.max(value);
    }

    fn finish(self) -> DimStats {
        if self.count == 0 {
            return DimStats {
                minimum: 0.0,
                maximum: 0.0,
                count: 0,
                mean: 0.0,
                variance: 0.0,
            };
        }
        DimStats {
            minimum: self.minimum,
            maximum: self.maximum,
            count: self.count,
            mean: self.mean,
            variance: self.m2 / self.count as f64,
        }
    }
}
