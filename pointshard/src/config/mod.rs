//! Scan run configuration.
//!
//! A scan is driven by one JSON document:
//!
//! ```json
//! { "input": ["clouds/", "extra.xyz"],
//!   "pipeline": [{ "type": "readers.text" }],
//!   "reprojection": { "in": "EPSG:4326", "out": "EPSG:3857", "hammer": false },
//!   "threads": 8,
//!   "output": "out/sources" }
//! ```
//!
//! Only `input` is required; the pipeline defaults to a single bare reader
//! stage and concurrency defaults to 8 threads.

use crate::pipeline::Reprojection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything one scan run needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Input locations: files, directories, or pre-computed metadata
    /// documents.
    pub input: Vec<String>,

    /// Read-pipeline template the analyzer instantiates per source.
    #[serde(default = "default_pipeline")]
    pub pipeline: Value,

    /// Optional coordinate-system transformation request.
    #[serde(default)]
    pub reprojection: Option<Reprojection>,

    /// Concurrency bound for analysis and serialization.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Destination prefix for serialized source records.
    #[serde(default)]
    pub output: Option<String>,
}

fn default_pipeline() -> Value {
    json!([{}])
}

fn default_threads() -> usize {
    8
}

impl ScanConfig {
    /// A minimal configuration for the given inputs, all defaults applied.
    pub fn for_inputs(input: Vec<String>) -> Self {
        Self {
            input,
            pipeline: default_pipeline(),
            reprojection: None,
            threads: default_threads(),
            output: None,
        }
    }

    /// Load a configuration document from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.to_string_lossy().into_owned();
        let data = std::fs::read(path).map_err(|e| ConfigError::Read {
            path: display.clone(),
            source: e,
        })?;
        serde_json::from_slice(&data).map_err(|e| ConfigError::Parse {
            path: display,
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config: ScanConfig = serde_json::from_str(r#"{ "input": ["a.xyz"] }"#).unwrap();
        assert_eq!(config.input, vec!["a.xyz"]);
        assert_eq!(config.pipeline, json!([{}]));
        assert_eq!(config.threads, 8);
        assert!(config.reprojection.is_none());
        assert!(config.output.is_none());
    }

    #[test]
    fn test_full_document() {
        let config: ScanConfig = serde_json::from_str(
            r#"{
                "input": ["clouds/"],
                "pipeline": [{ "type": "readers.text" }],
                "reprojection": { "in": "EPSG:4326", "out": "EPSG:3857" },
                "threads": 2,
                "output": "out"
            }"#,
        )
        .unwrap();

        assert_eq!(config.threads, 2);
        assert_eq!(config.output.as_deref(), Some("out"));
        let repro = config.reprojection.unwrap();
        assert_eq!(repro.out_srs, "EPSG:3857");
        assert!(!repro.hammer);
    }

    #[test]
    fn test_input_is_required() {
        let result: Result<ScanConfig, _> = serde_json::from_str(r#"{ "threads": 4 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.json");
        fs::write(&path, r#"{ "input": ["a.xyz"], "threads": 3 }"#).unwrap();

        let config = ScanConfig::load(&path).unwrap();
        assert_eq!(config.threads, 3);
    }

    #[test]
    fn test_load_errors_are_typed() {
        let dir = TempDir::new().unwrap();

        let missing = ScanConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let path = dir.path().join("broken.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            ScanConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
