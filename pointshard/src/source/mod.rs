//! Per-source metadata records.
//!
//! A [`Source`] is one input point-cloud file plus everything the analysis
//! pass derived from it. A non-empty error list marks the source as failed;
//! downstream consumers must check it before trusting any other field.
//!
//! Records serialize as one flat object per source:
//!
//! ```json
//! { "path": "a.laz",
//!   "dimensions": [ { "name": "X", "type": "int32", "stats": { ... } } ],
//!   "metadata": { },
//!   "bounds": [minx, miny, minz, maxx, maxy, maxz],
//!   "points": 42,
//!   "srs": "",
//!   "errors": [] }
//! ```

use crate::geom::Bounds;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage type of a point dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimType {
    #[serde(rename = "int8")]
    Int8,
    #[serde(rename = "int16")]
    Int16,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "uint8")]
    Uint8,
    #[serde(rename = "uint16")]
    Uint16,
    #[serde(rename = "uint32")]
    Uint32,
    #[serde(rename = "uint64")]
    Uint64,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "double")]
    Double,
}

/// Statistics harvested for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimStats {
    pub minimum: f64,
    pub maximum: f64,
    pub count: u64,
    pub mean: f64,
    pub variance: f64,
}

/// One point dimension: name, storage type, and optional statistics.
///
/// `stats` is absent only when the backing format lacked the statistic.
/// `scale`/`offset` appear only after spatial dimensions are reinterpreted
/// as fixed-precision integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    #[serde(rename = "type")]
    pub dim_type: DimType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<DimStats>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, dim_type: DimType, stats: Option<DimStats>) -> Self {
        Self {
            name: name.into(),
            dim_type,
            scale: None,
            offset: None,
            stats,
        }
    }
}

/// Everything the analysis pass derived from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(default)]
    pub points: u64,
    /// Spatial reference as WKT, or empty when none is known.
    #[serde(default)]
    pub srs: String,
    /// Non-empty marks the source as failed.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            dimensions: Vec::new(),
            metadata: Value::Null,
            bounds: None,
            points: 0,
            srs: String::new(),
            errors: Vec::new(),
        }
    }
}

/// One input file plus its derived metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub path: String,
    #[serde(flatten)]
    pub info: SourceInfo,
}

impl Source {
    /// A fresh, unanalyzed source for the given path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            info: SourceInfo::default(),
        }
    }

    /// Whether analysis recorded any error for this source.
    pub fn failed(&self) -> bool {
        !self.info.errors.is_empty()
    }

    /// Locate a dimension by name.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.info.dimensions.iter().find(|d| d.name == name)
    }
}
