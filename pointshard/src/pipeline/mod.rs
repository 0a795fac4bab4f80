//! Pipeline document model.
//!
//! A read pipeline is described as a JSON array of stage objects, each
//! carrying a `"type"` discriminator (the leading reader stage may omit it).
//! This module assembles the analysis pipeline used to extract per-source
//! metadata: reader SRS injection, an optional reprojection stage, and a
//! terminal statistics stage. Stage lookup is a tagged-document
//! search-or-insert against the ordered list: no reflection, just a linear
//! scan plus append.

mod error;

pub use error::PipelineError;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Stage discriminator for the reprojection filter.
pub const REPROJECTION_STAGE: &str = "filters.reprojection";

/// Stage discriminator for the statistics filter.
pub const STATS_STAGE: &str = "filters.stats";

/// A coordinate-system transformation request for ingestion.
///
/// `in_srs` may be empty, meaning the input system is taken from each file.
/// With `hammer` set, `in_srs` overrides whatever the file declares;
/// otherwise it is only a default for files that declare none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reprojection {
    #[serde(rename = "in", default)]
    pub in_srs: String,
    #[serde(rename = "out")]
    pub out_srs: String,
    #[serde(default)]
    pub hammer: bool,
}

impl Reprojection {
    /// Reproject to `out_srs`, trusting each file's own input system.
    pub fn to(out_srs: impl Into<String>) -> Self {
        Self {
            in_srs: String::new(),
            out_srs: out_srs.into(),
            hammer: false,
        }
    }

    /// Reproject from `in_srs` to `out_srs`.
    pub fn new(in_srs: impl Into<String>, out_srs: impl Into<String>, hammer: bool) -> Self {
        Self {
            in_srs: in_srs.into(),
            out_srs: out_srs.into(),
            hammer,
        }
    }
}

/// Find the stage whose `"type"` matches, appending `{"type": ...}` if none
/// does. Returns a mutable handle either way.
pub fn find_or_append_stage<'a>(stages: &'a mut Vec<Value>, stage_type: &str) -> &'a mut Value {
    let position = stages
        .iter()
        .position(|stage| stage.get("type").and_then(Value::as_str) == Some(stage_type));

    let index = match position {
        Some(index) => index,
        None => {
            stages.push(json!({ "type": stage_type }));
            stages.len() - 1
        }
    };

    &mut stages[index]
}

/// Build the metadata-analysis pipeline from a template.
///
/// Accepts either a raw stage array or an object wrapping one under
/// `"pipeline"`. The reader (first stage) gains the reprojection input SRS
/// as `override_srs` or `default_srs` when requested; a
/// `filters.reprojection` stage is inserted or updated with the output SRS;
/// and a `filters.stats` stage is ensured at the end, enumerating the
/// classification dimension unless already configured. The operation is
/// idempotent: reassembling its own output changes nothing.
pub fn create_info_pipeline(
    template: Value,
    reprojection: Option<&Reprojection>,
) -> Result<Vec<Value>, PipelineError> {
    let template = match template {
        Value::Object(mut wrapper) => wrapper
            .remove("pipeline")
            .ok_or_else(|| PipelineError::InvalidTemplate("object lacks a pipeline key".into()))?,
        other => other,
    };

    let mut stages = match template {
        Value::Array(stages) if !stages.is_empty() => stages,
        other => return Err(PipelineError::InvalidTemplate(other.to_string())),
    };

    if let Some(stage) = stages.iter().find(|stage| !stage.is_object()) {
        return Err(PipelineError::InvalidTemplate(format!(
            "stage is not an object: {stage}"
        )));
    }

    if let Some(reprojection) = reprojection {
        // Set the input system on the reader first, if one was requested.
        if !reprojection.in_srs.is_empty() {
            let key = if reprojection.hammer {
                "override_srs"
            } else {
                "default_srs"
            };
            stages[0][key] = json!(reprojection.in_srs);
        }

        let stage = find_or_append_stage(&mut stages, REPROJECTION_STAGE);
        stage["out_srs"] = json!(reprojection.out_srs);
    }

    let stats = find_or_append_stage(&mut stages, STATS_STAGE);
    if stats.get("enumerate").is_none() {
        stats["enumerate"] = json!("Classification");
    }

    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_stats_stage_with_classification() {
        let stages = create_info_pipeline(json!([{ "type": "readers.las" }]), None).unwrap();

        assert_eq!(stages.len(), 2);
        assert_eq!(stages[1]["type"], "filters.stats");
        assert_eq!(stages[1]["enumerate"], "Classification");
    }

    #[test]
    fn test_idempotent_when_run_twice() {
        let once = create_info_pipeline(json!([{ "type": "readers.las" }]), None).unwrap();
        let twice = create_info_pipeline(Value::Array(once.clone()), None).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_keeps_existing_stats_configuration() {
        let stages = create_info_pipeline(
            json!([{ "type": "readers.las" }, { "type": "filters.stats", "enumerate": "Intensity" }]),
            None,
        )
        .unwrap();

        assert_eq!(stages.len(), 2);
        assert_eq!(stages[1]["enumerate"], "Intensity");
    }

    #[test]
    fn test_unwraps_pipeline_object() {
        let stages =
            create_info_pipeline(json!({ "pipeline": [{ "type": "readers.las" }] }), None).unwrap();
        assert_eq!(stages[0]["type"], "readers.las");
    }

    #[test]
    fn test_rejects_empty_and_non_array_templates() {
        assert!(create_info_pipeline(json!([]), None).is_err());
        assert!(create_info_pipeline(json!("readers.las"), None).is_err());
        assert!(create_info_pipeline(json!({ "reader": "las" }), None).is_err());
        assert!(create_info_pipeline(json!([{}, "not a stage"]), None).is_err());
    }

    #[test]
    fn test_reprojection_appends_stage_with_out_srs() {
        let repro = Reprojection::to("EPSG:3857");
        let stages =
            create_info_pipeline(json!([{ "type": "readers.las" }]), Some(&repro)).unwrap();

        assert_eq!(stages.len(), 3);
        assert_eq!(stages[1]["type"], "filters.reprojection");
        assert_eq!(stages[1]["out_srs"], "EPSG:3857");
        // No input SRS requested, so the reader is untouched.
        assert!(stages[0].get("default_srs").is_none());
        assert!(stages[0].get("override_srs").is_none());
    }

    #[test]
    fn test_reprojection_updates_existing_stage() {
        let repro = Reprojection::to("EPSG:3857");
        let stages = create_info_pipeline(
            json!([
                { "type": "readers.las" },
                { "type": "filters.reprojection", "out_srs": "EPSG:4978" },
            ]),
            Some(&repro),
        )
        .unwrap();

        assert_eq!(stages.len(), 3, "existing stage must be updated, not duplicated");
        assert_eq!(stages[1]["out_srs"], "EPSG:3857");
    }

    #[test]
    fn test_input_srs_default_vs_override() {
        let default = Reprojection::new("EPSG:4326", "EPSG:3857", false);
        let stages =
            create_info_pipeline(json!([{ "type": "readers.las" }]), Some(&default)).unwrap();
        assert_eq!(stages[0]["default_srs"], "EPSG:4326");

        let hammer = Reprojection::new("EPSG:4326", "EPSG:3857", true);
        let stages =
            create_info_pipeline(json!([{ "type": "readers.las" }]), Some(&hammer)).unwrap();
        assert_eq!(stages[0]["override_srs"], "EPSG:4326");
    }

    #[test]
    fn test_find_or_append_stage() {
        let mut stages = vec![json!({ "type": "readers.las" })];

        let appended = find_or_append_stage(&mut stages, "filters.stats");
        appended["enumerate"] = json!("Classification");
        assert_eq!(stages.len(), 2);

        let found = find_or_append_stage(&mut stages, "filters.stats");
        assert_eq!(found["enumerate"], "Classification");
        assert_eq!(stages.len(), 2);
    }

    #[test]
    fn test_reprojection_serde_names() {
        let repro: Reprojection =
            serde_json::from_str(r#"{"in": "EPSG:26915", "out": "EPSG:3857", "hammer": true}"#)
                .unwrap();
        assert_eq!(repro.in_srs, "EPSG:26915");
        assert_eq!(repro.out_srs, "EPSG:3857");
        assert!(repro.hammer);

        let minimal: Reprojection = serde_json::from_str(r#"{"out": "EPSG:3857"}"#).unwrap();
        assert!(minimal.in_srs.is_empty());
        assert!(!minimal.hammer);
    }
}
