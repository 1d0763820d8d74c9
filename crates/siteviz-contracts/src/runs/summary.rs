use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::now_utc_iso;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptOutput {
    pub concept: String,
    pub folder: String,
    pub images: Vec<String>,
    pub prompts_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSummary {
    pub session_id: String,
    pub provider: String,
    pub started_at: String,
    pub finished_at: String,
    pub source_width: u32,
    pub source_height: u32,
    pub mask_selected_pixels: u64,
    pub images_per_concept: u64,
    pub concepts: Vec<ConceptOutput>,
}

impl RenderSummary {
    pub fn total_images(&self) -> usize {
        self.concepts.iter().map(|concept| concept.images.len()).sum()
    }
}

pub fn write_summary(
    path: &Path,
    summary: &RenderSummary,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert(
        "total_images".to_string(),
        Value::Number(summary.total_images().into()),
    );
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}
