//! JSON envelope standing in for AAF.
//!
//! Real AAF is a binary structured-storage container; this document only
//! wraps the canonical timeline and cannot be opened by Avid or other AAF
//! readers.

use crate::ExportError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use timeline::Timeline;
use tracing::{info, warn};

pub const AAF_FORMAT_TAG: &str = "AAF";
const AAF_VERSION: &str = "1.0";
const AAF_NOTE: &str = "Placeholder interchange document; not a binary AAF file.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AafDocument {
    pub format: String,
    pub version: String,
    #[serde(default)]
    pub note: String,
    pub timeline: Timeline,
}

impl AafDocument {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            format: AAF_FORMAT_TAG.to_string(),
            version: AAF_VERSION.to_string(),
            note: AAF_NOTE.to_string(),
            timeline,
        }
    }
}

pub fn generate_aaf_json(timeline: &Timeline) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&AafDocument::new(timeline.clone()))?)
}

pub fn export_aaf(timeline: &Timeline, path: &Path) -> Result<(), ExportError> {
    std::fs::write(path, generate_aaf_json(timeline)?)?;
    info!("wrote AAF placeholder {}", path.display());
    Ok(())
}

pub fn parse_aaf_json(content: &str) -> Option<Timeline> {
    match try_parse_aaf_json(content) {
        Ok(timeline) => Some(timeline),
        Err(e) => {
            warn!("rejected AAF placeholder: {e}");
            None
        }
    }
}

pub fn try_parse_aaf_json(content: &str) -> Result<Timeline, ExportError> {
    let document: AafDocument = serde_json::from_str(content)?;
    if document.format != AAF_FORMAT_TAG {
        return Err(ExportError::InvalidDocument(format!(
            "expected format {AAF_FORMAT_TAG}, found {}",
            document.format
        )));
    }
    let mut timeline = document.timeline;
    timeline.refresh_duration();
    Ok(timeline)
}
