use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use timeline::{Fps, Timeline, TimelineError, DEFAULT_FPS};
use tracing::{info, warn};

pub mod aaf;
pub mod cutlist;
pub mod edl;
pub mod fcpxml;
pub mod otio;

pub use edl::EdlOptions;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timeline error: {0}")]
    Timeline(#[from] TimelineError),
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// Supported interchange formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Edl,
    FcpXml,
    Otio,
    CutList,
    /// JSON placeholder standing in for AAF; not readable by Avid tools.
    Aaf,
    /// Canonical serialized timeline.
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 6] = [
        ExportFormat::Edl,
        ExportFormat::FcpXml,
        ExportFormat::Otio,
        ExportFormat::CutList,
        ExportFormat::Aaf,
        ExportFormat::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Edl => "edl",
            ExportFormat::FcpXml => "fcpxml",
            ExportFormat::Otio => "otio",
            ExportFormat::CutList => "cut_list",
            ExportFormat::Aaf => "aaf",
            ExportFormat::Json => "json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Edl => "edl",
            ExportFormat::FcpXml => "fcpxml",
            ExportFormat::Otio => "otio",
            ExportFormat::CutList => "cutlist.json",
            ExportFormat::Aaf => "aaf.json",
            ExportFormat::Json => "json",
        }
    }

    /// Guess from an output path; `None` for unknown extensions.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".cutlist.json") {
            return Some(ExportFormat::CutList);
        }
        if name.ends_with(".aaf.json") || name.ends_with(".aaf") {
            return Some(ExportFormat::Aaf);
        }
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "edl" => Some(ExportFormat::Edl),
            "fcpxml" | "xml" => Some(ExportFormat::FcpXml),
            "otio" => Some(ExportFormat::Otio),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "edl" => Ok(ExportFormat::Edl),
            "fcpxml" | "xml" => Ok(ExportFormat::FcpXml),
            "otio" => Ok(ExportFormat::Otio),
            "cut_list" | "cutlist" => Ok(ExportFormat::CutList),
            "aaf" => Ok(ExportFormat::Aaf),
            "json" => Ok(ExportFormat::Json),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub output_path: PathBuf,
    /// Rate assumed when reading formats that do not carry one (EDL, cut list).
    #[serde(default)]
    pub fps: Fps,
    #[serde(default)]
    pub edl: EdlOptions,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

impl ExportConfig {
    pub fn new(format: ExportFormat, output_path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            output_path: output_path.into(),
            fps: DEFAULT_FPS,
            edl: EdlOptions::default(),
            width: default_width(),
            height: default_height(),
        }
    }

    pub fn with_fps(mut self, fps: Fps) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_edl_options(mut self, edl: EdlOptions) -> Self {
        self.edl = edl;
        self
    }
}

/// Main exporter struct
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export timeline to the configured path
    pub fn export_timeline(&self, timeline: &Timeline) -> Result<()> {
        let path = self.config.output_path.as_path();
        let written = match self.config.format {
            ExportFormat::Edl => edl::export_edl(timeline, &self.config),
            ExportFormat::FcpXml => fcpxml::export_fcpxml(timeline, &self.config),
            ExportFormat::Otio => otio::export_otio(timeline, path),
            ExportFormat::CutList => cutlist::export_cut_list(timeline, path),
            ExportFormat::Aaf => aaf::export_aaf(timeline, path),
            ExportFormat::Json => export_json(timeline, path),
        };
        written.with_context(|| {
            format!("writing {} as {} to {}", timeline.name, self.config.format, path.display())
        })?;
        info!(
            "exported {} ({} clips) to {} as {}",
            timeline.name,
            timeline.clip_count(),
            self.config.output_path.display(),
            self.config.format
        );
        Ok(())
    }

    pub fn import_timeline(&self, path: &Path) -> Result<Timeline> {
        import_timeline(path, self.config.fps)
    }
}

fn export_json(timeline: &Timeline, path: &Path) -> std::result::Result<(), ExportError> {
    std::fs::write(path, timeline.to_json()?)?;
    Ok(())
}

/// Read any supported document, detecting its format from the content.
pub fn import_timeline(path: &Path, fps: Fps) -> Result<Timeline> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let format = detect_format_str(&content)
        .ok_or_else(|| ExportError::UnsupportedFormat(format!("{}", path.display())))?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Imported Timeline");

    let parsed = match format {
        DetectedFormat::Edl => edl::parse_edl(&content, fps),
        DetectedFormat::FcpXml => fcpxml::parse_fcpxml(&content),
        DetectedFormat::Xml => {
            return Err(ExportError::UnsupportedFormat("generic XML".to_string()).into())
        }
        DetectedFormat::Otio => otio::parse_otio(&content),
        DetectedFormat::Json => parse_json_document(&content, stem, fps),
    };

    let timeline = parsed.ok_or_else(|| {
        ExportError::InvalidDocument(format!("{} could not be read as {format:?}", path.display()))
    })?;
    info!(
        "imported {} ({} clips) from {}",
        timeline.name,
        timeline.clip_count(),
        path.display()
    );
    Ok(timeline)
}

/// Route generic JSON: an array is a cut list, `format: "AAF"` the AAF
/// placeholder, anything else the canonical timeline.
pub fn parse_json_document(content: &str, name: &str, fps: Fps) -> Option<Timeline> {
    let value: serde_json::Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            warn!("rejected JSON document: {e}");
            return None;
        }
    };

    if value.is_array() {
        return cutlist::parse_cut_list(content, name, fps);
    }
    if value.get("format").and_then(|f| f.as_str()) == Some(aaf::AAF_FORMAT_TAG) {
        return aaf::parse_aaf_json(content);
    }
    match serde_json::from_value::<Timeline>(value) {
        Ok(mut timeline) => {
            timeline.refresh_duration();
            Some(timeline)
        }
        Err(e) => {
            warn!("JSON is not a serialized timeline: {e}");
            None
        }
    }
}

/// Formats `detect_format` can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    Edl,
    FcpXml,
    /// XML that is not FCPXML.
    Xml,
    Otio,
    Json,
}

/// Sniff a file. Unreadable or unrecognised input yields `None`.
pub fn detect_format(path: &Path) -> Option<DetectedFormat> {
    let content = std::fs::read_to_string(path).ok()?;
    detect_format_str(&content)
}

pub fn detect_format_str(content: &str) -> Option<DetectedFormat> {
    let first = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    if first.starts_with("TITLE:") || edl::is_event_line(first) {
        return Some(DetectedFormat::Edl);
    }

    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("<?xml") {
        return Some(if trimmed.contains("<fcpxml") {
            DetectedFormat::FcpXml
        } else {
            DetectedFormat::Xml
        });
    }

    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    if value.get("OTIO_SCHEMA").is_some() {
        Some(DetectedFormat::Otio)
    } else {
        Some(DetectedFormat::Json)
    }
}

/// Asset relinking utilities
pub mod relinking {
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};
    use timeline::Timeline;
    use tracing::debug;
    use walkdir::WalkDir;

    /// Map clip names to files under `search_paths` whose file name matches
    /// the clip's current source file name. The first hit wins.
    pub fn build_relink_map(timeline: &Timeline, search_paths: &[PathBuf]) -> HashMap<String, String> {
        let index = index_files(search_paths);
        let mut map = HashMap::new();

        for clip in timeline.get_all_clips() {
            let Some(file_name) = Path::new(&clip.source_path).file_name() else {
                continue;
            };
            match index.get(file_name) {
                Some(found) => {
                    map.insert(clip.name.clone(), found.to_string_lossy().into_owned());
                }
                None => debug!("no match for {} ({})", clip.name, clip.source_path),
            }
        }
        map
    }

    fn index_files(search_paths: &[PathBuf]) -> HashMap<OsString, PathBuf> {
        let mut index = HashMap::new();
        for search_path in search_paths {
            for entry in WalkDir::new(search_path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                index
                    .entry(entry.file_name().to_os_string())
                    .or_insert_with(|| entry.path().to_path_buf());
            }
        }
        index
    }
}

// Custom serialization for ExportFormat
impl Serialize for ExportFormat {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExportFormat {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::unknown_variant(&s, &["edl", "fcpxml", "otio", "cut_list", "aaf", "json"])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_str() {
        assert_eq!(detect_format_str("TITLE: X\nFCM: NON-DROP FRAME\n"), Some(DetectedFormat::Edl));
        assert_eq!(detect_format_str("\n\n001  AX V     C\n"), Some(DetectedFormat::Edl));
        assert_eq!(
            detect_format_str("<?xml version=\"1.0\"?>\n<fcpxml version=\"1.9\"/>"),
            Some(DetectedFormat::FcpXml)
        );
        assert_eq!(detect_format_str("<?xml version=\"1.0\"?>\n<xmeml/>"), Some(DetectedFormat::Xml));
        assert_eq!(detect_format_str("{\"OTIO_SCHEMA\": \"Timeline.1\"}"), Some(DetectedFormat::Otio));
        assert_eq!(detect_format_str("[1, 2]"), Some(DetectedFormat::Json));
        assert_eq!(detect_format_str("not a timeline"), None);
        assert_eq!(detect_format_str("   \n"), None);
    }

    #[test]
    fn test_format_names() {
        for format in ExportFormat::ALL {
            assert_eq!(format.as_str().parse::<ExportFormat>().unwrap(), format);
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(serde_json::from_str::<ExportFormat>(&json).unwrap(), format);
        }
        assert!("aaf2".parse::<ExportFormat>().is_err());
        assert!(serde_json::from_str::<ExportFormat>("\"mov\"").is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("cut.edl")), Some(ExportFormat::Edl));
        assert_eq!(ExportFormat::from_path(Path::new("a/b.cutlist.json")), Some(ExportFormat::CutList));
        assert_eq!(ExportFormat::from_path(Path::new("b.AAF.json")), Some(ExportFormat::Aaf));
        assert_eq!(ExportFormat::from_path(Path::new("b.json")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("b.mov")), None);
    }

    #[test]
    fn test_config_defaults() {
        let config: ExportConfig =
            serde_json::from_str(r#"{"format": "otio", "output_path": "/tmp/out.otio"}"#).unwrap();
        assert_eq!(config.format, ExportFormat::Otio);
        assert_eq!(config.fps, DEFAULT_FPS);
        assert_eq!((config.width, config.height), (1920, 1080));
        assert!(!config.edl.emit_transitions);
    }
}
