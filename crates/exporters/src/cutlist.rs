use crate::ExportError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use timeline::{Clip, Fps, Frame, Timecode, Timeline, TrackKind};
use tracing::{debug, info, warn};

/// One edit of a flat cut list. Frame fields are authoritative on read; the
/// timecode strings are for people.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutListEntry {
    pub edit_number: usize,
    pub clip_name: String,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub source_in: String,
    #[serde(default)]
    pub source_out: String,
    pub source_in_frames: Frame,
    pub source_out_frames: Frame,
    #[serde(default)]
    pub record_in: String,
    #[serde(default)]
    pub record_out: String,
    pub record_in_frames: Frame,
    pub record_out_frames: Frame,
    #[serde(default)]
    pub duration_frames: Frame,
    #[serde(default = "default_track")]
    pub track: u32,
    #[serde(default)]
    pub track_type: TrackKind,
    #[serde(default)]
    pub scene: String,
    #[serde(default)]
    pub take: String,
    #[serde(default)]
    pub notes: String,
}

fn default_track() -> u32 {
    1
}

impl CutListEntry {
    fn from_clip(edit_number: usize, kind: TrackKind, clip: &Clip) -> Self {
        Self {
            edit_number,
            clip_name: clip.name.clone(),
            source_file: clip.source_path.clone(),
            source_in: clip.source_in.to_string(),
            source_out: clip.source_out.to_string(),
            source_in_frames: clip.source_in.to_frames(),
            source_out_frames: clip.source_out.to_frames(),
            record_in: clip.record_in.to_string(),
            record_out: clip.record_out.to_string(),
            record_in_frames: clip.record_in.to_frames(),
            record_out_frames: clip.record_out.to_frames(),
            duration_frames: clip.duration(),
            track: clip.track,
            track_type: kind,
            scene: clip.scene.clone(),
            take: clip.take.clone(),
            notes: clip.notes.clone(),
        }
    }

    fn to_clip(&self, fps: Fps) -> Clip {
        let tc = |frames: Frame| Timecode::from_frames(frames, fps);
        Clip::new(
            self.clip_name.as_str(),
            self.source_file.as_str(),
            tc(self.source_in_frames),
            tc(self.source_out_frames),
            tc(self.record_in_frames),
            tc(self.record_out_frames),
        )
        .with_scene(self.scene.as_str())
        .with_take(self.take.as_str())
        .with_notes(self.notes.as_str())
    }
}

/// One entry per clip, numbered from 1 in `get_all_clips` order.
pub fn generate_cut_list(timeline: &Timeline) -> Vec<CutListEntry> {
    timeline
        .clips_with_kind()
        .into_iter()
        .enumerate()
        .map(|(i, (kind, clip))| CutListEntry::from_clip(i + 1, kind, clip))
        .collect()
}

pub fn generate_cut_list_json(timeline: &Timeline) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&generate_cut_list(timeline))?)
}

pub fn export_cut_list(timeline: &Timeline, path: &Path) -> Result<(), ExportError> {
    std::fs::write(path, generate_cut_list_json(timeline)?)?;
    info!("wrote cut list {}", path.display());
    Ok(())
}

/// Rebuild a timeline from cut-list JSON. The list carries no name or rate,
/// so both are supplied.
pub fn parse_cut_list(content: &str, name: &str, fps: Fps) -> Option<Timeline> {
    match try_parse_cut_list(content, name, fps) {
        Ok(timeline) => Some(timeline),
        Err(e) => {
            warn!("rejected cut list: {e}");
            None
        }
    }
}

pub fn try_parse_cut_list(content: &str, name: &str, fps: Fps) -> Result<Timeline, ExportError> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(content)?;
    let mut timeline = Timeline::new(name, fps);

    for (index, value) in entries.into_iter().enumerate() {
        match serde_json::from_value::<CutListEntry>(value) {
            Ok(entry) => {
                let clip = entry.to_clip(fps);
                timeline.add_clip(clip, entry.track_type, entry.track.max(1));
            }
            Err(e) => debug!("skipping cut list entry {}: {e}", index + 1),
        }
    }
    Ok(timeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline::DEFAULT_FPS;

    fn sample() -> Timeline {
        let mut timeline = Timeline::new("Cuts", DEFAULT_FPS);
        timeline.add_clip(
            Clip::from_frames("A", "/a.mov", 24, 124, 0, DEFAULT_FPS).with_scene("4").with_take("2"),
            TrackKind::Video,
            1,
        );
        timeline.add_clip(Clip::from_frames("M", "/m.wav", 0, 200, 0, DEFAULT_FPS), TrackKind::Audio, 2);
        timeline
    }

    #[test]
    fn test_entry_fields() {
        let entries = generate_cut_list(&sample());
        assert_eq!(entries.len(), 2);

        let a = &entries[0];
        assert_eq!(a.edit_number, 1);
        assert_eq!(a.source_in, "00:00:01:00");
        assert_eq!((a.source_in_frames, a.source_out_frames), (24, 124));
        assert_eq!(a.record_out, "00:00:04:04");
        assert_eq!(a.duration_frames, 100);
        assert_eq!((a.scene.as_str(), a.take.as_str()), ("4", "2"));
        assert_eq!((entries[1].track, entries[1].track_type), (2, TrackKind::Audio));
    }

    #[test]
    fn test_round_trip() {
        let original = sample();
        let json = generate_cut_list_json(&original).unwrap();
        let parsed = parse_cut_list(&json, "Cuts", DEFAULT_FPS).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let json = r#"[
            {"edit_number": 1, "clip_name": "ok", "source_in_frames": 0, "source_out_frames": 10,
             "record_in_frames": 0, "record_out_frames": 10},
            {"edit_number": 2, "clip_name": "broken"}
        ]"#;
        let parsed = parse_cut_list(json, "Partial", DEFAULT_FPS).unwrap();
        assert_eq!(parsed.clip_count(), 1);
        assert!(parse_cut_list("{}", "Nope", DEFAULT_FPS).is_none());
    }
}
