use crate::{ExportConfig, ExportError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use timeline::{Clip, Fps, Frame, Timecode, Timeline, TrackKind, Transition, TransitionKind};
use tracing::{debug, info, warn};

const DEFAULT_TITLE: &str = "Imported Timeline";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdlOptions {
    /// Write `D` / `W000` edit types for dissolves and wipes instead of `C`.
    #[serde(default)]
    pub emit_transitions: bool,
}

/// Export timeline to EDL format
pub fn export_edl(timeline: &Timeline, config: &ExportConfig) -> Result<(), ExportError> {
    let edl_content = generate_edl(timeline, &config.edl);
    std::fs::write(&config.output_path, edl_content)?;
    info!("wrote EDL {}", config.output_path.display());
    Ok(())
}

/// Import timeline from EDL file; `None` when the file cannot be read.
pub fn import_edl(path: &Path, fps: Fps) -> Option<Timeline> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_edl(&content, fps),
        Err(e) => {
            warn!("cannot read EDL {}: {e}", path.display());
            None
        }
    }
}

pub fn generate_edl(timeline: &Timeline, options: &EdlOptions) -> String {
    let mut edl = String::new();

    // EDL header
    edl.push_str(&format!("TITLE: {}\n", timeline.name));
    edl.push_str("FCM: NON-DROP FRAME\n");

    for (index, (kind, clip)) in timeline.clips_with_kind().into_iter().enumerate() {
        let edit = if options.emit_transitions {
            edit_type(timeline, &clip.name)
        } else {
            "C".to_string()
        };

        edl.push('\n');
        edl.push_str(&format!(
            "{:03}  {:<8} {:<5} {}\n",
            index + 1,
            reel_name(&clip.name),
            track_field(kind, clip.track),
            edit
        ));
        edl.push_str(&format!(
            "{} {} {} {}\n",
            timecode_fields(&clip.source_in),
            timecode_fields(&clip.source_out),
            timecode_fields(&clip.record_in),
            timecode_fields(&clip.record_out)
        ));
        if !clip.source_path.is_empty() {
            edl.push_str(&format!("* FROM CLIP NAME: {}\n", clip.source_path));
        }
        if !clip.notes.is_empty() {
            edl.push_str(&format!("* COMMENT: {}\n", clip.notes));
        }
    }

    edl
}

/// First eight characters of the name, uppercased; `AX` for unnamed clips.
fn reel_name(name: &str) -> String {
    let reel: String = name.chars().take(8).collect::<String>().to_uppercase();
    if reel.trim().is_empty() {
        "AX".to_string()
    } else {
        reel.replace(char::is_whitespace, "_")
    }
}

fn track_field(kind: TrackKind, number: u32) -> String {
    if number > 1 {
        format!("{}{}", kind.letter(), number)
    } else {
        kind.letter().to_string()
    }
}

fn timecode_fields(tc: &Timecode) -> String {
    format!(
        "{:02} {:02} {:02} {:02}",
        tc.hours(),
        tc.minutes(),
        tc.seconds(),
        tc.frames()
    )
}

/// Edit type for the event that brings in `clip_name`.
fn edit_type(timeline: &Timeline, clip_name: &str) -> String {
    let incoming = timeline
        .transitions
        .iter()
        .find(|t| t.to_clip.refers_to(clip_name));
    match incoming {
        Some(t) if t.kind == TransitionKind::Dissolve => format!("D    {:03}", t.duration),
        Some(t) if t.kind == TransitionKind::Wipe => format!("W000 {:03}", t.duration),
        _ => "C".to_string(),
    }
}

/// A line whose first token is exactly three digits.
pub(crate) fn is_event_line(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|t| t.len() == 3 && t.bytes().all(|b| b.is_ascii_digit()))
}

fn timecode_pattern() -> Result<Regex, ExportError> {
    let field = r"(\d{2})";
    let fields = vec![field; 16].join(r"[\s:;.]+");
    Ok(Regex::new(&format!(r"^\s*{fields}\s*$"))?)
}

struct EventHeader {
    number: String,
    reel: String,
    kind: TrackKind,
    track: u32,
    transition: Option<(TransitionKind, Frame)>,
}

impl EventHeader {
    fn parse(line: &str) -> Option<Self> {
        if !is_event_line(line) {
            return None;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let number = tokens[0].to_string();
        let reel = tokens.get(1).copied().unwrap_or("AX").to_string();
        let (kind, track) = tokens
            .get(2)
            .map(|t| parse_track_field(t))
            .unwrap_or((TrackKind::Video, 1));

        let duration = tokens
            .get(4)
            .and_then(|d| d.parse::<Frame>().ok())
            .unwrap_or(0);
        let transition = match tokens.get(3).copied() {
            Some("D") => Some((TransitionKind::Dissolve, duration)),
            Some(w) if w.starts_with('W') => Some((TransitionKind::Wipe, duration)),
            _ => None,
        };

        Some(Self {
            number,
            reel,
            kind,
            track,
            transition,
        })
    }
}

fn parse_track_field(field: &str) -> (TrackKind, u32) {
    let upper = field.to_ascii_uppercase();
    let kind = if upper.starts_with('A') {
        TrackKind::Audio
    } else {
        TrackKind::Video
    };
    let digits: String = upper.chars().filter(|c| c.is_ascii_digit()).collect();
    let number = digits.parse::<u32>().ok().filter(|n| *n > 0).unwrap_or(1);
    (kind, number)
}

fn timecode_from(caps: &regex::Captures<'_>, group: usize, fps: Fps) -> Option<Timecode> {
    let field = |i: usize| caps.get(group + i).and_then(|m| m.as_str().parse::<u32>().ok());
    Timecode::new(field(1)?, field(2)?, field(3)?, field(4)?, fps, false).ok()
}

/// Tolerant parse; malformed events are skipped, never fatal.
pub fn parse_edl(content: &str, fps: Fps) -> Option<Timeline> {
    match try_parse_edl(content, fps) {
        Ok(timeline) => Some(timeline),
        Err(e) => {
            warn!("rejected EDL: {e}");
            None
        }
    }
}

/// Clip names come from the reel column, so names longer than eight
/// characters come back truncated and uppercased. Repeated reels get the
/// event number appended.
pub fn try_parse_edl(content: &str, fps: Fps) -> Result<Timeline, ExportError> {
    let pattern = timecode_pattern()?;
    let lines: Vec<&str> = content.lines().collect();

    let mut name = DEFAULT_TITLE.to_string();
    let mut events: Vec<(TrackKind, u32, Clip)> = Vec::new();
    let mut transitions = Vec::new();
    let mut last_on_track: HashMap<(TrackKind, u32), String> = HashMap::new();
    let mut used_names = HashSet::new();
    let mut current: Option<usize> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;

        if line.is_empty() {
            current = None;
            continue;
        }
        if let Some(title) = line.strip_prefix("TITLE:") {
            let title = title.trim();
            if !title.is_empty() {
                name = title.to_string();
            }
            continue;
        }

        if let Some(header) = EventHeader::parse(line) {
            current = None;
            let Some(caps) = lines.get(i).and_then(|l| pattern.captures(l)) else {
                debug!("skipping EDL event {}: no timecode line", header.number);
                continue;
            };
            i += 1;

            let times = (
                timecode_from(&caps, 0, fps),
                timecode_from(&caps, 4, fps),
                timecode_from(&caps, 8, fps),
                timecode_from(&caps, 12, fps),
            );
            let (Some(source_in), Some(source_out), Some(record_in), Some(record_out)) = times else {
                debug!("skipping EDL event {}: timecode out of range", header.number);
                continue;
            };

            let clip_name = if used_names.contains(&header.reel) {
                format!("{}_{}", header.reel, header.number)
            } else {
                header.reel.clone()
            };
            used_names.insert(clip_name.clone());

            let clip = Clip::new(
                clip_name.clone(),
                "",
                source_in,
                source_out,
                record_in,
                record_out,
            );

            let key = (header.kind, header.track);
            if let Some((kind, duration)) = header.transition {
                match last_on_track.get(&key) {
                    Some(previous) => transitions.push(Transition::new(
                        kind,
                        duration,
                        previous.clone(),
                        clip_name.clone(),
                    )),
                    None => debug!("EDL event {} has no outgoing clip", header.number),
                }
            }
            last_on_track.insert(key, clip_name);

            events.push((header.kind, header.track, clip));
            current = Some(events.len() - 1);
            continue;
        }

        if let Some(remark) = line.strip_prefix('*') {
            let Some(index) = current else { continue };
            let clip = &mut events[index].2;
            let remark = remark.trim();
            if let Some(path) = remark.strip_prefix("FROM CLIP NAME:") {
                clip.source_path = path.trim().to_string();
            } else if let Some(comment) = remark.strip_prefix("COMMENT:") {
                clip.notes = comment.trim().to_string();
            }
        }
    }

    let mut timeline = Timeline::new(name, fps);
    for (kind, track, clip) in events {
        timeline.add_clip(clip, kind, track);
    }
    timeline.transitions = transitions;
    Ok(timeline)
}
