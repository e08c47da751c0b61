//! OpenTimelineIO JSON subset.
//!
//! Clips carry their absolute record position in `metadata.record_in`; when a
//! document lacks it (files from other tools), position is recovered by
//! summing the `Gap.1` and `Clip.1` items that precede the clip.

use crate::ExportError;
use serde_json::{json, Value};
use std::path::Path;
use timeline::{Clip, Fps, Frame, Timecode, Timeline, Track, TrackKind, Transition, TransitionKind};
use tracing::{debug, info, warn};

pub fn export_otio(timeline: &Timeline, path: &Path) -> Result<(), ExportError> {
    std::fs::write(path, generate_otio(timeline)?)?;
    info!("wrote OTIO {}", path.display());
    Ok(())
}

fn rational_time(frames: Frame, rate: f64) -> Value {
    json!({
        "OTIO_SCHEMA": "RationalTime.1",
        "rate": rate,
        "value": frames as f64,
    })
}

fn time_range(start: Frame, duration: Frame, rate: f64) -> Value {
    json!({
        "OTIO_SCHEMA": "TimeRange.1",
        "start_time": rational_time(start, rate),
        "duration": rational_time(duration, rate),
    })
}

fn gap(duration: Frame, rate: f64) -> Value {
    json!({
        "OTIO_SCHEMA": "Gap.1",
        "name": "",
        "source_range": time_range(0, duration, rate),
    })
}

fn transition_type(kind: TransitionKind) -> &'static str {
    match kind {
        TransitionKind::Dissolve => "SMPTE_Dissolve",
        _ => "Custom_Transition",
    }
}

fn clip_value(clip: &Clip, rate: f64) -> Value {
    let source = clip.source_range();
    json!({
        "OTIO_SCHEMA": "Clip.1",
        "name": clip.name,
        "source_range": time_range(source.start, source.duration, rate),
        "media_reference": {
            "OTIO_SCHEMA": "ExternalReference.1",
            "target_url": clip.source_path,
            "available_range": time_range(source.start, source.duration, rate),
        },
        "enabled": clip.enabled,
        "metadata": {
            "scene": clip.scene,
            "take": clip.take,
            "notes": clip.notes,
            "record_in": clip.record_in.to_frames(),
            "locked": clip.locked,
        },
    })
}

fn transition_value(transition: &Transition, rate: f64) -> Value {
    let half = transition.duration / 2;
    json!({
        "OTIO_SCHEMA": "Transition.1",
        "name": "",
        "transition_type": transition_type(transition.kind),
        "in_offset": rational_time(half, rate),
        "out_offset": rational_time(transition.duration - half, rate),
        "metadata": {
            "kind": transition.kind.as_str(),
            "from_clip": transition.from_clip.name(),
            "to_clip": transition.to_clip.name(),
            "wipe_direction": transition.wipe_direction,
        },
    })
}

fn track_value(timeline: &Timeline, track: &Track, rate: f64) -> Value {
    let mut children = Vec::new();
    let mut cursor = 0;

    for clip in &track.clips {
        let record = clip.record_range();
        if record.start > cursor {
            children.push(gap(record.start - cursor, rate));
        }
        children.push(clip_value(clip, rate));
        cursor = cursor.max(record.end());

        for transition in timeline
            .transitions
            .iter()
            .filter(|t| t.kind != TransitionKind::Cut && t.from_clip.refers_to(&clip.name))
        {
            children.push(transition_value(transition, rate));
        }
    }

    let kind = match track.kind {
        TrackKind::Video => "Video",
        TrackKind::Audio => "Audio",
    };
    json!({
        "OTIO_SCHEMA": "Track.1",
        "name": track.name,
        "kind": kind,
        "children": children,
        "metadata": { "number": track.number },
    })
}

pub fn generate_otio(timeline: &Timeline) -> Result<String, ExportError> {
    let rate = timeline.fps.as_f64();
    let tracks: Vec<Value> = timeline
        .all_tracks()
        .map(|track| track_value(timeline, track, rate))
        .collect();

    let document = json!({
        "OTIO_SCHEMA": "Timeline.1",
        "name": timeline.name,
        "global_start_time": rational_time(timeline.start_timecode.to_frames(), rate),
        "metadata": { "frame_rate": rate },
        "tracks": {
            "OTIO_SCHEMA": "Stack.1",
            "name": "tracks",
            "children": tracks,
        },
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Schema-gated parse; anything but a `Timeline.*` document yields `None`.
pub fn parse_otio(content: &str) -> Option<Timeline> {
    match try_parse_otio(content) {
        Ok(timeline) => Some(timeline),
        Err(e) => {
            warn!("rejected OTIO document: {e}");
            None
        }
    }
}

fn schema_of(value: &Value) -> &str {
    value.get("OTIO_SCHEMA").and_then(Value::as_str).unwrap_or("")
}

/// A time value in frames at `rate`. Accepts a `RationalTime` object or a
/// bare number measured at `fallback_rate`.
fn frames_of(value: &Value, fallback_rate: f64, rate: f64) -> Option<Frame> {
    let (v, r) = match value {
        Value::Number(n) => (n.as_f64()?, fallback_rate),
        Value::Object(_) => (
            value.get("value")?.as_f64()?,
            value.get("rate").and_then(Value::as_f64).unwrap_or(fallback_rate),
        ),
        _ => return None,
    };
    if r <= 0.0 {
        return None;
    }
    Some((v * rate / r).round() as Frame)
}

/// `(start, duration)` in frames from a `TimeRange`.
fn range_of(value: &Value, rate: f64) -> Option<(Frame, Frame)> {
    let sibling_rate = value.get("rate").and_then(Value::as_f64).unwrap_or(rate);
    let start = value
        .get("start_time")
        .map_or(Some(0), |v| frames_of(v, sibling_rate, rate))?;
    let duration = frames_of(value.get("duration")?, sibling_rate, rate)?;
    Some((start, duration))
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

struct PendingTransition {
    kind: TransitionKind,
    duration: Frame,
    from: Option<String>,
    to: Option<String>,
    wipe_direction: Option<String>,
}

impl PendingTransition {
    fn from_item(item: &Value, previous: Option<&String>, rate: f64) -> Self {
        let metadata = item.get("metadata").unwrap_or(&Value::Null);
        let kind = metadata
            .get("kind")
            .and_then(Value::as_str)
            .and_then(TransitionKind::parse_lenient)
            .unwrap_or(match item.get("transition_type").and_then(Value::as_str) {
                Some("SMPTE_Dissolve") | None => TransitionKind::Dissolve,
                Some(other) => TransitionKind::parse_lenient(other).unwrap_or(TransitionKind::Dissolve),
            });
        let offset = |key: &str| item.get(key).and_then(|v| frames_of(v, rate, rate)).unwrap_or(0);
        let from = metadata
            .get("from_clip")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| previous.cloned());
        let to = metadata.get("to_clip").and_then(Value::as_str).map(str::to_string);

        Self {
            kind,
            duration: offset("in_offset") + offset("out_offset"),
            from,
            to,
            wipe_direction: metadata.get("wipe_direction").and_then(Value::as_str).map(str::to_string),
        }
    }
}

pub fn try_parse_otio(content: &str) -> Result<Timeline, ExportError> {
    let root: Value = serde_json::from_str(content)?;
    let schema = schema_of(&root);
    if !schema.starts_with("Timeline") {
        return Err(ExportError::InvalidDocument(format!(
            "unsupported OTIO schema {schema:?}"
        )));
    }

    let rate = root
        .get("metadata")
        .and_then(|m| m.get("frame_rate"))
        .and_then(Value::as_f64)
        .unwrap_or(24.0);
    let fps = Fps::from_f64(rate);
    let rate = fps.as_f64();

    let name = root
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or("Imported Timeline");
    let mut timeline = Timeline::new(name, fps);
    if let Some(start) = root.get("global_start_time").and_then(|v| frames_of(v, rate, rate)) {
        timeline.start_timecode = Timecode::from_frames(start, fps);
    }

    let stack = root.get("tracks").unwrap_or(&Value::Null);
    let children = stack
        .get("children")
        .or(Some(stack))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut transitions = Vec::new();
    let (mut video_count, mut audio_count) = (0u32, 0u32);

    for track_value in children.iter().filter(|t| schema_of(t).starts_with("Track")) {
        let kind = match track_value.get("kind").and_then(Value::as_str) {
            Some("Audio") => TrackKind::Audio,
            _ => TrackKind::Video,
        };
        let counter = match kind {
            TrackKind::Video => &mut video_count,
            TrackKind::Audio => &mut audio_count,
        };
        *counter += 1;
        let number = track_value
            .get("metadata")
            .and_then(|m| m.get("number"))
            .and_then(Value::as_u64)
            .map(|n| n as u32)
            .filter(|n| *n > 0)
            .unwrap_or(*counter);

        let track = timeline.ensure_track(kind, number);
        let track_name = text(track_value, "name");
        if !track_name.is_empty() {
            track.name = track_name;
        }

        let mut cursor: Frame = 0;
        let mut previous: Option<String> = None;
        let mut pending: Vec<PendingTransition> = Vec::new();
        let items = track_value
            .get("children")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for item in items {
            let item_schema = schema_of(item);
            if item_schema.starts_with("Gap") {
                if let Some((_, duration)) = item.get("source_range").and_then(|r| range_of(r, rate)) {
                    cursor += duration;
                }
            } else if item_schema.starts_with("Transition") {
                pending.push(PendingTransition::from_item(item, previous.as_ref(), rate));
            } else if item_schema.starts_with("Clip") {
                let Some((source_in, duration)) = item.get("source_range").and_then(|r| range_of(r, rate)) else {
                    debug!("skipping OTIO clip without source_range");
                    continue;
                };
                let metadata = item.get("metadata").unwrap_or(&Value::Null);
                let record_in = metadata
                    .get("record_in")
                    .and_then(Value::as_i64)
                    .unwrap_or(cursor);
                let clip_name = match item.get("name").and_then(Value::as_str) {
                    Some(n) if !n.is_empty() => n.to_string(),
                    _ => format!("Clip_{:03}", track.clips.len() + 1),
                };
                let source_path = item
                    .get("media_reference")
                    .map(|m| text(m, "target_url"))
                    .unwrap_or_default();

                let mut clip = Clip::new(
                    clip_name.clone(),
                    source_path,
                    Timecode::from_frames(source_in, fps),
                    Timecode::from_frames(source_in + duration, fps),
                    Timecode::from_frames(record_in, fps),
                    Timecode::from_frames(record_in + duration, fps),
                )
                .with_scene(text(metadata, "scene"))
                .with_take(text(metadata, "take"))
                .with_notes(text(metadata, "notes"))
                .locked(metadata.get("locked").and_then(Value::as_bool).unwrap_or(false));
                clip.enabled = item.get("enabled").and_then(Value::as_bool).unwrap_or(true);

                for waiting in pending.iter_mut().filter(|p| p.to.is_none()) {
                    waiting.to = Some(clip_name.clone());
                }
                track.add_clip(clip);
                cursor = record_in + duration;
                previous = Some(clip_name);
            }
        }
        transitions.extend(pending);
    }

    for pending in transitions {
        let (Some(from), Some(to)) = (pending.from, pending.to) else {
            debug!("dropping OTIO transition with a missing end");
            continue;
        };
        let mut transition = Transition::new(pending.kind, pending.duration, from, to);
        if let Some(direction) = pending.wipe_direction {
            transition = transition.with_wipe_direction(direction);
        }
        timeline.transitions.push(transition);
    }
    timeline.refresh_duration();
    Ok(timeline)
}
