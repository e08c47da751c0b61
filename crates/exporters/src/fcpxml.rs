use crate::{ExportConfig, ExportError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use timeline::{Clip, Fps, Frame, Timecode, Timeline, TrackKind, DEFAULT_FPS};
use tracing::{debug, info, warn};
use uuid::Uuid;

const FCPXML_VERSION: &str = "1.9";
const FORMAT_ID: &str = "r1";

/// Export timeline to FCPXML format
pub fn export_fcpxml(timeline: &Timeline, config: &ExportConfig) -> Result<(), ExportError> {
    let xml_content = generate_fcpxml(timeline, config)?;
    std::fs::write(&config.output_path, xml_content)?;
    info!("wrote FCPXML {}", config.output_path.display());
    Ok(())
}

/// `<frames * den>/<num>s`, or `0s`.
fn rational_time(frames: Frame, fps: Fps) -> String {
    if frames == 0 {
        "0s".to_string()
    } else {
        format!("{}/{}s", frames * fps.den as Frame, fps.num)
    }
}

fn frame_duration(fps: Fps) -> String {
    format!("{}/{}s", fps.den, fps.num)
}

/// Seconds from `N/Ds`, `N.Ns` or `Ns`.
fn parse_seconds(value: &str) -> Option<f64> {
    let value = value.trim().strip_suffix('s')?;
    match value.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then_some(num.parse::<f64>().ok()? / den)
        }
        None => value.parse().ok(),
    }
}

fn to_frames(value: &str, fps: Fps) -> Option<Frame> {
    parse_seconds(value).map(|s| (s * fps.as_f64()).round() as Frame)
}

/// Frame rate from a `frameDuration` such as `1/24s` or `1001/24000s`.
fn parse_frame_duration(value: &str) -> Option<Fps> {
    let value = value.trim().strip_suffix('s')?;
    let (den, num) = value.split_once('/')?;
    let num: u32 = num.parse().ok()?;
    let den: u32 = den.parse().ok()?;
    (num > 0 && den > 0).then(|| Fps::new(num, den))
}

/// Lane for a clip on the spine: absent for V1, positive above it, negative
/// for audio tracks.
fn lane_for(kind: TrackKind, track: u32) -> Option<i64> {
    match kind {
        TrackKind::Video if track <= 1 => None,
        TrackKind::Video => Some(track as i64 - 1),
        TrackKind::Audio => Some(-(track.max(1) as i64)),
    }
}

fn track_for_lane(lane: Option<i64>) -> (TrackKind, u32) {
    match lane {
        None | Some(0) => (TrackKind::Video, 1),
        Some(l) if l > 0 => (TrackKind::Video, l as u32 + 1),
        Some(l) => (TrackKind::Audio, l.unsigned_abs() as u32),
    }
}

struct AssetEntry<'a> {
    id: String,
    src: &'a str,
    duration: Frame,
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

pub fn generate_fcpxml(timeline: &Timeline, config: &ExportConfig) -> Result<String, ExportError> {
    let fps = timeline.fps;
    let clips = timeline.clips_with_kind();

    // One asset per distinct source path, in first-use order.
    let mut assets: Vec<AssetEntry> = Vec::new();
    let mut asset_ids: HashMap<&str, usize> = HashMap::new();
    for (_, clip) in &clips {
        if clip.source_path.is_empty() {
            continue;
        }
        let index = *asset_ids.entry(clip.source_path.as_str()).or_insert_with(|| {
            assets.push(AssetEntry {
                id: format!("r{}", assets.len() + 2),
                src: clip.source_path.as_str(),
                duration: 0,
            });
            assets.len() - 1
        });
        assets[index].duration = assets[index].duration.max(clip.source_out.to_frames());
    }

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::DocType(BytesText::from_escaped("fcpxml")))?;

    let mut fcpxml_elem = BytesStart::new("fcpxml");
    fcpxml_elem.push_attribute(("version", FCPXML_VERSION));
    writer.write_event(Event::Start(fcpxml_elem))?;

    write_resources(&mut writer, timeline, config, &assets)?;

    writer.write_event(Event::Start(BytesStart::new("library")))?;
    let mut event_elem = BytesStart::new("event");
    event_elem.push_attribute(("name", timeline.name.as_str()));
    writer.write_event(Event::Start(event_elem))?;

    let mut project_elem = BytesStart::new("project");
    project_elem.push_attribute(("name", timeline.name.as_str()));
    project_elem.push_attribute(("uid", stable_uid(&timeline.name).as_str()));
    writer.write_event(Event::Start(project_elem))?;

    let mut seq_elem = BytesStart::new("sequence");
    seq_elem.push_attribute(("format", FORMAT_ID));
    seq_elem.push_attribute(("duration", rational_time(timeline.calculate_duration(), fps).as_str()));
    seq_elem.push_attribute(("tcStart", rational_time(timeline.start_timecode.to_frames(), fps).as_str()));
    seq_elem.push_attribute(("tcFormat", if timeline.start_timecode.drop_frame { "DF" } else { "NDF" }));
    writer.write_event(Event::Start(seq_elem))?;
    writer.write_event(Event::Start(BytesStart::new("spine")))?;

    for (kind, clip) in &clips {
        let asset_ref = asset_ids.get(clip.source_path.as_str()).map(|&i| assets[i].id.as_str());
        write_clip(&mut writer, *kind, clip, asset_ref, fps)?;
    }

    writer.write_event(Event::End(BytesEnd::new("spine")))?;
    writer.write_event(Event::End(BytesEnd::new("sequence")))?;
    writer.write_event(Event::End(BytesEnd::new("project")))?;
    writer.write_event(Event::End(BytesEnd::new("event")))?;
    writer.write_event(Event::End(BytesEnd::new("library")))?;
    writer.write_event(Event::End(BytesEnd::new("fcpxml")))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidDocument(e.to_string()))
}

fn stable_uid(seed: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, seed.as_bytes())
        .hyphenated()
        .to_string()
        .to_uppercase()
}

fn write_resources(
    writer: &mut XmlWriter,
    timeline: &Timeline,
    config: &ExportConfig,
    assets: &[AssetEntry],
) -> Result<(), ExportError> {
    let fps = timeline.fps;
    writer.write_event(Event::Start(BytesStart::new("resources")))?;

    let mut format_elem = BytesStart::new("format");
    format_elem.push_attribute(("id", FORMAT_ID));
    format_elem.push_attribute((
        "name",
        format!("FFVideoFormat{}p{}", config.height, fps.rounded()).as_str(),
    ));
    format_elem.push_attribute(("frameDuration", frame_duration(fps).as_str()));
    format_elem.push_attribute(("width", config.width.to_string().as_str()));
    format_elem.push_attribute(("height", config.height.to_string().as_str()));
    writer.write_event(Event::Empty(format_elem))?;

    for asset in assets {
        let name = Path::new(asset.src)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown");
        let mut asset_elem = BytesStart::new("asset");
        asset_elem.push_attribute(("id", asset.id.as_str()));
        asset_elem.push_attribute(("name", name));
        asset_elem.push_attribute(("uid", stable_uid(asset.src).as_str()));
        asset_elem.push_attribute(("src", asset.src));
        asset_elem.push_attribute(("start", "0s"));
        asset_elem.push_attribute(("duration", rational_time(asset.duration, fps).as_str()));
        asset_elem.push_attribute(("hasVideo", "1"));
        asset_elem.push_attribute(("hasAudio", "1"));
        asset_elem.push_attribute(("format", FORMAT_ID));
        writer.write_event(Event::Empty(asset_elem))?;
    }

    writer.write_event(Event::End(BytesEnd::new("resources")))?;
    Ok(())
}

fn write_clip(
    writer: &mut XmlWriter,
    kind: TrackKind,
    clip: &Clip,
    asset_ref: Option<&str>,
    fps: Fps,
) -> Result<(), ExportError> {
    let record = clip.record_range();

    let mut clip_elem = BytesStart::new("clip");
    clip_elem.push_attribute(("name", clip.name.as_str()));
    if let Some(lane) = lane_for(kind, clip.track) {
        clip_elem.push_attribute(("lane", lane.to_string().as_str()));
    }
    clip_elem.push_attribute(("offset", rational_time(record.start, fps).as_str()));
    clip_elem.push_attribute(("duration", rational_time(record.duration, fps).as_str()));
    if !clip.enabled {
        clip_elem.push_attribute(("enabled", "0"));
    }
    writer.write_event(Event::Start(clip_elem))?;

    if !clip.notes.is_empty() {
        let mut note_elem = BytesStart::new("note");
        note_elem.push_attribute(("value", clip.notes.as_str()));
        writer.write_event(Event::Empty(note_elem))?;
    }

    let mut asset_clip = BytesStart::new("asset-clip");
    if let Some(asset_ref) = asset_ref {
        asset_clip.push_attribute(("ref", asset_ref));
    }
    asset_clip.push_attribute(("name", clip.name.as_str()));
    asset_clip.push_attribute(("start", rational_time(clip.source_in.to_frames(), fps).as_str()));
    asset_clip.push_attribute(("duration", rational_time(clip.duration(), fps).as_str()));
    writer.write_event(Event::Empty(asset_clip))?;

    writer.write_event(Event::End(BytesEnd::new("clip")))?;
    Ok(())
}

/// Parse FCPXML; malformed documents yield `None` with a warning.
pub fn parse_fcpxml(content: &str) -> Option<Timeline> {
    match try_parse_fcpxml(content) {
        Ok(timeline) => Some(timeline),
        Err(e) => {
            warn!("rejected FCPXML: {e}");
            None
        }
    }
}

fn attributes(elem: &BytesStart<'_>) -> Result<HashMap<String, String>, ExportError> {
    let mut map = HashMap::new();
    for attr in elem.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        map.insert(key, attr.unescape_value()?.into_owned());
    }
    Ok(map)
}

/// Spine clip as read, before its times can be resolved against the rate.
#[derive(Default)]
struct RawClip {
    name: String,
    lane: Option<i64>,
    offset: String,
    duration: String,
    start: Option<String>,
    asset_ref: Option<String>,
    notes: String,
    enabled: bool,
}

impl RawClip {
    fn from_attributes(attrs: &HashMap<String, String>) -> Self {
        Self {
            name: attrs.get("name").cloned().unwrap_or_default(),
            lane: attrs.get("lane").and_then(|l| l.parse().ok()),
            offset: attrs.get("offset").cloned().unwrap_or_else(|| "0s".to_string()),
            duration: attrs.get("duration").cloned().unwrap_or_default(),
            start: None,
            asset_ref: attrs.get("ref").cloned(),
            notes: String::new(),
            enabled: attrs.get("enabled").map_or(true, |v| v != "0"),
        }
    }

    fn absorb_asset_clip(&mut self, attrs: &HashMap<String, String>) {
        self.start = attrs.get("start").cloned();
        if let Some(asset_ref) = attrs.get("ref") {
            self.asset_ref = Some(asset_ref.clone());
        }
    }
}

pub fn try_parse_fcpxml(content: &str) -> Result<Timeline, ExportError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut saw_root = false;
    let mut fps: Option<Fps> = None;
    let mut name: Option<String> = None;
    let mut assets: HashMap<String, String> = HashMap::new();
    let mut raw_clips: Vec<RawClip> = Vec::new();
    let mut spine_depth = 0usize;
    let mut open_clip: Option<RawClip> = None;

    loop {
        let (elem, is_empty) = match reader.read_event()? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(e) => {
                match e.name().as_ref() {
                    b"spine" => spine_depth = spine_depth.saturating_sub(1),
                    b"clip" => raw_clips.extend(open_clip.take()),
                    _ => {}
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        match elem.name().as_ref() {
            b"fcpxml" => saw_root = true,
            b"format" => {
                if fps.is_none() {
                    fps = attributes(&elem)?
                        .get("frameDuration")
                        .and_then(|d| parse_frame_duration(d));
                }
            }
            b"asset" => {
                let attrs = attributes(&elem)?;
                if let (Some(id), Some(src)) = (attrs.get("id"), attrs.get("src")) {
                    assets.insert(id.clone(), src.clone());
                }
            }
            b"project" => {
                if name.is_none() {
                    name = attributes(&elem)?.get("name").cloned();
                }
            }
            b"spine" if !is_empty => spine_depth += 1,
            b"clip" if spine_depth > 0 => {
                let raw = RawClip::from_attributes(&attributes(&elem)?);
                if is_empty {
                    raw_clips.push(raw);
                } else {
                    open_clip = Some(raw);
                }
            }
            b"asset-clip" => {
                let attrs = attributes(&elem)?;
                match open_clip.as_mut() {
                    Some(clip) => clip.absorb_asset_clip(&attrs),
                    None if spine_depth > 0 => {
                        // A bare asset-clip on the spine is a clip of its own.
                        let mut raw = RawClip::from_attributes(&attrs);
                        raw.absorb_asset_clip(&attrs);
                        raw_clips.push(raw);
                    }
                    None => {}
                }
            }
            b"note" => {
                if let Some(clip) = open_clip.as_mut() {
                    clip.notes = attributes(&elem)?.get("value").cloned().unwrap_or_default();
                }
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(ExportError::InvalidDocument("missing <fcpxml> root".to_string()));
    }

    let fps = fps.unwrap_or(DEFAULT_FPS);
    let mut timeline = Timeline::new(name.unwrap_or_else(|| "Imported Timeline".to_string()), fps);

    for (index, raw) in raw_clips.into_iter().enumerate() {
        let (Some(offset), Some(duration)) = (to_frames(&raw.offset, fps), to_frames(&raw.duration, fps)) else {
            debug!("skipping FCPXML clip {:?}: unreadable time", raw.name);
            continue;
        };
        let source_in = raw.start.as_deref().and_then(|s| to_frames(s, fps)).unwrap_or(0);
        let source_path = raw
            .asset_ref
            .as_ref()
            .and_then(|r| assets.get(r))
            .cloned()
            .unwrap_or_default();
        let name = if raw.name.is_empty() {
            format!("Clip_{:03}", index + 1)
        } else {
            raw.name
        };

        let mut clip = Clip::new(
            name,
            source_path,
            Timecode::from_frames(source_in, fps),
            Timecode::from_frames(source_in + duration, fps),
            Timecode::from_frames(offset, fps),
            Timecode::from_frames(offset + duration, fps),
        )
        .with_notes(raw.notes);
        clip.enabled = raw.enabled;

        let (kind, track) = track_for_lane(raw.lane);
        timeline.add_clip(clip, kind, track);
    }

    Ok(timeline)
}
