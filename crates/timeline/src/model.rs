use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{Fps, Frame, FrameRange, Marker, Result, Timecode, TimelineError};

/// Name-based reference to a clip. Never owns the clip; resolve it against a
/// `Timeline` when the clip itself is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipRef(String);

impl ClipRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn refers_to(&self, name: &str) -> bool {
        self.0 == name
    }

    pub fn resolve<'a>(&self, timeline: &'a Timeline) -> Option<&'a Clip> {
        timeline.find_clip(&self.0)
    }
}

impl fmt::Display for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    #[serde(default)]
    pub source_path: String,
    pub source_in: Timecode,
    pub source_out: Timecode,
    pub record_in: Timecode,
    pub record_out: Timecode,
    #[serde(default = "default_track_number")]
    pub track: u32,
    #[serde(default)]
    pub scene: String,
    #[serde(default)]
    pub take: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub locked: bool,
}

fn default_track_number() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

impl Clip {
    /// A zero `record_out` with a non-zero `source_out` is derived as
    /// `record_in + duration`.
    pub fn new(
        name: impl Into<String>,
        source_path: impl Into<String>,
        source_in: Timecode,
        source_out: Timecode,
        record_in: Timecode,
        record_out: Timecode,
    ) -> Self {
        let mut clip = Self {
            name: name.into(),
            source_path: source_path.into(),
            source_in,
            source_out,
            record_in,
            record_out,
            track: default_track_number(),
            scene: String::new(),
            take: String::new(),
            notes: String::new(),
            enabled: true,
            locked: false,
        };
        if clip.record_out.to_frames() == 0 && clip.source_out.to_frames() > 0 {
            clip.record_out = clip.record_in + clip.duration();
        }
        clip
    }

    /// Source range `[source_in, source_out)` placed at `record_in`.
    pub fn from_frames(
        name: impl Into<String>,
        source_path: impl Into<String>,
        source_in: Frame,
        source_out: Frame,
        record_in: Frame,
        fps: Fps,
    ) -> Self {
        Self::new(
            name,
            source_path,
            Timecode::from_frames(source_in, fps),
            Timecode::from_frames(source_out, fps),
            Timecode::from_frames(record_in, fps),
            Timecode::zero(fps),
        )
    }

    pub fn with_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = scene.into();
        self
    }

    pub fn with_take(mut self, take: impl Into<String>) -> Self {
        self.take = take.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Source duration in frames; not clamped.
    pub fn duration(&self) -> Frame {
        self.source_out.to_frames() - self.source_in.to_frames()
    }

    pub fn record_range(&self) -> FrameRange {
        FrameRange::between(self.record_in.to_frames(), self.record_out.to_frames())
    }

    pub fn source_range(&self) -> FrameRange {
        FrameRange::between(self.source_in.to_frames(), self.source_out.to_frames())
    }

    /// Half-open containment on the record range.
    pub fn contains(&self, position: Frame) -> bool {
        self.record_in.to_frames() <= position && position < self.record_out.to_frames()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    #[default]
    Video,
    Audio,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::Video => 'V',
            Self::Audio => 'A',
        }
    }
}

impl FromStr for TrackKind {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "v" => Ok(Self::Video),
            "audio" | "a" => Ok(Self::Audio),
            other => Err(TimelineError::Validation(format!(
                "unknown track type: {other}"
            ))),
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub kind: TrackKind,
    pub number: u32,
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub solo: bool,
}

impl Track {
    pub fn new(kind: TrackKind, number: u32) -> Self {
        Self {
            name: format!("{}{}", kind.letter(), number),
            kind,
            number,
            clips: Vec::new(),
            muted: false,
            locked: false,
            solo: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append and keep the list ordered by `record_in`.
    pub fn add_clip(&mut self, mut clip: Clip) {
        clip.track = self.number;
        self.clips.push(clip);
        self.sort_clips();
    }

    pub fn remove_clip(&mut self, name: &str) -> Option<Clip> {
        let idx = self.clips.iter().position(|c| c.name == name)?;
        Some(self.clips.remove(idx))
    }

    /// Clip covering `position`; the `record_out` boundary is excluded.
    pub fn get_clip_at(&self, position: Frame) -> Option<&Clip> {
        self.clips.iter().find(|c| c.contains(position))
    }

    pub fn clip(&self, name: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.name == name)
    }

    pub fn clip_mut(&mut self, name: &str) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.name == name)
    }

    pub fn sort_clips(&mut self) {
        self.clips.sort_by_key(|c| c.record_in.to_frames());
    }

    pub fn end_frame(&self) -> Frame {
        self.clips
            .iter()
            .map(|c| c.record_out.to_frames())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    #[default]
    Cut,
    Dissolve,
    Wipe,
    FadeToBlack,
    FadeFromBlack,
    DipToColor,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cut => "cut",
            Self::Dissolve => "dissolve",
            Self::Wipe => "wipe",
            Self::FadeToBlack => "fade_to_black",
            Self::FadeFromBlack => "fade_from_black",
            Self::DipToColor => "dip_to_color",
        }
    }

    /// Lenient parse for interchange formats: unknown names yield `None`.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

impl FromStr for TransitionKind {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "cut" => Ok(Self::Cut),
            "dissolve" | "cross_dissolve" => Ok(Self::Dissolve),
            "wipe" => Ok(Self::Wipe),
            "fade_to_black" => Ok(Self::FadeToBlack),
            "fade_from_black" => Ok(Self::FadeFromBlack),
            "dip_to_color" => Ok(Self::DipToColor),
            _ => Err(TimelineError::Validation(format!(
                "unknown transition type: {s}"
            ))),
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub kind: TransitionKind,
    pub duration: Frame,
    pub from_clip: ClipRef,
    pub to_clip: ClipRef,
    #[serde(default = "default_wipe_direction")]
    pub wipe_direction: String,
    #[serde(default = "default_dip_color")]
    pub dip_color: [f32; 4],
}

fn default_wipe_direction() -> String {
    "left_to_right".to_string()
}

fn default_dip_color() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Transition {
    /// A cut always carries a zero duration.
    pub fn new(
        kind: TransitionKind,
        duration: Frame,
        from_clip: impl Into<String>,
        to_clip: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            duration: if kind == TransitionKind::Cut {
                0
            } else {
                duration.max(0)
            },
            from_clip: ClipRef::new(from_clip),
            to_clip: ClipRef::new(to_clip),
            wipe_direction: default_wipe_direction(),
            dip_color: default_dip_color(),
        }
    }

    pub fn dissolve(from_clip: impl Into<String>, to_clip: impl Into<String>, duration: Frame) -> Self {
        Self::new(TransitionKind::Dissolve, duration, from_clip, to_clip)
    }

    pub fn with_wipe_direction(mut self, direction: impl Into<String>) -> Self {
        self.wipe_direction = direction.into();
        self
    }

    pub fn with_dip_color(mut self, rgba: [f32; 4]) -> Self {
        self.dip_color = rgba;
        self
    }

    pub fn references(&self, name: &str) -> bool {
        self.from_clip.refers_to(name) || self.to_clip.refers_to(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub name: String,
    pub fps: Fps,
    /// Derived from the clips; refreshed by `refresh_duration`.
    #[serde(default)]
    pub duration: Frame,
    #[serde(default)]
    pub video_tracks: Vec<Track>,
    #[serde(default)]
    pub audio_tracks: Vec<Track>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    pub start_timecode: Timecode,
}

impl Timeline {
    pub fn new(name: impl Into<String>, fps: Fps) -> Self {
        Self {
            name: name.into(),
            fps,
            duration: 0,
            video_tracks: Vec::new(),
            audio_tracks: Vec::new(),
            transitions: Vec::new(),
            markers: Vec::new(),
            start_timecode: Timecode::zero(fps),
        }
    }

    pub fn tracks(&self, kind: TrackKind) -> &[Track] {
        match kind {
            TrackKind::Video => &self.video_tracks,
            TrackKind::Audio => &self.audio_tracks,
        }
    }

    pub fn tracks_mut(&mut self, kind: TrackKind) -> &mut Vec<Track> {
        match kind {
            TrackKind::Video => &mut self.video_tracks,
            TrackKind::Audio => &mut self.audio_tracks,
        }
    }

    pub fn all_tracks(&self) -> impl Iterator<Item = &Track> {
        self.video_tracks.iter().chain(self.audio_tracks.iter())
    }

    pub fn track_count(&self) -> usize {
        self.video_tracks.len() + self.audio_tracks.len()
    }

    pub fn track(&self, kind: TrackKind, number: u32) -> Option<&Track> {
        self.tracks(kind).iter().find(|t| t.number == number)
    }

    pub fn track_mut(&mut self, kind: TrackKind, number: u32) -> Option<&mut Track> {
        self.tracks_mut(kind).iter_mut().find(|t| t.number == number)
    }

    /// Returns the track, creating it (ordered by number) when missing.
    pub fn ensure_track(&mut self, kind: TrackKind, number: u32) -> &mut Track {
        let tracks = self.tracks_mut(kind);
        let idx = match tracks.iter().position(|t| t.number == number) {
            Some(idx) => idx,
            None => {
                let idx = tracks
                    .iter()
                    .position(|t| t.number > number)
                    .unwrap_or(tracks.len());
                tracks.insert(idx, Track::new(kind, number));
                idx
            }
        };
        &mut tracks[idx]
    }

    pub fn add_clip(&mut self, clip: Clip, kind: TrackKind, track_number: u32) {
        self.ensure_track(kind, track_number).add_clip(clip);
        self.refresh_duration();
    }

    /// Every clip, ordered by `(track number, record_in)`.
    pub fn get_all_clips(&self) -> Vec<&Clip> {
        self.clips_with_kind().into_iter().map(|(_, c)| c).collect()
    }

    /// Same ordering as `get_all_clips`, tagged with the owning track kind.
    pub fn clips_with_kind(&self) -> Vec<(TrackKind, &Clip)> {
        let mut clips: Vec<(TrackKind, &Clip)> = self
            .all_tracks()
            .flat_map(|t| t.clips.iter().map(move |c| (t.kind, c)))
            .collect();
        clips.sort_by_key(|(_, c)| (c.track, c.record_in.to_frames()));
        clips
    }

    pub fn clip_count(&self) -> usize {
        self.all_tracks().map(|t| t.clips.len()).sum()
    }

    pub fn find_clip(&self, name: &str) -> Option<&Clip> {
        self.all_tracks().find_map(|t| t.clip(name))
    }

    pub fn find_clip_mut(&mut self, name: &str) -> Option<&mut Clip> {
        self.video_tracks
            .iter_mut()
            .chain(self.audio_tracks.iter_mut())
            .find_map(|t| t.clip_mut(name))
    }

    /// Kind and number of the track holding `name`.
    pub fn locate_clip(&self, name: &str) -> Option<(TrackKind, u32)> {
        self.all_tracks()
            .find(|t| t.clip(name).is_some())
            .map(|t| (t.kind, t.number))
    }

    pub fn has_clip(&self, name: &str) -> bool {
        self.find_clip(name).is_some()
    }

    /// Largest `record_out` across all clips, 0 when empty.
    pub fn calculate_duration(&self) -> Frame {
        self.all_tracks().map(Track::end_frame).max().unwrap_or(0)
    }

    pub fn refresh_duration(&mut self) -> Frame {
        self.duration = self.calculate_duration();
        self.duration
    }

    /// Uncovered ranges between consecutive clips on video track 1 only.
    pub fn find_gaps(&self) -> Vec<FrameRange> {
        let Some(track) = self.track(TrackKind::Video, 1) else {
            return Vec::new();
        };

        track
            .clips
            .windows(2)
            .filter_map(|pair| {
                let end = pair[0].record_out.to_frames();
                let next = pair[1].record_in.to_frames();
                (end < next).then(|| FrameRange::between(end, next))
            })
            .collect()
    }

    /// Clips whose record range intersects `[start, end)`.
    pub fn clips_in_range(&self, start: Frame, end: Frame) -> Vec<&Clip> {
        self.get_all_clips()
            .into_iter()
            .filter(|c| c.record_range().overlaps(start, end))
            .collect()
    }

    /// Insert keeping markers ordered by position.
    pub fn add_marker(&mut self, marker: Marker) {
        let idx = self
            .markers
            .iter()
            .position(|m| m.position > marker.position)
            .unwrap_or(self.markers.len());
        self.markers.insert(idx, marker);
    }

    /// Drop every transition that names `clip_name`; returns how many went.
    pub fn purge_transitions_for(&mut self, clip_name: &str) -> usize {
        let before = self.transitions.len();
        self.transitions.retain(|t| !t.references(clip_name));
        before - self.transitions.len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
