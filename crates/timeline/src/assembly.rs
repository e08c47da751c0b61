//! Timeline builders and reporting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::{
    format_runtime, Clip, Fps, Frame, Marker, Result, Snapshot, Timecode, Timeline,
    TimelineManager, TrackKind, Transition, TransitionKind, DEFAULT_FPS,
};

/// Settings shared by the assembly helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    pub fps: Fps,
    /// Length given to shots that omit `source_out`.
    pub default_shot_frames: Frame,
    /// `Cut` lays shots back to back with no transition records; any other
    /// kind joins consecutive shots with a dissolve.
    pub transition_kind: TransitionKind,
    pub transition_frames: Frame,
    /// Name stem for filler clips created by `fill_gaps`.
    pub slug_prefix: String,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            default_shot_frames: 72,
            transition_kind: TransitionKind::Cut,
            transition_frames: 24,
            slug_prefix: "Slug".to_string(),
        }
    }
}

impl AssemblyConfig {
    pub fn with_fps(mut self, fps: Fps) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_transition(mut self, kind: TransitionKind, frames: Frame) -> Self {
        self.transition_kind = kind;
        self.transition_frames = frames;
        self
    }
}

/// One entry of a shot list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShotSpec {
    pub name: String,
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub source_in: Frame,
    #[serde(default)]
    pub source_out: Option<Frame>,
    #[serde(default)]
    pub scene: String,
    #[serde(default)]
    pub take: String,
    #[serde(default)]
    pub notes: String,
}

impl ShotSpec {
    pub fn new(name: impl Into<String>, source_in: Frame, source_out: Frame) -> Self {
        Self {
            name: name.into(),
            source_in,
            source_out: Some(source_out),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneSpec {
    pub name: String,
    #[serde(default)]
    pub shots: Vec<ShotSpec>,
}

/// Lays clips end to end on V1, linking neighbours with the configured
/// transition.
struct Sequencer<'a> {
    config: &'a AssemblyConfig,
    timeline: Timeline,
    cursor: Frame,
    previous: Option<String>,
}

impl<'a> Sequencer<'a> {
    fn new(name: &str, config: &'a AssemblyConfig) -> Self {
        Self {
            config,
            timeline: Timeline::new(name, config.fps),
            cursor: 0,
            previous: None,
        }
    }

    fn push_shot(&mut self, shot: &ShotSpec, scene: &str) {
        let source_out = shot
            .source_out
            .unwrap_or(shot.source_in + self.config.default_shot_frames);
        let scene = if shot.scene.is_empty() { scene } else { &shot.scene };
        let clip = Clip::from_frames(
            shot.name.as_str(),
            shot.source_path.as_str(),
            shot.source_in,
            source_out,
            self.cursor,
            self.config.fps,
        )
        .with_scene(scene)
        .with_take(shot.take.as_str())
        .with_notes(shot.notes.as_str());
        self.push_clip(clip);
    }

    fn push_clip(&mut self, clip: Clip) {
        self.cursor += clip.duration().max(0);
        let name = clip.name.clone();
        self.timeline.add_clip(clip, TrackKind::Video, 1);

        if let Some(previous) = self.previous.replace(name.clone()) {
            if self.config.transition_kind != TransitionKind::Cut {
                self.timeline.transitions.push(Transition::dissolve(
                    previous,
                    name,
                    self.config.transition_frames,
                ));
            }
        }
    }

    fn mark(&mut self, name: &str) {
        let position = Timecode::from_frames(self.cursor, self.config.fps);
        self.timeline.add_marker(Marker::new(name, position));
    }

    fn finish(mut self) -> Timeline {
        self.timeline.refresh_duration();
        debug!(
            "assembled {} with {} clips over {} frames",
            self.timeline.name,
            self.timeline.clip_count(),
            self.timeline.duration
        );
        self.timeline
    }
}

pub fn assemble_from_shot_list(shots: &[ShotSpec], name: &str, config: &AssemblyConfig) -> Timeline {
    let mut sequencer = Sequencer::new(name, config);
    for shot in shots {
        sequencer.push_shot(shot, "");
    }
    sequencer.finish()
}

/// One uniform-length clip per path, named after the file stem.
pub fn auto_sequence_clips<P: AsRef<Path>>(
    paths: &[P],
    duration: Frame,
    name: &str,
    config: &AssemblyConfig,
) -> Timeline {
    let mut sequencer = Sequencer::new(name, config);
    for (i, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let clip_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("Clip_{:03}", i + 1));
        let clip = Clip::from_frames(
            clip_name,
            path.to_string_lossy(),
            0,
            duration,
            sequencer.cursor,
            config.fps,
        );
        sequencer.push_clip(clip);
    }
    sequencer.finish()
}

/// Like `assemble_from_shot_list`, with a marker at the head of every scene.
pub fn create_sequence_from_scenes(scenes: &[SceneSpec], name: &str, config: &AssemblyConfig) -> Timeline {
    let mut sequencer = Sequencer::new(name, config);
    for scene in scenes {
        sequencer.mark(&scene.name);
        for shot in &scene.shots {
            sequencer.push_shot(shot, &scene.name);
        }
    }
    sequencer.finish()
}

/// Copy of `timeline` with `source_path` replaced for every clip named in
/// `relink_map`. The input is left untouched.
pub fn conform_timeline(timeline: &Timeline, relink_map: &HashMap<String, String>) -> Result<Timeline> {
    let mut conformed = Timeline::from_json(&timeline.to_json()?)?;
    let mut relinked = 0;
    for track in conformed
        .video_tracks
        .iter_mut()
        .chain(conformed.audio_tracks.iter_mut())
    {
        for clip in track.clips.iter_mut() {
            if let Some(path) = relink_map.get(&clip.name) {
                clip.source_path = path.clone();
                relinked += 1;
            }
        }
    }
    debug!("conform relinked {relinked} clips");
    Ok(conformed)
}

/// Covers every V1 gap with a media-less filler clip. Returns how many
/// were inserted.
pub fn fill_gaps<S: Snapshot>(manager: &mut TimelineManager<S>, config: &AssemblyConfig) -> Result<usize> {
    let gaps = manager.find_gaps();
    let fps = manager.timeline().fps;
    let mut counter = 0;
    for gap in &gaps {
        let name = loop {
            counter += 1;
            let candidate = format!("{}_{:03}", config.slug_prefix, counter);
            if !manager.timeline().has_clip(&candidate) {
                break candidate;
            }
        };
        let slug = Clip::from_frames(name, "", 0, gap.duration, gap.start, fps);
        manager.add_clip(slug, 1, TrackKind::Video)?;
    }
    Ok(gaps.len())
}

/// Closes every V1 gap, latest first so earlier positions stay valid.
pub fn remove_gaps<S: Snapshot>(manager: &mut TimelineManager<S>) -> Result<usize> {
    let gaps = manager.find_gaps();
    for gap in gaps.iter().rev() {
        manager.insert_gap(gap.end(), -gap.duration, 1)?;
    }
    Ok(gaps.len())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineStatistics {
    pub name: String,
    pub fps: f64,
    pub clip_count: usize,
    pub track_count: usize,
    pub video_track_count: usize,
    pub audio_track_count: usize,
    pub transition_count: usize,
    pub marker_count: usize,
    pub gap_count: usize,
    pub total_frames: Frame,
    /// Sum of record spans over every clip on every track.
    pub clip_frames: Frame,
    pub gap_frames: Frame,
    pub fill_percentage: f64,
    pub runtime: String,
}

pub fn get_timeline_statistics(timeline: &Timeline) -> TimelineStatistics {
    let total_frames = timeline.calculate_duration();
    let clip_frames: Frame = timeline
        .get_all_clips()
        .iter()
        .map(|c| c.record_range().duration)
        .sum();
    let gaps = timeline.find_gaps();
    let gap_frames = gaps.iter().map(|g| g.duration).sum();

    let fill_percentage = if total_frames == 0 {
        100.0
    } else {
        clip_frames as f64 / total_frames as f64 * 100.0
    };

    TimelineStatistics {
        name: timeline.name.clone(),
        fps: timeline.fps.as_f64(),
        clip_count: timeline.clip_count(),
        track_count: timeline.track_count(),
        video_track_count: timeline.video_tracks.len(),
        audio_track_count: timeline.audio_tracks.len(),
        transition_count: timeline.transitions.len(),
        marker_count: timeline.markers.len(),
        gap_count: gaps.len(),
        total_frames,
        clip_frames,
        gap_frames,
        fill_percentage,
        runtime: format_runtime(total_frames as f64 / timeline.fps.as_f64()),
    }
}
