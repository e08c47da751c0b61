//! Editorial operations on a live timeline with snapshot undo/redo.
//!
//! Every mutation validates first and only then records a checkpoint, so a
//! rejected edit leaves neither the timeline nor the history touched.

use tracing::debug;

use crate::host::{HostReport, TransitionHost};
use crate::{
    Clip, Frame, FrameRange, JsonSnapshot, ManagerConfig, Marker, Result, Snapshot,
    SnapshotHistory, Timecode, Timeline, TimelineError, TrackKind, Transition,
};

pub struct TimelineManager<S: Snapshot = JsonSnapshot> {
    timeline: Timeline,
    history: SnapshotHistory<S>,
}

impl TimelineManager {
    pub fn new(timeline: Timeline) -> Self {
        Self::with_config(timeline, &ManagerConfig::default())
    }
}

impl<S: Snapshot> TimelineManager<S> {
    pub fn with_config(timeline: Timeline, config: &ManagerConfig) -> Self {
        Self {
            timeline,
            history: SnapshotHistory::new(config.history_depth),
        }
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn into_timeline(self) -> Timeline {
        self.timeline
    }

    pub fn history(&self) -> &SnapshotHistory<S> {
        &self.history
    }

    /// Push the current state; clears redo.
    pub fn save_state(&mut self) -> Result<()> {
        self.checkpoint("save state")
    }

    pub fn undo(&mut self) -> Result<()> {
        self.history.undo(&mut self.timeline)?;
        debug!("undo -> {} clips", self.timeline.clip_count());
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        self.history.redo(&mut self.timeline)?;
        debug!("redo -> {} clips", self.timeline.clip_count());
        Ok(())
    }

    fn checkpoint(&mut self, label: &str) -> Result<()> {
        self.history.push(&self.timeline, label)
    }

    /// The clip, provided it exists and is not locked.
    fn editable_clip(&self, name: &str) -> Result<&Clip> {
        let clip = self
            .timeline
            .find_clip(name)
            .ok_or_else(|| TimelineError::NotFound(format!("clip {name}")))?;
        if clip.locked {
            return Err(TimelineError::State(format!("clip {name} is locked")));
        }
        Ok(clip)
    }

    fn clip_mut(&mut self, name: &str) -> Result<&mut Clip> {
        self.timeline
            .find_clip_mut(name)
            .ok_or_else(|| TimelineError::NotFound(format!("clip {name}")))
    }

    fn resort_track_of(&mut self, name: &str) {
        if let Some((kind, number)) = self.timeline.locate_clip(name) {
            if let Some(track) = self.timeline.track_mut(kind, number) {
                track.sort_clips();
            }
        }
        self.timeline.refresh_duration();
    }

    // ── Clip placement ────────────────────────────────────────────

    /// Creates the target track when it does not exist yet.
    pub fn add_clip(&mut self, clip: Clip, track_number: u32, kind: TrackKind) -> Result<()> {
        self.checkpoint("add clip")?;
        debug!("add clip {} to {}{}", clip.name, kind.letter(), track_number);
        self.timeline.add_clip(clip, kind, track_number);
        Ok(())
    }

    /// Removes the clip and every transition that names it.
    pub fn remove_clip(&mut self, name: &str) -> Result<Clip> {
        let (kind, number) = self
            .timeline
            .locate_clip(name)
            .ok_or_else(|| TimelineError::NotFound(format!("clip {name}")))?;

        self.checkpoint("remove clip")?;
        let removed = self
            .timeline
            .track_mut(kind, number)
            .and_then(|t| t.remove_clip(name))
            .ok_or_else(|| TimelineError::NotFound(format!("clip {name}")))?;
        let purged = self.timeline.purge_transitions_for(name);
        self.timeline.refresh_duration();
        debug!("removed clip {name}, purged {purged} transitions");
        Ok(removed)
    }

    /// Moves the record range to start at `new_record_in`, keeping its length.
    pub fn move_clip(&mut self, name: &str, new_record_in: Frame) -> Result<()> {
        let span = self.editable_clip(name)?.record_range().duration;

        self.checkpoint("move clip")?;
        let clip = self.clip_mut(name)?;
        clip.record_in = Timecode::from_frames(new_record_in, clip.record_in.fps);
        clip.record_out = clip.record_in + span;
        self.resort_track_of(name);
        Ok(())
    }

    // ── Trim / slip / slide ───────────────────────────────────────

    /// Sets `source_in`; the record range is left as is.
    pub fn trim_clip_in(&mut self, name: &str, new_in: Frame) -> Result<()> {
        let clip = self.editable_clip(name)?;
        if new_in >= clip.source_out.to_frames() {
            return Err(TimelineError::State(format!(
                "trim in {new_in} would invert {name} (source out {})",
                clip.source_out.to_frames()
            )));
        }

        self.checkpoint("trim in")?;
        let clip = self.clip_mut(name)?;
        clip.source_in = Timecode::from_frames(new_in, clip.source_in.fps);
        Ok(())
    }

    /// Sets `source_out` and re-derives `record_out` from the new duration.
    pub fn trim_clip_out(&mut self, name: &str, new_out: Frame) -> Result<()> {
        let clip = self.editable_clip(name)?;
        if new_out <= clip.source_in.to_frames() {
            return Err(TimelineError::State(format!(
                "trim out {new_out} would invert {name} (source in {})",
                clip.source_in.to_frames()
            )));
        }

        self.checkpoint("trim out")?;
        let clip = self.clip_mut(name)?;
        clip.source_out = Timecode::from_frames(new_out, clip.source_out.fps);
        clip.record_out = clip.record_in + clip.duration();
        self.timeline.refresh_duration();
        Ok(())
    }

    /// Shifts the source window; placement and duration stay fixed.
    /// The upper bound is unchecked since media length is unknown here.
    pub fn slip_clip(&mut self, name: &str, offset: Frame) -> Result<()> {
        let clip = self.editable_clip(name)?;
        if clip.source_in.to_frames() + offset < 0 {
            return Err(TimelineError::State(format!(
                "cannot slip {name} before media start"
            )));
        }

        self.checkpoint("slip")?;
        let clip = self.clip_mut(name)?;
        clip.source_in = clip.source_in + offset;
        clip.source_out = clip.source_out + offset;
        Ok(())
    }

    /// Shifts the record range; source content stays fixed.
    pub fn slide_clip(&mut self, name: &str, offset: Frame) -> Result<()> {
        let clip = self.editable_clip(name)?;
        if clip.record_in.to_frames() + offset < 0 {
            return Err(TimelineError::State(format!(
                "cannot slide {name} before timeline start"
            )));
        }

        self.checkpoint("slide")?;
        let clip = self.clip_mut(name)?;
        clip.record_in = clip.record_in + offset;
        clip.record_out = clip.record_out + offset;
        self.resort_track_of(name);
        Ok(())
    }

    // ── Split / ripple / gaps ─────────────────────────────────────

    /// Splits at `position` (strictly inside the record range) into
    /// `<name>_L` and `<name>_R`. Transitions naming the original are dropped.
    pub fn split_clip(&mut self, name: &str, position: Frame) -> Result<(String, String)> {
        let clip = self.editable_clip(name)?;
        let record = clip.record_range();
        if position <= record.start || position >= record.end() {
            return Err(TimelineError::State(format!(
                "split point {position} outside {name} ({}..{})",
                record.start,
                record.end()
            )));
        }

        let source_split = clip.source_in + (position - record.start);
        let record_split = Timecode::from_frames(position, clip.record_in.fps);

        let mut left = clip.clone();
        left.name = format!("{name}_L");
        left.source_out = source_split;
        left.record_out = record_split;

        let mut right = clip.clone();
        right.name = format!("{name}_R");
        right.source_in = source_split;
        right.record_in = record_split;

        let (kind, number) = self
            .timeline
            .locate_clip(name)
            .ok_or_else(|| TimelineError::NotFound(format!("clip {name}")))?;

        self.checkpoint("split")?;
        let names = (left.name.clone(), right.name.clone());
        if let Some(track) = self.timeline.track_mut(kind, number) {
            track.remove_clip(name);
            track.add_clip(left);
            track.add_clip(right);
        }
        let purged = self.timeline.purge_transitions_for(name);
        debug!("split {name} at {position}, purged {purged} transitions");
        Ok(names)
    }

    /// Deletes the clip and pulls later clips on the same track earlier by
    /// its record length. Other tracks are left alone. Fails when a later
    /// clip overlaps the deleted one, since it cannot move by the full span.
    pub fn ripple_delete(&mut self, name: &str) -> Result<Clip> {
        let (kind, number) = self
            .timeline
            .locate_clip(name)
            .ok_or_else(|| TimelineError::NotFound(format!("clip {name}")))?;
        let FrameRange { start: origin, duration: span } = self
            .timeline
            .find_clip(name)
            .map(Clip::record_range)
            .ok_or_else(|| TimelineError::NotFound(format!("clip {name}")))?;
        if let Some(track) = self.timeline.track(kind, number) {
            let later = track
                .clips
                .iter()
                .filter(|c| c.name != name && c.record_in.to_frames() > origin);
            ensure_shift_fits(later, -span, "ripple delete")?;
        }

        self.checkpoint("ripple delete")?;
        let track = self
            .timeline
            .track_mut(kind, number)
            .ok_or_else(|| TimelineError::NotFound(format!("track {}{number}", kind.letter())))?;
        let removed = track
            .remove_clip(name)
            .ok_or_else(|| TimelineError::NotFound(format!("clip {name}")))?;

        for clip in track.clips.iter_mut() {
            if clip.record_in.to_frames() > origin {
                clip.record_in = clip.record_in - span;
                clip.record_out = clip.record_out - span;
            }
        }
        track.sort_clips();

        self.timeline.purge_transitions_for(name);
        self.timeline.refresh_duration();
        debug!("ripple deleted {name}, closed {span} frames");
        Ok(removed)
    }

    /// Shifts clips on video track `track_number` starting at or after
    /// `position` by `duration`; a negative duration closes space but may
    /// not push any clip before frame 0. Returns how many clips moved.
    pub fn insert_gap(&mut self, position: Frame, duration: Frame, track_number: u32) -> Result<usize> {
        let track = self
            .timeline
            .track(TrackKind::Video, track_number)
            .ok_or_else(|| TimelineError::NotFound(format!("track V{track_number}")))?;
        let affected = track
            .clips
            .iter()
            .filter(|c| c.record_in.to_frames() >= position);
        ensure_shift_fits(affected, duration, "insert gap")?;

        self.checkpoint("insert gap")?;
        let mut moved = 0;
        if let Some(track) = self.timeline.track_mut(TrackKind::Video, track_number) {
            for clip in track.clips.iter_mut() {
                if clip.record_in.to_frames() >= position {
                    clip.record_in = clip.record_in + duration;
                    clip.record_out = clip.record_out + duration;
                    moved += 1;
                }
            }
            track.sort_clips();
        }
        self.timeline.refresh_duration();
        Ok(moved)
    }

    // ── Transitions & markers ─────────────────────────────────────

    /// At most one outgoing transition per clip; both ends must exist.
    pub fn add_transition(&mut self, transition: Transition) -> Result<()> {
        for clip_ref in [&transition.from_clip, &transition.to_clip] {
            if clip_ref.resolve(&self.timeline).is_none() {
                return Err(TimelineError::NotFound(format!("clip {clip_ref}")));
            }
        }

        self.checkpoint("add transition")?;
        self.timeline
            .transitions
            .retain(|t| t.from_clip != transition.from_clip);
        self.timeline.transitions.push(transition);
        Ok(())
    }

    pub fn remove_transition(&mut self, from_clip: &str) -> Result<Transition> {
        let idx = self
            .timeline
            .transitions
            .iter()
            .position(|t| t.from_clip.refers_to(from_clip))
            .ok_or_else(|| TimelineError::NotFound(format!("transition from {from_clip}")))?;

        self.checkpoint("remove transition")?;
        Ok(self.timeline.transitions.remove(idx))
    }

    pub fn add_marker(&mut self, marker: Marker) -> Result<()> {
        self.checkpoint("add marker")?;
        self.timeline.add_marker(marker);
        Ok(())
    }

    /// Offers every transition to the host; failures are counted, not fatal.
    pub fn apply_transitions(&self, host: &mut dyn TransitionHost) -> HostReport {
        let mut report = HostReport::default();
        for transition in &self.timeline.transitions {
            match host.apply_transition(transition) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    debug!("host did not apply transition: {e}");
                    report.failed += 1;
                }
            }
        }
        report
    }

    // ── Queries ───────────────────────────────────────────────────

    pub fn get_clip_at(&self, kind: TrackKind, track_number: u32, position: Frame) -> Option<&Clip> {
        self.timeline
            .track(kind, track_number)
            .and_then(|t| t.get_clip_at(position))
    }

    pub fn get_clip(&self, name: &str) -> Option<&Clip> {
        self.timeline.find_clip(name)
    }

    pub fn get_all_clips(&self) -> Vec<&Clip> {
        self.timeline.get_all_clips()
    }

    pub fn calculate_duration(&self) -> Frame {
        self.timeline.calculate_duration()
    }

    pub fn find_gaps(&self) -> Vec<FrameRange> {
        self.timeline.find_gaps()
    }

    pub fn get_clips_in_range(&self, start: Frame, end: Frame) -> Vec<&Clip> {
        self.timeline.clips_in_range(start, end)
    }

    /// Runtime in seconds at the timeline rate.
    pub fn calculate_runtime(&self) -> f64 {
        self.calculate_duration() as f64 / self.timeline.fps.as_f64()
    }

    pub fn calculate_runtime_formatted(&self) -> String {
        format_runtime(self.calculate_runtime())
    }
}

// Every clip must still start at or after frame 0 once shifted by `offset`.
fn ensure_shift_fits<'a>(clips: impl IntoIterator<Item = &'a Clip>, offset: Frame, op: &str) -> Result<()> {
    match clips.into_iter().find(|c| c.record_in.to_frames() + offset < 0) {
        Some(clip) => Err(TimelineError::State(format!(
            "{op} would move {} to frame {}",
            clip.name,
            clip.record_in.to_frames() + offset
        ))),
        None => Ok(()),
    }
}

/// `H:MM:SS` past the hour, otherwise `M:SS`.
pub fn format_runtime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;
    use crate::{TransitionKind, DEFAULT_FPS};

    fn clip(name: &str, source_in: Frame, source_out: Frame, record_in: Frame) -> Clip {
        Clip::from_frames(name, format!("/media/{name}.mov"), source_in, source_out, record_in, DEFAULT_FPS)
    }

    /// Three clips on V1: A 0-100, B 100-200, C 250-300; one on A1.
    fn manager() -> TimelineManager {
        let mut timeline = Timeline::new("Edit", DEFAULT_FPS);
        timeline.add_clip(clip("A", 0, 100, 0), TrackKind::Video, 1);
        timeline.add_clip(clip("B", 0, 100, 100), TrackKind::Video, 1);
        timeline.add_clip(clip("C", 10, 60, 250), TrackKind::Video, 1);
        timeline.add_clip(clip("M", 0, 300, 0), TrackKind::Audio, 1);
        TimelineManager::new(timeline)
    }

    fn record(m: &TimelineManager, name: &str) -> (Frame, Frame) {
        let c = m.get_clip(name).unwrap();
        (c.record_in.to_frames(), c.record_out.to_frames())
    }

    fn source(m: &TimelineManager, name: &str) -> (Frame, Frame) {
        let c = m.get_clip(name).unwrap();
        (c.source_in.to_frames(), c.source_out.to_frames())
    }

    #[test]
    fn test_add_clip_creates_track() {
        let mut m = manager();
        m.add_clip(clip("D", 0, 10, 0), 3, TrackKind::Video).unwrap();
        assert!(m.timeline().track(TrackKind::Video, 3).is_some());
        assert_eq!(m.get_clip("D").unwrap().track, 3);
    }

    #[test]
    fn test_remove_clip_purges_transitions() {
        let mut m = manager();
        m.add_transition(Transition::dissolve("A", "B", 12)).unwrap();
        m.add_transition(Transition::dissolve("B", "C", 12)).unwrap();

        m.remove_clip("B").unwrap();
        assert!(m.timeline().transitions.is_empty());
        assert!(matches!(m.remove_clip("B"), Err(TimelineError::NotFound(_))));
    }

    #[test]
    fn test_move_clip_preserves_duration() {
        let mut m = manager();
        m.move_clip("A", 400).unwrap();
        assert_eq!(record(&m, "A"), (400, 500));
        let order: Vec<&str> = m.timeline().video_tracks[0]
            .clips
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(order, vec!["B", "C", "A"]);
        assert_eq!(m.calculate_duration(), 500);
    }

    #[test]
    fn test_locked_clip_rejects_edits() {
        let mut m = manager();
        m.add_clip(clip("L", 0, 50, 600).locked(true), 1, TrackKind::Video).unwrap();
        let depth = m.history().undo_len();

        assert!(matches!(m.move_clip("L", 0), Err(TimelineError::State(_))));
        assert!(matches!(m.trim_clip_in("L", 5), Err(TimelineError::State(_))));
        assert!(matches!(m.slip_clip("L", 5), Err(TimelineError::State(_))));
        assert!(matches!(m.split_clip("L", 620), Err(TimelineError::State(_))));
        assert!(matches!(m.move_clip("nope", 0), Err(TimelineError::NotFound(_))));
        assert_eq!(m.history().undo_len(), depth);
    }

    #[test]
    fn test_trim_in_and_out() {
        let mut m = manager();
        m.trim_clip_in("A", 20).unwrap();
        assert_eq!(source(&m, "A"), (20, 100));
        assert_eq!(record(&m, "A"), (0, 100));

        m.trim_clip_out("A", 70).unwrap();
        assert_eq!(source(&m, "A"), (20, 70));
        assert_eq!(record(&m, "A"), (0, 50));

        assert!(matches!(m.trim_clip_in("A", 70), Err(TimelineError::State(_))));
        assert!(matches!(m.trim_clip_out("A", 20), Err(TimelineError::State(_))));
    }

    #[test]
    fn test_slip_keeps_record_range() {
        let mut m = manager();
        m.slip_clip("C", 30).unwrap();
        assert_eq!(source(&m, "C"), (40, 90));
        assert_eq!(record(&m, "C"), (250, 300));

        m.slip_clip("C", -40).unwrap();
        assert_eq!(source(&m, "C"), (0, 50));
        assert!(matches!(m.slip_clip("C", -1), Err(TimelineError::State(_))));
    }

    #[test]
    fn test_slide_keeps_source_range() {
        let mut m = manager();
        m.slide_clip("C", 50).unwrap();
        assert_eq!(record(&m, "C"), (300, 350));
        assert_eq!(source(&m, "C"), (10, 60));
        assert!(matches!(m.slide_clip("A", -1), Err(TimelineError::State(_))));
    }

    #[test]
    fn test_split_partitions_clip() {
        let mut m = manager();
        m.add_transition(Transition::dissolve("A", "B", 10)).unwrap();
        let (left, right) = m.split_clip("B", 140).unwrap();

        assert_eq!(record(&m, &left), (100, 140));
        assert_eq!(record(&m, &right), (140, 200));
        assert_eq!(source(&m, &left), (0, 40));
        assert_eq!(source(&m, &right), (40, 100));
        assert!(m.get_clip("B").is_none());
        assert!(m.timeline().transitions.is_empty());

        assert!(m.split_clip("A", 0).is_err());
        assert!(m.split_clip("A", 100).is_err());
    }

    #[test]
    fn test_ripple_delete_same_track_only() {
        let mut m = manager();
        m.ripple_delete("A").unwrap();
        assert_eq!(record(&m, "B"), (0, 100));
        assert_eq!(record(&m, "C"), (150, 200));
        assert_eq!(record(&m, "M"), (0, 300));
    }

    #[test]
    fn test_insert_and_close_gap() {
        let mut m = manager();
        assert_eq!(m.insert_gap(100, 25, 1).unwrap(), 2);
        assert_eq!(record(&m, "A"), (0, 100));
        assert_eq!(record(&m, "B"), (125, 225));
        assert_eq!(record(&m, "C"), (275, 325));

        m.insert_gap(125, -25, 1).unwrap();
        assert_eq!(record(&m, "B"), (100, 200));
        assert!(matches!(m.insert_gap(0, 10, 9), Err(TimelineError::NotFound(_))));
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut m = manager();
        let original = m.timeline().clone();

        m.ripple_delete("A").unwrap();
        m.slide_clip("C", 10).unwrap();
        let edited = m.timeline().clone();

        m.undo().unwrap();
        m.undo().unwrap();
        assert_eq!(m.timeline(), &original);
        assert!(matches!(m.undo(), Err(TimelineError::HistoryEmpty(_))));

        m.redo().unwrap();
        m.redo().unwrap();
        assert_eq!(m.timeline(), &edited);
        assert!(matches!(m.redo(), Err(TimelineError::HistoryEmpty(_))));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut m = manager();
        m.move_clip("A", 500).unwrap();
        m.undo().unwrap();
        assert!(m.history().can_redo());
        m.save_state().unwrap();
        assert!(!m.history().can_redo());
    }

    #[test]
    fn test_ripple_delete_refuses_overlapping_clip() {
        let mut timeline = Timeline::new("Overlap", DEFAULT_FPS);
        timeline.add_clip(clip("A", 0, 100, 0), TrackKind::Video, 1);
        timeline.add_clip(clip("B", 0, 100, 50), TrackKind::Video, 1);
        let mut m = TimelineManager::new(timeline);
        let before = m.timeline().clone();

        assert!(matches!(m.ripple_delete("A"), Err(TimelineError::State(_))));
        assert_eq!(m.timeline(), &before);
        assert!(!m.history().can_undo());

        // Removing the later clip shifts nothing and stays allowed.
        m.ripple_delete("B").unwrap();
        assert_eq!(record(&m, "A"), (0, 100));
    }

    #[test]
    fn test_insert_gap_cannot_cross_zero() {
        let mut timeline = Timeline::new("Close", DEFAULT_FPS);
        timeline.add_clip(clip("A", 0, 50, 10), TrackKind::Video, 1);
        let mut m = TimelineManager::new(timeline);

        assert!(matches!(m.insert_gap(0, -20, 1), Err(TimelineError::State(_))));
        assert_eq!(record(&m, "A"), (10, 60));
        assert!(!m.history().can_undo());

        assert_eq!(m.insert_gap(0, -10, 1).unwrap(), 1);
        assert_eq!(record(&m, "A"), (0, 50));
        assert_eq!(m.get_clip("A").unwrap().duration(), 50);
    }

    #[test]
    fn test_lock_guards_clip_edits_not_track_edits() {
        let mut m = manager();
        m.add_clip(clip("L", 0, 50, 300).locked(true), 1, TrackKind::Video).unwrap();

        m.ripple_delete("C").unwrap();
        assert_eq!(record(&m, "L"), (250, 300));
        m.insert_gap(0, 10, 1).unwrap();
        assert_eq!(record(&m, "L"), (260, 310));
        assert_eq!(m.remove_clip("L").unwrap().name, "L");
    }

    #[test]
    fn test_add_transition_one_outgoing_per_clip() {
        let mut m = manager();
        m.add_transition(Transition::dissolve("A", "B", 10)).unwrap();
        m.add_transition(Transition::new(TransitionKind::Wipe, 8, "A", "C")).unwrap();

        assert_eq!(m.timeline().transitions.len(), 1);
        assert_eq!(m.timeline().transitions[0].to_clip.name(), "C");
        assert!(matches!(
            m.add_transition(Transition::dissolve("A", "ghost", 10)),
            Err(TimelineError::NotFound(_))
        ));

        m.remove_transition("A").unwrap();
        assert!(m.remove_transition("A").is_err());
    }

    #[test]
    fn test_queries() {
        let m = manager();
        assert_eq!(m.get_clip_at(TrackKind::Video, 1, 150).unwrap().name, "B");
        assert!(m.get_clip_at(TrackKind::Video, 1, 220).is_none());

        let names: Vec<&str> = m.get_clips_in_range(90, 260).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "M", "B", "C"]);
        assert!(m.get_clips_in_range(300, 400).is_empty());

        assert_eq!(m.find_gaps(), vec![FrameRange::between(200, 250)]);
        assert!((m.calculate_runtime() - 12.5).abs() < 1e-9);
        assert_eq!(m.calculate_runtime_formatted(), "0:12");
    }

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(0.0), "0:00");
        assert_eq!(format_runtime(75.9), "1:15");
        assert_eq!(format_runtime(3725.0), "1:02:05");
    }

    #[test]
    fn test_null_host_fails_every_transition() {
        let mut m = manager();
        m.add_transition(Transition::dissolve("A", "B", 10)).unwrap();
        let report = m.apply_transitions(&mut NullHost);
        assert_eq!(report.applied, 0);
        assert_eq!(report.failed, 1);
    }
}
