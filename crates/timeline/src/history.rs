//! Snapshot-based undo/redo.
//!
//! Every history entry is a full copy of the timeline. `Snapshot` is the seam
//! for swapping in a cheaper representation without touching the manager.

use chrono::{DateTime, Utc};

use crate::{Result, Timeline};

pub trait Snapshot: Sized {
    fn capture(timeline: &Timeline, label: &str) -> Result<Self>;
    fn restore(&self) -> Result<Timeline>;
    fn label(&self) -> &str;
}

/// Snapshot stored as the canonical serialized timeline.
#[derive(Debug, Clone)]
pub struct JsonSnapshot {
    label: String,
    captured_at: DateTime<Utc>,
    json: String,
}

impl JsonSnapshot {
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl Snapshot for JsonSnapshot {
    fn capture(timeline: &Timeline, label: &str) -> Result<Self> {
        Ok(Self {
            label: label.to_string(),
            captured_at: Utc::now(),
            json: serde_json::to_string(timeline)?,
        })
    }

    fn restore(&self) -> Result<Timeline> {
        Ok(serde_json::from_str(&self.json)?)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Snapshot held as an in-memory deep clone.
#[derive(Debug, Clone)]
pub struct CloneSnapshot {
    label: String,
    timeline: Timeline,
}

impl Snapshot for CloneSnapshot {
    fn capture(timeline: &Timeline, label: &str) -> Result<Self> {
        Ok(Self {
            label: label.to_string(),
            timeline: timeline.clone(),
        })
    }

    fn restore(&self) -> Result<Timeline> {
        Ok(self.timeline.clone())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotHistory<S: Snapshot = JsonSnapshot> {
    undo_stack: Vec<S>,
    redo_stack: Vec<S>,
    depth: usize,
}

impl<S: Snapshot> SnapshotHistory<S> {
    pub fn new(depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            depth: depth.max(1),
        }
    }

    /// Record `timeline` as the state to return to; any redo history is lost.
    pub fn push(&mut self, timeline: &Timeline, label: &str) -> Result<()> {
        let snapshot = S::capture(timeline, label)?;
        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > self.depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        Ok(())
    }

    pub fn undo(&mut self, current: &mut Timeline) -> Result<()> {
        let snapshot = self
            .undo_stack
            .pop()
            .ok_or(crate::TimelineError::HistoryEmpty("undo stack"))?;
        swap_in(current, snapshot, &mut self.undo_stack, &mut self.redo_stack)
    }

    pub fn redo(&mut self, current: &mut Timeline) -> Result<()> {
        let snapshot = self
            .redo_stack
            .pop()
            .ok_or(crate::TimelineError::HistoryEmpty("redo stack"))?;
        swap_in(current, snapshot, &mut self.redo_stack, &mut self.undo_stack)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Labels of undoable steps, most recent last.
    pub fn undo_labels(&self) -> Vec<&str> {
        self.undo_stack.iter().map(Snapshot::label).collect()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl<S: Snapshot> Default for SnapshotHistory<S> {
    fn default() -> Self {
        Self::new(crate::ManagerConfig::default().history_depth)
    }
}

// Restores `snapshot` into `current`, parking the displaced state on `to`.
// On any failure the snapshot goes back where it came from.
fn swap_in<S: Snapshot>(
    current: &mut Timeline,
    snapshot: S,
    from: &mut Vec<S>,
    to: &mut Vec<S>,
) -> Result<()> {
    let swapped = snapshot
        .restore()
        .and_then(|restored| S::capture(current, snapshot.label()).map(|displaced| (restored, displaced)));
    match swapped {
        Ok((restored, displaced)) => {
            to.push(displaced);
            *current = restored;
            Ok(())
        }
        Err(e) => {
            from.push(snapshot);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TimelineError, DEFAULT_FPS};

    fn exercise<S: Snapshot>() {
        let mut history: SnapshotHistory<S> = SnapshotHistory::new(10);
        let mut timeline = Timeline::new("first", DEFAULT_FPS);

        assert!(matches!(
            history.undo(&mut timeline),
            Err(TimelineError::HistoryEmpty(_))
        ));

        history.push(&timeline, "rename").unwrap();
        timeline.name = "second".to_string();

        history.undo(&mut timeline).unwrap();
        assert_eq!(timeline.name, "first");
        assert!(history.can_redo());

        history.redo(&mut timeline).unwrap();
        assert_eq!(timeline.name, "second");
        assert!(!history.can_redo());
        assert_eq!(history.undo_labels(), vec!["rename"]);
    }

    #[test]
    fn test_json_snapshot_history() {
        exercise::<JsonSnapshot>();
    }

    #[test]
    fn test_json_snapshot_is_stamped() {
        let before = Utc::now();
        let snapshot = JsonSnapshot::capture(&Timeline::new("stamped", DEFAULT_FPS), "stamp").unwrap();
        assert!(snapshot.captured_at() >= before);
        assert!(snapshot.captured_at() <= Utc::now());
        assert_eq!(snapshot.restore().unwrap().name, "stamped");
    }

    #[test]
    fn test_clone_snapshot_history() {
        exercise::<CloneSnapshot>();
    }

    /// Refuses to capture a timeline named "frozen".
    struct PickySnapshot(CloneSnapshot);

    impl Snapshot for PickySnapshot {
        fn capture(timeline: &Timeline, label: &str) -> Result<Self> {
            if timeline.name == "frozen" {
                return Err(TimelineError::State("cannot capture".to_string()));
            }
            Ok(Self(CloneSnapshot::capture(timeline, label)?))
        }

        fn restore(&self) -> Result<Timeline> {
            self.0.restore()
        }

        fn label(&self) -> &str {
            self.0.label()
        }
    }

    #[test]
    fn test_failed_capture_keeps_snapshot() {
        let mut history: SnapshotHistory<PickySnapshot> = SnapshotHistory::new(10);
        let mut timeline = Timeline::new("before", DEFAULT_FPS);
        history.push(&timeline, "rename").unwrap();
        timeline.name = "frozen".to_string();

        assert!(matches!(history.undo(&mut timeline), Err(TimelineError::State(_))));
        assert_eq!(timeline.name, "frozen");
        assert_eq!(history.undo_labels(), vec!["rename"]);
        assert_eq!(history.redo_len(), 0);

        timeline.name = "thawed".to_string();
        history.undo(&mut timeline).unwrap();
        assert_eq!(timeline.name, "before");
    }

    #[test]
    fn test_push_clears_redo_and_caps_depth() {
        let mut history: SnapshotHistory = SnapshotHistory::new(2);
        let mut timeline = Timeline::new("t0", DEFAULT_FPS);
        for i in 1..=3 {
            history.push(&timeline, "step").unwrap();
            timeline.name = format!("t{i}");
        }
        assert_eq!(history.undo_len(), 2);

        history.undo(&mut timeline).unwrap();
        assert_eq!(history.redo_len(), 1);
        history.push(&timeline, "new branch").unwrap();
        assert_eq!(history.redo_len(), 0);
    }
}
