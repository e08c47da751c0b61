//! Timeline markers

use crate::{Frame, Timecode};
use serde::{Deserialize, Serialize};

/// Timeline marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub position: Timecode,

    /// Color in hex format (e.g., "#FF0000")
    #[serde(default = "default_marker_color")]
    pub color: String,

    /// Optional note/comment
    #[serde(default)]
    pub note: String,
}

fn default_marker_color() -> String {
    "#4A9EFF".to_string() // Blue
}

impl Marker {
    pub fn new(name: impl Into<String>, position: Timecode) -> Self {
        Self {
            name: name.into(),
            position,
            color: default_marker_color(),
            note: String::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn frame(&self) -> Frame {
        self.position.to_frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_FPS;

    fn marker(name: &str, frame: Frame) -> Marker {
        Marker::new(name, Timecode::from_frames(frame, DEFAULT_FPS))
    }

    #[test]
    fn test_builders() {
        let m = marker("Review", 10).with_color("#FF0000").with_note("check grade");
        assert_eq!(m.color, "#FF0000");
        assert_eq!(m.note, "check grade");
        assert_eq!(m.frame(), 10);
    }
}
