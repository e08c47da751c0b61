//! Frame-accurate timecode.
//!
//! A `Timecode` stores a total frame count plus the rate it was counted at.
//! Hours, minutes, seconds and frames are derived from the floored rate
//! (`Fps::timebase`), so `29.97` counts 29 frames per second.

use crate::{Fps, Frame, Result, TimelineError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Sub};

/// Timecode display format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimecodeFormat {
    /// HH:MM:SS:FF
    #[default]
    NonDropFrame,
    /// HH:MM:SS;FF
    DropFrame,
    /// Seconds with decimals (SS.mmm)
    Seconds,
    /// Total frame count
    Frames,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timecode {
    frame: Frame,
    pub fps: Fps,
    #[serde(default)]
    pub drop_frame: bool,
}

impl Timecode {
    /// Build from wall-clock fields, validating every range.
    pub fn new(
        hours: u32,
        minutes: u32,
        seconds: u32,
        frames: u32,
        fps: Fps,
        drop_frame: bool,
    ) -> Result<Self> {
        let timebase = fps.timebase();
        if hours > 23 {
            return Err(TimelineError::Validation(format!(
                "hours must be 0-23, got {hours}"
            )));
        }
        if minutes > 59 {
            return Err(TimelineError::Validation(format!(
                "minutes must be 0-59, got {minutes}"
            )));
        }
        if seconds > 59 {
            return Err(TimelineError::Validation(format!(
                "seconds must be 0-59, got {seconds}"
            )));
        }
        if frames as Frame >= timebase {
            return Err(TimelineError::Validation(format!(
                "frames must be 0-{}, got {frames}",
                timebase - 1
            )));
        }

        let frame = hours as Frame * 3600 * timebase
            + minutes as Frame * 60 * timebase
            + seconds as Frame * timebase
            + frames as Frame;
        Ok(Self {
            frame,
            fps,
            drop_frame,
        })
    }

    /// Create timecode from a frame count; negative input clamps to zero.
    pub fn from_frames(frame: Frame, fps: Fps) -> Self {
        Self {
            frame: frame.max(0),
            fps,
            drop_frame: false,
        }
    }

    pub fn zero(fps: Fps) -> Self {
        Self::from_frames(0, fps)
    }

    /// Parse `HH:MM:SS:FF`, or `HH:MM:SS;FF` for drop-frame.
    pub fn from_string(s: &str, fps: Fps) -> Result<Self> {
        let s = s.trim();
        let drop_frame = s.contains(';');
        let parts: Vec<&str> = s.split(&[':', ';'][..]).collect();

        if parts.len() != 4 {
            return Err(TimelineError::Format(format!(
                "expected HH:MM:SS:FF, got {s:?}"
            )));
        }

        let mut fields = [0u32; 4];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            *slot = part
                .parse::<u32>()
                .map_err(|_| TimelineError::Format(format!("non-numeric field {part:?} in {s:?}")))?;
        }

        Self::new(fields[0], fields[1], fields[2], fields[3], fps, drop_frame)
    }

    pub fn to_frames(&self) -> Frame {
        self.frame
    }

    pub fn hours(&self) -> u32 {
        (self.frame / (3600 * self.fps.timebase())) as u32
    }

    pub fn minutes(&self) -> u32 {
        ((self.frame / (60 * self.fps.timebase())) % 60) as u32
    }

    pub fn seconds(&self) -> u32 {
        ((self.frame / self.fps.timebase()) % 60) as u32
    }

    pub fn frames(&self) -> u32 {
        (self.frame % self.fps.timebase()) as u32
    }

    pub fn to_seconds(&self) -> f64 {
        self.frame as f64 / self.fps.as_f64()
    }

    /// Same frame count re-tagged with another rate.
    pub fn with_fps(self, fps: Fps) -> Self {
        Self { fps, ..self }
    }

    pub fn same_rate(&self, other: &Timecode) -> bool {
        self.fps == other.fps
    }

    /// Addition that refuses to mix frame rates.
    pub fn checked_add(self, other: Timecode) -> Result<Timecode> {
        self.ensure_same_rate(&other)?;
        Ok(self + other)
    }

    /// Subtraction that refuses to mix frame rates; still clamps at zero.
    pub fn checked_sub(self, other: Timecode) -> Result<Timecode> {
        self.ensure_same_rate(&other)?;
        Ok(self - other)
    }

    fn ensure_same_rate(&self, other: &Timecode) -> Result<()> {
        if self.same_rate(other) {
            Ok(())
        } else {
            Err(TimelineError::Validation(format!(
                "frame rate mismatch: {} vs {}",
                self.fps, other.fps
            )))
        }
    }

    pub fn format_as(&self, format: TimecodeFormat) -> String {
        match format {
            TimecodeFormat::NonDropFrame => format!(
                "{:02}:{:02}:{:02}:{:02}",
                self.hours(),
                self.minutes(),
                self.seconds(),
                self.frames()
            ),
            TimecodeFormat::DropFrame => format!(
                "{:02}:{:02}:{:02};{:02}",
                self.hours(),
                self.minutes(),
                self.seconds(),
                self.frames()
            ),
            TimecodeFormat::Seconds => format!("{:.3}", self.to_seconds()),
            TimecodeFormat::Frames => self.frame.to_string(),
        }
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = if self.drop_frame {
            TimecodeFormat::DropFrame
        } else {
            TimecodeFormat::NonDropFrame
        };
        f.write_str(&self.format_as(format))
    }
}

// Equality and ordering look at the frame count only, whatever the rate.
impl PartialEq for Timecode {
    fn eq(&self, other: &Self) -> bool {
        self.frame == other.frame
    }
}

impl Eq for Timecode {}

impl PartialOrd for Timecode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timecode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frame.cmp(&other.frame)
    }
}

impl Hash for Timecode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.frame.hash(state);
    }
}

impl Add for Timecode {
    type Output = Timecode;

    fn add(self, rhs: Timecode) -> Timecode {
        self + rhs.frame
    }
}

impl Sub for Timecode {
    type Output = Timecode;

    fn sub(self, rhs: Timecode) -> Timecode {
        self - rhs.frame
    }
}

impl Add<Frame> for Timecode {
    type Output = Timecode;

    fn add(self, rhs: Frame) -> Timecode {
        Timecode {
            frame: (self.frame + rhs).max(0),
            ..self
        }
    }
}

impl Sub<Frame> for Timecode {
    type Output = Timecode;

    fn sub(self, rhs: Frame) -> Timecode {
        Timecode {
            frame: (self.frame - rhs).max(0),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FPS24: Fps = Fps::new(24, 1);

    #[test]
    fn test_timecode_non_drop_24fps() {
        assert_eq!(Timecode::from_frames(0, FPS24).to_string(), "00:00:00:00");
        assert_eq!(Timecode::from_frames(24, FPS24).to_string(), "00:00:01:00");
        assert_eq!(Timecode::from_frames(1440, FPS24).to_string(), "00:01:00:00");
        assert_eq!(Timecode::from_frames(86400, FPS24).to_string(), "01:00:00:00");
        assert_eq!(Timecode::from_frames(100, FPS24).to_string(), "00:00:04:04");
    }

    #[test]
    fn test_from_frames_round_trip() {
        for fps in [FPS24, Fps::new(25, 1), Fps::new(30, 1), Fps::from_f64(29.97)] {
            for frame in (0..200_000).step_by(997) {
                assert_eq!(Timecode::from_frames(frame, fps).to_frames(), frame);
            }
        }
    }

    #[test]
    fn test_negative_frames_clamp() {
        assert_eq!(Timecode::from_frames(-50, FPS24).to_frames(), 0);
    }

    #[test]
    fn test_timecode_parse() {
        let tc = Timecode::from_string("01:23:45:12", FPS24).unwrap();
        assert_eq!(tc.hours(), 1);
        assert_eq!(tc.minutes(), 23);
        assert_eq!(tc.seconds(), 45);
        assert_eq!(tc.frames(), 12);
        assert!(!tc.drop_frame);

        let tc = Timecode::from_string("00:00:01;00", Fps::new(30, 1)).unwrap();
        assert!(tc.drop_frame);
        assert_eq!(tc.to_string(), "00:00:01;00");
    }

    #[test]
    fn test_string_round_trip() {
        for frame in (0..100_000).step_by(1231) {
            let tc = Timecode::from_frames(frame, FPS24);
            let parsed = Timecode::from_string(&tc.to_string(), tc.fps).unwrap();
            assert_eq!(parsed, tc);
        }
    }

    #[test]
    fn test_parse_rejects_wrong_part_count() {
        let err = Timecode::from_string("00:00:01", FPS24).unwrap_err();
        assert!(matches!(err, TimelineError::Format(_)));
        let err = Timecode::from_string("00:aa:01:00", FPS24).unwrap_err();
        assert!(matches!(err, TimelineError::Format(_)));
    }

    #[test]
    fn test_new_validates_ranges() {
        assert!(Timecode::new(24, 0, 0, 0, FPS24, false).is_err());
        assert!(Timecode::new(0, 60, 0, 0, FPS24, false).is_err());
        assert!(Timecode::new(0, 0, 60, 0, FPS24, false).is_err());
        assert!(Timecode::new(0, 0, 0, 24, FPS24, false).is_err());
        assert!(Timecode::new(23, 59, 59, 23, FPS24, false).is_ok());
        assert!(matches!(
            Timecode::from_string("00:00:00:30", FPS24),
            Err(TimelineError::Validation(_))
        ));
    }

    #[test]
    fn test_subtraction_clamps_at_zero() {
        let small = Timecode::from_frames(10, FPS24);
        let large = Timecode::from_frames(50, FPS24);
        assert_eq!((small - large).to_frames(), 0);
        assert_eq!((large - small).to_frames(), 40);
        assert_eq!((small + large).to_frames(), 60);
        assert_eq!((small - 100).to_frames(), 0);
    }

    #[test]
    fn test_cross_rate_comparison_uses_raw_frames() {
        let a = Timecode::from_frames(48, FPS24);
        let b = Timecode::from_frames(48, Fps::new(30, 1));
        assert_eq!(a, b);
        assert!(a.checked_add(b).is_err());
        assert!(a.checked_sub(b).is_err());
        assert_eq!(a.checked_add(a).unwrap().to_frames(), 96);
    }

    #[test]
    fn test_format_as() {
        let tc = Timecode::from_frames(36, FPS24);
        assert_eq!(tc.format_as(TimecodeFormat::Seconds), "1.500");
        assert_eq!(tc.format_as(TimecodeFormat::Frames), "36");
        assert_eq!(tc.format_as(TimecodeFormat::DropFrame), "00:00:01;12");
    }
}
