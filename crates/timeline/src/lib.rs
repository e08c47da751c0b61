use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod model;
pub use model::*;
mod edit_operations;
pub use edit_operations::*;
mod history;
pub use history::*;

pub mod assembly;
pub mod host;
pub mod markers;
pub mod timecode;

pub use markers::Marker;
pub use timecode::{Timecode, TimecodeFormat};

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("malformed input: {0}")]
    Format(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("history empty: {0}")]
    HistoryEmpty(&'static str),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TimelineError>;

pub type Frame = i64; // 0-based time in frames, negatives only as offsets

/// Rate used whenever a caller does not supply one.
pub const DEFAULT_FPS: Fps = Fps::new(24, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32,
}

impl Fps {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Build from a decimal rate such as `24.0` or `23.976`.
    ///
    /// Fractional rates are kept to three decimals so that the value written
    /// into text formats reads back identically.
    pub fn from_f64(rate: f64) -> Self {
        if !rate.is_finite() || rate <= 0.0 {
            return DEFAULT_FPS;
        }
        if rate.fract().abs() < 1e-9 {
            Self::new(rate as u32, 1)
        } else {
            Self::new((rate * 1000.0).round() as u32, 1000)
        }
    }

    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            return DEFAULT_FPS.as_f64();
        }
        self.num as f64 / self.den as f64
    }

    /// Whole frames per second used for timecode arithmetic (floored).
    pub fn timebase(&self) -> Frame {
        (self.as_f64().floor() as Frame).max(1)
    }

    /// Nearest integer rate, as written into FCPXML frame durations.
    pub fn rounded(&self) -> Frame {
        (self.as_f64().round() as Frame).max(1)
    }
}

impl Default for Fps {
    fn default() -> Self {
        DEFAULT_FPS
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{:.3}", self.as_f64())
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameRange {
    pub start: Frame,
    pub duration: Frame,
}

impl FrameRange {
    pub fn new(start: Frame, duration: Frame) -> Self {
        Self { start, duration }
    }

    pub fn between(start: Frame, end: Frame) -> Self {
        Self {
            start,
            duration: end - start,
        }
    }

    pub fn end(&self) -> Frame {
        self.start + self.duration
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: Frame, end: Frame) -> bool {
        self.start < end && self.end() > start
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Maximum number of undo snapshots retained.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
}

fn default_history_depth() -> usize {
    100
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            history_depth: default_history_depth(),
        }
    }
}
