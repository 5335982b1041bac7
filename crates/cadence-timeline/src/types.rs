//! Core timeline types.
//!
//! - `TargetId`: Opaque handle for an animated target
//! - `AnimationValue`: Value carried by a keyframe
//! - `PlayState`: Lifecycle state of a timeline
//! - `Direction` / `IterationCount`: Playback configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Time in milliseconds.
pub type Millis = f64;

/// Opaque handle identifying an animated target.
///
/// Targets are compared by identity string; the host decides what the
/// string refers to (a node id, an object key, a selector match).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TargetId(Arc<str>);

impl TargetId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<TargetId> for String {
    fn from(id: TargetId) -> Self {
        id.0.to_string()
    }
}

/// A value a keyframe can hold.
///
/// Serialized untagged so JSON definitions can use plain numbers,
/// `[r, g, b, a]` arrays and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnimationValue {
    /// Numeric value (opacity, offsets, sizes).
    Number(f64),
    /// RGBA color, components in 0.0-1.0.
    Color([f32; 4]),
    /// Anything else; interpolated discretely.
    Text(String),
}

impl AnimationValue {
    /// Numeric payload, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Default for AnimationValue {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl fmt::Display for AnimationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Color([r, g, b, a]) => write!(f, "rgba({}, {}, {}, {})", r, g, b, a),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for AnimationValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for AnimationValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<[f32; 4]> for AnimationValue {
    fn from(rgba: [f32; 4]) -> Self {
        Self::Color(rgba)
    }
}

impl From<&str> for AnimationValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AnimationValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Lifecycle state of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    /// Nothing compiled, time reset.
    #[default]
    Idle,
    /// `play` requested; the next frame positions the clock and starts running.
    Pending,
    /// Advancing on every frame.
    Running,
    /// Held at the current time.
    Paused,
    /// Played through every requested iteration.
    Finished,
}

/// Direction applied between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Every iteration restarts in the current playback direction.
    #[default]
    Normal,
    /// The playback rate flips sign at the end of each iteration.
    Alternate,
}

/// How many times a timeline plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationCount {
    /// Play a fixed number of iterations.
    Count(u32),
    /// Play until paused, cancelled or finished explicitly.
    Infinite,
}

impl Default for IterationCount {
    fn default() -> Self {
        Self::Count(1)
    }
}

impl IterationCount {
    /// True once `completed` iterations satisfy this count.
    pub fn is_reached(&self, completed: u32) -> bool {
        match self {
            Self::Infinite => false,
            Self::Count(count) => completed >= *count,
        }
    }
}

impl From<u32> for IterationCount {
    fn from(count: u32) -> Self {
        Self::Count(count)
    }
}
