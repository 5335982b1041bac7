//! Values that may depend on the target they are applied to.
//!
//! A `Resolvable` is either a fixed value or a function of the target, its
//! index and the number of targets matched by the same definition. Staggered
//! values (`index * 50.0`) and per-target colors are written this way.
//!
//! A `Named` value points into the timeline's reference table (`"@wave"`)
//! and is bound when its definition is added.

use serde::de::{self, Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;

use crate::types::{AnimationValue, Millis, TargetId};
use crate::units::TimeInput;

/// Where a value is being resolved.
#[derive(Debug, Clone, Copy)]
pub struct TargetContext<'a> {
    pub target: &'a TargetId,
    /// Position of the target among the targets of one definition.
    pub index: usize,
    /// Number of targets in that definition.
    pub len: usize,
}

type ResolveFn<T> = Arc<dyn Fn(&TargetContext<'_>) -> T + Send + Sync>;

/// A fixed value, a per-target resolver, or a named reference.
pub enum Resolvable<T> {
    Fixed(T),
    PerTarget(ResolveFn<T>),
    Named(String),
}

/// Keyframe value as written in a definition.
pub type PropertyValue = Resolvable<AnimationValue>;

impl<T: Clone> Resolvable<T> {
    /// Resolver called once per target.
    pub fn per_target<F>(f: F) -> Self
    where
        F: Fn(&TargetContext<'_>) -> T + Send + Sync + 'static,
    {
        Self::PerTarget(Arc::new(f))
    }

    /// Reference to a value registered on the timeline under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

impl<T: Clone + Default> Resolvable<T> {
    /// Value for one target. An unbound name resolves to `T::default()`.
    pub fn resolve(&self, ctx: &TargetContext<'_>) -> T {
        match self {
            Self::Fixed(value) => value.clone(),
            Self::PerTarget(f) => f(ctx),
            Self::Named(_) => T::default(),
        }
    }
}

impl<T: Clone> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(value) => Self::Fixed(value.clone()),
            Self::PerTarget(f) => Self::PerTarget(Arc::clone(f)),
            Self::Named(name) => Self::Named(name.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::PerTarget(_) => f.write_str("PerTarget(..)"),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

impl<T: Default> Default for Resolvable<T> {
    fn default() -> Self {
        Self::Fixed(T::default())
    }
}

impl<T> From<T> for Resolvable<T> {
    fn from(value: T) -> Self {
        Self::Fixed(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Fixed(AnimationValue::Number(value))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Fixed(AnimationValue::from(value))
    }
}

impl From<[f32; 4]> for PropertyValue {
    fn from(rgba: [f32; 4]) -> Self {
        Self::Fixed(AnimationValue::Color(rgba))
    }
}

impl From<i32> for Resolvable<Millis> {
    fn from(ms: i32) -> Self {
        Self::Fixed(ms as Millis)
    }
}

/// Serialized values are fixed. `"@name"` text is bound by the timeline.
impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        AnimationValue::deserialize(deserializer).map(Self::Fixed)
    }
}

/// A number of milliseconds, a time literal (`"250ms"`) or `"@name"`.
impl<'de> Deserialize<'de> for Resolvable<Millis> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match TimeInput::deserialize(deserializer)? {
            TimeInput::Text(text) if text.starts_with('@') => Ok(Self::Named(text)),
            input => input.to_ms().map(Self::Fixed).map_err(de::Error::custom),
        }
    }
}
