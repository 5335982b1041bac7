//! Interpolation between keyframe values.
//!
//! Two layers:
//! - `Interpolate`: built-in blending for `AnimationValue` and its payloads
//! - `Interpolator`: a pluggable, per-keyframe capability that overrides the
//!   built-in blending for one segment
//!
//! Colors are blended per component. Text values have no midpoint and switch
//! from `from` to `to` halfway through the segment.

use std::fmt;
use std::sync::Arc;

use crate::types::AnimationValue;

/// Types that can be blended between two values.
pub trait Interpolate: Sized {
    /// Returns `self` at `t = 0.0` and `to` at `t = 1.0`.
    fn interpolate(&self, to: &Self, t: f64) -> Self;
}

#[inline]
fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        lerp(*self, *to, t)
    }
}

impl Interpolate for [f32; 4] {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        let mut out = [0.0f32; 4];
        for (i, channel) in out.iter_mut().enumerate() {
            *channel = lerp(self[i] as f64, to[i] as f64, t) as f32;
        }
        out
    }
}

impl Interpolate for AnimationValue {
    /// Variants must match; mismatched pairs behave like text (discrete).
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        match (self, to) {
            (Self::Number(a), Self::Number(b)) => Self::Number(a.interpolate(b, t)),
            (Self::Color(a), Self::Color(b)) => Self::Color(a.interpolate(b, t)),
            _ if t < 0.5 => self.clone(),
            _ => to.clone(),
        }
    }
}

/// Per-keyframe interpolation override.
///
/// Implemented for any `Fn(&AnimationValue, &AnimationValue, f64) -> AnimationValue`
/// closure, so callers can pass plain closures.
pub trait Interpolator: Send + Sync {
    fn interpolate(&self, from: &AnimationValue, to: &AnimationValue, t: f64) -> AnimationValue;
}

impl<F> Interpolator for F
where
    F: Fn(&AnimationValue, &AnimationValue, f64) -> AnimationValue + Send + Sync,
{
    fn interpolate(&self, from: &AnimationValue, to: &AnimationValue, t: f64) -> AnimationValue {
        self(from, to, t)
    }
}

impl fmt::Debug for dyn Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interpolator")
    }
}

/// Shared handle to an interpolator; keyframes and effects clone it freely.
pub type SharedInterpolator = Arc<dyn Interpolator>;

/// Wrap a closure as a [`SharedInterpolator`].
pub fn interpolator<F>(f: F) -> SharedInterpolator
where
    F: Fn(&AnimationValue, &AnimationValue, f64) -> AnimationValue + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Blend with `custom` when present, else with the built-in [`Interpolate`].
pub fn blend(
    custom: Option<&SharedInterpolator>,
    from: &AnimationValue,
    to: &AnimationValue,
    t: f64,
) -> AnimationValue {
    match custom {
        Some(interp) => interp.interpolate(from, to, t),
        None => from.interpolate(to, t),
    }
}
