//! Keyframe aggregation per target.
//!
//! Every `(plugin, target)` pair owns one `TargetConfiguration`. Each
//! definition that touches a property of that target inserts its keyframes
//! into the configuration at absolute timeline times:
//!
//! ```text
//! insert(opacity, [1, 0], from: 0, to: 1000)
//!   -> opacity @0 = 1, opacity @1000 = 0
//! insert(opacity, [0.5], from: 1000, to: 1500)
//!   -> opacity @1000 (value kept), opacity @1500 = 0.5
//! ```
//!
//! Keyframes landing on the same `(prop, time)` are merged: the later value
//! wins, the first keyframe's easing stays. Every insertion also guarantees a
//! keyframe at both ends of its window so the effect compiler can fill those
//! from neighbors.

use std::cmp::Ordering;

use crate::easing::EasingFunction;
use crate::interpolate::SharedInterpolator;
use crate::offsets::{infer_offsets, HasOffset};
use crate::resolve::PropertyValue;
use crate::types::{Millis, TargetId};

/// One keyframe as written in a definition, before it is placed in time.
#[derive(Debug, Clone, Default)]
pub struct KeyframeSpec {
    /// `None` leaves a hole filled from the previous keyframe at compile time.
    pub value: Option<PropertyValue>,
    /// Position in 0.0-1.0 within the definition's window.
    pub offset: Option<f64>,
    pub easing: Option<EasingFunction>,
    pub interpolate: Option<SharedInterpolator>,
    /// Name of a registered interpolator, bound when the definition is added.
    pub interpolate_ref: Option<String>,
}

impl KeyframeSpec {
    pub fn value(value: impl Into<PropertyValue>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// A keyframe without a value.
    pub fn hold() -> Self {
        Self::default()
    }

    pub fn at(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn with_interpolator(mut self, interpolate: SharedInterpolator) -> Self {
        self.interpolate = Some(interpolate);
        self
    }

    pub fn with_interpolator_ref(mut self, name: impl Into<String>) -> Self {
        self.interpolate_ref = Some(name.into());
        self
    }
}

impl HasOffset for KeyframeSpec {
    fn offset(&self) -> Option<f64> {
        self.offset
    }

    fn set_offset(&mut self, offset: f64) {
        self.offset = Some(offset);
    }
}

/// A keyframe placed at an absolute time on the timeline.
#[derive(Debug, Clone)]
pub struct PropertyKeyframe {
    /// Whole milliseconds from the timeline start.
    pub time: Millis,
    pub prop: String,
    pub value: Option<PropertyValue>,
    pub easing: Option<EasingFunction>,
    pub interpolate: Option<SharedInterpolator>,
    /// Target index within the definition that inserted this keyframe.
    pub index: usize,
}

/// One property's worth of keyframes to insert for one target.
#[derive(Debug, Clone)]
pub struct PropertyInsert<'a> {
    pub prop: &'a str,
    pub keyframes: &'a [KeyframeSpec],
    pub from: Millis,
    pub to: Millis,
    /// Easing for keyframes that do not name one.
    pub easing: EasingFunction,
    /// Interpolator for keyframes that do not name one.
    pub interpolate: Option<SharedInterpolator>,
    /// Per-target offset; target `i` starts `stagger * (i + 1)` later.
    pub stagger: Millis,
    /// Delay already resolved for this target.
    pub delay: Millis,
}

/// All keyframes of one target for one plugin.
#[derive(Debug, Clone)]
pub struct TargetConfiguration {
    pub plugin: String,
    pub target: TargetId,
    /// Earliest keyframe time.
    pub from: Millis,
    /// Latest keyframe time.
    pub to: Millis,
    pub duration: Millis,
    /// Easing used for synthesized keyframes.
    pub easing: EasingFunction,
    /// Idle time after `to` before the next sequential definition starts.
    pub end_delay: Millis,
    /// Number of targets in the definition that created this configuration.
    pub target_length: usize,
    /// Sorted by `time`.
    pub keyframes: Vec<PropertyKeyframe>,
    /// Properties in first-insertion order.
    pub prop_names: Vec<String>,
}

impl TargetConfiguration {
    pub fn new(plugin: impl Into<String>, target: TargetId, target_length: usize) -> Self {
        Self {
            plugin: plugin.into(),
            target,
            from: 0.0,
            to: 0.0,
            duration: 0.0,
            easing: EasingFunction::default(),
            end_delay: 0.0,
            target_length,
            keyframes: Vec::new(),
            prop_names: Vec::new(),
        }
    }

    pub fn with_easing(mut self, easing: EasingFunction) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_end_delay(mut self, end_delay: Millis) -> Self {
        self.end_delay = end_delay;
        self
    }

    /// Insert one property's keyframes for the target at `index`.
    ///
    /// An empty keyframe list inserts nothing.
    pub fn insert(&mut self, index: usize, insert: PropertyInsert<'_>) {
        if insert.keyframes.is_empty() {
            return;
        }

        let stagger_ms = if insert.stagger != 0.0 {
            insert.stagger * (index + 1) as Millis
        } else {
            0.0
        };
        let from = (stagger_ms + insert.delay + insert.from).max(0.0);
        let duration = insert.to - insert.from;
        let name = insert.prop;

        let mut specs = insert.keyframes.to_vec();
        let last = specs.len() - 1;
        for (i, spec) in specs.iter_mut().enumerate() {
            if spec.offset.is_none() {
                if i == last {
                    spec.offset = Some(1.0);
                } else if i == 0 {
                    spec.offset = Some(0.0);
                }
            }
        }
        infer_offsets(&mut specs);

        for spec in specs {
            let offset = spec.offset.unwrap_or(0.0);
            let time = (duration * offset + from).floor();

            if let Some(existing) = self.find_mut(name, time) {
                if spec.value.is_some() {
                    existing.value = spec.value;
                }
                continue;
            }

            self.keyframes.push(PropertyKeyframe {
                time,
                prop: name.to_string(),
                value: spec.value,
                easing: Some(spec.easing.unwrap_or(insert.easing)),
                interpolate: spec.interpolate.or_else(|| insert.interpolate.clone()),
                index,
            });
        }

        let start = from.floor();
        if self.find_mut(name, start).is_none() {
            self.keyframes.push(PropertyKeyframe {
                time: start,
                prop: name.to_string(),
                value: None,
                easing: Some(insert.easing),
                interpolate: None,
                index,
            });
        }

        let end = (from + duration).floor();
        if self.find_mut(name, end).is_none() {
            self.keyframes.push(PropertyKeyframe {
                time: end,
                prop: name.to_string(),
                value: None,
                easing: None,
                interpolate: None,
                index,
            });
        }

        if !self.prop_names.iter().any(|p| p == name) {
            self.prop_names.push(name.to_string());
        }

        self.keyframes
            .sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal));
        self.recalculate_window();
    }

    /// Keyframes of one property, in time order.
    pub fn property_keyframes<'a>(
        &'a self,
        prop: &'a str,
    ) -> impl Iterator<Item = &'a PropertyKeyframe> + 'a {
        self.keyframes.iter().filter(move |k| k.prop == prop)
    }

    fn find_mut(&mut self, prop: &str, time: Millis) -> Option<&mut PropertyKeyframe> {
        self.keyframes
            .iter_mut()
            .find(|k| k.prop == prop && k.time == time)
    }

    fn recalculate_window(&mut self) {
        let mut times = self.keyframes.iter().map(|k| k.time);
        let Some(first) = times.next() else {
            return;
        };
        let (from, to) = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        self.from = from;
        self.to = to;
        self.duration = to - from;
    }
}
