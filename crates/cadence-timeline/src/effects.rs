//! Effect compilation.
//!
//! Turns one `TargetConfiguration` into one `Effect` per property: a
//! keyframe list normalized to the configuration's window whose first
//! offset is 0, last offset is 1, and every value is defined.
//!
//! # Pipeline
//!
//! ```text
//! PropertyKeyframe (absolute time, optional value)
//!   -> EffectFrameDraft (offset in window, resolved value)   grouped per prop
//!   -> Plugin::on_will_animate                                 drafts editable
//!   -> sort by offset
//!   -> offset 0 from Plugin::get_value when missing or empty
//!   -> empty frames take the previous value and interpolator
//!   -> offset 1 from the last value when missing
//!   -> Effect
//! ```

use std::cmp::Ordering;

use tracing::trace;

use crate::easing::EasingFunction;
use crate::interpolate::{blend, SharedInterpolator};
use crate::keyframes::TargetConfiguration;
use crate::plugin::Plugin;
use crate::resolve::TargetContext;
use crate::types::{AnimationValue, Millis, TargetId};

/// A keyframe between grouping and finalization.
#[derive(Debug, Clone)]
pub struct EffectFrameDraft {
    pub offset: f64,
    pub value: Option<AnimationValue>,
    pub easing: Option<EasingFunction>,
    pub interpolate: Option<SharedInterpolator>,
}

/// Per-property drafts of one target, in property order.
///
/// Handed to `Plugin::on_will_animate`, which may edit, add or remove
/// properties before effects are built.
#[derive(Debug, Clone, Default)]
pub struct PropertyEffects {
    entries: Vec<(String, Vec<EffectFrameDraft>)>,
}

impl PropertyEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prop: &str) -> Option<&[EffectFrameDraft]> {
        self.entries
            .iter()
            .find(|(name, _)| name == prop)
            .map(|(_, frames)| frames.as_slice())
    }

    pub fn get_mut(&mut self, prop: &str) -> Option<&mut Vec<EffectFrameDraft>> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == prop)
            .map(|(_, frames)| frames)
    }

    /// Drafts for `prop`, creating an empty list at the end if missing.
    pub fn entry(&mut self, prop: &str) -> &mut Vec<EffectFrameDraft> {
        let index = match self.entries.iter().position(|(name, _)| name == prop) {
            Some(index) => index,
            None => {
                self.entries.push((prop.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    pub fn remove(&mut self, prop: &str) -> Option<Vec<EffectFrameDraft>> {
        let index = self.entries.iter().position(|(name, _)| name == prop)?;
        Some(self.entries.remove(index).1)
    }

    pub fn props(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for PropertyEffects {
    type Item = (String, Vec<EffectFrameDraft>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A finalized keyframe.
#[derive(Debug, Clone)]
pub struct EffectFrame {
    pub offset: f64,
    pub value: AnimationValue,
    /// Easing of the segment starting at this frame; `None` is linear.
    pub easing: Option<EasingFunction>,
    /// Interpolator of the segment starting at this frame.
    pub interpolate: Option<SharedInterpolator>,
}

/// A compiled, self-contained animation of one property on one target.
#[derive(Debug, Clone)]
pub struct Effect {
    pub plugin: String,
    pub target: TargetId,
    pub prop: String,
    /// Window on the timeline, shared by every effect of the target.
    pub from: Millis,
    pub to: Millis,
    /// Non-empty; offsets start at 0, end at 1 and never decrease.
    pub keyframes: Vec<EffectFrame>,
}

static_assertions::assert_impl_all!(Effect: Send, Sync);

impl Effect {
    /// Frames surrounding `offset` and the local progress between them.
    pub fn find_keyframes(&self, offset: f64) -> Option<(&EffectFrame, &EffectFrame, f64)> {
        let offset = offset.clamp(0.0, 1.0);
        let from_idx = self.keyframes.iter().rposition(|k| k.offset <= offset)?;
        let to_idx = (from_idx + 1).min(self.keyframes.len() - 1);

        let from = &self.keyframes[from_idx];
        let to = &self.keyframes[to_idx];

        let range = to.offset - from.offset;
        let local = if from_idx == to_idx || range <= 0.0 {
            0.0
        } else {
            (offset - from.offset) / range
        };

        Some((from, to, local))
    }

    /// Value of the property at `offset` within the effect.
    pub fn value_at(&self, offset: f64) -> Option<AnimationValue> {
        let (from, to, local) = self.find_keyframes(offset)?;
        let eased = from.easing.unwrap_or(EasingFunction::Linear).evaluate(local);
        Some(blend(from.interpolate.as_ref(), &from.value, &to.value, eased))
    }
}

/// Compile every property of `config` into an effect.
pub fn compile(config: &TargetConfiguration, plugin: &dyn Plugin) -> Vec<Effect> {
    let divisor = if config.duration != 0.0 { config.duration } else { 1.0 };

    let mut drafts = PropertyEffects::new();
    for name in &config.prop_names {
        drafts.entry(name);
    }

    for kf in &config.keyframes {
        let offset = (kf.time - config.from) / divisor;
        let ctx = TargetContext {
            target: &config.target,
            index: kf.index,
            len: config.target_length,
        };
        let value = kf.value.as_ref().map(|v| v.resolve(&ctx));

        let frames = drafts.entry(&kf.prop);
        match frames.iter_mut().find(|d| d.offset == offset) {
            Some(existing) => {
                existing.value = value;
                existing.easing = kf.easing;
                existing.interpolate = kf.interpolate.clone();
            }
            None => frames.push(EffectFrameDraft {
                offset,
                value,
                easing: kf.easing,
                interpolate: kf.interpolate.clone(),
            }),
        }
    }

    plugin.on_will_animate(config, &mut drafts);

    let mut effects = Vec::with_capacity(drafts.len());
    for (prop, mut frames) in drafts {
        if frames.is_empty() {
            continue;
        }

        frames.sort_by(|a, b| a.offset.partial_cmp(&b.offset).unwrap_or(Ordering::Equal));
        fill_start(config, plugin, &prop, &mut frames);

        let mut keyframes: Vec<EffectFrame> = Vec::with_capacity(frames.len() + 1);
        for draft in frames {
            let (value, interpolate) = match (draft.value, keyframes.last()) {
                (Some(value), _) => (value, draft.interpolate),
                (None, Some(prev)) => (prev.value.clone(), prev.interpolate.clone()),
                (None, None) => (plugin.get_value(&config.target, &prop), None),
            };
            keyframes.push(EffectFrame {
                offset: draft.offset,
                value,
                easing: draft.easing,
                interpolate,
            });
        }

        if let Some(last) = keyframes.last().filter(|k| k.offset != 1.0).cloned() {
            keyframes.push(EffectFrame {
                offset: 1.0,
                value: last.value,
                easing: Some(config.easing),
                interpolate: None,
            });
        }

        trace!(
            target_id = %config.target,
            prop = %prop,
            frames = keyframes.len(),
            "compiled effect"
        );

        effects.push(Effect {
            plugin: plugin.name().to_string(),
            target: config.target.clone(),
            prop,
            from: config.from,
            to: config.to,
            keyframes,
        });
    }

    effects
}

/// Guarantee a valued frame at offset 0, reading the live value.
fn fill_start(
    config: &TargetConfiguration,
    plugin: &dyn Plugin,
    prop: &str,
    frames: &mut Vec<EffectFrameDraft>,
) {
    match frames.iter_mut().find(|d| d.offset == 0.0) {
        Some(first) if first.value.is_some() => {}
        Some(first) => {
            first.value = Some(plugin.get_value(&config.target, prop));
            first.easing = Some(config.easing);
            first.interpolate = None;
        }
        None => frames.insert(
            0,
            EffectFrameDraft {
                offset: 0.0,
                value: Some(plugin.get_value(&config.target, prop)),
                easing: Some(config.easing),
                interpolate: None,
            },
        ),
    }
}
