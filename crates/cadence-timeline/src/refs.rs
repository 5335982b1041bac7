//! Named references for declarative definitions.
//!
//! Things a serialized definition cannot carry (target groups, per-target
//! resolvers, interpolators) are registered on a timeline under a name and
//! written as `"@name"` where the definition needs them:
//!
//! ```json
//! { "targets": "@dots", "delay": "@wave", "store": { "x": [0, "@peak"] } }
//! ```
//!
//! Binding happens once per `Timeline::add`. Unknown names in `targets` and
//! keyframe values stay literal (a selector, a text value); unknown delay and
//! interpolator names are errors.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, TimelineError};
use crate::interpolate::SharedInterpolator;
use crate::keyframes::KeyframeSpec;
use crate::options::{AnimationOptions, PropertyOptions};
use crate::resolve::{PropertyValue, Resolvable};
use crate::targets::TargetSpec;
use crate::types::{AnimationValue, Millis};

/// Something registered under a name.
#[derive(Clone)]
pub enum Reference {
    Targets(TargetSpec),
    Value(PropertyValue),
    Time(Resolvable<Millis>),
    Interpolator(SharedInterpolator),
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Targets(spec) => f.debug_tuple("Targets").field(spec).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Time(time) => f.debug_tuple("Time").field(time).finish(),
            Self::Interpolator(_) => f.write_str("Interpolator(..)"),
        }
    }
}

impl From<TargetSpec> for Reference {
    fn from(spec: TargetSpec) -> Self {
        Self::Targets(spec)
    }
}

impl From<PropertyValue> for Reference {
    fn from(value: PropertyValue) -> Self {
        Self::Value(value)
    }
}

impl From<AnimationValue> for Reference {
    fn from(value: AnimationValue) -> Self {
        Self::Value(Resolvable::Fixed(value))
    }
}

impl From<Resolvable<Millis>> for Reference {
    fn from(time: Resolvable<Millis>) -> Self {
        Self::Time(time)
    }
}

impl From<SharedInterpolator> for Reference {
    fn from(interpolator: SharedInterpolator) -> Self {
        Self::Interpolator(interpolator)
    }
}

/// Reference table of one timeline. Keys are stored with their `@`.
#[derive(Debug, Clone, Default)]
pub struct References {
    entries: HashMap<String, Reference>,
}

fn key(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}

impl References {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) `name`, with or without the leading `@`.
    pub fn insert(&mut self, name: &str, reference: impl Into<Reference>) {
        self.entries.insert(key(name), reference.into());
    }

    pub fn get(&self, name: &str) -> Option<&Reference> {
        self.entries.get(&key(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of `animation` with every `@name` replaced by its reference.
    pub fn bind(&self, animation: &AnimationOptions) -> Result<AnimationOptions> {
        let mut bound = animation.clone();
        bound.targets = self.bind_targets(&animation.targets);
        bound.delay = self.bind_time(&animation.delay)?;
        bound.end_delay = self.bind_time(&animation.end_delay)?;

        for (_, props) in bound.props.iter_mut() {
            for (_, prop) in props.iter_mut() {
                self.bind_property(prop)?;
            }
        }
        Ok(bound)
    }

    fn bind_targets(&self, spec: &TargetSpec) -> TargetSpec {
        match spec {
            TargetSpec::Selector(query) if query.starts_with('@') => {
                match self.entries.get(query) {
                    Some(Reference::Targets(targets)) => targets.clone(),
                    _ => spec.clone(),
                }
            }
            TargetSpec::List(list) => {
                TargetSpec::List(list.iter().map(|item| self.bind_targets(item)).collect())
            }
            _ => spec.clone(),
        }
    }

    fn bind_time(&self, time: &Resolvable<Millis>) -> Result<Resolvable<Millis>> {
        match time {
            Resolvable::Named(name) => match self.get(name) {
                Some(Reference::Time(time)) => Ok(time.clone()),
                _ => Err(TimelineError::UnknownReference(name.clone())),
            },
            _ => Ok(time.clone()),
        }
    }

    fn bind_value(&self, value: &mut PropertyValue) -> Result<()> {
        let bound = match value {
            Resolvable::Named(name) => match self.get(name) {
                Some(Reference::Value(bound)) => bound.clone(),
                _ => return Err(TimelineError::UnknownReference(name.clone())),
            },
            Resolvable::Fixed(AnimationValue::Text(text)) if text.starts_with('@') => {
                match self.entries.get(text.as_str()) {
                    Some(Reference::Value(bound)) => bound.clone(),
                    _ => return Ok(()),
                }
            }
            _ => return Ok(()),
        };
        *value = bound;
        Ok(())
    }

    fn bind_interpolator(
        &self,
        name: &mut Option<String>,
        slot: &mut Option<SharedInterpolator>,
    ) -> Result<()> {
        let Some(taken) = name.take() else {
            return Ok(());
        };
        match self.get(&taken) {
            Some(Reference::Interpolator(interpolator)) => {
                *slot = Some(interpolator.clone());
                Ok(())
            }
            _ => Err(TimelineError::UnknownReference(taken)),
        }
    }

    fn bind_property(&self, prop: &mut PropertyOptions) -> Result<()> {
        self.bind_interpolator(&mut prop.interpolate_ref, &mut prop.interpolate)?;
        for keyframe in prop.keyframes.iter_mut() {
            self.bind_keyframe(keyframe)?;
        }
        Ok(())
    }

    fn bind_keyframe(&self, keyframe: &mut KeyframeSpec) -> Result<()> {
        self.bind_interpolator(&mut keyframe.interpolate_ref, &mut keyframe.interpolate)?;
        if let Some(value) = keyframe.value.as_mut() {
            self.bind_value(value)?;
        }
        Ok(())
    }
}
