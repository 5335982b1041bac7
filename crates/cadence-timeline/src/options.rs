//! Declarative animation definitions.
//!
//! Definitions name their targets, timing modifiers and, per plugin
//! namespace, the properties to animate. They are built in code or read
//! from JSON:
//!
//! ```json
//! {
//!   "targets": [".dot"],
//!   "from": 0, "to": "1s",
//!   "easing": "ease-out",
//!   "stagger": 50,
//!   "store": {
//!     "opacity": [0, 1],
//!     "x": { "value": [0, { "value": 40, "offset": 0.25 }, 100], "easing": "linear" },
//!     "color": [[1, 0, 0, 1], [0, 0, 1, 1]]
//!   }
//! }
//! ```
//!
//! Property values may be a scalar, an array of values or keyframe objects,
//! or an object with `value` and `easing`. An array in property position is
//! always a keyframe list, so a single color is written `[[r, g, b, a]]`.
//! Namespaces and properties keep document order.
//!
//! Per-target resolvers, interpolators and target groups are registered on
//! the timeline by name and referenced as `"@name"`: in `targets`, in
//! `delay`/`endDelay`, as a keyframe value, or as `"interpolate"` on a
//! property or keyframe object.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;

use crate::easing::EasingFunction;
use crate::interpolate::SharedInterpolator;
use crate::keyframes::KeyframeSpec;
use crate::resolve::{PropertyValue, Resolvable};
use crate::targets::TargetSpec;
use crate::types::{AnimationValue, Millis};
use crate::units::TimeInput;

/// Keyframes of one property.
#[derive(Debug, Clone, Default)]
pub struct PropertyOptions {
    pub keyframes: Vec<KeyframeSpec>,
    /// Easing for keyframes that do not name one.
    pub easing: Option<EasingFunction>,
    /// Interpolator for keyframes that do not name one.
    pub interpolate: Option<SharedInterpolator>,
    /// Name of a registered interpolator, bound when the definition is added.
    pub interpolate_ref: Option<String>,
}

impl PropertyOptions {
    /// Evenly spaced values.
    pub fn values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<PropertyValue>,
    {
        Self::keyframes(values.into_iter().map(KeyframeSpec::value).collect())
    }

    /// A single value animated to from the live value.
    pub fn to(value: impl Into<PropertyValue>) -> Self {
        Self::keyframes(vec![KeyframeSpec::value(value)])
    }

    pub fn keyframes(keyframes: Vec<KeyframeSpec>) -> Self {
        Self {
            keyframes,
            ..Self::default()
        }
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

    /// Value of the last keyframe that has one.
    pub fn last_value(&self) -> Option<&PropertyValue> {
        self.keyframes.iter().rev().find_map(|k| k.value.as_ref())
    }
}

/// Properties of one plugin namespace, in definition order.
pub type NamespaceProps = Vec<(String, PropertyOptions)>;

/// What to animate and how, without the time window.
#[derive(Debug, Clone, Default)]
pub struct AnimationOptions {
    pub targets: TargetSpec,
    /// Default easing for every property of this definition.
    pub easing: Option<EasingFunction>,
    /// Per-target start offset in milliseconds.
    pub stagger: Millis,
    pub delay: Resolvable<Millis>,
    pub end_delay: Resolvable<Millis>,
    /// `(namespace, properties)` in definition order.
    pub props: Vec<(String, NamespaceProps)>,
}

impl AnimationOptions {
    pub fn new(targets: impl Into<TargetSpec>) -> Self {
        Self {
            targets: targets.into(),
            ..Self::default()
        }
    }

    pub fn easing(mut self, easing: EasingFunction) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn stagger(mut self, stagger: Millis) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn delay(mut self, delay: impl Into<Resolvable<Millis>>) -> Self {
        self.delay = delay.into();
        self
    }

    pub fn end_delay(mut self, end_delay: impl Into<Resolvable<Millis>>) -> Self {
        self.end_delay = end_delay.into();
        self
    }

    /// Add (or replace) `prop` in `namespace`.
    pub fn prop(mut self, namespace: &str, prop: &str, options: PropertyOptions) -> Self {
        let index = match self.props.iter().position(|(ns, _)| ns == namespace) {
            Some(index) => index,
            None => {
                self.props.push((namespace.to_string(), Vec::new()));
                self.props.len() - 1
            }
        };
        let props = &mut self.props[index].1;
        match props.iter_mut().find(|(name, _)| name == prop) {
            Some((_, existing)) => *existing = options,
            None => props.push((prop.to_string(), options)),
        }
        self
    }
}

/// Definition placed by `Timeline::add`.
///
/// The window comes from two of `from`, `to`, `duration`, or from `to` or
/// `duration` alone, starting where the previous definitions end.
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    pub from: Option<TimeInput>,
    pub to: Option<TimeInput>,
    pub duration: Option<TimeInput>,
    pub animation: AnimationOptions,
}

impl AddOptions {
    pub fn new(animation: AnimationOptions) -> Self {
        Self {
            animation,
            ..Self::default()
        }
    }

    pub fn from(mut self, from: impl Into<TimeInput>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn to(mut self, to: impl Into<TimeInput>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn duration(mut self, duration: impl Into<TimeInput>) -> Self {
        self.duration = Some(duration.into());
        self
    }
}

/// Definition placed by `Timeline::set`.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Defaults to where the previous definitions end.
    pub at: Option<TimeInput>,
    pub animation: AnimationOptions,
}

impl SetOptions {
    pub fn new(animation: AnimationOptions) -> Self {
        Self {
            at: None,
            animation,
        }
    }

    pub fn at(mut self, at: impl Into<TimeInput>) -> Self {
        self.at = Some(at.into());
        self
    }
}

// ============================================================================
// Deserialization
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKeyframe {
    Value(Option<AnimationValue>),
    Object {
        #[serde(default)]
        value: Option<AnimationValue>,
        #[serde(default)]
        offset: Option<f64>,
        #[serde(default)]
        easing: Option<EasingFunction>,
        #[serde(default)]
        interpolate: Option<String>,
    },
}

impl From<RawKeyframe> for KeyframeSpec {
    fn from(raw: RawKeyframe) -> Self {
        match raw {
            RawKeyframe::Value(value) => KeyframeSpec {
                value: value.map(Resolvable::Fixed),
                ..KeyframeSpec::default()
            },
            RawKeyframe::Object {
                value,
                offset,
                easing,
                interpolate,
            } => KeyframeSpec {
                value: value.map(Resolvable::Fixed),
                offset,
                easing,
                interpolate: None,
                interpolate_ref: interpolate,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValues {
    List(Vec<RawKeyframe>),
    One(AnimationValue),
}

impl RawValues {
    fn into_keyframes(self) -> Vec<KeyframeSpec> {
        match self {
            Self::List(list) => list.into_iter().map(KeyframeSpec::from).collect(),
            Self::One(value) => vec![KeyframeSpec::value(value)],
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProperty {
    Values(RawValues),
    Object {
        value: RawValues,
        #[serde(default)]
        easing: Option<EasingFunction>,
        #[serde(default)]
        interpolate: Option<String>,
    },
}

impl<'de> Deserialize<'de> for PropertyOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawProperty::deserialize(deserializer)? {
            RawProperty::Values(values) => PropertyOptions::keyframes(values.into_keyframes()),
            RawProperty::Object {
                value,
                easing,
                interpolate,
            } => PropertyOptions {
                keyframes: value.into_keyframes(),
                easing,
                interpolate: None,
                interpolate_ref: interpolate,
            },
        })
    }
}

/// Properties of one namespace, order-preserving.
struct NamespaceSeed;

impl<'de> de::DeserializeSeed<'de> for NamespaceSeed {
    type Value = NamespaceProps;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(NamespaceVisitor)
    }
}

struct NamespaceVisitor;

impl<'de> Visitor<'de> for NamespaceVisitor {
    type Value = NamespaceProps;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of property names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut props = Vec::new();
        while let Some((name, options)) = map.next_entry::<String, PropertyOptions>()? {
            props.push((name, options));
        }
        Ok(props)
    }
}

#[derive(Default)]
struct Timing {
    from: Option<TimeInput>,
    to: Option<TimeInput>,
    duration: Option<TimeInput>,
    at: Option<TimeInput>,
}

/// Reads an animation definition plus any timing keys next to it.
struct DefinitionVisitor;

impl<'de> Visitor<'de> for DefinitionVisitor {
    type Value = (AnimationOptions, Timing);

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an animation definition object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut options = AnimationOptions::default();
        let mut timing = Timing::default();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "targets" => options.targets = map.next_value()?,
                "easing" => options.easing = Some(map.next_value()?),
                "stagger" => options.stagger = map.next_value()?,
                "delay" => options.delay = map.next_value()?,
                "endDelay" | "end_delay" => options.end_delay = map.next_value()?,
                "from" => timing.from = Some(map.next_value()?),
                "to" => timing.to = Some(map.next_value()?),
                "duration" => timing.duration = Some(map.next_value()?),
                "at" => timing.at = Some(map.next_value()?),
                _ => {
                    let props = map.next_value_seed(NamespaceSeed)?;
                    options.props.push((key, props));
                }
            }
        }

        Ok((options, timing))
    }
}

impl<'de> Deserialize<'de> for AnimationOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (options, timing) = deserializer.deserialize_map(DefinitionVisitor)?;
        if timing.from.is_some() || timing.to.is_some() || timing.duration.is_some() || timing.at.is_some() {
            return Err(de::Error::custom(
                "timing keys are not allowed here; use an add or set definition",
            ));
        }
        Ok(options)
    }
}

impl<'de> Deserialize<'de> for AddOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (animation, timing) = deserializer.deserialize_map(DefinitionVisitor)?;
        if timing.at.is_some() {
            return Err(de::Error::custom("`at` is only valid in set definitions"));
        }
        Ok(AddOptions {
            from: timing.from,
            to: timing.to,
            duration: timing.duration,
            animation,
        })
    }
}

impl<'de> Deserialize<'de> for SetOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (animation, timing) = deserializer.deserialize_map(DefinitionVisitor)?;
        if timing.from.is_some() || timing.to.is_some() || timing.duration.is_some() {
            return Err(de::Error::custom("set definitions take `at`, not a window"));
        }
        Ok(SetOptions {
            at: timing.at,
            animation,
        })
    }
}
