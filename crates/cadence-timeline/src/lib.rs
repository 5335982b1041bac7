//! cadence-timeline: keyframe aggregation, effect compilation and timeline playback.
//!
//! # Architecture
//!
//! ```text
//! AddOptions / SetOptions
//!     │  resolve targets, stagger, delay
//!     ▼
//! TargetConfiguration (keyframes at absolute times, one per plugin+target)
//!     │  compile on first play/pause/finish
//!     ▼
//! Effect (normalized 0..1 keyframes per property)
//!     │  Plugin::animate
//!     ▼
//! AnimationController  <── Timeline::tick <── FrameClock <── host frames
//! ```
//!
//! Plugins own all target-specific behavior: reading live values, applying
//! sampled values, and undoing them on cancel. `ValueStorePlugin` is the
//! in-memory reference plugin used for headless runs and tests.

pub mod clock;
pub mod easing;
pub mod effects;
pub mod error;
pub mod events;
pub mod interpolate;
pub mod keyframes;
pub mod offsets;
pub mod options;
pub mod plugin;
pub mod refs;
pub mod resolve;
pub mod store;
pub mod targets;
pub mod timeline;
pub mod types;
pub mod units;

pub use clock::{FrameCallback, FrameClock, FrameSource, ManualFrameSource, SubscriptionId};
pub use easing::{EasingFunction, ParseEasingError, StepPosition};
pub use effects::{Effect, EffectFrame, EffectFrameDraft, PropertyEffects, compile};
pub use error::{Result, TimelineError};
pub use events::{ListenerId, TimelineEvent};
pub use interpolate::{Interpolate, Interpolator, SharedInterpolator, interpolator};
pub use keyframes::{KeyframeSpec, PropertyKeyframe, TargetConfiguration};
pub use offsets::{HasOffset, infer_offsets};
pub use options::{AddOptions, AnimationOptions, NamespaceProps, PropertyOptions, SetOptions};
pub use plugin::{AnimationController, Plugin, PluginRegistry};
pub use refs::{Reference, References};
pub use resolve::{PropertyValue, Resolvable, TargetContext};
pub use store::{ValueStore, ValueStorePlugin};
pub use targets::{IdentityResolver, TargetResolver, TargetSpec, resolve_targets};
pub use timeline::{Timeline, TimelineBuilder, TimelineDefaults};
pub use types::{AnimationValue, Direction, IterationCount, Millis, PlayState, TargetId};
pub use units::{TimeInput, TimeStep, TimeValue};
