//! Timeline: definition API and playback state machine.
//!
//! A `Timeline` collects animation definitions into per-target keyframe
//! configurations, compiles them into plugin controllers on first
//! activation, and drives those controllers from a shared `FrameClock`.
//!
//! # Architecture
//!
//! ```text
//! Timeline (cloneable handle)
//!   └── TimelineShared
//!         ├── TimelineState (RefCell)
//!         │     ├── TargetConfiguration[]   definition phase
//!         │     ├── ActiveEffect[]          compiled controllers
//!         │     └── EventQueue              delivered after each call
//!         ├── Listeners
//!         ├── FrameClock subscription (holds a Weak back-reference)
//!         └── PluginRegistry / TargetResolver / References
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Idle --play--> Pending --first tick--> Running --last iteration--> Finished
//!   ^               |                      |  ^
//!   |             pause                  pause play
//!   |               v                      v  |
//!   +---cancel--- Paused <-----------------+--+
//! ```
//!
//! Controllers are invoked while timeline state is borrowed and must not call
//! back into the timeline. Event listeners run after the borrow is released
//! and may call any method.
//!
//! # Usage
//!
//! ```ignore
//! let (clock, source) = FrameClock::manual();
//! let plugins = PluginRegistry::new();
//! plugins.register(Rc::new(ValueStorePlugin::new(store.clone())));
//!
//! let timeline = Timeline::new(clock.clone(), plugins);
//! timeline.add(
//!     AddOptions::new(
//!         AnimationOptions::new(TargetSpec::id("box"))
//!             .prop("store", "opacity", PropertyOptions::values([0.0, 1.0])),
//!     )
//!     .duration("500ms"),
//! )?;
//! timeline.play(2, Direction::Alternate);
//! clock.advance(16.0);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::clock::{FrameClock, SubscriptionId};
use crate::easing::EasingFunction;
use crate::effects::{compile, Effect};
use crate::error::{Result, TimelineError};
use crate::events::{EventQueue, ListenerId, Listeners, TimelineEvent};
use crate::keyframes::{KeyframeSpec, PropertyInsert, TargetConfiguration};
use crate::options::{AddOptions, AnimationOptions, PropertyOptions, SetOptions};
use crate::plugin::{AnimationController, PluginRegistry};
use crate::refs::{Reference, References};
use crate::resolve::TargetContext;
use crate::targets::{resolve_targets, IdentityResolver, TargetResolver};
use crate::types::{Direction, IterationCount, Millis, PlayState};
use crate::units::TimeInput;

/// Defaults applied to definitions that do not override them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineDefaults {
    pub easing: EasingFunction,
    pub playback_rate: f64,
}

impl Default for TimelineDefaults {
    fn default() -> Self {
        Self {
            easing: EasingFunction::Ease,
            playback_rate: 1.0,
        }
    }
}

/// A compiled controller and the window it animates.
struct ActiveEffect {
    from: Millis,
    to: Millis,
    controller: Box<dyn AnimationController>,
}

struct TimelineState {
    configs: Vec<TargetConfiguration>,
    /// Latest keyframe time across all targets.
    duration: Millis,
    /// Default start for sequential `add` calls.
    next_time: Millis,
    time: Option<Millis>,
    rate: f64,
    play_state: PlayState,
    iteration: Option<u32>,
    iterations: IterationCount,
    direction: Direction,
    effects: Option<Vec<ActiveEffect>>,
    subscription: Option<SubscriptionId>,
    events: EventQueue,
}

impl TimelineState {
    fn start_bound(&self) -> Millis {
        if self.rate < 0.0 { self.duration } else { 0.0 }
    }

    fn position(&self) -> Millis {
        self.time.unwrap_or_else(|| self.start_bound())
    }

    /// Push the current position to every controller.
    fn sync_controllers(&mut self) {
        let time = self.position();
        let rate = self.rate;
        let running = self.play_state == PlayState::Running;
        let floored = time.floor();

        let Some(effects) = self.effects.as_mut() else {
            return;
        };
        for effect in effects.iter_mut() {
            let span = (effect.to - effect.from).max(1.0);
            let offset = ((time - effect.from) / span).clamp(0.0, 1.0);
            let active = running && floored >= effect.from && floored < effect.to;
            effect.controller.update(offset, rate, active);
        }
    }

    fn recalculate_times(&mut self) {
        let duration = self.configs.iter().map(|c| c.to).fold(0.0, f64::max);
        let next_time = self
            .configs
            .iter()
            .map(|c| c.to + c.end_delay)
            .fold(duration, f64::max);
        self.duration = duration;
        self.next_time = next_time;
    }
}

struct TimelineShared {
    state: RefCell<TimelineState>,
    listeners: RefCell<Listeners>,
    clock: FrameClock,
    plugins: PluginRegistry,
    resolver: Rc<dyn TargetResolver>,
    refs: References,
    defaults: TimelineDefaults,
    /// Set while the outermost `flush_events` drains the queue.
    flushing: Cell<bool>,
}

impl Drop for TimelineShared {
    fn drop(&mut self) {
        if let Some(id) = self.state.get_mut().subscription.take() {
            self.clock.unsubscribe(id);
        }
    }
}

/// Builder for a [`Timeline`] with a custom resolver, references or defaults.
pub struct TimelineBuilder {
    clock: FrameClock,
    plugins: PluginRegistry,
    resolver: Rc<dyn TargetResolver>,
    refs: References,
    defaults: TimelineDefaults,
}

impl TimelineBuilder {
    pub fn resolver(mut self, resolver: Rc<dyn TargetResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn defaults(mut self, defaults: TimelineDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Register something definitions can name as `"@name"`.
    pub fn reference(mut self, name: &str, reference: impl Into<Reference>) -> Self {
        self.refs.insert(name, reference);
        self
    }

    pub fn build(self) -> Timeline {
        let rate = if self.defaults.playback_rate.is_finite() {
            self.defaults.playback_rate
        } else {
            1.0
        };

        Timeline {
            shared: Rc::new(TimelineShared {
                state: RefCell::new(TimelineState {
                    configs: Vec::new(),
                    duration: 0.0,
                    next_time: 0.0,
                    time: None,
                    rate,
                    play_state: PlayState::Idle,
                    iteration: None,
                    iterations: IterationCount::default(),
                    direction: Direction::Normal,
                    effects: None,
                    subscription: None,
                    events: EventQueue::new(),
                }),
                listeners: RefCell::new(Listeners::new()),
                clock: self.clock,
                plugins: self.plugins,
                resolver: self.resolver,
                refs: self.refs,
                defaults: self.defaults,
                flushing: Cell::new(false),
            }),
        }
    }
}

/// Handle to a timeline. Clones control the same timeline.
#[derive(Clone)]
pub struct Timeline {
    shared: Rc<TimelineShared>,
}

static_assertions::assert_not_impl_any!(Timeline: Send, Sync);
static_assertions::assert_impl_all!(TimelineDefaults: Send, Sync, Copy);

impl Timeline {
    /// Timeline resolving selectors as literal ids, with default settings.
    pub fn new(clock: FrameClock, plugins: PluginRegistry) -> Self {
        Self::builder(clock, plugins).build()
    }

    pub fn builder(clock: FrameClock, plugins: PluginRegistry) -> TimelineBuilder {
        TimelineBuilder {
            clock,
            plugins,
            resolver: Rc::new(IdentityResolver),
            refs: References::new(),
            defaults: TimelineDefaults::default(),
        }
    }

    // ========================================================================
    // Definition
    // ========================================================================

    /// Place a definition by `from`/`to`/`duration`.
    ///
    /// With only `to` or only `duration`, the definition starts where the
    /// previous ones end (including their end delays).
    pub fn add(&self, options: AddOptions) -> Result<&Self> {
        let parse = |t: &Option<TimeInput>| t.as_ref().map(TimeInput::to_ms).transpose();
        let from = parse(&options.from)?;
        let to = parse(&options.to)?;
        let duration = parse(&options.duration)?;
        let next = self.shared.state.borrow().next_time;

        let (from, to) = match (from, to, duration) {
            (Some(from), Some(to), _) => (from, to),
            (Some(from), None, Some(duration)) => (from, from + duration),
            (None, Some(to), Some(duration)) => (to - duration, to),
            (None, Some(to), None) => (next, next + to),
            (None, None, Some(duration)) => (next, next + duration),
            _ => return Err(TimelineError::MissingInterval),
        };

        self.insert(from.max(0.0), to.max(0.0), &options.animation)?;
        Ok(self)
    }

    /// Animate between two absolute times.
    pub fn from_to(
        &self,
        from: impl Into<TimeInput>,
        to: impl Into<TimeInput>,
        options: AnimationOptions,
    ) -> Result<&Self> {
        let from = from.into().to_ms()?;
        let to = to.into().to_ms()?;
        self.insert(from, to, &options)?;
        Ok(self)
    }

    /// Animate up to `to`, starting at `options.from`, `to - options.duration`,
    /// or the current end of the timeline.
    pub fn to(&self, to: impl Into<TimeInput>, options: AddOptions) -> Result<&Self> {
        let to = to.into().to_ms()?;
        let from = match (&options.from, &options.duration) {
            (Some(from), _) => from.to_ms()?,
            (None, Some(duration)) => to - duration.to_ms()?,
            (None, None) => self.duration(),
        };
        self.insert(from.max(0.0), to, &options.animation)?;
        Ok(self)
    }

    /// Set properties at an instant.
    ///
    /// Each property holds its previous value until one millisecond before
    /// `at` and takes the new value at `at`.
    pub fn set(&self, options: SetOptions) -> Result<&Self> {
        let at = match &options.at {
            Some(at) => at.to_ms()?,
            None => self.shared.state.borrow().next_time,
        };

        let mut animation = options.animation;
        for (_, props) in animation.props.iter_mut() {
            props.retain(|(_, p)| p.last_value().is_some());
            for (_, prop) in props.iter_mut() {
                let value = prop.last_value().cloned();
                *prop = PropertyOptions {
                    keyframes: vec![
                        KeyframeSpec::hold(),
                        KeyframeSpec {
                            value,
                            ..KeyframeSpec::default()
                        },
                    ],
                    easing: prop.easing,
                    interpolate: None,
                    interpolate_ref: None,
                };
            }
        }

        self.insert((at - 1.0).max(0.0), at, &animation)?;
        Ok(self)
    }

    fn insert(&self, from: Millis, to: Millis, animation: &AnimationOptions) -> Result<()> {
        let shared = &self.shared;
        let mut st = shared.state.borrow_mut();
        if st.effects.is_some() {
            return Err(TimelineError::DefinitionLocked);
        }

        let bound = shared.refs.bind(animation)?;
        let animation = &bound;
        let targets = resolve_targets(&animation.targets, shared.resolver.as_ref());
        if targets.is_empty() {
            debug!("definition matched no targets");
        }
        let len = targets.len();
        let default_easing = animation.easing.unwrap_or(shared.defaults.easing);

        for (namespace, props) in &animation.props {
            if !shared.plugins.contains(namespace) {
                debug!(namespace = %namespace, "no plugin registered; properties dropped");
                continue;
            }

            for (index, target) in targets.iter().enumerate() {
                let ctx = TargetContext { target, index, len };
                let delay = animation.delay.resolve(&ctx);
                let end_delay = animation.end_delay.resolve(&ctx);

                let position = st
                    .configs
                    .iter()
                    .position(|c| &c.plugin == namespace && &c.target == target);
                let config = match position {
                    Some(i) => {
                        let config = &mut st.configs[i];
                        config.end_delay = config.end_delay.max(end_delay);
                        config
                    }
                    None => {
                        st.configs.push(
                            TargetConfiguration::new(namespace.as_str(), target.clone(), len)
                                .with_easing(default_easing)
                                .with_end_delay(end_delay),
                        );
                        let last = st.configs.len() - 1;
                        &mut st.configs[last]
                    }
                };

                for (prop, options) in props {
                    config.insert(
                        index,
                        PropertyInsert {
                            prop,
                            keyframes: &options.keyframes,
                            from,
                            to,
                            easing: options.easing.unwrap_or(default_easing),
                            interpolate: options.interpolate.clone(),
                            stagger: animation.stagger,
                            delay,
                        },
                    );
                }
            }
        }

        st.recalculate_times();
        debug!(
            from,
            to,
            targets = len,
            duration = st.duration,
            "definition added"
        );
        Ok(())
    }

    /// Compile effects for inspection without touching playback.
    pub fn get_effects(&self) -> Vec<Effect> {
        let st = self.shared.state.borrow();
        let mut effects = Vec::new();
        for config in &st.configs {
            match self.shared.plugins.get(&config.plugin) {
                Some(plugin) => effects.extend(compile(config, plugin.as_ref())),
                None => warn!(plugin = %config.plugin, "plugin removed after definition"),
            }
        }
        effects
    }

    // ========================================================================
    // Playback control
    // ========================================================================

    /// Start or resume playback.
    pub fn play(&self, iterations: impl Into<IterationCount>, direction: Direction) -> &Self {
        {
            let mut st = self.shared.state.borrow_mut();
            self.setup(&mut st);
            st.iterations = iterations.into();
            st.direction = direction;

            if !matches!(st.play_state, PlayState::Running | PlayState::Pending) {
                st.play_state = PlayState::Pending;
            }

            self.subscribe(&mut st);
            let time = st.position();
            debug!(time, iterations = ?st.iterations, ?direction, "play");
            st.events.push(TimelineEvent::Play, time);
        }
        self.flush_events();
        self
    }

    /// Hold at the current time.
    pub fn pause(&self) -> &Self {
        {
            let mut st = self.shared.state.borrow_mut();
            self.pause_locked(&mut st);
        }
        self.flush_events();
        self
    }

    /// Stop, tear down every controller and return to idle.
    pub fn cancel(&self) -> &Self {
        {
            let mut st = self.shared.state.borrow_mut();
            self.cancel_locked(&mut st);
        }
        self.flush_events();
        self
    }

    /// Jump to the natural end and stop.
    pub fn finish(&self) -> &Self {
        {
            let mut st = self.shared.state.borrow_mut();
            self.setup(&mut st);
            self.finish_locked(&mut st);
        }
        self.flush_events();
        self
    }

    /// Flip the playback direction, continuing from the current time.
    pub fn reverse(&self) -> &Self {
        let (rate, running, iterations, direction) = {
            let st = self.shared.state.borrow();
            (st.rate, st.play_state == PlayState::Running, st.iterations, st.direction)
        };
        self.apply_rate(-rate);

        if running {
            self.pause();
            self.play(iterations, direction);
        }
        self
    }

    /// Move to `time` without changing state. Relative literals
    /// (`"+=100ms"`) are resolved against the current time.
    pub fn seek(&self, time: impl Into<TimeInput>) -> Result<&Self> {
        let value = time.into().parse()?;
        {
            let mut st = self.shared.state.borrow_mut();
            let target = value.resolve(st.position());
            st.time = Some(target);
            st.sync_controllers();
        }
        self.flush_events();
        Ok(self)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Logical time; `None` until the timeline is first positioned.
    pub fn current_time(&self) -> Option<Millis> {
        self.shared.state.borrow().time
    }

    /// Like `seek`; a non-finite time moves to the start of the current direction.
    pub fn set_current_time(&self, time: Millis) {
        {
            let mut st = self.shared.state.borrow_mut();
            let time = if time.is_finite() { time } else { st.start_bound() };
            st.time = Some(time);
            st.sync_controllers();
        }
        self.flush_events();
    }

    pub fn playback_rate(&self) -> f64 {
        self.shared.state.borrow().rate
    }

    /// Change the rate; live controllers are resynced with it.
    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        if !rate.is_finite() {
            return Err(TimelineError::InvalidRate(rate));
        }
        self.apply_rate(rate);
        Ok(())
    }

    pub fn state(&self) -> PlayState {
        self.shared.state.borrow().play_state
    }

    pub fn duration(&self) -> Millis {
        self.shared.state.borrow().duration
    }

    /// Completed iterations of the current run, if one is in progress.
    pub fn iteration(&self) -> Option<u32> {
        self.shared.state.borrow().iteration
    }

    /// Where the next sequential definition would start.
    pub fn next_time(&self) -> Millis {
        self.shared.state.borrow().next_time
    }

    pub fn on(&self, event: TimelineEvent, listener: impl Fn(Millis) + 'static) -> ListenerId {
        self.shared.listeners.borrow_mut().add(event, Rc::new(listener))
    }

    pub fn off(&self, event: TimelineEvent, id: ListenerId) -> bool {
        self.shared.listeners.borrow_mut().remove(event, id)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Compile effects and build controllers, once per activation.
    fn setup(&self, st: &mut TimelineState) {
        if st.effects.is_some() {
            return;
        }

        let mut active = Vec::new();
        for config in &st.configs {
            let Some(plugin) = self.shared.plugins.get(&config.plugin) else {
                warn!(plugin = %config.plugin, "plugin removed after definition; target skipped");
                continue;
            };
            for effect in compile(config, plugin.as_ref()) {
                match plugin.animate(&effect) {
                    Some(controller) => active.push(ActiveEffect {
                        from: effect.from,
                        to: effect.to,
                        controller,
                    }),
                    None => debug!(prop = %effect.prop, "plugin declined effect"),
                }
            }
        }

        debug!(controllers = active.len(), duration = st.duration, "effects compiled");
        st.effects = Some(active);
    }

    fn subscribe(&self, st: &mut TimelineState) {
        if st.subscription.is_some() {
            return;
        }
        let weak: Weak<TimelineShared> = Rc::downgrade(&self.shared);
        let id = self.shared.clock.subscribe(Rc::new(move |delta: Millis, _elapsed: Millis| {
            if let Some(shared) = weak.upgrade() {
                Timeline { shared }.tick(delta);
            }
        }));
        st.subscription = Some(id);
    }

    fn unsubscribe(&self, st: &mut TimelineState) {
        if let Some(id) = st.subscription.take() {
            self.shared.clock.unsubscribe(id);
        }
    }

    fn pause_locked(&self, st: &mut TimelineState) {
        self.unsubscribe(st);
        self.setup(st);
        st.play_state = PlayState::Paused;
        st.sync_controllers();
        let time = st.position();
        debug!(time, "pause");
        st.events.push(TimelineEvent::Pause, time);
    }

    fn cancel_locked(&self, st: &mut TimelineState) {
        self.unsubscribe(st);
        st.time = Some(0.0);
        st.iteration = None;
        st.play_state = PlayState::Idle;
        st.sync_controllers();

        if let Some(effects) = st.effects.take() {
            for mut effect in effects {
                effect.controller.cancel();
            }
        }
        debug!("cancel");
        st.events.push(TimelineEvent::Cancel, 0.0);
    }

    fn finish_locked(&self, st: &mut TimelineState) {
        self.unsubscribe(st);
        let end = if st.rate < 0.0 { 0.0 } else { st.duration };
        st.time = Some(end);
        st.iteration = None;
        st.play_state = PlayState::Finished;
        st.sync_controllers();
        debug!(time = end, "finish");
        st.events.push(TimelineEvent::Finish, end);
    }

    fn apply_rate(&self, rate: f64) {
        let mut st = self.shared.state.borrow_mut();
        st.rate = rate;
        st.sync_controllers();
    }

    /// Clock callback.
    fn tick(&self, delta: Millis) {
        let state = self.state();
        match state {
            PlayState::Idle => {
                self.cancel();
                return;
            }
            PlayState::Finished => {
                self.finish();
                return;
            }
            PlayState::Paused => {
                self.pause();
                return;
            }
            PlayState::Pending | PlayState::Running => {}
        }

        {
            let mut st = self.shared.state.borrow_mut();
            self.advance(&mut st, delta);
        }
        self.flush_events();
    }

    fn advance(&self, st: &mut TimelineState, mut delta: Millis) {
        loop {
            let duration = st.duration;
            let reversed = st.rate < 0.0;
            let bound = if reversed { duration } else { 0.0 };
            let mut time = st.position();
            let mut iteration = st.iteration.unwrap_or(0);

            if st.play_state == PlayState::Pending {
                if st.time.is_none() || time < 0.0 || time > duration {
                    time = bound;
                }
                // replay from the start once the far end was reached
                if (!reversed && time >= duration) || (reversed && time <= 0.0) {
                    time = bound;
                }
                if st.iterations.is_reached(iteration) {
                    iteration = 0;
                }
                st.play_state = PlayState::Running;
            }

            time += delta * st.rate;

            let ended = time < 0.0
                || time > duration
                || (!reversed && time >= duration)
                || (reversed && time <= 0.0);
            if ended {
                iteration += 1;
                time = if reversed { 0.0 } else { duration };
            }

            st.time = Some(time);
            st.iteration = Some(iteration);
            st.sync_controllers();
            st.events.push(TimelineEvent::Update, time);
            trace!(time, iteration, ended, "tick");

            if !ended {
                return;
            }

            if st.iterations.is_reached(iteration) {
                self.finish_locked(st);
                return;
            }

            if st.direction == Direction::Alternate {
                st.rate = -st.rate;
            }
            st.time = Some(st.start_bound());

            if duration <= 0.0 {
                return;
            }
            delta = 0.0;
        }
    }

    /// Deliver queued events, one at a time so listeners see them in order
    /// even when they trigger more. Nested calls leave the queue to the
    /// outermost one.
    fn flush_events(&self) {
        if self.shared.flushing.replace(true) {
            return;
        }
        loop {
            let Some(record) = self.shared.state.borrow_mut().events.pop() else {
                break;
            };
            let listeners = self.shared.listeners.borrow().snapshot(record.event);
            for listener in listeners {
                listener(record.time);
            }
        }
        self.shared.flushing.set(false);
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.shared.state.borrow();
        f.debug_struct("Timeline")
            .field("state", &st.play_state)
            .field("time", &st.time)
            .field("duration", &st.duration)
            .field("rate", &st.rate)
            .field("iteration", &st.iteration)
            .field("targets", &st.configs.len())
            .field("compiled", &st.effects.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualFrameSource;
    use crate::store::{ValueStore, ValueStorePlugin};
    use crate::targets::TargetSpec;
    use crate::types::TargetId;

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    struct Fixture {
        clock: FrameClock,
        source: ManualFrameSource,
        store: ValueStore,
        timeline: Timeline,
    }

    fn fixture() -> Fixture {
        let (clock, source) = FrameClock::manual();
        let store = ValueStore::new();
        let plugins = PluginRegistry::new();
        plugins.register(Rc::new(ValueStorePlugin::new(store.clone())));
        let timeline = Timeline::builder(clock.clone(), plugins)
            .defaults(TimelineDefaults {
                easing: EasingFunction::Linear,
                playback_rate: 1.0,
            })
            .build();
        Fixture {
            clock,
            source,
            store,
            timeline,
        }
    }

    fn x_over(duration: Millis) -> AddOptions {
        AddOptions::new(
            AnimationOptions::new(TargetSpec::id("box"))
                .prop("store", "x", PropertyOptions::values([0.0, 100.0])),
        )
        .duration(duration)
    }

    fn x(f: &Fixture) -> f64 {
        f.store.number(&TargetId::from("box"), "x").expect("x is set")
    }

    #[test]
    fn test_add_interval_rules() {
        let f = fixture();
        let anim = || AnimationOptions::new(TargetSpec::id("box")).prop("store", "x", PropertyOptions::to(1.0));

        f.timeline.add(AddOptions::new(anim()).from(100.0).to(300.0)).unwrap();
        assert_eq!(f.timeline.duration(), 300.0);

        f.timeline.add(AddOptions::new(anim()).duration(200.0)).unwrap();
        assert_eq!(f.timeline.duration(), 500.0, "duration-only starts at the end");

        f.timeline.add(AddOptions::new(anim()).to(800.0).duration(100.0)).unwrap();
        assert_eq!(f.timeline.duration(), 800.0);

        f.timeline.add(AddOptions::new(anim()).to(50.0)).unwrap();
        assert_eq!(f.timeline.duration(), 850.0, "to-only is relative to the end");

        assert_eq!(
            f.timeline.add(AddOptions::new(anim()).from(10.0)).err(),
            Some(TimelineError::MissingInterval)
        );
    }

    #[test]
    fn test_end_delay_pushes_next_start() {
        let f = fixture();
        let anim = AnimationOptions::new(TargetSpec::id("a"))
            .end_delay(250)
            .prop("store", "x", PropertyOptions::to(1.0));
        f.timeline.add(AddOptions::new(anim).duration(500.0)).unwrap();
        assert_eq!(f.timeline.duration(), 500.0);
        assert_eq!(f.timeline.next_time(), 750.0);

        let next = AnimationOptions::new(TargetSpec::id("b")).prop("store", "x", PropertyOptions::to(1.0));
        f.timeline.add(AddOptions::new(next).duration(100.0)).unwrap();
        assert_eq!(f.timeline.duration(), 850.0);
    }

    #[test]
    fn test_unknown_namespace_is_dropped() {
        let f = fixture();
        let anim = AnimationOptions::new(TargetSpec::id("box"))
            .prop("css", "color", PropertyOptions::to("red"))
            .prop("store", "x", PropertyOptions::to(1.0));
        f.timeline.add(AddOptions::new(anim).duration(100.0)).unwrap();

        let effects = f.timeline.get_effects();
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].plugin, "store");
    }

    #[test]
    fn test_play_subscribes_and_runs() {
        let f = fixture();
        f.timeline.add(x_over(1000.0)).unwrap();
        assert_eq!(f.timeline.state(), PlayState::Idle);
        assert_eq!(f.timeline.current_time(), None);

        f.timeline.play(1, Direction::Normal);
        assert_eq!(f.timeline.state(), PlayState::Pending);
        assert!(f.source.is_pending());

        f.clock.on_frame(0.0);
        assert_eq!(f.timeline.state(), PlayState::Running);
        assert_eq!(f.timeline.current_time(), Some(0.0));

        f.clock.on_frame(250.0);
        assert_eq!(f.timeline.current_time(), Some(250.0));
        assert!(approx_eq(x(&f), 25.0));
    }

    #[test]
    fn test_pause_holds_and_resumes() {
        let f = fixture();
        f.timeline.add(x_over(1000.0)).unwrap();
        f.timeline.play(1, Direction::Normal);
        f.clock.advance(400.0);

        f.timeline.pause();
        assert_eq!(f.timeline.state(), PlayState::Paused);
        assert!(!f.clock.is_running());
        f.clock.advance(400.0);
        assert_eq!(f.timeline.current_time(), Some(400.0));

        f.timeline.play(1, Direction::Normal);
        f.clock.advance(100.0);
        assert_eq!(f.timeline.current_time(), Some(500.0));
        assert!(approx_eq(x(&f), 50.0));
    }

    #[test]
    fn test_cancel_restores_and_unlocks() {
        let f = fixture();
        f.store.set(&TargetId::from("box"), "x", -1.0);
        f.timeline.add(x_over(1000.0)).unwrap();
        f.timeline.play(1, Direction::Normal);
        f.clock.advance(500.0);

        assert_eq!(
            f.timeline.add(x_over(100.0)).err(),
            Some(TimelineError::DefinitionLocked)
        );

        f.timeline.cancel();
        assert_eq!(f.timeline.state(), PlayState::Idle);
        assert_eq!(f.timeline.current_time(), Some(0.0));
        assert_eq!(f.timeline.iteration(), None);
        assert_eq!(x(&f), -1.0);
        assert!(!f.clock.is_running());

        assert!(f.timeline.add(x_over(100.0)).is_ok());
    }

    #[test]
    fn test_finish_jumps_to_end() {
        let f = fixture();
        f.timeline.add(x_over(1000.0)).unwrap();
        f.timeline.finish();
        assert_eq!(f.timeline.state(), PlayState::Finished);
        assert_eq!(f.timeline.current_time(), Some(1000.0));
        assert!(approx_eq(x(&f), 100.0));

        f.timeline.set_playback_rate(-1.0).unwrap();
        f.timeline.finish();
        assert_eq!(f.timeline.current_time(), Some(0.0));
        assert!(approx_eq(x(&f), 0.0));
    }

    #[test]
    fn test_replay_after_finish_restarts() {
        let f = fixture();
        f.timeline.add(x_over(100.0)).unwrap();
        f.timeline.play(1, Direction::Normal);
        f.clock.advance(100.0);
        assert_eq!(f.timeline.state(), PlayState::Finished);

        f.timeline.play(1, Direction::Normal);
        f.clock.advance(10.0);
        assert_eq!(f.timeline.current_time(), Some(10.0));
        assert_eq!(f.timeline.state(), PlayState::Running);
    }

    #[test]
    fn test_reverse_while_running() {
        let f = fixture();
        f.timeline.add(x_over(1000.0)).unwrap();
        f.timeline.play(1, Direction::Normal);
        f.clock.advance(600.0);

        f.timeline.reverse();
        assert_eq!(f.timeline.playback_rate(), -1.0);
        f.clock.advance(100.0);
        assert_eq!(f.timeline.current_time(), Some(500.0));

        f.clock.advance(500.0);
        assert_eq!(f.timeline.state(), PlayState::Finished);
        assert_eq!(f.timeline.current_time(), Some(0.0));
    }

    #[test]
    fn test_seek_relative_and_invalid() {
        let f = fixture();
        f.timeline.add(x_over(1000.0)).unwrap();
        f.timeline.pause();

        f.timeline.seek("250ms").unwrap();
        f.timeline.seek("+=0.25s").unwrap();
        assert_eq!(f.timeline.current_time(), Some(500.0));
        assert!(approx_eq(x(&f), 50.0));

        assert!(matches!(f.timeline.seek("later"), Err(TimelineError::MalformedTime(_))));
        assert_eq!(f.timeline.current_time(), Some(500.0));
    }

    #[test]
    fn test_set_current_time_non_finite() {
        let f = fixture();
        f.timeline.add(x_over(1000.0)).unwrap();
        f.timeline.set_current_time(300.0);
        assert_eq!(f.timeline.current_time(), Some(300.0));
        f.timeline.set_current_time(f64::NAN);
        assert_eq!(f.timeline.current_time(), Some(0.0));
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let f = fixture();
        assert_eq!(
            f.timeline.set_playback_rate(f64::INFINITY),
            Err(TimelineError::InvalidRate(f64::INFINITY))
        );
        assert_eq!(f.timeline.playback_rate(), 1.0);
    }

    #[test]
    fn test_listener_can_reenter() {
        let f = fixture();
        f.timeline.add(x_over(1000.0)).unwrap();
        let handle = f.timeline.clone();
        f.timeline.on(TimelineEvent::Update, move |time| {
            if time >= 300.0 {
                handle.pause();
            }
        });

        f.timeline.play(1, Direction::Normal);
        f.clock.advance(200.0);
        assert_eq!(f.timeline.state(), PlayState::Running);
        f.clock.advance(200.0);
        assert_eq!(f.timeline.state(), PlayState::Paused);
        assert_eq!(f.timeline.current_time(), Some(400.0));
    }

    #[test]
    fn test_nested_events_wait_for_current_listeners() {
        let f = fixture();
        f.timeline.add(x_over(1000.0)).unwrap();
        let order = Rc::new(RefCell::new(Vec::<&str>::new()));

        let handle = f.timeline.clone();
        let first = Rc::clone(&order);
        f.timeline.on(TimelineEvent::Update, move |_| {
            first.borrow_mut().push("update#1");
            if handle.state() == PlayState::Running {
                handle.pause();
            }
        });
        let second = Rc::clone(&order);
        f.timeline.on(TimelineEvent::Update, move |_| second.borrow_mut().push("update#2"));
        let paused = Rc::clone(&order);
        f.timeline.on(TimelineEvent::Pause, move |_| paused.borrow_mut().push("pause"));

        f.timeline.play(1, Direction::Normal);
        f.clock.advance(100.0);
        assert_eq!(*order.borrow(), vec!["update#1", "update#2", "pause"]);
        assert_eq!(f.timeline.state(), PlayState::Paused);
    }

    #[test]
    fn test_off_removes_listener() {
        let f = fixture();
        f.timeline.add(x_over(100.0)).unwrap();
        let plays = Rc::new(Cell::new(0));
        let counter = Rc::clone(&plays);
        let id = f.timeline.on(TimelineEvent::Play, move |_| counter.set(counter.get() + 1));

        f.timeline.play(1, Direction::Normal);
        assert!(f.timeline.off(TimelineEvent::Play, id));
        f.timeline.play(1, Direction::Normal);
        assert_eq!(plays.get(), 1);
    }

    #[test]
    fn test_dropping_last_handle_unsubscribes() {
        let f = fixture();
        f.timeline.add(x_over(100.0)).unwrap();
        f.timeline.play(1, Direction::Normal);
        assert_eq!(f.clock.subscriber_count(), 1);

        drop(f.timeline);
        assert_eq!(f.clock.subscriber_count(), 0);
        assert!(!f.source.is_pending());
    }

    #[test]
    fn test_stagger_spreads_targets() {
        let f = fixture();
        let anim = AnimationOptions::new(TargetSpec::from(vec!["a", "b", "c"]))
            .stagger(100.0)
            .prop("store", "x", PropertyOptions::values([0.0, 1.0]));
        f.timeline.add(AddOptions::new(anim).from(0.0).to(200.0)).unwrap();

        // target i starts at 100 * (i + 1)
        assert_eq!(f.timeline.duration(), 500.0);
        let windows: Vec<_> = f
            .timeline
            .get_effects()
            .iter()
            .map(|e| (e.target.to_string(), e.from, e.to))
            .collect();
        assert_eq!(
            windows,
            vec![
                ("a".to_string(), 100.0, 300.0),
                ("b".to_string(), 200.0, 400.0),
                ("c".to_string(), 300.0, 500.0),
            ]
        );
    }
}
