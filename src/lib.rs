//! cadence: animation orchestration engine.
//!
//! Re-exports the timeline core and wires it to configuration: a shared
//! frame clock, a plugin registry and timeline defaults built from
//! `cadence.toml` and `CADENCE_*` environment overrides.
//!
//! # Usage
//!
//! ```ignore
//! use cadence::{Cadence, config::CadenceConfig};
//!
//! let config = CadenceConfig::load();
//! cadence::init_logging(&config.logging);
//!
//! let engine = Cadence::new(config)?;
//! let store = ValueStore::new();
//! engine.register_plugin(Rc::new(ValueStorePlugin::new(store.clone())));
//!
//! let timeline = engine.timeline();
//! timeline.add(AddOptions::new(definition).duration("1s"))?;
//! timeline.play(1, Direction::Normal);
//! engine.run_headless(5_000.0);
//! ```

use std::rc::Rc;

use anyhow::Context;

pub use cadence_config as config;
pub use cadence_timeline::*;

use cadence_config::{CadenceConfig, LoggingConfig};

/// Install `env_logger` as the `log` backend, which also receives the core's
/// `tracing` records.
///
/// Uses `config.filter` when set, else `RUST_LOG`, else `info`. Returns
/// `false` if a logger was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = &config.filter {
        builder.parse_filters(filter);
    }
    builder.try_init().is_ok()
}

/// Engine handle: one clock and one plugin registry shared by every
/// timeline it creates.
pub struct Cadence {
    config: CadenceConfig,
    clock: FrameClock,
    plugins: PluginRegistry,
    defaults: TimelineDefaults,
}

impl Cadence {
    /// Engine on a manually driven clock; see [`Cadence::run_headless`].
    pub fn new(config: CadenceConfig) -> anyhow::Result<Self> {
        Self::with_frame_source(config, ManualFrameSource::new())
    }

    /// Engine driven by a host frame source.
    pub fn with_frame_source(
        config: CadenceConfig,
        source: impl FrameSource + 'static,
    ) -> anyhow::Result<Self> {
        let easing: EasingFunction = config
            .timeline
            .default_easing
            .parse()
            .with_context(|| format!("invalid default easing {:?}", config.timeline.default_easing))?;

        let playback_rate = config.timeline.playback_rate;
        if !playback_rate.is_finite() {
            anyhow::bail!("invalid playback rate {}", playback_rate);
        }

        log::info!(
            "cadence: easing={} rate={} frame_interval={}ms",
            easing,
            playback_rate,
            config.clock.frame_interval_ms
        );

        Ok(Self {
            clock: FrameClock::new(source),
            plugins: PluginRegistry::new(),
            defaults: TimelineDefaults {
                easing,
                playback_rate,
            },
            config,
        })
    }

    /// Load `cadence.toml` with environment overrides and build the engine.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(CadenceConfig::load())
    }

    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn defaults(&self) -> TimelineDefaults {
        self.defaults
    }

    /// Register (or replace by name) a plugin for every timeline of this engine.
    pub fn register_plugin(&self, plugin: Rc<dyn Plugin>) {
        log::debug!("register plugin {}", plugin.name());
        self.plugins.register(plugin);
    }

    /// New timeline resolving selectors as literal ids.
    pub fn timeline(&self) -> Timeline {
        self.timeline_with_resolver(Rc::new(IdentityResolver))
    }

    pub fn timeline_with_resolver(&self, resolver: Rc<dyn TargetResolver>) -> Timeline {
        Timeline::builder(self.clock.clone(), self.plugins.clone())
            .resolver(resolver)
            .defaults(self.defaults)
            .build()
    }

    /// Feed fixed-interval frames until no timeline is subscribed or
    /// `max_ms` has elapsed. Returns the elapsed time.
    pub fn run_headless(&self, max_ms: Millis) -> Millis {
        let interval = self.config.clock.frame_interval_ms.max(f64::EPSILON);
        let mut elapsed = 0.0;
        while self.clock.subscriber_count() > 0 && elapsed < max_ms {
            self.clock.advance(interval);
            elapsed += interval;
        }
        log::debug!("headless run stopped after {:.1}ms", elapsed);
        elapsed
    }
}
