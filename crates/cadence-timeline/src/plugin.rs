//! Plugin and controller contracts.
//!
//! A plugin owns one property namespace (`"store"`, `"css"`, `"attr"`...).
//! It reports live values for keyframes that were left empty, turns each
//! compiled `Effect` into an `AnimationController`, and may rewrite the
//! per-property keyframe drafts before they are finalized.
//!
//! # Architecture
//!
//! ```text
//! PluginRegistry (shared, registration order)
//!   └── Plugin
//!         ├── get_value       (fills offset 0 when no value was given)
//!         ├── on_will_animate (edits PropertyEffects before finalizing)
//!         └── animate         (Effect -> AnimationController)
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::effects::{Effect, PropertyEffects};
use crate::keyframes::TargetConfiguration;
use crate::types::{AnimationValue, TargetId};

/// Rendering backend for one property namespace.
pub trait Plugin {
    /// Namespace this plugin answers to.
    fn name(&self) -> &str;

    /// Current value of `prop` on `target`.
    fn get_value(&self, target: &TargetId, prop: &str) -> AnimationValue;

    /// Build a controller for one effect. `None` skips the effect.
    fn animate(&self, effect: &Effect) -> Option<Box<dyn AnimationController>>;

    /// Called with the drafts of one target before they are finalized.
    fn on_will_animate(&self, _config: &TargetConfiguration, _effects: &mut PropertyEffects) {}
}

/// Handle driving one effect.
pub trait AnimationController {
    /// Move to `offset` (0.0-1.0) within the effect. `is_active` is true
    /// only while the timeline is running inside the effect's window.
    fn update(&mut self, offset: f64, rate: f64, is_active: bool);

    /// Release the effect.
    fn cancel(&mut self);
}

/// Shared, ordered set of plugins.
///
/// Clones share the same registry, so timelines created from one registry
/// see plugins registered later.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Rc<RefCell<Vec<Rc<dyn Plugin>>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin`, replacing any plugin with the same name in place.
    pub fn register(&self, plugin: Rc<dyn Plugin>) {
        let mut plugins = self.plugins.borrow_mut();
        match plugins.iter().position(|p| p.name() == plugin.name()) {
            Some(i) => plugins[i] = plugin,
            None => plugins.push(plugin),
        }
    }

    /// Remove the plugin named `name`. Returns whether one was registered.
    pub fn remove(&self, name: &str) -> bool {
        let mut plugins = self.plugins.borrow_mut();
        let before = plugins.len();
        plugins.retain(|p| p.name() != name);
        plugins.len() != before
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Plugin>> {
        self.plugins.borrow().iter().find(|p| p.name() == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.borrow().iter().any(|p| p.name() == name)
    }

    /// Plugins in registration order.
    pub fn all(&self) -> Vec<Rc<dyn Plugin>> {
        self.plugins.borrow().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.plugins.borrow().iter().map(|p| p.name().to_string()).collect()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
