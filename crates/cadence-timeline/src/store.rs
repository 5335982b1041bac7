//! In-memory property store and the plugin that animates it.
//!
//! `ValueStorePlugin` animates plain property bags: reads come from the
//! store, and each controller writes the effect's sampled value back on
//! every update. Cancelling restores what the property held before the
//! effect started.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::effects::Effect;
use crate::plugin::{AnimationController, Plugin};
use crate::types::{AnimationValue, TargetId};

/// Shared map of `target -> prop -> value`.
///
/// Cloning yields another handle to the same values.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    values: Rc<RefCell<HashMap<TargetId, HashMap<String, AnimationValue>>>>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, target: &TargetId, prop: &str, value: impl Into<AnimationValue>) {
        self.values
            .borrow_mut()
            .entry(target.clone())
            .or_default()
            .insert(prop.to_string(), value.into());
    }

    pub fn get(&self, target: &TargetId, prop: &str) -> Option<AnimationValue> {
        self.values
            .borrow()
            .get(target)
            .and_then(|props| props.get(prop))
            .cloned()
    }

    /// Numeric shortcut for [`ValueStore::get`].
    pub fn number(&self, target: &TargetId, prop: &str) -> Option<f64> {
        self.get(target, prop).and_then(|v| v.as_number())
    }

    pub fn remove(&self, target: &TargetId, prop: &str) -> Option<AnimationValue> {
        self.values
            .borrow_mut()
            .get_mut(target)
            .and_then(|props| props.remove(prop))
    }
}

/// Plugin animating a [`ValueStore`].
#[derive(Debug, Clone)]
pub struct ValueStorePlugin {
    name: String,
    store: ValueStore,
}

impl ValueStorePlugin {
    pub const DEFAULT_NAME: &'static str = "store";

    pub fn new(store: ValueStore) -> Self {
        Self::named(Self::DEFAULT_NAME, store)
    }

    pub fn named(name: impl Into<String>, store: ValueStore) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }
}

impl Plugin for ValueStorePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    /// Missing properties read as `0`.
    fn get_value(&self, target: &TargetId, prop: &str) -> AnimationValue {
        self.store.get(target, prop).unwrap_or_default()
    }

    fn animate(&self, effect: &Effect) -> Option<Box<dyn AnimationController>> {
        let initial = self.store.get(&effect.target, &effect.prop);
        Some(Box::new(StoreController {
            store: self.store.clone(),
            effect: effect.clone(),
            initial,
        }))
    }
}

struct StoreController {
    store: ValueStore,
    effect: Effect,
    initial: Option<AnimationValue>,
}

impl AnimationController for StoreController {
    fn update(&mut self, offset: f64, _rate: f64, _is_active: bool) {
        if let Some(value) = self.effect.value_at(offset) {
            self.store.set(&self.effect.target, &self.effect.prop, value);
        }
    }

    fn cancel(&mut self) {
        let target = &self.effect.target;
        let prop = &self.effect.prop;
        match self.initial.take() {
            Some(value) => self.store.set(target, prop, value),
            None => {
                self.store.remove(target, prop);
            }
        }
    }
}
