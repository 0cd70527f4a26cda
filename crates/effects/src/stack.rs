//! The session's ordered set of active effects.
//!
//! Activation happens on the host's control thread while the render tick
//! reads the set, so the shared form lives behind an `RwLock`. The tick only
//! ever takes a snapshot and never holds the lock while rendering.

use std::sync::{Arc, PoisonError, RwLock};

use duet_common::error::{DuetError, DuetResult};
use duet_media_model::effect::{EffectDescriptor, MAX_INTENSITY};

use crate::catalog::{EffectCatalog, Entitlements};

/// Ordered active effect set. Effects run in activation order.
#[derive(Debug, Clone, Default)]
pub struct EffectStack {
    catalog: EffectCatalog,
    active: Vec<EffectDescriptor>,
}

impl EffectStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: EffectCatalog) -> Self {
        Self {
            catalog,
            active: Vec::new(),
        }
    }

    /// Activate an effect at the end of the stack.
    ///
    /// Returns `Ok(false)` when an effect with the same id is already
    /// active (the existing one is kept). Premium effects without a premium
    /// entitlement fail with `NotEntitled` and leave the stack unchanged.
    pub fn activate(
        &mut self,
        descriptor: EffectDescriptor,
        entitlements: &Entitlements,
    ) -> DuetResult<bool> {
        if !self.catalog.is_allowed(&descriptor.id, entitlements) {
            tracing::info!(effect = %descriptor.id, "Premium effect rejected");
            return Err(DuetError::not_entitled(descriptor.id));
        }
        if self.contains(&descriptor.id) {
            return Ok(false);
        }
        tracing::debug!(effect = %descriptor.id, intensity = descriptor.intensity, "Effect activated");
        self.active.push(descriptor);
        Ok(true)
    }

    /// Remove an effect. Returns whether it was active.
    pub fn deactivate(&mut self, id: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|e| e.id != id);
        let removed = self.active.len() != before;
        if removed {
            tracing::debug!(effect = %id, "Effect deactivated");
        }
        removed
    }

    /// Change the intensity of an active effect. Returns whether it was found.
    pub fn set_intensity(&mut self, id: &str, intensity: u8) -> bool {
        match self.active.iter_mut().find(|e| e.id == id) {
            Some(effect) => {
                effect.intensity = intensity.min(MAX_INTENSITY);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.active.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectDescriptor> {
        self.active.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.active.iter().map(|e| e.id.clone()).collect()
    }

    pub fn catalog(&self) -> &EffectCatalog {
        &self.catalog
    }

    /// Copy of the active set in render order.
    pub fn snapshot(&self) -> Vec<EffectDescriptor> {
        self.active.clone()
    }
}

/// Effect stack shared between the control thread and the render tick.
#[derive(Debug, Clone, Default)]
pub struct SharedEffects(Arc<RwLock<EffectStack>>);

impl SharedEffects {
    pub fn new(stack: EffectStack) -> Self {
        Self(Arc::new(RwLock::new(stack)))
    }

    pub fn activate(
        &self,
        descriptor: EffectDescriptor,
        entitlements: &Entitlements,
    ) -> DuetResult<bool> {
        self.write(|stack| stack.activate(descriptor, entitlements))
    }

    pub fn deactivate(&self, id: &str) -> bool {
        self.write(|stack| stack.deactivate(id))
    }

    pub fn set_intensity(&self, id: &str, intensity: u8) -> bool {
        self.write(|stack| stack.set_intensity(id, intensity))
    }

    pub fn clear(&self) {
        self.write(EffectStack::clear)
    }

    pub fn len(&self) -> usize {
        self.read(EffectStack::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(EffectStack::is_empty)
    }

    /// Snapshot for one render tick.
    pub fn snapshot(&self) -> Vec<EffectDescriptor> {
        self.read(EffectStack::snapshot)
    }

    // A panic on another thread mid-update leaves the stack in a valid
    // state (every mutation is a single Vec operation), so poisoning is ignored.
    fn read<T>(&self, f: impl FnOnce(&EffectStack) -> T) -> T {
        let guard = self.0.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut EffectStack) -> T) -> T {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn activation_preserves_order_and_ignores_duplicates() {
        let mut stack = EffectStack::new();
        let free = Entitlements::free();
        assert!(stack.activate(EffectDescriptor::new("blur", 40), &free).unwrap());
        assert!(stack.activate(EffectDescriptor::new("glasses", 100), &free).unwrap());
        assert!(!stack.activate(EffectDescriptor::new("blur", 90), &free).unwrap());
        assert_eq!(stack.ids(), vec!["blur", "glasses"]);
        assert_eq!(stack.iter().next().unwrap().intensity, 40);
    }

    #[test]
    fn premium_effect_requires_entitlement() {
        let mut stack = EffectStack::new();
        let err = stack
            .activate(EffectDescriptor::new("crown", 100), &Entitlements::free())
            .unwrap_err();
        assert!(matches!(err, DuetError::NotEntitled { ref effect_id } if effect_id == "crown"));
        assert!(stack.is_empty());

        assert!(stack
            .activate(EffectDescriptor::new("crown", 100), &Entitlements::premium())
            .unwrap());
    }

    #[test]
    fn set_intensity_clamps() {
        let mut stack = EffectStack::new();
        stack
            .activate(EffectDescriptor::new("sepia", 10), &Entitlements::free())
            .unwrap();
        assert!(stack.set_intensity("sepia", 250));
        assert_eq!(stack.snapshot()[0].intensity, MAX_INTENSITY);
        assert!(!stack.set_intensity("blur", 5));
    }

    #[test]
    fn shared_effects_are_visible_across_clones() {
        let shared = SharedEffects::default();
        let control = shared.clone();
        control
            .activate(EffectDescriptor::new("tint", 50), &Entitlements::free())
            .unwrap();
        assert_eq!(shared.snapshot().len(), 1);
        assert!(control.deactivate("tint"));
        assert!(shared.is_empty());
    }

    #[test]
    fn shared_effects_survive_a_poisoned_lock() {
        let shared = SharedEffects::default();
        let poisoner = shared.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.0.write().unwrap();
            panic!("control thread crashed");
        })
        .join();
        shared
            .activate(EffectDescriptor::new("invert", 100), &Entitlements::free())
            .unwrap();
        assert_eq!(shared.len(), 1);
    }

    proptest! {
        #[test]
        fn activate_then_deactivate_restores_the_stack(
            existing in proptest::collection::vec(0usize..6, 0..4),
            added in 0usize..11,
        ) {
            let ids = ["blur", "grayscale", "sepia", "tint", "brightness", "invert",
                       "ears", "horns", "glasses", "crown", "sparkles"];
            let mut stack = EffectStack::new();
            for i in existing {
                stack.activate(EffectDescriptor::new(ids[i], 50), &Entitlements::premium()).unwrap();
            }
            let id = ids[added];
            prop_assume!(!stack.contains(id));
            let before = stack.snapshot();
            stack.activate(EffectDescriptor::new(id, 70), &Entitlements::premium()).unwrap();
            prop_assert!(stack.deactivate(id));
            prop_assert_eq!(stack.snapshot(), before);
        }
    }
}
