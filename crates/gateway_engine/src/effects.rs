//! Status effects active on a player.

use std::collections::BTreeMap;

/// One active effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectInstance {
    pub amplifier: i32,
    pub duration_ticks: i32,
}

/// Active effects by source-protocol effect ID.
#[derive(Debug, Clone, Default)]
pub struct EffectCache {
    effects: BTreeMap<i32, EffectInstance>,
}

impl EffectCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh an effect, returning the instance it replaced.
    pub fn set(&mut self, effect_id: i32, amplifier: i32, duration_ticks: i32) -> Option<EffectInstance> {
        self.effects.insert(
            effect_id,
            EffectInstance {
                amplifier,
                duration_ticks,
            },
        )
    }

    pub fn remove(&mut self, effect_id: i32) -> Option<EffectInstance> {
        self.effects.remove(&effect_id)
    }

    #[must_use]
    pub fn get(&self, effect_id: i32) -> Option<&EffectInstance> {
        self.effects.get(&effect_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &EffectInstance)> {
        self.effects.iter().map(|(id, effect)| (*id, effect))
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_refreshes() {
        let mut cache = EffectCache::new();
        assert!(cache.set(1, 0, 200).is_none());
        let previous = cache.set(1, 1, 400).unwrap();
        assert_eq!(previous.amplifier, 0);
        assert_eq!(cache.get(1).unwrap().duration_ticks, 400);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut cache = EffectCache::new();
        cache.set(5, 2, 100);
        cache.set(3, 0, 100);
        assert!(cache.remove(5).is_some());
        assert!(cache.remove(5).is_none());
        assert_eq!(cache.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![3]);
    }
}
