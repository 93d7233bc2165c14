use decogen_core::model::BulbSetType;
use std::collections::HashMap;

/// Stable arena index of a bulb inside a [`crate::ChainEngine`].
pub type BulbId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulbKind {
    /// Anchor-mounted bulb at a chain endpoint or bend.
    Hook,
    /// Bulb hung along a cable curve.
    Inline,
}

/// Per-set-type tuning resolved through the catalog. Defaults mirror the
/// shipped prototypes: 5 bulbs per unit of cable, 0.3 up-direction blend.
#[derive(Debug, Clone)]
pub struct BulbSetParams {
    pub set_type: BulbSetType,
    pub bulb_density: f32,
    pub up_lerp_weight: f32,
}

impl BulbSetParams {
    pub fn new(set_type: BulbSetType) -> Self {
        Self {
            set_type,
            bulb_density: 5.0,
            up_lerp_weight: 0.3,
        }
    }
}

/// Maps a bulb-set type to its prototype parameters. Lookup is fallible by
/// contract: an unconfigured type means no bulb spawns that frame, never an
/// error.
#[derive(Debug, Clone, Default)]
pub struct CableCatalog {
    sets: HashMap<BulbSetType, BulbSetParams>,
}

impl CableCatalog {
    pub fn insert(&mut self, params: BulbSetParams) {
        self.sets.insert(params.set_type, params);
    }

    pub fn get(&self, set_type: BulbSetType) -> Option<&BulbSetParams> {
        self.sets.get(&set_type)
    }

    /// Every known set type configured with default parameters.
    pub fn with_all_defaults() -> Self {
        let mut catalog = Self::default();
        for set_type in BulbSetType::ALL {
            catalog.insert(BulbSetParams::new(set_type));
        }
        catalog
    }
}

/// LIFO pools of released bulb ids, one stack per set type. Acquiring only
/// ever returns a bulb of the requested type.
#[derive(Debug, Default)]
pub struct BulbPool {
    stacks: HashMap<BulbSetType, Vec<BulbId>>,
}

impl BulbPool {
    pub fn acquire(&mut self, set_type: BulbSetType) -> Option<BulbId> {
        self.stacks.get_mut(&set_type)?.pop()
    }

    pub fn release(&mut self, set_type: BulbSetType, id: BulbId) {
        self.stacks.entry(set_type).or_default().push(id);
    }

    pub fn len(&self) -> usize {
        self.stacks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_is_lifo_per_type() {
        let mut pool = BulbPool::default();
        pool.release(BulbSetType::Lanterns, 1);
        pool.release(BulbSetType::Lanterns, 2);
        pool.release(BulbSetType::Pumpkin1, 7);

        assert_eq!(Some(2), pool.acquire(BulbSetType::Lanterns));
        assert_eq!(Some(1), pool.acquire(BulbSetType::Lanterns));
        assert_eq!(None, pool.acquire(BulbSetType::Lanterns));
        // a different type never leaks across stacks
        assert_eq!(Some(7), pool.acquire(BulbSetType::Pumpkin1));
    }

    #[test]
    fn unconfigured_type_yields_nothing() {
        let catalog = CableCatalog::default();
        assert!(catalog.get(BulbSetType::RegularBulbs).is_none());
        let full = CableCatalog::with_all_defaults();
        assert!(full.get(BulbSetType::WashingLine).is_some());
    }
}
