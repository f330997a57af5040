//! Bounded has-values index.
//!
//! Remembers, per exact geometry, whether the tile is known to hold data
//! (`true`) or known to hold none (`false`). Absence means "unknown". The
//! negative entries let repeated lookups outside the coverage return
//! without touching any tier.

use moka::sync::Cache;

use crate::geometry::GridGeometry;

pub(crate) struct HasValuesIndex {
    entries: Cache<GridGeometry, bool>,
}

impl HasValuesIndex {
    pub(crate) fn new(capacity: u64) -> Self {
        Self {
            entries: Cache::new(capacity),
        }
    }

    pub(crate) fn get(&self, geometry: &GridGeometry) -> Option<bool> {
        self.entries.get(geometry)
    }

    pub(crate) fn is_known_empty(&self, geometry: &GridGeometry) -> bool {
        self.get(geometry) == Some(false)
    }

    pub(crate) fn record(&self, geometry: GridGeometry, has_values: bool) {
        self.entries.insert(geometry, has_values);
    }

    /// Forget every entry intersecting `geometry`.
    pub(crate) fn invalidate_intersecting(&self, geometry: &GridGeometry) -> usize {
        let stale: Vec<GridGeometry> = self
            .entries
            .iter()
            .filter(|(key, _)| key.intersects(geometry))
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            self.entries.invalidate(key);
        }
        stale.len()
    }

    pub(crate) fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}
