//! Memory tier with size-bounded LRU eviction using moka.
//!
//! Tiles are held as `Arc<ValueTile>` snapshots weighted by their
//! approximate data size. Writers replace the whole entry; readers keep
//! whatever snapshot they were handed.
//!
//! Tiles modified in memory but not yet written to disk carry the dirty
//! flag. When such a tile is evicted for space it is written to the disk
//! tier on the way out.

use std::sync::Arc;

use moka::notification::RemovalCause;
use moka::sync::Cache;
use tracing::{trace, warn};

use crate::geometry::GridGeometry;
use crate::value::ValueTile;

use super::disk::DiskTier;

/// Fixed per-entry overhead added to the data size.
const ENTRY_OVERHEAD: usize = 256;

/// Approximate heap size of a tile: element data plus two bits per cell and
/// field.
pub(crate) fn tile_weight(tile: &ValueTile) -> u32 {
    let cells = tile.cell_count() as usize;
    let data: usize = tile
        .schema()
        .fields()
        .iter()
        .map(|f| cells * f.count * f.scalar.size() + cells.div_ceil(4))
        .sum();
    (data + ENTRY_OVERHEAD).min(u32::MAX as usize) as u32
}

/// In-memory tile store.
pub(crate) struct MemoryTier {
    cache: Cache<GridGeometry, Arc<ValueTile>>,
    max_size_bytes: u64,
}

impl MemoryTier {
    /// Create a tier holding about `max_size_bytes` of tile data. Dirty
    /// tiles evicted for space are written to `spill` when given.
    pub(crate) fn new(max_size_bytes: u64, spill: Option<Arc<DiskTier>>) -> Self {
        let mut builder = Cache::builder()
            .weigher(|_key: &GridGeometry, tile: &Arc<ValueTile>| -> u32 { tile_weight(tile) })
            .max_capacity(max_size_bytes);

        if let Some(disk) = spill {
            builder = builder.eviction_listener(
                move |key: Arc<GridGeometry>, tile: Arc<ValueTile>, cause: RemovalCause| {
                    if cause != RemovalCause::Size || !tile.is_dirty() {
                        return;
                    }
                    trace!(geometry = %key, "Writing evicted dirty tile");
                    if let Err(e) = disk.store(&tile) {
                        warn!(error = %e, geometry = %key, "Failed to persist evicted tile");
                    }
                },
            );
        }

        Self {
            cache: builder.build(),
            max_size_bytes,
        }
    }

    pub(crate) fn get(&self, geometry: &GridGeometry) -> Option<Arc<ValueTile>> {
        self.cache.get(geometry)
    }

    pub(crate) fn insert(&self, tile: Arc<ValueTile>) {
        self.cache.insert(*tile.geometry(), tile);
    }

    /// Drop every tile intersecting `geometry`. Returns how many were held.
    pub(crate) fn invalidate_intersecting(&self, geometry: &GridGeometry) -> usize {
        let stale: Vec<GridGeometry> = self
            .cache
            .iter()
            .filter(|(key, _)| key.intersects(geometry))
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            self.cache.invalidate(key);
        }
        stale.len()
    }

    pub(crate) fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Every dirty tile currently held.
    pub(crate) fn dirty_tiles(&self) -> Vec<Arc<ValueTile>> {
        self.cache
            .iter()
            .filter(|(_, tile)| tile.is_dirty())
            .map(|(_, tile)| tile)
            .collect()
    }

    pub(crate) fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    pub(crate) fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub(crate) fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Apply pending evictions and size accounting.
    pub(crate) fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}
