//! The layered coverage cache.
//!
//! [`CoverageCache::get_tile`] answers "the ValueTile for this geometry" from
//! the cheapest place that has it:
//!
//! 1. the has-values index, when the tile is known to hold no data
//! 2. memory, when a complete tile is held
//! 3. the coverage check, recording a negative entry outside the coverage
//! 4. the disk tier, when persistent
//! 5. a partial tile from 2 or 4 is completed from the producer
//! 6. the producer, for tiles held nowhere
//! 7. the remote blob store
//! 8. tile-needed listeners
//!
//! Tier reads and writes run under one reentrant lock, held per tier
//! operation only. Upstream fetches happen outside it, and with single-flight
//! enabled concurrent fetches of one geometry wait for the first.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::address::CellAddress;
use crate::geometry::{CoverageGeometry, GridGeometry};
use crate::value::{FieldSchema, Value, ValueError, ValueTile};

use super::blob::BlobTileClient;
use super::config::CacheConfig;
use super::disk::DiskTier;
use super::error::CacheError;
use super::index::HasValuesIndex;
use super::memory::MemoryTier;
use super::notify::TileNeededNotifier;
use super::sources::{search, Lookup, LOCAL_SOURCES, UPSTREAM_SOURCES};
use super::stats::{CacheStats, CacheStatsSnapshot};
use super::traits::{BlobStore, Producer, TileNeededListener};

/// Owner identity used in blob keys when neither the configuration nor a
/// producer names one.
const FALLBACK_OWNER: &str = "hexgrid";

/// Rough cost of obtaining a tile, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TileCost {
    /// Held locally, or known to be empty.
    Immediate,
    /// Must be built by the producer.
    Producer,
    /// Must be downloaded.
    Network,
}

/// Shared state behind a [`CoverageCache`].
pub(crate) struct CacheInner {
    pub(crate) config: CacheConfig,
    pub(crate) schema: FieldSchema,
    pub(crate) coverage: CoverageGeometry,
    tier_lock: ReentrantMutex<()>,
    memory: MemoryTier,
    index: HasValuesIndex,
    disk: Option<Arc<DiskTier>>,
    producer: Option<Arc<dyn Producer>>,
    pub(crate) blob: Option<BlobTileClient>,
    pub(crate) notifier: TileNeededNotifier,
    in_flight: DashMap<GridGeometry, Arc<tokio::sync::Mutex<()>>>,
    pub(crate) stats: Arc<CacheStats>,
}

impl CacheInner {
    pub(crate) fn memory_lookup(&self, geometry: &GridGeometry) -> Option<Arc<ValueTile>> {
        let _guard = self.tier_lock.lock();
        self.memory.get(geometry)
    }

    /// Recover a tile from disk into memory.
    pub(crate) fn disk_lookup(&self, geometry: &GridGeometry) -> Option<Arc<ValueTile>> {
        let disk = self.disk.as_ref()?;
        let _guard = self.tier_lock.lock();
        let loaded = disk.load(geometry);
        self.promote(geometry, loaded)
    }

    /// [`disk_lookup`](Self::disk_lookup) for async callers. The file is read
    /// on the blocking pool without holding the tier lock.
    pub(crate) async fn disk_lookup_async(&self, geometry: &GridGeometry) -> Option<Arc<ValueTile>> {
        let disk = self.disk.clone()?;
        let target = *geometry;
        let loaded = tokio::task::spawn_blocking(move || disk.load(&target))
            .await
            .map_err(|e| CacheError::Storage(std::io::Error::other(e.to_string())))
            .and_then(|loaded| loaded);

        let _guard = self.tier_lock.lock();
        // A tile published while the file was read wins.
        if let Some(held) = self.memory.get(geometry) {
            return Some(held);
        }
        self.promote(geometry, loaded)
    }

    fn promote(
        &self,
        geometry: &GridGeometry,
        loaded: Result<Option<ValueTile>, CacheError>,
    ) -> Option<Arc<ValueTile>> {
        match loaded {
            Ok(Some(tile)) => {
                self.stats.record_disk_hit();
                let tile = Arc::new(tile);
                self.memory.insert(tile.clone());
                self.index.record(*geometry, true);
                Some(tile)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, geometry = %geometry, "Disk tier read failed");
                None
            }
        }
    }

    /// Store a tile in memory and, when persistent, on disk.
    pub(crate) fn install(&self, mut tile: ValueTile) -> Arc<ValueTile> {
        let _guard = self.tier_lock.lock();
        if let Some(disk) = &self.disk {
            match disk.store(&tile) {
                Ok(()) => tile.clear_dirty(),
                Err(e) => warn!(error = %e, geometry = %tile.geometry(), "Failed to persist tile"),
            }
        }
        self.admit(tile)
    }

    /// [`install`](Self::install) for async callers. The file is written on
    /// the blocking pool without holding the tier lock.
    pub(crate) async fn install_async(&self, tile: ValueTile) -> Arc<ValueTile> {
        let Some(disk) = self.disk.clone() else {
            let _guard = self.tier_lock.lock();
            return self.admit(tile);
        };

        let shared = Arc::new(tile);
        let pending = shared.clone();
        let stored = tokio::task::spawn_blocking(move || disk.store(&pending))
            .await
            .map_err(|e| CacheError::Storage(std::io::Error::other(e.to_string())))
            .and_then(|stored| stored);

        let mut tile = Arc::unwrap_or_clone(shared);
        match stored {
            Ok(()) => tile.clear_dirty(),
            Err(e) => warn!(error = %e, geometry = %tile.geometry(), "Failed to persist tile"),
        }
        let _guard = self.tier_lock.lock();
        self.admit(tile)
    }

    /// Insert into memory and mark the geometry as holding values. Caller
    /// holds the tier lock.
    fn admit(&self, tile: ValueTile) -> Arc<ValueTile> {
        let geometry = *tile.geometry();
        let tile = Arc::new(tile);
        self.memory.insert(tile.clone());
        self.index.record(geometry, true);
        tile
    }

    pub(crate) fn record_empty(&self, geometry: &GridGeometry) {
        let _guard = self.tier_lock.lock();
        self.index.record(*geometry, false);
    }

    /// The producer, if configured and currently healthy.
    pub(crate) fn ready_producer(&self) -> Option<&Arc<dyn Producer>> {
        self.producer.as_ref().filter(|p| p.is_healthy())
    }

    /// Reject tiles of another geometry or an incompatible field layout.
    pub(crate) fn check_tile(&self, geometry: &GridGeometry, tile: &ValueTile) -> Result<(), CacheError> {
        if tile.geometry() != geometry {
            return Err(ValueError::SchemaMismatch(format!(
                "expected tile {}, got {}",
                geometry,
                tile.geometry()
            ))
            .into());
        }
        if !tile.schema().is_compatible(&self.schema) {
            return Err(ValueError::SchemaMismatch(format!(
                "tile {} does not match the cache fields",
                geometry
            ))
            .into());
        }
        Ok(())
    }

    async fn get_tile(&self, geometry: &GridGeometry) -> Result<Option<Arc<ValueTile>>, CacheError> {
        self.stats.record_request();
        if self.is_known_empty(geometry) {
            self.stats.record_negative_hit();
            return Ok(None);
        }

        match search(&LOCAL_SOURCES, self, geometry).await? {
            Lookup::Hit(tile) if tile.is_complete() => Ok(Some(tile)),
            Lookup::Hit(partial) => self.complete_partial(partial).await.map(Some),
            Lookup::NoData => {
                self.stats.record_negative_hit();
                Ok(None)
            }
            Lookup::Miss => self.fetch_upstream(geometry).await,
        }
    }

    fn is_known_empty(&self, geometry: &GridGeometry) -> bool {
        let _guard = self.tier_lock.lock();
        self.index.is_known_empty(geometry)
    }

    /// Fill the uninitialized cells of a partial tile from the producer.
    async fn complete_partial(&self, partial: Arc<ValueTile>) -> Result<Arc<ValueTile>, CacheError> {
        let geometry = *partial.geometry();
        let Some(producer) = self.ready_producer() else {
            return Ok(partial);
        };

        self.stats.record_producer_fetch();
        let Some(source) = producer.get_coverage_tile(&geometry).await? else {
            return Ok(partial);
        };
        self.check_tile(&geometry, &source)?;

        let tile = {
            let _guard = self.tier_lock.lock();
            let base = self.memory.get(&geometry).unwrap_or(partial);
            let mut tile = Arc::unwrap_or_clone(base);
            let filled = tile.fill_missing_from(&source)?;
            tile.set_complete(true);
            self.stats.record_partial_fill();
            debug!(geometry = %geometry, filled, "Completed partial tile from producer");
            tile
        };
        Ok(self.install_async(tile).await)
    }

    async fn fetch_upstream(&self, geometry: &GridGeometry) -> Result<Option<Arc<ValueTile>>, CacheError> {
        let gate = self
            .config
            .single_flight
            .then(|| self.in_flight.entry(*geometry).or_default().clone());
        let permit = match &gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };

        let result = self.fetch_upstream_locked(geometry, permit.is_some()).await;

        drop(permit);
        if let Some(gate) = gate {
            self.in_flight
                .remove_if(geometry, |_, current| Arc::ptr_eq(current, &gate) && Arc::strong_count(current) <= 2);
        }
        result
    }

    async fn fetch_upstream_locked(
        &self,
        geometry: &GridGeometry,
        coalesced: bool,
    ) -> Result<Option<Arc<ValueTile>>, CacheError> {
        if coalesced {
            // An earlier flight may have answered while we waited.
            if self.is_known_empty(geometry) {
                self.stats.record_negative_hit();
                return Ok(None);
            }
            if let Some(tile) = self.memory_lookup(geometry).filter(|t| t.is_complete()) {
                return Ok(Some(tile));
            }
        }

        match search(&UPSTREAM_SOURCES, self, geometry).await? {
            Lookup::Hit(tile) => Ok(Some(tile)),
            Lookup::NoData => Ok(None),
            Lookup::Miss => {
                self.stats.record_miss();
                debug!(geometry = %geometry, "No source could supply tile");
                Ok(None)
            }
        }
    }

    fn tile_cost(&self, geometry: &GridGeometry) -> TileCost {
        if self.is_known_empty(geometry) {
            return TileCost::Immediate;
        }
        if self.memory_lookup(geometry).is_some_and(|t| t.is_complete()) {
            return TileCost::Immediate;
        }
        if !self.coverage.intersects(geometry) {
            self.record_empty(geometry);
            return TileCost::Immediate;
        }
        let on_disk = self.disk.as_ref().and_then(|disk| {
            let _guard = self.tier_lock.lock();
            disk.peek_complete(geometry)
        });
        if on_disk == Some(true) {
            return TileCost::Immediate;
        }
        if self.ready_producer().is_some() {
            TileCost::Producer
        } else {
            TileCost::Network
        }
    }

    /// Drop everything cached for tiles intersecting `geometry`.
    fn invalidate(&self, geometry: &GridGeometry) {
        let _guard = self.tier_lock.lock();
        let forgotten = self.index.invalidate_intersecting(geometry);
        let dropped = self.memory.invalidate_intersecting(geometry);
        let removed = self
            .disk
            .as_ref()
            .map_or(0, |disk| disk.remove_intersecting(geometry));
        self.stats.record_invalidation();
        debug!(
            geometry = %geometry,
            forgotten,
            dropped,
            removed,
            "Invalidated cached tiles"
        );
    }

    fn reset(&self) {
        let _guard = self.tier_lock.lock();
        self.memory.invalidate_all();
        self.index.invalidate_all();
        let removed = self.disk.as_ref().map_or(0, |disk| disk.clear());
        info!(removed, "Cache reset");
    }

    fn persist_all(&self) -> Result<usize, CacheError> {
        let Some(disk) = &self.disk else {
            return Ok(0);
        };
        let _guard = self.tier_lock.lock();
        let dirty = self.memory.dirty_tiles();
        for tile in &dirty {
            disk.store(tile)?;
            let mut clean = ValueTile::clone(tile);
            clean.clear_dirty();
            self.memory.insert(Arc::new(clean));
        }
        Ok(dirty.len())
    }
}

/// A layered tile cache in front of a producer, a blob store and
/// tile-needed listeners.
///
/// Returned tiles are shared snapshots. Publish changes with
/// [`set_tile`](Self::set_tile) or [`set_value`](Self::set_value).
pub struct CoverageCache {
    inner: Arc<CacheInner>,
    shutdown: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl CoverageCache {
    pub fn builder(config: CacheConfig) -> CoverageCacheBuilder {
        CoverageCacheBuilder::new(config)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Fields of every tile in this cache.
    pub fn schema(&self) -> &FieldSchema {
        &self.inner.schema
    }

    pub fn coverage(&self) -> &CoverageGeometry {
        &self.inner.coverage
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Approximate bytes of tile data held in memory.
    pub fn memory_size_bytes(&self) -> u64 {
        self.inner.memory.run_pending_tasks();
        self.inner.memory.size_bytes()
    }

    pub fn memory_capacity_bytes(&self) -> u64 {
        self.inner.memory.max_size_bytes()
    }

    pub fn memory_tile_count(&self) -> u64 {
        self.inner.memory.run_pending_tasks();
        self.inner.memory.entry_count()
    }

    /// Whether a change listener task is running.
    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Register a listener for tiles no tier can supply.
    pub fn add_tile_needed_listener(&self, listener: Arc<dyn TileNeededListener>) {
        self.inner.notifier.subscribe(listener);
    }

    pub fn tile_needed_listener_count(&self) -> usize {
        self.inner.notifier.listener_count()
    }

    /// The tile for `geometry`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(tile))` from the first tier that has it
    /// - `Ok(None)` if the tile holds no data or no source could supply it
    ///
    /// # Errors
    ///
    /// - `TileUnavailable` when a listener failed or timed out; retry later
    /// - producer failures are passed through and nothing is cached
    pub async fn get_tile(&self, geometry: &GridGeometry) -> Result<Option<Arc<ValueTile>>, CacheError> {
        self.inner.get_tile(geometry).await
    }

    /// A copy of the tile holding only `field`.
    pub async fn get_field_tile(
        &self,
        geometry: &GridGeometry,
        field: usize,
    ) -> Result<Option<ValueTile>, CacheError> {
        let Some(tile) = self.get_tile(geometry).await? else {
            return Ok(None);
        };
        if field >= tile.field_count() {
            return Err(ValueError::FieldOutOfRange {
                field,
                count: tile.field_count(),
            }
            .into());
        }
        if tile.field_count() == 1 {
            return Ok(Some(ValueTile::clone(&tile)));
        }
        Ok(Some(tile.clone_single_field(field)?))
    }

    /// Estimated cost of [`get_tile`](Self::get_tile) without fetching.
    pub fn tile_cost(&self, geometry: &GridGeometry) -> TileCost {
        self.inner.tile_cost(geometry)
    }

    /// The default tile holding `address`.
    pub fn default_tile(&self, address: &CellAddress) -> Result<GridGeometry, CacheError> {
        Ok(GridGeometry::for_cell(address, self.inner.config.tile_depth)?)
    }

    /// Value of one field of one cell. Cells without data read as null.
    pub async fn get_value(&self, address: &CellAddress, field: usize) -> Result<Value, CacheError> {
        let count = self.inner.schema.len();
        if field >= count {
            return Err(ValueError::FieldOutOfRange { field, count }.into());
        }
        if !self.inner.coverage.intersects(&GridGeometry::cell(*address)) {
            return Ok(Value::Null);
        }

        let geometry = self.default_tile(address)?;
        let local = match self.inner.memory_lookup(&geometry) {
            Some(tile) => Some(tile),
            None => self.inner.disk_lookup_async(&geometry).await,
        };
        if let Some(tile) = local {
            if let (value, true) = tile.get_value_at(address, field)? {
                return Ok(value);
            }
        }

        match self.get_tile(&geometry).await? {
            Some(tile) => Ok(tile.get_value_at(address, field)?.0),
            None => Ok(Value::Null),
        }
    }

    /// Write one field of one cell into its default tile. The tile is
    /// written to disk on eviction or [`persist_all`](Self::persist_all).
    pub fn set_value(&self, address: &CellAddress, field: usize, value: &Value) -> Result<(), CacheError> {
        let geometry = self.default_tile(address)?;
        let inner = &self.inner;
        let _guard = inner.tier_lock.lock();
        let base = inner
            .memory_lookup(&geometry)
            .or_else(|| inner.disk_lookup(&geometry));
        let mut tile = match base {
            Some(tile) => Arc::unwrap_or_clone(tile),
            None => ValueTile::new(geometry, inner.schema.clone()),
        };
        tile.set_value_at(address, field, value)?;
        inner.memory.insert(Arc::new(tile));
        inner.index.record(geometry, true);
        Ok(())
    }

    /// Publish a tile. Values present in `tile` overwrite those of a tile
    /// already held for the same geometry; otherwise `tile` is inserted.
    /// Written through to disk when persistent.
    pub fn set_tile(&self, tile: ValueTile) -> Result<Arc<ValueTile>, CacheError> {
        let geometry = *tile.geometry();
        self.inner.check_tile(&geometry, &tile)?;
        let inner = &self.inner;
        let _guard = inner.tier_lock.lock();
        let existing = inner
            .memory_lookup(&geometry)
            .or_else(|| inner.disk_lookup(&geometry));
        let merged = match existing {
            Some(existing) => {
                let mut merged = Arc::unwrap_or_clone(existing);
                merged.merge_from(&tile)?;
                merged
            }
            None => tile,
        };
        Ok(inner.install(merged))
    }

    /// Make sure the tile is produced and upload it to the blob store.
    ///
    /// Returns `false` when no healthy producer is configured.
    pub async fn force_tile(&self, geometry: &GridGeometry) -> Result<bool, CacheError> {
        if self.inner.ready_producer().is_none() {
            return Ok(false);
        }

        let tile = match self.get_tile(geometry).await? {
            Some(tile) => Some(tile),
            None if self.inner.coverage.intersects(geometry) => {
                Some(Arc::new(ValueTile::new(*geometry, self.inner.schema.clone())))
            }
            None => None,
        };
        if let (Some(tile), Some(blob)) = (&tile, &self.inner.blob) {
            let uploaded = blob.put(tile).await;
            debug!(geometry = %geometry, uploaded, "Forced tile upload");
        }
        self.persist_all()?;
        Ok(true)
    }

    /// Write every modified memory tile to disk. Returns how many were
    /// written.
    pub fn persist_all(&self) -> Result<usize, CacheError> {
        self.inner.persist_all()
    }

    /// Drop cached data for every tile intersecting `geometry`, including
    /// negative entries.
    pub fn invalidate(&self, geometry: &GridGeometry) {
        self.inner.invalidate(geometry);
    }

    /// Drop all memory tiles, index entries and tile files.
    pub fn reset(&self) {
        self.inner.reset();
    }

    /// Stop the change listener.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for CoverageCache {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Apply upstream change events until cancelled or the channel closes.
async fn run_invalidation_listener(
    cache: Weak<CacheInner>,
    mut changes: broadcast::Receiver<GridGeometry>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            received = changes.recv() => {
                let Some(cache) = cache.upgrade() else { break };
                match received {
                    Ok(geometry) => {
                        let task = tokio::task::spawn_blocking(move || cache.invalidate(&geometry));
                        if let Err(e) = task.await {
                            warn!(error = %e, geometry = %geometry, "Invalidation task failed");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed data change events, resetting cache");
                        if let Err(e) = tokio::task::spawn_blocking(move || cache.reset()).await {
                            warn!(error = %e, "Cache reset task failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
    debug!("Invalidation listener stopped");
}

/// Builder for [`CoverageCache`].
pub struct CoverageCacheBuilder {
    config: CacheConfig,
    schema: Option<FieldSchema>,
    coverage: CoverageGeometry,
    producer: Option<Arc<dyn Producer>>,
    blob_store: Option<Arc<dyn BlobStore>>,
    listeners: Vec<Arc<dyn TileNeededListener>>,
}

impl CoverageCacheBuilder {
    fn new(config: CacheConfig) -> Self {
        Self {
            config,
            schema: None,
            coverage: CoverageGeometry::Global,
            producer: None,
            blob_store: None,
            listeners: Vec::new(),
        }
    }

    /// Set the field schema. Defaults to the producer definition, then to
    /// the schema recorded in the cache directory.
    pub fn with_schema(mut self, schema: FieldSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the area the cache holds data for. Defaults to global.
    pub fn with_coverage(mut self, coverage: CoverageGeometry) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_producer(mut self, producer: Arc<dyn Producer>) -> Self {
        self.producer = Some(producer);
        self
    }

    pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn TileNeededListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Open the cache.
    ///
    /// Starts the change listener when the producer publishes changes and a
    /// tokio runtime is running.
    ///
    /// # Errors
    ///
    /// - `Config` if no field schema can be determined
    /// - `Storage` if the cache directory cannot be prepared
    pub fn build(self) -> Result<CoverageCache, CacheError> {
        let config = self.config;
        let stats = Arc::new(CacheStats::default());

        let schema = self
            .schema
            .or_else(|| self.producer.as_ref().map(|p| p.definition()))
            .or_else(|| {
                config
                    .persistent
                    .then(|| DiskTier::stored_schema(&config.directory))
                    .flatten()
            })
            .ok_or_else(|| {
                CacheError::Config("no field schema given and none recorded on disk".to_string())
            })?;

        let disk = if config.persistent {
            Some(Arc::new(DiskTier::open(
                &config.directory,
                &schema,
                config.tile_depth,
                stats.clone(),
            )?))
        } else {
            None
        };

        let owner = config
            .owner
            .clone()
            .or_else(|| self.producer.as_ref().map(|p| p.identity()))
            .unwrap_or_else(|| FALLBACK_OWNER.to_string());
        let blob = self
            .blob_store
            .map(|store| BlobTileClient::new(store, config.blob_version.clone(), owner));

        let notifier = TileNeededNotifier::new(config.notification_timeout);
        for listener in self.listeners {
            notifier.subscribe(listener);
        }

        let changes = self.producer.as_ref().and_then(|p| p.subscribe_changes());
        info!(
            persistent = config.persistent,
            directory = %config.directory.display(),
            fields = schema.len(),
            producer = self.producer.is_some(),
            blob = blob.is_some(),
            "Coverage cache ready"
        );

        let inner = Arc::new(CacheInner {
            memory: MemoryTier::new(config.memory_capacity_bytes, disk.clone()),
            index: HasValuesIndex::new(config.negative_index_capacity),
            tier_lock: ReentrantMutex::new(()),
            in_flight: DashMap::new(),
            producer: self.producer,
            coverage: self.coverage,
            config,
            schema,
            disk,
            blob,
            notifier,
            stats,
        });

        let shutdown = CancellationToken::new();
        let listener = changes.and_then(|changes| {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => Some(handle.spawn(run_invalidation_listener(
                    Arc::downgrade(&inner),
                    changes,
                    shutdown.clone(),
                ))),
                Err(_) => {
                    warn!("No tokio runtime, producer change events will be ignored");
                    None
                }
            }
        });

        Ok(CoverageCache {
            inner,
            shutdown,
            listener,
        })
    }
}
