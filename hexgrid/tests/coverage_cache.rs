//! Integration tests for the coverage cache.
//!
//! These tests drive [`CoverageCache`] through its public API with mock
//! collaborators and cover:
//! - producer fetches, negative answers and failures
//! - coverage limits
//! - disk persistence across instances and corrupt file recovery
//! - blob store fallback and forced uploads
//! - tile-needed notifications
//! - change events from the producer
//! - fetch coalescing
//!
//! Run with: `cargo test --test coverage_cache`

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use hexgrid::address::CellAddress;
use hexgrid::cache::{
    tile_path, BlobStore, BlobTileClient, BoxFuture, CacheConfig, CacheError, CoverageCache,
    Producer, TileCost, TileNeeded, TileNeededListener, DEFAULT_BLOB_VERSION,
};
use hexgrid::geometry::{CoverageGeometry, GridGeometry};
use hexgrid::value::{FieldSchema, FieldSpec, Scalar, ScalarType, Value, ValueTile};

// ============================================================================
// Helper Functions
// ============================================================================

const TILE_DEPTH: usize = 3;

fn schema() -> FieldSchema {
    FieldSchema::new(vec![
        FieldSpec::new("height", ScalarType::F32, 1),
        FieldSpec::new("slope", ScalarType::U16, 1),
    ])
}

fn geometry(root: &str) -> GridGeometry {
    let root: CellAddress = root.parse().unwrap();
    GridGeometry::new(root, root.resolution() + TILE_DEPTH).unwrap()
}

fn area(root: &str, resolution: usize) -> GridGeometry {
    GridGeometry::new(root.parse().unwrap(), resolution).unwrap()
}

/// A tile with every cell set: height is the cell offset, slope is 7.
fn filled(geometry: GridGeometry) -> ValueTile {
    let mut tile = ValueTile::new(geometry, schema());
    for offset in 0..tile.cell_count() {
        tile.set_value(offset, 0, &Value::scalar(Scalar::F32(offset as f32)))
            .unwrap();
        tile.set_value(offset, 1, &Value::scalar(Scalar::U16(7)))
            .unwrap();
    }
    tile
}

fn height(value: f32) -> Value {
    Value::scalar(Scalar::F32(value))
}

fn config(dir: &tempfile::TempDir) -> CacheConfig {
    CacheConfig::new(dir.path()).with_tile_depth(TILE_DEPTH)
}

fn memory_config() -> CacheConfig {
    CacheConfig::in_memory().with_tile_depth(TILE_DEPTH)
}

// ============================================================================
// Mock Collaborators
// ============================================================================

#[derive(Default)]
struct TestProducer {
    calls: AtomicUsize,
    unhealthy: AtomicBool,
    failing: AtomicBool,
    empty: Mutex<HashSet<GridGeometry>>,
    delay: Option<Duration>,
    changes: Option<broadcast::Sender<GridGeometry>>,
}

impl TestProducer {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Producer for TestProducer {
    fn identity(&self) -> String {
        "test-producer".to_string()
    }

    fn definition(&self) -> FieldSchema {
        schema()
    }

    fn get_coverage_tile<'a>(
        &'a self,
        geometry: &'a GridGeometry,
    ) -> BoxFuture<'a, Result<Option<ValueTile>, CacheError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(CacheError::Producer("backend offline".to_string()));
            }
            if self.empty.lock().unwrap().contains(geometry) {
                return Ok(None);
            }
            Ok(Some(filled(*geometry)))
        })
    }

    fn is_healthy(&self) -> bool {
        !self.unhealthy.load(Ordering::SeqCst)
    }

    fn subscribe_changes(&self) -> Option<broadcast::Receiver<GridGeometry>> {
        self.changes.as_ref().map(|tx| tx.subscribe())
    }
}

#[derive(Default)]
struct MapStore {
    blobs: DashMap<String, Bytes>,
}

impl BlobStore for MapStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, CacheError>> {
        Box::pin(async move { Ok(self.blobs.get(key).map(|b| b.clone())) })
    }

    fn put<'a>(&'a self, key: &'a str, data: Bytes) -> BoxFuture<'a, Result<bool, CacheError>> {
        Box::pin(async move {
            self.blobs.insert(key.to_string(), data);
            Ok(true)
        })
    }
}

/// Answers every request immediately.
struct Responder {
    supply: bool,
}

impl TileNeededListener for Responder {
    fn tile_needed(&self, request: TileNeeded) {
        if self.supply {
            request.supply(filled(*request.geometry()));
        } else {
            request.fail();
        }
    }
}

/// Keeps requests without answering them.
#[derive(Default)]
struct Hoarder {
    held: Mutex<Vec<TileNeeded>>,
}

impl TileNeededListener for Hoarder {
    fn tile_needed(&self, request: TileNeeded) {
        self.held.lock().unwrap().push(request);
    }
}

/// Hands requests to a test task.
struct Forward(mpsc::UnboundedSender<TileNeeded>);

impl TileNeededListener for Forward {
    fn tile_needed(&self, request: TileNeeded) {
        let _ = self.0.send(request);
    }
}

// ============================================================================
// Producer
// ============================================================================

#[tokio::test]
async fn test_producer_tile_survives_producer_outage() {
    let producer = TestProducer::new();
    let cache = CoverageCache::builder(memory_config())
        .with_producer(producer.clone())
        .build()
        .unwrap();
    let g = geometry("A-0102");

    let tile = cache.get_tile(&g).await.unwrap().unwrap();
    assert!(tile.is_complete());
    assert_eq!(tile.get_value(3, 0).unwrap().0, height(3.0));

    producer.unhealthy.store(true, Ordering::SeqCst);
    assert!(cache.get_tile(&g).await.unwrap().is_some());
    assert_eq!(producer.calls(), 1);
    assert_eq!(cache.tile_cost(&g), TileCost::Immediate);
    assert_eq!(cache.tile_cost(&geometry("B-0102")), TileCost::Network);
}

#[tokio::test]
async fn test_producer_without_data_is_remembered() {
    let producer = TestProducer::new();
    let g = geometry("C-0100");
    producer.empty.lock().unwrap().insert(g);
    let cache = CoverageCache::builder(memory_config())
        .with_producer(producer.clone())
        .build()
        .unwrap();

    assert!(cache.get_tile(&g).await.unwrap().is_none());
    assert!(cache.get_tile(&g).await.unwrap().is_none());
    assert_eq!(producer.calls(), 1);
    assert_eq!(cache.stats().negative_hits, 1);
}

#[tokio::test]
async fn test_producer_failure_is_not_cached() {
    let producer = TestProducer::new();
    producer.failing.store(true, Ordering::SeqCst);
    let cache = CoverageCache::builder(memory_config())
        .with_producer(producer.clone())
        .build()
        .unwrap();
    let g = geometry("A-0102");

    assert!(matches!(
        cache.get_tile(&g).await,
        Err(CacheError::Producer(_))
    ));

    producer.failing.store(false, Ordering::SeqCst);
    assert!(cache.get_tile(&g).await.unwrap().is_some());
    assert_eq!(producer.calls(), 2);
}

#[tokio::test]
async fn test_outside_coverage_never_reaches_producer() {
    let producer = TestProducer::new();
    let cache = CoverageCache::builder(memory_config())
        .with_producer(producer.clone())
        .with_coverage(CoverageGeometry::Tiles(vec![area("A-01", 6)]))
        .build()
        .unwrap();
    let outside = geometry("B-0102");

    assert!(cache.get_tile(&outside).await.unwrap().is_none());
    assert!(cache.get_tile(&outside).await.unwrap().is_none());
    assert_eq!(cache.tile_cost(&outside), TileCost::Immediate);
    assert_eq!(
        cache.get_value(&"B-010200".parse().unwrap(), 0).await.unwrap(),
        Value::Null
    );
    assert_eq!(producer.calls(), 0);
    assert_eq!(cache.stats().negative_hits, 2);

    assert!(cache.get_tile(&geometry("A-0102")).await.unwrap().is_some());
    assert_eq!(producer.calls(), 1);
}

#[tokio::test]
async fn test_field_tile_and_values() {
    let cache = CoverageCache::builder(memory_config())
        .with_producer(TestProducer::new())
        .build()
        .unwrap();
    let cell: CellAddress = "A-010200".parse().unwrap();
    let g = cache.default_tile(&cell).unwrap();
    assert_eq!(g.depth(), TILE_DEPTH);

    let offset = g.offset_of(&cell).unwrap();
    assert_eq!(cache.get_value(&cell, 0).await.unwrap(), height(offset as f32));
    assert_eq!(
        cache.get_value(&cell, 1).await.unwrap(),
        Value::scalar(Scalar::U16(7))
    );

    let slope = cache.get_field_tile(&g, 1).await.unwrap().unwrap();
    assert_eq!(slope.field_count(), 1);
    assert_eq!(slope.schema().fields()[0].name, "slope");
    assert!(slope.is_complete());
}

// ============================================================================
// Disk Tier
// ============================================================================

#[tokio::test]
async fn test_tiles_persist_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let g = geometry("A-0102");
    {
        let cache = CoverageCache::builder(config(&dir))
            .with_producer(TestProducer::new())
            .build()
            .unwrap();
        cache.get_tile(&g).await.unwrap();
        assert!(tile_path(dir.path(), &g).exists());
    }

    // No producer and no schema: both come from the directory.
    let cache = CoverageCache::builder(config(&dir)).build().unwrap();
    assert_eq!(cache.schema(), &schema());
    let tile = cache.get_tile(&g).await.unwrap().unwrap();
    assert!(tile.is_complete());
    assert_eq!(tile.get_value(5, 0).unwrap().0, height(5.0));
    assert_eq!(cache.stats().disk_hits, 1);
}

#[tokio::test]
async fn test_corrupt_tile_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let producer = TestProducer::new();
    let cache = CoverageCache::builder(config(&dir))
        .with_producer(producer.clone())
        .build()
        .unwrap();
    let g = geometry("D-0100");

    let path = tile_path(dir.path(), &g);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"definitely not a tile").unwrap();

    let tile = cache.get_tile(&g).await.unwrap().unwrap();
    assert!(tile.is_complete());
    assert_eq!(producer.calls(), 1);
    assert_eq!(cache.stats().corrupt_files, 1);

    let reread = std::fs::read(&path).unwrap();
    assert!(ValueTile::from_bytes(&reread).is_ok());
}

#[tokio::test]
async fn test_set_value_persists_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let cell: CellAddress = "E-010200".parse().unwrap();
    {
        let cache = CoverageCache::builder(config(&dir))
            .with_schema(schema())
            .build()
            .unwrap();
        cache.set_value(&cell, 0, &height(3.5)).unwrap();
        assert_eq!(cache.get_value(&cell, 0).await.unwrap(), height(3.5));
        assert_eq!(cache.persist_all().unwrap(), 1);
        assert_eq!(cache.persist_all().unwrap(), 0);
    }

    let cache = CoverageCache::builder(config(&dir)).build().unwrap();
    assert_eq!(cache.get_value(&cell, 0).await.unwrap(), height(3.5));
    assert_eq!(cache.get_value(&cell, 1).await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_set_tile_writes_through() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CoverageCache::builder(config(&dir))
        .with_schema(schema())
        .build()
        .unwrap();
    let g = geometry("F-0100");

    let stored = cache.set_tile(filled(g)).unwrap();
    assert!(!stored.is_dirty());
    assert!(tile_path(dir.path(), &g).exists());

    let mut update = ValueTile::new(g, schema());
    update.set_value(0, 0, &height(-1.0)).unwrap();
    let merged = cache.set_tile(update).unwrap();
    assert_eq!(merged.get_value(0, 0).unwrap().0, height(-1.0));
    assert_eq!(merged.get_value(1, 0).unwrap().0, height(1.0));
}

#[tokio::test]
async fn test_invalidate_and_reset_remove_files() {
    let dir = tempfile::tempdir().unwrap();
    let producer = TestProducer::new();
    let cache = CoverageCache::builder(config(&dir))
        .with_producer(producer.clone())
        .build()
        .unwrap();
    let a = geometry("A-0102");
    let b = geometry("B-0102");
    cache.get_tile(&a).await.unwrap();
    cache.get_tile(&b).await.unwrap();

    cache.invalidate(&area("A-01", 8));
    assert!(!tile_path(dir.path(), &a).exists());
    assert!(tile_path(dir.path(), &b).exists());

    cache.get_tile(&a).await.unwrap();
    assert_eq!(producer.calls(), 3);

    cache.reset();
    assert!(!tile_path(dir.path(), &a).exists());
    assert!(!tile_path(dir.path(), &b).exists());
    assert_eq!(cache.memory_tile_count(), 0);
}

// ============================================================================
// Blob Store
// ============================================================================

#[tokio::test]
async fn test_blob_store_fallback() {
    let store = Arc::new(MapStore::default());
    let g = geometry("G-0100");
    let client = BlobTileClient::new(store.clone(), DEFAULT_BLOB_VERSION, "dem");
    assert!(client.put(&filled(g)).await);

    let cache = CoverageCache::builder(memory_config().with_owner("dem"))
        .with_schema(schema())
        .with_blob_store(store)
        .build()
        .unwrap();

    let tile = cache.get_tile(&g).await.unwrap().unwrap();
    assert!(tile.is_complete());
    assert_eq!(cache.stats().blob_hits, 1);
    assert!(cache.get_tile(&geometry("H-0100")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_force_tile_uploads() {
    let store = Arc::new(MapStore::default());
    let cache = CoverageCache::builder(memory_config())
        .with_producer(TestProducer::new())
        .with_blob_store(store.clone())
        .build()
        .unwrap();
    let g = geometry("A-0102");

    assert!(cache.force_tile(&g).await.unwrap());
    let key = BlobTileClient::new(store.clone(), DEFAULT_BLOB_VERSION, "test-producer").key(&g);
    let uploaded = store.blobs.get(&key).unwrap().clone();
    assert_eq!(ValueTile::from_bytes(&uploaded).unwrap().geometry(), &g);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_listener_supplies_tile() {
    let cache = CoverageCache::builder(memory_config())
        .with_schema(schema())
        .with_listener(Arc::new(Responder { supply: true }))
        .build()
        .unwrap();
    let g = geometry("A-0102");

    let tile = cache.get_tile(&g).await.unwrap().unwrap();
    assert!(tile.is_complete());
    assert_eq!(cache.stats().notifications, 1);

    cache.get_tile(&g).await.unwrap();
    assert_eq!(cache.stats().notifications, 1);
}

#[tokio::test]
async fn test_listener_installs_tile() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let cache = Arc::new(
        CoverageCache::builder(memory_config())
            .with_schema(schema())
            .with_listener(Arc::new(Forward(tx)))
            .build()
            .unwrap(),
    );

    let publisher = cache.clone();
    let responder = tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            publisher.set_tile(filled(*request.geometry())).unwrap();
            request.installed();
        }
    });

    let g = geometry("B-0100");
    let tile = cache.get_tile(&g).await.unwrap().unwrap();
    assert_eq!(tile.get_value(2, 0).unwrap().0, height(2.0));
    responder.abort();
}

#[tokio::test]
async fn test_listener_failure_is_transient() {
    let cache = CoverageCache::builder(memory_config())
        .with_schema(schema())
        .with_listener(Arc::new(Responder { supply: false }))
        .build()
        .unwrap();

    let err = cache.get_tile(&geometry("A-0102")).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_request_times_out() {
    let hoarder = Arc::new(Hoarder::default());
    let cache = CoverageCache::builder(
        memory_config().with_notification_timeout(Duration::from_secs(5)),
    )
    .with_schema(schema())
    .with_listener(hoarder.clone())
    .build()
    .unwrap();

    let result = cache.get_tile(&geometry("A-0102")).await;
    assert!(matches!(result, Err(CacheError::TileUnavailable { .. })));
    assert_eq!(hoarder.held.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_no_source_is_a_miss() {
    let cache = CoverageCache::builder(memory_config())
        .with_schema(schema())
        .build()
        .unwrap();
    assert_eq!(cache.tile_needed_listener_count(), 0);
    assert!(cache.get_tile(&geometry("A-0102")).await.unwrap().is_none());
    assert_eq!(cache.stats().misses, 1);
}

// ============================================================================
// Change Events
// ============================================================================

#[tokio::test]
async fn test_change_event_forces_refetch() {
    let (tx, _rx) = broadcast::channel(16);
    let producer = Arc::new(TestProducer {
        changes: Some(tx.clone()),
        ..Default::default()
    });
    let cache = CoverageCache::builder(memory_config())
        .with_producer(producer.clone())
        .build()
        .unwrap();
    assert!(cache.is_listening());

    let g = geometry("A-0102");
    cache.get_tile(&g).await.unwrap();
    cache.get_tile(&g).await.unwrap();
    assert_eq!(producer.calls(), 1);

    tx.send(area("A-0", 6)).unwrap();
    for _ in 0..100 {
        if cache.stats().invalidations > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(cache.stats().invalidations, 1);

    cache.get_tile(&g).await.unwrap();
    assert_eq!(producer.calls(), 2);

    cache.shutdown();
    for _ in 0..100 {
        if !cache.is_listening() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!cache.is_listening());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_fetch_once() {
    let producer = Arc::new(TestProducer {
        delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });
    let cache = Arc::new(
        CoverageCache::builder(memory_config())
            .with_producer(producer.clone())
            .build()
            .unwrap(),
    );
    let g = geometry("A-0102");

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_tile(&g).await })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        assert!(result.unwrap().unwrap().is_some());
    }
    assert_eq!(producer.calls(), 1);
}
