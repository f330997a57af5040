//! Layered tile caching.
//!
//! A [`CoverageCache`] serves [`ValueTile`](crate::value::ValueTile)s for
//! one field schema from, in order:
//!
//! ```text
//! has-values index ─► memory ─► coverage ─► disk ─► producer ─► blob store ─► listeners
//! ```
//!
//! # Tiers
//!
//! - **Memory**: size-bounded LRU of tile snapshots (moka)
//! - **Disk**: one file per tile under the cache directory, laid out by
//!   [`tile_path`], with the field schema in [`DEFINITION_FILE`]
//!
//! # Collaborators
//!
//! - [`Producer`]: computes tiles and may publish change events
//! - [`BlobStore`]: remote byte store, keyed by [`BlobTileClient::key`]
//! - [`TileNeededListener`]: asked for tiles nobody else could supply
//!
//! # Example
//!
//! ```no_run
//! use hexgrid::cache::{CacheConfig, CoverageCache};
//! use hexgrid::geometry::GridGeometry;
//! use hexgrid::value::{FieldSchema, FieldSpec, ScalarType};
//!
//! # async fn example() -> Result<(), hexgrid::cache::CacheError> {
//! let cache = CoverageCache::builder(CacheConfig::new("/tmp/elevation"))
//!     .with_schema(FieldSchema::single(FieldSpec::new("height", ScalarType::F32, 1)))
//!     .build()?;
//!
//! let tile = GridGeometry::new("A-0102".parse()?, 8)?;
//! if let Some(tile) = cache.get_tile(&tile).await? {
//!     println!("{} cells", tile.cell_count());
//! }
//! # Ok(())
//! # }
//! ```

mod blob;
mod config;
mod coverage;
mod disk;
mod error;
mod index;
mod memory;
mod notify;
mod sources;
mod stats;
mod traits;

pub use blob::BlobTileClient;
pub use config::{
    default_cache_dir, CacheConfig, CONFIG_SECTION, DEFAULT_BLOB_VERSION,
    DEFAULT_MEMORY_TILE_CAPACITY, DEFAULT_NEGATIVE_INDEX_CAPACITY,
    DEFAULT_NOTIFICATION_TIMEOUT_SECS, DEFAULT_TILE_DEPTH,
};
pub use coverage::{CoverageCache, CoverageCacheBuilder, TileCost};
pub use disk::{geometry_of_path, tile_path, DEFINITION_FILE};
pub use error::CacheError;
pub use notify::TileNeeded;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use traits::{BlobStore, BoxFuture, Producer, TileNeededListener};
