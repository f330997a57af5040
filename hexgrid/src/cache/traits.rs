//! Collaborator traits consumed by the coverage cache.
//!
//! The cache does not know where tile data comes from. It talks to:
//!
//! - a [`Producer`] that builds tiles from upstream data and announces
//!   changes,
//! - a [`BlobStore`] holding serialized tiles under string keys,
//! - zero or more [`TileNeededListener`]s that fetch tiles out of band.
//!
//! All traits use [`BoxFuture`] for their async methods so they can be held
//! as `Arc<dyn Trait>`.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::geometry::GridGeometry;
use crate::value::{FieldSchema, ValueTile};

use super::error::CacheError;
use super::notify::TileNeeded;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Upstream source of coverage tiles.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the cache calls them from many
/// tasks at once and never holds its own locks across these calls.
pub trait Producer: Send + Sync {
    /// Stable identity of the data set, used in remote blob keys.
    fn identity(&self) -> String;

    /// The fields every produced tile carries.
    fn definition(&self) -> FieldSchema;

    /// Build the complete tile for `geometry`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(tile))` with every cell the upstream knows about
    /// - `Ok(None)` if the upstream holds no data for `geometry`
    ///
    /// # Errors
    ///
    /// Any failure is reported as an error and never as a partially filled
    /// tile. `CacheError::Producer` is the usual variant.
    fn get_coverage_tile<'a>(
        &'a self,
        geometry: &'a GridGeometry,
    ) -> BoxFuture<'a, Result<Option<ValueTile>, CacheError>>;

    /// Whether the producer can currently serve requests.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Stream of geometries whose upstream data changed.
    ///
    /// Producers without change notifications return `None`.
    fn subscribe_changes(&self) -> Option<broadcast::Receiver<GridGeometry>> {
        None
    }
}

/// Remote key/value store for serialized tiles.
pub trait BlobStore: Send + Sync {
    /// Fetch the blob stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))` if the key exists
    /// - `Ok(None)` if it does not
    /// - `Err(_)` if the store could not be reached
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, CacheError>>;

    /// Store `data` under `key`. Returns whether the store accepted it.
    fn put<'a>(&'a self, key: &'a str, data: Bytes) -> BoxFuture<'a, Result<bool, CacheError>>;
}

/// Receives requests for tiles the cache could not find anywhere.
///
/// A listener that takes responsibility for a request answers it through
/// the [`TileNeeded`] handle, possibly later from another task. Listeners
/// that ignore a request simply drop their handle.
pub trait TileNeededListener: Send + Sync {
    fn tile_needed(&self, request: TileNeeded);
}
