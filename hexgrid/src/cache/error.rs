//! Cache error types.

use thiserror::Error;

use crate::address::AddressError;
use crate::geometry::{GeometryError, GridGeometry};
use crate::value::{CodecError, ValueError};

/// Errors surfaced by [`CoverageCache`](super::CoverageCache) operations.
///
/// A permanent "no data" answer is not an error: lookups return `Ok(None)`.
/// [`CacheError::TileUnavailable`] is the transient case, where the tile may
/// exist later and the caller is expected to retry.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The tile could not be obtained now but may become available later.
    #[error("tile {geometry} is not available yet")]
    TileUnavailable { geometry: GridGeometry },

    /// The upstream producer failed to build a tile.
    #[error("producer error: {0}")]
    Producer(String),

    /// The remote blob store failed.
    #[error("blob store error: {0}")]
    Blob(String),

    /// I/O error in the disk tier.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A tile could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A tile did not match the cache's field schema or geometry.
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Address(#[from] AddressError),

    /// Invalid configuration or cache directory metadata.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// True for errors the caller should retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, CacheError::TileUnavailable { .. })
    }
}
