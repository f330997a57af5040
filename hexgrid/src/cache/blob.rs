//! Tile client for the remote blob store.
//!
//! Wraps a [`BlobStore`] with:
//! - Key translation: geometry → `"{version}:{owner}-Depth:{depth}-Index:{root}"`
//! - Tile encoding and decoding
//! - Error logging: store failures are reported as misses
//!
//! # Key Format
//!
//! Example: `Version2:elevation-Depth:11-Index:A-0102`

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::geometry::GridGeometry;
use crate::value::ValueTile;

use super::traits::BlobStore;

/// Blob store client speaking in tiles.
#[derive(Clone)]
pub struct BlobTileClient {
    store: Arc<dyn BlobStore>,
    version: String,
    owner: String,
}

impl BlobTileClient {
    pub fn new(store: Arc<dyn BlobStore>, version: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            store,
            version: version.into(),
            owner: owner.into(),
        }
    }

    /// Key of `geometry` in the store.
    pub fn key(&self, geometry: &GridGeometry) -> String {
        format!(
            "{}:{}-Depth:{}-Index:{}",
            self.version,
            self.owner,
            geometry.depth(),
            geometry.root()
        )
    }

    /// Fetch and decode the tile for `geometry`.
    ///
    /// Returns `None` when the key is absent, the store fails, or the blob
    /// does not decode to a tile of this geometry.
    pub async fn get(&self, geometry: &GridGeometry) -> Option<ValueTile> {
        let key = self.key(geometry);
        let bytes = match self.store.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key = %key, "Blob not found");
                return None;
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Blob get failed");
                return None;
            }
        };

        match ValueTile::from_bytes(&bytes) {
            Ok(tile) if tile.geometry() == geometry => Some(tile),
            Ok(tile) => {
                warn!(key = %key, found = %tile.geometry(), "Blob holds a different tile");
                None
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Blob is not a valid tile");
                None
            }
        }
    }

    /// Encode and upload `tile`. Returns whether the store accepted it.
    pub async fn put(&self, tile: &ValueTile) -> bool {
        let key = self.key(tile.geometry());
        let data = match tile.to_bytes() {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                warn!(error = %e, key = %key, "Failed to encode tile for upload");
                return false;
            }
        };
        match self.store.put(&key, data).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, key = %key, "Blob put failed");
                false
            }
        }
    }
}
