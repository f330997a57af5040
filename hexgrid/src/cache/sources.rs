//! The ordered chain of places a tile can come from.
//!
//! Each source answers one question for a geometry: here is the tile, I
//! don't have it, or there is no data for it at all. The cache walks the
//! local sources first, then (outside any fetch coalescing) the upstream
//! ones, stopping at the first definite answer.
//!
//! | order | source       | hit                       | no data                |
//! |-------|--------------|---------------------------|------------------------|
//! | 1     | memory       | tile held in memory       | -                      |
//! | 2     | coverage     | -                         | outside coverage       |
//! | 3     | disk         | tile file recovered       | -                      |
//! | 4     | producer     | tile produced             | producer has no data   |
//! | 5     | blob         | tile downloaded           | -                      |
//! | 6     | notification | listener supplied a tile  | -                      |

use std::sync::Arc;

use tracing::debug;

use crate::geometry::GridGeometry;
use crate::value::ValueTile;

use super::coverage::CacheInner;
use super::error::CacheError;
use super::notify::Resolution;
use super::traits::BoxFuture;

/// Answer of one source.
#[derive(Debug)]
pub(crate) enum Lookup {
    Hit(Arc<ValueTile>),
    Miss,
    /// Known to hold no data. Ends the search.
    NoData,
}

/// One step of the lookup chain.
pub(crate) trait TileSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_get<'a>(
        &'a self,
        cache: &'a CacheInner,
        geometry: &'a GridGeometry,
    ) -> BoxFuture<'a, Result<Lookup, CacheError>>;
}

/// Sources that never leave the process.
pub(crate) static LOCAL_SOURCES: [&dyn TileSource; 3] = [&MemorySource, &CoverageSource, &DiskSource];

/// Sources that fetch from elsewhere.
pub(crate) static UPSTREAM_SOURCES: [&dyn TileSource; 3] =
    [&ProducerSource, &BlobSource, &NotificationSource];

struct MemorySource;

impl TileSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn try_get<'a>(
        &'a self,
        cache: &'a CacheInner,
        geometry: &'a GridGeometry,
    ) -> BoxFuture<'a, Result<Lookup, CacheError>> {
        Box::pin(async move {
            Ok(match cache.memory_lookup(geometry) {
                Some(tile) => {
                    cache.stats.record_memory_hit();
                    Lookup::Hit(tile)
                }
                None => Lookup::Miss,
            })
        })
    }
}

struct CoverageSource;

impl TileSource for CoverageSource {
    fn name(&self) -> &'static str {
        "coverage"
    }

    fn try_get<'a>(
        &'a self,
        cache: &'a CacheInner,
        geometry: &'a GridGeometry,
    ) -> BoxFuture<'a, Result<Lookup, CacheError>> {
        Box::pin(async move {
            if cache.coverage.intersects(geometry) {
                return Ok(Lookup::Miss);
            }
            cache.record_empty(geometry);
            Ok(Lookup::NoData)
        })
    }
}

struct DiskSource;

impl TileSource for DiskSource {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn try_get<'a>(
        &'a self,
        cache: &'a CacheInner,
        geometry: &'a GridGeometry,
    ) -> BoxFuture<'a, Result<Lookup, CacheError>> {
        Box::pin(async move {
            Ok(match cache.disk_lookup_async(geometry).await {
                Some(tile) => Lookup::Hit(tile),
                None => Lookup::Miss,
            })
        })
    }
}

struct ProducerSource;

impl TileSource for ProducerSource {
    fn name(&self) -> &'static str {
        "producer"
    }

    fn try_get<'a>(
        &'a self,
        cache: &'a CacheInner,
        geometry: &'a GridGeometry,
    ) -> BoxFuture<'a, Result<Lookup, CacheError>> {
        Box::pin(async move {
            let Some(producer) = cache.ready_producer() else {
                return Ok(Lookup::Miss);
            };
            cache.stats.record_producer_fetch();
            match producer.get_coverage_tile(geometry).await? {
                Some(mut tile) => {
                    cache.check_tile(geometry, &tile)?;
                    tile.set_complete(true);
                    Ok(Lookup::Hit(cache.install_async(tile).await))
                }
                None => {
                    debug!(geometry = %geometry, "Producer has no data for tile");
                    cache.record_empty(geometry);
                    Ok(Lookup::NoData)
                }
            }
        })
    }
}

struct BlobSource;

impl TileSource for BlobSource {
    fn name(&self) -> &'static str {
        "blob"
    }

    fn try_get<'a>(
        &'a self,
        cache: &'a CacheInner,
        geometry: &'a GridGeometry,
    ) -> BoxFuture<'a, Result<Lookup, CacheError>> {
        Box::pin(async move {
            let Some(blob) = &cache.blob else {
                return Ok(Lookup::Miss);
            };
            let Some(mut tile) = blob.get(geometry).await else {
                return Ok(Lookup::Miss);
            };
            cache.check_tile(geometry, &tile)?;
            cache.stats.record_blob_hit();
            tile.set_complete(true);
            Ok(Lookup::Hit(cache.install_async(tile).await))
        })
    }
}

struct NotificationSource;

impl TileSource for NotificationSource {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn try_get<'a>(
        &'a self,
        cache: &'a CacheInner,
        geometry: &'a GridGeometry,
    ) -> BoxFuture<'a, Result<Lookup, CacheError>> {
        Box::pin(async move {
            cache.stats.record_notification();
            match cache.notifier.request(geometry).await? {
                Resolution::Unhandled => Ok(Lookup::Miss),
                Resolution::Supplied(mut tile) => {
                    cache.check_tile(geometry, &tile)?;
                    tile.set_complete(true);
                    Ok(Lookup::Hit(cache.install_async(tile).await))
                }
                Resolution::Installed => {
                    let tile = match cache.memory_lookup(geometry) {
                        Some(tile) => Some(tile),
                        None => cache.disk_lookup_async(geometry).await,
                    };
                    Ok(tile.map_or(Lookup::Miss, Lookup::Hit))
                }
            }
        })
    }
}

/// Walk `sources` in order until one gives a definite answer.
pub(crate) async fn search(
    sources: &[&dyn TileSource],
    cache: &CacheInner,
    geometry: &GridGeometry,
) -> Result<Lookup, CacheError> {
    for source in sources {
        match source.try_get(cache, geometry).await? {
            Lookup::Miss => continue,
            answer => {
                debug!(geometry = %geometry, source = source.name(), "Tile source answered");
                return Ok(answer);
            }
        }
    }
    Ok(Lookup::Miss)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        let local: Vec<_> = LOCAL_SOURCES.iter().map(|s| s.name()).collect();
        let upstream: Vec<_> = UPSTREAM_SOURCES.iter().map(|s| s.name()).collect();
        assert_eq!(local, ["memory", "coverage", "disk"]);
        assert_eq!(upstream, ["producer", "blob", "notification"]);
    }
}
