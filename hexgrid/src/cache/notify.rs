//! Out-of-band tile requests.
//!
//! When no tier can supply a tile the cache raises a [`TileNeeded`] request
//! to every registered [`TileNeededListener`] and waits for one of them to
//! answer. A listener answers by supplying the tile, by reporting that it
//! installed the tile into the cache itself, or by reporting failure.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::geometry::GridGeometry;
use crate::value::ValueTile;

use super::error::CacheError;
use super::traits::TileNeededListener;

#[derive(Debug)]
enum Answer {
    Supplied(ValueTile),
    Installed,
    Failed,
}

/// A pending request for a tile, handed to listeners.
///
/// Clones share one answer slot: the first answer wins and later ones are
/// ignored. Dropping every clone without answering leaves the request
/// unhandled.
#[derive(Clone)]
pub struct TileNeeded {
    geometry: GridGeometry,
    slot: Arc<Mutex<Option<oneshot::Sender<Answer>>>>,
}

impl TileNeeded {
    fn new(geometry: GridGeometry) -> (Self, oneshot::Receiver<Answer>) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            geometry,
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (request, rx)
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    fn answer(&self, answer: Answer) -> bool {
        match self.slot.lock().take() {
            Some(tx) => tx.send(answer).is_ok(),
            None => false,
        }
    }

    /// Answer with the tile itself. Returns `false` if the request was
    /// already answered or the cache stopped waiting.
    pub fn supply(&self, tile: ValueTile) -> bool {
        self.answer(Answer::Supplied(tile))
    }

    /// Report that the tile was published to the cache with `set_tile`.
    pub fn installed(&self) -> bool {
        self.answer(Answer::Installed)
    }

    /// Report that the download failed.
    pub fn fail(&self) -> bool {
        self.answer(Answer::Failed)
    }

    pub fn is_answered(&self) -> bool {
        self.slot.lock().is_none()
    }
}

/// What the listeners made of a request.
#[derive(Debug)]
pub(crate) enum Resolution {
    /// Nobody handled it.
    Unhandled,
    Supplied(ValueTile),
    /// The tile should now be in the cache.
    Installed,
}

/// Registered listeners plus the wait policy.
pub(crate) struct TileNeededNotifier {
    listeners: RwLock<Vec<Arc<dyn TileNeededListener>>>,
    timeout: Duration,
}

impl TileNeededNotifier {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            timeout,
        }
    }

    pub(crate) fn subscribe(&self, listener: Arc<dyn TileNeededListener>) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Raise a request for `geometry` and wait for the answer.
    ///
    /// # Errors
    ///
    /// `TileUnavailable` when a listener reports failure or no answer
    /// arrives within the timeout.
    pub(crate) async fn request(&self, geometry: &GridGeometry) -> Result<Resolution, CacheError> {
        let listeners: Vec<_> = self.listeners.read().iter().cloned().collect();
        if listeners.is_empty() {
            debug!(geometry = %geometry, "No tile-needed listeners registered");
            return Ok(Resolution::Unhandled);
        }

        let (request, rx) = TileNeeded::new(*geometry);
        for listener in &listeners {
            listener.tile_needed(request.clone());
        }
        drop(request);

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Answer::Supplied(tile))) => Ok(Resolution::Supplied(tile)),
            Ok(Ok(Answer::Installed)) => Ok(Resolution::Installed),
            Ok(Ok(Answer::Failed)) => {
                warn!(geometry = %geometry, "Tile download failed");
                Err(CacheError::TileUnavailable {
                    geometry: *geometry,
                })
            }
            Ok(Err(_)) => {
                debug!(geometry = %geometry, "Tile request dropped by all listeners");
                Ok(Resolution::Unhandled)
            }
            Err(_) => {
                warn!(
                    geometry = %geometry,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Timed out waiting for tile"
                );
                Err(CacheError::TileUnavailable {
                    geometry: *geometry,
                })
            }
        }
    }
}
