//! Per-resolution grid constants.

use std::sync::{Arc, OnceLock};

use super::MAX_RESOLUTION;

/// Number of precomputed distance entries. Polar conversion reads two
/// entries past the deepest digit position.
pub(crate) const DISTANCE_ENTRIES: usize = MAX_RESOLUTION + 3;

/// Derived grid measurements, computed once and shared.
///
/// Distances are in face units: entry `i` of the table is `1 / √3^i`, the
/// spacing between cell centres shrinking by `√3` at every resolution.
#[derive(Debug, Clone)]
pub struct GridConstants {
    distances: [f64; DISTANCE_ENTRIES],
}

impl GridConstants {
    /// Build the distance table.
    pub fn new() -> Self {
        let mut distances = [0.0; DISTANCE_ENTRIES];
        let root3 = 3.0_f64.sqrt();
        let mut value = 1.0;
        for entry in distances.iter_mut() {
            *entry = value;
            value /= root3;
        }
        Self { distances }
    }

    /// Process-wide instance.
    pub fn shared() -> Arc<GridConstants> {
        static SHARED: OnceLock<Arc<GridConstants>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(GridConstants::new())).clone()
    }

    /// Raw table entry `1 / √3^index`. Indices past the table return 0.
    pub fn distance(&self, index: usize) -> f64 {
        self.distances.get(index).copied().unwrap_or(0.0)
    }

    /// Distance between the centres of adjacent cells at `resolution`.
    pub fn inter_cell_distance(&self, resolution: usize) -> f64 {
        self.distance(resolution + 1)
    }

    /// Radius of the circle through a cell's corners.
    pub fn circumradius(&self, resolution: usize) -> f64 {
        self.distance(resolution + 2)
    }

    /// Radius of the circle touching a cell's edges.
    pub fn inradius(&self, resolution: usize) -> f64 {
        self.inter_cell_distance(resolution) / 2.0
    }
}

impl Default for GridConstants {
    fn default() -> Self {
        Self::new()
    }
}
