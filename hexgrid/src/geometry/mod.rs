//! Tiles of cells and their enumeration.
//!
//! A [`GridGeometry`] is a root cell plus a target resolution and denotes
//! every descendant of the root at that resolution. Cells are numbered by
//! a stable offset in `[0, cell_count)` so tile storage can use flat
//! arrays; the numbering is part of the on-disk format.

mod count;
mod iter;

pub use iter::GeometryIter;

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{AddressError, CellAddress, Digits, MAX_RELATIVE_DEPTH, MAX_RESOLUTION};
use count::{offset_of_path, path_of_offset, CellKind};

/// Errors raised by tile geometry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("Tile depth {depth} exceeds maximum of {max}")]
    DepthTooLarge { depth: usize, max: usize },

    #[error("Resolution {resolution} is below root resolution {root_resolution}")]
    ResolutionBelowRoot {
        resolution: usize,
        root_resolution: usize,
    },

    #[error("Offset {offset} out of range for tile of {count} cells")]
    OffsetOutOfRange { offset: u64, count: u32 },

    #[error("Cell {address} is not in tile {geometry}")]
    NotInTile { address: String, geometry: String },

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// A root cell and a resolution: all descendants of the root at that
/// resolution.
///
/// Deserialization applies the same checks as [`GridGeometry::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry")]
pub struct GridGeometry {
    root: CellAddress,
    resolution: usize,
}

/// Unchecked wire form of [`GridGeometry`].
#[derive(Deserialize)]
struct RawGeometry {
    root: CellAddress,
    resolution: usize,
}

impl TryFrom<RawGeometry> for GridGeometry {
    type Error = GeometryError;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        GridGeometry::new(raw.root, raw.resolution)
    }
}

impl GridGeometry {
    /// Create a geometry.
    ///
    /// # Errors
    ///
    /// - `ResolutionBelowRoot` if `resolution` is coarser than the root
    /// - `DepthTooLarge` if the tile is deeper than [`MAX_RELATIVE_DEPTH`]
    /// - `Address` if `resolution` exceeds [`MAX_RESOLUTION`]
    pub fn new(root: CellAddress, resolution: usize) -> Result<Self, GeometryError> {
        if resolution < root.resolution() {
            return Err(GeometryError::ResolutionBelowRoot {
                resolution,
                root_resolution: root.resolution(),
            });
        }
        if resolution > MAX_RESOLUTION {
            return Err(AddressError::ResolutionOverflow {
                resolution,
                max: MAX_RESOLUTION,
            }
            .into());
        }
        let depth = resolution - root.resolution();
        if depth > MAX_RELATIVE_DEPTH {
            return Err(GeometryError::DepthTooLarge {
                depth,
                max: MAX_RELATIVE_DEPTH,
            });
        }
        Ok(Self { root, resolution })
    }

    /// A single-cell geometry.
    pub fn cell(address: CellAddress) -> Self {
        Self {
            root: address,
            resolution: address.resolution(),
        }
    }

    /// The default tile holding `address`: rooted `depth` levels above it
    /// (clamped at resolution 0) at the address's resolution.
    pub fn for_cell(address: &CellAddress, depth: usize) -> Result<Self, GeometryError> {
        let resolution = address.resolution();
        let root = address.truncated(resolution.saturating_sub(depth));
        Self::new(root, resolution)
    }

    pub fn root(&self) -> CellAddress {
        self.root
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Levels between the root and the cells.
    pub fn depth(&self) -> usize {
        self.resolution - self.root.resolution()
    }

    pub fn is_pentagon(&self) -> bool {
        self.root.is_pentagon()
    }

    /// Number of cells in the tile.
    pub fn cell_count(&self) -> u32 {
        // Depth is bounded on construction.
        CellKind::of(&self.root).count(self.depth()).unwrap_or(0)
    }

    /// The cell at `offset`.
    pub fn address_at(&self, offset: u32) -> Result<CellAddress, GeometryError> {
        let count = self.cell_count();
        if offset >= count {
            return Err(GeometryError::OffsetOutOfRange {
                offset: offset as u64,
                count,
            });
        }
        let path = path_of_offset(CellKind::of(&self.root), self.depth(), offset).ok_or(
            GeometryError::DepthTooLarge {
                depth: self.depth(),
                max: MAX_RELATIVE_DEPTH,
            },
        )?;
        let mut digits = *self.root.digits();
        for digit in path {
            digits.push(digit)?;
        }
        Ok(CellAddress::new(self.root.prefix(), digits))
    }

    /// Offset of a cell of this tile.
    ///
    /// # Errors
    ///
    /// `NotInTile` unless `address` is a real descendant of the root at the
    /// tile's resolution.
    pub fn offset_of(&self, address: &CellAddress) -> Result<u32, GeometryError> {
        let not_in_tile = || GeometryError::NotInTile {
            address: address.to_string(),
            geometry: self.to_string(),
        };
        if address.resolution() != self.resolution || !self.root.is_ancestor_of(address) {
            return Err(not_in_tile());
        }
        let path = &address.digits().as_slice()[self.root.resolution()..];
        offset_of_path(CellKind::of(&self.root), path).ok_or_else(not_in_tile)
    }

    /// Lazily enumerate the cells in offset order.
    pub fn iter(&self) -> GeometryIter {
        GeometryIter::new(self)
    }

    /// The same root one resolution finer.
    pub fn refined(&self) -> Result<Self, GeometryError> {
        Self::new(self.root, self.resolution + 1)
    }

    /// The same root at another resolution.
    pub fn with_resolution(&self, resolution: usize) -> Result<Self, GeometryError> {
        Self::new(self.root, resolution)
    }

    /// True when one root is an ancestor of (or equal to) the other.
    pub fn intersects(&self, other: &GridGeometry) -> bool {
        self.root.is_ancestor_of(&other.root) || other.root.is_ancestor_of(&self.root)
    }

    /// True when `address` lies within the tile's area at or above the
    /// tile's resolution.
    pub fn contains(&self, address: &CellAddress) -> bool {
        address.resolution() <= self.resolution && self.root.is_ancestor_of(address)
    }

    /// The overlapping region: the deeper root at the finer resolution.
    pub fn intersection(&self, other: &GridGeometry) -> Option<GridGeometry> {
        if !self.intersects(other) {
            return None;
        }
        let root = if self.root.resolution() >= other.root.resolution() {
            self.root
        } else {
            other.root
        };
        Self::new(root, self.resolution.max(other.resolution)).ok()
    }

    /// Digits of `address` below the root, when it is inside the tile.
    pub fn relative_path(&self, address: &CellAddress) -> Option<Digits> {
        if !self.contains(address) {
            return None;
        }
        Digits::from_slice(&address.digits().as_slice()[self.root.resolution()..]).ok()
    }
}

impl PartialOrd for GridGeometry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GridGeometry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.resolution
            .cmp(&other.resolution)
            .then_with(|| self.root.cmp(&other.root))
    }
}

impl fmt::Display for GridGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.root, self.resolution)
    }
}

impl<'a> IntoIterator for &'a GridGeometry {
    type Item = CellAddress;
    type IntoIter = GeometryIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The area a cache holds data for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoverageGeometry {
    /// Data may exist anywhere.
    #[default]
    Global,
    /// No data anywhere.
    Empty,
    /// Data only inside these tiles.
    Tiles(Vec<GridGeometry>),
}

impl CoverageGeometry {
    pub fn intersects(&self, geometry: &GridGeometry) -> bool {
        match self {
            CoverageGeometry::Global => true,
            CoverageGeometry::Empty => false,
            CoverageGeometry::Tiles(tiles) => tiles.iter().any(|t| t.intersects(geometry)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn addr(s: &str) -> CellAddress {
        s.parse().unwrap()
    }

    fn geometry(root: &str, resolution: usize) -> GridGeometry {
        GridGeometry::new(addr(root), resolution).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert!(matches!(
            GridGeometry::new(addr("A-0102"), 3),
            Err(GeometryError::ResolutionBelowRoot { .. })
        ));
        assert!(matches!(
            GridGeometry::new(addr("A"), MAX_RELATIVE_DEPTH + 1),
            Err(GeometryError::DepthTooLarge { .. })
        ));
        assert!(matches!(
            GridGeometry::new(addr("A-0"), MAX_RESOLUTION + 1),
            Err(GeometryError::Address(AddressError::ResolutionOverflow { .. }))
        ));
        assert!(GridGeometry::new(addr("A"), MAX_RELATIVE_DEPTH).is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let below_root = r#"{"root":"A-0102","resolution":1}"#;
        assert!(serde_json::from_str::<GridGeometry>(below_root).is_err());

        let too_deep = r#"{"root":"A-0","resolution":30}"#;
        assert!(serde_json::from_str::<GridGeometry>(too_deep).is_err());

        let tile = geometry("A-0102", 5);
        let json = serde_json::to_string(&tile).unwrap();
        assert_eq!(serde_json::from_str::<GridGeometry>(&json).unwrap(), tile);
    }

    #[test]
    fn test_pentagon_tiles_are_smaller() {
        let hexagon = geometry("A-0", 4);
        let pentagon = geometry("03-0", 4);
        assert!(pentagon.is_pentagon());
        assert_eq!(hexagon.cell_count(), 55);
        assert_eq!(pentagon.cell_count(), 46);
    }

    #[test]
    fn test_address_at_out_of_range() {
        let g = geometry("A-0", 2);
        assert_eq!(g.cell_count(), 7);
        assert!(matches!(
            g.address_at(7),
            Err(GeometryError::OffsetOutOfRange { offset: 7, count: 7 })
        ));
    }

    #[test]
    fn test_offset_of_rejects_outsiders() {
        let g = geometry("A-01", 4);
        assert!(g.offset_of(&addr("A-02000")).is_err());
        assert!(g.offset_of(&addr("A-010")).is_err());
        assert!(g.offset_of(&addr("A-0112")).is_err());
        assert_eq!(g.offset_of(&addr("A-0100")).unwrap(), 0);
    }

    #[test]
    fn test_enumeration_is_a_bijection() {
        for (root, res) in [("A", 5), ("A-0", 5), ("02", 5), ("11-00", 6), ("C-0103", 7)] {
            let g = geometry(root, res);
            let cells: Vec<CellAddress> = (0..g.cell_count())
                .map(|i| g.address_at(i).unwrap())
                .collect();
            let unique: HashSet<CellAddress> = cells.iter().copied().collect();
            assert_eq!(unique.len(), cells.len());
            for (i, cell) in cells.iter().enumerate() {
                assert!(cell.is_valid(), "{}", cell);
                assert!(g.root().is_ancestor_of(cell));
                assert_eq!(cell.resolution(), res);
                assert_eq!(g.offset_of(cell).unwrap(), i as u32);
            }
        }
    }

    #[test]
    fn test_enumeration_covers_all_descendants() {
        fn descend(cell: CellAddress, res: usize, out: &mut HashSet<CellAddress>) {
            if cell.resolution() == res {
                out.insert(cell);
                return;
            }
            for child in cell.children().unwrap() {
                descend(child, res, out);
            }
        }
        let g = geometry("07-0", 5);
        let mut expected = HashSet::new();
        descend(g.root(), 5, &mut expected);
        let actual: HashSet<CellAddress> = g.iter().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_for_cell() {
        let a = addr("B-0102030405");
        let g = GridGeometry::for_cell(&a, 4).unwrap();
        assert_eq!(g.root(), addr("B-010203"));
        assert_eq!(g.resolution(), 10);
        assert!(g.offset_of(&a).is_ok());

        let shallow = GridGeometry::for_cell(&addr("B-01"), 11).unwrap();
        assert_eq!(shallow.root(), addr("B"));
    }

    #[test]
    fn test_intersects_and_intersection() {
        let big = geometry("A-01", 6);
        let small = geometry("A-0102", 8);
        let other = geometry("A-02", 6);
        assert!(big.intersects(&small));
        assert!(small.intersects(&big));
        assert!(!big.intersects(&other));
        assert_eq!(big.intersection(&small), Some(small));
        assert_eq!(big.intersection(&other), None);
        assert!(big.contains(&addr("A-0102")));
        assert!(!big.contains(&addr("A-0102030")));
    }

    #[test]
    fn test_ordering_and_display() {
        let a = geometry("B-01", 4);
        let b = geometry("A-01", 5);
        assert!(a < b);
        assert_eq!(a.to_string(), "B-01@4");
    }

    #[test]
    fn test_coverage_geometry() {
        let g = geometry("A-01", 4);
        assert!(CoverageGeometry::Global.intersects(&g));
        assert!(!CoverageGeometry::Empty.intersects(&g));
        let tiles = CoverageGeometry::Tiles(vec![geometry("A", 2)]);
        assert!(tiles.intersects(&g));
        let elsewhere = CoverageGeometry::Tiles(vec![geometry("B", 2)]);
        assert!(!elsewhere.intersects(&g));
    }

    proptest! {
        #[test]
        fn prop_offset_round_trip(depth in 0usize..9, seed in any::<u32>(), vertex in 1u8..=12) {
            let root = CellAddress::root(crate::address::Prefix::Vertex(vertex));
            let g = GridGeometry::new(root, depth).unwrap();
            let offset = seed % g.cell_count();
            let cell = g.address_at(offset).unwrap();
            prop_assert_eq!(g.offset_of(&cell).unwrap(), offset);
        }
    }
}
