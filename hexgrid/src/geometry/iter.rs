//! Lazy enumeration of the cells of a tile.

use crate::address::{CellAddress, Digits};

use super::count::CellKind;
use super::GridGeometry;

/// Walks the cells of a [`GridGeometry`] in offset order.
///
/// Each step advances the digit string in place like an odometer: the
/// deepest digit that can move to a larger allowed value does so and every
/// digit after it resets to zero.
#[derive(Debug, Clone)]
pub struct GeometryIter {
    root: CellAddress,
    root_len: usize,
    /// Full digit string of the current cell.
    current: Digits,
    /// `kinds[i]` is the kind of the cell whose child digit is at
    /// `root_len + i`.
    kinds: Vec<CellKind>,
    offset: u32,
    count: u32,
    started: bool,
}

impl GeometryIter {
    pub(crate) fn new(geometry: &GridGeometry) -> Self {
        let root = geometry.root();
        let depth = geometry.depth();
        let root_kind = CellKind::of(&root);

        let mut current = *root.digits();
        let mut kinds = Vec::with_capacity(depth);
        let mut kind = root_kind;
        for _ in 0..depth {
            kinds.push(kind);
            kind = kind.child(0);
            // Capacity was checked when the geometry was built.
            let _ = current.push(0);
        }

        Self {
            root,
            root_len: root.resolution(),
            current,
            kinds,
            offset: 0,
            count: geometry.cell_count(),
            started: false,
        }
    }

    /// Offset of the cell returned by the last call to `next`.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// The cell returned by the last call to `next`.
    pub fn current(&self) -> Option<CellAddress> {
        self.started
            .then(|| CellAddress::new(self.root.prefix(), self.current))
    }

    fn advance(&mut self) -> bool {
        for level in (0..self.kinds.len()).rev() {
            let position = self.root_len + level;
            let digit = self.current.get(position).unwrap_or(0);
            if let Some(next) = self.kinds[level].next_digit(digit) {
                self.current.set(position, next);
                let mut kind = self.kinds[level].child(next);
                for deeper in level + 1..self.kinds.len() {
                    self.current.set(self.root_len + deeper, 0);
                    self.kinds[deeper] = kind;
                    kind = kind.child(0);
                }
                return true;
            }
        }
        false
    }
}

impl Iterator for GeometryIter {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
        } else if self.offset + 1 >= self.count || !self.advance() {
            self.offset = self.count;
            return None;
        } else {
            self.offset += 1;
        }
        if self.offset >= self.count {
            return None;
        }
        Some(CellAddress::new(self.root.prefix(), self.current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.started {
            self.count.saturating_sub(self.offset + 1)
        } else {
            self.count
        } as usize;
        (remaining, Some(remaining))
    }
}
