//! Cell counts and the offset bijection for tile enumeration.
//!
//! Every cell falls into one of three kinds, which decides its children:
//!
//! | kind      | children                         | 0-child   | other children |
//! |-----------|----------------------------------|-----------|----------------|
//! | pentagon  | 0..=6 without the gap direction  | pentagon  | vertex         |
//! | centroid  | 0..=6                            | centroid  | vertex         |
//! | vertex    | 0                                | centroid  | -              |
//!
//! Descendants are ordered depth-first by digit, so offset 0 is always the
//! all-zero chain and each sibling subtree occupies a contiguous range.

use crate::address::{CellAddress, Direction, HEX_SIDES, MAX_RELATIVE_DEPTH};

const COUNT_ENTRIES: usize = MAX_RELATIVE_DEPTH + 1;

/// Descendant counts per depth for each cell kind.
struct CountTable {
    pentagon: [u32; COUNT_ENTRIES],
    centroid: [u32; COUNT_ENTRIES],
    vertex: [u32; COUNT_ENTRIES],
}

const fn build_counts() -> CountTable {
    let mut pentagon = [1u32; COUNT_ENTRIES];
    let mut centroid = [1u32; COUNT_ENTRIES];
    let mut vertex = [1u32; COUNT_ENTRIES];
    let mut depth = 1;
    while depth < COUNT_ENTRIES {
        pentagon[depth] = pentagon[depth - 1] + 5 * vertex[depth - 1];
        centroid[depth] = centroid[depth - 1] + 6 * vertex[depth - 1];
        vertex[depth] = centroid[depth - 1];
        depth += 1;
    }
    CountTable {
        pentagon,
        centroid,
        vertex,
    }
}

static COUNTS: CountTable = build_counts();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellKind {
    Pentagon { gap: u8 },
    Centroid,
    Vertex,
}

impl CellKind {
    pub(crate) fn of(address: &CellAddress) -> Self {
        if address.is_pentagon() {
            let gap = address.gap_direction().map_or(0, Direction::digit);
            CellKind::Pentagon { gap }
        } else if address.has_vertex_children() {
            CellKind::Centroid
        } else {
            CellKind::Vertex
        }
    }

    pub(crate) fn child(self, digit: u8) -> Self {
        match (self, digit) {
            (CellKind::Vertex, _) => CellKind::Centroid,
            (kind, 0) => kind,
            _ => CellKind::Vertex,
        }
    }

    pub(crate) fn allows(self, digit: u8) -> bool {
        match self {
            CellKind::Vertex => digit == 0,
            CellKind::Pentagon { gap } => digit <= HEX_SIDES && digit != gap,
            CellKind::Centroid => digit <= HEX_SIDES,
        }
    }

    /// The smallest allowed digit greater than `digit`.
    pub(crate) fn next_digit(self, digit: u8) -> Option<u8> {
        (digit + 1..=HEX_SIDES).find(|&d| self.allows(d))
    }

    /// Descendants at `depth` levels below a cell of this kind, or `None`
    /// past [`MAX_RELATIVE_DEPTH`].
    pub(crate) fn count(self, depth: usize) -> Option<u32> {
        let table = match self {
            CellKind::Pentagon { .. } => &COUNTS.pentagon,
            CellKind::Centroid => &COUNTS.centroid,
            CellKind::Vertex => &COUNTS.vertex,
        };
        table.get(depth).copied()
    }
}

/// Offset of the descendant reached by `path`, or `None` when the path
/// passes through a child that does not exist.
pub(crate) fn offset_of_path(root: CellKind, path: &[u8]) -> Option<u32> {
    let mut kind = root;
    let mut offset = 0u32;
    let mut remaining = path.len();

    for &digit in path {
        if !kind.allows(digit) {
            return None;
        }
        remaining -= 1;
        for sibling in (0..digit).filter(|&d| kind.allows(d)) {
            offset += kind.child(sibling).count(remaining)?;
        }
        kind = kind.child(digit);
    }
    Some(offset)
}

/// Path of the descendant at `offset` and `depth` levels below a root of
/// the given kind. The caller checks `offset < root.count(depth)`; `None`
/// when `depth` is out of range.
pub(crate) fn path_of_offset(root: CellKind, depth: usize, mut offset: u32) -> Option<Vec<u8>> {
    let mut kind = root;
    let mut path = Vec::with_capacity(depth);

    for remaining in (0..depth).rev() {
        let mut chosen = 0;
        for digit in (0..=HEX_SIDES).filter(|&d| kind.allows(d)) {
            chosen = digit;
            let subtree = kind.child(digit).count(remaining)?;
            if offset < subtree {
                break;
            }
            offset -= subtree;
        }
        path.push(chosen);
        kind = kind.child(chosen);
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_sequences() {
        let centroid: Vec<u32> = (0..7).filter_map(|d| CellKind::Centroid.count(d)).collect();
        assert_eq!(centroid, vec![1, 7, 13, 55, 133, 463, 1261]);

        let pentagon = CellKind::Pentagon { gap: 1 };
        let counts: Vec<u32> = (0..6).filter_map(|d| pentagon.count(d)).collect();
        assert_eq!(counts, vec![1, 6, 11, 46, 111, 386]);

        assert_eq!(CellKind::Vertex.count(1), Some(1));
        assert_eq!(CellKind::Vertex.count(2), Some(7));
    }

    #[test]
    fn test_deepest_count_fits() {
        assert_eq!(CellKind::Centroid.count(MAX_RELATIVE_DEPTH), Some(697_147_165));
    }

    #[test]
    fn test_depth_past_maximum_has_no_count() {
        let too_deep = MAX_RELATIVE_DEPTH + 1;
        assert_eq!(CellKind::Centroid.count(too_deep), None);
        assert_eq!(CellKind::Pentagon { gap: 1 }.count(29), None);
        assert_eq!(path_of_offset(CellKind::Vertex, too_deep, 0), None);
        assert_eq!(offset_of_path(CellKind::Centroid, &[1; MAX_RELATIVE_DEPTH + 2]), None);
    }

    #[test]
    fn test_child_kinds() {
        let p = CellKind::Pentagon { gap: 4 };
        assert_eq!(p.child(0), p);
        assert_eq!(p.child(1), CellKind::Vertex);
        assert_eq!(CellKind::Centroid.child(3), CellKind::Vertex);
        assert_eq!(CellKind::Vertex.child(0), CellKind::Centroid);
        assert!(!p.allows(4));
        assert_eq!(p.next_digit(3), Some(5));
        assert_eq!(CellKind::Vertex.next_digit(0), None);
    }

    #[test]
    fn test_offset_path_bijection() {
        for root in [
            CellKind::Pentagon { gap: 1 },
            CellKind::Pentagon { gap: 4 },
            CellKind::Centroid,
            CellKind::Vertex,
        ] {
            for depth in 0..6 {
                for offset in 0..root.count(depth).unwrap() {
                    let path = path_of_offset(root, depth, offset).unwrap();
                    assert_eq!(path.len(), depth);
                    assert_eq!(offset_of_path(root, &path), Some(offset));
                }
            }
        }
    }

    #[test]
    fn test_offset_zero_is_centred_chain() {
        assert_eq!(
            path_of_offset(CellKind::Centroid, 4, 0),
            Some(vec![0, 0, 0, 0])
        );
        assert_eq!(offset_of_path(CellKind::Vertex, &[1]), None);
    }
}
