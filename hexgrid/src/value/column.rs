//! Typed per-field storage with initialization and null tracking.

use serde::{Deserialize, Serialize};

use super::error::ValueError;
use super::schema::{FieldSpec, Scalar, ScalarType, Value};

/// Fixed-length bit set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub(crate) fn get(&self, index: usize) -> bool {
        index < self.len && self.words[index / 64] & (1 << (index % 64)) != 0
    }

    pub(crate) fn set(&mut self, index: usize, value: bool) {
        if index >= self.len {
            return;
        }
        let mask = 1u64 << (index % 64);
        if value {
            self.words[index / 64] |= mask;
        } else {
            self.words[index / 64] &= !mask;
        }
    }

    pub(crate) fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Words and length agree.
    pub(crate) fn is_consistent(&self) -> bool {
        self.words.len() == self.len.div_ceil(64)
    }
}

macro_rules! column_data {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        /// Flat element storage, `count` elements per cell.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub(crate) enum ColumnData {
            $($variant(Vec<$ty>)),*
        }

        impl ColumnData {
            fn zeroed(scalar: ScalarType, len: usize) -> Self {
                match scalar {
                    $(ScalarType::$variant => ColumnData::$variant(vec![<$ty>::default(); len])),*
                }
            }

            fn scalar_type(&self) -> ScalarType {
                match self {
                    $(ColumnData::$variant(_) => ScalarType::$variant),*
                }
            }

            fn len(&self) -> usize {
                match self {
                    $(ColumnData::$variant(v) => v.len()),*
                }
            }

            fn get(&self, index: usize) -> Option<Scalar> {
                match self {
                    $(ColumnData::$variant(v) => v.get(index).copied().map(Scalar::$variant)),*
                }
            }

            fn set(&mut self, index: usize, scalar: Scalar) -> bool {
                match (self, scalar) {
                    $((ColumnData::$variant(v), Scalar::$variant(x)) => match v.get_mut(index) {
                        Some(slot) => {
                            *slot = x;
                            true
                        }
                        None => false,
                    },)*
                    _ => false,
                }
            }

            fn copy_range(&mut self, other: &ColumnData, start: usize, len: usize) {
                match (self, other) {
                    $((ColumnData::$variant(dst), ColumnData::$variant(src)) => {
                        if let (Some(d), Some(s)) =
                            (dst.get_mut(start..start + len), src.get(start..start + len))
                        {
                            d.copy_from_slice(s);
                        }
                    })*
                    _ => {}
                }
            }
        }
    };
}

column_data! {
    U8 => u8,
    I8 => i8,
    U16 => u16,
    I16 => i16,
    U32 => u32,
    I32 => i32,
    U64 => u64,
    I64 => i64,
    F32 => f32,
    F64 => f64,
}

/// One field of a tile: values for every cell plus initialized and null
/// bits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Column {
    spec: FieldSpec,
    data: ColumnData,
    initialized: BitSet,
    null: BitSet,
}

impl Column {
    pub(crate) fn new(spec: FieldSpec, cells: usize) -> Self {
        let data = ColumnData::zeroed(spec.scalar, cells * spec.count);
        Self {
            spec,
            data,
            initialized: BitSet::new(cells),
            null: BitSet::new(cells),
        }
    }

    pub(crate) fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub(crate) fn cells(&self) -> usize {
        self.initialized.len()
    }

    pub(crate) fn is_initialized(&self, cell: usize) -> bool {
        self.initialized.get(cell)
    }

    pub(crate) fn initialized_count(&self) -> usize {
        self.initialized.count_ones()
    }

    /// The value of `cell` and whether it was ever written.
    pub(crate) fn get(&self, cell: usize) -> (Value, bool) {
        if !self.initialized.get(cell) {
            return (Value::Null, false);
        }
        if self.null.get(cell) {
            return (Value::Null, true);
        }
        let start = cell * self.spec.count;
        let elements: Vec<Scalar> = (start..start + self.spec.count)
            .filter_map(|i| self.data.get(i))
            .collect();
        (Value::Elements(elements), true)
    }

    /// Check that `value` fits this column.
    pub(crate) fn check(&self, field: usize, value: &Value) -> Result<(), ValueError> {
        let elements = match value {
            Value::Null => return Ok(()),
            Value::Elements(elements) => elements,
        };
        if elements.len() != self.spec.count {
            return Err(ValueError::ElementCountMismatch {
                field,
                expected: self.spec.count,
                found: elements.len(),
            });
        }
        match elements
            .iter()
            .find(|s| s.scalar_type() != self.spec.scalar)
        {
            Some(bad) => Err(ValueError::TypeMismatch {
                field,
                expected: self.spec.scalar,
                found: bad.scalar_type(),
            }),
            None => Ok(()),
        }
    }

    /// Write a value already validated with [`Column::check`].
    pub(crate) fn set(&mut self, cell: usize, value: &Value) {
        match value {
            Value::Null => self.null.set(cell, true),
            Value::Elements(elements) => {
                let start = cell * self.spec.count;
                for (i, scalar) in elements.iter().enumerate() {
                    self.data.set(start + i, *scalar);
                }
                self.null.set(cell, false);
            }
        }
        self.initialized.set(cell, true);
    }

    /// Copy `cell` from a column of the same layout.
    pub(crate) fn copy_cell(&mut self, other: &Column, cell: usize) {
        let count = self.spec.count;
        self.data.copy_range(&other.data, cell * count, count);
        self.null.set(cell, other.null.get(cell));
        self.initialized.set(cell, other.initialized.get(cell));
    }

    /// Storage agrees with the declared field and cell count.
    pub(crate) fn is_consistent(&self) -> bool {
        let cells = self.initialized.len();
        self.data.scalar_type() == self.spec.scalar
            && self.data.len() == cells * self.spec.count
            && self.null.len() == cells
            && self.initialized.is_consistent()
            && self.null.is_consistent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset() {
        let mut bits = BitSet::new(130);
        bits.set(0, true);
        bits.set(129, true);
        bits.set(200, true);
        assert!(bits.get(0));
        assert!(bits.get(129));
        assert!(!bits.get(64));
        assert_eq!(bits.count_ones(), 2);
        bits.set(0, false);
        assert_eq!(bits.count_ones(), 1);
    }

    #[test]
    fn test_column_states() {
        let mut col = Column::new(FieldSpec::new("rgb", ScalarType::U8, 3), 4);
        assert_eq!(col.get(0), (Value::Null, false));

        let rgb = Value::elements([Scalar::U8(10), Scalar::U8(20), Scalar::U8(30)]);
        col.check(0, &rgb).unwrap();
        col.set(1, &rgb);
        assert_eq!(col.get(1), (rgb, true));

        col.set(2, &Value::Null);
        assert_eq!(col.get(2), (Value::Null, true));
        assert_eq!(col.initialized_count(), 2);
        assert!(col.is_consistent());
    }

    #[test]
    fn test_column_check() {
        let col = Column::new(FieldSpec::new("h", ScalarType::F32, 1), 1);
        assert!(matches!(
            col.check(3, &Value::scalar(Scalar::F64(1.0))),
            Err(ValueError::TypeMismatch { field: 3, .. })
        ));
        assert!(matches!(
            col.check(0, &Value::elements([Scalar::F32(1.0), Scalar::F32(2.0)])),
            Err(ValueError::ElementCountMismatch { .. })
        ));
    }

    #[test]
    fn test_copy_cell() {
        let spec = FieldSpec::new("v", ScalarType::I32, 2);
        let mut src = Column::new(spec.clone(), 3);
        let value = Value::elements([Scalar::I32(-1), Scalar::I32(7)]);
        src.set(2, &value);
        let mut dst = Column::new(spec, 3);
        dst.copy_cell(&src, 2);
        assert_eq!(dst.get(2), (value, true));
    }
}
