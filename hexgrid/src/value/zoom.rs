//! Resampling a tile one resolution finer.
//!
//! Centred children (last digit 0) copy their parent. Vertex children take
//! the weighted mean of the parent (weight 1) and the parent's neighbours
//! inside the tile (weight 1/6 each, 1/5 around a pentagon). Missing or
//! null contributions are left out and the mean is normalised by the
//! weight actually present.

use rayon::prelude::*;

use crate::address::{CellAddress, Direction};
use crate::geometry::GridGeometry;

use super::column::Column;
use super::error::ValueError;
use super::schema::{FieldSchema, FieldSpec, Scalar, Value};
use super::tile::ValueTile;

impl ValueTile {
    /// A single-field tile at `resolution + 1` resampled from `field`.
    ///
    /// The result is complete when this tile is.
    pub fn zoom_in(&self, field: usize) -> Result<ValueTile, ValueError> {
        let column = self.columns.get(field).ok_or(ValueError::FieldOutOfRange {
            field,
            count: self.columns.len(),
        })?;
        let spec = column.spec().clone();
        let source_geometry = *self.geometry();
        let geometry = source_geometry.refined()?;

        let values = (0..geometry.cell_count())
            .into_par_iter()
            .map(|offset| zoomed_value(column, &spec, &source_geometry, &geometry, offset))
            .collect::<Result<Vec<Option<Value>>, ValueError>>()?;

        let mut zoomed = ValueTile::new(geometry, FieldSchema::single(spec));
        for (offset, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                zoomed.set_value(offset as u32, 0, &value)?;
            }
        }
        zoomed.set_complete(self.is_complete());
        Ok(zoomed)
    }
}

fn zoomed_value(
    column: &Column,
    spec: &FieldSpec,
    source: &GridGeometry,
    target: &GridGeometry,
    offset: u32,
) -> Result<Option<Value>, ValueError> {
    let cell = target.address_at(offset)?;
    let parent = match cell.parent() {
        Some(parent) => parent,
        None => return Ok(None),
    };
    let parent_offset = source.offset_of(&parent)?;
    let (parent_value, parent_initialized) = column.get(parent_offset as usize);

    if cell.digits().last() == Some(0) {
        return Ok(parent_initialized.then_some(parent_value));
    }

    let mut sums = vec![0.0f64; spec.count];
    let mut total_weight = 0.0;
    let mut accumulate = |value: &Value, weight: f64| {
        if let Value::Elements(elements) = value {
            for (sum, scalar) in sums.iter_mut().zip(elements) {
                *sum += scalar.as_f64() * weight;
            }
            total_weight += weight;
        }
    };

    if parent_initialized {
        accumulate(&parent_value, 1.0);
    }

    let gap = if parent.is_pentagon() {
        parent.gap_direction()
    } else {
        None
    };
    let neighbour_weight = if gap.is_some() { 1.0 / 5.0 } else { 1.0 / 6.0 };
    for direction in Direction::VERTICES {
        if Some(direction) == gap {
            continue;
        }
        if let Some(value) = neighbour_value(column, source, &parent, direction) {
            accumulate(&value, neighbour_weight);
        }
    }

    if total_weight == 0.0 {
        return Ok(None);
    }
    let elements = sums
        .into_iter()
        .map(|sum| Scalar::from_f64(spec.scalar, sum / total_weight))
        .collect();
    Ok(Some(Value::Elements(elements)))
}

/// The initialized value of the neighbour of `parent` in `direction`, when
/// that neighbour is a cell of the source tile.
fn neighbour_value(
    column: &Column,
    source: &GridGeometry,
    parent: &CellAddress,
    direction: Direction,
) -> Option<Value> {
    let neighbour = parent.move_to(direction).ok()?;
    let offset = source.offset_of(&neighbour).ok()?;
    match column.get(offset as usize) {
        (value, true) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScalarType;

    fn tile(root: &str, resolution: usize, scalar: ScalarType) -> ValueTile {
        let geometry = GridGeometry::new(root.parse().unwrap(), resolution).unwrap();
        ValueTile::new(geometry, FieldSchema::single(FieldSpec::new("v", scalar, 1)))
    }

    fn set(tile: &mut ValueTile, address: &str, value: f64) {
        let address: CellAddress = address.parse().unwrap();
        tile.set_value_at(&address, 0, &Value::scalar(Scalar::F64(value)))
            .unwrap();
    }

    fn get(tile: &ValueTile, address: &str) -> Option<f64> {
        let address: CellAddress = address.parse().unwrap();
        match tile.get_value_at(&address, 0).unwrap() {
            (value, true) => value.first().map(|s| s.as_f64()),
            _ => None,
        }
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap();
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_uniform_tile_stays_uniform() {
        let mut t = tile("A-0", 2, ScalarType::F64);
        for offset in 0..t.cell_count() {
            t.set_value(offset, 0, &Value::scalar(Scalar::F64(6.0))).unwrap();
        }
        t.set_complete(true);

        let zoomed = t.zoom_in(0).unwrap();
        assert_eq!(zoomed.geometry().resolution(), 3);
        assert!(zoomed.is_complete());
        assert!(zoomed.is_fully_initialized());
        for offset in 0..zoomed.cell_count() {
            let (value, _) = zoomed.get_value(offset, 0).unwrap();
            assert_close(value.first().map(|s| s.as_f64()), 6.0);
        }
    }

    #[test]
    fn test_vertex_children_average_neighbours() {
        let mut t = tile("A-0", 2, ScalarType::F64);
        set(&mut t, "A-00", 0.0);
        for d in 1..=6 {
            set(&mut t, &format!("A-0{}", d), 6.0);
        }

        let zoomed = t.zoom_in(0).unwrap();
        assert_close(get(&zoomed, "A-000"), 0.0);
        assert_close(get(&zoomed, "A-010"), 6.0);
        // (0 * 1 + 6 * 6 * 1/6) / (1 + 6 * 1/6)
        assert_close(get(&zoomed, "A-001"), 3.0);
    }

    #[test]
    fn test_missing_neighbours_are_skipped() {
        let mut t = tile("A-0", 2, ScalarType::F64);
        set(&mut t, "A-00", 2.0);
        set(&mut t, "A-03", 8.0);

        let zoomed = t.zoom_in(0).unwrap();
        // (2 * 1 + 8 * 1/6) / (1 + 1/6)
        let expected = (2.0 + 8.0 / 6.0) / (7.0 / 6.0);
        assert_close(get(&zoomed, "A-005"), expected);
        assert_eq!(get(&zoomed, "A-020"), None);
    }

    #[test]
    fn test_pentagon_uses_five_neighbours() {
        let mut t = tile("01-0", 2, ScalarType::F64);
        set(&mut t, "01-00", 0.0);
        for d in 2..=6 {
            set(&mut t, &format!("01-0{}", d), 5.0);
        }

        let zoomed = t.zoom_in(0).unwrap();
        assert_eq!(zoomed.cell_count(), 11);
        // (0 + 5 * 5 * 1/5) / (1 + 5 * 1/5)
        assert_close(get(&zoomed, "01-002"), 2.5);
    }

    #[test]
    fn test_integer_fields_round() {
        let mut t = tile("A-0", 2, ScalarType::U8);
        t.set_value(0, 0, &Value::scalar(Scalar::U8(1))).unwrap();
        let centre: CellAddress = "A-03".parse().unwrap();
        t.set_value_at(&centre, 0, &Value::scalar(Scalar::U8(4))).unwrap();

        let zoomed = t.zoom_in(0).unwrap();
        let cell: CellAddress = "A-001".parse().unwrap();
        // (1 + 4/6) / (7/6) = 1.43 -> 1
        assert_eq!(
            zoomed.get_value_at(&cell, 0).unwrap().0,
            Value::scalar(Scalar::U8(1))
        );
    }

    #[test]
    fn test_zoom_field_out_of_range() {
        let t = tile("A-0", 2, ScalarType::F64);
        assert!(matches!(
            t.zoom_in(1),
            Err(ValueError::FieldOutOfRange { .. })
        ));
    }
}
