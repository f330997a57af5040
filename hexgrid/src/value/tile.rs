//! Dense per-cell value storage for a tile.

use crate::address::CellAddress;
use crate::geometry::{GeometryError, GridGeometry};

use super::column::Column;
use super::error::ValueError;
use super::schema::{FieldSchema, Value};

/// Field values for every cell of a [`GridGeometry`].
///
/// Storage is column-oriented: one flat array per field indexed by cell
/// offset, with parallel bits recording which cells were written and which
/// hold an explicit null.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTile {
    geometry: GridGeometry,
    schema: FieldSchema,
    pub(crate) columns: Vec<Column>,
    complete: bool,
    dirty: bool,
}

impl ValueTile {
    /// An empty tile: nothing initialized, not complete.
    pub fn new(geometry: GridGeometry, schema: FieldSchema) -> Self {
        let cells = geometry.cell_count() as usize;
        let columns = schema
            .fields()
            .iter()
            .map(|spec| Column::new(spec.clone(), cells))
            .collect();
        Self {
            geometry,
            schema,
            columns,
            complete: false,
            dirty: false,
        }
    }

    pub(crate) fn from_parts(
        geometry: GridGeometry,
        schema: FieldSchema,
        columns: Vec<Column>,
        complete: bool,
    ) -> Self {
        Self {
            geometry,
            schema,
            columns,
            complete,
            dirty: false,
        }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn cell_count(&self) -> u32 {
        self.geometry.cell_count()
    }

    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn column(&self, field: usize) -> Result<&Column, ValueError> {
        self.columns.get(field).ok_or(ValueError::FieldOutOfRange {
            field,
            count: self.columns.len(),
        })
    }

    fn check_offset(&self, offset: u32) -> Result<usize, ValueError> {
        let count = self.cell_count();
        if offset >= count {
            return Err(GeometryError::OffsetOutOfRange {
                offset: offset as u64,
                count,
            }
            .into());
        }
        Ok(offset as usize)
    }

    /// The value at `offset` and whether it was ever written. Unwritten
    /// cells report `(Value::Null, false)`.
    pub fn get_value(&self, offset: u32, field: usize) -> Result<(Value, bool), ValueError> {
        let cell = self.check_offset(offset)?;
        Ok(self.column(field)?.get(cell))
    }

    /// [`get_value`](Self::get_value) by cell address.
    pub fn get_value_at(
        &self,
        address: &CellAddress,
        field: usize,
    ) -> Result<(Value, bool), ValueError> {
        let offset = self.geometry.offset_of(address)?;
        self.get_value(offset, field)
    }

    /// Write a value, marking the cell initialized and the tile dirty.
    pub fn set_value(&mut self, offset: u32, field: usize, value: &Value) -> Result<(), ValueError> {
        let cell = self.check_offset(offset)?;
        let count = self.columns.len();
        let column = self
            .columns
            .get_mut(field)
            .ok_or(ValueError::FieldOutOfRange { field, count })?;
        column.check(field, value)?;
        column.set(cell, value);
        self.dirty = true;
        Ok(())
    }

    /// [`set_value`](Self::set_value) by cell address.
    pub fn set_value_at(
        &mut self,
        address: &CellAddress,
        field: usize,
        value: &Value,
    ) -> Result<(), ValueError> {
        let offset = self.geometry.offset_of(address)?;
        self.set_value(offset, field, value)
    }

    pub fn is_initialized(&self, offset: u32, field: usize) -> Result<bool, ValueError> {
        let cell = self.check_offset(offset)?;
        Ok(self.column(field)?.is_initialized(cell))
    }

    /// True once every cell of every field has been written.
    pub fn is_fully_initialized(&self) -> bool {
        self.columns
            .iter()
            .all(|c| c.initialized_count() == c.cells())
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn set_complete(&mut self, complete: bool) {
        if self.complete != complete {
            self.complete = complete;
            self.dirty = true;
        }
    }

    /// True when modified since creation, load, or the last
    /// [`clear_dirty`](Self::clear_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// A tile holding only `field`, with the same geometry and completeness.
    pub fn clone_single_field(&self, field: usize) -> Result<ValueTile, ValueError> {
        let column = self.column(field)?.clone();
        let schema = FieldSchema::single(column.spec().clone());
        Ok(ValueTile::from_parts(
            self.geometry,
            schema,
            vec![column],
            self.complete,
        ))
    }

    fn check_same_layout(&self, other: &ValueTile) -> Result<(), ValueError> {
        if self.geometry != other.geometry {
            return Err(ValueError::SchemaMismatch(format!(
                "geometry {} does not match {}",
                other.geometry, self.geometry
            )));
        }
        if !self.schema.is_compatible(&other.schema) {
            return Err(ValueError::SchemaMismatch(
                "field types or element counts differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy every value initialized in `other` but not in `self`.
    /// Returns the number of values copied.
    pub fn fill_missing_from(&mut self, other: &ValueTile) -> Result<usize, ValueError> {
        self.check_same_layout(other)?;
        let mut copied = 0;
        for (dst, src) in self.columns.iter_mut().zip(&other.columns) {
            for cell in 0..dst.cells() {
                if !dst.is_initialized(cell) && src.is_initialized(cell) {
                    dst.copy_cell(src, cell);
                    copied += 1;
                }
            }
        }
        if copied > 0 {
            self.dirty = true;
        }
        Ok(copied)
    }

    /// Overwrite with every value initialized in `other`. Returns the number
    /// of values copied.
    pub fn merge_from(&mut self, other: &ValueTile) -> Result<usize, ValueError> {
        self.check_same_layout(other)?;
        let mut copied = 0;
        for (dst, src) in self.columns.iter_mut().zip(&other.columns) {
            for cell in 0..dst.cells() {
                if src.is_initialized(cell) {
                    dst.copy_cell(src, cell);
                    copied += 1;
                }
            }
        }
        if other.complete {
            self.complete = true;
        }
        if copied > 0 {
            self.dirty = true;
        }
        Ok(copied)
    }
}
