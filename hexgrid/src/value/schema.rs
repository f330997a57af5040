//! Field schema and cell values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl ScalarType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            ScalarType::U8 | ScalarType::I8 => 1,
            ScalarType::U16 | ScalarType::I16 => 2,
            ScalarType::U32 | ScalarType::I32 | ScalarType::F32 => 4,
            ScalarType::U64 | ScalarType::I64 | ScalarType::F64 => 8,
        }
    }

    /// The zero of this type.
    pub fn zero(self) -> Scalar {
        Scalar::from_f64(self, 0.0)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::U8 => "u8",
            ScalarType::I8 => "i8",
            ScalarType::U16 => "u16",
            ScalarType::I16 => "i16",
            ScalarType::U32 => "u32",
            ScalarType::I32 => "i32",
            ScalarType::U64 => "u64",
            ScalarType::I64 => "i64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// One element of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Scalar {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::U8(_) => ScalarType::U8,
            Scalar::I8(_) => ScalarType::I8,
            Scalar::U16(_) => ScalarType::U16,
            Scalar::I16(_) => ScalarType::I16,
            Scalar::U32(_) => ScalarType::U32,
            Scalar::I32(_) => ScalarType::I32,
            Scalar::U64(_) => ScalarType::U64,
            Scalar::I64(_) => ScalarType::I64,
            Scalar::F32(_) => ScalarType::F32,
            Scalar::F64(_) => ScalarType::F64,
        }
    }

    /// Numeric value as `f64`. Large 64-bit integers lose precision.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::U8(v) => v as f64,
            Scalar::I8(v) => v as f64,
            Scalar::U16(v) => v as f64,
            Scalar::I16(v) => v as f64,
            Scalar::U32(v) => v as f64,
            Scalar::I32(v) => v as f64,
            Scalar::U64(v) => v as f64,
            Scalar::I64(v) => v as f64,
            Scalar::F32(v) => v as f64,
            Scalar::F64(v) => v,
        }
    }

    /// Convert a number to `scalar_type`, rounding and saturating for
    /// integer types.
    pub fn from_f64(scalar_type: ScalarType, value: f64) -> Scalar {
        let rounded = value.round();
        match scalar_type {
            ScalarType::U8 => Scalar::U8(rounded as u8),
            ScalarType::I8 => Scalar::I8(rounded as i8),
            ScalarType::U16 => Scalar::U16(rounded as u16),
            ScalarType::I16 => Scalar::I16(rounded as i16),
            ScalarType::U32 => Scalar::U32(rounded as u32),
            ScalarType::I32 => Scalar::I32(rounded as i32),
            ScalarType::U64 => Scalar::U64(rounded as u64),
            ScalarType::I64 => Scalar::I64(rounded as i64),
            ScalarType::F32 => Scalar::F32(value as f32),
            ScalarType::F64 => Scalar::F64(value),
        }
    }
}

/// A field value for one cell: null, or one scalar per field element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Elements(Vec<Scalar>),
}

impl Value {
    /// A single-element value.
    pub fn scalar(scalar: Scalar) -> Self {
        Value::Elements(vec![scalar])
    }

    pub fn elements(elements: impl Into<Vec<Scalar>>) -> Self {
        Value::Elements(elements.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The elements, or an empty slice for null.
    pub fn as_slice(&self) -> &[Scalar] {
        match self {
            Value::Null => &[],
            Value::Elements(elements) => elements,
        }
    }

    /// The first element, when present.
    pub fn first(&self) -> Option<Scalar> {
        self.as_slice().first().copied()
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::scalar(scalar)
    }
}

/// Declaration of one field: a name and `count` elements of `scalar`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub scalar: ScalarType,
    pub count: usize,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, scalar: ScalarType, count: usize) -> Self {
        Self {
            name: name.into(),
            scalar,
            count,
        }
    }

    /// Same element type and element count. Names are not compared.
    pub fn is_compatible(&self, other: &FieldSpec) -> bool {
        self.scalar == other.scalar && self.count == other.count
    }
}

/// The ordered fields of a tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// A schema with one field.
    pub fn single(field: FieldSpec) -> Self {
        Self {
            fields: vec![field],
        }
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldSpec> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Same number of fields, each pairwise compatible.
    pub fn is_compatible(&self, other: &FieldSchema) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.is_compatible(b))
    }
}
