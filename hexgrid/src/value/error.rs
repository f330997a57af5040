//! Value storage and codec error types.

use std::io;

use thiserror::Error;

use super::schema::ScalarType;
use crate::geometry::GeometryError;

/// Errors raised by [`ValueTile`](super::ValueTile) access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("Field {field} out of range (tile has {count} fields)")]
    FieldOutOfRange { field: usize, count: usize },

    #[error("Field {field} holds {expected} values, got {found}")]
    TypeMismatch {
        field: usize,
        expected: ScalarType,
        found: ScalarType,
    },

    #[error("Field {field} holds {expected} elements per cell, got {found}")]
    ElementCountMismatch {
        field: usize,
        expected: usize,
        found: usize,
    },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Errors raised while encoding or decoding a tile.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Not a value tile (bad magic)")]
    BadMagic,

    #[error("Unsupported tile format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Corrupt tile data: {0}")]
    Corrupt(String),

    #[error("Failed to encode tile: {0}")]
    Encode(String),
}
