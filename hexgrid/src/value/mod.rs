//! Per-cell field values stored densely over a tile.
//!
//! A [`ValueTile`] holds, for every cell of a [`GridGeometry`], one value
//! per declared field. Each field is a fixed number of scalars of one type
//! (for example three `u8` for a colour). Cells track whether they were ever
//! written, so an explicit null and "never written" stay distinct.
//!
//! [`GridGeometry`]: crate::geometry::GridGeometry

mod codec;
mod column;
mod error;
mod schema;
mod tile;
mod zoom;

pub use codec::{TILE_FORMAT_VERSION, TILE_MAGIC};
pub use error::{CodecError, ValueError};
pub use schema::{FieldSchema, FieldSpec, Scalar, ScalarType, Value};
pub use tile::ValueTile;
