//! Binary tile format.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "HXVT"
//! 4       4     format version (u32, little endian)
//! 8       1     complete flag
//! 9       ..    zlib stream of the bincode body:
//!               geometry, field schema, per-field values with
//!               initialized and null bits
//! ```
//!
//! The completeness flag sits outside the compressed body so a cache can
//! check it without inflating the tile.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::geometry::GridGeometry;

use super::column::Column;
use super::error::CodecError;
use super::schema::FieldSchema;
use super::tile::ValueTile;

/// File magic.
pub const TILE_MAGIC: &[u8; 4] = b"HXVT";

/// Current format version.
pub const TILE_FORMAT_VERSION: u32 = 3;

#[derive(Serialize)]
struct TileBodyRef<'a> {
    geometry: &'a GridGeometry,
    schema: &'a FieldSchema,
    columns: &'a [Column],
}

#[derive(Deserialize)]
struct TileBody {
    geometry: GridGeometry,
    schema: FieldSchema,
    columns: Vec<Column>,
}

fn read_header<R: Read>(reader: &mut R) -> Result<bool, CodecError> {
    let mut header = [0u8; 9];
    reader.read_exact(&mut header)?;
    if &header[0..4] != TILE_MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != TILE_FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: version,
            supported: TILE_FORMAT_VERSION,
        });
    }
    match header[8] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::Corrupt(format!("invalid complete flag {}", other))),
    }
}

impl ValueTile {
    /// Encode into `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), CodecError> {
        writer.write_all(TILE_MAGIC)?;
        writer.write_all(&TILE_FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&[u8::from(self.is_complete())])?;

        let body = TileBodyRef {
            geometry: self.geometry(),
            schema: self.schema(),
            columns: &self.columns,
        };
        let mut encoder = ZlibEncoder::new(writer, Compression::fast());
        bincode::serialize_into(&mut encoder, &body)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        encoder.finish()?.flush()?;
        Ok(())
    }

    /// Encode into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    /// Decode from `reader`. The loaded tile is not dirty.
    ///
    /// # Errors
    ///
    /// `BadMagic`, `UnsupportedVersion` or `Corrupt` when the data is not a
    /// valid tile, `Io` when the reader fails.
    pub fn read_from<R: Read>(mut reader: R) -> Result<ValueTile, CodecError> {
        let complete = read_header(&mut reader)?;
        let decoder = ZlibDecoder::new(reader);
        let body: TileBody = bincode::deserialize_from(decoder)
            .map_err(|e| CodecError::Corrupt(e.to_string()))?;

        let cells = body.geometry.cell_count() as usize;
        if body.columns.len() != body.schema.len() {
            return Err(CodecError::Corrupt(format!(
                "{} columns for {} fields",
                body.columns.len(),
                body.schema.len()
            )));
        }
        for (column, spec) in body.columns.iter().zip(body.schema.fields()) {
            if column.spec() != spec || column.cells() != cells || !column.is_consistent() {
                return Err(CodecError::Corrupt(format!(
                    "field '{}' does not match tile {}",
                    spec.name, body.geometry
                )));
            }
        }

        Ok(ValueTile::from_parts(
            body.geometry,
            body.schema,
            body.columns,
            complete,
        ))
    }

    /// Decode from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<ValueTile, CodecError> {
        Self::read_from(bytes)
    }

    /// Read only the header and report the completeness flag.
    pub fn peek_complete<R: Read>(mut reader: R) -> Result<bool, CodecError> {
        read_header(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FieldSpec, Scalar, ScalarType, Value};

    fn sample_tile() -> ValueTile {
        let geometry = GridGeometry::new("07-0".parse().unwrap(), 4).unwrap();
        let schema = FieldSchema::new(vec![
            FieldSpec::new("rgb", ScalarType::U8, 3),
            FieldSpec::new("elevation", ScalarType::F64, 1),
        ]);
        let mut tile = ValueTile::new(geometry, schema);
        for offset in (0..tile.cell_count()).step_by(3) {
            let v = offset as u8;
            let rgb = Value::elements([Scalar::U8(v), Scalar::U8(v), Scalar::U8(1)]);
            tile.set_value(offset, 0, &rgb).unwrap();
        }
        tile.set_value(1, 1, &Value::Null).unwrap();
        tile.set_value(2, 1, &Value::scalar(Scalar::F64(-12.5))).unwrap();
        tile.set_complete(true);
        tile
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let tile = sample_tile();
        let bytes = tile.to_bytes().unwrap();
        let decoded = ValueTile::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.geometry(), tile.geometry());
        assert_eq!(decoded.schema(), tile.schema());
        assert!(decoded.is_complete());
        assert!(!decoded.is_dirty());
        for offset in 0..tile.cell_count() {
            for field in 0..2 {
                assert_eq!(
                    decoded.get_value(offset, field).unwrap(),
                    tile.get_value(offset, field).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_random_tiles_round_trip() {
        use rand::Rng;

        let mut rng = rand::rng();
        let geometry = GridGeometry::new("A-0".parse().unwrap(), 5).unwrap();
        let schema = FieldSchema::new(vec![
            FieldSpec::new("h", ScalarType::F32, 1),
            FieldSpec::new("uv", ScalarType::I16, 2),
        ]);
        for _ in 0..8 {
            let mut tile = ValueTile::new(geometry, schema.clone());
            for offset in 0..tile.cell_count() {
                if rng.random_bool(0.7) {
                    let h = Scalar::F32(rng.random_range(-500.0..9000.0));
                    tile.set_value(offset, 0, &Value::scalar(h)).unwrap();
                }
                if rng.random_bool(0.5) {
                    let uv = [Scalar::I16(rng.random()), Scalar::I16(rng.random())];
                    tile.set_value(offset, 1, &Value::elements(uv)).unwrap();
                }
            }

            let decoded = ValueTile::from_bytes(&tile.to_bytes().unwrap()).unwrap();
            for offset in 0..tile.cell_count() {
                for field in 0..2 {
                    assert_eq!(
                        decoded.get_value(offset, field).unwrap(),
                        tile.get_value(offset, field).unwrap()
                    );
                }
            }
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample_tile().to_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"HXVT");
        assert_eq!(&bytes[4..8], &3u32.to_le_bytes());
        assert_eq!(bytes[8], 1);
        assert!(ValueTile::peek_complete(&bytes[..]).unwrap());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = sample_tile().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            ValueTile::from_bytes(&bytes),
            Err(CodecError::BadMagic)
        ));
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut bytes = sample_tile().to_bytes().unwrap();
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(
            ValueTile::from_bytes(&bytes),
            Err(CodecError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_body() {
        let bytes = sample_tile().to_bytes().unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(ValueTile::from_bytes(truncated).is_err());
        assert!(matches!(
            ValueTile::from_bytes(&bytes[..5]),
            Err(CodecError::Io(_))
        ));
    }

    #[derive(Serialize)]
    struct UncheckedGeometry {
        root: crate::address::CellAddress,
        resolution: usize,
    }

    #[derive(Serialize)]
    struct UncheckedBody {
        geometry: UncheckedGeometry,
        schema: FieldSchema,
        columns: Vec<Column>,
    }

    fn encode_unchecked(root: &str, resolution: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(TILE_MAGIC);
        bytes.extend_from_slice(&TILE_FORMAT_VERSION.to_le_bytes());
        bytes.push(1);
        let body = UncheckedBody {
            geometry: UncheckedGeometry {
                root: root.parse().unwrap(),
                resolution,
            },
            schema: FieldSchema::default(),
            columns: Vec::new(),
        };
        let mut encoder = ZlibEncoder::new(&mut bytes, Compression::fast());
        bincode::serialize_into(&mut encoder, &body).unwrap();
        encoder.finish().unwrap();
        bytes
    }

    #[test]
    fn test_accepts_hand_encoded_body() {
        let tile = ValueTile::from_bytes(&encode_unchecked("A-0102", 6)).unwrap();
        assert_eq!(tile.geometry().resolution(), 6);
        assert!(tile.is_complete());
    }

    #[test]
    fn test_rejects_geometry_below_root() {
        let bytes = encode_unchecked("A-0102", 1);
        assert!(matches!(
            ValueTile::from_bytes(&bytes),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn test_rejects_over_deep_geometry() {
        let bytes = encode_unchecked("A-0", 30);
        assert!(matches!(
            ValueTile::from_bytes(&bytes),
            Err(CodecError::Corrupt(_))
        ));
    }
}
