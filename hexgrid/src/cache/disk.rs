//! Disk tier: one file per tile.
//!
//! # Layout
//!
//! The root address string is cut into 4 character directory segments
//! (5 for the first segment of a vertex address, so `A-01` and `01-01` both
//! end on the first digit pair). The remainder names the file, and the
//! extension carries the tile depth:
//!
//! ```text
//! <dir>/definition.json
//! <dir>/A-01/0203/0.d11        tile A-0102030, depth 11
//! <dir>/01-01/02.d06           tile 01-0102, depth 6
//! <dir>/C.d11                  tile C, depth 11
//! ```
//!
//! Files are written to a temporary name and renamed into place, so readers
//! never see a half-written tile.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::CellAddress;
use crate::geometry::GridGeometry;
use crate::value::{FieldSchema, ValueTile, TILE_FORMAT_VERSION};

use super::error::CacheError;
use super::stats::CacheStats;

/// Name of the metadata file in the cache directory.
pub const DEFINITION_FILE: &str = "definition.json";

const SEGMENT_LEN: usize = 4;

/// Metadata stored next to the tile files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DiskDefinition {
    format_version: u32,
    tile_depth: usize,
    schema: FieldSchema,
}

impl DiskDefinition {
    fn load(path: &Path) -> io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to parse cache definition: {}", e),
            )
        })
    }

    fn save(&self, path: &Path) -> io::Result<()> {
        let temp_path = path.with_extension("json.tmp");
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| io::Error::other(format!("Failed to write cache definition: {}", e)))?;
        writer.flush()?;
        drop(writer);
        fs::rename(&temp_path, path)
    }
}

/// Path of the file holding `geometry` under `root`.
pub fn tile_path(root: &Path, geometry: &GridGeometry) -> PathBuf {
    let mut path = root.to_path_buf();
    let text = geometry.root().to_string();
    let mut rest = text.as_str();

    let mut segment = if rest.as_bytes().get(1) == Some(&b'-') {
        SEGMENT_LEN
    } else {
        SEGMENT_LEN + 1
    };
    while rest.len() > segment {
        let (head, tail) = rest.split_at(segment);
        path.push(head);
        rest = tail;
        segment = SEGMENT_LEN;
    }
    path.push(format!("{}.d{:02}", rest, geometry.depth()));
    path
}

/// The geometry stored at `path`, if it is a tile file under `root`.
pub fn geometry_of_path(root: &Path, path: &Path) -> Option<GridGeometry> {
    let relative = path.strip_prefix(root).ok()?;
    let mut text = String::new();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        let Component::Normal(name) = component else {
            return None;
        };
        let name = name.to_str()?;
        if components.peek().is_some() {
            text.push_str(name);
        } else {
            let (stem, depth) = name.rsplit_once(".d")?;
            if depth.len() != 2 {
                return None;
            }
            let depth: usize = depth.parse().ok()?;
            text.push_str(stem);
            let root: CellAddress = text.parse().ok()?;
            return GridGeometry::new(root, root.resolution() + depth).ok();
        }
    }
    None
}

/// Persistent tile storage in one directory.
pub(crate) struct DiskTier {
    root: PathBuf,
    stats: Arc<CacheStats>,
}

impl DiskTier {
    /// Open or create the cache directory.
    ///
    /// Tiles written for a different field schema or format version are
    /// discarded and the definition rewritten.
    pub(crate) fn open(
        root: &Path,
        schema: &FieldSchema,
        tile_depth: usize,
        stats: Arc<CacheStats>,
    ) -> Result<Self, CacheError> {
        fs::create_dir_all(root)?;
        let tier = Self {
            root: root.to_path_buf(),
            stats,
        };

        let definition = DiskDefinition {
            format_version: TILE_FORMAT_VERSION,
            tile_depth,
            schema: schema.clone(),
        };
        let definition_path = root.join(DEFINITION_FILE);
        match DiskDefinition::load(&definition_path) {
            Ok(stored) if stored == definition => {
                debug!(path = %root.display(), "Opened tile cache directory");
                return Ok(tier);
            }
            Ok(stored) if stored.schema == definition.schema
                && stored.format_version == definition.format_version =>
            {
                // Depth only affects which tiles get requested.
            }
            Ok(_) => {
                let removed = tier.clear();
                warn!(
                    path = %root.display(),
                    removed,
                    "Cache definition changed, discarded stored tiles"
                );
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %root.display(), "Created tile cache directory");
            }
            Err(e) => {
                let removed = tier.clear();
                warn!(
                    error = %e,
                    path = %definition_path.display(),
                    removed,
                    "Unreadable cache definition, discarded stored tiles"
                );
            }
        }
        definition.save(&definition_path)?;
        Ok(tier)
    }

    /// The schema recorded in `root`, if a readable definition exists.
    pub(crate) fn stored_schema(root: &Path) -> Option<FieldSchema> {
        DiskDefinition::load(&root.join(DEFINITION_FILE))
            .ok()
            .map(|d| d.schema)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, geometry: &GridGeometry) -> bool {
        tile_path(&self.root, geometry).is_file()
    }

    /// The completeness flag of the stored tile, read from its header.
    pub(crate) fn peek_complete(&self, geometry: &GridGeometry) -> Option<bool> {
        let file = File::open(tile_path(&self.root, geometry)).ok()?;
        ValueTile::peek_complete(BufReader::new(file)).ok()
    }

    /// Read a tile. Unreadable files are deleted and reported as absent.
    pub(crate) fn load(&self, geometry: &GridGeometry) -> Result<Option<ValueTile>, CacheError> {
        let path = tile_path(&self.root, geometry);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let problem = match ValueTile::read_from(BufReader::new(file)) {
            Ok(tile) if tile.geometry() == geometry => return Ok(Some(tile)),
            Ok(tile) => format!("file holds tile {}", tile.geometry()),
            Err(e) => e.to_string(),
        };

        self.stats.record_corrupt_file();
        warn!(
            error = %problem,
            path = %path.display(),
            geometry = %geometry,
            "Removing corrupt tile file"
        );
        if let Err(e) = fs::remove_file(&path) {
            warn!(error = %e, path = %path.display(), "Failed to remove corrupt tile file");
        }
        Ok(None)
    }

    /// Write a tile, replacing any stored copy.
    pub(crate) fn store(&self, tile: &ValueTile) -> Result<(), CacheError> {
        let path = tile_path(&self.root, tile.geometry());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension(format!("d{:02}.tmp", tile.geometry().depth()));
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        let written = tile
            .write_to(&mut writer)
            .map_err(CacheError::from)
            .and_then(|()| writer.flush().map_err(CacheError::from));
        drop(writer);
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, &path)?;
        self.stats.record_disk_write();
        Ok(())
    }

    /// Every tile file under the cache directory.
    pub(crate) fn tile_files(&self) -> Vec<PathBuf> {
        let Some(root) = self.root.to_str() else {
            warn!(path = %self.root.display(), "Cache directory is not valid UTF-8");
            return Vec::new();
        };
        let pattern = format!("{}/**/*.d[0-9][0-9]", glob::Pattern::escape(root));
        match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).filter(|p| p.is_file()).collect(),
            Err(e) => {
                warn!(error = %e, pattern = %pattern, "Invalid tile file pattern");
                Vec::new()
            }
        }
    }

    /// Delete every stored tile intersecting `geometry`.
    pub(crate) fn remove_intersecting(&self, geometry: &GridGeometry) -> usize {
        self.tile_files()
            .into_iter()
            .filter(|path| {
                geometry_of_path(&self.root, path).is_some_and(|g| g.intersects(geometry))
            })
            .filter(|path| fs::remove_file(path).is_ok())
            .count()
    }

    /// Delete every stored tile.
    pub(crate) fn clear(&self) -> usize {
        self.tile_files()
            .into_iter()
            .filter(|path| fs::remove_file(path).is_ok())
            .count()
    }
}
