//! Configuration for the coverage cache.
//!
//! Settings can be built in code with the `with_*` methods or read from the
//! `[cache]` section of an INI file:
//!
//! ```ini
//! [cache]
//! persistent = true
//! directory = /var/cache/hexgrid/elevation
//! tile_depth = 11
//! memory_capacity_bytes = 268435456
//! negative_index_capacity = 500
//! notification_timeout_secs = 30
//! single_flight = true
//! owner = elevation-v4
//! blob_version = Version2
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use super::error::CacheError;

/// Default tile depth for cell lookups.
pub const DEFAULT_TILE_DEPTH: usize = 11;

/// Default memory tier capacity (256 MB of tile data).
pub const DEFAULT_MEMORY_TILE_CAPACITY: u64 = 256 * 1024 * 1024;

/// Default number of has-values index entries.
pub const DEFAULT_NEGATIVE_INDEX_CAPACITY: u64 = 500;

/// Default wait for a tile-needed answer, in seconds.
pub const DEFAULT_NOTIFICATION_TIMEOUT_SECS: u64 = 30;

/// Default version tag of remote blob keys.
pub const DEFAULT_BLOB_VERSION: &str = "Version2";

/// INI section holding cache settings.
pub const CONFIG_SECTION: &str = "cache";

/// Configuration for a [`CoverageCache`](super::CoverageCache).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Whether tiles are written to and recovered from disk.
    pub persistent: bool,

    /// Directory holding the tile files of this cache.
    pub directory: PathBuf,

    /// Depth of the default tile used for cell lookups.
    pub tile_depth: usize,

    /// Approximate memory tier limit in bytes of tile data.
    pub memory_capacity_bytes: u64,

    /// Number of geometries remembered in the has-values index.
    pub negative_index_capacity: u64,

    /// How long to wait for a tile-needed listener to answer.
    pub notification_timeout: Duration,

    /// Coalesce concurrent upstream fetches of the same tile.
    pub single_flight: bool,

    /// Owner identity used in blob keys. Defaults to the producer identity.
    pub owner: Option<String>,

    /// Version tag prefixed to blob keys.
    pub blob_version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent: true,
            directory: default_cache_dir(),
            tile_depth: DEFAULT_TILE_DEPTH,
            memory_capacity_bytes: DEFAULT_MEMORY_TILE_CAPACITY,
            negative_index_capacity: DEFAULT_NEGATIVE_INDEX_CAPACITY,
            notification_timeout: Duration::from_secs(DEFAULT_NOTIFICATION_TIMEOUT_SECS),
            single_flight: true,
            owner: None,
            blob_version: DEFAULT_BLOB_VERSION.to_string(),
        }
    }
}

/// `<platform cache dir>/hexgrid`, or `./hexgrid-cache` when the platform
/// has none.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("hexgrid"))
        .unwrap_or_else(|| PathBuf::from("hexgrid-cache"))
}

impl CacheConfig {
    /// A persistent cache stored in `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// A cache that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            persistent: false,
            ..Default::default()
        }
    }

    /// Enable or disable the disk tier.
    pub fn with_persistence(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Set the cache directory.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Set the default tile depth.
    pub fn with_tile_depth(mut self, depth: usize) -> Self {
        self.tile_depth = depth;
        self
    }

    /// Set the memory tier limit.
    pub fn with_memory_capacity(mut self, bytes: u64) -> Self {
        self.memory_capacity_bytes = bytes;
        self
    }

    /// Set the has-values index size.
    pub fn with_negative_index_capacity(mut self, entries: u64) -> Self {
        self.negative_index_capacity = entries;
        self
    }

    /// Set the tile-needed wait.
    pub fn with_notification_timeout(mut self, timeout: Duration) -> Self {
        self.notification_timeout = timeout;
        self
    }

    /// Enable or disable fetch coalescing.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Set the blob key owner identity.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the blob key version tag.
    pub fn with_blob_version(mut self, version: impl Into<String>) -> Self {
        self.blob_version = version.into();
        self
    }

    /// Load from the `[cache]` section of an INI file. Missing keys keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// `CacheError::Config` if the file cannot be read or a value does not
    /// parse.
    pub fn from_ini_file(path: &Path) -> Result<Self, CacheError> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| CacheError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_ini(&ini)
    }

    /// Load from INI text. See [`from_ini_file`](Self::from_ini_file).
    pub fn from_ini_str(text: &str) -> Result<Self, CacheError> {
        let ini = Ini::load_from_str(text).map_err(|e| CacheError::Config(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, CacheError> {
        let mut config = Self::default();
        let Some(section) = ini.section(Some(CONFIG_SECTION)) else {
            return Ok(config);
        };

        if let Some(v) = section.get("persistent") {
            config.persistent = parse_bool("persistent", v)?;
        }
        if let Some(v) = section.get("directory") {
            config.directory = PathBuf::from(v);
        }
        if let Some(v) = section.get("tile_depth") {
            config.tile_depth = parse_value("tile_depth", v)?;
        }
        if let Some(v) = section.get("memory_capacity_bytes") {
            config.memory_capacity_bytes = parse_value("memory_capacity_bytes", v)?;
        }
        if let Some(v) = section.get("negative_index_capacity") {
            config.negative_index_capacity = parse_value("negative_index_capacity", v)?;
        }
        if let Some(v) = section.get("notification_timeout_secs") {
            config.notification_timeout =
                Duration::from_secs(parse_value("notification_timeout_secs", v)?);
        }
        if let Some(v) = section.get("single_flight") {
            config.single_flight = parse_bool("single_flight", v)?;
        }
        if let Some(v) = section.get("owner") {
            config.owner = Some(v.to_string());
        }
        if let Some(v) = section.get("blob_version") {
            config.blob_version = v.to_string();
        }
        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, CacheError> {
    value
        .trim()
        .parse()
        .map_err(|_| CacheError::Config(format!("invalid value for {}: '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, CacheError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(CacheError::Config(format!(
            "invalid value for {}: '{}'",
            key, value
        ))),
    }
}
