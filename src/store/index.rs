// Durable cache index — a single JSON document, staged and atomically renamed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::asset::AssetKey;
use crate::error::Result;

pub const INDEX_FILE: &str = "index.json";
const INDEX_STAGE_FILE: &str = "index.json.tmp";
const INDEX_VERSION: &str = "1.0";

/// Metadata for one captured asset. The durable contract the cache
/// browser reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAsset {
    pub asset_id: u64,
    pub asset_type: u32,
    pub type_name: String,
    pub content_hash: String,
    pub byte_size: u64,
    pub compressed: bool,
    /// Relative to the storage root.
    pub storage_path: PathBuf,
    pub source_url: String,
    /// Unix seconds.
    pub captured_at: u64,
    #[serde(default)]
    pub derived_formats: BTreeMap<String, PathBuf>,
}

impl CachedAsset {
    pub fn key(&self) -> AssetKey {
        AssetKey::new(self.asset_id, self.asset_type)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheIndex {
    pub version: String,
    pub assets: BTreeMap<String, CachedAsset>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self {
            version: INDEX_VERSION.to_string(),
            assets: BTreeMap::new(),
        }
    }

    /// Load the index document from `root`. A missing or unreadable
    /// index starts empty rather than failing startup.
    pub fn load(root: &Path) -> Self {
        let path = root.join(INDEX_FILE);
        match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(index) => index,
                Err(e) => {
                    warn!("cache index unreadable, starting empty: {}", e);
                    Self::new()
                }
            },
            Err(_) => Self::new(),
        }
    }

    /// Persist the document: serialize to a stage file, then atomically
    /// rename over the previous index. A crash between the two steps
    /// leaves the old index intact.
    pub fn save(&self, root: &Path) -> Result<()> {
        let stage = root.join(INDEX_STAGE_FILE);
        let target = root.join(INDEX_FILE);
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&stage, bytes)?;
        fs::rename(&stage, &target)?;
        Ok(())
    }

    pub fn get(&self, key: &AssetKey) -> Option<&CachedAsset> {
        self.assets.get(&key.index_key())
    }

    pub fn get_mut(&mut self, key: &AssetKey) -> Option<&mut CachedAsset> {
        self.assets.get_mut(&key.index_key())
    }

    pub fn insert(&mut self, asset: CachedAsset) {
        self.assets.insert(asset.key().index_key(), asset);
    }

    pub fn remove(&mut self, key: &AssetKey) -> Option<CachedAsset> {
        self.assets.remove(&key.index_key())
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.assets.contains_key(&key.index_key())
    }
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self::new()
    }
}
