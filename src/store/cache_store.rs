// Capture archive for intercepted assets — one file per (id, type),
// gzip above a size threshold, and a crash-consistent JSON index.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::asset::{asset_type_name, AssetKey};
use crate::error::{Error, Result};
use crate::store::index::{CacheIndex, CachedAsset};

/// Aggregate counts and sizes computed from the in-memory index.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_assets: usize,
    pub total_bytes: u64,
    /// Per type name: (asset count, raw byte total).
    pub per_type: BTreeMap<String, (usize, u64)>,
}

pub struct CacheStore {
    root: PathBuf,
    compression_threshold: u64,
    // Single writer at a time; mutate-then-persist happens under this lock.
    index: Mutex<CacheIndex>,
}

impl CacheStore {
    /// Open (or create) a store rooted at `root`, rebuilding the index
    /// from the persisted document.
    pub fn open(root: &Path, compression_threshold: u64) -> Result<Self> {
        fs::create_dir_all(root)?;
        let index = CacheIndex::load(root);
        info!(
            "cache store opened: {} asset(s) at {}",
            index.assets.len(),
            root.display()
        );
        Ok(Self {
            root: root.to_path_buf(),
            compression_threshold,
            index: Mutex::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative_path(&self, key: &AssetKey, ext: &str) -> PathBuf {
        PathBuf::from(asset_type_name(key.asset_type)).join(format!("{}.{}", key.asset_id, ext))
    }

    /// Store a captured asset. Idempotent: a repeat put for an already
    /// present key is a no-op returning the existing record.
    pub fn put(
        &self,
        asset_id: u64,
        asset_type: u32,
        data: &[u8],
        source_url: &str,
    ) -> Result<CachedAsset> {
        let key = AssetKey::new(asset_id, asset_type);

        {
            let index = self.index.lock();
            if let Some(existing) = index.get(&key) {
                debug!("put {}: already cached, skipping", key);
                return Ok(existing.clone());
            }
        }

        let content_hash = content_hash(data);
        let compressed = data.len() as u64 >= self.compression_threshold;
        let rel_path = self.relative_path(&key, "bin");
        let abs_path = self.root.join(&rel_path);
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if compressed {
            let file = fs::File::create(&abs_path)?;
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(data)?;
            encoder.finish()?;
        } else {
            fs::write(&abs_path, data)?;
        }

        let record = CachedAsset {
            asset_id,
            asset_type,
            type_name: asset_type_name(asset_type),
            content_hash,
            byte_size: data.len() as u64,
            compressed,
            storage_path: rel_path,
            source_url: source_url.to_string(),
            captured_at: unix_now(),
            derived_formats: BTreeMap::new(),
        };

        let stored = {
            let mut index = self.index.lock();
            // Another writer may have won the race while we wrote the file.
            if let Some(existing) = index.get(&key) {
                return Ok(existing.clone());
            }
            index.insert(record.clone());
            index.save(&self.root)?;
            record
        };

        info!(
            "cached {}: {} bytes{}",
            key,
            stored.byte_size,
            if stored.compressed { " (compressed)" } else { "" }
        );
        Ok(stored)
    }

    /// Attach a derived-format file (e.g. a decoded PNG) to an already
    /// cached asset. Derived files are stored uncompressed.
    pub fn put_derived(
        &self,
        key: &AssetKey,
        format: &str,
        ext: &str,
        data: &[u8],
    ) -> Result<PathBuf> {
        if !self.contains(key) {
            return Err(Error::NotFound(format!("{} has no cached base asset", key)));
        }

        let rel_path = self.relative_path(key, ext);
        let abs_path = self.root.join(&rel_path);
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&abs_path, data)?;

        {
            let mut index = self.index.lock();
            let entry = index
                .get_mut(key)
                .ok_or_else(|| Error::NotFound(format!("{} vanished from index", key)))?;
            entry
                .derived_formats
                .insert(format.to_string(), rel_path.clone());
            index.save(&self.root)?;
        }

        debug!("derived {} for {}: {} bytes", format, key, data.len());
        Ok(rel_path)
    }

    /// Read an asset's raw bytes, decompressing transparently.
    pub fn get(&self, key: &AssetKey) -> Result<Vec<u8>> {
        let record = self
            .info(key)
            .ok_or_else(|| Error::NotFound(format!("{} not in cache", key)))?;

        let abs_path = self.root.join(&record.storage_path);
        let bytes = fs::read(&abs_path)?;
        if record.compressed {
            let mut decoder = GzDecoder::new(bytes.as_slice());
            let mut out = Vec::with_capacity(record.byte_size as usize);
            decoder.read_to_end(&mut out)?;
            Ok(out)
        } else {
            Ok(bytes)
        }
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.index.lock().contains(key)
    }

    /// Snapshot of one asset's index record.
    pub fn info(&self, key: &AssetKey) -> Option<CachedAsset> {
        self.index.lock().get(key).cloned()
    }

    /// Snapshot of all records, newest first, optionally filtered by type.
    pub fn list(&self, asset_type: Option<u32>) -> Vec<CachedAsset> {
        let mut assets: Vec<CachedAsset> = {
            let index = self.index.lock();
            index
                .assets
                .values()
                .filter(|a| asset_type.map_or(true, |t| a.asset_type == t))
                .cloned()
                .collect()
        };
        assets.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        assets
    }

    /// Remove an asset. A missing file is tolerated — the index entry
    /// removal is authoritative.
    pub fn delete(&self, key: &AssetKey) -> Result<()> {
        let removed = {
            let mut index = self.index.lock();
            let removed = index
                .remove(key)
                .ok_or_else(|| Error::NotFound(format!("{} not in cache", key)))?;
            index.save(&self.root)?;
            removed
        };

        let abs_path = self.root.join(&removed.storage_path);
        if let Err(e) = fs::remove_file(&abs_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("delete {}: file removal failed: {}", key, e);
            }
        }
        for derived in removed.derived_formats.values() {
            let _ = fs::remove_file(self.root.join(derived));
        }
        Ok(())
    }

    /// Delete all assets, or all of one type. Returns the number removed.
    pub fn clear(&self, asset_type: Option<u32>) -> usize {
        let keys: Vec<AssetKey> = self
            .list(asset_type)
            .into_iter()
            .map(|a| a.key())
            .collect();
        let mut count = 0;
        for key in keys {
            match self.delete(&key) {
                Ok(()) => count += 1,
                Err(e) => warn!("clear: failed to delete {}: {}", key, e),
            }
        }
        count
    }

    /// Aggregate statistics from the in-memory index. No directory scan.
    pub fn stats(&self) -> CacheStats {
        let index = self.index.lock();
        let mut stats = CacheStats::default();
        for asset in index.assets.values() {
            stats.total_assets += 1;
            stats.total_bytes += asset.byte_size;
            let entry = stats.per_type.entry(asset.type_name.clone()).or_default();
            entry.0 += 1;
            entry.1 += asset.byte_size;
        }
        stats
    }
}

fn content_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let hex = format!("{:x}", digest);
    hex[..16].to_string()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
