use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Payloads at or above this size are gzip-compressed on disk (10 KB).
pub const COMPRESSION_THRESHOLD_BYTES: u64 = 10 * 1024;

/// Default number of conversion worker tasks.
pub const DEFAULT_WORKER_COUNT: u32 = 4;

/// How long an unresolved tracked asset is retained before eviction.
pub const TRACKED_ASSET_TTL: Duration = Duration::from_secs(15 * 60);

/// Timeout for a single conversion-API request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Top-level configuration for the capture pipeline. Provided once at
/// pipeline construction, immutable thereafter.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Root directory for cached asset files and the index document.
    pub storage_root: PathBuf,
    /// Number of conversion worker tasks.
    pub worker_count: u32,
    /// Size at which stored payloads are compressed, in bytes.
    pub compression_threshold: u64,
    /// Retention window for unresolved tracked assets, in seconds.
    pub tracked_ttl_secs: u64,
    /// Host of the asset-discovery API.
    pub discovery_host: String,
    /// Path of the batch discovery endpoint on the discovery host.
    pub batch_path: String,
    /// CDN hosts whose content responses are candidates for capture.
    pub cdn_hosts: Vec<String>,
    /// Base URL of the conversion API (`?id=<asset_id>` is appended).
    pub conversion_api: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::new(),
            worker_count: DEFAULT_WORKER_COUNT,
            compression_threshold: COMPRESSION_THRESHOLD_BYTES,
            tracked_ttl_secs: TRACKED_ASSET_TTL.as_secs(),
            discovery_host: "assetdelivery.roblox.com".to_string(),
            batch_path: "/v1/assets/batch".to_string(),
            cdn_hosts: vec!["fts.rbxcdn.com".to_string()],
            conversion_api: "https://assetdelivery.roblox.com/v1/asset/".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn tracked_ttl(&self) -> Duration {
        Duration::from_secs(self.tracked_ttl_secs)
    }
}
