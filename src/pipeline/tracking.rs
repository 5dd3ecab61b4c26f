// Shared map of assets discovered but not yet captured, keyed by base
// CDN URL for O(1) lookup when content arrives.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TrackedAsset {
    pub asset_id: u64,
    pub asset_type: u32,
    pub cdn_location: String,
    pub discovered_at: Instant,
    pub resolved: bool,
}

/// Tracking map with bounded retention. Entries are evicted once
/// resolved, or after the TTL if their content never arrives — assets
/// never downloaded must not grow the map without bound.
pub struct TrackingMap {
    inner: Mutex<HashMap<String, TrackedAsset>>,
    ttl: Duration,
}

impl TrackingMap {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Track a discovered asset. The key is the CDN location with its
    /// query string stripped. Returns false if the URL is already
    /// tracked.
    pub fn insert(&self, asset_id: u64, asset_type: u32, cdn_location: &str) -> bool {
        let key = base_url(cdn_location).to_string();
        let mut inner = self.inner.lock();
        if inner.contains_key(&key) {
            return false;
        }
        inner.insert(
            key,
            TrackedAsset {
                asset_id,
                asset_type,
                cdn_location: cdn_location.to_string(),
                discovered_at: Instant::now(),
                resolved: false,
            },
        );
        true
    }

    /// Atomic lookup-and-mark: returns the entry's snapshot if it is
    /// tracked and not yet resolved, marking it resolved in the same
    /// critical section. Concurrent deliveries of the same URL — only
    /// one caller wins.
    pub fn claim(&self, url: &str) -> Option<TrackedAsset> {
        let key = base_url(url);
        let mut inner = self.inner.lock();
        let entry = inner.get_mut(key)?;
        if entry.resolved {
            return None;
        }
        entry.resolved = true;
        Some(entry.clone())
    }

    /// Evict resolved entries and unresolved entries past the TTL.
    /// Returns the number evicted.
    pub fn sweep(&self) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.len();
        inner.retain(|_, entry| !entry.resolved && entry.discovered_at.elapsed() < self.ttl);
        let evicted = before - inner.len();
        if evicted > 0 {
            debug!("evicted {} tracked asset(s)", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

fn base_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
