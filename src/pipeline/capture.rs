// Capture-stage interceptor: matches CDN content against the tracking
// map and persists it. Untracked content passes through untouched —
// the discovery stage is authoritative.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::asset::{needs_conversion, AssetKey, TYPE_TEXTURE_PACK};
use crate::config::EngineConfig;
use crate::convert::dispatcher::{ConversionDispatcher, ConversionJob, TargetFormat};
use crate::pipeline::tracking::TrackingMap;
use crate::store::cache_store::CacheStore;
use crate::traffic::{HttpExchange, Interceptor};

const KTX_MAGIC: &[u8] = b"\xABKTX";

pub struct CdnCaptureInterceptor {
    tracking: Arc<TrackingMap>,
    store: Arc<CacheStore>,
    dispatcher: Arc<ConversionDispatcher>,
    cdn_hosts: Vec<String>,
}

impl CdnCaptureInterceptor {
    pub fn new(
        tracking: Arc<TrackingMap>,
        store: Arc<CacheStore>,
        dispatcher: Arc<ConversionDispatcher>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            tracking,
            store,
            dispatcher,
            cdn_hosts: config.cdn_hosts.clone(),
        }
    }

    /// Derived format this content needs, if any. The type-level
    /// eligibility check lives in `asset::needs_conversion`; content
    /// magic only refines it.
    fn conversion_target(asset_type: u32, content: &[u8]) -> Option<TargetFormat> {
        if !needs_conversion(asset_type) {
            return None;
        }
        match asset_type {
            TYPE_TEXTURE_PACK => Some(TargetFormat::TextureManifest),
            _ if content.starts_with(KTX_MAGIC) => Some(TargetFormat::Png),
            _ => None,
        }
    }
}

impl Interceptor for CdnCaptureInterceptor {
    fn name(&self) -> &'static str {
        "cdn-capture"
    }

    fn on_response(&self, exchange: &HttpExchange) {
        if exchange.status != 200 || exchange.response_body.is_empty() {
            return;
        }
        let host = exchange.host();
        if !self.cdn_hosts.iter().any(|h| h == host) {
            return;
        }

        // Atomic lookup-and-mark: under concurrent delivery of the same
        // URL exactly one capture proceeds.
        let Some(tracked) = self.tracking.claim(exchange.base_url()) else {
            return;
        };

        let key = AssetKey::new(tracked.asset_id, tracked.asset_type);
        if self.store.contains(&key) {
            debug!("capture {}: already in cache index", key);
            return;
        }

        let content: &Bytes = &exchange.response_body;
        if let Err(e) = self.store.put(
            tracked.asset_id,
            tracked.asset_type,
            content,
            &exchange.url,
        ) {
            warn!("capture {} failed: {}", key, e);
            return;
        }

        if let Some(target) = Self::conversion_target(tracked.asset_type, content) {
            self.dispatcher.enqueue(ConversionJob {
                asset_id: tracked.asset_id,
                asset_type: tracked.asset_type,
                source_url: exchange.url.clone(),
                raw: content.clone(),
                target,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{TYPE_DECAL, TYPE_IMAGE, TYPE_MESH};

    #[test]
    fn test_conversion_target() {
        let ktx = b"\xABKTX 11\xBB";
        // Compressed textures get a decoded-image target.
        assert_eq!(
            CdnCaptureInterceptor::conversion_target(TYPE_IMAGE, ktx),
            Some(TargetFormat::Png)
        );
        assert_eq!(
            CdnCaptureInterceptor::conversion_target(TYPE_DECAL, ktx),
            Some(TargetFormat::Png)
        );
        // Already-decoded images need nothing.
        assert_eq!(
            CdnCaptureInterceptor::conversion_target(TYPE_IMAGE, b"\x89PNG\r\n\x1a\n"),
            None
        );
        // Texture packs always resolve their manifest.
        assert_eq!(
            CdnCaptureInterceptor::conversion_target(TYPE_TEXTURE_PACK, b"anything"),
            Some(TargetFormat::TextureManifest)
        );
        // Types outside the conversion set are never queued, KTX or not.
        assert_eq!(CdnCaptureInterceptor::conversion_target(TYPE_MESH, ktx), None);
    }
}
