// Discovery-stage interceptor: batch responses reveal asset identities
// and CDN locations before any content is downloaded.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::pipeline::tracking::TrackingMap;
use crate::traffic::{decode_body, HttpExchange, Interceptor};

/// One `(asset_id, asset_type, cdn_location)` triple revealed by a
/// discovery batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAsset {
    pub asset_id: u64,
    pub asset_type: u32,
    pub cdn_location: String,
}

/// Partial-success parse result: malformed entries are skipped
/// individually, never aborting the batch.
#[derive(Debug, Default)]
pub struct BatchParse {
    pub triples: Vec<DiscoveredAsset>,
    pub skipped: usize,
}

pub struct BatchInterceptor {
    tracking: Arc<TrackingMap>,
    discovery_host: String,
    batch_path: String,
}

impl BatchInterceptor {
    pub fn new(tracking: Arc<TrackingMap>, config: &EngineConfig) -> Self {
        Self {
            tracking,
            discovery_host: config.discovery_host.clone(),
            batch_path: config.batch_path.clone(),
        }
    }
}

impl Interceptor for BatchInterceptor {
    fn name(&self) -> &'static str {
        "batch-discovery"
    }

    fn on_response(&self, exchange: &HttpExchange) {
        if exchange.status != 200
            || exchange.host() != self.discovery_host
            || exchange.path() != self.batch_path
        {
            return;
        }

        let request = decode_body(
            &exchange.request_body,
            exchange.request_header("content-encoding"),
        );
        let response = decode_body(
            &exchange.response_body,
            exchange.response_header("content-encoding"),
        );

        let parsed = match parse_batch(&request, &response) {
            Ok(parsed) => parsed,
            Err(e) => {
                // One bad batch must not interrupt proxying.
                warn!("discovery batch unparseable: {}", e);
                return;
            }
        };

        let mut tracked = 0;
        for triple in &parsed.triples {
            if self
                .tracking
                .insert(triple.asset_id, triple.asset_type, &triple.cdn_location)
            {
                tracked += 1;
            }
        }

        if parsed.skipped > 0 {
            debug!("discovery batch: skipped {} malformed entries", parsed.skipped);
        }
        if tracked > 0 {
            info!("tracking {} asset(s) for capture", tracked);
        }

        self.tracking.sweep();
    }
}

/// Extract discovery triples from a batch request/response pair. The
/// request is a JSON array of objects carrying `assetId`; the response
/// is an array aligned by index carrying `location` and `assetTypeId`.
pub fn parse_batch(request: &[u8], response: &[u8]) -> Result<BatchParse> {
    let request: Vec<Value> = serde_json::from_slice(request)
        .map_err(|e| Error::ParseFailure(format!("batch request: {}", e)))?;
    let response: Vec<Value> = serde_json::from_slice(response)
        .map_err(|e| Error::ParseFailure(format!("batch response: {}", e)))?;

    let mut parsed = BatchParse::default();
    for (index, item) in request.iter().enumerate() {
        let Some(asset_id) = item.get("assetId").and_then(value_as_u64) else {
            parsed.skipped += 1;
            continue;
        };
        let Some(entry) = response.get(index) else {
            parsed.skipped += 1;
            continue;
        };
        let Some(location) = entry.get("location").and_then(Value::as_str) else {
            parsed.skipped += 1;
            continue;
        };
        let Some(asset_type) = entry.get("assetTypeId").and_then(Value::as_u64) else {
            parsed.skipped += 1;
            continue;
        };

        parsed.triples.push(DiscoveredAsset {
            asset_id,
            asset_type: asset_type as u32,
            cdn_location: location.to_string(),
        });
    }
    Ok(parsed)
}

/// Asset ids arrive as JSON numbers or numeric strings.
fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
