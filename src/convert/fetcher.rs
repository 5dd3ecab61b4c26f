// Delivery-API client used by conversion workers, plus texture-pack
// manifest parsing.

use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::FETCH_TIMEOUT;
use crate::error::{Error, Result};

/// Source of converted asset representations. Production fetches from
/// the delivery API; tests substitute a fake.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the delivery representation of an asset by id.
    async fn fetch_asset(&self, asset_id: u64) -> Result<Bytes>;

    /// URL recorded as the source of a fetched asset.
    fn asset_url(&self, asset_id: u64) -> String;
}

/// Reqwest-backed fetcher. One client per fetcher so workers reuse
/// pooled connections across calls.
pub struct DeliveryApiSource {
    client: Client,
    base_url: String,
}

impl DeliveryApiSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::ConversionFailure(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('?').to_string(),
        })
    }
}

#[async_trait]
impl AssetSource for DeliveryApiSource {
    async fn fetch_asset(&self, asset_id: u64) -> Result<Bytes> {
        let url = self.asset_url(asset_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::ConversionFailure(format!("fetch {}: {}", asset_id, e)))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("delivery fetch {} failed: HTTP {}", asset_id, status.as_u16());
            return Err(Error::ConversionFailure(format!(
                "fetch {}: HTTP {}",
                asset_id,
                status.as_u16()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::ConversionFailure(format!("fetch {}: {}", asset_id, e)))?;
        debug!("delivery fetch {}: {} bytes", asset_id, bytes.len());
        Ok(bytes)
    }

    fn asset_url(&self, asset_id: u64) -> String {
        format!("{}?id={}", self.base_url, asset_id)
    }
}

/// Extract the constituent sub-asset ids referenced by a texture-pack
/// manifest. References appear as `id=<digits>` inside text nodes of
/// the XML document. Order is preserved, duplicates dropped.
pub fn parse_manifest_asset_ids(xml: &[u8]) -> Vec<u64> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut ids = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(text)) => {
                if let Ok(text) = text.unescape() {
                    collect_id_refs(&text, &mut ids);
                }
            }
            Ok(Event::CData(cdata)) => {
                collect_id_refs(&String::from_utf8_lossy(cdata.as_ref()), &mut ids);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("texture-pack manifest unparseable past offset {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    ids
}

fn collect_id_refs(text: &str, ids: &mut Vec<u64>) {
    let mut rest = text;
    while let Some(pos) = rest.find("id=") {
        rest = &rest[pos + 3..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(id) = digits.parse::<u64>() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
}
