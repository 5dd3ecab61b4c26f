// Bounded worker pool resolving derived formats off the traffic path.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::asset::{AssetKey, TYPE_IMAGE};
use crate::convert::fetcher::{parse_manifest_asset_ids, AssetSource};
use crate::store::cache_store::CacheStore;

const PNG_MAGIC: &[u8] = b"\x89PNG";
const MANIFEST_ROOT_TAG: &[u8] = b"<roblox>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// Decoded-image variant of a compressed texture.
    Png,
    /// Texture-pack manifest plus its constituent sub-textures.
    TextureManifest,
}

impl TargetFormat {
    fn label(self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::TextureManifest => "manifest",
        }
    }
}

/// One queued conversion. Ephemeral: a crash loses in-flight jobs, the
/// raw asset stays cached and conversion is re-triggerable.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub asset_id: u64,
    pub asset_type: u32,
    pub source_url: String,
    pub raw: Bytes,
    pub target: TargetFormat,
}

type JobKey = (u64, u32, TargetFormat);

impl ConversionJob {
    fn key(&self) -> JobKey {
        (self.asset_id, self.asset_type, self.target)
    }

    fn asset_key(&self) -> AssetKey {
        AssetKey::new(self.asset_id, self.asset_type)
    }
}

/// Fixed-size worker pool over an unbounded, deduplicated job queue.
pub struct ConversionDispatcher {
    store: Arc<CacheStore>,
    source: Arc<dyn AssetSource>,
    tx: Mutex<Option<UnboundedSender<ConversionJob>>>,
    rx: Mutex<Option<UnboundedReceiver<ConversionJob>>>,
    inflight: Arc<Mutex<HashSet<JobKey>>>,
    cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ConversionDispatcher {
    pub fn new(store: Arc<CacheStore>, source: Arc<dyn AssetSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            source,
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            inflight: Arc::new(Mutex::new(HashSet::new())),
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the worker tasks. Must run inside a tokio runtime.
    pub fn start(&self, worker_count: u32) {
        let receiver = match self.rx.lock().take() {
            Some(rx) => rx,
            None => return, // already started
        };
        let shared_rx = Arc::new(tokio::sync::Mutex::new(receiver));

        let mut workers = self.workers.lock();
        for worker_id in 0..worker_count.max(1) {
            let rx = Arc::clone(&shared_rx);
            let store = Arc::clone(&self.store);
            let source = Arc::clone(&self.source);
            let inflight = Arc::clone(&self.inflight);
            let cancel = self.cancel.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    let job = tokio::select! {
                        _ = cancel.cancelled() => break,
                        job = async { rx.lock().await.recv().await } => match job {
                            Some(job) => job,
                            None => break,
                        },
                    };

                    let key = job.key();
                    process_job(&store, source.as_ref(), job).await;
                    inflight.lock().remove(&key);
                }
                debug!("conversion worker {} exited", worker_id);
            }));
        }
        info!("conversion dispatcher started with {} worker(s)", worker_count.max(1));
    }

    /// Queue a job unless the same key is already queued or in flight.
    /// Returns whether the job was accepted.
    pub fn enqueue(&self, job: ConversionJob) -> bool {
        let key = job.key();
        {
            let mut inflight = self.inflight.lock();
            if inflight.contains(&key) {
                debug!("conversion {} {} already in flight", job.asset_key(), job.target.label());
                return false;
            }
            inflight.insert(key);
        }

        let sent = match self.tx.lock().as_ref() {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        };
        if !sent {
            self.inflight.lock().remove(&key);
        }
        sent
    }

    /// Number of jobs queued or in flight.
    pub fn pending(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Signal workers to finish their current job and exit, then await
    /// them. Jobs still queued are dropped, not aborted mid-run.
    pub async fn stop(&self) {
        self.tx.lock().take();
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("conversion worker panicked: {}", e);
            }
        }
        debug!("conversion dispatcher stopped");
    }
}

async fn process_job(store: &CacheStore, source: &dyn AssetSource, job: ConversionJob) {
    match job.target {
        TargetFormat::Png => resolve_png(store, source, &job).await,
        TargetFormat::TextureManifest => resolve_texture_pack(store, source, &job).await,
    }
}

/// Resolve the decoded-image variant of a compressed texture. No
/// automatic retry: a failed fetch only loses the convenience format.
async fn resolve_png(store: &CacheStore, source: &dyn AssetSource, job: &ConversionJob) {
    let key = job.asset_key();

    // The CDN occasionally delivers the decoded image directly.
    let bytes = if job.raw.starts_with(PNG_MAGIC) {
        job.raw.clone()
    } else {
        match source.fetch_asset(job.asset_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("png conversion for {} failed: {}", key, e);
                return;
            }
        }
    };

    if !bytes.starts_with(PNG_MAGIC) {
        warn!("png conversion for {} returned non-PNG data, discarding", key);
        return;
    }

    match store.put_derived(&key, "png", "png", &bytes) {
        Ok(_) => info!("converted {} to PNG ({} bytes)", key, bytes.len()),
        Err(e) => warn!("storing PNG for {} failed: {}", key, e),
    }
}

/// Resolve a texture pack: store its manifest, then fetch every
/// constituent sub-texture not already cached. Per-sub failures are
/// skipped; the job completes regardless.
async fn resolve_texture_pack(store: &CacheStore, source: &dyn AssetSource, job: &ConversionJob) {
    let key = job.asset_key();

    let manifest = match source.fetch_asset(job.asset_id).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("manifest fetch for {} failed: {}", key, e);
            return;
        }
    };

    let head = &manifest[..manifest.len().min(100)];
    if !head.windows(MANIFEST_ROOT_TAG.len()).any(|w| w == MANIFEST_ROOT_TAG) {
        warn!("manifest for {} is not a <roblox> document, discarding", key);
        return;
    }

    if let Err(e) = store.put_derived(&key, "manifest", "xml", &manifest) {
        warn!("storing manifest for {} failed: {}", key, e);
        return;
    }

    let sub_ids = parse_manifest_asset_ids(&manifest);
    let mut resolved = 0;
    for sub_id in &sub_ids {
        let sub_key = AssetKey::new(*sub_id, TYPE_IMAGE);
        if store.contains(&sub_key) {
            resolved += 1;
            continue;
        }
        match source.fetch_asset(*sub_id).await {
            Ok(bytes) => {
                match store.put(*sub_id, TYPE_IMAGE, &bytes, &source.asset_url(*sub_id)) {
                    Ok(_) => resolved += 1,
                    Err(e) => warn!("storing sub-texture {} failed: {}", sub_key, e),
                }
            }
            Err(e) => warn!("sub-texture fetch {} failed: {}", sub_key, e),
        }
    }

    info!(
        "resolved texture pack {}: {}/{} sub-asset(s)",
        key,
        resolved,
        sub_ids.len()
    );
}
