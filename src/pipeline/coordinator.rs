// Pipeline wiring and lifecycle — owns the shared maps, the store
// handle, and the conversion queue.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::config::EngineConfig;
use crate::convert::dispatcher::ConversionDispatcher;
use crate::convert::fetcher::{AssetSource, DeliveryApiSource};
use crate::error::Result;
use crate::pipeline::batch::BatchInterceptor;
use crate::pipeline::capture::CdnCaptureInterceptor;
use crate::pipeline::tracking::TrackingMap;
use crate::store::cache_store::CacheStore;
use crate::traffic::{HttpExchange, Interceptor};

/// Wires the discovery and capture interceptors, in that fixed order,
/// into the traffic-processing stage. Downstream consumers (asset
/// replacement) register strictly after the built-ins so replacement
/// never mutates what gets cached.
pub struct Pipeline {
    config: EngineConfig,
    store: Arc<CacheStore>,
    tracking: Arc<TrackingMap>,
    dispatcher: Arc<ConversionDispatcher>,
    interceptors: RwLock<Vec<Arc<dyn Interceptor>>>,
}

impl Pipeline {
    /// Build a pipeline with the given conversion source.
    pub fn new(config: EngineConfig, source: Arc<dyn AssetSource>) -> Result<Self> {
        let store = Arc::new(CacheStore::open(
            &config.storage_root,
            config.compression_threshold,
        )?);
        let tracking = Arc::new(TrackingMap::new(config.tracked_ttl()));
        let dispatcher = Arc::new(ConversionDispatcher::new(Arc::clone(&store), source));

        // Discovery registers URLs before capture consumes them.
        let batch = BatchInterceptor::new(Arc::clone(&tracking), &config);
        let capture = CdnCaptureInterceptor::new(
            Arc::clone(&tracking),
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            &config,
        );
        let interceptors: Vec<Arc<dyn Interceptor>> =
            vec![Arc::new(batch), Arc::new(capture)];

        Ok(Self {
            config,
            store,
            tracking,
            dispatcher,
            interceptors: RwLock::new(interceptors),
        })
    }

    /// Build a pipeline fetching conversions from the configured
    /// delivery API.
    pub fn with_delivery_api(config: EngineConfig) -> Result<Self> {
        let source = Arc::new(DeliveryApiSource::new(&config.conversion_api)?);
        Self::new(config, source)
    }

    /// Append a downstream interceptor. It runs after the capture stage
    /// on every traffic-processing cycle.
    pub fn register(&self, interceptor: Arc<dyn Interceptor>) {
        info!("registered interceptor {}", interceptor.name());
        self.interceptors.write().push(interceptor);
    }

    /// Invoked by the traffic layer for every completed exchange.
    /// Interceptors run in registration order and absorb their own
    /// failures.
    pub fn process_response(&self, exchange: &HttpExchange) {
        let interceptors = self.interceptors.read().clone();
        for interceptor in &interceptors {
            interceptor.on_response(exchange);
        }
    }

    /// Spawn the conversion workers. Must run inside a tokio runtime.
    pub fn start(&self) {
        self.dispatcher.start(self.config.worker_count);
        info!("capture pipeline started");
    }

    /// Drain in-flight conversion work and stop the workers.
    pub async fn stop(&self) {
        self.dispatcher.stop().await;
        self.tracking.clear();
        info!("capture pipeline stopped");
    }

    pub fn store(&self) -> Arc<CacheStore> {
        Arc::clone(&self.store)
    }

    pub fn dispatcher(&self) -> Arc<ConversionDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Number of assets currently tracked for capture.
    pub fn tracked_count(&self) -> usize {
        self.tracking.len()
    }
}
