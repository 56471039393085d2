use rating_core::{Settings, StoreBackend, TripleStore};
use rating_graph::{MemoryStore, RatingPipeline, SparqlStore};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RatingPipeline>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> rating_core::Result<Self> {
        let store: Arc<dyn TripleStore> = match settings.store.backend {
            StoreBackend::Sparql => {
                info!("Using SPARQL endpoint {}", settings.store.endpoint);
                Arc::new(SparqlStore::from_config(&settings.store)?)
            }
            StoreBackend::Memory => {
                warn!("Using in-memory store, averages will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::with_store(store, settings))
    }

    pub fn with_store(store: Arc<dyn TripleStore>, settings: Settings) -> Self {
        let pipeline = RatingPipeline::new(store, settings.vocabulary.clone())
            .with_max_concurrency(settings.pipeline.max_concurrency);
        Self {
            pipeline: Arc::new(pipeline),
            settings: Arc::new(settings),
        }
    }
}
