use crate::config::RagConfig;
use crate::error::ServiceError;
use crate::models::{ScoredChunk, StoreStats, StoredRecord};
use crate::stores::{InMemoryStore, QdrantStore};
use async_trait::async_trait;
use tracing::{info, warn};

#[async_trait]
pub trait VectorStore {
    /// Appends records; identical content is stored again, never merged.
    async fn add(&self, records: Vec<StoredRecord>) -> Result<(), ServiceError>;

    /// The `k` nearest records by similarity, best first.
    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, ServiceError>;

    /// Distinct sources and the exact number of stored records.
    async fn stats(&self) -> Result<StoreStats, ServiceError>;

    async fn clear(&self) -> Result<(), ServiceError>;
}

/// The store selected at connect time: the remote collection, or a
/// process-local fallback when the remote one cannot be attached.
pub enum StoreBackend {
    Remote(QdrantStore),
    InMemory(InMemoryStore),
}

impl StoreBackend {
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Remote(store) => format!("qdrant collection {}", store.collection()),
            Self::InMemory(_) => "in-memory store".to_string(),
        }
    }
}

/// Attaches to the existing collection, falling back to memory on any failure.
pub async fn connect(config: &RagConfig) -> StoreBackend {
    let store = QdrantStore::new(&config.qdrant_url, &config.collection);
    match store.attach().await {
        Ok(()) => {
            info!(url = %config.qdrant_url, collection = %config.collection, "attached to vector store");
            StoreBackend::Remote(store)
        }
        Err(error) => fall_back(config, &error),
    }
}

/// Like [`connect`], but a reachable service without the collection is
/// still used: the collection is created on the first write.
pub async fn connect_or_create(config: &RagConfig) -> StoreBackend {
    let store = QdrantStore::new(&config.qdrant_url, &config.collection);
    match store.exists().await {
        Ok(true) => {
            info!(url = %config.qdrant_url, collection = %config.collection, "attached to vector store");
            StoreBackend::Remote(store)
        }
        Ok(false) => {
            info!(
                url = %config.qdrant_url,
                collection = %config.collection,
                "collection missing, it will be created on first write"
            );
            StoreBackend::Remote(store.with_create_missing())
        }
        Err(error) => fall_back(config, &error),
    }
}

fn fall_back(config: &RagConfig, error: &ServiceError) -> StoreBackend {
    warn!(
        url = %config.qdrant_url,
        collection = %config.collection,
        %error,
        "vector store unavailable, using in-memory store for this run"
    );
    StoreBackend::InMemory(InMemoryStore::default())
}

#[async_trait]
impl VectorStore for StoreBackend {
    async fn add(&self, records: Vec<StoredRecord>) -> Result<(), ServiceError> {
        match self {
            Self::Remote(store) => store.add(records).await,
            Self::InMemory(store) => store.add(records).await,
        }
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, ServiceError> {
        match self {
            Self::Remote(store) => store.search(query_vector, k).await,
            Self::InMemory(store) => store.search(query_vector, k).await,
        }
    }

    async fn stats(&self) -> Result<StoreStats, ServiceError> {
        match self {
            Self::Remote(store) => store.stats().await,
            Self::InMemory(store) => store.stats().await,
        }
    }

    async fn clear(&self) -> Result<(), ServiceError> {
        match self {
            Self::Remote(store) => store.clear().await,
            Self::InMemory(store) => store.clear().await,
        }
    }
}
