use crate::config::endpoint;
use crate::error::ServiceError;
use crate::models::{Chunk, ScoredChunk, StoreStats, StoredRecord};
use crate::store::VectorStore;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::debug;
use url::Url;
use uuid::Uuid;

const SCROLL_PAGE_SIZE: usize = 256;

/// A single Qdrant collection accessed over the REST API.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    create_missing: bool,
}

impl QdrantStore {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::new(),
            create_missing: false,
        }
    }

    /// Creates the collection on the first write if it does not exist yet.
    pub fn with_create_missing(mut self) -> Self {
        self.create_missing = true;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn url(&self, suffix: &str) -> Result<Url, ServiceError> {
        endpoint(
            &self.endpoint,
            &format!("/collections/{}{}", self.collection, suffix),
        )
    }

    fn url_wait(&self, suffix: &str) -> Result<Url, ServiceError> {
        let mut url = self.url(suffix)?;
        url.query_pairs_mut().append_pair("wait", "true");
        Ok(url)
    }

    /// Whether the collection exists; `Err` when the service cannot answer.
    pub async fn exists(&self) -> Result<bool, ServiceError> {
        let response = self.client.get(self.url("")?).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response, "collection lookup").await?;
        Ok(true)
    }

    /// Succeeds only when the collection already exists.
    pub async fn attach(&self) -> Result<(), ServiceError> {
        if self.exists().await? {
            Ok(())
        } else {
            Err(ServiceError::BackendResponse {
                backend: "qdrant".to_string(),
                details: format!("collection {} does not exist", self.collection),
            })
        }
    }

    /// Creates the collection with cosine distance unless it already exists.
    pub async fn ensure_collection(&self, vector_size: usize) -> Result<(), ServiceError> {
        if self.exists().await? {
            return Ok(());
        }

        debug!(collection = %self.collection, vector_size, "creating collection");
        let response = self
            .client
            .put(self.url("")?)
            .json(&json!({
                "vectors": {
                    "size": vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;
        check(response, "collection create").await?;
        Ok(())
    }
}

async fn check(response: Response, action: &str) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::BackendResponse {
        backend: "qdrant".to_string(),
        details: format!("{action} returned {status}: {body}"),
    })
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add(&self, records: Vec<StoredRecord>) -> Result<(), ServiceError> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        if self.create_missing {
            self.ensure_collection(first.vector.len()).await?;
        }

        let points = records
            .iter()
            .map(|record| -> Result<Value, ServiceError> {
                Ok(json!({
                    "id": Uuid::new_v4().to_string(),
                    "vector": record.vector,
                    "payload": serde_json::to_value(&record.chunk)?,
                }))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(collection = %self.collection, points = points.len(), "upserting points");
        let response = self
            .client
            .put(self.url_wait("/points")?)
            .json(&json!({ "points": points }))
            .send()
            .await?;
        check(response, "upsert").await?;
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, ServiceError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.url("/points/search")?)
            .json(&json!({
                "vector": query_vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        let parsed: Value = check(response, "search").await?.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::with_capacity(hits.len());
        for hit in hits.into_iter().take(k) {
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            let payload = hit.get("payload").cloned().unwrap_or(Value::Null);
            let chunk: Chunk = serde_json::from_value(payload)?;
            result.push(ScoredChunk { chunk, score });
        }

        Ok(result)
    }

    async fn stats(&self) -> Result<StoreStats, ServiceError> {
        let mut stats = StoreStats {
            sources: BTreeSet::new(),
            chunk_count: 0,
        };
        let mut offset = Value::Null;

        loop {
            let response = self
                .client
                .post(self.url("/points/scroll")?)
                .json(&json!({
                    "limit": SCROLL_PAGE_SIZE,
                    "offset": offset,
                    "with_payload": ["source"],
                    "with_vector": false,
                }))
                .send()
                .await?;

            let parsed: Value = check(response, "scroll").await?.json().await?;
            let points = parsed
                .pointer("/result/points")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            stats.chunk_count += points.len() as u64;
            stats.sources.extend(points.iter().filter_map(|point| {
                point
                    .pointer("/payload/source")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }));

            offset = parsed
                .pointer("/result/next_page_offset")
                .cloned()
                .unwrap_or(Value::Null);
            if offset.is_null() || points.is_empty() {
                break;
            }
        }

        Ok(stats)
    }

    async fn clear(&self) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(self.url_wait("/points/delete")?)
            .json(&json!({ "filter": {} }))
            .send()
            .await?;
        check(response, "delete").await?;
        Ok(())
    }
}
