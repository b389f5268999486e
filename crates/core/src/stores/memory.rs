use crate::error::ServiceError;
use crate::models::{ScoredChunk, StoreStats, StoredRecord};
use crate::store::VectorStore;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Process-local store; contents are lost when the process exits.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn add(&self, records: Vec<StoredRecord>) -> Result<(), ServiceError> {
        self.records.write().await.extend(records);
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, ServiceError> {
        let records = self.records.read().await;

        let mut scored = Vec::with_capacity(records.len());
        for record in records.iter() {
            if record.vector.len() != query_vector.len() {
                return Err(ServiceError::Request(format!(
                    "query vector dim {} is not {}",
                    query_vector.len(),
                    record.vector.len()
                )));
            }
            scored.push(ScoredChunk {
                chunk: record.chunk.clone(),
                score: cosine_similarity(query_vector, &record.vector),
            });
        }

        // stable: equal scores keep insertion order
        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn stats(&self) -> Result<StoreStats, ServiceError> {
        let records = self.records.read().await;
        Ok(StoreStats {
            sources: records
                .iter()
                .map(|record| record.chunk.metadata.source.clone())
                .collect(),
            chunk_count: records.len() as u64,
        })
    }

    async fn clear(&self) -> Result<(), ServiceError> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ChunkMetadata};
    use chrono::Utc;

    fn record(source: &str, index: u64, vector: Vec<f32>) -> StoredRecord {
        StoredRecord {
            vector,
            chunk: Chunk {
                text: format!("{source} chunk {index}"),
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    chunk_index: index,
                    ingested_at: Utc::now(),
                    page: Some(1),
                },
            },
        }
    }

    #[tokio::test]
    async fn search_returns_nearest_first_and_respects_k() -> Result<(), ServiceError> {
        let store = InMemoryStore::new();
        store
            .add(vec![
                record("a.pdf", 0, vec![0.0, 1.0]),
                record("a.pdf", 1, vec![1.0, 0.0]),
                record("b.pdf", 0, vec![0.7, 0.7]),
            ])
            .await?;

        let hits = store.search(&[1.0, 0.0], 2).await?;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "a.pdf chunk 1");
        assert_eq!(hits[1].chunk.text, "b.pdf chunk 0");
        assert!(hits[0].score >= hits[1].score);

        assert!(store.search(&[1.0, 0.0], 0).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() -> Result<(), ServiceError> {
        let store = InMemoryStore::new();
        store
            .add(vec![
                record("first.pdf", 0, vec![1.0, 0.0]),
                record("second.pdf", 0, vec![2.0, 0.0]),
            ])
            .await?;

        let hits = store.search(&[1.0, 0.0], 2).await?;
        assert_eq!(hits[0].chunk.metadata.source, "first.pdf");
        assert_eq!(hits[1].chunk.metadata.source, "second.pdf");
        Ok(())
    }

    #[tokio::test]
    async fn duplicates_are_kept_and_counted() -> Result<(), ServiceError> {
        let store = InMemoryStore::new();
        store.add(vec![record("a.pdf", 0, vec![1.0])]).await?;
        store.add(vec![record("a.pdf", 0, vec![1.0])]).await?;

        let stats = store.stats().await?;
        assert_eq!(stats.chunk_count, 2);
        assert_eq!(stats.document_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn clear_empties_the_store() -> Result<(), ServiceError> {
        let store = InMemoryStore::new();
        store.add(vec![record("a.pdf", 0, vec![1.0])]).await?;
        store.clear().await?;
        assert_eq!(store.stats().await?, StoreStats::default());
        Ok(())
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected() -> Result<(), ServiceError> {
        let store = InMemoryStore::new();
        store.add(vec![record("a.pdf", 0, vec![1.0, 0.0])]).await?;
        assert!(matches!(
            store.search(&[1.0], 1).await,
            Err(ServiceError::Request(_))
        ));
        Ok(())
    }
}
