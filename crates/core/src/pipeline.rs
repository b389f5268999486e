use crate::chunking::{chunk_document, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::{RagError, ServiceError};
use crate::extractor::load_document;
use crate::generator::{build_prompt, Generator};
use crate::models::{Answer, Document, IngestReport, ScoredChunk, StoreStats, StoredRecord};
use crate::store::VectorStore;
use chrono::Utc;
use std::path::Path;
use tracing::info;

pub const DEFAULT_NUM_RESULTS: usize = 4;

/// Sequences the ingest path (load, split, embed, store) and the query path
/// (embed, search, prompt, generate). Every step is awaited in turn.
pub struct RagPipeline<E, S, G>
where
    E: Embedder,
    S: VectorStore,
    G: Generator,
{
    embedder: E,
    store: S,
    generator: G,
    chunking: ChunkingConfig,
}

impl<E, S, G> RagPipeline<E, S, G>
where
    E: Embedder + Send + Sync,
    S: VectorStore + Send + Sync,
    G: Generator + Send + Sync,
{
    pub fn new(embedder: E, store: S, generator: G) -> Self {
        Self {
            embedder,
            store,
            generator,
            chunking: ChunkingConfig::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport, RagError> {
        let document = load_document(path)?;
        self.ingest_document(&document).await
    }

    pub async fn ingest_document(&self, document: &Document) -> Result<IngestReport, RagError> {
        let chunks = chunk_document(document, self.chunking, Utc::now())?;
        let source = document.source_name().unwrap_or_default();
        info!(source = %source, pages = document.pages.len(), chunk_count = chunks.len(), "embedding chunks");

        let texts = chunks
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect::<Vec<_>>();
        let vectors = self.embedder.embed_documents(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(ServiceError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                vectors.len(),
                chunks.len()
            ))
            .into());
        }

        let records = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| StoredRecord { vector, chunk })
            .collect::<Vec<_>>();
        let chunk_count = records.len();
        self.store.add(records).await?;

        info!(source = %source, chunk_count, "stored chunks");
        Ok(IngestReport {
            source,
            pages: document.pages.len(),
            chunks: chunk_count,
        })
    }

    /// The `k` stored chunks closest to `question`.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        if question.trim().is_empty() {
            return Err(ServiceError::Request("question is empty".to_string()).into());
        }

        let query_vector = self.embedder.embed_query(question).await?;
        let mut hits = self.store.search(&query_vector, k).await?;
        hits.truncate(k);
        Ok(hits)
    }

    pub async fn query(&self, question: &str, k: usize) -> Result<Answer, RagError> {
        let sources = self.retrieve(question, k).await?;
        info!(num_results = k, retrieved = sources.len(), "generating answer");

        let prompt = build_prompt(question, &sources);
        let text = self.generator.generate(&prompt).await?;

        Ok(Answer {
            question: question.to_string(),
            text,
            sources,
        })
    }

    pub async fn list(&self) -> Result<StoreStats, RagError> {
        Ok(self.store.stats().await?)
    }

    pub async fn clear(&self) -> Result<(), RagError> {
        self.store.clear().await?;
        info!("cleared vector store");
        Ok(())
    }
}
