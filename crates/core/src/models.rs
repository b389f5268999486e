use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Text of a single PDF page; `number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub pages: Vec<PageText>,
}

impl Document {
    /// Base file name used as the `source` of every chunk.
    pub fn source_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_index: u64,
    pub ingested_at: DateTime<Utc>,
    #[serde(default)]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(flatten)]
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub sources: Vec<ScoredChunk>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub sources: BTreeSet<String>,
    pub chunk_count: u64,
}

impl StoreStats {
    pub fn document_count(&self) -> usize {
        self.sources.len()
    }
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub source: String,
    pub pages: usize,
    pub chunks: usize,
}
