pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod stores;

pub use chunking::{
    chunk_document, normalize_whitespace, split_text, ChunkingConfig, CHUNK_OVERLAP, CHUNK_SIZE,
};
pub use config::{
    RagConfig, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL, DEFAULT_OLLAMA_URL,
    DEFAULT_QDRANT_URL,
};
pub use embeddings::{Embedder, OllamaEmbedder};
pub use error::{IngestError, RagError, ServiceError};
pub use extractor::{load_document, load_document_with, LopdfExtractor, PdfExtractor};
pub use generator::{build_prompt, Generator, OllamaGenerator};
pub use models::{
    Answer, Chunk, ChunkMetadata, Document, IngestReport, PageText, ScoredChunk, StoreStats,
    StoredRecord,
};
pub use pipeline::{RagPipeline, DEFAULT_NUM_RESULTS};
pub use store::{connect, connect_or_create, StoreBackend, VectorStore};
pub use stores::{InMemoryStore, QdrantStore};
