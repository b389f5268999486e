use crate::error::{IngestError, Result};
use crate::models::{Chunk, ChunkMetadata, Document};
use chrono::{DateTime, Utc};

pub const CHUNK_SIZE: usize = 1_000;
pub const CHUNK_OVERLAP: usize = 200;

/// Character-window splitting parameters. Sizes count `char`s, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: CHUNK_SIZE,
            overlap_chars: CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap_chars >= max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {overlap_chars} must be smaller than chunk size {max_chars}"
            )));
        }

        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }

    fn stride(&self) -> usize {
        self.max_chars - self.overlap_chars
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits `text` into windows of at most `max_chars`, each starting
/// `max_chars - overlap_chars` after the previous one.
pub fn split_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + config.max_chars).min(chars.len());
        pieces.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += config.stride();
    }

    pieces
}

/// Splits every page of `document` and tags the pieces with the document's
/// base name, a document-wide sequential index, the page number and
/// `ingested_at`.
pub fn chunk_document(
    document: &Document,
    config: ChunkingConfig,
    ingested_at: DateTime<Utc>,
) -> Result<Vec<Chunk>> {
    let source = document
        .source_name()
        .ok_or_else(|| IngestError::MissingFileName(document.path.display().to_string()))?;

    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for page in &document.pages {
        for text in split_text(&page.text, config) {
            chunks.push(Chunk {
                text,
                metadata: ChunkMetadata {
                    source: source.clone(),
                    chunk_index: cursor,
                    ingested_at,
                    page: Some(page.number),
                },
            });
            cursor = cursor.saturating_add(1);
        }
    }

    Ok(chunks)
}
