use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("pdf has no extractable text (scanned or image-only?): {}", .0.display())]
    NoText(PathBuf),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(String),
}

impl ServiceError {
    /// True when the remote endpoint could not be reached at all.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Http(error) => error.is_connect() || error.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl RagError {
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Service(error) if error.is_connection_failure())
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_path() {
        let error = IngestError::NotFound(PathBuf::from("/tmp/missing.pdf"));
        assert_eq!(error.to_string(), "file not found: /tmp/missing.pdf");
    }

    #[test]
    fn backend_errors_are_not_connection_failures() {
        let error = RagError::from(ServiceError::BackendResponse {
            backend: "qdrant".to_string(),
            details: "500".to_string(),
        });
        assert!(!error.is_connection_failure());
        assert_eq!(error.to_string(), "invalid response from qdrant: 500");
    }
}
