use crate::error::ServiceError;
use url::Url;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_LLM_MODEL: &str = "llama3.2";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
pub const DEFAULT_COLLECTION: &str = "pdf_documents";

/// Addresses and model names for the three backing services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagConfig {
    pub ollama_url: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub qdrant_url: String,
    pub collection: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

/// Joins `path` onto `base`, tolerating a missing or extra trailing slash.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url, ServiceError> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_with_and_without_trailing_slash() -> Result<(), ServiceError> {
        assert_eq!(
            endpoint("http://localhost:11434", "/api/embed")?.as_str(),
            "http://localhost:11434/api/embed"
        );
        assert_eq!(
            endpoint("http://proxy/ollama/", "api/generate")?.as_str(),
            "http://proxy/ollama/api/generate"
        );
        Ok(())
    }

    #[test]
    fn malformed_base_is_rejected() {
        assert!(matches!(
            endpoint("not a url", "/api/embed"),
            Err(ServiceError::Url(_))
        ));
    }
}
