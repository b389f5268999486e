use crate::config::endpoint;
use crate::error::ServiceError;
use crate::models::ScoredChunk;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const INSTRUCTIONS: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Fills the fixed prompt template with the retrieved chunk texts and the question.
pub fn build_prompt(question: &str, context: &[ScoredChunk]) -> String {
    let context = context
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{INSTRUCTIONS}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}

#[async_trait]
pub trait Generator {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Client for an Ollama-compatible `/api/generate` endpoint, non-streaming.
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let url = endpoint(&self.base_url, "/api/generate")?;
        debug!(%url, model = %self.model, prompt_chars = prompt.len(), "requesting completion");

        let response = self
            .client
            .post(url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::BackendResponse {
                backend: "ollama".to_string(),
                details: format!("generate request returned {status}: {body}"),
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.response.trim().to_string())
    }
}
