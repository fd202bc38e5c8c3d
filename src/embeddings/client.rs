//! HTTP clients for external embedding providers

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::errors::Result;
use crate::TenderMatchError;

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// OpenAI-compatible embeddings API
    OpenAI,
    /// Ollama local embeddings
    Ollama,
}

impl EmbeddingProvider {
    /// Detect the provider from config, falling back to the endpoint shape.
    pub fn detect(provider: Option<&str>, endpoint: &str) -> Self {
        match provider.map(str::to_lowercase).as_deref() {
            Some("openai") => Self::OpenAI,
            Some("ollama") => Self::Ollama,
            _ => {
                if endpoint.contains("openai") {
                    Self::OpenAI
                } else {
                    Self::Ollama
                }
            }
        }
    }
}

/// Client for generating embeddings from an external model service
pub struct EmbeddingClient {
    provider: EmbeddingProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl EmbeddingClient {
    pub fn new(
        provider: EmbeddingProvider,
        model: String,
        endpoint: String,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| TenderMatchError::HttpError(e.to_string()))?;

        Ok(Self {
            provider,
            model,
            endpoint,
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate an embedding for a single text
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        match self.provider {
            EmbeddingProvider::OpenAI => self.generate_openai(text).await,
            EmbeddingProvider::Ollama => self.generate_ollama(text).await,
        }
    }

    /// Generate embeddings for multiple texts. Ollama has no batch endpoint,
    /// so texts go through sequentially there.
    pub async fn generate_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        match self.provider {
            EmbeddingProvider::OpenAI => self.generate_batch_openai(texts).await,
            EmbeddingProvider::Ollama => {
                let mut embeddings = Vec::with_capacity(texts.len());
                for text in texts {
                    embeddings.push(self.generate_ollama(text).await?);
                }
                Ok(embeddings)
            }
        }
    }

    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            input: &'a str,
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling embeddings API: {}", url);

        let request = OpenAIRequest {
            input: text,
            model: &self.model,
        };

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request);

        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TenderMatchError::EmbeddingUpstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_upstream_error(status, error_text));
        }

        let result: OpenAIResponse = response.json().await.map_err(|e| {
            TenderMatchError::EmbeddingUpstream(format!("Failed to parse response: {e}"))
        })?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                TenderMatchError::EmbeddingUpstream("No embedding in response".to_string())
            })
    }

    async fn generate_batch_openai(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct OpenAIBatchRequest<'a> {
            input: Vec<&'a str>,
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling batch embeddings API: {} items", texts.len());

        let request = OpenAIBatchRequest {
            input: texts,
            model: &self.model,
        };

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request);

        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TenderMatchError::EmbeddingUpstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_upstream_error(status, error_text));
        }

        let result: OpenAIResponse = response.json().await.map_err(|e| {
            TenderMatchError::EmbeddingUpstream(format!("Failed to parse response: {e}"))
        })?;

        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| TenderMatchError::EmbeddingUpstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_upstream_error(status, error_text));
        }

        let result: OllamaResponse = response.json().await.map_err(|e| {
            TenderMatchError::EmbeddingUpstream(format!("Failed to parse response: {e}"))
        })?;

        Ok(result.embedding)
    }
}

/// 4xx means the input itself was rejected and a retry cannot help; anything
/// else counts as a transient upstream failure.
fn classify_upstream_error(status: reqwest::StatusCode, body: String) -> TenderMatchError {
    if status.is_client_error() {
        TenderMatchError::InvalidEmbeddingInput(format!("upstream rejected input ({status}): {body}"))
    } else {
        TenderMatchError::EmbeddingUpstream(format!("upstream error ({status}): {body}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_detection_prefers_explicit_config() {
        let provider = EmbeddingProvider::detect(Some("openai"), "http://localhost:11434");
        assert_eq!(provider, EmbeddingProvider::OpenAI);
    }

    #[test]
    fn test_provider_detection_from_endpoint() {
        assert_eq!(
            EmbeddingProvider::detect(None, "https://api.openai.com/v1"),
            EmbeddingProvider::OpenAI
        );
        assert_eq!(
            EmbeddingProvider::detect(None, "http://localhost:11434"),
            EmbeddingProvider::Ollama
        );
    }

    #[test]
    fn test_upstream_error_classification() {
        let invalid = classify_upstream_error(reqwest::StatusCode::BAD_REQUEST, String::new());
        assert!(!invalid.is_retriable());

        let transient =
            classify_upstream_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, String::new());
        assert!(transient.is_retriable());
    }
}
