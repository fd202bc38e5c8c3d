//! Embedding service: composition, caching, dimension checks

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::cache::content_key;
use super::cache::EmbeddingCache;
use super::client::EmbeddingClient;
use super::client::EmbeddingProvider;
use super::l2_normalize;
use super::text;
use super::MAX_BATCH_SIZE;
use super::MAX_EMBED_CHARS;
use crate::config::AppConfig;
use crate::models::CompanyProfile;
use crate::models::Tender;
use crate::Result;
use crate::TenderMatchError;

/// Service for generating entity embeddings with caching.
pub struct EmbeddingService {
    client: Arc<EmbeddingClient>,
    cache: EmbeddingCache,
    dimension: usize,
    max_description_chars: usize,
}

impl EmbeddingService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = EmbeddingProvider::detect(
            config.embeddings.provider.as_deref(),
            &config.embeddings.endpoint,
        );
        let client = EmbeddingClient::new(
            provider,
            config.embeddings.model.clone(),
            config.embeddings.endpoint.clone(),
            config.embeddings.api_key.clone(),
        )?;

        Ok(Self {
            client: Arc::new(client),
            cache: EmbeddingCache::new(config.embeddings.cache_max_entries),
            dimension: config.embeddings.dimension,
            max_description_chars: config.embeddings.max_description_chars,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a composed text. Hits the cache before the remote call; the
    /// returned vector is L2-normalized and dimension-checked.
    pub async fn embed_text(&self, composed: &str) -> Result<Vec<f32>> {
        self.validate_input(composed)?;

        let key = content_key(self.client.model(), composed);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Embedding cache hit");
            return Ok(cached.as_ref().clone());
        }

        let mut vector = self.client.generate(composed).await?;
        self.check_dimension(&vector)?;
        l2_normalize(&mut vector);

        let stored = self.cache.insert_if_absent(key, vector).await;
        Ok(stored.as_ref().clone())
    }

    /// Embed a batch of composed texts, reporting failure per index.
    pub async fn embed_batch(&self, composed: &[String]) -> Vec<Result<Vec<f32>>> {
        let mut results: Vec<Option<Result<Vec<f32>>>> = Vec::new();
        results.resize_with(composed.len(), || None);

        // Resolve cache hits and invalid inputs first
        let mut pending: Vec<usize> = Vec::new();
        for (i, text) in composed.iter().enumerate() {
            if let Err(e) = self.validate_input(text) {
                results[i] = Some(Err(e));
                continue;
            }
            let key = content_key(self.client.model(), text);
            if let Some(cached) = self.cache.get(&key).await {
                results[i] = Some(Ok(cached.as_ref().clone()));
            } else {
                pending.push(i);
            }
        }

        for chunk in pending.chunks(MAX_BATCH_SIZE) {
            let texts: Vec<&str> = chunk.iter().map(|&i| composed[i].as_str()).collect();
            match self.client.generate_batch(texts).await {
                Ok(vectors) if vectors.len() == chunk.len() => {
                    for (&i, mut vector) in chunk.iter().zip(vectors) {
                        match self.check_dimension(&vector) {
                            Ok(()) => {
                                l2_normalize(&mut vector);
                                let key = content_key(self.client.model(), &composed[i]);
                                let stored = self.cache.insert_if_absent(key, vector).await;
                                results[i] = Some(Ok(stored.as_ref().clone()));
                            }
                            Err(e) => results[i] = Some(Err(e)),
                        }
                    }
                }
                Ok(vectors) => {
                    warn!(
                        "Embedding batch returned {} vectors for {} inputs",
                        vectors.len(),
                        chunk.len()
                    );
                    for &i in chunk {
                        results[i] = Some(Err(TenderMatchError::EmbeddingUpstream(
                            "batch response length mismatch".to_string(),
                        )));
                    }
                }
                Err(e) => {
                    for &i in chunk {
                        results[i] = Some(Err(TenderMatchError::EmbeddingUpstream(e.to_string())));
                    }
                }
            }
        }

        results
            .into_iter()
            .map(|r| {
                r.unwrap_or_else(|| {
                    Err(TenderMatchError::EmbeddingUpstream(
                        "missing batch result".to_string(),
                    ))
                })
            })
            .collect()
    }

    pub async fn embed_tender(&self, tender: &Tender) -> Result<Vec<f32>> {
        let composed = text::tender_text(tender, self.max_description_chars);
        self.embed_text(&composed).await
    }

    pub async fn embed_profile(&self, profile: &CompanyProfile) -> Result<Vec<f32>> {
        let composed = text::profile_text(profile);
        self.embed_text(&composed).await
    }

    fn validate_input(&self, composed: &str) -> Result<()> {
        if composed.trim().is_empty() {
            return Err(TenderMatchError::InvalidEmbeddingInput(
                "empty text".to_string(),
            ));
        }
        if composed.len() > MAX_EMBED_CHARS {
            return Err(TenderMatchError::InvalidEmbeddingInput(format!(
                "text too long: {} chars",
                composed.len()
            )));
        }
        Ok(())
    }

    /// A wrong-dimension vector is an internal invariant violation and must
    /// never be persisted.
    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(TenderMatchError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
