//! Backfill embeddings for tenders that do not have one yet

use std::sync::Arc;

use tracing::info;
use tracing::warn;

use super::generator::EmbeddingService;
use super::text;
use crate::database::Database;
use crate::errors::Result;

#[derive(Debug, Default, Clone)]
pub struct BackfillStats {
    pub scanned: usize,
    pub embedded: usize,
    pub failed: usize,
}

/// Embed all published tenders missing a vector, in batches.
///
/// Per-tender failures are logged and skipped; the run keeps going.
pub async fn backfill_tender_embeddings(
    db: Arc<Database>,
    embedding_service: Arc<EmbeddingService>,
    batch_size: usize,
    max_description_chars: usize,
) -> Result<BackfillStats> {
    info!("Starting tender embeddings backfill");

    let mut stats = BackfillStats::default();
    let batch_size = batch_size.clamp(1, super::MAX_BATCH_SIZE);

    loop {
        let tenders = db.tenders_missing_embedding(batch_size as i64).await?;
        if tenders.is_empty() {
            break;
        }
        stats.scanned += tenders.len();

        let composed: Vec<String> = tenders
            .iter()
            .map(|t| text::tender_text(t, max_description_chars))
            .collect();

        let results = embedding_service.embed_batch(&composed).await;

        let mut embedded_this_round = 0;
        for (tender, result) in tenders.iter().zip(results) {
            match result {
                Ok(vector) => {
                    db.upsert_tender_embedding(tender.id, &vector).await?;
                    stats.embedded += 1;
                    embedded_this_round += 1;
                }
                Err(e) => {
                    warn!("Failed to embed tender {}: {}", tender.id, e);
                    stats.failed += 1;
                }
            }
        }

        // Every tender in the batch failed: stop instead of spinning on the
        // same rows forever.
        if embedded_this_round == 0 {
            warn!("No tenders embedded in this batch, stopping backfill");
            break;
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }

    info!(
        "Backfill complete: {} scanned, {} embedded, {} failed",
        stats.scanned, stats.embedded, stats.failed
    );

    Ok(stats)
}
