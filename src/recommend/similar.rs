//! Similar-tender lookup by reference document
//!
//! Nearest-neighbor retrieval over the tender vectors, annotated with the
//! keyword overlap between the reference and each hit.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::database::Database;
use crate::models::Tender;
use crate::Result;
use crate::TenderMatchError;

/// Cap on annotated common keywords per item.
pub const MAX_COMMON_KEYWORDS: usize = 10;

/// Tokens too generic to be informative as overlap annotations.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "bid", "bids", "by", "for", "from", "in", "into",
    "is", "it", "its", "of", "on", "or", "over", "per", "procurement", "supply", "tender", "that",
    "the", "their", "this", "to", "under", "with",
];

/// One similar-tender result row.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarTender {
    pub tender: Tender,
    /// round(100 x cosine), clipped to [0, 100].
    pub similarity_score: i32,
    pub common_keywords: Vec<String>,
    pub days_until_deadline: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarTendersResponse {
    pub ref_id: Uuid,
    pub items: Vec<SimilarTender>,
}

pub struct SimilarService {
    db: Arc<Database>,
}

impl SimilarService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Nearest neighbors of a reference tender among published tenders.
    pub async fn similar(&self, tender_id: Uuid, limit: usize) -> Result<SimilarTendersResponse> {
        let limit = limit.clamp(1, 20);

        let reference = self
            .db
            .get_tender(tender_id)
            .await?
            .ok_or(TenderMatchError::TenderNotFound(tender_id))?;

        let reference_embedding = self
            .db
            .get_tender_embedding(tender_id)
            .await?
            .ok_or(TenderMatchError::ReferenceNotEmbedded(tender_id))?;

        let today = Utc::now().date_naive();
        let candidates = self
            .db
            .knn_similar_tenders(tender_id, &reference_embedding, limit as i64, today)
            .await?;

        debug!(
            "Similar lookup for {}: {} candidates",
            tender_id,
            candidates.len()
        );

        let reference_tokens = keyword_tokens(&reference.title, &reference.highlights);

        let items = candidates
            .into_iter()
            .map(|candidate| {
                let tokens = keyword_tokens(&candidate.tender.title, &candidate.tender.highlights);
                let common_keywords = common_keywords(&reference_tokens, &tokens);
                let days_until_deadline = candidate.tender.days_until_deadline(today);
                SimilarTender {
                    similarity_score: similarity_points(candidate.similarity),
                    common_keywords,
                    days_until_deadline,
                    tender: candidate.tender,
                }
            })
            .collect();

        Ok(SimilarTendersResponse {
            ref_id: tender_id,
            items,
        })
    }
}

/// round(100 x cosine), clipped into [0, 100].
pub fn similarity_points(cosine: f32) -> i32 {
    ((f64::from(cosine) * 100.0).round() as i32).clamp(0, 100)
}

/// Case-folded, stop-word-filtered tokens from a tender's title and
/// highlights. BTreeSet keeps the order deterministic.
pub fn keyword_tokens(title: &str, highlights: &[String]) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();

    let mut add_from = |text: &str| {
        for word in text.split(|c: char| !c.is_alphanumeric()) {
            let token = word.to_lowercase();
            if token.len() >= 3 && !STOP_WORDS.contains(&token.as_str()) {
                tokens.insert(token);
            }
        }
    };

    add_from(title);
    for highlight in highlights {
        add_from(highlight);
    }

    tokens
}

/// Intersection of two token sets, capped.
pub fn common_keywords(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Vec<String> {
    a.intersection(b)
        .take(MAX_COMMON_KEYWORDS)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_points_rounds_and_clips() {
        assert_eq!(similarity_points(0.824), 82);
        assert_eq!(similarity_points(1.2), 100);
        assert_eq!(similarity_points(-0.3), 0);
    }

    #[test]
    fn test_keyword_tokens_filter_stop_words() {
        let tokens = keyword_tokens(
            "Supply of laboratory reagents for the regional hospital",
            &["cold chain storage".to_string()],
        );
        assert!(tokens.contains("laboratory"));
        assert!(tokens.contains("reagents"));
        assert!(tokens.contains("cold"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("of"));
        assert!(!tokens.contains("supply"));
    }

    #[test]
    fn test_common_keywords_capped_and_sorted() {
        let a: BTreeSet<String> = (0..20).map(|i| format!("token{i:02}")).collect();
        let b = a.clone();
        let common = common_keywords(&a, &b);
        assert_eq!(common.len(), MAX_COMMON_KEYWORDS);
        let mut sorted = common.clone();
        sorted.sort();
        assert_eq!(common, sorted);
    }

    #[test]
    fn test_common_keywords_intersection() {
        let a = keyword_tokens("Cloud ERP rollout", &[]);
        let b = keyword_tokens("ERP system maintenance", &[]);
        let common = common_keywords(&a, &b);
        assert_eq!(common, vec!["erp".to_string()]);
    }
}
