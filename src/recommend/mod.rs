//! Recommendation core: candidate scoring, ranking and explanation
//!
//! The matcher fuses three signals: cosine similarity between the profile
//! and tender embeddings, structured rule matching over sectors, regions,
//! budget and deadlines, and a behavioral popularity signal learned from
//! interactions. Every returned item carries the reasons that produced its
//! score.

pub mod matcher;
pub mod popularity;
pub mod rule_scorer;
pub mod similar;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::models::Tender;
use crate::Result;
use crate::TenderMatchError;

pub use matcher::Matcher;
pub use popularity::PopularityIndex;
pub use rule_scorer::DimensionShares;
pub use rule_scorer::RuleScorer;
pub use similar::SimilarService;
pub use similar::SimilarTender;
pub use similar::SimilarTendersResponse;

/// Maximum reasons attached to a single recommendation.
pub const MAX_REASONS_PER_ITEM: usize = 6;

/// One explanation token with its contribution in points.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReason {
    /// Stable tag, e.g. "sector_match" or "semantic_match".
    pub tag: String,
    /// What matched, e.g. the sector or keyword.
    pub category: String,
    /// Human-readable sentence.
    pub message: String,
    /// Points contributed to the match score.
    pub weight: i32,
}

/// One recommendation response row.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub tender: Tender,
    pub match_score: i32,
    pub match_reasons: Vec<MatchReason>,
    pub semantic_similarity: f32,
    pub days_until_deadline: Option<i64>,
}

/// Request filters for the recommend operation.
#[derive(Debug, Clone)]
pub struct RecommendFilters {
    pub limit: usize,
    pub min_score: f64,
    pub days_ahead: i64,
    pub sectors: Option<Vec<String>>,
    pub regions: Option<Vec<String>>,
}

impl Default for RecommendFilters {
    fn default() -> Self {
        Self {
            limit: 20,
            min_score: 0.0,
            days_ahead: 7,
            sectors: None,
            regions: None,
        }
    }
}

impl RecommendFilters {
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 || self.limit > 100 {
            return Err(TenderMatchError::Validation(
                "limit must be within 1-100".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.min_score) {
            return Err(TenderMatchError::Validation(
                "min_score must be within 0-100".to_string(),
            ));
        }
        if !(1..=90).contains(&self.days_ahead) {
            return Err(TenderMatchError::Validation(
                "days_ahead must be within 1-90".to_string(),
            ));
        }
        Ok(())
    }
}

/// Echo of the filters a response was produced under.
#[derive(Debug, Clone, Serialize)]
pub struct FiltersApplied {
    pub limit: usize,
    pub min_score: f64,
    pub days_ahead: i64,
    pub sectors: Option<Vec<String>>,
    pub regions: Option<Vec<String>>,
    /// Effective threshold after flooring with the profile setting.
    pub effective_min_score: f64,
}

/// Full recommend response.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationPage {
    pub items: Vec<Recommendation>,
    /// Count of items above the threshold, before pagination.
    pub total: usize,
    pub profile_id: Uuid,
    pub profile_completion: i32,
    pub filters_applied: FiltersApplied,
    pub generated_at: DateTime<Utc>,
    /// True when scoring fell back to rules only.
    pub semantic_unavailable: bool,
}
