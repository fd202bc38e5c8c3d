//! Recommendation orchestration
//!
//! Candidate generation against the vector store, score fusion, threshold
//! cut, ranking and explanation. The semantic side degrades without failing
//! the request: when the profile vector or the k-NN query is unavailable,
//! candidates come from the rule pre-filter and items are scored by rules
//! only, with the response flagged accordingly.

use std::sync::Arc;

use chrono::Duration;
use chrono::NaiveDate;
use chrono::Utc;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use super::popularity::normalize_popularity;
use super::popularity::PopularityIndex;
use super::rule_scorer::DimensionShares;
use super::rule_scorer::RuleScorer;
use super::rule_scorer::ScoreInput;
use super::FiltersApplied;
use super::Recommendation;
use super::RecommendationPage;
use super::RecommendFilters;
use super::MAX_REASONS_PER_ITEM;
use crate::config::RecommendationConfig;
use crate::database::CandidateFilter;
use crate::database::Database;
use crate::models::CompanyProfile;
use crate::models::Tender;
use crate::models::TenderStatus;
use crate::Result;
use crate::TenderMatchError;

pub struct Matcher {
    db: Arc<Database>,
    popularity: PopularityIndex,
    config: RecommendationConfig,
}

impl Matcher {
    pub fn new(db: Arc<Database>, config: RecommendationConfig) -> Self {
        let popularity = PopularityIndex::new(
            db.clone(),
            std::time::Duration::from_secs(config.popularity_ttl_secs),
        );
        Self {
            db,
            popularity,
            config,
        }
    }

    /// Produce a ranked, explained recommendation page for a company.
    ///
    /// `degraded` shrinks candidate breadth and skips popularity; the server
    /// sets it under load shedding.
    pub async fn recommend(
        &self,
        company_id: Uuid,
        filters: RecommendFilters,
        degraded: bool,
    ) -> Result<RecommendationPage> {
        filters.validate()?;

        let mut profile = self
            .db
            .get_profile_by_company(company_id)
            .await?
            .ok_or(TenderMatchError::ProfileNotFound(company_id))?;

        // Profiles without their own weights inherit the deployment default
        if profile.scoring_weights.is_none() {
            profile.scoring_weights = self.config.default_scoring_weights.clone();
        }

        if !profile.is_tier1_complete() {
            return Err(TenderMatchError::ProfileIncomplete(
                "tier-1 fields missing; finish onboarding first".to_string(),
            ));
        }

        let today = Utc::now().date_naive();
        let candidate_filter = CandidateFilter {
            today,
            max_deadline: today + Duration::days(filters.days_ahead),
            sectors: filters.sectors.clone(),
            regions: filters.regions.clone(),
            exclude_dismissed_for: Some(company_id),
        };

        let k = if degraded {
            (filters.limit * 5).min(100)
        } else {
            self.config
                .candidate_floor
                .max(self.config.candidate_multiplier * filters.limit)
        };
        let k = k as i64;

        let (candidates, semantic_unavailable) = self
            .generate_candidates(&profile, k, &candidate_filter)
            .await?;

        let p95 = if degraded { 0.0 } else { self.popularity.p95().await };

        let effective_min_score = filters.min_score.max(profile.min_match_threshold);
        let (items, total) = rank_candidates(
            &profile,
            candidates,
            p95,
            today,
            effective_min_score,
            filters.limit,
        );

        debug!(
            "Recommendation for company {}: {} items of {} above threshold {}",
            company_id,
            items.len(),
            total,
            effective_min_score
        );

        Ok(RecommendationPage {
            items,
            total,
            profile_id: profile.id,
            profile_completion: profile.completion_percentage(),
            filters_applied: FiltersApplied {
                limit: filters.limit,
                min_score: filters.min_score,
                days_ahead: filters.days_ahead,
                sectors: filters.sectors,
                regions: filters.regions,
                effective_min_score,
            },
            generated_at: Utc::now(),
            semantic_unavailable,
        })
    }

    /// Top-K by k-NN against the profile vector; rule pre-filter when the
    /// vector is missing or the semantic path errors.
    async fn generate_candidates(
        &self,
        profile: &CompanyProfile,
        k: i64,
        filter: &CandidateFilter,
    ) -> Result<(Vec<(Tender, Option<f32>)>, bool)> {
        let profile_embedding = match self.db.get_profile_embedding(profile.id).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Profile embedding fetch failed, degrading: {}", e);
                None
            }
        };

        if let Some(embedding) = profile_embedding {
            match self.db.knn_tenders(&embedding, k, filter).await {
                Ok(candidates) => {
                    let candidates = candidates
                        .into_iter()
                        .map(|c| (c.tender, Some(c.similarity)))
                        .collect();
                    return Ok((candidates, false));
                }
                Err(e) => {
                    warn!("Vector candidate generation failed, degrading: {}", e);
                }
            }
        }

        let tenders = self
            .db
            .rule_candidates(
                &profile.active_sectors,
                &profile.preferred_regions,
                k,
                filter,
            )
            .await?;

        Ok((tenders.into_iter().map(|t| (t, None)).collect(), true))
    }
}

/// Score, cut, rank and paginate candidates. Pure: the outcome is fully
/// determined by the inputs.
pub fn rank_candidates(
    profile: &CompanyProfile,
    candidates: Vec<(Tender, Option<f32>)>,
    popularity_p95: f64,
    today: NaiveDate,
    effective_min_score: f64,
    limit: usize,
) -> (Vec<Recommendation>, usize) {
    let shares = DimensionShares::from_profile(profile.scoring_weights.as_ref());

    let mut items: Vec<Recommendation> = candidates
        .into_iter()
        .filter(|(tender, _)| tender.effective_status(today) == TenderStatus::Published)
        .filter_map(|(tender, semantic)| {
            let input = ScoreInput {
                profile,
                tender: &tender,
                semantic,
                popularity_norm: normalize_popularity(tender.popularity_score, popularity_p95),
                today,
            };
            let scored = RuleScorer::score(&input, &shares);

            if f64::from(scored.match_score) < effective_min_score {
                return None;
            }

            let mut match_reasons = scored.reasons;
            match_reasons.truncate(MAX_REASONS_PER_ITEM);

            let days_until_deadline = tender.days_until_deadline(today);
            Some(Recommendation {
                tender,
                match_score: scored.match_score,
                match_reasons,
                semantic_similarity: scored.semantic_similarity,
                days_until_deadline,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then_with(|| b.semantic_similarity.total_cmp(&a.semantic_similarity))
            .then_with(|| a.tender.id.cmp(&b.tender.id))
    });

    let total = items.len();
    items.truncate(limit);
    (items, total)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn profile() -> CompanyProfile {
        CompanyProfile {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            primary_sector: "IT and Infrastructure".to_string(),
            active_sectors: vec!["IT and Infrastructure".to_string()],
            sub_sectors: vec![],
            preferred_regions: vec!["Addis Ababa".to_string()],
            keywords: vec!["cloud".to_string(), "erp".to_string(), "devops".to_string()],
            company_size: None,
            years_in_operation: None,
            certifications: vec![],
            budget_min: Some(50_000.0),
            budget_max: Some(500_000.0),
            budget_currency: "ETB".to_string(),
            discovered_interests: vec![],
            preferred_sources: vec![],
            preferred_languages: vec![],
            min_deadline_days: None,
            min_match_threshold: 0.0,
            scoring_weights: None,
            embedding_updated_at: None,
            embedding_dirty: false,
            onboarding_step: 1,
            interaction_count: 0,
            interactions_since_embed: 0,
            last_interaction_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tender(id_byte: u8, category: &str, deadline_days: i64) -> Tender {
        let today = Utc::now().date_naive();
        Tender {
            id: Uuid::from_bytes([id_byte; 16]),
            external_id: None,
            source_url: format!("https://tenders.example/{id_byte}"),
            title: format!("{category} works"),
            description: None,
            clean_description: None,
            summary: None,
            highlights: vec![],
            organization: None,
            category: Some(category.to_string()),
            region: Some("Addis Ababa".to_string()),
            budget: None,
            budget_currency: None,
            language: None,
            deadline: Some(today + chrono::Duration::days(deadline_days)),
            status: "published".to_string(),
            published_at: None,
            extracted_data: None,
            view_count: 0,
            save_count: 0,
            apply_count: 0,
            dismiss_count: 0,
            rate_positive_count: 0,
            rate_negative_count: 0,
            popularity_score: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_items_sorted_by_score_then_semantic_then_id() {
        let profile = profile();
        let today = Utc::now().date_naive();

        let candidates = vec![
            (tender(3, "IT and Infrastructure", 14), Some(0.2)),
            (tender(1, "Manufacturing", 14), Some(0.9)),
            (tender(2, "IT and Infrastructure", 14), Some(0.2)),
            (tender(4, "IT and Infrastructure", 14), Some(0.6)),
        ];

        let (items, total) = rank_candidates(&profile, candidates, 0.0, today, 0.0, 10);
        assert_eq!(total, 4);

        for pair in items.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.match_score >= b.match_score);
            if a.match_score == b.match_score {
                assert!(a.semantic_similarity >= b.semantic_similarity);
                if (a.semantic_similarity - b.semantic_similarity).abs() < f32::EPSILON {
                    assert!(a.tender.id < b.tender.id);
                }
            }
        }

        // identical scores and similarities: ids 2 and 3 in ascending order
        let id2 = Uuid::from_bytes([2; 16]);
        let id3 = Uuid::from_bytes([3; 16]);
        let pos2 = items.iter().position(|i| i.tender.id == id2).unwrap();
        let pos3 = items.iter().position(|i| i.tender.id == id3).unwrap();
        assert!(pos2 < pos3);
    }

    #[test]
    fn test_threshold_cut_excludes_low_scores() {
        let mut profile = profile();
        profile.min_match_threshold = 0.0;
        let today = Utc::now().date_naive();

        let candidates = vec![
            (tender(1, "IT and Infrastructure", 14), Some(0.9)),
            (tender(2, "Manufacturing", 100), None),
        ];

        let (items, total) = rank_candidates(&profile, candidates, 0.0, today, 30.0, 10);
        assert_eq!(total, 1);
        assert!(items.iter().all(|i| i.match_score >= 30));
    }

    #[test]
    fn test_profile_threshold_floors_request_min_score() {
        let mut profile = profile();
        profile.min_match_threshold = 70.0;
        let today = Utc::now().date_naive();

        let candidates = vec![(tender(1, "IT and Infrastructure", 14), Some(0.1))];

        // request asks for everything, profile floors at 70
        let effective = 10.0_f64.max(profile.min_match_threshold);
        let (items, _) = rank_candidates(&profile, candidates, 0.0, today, effective, 10);
        assert!(items.iter().all(|i| i.match_score >= 70));
    }

    #[test]
    fn test_expired_published_tender_is_excluded() {
        let profile = profile();
        let today = Utc::now().date_naive();

        let mut expired = tender(1, "IT and Infrastructure", 14);
        expired.deadline = Some(today - chrono::Duration::days(1));

        let (items, total) =
            rank_candidates(&profile, vec![(expired, Some(0.9))], 0.0, today, 0.0, 10);
        assert_eq!(total, 0);
        assert!(items.is_empty());
    }

    #[test]
    fn test_reasons_capped_at_six() {
        let mut profile = profile();
        profile.keywords = vec![
            "alpha".to_string(),
            "beta".to_string(),
            "gamma".to_string(),
            "delta".to_string(),
            "epsilon".to_string(),
        ];
        profile.sub_sectors = vec!["alpha".to_string()];
        let today = Utc::now().date_naive();

        let mut t = tender(1, "IT and Infrastructure", 3);
        t.title = "alpha beta gamma delta epsilon works".to_string();
        t.budget = Some(100_000.0);

        let (items, _) = rank_candidates(&profile, vec![(t, Some(0.8))], 0.0, today, 0.0, 10);
        assert_eq!(items.len(), 1);
        assert!(items[0].match_reasons.len() <= MAX_REASONS_PER_ITEM);

        // reasons stay sorted by contribution
        for pair in items[0].match_reasons.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
    }

    #[test]
    fn test_pagination_keeps_total() {
        let profile = profile();
        let today = Utc::now().date_naive();

        let candidates: Vec<(Tender, Option<f32>)> = (1..=8)
            .map(|i| (tender(i, "IT and Infrastructure", 14), Some(0.5)))
            .collect();

        let (items, total) = rank_candidates(&profile, candidates, 0.0, today, 0.0, 3);
        assert_eq!(items.len(), 3);
        assert_eq!(total, 8);
    }

    #[test]
    fn test_rule_only_candidates_have_no_semantic_reasons() {
        let profile = profile();
        let today = Utc::now().date_naive();

        let candidates = vec![(tender(1, "IT and Infrastructure", 14), None)];
        let (items, _) = rank_candidates(&profile, candidates, 0.0, today, 0.0, 10);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].semantic_similarity, 0.0);
        assert!(items[0]
            .match_reasons
            .iter()
            .all(|r| r.tag != "semantic_match"));
    }

    #[test]
    fn test_rank_is_deterministic() {
        let profile = profile();
        let today = Utc::now().date_naive();

        let make = || {
            vec![
                (tender(5, "IT and Infrastructure", 10), Some(0.7)),
                (tender(9, "IT and Infrastructure", 4), Some(0.3)),
                (tender(7, "Manufacturing", 20), Some(0.9)),
            ]
        };

        let (a, _) = rank_candidates(&profile, make(), 10.0, today, 0.0, 10);
        let (b, _) = rank_candidates(&profile, make(), 10.0, today, 0.0, 10);

        let a_keys: Vec<_> = a.iter().map(|i| (i.tender.id, i.match_score)).collect();
        let b_keys: Vec<_> = b.iter().map(|i| (i.tender.id, i.match_score)).collect();
        assert_eq!(a_keys, b_keys);
    }
}
