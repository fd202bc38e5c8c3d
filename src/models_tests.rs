//! Unit tests for domain model invariants.

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::*;

    fn profile() -> CompanyProfile {
        CompanyProfile {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            primary_sector: "Manufacturing".to_string(),
            active_sectors: vec!["Manufacturing".to_string()],
            sub_sectors: vec![],
            preferred_regions: vec!["Amhara".to_string()],
            keywords: vec![
                "packaging".to_string(),
                "assembly".to_string(),
                "fabrication".to_string(),
            ],
            company_size: None,
            years_in_operation: None,
            certifications: vec![],
            budget_min: None,
            budget_max: None,
            budget_currency: "ETB".to_string(),
            discovered_interests: vec![],
            preferred_sources: vec![],
            preferred_languages: vec![],
            min_deadline_days: None,
            min_match_threshold: 40.0,
            scoring_weights: None,
            embedding_updated_at: None,
            embedding_dirty: true,
            onboarding_step: 1,
            interaction_count: 0,
            interactions_since_embed: 0,
            last_interaction_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tender() -> Tender {
        Tender {
            id: Uuid::new_v4(),
            external_id: None,
            source_url: "https://tenders.example/42".to_string(),
            title: "Packaging line upgrade".to_string(),
            description: None,
            clean_description: None,
            summary: None,
            highlights: vec![],
            organization: None,
            category: Some("Manufacturing".to_string()),
            region: Some("Amhara".to_string()),
            budget: None,
            budget_currency: None,
            language: None,
            deadline: None,
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

    // ====== Tender status invariants ======

    #[test]
    fn test_published_with_past_deadline_reads_as_closed() {
        let today = Utc::now().date_naive();
        let mut t = tender();
        t.deadline = Some(today - Duration::days(1));
        assert_eq!(t.effective_status(today), TenderStatus::Closed);
    }

    #[test]
    fn test_published_with_future_deadline_stays_published() {
        let today = Utc::now().date_naive();
        let mut t = tender();
        t.deadline = Some(today + Duration::days(3));
        assert_eq!(t.effective_status(today), TenderStatus::Published);
    }

    #[test]
    fn test_published_without_deadline_stays_published() {
        let today = Utc::now().date_naive();
        assert_eq!(tender().effective_status(today), TenderStatus::Published);
    }

    #[test]
    fn test_cancelled_is_not_promoted() {
        let today = Utc::now().date_naive();
        let mut t = tender();
        t.status = "cancelled".to_string();
        assert_eq!(t.effective_status(today), TenderStatus::Cancelled);
    }

    #[test]
    fn test_days_until_deadline() {
        let today = Utc::now().date_naive();
        let mut t = tender();
        t.deadline = Some(today + Duration::days(14));
        assert_eq!(t.days_until_deadline(today), Some(14));

        t.deadline = None;
        assert_eq!(t.days_until_deadline(today), None);
    }

    // ====== Interaction types ======

    #[test]
    fn test_interaction_type_roundtrip() {
        for t in [
            InteractionType::View,
            InteractionType::Save,
            InteractionType::Apply,
            InteractionType::Dismiss,
            InteractionType::RatePositive,
            InteractionType::RateNegative,
        ] {
            assert_eq!(InteractionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(InteractionType::parse("rating"), None);
    }

    #[test]
    fn test_tender_status_roundtrip() {
        for s in [
            TenderStatus::Published,
            TenderStatus::Closed,
            TenderStatus::Draft,
            TenderStatus::Cancelled,
        ] {
            assert_eq!(TenderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(TenderStatus::parse("active"), None);
    }

    // ====== Profile completeness ======

    #[test]
    fn test_tier1_complete() {
        let p = profile();
        assert!(p.is_tier1_complete());
        assert!(!p.is_tier2_complete());
    }

    #[test]
    fn test_tier1_requires_three_keywords() {
        let mut p = profile();
        p.keywords = vec!["one".to_string(), "two".to_string()];
        assert!(!p.is_tier1_complete());
    }

    #[test]
    fn test_completion_percentage_increases_with_tier2() {
        let mut p = profile();
        let tier1_only = p.completion_percentage();

        p.company_size = Some("small".to_string());
        p.years_in_operation = Some("3-5".to_string());
        p.certifications = vec!["Trade License".to_string()];
        p.budget_min = Some(10_000.0);
        p.budget_max = Some(200_000.0);

        assert!(p.is_tier2_complete());
        assert!(p.completion_percentage() > tier1_only);
        assert!(p.completion_percentage() <= 100);
    }

    #[test]
    fn test_effective_languages_default() {
        let mut p = profile();
        assert_eq!(p.effective_languages(), vec!["english".to_string()]);

        p.preferred_languages = vec!["amharic".to_string()];
        assert_eq!(p.effective_languages(), vec!["amharic".to_string()]);
    }

    // ====== Request validation ======

    #[test]
    fn test_create_request_validation() {
        let valid = CreateProfileRequest {
            primary_sector: "Manufacturing".to_string(),
            active_sectors: vec!["Manufacturing".to_string()],
            sub_sectors: vec![],
            preferred_regions: vec!["Amhara".to_string()],
            keywords: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            company_size: None,
            years_in_operation: None,
            certifications: vec![],
            budget_min: None,
            budget_max: None,
            budget_currency: None,
        };
        assert!(valid.validate().is_ok());

        let mut too_many_sectors = valid.clone();
        too_many_sectors.active_sectors = (0..6).map(|i| format!("s{i}")).collect();
        assert!(too_many_sectors.validate().is_err());

        let mut too_few_keywords = valid.clone();
        too_few_keywords.keywords = vec!["a".to_string()];
        assert!(too_few_keywords.validate().is_err());

        let mut inverted_budget = valid.clone();
        inverted_budget.budget_min = Some(100.0);
        inverted_budget.budget_max = Some(50.0);
        assert!(inverted_budget.validate().is_err());
    }

    #[test]
    fn test_update_request_embedding_dirtiness() {
        let noop = UpdateProfileRequest::default();
        assert!(!noop.touches_embedding_inputs());

        let keywords = UpdateProfileRequest {
            keywords: Some(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
            ..Default::default()
        };
        assert!(keywords.touches_embedding_inputs());

        let threshold = UpdateProfileRequest {
            min_match_threshold: Some(55.0),
            ..Default::default()
        };
        assert!(!threshold.touches_embedding_inputs());
    }

    #[test]
    fn test_update_request_threshold_bounds() {
        let bad = UpdateProfileRequest {
            min_match_threshold: Some(140.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    // ====== Extracted data ======

    #[test]
    fn test_extracted_data_preserves_unknown_keys() {
        let raw = serde_json::json!({
            "financial": {"bid_bond": "2%"},
            "tender_type": "open",
            "custom_field": {"nested": true}
        });

        let extracted: ExtractedData = serde_json::from_value(raw.clone()).unwrap();
        assert!(extracted.financial.is_some());
        assert_eq!(extracted.tender_type.as_deref(), Some("open"));
        assert!(extracted.extra.contains_key("custom_field"));

        let back = serde_json::to_value(&extracted).unwrap();
        assert_eq!(back.get("custom_field"), raw.get("custom_field"));
    }

    #[test]
    fn test_tender_extracted_defaults_on_malformed_json() {
        let mut t = tender();
        t.extracted_data = Some(serde_json::json!("not an object"));
        let extracted = t.extracted();
        assert!(extracted.financial.is_none());
        assert!(extracted.extra.is_empty());
    }
}
