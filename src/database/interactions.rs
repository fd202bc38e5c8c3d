use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use super::Database;
use crate::models::InteractionType;
use crate::models::Tender;
use crate::Result;

/// Aggregate interaction counts for a user.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InteractionStats {
    pub counts: HashMap<String, i64>,
    pub average_view_seconds: Option<f64>,
}

impl Database {
    /// Append one interaction to the immutable log.
    ///
    /// Idempotent per (user, tender, type, dedup bucket): retried submissions
    /// inside the window collapse onto the first row and return None.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_interaction(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        tender: &Tender,
        interaction_type: InteractionType,
        weight: i32,
        time_spent_seconds: Option<i32>,
        match_score_at_time: Option<f64>,
        feedback_reason: Option<&str>,
        created_at: DateTime<Utc>,
        dedup_window_secs: i64,
    ) -> Result<Option<Uuid>> {
        let bucket = dedup_bucket(created_at, dedup_window_secs);

        let row: Option<(Uuid,)> = sqlx::query_as(
            r"
            INSERT INTO user_interactions (
                user_id, company_id, tender_id, interaction_type,
                interaction_weight, time_spent_seconds, match_score_at_time,
                tender_category, tender_region, tender_budget, feedback_reason,
                dedup_bucket, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (user_id, tender_id, interaction_type, dedup_bucket)
            DO NOTHING
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(company_id)
        .bind(tender.id)
        .bind(interaction_type.as_str())
        .bind(weight)
        .bind(time_spent_seconds)
        .bind(match_score_at_time)
        .bind(&tender.category)
        .bind(&tender.region)
        .bind(tender.budget)
        .bind(feedback_reason)
        .bind(bucket)
        .bind(created_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    pub async fn user_interaction_stats(&self, user_id: Uuid) -> Result<InteractionStats> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT interaction_type, COUNT(*)
            FROM user_interactions
            WHERE user_id = $1
            GROUP BY interaction_type
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let avg: (Option<f64>,) = sqlx::query_as(
            r"
            SELECT AVG(time_spent_seconds)
            FROM user_interactions
            WHERE user_id = $1 AND interaction_type = $2
              AND time_spent_seconds IS NOT NULL
            ",
        )
        .bind(user_id)
        .bind(InteractionType::View.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(InteractionStats {
            counts: rows.into_iter().collect(),
            average_view_seconds: avg.0,
        })
    }

    /// Positive interactions of a company in a tender category.
    pub async fn count_positive_interactions_in_category(
        &self,
        company_id: Uuid,
        category: &str,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM user_interactions
            WHERE company_id = $1
              AND tender_category = $2
              AND interaction_type IN ('save', 'apply', 'rate_positive')
              AND interaction_weight > 0
            ",
        )
        .bind(company_id)
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    pub async fn count_dismissals_in_category(
        &self,
        company_id: Uuid,
        category: &str,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM user_interactions
            WHERE company_id = $1
              AND tender_category = $2
              AND interaction_type = 'dismiss'
            ",
        )
        .bind(company_id)
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    pub async fn count_dismissals_in_region(
        &self,
        company_id: Uuid,
        region: &str,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM user_interactions
            WHERE company_id = $1
              AND tender_region = $2
              AND interaction_type = 'dismiss'
            ",
        )
        .bind(company_id)
        .bind(region)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}

/// Truncate an event time to its dedup bucket.
pub fn dedup_bucket(at: DateTime<Utc>, window_secs: i64) -> i64 {
    let ts = at.timestamp();
    ts - ts.rem_euclid(window_secs)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_dedup_bucket_truncates_to_window() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 3).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 9).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 10).unwrap();

        assert_eq!(dedup_bucket(t0, 10), dedup_bucket(t1, 10));
        assert_ne!(dedup_bucket(t1, 10), dedup_bucket(t2, 10));
    }

    #[test]
    fn test_dedup_bucket_is_stable_for_pre_epoch_times() {
        let t = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 58).unwrap();
        let bucket = dedup_bucket(t, 10);
        assert_eq!(bucket % 10, 0);
        assert!(bucket <= t.timestamp());
    }
}
