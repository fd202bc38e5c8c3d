use chrono::NaiveDate;
use uuid::Uuid;

use super::Database;
use crate::models::InteractionType;
use crate::models::Tender;
use crate::Result;

/// Columns fetched for every tender read. The embedding column stays in the
/// database; similarity comes back as a separate value where needed.
const TENDER_COLUMNS: &str = "id, external_id, source_url, title, description, \
     clean_description, summary, highlights, organization, category, region, \
     budget, budget_currency, language, deadline, status, published_at, \
     extracted_data, view_count, save_count, apply_count, dismiss_count, \
     rate_positive_count, rate_negative_count, popularity_score, created_at, \
     updated_at";

/// A candidate tender with its cosine similarity to the query vector.
#[derive(Debug, Clone)]
pub struct TenderCandidate {
    pub tender: Tender,
    pub similarity: f32,
}

/// Hard predicates applied before any scoring.
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub today: NaiveDate,
    pub max_deadline: NaiveDate,
    pub sectors: Option<Vec<String>>,
    pub regions: Option<Vec<String>>,
    /// Company whose dismissed tenders are excluded.
    pub exclude_dismissed_for: Option<Uuid>,
}

impl Database {
    pub async fn get_tender(&self, tender_id: Uuid) -> Result<Option<Tender>> {
        let tender = sqlx::query_as::<_, Tender>(&format!(
            "SELECT {TENDER_COLUMNS} FROM tenders WHERE id = $1"
        ))
        .bind(tender_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tender)
    }

    pub async fn get_tender_embedding(&self, tender_id: Uuid) -> Result<Option<Vec<f32>>> {
        let row: Option<(Option<Vec<f32>>,)> =
            sqlx::query_as("SELECT embedding::real[] FROM tenders WHERE id = $1")
                .bind(tender_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(embedding,)| embedding))
    }

    /// Store a tender vector. Linearizable per id: a read after this write
    /// observes the new vector.
    pub async fn upsert_tender_embedding(
        &self,
        tender_id: Uuid,
        embedding: &[f32],
    ) -> Result<()> {
        sqlx::query(
            "UPDATE tenders SET embedding = $2::vector, updated_at = NOW() WHERE id = $1",
        )
        .bind(tender_id)
        .bind(embedding)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// k-NN over published tenders under the hard-filter set.
    ///
    /// Ordering is strictly descending cosine similarity with ties broken by
    /// ascending tender id, so repeated queries return identical orderings.
    pub async fn knn_tenders(
        &self,
        query_embedding: &[f32],
        k: i64,
        filter: &CandidateFilter,
    ) -> Result<Vec<TenderCandidate>> {
        #[derive(sqlx::FromRow)]
        struct RawResult {
            #[sqlx(flatten)]
            tender: Tender,
            similarity: f64,
        }

        let sql = format!(
            r"
            SELECT {TENDER_COLUMNS},
                1 - (embedding <=> $1::vector) AS similarity
            FROM tenders
            WHERE status = 'published'
              AND embedding IS NOT NULL
              AND (deadline IS NULL OR (deadline >= $2 AND deadline <= $3))
              AND ($4::text[] IS NULL OR category = ANY($4))
              AND ($5::text[] IS NULL OR region = ANY($5))
              AND ($6::uuid IS NULL OR id NOT IN (
                    SELECT tender_id FROM user_interactions
                    WHERE company_id = $6 AND interaction_type = $7))
            ORDER BY embedding <=> $1::vector, id
            LIMIT $8
            ",
        );

        let raw_results = sqlx::query_as::<_, RawResult>(&sql)
            .bind(query_embedding)
            .bind(filter.today)
            .bind(filter.max_deadline)
            .bind(filter.sectors.as_deref())
            .bind(filter.regions.as_deref())
            .bind(filter.exclude_dismissed_for)
            .bind(InteractionType::Dismiss.as_str())
            .bind(k)
            .fetch_all(&self.pool)
            .await?;

        Ok(raw_results
            .into_iter()
            .map(|r| TenderCandidate {
                tender: r.tender,
                similarity: r.similarity as f32,
            })
            .collect())
    }

    /// Tenders whose cosine similarity to the query vector is at least
    /// `min_similarity`, under the same hard-filter set and ordering as
    /// [`Self::knn_tenders`].
    pub async fn range_tenders_by_score(
        &self,
        query_embedding: &[f32],
        min_similarity: f32,
        limit: i64,
        filter: &CandidateFilter,
    ) -> Result<Vec<TenderCandidate>> {
        #[derive(sqlx::FromRow)]
        struct RawResult {
            #[sqlx(flatten)]
            tender: Tender,
            similarity: f64,
        }

        let sql = format!(
            r"
            SELECT {TENDER_COLUMNS},
                1 - (embedding <=> $1::vector) AS similarity
            FROM tenders
            WHERE status = 'published'
              AND embedding IS NOT NULL
              AND 1 - (embedding <=> $1::vector) >= $2
              AND (deadline IS NULL OR (deadline >= $3 AND deadline <= $4))
              AND ($5::text[] IS NULL OR category = ANY($5))
              AND ($6::text[] IS NULL OR region = ANY($6))
              AND ($7::uuid IS NULL OR id NOT IN (
                    SELECT tender_id FROM user_interactions
                    WHERE company_id = $7 AND interaction_type = $8))
            ORDER BY embedding <=> $1::vector, id
            LIMIT $9
            ",
        );

        let raw_results = sqlx::query_as::<_, RawResult>(&sql)
            .bind(query_embedding)
            .bind(f64::from(min_similarity))
            .bind(filter.today)
            .bind(filter.max_deadline)
            .bind(filter.sectors.as_deref())
            .bind(filter.regions.as_deref())
            .bind(filter.exclude_dismissed_for)
            .bind(InteractionType::Dismiss.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(raw_results
            .into_iter()
            .map(|r| TenderCandidate {
                tender: r.tender,
                similarity: r.similarity as f32,
            })
            .collect())
    }

    /// Nearest neighbors to a reference tender, excluding the reference.
    pub async fn knn_similar_tenders(
        &self,
        reference_id: Uuid,
        query_embedding: &[f32],
        limit: i64,
        today: NaiveDate,
    ) -> Result<Vec<TenderCandidate>> {
        #[derive(sqlx::FromRow)]
        struct RawResult {
            #[sqlx(flatten)]
            tender: Tender,
            similarity: f64,
        }

        let sql = format!(
            r"
            SELECT {TENDER_COLUMNS},
                1 - (embedding <=> $1::vector) AS similarity
            FROM tenders
            WHERE status = 'published'
              AND embedding IS NOT NULL
              AND id != $2
              AND (deadline IS NULL OR deadline >= $3)
            ORDER BY embedding <=> $1::vector, id
            LIMIT $4
            ",
        );

        let raw_results = sqlx::query_as::<_, RawResult>(&sql)
            .bind(query_embedding)
            .bind(reference_id)
            .bind(today)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(raw_results
            .into_iter()
            .map(|r| TenderCandidate {
                tender: r.tender,
                similarity: r.similarity as f32,
            })
            .collect())
    }

    /// Fallback candidate set for profiles without an embedding: sector and
    /// region overlap ordered by recency.
    pub async fn rule_candidates(
        &self,
        active_sectors: &[String],
        preferred_regions: &[String],
        k: i64,
        filter: &CandidateFilter,
    ) -> Result<Vec<Tender>> {
        let sql = format!(
            r"
            SELECT {TENDER_COLUMNS}
            FROM tenders
            WHERE status = 'published'
              AND (deadline IS NULL OR (deadline >= $1 AND deadline <= $2))
              AND category = ANY($3)
              AND region = ANY($4)
              AND ($5::text[] IS NULL OR category = ANY($5))
              AND ($6::text[] IS NULL OR region = ANY($6))
              AND ($7::uuid IS NULL OR id NOT IN (
                    SELECT tender_id FROM user_interactions
                    WHERE company_id = $7 AND interaction_type = $8))
            ORDER BY published_at DESC NULLS LAST, id
            LIMIT $9
            ",
        );

        let tenders = sqlx::query_as::<_, Tender>(&sql)
            .bind(filter.today)
            .bind(filter.max_deadline)
            .bind(active_sectors)
            .bind(preferred_regions)
            .bind(filter.sectors.as_deref())
            .bind(filter.regions.as_deref())
            .bind(filter.exclude_dismissed_for)
            .bind(InteractionType::Dismiss.as_str())
            .bind(k)
            .fetch_all(&self.pool)
            .await?;

        Ok(tenders)
    }

    /// Rolling 95th percentile of popularity over published tenders, used to
    /// normalize the popularity dimension.
    pub async fn popularity_p95(&self) -> Result<f64> {
        let row: (Option<f64>,) = sqlx::query_as(
            r"
            SELECT percentile_cont(0.95) WITHIN GROUP (ORDER BY popularity_score)
            FROM tenders
            WHERE status = 'published'
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0.unwrap_or(0.0))
    }

    /// Apply an interaction to the tender's counters. The popularity score
    /// floors at zero; increments are commutative.
    pub async fn apply_interaction_to_tender(
        &self,
        tender_id: Uuid,
        interaction_type: InteractionType,
        weight: i32,
    ) -> Result<()> {
        let count_column = match interaction_type {
            InteractionType::View => "view_count",
            InteractionType::Save => "save_count",
            InteractionType::Apply => "apply_count",
            InteractionType::Dismiss => "dismiss_count",
            InteractionType::RatePositive => "rate_positive_count",
            InteractionType::RateNegative => "rate_negative_count",
        };

        let sql = format!(
            r"
            UPDATE tenders SET
                {count_column} = {count_column} + 1,
                popularity_score = GREATEST(0, popularity_score + $2),
                updated_at = NOW()
            WHERE id = $1
            ",
        );

        sqlx::query(&sql)
            .bind(tender_id)
            .bind(f64::from(weight))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Tenders still waiting for an embedding, oldest first.
    pub async fn tenders_missing_embedding(&self, limit: i64) -> Result<Vec<Tender>> {
        let tenders = sqlx::query_as::<_, Tender>(&format!(
            r"
            SELECT {TENDER_COLUMNS}
            FROM tenders
            WHERE embedding IS NULL AND status = 'published'
            ORDER BY created_at, id
            LIMIT $1
            ",
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(tenders)
    }
}
