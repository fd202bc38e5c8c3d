use uuid::Uuid;

use super::Database;
use crate::models::CompanyProfile;
use crate::models::CreateProfileRequest;
use crate::models::UpdateProfileRequest;
use crate::Result;
use crate::TenderMatchError;

const PROFILE_COLUMNS: &str = "id, company_id, primary_sector, active_sectors, \
     sub_sectors, preferred_regions, keywords, company_size, years_in_operation, \
     certifications, budget_min, budget_max, budget_currency, \
     discovered_interests, preferred_sources, preferred_languages, \
     min_deadline_days, min_match_threshold, scoring_weights, \
     embedding_updated_at, embedding_dirty, onboarding_step, interaction_count, \
     interactions_since_embed, last_interaction_at, created_at, updated_at";

impl Database {
    pub async fn get_profile_by_company(
        &self,
        company_id: Uuid,
    ) -> Result<Option<CompanyProfile>> {
        let profile = sqlx::query_as::<_, CompanyProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM company_tender_profiles WHERE company_id = $1"
        ))
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn get_profile(&self, profile_id: Uuid) -> Result<Option<CompanyProfile>> {
        let profile = sqlx::query_as::<_, CompanyProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM company_tender_profiles WHERE id = $1"
        ))
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Create a profile from onboarding step 1. One profile per company.
    pub async fn create_profile(
        &self,
        company_id: Uuid,
        request: &CreateProfileRequest,
    ) -> Result<CompanyProfile> {
        if self.get_profile_by_company(company_id).await?.is_some() {
            return Err(TenderMatchError::ProfileAlreadyExists(company_id));
        }

        let tier2_complete = request.company_size.is_some()
            && request.years_in_operation.is_some()
            && !request.certifications.is_empty();
        let onboarding_step: i32 = if tier2_complete { 2 } else { 1 };

        let profile = sqlx::query_as::<_, CompanyProfile>(&format!(
            r"
            INSERT INTO company_tender_profiles (
                company_id, primary_sector, active_sectors, sub_sectors,
                preferred_regions, keywords, company_size, years_in_operation,
                certifications, budget_min, budget_max, budget_currency,
                onboarding_step, embedding_dirty
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, TRUE)
            RETURNING {PROFILE_COLUMNS}
            ",
        ))
        .bind(company_id)
        .bind(&request.primary_sector)
        .bind(&request.active_sectors)
        .bind(&request.sub_sectors)
        .bind(&request.preferred_regions)
        .bind(&request.keywords)
        .bind(&request.company_size)
        .bind(&request.years_in_operation)
        .bind(&request.certifications)
        .bind(request.budget_min)
        .bind(request.budget_max)
        .bind(request.budget_currency.as_deref().unwrap_or("ETB"))
        .bind(onboarding_step)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Partial profile update. Absent fields keep their current values.
    pub async fn update_profile(
        &self,
        company_id: Uuid,
        request: &UpdateProfileRequest,
    ) -> Result<CompanyProfile> {
        let mark_dirty = request.touches_embedding_inputs();

        let profile = sqlx::query_as::<_, CompanyProfile>(&format!(
            r"
            UPDATE company_tender_profiles SET
                primary_sector = COALESCE($2, primary_sector),
                active_sectors = COALESCE($3, active_sectors),
                sub_sectors = COALESCE($4, sub_sectors),
                preferred_regions = COALESCE($5, preferred_regions),
                keywords = COALESCE($6, keywords),
                company_size = COALESCE($7, company_size),
                years_in_operation = COALESCE($8, years_in_operation),
                certifications = COALESCE($9, certifications),
                budget_min = COALESCE($10, budget_min),
                budget_max = COALESCE($11, budget_max),
                budget_currency = COALESCE($12, budget_currency),
                min_match_threshold = COALESCE($13, min_match_threshold),
                scoring_weights = COALESCE($14, scoring_weights),
                embedding_dirty = embedding_dirty OR $15,
                onboarding_step = CASE
                    WHEN onboarding_step < 2
                         AND COALESCE($7, company_size) IS NOT NULL
                         AND COALESCE($8, years_in_operation) IS NOT NULL
                         AND cardinality(COALESCE($9, certifications)) > 0
                    THEN 2
                    ELSE onboarding_step
                END,
                updated_at = NOW()
            WHERE company_id = $1
            RETURNING {PROFILE_COLUMNS}
            ",
        ))
        .bind(company_id)
        .bind(&request.primary_sector)
        .bind(&request.active_sectors)
        .bind(&request.sub_sectors)
        .bind(&request.preferred_regions)
        .bind(&request.keywords)
        .bind(&request.company_size)
        .bind(&request.years_in_operation)
        .bind(&request.certifications)
        .bind(request.budget_min)
        .bind(request.budget_max)
        .bind(&request.budget_currency)
        .bind(request.min_match_threshold)
        .bind(&request.scoring_weights)
        .bind(mark_dirty)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(TenderMatchError::ProfileNotFound(company_id))?;

        Ok(profile)
    }

    pub async fn get_profile_embedding(&self, profile_id: Uuid) -> Result<Option<Vec<f32>>> {
        let row: Option<(Option<Vec<f32>>,)> = sqlx::query_as(
            "SELECT embedding::real[] FROM company_tender_profiles WHERE id = $1",
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(embedding,)| embedding))
    }

    /// Atomically swap in a freshly computed profile vector and clear the
    /// dirty state. A failed refresh never reaches this point, so the old
    /// vector stays intact.
    pub async fn store_profile_embedding(
        &self,
        profile_id: Uuid,
        embedding: &[f32],
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE company_tender_profiles SET
                embedding = $2::vector,
                embedding_updated_at = NOW(),
                embedding_dirty = FALSE,
                interactions_since_embed = 0,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(profile_id)
        .bind(embedding)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_embedding_dirty(&self, profile_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE company_tender_profiles SET embedding_dirty = TRUE, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(profile_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn bump_interaction_counters(&self, profile_id: Uuid) -> Result<()> {
        sqlx::query(
            r"
            UPDATE company_tender_profiles SET
                interaction_count = interaction_count + 1,
                interactions_since_embed = interactions_since_embed + 1,
                last_interaction_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(profile_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a discovered interest unless present or over the bound.
    /// Returns true when the interest was actually added.
    pub async fn add_discovered_interest(
        &self,
        profile_id: Uuid,
        interest: &str,
        max_interests: usize,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE company_tender_profiles SET
                discovered_interests = array_append(discovered_interests, $2),
                updated_at = NOW()
            WHERE id = $1
              AND NOT ($2 = ANY(discovered_interests))
              AND cardinality(discovered_interests) < $3
            ",
        )
        .bind(profile_id)
        .bind(interest)
        .bind(max_interests as i32)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop an interest the dismissal pattern has disqualified.
    pub async fn remove_discovered_interest(
        &self,
        profile_id: Uuid,
        interest: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE company_tender_profiles SET
                discovered_interests = array_remove(discovered_interests, $2),
                updated_at = NOW()
            WHERE id = $1 AND $2 = ANY(discovered_interests)
            ",
        )
        .bind(profile_id)
        .bind(interest)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
